//! Step pipeline: raw step JSON → repaired [`StepScript`].

use lectern_core::duration::{STEP_MARKER_MS, estimate_duration_ms};
use lectern_core::{
    Align, BoardPolicy, EventType, Lane, Payload, PayloadBuilder, TeachingEvent, resolve_placement,
};
use lectern_layout::{LayoutReport, paginate_events};
use serde_json::{Map, Value};
use tracing::{debug, debug_span, warn};

use crate::chat::{ChatOverlay, ChatOverlayAdapter};
use crate::ids::EventIds;
use crate::repair::{RepairReport, StepRepairer};
use crate::step::{MathBlock, StepScript};

/// What normalization dropped or defaulted while building events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Events whose `type` is not a known event type.
    pub unknown_dropped: usize,
    /// Entries of the events array that were not JSON objects.
    pub malformed_dropped: usize,
    /// Model-supplied step markers (the pipeline emits its own).
    pub markers_dropped: usize,
    /// Events with no `type`, treated as narration.
    pub types_defaulted: usize,
    /// Annotations whose target was resolved to the latest visual.
    pub targets_linked: usize,
}

impl NormalizationReport {
    /// Total number of adjustments.
    pub fn total(&self) -> usize {
        self.unknown_dropped
            + self.malformed_dropped
            + self.markers_dropped
            + self.types_defaulted
            + self.targets_linked
    }

    /// True if the raw events needed no adjustment.
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// Everything produced for one step.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub script: StepScript,
    pub normalization: NormalizationReport,
    pub repair: RepairReport,
}

/// Normalizes, lays out, and repairs lesson steps.
///
/// One pipeline may process any number of steps; no layout state is shared
/// between them. The only state it holds is the id generator.
#[derive(Debug, Clone)]
pub struct LessonPipeline {
    policy: BoardPolicy,
    ids: EventIds,
}

impl Default for LessonPipeline {
    fn default() -> Self {
        Self::new(BoardPolicy::default())
    }
}

impl LessonPipeline {
    pub fn new(policy: BoardPolicy) -> Self {
        Self::with_ids(policy, EventIds::new())
    }

    /// Pipeline with a caller-supplied (e.g. seeded) id generator.
    pub fn with_ids(policy: BoardPolicy, ids: EventIds) -> Self {
        Self { policy, ids }
    }

    pub fn policy(&self) -> &BoardPolicy {
        &self.policy
    }

    /// Run raw chat events through the overlay adapter.
    pub fn adapt_chat_events(&mut self, raw_events: &[Value]) -> ChatOverlay {
        ChatOverlayAdapter::new(&self.policy).adapt(raw_events, &mut self.ids)
    }

    /// Run one raw step object through the whole pipeline.
    ///
    /// Steps with a non-empty `events` array are normalized directly; any
    /// other step is synthesized from its `content` and `math_blocks`.
    /// Either way the result is repaired and paginated. Model-supplied
    /// `content`, `narration` and `math_blocks` take precedence over the
    /// derived byproducts.
    pub fn process_step(&mut self, raw: &Map<String, Value>) -> StepOutcome {
        let step_number = step_number_of(raw);
        let title = match raw.get("title").and_then(Value::as_str) {
            Some(t) => t.to_owned(),
            None => format!("Step {step_number}"),
        };
        let _span = debug_span!("lectern.step", step_number);
        let _guard = _span.enter();

        let raw_events = raw
            .get("events")
            .and_then(Value::as_array)
            .filter(|events| !events.is_empty());
        let (mut events, normalization) = match raw_events {
            Some(raw_events) => {
                let (events, report, _) = self.normalize_events(step_number, &title, raw_events);
                (events, report)
            }
            None => {
                debug!("no events supplied; synthesizing from content");
                (self.synthesize_from_content(raw), NormalizationReport::default())
            }
        };

        let repair = StepRepairer::new(&self.policy).repair(
            &mut events,
            step_number,
            &title,
            &mut self.ids,
        );

        let mut script = StepScript::new(step_number, title, events)
            .with_hint(raw.get("hint").and_then(Value::as_str).map(str::to_owned));
        if let Some(content) = non_empty_str(raw, "content") {
            script.content = content;
        }
        if let Some(narration) = non_empty_str(raw, "narration") {
            script.narration = narration;
        }
        let supplied_blocks = math_blocks_of(raw);
        if !supplied_blocks.is_empty() {
            script.math_blocks = supplied_blocks;
        }

        if !normalization.is_clean() {
            debug!(?normalization, "step normalized with adjustments");
        }
        StepOutcome {
            script,
            normalization,
            repair,
        }
    }

    /// Turn a raw events array into canonical, placed, paginated events.
    ///
    /// A `step_marker` is always emitted first. No repair is applied.
    pub fn normalize_events(
        &mut self,
        step_number: u32,
        title: &str,
        raw_events: &[Value],
    ) -> (Vec<TeachingEvent>, NormalizationReport, LayoutReport) {
        let builder = PayloadBuilder::new(&self.policy);
        let mut report = NormalizationReport::default();
        let mut events = Vec::with_capacity(raw_events.len() + 1);

        let marker = Payload {
            step_title: Some(title.to_owned()),
            ..Payload::for_step(step_number)
        };
        events.push(TeachingEvent::new(
            self.ids.step_event(step_number, 0),
            EventType::StepMarker,
            STEP_MARKER_MS,
            marker,
        ));

        for (i, raw) in raw_events.iter().enumerate() {
            let Some(obj) = raw.as_object() else {
                warn!(step_number, index = i, "dropping non-object event");
                report.malformed_dropped += 1;
                continue;
            };
            let event_type = match obj.get("type").and_then(Value::as_str) {
                None => {
                    report.types_defaulted += 1;
                    EventType::Narrate
                }
                Some(name) => match EventType::parse(name) {
                    Some(ty) => ty,
                    None => {
                        warn!(event_type = name, step_number, "dropping unknown event type");
                        report.unknown_dropped += 1;
                        continue;
                    }
                },
            };
            if event_type == EventType::StepMarker {
                report.markers_dropped += 1;
                continue;
            }

            let mut payload = builder.build(event_type, raw);
            payload.step_number = Some(step_number);
            if event_type == EventType::Annotate
                && link_annotation_target(obj, &mut payload, &events)
            {
                report.targets_linked += 1;
            }
            resolve_placement(event_type, &mut payload, &self.policy);
            let duration = estimate_duration_ms(event_type, &payload);
            let id = self.ids.step_event(step_number, i + 1);
            events.push(TeachingEvent::new(id, event_type, duration, payload));
        }

        let layout = paginate_events(&mut events, step_number, &self.policy);
        (events, report, layout)
    }

    /// Build events for a step that came back as plain content.
    ///
    /// Title narration, the content as one left-aligned `write_text` in the
    /// given lane, each math block as a left-aligned `write_equation` in the
    /// derivation lane, then a pause.
    pub fn synthesize_from_content(&mut self, raw: &Map<String, Value>) -> Vec<TeachingEvent> {
        let step_number = step_number_of(raw);
        let title = raw.get("title").and_then(Value::as_str).unwrap_or("");
        let mut events = Vec::new();
        let mut push = |ids: &mut EventIds, event_type: EventType, payload: Payload| {
            let index = events.len();
            let duration = estimate_duration_ms(event_type, &payload);
            events.push(TeachingEvent::new(
                ids.step_event(step_number, index),
                event_type,
                duration,
                payload,
            ));
        };

        let marker = Payload {
            step_title: Some(if title.is_empty() {
                format!("Step {step_number}")
            } else {
                title.to_owned()
            }),
            ..Payload::for_step(step_number)
        };
        push(&mut self.ids, EventType::StepMarker, marker);
        push(
            &mut self.ids,
            EventType::Narrate,
            Payload::for_step(step_number).with_text(format!("Step {step_number}: {title}")),
        );

        let board = |lane: Lane, payload: Payload| Payload {
            lane: Some(lane),
            align: Some(Align::Left),
            ..payload
        };
        if let Some(content) = non_empty_str(raw, "content") {
            let payload = board(Lane::Given, Payload::for_step(step_number).with_text(content));
            push(&mut self.ids, EventType::WriteText, payload);
        }
        for block in math_blocks_of(raw) {
            let equation = Payload::for_step(step_number).with_latex(block.latex, block.display);
            push(&mut self.ids, EventType::WriteEquation, board(Lane::Derivation, equation));
        }
        push(&mut self.ids, EventType::Pause, Payload::for_step(step_number));

        for event in events.iter_mut() {
            resolve_placement(event.event_type, &mut event.payload, &self.policy);
        }
        paginate_events(&mut events, step_number, &self.policy);
        events
    }
}

/// Point an annotation at its target. Returns `true` if the target was
/// resolved from the preceding events.
///
/// An explicit id (`target_id`, or a `target` other than `"previous"`) is
/// kept as is; `"previous"` or no target at all means the latest visual.
fn link_annotation_target(
    raw: &Map<String, Value>,
    payload: &mut Payload,
    events: &[TeachingEvent],
) -> bool {
    if payload.target_id.is_some() {
        return false;
    }
    match raw.get("target").and_then(Value::as_str).map(str::trim) {
        Some(target) if !target.is_empty() && target != "previous" => {
            payload.target_id = Some(target.to_owned());
            false
        }
        _ => {
            payload.target_id = events
                .iter()
                .rev()
                .find(|e| e.is_board_visual())
                .map(|e| e.id.clone());
            payload.target_id.is_some()
        }
    }
}

pub(crate) fn step_number_of(raw: &Map<String, Value>) -> u32 {
    match raw.get("step_number") {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(1),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(1),
        _ => 1,
    }
}

pub(crate) fn non_empty_str(raw: &Map<String, Value>, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_owned)
}

/// `math_blocks` as objects (`{latex, display}`) or bare LaTeX strings.
pub(crate) fn math_blocks_of(raw: &Map<String, Value>) -> Vec<MathBlock> {
    let Some(items) = raw.get("math_blocks").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(latex) => Some(MathBlock {
                latex: latex.clone(),
                display: true,
            }),
            Value::Object(obj) => Some(MathBlock {
                latex: obj.get("latex")?.as_str()?.to_owned(),
                display: obj.get("display").and_then(Value::as_bool).unwrap_or(true),
            }),
            _ => None,
        })
        .filter(|block| !block.latex.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::{Anchor, AnnotationStyle, Zone};
    use serde_json::json;

    fn pipeline() -> LessonPipeline {
        LessonPipeline::with_ids(BoardPolicy::default(), EventIds::seeded(11))
    }

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn marker_is_prepended_with_title() {
        let mut p = pipeline();
        let raw = [json!({"type": "narrate", "text": "Hi"})];
        let (events, report, _) = p.normalize_events(2, "Factor", &raw);
        assert_eq!(events[0].event_type, EventType::StepMarker);
        assert_eq!(events[0].duration_ms, 300);
        assert_eq!(events[0].payload.step_title.as_deref(), Some("Factor"));
        assert!(events[0].id.starts_with("s2_e0_"));
        assert!(events[1].id.starts_with("s2_e1_"));
        assert!(report.is_clean());
    }

    #[test]
    fn unknown_and_malformed_events_are_dropped() {
        let mut p = pipeline();
        let raw = [
            json!({"type": "dance"}),
            json!("not an event"),
            json!({"type": "step_marker"}),
            json!({"text": "typeless"}),
            json!({"type": "writeText", "text": "kept"}),
        ];
        let (events, report, _) = p.normalize_events(1, "t", &raw);
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::StepMarker, EventType::Narrate, EventType::WriteText]);
        assert_eq!(report.unknown_dropped, 1);
        assert_eq!(report.malformed_dropped, 1);
        assert_eq!(report.markers_dropped, 1);
        assert_eq!(report.types_defaulted, 1);
        // Ids keep the raw index.
        assert!(events[2].id.starts_with("s1_e5_"));
    }

    #[test]
    fn annotation_previous_targets_latest_visual() {
        let mut p = pipeline();
        let raw = [
            json!({"type": "write_equation", "latex": "a"}),
            json!({"type": "draw_line"}),
            json!({"type": "narrate", "text": "look"}),
            json!({"type": "annotate", "target": "previous", "style": "underline"}),
            json!({"type": "annotate", "target": "s9_e9_custom"}),
            json!({"type": "annotate"}),
        ];
        let (events, report, _) = p.normalize_events(1, "t", &raw);
        let line_id = events[2].id.clone();
        assert_eq!(events[4].payload.target_id.as_deref(), Some(line_id.as_str()));
        assert_eq!(events[4].payload.annotation_type, Some(AnnotationStyle::Underline));
        assert_eq!(events[5].payload.target_id.as_deref(), Some("s9_e9_custom"));
        assert_eq!(events[6].payload.target_id.as_deref(), Some(line_id.as_str()));
        assert_eq!(report.targets_linked, 2);
    }

    #[test]
    fn content_synthesizer_splits_given_and_derivation() {
        let mut p = pipeline();
        let step = obj(json!({
            "step_number": 2,
            "title": "Differentiate",
            "content": "Use the power rule",
            "math_blocks": [{"latex": "x^2", "display": true}, "2x"],
        }));
        let events = p.synthesize_from_content(&step);
        let types: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                EventType::StepMarker,
                EventType::Narrate,
                EventType::WriteText,
                EventType::WriteEquation,
                EventType::WriteEquation,
                EventType::Pause,
            ]
        );
        assert_eq!(events[1].payload.text.as_deref(), Some("Step 2: Differentiate"));
        let text = &events[2].payload;
        assert_eq!(text.zone, Some(Zone::Given));
        assert_eq!(text.anchor, Some(Anchor::Given));
        assert_eq!(text.lane, Some(Lane::Given));
        assert_eq!(text.align, Some(Align::Left));
        for eq in &events[3..5] {
            assert_eq!(eq.payload.zone, Some(Zone::Main));
            assert_eq!(eq.payload.anchor, Some(Anchor::Work));
            assert_eq!(eq.payload.lane, Some(Lane::Derivation));
            assert_eq!(eq.payload.align, Some(Align::Left));
        }
    }

    #[test]
    fn process_step_prefers_supplied_byproducts() {
        let mut p = pipeline();
        let step = obj(json!({
            "step_number": 1,
            "title": "Solve",
            "content": "Legacy content",
            "hint": "Try factoring",
            "events": [{"type": "write_equation", "latex": "x+1=2"}],
        }));
        let outcome = p.process_step(&step);
        assert_eq!(outcome.script.content, "Legacy content");
        assert_eq!(outcome.script.hint.as_deref(), Some("Try factoring"));
        assert_eq!(outcome.script.math_blocks.len(), 1);
        assert!(!outcome.repair.is_clean());
        assert!(outcome.script.narration.starts_with("Let's work through Solve."));
    }

    #[test]
    fn process_step_without_events_synthesizes() {
        let mut p = pipeline();
        let step = obj(json!({"step_number": "3", "title": "Wrap up", "content": "We are done."}));
        let outcome = p.process_step(&step);
        assert_eq!(outcome.script.step_number, 3);
        assert_eq!(outcome.script.events.last().unwrap().event_type, EventType::Pause);
        assert!(outcome.script.events.iter().filter(|e| e.is_board_visual()).count() >= 2);
    }

    #[test]
    fn math_blocks_accept_both_shapes() {
        let raw = obj(json!({
            "math_blocks": ["a=b", {"latex": "c", "display": false}, {"display": true}, 7, ""],
        }));
        assert_eq!(
            math_blocks_of(&raw),
            vec![
                MathBlock { latex: "a=b".into(), display: true },
                MathBlock { latex: "c".into(), display: false },
            ]
        );
    }
}
