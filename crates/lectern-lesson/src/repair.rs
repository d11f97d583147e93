//! Structural repair of a finished step.
//!
//! Every step must play as a small lesson: it opens with narration, writes
//! at least two things on the board, draws attention to something, checks
//! understanding once, and closes with a pause. The repairer restores any
//! of these that the model skipped by synthesizing events. It never
//! rejects a step.
//!
//! Every check is an existence check, so repairing a repaired step is a
//! no-op and reports clean.

use lectern_core::duration::estimate_duration_ms;
use lectern_core::{
    Align, AnnotationStyle, BoardPolicy, EventType, Intent, Lane, Payload, TeachingEvent,
    TeachingPhase, resolve_placement,
};
use lectern_layout::{LayoutReport, paginate_events};
use tracing::{debug, debug_span};

use crate::ids::EventIds;

/// Minimum board-visual events per step.
pub const MIN_VISUALS: usize = 2;

/// What a repair pass had to synthesize.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub narrations_added: usize,
    pub setup_narrations_added: usize,
    pub visuals_added: usize,
    pub annotations_added: usize,
    pub phases_inferred: usize,
    pub checkpoints_added: usize,
    pub pauses_added: usize,
    /// Result of the closing pagination pass.
    pub layout: LayoutReport,
}

impl RepairReport {
    /// Total number of changes, excluding layout.
    pub fn total(&self) -> usize {
        self.narrations_added
            + self.setup_narrations_added
            + self.visuals_added
            + self.annotations_added
            + self.phases_inferred
            + self.checkpoints_added
            + self.pauses_added
    }

    /// True if the step already satisfied every structural rule.
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// Restores the minimum choreography of a step.
#[derive(Debug, Clone, Copy)]
pub struct StepRepairer<'a> {
    policy: &'a BoardPolicy,
}

impl<'a> StepRepairer<'a> {
    pub fn new(policy: &'a BoardPolicy) -> Self {
        Self { policy }
    }

    /// Repair `events` in place, then re-resolve placement and paginate the
    /// whole list.
    pub fn repair(
        &self,
        events: &mut Vec<TeachingEvent>,
        step_number: u32,
        title: &str,
        ids: &mut EventIds,
    ) -> RepairReport {
        let _span = debug_span!("lectern.repair", step_number, events = events.len());
        let _guard = _span.enter();

        let mut report = RepairReport::default();
        let subject = match title.trim() {
            "" => "this step",
            t => t,
        };
        let mut forge = Forge {
            ids,
            step_number,
        };

        // ── Opening narration ──
        let lead = usize::from(
            events
                .first()
                .is_some_and(|e| e.event_type == EventType::StepMarker),
        );
        if !events.iter().any(|e| e.event_type == EventType::Narrate) {
            let text = format!("Let's work through {subject}.");
            let event = forge.narrate(events, text, TeachingPhase::Setup);
            debug!(kind = "narrate", at = lead, "synthesized opening narration");
            events.insert(lead, event);
            report.narrations_added += 1;
        }
        if events
            .get(lead)
            .is_some_and(|e| e.event_type != EventType::Narrate)
        {
            let text = format!("First, here is what we are given for {subject}.");
            let event = forge.narrate(events, text, TeachingPhase::Setup);
            debug!(kind = "setup_narrate", at = lead, "synthesized setup narration");
            events.insert(lead, event);
            report.setup_narrations_added += 1;
        }

        // ── Board content ──
        let visuals = events.iter().filter(|e| e.is_board_visual()).count();
        if visuals < MIN_VISUALS {
            let fillers = [
                format!("Work through {subject} one line at a time."),
                "Each line follows from the one above.".to_owned(),
            ];
            let mut at = trailing_pause_start(events);
            for text in fillers.into_iter().take(MIN_VISUALS - visuals) {
                let event = forge.derivation_text(events, text);
                debug!(kind = "write_text", at, "synthesized derivation text");
                events.insert(at, event);
                at += 1;
                report.visuals_added += 1;
            }
        }

        // ── Emphasis ──
        if !events.iter().any(TeachingEvent::is_emphasis) {
            if let Some(last) = events.iter().rposition(TeachingEvent::is_board_visual) {
                let target = events[last].id.clone();
                let event = forge.highlight(events, target);
                debug!(kind = "annotate", at = last + 1, "synthesized highlight");
                events.insert(last + 1, event);
                report.annotations_added += 1;
            }
        }

        // ── Teaching phases ──
        for event in events
            .iter_mut()
            .filter(|e| e.event_type == EventType::Narrate && e.payload.teaching_phase.is_none())
        {
            event.payload.teaching_phase =
                Some(TeachingPhase::infer_from_text(event.payload.text_or_empty()));
            report.phases_inferred += 1;
        }
        let has_checkpoint = events.iter().any(|e| {
            e.event_type == EventType::Narrate
                && e.payload.teaching_phase == Some(TeachingPhase::Checkpoint)
        });
        if !has_checkpoint {
            let at = events
                .iter()
                .position(TeachingEvent::is_emphasis)
                .map_or_else(|| trailing_pause_start(events), |i| i + 1);
            let text = "Notice how each line follows from the one before.".to_owned();
            let event = forge.narrate(events, text, TeachingPhase::Checkpoint);
            debug!(kind = "checkpoint_narrate", at, "synthesized checkpoint");
            events.insert(at, event);
            report.checkpoints_added += 1;
        }

        // ── Closing pause ──
        if events.last().is_none_or(|e| e.event_type != EventType::Pause) {
            let event = forge.pause(events);
            debug!(kind = "pause", "synthesized closing pause");
            events.push(event);
            report.pauses_added += 1;
        }

        // ── Placement and layout ──
        for event in events.iter_mut().filter(|e| e.is_board_visual()) {
            resolve_placement(event.event_type, &mut event.payload, self.policy);
        }
        report.layout = paginate_events(events, step_number, self.policy);

        if !report.is_clean() {
            debug!(
                synthesized = report.total(),
                pages = report.layout.final_page + 1,
                "step repaired"
            );
        }
        report
    }
}

/// Index of the first event in the trailing run of pauses.
fn trailing_pause_start(events: &[TeachingEvent]) -> usize {
    let trailing = events
        .iter()
        .rev()
        .take_while(|e| e.event_type == EventType::Pause)
        .count();
    events.len() - trailing
}

/// Builds synthesized events with fresh, non-colliding ids.
struct Forge<'i> {
    ids: &'i mut EventIds,
    step_number: u32,
}

impl Forge<'_> {
    fn event(
        &mut self,
        existing: &[TeachingEvent],
        event_type: EventType,
        payload: Payload,
    ) -> TeachingEvent {
        let id = self.ids.unique_step_event(
            self.step_number,
            existing.len() + 1,
            existing.iter().map(|e| e.id.as_str()),
        );
        let duration = estimate_duration_ms(event_type, &payload);
        TeachingEvent::new(id, event_type, duration, payload)
    }

    fn narrate(
        &mut self,
        existing: &[TeachingEvent],
        text: String,
        phase: TeachingPhase,
    ) -> TeachingEvent {
        let payload = Payload {
            teaching_phase: Some(phase),
            ..Payload::for_step(self.step_number).with_text(text)
        };
        self.event(existing, EventType::Narrate, payload)
    }

    fn derivation_text(&mut self, existing: &[TeachingEvent], text: String) -> TeachingEvent {
        let payload = Payload {
            lane: Some(Lane::Derivation),
            intent: Some(Intent::Derive),
            align: Some(Align::Left),
            ..Payload::for_step(self.step_number).with_text(text)
        };
        self.event(existing, EventType::WriteText, payload)
    }

    fn highlight(&mut self, existing: &[TeachingEvent], target_id: String) -> TeachingEvent {
        let payload = Payload {
            annotation_type: Some(AnnotationStyle::Highlight),
            target_id: Some(target_id),
            ..Payload::for_step(self.step_number)
        };
        self.event(existing, EventType::Annotate, payload)
    }

    fn pause(&mut self, existing: &[TeachingEvent]) -> TeachingEvent {
        let payload = Payload::for_step(self.step_number);
        self.event(existing, EventType::Pause, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repair(events: &mut Vec<TeachingEvent>) -> RepairReport {
        let policy = BoardPolicy::default();
        let mut ids = EventIds::seeded(1);
        StepRepairer::new(&policy).repair(events, 1, "Solve", &mut ids)
    }

    fn types(events: &[TeachingEvent]) -> Vec<EventType> {
        events.iter().map(|e| e.event_type).collect()
    }

    #[test]
    fn empty_step_gets_full_choreography() {
        let mut events = Vec::new();
        let report = repair(&mut events);
        assert_eq!(
            types(&events),
            vec![
                EventType::Narrate,
                EventType::WriteText,
                EventType::WriteText,
                EventType::Annotate,
                EventType::Narrate,
                EventType::Pause,
            ]
        );
        assert_eq!(events[3].payload.target_id.as_deref(), Some(events[2].id.as_str()));
        assert_eq!(events[4].payload.teaching_phase, Some(TeachingPhase::Checkpoint));
        assert_eq!(report.narrations_added, 1);
        assert_eq!(report.setup_narrations_added, 0);
        assert_eq!(report.visuals_added, 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn leading_visual_gets_setup_narration() {
        let eq = TeachingEvent::new(
            "s1_e1_aaaaaa",
            EventType::WriteEquation,
            1200,
            Payload::for_step(1).with_latex("x+1=2", true),
        );
        let narrate = TeachingEvent::new(
            "s1_e2_bbbbbb",
            EventType::Narrate,
            1500,
            Payload::for_step(1).with_text("Subtract one."),
        );
        let mut events = vec![eq, narrate];
        let report = repair(&mut events);
        assert_eq!(events[0].event_type, EventType::Narrate);
        assert_eq!(events[0].payload.teaching_phase, Some(TeachingPhase::Setup));
        assert_eq!(report.setup_narrations_added, 1);
        assert_eq!(report.narrations_added, 0);
        assert_eq!(report.phases_inferred, 1);
    }

    #[test]
    fn step_marker_stays_first() {
        let marker =
            TeachingEvent::new("s1_e0_cccccc", EventType::StepMarker, 300, Payload::for_step(1));
        let mut events = vec![marker];
        repair(&mut events);
        assert_eq!(events[0].event_type, EventType::StepMarker);
        assert_eq!(events[1].event_type, EventType::Narrate);
    }

    #[test]
    fn emphasis_visual_satisfies_annotation_rule() {
        let mut events: Vec<TeachingEvent> = (0..2)
            .map(|i| {
                let mut p = Payload::for_step(1).with_latex("x=1", true);
                if i == 1 {
                    p.intent = Some(Intent::Emphasize);
                }
                TeachingEvent::new(format!("s1_e{i}_dddddd"), EventType::WriteEquation, 1200, p)
            })
            .collect();
        let report = repair(&mut events);
        assert_eq!(report.annotations_added, 0);
        assert!(!events.iter().any(|e| e.event_type == EventType::Annotate));
    }

    #[test]
    fn second_pass_is_clean() {
        let mut events = Vec::new();
        repair(&mut events);
        let once = events.clone();
        let report = repair(&mut events);
        assert!(report.is_clean(), "{report:?}");
        assert_eq!(events, once);
    }

    #[test]
    fn synthesized_ids_are_unique() {
        let mut events = Vec::new();
        repair(&mut events);
        let mut seen: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), events.len());
    }
}
