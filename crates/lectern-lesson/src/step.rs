//! Finished steps and their compatibility byproducts.

use lectern_core::duration::audio_ms;
use lectern_core::{EventType, TeachingEvent};
use serde::{Deserialize, Serialize};

/// A standalone equation in the legacy step shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathBlock {
    pub latex: String,
    #[serde(default = "display_default")]
    pub display: bool,
}

fn display_default() -> bool {
    true
}

/// One generated lesson step.
///
/// `events` is the source of truth. `content`, `narration` and
/// `math_blocks` exist for older clients and are derived from the events
/// unless the model supplied them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepScript {
    pub step_number: u32,
    pub title: String,
    pub content: String,
    pub narration: String,
    pub math_blocks: Vec<MathBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// First narration clip of the step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Total narration seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,
    pub events: Vec<TeachingEvent>,
}

impl StepScript {
    /// Wrap a finished event list, deriving every byproduct from it.
    pub fn new(step_number: u32, title: impl Into<String>, events: Vec<TeachingEvent>) -> Self {
        Self {
            step_number,
            title: title.into(),
            content: build_content(&events),
            narration: build_narration(&events),
            math_blocks: collect_math_blocks(&events),
            hint: None,
            audio_url: None,
            audio_duration: None,
            events,
        }
    }

    pub fn with_hint(mut self, hint: Option<String>) -> Self {
        self.hint = hint;
        self
    }

    /// Attach recorded narration audio to one `narrate` event.
    ///
    /// Overwrites the event's duration with the clip length and refreshes
    /// the step-level summary. Placement is never touched. Returns `false`
    /// (changing nothing) when the event is missing, is not a narration, or
    /// the clip is unusable.
    pub fn attach_narration_audio(
        &mut self,
        event_id: &str,
        audio_url: &str,
        seconds: f64,
    ) -> bool {
        let Some(duration_ms) = audio_ms(seconds).filter(|_| !audio_url.is_empty()) else {
            return false;
        };
        let Some(event) = self
            .events
            .iter_mut()
            .find(|e| e.id == event_id && e.event_type == EventType::Narrate)
        else {
            return false;
        };
        event.payload.audio_url = Some(audio_url.to_owned());
        event.payload.audio_duration = Some(seconds);
        event.duration_ms = duration_ms;
        self.refresh_audio_summary();
        true
    }

    /// Recompute `audio_url` (first clip) and `audio_duration` (sum).
    pub fn refresh_audio_summary(&mut self) {
        let narrations = self
            .events
            .iter()
            .filter(|e| e.event_type == EventType::Narrate);
        let mut first_url = None;
        let mut total = 0.0;
        let mut any = false;
        for event in narrations {
            if first_url.is_none() {
                first_url = event.payload.audio_url.clone().filter(|u| !u.is_empty());
            }
            if let Some(secs) = event.payload.audio_duration {
                total += secs;
                any = true;
            }
        }
        self.audio_url = first_url;
        self.audio_duration = any.then_some(total);
    }

    /// Ids of narrations that still need audio, with their text.
    pub fn narrations_without_audio(&self) -> impl Iterator<Item = (&str, &str)> {
        self.events
            .iter()
            .filter(|e| e.event_type == EventType::Narrate && e.payload.audio_url.is_none())
            .filter(|e| !e.payload.text_or_empty().trim().is_empty())
            .map(|e| (e.id.as_str(), e.payload.text_or_empty()))
    }
}

// ── Byproducts ─────────────────────────────────────────────────────────────

/// Narration, equations, written text, and diagram labels in emission
/// order, separated by blank lines. Display equations use `$$…$$`, inline
/// ones `$…$`.
pub fn build_content(events: &[TeachingEvent]) -> String {
    let mut parts = Vec::new();
    for event in events {
        let p = &event.payload;
        match event.event_type {
            EventType::Narrate | EventType::WriteText => parts.push(p.text_or_empty().to_owned()),
            EventType::WriteEquation => {
                let latex = p.latex_or_empty();
                if p.display.unwrap_or(true) {
                    parts.push(format!("$${latex}$$"));
                } else {
                    parts.push(format!("${latex}$"));
                }
            }
            ty if ty.is_diagram() => {
                if let Some(label) = p.label.as_deref().filter(|l| !l.is_empty()) {
                    parts.push(label.to_owned());
                }
            }
            _ => {}
        }
    }
    parts.join("\n\n")
}

/// Every narration, space-separated.
pub fn build_narration(events: &[TeachingEvent]) -> String {
    events
        .iter()
        .filter(|e| e.event_type == EventType::Narrate)
        .map(|e| e.payload.text_or_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Non-empty equations as math blocks.
pub fn collect_math_blocks(events: &[TeachingEvent]) -> Vec<MathBlock> {
    events
        .iter()
        .filter(|e| e.event_type == EventType::WriteEquation)
        .filter(|e| !e.payload.latex_or_empty().is_empty())
        .map(|e| MathBlock {
            latex: e.payload.latex_or_empty().to_owned(),
            display: e.payload.display.unwrap_or(true),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_core::Payload;

    fn narrate(id: &str, text: &str) -> TeachingEvent {
        TeachingEvent::new(id, EventType::Narrate, 1500, Payload::default().with_text(text))
    }

    fn equation(id: &str, latex: &str, display: bool) -> TeachingEvent {
        let payload = Payload::default().with_latex(latex, display);
        TeachingEvent::new(id, EventType::WriteEquation, 1200, payload)
    }

    fn events() -> Vec<TeachingEvent> {
        vec![
            TeachingEvent::new("m", EventType::StepMarker, 300, Payload::for_step(1)),
            narrate("n1", "Start here."),
            equation("e1", "x+1=2", true),
            equation("e2", "x", false),
            equation("e3", "", true),
            TeachingEvent::new(
                "d",
                EventType::DrawAxes,
                1300,
                Payload {
                    label: Some("y = x".into()),
                    ..Payload::default()
                },
            ),
            narrate("n2", "Done."),
            TeachingEvent::new("p", EventType::Pause, 1200, Payload::default()),
        ]
    }

    #[test]
    fn content_joins_in_order() {
        assert_eq!(
            build_content(&events()),
            "Start here.\n\n$$x+1=2$$\n\n$x$\n\n$$$$\n\ny = x\n\nDone."
        );
    }

    #[test]
    fn narration_joins_with_spaces() {
        assert_eq!(build_narration(&events()), "Start here. Done.");
    }

    #[test]
    fn math_blocks_skip_empty() {
        let blocks = collect_math_blocks(&events());
        assert_eq!(
            blocks,
            vec![
                MathBlock { latex: "x+1=2".into(), display: true },
                MathBlock { latex: "x".into(), display: false },
            ]
        );
    }

    #[test]
    fn audio_attach_updates_event_and_summary() {
        let mut step = StepScript::new(1, "Solve", events());
        assert!(step.attach_narration_audio("n2", "/audio/b.mp3", 2.5));
        assert!(step.attach_narration_audio("n1", "/audio/a.mp3", 1.25));
        let n1 = step.events.iter().find(|e| e.id == "n1").unwrap();
        assert_eq!(n1.duration_ms, 1250);
        assert_eq!(n1.payload.audio_duration, Some(1.25));
        assert_eq!(step.audio_url.as_deref(), Some("/audio/a.mp3"));
        assert_eq!(step.audio_duration, Some(3.75));
    }

    #[test]
    fn audio_attach_matches_reestimate() {
        let mut step = StepScript::new(1, "Solve", events());
        assert!(step.attach_narration_audio("n1", "/audio/a.mp3", 1.001));
        let n1 = step.events.iter().find(|e| e.id == "n1").unwrap();
        assert_eq!(n1.duration_ms, 1001);
        assert_eq!(
            lectern_core::estimate_duration_ms(n1.event_type, &n1.payload),
            n1.duration_ms
        );
    }

    #[test]
    fn audio_attach_rejects_bad_input() {
        let mut step = StepScript::new(1, "Solve", events());
        let before = step.clone();
        assert!(!step.attach_narration_audio("e1", "/a.mp3", 2.0));
        assert!(!step.attach_narration_audio("n1", "", 2.0));
        assert!(!step.attach_narration_audio("n1", "/a.mp3", 0.0));
        assert!(!step.attach_narration_audio("missing", "/a.mp3", 1.0));
        assert_eq!(step, before);
    }

    #[test]
    fn pending_narrations_listed() {
        let mut step = StepScript::new(1, "Solve", events());
        step.attach_narration_audio("n1", "/a.mp3", 1.0);
        let pending: Vec<_> = step.narrations_without_audio().collect();
        assert_eq!(pending, vec![("n2", "Done.")]);
    }
}
