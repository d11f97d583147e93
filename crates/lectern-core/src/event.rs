//! Canonical teaching events.
//!
//! A [`TeachingEvent`] is one timed action on the virtual whiteboard. Once the
//! pipeline emits an event its placement is frozen; only a later audio stage
//! may overwrite `duration` and attach an `audio_url`.

use serde::{Deserialize, Serialize};

use crate::payload::Payload;

/// Every action the board renderer knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    StepMarker,
    Narrate,
    WriteEquation,
    WriteText,
    Annotate,
    ClearSection,
    Pause,
    DrawLine,
    DrawArrow,
    DrawRect,
    DrawCircle,
    DrawAxes,
    PlotCurve,
}

impl EventType {
    pub const ALL: [EventType; 13] = [
        EventType::StepMarker,
        EventType::Narrate,
        EventType::WriteEquation,
        EventType::WriteText,
        EventType::Annotate,
        EventType::ClearSection,
        EventType::Pause,
        EventType::DrawLine,
        EventType::DrawArrow,
        EventType::DrawRect,
        EventType::DrawCircle,
        EventType::DrawAxes,
        EventType::PlotCurve,
    ];

    /// Wire name (`snake_case`).
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::StepMarker => "step_marker",
            EventType::Narrate => "narrate",
            EventType::WriteEquation => "write_equation",
            EventType::WriteText => "write_text",
            EventType::Annotate => "annotate",
            EventType::ClearSection => "clear_section",
            EventType::Pause => "pause",
            EventType::DrawLine => "draw_line",
            EventType::DrawArrow => "draw_arrow",
            EventType::DrawRect => "draw_rect",
            EventType::DrawCircle => "draw_circle",
            EventType::DrawAxes => "draw_axes",
            EventType::PlotCurve => "plot_curve",
        }
    }

    /// Parse a model-supplied type name.
    ///
    /// Accepts `snake_case`, `camelCase`, `kebab-case`, and any letter case;
    /// returns `None` for anything else so callers can drop the event.
    pub fn parse(raw: &str) -> Option<Self> {
        let folded: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        EventType::ALL
            .into_iter()
            .find(|ty| ty.as_str().replace('_', "") == folded)
    }

    /// Content placed on the board and budgeted by the paginator.
    pub fn is_board_visual(self) -> bool {
        matches!(
            self,
            EventType::WriteEquation
                | EventType::WriteText
                | EventType::DrawLine
                | EventType::DrawArrow
                | EventType::DrawRect
                | EventType::DrawCircle
                | EventType::DrawAxes
                | EventType::PlotCurve
        )
    }

    /// Diagram and plot primitives (default to the scratch region).
    pub fn is_diagram(self) -> bool {
        matches!(
            self,
            EventType::DrawLine
                | EventType::DrawArrow
                | EventType::DrawRect
                | EventType::DrawCircle
                | EventType::DrawAxes
                | EventType::PlotCurve
        )
    }

    /// Written content that can extend a transform chain.
    pub fn is_written(self) -> bool {
        matches!(self, EventType::WriteEquation | EventType::WriteText)
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One canonical, renderable action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingEvent {
    /// Opaque, collision-resistant id.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Display duration in milliseconds.
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub payload: Payload,
}

impl TeachingEvent {
    pub fn new(
        id: impl Into<String>,
        event_type: EventType,
        duration_ms: u64,
        payload: Payload,
    ) -> Self {
        Self {
            id: id.into(),
            event_type,
            duration_ms,
            payload,
        }
    }

    pub fn is_board_visual(&self) -> bool {
        self.event_type.is_board_visual()
    }

    /// Annotations and emphasis-tagged visuals both draw attention.
    pub fn is_emphasis(&self) -> bool {
        self.event_type == EventType::Annotate
            || (self.is_board_visual()
                && self.payload.intent == Some(crate::placement::Intent::Emphasize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_case_and_separator_variants() {
        assert_eq!(EventType::parse("write_equation"), Some(EventType::WriteEquation));
        assert_eq!(EventType::parse("writeEquation"), Some(EventType::WriteEquation));
        assert_eq!(EventType::parse("PLOT-CURVE"), Some(EventType::PlotCurve));
        assert_eq!(EventType::parse(" narrate "), Some(EventType::Narrate));
        assert_eq!(EventType::parse("dance"), None);
        assert_eq!(EventType::parse(""), None);
    }

    #[test]
    fn wire_names_match_serde() {
        for ty in EventType::ALL {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty.as_str()));
        }
    }

    #[test]
    fn visual_classification() {
        assert!(EventType::WriteText.is_board_visual());
        assert!(EventType::PlotCurve.is_board_visual());
        assert!(EventType::PlotCurve.is_diagram());
        assert!(!EventType::Annotate.is_board_visual());
        assert!(!EventType::Narrate.is_board_visual());
        assert!(EventType::WriteEquation.is_written());
        assert!(!EventType::DrawLine.is_written());
    }

    #[test]
    fn event_serializes_with_type_and_duration_keys() {
        let event = TeachingEvent::new("s1_e1_abc123", EventType::Pause, 1200, Payload::default());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "pause");
        assert_eq!(value["duration"], 1200);
        assert_eq!(value["payload"], serde_json::json!({}));
    }
}
