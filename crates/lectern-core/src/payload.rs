//! The canonical event payload.
//!
//! [`Payload`] is a flat, closed set of optional fields. Absent fields are
//! omitted from the serialized form, so a renderer only ever sees keys that
//! were either supplied by the model (and survived normalization) or filled
//! by the pipeline.

use serde::{Deserialize, Serialize};

use crate::placement::{Anchor, Intent, Lane, SceneTemplate, SlotRole, TeachingPhase, Zone};

// ── Small value types ──────────────────────────────────────────────────────

/// Coarse vertical hint for text placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Top,
    Center,
    Bottom,
}

impl Position {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "center" | "centre" | "middle" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Horizontal alignment of written content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Self::Left),
            "center" | "centre" | "middle" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            _ => None,
        }
    }
}

/// How an `annotate` event marks its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStyle {
    #[default]
    Highlight,
    Underline,
    Circle,
    Box,
}

impl AnnotationStyle {
    /// Unrecognized styles fall back to [`AnnotationStyle::Highlight`].
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "underline" => Self::Underline,
            "circle" => Self::Circle,
            "box" | "rect" | "outline" => Self::Box,
            _ => Self::Highlight,
        }
    }
}

/// Scope of a `clear_section` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearTarget {
    All,
    Zone,
    Lane,
    Id,
}

impl ClearTarget {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" | "board" => Some(Self::All),
            "zone" => Some(Self::Zone),
            "lane" => Some(Self::Lane),
            "id" => Some(Self::Id),
            _ => None,
        }
    }
}

/// One vertex of a plotted curve, in board units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Stroke/fill hints for diagram primitives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
}

impl StrokeStyle {
    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.stroke_width.is_none()
            && self.dashed.is_none()
            && self.fill.is_none()
    }
}

// ── Payload ────────────────────────────────────────────────────────────────

/// Canonical payload carried by every [`TeachingEvent`](crate::TeachingEvent).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payload {
    // Content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_type: Option<AnnotationStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Seconds of recorded narration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration: Option<f64>,

    // Geometry (board units)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<StrokeStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,

    // Placement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<Zone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Anchor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<Lane>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teaching_phase: Option<TeachingPhase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_template: Option<SceneTemplate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_role: Option<SlotRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_chain_id: Option<String>,

    // Layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_page_turn_marker: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_hold_ms: Option<u64>,

    // Clearing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_target: Option<ClearTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_zone: Option<Zone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_id: Option<String>,

    // Chat overlay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Page explicitly requested by the model. Kept apart from `board_page`
    /// so pagination can be recomputed from scratch on every pass.
    #[serde(skip)]
    pub requested_page: Option<u32>,
}

impl Payload {
    /// Payload carrying only the owning step number.
    pub fn for_step(step_number: u32) -> Self {
        Self {
            step_number: Some(step_number),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_latex(mut self, latex: impl Into<String>, display: bool) -> Self {
        self.latex = Some(latex.into());
        self.display = Some(display);
        self
    }

    /// `text`, or the empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// `latex`, or the empty string.
    pub fn latex_or_empty(&self) -> &str {
        self.latex.as_deref().unwrap_or("")
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary == Some(true)
    }

    /// Drop every field the paginator owns.
    pub fn clear_layout(&mut self) {
        self.board_page = None;
        self.slot_index = None;
        self.render_order = None;
        self.layout_locked = None;
        self.is_page_turn_marker = None;
    }
}
