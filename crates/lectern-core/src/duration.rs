//! Display-duration and board-height estimates.
//!
//! Both models are closed-form. Durations are used until real narration
//! audio replaces them; reserve heights drive pagination.

use crate::event::EventType;
use crate::payload::Payload;
use crate::policy::BoardPolicy;

pub const STEP_MARKER_MS: u64 = 300;
pub const ANNOTATE_MS: u64 = 600;
pub const CLEAR_SECTION_MS: u64 = 400;
pub const PAUSE_MS: u64 = 1200;

const NARRATE_MIN_MS: u64 = 1500;
/// 150 words per minute.
const MS_PER_WORD: u64 = 400;
const EQUATION_MIN_MS: u64 = 1200;
const EQUATION_MS_PER_CHAR: u64 = 50;
const TEXT_MIN_MS: u64 = 800;
const TEXT_MS_PER_CHAR: u64 = 30;
const LINE_MS: u64 = 900;
const SHAPE_MS: u64 = 1000;
const AXES_MS: u64 = 1300;
const PLOT_MIN_MS: u64 = 1000;
const PLOT_BASE_MS: u64 = 450;
const PLOT_MS_PER_POINT: u64 = 80;

/// Estimated display duration in milliseconds.
///
/// For a narration with recorded audio, a positive `audio_duration`
/// (seconds) wins over the word-count estimate.
pub fn estimate_duration_ms(event_type: EventType, payload: &Payload) -> u64 {
    if event_type == EventType::Narrate {
        if let Some(ms) = payload.audio_duration.and_then(audio_ms) {
            return ms;
        }
    }
    match event_type {
        EventType::StepMarker => STEP_MARKER_MS,
        EventType::Narrate => {
            let words = payload.text_or_empty().split_whitespace().count() as u64;
            (words * MS_PER_WORD).max(NARRATE_MIN_MS)
        }
        EventType::WriteEquation => {
            let len = payload.latex_or_empty().chars().count() as u64;
            (len * EQUATION_MS_PER_CHAR).max(EQUATION_MIN_MS)
        }
        EventType::WriteText => {
            let len = payload.text_or_empty().chars().count() as u64;
            (len * TEXT_MS_PER_CHAR).max(TEXT_MIN_MS)
        }
        EventType::Annotate => ANNOTATE_MS,
        EventType::ClearSection => CLEAR_SECTION_MS,
        EventType::Pause => PAUSE_MS,
        EventType::DrawLine | EventType::DrawArrow => LINE_MS,
        EventType::DrawRect | EventType::DrawCircle => SHAPE_MS,
        EventType::DrawAxes => AXES_MS,
        EventType::PlotCurve => {
            let points = payload.points.as_ref().map_or(0, Vec::len) as u64;
            (PLOT_BASE_MS + points * PLOT_MS_PER_POINT).max(PLOT_MIN_MS)
        }
    }
}

/// Seconds of recorded audio → whole milliseconds, rounded.
pub fn audio_ms(seconds: f64) -> Option<u64> {
    (seconds.is_finite() && seconds > 0.0).then(|| (seconds * 1000.0).round() as u64)
}

// ── Reserve height ─────────────────────────────────────────────────────────

const EQUATION_MIN_HEIGHT: f64 = 56.0;
const EQUATION_MAX_HEIGHT: f64 = 150.0;
const TEXT_CHARS_PER_LINE: usize = 48;
const TEXT_FIRST_LINE: f64 = 34.0;
const TEXT_LINE_HEIGHT: f64 = 28.0;
const TEXT_MAX_HEIGHT: f64 = 90.0;
const LINE_HEIGHT: f64 = 64.0;
const SHAPE_HEIGHT: f64 = 96.0;
const PLOT_HEIGHT: f64 = 220.0;

const LATEX_OPERATORS: [&str; 7] = [
    "\\cdot", "\\times", "\\pm", "\\le", "\\ge", "\\neq", "\\approx",
];

/// `length*0.55 + operators*5 + radicals*8 + fractions*10`.
pub fn latex_complexity_score(latex: &str) -> f64 {
    let length = latex.chars().count() as f64;
    let symbol_ops = latex.chars().filter(|c| "+-*/=<>^_".contains(*c)).count();
    let command_ops: usize = LATEX_OPERATORS.iter().map(|op| latex.matches(op).count()).sum();
    let radicals = latex.matches("\\sqrt").count();
    let fractions = latex.matches("frac{").count();
    length * 0.55
        + (symbol_ops + command_ops) as f64 * 5.0
        + radicals as f64 * 8.0
        + fractions as f64 * 10.0
}

/// Estimated vertical footprint on the board, or `None` for events that
/// take no board space.
pub fn estimate_reserve_height(event_type: EventType, payload: &Payload) -> Option<f64> {
    let height = match event_type {
        EventType::WriteEquation => latex_complexity_score(payload.latex_or_empty())
            .clamp(EQUATION_MIN_HEIGHT, EQUATION_MAX_HEIGHT),
        EventType::WriteText => {
            let chars = payload.text_or_empty().chars().count();
            let lines = chars.div_ceil(TEXT_CHARS_PER_LINE).max(1);
            (TEXT_FIRST_LINE + (lines - 1) as f64 * TEXT_LINE_HEIGHT)
                .clamp(TEXT_FIRST_LINE, TEXT_MAX_HEIGHT)
        }
        EventType::DrawLine | EventType::DrawArrow => LINE_HEIGHT,
        EventType::DrawRect | EventType::DrawCircle => SHAPE_HEIGHT,
        EventType::DrawAxes | EventType::PlotCurve => PLOT_HEIGHT,
        _ => return None,
    };
    Some(height)
}

/// The payload's own `reserve_height` if set, else the estimate, clamped to
/// the policy range.
pub fn reserve_height_for(event_type: EventType, payload: &Payload, policy: &BoardPolicy) -> f64 {
    payload
        .reserve_height
        .or_else(|| estimate_reserve_height(event_type, payload))
        .unwrap_or(policy.reserve_height_min)
        .clamp(policy.reserve_height_min, policy.reserve_height_max)
}
