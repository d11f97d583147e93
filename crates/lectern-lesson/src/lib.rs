#![forbid(unsafe_code)]

//! Lesson pipeline: model output → playable whiteboard steps.
//!
//! # Role in Lectern
//! `lectern-lesson` sits on top of [`lectern_core`] (event model, payload
//! normalization, placement, timing) and [`lectern_layout`] (pagination and
//! chains). It takes the loosely structured JSON a language model returns
//! and produces steps a player can run without further checks:
//!
//! - [`LessonPipeline::process_step`] normalizes raw events, or synthesizes
//!   them from legacy `content`/`math_blocks`, then repairs and paginates.
//! - [`StepRepairer`] guarantees the minimum choreography of a step.
//! - [`ChatOverlayAdapter`] turns chat-answer events into a temporary,
//!   self-cleaning scratch overlay.
//! - [`LessonPipeline::parse_lesson_response`] and
//!   [`LessonPipeline::parse_chat_response`] handle whole responses,
//!   including Markdown code fences.
//!
//! Individual events never fail; they are defaulted or dropped and the
//! drop is counted in a report. Only unusable responses surface as
//! [`LessonError`].

pub mod chat;
pub mod error;
pub mod ids;
pub mod pipeline;
pub mod repair;
pub mod response;
pub mod step;

pub use chat::{ChatOverlay, ChatOverlayAdapter, OverlayReport};
pub use error::{LessonError, Result};
pub use ids::EventIds;
pub use pipeline::{LessonPipeline, NormalizationReport, StepOutcome};
pub use repair::{RepairReport, StepRepairer};
pub use response::{ChatTurn, Lesson, strip_code_fence};
pub use step::{MathBlock, StepScript};
