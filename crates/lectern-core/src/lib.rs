#![forbid(unsafe_code)]

//! Core: the teaching-event model and every pure table the pipeline consults.
//!
//! # Role in Lectern
//! `lectern-core` is the vocabulary layer. It owns the canonical
//! [`TeachingEvent`] shape, the placement enums and their default cascades,
//! the duration and reserve-height estimators, and the [`PayloadBuilder`]
//! that turns loosely-typed model output into a canonical [`Payload`].
//!
//! # Primary responsibilities
//! - **Event model**: [`EventType`], [`TeachingEvent`], [`Payload`].
//! - **Placement**: the zone/anchor/lane bijection and the
//!   intent → phase → template → role defaults ([`placement`]).
//! - **Estimation**: display durations and board heights ([`duration`]).
//! - **Normalization**: field extraction, aliasing, and clamping
//!   ([`builder`]).
//! - **Policy**: every tunable constant in one [`BoardPolicy`].
//!
//! # How it fits in the system
//! `lectern-layout` paginates events built here, and `lectern-lesson`
//! drives the whole step/chat pipeline. Nothing in this crate holds state
//! across calls; every function is a pure transformation.

pub mod builder;
pub mod duration;
pub mod event;
pub mod payload;
pub mod placement;
pub mod policy;

#[cfg(feature = "tracing")]
pub(crate) use tracing::debug;

#[cfg(not(feature = "tracing"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
pub(crate) use debug;

pub use builder::PayloadBuilder;
pub use duration::{estimate_duration_ms, estimate_reserve_height, reserve_height_for};
pub use event::{EventType, TeachingEvent};
pub use payload::{Align, AnnotationStyle, ClearTarget, Payload, Point, Position, StrokeStyle};
pub use placement::{
    Anchor, Intent, Lane, SceneTemplate, SlotRole, TeachingPhase, Zone, resolve_placement,
};
pub use policy::{BoardPolicy, LaneBudgets, PolicyError};
