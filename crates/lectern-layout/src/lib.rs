#![forbid(unsafe_code)]

//! Board layout: pagination and transform-chain linking.
//!
//! # Role in Lectern
//! Every board-visual event needs a page, a slot within its lane, a render
//! order, and (for derivation work) the id of the algebraic chain it extends.
//! This crate computes all four in one ordered pass over a step's events.
//!
//! # Model
//! Each of the four lanes has a fixed vertical budget per page
//! ([`BoardPolicy::lane_budgets`](lectern_core::BoardPolicy)). Placing an
//! event consumes `reserve_height + gap` from its lane. When an event would
//! overflow a lane that already holds content, the board turns to a fresh
//! page and every lane restarts from baseline.
//!
//! The pass is a pure function of the event list: it discards any layout
//! fields a previous pass wrote before recomputing them, so paginating an
//! already-paginated list changes nothing.

pub mod paginate;
pub mod state;

pub use paginate::{LayoutReport, paginate_events};
pub use state::BoardLayoutState;
