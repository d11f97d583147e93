//! Board policy: every tunable layout constant as data.
//!
//! [`BoardPolicy::default()`] reproduces the constants the rest of the
//! pipeline was tuned against, so an unconfigured run behaves exactly like
//! the built-in tables. With the `policy-config` feature a policy can be
//! loaded from TOML or JSON:
//!
//! ```toml
//! lane_gap = 14.0
//! max_board_page = 8
//!
//! [lane_budgets]
//! given = 168.0
//! derivation = 444.0
//! scratch = 638.0
//! final = 132.0
//! ```
//!
//! ```rust,ignore
//! let policy = BoardPolicy::from_toml_file("lectern-policy.toml")?;
//! ```

#[cfg(feature = "policy-config")]
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::placement::Lane;

/// Vertical budget per lane on one board page, in board units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneBudgets {
    pub given: f64,
    pub derivation: f64,
    pub scratch: f64,
    #[serde(rename = "final")]
    pub final_lane: f64,
}

impl Default for LaneBudgets {
    fn default() -> Self {
        Self {
            given: 168.0,
            derivation: 444.0,
            scratch: 638.0,
            final_lane: 132.0,
        }
    }
}

impl LaneBudgets {
    pub fn get(&self, lane: Lane) -> f64 {
        match lane {
            Lane::Given => self.given,
            Lane::Derivation => self.derivation,
            Lane::Scratch => self.scratch,
            Lane::Final => self.final_lane,
        }
    }
}

/// All layout, clamping, and overlay constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardPolicy {
    /// Virtual board width.
    pub board_width: f64,
    /// Virtual board height.
    pub board_height: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub min_radius: f64,
    pub max_radius: f64,

    /// Highest page index a step may reach.
    pub max_board_page: u32,
    pub lane_budgets: LaneBudgets,
    /// Vertical gap added after every placed event.
    pub lane_gap: f64,
    pub reserve_height_min: f64,
    pub reserve_height_max: f64,

    pub sync_hold_max_ms: u64,
    /// Hold after result/checkpoint content.
    pub sync_hold_result_ms: u64,
    /// Hold after setup content.
    pub sync_hold_setup_ms: u64,
    pub sync_hold_baseline_ms: u64,

    /// Narrations kept per chat overlay.
    pub chat_max_narrations: usize,
    /// Visual and annotation events kept per chat overlay.
    pub chat_max_visuals: usize,
    pub chat_pause_ms: u64,
}

impl Default for BoardPolicy {
    fn default() -> Self {
        Self {
            board_width: 1600.0,
            board_height: 900.0,
            min_width: 40.0,
            min_height: 24.0,
            min_radius: 10.0,
            max_radius: 420.0,
            max_board_page: 8,
            lane_budgets: LaneBudgets::default(),
            lane_gap: 14.0,
            reserve_height_min: 28.0,
            reserve_height_max: 240.0,
            sync_hold_max_ms: 1200,
            sync_hold_result_ms: 650,
            sync_hold_setup_ms: 180,
            sync_hold_baseline_ms: 320,
            chat_max_narrations: 1,
            chat_max_visuals: 4,
            chat_pause_ms: 450,
        }
    }
}

impl BoardPolicy {
    /// Budget of `lane` on one page.
    pub fn lane_budget(&self, lane: Lane) -> f64 {
        self.lane_budgets.get(lane)
    }

    /// Load from a TOML string.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyError> {
        toml::from_str(s).map_err(PolicyError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "policy-config")]
    pub fn from_json_str(s: &str) -> Result<Self, PolicyError> {
        serde_json::from_str(s).map_err(PolicyError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "policy-config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters are within acceptable ranges.
    ///
    /// Returns a list of validation errors. An empty list means the policy
    /// is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.board_width <= 0.0 || self.board_height <= 0.0 {
            errors.push(format!(
                "board must have positive size, got {}x{}",
                self.board_width, self.board_height
            ));
        }
        if self.min_width > self.board_width {
            errors.push(format!(
                "min_width ({}) exceeds board_width ({})",
                self.min_width, self.board_width
            ));
        }
        if self.min_height > self.board_height {
            errors.push(format!(
                "min_height ({}) exceeds board_height ({})",
                self.min_height, self.board_height
            ));
        }
        if self.min_radius <= 0.0 || self.min_radius > self.max_radius {
            errors.push(format!(
                "radius range must satisfy 0 < min <= max, got [{}, {}]",
                self.min_radius, self.max_radius
            ));
        }

        if self.lane_gap < 0.0 {
            errors.push(format!("lane_gap must be >= 0, got {}", self.lane_gap));
        }
        for lane in Lane::ALL {
            let budget = self.lane_budget(lane);
            if budget <= self.lane_gap {
                errors.push(format!(
                    "lane_budgets.{} ({budget}) must exceed lane_gap ({})",
                    lane.as_str(),
                    self.lane_gap
                ));
            }
        }
        if self.reserve_height_min <= 0.0 || self.reserve_height_min > self.reserve_height_max {
            errors.push(format!(
                "reserve height range must satisfy 0 < min <= max, got [{}, {}]",
                self.reserve_height_min, self.reserve_height_max
            ));
        }

        for (name, value) in [
            ("sync_hold_result_ms", self.sync_hold_result_ms),
            ("sync_hold_setup_ms", self.sync_hold_setup_ms),
            ("sync_hold_baseline_ms", self.sync_hold_baseline_ms),
        ] {
            if value > self.sync_hold_max_ms {
                errors.push(format!(
                    "{name} ({value}) exceeds sync_hold_max_ms ({})",
                    self.sync_hold_max_ms
                ));
            }
        }

        if self.chat_max_visuals == 0 {
            errors.push("chat_max_visuals must be > 0".into());
        }

        errors
    }

    /// `self` if [`validate`](Self::validate) reports nothing.
    pub fn validated(self) -> Result<Self, PolicyError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PolicyError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a board policy.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "policy-config")]
    #[error("TOML parse error: {0}")]
    Toml(toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(serde_json::Error),
    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
