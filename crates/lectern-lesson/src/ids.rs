//! Event id generation.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Source of short random suffixes for event ids.
///
/// Ids look like `s{step}_e{index}_{6 hex}` for lesson steps and
/// `chat_e{index}_{6 hex}` for chat overlays. Seed it for reproducible
/// output.
#[derive(Debug, Clone)]
pub struct EventIds {
    rng: SmallRng,
}

impl Default for EventIds {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIds {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    fn hex6(&mut self) -> String {
        format!("{:06x}", self.rng.random::<u32>() & 0x00ff_ffff)
    }

    pub fn step_event(&mut self, step_number: u32, index: usize) -> String {
        format!("s{step_number}_e{index}_{}", self.hex6())
    }

    pub fn chat_event(&mut self, index: usize) -> String {
        format!("chat_e{index}_{}", self.hex6())
    }

    /// Shared group id for one chat overlay.
    pub fn chat_group(&mut self) -> String {
        format!("chat_overlay_{:08x}", self.rng.random::<u32>())
    }

    /// A step event id not already present in `taken`.
    pub fn unique_step_event<'a>(
        &mut self,
        step_number: u32,
        index: usize,
        taken: impl Iterator<Item = &'a str> + Clone,
    ) -> String {
        loop {
            let id = self.step_event(step_number, index);
            if !taken.clone().any(|t| t == id) {
                return id;
            }
        }
    }
}
