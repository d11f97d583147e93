//! Per-invocation layout cursor.

use lectern_core::{BoardPolicy, Lane};
use rustc_hash::FxHashSet;

/// Layout state for one step or one chat turn.
///
/// Created fresh for every pagination pass and dropped afterwards; nothing
/// carries over between steps.
#[derive(Debug, Clone)]
pub struct BoardLayoutState {
    step_number: u32,
    /// Height consumed per lane on the current page.
    cursors: [f64; 4],
    /// Next slot index per lane on the current page.
    slots: [u32; 4],
    page: u32,
    open_chain: Option<String>,
    next_render_order: u32,
    /// Chain ids already taken in this step, supplied or generated.
    used_chains: FxHashSet<String>,
    page_turns: u32,
}

impl BoardLayoutState {
    pub const BASELINE: f64 = 0.0;

    pub fn new(step_number: u32) -> Self {
        Self {
            step_number,
            cursors: [Self::BASELINE; 4],
            slots: [0; 4],
            page: 0,
            open_chain: None,
            next_render_order: 0,
            used_chains: FxHashSet::default(),
            page_turns: 0,
        }
    }

    pub fn step_number(&self) -> u32 {
        self.step_number
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn cursor(&self, lane: Lane) -> f64 {
        self.cursors[lane.index()]
    }

    pub fn slot(&self, lane: Lane) -> u32 {
        self.slots[lane.index()]
    }

    pub fn open_chain(&self) -> Option<&str> {
        self.open_chain.as_deref()
    }

    pub fn page_turns(&self) -> u32 {
        self.page_turns
    }

    /// Whether `height` (plus the gap) fits in `lane` on the current page.
    ///
    /// An empty lane always fits; the caller caps heights to the budget.
    pub fn fits(&self, lane: Lane, height: f64, policy: &BoardPolicy) -> bool {
        let cursor = self.cursor(lane);
        cursor <= Self::BASELINE || cursor + height + policy.lane_gap <= policy.lane_budget(lane)
    }

    /// Advance to the next page (saturating at the policy maximum) and
    /// reset every lane.
    pub fn turn_page(&mut self, policy: &BoardPolicy) {
        self.page = (self.page + 1).min(policy.max_board_page);
        self.page_turns += 1;
        self.reset_lanes();
    }

    /// Jump to an explicit page and reset every lane. Returns whether the
    /// page actually changed.
    pub fn jump_to(&mut self, page: u32, policy: &BoardPolicy) -> bool {
        let page = page.min(policy.max_board_page);
        let changed = page != self.page;
        self.page = page;
        if changed {
            self.page_turns += 1;
        }
        self.reset_lanes();
        changed
    }

    fn reset_lanes(&mut self) {
        self.cursors = [Self::BASELINE; 4];
        self.slots = [0; 4];
    }

    /// Claim the next slot in `lane`, consuming `height + gap`.
    ///
    /// Returns `(slot_index, render_order)`.
    pub fn claim(&mut self, lane: Lane, height: f64, policy: &BoardPolicy) -> (u32, u32) {
        let i = lane.index();
        let slot = self.slots[i];
        self.slots[i] += 1;
        self.cursors[i] += height + policy.lane_gap;
        let order = self.next_render_order;
        self.next_render_order += 1;
        (slot, order)
    }

    /// Mark a chain id as taken without opening it.
    pub fn reserve_chain(&mut self, chain: &str) {
        self.used_chains.insert(chain.to_owned());
    }

    /// Continue the open chain, or open `supplied` / a fresh one.
    ///
    /// A supplied id always wins and becomes the open chain.
    pub fn link_chain(&mut self, supplied: Option<&str>) -> String {
        let chain = match (supplied, &self.open_chain) {
            (Some(id), _) => id.to_owned(),
            (None, Some(open)) => open.clone(),
            (None, None) => self.fresh_chain_id(),
        };
        self.used_chains.insert(chain.clone());
        self.open_chain = Some(chain.clone());
        chain
    }

    pub fn close_chain(&mut self) {
        self.open_chain = None;
    }

    /// `step_chain_{n}`, then `step_chain_{n}_2`, `_3`, ... skipping taken ids.
    fn fresh_chain_id(&self) -> String {
        let base = format!("step_chain_{}", self.step_number);
        if !self.used_chains.contains(&base) {
            return base;
        }
        (2u32..)
            .map(|k| format!("{base}_{k}"))
            .find(|candidate| !self.used_chains.contains(candidate))
            .unwrap_or(base)
    }
}
