//! The chain-linking and pagination pass.

use lectern_core::placement::default_scene_id;
use lectern_core::{
    BoardPolicy, EventType, Lane, TeachingEvent, reserve_height_for, resolve_placement,
};
use tracing::debug;

use crate::state::BoardLayoutState;

/// Summary of one pagination pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutReport {
    /// Board-visual events placed.
    pub placed: usize,
    /// Page turns, including explicit jumps to a different page.
    pub page_turns: u32,
    /// Page the step ended on.
    pub final_page: u32,
    /// Distinct transform-chain ids in emission order.
    pub chains: Vec<String>,
}

/// Assign page, slot, render order, and chain ids to every event of one
/// step, in emission order.
///
/// Layout fields written by an earlier pass are discarded first, so the
/// pass is idempotent. Events whose placement is incomplete are resolved on
/// the way through.
pub fn paginate_events(
    events: &mut [TeachingEvent],
    step_number: u32,
    policy: &BoardPolicy,
) -> LayoutReport {
    let mut state = BoardLayoutState::new(step_number);
    for chain in events
        .iter()
        .filter_map(|e| e.payload.transform_chain_id.as_deref())
    {
        state.reserve_chain(chain);
    }

    let mut report = LayoutReport::default();
    for event in events.iter_mut() {
        event.payload.clear_layout();
        match event.event_type {
            ty if ty.is_board_visual() => {
                place_visual(event, &mut state, policy, &mut report);
            }
            EventType::ClearSection | EventType::Annotate => {
                event.payload.board_page = Some(state.page());
            }
            _ => {}
        }
    }

    report.page_turns = state.page_turns();
    report.final_page = state.page();
    report
}

fn place_visual(
    event: &mut TeachingEvent,
    state: &mut BoardLayoutState,
    policy: &BoardPolicy,
    report: &mut LayoutReport,
) {
    resolve_placement(event.event_type, &mut event.payload, policy);
    let lane = event.payload.lane.unwrap_or(Lane::Derivation);
    let payload = &mut event.payload;

    // ── Chain ──
    if lane == Lane::Derivation && event.event_type.is_written() {
        let chain = state.link_chain(payload.transform_chain_id.as_deref());
        let default_scene = default_scene_id(lane, lane.anchor());
        if payload.scene_id.as_deref().is_none_or(|s| s == default_scene) {
            payload.scene_id = Some(chain.clone());
        }
        if !report.chains.contains(&chain) {
            report.chains.push(chain.clone());
        }
        payload.transform_chain_id = Some(chain);
    } else {
        state.close_chain();
    }

    // ── Page ──
    let budget = policy.lane_budget(lane);
    let height = reserve_height_for(event.event_type, payload, policy)
        .min((budget - policy.lane_gap).max(0.0));
    payload.reserve_height = Some(height);

    let turned = if let Some(page) = payload.requested_page {
        state.jump_to(page, policy)
    } else if !state.fits(lane, height, policy) {
        let cursor = state.cursor(lane);
        state.turn_page(policy);
        debug!(
            event_id = %event.id,
            lane = lane.as_str(),
            cursor,
            height,
            page = state.page(),
            "lane overflow; turning page"
        );
        true
    } else {
        false
    };
    if turned {
        payload.is_page_turn_marker = Some(true);
    }

    // ── Slot ──
    let (slot, order) = state.claim(lane, height, policy);
    payload.board_page = Some(state.page());
    payload.slot_index = Some(slot);
    payload.render_order = Some(order);
    payload.layout_locked = Some(true);
    report.placed += 1;
}
