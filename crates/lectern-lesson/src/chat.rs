//! Ephemeral board overlays for chat answers.
//!
//! A chat answer may sketch on the board, but those sketches must never
//! accumulate on the lesson. The adapter confines them to the scratch lane,
//! caps how much is drawn, tags everything with one `group_id`, and appends
//! cleanup events that remove each mark in reverse order.

use lectern_core::duration::{CLEAR_SECTION_MS, estimate_duration_ms};
use lectern_core::{
    Anchor, BoardPolicy, ClearTarget, EventType, Intent, Lane, Payload, PayloadBuilder,
    TeachingEvent, Zone, resolve_placement,
};
use lectern_layout::paginate_events;
use serde_json::Value;
use tracing::{debug, debug_span, warn};

use crate::ids::EventIds;

/// What the adapter discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayReport {
    /// Step markers and pauses, which have no meaning in chat.
    pub structural_dropped: usize,
    pub unknown_dropped: usize,
    /// Entries that were not JSON objects.
    pub malformed_dropped: usize,
    /// Narrations over the cap.
    pub narrations_capped: usize,
    /// Visual and annotation events over the cap.
    pub visuals_capped: usize,
}

impl OverlayReport {
    pub fn total(&self) -> usize {
        self.structural_dropped
            + self.unknown_dropped
            + self.malformed_dropped
            + self.narrations_capped
            + self.visuals_capped
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }
}

/// An adapted overlay, ready to attach to a chat response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOverlay {
    /// Shared by every event; empty when there are no events.
    pub group_id: String,
    pub events: Vec<TeachingEvent>,
    pub report: OverlayReport,
}

/// Restricted pipeline for chat-originated events.
#[derive(Debug, Clone, Copy)]
pub struct ChatOverlayAdapter<'a> {
    policy: &'a BoardPolicy,
}

impl<'a> ChatOverlayAdapter<'a> {
    pub fn new(policy: &'a BoardPolicy) -> Self {
        Self { policy }
    }

    pub fn adapt(&self, raw_events: &[Value], ids: &mut EventIds) -> ChatOverlay {
        let _span = debug_span!("lectern.chat_overlay", raw = raw_events.len());
        let _guard = _span.enter();

        let policy = self.policy;
        let builder = PayloadBuilder::new(policy);
        let group_id = ids.chat_group();
        let mut report = OverlayReport::default();
        let mut events: Vec<TeachingEvent> = Vec::new();
        let mut narrations = 0;
        let mut marks = 0;

        for (index, raw) in raw_events.iter().enumerate() {
            let Some(obj) = raw.as_object() else {
                warn!(index, "dropping non-object chat event");
                report.malformed_dropped += 1;
                continue;
            };
            let event_type = match obj.get("type").and_then(Value::as_str) {
                None => EventType::Narrate,
                Some(name) => match EventType::parse(name) {
                    Some(ty) => ty,
                    None => {
                        warn!(event_type = name, "dropping unknown chat event type");
                        report.unknown_dropped += 1;
                        continue;
                    }
                },
            };

            match event_type {
                EventType::StepMarker | EventType::Pause => {
                    report.structural_dropped += 1;
                    continue;
                }
                EventType::Narrate if narrations >= policy.chat_max_narrations => {
                    report.narrations_capped += 1;
                    continue;
                }
                EventType::Narrate => narrations += 1,
                ty if is_mark(ty) && marks >= policy.chat_max_visuals => {
                    report.visuals_capped += 1;
                    continue;
                }
                ty if is_mark(ty) => marks += 1,
                _ => {}
            }

            let mut payload = builder.build(event_type, raw);
            if event_type.is_board_visual() {
                payload.zone = Some(Zone::Scratch);
                payload.anchor = Some(Anchor::Scratch);
                payload.lane = Some(Lane::Scratch);
                payload.intent.get_or_insert(Intent::SideNote);
            }
            if event_type == EventType::Annotate && payload.target_id.is_none() {
                payload.target_id = match obj.get("target").and_then(Value::as_str) {
                    Some(t) if !t.is_empty() && t != "previous" => Some(t.to_owned()),
                    _ => events
                        .iter()
                        .rev()
                        .find(|e| e.is_board_visual())
                        .map(|e| e.id.clone()),
                };
            }
            payload.temporary = Some(true);
            payload.group_id = Some(group_id.clone());
            resolve_placement(event_type, &mut payload, policy);

            let duration = estimate_duration_ms(event_type, &payload);
            let id = ids.chat_event(events.len() + 1);
            events.push(TeachingEvent::new(id, event_type, duration, payload));
        }

        if events.is_empty() {
            return ChatOverlay {
                group_id: String::new(),
                events,
                report,
            };
        }

        // Cleanup, newest mark first.
        let mark_ids: Vec<String> = events
            .iter()
            .filter(|e| is_mark(e.event_type))
            .map(|e| e.id.clone())
            .collect();
        for target in mark_ids.into_iter().rev() {
            let payload = Payload {
                clear_target: Some(ClearTarget::Id),
                clear_id: Some(target),
                temporary: Some(true),
                group_id: Some(group_id.clone()),
                ..Payload::default()
            };
            let id = ids.chat_event(events.len() + 1);
            events.push(TeachingEvent::new(
                id,
                EventType::ClearSection,
                CLEAR_SECTION_MS,
                payload,
            ));
        }
        let pause = Payload {
            temporary: Some(true),
            group_id: Some(group_id.clone()),
            ..Payload::default()
        };
        let id = ids.chat_event(events.len() + 1);
        events.push(TeachingEvent::new(id, EventType::Pause, policy.chat_pause_ms, pause));

        paginate_events(&mut events, 0, policy);
        if !report.is_clean() {
            debug!(?report, kept = events.len(), "chat overlay trimmed");
        }
        ChatOverlay {
            group_id,
            events,
            report,
        }
    }
}

/// Events counted against the visual cap and cleaned up afterwards.
fn is_mark(event_type: EventType) -> bool {
    event_type.is_board_visual() || event_type == EventType::Annotate
}
