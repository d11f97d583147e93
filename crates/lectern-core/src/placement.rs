//! Placement vocabulary and the default-resolution cascade.
//!
//! The board is divided into four semantic regions. Three naming schemes
//! exist for them ([`Zone`], [`Anchor`], [`Lane`]); they are tied together by
//! a fixed bijection:
//!
//! | zone      | anchor    | lane         |
//! |-----------|-----------|--------------|
//! | `given`   | `given`   | `given`      |
//! | `main`    | `work`    | `derivation` |
//! | `scratch` | `scratch` | `scratch`    |
//! | `final`   | `final`   | `final`      |
//!
//! [`resolve_placement`] completes a partially supplied tuple. The anchor is
//! the pivot: every other field is derived from it, and only missing fields
//! are filled.

use serde::{Deserialize, Serialize};

use crate::event::EventType;
use crate::payload::Payload;
use crate::policy::BoardPolicy;

// ── Regions ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Given,
    Main,
    Scratch,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    Given,
    Work,
    Scratch,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Given,
    Derivation,
    Scratch,
    Final,
}

/// Fold a raw region name from any of the three schemes to its anchor.
fn region_anchor(raw: &str) -> Option<Anchor> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "given" => Some(Anchor::Given),
        "main" | "work" | "derivation" => Some(Anchor::Work),
        "scratch" => Some(Anchor::Scratch),
        "final" => Some(Anchor::Final),
        _ => None,
    }
}

impl Zone {
    /// Parse a zone name; anchor and lane names are accepted as synonyms.
    pub fn parse(raw: &str) -> Option<Self> {
        region_anchor(raw).map(Anchor::zone)
    }

    pub fn anchor(self) -> Anchor {
        match self {
            Zone::Given => Anchor::Given,
            Zone::Main => Anchor::Work,
            Zone::Scratch => Anchor::Scratch,
            Zone::Final => Anchor::Final,
        }
    }
}

impl Anchor {
    pub const ALL: [Anchor; 4] = [Anchor::Given, Anchor::Work, Anchor::Scratch, Anchor::Final];

    /// Parse an anchor name; zone and lane names are accepted as synonyms.
    pub fn parse(raw: &str) -> Option<Self> {
        region_anchor(raw)
    }

    pub fn zone(self) -> Zone {
        match self {
            Anchor::Given => Zone::Given,
            Anchor::Work => Zone::Main,
            Anchor::Scratch => Zone::Scratch,
            Anchor::Final => Zone::Final,
        }
    }

    pub fn lane(self) -> Lane {
        match self {
            Anchor::Given => Lane::Given,
            Anchor::Work => Lane::Derivation,
            Anchor::Scratch => Lane::Scratch,
            Anchor::Final => Lane::Final,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::Given => "given",
            Anchor::Work => "work",
            Anchor::Scratch => "scratch",
            Anchor::Final => "final",
        }
    }
}

impl Lane {
    pub const ALL: [Lane; 4] = [Lane::Given, Lane::Derivation, Lane::Scratch, Lane::Final];

    /// Parse a lane name; zone and anchor names are accepted as synonyms.
    pub fn parse(raw: &str) -> Option<Self> {
        region_anchor(raw).map(Anchor::lane)
    }

    pub fn anchor(self) -> Anchor {
        match self {
            Lane::Given => Anchor::Given,
            Lane::Derivation => Anchor::Work,
            Lane::Scratch => Anchor::Scratch,
            Lane::Final => Anchor::Final,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Given => "given",
            Lane::Derivation => "derivation",
            Lane::Scratch => "scratch",
            Lane::Final => "final",
        }
    }

    /// Dense index for per-lane arrays.
    pub fn index(self) -> usize {
        match self {
            Lane::Given => 0,
            Lane::Derivation => 1,
            Lane::Scratch => 2,
            Lane::Final => 3,
        }
    }
}

// ── Pedagogy ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Introduce,
    Derive,
    Emphasize,
    Result,
    SideNote,
}

impl Intent {
    pub fn parse(raw: &str) -> Option<Self> {
        match fold(raw).as_str() {
            "introduce" => Some(Self::Introduce),
            "derive" => Some(Self::Derive),
            "emphasize" | "emphasise" => Some(Self::Emphasize),
            "result" => Some(Self::Result),
            "sidenote" => Some(Self::SideNote),
            _ => None,
        }
    }

    pub fn default_for(anchor: Anchor) -> Self {
        match anchor {
            Anchor::Given => Intent::Introduce,
            Anchor::Final => Intent::Result,
            Anchor::Scratch => Intent::SideNote,
            Anchor::Work => Intent::Derive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingPhase {
    Setup,
    Derive,
    Checkpoint,
    Result,
}

impl TeachingPhase {
    pub fn parse(raw: &str) -> Option<Self> {
        match fold(raw).as_str() {
            "setup" => Some(Self::Setup),
            "derive" => Some(Self::Derive),
            "checkpoint" => Some(Self::Checkpoint),
            "result" => Some(Self::Result),
            _ => None,
        }
    }

    pub fn default_for(intent: Intent) -> Self {
        match intent {
            Intent::Introduce => TeachingPhase::Setup,
            Intent::Result => TeachingPhase::Result,
            Intent::Emphasize => TeachingPhase::Checkpoint,
            Intent::Derive | Intent::SideNote => TeachingPhase::Derive,
        }
    }

    /// Keyword heuristic for narration text.
    ///
    /// Words are matched by prefix, so "Noticing" counts as "notice" and
    /// "Finally" as "final".
    pub fn infer_from_text(text: &str) -> Self {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        let has = |stems: &[&str]| words.iter().any(|w| stems.iter().any(|s| w.starts_with(s)));
        if has(&["notice", "check"]) {
            TeachingPhase::Checkpoint
        } else if has(&["final", "answer"]) {
            TeachingPhase::Result
        } else if has(&["first", "given"]) {
            TeachingPhase::Setup
        } else {
            TeachingPhase::Derive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneTemplate {
    GivenIntro,
    DeriveChain,
    ScratchNote,
    FinalResult,
}

impl SceneTemplate {
    pub fn parse(raw: &str) -> Option<Self> {
        match fold(raw).as_str() {
            "givenintro" => Some(Self::GivenIntro),
            "derivechain" => Some(Self::DeriveChain),
            "scratchnote" => Some(Self::ScratchNote),
            "finalresult" => Some(Self::FinalResult),
            _ => None,
        }
    }

    pub fn default_for(anchor: Anchor) -> Self {
        match anchor {
            Anchor::Given => SceneTemplate::GivenIntro,
            Anchor::Work => SceneTemplate::DeriveChain,
            Anchor::Scratch => SceneTemplate::ScratchNote,
            Anchor::Final => SceneTemplate::FinalResult,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    Heading,
    Equation,
    Explanation,
    Result,
}

impl SlotRole {
    pub fn parse(raw: &str) -> Option<Self> {
        match fold(raw).as_str() {
            "heading" => Some(Self::Heading),
            "equation" => Some(Self::Equation),
            "explanation" => Some(Self::Explanation),
            "result" => Some(Self::Result),
            _ => None,
        }
    }
}

/// Lowercase and drop separators so `side_note`, `sideNote` and `side-note`
/// compare equal.
fn fold(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_heading_text(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.ends_with(':')
        || Lane::ALL
            .iter()
            .any(|lane| trimmed.eq_ignore_ascii_case(lane.as_str()))
}

/// Default `sync_hold_ms` once phase and intent are known.
pub fn default_sync_hold(
    phase: Option<TeachingPhase>,
    intent: Option<Intent>,
    policy: &BoardPolicy,
) -> u64 {
    match (phase, intent) {
        (Some(TeachingPhase::Result | TeachingPhase::Checkpoint), _)
        | (_, Some(Intent::Result | Intent::Emphasize)) => policy.sync_hold_result_ms,
        (Some(TeachingPhase::Setup), _) | (_, Some(Intent::Introduce)) => policy.sync_hold_setup_ms,
        _ => policy.sync_hold_baseline_ms,
    }
}

/// Default region when the model supplied none.
pub fn default_anchor(event_type: EventType) -> Anchor {
    if event_type.is_diagram() {
        Anchor::Scratch
    } else {
        Anchor::Work
    }
}

// ── Resolver ───────────────────────────────────────────────────────────────

/// Complete the placement tuple of a board-visual event in place.
///
/// Non-visual events are left untouched. Supplied values are kept, except
/// that zone, anchor and lane are forced back onto the bijection when the
/// model supplied a conflicting combination (lane wins over anchor, anchor
/// over zone).
pub fn resolve_placement(event_type: EventType, payload: &mut Payload, policy: &BoardPolicy) {
    if !event_type.is_board_visual() {
        return;
    }

    let anchor = payload
        .lane
        .map(Lane::anchor)
        .or(payload.anchor)
        .or(payload.zone.map(Zone::anchor))
        .unwrap_or_else(|| default_anchor(event_type));

    let zone = anchor.zone();
    let lane = anchor.lane();
    if payload.zone.is_some_and(|z| z != zone)
        || payload.anchor.is_some_and(|a| a != anchor)
        || payload.lane.is_some_and(|l| l != lane)
    {
        crate::debug!(
            event_type = %event_type,
            zone = ?payload.zone,
            anchor = ?payload.anchor,
            lane = ?payload.lane,
            resolved = anchor.as_str(),
            "placement conflict; realigned to anchor"
        );
    }
    payload.zone = Some(zone);
    payload.anchor = Some(anchor);
    payload.lane = Some(lane);

    let intent = *payload.intent.get_or_insert(Intent::default_for(anchor));
    let phase = *payload
        .teaching_phase
        .get_or_insert(TeachingPhase::default_for(intent));
    payload
        .scene_template
        .get_or_insert(SceneTemplate::default_for(anchor));

    if payload.slot_role.is_none() {
        let role = if anchor == Anchor::Final || intent == Intent::Result {
            SlotRole::Result
        } else {
            match event_type {
                EventType::WriteEquation => SlotRole::Equation,
                EventType::WriteText if is_heading_text(payload.text_or_empty()) => {
                    SlotRole::Heading
                }
                _ => SlotRole::Explanation,
            }
        };
        payload.slot_role = Some(role);
    }

    if payload.scene_id.is_none() {
        payload.scene_id = Some(match &payload.transform_chain_id {
            Some(chain) => chain.clone(),
            None => default_scene_id(lane, anchor),
        });
    }

    payload
        .sync_hold_ms
        .get_or_insert(default_sync_hold(Some(phase), Some(intent), policy));
}

/// `"{lane}-{anchor}"`, the scene id used outside a transform chain.
pub fn default_scene_id(lane: Lane, anchor: Anchor) -> String {
    format!("{}-{}", lane.as_str(), anchor.as_str())
}
