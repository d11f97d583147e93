//! Raw model output → canonical [`Payload`].
//!
//! The builder does extraction only: it looks each recognized key up under
//! its `snake_case` and `camelCase` spellings, coerces the value to the
//! canonical type, and clamps it to the board. It infers nothing; placement
//! defaults, durations, and layout are filled by later passes.
//!
//! `audio_url` and `audio_duration` are never read from model output; they
//! are set only once recorded narration audio exists.
//!
//! Coercion is lenient. Numbers may arrive as JSON strings (`"12.5"`),
//! booleans as `"true"`/`"yes"`/`1`. Anything that does not coerce is
//! dropped without error.

use serde_json::{Map, Value};

use crate::event::EventType;
use crate::payload::{Align, AnnotationStyle, ClearTarget, Payload, Point, Position, StrokeStyle};
use crate::placement::{Anchor, Intent, Lane, SceneTemplate, SlotRole, TeachingPhase, Zone};
use crate::policy::BoardPolicy;

/// Horizontal coordinates, clamped to the board width.
const X_KEYS: [&str; 4] = ["x", "x1", "x2", "cx"];
/// Vertical coordinates, clamped to the board height.
const Y_KEYS: [&str; 4] = ["y", "y1", "y2", "cy"];

/// Extracts canonical payloads against one [`BoardPolicy`].
#[derive(Debug, Clone, Copy)]
pub struct PayloadBuilder<'a> {
    policy: &'a BoardPolicy,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(policy: &'a BoardPolicy) -> Self {
        Self { policy }
    }

    /// Build the payload for one raw event record.
    ///
    /// A non-object `raw` yields the type's bare defaults.
    pub fn build(&self, event_type: EventType, raw: &Value) -> Payload {
        let empty = Map::new();
        let fields = Fields(raw.as_object().unwrap_or(&empty));
        let policy = self.policy;
        let mut p = Payload::default();

        // ── Content ──
        p.text = fields.string("text");
        p.latex = fields.string("latex");
        p.display = fields.boolean("display");
        p.position = fields.str("position").and_then(Position::parse);
        p.align = fields.str("align").and_then(Align::parse);
        p.target_id = fields.string("target_id");
        p.label = fields.string("label");
        p.x_label = fields.string("x_label");
        p.y_label = fields.string("y_label");

        match event_type {
            EventType::Narrate | EventType::WriteText => {
                p.text.get_or_insert_with(String::new);
            }
            EventType::WriteEquation => {
                p.latex.get_or_insert_with(String::new);
                p.display.get_or_insert(true);
            }
            _ => {}
        }

        // An annotate event's `style` is its mark kind; everywhere else it
        // is a stroke block.
        if event_type == EventType::Annotate {
            let style = fields
                .str("annotation_type")
                .or_else(|| fields.str("style"))
                .map(AnnotationStyle::parse_or_default)
                .unwrap_or_default();
            p.annotation_type = Some(style);
        } else {
            p.style = fields.get("style").and_then(Value::as_object).and_then(stroke_style);
        }

        // ── Geometry ──
        for key in X_KEYS {
            *coordinate_slot(&mut p, key) =
                fields.number(key).map(|v| v.clamp(0.0, policy.board_width));
        }
        for key in Y_KEYS {
            *coordinate_slot(&mut p, key) =
                fields.number(key).map(|v| v.clamp(0.0, policy.board_height));
        }
        if !event_type.is_written() {
            p.width = fields
                .number("width")
                .map(|w| w.clamp(policy.min_width, policy.board_width));
            p.height = fields
                .number("height")
                .map(|h| h.clamp(policy.min_height, policy.board_height));
        }
        p.r = fields
            .number("r")
            .map(|r| r.clamp(policy.min_radius, policy.max_radius));
        p.points = fields.get("points").and_then(Value::as_array).map(|items| {
            items.iter().filter_map(numeric_pair).collect()
        });

        // ── Placement ──
        p.zone = fields.str("zone").and_then(Zone::parse);
        p.anchor = fields.str("anchor").and_then(Anchor::parse);
        p.lane = fields.str("lane").and_then(Lane::parse);
        p.intent = fields.str("intent").and_then(Intent::parse);
        p.teaching_phase = fields.str("teaching_phase").and_then(TeachingPhase::parse);
        p.scene_template = fields.str("scene_template").and_then(SceneTemplate::parse);
        p.slot_role = fields.str("slot_role").and_then(SlotRole::parse);
        p.scene_id = fields.string("scene_id").filter(|s| !s.is_empty());
        p.transform_chain_id = fields.string("transform_chain_id").filter(|s| !s.is_empty());

        // ── Layout ──
        p.requested_page = fields
            .number("board_page")
            .map(|page| page.round().clamp(0.0, f64::from(policy.max_board_page)) as u32);
        p.slot_index = fields.number("slot_index").map(|s| s.round().max(0.0) as u32);
        p.reserve_height = fields
            .number("reserve_height")
            .map(|h| h.clamp(policy.reserve_height_min, policy.reserve_height_max));
        p.sync_hold_ms = fields
            .number("sync_hold_ms")
            .map(|ms| ms.round().clamp(0.0, policy.sync_hold_max_ms as f64) as u64);

        // ── Clearing / overlay ──
        p.clear_target = fields.str("clear_target").and_then(ClearTarget::parse);
        p.clear_zone = fields.str("clear_zone").and_then(Zone::parse);
        p.clear_id = fields.string("clear_id");
        p.temporary = fields.boolean("temporary");
        p.group_id = fields.string("group_id");

        p
    }
}

fn coordinate_slot<'p>(p: &'p mut Payload, key: &str) -> &'p mut Option<f64> {
    match key {
        "x" => &mut p.x,
        "y" => &mut p.y,
        "x1" => &mut p.x1,
        "y1" => &mut p.y1,
        "x2" => &mut p.x2,
        "y2" => &mut p.y2,
        "cx" => &mut p.cx,
        _ => &mut p.cy,
    }
}

fn stroke_style(raw: &Map<String, Value>) -> Option<StrokeStyle> {
    let fields = Fields(raw);
    let style = StrokeStyle {
        color: fields.string("color"),
        stroke_width: fields.number("stroke_width").filter(|w| *w > 0.0),
        dashed: fields.boolean("dashed"),
        fill: fields.string("fill"),
    };
    (!style.is_empty()).then_some(style)
}

/// `[x, y]` or `{"x": .., "y": ..}` with both members numeric.
fn numeric_pair(item: &Value) -> Option<Point> {
    let (x, y) = match item {
        Value::Array(pair) if pair.len() == 2 => {
            (coerce_number(&pair[0])?, coerce_number(&pair[1])?)
        }
        Value::Object(map) => (coerce_number(map.get("x")?)?, coerce_number(map.get("y")?)?),
        _ => return None,
    };
    Some(Point { x, y })
}

// ── Coercion ───────────────────────────────────────────────────────────────

/// Key lookup that also tries the `camelCase` spelling.
struct Fields<'m>(&'m Map<String, Value>);

impl<'m> Fields<'m> {
    fn get(&self, key: &str) -> Option<&'m Value> {
        self.0
            .get(key)
            .or_else(|| self.0.get(&snake_to_camel(key)))
            .filter(|v| !v.is_null())
    }

    fn str(&self, key: &str) -> Option<&'m str> {
        self.get(key).and_then(Value::as_str)
    }

    fn string(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(coerce_number)
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
