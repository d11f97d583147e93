#![forbid(unsafe_code)]

//! Structured log events emitted by the step and chat pipelines.
//!
//! Dropped events must be reported with enough context to find them, and
//! synthesized events must be logged inside the repair span.
//!
//! Run:
//!   cargo test -p lectern-lesson --test tracing_events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lectern_core::BoardPolicy;
use lectern_lesson::{EventIds, LessonPipeline, StepRepairer};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ── Capture layer ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
#[allow(dead_code)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
    fields: HashMap<String, String>,
    parent_span_name: Option<String>,
}

struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for EventCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();
        let message = fields.get("message").cloned().unwrap_or_default();
        let parent_span_name = ctx
            .current_span()
            .id()
            .and_then(|id| ctx.span(id))
            .map(|span_ref| span_ref.name().to_string());

        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
            fields,
            parent_span_name,
        });
    }
}

fn with_captured_events<F: FnOnce()>(f: F) -> Vec<CapturedEvent> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = EventCapture {
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let captured = events.lock().unwrap().clone();
    captured
}

fn pipeline() -> LessonPipeline {
    LessonPipeline::with_ids(BoardPolicy::default(), EventIds::seeded(5))
}

// ── Tests ─────────────────────────────────────────────────────────────────

#[test]
fn unknown_event_type_is_warned_with_context() {
    let captured = with_captured_events(|| {
        let step = json!({
            "step_number": 4,
            "title": "Check",
            "events": [{"type": "juggle"}, {"type": "narrate", "text": "ok"}],
        });
        pipeline().process_step(step.as_object().unwrap());
    });
    let warn = captured
        .iter()
        .find(|e| e.message == "dropping unknown event type")
        .expect("warning emitted");
    assert_eq!(warn.level, tracing::Level::WARN);
    assert_eq!(warn.fields.get("event_type").map(String::as_str), Some("juggle"));
    assert_eq!(warn.fields.get("step_number").map(String::as_str), Some("4"));
    assert_eq!(warn.parent_span_name.as_deref(), Some("lectern.step"));
}

#[test]
fn synthesized_events_are_logged_in_repair_span() {
    let captured = with_captured_events(|| {
        let step = json!({"step_number": 1, "title": "Empty", "events": [{"type": "pause"}]});
        pipeline().process_step(step.as_object().unwrap());
    });
    let kinds: Vec<&str> = captured
        .iter()
        .filter(|e| e.parent_span_name.as_deref() == Some("lectern.repair"))
        .filter_map(|e| e.fields.get("kind").map(String::as_str))
        .collect();
    assert!(kinds.contains(&"narrate"), "{kinds:?}");
    assert!(kinds.contains(&"write_text"), "{kinds:?}");
    assert!(kinds.contains(&"annotate"), "{kinds:?}");
    assert!(kinds.contains(&"checkpoint_narrate"), "{kinds:?}");
}

#[test]
fn clean_step_logs_no_repairs() {
    let mut p = pipeline();
    let step = json!({"step_number": 1, "title": "Warm", "events": []});
    let first = p.process_step(step.as_object().unwrap());
    let events = first.script.events;
    let captured = with_captured_events(|| {
        let mut events = events.clone();
        let policy = BoardPolicy::default();
        let mut ids = EventIds::seeded(6);
        let report = StepRepairer::new(&policy).repair(&mut events, 1, "Warm", &mut ids);
        assert!(report.is_clean());
    });
    assert!(!captured.iter().any(|e| e.fields.contains_key("kind")));
}

#[test]
fn unknown_chat_event_is_warned_in_overlay_span() {
    let captured = with_captured_events(|| {
        pipeline().adapt_chat_events(&[json!({"type": "sparkle"})]);
    });
    let warn = captured
        .iter()
        .find(|e| e.message == "dropping unknown chat event type")
        .expect("warning emitted");
    assert_eq!(warn.fields.get("event_type").map(String::as_str), Some("sparkle"));
    assert_eq!(warn.parent_span_name.as_deref(), Some("lectern.chat_overlay"));
}

#[test]
fn malformed_chat_event_is_warned_in_overlay_span() {
    let captured = with_captured_events(|| {
        let raw = [json!("circle it"), json!({"type": "narrate"})];
        let overlay = pipeline().adapt_chat_events(&raw);
        assert_eq!(overlay.report.malformed_dropped, 1);
    });
    let warn = captured
        .iter()
        .find(|e| e.message == "dropping non-object chat event")
        .expect("warning emitted");
    assert_eq!(warn.level, tracing::Level::WARN);
    assert_eq!(warn.fields.get("index").map(String::as_str), Some("0"));
    assert_eq!(warn.parent_span_name.as_deref(), Some("lectern.chat_overlay"));
}
