#![forbid(unsafe_code)]

//! Whole-response parsing: lesson and chat turns.
//!
//! Run:
//!   cargo test -p lectern-lesson --test response_parsing

use lectern_core::{BoardPolicy, EventType, Lane};
use lectern_lesson::{EventIds, LessonError, LessonPipeline};

fn pipeline() -> LessonPipeline {
    LessonPipeline::with_ids(BoardPolicy::default(), EventIds::seeded(99))
}

const LESSON: &str = r#"```json
{
  "title": "Quadratics",
  "subject": "Algebra",
  "steps": [
    {
      "step_number": 1,
      "title": "Set up",
      "events": [
        {"type": "narrate", "text": "First, write the equation."},
        {"type": "write_equation", "latex": "x^2-5x+6=0"}
      ]
    },
    {"title": "No number"},
    "not a step",
    {
      "step_number": 2,
      "title": "Factor",
      "content": "Find two numbers that multiply to 6.",
      "math_blocks": [{"latex": "(x-2)(x-3)=0", "display": true}]
    }
  ]
}
```"#;

#[test]
fn lesson_parses_and_skips_invalid_steps() {
    let lesson = pipeline().parse_lesson_response(LESSON).unwrap();
    assert_eq!(lesson.title, "Quadratics");
    assert_eq!(lesson.subject, "Algebra");
    let numbers: Vec<u32> = lesson.steps.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![1, 2]);
    for step in &lesson.steps {
        assert_eq!(step.events[0].event_type, EventType::StepMarker);
        assert_eq!(step.events.last().unwrap().event_type, EventType::Pause);
    }
}

#[test]
fn legacy_step_is_synthesized_and_keeps_its_content() {
    let lesson = pipeline().parse_lesson_response(LESSON).unwrap();
    let step = &lesson.steps[1];
    assert_eq!(step.content, "Find two numbers that multiply to 6.");
    assert_eq!(step.math_blocks[0].latex, "(x-2)(x-3)=0");
    let eq = step
        .events
        .iter()
        .find(|e| e.event_type == EventType::WriteEquation)
        .unwrap();
    assert_eq!(eq.payload.lane, Some(Lane::Derivation));
}

#[test]
fn lesson_missing_fields_are_errors() {
    let mut p = pipeline();
    assert!(matches!(
        p.parse_lesson_response(r#"{"subject": "x", "steps": []}"#),
        Err(LessonError::MissingField { field: "title" })
    ));
    assert!(matches!(
        p.parse_lesson_response(r#"{"title": "t", "subject": "x"}"#),
        Err(LessonError::MissingField { field: "steps" })
    ));
    assert!(matches!(
        p.parse_lesson_response(r#"{"title": "t", "subject": "x", "steps": [{"title": "only"}]}"#),
        Err(LessonError::NoValidSteps)
    ));
    assert!(matches!(
        p.parse_lesson_response("[1, 2]"),
        Err(LessonError::NotAnObject { .. })
    ));
    assert!(matches!(p.parse_lesson_response("not json"), Err(LessonError::Json(_))));
}

#[test]
fn chat_defaults_narration_to_message() {
    let turn = pipeline()
        .parse_chat_response(r#"{"message": "Subtract 3 from both sides."}"#)
        .unwrap();
    assert_eq!(turn.narration, "Subtract 3 from both sides.");
    assert!(turn.math_blocks.is_empty());
    assert!(turn.events.is_empty());
    assert_eq!(turn.related_step, None);
}

#[test]
fn chat_events_become_an_overlay() {
    let text = r#"```
{
  "message": "Look at the constant term.",
  "narration": "The constant is six.",
  "related_step": 2,
  "math_blocks": ["6 = 2 \\cdot 3"],
  "events": [
    {"type": "write_equation", "latex": "6 = 2 \\cdot 3", "zone": "final"},
    {"type": "annotate", "target": "previous", "style": "circle"}
  ]
}
```"#;
    let turn = pipeline().parse_chat_response(text).unwrap();
    assert_eq!(turn.narration, "The constant is six.");
    assert_eq!(turn.related_step, Some(2));
    assert_eq!(turn.math_blocks.len(), 1);
    let types: Vec<_> = turn.events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            EventType::WriteEquation,
            EventType::Annotate,
            EventType::ClearSection,
            EventType::ClearSection,
            EventType::Pause,
        ]
    );
    assert_eq!(turn.events[0].payload.lane, Some(Lane::Scratch));
}

#[test]
fn chat_requires_a_message() {
    assert!(matches!(
        pipeline().parse_chat_response(r#"{"narration": "hi"}"#),
        Err(LessonError::MissingField { field: "message" })
    ));
}
