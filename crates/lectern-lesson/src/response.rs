//! Whole-response parsing for lesson and chat turns.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{LessonError, Result};
use crate::pipeline::{LessonPipeline, math_blocks_of, non_empty_str};
use crate::step::{MathBlock, StepScript};

/// A parsed, fully processed lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub subject: String,
    pub steps: Vec<StepScript>,
}

/// A parsed chat answer with its board overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub message: String,
    pub narration: String,
    pub math_blocks: Vec<MathBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_step: Option<u32>,
    pub events: Vec<lectern_core::TeachingEvent>,
}

/// Strip a surrounding Markdown code fence, with or without a `json` tag.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split("```").next().unwrap_or(rest);
    body.strip_prefix("json").unwrap_or(body).trim()
}

impl LessonPipeline {
    /// Parse a lesson-generation response and process every valid step.
    ///
    /// `title`, `subject` and `steps` are required. Steps lacking
    /// `step_number` or `title` are skipped with a warning; if none remain
    /// the response is rejected.
    pub fn parse_lesson_response(&mut self, text: &str) -> Result<Lesson> {
        let value: Value = serde_json::from_str(strip_code_fence(text))?;
        let data = value
            .as_object()
            .ok_or(LessonError::NotAnObject { what: "lesson" })?;
        let title = required_str(data, "title")?;
        let subject = required_str(data, "subject")?;
        let steps = data
            .get("steps")
            .and_then(Value::as_array)
            .ok_or(LessonError::missing("steps"))?;

        let mut scripts = Vec::with_capacity(steps.len());
        for (index, step) in steps.iter().enumerate() {
            let Some(step) = step
                .as_object()
                .filter(|s| s.contains_key("step_number") && s.contains_key("title"))
            else {
                warn!(index, "invalid step structure; skipping");
                continue;
            };
            let outcome = self.process_step(step);
            debug!(
                step_number = outcome.script.step_number,
                events = outcome.script.events.len(),
                repaired = outcome.repair.total(),
                "step processed"
            );
            scripts.push(outcome.script);
        }

        if scripts.is_empty() {
            warn!("no valid steps parsed");
            return Err(LessonError::NoValidSteps);
        }
        Ok(Lesson {
            title,
            subject,
            steps: scripts,
        })
    }

    /// Parse a chat response. `message` is required; `narration` defaults
    /// to the message and `math_blocks` to none. Any `events` become a
    /// temporary scratch overlay.
    pub fn parse_chat_response(&mut self, text: &str) -> Result<ChatTurn> {
        let value: Value = serde_json::from_str(strip_code_fence(text))?;
        let data = value
            .as_object()
            .ok_or(LessonError::NotAnObject { what: "chat response" })?;
        let message = required_str(data, "message")?;
        let narration = non_empty_str(data, "narration").unwrap_or_else(|| message.clone());
        let related_step = data
            .get("related_step")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok());
        let raw_events = data
            .get("events")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let overlay = self.adapt_chat_events(raw_events);

        Ok(ChatTurn {
            message,
            narration,
            math_blocks: math_blocks_of(data),
            related_step,
            events: overlay.events,
        })
    }
}

fn required_str(data: &serde_json::Map<String, Value>, field: &'static str) -> Result<String> {
    match data.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(LessonError::missing(field)),
    }
}
