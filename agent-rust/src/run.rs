use crate::{memory::WeeklyLogEntry, planner::OutfitPlan, tools::ToolCallResult};
use chrono::NaiveDate;
use stylist_sdk::{Message, ModelResponse, Part, ToolCallPart, ToolResultPart};

/// The model-facing conversation of a single run. Never shared between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    #[must_use]
    pub fn new(user_message: &str) -> Self {
        Self {
            messages: vec![Message::user(vec![Part::text(user_message)])],
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Append a tool call and its result as a paired model/tool entry.
    pub fn push_exchange(&mut self, call: ToolCallPart, result: &ToolCallResult) {
        let result_part = ToolResultPart::new(
            call.tool_call_id.clone(),
            call.tool_name.clone(),
            result.to_value(),
        )
        .with_is_error(result.is_error());
        self.messages.push(Message::assistant(vec![Part::ToolCall(call)]));
        self.messages.push(Message::tool(vec![Part::ToolResult(result_part)]));
    }
}

/// Run-scoped state. Each run owns one; nothing here is process-wide.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub transcript: Transcript,
    /// Model calls made so far.
    pub iterations: usize,
    pub max_steps: usize,
    pub today: NaiveDate,
    /// This week's log, including ids committed during the run.
    pub weekly_log: Vec<WeeklyLogEntry>,
    pub last_plan: Option<OutfitPlan>,
    /// Set once an image is composed; guards against a second one.
    pub image_locator: Option<String>,
    pub last_image_error: Option<String>,
}

impl RunContext {
    #[must_use]
    pub fn new(
        transcript: Transcript,
        max_steps: usize,
        today: NaiveDate,
        weekly_log: Vec<WeeklyLogEntry>,
    ) -> Self {
        Self {
            transcript,
            iterations: 0,
            max_steps,
            today,
            weekly_log,
            last_plan: None,
            image_locator: None,
            last_image_error: None,
        }
    }

    /// Count a model call. Returns false once the ceiling is reached.
    pub fn begin_iteration(&mut self) -> bool {
        if self.iterations >= self.max_steps {
            return false;
        }
        self.iterations += 1;
        true
    }

    #[must_use]
    pub fn image_generated(&self) -> bool {
        self.image_locator.is_some()
    }

    /// Mirror a commit into the in-run copy of the weekly log.
    pub fn record_worn(&mut self, item_ids: &[String]) {
        let today = self.today;
        if !self.weekly_log.iter().any(|e| e.date == today) {
            self.weekly_log.push(WeeklyLogEntry {
                date: today,
                worn_item_ids: Vec::new(),
            });
            self.weekly_log.sort_by_key(|e| e.date);
        }
        if let Some(entry) = self.weekly_log.iter_mut().find(|e| e.date == today) {
            for id in item_ids {
                if !entry.worn_item_ids.contains(id) {
                    entry.worn_item_ids.push(id.clone());
                }
            }
        }
    }
}

/// States of the tool-calling loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    AwaitingModel,
    Deciding(ModelResponse),
    Dispatch(ToolCallPart),
    /// The model stopped calling tools; carries its text, possibly empty.
    Finalizing(String),
    Done(String),
}

impl Step {
    /// Only the first tool call of a response is honored.
    #[must_use]
    pub fn decide(response: &ModelResponse) -> Self {
        match response.tool_calls().first() {
            Some(call) => Self::Dispatch((*call).clone()),
            None => Self::Finalizing(response.text()),
        }
    }
}
