use crate::{
    AssistantMessage, ImagePart, Message, ModelResponse, ModelUsage, Part, TextPart,
    ToolCallPart, ToolMessage, ToolResultPart, UserMessage,
};
use serde_json::Value;

impl TextPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for TextPart {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TextPart {
    fn from(value: String) -> Self {
        Self { text: value }
    }
}

impl ImagePart {
    pub fn new(image_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            image_data: image_data.into(),
        }
    }
}

impl ToolCallPart {
    pub fn new(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            args,
        }
    }
}

impl ToolResultPart {
    pub fn new(tool_call_id: impl Into<String>, tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            output,
            is_error: None,
        }
    }

    #[must_use]
    pub fn with_is_error(mut self, is_error: bool) -> Self {
        self.is_error = Some(is_error);
        self
    }
}

impl From<TextPart> for Part {
    fn from(value: TextPart) -> Self {
        Self::Text(value)
    }
}

impl From<ImagePart> for Part {
    fn from(value: ImagePart) -> Self {
        Self::Image(value)
    }
}

impl From<ToolCallPart> for Part {
    fn from(value: ToolCallPart) -> Self {
        Self::ToolCall(value)
    }
}

impl From<ToolResultPart> for Part {
    fn from(value: ToolResultPart) -> Self {
        Self::ToolResult(value)
    }
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextPart::new(text))
    }

    pub fn image(image_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::Image(ImagePart::new(image_data, mime_type))
    }

    pub fn tool_call(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        args: Value,
    ) -> Self {
        Self::ToolCall(ToolCallPart::new(tool_call_id, tool_name, args))
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        output: Value,
    ) -> Self {
        Self::ToolResult(ToolResultPart::new(tool_call_id, tool_name, output))
    }
}

impl Message {
    pub fn user<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        Self::User(UserMessage {
            content: parts.into_iter().map(Into::into).collect(),
        })
    }

    pub fn assistant<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        Self::Assistant(AssistantMessage {
            content: parts.into_iter().map(Into::into).collect(),
        })
    }

    pub fn tool<I, P>(parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Part>,
    {
        Self::Tool(ToolMessage {
            content: parts.into_iter().map(Into::into).collect(),
        })
    }
}

impl ModelResponse {
    /// Concatenated text parts, trimmed. Empty when the model produced no
    /// text.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|part| match part {
                Part::Text(text_part) => Some(text_part.text.trim()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Tool calls in the order the model emitted them.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<&ToolCallPart> {
        self.content
            .iter()
            .filter_map(|part| match part {
                Part::ToolCall(tool_call) => Some(tool_call),
                _ => None,
            })
            .collect()
    }

    /// The first image part of the response, if any.
    #[must_use]
    pub fn first_image(&self) -> Option<&ImagePart> {
        self.content.iter().find_map(|part| match part {
            Part::Image(image_part) => Some(image_part),
            _ => None,
        })
    }
}

impl ModelUsage {
    pub fn add(&mut self, other: &Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
