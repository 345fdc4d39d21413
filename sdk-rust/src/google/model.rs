use super::api::{
    Blob, Content, FunctionCall, FunctionDeclaration, FunctionResponse, GenerateContentConfig,
    GenerateContentParameters, GenerateContentResponse, Part as GooglePart, Tool, UsageMetadata,
};
use crate::{
    client_utils, id_utils, LanguageModel, LanguageModelError, LanguageModelInput,
    LanguageModelResult, Message, Modality, ModelResponse, ModelUsage, Part, ToolCallPart,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info_span;
use tracing_futures::Instrument;

const PROVIDER: &str = "google";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GoogleModel {
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct GoogleModelOptions {
    pub api_key: String,
    pub base_url: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
}

impl GoogleModel {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: GoogleModelOptions) -> Self {
        let GoogleModelOptions {
            api_key,
            base_url,
            headers,
            client,
        } = options;

        let base_url = base_url
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            model_id: model_id.into(),
            api_key,
            base_url,
            client: client.unwrap_or_default(),
            headers: headers.unwrap_or_default(),
        }
    }

    fn request_headers(&self) -> LanguageModelResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        // The key travels as a header so it never appears in a request URL
        let mut api_key = HeaderValue::from_str(&self.api_key).map_err(|_| {
            LanguageModelError::InvalidInput(
                "Google API key contains characters not allowed in a header".to_string(),
            )
        })?;
        api_key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, api_key);

        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid Google header name '{key}': {error}"
                ))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|error| {
                LanguageModelError::InvalidInput(format!(
                    "Invalid Google header value for '{key}': {error}"
                ))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

#[async_trait::async_trait]
impl LanguageModel for GoogleModel {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn generate(&self, input: LanguageModelInput) -> LanguageModelResult<ModelResponse> {
        let span = info_span!(
            "stylist_sdk.generate",
            provider = PROVIDER,
            model_id = %self.model_id,
            messages = input.messages.len(),
        );

        async move {
            let params = convert_to_generate_content_parameters(input)?;

            let url = format!("{}/models/{}:generateContent", self.base_url, self.model_id);

            let headers = self.request_headers()?;
            let response: GenerateContentResponse =
                client_utils::send_json(&self.client, &url, &params, headers).await?;

            let candidate = response
                .candidates
                .and_then(|c| c.into_iter().next())
                .ok_or_else(|| {
                    LanguageModelError::Invariant(PROVIDER, "No candidate in response".to_string())
                })?;

            let content =
                map_google_content(candidate.content.and_then(|c| c.parts).unwrap_or_default())?;

            Ok(ModelResponse {
                content,
                usage: response.usage_metadata.as_ref().map(map_google_usage_metadata),
            })
        }
        .instrument(span)
        .await
    }
}

fn convert_to_generate_content_parameters(
    input: LanguageModelInput,
) -> LanguageModelResult<GenerateContentParameters> {
    let mut params = GenerateContentParameters {
        contents: convert_to_google_contents(input.messages)?,
        ..Default::default()
    };

    if let Some(system_prompt) = input.system_prompt {
        params.system_instruction = Some(Content {
            role: Some("system".to_string()),
            parts: Some(vec![GooglePart {
                text: Some(system_prompt),
                ..Default::default()
            }]),
        });
    }

    if let Some(tools) = input.tools {
        let function_declarations = tools
            .into_iter()
            .map(|tool| FunctionDeclaration {
                name: Some(tool.name),
                description: Some(tool.description),
                parameters_json_schema: Some(tool.parameters),
            })
            .collect();

        params.tools = Some(vec![Tool {
            function_declarations: Some(function_declarations),
        }]);
    }

    params.generation_config = Some(GenerateContentConfig {
        temperature: input.temperature,
        max_output_tokens: input.max_tokens,
        response_modalities: input.modalities.map(|modalities| {
            modalities
                .into_iter()
                .map(|m| match m {
                    Modality::Text => "TEXT".to_string(),
                    Modality::Image => "IMAGE".to_string(),
                })
                .collect()
        }),
    });

    Ok(params)
}

fn convert_to_google_contents(messages: Vec<Message>) -> LanguageModelResult<Vec<Content>> {
    messages
        .into_iter()
        .map(|message| {
            let (role, parts) = match message {
                Message::User(user_message) => ("user", user_message.content),
                Message::Assistant(assistant_message) => ("model", assistant_message.content),
                // Function responses travel back with the user role
                Message::Tool(tool_message) => ("user", tool_message.content),
            };
            if role == "model" && parts.iter().any(|p| matches!(p, Part::ToolResult(_))) {
                return Err(LanguageModelError::Unsupported(
                    PROVIDER,
                    "Tool results cannot appear in model content".to_string(),
                ));
            }
            Ok(Content {
                role: Some(role.to_string()),
                parts: Some(parts.into_iter().map(convert_to_google_part).collect()),
            })
        })
        .collect()
}

fn convert_to_google_part(part: Part) -> GooglePart {
    match part {
        Part::Text(text_part) => GooglePart {
            text: Some(text_part.text),
            ..Default::default()
        },
        Part::Image(image_part) => GooglePart {
            inline_data: Some(Blob {
                data: Some(image_part.image_data),
                mime_type: Some(image_part.mime_type),
            }),
            ..Default::default()
        },
        Part::ToolCall(tool_call_part) => GooglePart {
            function_call: Some(FunctionCall {
                name: Some(tool_call_part.tool_name),
                args: Some(tool_call_part.args),
                id: Some(tool_call_part.tool_call_id),
            }),
            ..Default::default()
        },
        Part::ToolResult(tool_result_part) => {
            // "output" carries the function output and "error" the error
            // details, as the Gemini API expects
            let key = if tool_result_part.is_error.unwrap_or(false) {
                "error"
            } else {
                "output"
            };
            GooglePart {
                function_response: Some(FunctionResponse {
                    id: Some(tool_result_part.tool_call_id),
                    name: Some(tool_result_part.tool_name),
                    response: Some(HashMap::from([(key.to_string(), tool_result_part.output)])),
                }),
                ..Default::default()
            }
        }
    }
}

fn map_google_content(parts: Vec<GooglePart>) -> LanguageModelResult<Vec<Part>> {
    parts
        .into_iter()
        .filter_map(|part| {
            if let Some(text) = part.text {
                // Thought summaries are not surfaced to callers
                if part.thought.unwrap_or(false) {
                    None
                } else {
                    Some(Ok(Part::text(text)))
                }
            } else if let Some(inline_data) = part.inline_data {
                match (inline_data.data, inline_data.mime_type) {
                    (Some(data), Some(mime_type)) if mime_type.starts_with("image/") => {
                        Some(Ok(Part::image(data, mime_type)))
                    }
                    (Some(_), Some(_)) => None,
                    _ => Some(Err(LanguageModelError::Invariant(
                        PROVIDER,
                        "Inline data missing data or mime type".to_string(),
                    ))),
                }
            } else if let Some(function_call) = part.function_call {
                if let Some(name) = function_call.name {
                    Some(Ok(Part::ToolCall(ToolCallPart {
                        tool_call_id: function_call
                            .id
                            // Google does not always return id, generate one if missing
                            .unwrap_or_else(|| id_utils::generate_string(10)),
                        tool_name: name,
                        args: function_call.args.unwrap_or_else(|| json!({})),
                    })))
                } else {
                    Some(Err(LanguageModelError::Invariant(
                        PROVIDER,
                        "Function call missing name".to_string(),
                    )))
                }
            } else {
                None
            }
        })
        .collect()
}

fn map_google_usage_metadata(usage: &UsageMetadata) -> ModelUsage {
    ModelUsage {
        input_tokens: usage.prompt_token_count.unwrap_or(0),
        output_tokens: usage.candidates_token_count.unwrap_or(0),
    }
}
