//! OpenAI Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Works against any OpenAI-compatible endpoint. Tools passed to `invoke` are sent as
//! function tools with parallel tool calls disabled, so the model asks for at most one
//! tool per turn. Assistant tool calls and tool results in the history are mapped to the
//! native `tool_calls` / `tool` message shapes so the model sees its own calls paired
//! with their results.
//!
//! **Interaction**: Implements `LlmClient`; used by `ChatNode` like `MockLlm`.

use async_trait::async_trait;
use tracing::{debug, trace};

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionTools, CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        FunctionCall, FunctionObject, ToolChoiceOptions,
    },
    Client,
};
use env_config::AgentSettings;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, LlmUsage, ToolChoiceMode};
use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI Chat Completions client.
///
/// Uses `OPENAI_API_KEY` from the environment by default; or build it from
/// [`AgentSettings`] with [`ChatOpenAI::from_settings`].
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    api_base: String,
    temperature: Option<f32>,
    tool_choice: ToolChoiceMode,
}

impl ChatOpenAI {
    /// Build client with default config (API key from `OPENAI_API_KEY` env).
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_config(OpenAIConfig::new(), DEFAULT_API_BASE, model)
    }

    fn with_config(config: OpenAIConfig, api_base: &str, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            api_base: api_base.to_string(),
            temperature: None,
            tool_choice: ToolChoiceMode::default(),
        }
    }

    /// Build client from loaded settings: model, base URL, API key, temperature, tool choice.
    pub fn from_settings(settings: &AgentSettings) -> Result<Self, AgentError> {
        let mut config = OpenAIConfig::new();
        let api_base = settings.base_url.as_deref().unwrap_or(DEFAULT_API_BASE);
        if let Some(base) = &settings.base_url {
            config = config.with_api_base(base.trim_end_matches('/'));
        }
        if let Some(key) = &settings.api_key {
            config = config.with_api_key(key.as_str());
        }
        let mut llm = Self::with_config(config, api_base, settings.model.as_str());
        if let Some(t) = settings.temperature {
            llm = llm.with_temperature(t);
        }
        if let Some(choice) = &settings.tool_choice {
            let mode = choice.parse::<ToolChoiceMode>().map_err(AgentError::ExecutionFailed)?;
            llm = llm.with_tool_choice(mode);
        }
        Ok(llm)
    }

    /// Set temperature (0–2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set tool choice mode (auto, none, required). Applied only when tools are bound.
    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = mode;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    /// Convert our `Message` list to OpenAI request messages.
    fn messages_to_request(
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { content } => Ok(ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(content.as_str()),
                )),
                Message::User { content } => Ok(ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(content.as_str()),
                )),
                Message::Assistant { content, tool_calls } => {
                    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                    if !content.is_empty() {
                        args.content(content.as_str());
                    }
                    if !tool_calls.is_empty() {
                        args.tool_calls(
                            tool_calls
                                .iter()
                                .map(|tc| {
                                    let call = ChatCompletionMessageToolCall {
                                        id: tc.id.clone(),
                                        function: FunctionCall {
                                            name: tc.name.clone(),
                                            arguments: tc.arguments.clone(),
                                        },
                                    };
                                    ChatCompletionMessageToolCalls::Function(call)
                                })
                                .collect::<Vec<_>>(),
                        );
                    }
                    args.build().map(Into::into).map_err(|e| {
                        AgentError::ExecutionFailed(format!(
                            "OpenAI assistant message build failed: {}",
                            e
                        ))
                    })
                }
                Message::Tool {
                    tool_call_id,
                    content,
                } => ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(tool_call_id.as_str())
                    .content(content.as_str())
                    .build()
                    .map(Into::into)
                    .map_err(|e| {
                        AgentError::ExecutionFailed(format!(
                            "OpenAI tool message build failed: {}",
                            e
                        ))
                    }),
            })
            .collect()
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<CreateChatCompletionRequest, AgentError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages)?);

        if !tools.is_empty() {
            let chat_tools: Vec<ChatCompletionTools> = tools
                .iter()
                .map(|t| {
                    ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: Some(t.input_schema.clone()),
                            ..Default::default()
                        },
                    })
                })
                .collect();
            args.tools(chat_tools);
            let opt = match self.tool_choice {
                ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
                ToolChoiceMode::None => ToolChoiceOptions::None,
                ToolChoiceMode::Required => ToolChoiceOptions::Required,
            };
            args.tool_choice(ChatCompletionToolChoiceOption::Mode(opt));
            args.parallel_tool_calls(false);
        }

        if let Some(t) = self.temperature {
            args.temperature(t);
        }

        args.build()
            .map_err(|e| AgentError::ExecutionFailed(format!("OpenAI request build failed: {}", e)))
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        let trace_id = uuid::Uuid::new_v4().to_string();
        let request = self.build_request(messages, tools)?;

        let url = self.chat_completions_url();
        debug!(
            trace_id = %trace_id,
            url = %url,
            model = %self.model,
            message_count = messages.len(),
            tools_count = tools.len(),
            temperature = ?self.temperature,
            tool_choice = ?self.tool_choice,
            "OpenAI chat create"
        );
        if let Ok(js) = serde_json::to_string_pretty(&request) {
            trace!(trace_id = %trace_id, request = %js, "OpenAI request body");
        }

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("OpenAI API error: {}", e)))?;

        if let Ok(js) = serde_json::to_string_pretty(&response) {
            trace!(trace_id = %trace_id, response = %js, "OpenAI response body");
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::ExecutionFailed("OpenAI returned no choices".to_string()))?;

        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => {
                    Some(ToolCall::new(f.id, f.function.name, f.function.arguments))
                }
                _ => None,
            })
            .collect();

        let usage = response.usage.map(|u| LlmUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        debug!(trace_id = %trace_id, tool_calls = tool_calls.len(), ?usage, "OpenAI chat response");
        Ok(LlmResponse {
            content,
            tool_calls,
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn history() -> Vec<Message> {
        vec![
            Message::system("sys"),
            Message::user("weather in Paris?"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new("call-1", "get_weather", r#"{"location":"Paris"}"#)],
            ),
            Message::tool("call-1", "The weather for Paris is 70 degrees."),
        ]
    }

    /// **Scenario**: every role maps to its OpenAI message shape, tool call ids preserved.
    #[test]
    fn messages_map_to_openai_roles() {
        let mapped = ChatOpenAI::messages_to_request(&history()).unwrap();
        let v = serde_json::to_value(&mapped).unwrap();
        let roles: Vec<&str> = v
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert_eq!(v[2]["tool_calls"][0]["id"], "call-1");
        assert_eq!(v[2]["tool_calls"][0]["function"]["name"], "get_weather");
        assert_eq!(v[3]["tool_call_id"], "call-1");
    }

    /// **Scenario**: with tools bound, the request disables parallel calls and uses auto choice.
    #[test]
    fn request_with_tools_disables_parallel_calls() {
        let llm = ChatOpenAI::new("gpt-4o-mini").with_temperature(0.2);
        let tools = vec![ToolSpec {
            name: "get_weather".into(),
            description: Some("weather".into()),
            input_schema: json!({"type": "object"}),
        }];
        let req = serde_json::to_value(llm.build_request(&history(), &tools).unwrap()).unwrap();
        assert_eq!(req["parallel_tool_calls"], json!(false));
        assert_eq!(req["tool_choice"], json!("auto"));
        assert_eq!(req["tools"][0]["function"]["name"], "get_weather");
        assert_eq!(req["model"], "gpt-4o-mini");
    }

    #[test]
    fn request_without_tools_sets_no_tool_fields() {
        let llm = ChatOpenAI::new("m").with_tool_choice(ToolChoiceMode::Required);
        let request = llm.build_request(&[Message::user("hi")], &[]).unwrap();
        let req = serde_json::to_value(request).unwrap();
        assert!(req.get("tools").map_or(true, |t| t.is_null()));
        assert!(req.get("parallel_tool_calls").map_or(true, |t| t.is_null()));
    }

    #[test]
    fn from_settings_rejects_unknown_tool_choice() {
        let settings = AgentSettings {
            tool_choice: Some("sometimes".into()),
            api_key: Some("test-key".into()),
            base_url: Some("http://localhost:8080/v1/".into()),
            ..AgentSettings::default()
        };
        assert!(ChatOpenAI::from_settings(&settings).is_err());
        let ok = AgentSettings {
            tool_choice: Some("required".into()),
            ..settings
        };
        let llm = ChatOpenAI::from_settings(&ok).unwrap();
        assert_eq!(llm.chat_completions_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(llm.model(), env_config::DEFAULT_MODEL);
    }
}
