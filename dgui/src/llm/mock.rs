//! Mock LLM for tests and offline runs.
//!
//! Replays a script of responses in order and then repeats a fallback reply.
//! Every request (messages and bound tool names) is recorded for assertions.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// One recorded `invoke` call.
#[derive(Clone, Debug)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Scripted LLM.
///
/// **Interaction**: Implements `LlmClient`; used by `ChatNode` in tests and by the CLI's
/// `--mock` mode.
pub struct MockLlm {
    script: Mutex<VecDeque<Result<LlmResponse, String>>>,
    fallback: LlmResponse,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    /// Replays `responses` in order, then answers "OK." forever.
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            fallback: LlmResponse::text("OK."),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers `content` without tool calls (END path).
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self::new(vec![]).with_fallback(LlmResponse::text(content))
    }

    /// First call requests `call`, second call answers `final_reply`.
    pub fn first_tool_then_reply(call: ToolCall, final_reply: impl Into<String>) -> Self {
        Self::new(vec![LlmResponse::tool_call(call), LlmResponse::text(final_reply)])
    }

    /// Reply used once the script is exhausted.
    pub fn with_fallback(mut self, fallback: LlmResponse) -> Self {
        self.fallback = fallback;
        self
    }

    /// Appends a failing step to the script.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.lock_script().push_back(Err(message.into()));
        self
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<LlmResponse, String>>> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        {
            let mut requests = self.requests.lock().unwrap_or_else(|p| p.into_inner());
            requests.push(LlmRequest {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
        }
        let next = self.lock_script().pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(AgentError::ExecutionFailed(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}
