//! Tool definitions and the backend tools executed by the tool node.
//!
//! Two kinds of tool reach the model:
//!
//! - **Backend tools** ([`BackendTool`]): `get_weather` and `ask_question`, executed locally
//!   by the tool node through an exhaustive match.
//! - **External tools** ([`ToolKind::External`]): definitions supplied by the caller in
//!   [`AgentState::tools`](crate::AgentState::tools) (e.g. the front end's
//!   `generateJsonSchema`). They are bound to the model but a call to one ends the turn
//!   so the caller can handle it.
//!
//! [`BackendTools`] is the immutable set built once per agent and shared by both nodes.

mod ask_question;
mod weather;

pub use ask_question::{
    ask_question, embed_json, resume_value_to_content, FormRequest, FORM_DESCRIPTION,
    FORM_REQUEST_TYPE, FORM_TITLE, TOOL_ASK_QUESTION,
};
pub use weather::{get_weather, TOOL_GET_WEATHER};

use serde_json::Value;
use thiserror::Error;

/// Name of the front-end schema tool referenced by the system prompt.
pub const TOOL_GENERATE_JSON_SCHEMA: &str = "generateJsonSchema";

/// Tool specification: name, description for the model, JSON Schema for arguments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

/// What running a backend tool produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Tool finished; the text becomes the tool result message.
    Completed(String),
    /// Tool needs external input; the value is surfaced as the interrupt payload.
    Pending(Value),
}

/// The tools implemented in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendTool {
    GetWeather,
    AskQuestion,
}

impl BackendTool {
    pub const ALL: [BackendTool; 2] = [BackendTool::GetWeather, BackendTool::AskQuestion];

    pub fn name(self) -> &'static str {
        match self {
            Self::GetWeather => TOOL_GET_WEATHER,
            Self::AskQuestion => TOOL_ASK_QUESTION,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn spec(self) -> ToolSpec {
        match self {
            Self::GetWeather => weather::spec(),
            Self::AskQuestion => ask_question::spec(),
        }
    }

    /// Runs the tool. `resume` is the value supplied by the caller when re-entering after
    /// this very call suspended; tools that never suspend ignore it.
    pub fn call(self, args: &Value, resume: Option<&Value>) -> Result<ToolOutcome, ToolError> {
        match self {
            Self::GetWeather => {
                let location = required_str(self, args, "location")?;
                Ok(ToolOutcome::Completed(get_weather(location)))
            }
            Self::AskQuestion => {
                if let Some(value) = resume {
                    return Ok(ToolOutcome::Completed(resume_value_to_content(value)));
                }
                let question = required_str(self, args, "question")?;
                let ui_schema = required_str(self, args, "uiSchema")?;
                let form = ask_question(question, ui_schema);
                Ok(ToolOutcome::Pending(form.to_value()))
            }
        }
    }
}

fn required_str<'a>(tool: BackendTool, args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.name().to_string(),
            reason: format!("missing string field `{}`", key),
        })
}

/// How the chat node classifies a requested tool name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    Backend(BackendTool),
    /// Caller-supplied or unknown; never executed locally.
    External(String),
}

/// Immutable set of backend tools for one agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTools {
    tools: Vec<BackendTool>,
}

impl Default for BackendTools {
    fn default() -> Self {
        Self::standard()
    }
}

impl BackendTools {
    /// `get_weather` and `ask_question`.
    pub fn standard() -> Self {
        Self::new(BackendTool::ALL.to_vec())
    }

    pub fn new(mut tools: Vec<BackendTool>) -> Self {
        let mut seen = std::collections::HashSet::new();
        tools.retain(|t| seen.insert(*t));
        Self { tools }
    }

    pub fn iter(&self) -> impl Iterator<Item = BackendTool> + '_ {
        self.tools.iter().copied()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(BackendTool::name).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.iter().map(BackendTool::spec).collect()
    }

    pub fn classify(&self, name: &str) -> ToolKind {
        match BackendTool::from_name(name).filter(|t| self.tools.contains(t)) {
            Some(t) => ToolKind::Backend(t),
            None => ToolKind::External(name.to_string()),
        }
    }

    pub fn is_backend(&self, name: &str) -> bool {
        matches!(self.classify(name), ToolKind::Backend(_))
    }

    /// Tool list bound to the model: caller tools first, then backend tools.
    /// A caller tool that reuses a backend name is dropped.
    pub fn merge_with(&self, caller_tools: &[ToolSpec]) -> Vec<ToolSpec> {
        let mut out: Vec<ToolSpec> = caller_tools
            .iter()
            .filter(|t| {
                let clash = self.is_backend(&t.name);
                if clash {
                    tracing::warn!(
                        tool = %t.name,
                        "caller tool shadows a backend tool; using backend definition"
                    );
                }
                !clash
            })
            .cloned()
            .collect();
        out.extend(self.specs());
        out
    }
}

/// Definition of the front-end `generateJsonSchema` tool the system prompt refers to.
///
/// It is not a backend tool: register it in [`AgentState::tools`](crate::AgentState::tools)
/// when the caller can render generated forms.
pub fn generate_json_schema_spec() -> ToolSpec {
    ToolSpec {
        name: TOOL_GENERATE_JSON_SCHEMA.to_string(),
        description: Some(
            "Generates the rjsf compatible json schema for the form you want to create. \
             The schema should be a valid JSON schema object or a JSON string."
                .to_string(),
        ),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "jsonSchema": {
                    "type": "string",
                    "description": "The react-jsonschema-form schema, as a JSON string."
                }
            },
            "required": ["jsonSchema"]
        }),
    }
}

/// Parses a tool call's raw argument string. Blank means `{}`; a JSON string that itself
/// holds an object (double-encoded arguments) is decoded once more.
pub fn parse_arguments(tool: &str, raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    let value: Value = serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })?;
    match value.as_str().map(serde_json::from_str::<Value>) {
        Some(Ok(inner)) if inner.is_object() => Ok(inner),
        _ => Ok(value),
    }
}
