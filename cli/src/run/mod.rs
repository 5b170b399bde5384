//! Run orchestration: builds the agent from config (or the offline demo model) and
//! drives one turn, answering form interrupts from an input line source.

pub mod display;

use std::io::Write;
use std::sync::Arc;

use dgui::{
    generate_json_schema_spec, AgentError, BackendTools, ChatOpenAI, CompilationError, FormAgent,
    FormAgentBuilder, LlmClient, LlmResponse, MockLlm, RunOutcome, ToolCall, ToolSpec,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufRead, Lines};

use display::{format_outcome_text, format_trace, outcome_to_json};

/// Config directory name under XDG (`~/.config/dgui`) and `.env` app name.
pub const APP_NAME: &str = "dgui";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("{0}")]
    Agent(#[from] AgentError),
    #[error("config: {0}")]
    Config(#[from] config::LoadError),
    #[error("graph: {0}")]
    Compile(#[from] CompilationError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Options for building the agent.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Overrides the configured model name.
    pub model: Option<String>,
    /// Use the scripted offline model instead of an OpenAI-compatible endpoint.
    pub mock: bool,
    /// Log node enter/exit and print phase traces to stderr.
    pub verbose: bool,
}

/// How outcomes are written.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputMode {
    /// One JSON object per line instead of text.
    pub json: bool,
    pub verbose: bool,
}

/// Tools the front end would register: the `generateJsonSchema` schema tool.
pub fn caller_tools() -> Vec<ToolSpec> {
    vec![generate_json_schema_spec()]
}

/// Every tool definition bound to the model, caller tools first.
pub fn bound_tools() -> Vec<ToolSpec> {
    BackendTools::standard().merge_with(&caller_tools())
}

/// Offline model for `--mock`: asks for the user's name with a form, then thanks them.
pub fn demo_llm() -> MockLlm {
    let schema = json!({
        "type": "object",
        "title": "About you",
        "properties": {"name": {"type": "string", "title": "Name"}},
        "required": ["name"]
    });
    let ui_schema = json!({"name": {"ui:autofocus": true}});
    let args = json!({"question": schema.to_string(), "uiSchema": ui_schema.to_string()});
    MockLlm::new(vec![LlmResponse::tool_call(ToolCall::new(
        "call-demo-1",
        "ask_question",
        args.to_string(),
    ))])
    .with_fallback(LlmResponse::text("Thanks, I have what I need."))
}

/// Builds the form agent: `ChatOpenAI` from `[agent]` settings, or the demo model.
pub fn build_agent(opts: &RunOptions) -> Result<FormAgent, RunError> {
    let llm: Arc<dyn LlmClient> = if opts.mock {
        Arc::new(demo_llm())
    } else {
        let mut settings = config::load_settings(APP_NAME)?;
        if let Some(model) = &opts.model {
            settings.model = model.clone();
        }
        tracing::info!(
            model = %settings.model,
            base_url = ?settings.base_url,
            "using OpenAI-compatible model"
        );
        Arc::new(ChatOpenAI::from_settings(&settings)?)
    };
    Ok(FormAgentBuilder::new(llm)
        .caller_tools(caller_tools())
        .node_logging(opts.verbose)
        .build()?)
}

/// A resume value from user input: JSON when the text parses, otherwise the text itself
/// as a JSON string.
pub fn parse_resume_value(input: &str) -> Value {
    let trimmed = input.trim();
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

/// Writes one outcome to `out` (text or JSON line); the phase trace goes to stderr when verbose.
pub fn write_outcome<W: Write>(
    out: &mut W,
    thread_id: &str,
    outcome: &RunOutcome,
    mode: OutputMode,
) -> Result<(), RunError> {
    if mode.verbose {
        eprintln!("trace: {}", format_trace(outcome.trace()));
    }
    if mode.json {
        writeln!(out, "{}", serde_json::to_string(&outcome_to_json(thread_id, outcome))?)?;
    } else {
        let text = format_outcome_text(outcome);
        if !text.is_empty() {
            writeln!(out, "{}", text)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Prints `outcome` and, while the run is suspended on a form, reads an answer line and
/// resumes. `preset` answers the first form without reading input.
///
/// Returns the last outcome; when input ends first, the thread stays suspended.
pub async fn settle<R, W>(
    agent: &FormAgent,
    thread_id: &str,
    mut outcome: RunOutcome,
    mut preset: Option<Value>,
    input: &mut Lines<R>,
    out: &mut W,
    mode: OutputMode,
) -> Result<RunOutcome, RunError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        write_outcome(out, thread_id, &outcome, mode)?;
        if !outcome.is_suspended() {
            return Ok(outcome);
        }
        let value = match preset.take() {
            Some(v) => v,
            None => match read_answer(input, out, mode).await? {
                Some(v) => v,
                None => {
                    tracing::info!(thread_id, "input closed with a form pending");
                    return Ok(outcome);
                }
            },
        };
        outcome = agent.resume(thread_id, value).await?;
    }
}

async fn read_answer<R, W>(
    input: &mut Lines<R>,
    out: &mut W,
    mode: OutputMode,
) -> Result<Option<Value>, RunError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        if !mode.json {
            write!(out, "answer (JSON)> ")?;
            out.flush()?;
        }
        match input.next_line().await? {
            None => return Ok(None),
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => return Ok(Some(parse_resume_value(&line))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;

    #[test]
    fn resume_value_parses_json_or_keeps_text() {
        assert_eq!(parse_resume_value(r#" {"name":"Alice"} "#), json!({"name": "Alice"}));
        assert_eq!(parse_resume_value("42"), json!(42));
        assert_eq!(parse_resume_value("  Alice "), json!("Alice"));
    }

    #[test]
    fn bound_tools_lists_schema_tool_first() {
        let names: Vec<String> = bound_tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["generateJsonSchema", "get_weather", "ask_question"]);
    }

    /// **Scenario**: demo model asks for a form; the answer line resumes and completes the turn.
    #[tokio::test]
    async fn settle_answers_form_from_input() {
        let agent = build_agent(&RunOptions {
            mock: true,
            ..RunOptions::default()
        })
        .unwrap();
        let first = agent.run("t1", "hello").await.unwrap();
        let mut input = (&b"\n{\"name\":\"Alice\"}\n"[..]).lines();
        let mut out = Vec::new();
        let last = settle(&agent, "t1", first, None, &mut input, &mut out, OutputMode::default())
            .await
            .unwrap();

        assert!(!last.is_suspended());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Additional Information Required"));
        assert!(text.contains("answer (JSON)> "));
        assert!(text.contains("Thanks, I have what I need."));
        let state = agent.state("t1").await.unwrap().unwrap();
        assert!(state.has_tool_result("call-demo-1"));
    }

    #[tokio::test]
    async fn settle_with_preset_reads_nothing_and_json_mode_writes_lines() {
        let agent = build_agent(&RunOptions {
            mock: true,
            ..RunOptions::default()
        })
        .unwrap();
        let first = agent.run("t1", "hello").await.unwrap();
        let mut input = (&b""[..]).lines();
        let mut out = Vec::new();
        let mode = OutputMode {
            json: true,
            verbose: false,
        };
        settle(&agent, "t1", first, Some(json!("Bob")), &mut input, &mut out, mode)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "suspended");
        assert_eq!(lines[1]["status"], "completed");
    }

    #[tokio::test]
    async fn settle_stops_when_input_ends() {
        let agent = build_agent(&RunOptions {
            mock: true,
            ..RunOptions::default()
        })
        .unwrap();
        let first = agent.run("t1", "hello").await.unwrap();
        let mut input = (&b""[..]).lines();
        let mut out = Vec::new();
        let last = settle(&agent, "t1", first, None, &mut input, &mut out, OutputMode::default())
            .await
            .unwrap();
        assert!(last.is_suspended());
        assert!(agent.pending_form("t1").await.unwrap().is_some());
    }
}
