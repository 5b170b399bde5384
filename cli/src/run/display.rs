//! Rendering of run outcomes, forms and tool lists for stdout / stderr.

use dgui::{AgentPhase, FormRequest, RunOutcome, ToolCall, ToolSpec};
use serde_json::{json, Value};

/// Indent for nested lines (one level).
const INDENT: &str = "  ";

/// Max chars of tool-call arguments shown in text mode.
const ARGS_DISPLAY_LEN: usize = 200;

/// Truncates a string to at most `max` chars; appends "..." when truncated. UTF-8 safe.
pub fn truncate_display(s: &str, max: usize) -> String {
    const SUFFIX: &str = "...";
    let suffix_len = 3;
    if max <= suffix_len {
        return s.chars().take(max).collect();
    }
    let content_max = max - suffix_len;
    if s.chars().count() <= max {
        return s.to_string();
    }
    format!(
        "{}{}",
        s.chars().take(content_max).collect::<String>(),
        SUFFIX
    )
}

/// `chat -> tool -> suspended(call-1)`.
pub fn format_trace(trace: &[AgentPhase]) -> String {
    trace
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Form shown to the user: title, description, then the schema (and uiSchema when set).
pub fn format_form(form: &FormRequest) -> String {
    let mut lines = vec![
        format!("== {} ==", form.title),
        form.description.clone(),
        String::new(),
        "schema:".to_string(),
    ];
    lines.extend(pretty(&form.schema).lines().map(|l| format!("{}{}", INDENT, l)));
    let empty_ui = form.ui_schema.is_null()
        || form.ui_schema.as_object().map_or(false, |o| o.is_empty());
    if !empty_ui {
        lines.push("uiSchema:".to_string());
        lines.extend(pretty(&form.ui_schema).lines().map(|l| format!("{}{}", INDENT, l)));
    }
    lines.join("\n")
}

fn format_external_call(call: &ToolCall) -> String {
    format!(
        "[tool requested: {} {}] (not run by this CLI)",
        call.name,
        truncate_display(&call.arguments, ARGS_DISPLAY_LEN)
    )
}

/// Text for stdout: the reply, the requested caller tool, or the form to fill.
pub fn format_outcome_text(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::Completed {
            reply,
            external_call,
            ..
        } => {
            let mut parts = Vec::new();
            if let Some(r) = reply.as_deref().filter(|r| !r.is_empty()) {
                parts.push(r.to_string());
            }
            if let Some(call) = external_call {
                parts.push(format_external_call(call));
            }
            parts.join("\n")
        }
        RunOutcome::Suspended {
            form, interrupt, ..
        } => match form {
            Some(form) => format_form(form),
            None => format!("[input required]\n{}", pretty(&interrupt.value)),
        },
    }
}

/// One JSON line per outcome; the full state is left out, its message count kept.
pub fn outcome_to_json(thread_id: &str, outcome: &RunOutcome) -> Value {
    match outcome {
        RunOutcome::Completed {
            reply,
            state,
            trace,
            external_call,
        } => json!({
            "thread_id": thread_id,
            "status": "completed",
            "reply": reply,
            "external_call": external_call,
            "messages": state.messages.len(),
            "usage": state.total_usage,
            "trace": trace,
        }),
        RunOutcome::Suspended {
            interrupt,
            form,
            trace,
        } => json!({
            "thread_id": thread_id,
            "status": "suspended",
            "interrupt_id": interrupt.id,
            "form": form
                .as_ref()
                .map(FormRequest::to_value)
                .unwrap_or_else(|| interrupt.value.clone()),
            "trace": trace,
        }),
    }
}

/// `name: first line of description`, one tool per line.
pub fn format_tools_text(tools: &[ToolSpec]) -> String {
    tools
        .iter()
        .map(|t| {
            let summary = t
                .description
                .as_deref()
                .and_then(|d| d.lines().next())
                .unwrap_or("");
            format!("{}: {}", t.name, truncate_display(summary, 100))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dgui::{ask_question, AgentState, Interrupt, Message};

    fn suspended() -> RunOutcome {
        let schema = r#"{"type":"object","properties":{"name":{"type":"string"}}}"#;
        let form = ask_question(schema, "{}");
        RunOutcome::Suspended {
            interrupt: Interrupt::with_id(form.to_value(), "call-1".into()),
            form: Some(form),
            trace: vec![AgentPhase::Chat, AgentPhase::Tool],
        }
    }

    #[test]
    fn truncate_display_handles_short_exact_and_truncated() {
        assert_eq!(truncate_display("hello", 10), "hello");
        assert_eq!(truncate_display("hello", 5), "hello");
        let t = truncate_display("hello world", 8);
        assert_eq!(t, "hello...");
        assert_eq!(truncate_display("héllo", 2), "hé");
    }

    #[test]
    fn form_text_has_title_description_and_schema() {
        let text = format_outcome_text(&suspended());
        assert!(text.starts_with("== Additional Information Required =="));
        assert!(text.contains("Please fill out the following form"));
        assert!(text.contains("\"name\""));
        assert!(!text.contains("uiSchema:"));
    }

    #[test]
    fn completed_text_shows_reply_and_external_call() {
        let outcome = RunOutcome::Completed {
            reply: Some(String::new()),
            state: AgentState::new(vec![Message::user("hi")]),
            trace: vec![AgentPhase::Chat, AgentPhase::Terminated],
            external_call: Some(ToolCall::new("g1", "generateJsonSchema", "{}")),
        };
        let text = format_outcome_text(&outcome);
        assert_eq!(text, "[tool requested: generateJsonSchema {}] (not run by this CLI)");
    }

    #[test]
    fn json_line_for_suspension_carries_form_and_trace() {
        let v = outcome_to_json("t1", &suspended());
        assert_eq!(v["status"], "suspended");
        assert_eq!(v["interrupt_id"], "call-1");
        assert_eq!(v["form"]["type"], "dgui_form");
        assert_eq!(v["trace"][1]["phase"], "tool");
    }

    #[test]
    fn trace_is_arrow_joined() {
        let trace = vec![
            AgentPhase::Chat,
            AgentPhase::Tool,
            AgentPhase::Suspended { call_id: "c1".into() },
        ];
        assert_eq!(format_trace(&trace), "chat -> tool -> suspended(c1)");
    }

    #[test]
    fn tools_text_uses_first_description_line() {
        let tools = vec![ToolSpec {
            name: "t".into(),
            description: Some("first\nsecond".into()),
            input_schema: serde_json::json!({}),
        }];
        assert_eq!(format_tools_text(&tools), "t: first");
    }
}
