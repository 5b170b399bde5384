//! Library side of the `dgui-agent` CLI: builds the form agent, drives a turn through
//! its form interrupts, and renders outcomes as text or JSON lines.

pub mod run;

pub use run::display::{
    format_form, format_outcome_text, format_tools_text, format_trace, outcome_to_json,
    truncate_display,
};
pub use run::{
    bound_tools, build_agent, caller_tools, demo_llm, parse_resume_value, settle, write_outcome,
    OutputMode, RunError, RunOptions, APP_NAME,
};
