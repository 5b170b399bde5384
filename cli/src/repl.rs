//! Interactive REPL loop: read stdin, run a turn, answer forms, repeat until EOF or quit.
//!
//! Used when `-i/--interactive` is passed. Every turn goes to the same thread, so the
//! conversation keeps its history.

use std::io::Write;

use tokio::io::{AsyncBufRead, Lines};

use cli::{parse_resume_value, settle, write_outcome, OutputMode, RunError};
use dgui::{FormAgent, RunOutcome};

/// Runs the REPL loop: prompt, read line, run the agent, settle forms, repeat.
///
/// Exits on EOF (Ctrl+D) or `quit`/`exit`/`/quit`. Blank lines are skipped.
/// On run error, prints to stderr and continues. When the error left the thread
/// suspended (the model failed after a form was answered), the form is shown again and
/// the next line answers it.
pub async fn run_repl_loop<R, W>(
    agent: &FormAgent,
    thread_id: &str,
    input: &mut Lines<R>,
    out: &mut W,
    mode: OutputMode,
) -> Result<(), RunError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut pending = agent.pending_outcome(thread_id).await?.is_some();
    loop {
        if !mode.json {
            write!(out, "{}", if pending { "answer (JSON)> " } else { "> " })?;
            out.flush()?;
        }

        let line = match input.next_line().await? {
            None => break,
            Some(s) if s.trim().is_empty() => continue,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };

        pending = match run_line(agent, thread_id, &line, pending, input, out, mode).await {
            Ok(outcome) => outcome.is_suspended(),
            Err(e) => {
                eprintln!("error: {}", e);
                reshow_pending_form(agent, thread_id, out, mode).await?
            }
        };
    }

    if !mode.json {
        writeln!(out, "Bye.")?;
    }
    Ok(())
}

/// One REPL line: the answer to a still-pending form, or a new user turn.
async fn run_line<R, W>(
    agent: &FormAgent,
    thread_id: &str,
    line: &str,
    pending: bool,
    input: &mut Lines<R>,
    out: &mut W,
    mode: OutputMode,
) -> Result<RunOutcome, RunError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let outcome = if pending {
        agent.resume(thread_id, parse_resume_value(line)).await?
    } else {
        agent.run(thread_id, line).await?
    };
    settle(agent, thread_id, outcome, None, input, out, mode).await
}

/// Prints the form a failed step left pending; returns whether there was one.
async fn reshow_pending_form<W: Write>(
    agent: &FormAgent,
    thread_id: &str,
    out: &mut W,
    mode: OutputMode,
) -> Result<bool, RunError> {
    match agent.pending_outcome(thread_id).await? {
        Some(outcome) => {
            if !mode.json {
                writeln!(out, "The form is still waiting for an answer.")?;
            }
            write_outcome(out, thread_id, &outcome, mode)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn is_quit_command(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    matches!(lower.as_str(), "quit" | "exit" | "/quit")
}
