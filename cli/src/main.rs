//! dgui-agent binary: chat with the form agent from the command line.
//!
//! A message runs one turn; when the agent asks for a form, the form is printed and one
//! line of JSON is read from stdin as the answer (or taken from `--resume`).
//! Subcommand `tools` lists the tool definitions bound to the model.

mod logging;
mod repl;

use clap::{Parser, Subcommand};
use cli::{
    bound_tools, build_agent, format_tools_text, parse_resume_value, settle, OutputMode,
    RunOptions, APP_NAME,
};
use repl::run_repl_loop;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(name = "dgui-agent")]
#[command(about = "dgui: chat with the form agent; forms are answered with a JSON line on stdin")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// User message (or pass as positional arguments)
    #[arg(short, long, value_name = "TEXT")]
    message: Option<String>,

    /// Positional args: user message when -m/--message is not used
    #[arg(trailing_var_arg = true)]
    rest: Vec<String>,

    /// Thread ID for the conversation (default: a fresh id per process)
    #[arg(long, value_name = "ID")]
    thread_id: Option<String>,

    /// Model name; overrides `[agent].model` and DGUI_MODEL
    #[arg(long, value_name = "NAME")]
    model: Option<String>,

    /// Answer for the first form of this turn, as JSON (plain text is sent as a string)
    #[arg(long, value_name = "JSON")]
    resume: Option<String>,

    /// Interactive REPL: after the reply, keep reading messages on the same thread
    #[arg(short, long)]
    interactive: bool,

    /// Print each outcome as one JSON line (for tool list: a JSON array)
    #[arg(long)]
    json: bool,

    /// Verbose: log node enter/exit and print the phase trace to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Use a scripted offline model (asks for a name, then thanks you)
    #[arg(long)]
    mock: bool,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// List the tool definitions bound to the model (name and description)
    Tools,
}

/// Generates a process-unique thread id when the user does not provide one.
fn generate_thread_id() -> String {
    format!("thread-{}", uuid::Uuid::new_v4())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_and_apply(APP_NAME, None).ok();
    logging::init()?;

    let args = Args::parse();

    if let Some(Command::Tools) = &args.cmd {
        let tools = bound_tools();
        if args.json {
            println!("{}", serde_json::to_string_pretty(&tools)?);
        } else {
            println!("{}", format_tools_text(&tools));
        }
        return Ok(());
    }

    let message = args.message.clone().or_else(|| {
        if args.rest.is_empty() {
            None
        } else {
            Some(args.rest.join(" "))
        }
    });
    if !args.interactive && message.is_none() {
        eprintln!("dgui-agent: provide a message via -m/--message or positional args");
        std::process::exit(1);
    }

    let opts = RunOptions {
        model: args.model.clone(),
        mock: args.mock,
        verbose: args.verbose,
    };
    let mode = OutputMode {
        json: args.json,
        verbose: args.verbose,
    };
    let agent = build_agent(&opts)?;
    let thread_id = args.thread_id.clone().unwrap_or_else(generate_thread_id);
    tracing::info!(thread_id = %thread_id, mock = args.mock, "dgui-agent start");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut out = std::io::stdout();

    if let Some(msg) = message.filter(|m| !m.trim().is_empty()) {
        let preset = args.resume.as_deref().map(parse_resume_value);
        let outcome = match agent.run(&thread_id, &msg).await {
            Ok(o) => o,
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(1);
            }
        };
        let settled = settle(&agent, &thread_id, outcome, preset, &mut input, &mut out, mode).await;
        if let Err(e) = settled {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    }

    if args.interactive {
        run_repl_loop(&agent, &thread_id, &mut input, &mut out, mode).await?;
    }
    Ok(())
}
