//! Line-oriented front end over an [`OrchestratorHandle`].
//!
//! Plain lines are sent as user messages. Lines starting with `/` are
//! commands; message numbers are the 1-based positions printed by
//! `/history`.

use std::io::Write;

use parley_ai::{Message, Role, ToolStatus};
use parley_common::{NotificationLevel, ParleyError, SessionError, SessionId};
use parley_session::{ConversationState, OrchestratorHandle, ThinkingStatus};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /new                 start a new session
  /sessions            list saved sessions
  /switch <id>         switch to a session
  /rename <title>      rename the active session
  /delete <id>         delete a session
  /history             show the active transcript
  /pin <n>             pin or unpin message n
  /edit <n> <text>     replace user message n and resend
  /regen <n>           regenerate assistant message n
  /undo                undo the last edit or regenerate
  /retry <n>           retry failed tool call n
  /stats               show context usage
  /quit                exit
Anything else is sent as a message. Ctrl-C cancels a reply in progress.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Send(String),
    New,
    Sessions,
    Switch(String),
    Rename(String),
    Delete(String),
    History,
    Pin(usize),
    Edit(usize, String),
    Regen(usize),
    Undo,
    Retry(usize),
    Stats,
    Help,
    Quit,
    Empty,
}

/// Parse one input line. Errors are usage messages for the user.
pub fn parse_command(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplCommand::Empty);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(ReplCommand::Send(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "new" => Ok(ReplCommand::New),
        "sessions" => Ok(ReplCommand::Sessions),
        "switch" => required(arg, "/switch <id>").map(ReplCommand::Switch),
        "rename" => required(arg, "/rename <title>").map(ReplCommand::Rename),
        "delete" => required(arg, "/delete <id>").map(ReplCommand::Delete),
        "history" => Ok(ReplCommand::History),
        "pin" => index(arg, "/pin <n>").map(ReplCommand::Pin),
        "edit" => {
            let usage = "/edit <n> <text>";
            let (n, text) = arg
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("usage: {usage}"))?;
            let text = required(text.trim(), usage)?;
            Ok(ReplCommand::Edit(index(n, usage)?, text))
        }
        "regen" => index(arg, "/regen <n>").map(ReplCommand::Regen),
        "undo" => Ok(ReplCommand::Undo),
        "retry" => index(arg, "/retry <n>").map(ReplCommand::Retry),
        "stats" => Ok(ReplCommand::Stats),
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        other => Err(format!("unknown command /{other}, try /help")),
    }
}

fn required(arg: &str, usage: &str) -> Result<String, String> {
    if arg.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(arg.to_string())
    }
}

fn index(arg: &str, usage: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("usage: {usage}")),
    }
}

/// The message shown as number `n`.
pub fn message_at(state: &ConversationState, n: usize) -> Result<&Message, String> {
    n.checked_sub(1)
        .and_then(|i| state.messages.get(i))
        .ok_or_else(|| format!("no message {n} (this session has {})", state.messages.len()))
}

/// One transcript line. `detail` replaces the content of tool messages.
pub fn render_message(n: usize, message: &Message, detail: Option<&str>) -> String {
    let pin = if message.pinned { " [pinned]" } else { "" };
    let body = match (message.role, message.tool.as_ref()) {
        (Role::Tool, Some(meta)) => {
            let status = match meta.status {
                ToolStatus::Running => "running",
                ToolStatus::Completed => "done",
                ToolStatus::Failed => "failed",
            };
            let text = detail
                .map(str::to_string)
                .or_else(|| meta.error.clone())
                .unwrap_or_default();
            format!("tool {} ({status}) {text}", meta.name)
        }
        (Role::System, _) if message.is_summary() => format!("summary: {}", message.content),
        (Role::System, _) => format!("system: {}", message.content),
        (Role::User, _) => format!("you: {}", message.content),
        (Role::Assistant, _) | (Role::Tool, None) => format!("parley: {}", message.content),
    };
    format!("{n:>3}{pin} {}", body.trim_end())
}

pub fn render_stats(state: &ConversationState) -> String {
    let ctx = &state.context;
    format!(
        "context {}/{} tokens ({:.0}%, {:?}); system {} user {} assistant {} tool {}; {} trimmed",
        ctx.current_tokens,
        ctx.max_tokens,
        ctx.usage_percent() * 100.0,
        state.usage_band,
        ctx.breakdown.system,
        ctx.breakdown.user,
        ctx.breakdown.assistant,
        ctx.breakdown.tool,
        ctx.trimmed_count,
    )
}

pub fn render_sessions(state: &ConversationState) -> Vec<String> {
    state
        .sessions
        .iter()
        .map(|s| {
            let marker = if s.id == state.session_id { '*' } else { ' ' };
            format!(
                "{marker} {}  {}  ({} messages, updated {})",
                s.id,
                s.title,
                s.message_count,
                s.updated_at.format("%Y-%m-%d %H:%M"),
            )
        })
        .collect()
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Read commands from stdin until `/quit` or end of input.
pub async fn run(handle: &OrchestratorHandle) -> Result<(), ParleyError> {
    println!("parley {} (type /help for commands)", env!("CARGO_PKG_VERSION"));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(ReplCommand::Quit) => break,
            Ok(command) => {
                if let Err(e) = execute(handle, command).await {
                    match e {
                        SessionError::Closed => return Err(e.into()),
                        other => println!("error: {other}"),
                    }
                }
            }
            Err(usage) => println!("{usage}"),
        }
        show_banners(handle).await?;
        prompt();
    }
    Ok(())
}

async fn execute(handle: &OrchestratorHandle, command: ReplCommand) -> Result<(), SessionError> {
    let state = handle.state();
    match command {
        ReplCommand::Empty | ReplCommand::Quit => {}
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Send(text) => {
            handle.send(text, None).await?;
            follow_turn(handle).await?;
        }
        ReplCommand::New => {
            let id = handle.start_new_session().await?;
            println!("started session {id}");
        }
        ReplCommand::Sessions => {
            for line in render_sessions(&state) {
                println!("{line}");
            }
        }
        ReplCommand::Switch(id) => {
            handle.switch_session(&SessionId::from(id)).await?;
            print_history(handle);
        }
        ReplCommand::Rename(title) => {
            if handle.rename_session(&state.session_id, title).await? {
                println!("renamed to \"{}\"", handle.state().title);
            }
        }
        ReplCommand::Delete(id) => {
            handle.delete_session(&SessionId::from(id)).await?;
            println!("deleted");
        }
        ReplCommand::History => print_history(handle),
        ReplCommand::Pin(n) => {
            let id = lookup(&state, n)?;
            let pinned = handle.toggle_pin(&id).await?;
            println!("{} message {n}", if pinned { "pinned" } else { "unpinned" });
        }
        ReplCommand::Edit(n, text) => {
            let id = lookup(&state, n)?;
            handle.edit_and_resend(&id, text).await?;
            follow_turn(handle).await?;
        }
        ReplCommand::Regen(n) => {
            let id = lookup(&state, n)?;
            handle.regenerate(&id).await?;
            follow_turn(handle).await?;
        }
        ReplCommand::Undo => {
            if handle.undo().await? {
                print_history(handle);
            } else {
                println!("nothing to undo");
            }
        }
        ReplCommand::Retry(n) => {
            let id = lookup(&state, n)?;
            handle.retry_tool(&id).await?;
            let state = wait_idle_or_cancel(handle).await?;
            if let Some(message) = state.message(&id) {
                println!("{}", render_message(n, message, tool_detail(handle, message).as_deref()));
            }
        }
        ReplCommand::Stats => println!("{}", render_stats(&state)),
    }
    Ok(())
}

fn lookup(state: &ConversationState, n: usize) -> Result<parley_common::MessageId, SessionError> {
    message_at(state, n)
        .map(|m| m.id.clone())
        .map_err(SessionError::UnknownMessage)
}

fn tool_detail(handle: &OrchestratorHandle, message: &Message) -> Option<String> {
    handle.typed_result(message).map(|r| r.summary())
}

fn print_history(handle: &OrchestratorHandle) {
    let state = handle.state();
    println!("-- {} --", state.title);
    for (i, message) in state.messages.iter().enumerate() {
        let detail = tool_detail(handle, message);
        println!("{}", render_message(i + 1, message, detail.as_deref()));
    }
}

/// Print the reply as it streams, then any tool lines and the plan.
async fn follow_turn(handle: &OrchestratorHandle) -> Result<(), SessionError> {
    let mut rx = handle.subscribe();
    let mut shown = String::new();
    let mut tool: Option<String> = None;

    loop {
        let state = rx.borrow_and_update().clone();
        if let Some(rest) = state.draft.strip_prefix(shown.as_str()) {
            if !rest.is_empty() {
                print!("{rest}");
                shown.push_str(rest);
            }
        } else {
            // A new round started with a fresh draft.
            println!();
            print!("{}", state.draft);
            shown = state.draft.clone();
        }
        let _ = std::io::stdout().flush();

        if let ThinkingStatus::UsingTool(ref name) = state.thinking {
            if tool.as_deref() != Some(name.as_str()) {
                println!("  [{name}]");
                tool = Some(name.clone());
            }
        }

        if state.is_idle() {
            if shown.is_empty() {
                if let Some(last) = state.messages.last().filter(|m| m.role == Role::Assistant) {
                    print!("{}", last.content);
                }
            }
            println!();
            for step in &state.plan {
                println!("  - {} ({:?})", step.display_name, step.status);
            }
            return Ok(());
        }

        tokio::select! {
            changed = rx.changed() => changed.map_err(|_| SessionError::Closed)?,
            _ = tokio::signal::ctrl_c() => {
                handle.cancel().await?;
                println!("\n(cancelled)");
                return Ok(());
            }
        }
    }
}

async fn wait_idle_or_cancel(handle: &OrchestratorHandle) -> Result<ConversationState, SessionError> {
    tokio::select! {
        state = handle.wait_idle() => state,
        _ = tokio::signal::ctrl_c() => {
            handle.cancel().await?;
            Ok(handle.state())
        }
    }
}

/// Print and dismiss the one-shot notice, error banner and notifications.
async fn show_banners(handle: &OrchestratorHandle) -> Result<(), SessionError> {
    let state = handle.state();
    if let Some(ref notice) = state.context_notice {
        println!("note: {}", notice.message);
        handle.dismiss_notice().await?;
    }
    if let Some(ref banner) = state.error_banner {
        println!("error: {banner}");
        handle.dismiss_error().await?;
    }
    for notification in &state.notifications {
        let level = match notification.level {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        println!("{level}: {} ({})", notification.title, notification.body);
        handle.dismiss_notification(notification.id).await?;
    }
    Ok(())
}
