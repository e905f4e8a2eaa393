//! Interactive chat loop.
//!
//! Stdin is read concurrently with the event stream of a running turn, so
//! `/switch` and `/new` take effect immediately and cancel the turn. Other
//! lines typed while a reply streams are queued until the turn ends.

use std::collections::VecDeque;
use std::io::Write;

use anyhow::{Context, Result};
use counsel_api_client::{ApiClient, ChatStream};
use counsel_client::{ChatTurnController, SessionStore, Turn};
use counsel_core::{SessionId, SessionSummary};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::commands::Connection;
use crate::render::{self, TerminalPresenter};

const HELP: &str = "\
commands:
  /new                 start a new consultation
  /sessions            list consultations
  /switch <id|number>  open a consultation
  /delete <id|number>  delete a consultation
  /help                show this help
  /quit                exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Blank,
    Text(String),
    New,
    Sessions,
    Switch(String),
    Delete(String),
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Blank;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Text(line.to_string());
    };
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(name, arg)| (name, arg.trim()))
        .unwrap_or((command, ""));
    match name {
        "new" => Input::New,
        "sessions" | "history" => Input::Sessions,
        "switch" => Input::Switch(arg.to_string()),
        "delete" => Input::Delete(arg.to_string()),
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

/// A roster number (1-based) or a literal session id.
pub fn resolve_target(arg: &str, roster: &[SessionSummary]) -> Option<SessionId> {
    let arg = arg.trim();
    if arg.is_empty() {
        return None;
    }
    match arg.parse::<usize>() {
        Ok(n) if (1..=roster.len()).contains(&n) => Some(roster[n - 1].session_id.clone()),
        _ => Some(SessionId::new(arg)),
    }
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run_chat(conn: Connection, session: Option<String>) -> Result<()> {
    let presenter = TerminalPresenter::new(std::io::stdout());
    let mut store = conn.into_store(Box::new(presenter));
    match session {
        Some(id) => {
            store.switch_to(SessionId::new(id)).await;
        }
        None => store.start_new().await,
    }
    println!("(/help for commands)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut controller = ChatTurnController::new();
    let mut backlog = VecDeque::new();

    loop {
        let line = match backlog.pop_front() {
            Some(line) => line,
            None => {
                prompt();
                match lines.next_line().await.context("Failed to read input")? {
                    Some(line) => line,
                    None => break,
                }
            }
        };

        let flow = match parse_input(&line) {
            Input::Text(text) => match controller.send_turn(&mut store, &text).await {
                Some(turn) => stream_turn(&mut store, turn, &mut lines, &mut backlog).await?,
                None => Flow::Continue,
            },
            other => handle_command(&mut store, other).await,
        };
        if let Flow::Quit = flow {
            break;
        }
    }
    Ok(())
}

async fn stream_turn<R>(
    store: &mut SessionStore<ApiClient>,
    mut turn: Turn<ChatStream>,
    lines: &mut Lines<R>,
    backlog: &mut VecDeque<String>,
) -> Result<Flow>
where
    R: AsyncBufRead + Unpin,
{
    let mut stdin_open = true;
    loop {
        tokio::select! {
            incoming = turn.next_incoming() => {
                let Some(incoming) = incoming else {
                    return Ok(Flow::Continue);
                };
                if turn.apply(incoming, store).await.is_final() {
                    return Ok(Flow::Continue);
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line.context("Failed to read input")? else {
                    stdin_open = false;
                    continue;
                };
                match parse_input(&line) {
                    Input::Quit => return Ok(Flow::Quit),
                    Input::New => {
                        store.start_new().await;
                        return Ok(Flow::Continue);
                    }
                    Input::Switch(arg) => match resolve_target(&arg, store.roster()) {
                        Some(id) => {
                            store.switch_to(id).await;
                            return Ok(Flow::Continue);
                        }
                        None => println!("usage: /switch <id|number>"),
                    },
                    _ => backlog.push_back(line),
                }
            }
        }
    }
}

async fn handle_command(store: &mut SessionStore<ApiClient>, input: Input) -> Flow {
    match input {
        Input::Blank | Input::Text(_) => {}
        Input::New => store.start_new().await,
        Input::Sessions => {
            store.refresh_roster().await;
            print!(
                "{}",
                render::format_roster(store.roster(), store.active(), store.notices())
            );
        }
        Input::Switch(arg) => match resolve_target(&arg, store.roster()) {
            Some(id) => {
                store.switch_to(id).await;
            }
            None => println!("usage: /switch <id|number>"),
        },
        Input::Delete(arg) => match resolve_target(&arg, store.roster()) {
            Some(id) => match store.delete(&id).await {
                Ok(()) => println!("deleted {id}"),
                Err(e) => eprintln!("Error: failed to delete {id}: {e}"),
            },
            None => println!("usage: /delete <id|number>"),
        },
        Input::Help => println!("{HELP}"),
        Input::Quit => return Flow::Quit,
        Input::Unknown(name) => println!("unknown command /{name} (see /help)"),
    }
    Flow::Continue
}

fn prompt() {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "> ");
    let _ = stdout.flush();
}
