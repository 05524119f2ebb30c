// src/shell.rs

use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{self, SendMessageArgs, SetBackendArgs};
use crate::settings::BackendKind;
use crate::state::AppState;
use crate::types::Attachment;

const HELP: &str = "\
/models                    list models on the current backend
/model <name>              select a model
/backend <kind> <endpoint> switch backend (ollama | openai_compatible)
/image <path>              attach an image to the next message
/clear                     clear history
/reset                     restore default settings
/history                   print history
/quit                      exit";

#[derive(Debug, PartialEq)]
pub enum ShellCommand {
    Send(String),
    Models,
    Model(String),
    Backend(BackendKind, String),
    Image(PathBuf),
    Clear,
    Reset,
    History,
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_command(line: &str) -> ShellCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ShellCommand::Send(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match (name, arg) {
        ("models", _) => ShellCommand::Models,
        ("model", "") => ShellCommand::Invalid("usage: /model <name>".to_string()),
        ("model", name) => ShellCommand::Model(name.to_string()),
        ("backend", arg) => parse_backend(arg),
        ("image", "") => ShellCommand::Invalid("usage: /image <path>".to_string()),
        ("image", path) => ShellCommand::Image(PathBuf::from(path)),
        ("clear", _) => ShellCommand::Clear,
        ("reset", _) => ShellCommand::Reset,
        ("history", _) => ShellCommand::History,
        ("help", _) => ShellCommand::Help,
        ("quit", _) | ("exit", _) => ShellCommand::Quit,
        (other, _) => ShellCommand::Invalid(format!("unknown command /{}", other)),
    }
}

fn parse_backend(arg: &str) -> ShellCommand {
    let Some((kind, endpoint)) = arg.split_once(char::is_whitespace) else {
        return ShellCommand::Invalid("usage: /backend <kind> <endpoint>".to_string());
    };
    match serde_json::from_value::<BackendKind>(serde_json::Value::String(kind.to_string())) {
        Ok(kind) => ShellCommand::Backend(kind, endpoint.trim().to_string()),
        Err(_) => ShellCommand::Invalid(format!("unknown backend {}", kind)),
    }
}

fn print_flush(text: &str) {
    let mut out = std::io::stdout();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

/// Line-oriented front-end over stdin/stdout. Returns when stdin closes or on `/quit`.
pub async fn run_shell(state: &AppState) -> anyhow::Result<()> {
    let settings = state.settings();
    println!(
        "prompt-assistant: {} @ {} ({}). /help for commands.",
        settings.backend.model,
        settings.backend.endpoint,
        settings.backend.kind.as_str()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut queued: Vec<Attachment> = Vec::new();

    print_flush("> ");
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            ShellCommand::Send(text) => {
                let images = std::mem::take(&mut queued);
                if text.is_empty() && images.is_empty() {
                    print_flush("> ");
                    continue;
                }
                let mut streamed = false;
                let mut print_delta = |delta: &str| {
                    streamed = true;
                    print_flush(delta);
                };
                let result = commands::send_message(
                    SendMessageArgs { text, images },
                    state,
                    Some(&mut print_delta),
                )
                .await;
                match result {
                    // Errors and non-streamed replies arrive without deltas
                    Ok(reply) if !streamed => println!("{}", reply.content),
                    Ok(_) => println!(),
                    Err(e) => eprintln!("[shell] {}", e),
                }
            }
            ShellCommand::Models => {
                let models = commands::list_models(state).await;
                if models.is_empty() {
                    println!("(no models found)");
                }
                let current = state.settings().backend.model;
                for name in models {
                    let marker = if name == current { "*" } else { " " };
                    println!("{} {}", marker, name);
                }
            }
            ShellCommand::Model(name) => match commands::select_model(&name, state) {
                Ok(s) => println!("model: {}", s.backend.model),
                Err(e) => eprintln!("[shell] {}", e),
            },
            ShellCommand::Backend(kind, endpoint) => {
                match commands::set_backend(SetBackendArgs { kind, endpoint }, state) {
                    Ok(s) => println!("backend: {} @ {}", s.backend.kind.as_str(), s.backend.endpoint),
                    Err(e) => eprintln!("[shell] {}", e),
                }
            }
            ShellCommand::Image(path) => match Attachment::from_path(&path).await {
                Ok(image) => {
                    queued.push(image);
                    println!("attached {} ({} queued)", path.display(), queued.len());
                }
                Err(e) => eprintln!("[shell] could not read {}: {}", path.display(), e),
            },
            ShellCommand::Clear => match commands::clear_history(state) {
                Ok(()) => println!("history cleared"),
                Err(e) => eprintln!("[shell] {}", e),
            },
            ShellCommand::Reset => match commands::reset_settings(state) {
                Ok(s) => println!(
                    "settings reset: {} @ {} ({})",
                    s.backend.model,
                    s.backend.endpoint,
                    s.backend.kind.as_str()
                ),
                Err(e) => eprintln!("[shell] {}", e),
            },
            ShellCommand::History => {
                for msg in commands::get_history(state) {
                    let images = if msg.images.is_empty() {
                        String::new()
                    } else {
                        format!(" [{} image(s)]", msg.images.len())
                    };
                    println!("{}: {}{}", msg.role.as_str(), msg.content, images);
                }
            }
            ShellCommand::Help => println!("{}", HELP),
            ShellCommand::Quit => break,
            ShellCommand::Invalid(msg) => eprintln!("[shell] {}", msg),
        }
        print_flush("> ");
    }

    Ok(())
}
