//! Terminal input handling for the client.

use std::io::Write;

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use crate::domain::MediaKind;
use crate::session::UserCommand;

pub const HELP: &str = "Commands: /share, /audio <device>, /video <device>, /leave, /end";

/// Redisplay the prompt after printing a message
pub fn redisplay_prompt(prompt: &str) {
    print!("{}", prompt);
    std::io::stdout().flush().ok();
}

/// Turn one input line into a command. Lines not starting with `/` are chat messages.
pub fn parse_command(line: &str) -> Result<UserCommand, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(UserCommand::Chat(line.to_string()));
    };

    let (name, argument) = match command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (command, ""),
    };
    match (name, argument) {
        ("share", _) => Ok(UserCommand::ToggleScreenShare),
        ("leave", _) => Ok(UserCommand::Leave),
        ("end", _) => Ok(UserCommand::EndCall),
        ("audio" | "video", "") => Err(format!("Usage: /{name} <device>")),
        ("audio", device) => Ok(UserCommand::SwitchDevice(
            MediaKind::Audio,
            device.to_string(),
        )),
        ("video", device) => Ok(UserCommand::SwitchDevice(
            MediaKind::Video,
            device.to_string(),
        )),
        _ => Err(format!("Unknown command '/{name}'. {HELP}")),
    }
}

/// Read lines on a blocking thread and forward them as commands.
///
/// Ctrl+C or Ctrl+D ends the thread, which closes `commands`.
pub fn spawn_input_thread(
    prompt: String,
    commands: mpsc::UnboundedSender<UserCommand>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();

                    let command = match parse_command(line) {
                        Ok(command) => command,
                        Err(usage) => {
                            println!("{}", usage);
                            continue;
                        }
                    };
                    let finished = matches!(command, UserCommand::Leave | UserCommand::EndCall);
                    if commands.send(command).is_err() || finished {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    })
}
