//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use crate::agent::Orchestrator;
use crate::core::{Config, Result};
use crate::tools::render_catalog;

/// Result of parsing a command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Continue processing as normal input
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Exit the REPL
    Exit,
    /// No output needed
    None,
}

/// Whether the input is a bare exit keyword
pub fn is_exit(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit")
}

/// Parse and handle special commands
pub async fn handle_command(
    input: &str,
    agent: &mut Orchestrator,
    config: &Config,
) -> Result<CommandResult> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(CommandResult::None);
    }
    if is_exit(input) {
        return Ok(CommandResult::Exit);
    }
    let Some(command) = input.strip_prefix('/') else {
        return Ok(CommandResult::Continue(input.to_string()));
    };

    let parts: Vec<&str> = command.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "help" | "?" => Ok(CommandResult::Handled(help_text())),

        "tools" => Ok(CommandResult::Handled(render_catalog(agent.catalog()))),

        "config" => Ok(CommandResult::Handled(format!(
            "# {}\n{}",
            Config::config_file().display(),
            config.to_toml()?
        ))),

        "status" => {
            let providers = agent
                .provider_status()
                .await
                .into_iter()
                .map(|(name, live)| format!("{} ({})", name, if live { "up" } else { "down" }))
                .collect::<Vec<_>>();
            let status = format!(
                "Status:\n\
                 ─────────────────────────────\n\
                 Model:      {}\n\
                 Phase:      {}\n\
                 Providers:  {}\n\
                 Tools:      {}\n\
                 History:    {} messages",
                agent.model_name(),
                agent.phase(),
                if providers.is_empty() {
                    "none".to_string()
                } else {
                    providers.join(", ")
                },
                agent.catalog().len(),
                agent.conversation_length(),
            );
            Ok(CommandResult::Handled(status))
        }

        "recaps" => {
            let Some(store) = agent.recaps() else {
                return Ok(CommandResult::Handled("Recaps are disabled.".to_string()));
            };
            let records = store.list().await?;
            if records.is_empty() {
                return Ok(CommandResult::Handled(format!(
                    "No recaps in {}",
                    store.dir().display()
                )));
            }
            let lines = records
                .iter()
                .map(|r| format!("  {}  {}", r.modified_display(), r.name))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CommandResult::Handled(format!("Recaps (newest first):\n{}", lines)))
        }

        "remember" => {
            let record = agent.summarize_to_recap().await?;
            Ok(CommandResult::Handled(format!("Saved recap {}", record.name)))
        }

        "forget" => {
            if args.is_empty() {
                return Ok(CommandResult::Handled("Usage: /forget <name>".to_string()));
            }
            let Some(store) = agent.recaps() else {
                return Ok(CommandResult::Handled("Recaps are disabled.".to_string()));
            };
            store.delete(args).await?;
            Ok(CommandResult::Handled(format!("Deleted recap {}", args)))
        }

        _ => Ok(CommandResult::Handled(format!(
            "Unknown command: /{}. Type '/help' for available commands.",
            cmd
        ))),
    }
}

/// Generate help text
fn help_text() -> String {
    r#"Commands:
─────────────────────────────────────────────
  /help            Show this help message
  /tools           List the tools the model can call
  /status          Show model, providers and history size
  /config          Show the effective configuration
  /recaps          List saved recaps
  /remember        Summarize this conversation into a recap
  /forget <name>   Delete one recap
  quit, exit       End the session

Keyboard Shortcuts:
  Ctrl+C           Cancel the current turn and exit
  Ctrl+D           Exit
─────────────────────────────────────────────"#
        .to_string()
}
