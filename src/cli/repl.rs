//! Interactive REPL
//!
//! Provides the main user interaction loop.

use std::future::Future;
use std::io::{self, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::agent::{Orchestrator, RecapRecord, RecapStore};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::{Config, Result};

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    agent: Orchestrator,
    config: Config,
}

impl Repl {
    /// Create a REPL around an orchestrator that has not been initialized yet
    pub fn new(agent: Orchestrator, config: Config) -> Self {
        Self { agent, config }
    }

    /// The orchestrator driven by this REPL
    pub fn agent(&self) -> &Orchestrator {
        &self.agent
    }

    /// Run the REPL on stdin, with Ctrl-C as the interrupt.
    pub async fn run(&mut self) -> Result<()> {
        let (tx, rx) = watch::channel(false);
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(true);
            }
        });

        let outcome = self.run_with(BufReader::new(tokio::io::stdin()), rx).await;
        listener.abort();
        outcome
    }

    /// Run the REPL over any line source.
    ///
    /// Once `interrupt` turns true, whatever is in flight (startup, a read,
    /// a slash command or a turn) is dropped and the session ends. Providers
    /// are always shut down before this returns.
    pub async fn run_with<R>(&mut self, input: R, mut interrupt: watch::Receiver<bool>) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.print_banner();

        print!("Initializing...");
        io::stdout().flush()?;

        match until_interrupted(&mut interrupt, self.agent.initialize()).await {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                println!("\n\nInitialization error: {}\n", e);
                return Err(e);
            }
            None => {
                info!("startup interrupted");
                println!("\nInterrupted. Goodbye!");
                self.agent.shutdown().await;
                return Ok(());
            }
        }
        println!(" Ready! {} tool(s) available.\n", self.agent.catalog().len());

        let mut lines = input.lines();
        let outcome = self.session(&mut lines, &mut interrupt).await;
        self.agent.shutdown().await;
        outcome
    }

    async fn session<R>(
        &mut self,
        lines: &mut Lines<R>,
        interrupt: &mut watch::Receiver<bool>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        if self.config.recap.offer_on_start && !self.offer_recap(lines, interrupt).await? {
            interrupted_exit();
            return Ok(());
        }

        loop {
            print!("You: ");
            io::stdout().flush()?;

            let input = match until_interrupted(interrupt, lines.next_line()).await {
                Some(line) => match line? {
                    Some(line) => line,
                    None => {
                        println!("\nGoodbye!");
                        return Ok(());
                    }
                },
                None => {
                    interrupted_exit();
                    return Ok(());
                }
            };

            let command = until_interrupted(
                interrupt,
                handle_command(&input, &mut self.agent, &self.config),
            )
            .await;
            let input = match command {
                None => {
                    interrupted_exit();
                    return Ok(());
                }
                Some(Ok(CommandResult::Exit)) => {
                    println!("\nGoodbye!");
                    return Ok(());
                }
                Some(Ok(CommandResult::Handled(output))) => {
                    println!("{}\n", output);
                    continue;
                }
                Some(Ok(CommandResult::None)) => continue,
                Some(Ok(CommandResult::Continue(input))) => input,
                Some(Err(e)) => {
                    eprintln!("Command error: {}\n", e);
                    continue;
                }
            };

            match until_interrupted(interrupt, self.agent.process_turn(&input)).await {
                None => {
                    interrupted_exit();
                    return Ok(());
                }
                Some(Ok(turn)) => println!("\nAssistant:\n{}\n", turn.answer),
                Some(Err(e)) if e.is_turn_local() => eprintln!("\nError: {}\n", e),
                Some(Err(e)) => {
                    warn!(error = %e, "turn failed");
                    eprintln!("\nError: {}\n", e);
                }
            }
        }
    }

    /// Ask whether to preload the newest recap into the system prompt.
    ///
    /// Returns false when the session was interrupted at the question.
    async fn offer_recap<R>(
        &mut self,
        lines: &mut Lines<R>,
        interrupt: &mut watch::Receiver<bool>,
    ) -> Result<bool>
    where
        R: AsyncBufRead + Unpin,
    {
        let Some(store) = self.agent.recaps() else {
            return Ok(true);
        };
        let Some((latest, text)) = newest_recap(store).await else {
            return Ok(true);
        };

        print!(
            "Found a recap from {}. Load it? [y/N]: ",
            latest.modified_display()
        );
        io::stdout().flush()?;

        let choice = match until_interrupted(interrupt, lines.next_line()).await {
            Some(line) => line?.unwrap_or_default().trim().to_lowercase(),
            None => return Ok(false),
        };
        if choice == "y" || choice == "yes" {
            self.agent.attach_recap(&text)?;
            println!("Recap loaded.\n");
        } else {
            println!();
        }
        Ok(true)
    }

    /// Print the startup banner
    fn print_banner(&self) {
        let providers = self.agent.provider_names();

        println!();
        println!("toolbridge {}", env!("CARGO_PKG_VERSION"));
        println!("─────────────────────────────────────────────");
        println!("Endpoint:   {}", self.config.llm.endpoint);
        println!("Model:      {}", self.agent.model_name());
        println!(
            "Providers:  {}",
            if providers.is_empty() {
                "none".to_string()
            } else {
                providers.join(", ")
            }
        );
        println!();
        println!("Commands: /help, /tools, /status, /config, /recaps, exit");
        println!("─────────────────────────────────────────────");
    }
}

fn interrupted_exit() {
    info!("session interrupted");
    println!("\nInterrupted. Goodbye!");
}

/// Newest recap with its text. A store that cannot be listed or read is
/// logged and treated as empty.
async fn newest_recap(store: &RecapStore) -> Option<(RecapRecord, String)> {
    let latest = match store.latest().await {
        Ok(Some(record)) => record,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, dir = %store.dir().display(), "could not list recaps");
            return None;
        }
    };
    match store.load(&latest.name).await {
        Ok(text) => Some((latest, text)),
        Err(e) => {
            warn!(error = %e, recap = %latest.name, "could not read recap");
            None
        }
    }
}

/// Drive `work` unless the interrupt fires first
async fn until_interrupted<F: Future>(
    interrupt: &mut watch::Receiver<bool>,
    work: F,
) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = interrupted(interrupt) => None,
        output = work => Some(output),
    }
}

/// Resolves once the flag is set. A dropped sender never interrupts.
async fn interrupted(interrupt: &mut watch::Receiver<bool>) {
    let closed = interrupt.wait_for(|hit| *hit).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}
