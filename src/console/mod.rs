//! Operator console.
//!
//! Reads stdin line by line. The first word selects a command (ignoring
//! case) and the remaining words are passed as arguments. Commands are
//! registered explicitly in [`Console::with_builtin_commands`].
//!
//! Stdin is read on a detached OS thread. A blocking read cannot be
//! cancelled, and the runtime must be free to shut down while one is pending.

pub mod command;
pub mod commands;

use std::io::BufRead;
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;

use crate::lifecycle::Shutdown;
use crate::session::SessionRegistry;

pub use command::{Command, CommandPage, CommandRegistry, PAGE_SIZE};
pub use commands::{ExitCommand, HelpCommand, RoutesCommand, SessionsCommand};

/// What commands may touch.
#[derive(Clone)]
pub struct ConsoleContext {
    pub registry: Arc<SessionRegistry>,
    pub shutdown: Shutdown,
}

pub struct Console {
    context: ConsoleContext,
    commands: CommandRegistry,
}

impl Console {
    pub fn new(context: ConsoleContext) -> Self {
        Self {
            context,
            commands: CommandRegistry::new(),
        }
    }

    /// Console with `help`, `exit`, `sessions` and `routes`.
    pub fn with_builtin_commands(context: ConsoleContext) -> Self {
        let mut console = Self::new(context);
        console.register(Box::new(HelpCommand));
        console.register(Box::new(ExitCommand));
        console.register(Box::new(SessionsCommand));
        console.register(Box::new(RoutesCommand));
        console
    }

    pub fn register(&mut self, command: Box<dyn Command>) -> bool {
        self.commands.register(command)
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Execute one input line. `None` for blank lines and unknown commands.
    pub fn handle_line(&self, line: &str) -> Option<Vec<String>> {
        let mut words = line.split_whitespace();
        let name = words.next()?;
        let args: Vec<&str> = words.collect();

        match self.commands.get(name) {
            Some(command) => Some(command.execute(&self.context, &self.commands, &args)),
            None => {
                tracing::debug!(command = %name, "Unknown console command");
                None
            }
        }
    }

    /// Execute lines from `input` until it closes or shutdown is triggered.
    pub async fn run(self, mut input: mpsc::UnboundedReceiver<String>) {
        let mut shutdown = self.context.shutdown.subscribe();

        loop {
            tokio::select! {
                line = input.recv() => match line {
                    Some(line) => {
                        for output in self.handle_line(&line).unwrap_or_default() {
                            println!("{output}");
                        }
                    }
                    None => {
                        tracing::debug!("Console input closed");
                        break;
                    }
                },
                _ = shutdown.recv() => break,
            }
        }
    }
}

/// Forward stdin lines from a detached thread.
///
/// The thread stops at EOF or once the receiver is dropped.
pub fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("console-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read console input");
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!(error = %e, "Failed to start console input thread");
    }
    rx
}

/// Spawn the console loop on the runtime, reading from stdin.
pub fn spawn_console(context: ConsoleContext) {
    tokio::spawn(Console::with_builtin_commands(context).run(stdin_lines()));
}
