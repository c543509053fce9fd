//! Built-in console commands.

use std::time::Instant;

use crate::console::command::{Command, CommandRegistry};
use crate::console::ConsoleContext;

pub struct HelpCommand;

impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        "help"
    }

    fn description(&self) -> &'static str {
        "Prints help about all the commands or of specified command"
    }

    fn usage(&self) -> &'static str {
        "help [-p <page>] [command]"
    }

    fn execute(&self, _: &ConsoleContext, commands: &CommandRegistry, args: &[&str]) -> Vec<String> {
        let page = match args {
            [] => 1,
            ["-p"] => return vec!["Missing page number argument (help -p <here>)".to_string()],
            ["-p", raw, ..] => match raw.parse::<usize>() {
                Ok(page) => page,
                Err(_) => return vec![format!("Invalid page number provided: {raw}")],
            },
            [name, ..] => {
                return match commands.get(name) {
                    Some(command) => describe(command),
                    None => vec![format!("No such command: {name}")],
                };
            }
        };

        let Some(listing) = commands.page(page) else {
            return vec![format!("Cannot get commands page {page}.")];
        };

        let mut lines = Vec::new();
        for command in listing.commands {
            lines.extend(describe(command.as_ref()));
            lines.push(String::new());
        }
        lines.push(format!("Page: {} | {}", listing.current, listing.total));
        lines
    }
}

fn describe(command: &dyn Command) -> Vec<String> {
    vec![
        format!("{}: {}", command.name(), command.usage()),
        command.description().to_string(),
    ]
}

pub struct ExitCommand;

impl Command for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn description(&self) -> &'static str {
        "Stops the gateway gracefully"
    }

    fn usage(&self) -> &'static str {
        "exit [reason]"
    }

    fn execute(&self, context: &ConsoleContext, _: &CommandRegistry, args: &[&str]) -> Vec<String> {
        if args.is_empty() {
            tracing::warn!("Exiting application");
        } else {
            tracing::warn!("Exiting application (Reason: {})", args.join(" "));
        }
        context.shutdown.trigger();
        Vec::new()
    }
}

pub struct SessionsCommand;

impl Command for SessionsCommand {
    fn name(&self) -> &'static str {
        "sessions"
    }

    fn description(&self) -> &'static str {
        "Shows how many client sessions are held and how many are idle"
    }

    fn usage(&self) -> &'static str {
        "sessions"
    }

    fn execute(&self, context: &ConsoleContext, _: &CommandRegistry, _: &[&str]) -> Vec<String> {
        let registry = &context.registry;
        vec![format!(
            "Sessions: {} ({} idle)",
            registry.session_count(),
            registry.idle_count(Instant::now())
        )]
    }
}

pub struct RoutesCommand;

impl Command for RoutesCommand {
    fn name(&self) -> &'static str {
        "routes"
    }

    fn description(&self) -> &'static str {
        "Lists every registered endpoint with its kind"
    }

    fn usage(&self) -> &'static str {
        "routes"
    }

    fn execute(&self, context: &ConsoleContext, _: &CommandRegistry, _: &[&str]) -> Vec<String> {
        context
            .registry
            .tree()
            .describe()
            .into_iter()
            .map(|(path, kind)| format!("{:<10} {}", kind.as_str(), path))
            .collect()
    }
}
