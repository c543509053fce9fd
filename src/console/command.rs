//! Console command seam and the paged command registry.

use crate::console::ConsoleContext;

/// Commands listed per `help` page.
pub const PAGE_SIZE: usize = 10;

/// A named operator command.
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn usage(&self) -> &'static str;

    /// Run with the words that followed the command name; returns lines to print.
    fn execute(&self, context: &ConsoleContext, commands: &CommandRegistry, args: &[&str]) -> Vec<String>;
}

/// One page of the registry listing.
pub struct CommandPage<'a> {
    /// 1-based.
    pub current: usize,
    pub total: usize,
    pub commands: &'a [Box<dyn Command>],
}

/// Commands in registration order, unique by case-insensitive name.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `command`; a name already taken (ignoring case) is skipped.
    pub fn register(&mut self, command: Box<dyn Command>) -> bool {
        if self.get(command.name()).is_some() {
            tracing::debug!(command = command.name(), "Command already registered");
            return false;
        }
        tracing::info!("Registered command: {}", command.name());
        self.commands.push(command);
        true
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .iter()
            .find(|command| command.name().eq_ignore_ascii_case(name))
            .map(|command| command.as_ref())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.commands.len().div_ceil(PAGE_SIZE)
    }

    /// Page `page` of the listing. Pages count from 1; 0 is treated as 1.
    pub fn page(&self, page: usize) -> Option<CommandPage<'_>> {
        let total = self.page_count();
        let current = page.max(1);
        if current > total {
            return None;
        }

        let start = (current - 1) * PAGE_SIZE;
        let end = (start + PAGE_SIZE).min(self.commands.len());
        Some(CommandPage {
            current,
            total,
            commands: &self.commands[start..end],
        })
    }
}
