//! Interactive TTY mode (spec §6 "Interactive mode").

use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::config::command_history_path;
use crate::errors::CliError;

const HISTORY_CAP: usize = 200;

/// Interactive mode is enabled iff stdin+stdout are both a TTY, or the
/// force-interactive override is set (used by tests/CI harnesses that
/// pipe a pty).
pub fn is_interactive() -> bool {
    (std::io::stdin().is_terminal() && std::io::stdout().is_terminal())
        || std::env::var("BROWSER_USE_CLI_FORCE_INTERACTIVE").as_deref() == Ok("1")
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommandHistory {
    entries: Vec<String>,
}

impl CommandHistory {
    pub fn load() -> Self {
        std::fs::read_to_string(command_history_path())
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn push(&mut self, command: String) {
        if self.entries.len() >= HISTORY_CAP {
            self.entries.remove(0);
        }
        self.entries.push(command);
    }

    pub fn save(&self) -> Result<(), CliError> {
        let path = command_history_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

pub enum Command {
    Exit,
    Help,
    Task(String),
}

/// Classifies one interactive input line (spec §6: `exit`/`quit`/`:q`
/// terminate; `help`/`?` print help; anything else is task text).
pub fn classify(line: &str) -> Command {
    match line.trim() {
        "exit" | "quit" | ":q" => Command::Exit,
        "help" | "?" => Command::Help,
        other => Command::Task(other.to_string()),
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  <task text>   run the agent on this task
  help, ?       show this help
  exit, quit, :q  terminate the session";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_all_exit_spellings() {
        assert!(matches!(classify("exit"), Command::Exit));
        assert!(matches!(classify("quit"), Command::Exit));
        assert!(matches!(classify(":q"), Command::Exit));
    }

    #[test]
    fn recognizes_help_aliases() {
        assert!(matches!(classify("help"), Command::Help));
        assert!(matches!(classify("?"), Command::Help));
    }

    #[test]
    fn anything_else_is_task_text() {
        assert!(matches!(classify("go to example.com"), Command::Task(_)));
    }

    #[test]
    fn history_evicts_oldest_past_capacity() {
        let mut history = CommandHistory::default();
        for i in 0..(HISTORY_CAP + 10) {
            history.push(format!("task {i}"));
        }
        assert_eq!(history.entries().len(), HISTORY_CAP);
        assert_eq!(history.entries()[0], "task 10");
    }
}
