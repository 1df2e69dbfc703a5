//! Test utilities and mocks for curlpack unit tests.
//!
//! The build backends only talk to the outside world through
//! [`CommandRunner`], so tests swap in a [`RecordingRunner`] and assert on
//! the commands and environments it saw.
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = RecordingRunner::new().fail_on(CommandPattern::Contains("make install".into()));
//! let err = invoke(&ctx, &runner, &Shell::quiet()).unwrap_err();
//! assert_eq!(runner.calls().last().unwrap(), "make install");
//! ```

pub mod fixtures;

use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::util::process::{CommandRunner, ProcessBuilder};

pub use fixtures::*;

/// Pattern for matching commands in RecordingRunner.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
        }
    }
}

/// Command runner that records every command instead of running it.
///
/// Commands matching the failure pattern are recorded and then fail, the
/// way a tool exiting non-zero would.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    commands: Mutex<Vec<ProcessBuilder>>,
    fail_on: Option<CommandPattern>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first and every later command matching `pattern`.
    pub fn fail_on(mut self, pattern: CommandPattern) -> Self {
        self.fail_on = Some(pattern);
        self
    }

    /// Every recorded command.
    pub fn commands(&self) -> Vec<ProcessBuilder> {
        self.commands.lock().unwrap().clone()
    }

    /// Display strings of the recorded commands.
    pub fn calls(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }

    /// First recorded command containing `needle`.
    pub fn find(&self, needle: &str) -> Option<ProcessBuilder> {
        self.commands()
            .into_iter()
            .find(|c| c.display_command().contains(needle))
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<()> {
        self.commands.lock().unwrap().push(cmd.clone());
        let line = cmd.display_command();
        if let Some(pattern) = &self.fail_on {
            if pattern.matches(&line) {
                bail!("`{}` failed with exit code Some(2)", line);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_runner() {
        let runner = RecordingRunner::new().fail_on(CommandPattern::StartsWith("make".into()));
        runner.run(&ProcessBuilder::new("cmake").arg("--version")).unwrap();
        assert!(runner.run(&ProcessBuilder::new("make").arg("install")).is_err());
        assert_eq!(runner.calls(), vec!["cmake --version", "make install"]);
    }
}
