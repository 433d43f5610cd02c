//! Password input
//!
//! The terminal prompt reads with echo disabled. Non-interactive callers
//! (the `--password` flag, tests) hand over a fixed script of answers.

use std::collections::VecDeque;

use crate::crypto::SecureString;
use crate::error::{DredgeError, DredgeResult};

/// Source of passwords typed by the user
pub trait PasswordPrompt {
    fn prompt(&mut self, message: &str) -> DredgeResult<SecureString>;
}

/// Hidden-input prompt on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt(&mut self, message: &str) -> DredgeResult<SecureString> {
        let input = rpassword::prompt_password(message)
            .map_err(|e| DredgeError::io("Failed to read password", e))?;
        Ok(password_from_line(input))
    }
}

/// Drop a trailing line ending, keeping every other character
fn password_from_line(mut line: String) -> SecureString {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    SecureString::from(line)
}

/// Answers prompts from a fixed queue
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<SecureString>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SecureString>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn prompt(&mut self, message: &str) -> DredgeResult<SecureString> {
        self.answers.pop_front().ok_or_else(|| {
            DredgeError::InvalidInput(format!(
                "no password available for prompt {:?}",
                message.trim()
            ))
        })
    }
}

/// Ask for a new password twice and require both entries to match
pub fn prompt_new_password(prompt: &mut dyn PasswordPrompt) -> DredgeResult<SecureString> {
    let first = prompt.prompt("New password: ")?;
    if first.is_empty() {
        return Err(DredgeError::InvalidInput("password cannot be empty".into()));
    }

    let second = prompt.prompt("Confirm password: ")?;
    if first != second {
        return Err(DredgeError::InvalidInput("passwords do not match".into()));
    }

    Ok(first)
}
