//! Console Prompts
//!
//! Line-oriented input for the menu loop. `Console` is the seam between the
//! loop and the terminal: `Terminal` reads through dialoguer, tests drive the
//! loop with scripted lines.
//!
//! # Numeric Input
//! Years and book ids are read with a bounded retry. Each malformed entry
//! prints a notice and re-prompts; `q` or `quit` cancels the action; running
//! out of attempts fails with `InvalidInput`.

use dialoguer::{Input, Password};

use crate::error::{LibraryError, Result};

const RETRY_NOTICE: &str = "Invalid input. Please enter a valid integer (or 'q' to cancel).";

/// Source of user input
pub trait Console {
    /// Read one line of text (may be empty)
    fn text(&mut self, prompt: &str) -> Result<String>;

    /// Read a secret without echo
    fn password(&mut self, prompt: &str) -> Result<String>;

    /// Show informational text (menus, listings)
    fn show(&mut self, text: &str);

    /// Show a non-fatal notice (malformed input, cancelled action)
    fn notice(&mut self, message: &str);
}

/// Interactive terminal console
#[derive(Debug, Default)]
pub struct Terminal;

impl Console for Terminal {
    fn text(&mut self, prompt: &str) -> Result<String> {
        let line = Input::<String>::new().with_prompt(prompt).allow_empty(true).interact_text()?;
        Ok(line)
    }

    fn password(&mut self, prompt: &str) -> Result<String> {
        let secret = Password::new().with_prompt(prompt).allow_empty_password(true).interact()?;
        Ok(secret)
    }

    fn show(&mut self, text: &str) {
        println!("{text}");
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// One parsed numeric entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberInput {
    /// A well-formed integer
    Value(i32),
    /// Cancellation sentinel (`q` / `quit`)
    Quit,
    /// Anything else
    Invalid,
}

/// Parse a year or id entry
#[must_use]
pub fn parse_number_input(input: &str) -> NumberInput {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("q") || trimmed.eq_ignore_ascii_case("quit") {
        return NumberInput::Quit;
    }
    trimmed.parse::<i32>().map_or(NumberInput::Invalid, NumberInput::Value)
}

/// Prompt for an integer, allowing up to `attempts` tries
///
/// Returns `Ok(None)` when the user cancels.
///
/// # Errors
/// Returns `InvalidInput` after `attempts` malformed entries, or
/// `ConsoleError` if the input stream fails.
pub fn prompt_number<C: Console + ?Sized>(
    console: &mut C,
    prompt: &str,
    attempts: u32,
) -> Result<Option<i32>> {
    for attempt in 1..=attempts {
        let line = console.text(prompt)?;
        match parse_number_input(&line) {
            NumberInput::Value(n) => return Ok(Some(n)),
            NumberInput::Quit => return Ok(None),
            NumberInput::Invalid => {
                tracing::debug!(attempt, attempts, "malformed numeric input");
                if attempt < attempts {
                    console.notice(RETRY_NOTICE);
                }
            }
        }
    }

    Err(LibraryError::invalid_input(format!(
        "{prompt}: no valid integer after {attempts} attempts"
    )))
}

/// Prompt for a non-empty value, trimming surrounding whitespace
///
/// # Errors
/// Returns `InvalidInput` when the entry is blank.
pub fn prompt_required<C: Console + ?Sized>(console: &mut C, prompt: &str) -> Result<String> {
    let value = console.text(prompt)?.trim().to_string();
    if value.is_empty() {
        return Err(LibraryError::invalid_input(format!("{prompt}: a value is required")));
    }
    Ok(value)
}
