//! Operator confirmations.
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

pub trait Confirm {
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Asks on stderr and reads the answer from stdin. Anything but `y`/`yes`
/// (including end of input) is a no.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Confirm for TerminalPrompt {
    fn confirm(&self, question: &str) -> Result<bool> {
        eprint!("{question} [y/N]: ");
        io::stderr().flush().context("flush prompt")?;
        let mut input = String::new();
        io::stdin()
            .lock()
            .read_line(&mut input)
            .context("read confirmation from stdin")?;
        Ok(parse_answer(&input))
    }
}

/// Answers every question with yes, for unattended runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, question: &str) -> Result<bool> {
        tracing::info!(question, "assuming yes");
        Ok(true)
    }
}

pub fn parse_answer(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
