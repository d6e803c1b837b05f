//! Choosers: where the resolution loop gets its decisions from.
//!
//! - [`DialoguerChooser`] shows an arrow-key menu on a terminal.
//! - [`LineChooser`] prints the options and reads a typed key per line,
//!   asking again until the key is one of the options. Used when stdin is
//!   not a terminal.
//! - [`ScriptedChooser`] replays a fixed list of answers.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use dialoguer::Select;

use super::ResolveError;

/// One selectable option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Key returned when the option is picked
    pub key: String,
    /// Text shown to the user
    pub label: String,
}

impl ChoiceOption {
    /// Create an option.
    #[must_use]
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

/// Source of decisions for the resolution loop.
pub trait Chooser {
    /// Pick one of `options` and return its key.
    ///
    /// # Errors
    ///
    /// Fails when no answer can be obtained.
    fn choose(&mut self, prompt: &str, options: &[ChoiceOption]) -> Result<String, ResolveError>;
}

/// Terminal menu built on `dialoguer`.
#[derive(Debug, Default)]
pub struct DialoguerChooser;

impl Chooser for DialoguerChooser {
    fn choose(&mut self, prompt: &str, options: &[ChoiceOption]) -> Result<String, ResolveError> {
        let items: Vec<String> = options
            .iter()
            .map(|o| format!("{}: {}", o.key, o.label))
            .collect();
        let selection = Select::new()
            .with_prompt(prompt)
            .items(&items)
            .default(0)
            .interact()
            .map_err(|e| ResolveError::Prompt(std::io::Error::other(e)))?;
        options
            .get(selection)
            .map(|o| o.key.clone())
            .ok_or_else(|| ResolveError::InvalidChoice(selection.to_string()))
    }
}

/// Line-based prompt over any reader and writer.
#[derive(Debug)]
pub struct LineChooser<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineChooser<R, W> {
    /// Create a chooser reading answers from `input` and printing to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Chooser for LineChooser<R, W> {
    fn choose(&mut self, prompt: &str, options: &[ChoiceOption]) -> Result<String, ResolveError> {
        loop {
            writeln!(self.output, "{prompt}:").map_err(ResolveError::Prompt)?;
            for option in options {
                writeln!(self.output, "  {}: {}", option.key, option.label)
                    .map_err(ResolveError::Prompt)?;
            }
            write!(self.output, "> ").map_err(ResolveError::Prompt)?;
            self.output.flush().map_err(ResolveError::Prompt)?;

            let mut line = String::new();
            if self.input.read_line(&mut line).map_err(ResolveError::Prompt)? == 0 {
                return Err(ResolveError::EndOfInput);
            }
            let answer = line.trim();
            if options.iter().any(|o| o.key == answer) {
                return Ok(answer.to_string());
            }
        }
    }
}

/// Chooser that returns pre-recorded answers in order.
///
/// Answers are returned as given, valid or not.
#[derive(Debug, Default)]
pub struct ScriptedChooser {
    answers: VecDeque<String>,
    /// Every prompt's options, in the order they were asked
    pub asked: Vec<Vec<ChoiceOption>>,
}

impl ScriptedChooser {
    /// Create a chooser from a list of answers.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Answers not consumed yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Chooser for ScriptedChooser {
    fn choose(&mut self, _prompt: &str, options: &[ChoiceOption]) -> Result<String, ResolveError> {
        self.asked.push(options.to_vec());
        self.answers.pop_front().ok_or(ResolveError::EndOfInput)
    }
}
