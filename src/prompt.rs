//! Interactive completion of a run's parameters.
//!
//! Used when the command line leaves the root or the mode unspecified.
//! Questions go to the given writer; answers are read line by line.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::coordinator::CacheMode;
use crate::{Error, Result};

/// Expand a leading `~` and trim surrounding whitespace.
#[must_use]
pub fn expand_path(text: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(text.trim()).as_ref())
}

/// Line-oriented question asker.
#[derive(Debug)]
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    /// Create a prompter over the given streams.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask for the folder to scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is closed or unreadable.
    pub fn root(&mut self) -> Result<PathBuf> {
        let answer = self.ask("Enter movie folder path")?;
        Ok(expand_path(&answer))
    }

    /// Ask for the cache mode.
    ///
    /// Only an answer of `y` counts as yes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is closed or unreadable.
    pub fn mode(&mut self) -> Result<CacheMode> {
        if self.confirm("Initialize cache? (y/n)")? {
            return Ok(CacheMode::Seed);
        }
        if self.confirm("Ignore cache? (y/n)")? {
            return Ok(CacheMode::IgnoreCache);
        }
        Ok(CacheMode::UseCache)
    }

    /// Ask for a modification time range. An empty answer means no filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is closed or unreadable.
    pub fn time_filter(&mut self) -> Result<Option<String>> {
        let answer =
            self.ask("Enter file modification time range (e.g., 2m, 3h, 5d, 2w, all)")?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        Ok(self.ask(question)?.eq_ignore_ascii_case("y"))
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}: ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::config(format!(
                "no answer to '{question}': input closed"
            )));
        }
        Ok(line.trim().to_string())
    }
}
