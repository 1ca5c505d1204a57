//! Terminal screens.
//!
//! Each screen reads lines from an async buffered reader and writes to a
//! `std::io::Write`, so tests drive them with in-memory buffers. Rendering
//! helpers return plain strings; color is applied only when writing.

pub mod chat;
pub mod home;
pub mod login;

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::services::auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error("terminal io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("input closed")]
    InputClosed,
}

/// Line-oriented terminal input.
pub struct Input<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Input<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines() }
    }

    /// Print `label`, then read one line. `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the label or reading fails.
    pub async fn prompt(&mut self, out: &mut impl Write, label: &str) -> Result<Option<String>, ScreenError> {
        write!(out, "{label}")?;
        out.flush()?;
        Ok(self.lines.next_line().await?)
    }

    /// Like [`Input::prompt`] but end of input is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ScreenError::InputClosed`] at end of input.
    pub async fn require(&mut self, out: &mut impl Write, label: &str) -> Result<String, ScreenError> {
        self.prompt(out, label).await?.ok_or(ScreenError::InputClosed)
    }
}

/// Standard input as a screen reader.
#[must_use]
pub fn stdin() -> Input<tokio::io::BufReader<tokio::io::Stdin>> {
    Input::new(tokio::io::BufReader::new(tokio::io::stdin()))
}
