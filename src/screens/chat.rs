//! Chat screen — a line-based REPL over one [`ChatSession`].
//!
//! Every non-command line is sent. Ctrl-C while a reply is pending drops
//! the in-flight request; its late result is discarded. Ctrl-C at the
//! prompt leaves the chat.

use std::fmt::Write as _;
use std::future::Future;
use std::io::Write;

use colored::Colorize;
use tokio::io::AsyncBufRead;
use tracing::debug;

use super::{Input, ScreenError};
use crate::services::auth::IdentityHandle;
use crate::services::chat::{ChatMessage, ChatSession, Phase, SendOutcome};
use crate::services::persona::PersonaCatalog;
use crate::services::store::Sender;

const HELP: &str = "Commands:\n  /help  show this help\n  /quit  leave the chat\n\
Anything else is sent to the assistant.\n\
Ctrl-C cancels a pending reply; at the prompt it leaves the chat.\n";

/// How the screen was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatExit {
    Quit,
    /// The chat is not available to this user; go back home.
    Redirected,
    Failed,
}

#[must_use]
pub fn render_message(message: &ChatMessage, assistant: &str) -> String {
    let speaker = match message.sender {
        Sender::User => "You",
        Sender::Bot => assistant,
    };
    let mut line = format!("{speaker}: {}", message.text);
    if let Some(uri) = &message.image_uri {
        if uri.starts_with("data:") {
            let _ = write!(line, "\n  [image] inline data ({} bytes)", uri.len());
        } else {
            let _ = write!(line, "\n  [image] {uri}");
        }
    }
    line
}

/// Capability bullets shown when the transcript is empty.
#[must_use]
pub fn render_capabilities(capabilities: &[String]) -> String {
    let mut out = String::from("Capabilities\n");
    for capability in capabilities {
        let _ = writeln!(out, "- {}", capability.replace('\n', "\n  "));
    }
    out
}

fn write_messages(out: &mut impl Write, messages: &[ChatMessage], assistant: &str) -> std::io::Result<()> {
    for message in messages {
        let text = render_message(message, assistant);
        match message.sender {
            Sender::User => writeln!(out, "{}", text.bold())?,
            Sender::Bot => writeln!(out, "{}", text.cyan())?,
        }
    }
    Ok(())
}

fn write_banner(out: &mut impl Write, session: &ChatSession) -> std::io::Result<()> {
    if let Some(error) = session.error() {
        writeln!(out, "{}", format!("! {error}").red())?;
    }
    Ok(())
}

/// Run the chat REPL until `/quit`, end of input, or a redirect.
///
/// `interrupt` is polled while a reply is pending, where it abandons the
/// send, and while waiting for input, where it quits.
///
/// # Errors
///
/// Returns an error only for terminal IO failures.
pub async fn run<R, W, I, F>(
    input: &mut Input<R>,
    out: &mut W,
    session: &mut ChatSession,
    identity: &IdentityHandle,
    catalog: &PersonaCatalog,
    mut interrupt: I,
) -> Result<ChatExit, ScreenError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    I: FnMut() -> F,
    F: Future<Output = ()>,
{
    if identity.current().is_none() {
        writeln!(out, "Waiting for sign-in...")?;
    }
    session.initialize_when_ready(identity).await;

    let assistant = session.persona().title.clone();
    writeln!(out, "{}", assistant.bold())?;
    write_banner(out, session)?;
    match session.phase() {
        Phase::Ready => {}
        _ if session.should_redirect() => return Ok(ChatExit::Redirected),
        _ => return Ok(ChatExit::Failed),
    }

    if session.messages().is_empty() {
        write!(out, "{}", render_capabilities(catalog.capabilities(session.persona())))?;
    } else {
        write_messages(out, session.messages(), &assistant)?;
    }
    writeln!(out, "Type /help for commands.")?;

    loop {
        let line = tokio::select! {
            line = input.prompt(out, "> ") => line?,
            () = interrupt() => None,
        };
        let Some(line) = line else {
            return Ok(ChatExit::Quit);
        };
        match line.trim() {
            "/quit" => return Ok(ChatExit::Quit),
            "/help" => {
                write!(out, "{HELP}")?;
                continue;
            }
            "" => continue,
            _ => {}
        }

        session.set_input(&line);
        let before = session.messages().len();
        let owner = identity.current();
        let outcome = tokio::select! {
            outcome = session.send(owner.as_deref()) => Some(outcome),
            () = interrupt() => None,
        };
        let Some(outcome) = outcome else {
            session.abandon_send();
            writeln!(out, "{}", "(cancelled)".yellow())?;
            continue;
        };
        debug!(?outcome, "chat screen: send finished");

        // The user's own line is already on screen.
        let appended = &session.messages()[before..];
        let fresh: Vec<ChatMessage> = appended.iter().filter(|m| m.sender == Sender::Bot).cloned().collect();
        write_messages(out, &fresh, &assistant)?;
        if outcome == SendOutcome::Failed {
            write_banner(out, session)?;
        }
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
