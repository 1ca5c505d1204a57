//! Home listings: personas and saved chats.

use std::fmt::Write;

use time::format_description::well_known::Rfc3339;

use crate::services::persona::PersonaCatalog;
use crate::services::store::ChatRecord;

/// One line per persona: title, description, and an ephemeral marker.
#[must_use]
pub fn render_personas(catalog: &PersonaCatalog) -> String {
    let mut out = String::new();
    for persona in catalog.iter() {
        let _ = write!(out, "{}", persona.title);
        if !persona.description.is_empty() {
            let _ = write!(out, ": {}", persona.description);
        }
        if persona.is_ephemeral() {
            out.push_str(" (not saved)");
        }
        out.push('\n');
    }
    out
}

/// One line per chat: id, title, and creation time.
#[must_use]
pub fn render_chats(chats: &[ChatRecord]) -> String {
    if chats.is_empty() {
        return "No chats yet. Start one with `chatbuddy chat new`.\n".to_owned();
    }
    let mut out = String::new();
    for chat in chats {
        let created = chat.created_at.format(&Rfc3339).unwrap_or_default();
        let _ = writeln!(out, "{}  {}  {created}", chat.id, chat.title);
    }
    out
}

#[cfg(test)]
#[path = "home_test.rs"]
mod tests;
