//! Assistant system prompts.
//!
//! The chat orchestrator prepends the prompt returned here to every text
//! generation request.

pub const DEFAULT_ASSISTANT_TITLE: &str = "ChatBuddy AI";

const BASE_PROMPT: &str = "You are ChatBuddy, a friendly and capable AI assistant. \
Answer clearly, stay on topic, and format longer answers with short paragraphs or lists.";

/// Build the system prompt for an assistant persona.
///
/// `directive` is the persona's catalog instruction, if it has one.
#[must_use]
pub fn assistant_prompt(title: &str, description: &str, directive: Option<&str>) -> String {
    let title = title.trim();
    let description = description.trim();

    let mut prompt = String::from(BASE_PROMPT);
    if !title.is_empty() && title != DEFAULT_ASSISTANT_TITLE {
        prompt.push_str("\n\nYou are acting as the \"");
        prompt.push_str(title);
        prompt.push_str("\" assistant.");
    }
    if let Some(directive) = directive.map(str::trim).filter(|d| !d.is_empty()) {
        prompt.push(' ');
        prompt.push_str(directive);
    }
    if !description.is_empty() {
        prompt.push_str("\n\nTask description: ");
        prompt.push_str(description);
    }
    prompt
}

#[cfg(test)]
#[path = "prompts_test.rs"]
mod tests;
