// Builds the message list for a chat round-trip. Both steps take the history
// by reference and return a new sequence; the caller's copy is never touched.

use crate::error::GatewayError;
use crate::model::{Conversation, GenerationResult, Message};

pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Appends the trimmed user message to a copy of `history`.
pub fn assemble(history: &[Message], new_message: &str) -> Result<Conversation, GatewayError> {
    let content = validate_message(new_message, MAX_MESSAGE_CHARS)?;

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.extend_from_slice(history);
    messages.push(Message::user(content));
    Ok(messages)
}

/// Appends the model's reply as an assistant turn.
pub fn append_reply(history: &[Message], result: &GenerationResult) -> Conversation {
    let mut messages = history.to_vec();
    messages.push(Message::assistant(result.text.clone()));
    messages
}

/// Trims `input` and checks it is non-empty and at most `max_chars`
/// characters long.
pub fn validate_message(input: &str, max_chars: usize) -> Result<&str, GatewayError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::invalid_input("message must not be empty"));
    }
    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(GatewayError::invalid_input(format!(
            "message is {} characters long, the limit is {}",
            len, max_chars
        )));
    }
    Ok(trimmed)
}
