// Client-side chat session: the state the chat page keeps for one browser
// tab. `static/chat.js` follows the same transitions.

use log::debug;
use uuid::Uuid;

use crate::model::{Conversation, Message};
use crate::web::models::{ChatReply, ChatRequest};

pub const NETWORK_ERROR: &str = "Network error occurred";
const GENERIC_FAILURE: &str = "Failed to get response";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    Error,
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    history: Conversation,
    state: SessionState,
    error: Option<String>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
            state: SessionState::Idle,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_sending(&self) -> bool {
        self.state == SessionState::Sending
    }

    /// Starts a round-trip. Returns the request to send, or `None` when the
    /// input is blank or a call is already in flight.
    ///
    /// The outbound `conversation` is the history as it was before the new
    /// user turn, which is appended here optimistically.
    pub fn submit(&mut self, input: &str) -> Option<ChatRequest> {
        let content = input.trim();
        if content.is_empty() || self.is_sending() {
            return None;
        }

        let request = ChatRequest {
            message: content.to_string(),
            conversation: Some(self.history.clone()),
        };

        self.history.push(Message::user(content));
        self.error = None;
        self.state = SessionState::Sending;
        debug!("Session {} sending message #{}", self.id, self.history.len());

        Some(request)
    }

    /// Completes the in-flight round-trip. `Err` stands for a transport
    /// failure, where no envelope was received at all. Ignored unless sending.
    pub fn resolve(&mut self, outcome: Result<ChatReply, String>) {
        if !self.is_sending() {
            return;
        }

        match outcome {
            Ok(reply) if reply.success => {
                self.history
                    .push(Message::assistant(reply.response.unwrap_or_default()));
                self.state = SessionState::Idle;
            }
            Ok(reply) => {
                self.error = Some(reply.error.unwrap_or_else(|| GENERIC_FAILURE.to_string()));
                self.state = SessionState::Error;
            }
            Err(cause) => {
                debug!("Session {} transport failure: {}", self.id, cause);
                self.error = Some(NETWORK_ERROR.to_string());
                self.state = SessionState::Error;
            }
        }
    }

    /// Drops history and any error. Legal in every state.
    pub fn clear(&mut self) {
        self.history.clear();
        self.error = None;
        if self.state == SessionState::Error {
            self.state = SessionState::Idle;
        }
    }
}
