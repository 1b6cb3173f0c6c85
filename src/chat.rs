//! Continuation flow
//!
//! One free-form round trip to keep the conversation going: the existing
//! history is recast into the wire roles the API expects (assistant turns
//! become "model"), the new user message goes last, and the reply text
//! comes back verbatim. The controller appends the user's turn before
//! calling, so a failure leaves an unanswered user turn - no rollback.

use crate::conversation::{ChatTurn, Role};
use crate::error::{RecallError, Result};
use crate::gemini::{Content, GeminiClient, GenerationOptions};
use crate::logging;

/// Substituted when the model returns no text at all.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process that.";

/// Map a conversation role onto the API's role marker.
fn to_wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn recast_history(history: &[ChatTurn]) -> Vec<Content> {
    history
        .iter()
        .map(|turn| Content::with_role(to_wire_role(turn.role), &turn.content))
        .collect()
}

pub struct ChatContinuation {
    client: GeminiClient,
}

impl ChatContinuation {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Send `new_message` against the recast `history` and return the
    /// assistant's reply text. An empty payload becomes the fallback
    /// string; every other failure propagates.
    pub async fn send(&self, history: &[ChatTurn], new_message: &str) -> Result<String> {
        let mut contents = recast_history(history);
        contents.push(Content::with_role("user", new_message));

        logging::log_conversation(&format!(
            "Continuing conversation ({} prior turns)",
            history.len()
        ));

        match self
            .client
            .send_chat(contents, GenerationOptions::default())
            .await
        {
            Ok(text) => Ok(text),
            Err(RecallError::EmptyResponse) => Ok(FALLBACK_REPLY.to_string()),
            Err(e) => Err(e),
        }
    }
}
