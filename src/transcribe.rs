//! Screenshot transcription flow
//!
//! Hands the model an inline image of a rendered chat UI and asks for a
//! reconstructed, ordered turn list: bubbles segmented, sides classified
//! (right/"me" is the user), timestamps fabricated when none are visible.
//! The result fully replaces the conversation store; on failure the prior
//! conversation is left untouched.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::conversation::{ChatTurn, Role};
use crate::error::Result;
use crate::gemini::{GeminiClient, GenerationOptions, Part};
use crate::logging;

/// The import window: only the most recent 30 bubbles survive.
pub const MAX_IMPORTED_TURNS: usize = 30;

const TRANSCRIPTION_PROMPT: &str = r#"You are a transcription assistant.
Analyze the provided image, which is a screenshot of a chat conversation (e.g. iMessage, WhatsApp, Slack).

Task:
1. Transcribe the text bubbles into a structured JSON array.
2. Identify the 'user' (usually on the right side, or 'me') and the 'assistant' or other person (usually on the left side).
3. If timestamps are visible, include them. If not, generate plausible increasing timestamps starting from '10:00 AM'.
4. Limit to the most recent 30 messages if the conversation is long.
5. Maintain the chronological order."#;

fn turn_list_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "role": { "type": "STRING", "enum": ["user", "assistant"] },
                "content": { "type": "STRING" },
                "timestamp": { "type": "STRING" }
            },
            "required": ["id", "role", "content", "timestamp"]
        }
    })
}

/// A turn as the model reports it. The schema marks every field required,
/// but `id` and `timestamp` are defaulted on parse so a non-compliant
/// record can still be repaired instead of dropped.
#[derive(Debug, Deserialize)]
struct ImportedTurn {
    #[serde(default)]
    id: String,
    role: Role,
    content: String,
    #[serde(default)]
    timestamp: String,
}

/// Enforce the flow's output guarantees: at most the most recent
/// [`MAX_IMPORTED_TURNS`] entries, original order preserved, and a
/// synthesized `imported-{index}` id (zero-based position) wherever the
/// model left one out.
fn finalize_turns(imported: Vec<ImportedTurn>) -> Vec<ChatTurn> {
    let mut imported = imported;
    if imported.len() > MAX_IMPORTED_TURNS {
        imported = imported.split_off(imported.len() - MAX_IMPORTED_TURNS);
    }

    imported
        .into_iter()
        .enumerate()
        .map(|(idx, turn)| ChatTurn {
            id: if turn.id.is_empty() {
                format!("imported-{}", idx)
            } else {
                turn.id
            },
            role: turn.role,
            content: turn.content,
            timestamp: turn.timestamp,
        })
        .collect()
}

pub struct ScreenshotTranscriber {
    client: GeminiClient,
}

impl ScreenshotTranscriber {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Transcribe a chat screenshot into an ordered turn list. `image` is
    /// the raw file bytes; they are base64-encoded for transport here.
    pub async fn transcribe(&self, image: &[u8], mime_type: &str) -> Result<Vec<ChatTurn>> {
        logging::log_transcribe(&format!(
            "Transcribing screenshot ({} bytes, {})",
            image.len(),
            mime_type
        ));

        let parts = vec![
            Part::text(TRANSCRIPTION_PROMPT),
            Part::inline_image(image, mime_type),
        ];

        let imported: Vec<ImportedTurn> = self
            .client
            .invoke(parts, turn_list_schema(), GenerationOptions::default())
            .await?;

        let turns = finalize_turns(imported);

        logging::log_transcribe(&format!("Reconstructed {} turns", turns.len()));

        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imported(id: &str, content: &str) -> ImportedTurn {
        ImportedTurn {
            id: id.to_string(),
            role: Role::User,
            content: content.to_string(),
            timestamp: "10:00 AM".to_string(),
        }
    }

    #[test]
    fn test_schema_describes_turn_records() {
        let schema = turn_list_schema();
        assert_eq!(schema["type"], "ARRAY");
        assert_eq!(
            schema["items"]["properties"]["role"]["enum"],
            json!(["user", "assistant"])
        );
        let required = schema["items"]["required"].as_array().unwrap();
        assert_eq!(required.len(), 4);
    }

    #[test]
    fn test_missing_ids_are_synthesized_by_position() {
        let turns = finalize_turns(vec![
            imported("model-id", "a"),
            imported("", "b"),
            imported("", "c"),
        ]);
        assert_eq!(turns[0].id, "model-id");
        assert_eq!(turns[1].id, "imported-1");
        assert_eq!(turns[2].id, "imported-2");
    }

    #[test]
    fn test_order_and_count_preserved_within_cap() {
        let turns = finalize_turns((0..30).map(|i| imported("", &format!("m{}", i))).collect());
        assert_eq!(turns.len(), 30);
        assert_eq!(turns[0].content, "m0");
        assert_eq!(turns[29].content, "m29");
    }

    #[test]
    fn test_overlong_imports_keep_most_recent() {
        let turns = finalize_turns((0..35).map(|i| imported("", &format!("m{}", i))).collect());
        assert_eq!(turns.len(), MAX_IMPORTED_TURNS);
        // The oldest five are dropped; ids re-index from the surviving head.
        assert_eq!(turns[0].content, "m5");
        assert_eq!(turns[0].id, "imported-0");
        assert_eq!(turns[29].content, "m34");
    }

    #[test]
    fn test_imported_turn_tolerates_missing_id_and_timestamp() {
        let turn: ImportedTurn =
            serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert!(turn.id.is_empty());
        assert!(turn.timestamp.is_empty());
        assert_eq!(turn.role, Role::Assistant);

        // Role and content stay mandatory.
        assert!(serde_json::from_str::<ImportedTurn>(r#"{"content":"hi"}"#).is_err());
    }
}
