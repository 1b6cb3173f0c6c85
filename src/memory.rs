//! Memory extraction flow
//!
//! Sends the full conversation to the model in one call and asks for a
//! three-bucket profile: explicit facts, deduced preferences, inferred
//! emotional patterns. The profile is an opaque snapshot - it is never
//! merged with a prior one, and extraction runs at most once per
//! conversation load (the controller gates re-invocation).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::conversation::Conversation;
use crate::error::Result;
use crate::gemini::{GeminiClient, GenerationOptions, Part};
use crate::logging;

/// The three-bucket user profile produced wholesale by one model call.
/// All three fields are required; a payload missing one is a contract
/// error, never a partial profile.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryProfile {
    pub preferences: Vec<String>,
    pub emotional_patterns: Vec<String>,
    pub facts: Vec<String>,
}

impl MemoryProfile {
    pub fn is_empty(&self) -> bool {
        self.preferences.is_empty() && self.emotional_patterns.is_empty() && self.facts.is_empty()
    }

    /// Render the profile the way the persona prompt consumes it.
    pub fn format_for_prompt(&self) -> String {
        format!(
            "USER PREFERENCES: {}\nUSER EMOTIONAL PATTERNS: {}\nUSER FACTS: {}",
            self.preferences.join(", "),
            self.emotional_patterns.join(", "),
            self.facts.join(", ")
        )
    }
}

const EXTRACTION_PROMPT: &str = r#"Analyze the following conversation history to build a dynamic user profile.

Perform the following reasoning steps:
1. Scan for explicit facts (names, medical history, possessions).
2. Deduce implicit preferences (e.g. if they hate treadmills and like trails, they prefer outdoor environments).
3. Analyze emotional tone to construct a personality profile (e.g. detect perfectionism from fear of failure).

Output a structured JSON object with these exact categories:
1. preferences: inferred or explicit likes/dislikes.
2. emotionalPatterns: psychological observations about the user's state.
3. facts: concrete, verifiable details."#;

/// Declared output shape for the extraction call: three required string
/// arrays, nothing else.
fn profile_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "preferences": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of inferred user preferences"
            },
            "emotionalPatterns": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of psychological observations or personality traits"
            },
            "facts": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of hard facts (names, injuries, dates, etc.)"
            }
        },
        "required": ["preferences", "emotionalPatterns", "facts"]
    })
}

fn build_prompt(conversation: &Conversation) -> String {
    format!(
        "{}\n\nConversation Log:\n{}",
        EXTRACTION_PROMPT,
        conversation.transcript()
    )
}

pub struct MemoryExtractor {
    client: GeminiClient,
}

impl MemoryExtractor {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    /// Extract a profile from the full conversation. Designed for windows
    /// up to ~30 turns; truncating longer histories is the caller's job.
    pub async fn extract(&self, conversation: &Conversation) -> Result<MemoryProfile> {
        logging::log_memory(&format!(
            "Starting extraction over {} turns",
            conversation.len()
        ));

        let prompt = build_prompt(conversation);

        let profile: MemoryProfile = self
            .client
            .invoke(
                vec![Part::text(prompt)],
                profile_schema(),
                GenerationOptions::default(),
            )
            .await?;

        logging::log_memory(&format!(
            "Extracted {} preferences, {} patterns, {} facts",
            profile.preferences.len(),
            profile.emotional_patterns.len(),
            profile.facts.len()
        ));

        Ok(profile)
    }
}
