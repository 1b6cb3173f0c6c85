//! Gemini client adapter
//!
//! Thin wrapper over the `generateContent` REST endpoint. Callers hand it
//! content parts (text, optionally one inline image) and, for structured
//! calls, a response schema; it returns the response text parsed into the
//! caller's type. One round trip per call; no retries and no caching.

use base64::Engine;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RecallError, Result};
use crate::logging;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_ENV: &str = "GEMINI_API_KEY";

// Model constants
pub const GEMINI_FLASH: &str = "gemini-2.5-flash";

/// Per-call sampling knobs. `Default` leaves everything to the model.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Build a client for the default model. An empty key is treated the
    /// same as an absent one: a configuration error before any call.
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RecallError::MissingApiKey);
        }
        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: GEMINI_FLASH.to_string(),
        })
    }

    /// Resolve the API key from `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| RecallError::MissingApiKey)?;
        Self::new(&api_key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            GEMINI_API_URL, self.model, self.api_key
        )
    }

    /// Invoke the model with a declared output schema and parse the JSON
    /// payload into `T`. A payload that deserializes only partially (missing
    /// required field, wrong type) surfaces as a contract error.
    pub async fn invoke<T: DeserializeOwned>(
        &self,
        parts: Vec<Part>,
        schema: Value,
        options: GenerationOptions,
    ) -> Result<T> {
        let request = GeminiRequest {
            contents: vec![Content::user(parts)],
            generation_config: Some(GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
            }),
        };

        let text = self.generate(request).await?;

        serde_json::from_str(&text).map_err(|e| {
            logging::log_error(&format!(
                "Schema mismatch in model response: {}. Response was: {}",
                e,
                &text[..text.len().min(200)]
            ));
            RecallError::Contract(e.to_string())
        })
    }

    /// Free-form chat round trip: pre-built conversation contents, no
    /// schema. Returns the raw reply text.
    pub async fn send_chat(
        &self,
        contents: Vec<Content>,
        options: GenerationOptions,
    ) -> Result<String> {
        let request = GeminiRequest {
            contents,
            generation_config: if options.temperature.is_some()
                || options.max_output_tokens.is_some()
            {
                Some(GenerationConfig {
                    temperature: options.temperature,
                    max_output_tokens: options.max_output_tokens,
                    response_mime_type: None,
                    response_schema: None,
                })
            } else {
                None
            },
        };

        self.generate(request).await
    }

    /// Validate the configured API key with a minimal round trip.
    pub async fn validate_api_key(&self) -> Result<bool> {
        let request = GeminiRequest {
            contents: vec![Content::user(vec![Part::text("Say 'ok'")])],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: Some(10),
                response_mime_type: None,
                response_schema: None,
            }),
        };

        match self.generate(request).await {
            Ok(_) => Ok(true),
            Err(RecallError::AuthFailed(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn generate(&self, request: GeminiRequest) -> Result<String> {
        logging::log_client(&format!("Calling {} ({} contents)", self.model, request.contents.len()));

        let response = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Try to parse the structured Gemini error envelope
            if let Ok(parsed) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                if let Some(error) = parsed.error {
                    if error.code == Some(401) || error.status.as_deref() == Some("UNAUTHENTICATED")
                    {
                        return Err(RecallError::AuthFailed(error.message));
                    }
                    return Err(RecallError::Api {
                        status: status.as_u16(),
                        message: error.message,
                    });
                }
            }

            return Err(RecallError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)?;
        response_text(parsed)
    }
}

/// Join the text parts of the first candidate. An absent candidate or an
/// all-blank payload is an empty-response failure, kept distinct from a
/// schema mismatch.
fn response_text(response: GeminiResponse) -> Result<String> {
    let text: String = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(RecallError::EmptyResponse);
    }

    Ok(text)
}

// ============ Request Types ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    pub fn with_role(role: &str, text: &str) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::text(text)],
        }
    }
}

/// One content part: text or an inline binary payload, never both.
#[derive(Debug, Serialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Inline image part. Raw bytes are base64-encoded for transport.
    pub fn inline_image(data: &[u8], mime_type: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(data),
            }),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

// ============ Response Types ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_config_error() {
        assert!(matches!(
            GeminiClient::new(""),
            Err(RecallError::MissingApiKey)
        ));
        assert!(GeminiClient::new("test-key").is_ok());
    }

    #[test]
    fn test_from_env() {
        // Set-then-remove in one test so the variable isn't raced by a
        // parallel test.
        std::env::set_var(API_KEY_ENV, "env-test-key");
        assert!(GeminiClient::from_env().is_ok());

        std::env::remove_var(API_KEY_ENV);
        assert!(matches!(
            GeminiClient::from_env(),
            Err(RecallError::MissingApiKey)
        ));
    }

    #[test]
    fn test_api_url_carries_key_and_model() {
        let client = GeminiClient::new("test-key").unwrap();
        let url = client.api_url();
        assert!(url.contains("key=test-key"));
        assert!(url.contains(GEMINI_FLASH));
        assert!(url.ends_with(&format!("models/{}:generateContent?key=test-key", GEMINI_FLASH)));
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = GeminiRequest {
            contents: vec![Content::user(vec![
                Part::text("describe this"),
                Part::inline_image(&[0xFF, 0xD8], "image/png"),
            ])],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.8),
                max_output_tokens: None,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(serde_json::json!({ "type": "OBJECT" })),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "describe this");
        // camelCase on the wire, base64 payload
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "/9g=");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "OBJECT");
        // unset knobs stay off the wire
        assert!(json["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_missing_payload_is_empty_response() {
        let no_candidates: GeminiResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            response_text(no_candidates),
            Err(RecallError::EmptyResponse)
        ));

        let blank: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#,
        )
        .unwrap();
        assert!(matches!(response_text(blank), Err(RecallError::EmptyResponse)));
    }
}
