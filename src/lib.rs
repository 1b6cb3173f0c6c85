//! Recall - memory-grounded persona dashboard core
//!
//! Orchestrates four model-backed flows over one in-memory conversation:
//! memory extraction, persona response generation, screenshot
//! transcription, and plain continuation. The [`Dashboard`] controller owns
//! the shared state, the per-flow in-flight guards, and the derived gating
//! a view layer renders from.

pub mod chat;
pub mod conversation;
pub mod error;
pub mod gemini;
pub mod logging;
pub mod memory;
pub mod persona;
pub mod transcribe;

pub use chat::{ChatContinuation, FALLBACK_REPLY};
pub use conversation::{ChatTurn, Conversation, Role, SAMPLE_CONVERSATION};
pub use error::{RecallError, Result};
pub use gemini::{GeminiClient, GenerationOptions, GEMINI_FLASH};
pub use memory::{MemoryExtractor, MemoryProfile};
pub use persona::{Persona, PersonaEngine, PersonaResponse, PERSONA_TEMPERATURE};
pub use transcribe::{ScreenshotTranscriber, MAX_IMPORTED_TURNS};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============ In-Flight Guards ============

/// One per flow: an acquire/release token that doubles as the flow's
/// loading flag. Acquisition fails while held; release happens on drop, so
/// the flag clears on every exit path, including a dropped future.
struct InFlight {
    name: &'static str,
    flag: Arc<AtomicBool>,
}

impl InFlight {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<FlightGuard> {
        if self
            .flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RecallError::Busy(self.name));
        }
        Ok(FlightGuard(Arc::clone(&self.flag)))
    }
}

struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============ Dashboard State Controller ============

/// Composes the four flows over the shared conversation, profile, and
/// response state. Methods take `&mut self`, so the data layer is
/// single-writer by construction; the in-flight flags stay observable for
/// a view layer and block re-entry on each flow.
pub struct Dashboard {
    extractor: MemoryExtractor,
    engine: PersonaEngine,
    transcriber: ScreenshotTranscriber,
    continuation: ChatContinuation,

    conversation: Conversation,
    memory: Option<MemoryProfile>,
    persona: Persona,
    response: Option<PersonaResponse>,

    extracting: InFlight,
    generating: InFlight,
    transcribing: InFlight,
    sending: InFlight,
}

impl Dashboard {
    /// Build a dashboard seeded with the bundled sample conversation.
    pub fn new(client: GeminiClient) -> Self {
        Self {
            extractor: MemoryExtractor::new(client.clone()),
            engine: PersonaEngine::new(client.clone()),
            transcriber: ScreenshotTranscriber::new(client.clone()),
            continuation: ChatContinuation::new(client),
            conversation: Conversation::sample(),
            memory: None,
            persona: Persona::Mentor,
            response: None,
            extracting: InFlight::new("memory extraction"),
            generating: InFlight::new("persona generation"),
            transcribing: InFlight::new("screenshot transcription"),
            sending: InFlight::new("message send"),
        }
    }

    /// Build from `GEMINI_API_KEY`. A missing credential fails here, before
    /// any flow can issue a network call.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(GeminiClient::from_env()?))
    }

    // ---- state accessors ----

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn memory(&self) -> Option<&MemoryProfile> {
        self.memory.as_ref()
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    pub fn response(&self) -> Option<&PersonaResponse> {
        self.response.as_ref()
    }

    /// Select a persona. Deliberately leaves any displayed response alone;
    /// it stays until the next generation replaces it.
    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = persona;
    }

    // ---- loading flags ----

    pub fn is_extracting(&self) -> bool {
        self.extracting.is_set()
    }

    pub fn is_generating(&self) -> bool {
        self.generating.is_set()
    }

    pub fn is_transcribing_image(&self) -> bool {
        self.transcribing.is_set()
    }

    pub fn is_sending_message(&self) -> bool {
        self.sending.is_set()
    }

    // ---- derived gating ----

    pub fn can_extract(&self) -> bool {
        !self.conversation.is_empty() && self.memory.is_none() && !self.extracting.is_set()
    }

    pub fn can_generate(&self) -> bool {
        self.memory.is_some() && !self.generating.is_set()
    }

    pub fn can_upload_image(&self) -> bool {
        !self.transcribing.is_set()
    }

    pub fn can_send_message(&self) -> bool {
        !self.sending.is_set()
    }

    // ---- flows ----

    /// Extract the memory profile from the current conversation. One
    /// extraction per conversation load: a second call is gated until a
    /// screenshot import clears the profile.
    pub async fn extract_memories(&mut self) -> Result<&MemoryProfile> {
        if self.conversation.is_empty() {
            return Err(RecallError::Unavailable("conversation is empty"));
        }
        if self.memory.is_some() {
            return Err(RecallError::Unavailable("memory profile already extracted"));
        }
        let _guard = self.extracting.begin()?;

        let profile = self.extractor.extract(&self.conversation).await?;
        Ok(self.memory.insert(profile))
    }

    /// Generate the paired standard/persona reply for the most recent turn
    /// under the currently selected persona.
    pub async fn generate_response(&mut self) -> Result<&PersonaResponse> {
        let memory = match self.memory.as_ref() {
            Some(memory) => memory,
            None => return Err(RecallError::Unavailable("no memory profile extracted yet")),
        };
        let last = match self.conversation.last() {
            Some(last) => last,
            None => return Err(RecallError::Unavailable("conversation is empty")),
        };
        let _guard = self.generating.begin()?;

        let response = self
            .engine
            .generate(&last.content, memory, self.persona)
            .await?;
        Ok(self.response.insert(response))
    }

    /// Transcribe a chat screenshot and replace the conversation with the
    /// result. The profile and response are cleared before the call
    /// resolves; the conversation itself is only replaced on success, so a
    /// failed import leaves the old turns in place with no profile.
    pub async fn load_screenshot(&mut self, image: &[u8], mime_type: &str) -> Result<&[ChatTurn]> {
        let _guard = self.transcribing.begin()?;

        self.memory = None;
        self.response = None;

        let turns = self.transcriber.transcribe(image, mime_type).await?;
        self.conversation.replace(turns);
        logging::log_conversation(&format!(
            "Conversation replaced with {} imported turns",
            self.conversation.len()
        ));

        Ok(self.conversation.turns())
    }

    /// Append a user message and fetch one assistant reply. The user's turn
    /// is visible before the round trip starts, so a failure leaves it in
    /// place unanswered.
    pub async fn send_message(&mut self, text: &str) -> Result<String> {
        let _guard = self.sending.begin()?;

        let history = self.conversation.turns().to_vec();
        self.conversation.push(ChatTurn::user(text));

        let reply = self.continuation.send(&history, text).await?;
        self.conversation.push(ChatTurn::assistant(reply.clone()));

        Ok(reply)
    }
}
