//! Conversation store
//!
//! An ordered sequence of chat turns shared by every flow. The sequence is
//! the entire context window sent to the model, so order is semantically
//! meaningful. Turns are immutable once created; identity is the `id`.

use chrono::Local;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

impl ChatTurn {
    /// A user turn created at runtime: fresh id, current local time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: display_timestamp(),
        }
    }

    /// An assistant turn created at runtime.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: display_timestamp(),
        }
    }
}

/// Current local time as a short display string, e.g. "10:31 AM".
pub fn display_timestamp() -> String {
    let formatted = Local::now().format("%I:%M %p").to_string();
    formatted.trim_start_matches('0').to_string()
}

/// The in-memory conversation. Fully replaced by screenshot transcription,
/// appended to by continuation; single writer by construction.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: Vec<ChatTurn>) -> Self {
        Self { turns }
    }

    /// Seeded with the bundled sample conversation.
    pub fn sample() -> Self {
        Self {
            turns: SAMPLE_CONVERSATION.clone(),
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Append a turn, returning a reference to it.
    pub fn push(&mut self, turn: ChatTurn) -> &ChatTurn {
        self.turns.push(turn);
        self.turns.last().expect("push leaves a last turn")
    }

    /// Replace the whole sequence (screenshot import).
    pub fn replace(&mut self, turns: Vec<ChatTurn>) {
        self.turns = turns;
    }

    /// Plain-text rendering used as the model's context window:
    /// one `ROLE: content` line per turn.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str().to_uppercase(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn seed(id: &str, role: Role, content: &str, timestamp: &str) -> ChatTurn {
    ChatTurn {
        id: id.to_string(),
        role,
        content: content.to_string(),
        timestamp: timestamp.to_string(),
    }
}

/// The fixed 30-turn sample loaded on startup. A user easing back into
/// running, with enough explicit facts (knee injury, dog named Buster) and
/// implicit preferences (hates treadmills, needs music) for extraction to
/// have something to find.
pub static SAMPLE_CONVERSATION: Lazy<Vec<ChatTurn>> = Lazy::new(|| {
    vec![
        seed("1", Role::User, "Hey, I'm trying to get into running again, but it's been years.", "10:00 AM"),
        seed("2", Role::Assistant, "That's a great goal! Starting slow is key. Have you thought about a specific plan?", "10:01 AM"),
        seed("3", Role::User, "Not really. I just know I hate treadmills. They make me feel like a hamster.", "10:02 AM"),
        seed("4", Role::Assistant, "Understood, outdoor running it is! What kind of environment do you have nearby?", "10:03 AM"),
        seed("5", Role::User, "I live near a big park, which is nice, but I'm super self-conscious about people watching me.", "10:04 AM"),
        seed("6", Role::Assistant, "That's a very common feeling. Maybe early mornings would be quieter?", "10:05 AM"),
        seed("7", Role::User, "Ugh, I am NOT a morning person. Coffee doesn't even touch my soul until 9 AM.", "10:06 AM"),
        seed("8", Role::Assistant, "Fair enough! How about evenings or weekends?", "10:07 AM"),
        seed("9", Role::User, "Weekends might work. I usually have free time on Saturday afternoons.", "10:08 AM"),
        seed("10", Role::User, "I bought these neon green shoes last year that I never wore. They're loud.", "10:10 AM"),
        seed("11", Role::Assistant, "Neon green sounds fun! They might actually help with visibility if you run at dusk.", "10:11 AM"),
        seed("12", Role::User, "True. Honestly, I'm just scared I'll fail again. I tried couch-to-5k twice and quit.", "10:12 AM"),
        seed("13", Role::Assistant, "What made you quit those times? Was it the schedule or the difficulty?", "10:13 AM"),
        seed("14", Role::User, "Boredom, mostly. And my knees hurt. I have weak knees from high school soccer.", "10:14 AM"),
        seed("15", Role::Assistant, "Knee pain is serious. We should focus on low-impact or soft surfaces. Grass or dirt trails in that park?", "10:15 AM"),
        seed("16", Role::User, "Yeah, there are trails. I do love nature. Being stuck inside depresses me.", "10:16 AM"),
        seed("17", Role::User, "Also, I need music. I can't run in silence. It drives me crazy.", "10:17 AM"),
        seed("18", Role::Assistant, "Music is a great motivator. What's your go-to running playlist genre?", "10:18 AM"),
        seed("19", Role::User, "90s Hip Hop or really aggressive EDM. Nothing slow.", "10:19 AM"),
        seed("20", Role::Assistant, "High energy! Perfect for keeping pace.", "10:20 AM"),
        seed("21", Role::User, "I also have a dog, a Golden Retriever named Buster. Can he come?", "10:21 AM"),
        seed("22", Role::Assistant, "Most parks allow dogs on leashes. Running with a buddy makes it less boring too!", "10:22 AM"),
        seed("23", Role::User, "He pulls a lot though. Might be annoying.", "10:23 AM"),
        seed("24", Role::User, "Actually, thinking about it, maybe I should just walk-run first.", "10:25 AM"),
        seed("25", Role::Assistant, "Walk-run intervals are excellent for building stamina without hurting your knees.", "10:26 AM"),
        seed("26", Role::User, "I'm just worried I'll get discouraged if I don't see results fast.", "10:27 AM"),
        seed("27", Role::User, "I tend to be really hard on myself when I'm not perfect immediately.", "10:28 AM"),
        seed("28", Role::Assistant, "Perfectionism can be a hurdle. Let's aim for 'consistency' instead of 'perfection'.", "10:29 AM"),
        seed("29", Role::User, "You're right. Okay, I'll try this Saturday.", "10:30 AM"),
        seed("30", Role::User, "Wait, actually, can you help me plan the first run? Keep in mind my knees and my need for distraction.", "10:31 AM"),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_conversation_shape() {
        let conv = Conversation::sample();
        assert_eq!(conv.len(), 30);
        assert_eq!(conv.turns()[0].role, Role::User);
        assert_eq!(conv.turns()[0].timestamp, "10:00 AM");
        // Last turn is the user's planning request - the persona flow's input
        assert_eq!(conv.last().unwrap().role, Role::User);
        assert!(conv.last().unwrap().content.contains("plan the first run"));
    }

    #[test]
    fn test_sample_carries_extractable_material() {
        // Extraction is validated structurally, but the sample must contain
        // the material the prompt's instructions target.
        let transcript = Conversation::sample().transcript();
        assert!(transcript.contains("knees"));
        assert!(transcript.contains("soccer"));
        assert!(transcript.contains("treadmills"));
        assert!(transcript.contains("Buster"));
    }

    #[test]
    fn test_transcript_format() {
        let conv = Conversation::from_turns(vec![
            seed("a", Role::User, "hello", "9:00 AM"),
            seed("b", Role::Assistant, "hi there", "9:01 AM"),
        ]);
        assert_eq!(conv.transcript(), "USER: hello\nASSISTANT: hi there");
    }

    #[test]
    fn test_push_and_replace() {
        let mut conv = Conversation::new();
        assert!(conv.is_empty());

        let turn = conv.push(ChatTurn::user("first"));
        assert_eq!(turn.role, Role::User);
        assert!(!turn.id.is_empty());
        assert_eq!(conv.len(), 1);

        conv.replace(vec![seed("x", Role::Assistant, "replaced", "1:00 PM")]);
        assert_eq!(conv.len(), 1);
        assert_eq!(conv.turns()[0].id, "x");
    }

    #[test]
    fn test_runtime_turns_get_fresh_ids() {
        let a = ChatTurn::user("one");
        let b = ChatTurn::user("one");
        assert_ne!(a.id, b.id);
        assert!(!a.timestamp.is_empty());
        assert!(a.timestamp.contains(':'));
    }

    #[test]
    fn test_role_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        let role: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, Role::Assistant);
    }
}
