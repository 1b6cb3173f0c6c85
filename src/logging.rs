//! Structured logging module for Recall
//!
//! Writes logs to ~/.recall/logs/ with categories:
//! - CLIENT: outbound model calls and their outcomes
//! - MEMORY: memory profile extraction
//! - PERSONA: persona response generation
//! - TRANSCRIBE: screenshot transcription
//! - CONVERSATION: conversation store lifecycle
//! - ERROR: errors surfaced to the controller

use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy)]
pub enum LogCategory {
    Client,       // Model call issued / completed
    Memory,       // Profile extraction events
    Persona,      // Persona generation events
    Transcribe,   // Screenshot transcription events
    Conversation, // Store replaced / appended
    Error,        // Failures
}

impl LogCategory {
    fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Client => "CLIENT",
            LogCategory::Memory => "MEMORY",
            LogCategory::Persona => "PERSONA",
            LogCategory::Transcribe => "TRANSCRIBE",
            LogCategory::Conversation => "CONVERSATION",
            LogCategory::Error => "ERROR",
        }
    }
}

/// Resolved log file path, set by `init_logging`
static LOG_FILE: Lazy<Mutex<Option<PathBuf>>> = Lazy::new(|| Mutex::new(None));

fn get_log_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".recall/logs")
}

/// Today's log file path
fn get_log_file_path() -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    get_log_dir().join(format!("recall-{}.log", today))
}

/// Initialize the logging system - creates the log directory if needed
pub fn init_logging() -> Result<(), std::io::Error> {
    let log_dir = get_log_dir();

    if !log_dir.exists() {
        fs::create_dir_all(&log_dir)?;
    }

    *LOG_FILE.lock().unwrap() = Some(get_log_file_path());

    log(LogCategory::Conversation, "Recall logging initialized");

    Ok(())
}

/// Log a message with a category tag
pub fn log(category: LogCategory, message: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let log_line = format!("[{}] [{}] {}\n", timestamp, category.as_str(), message);

    // Always print to console (for dev)
    print!("{}", log_line);

    // File output only after init_logging has resolved a path
    let path = LOG_FILE.lock().unwrap().clone();
    if let Some(path) = path {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = file.write_all(log_line.as_bytes());
        }
    }
}

pub fn log_client(message: &str) {
    log(LogCategory::Client, message);
}

pub fn log_memory(message: &str) {
    log(LogCategory::Memory, message);
}

pub fn log_persona(message: &str) {
    log(LogCategory::Persona, message);
}

pub fn log_transcribe(message: &str) {
    log(LogCategory::Transcribe, message);
}

pub fn log_conversation(message: &str) {
    log(LogCategory::Conversation, message);
}

pub fn log_error(message: &str) {
    log(LogCategory::Error, message);
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs() -> Result<usize, std::io::Error> {
    let log_dir = get_log_dir();
    let mut deleted = 0;

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(7);

    for entry in fs::read_dir(&log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified_time: chrono::DateTime<Utc> = modified.into();
                if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                    deleted += 1;
                }
            }
        }
    }

    Ok(deleted)
}
