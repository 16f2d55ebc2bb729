//! Session setup, the durable session record, and the local snapshot store.
//!
//! The store is key-scoped: it holds the last entered setup choices and at
//! most one pending session record awaiting review. The record is written
//! exactly once per interview, at finalize, and is read-only afterward.

use crate::error::PersistenceError;
use crate::turn::{ChatMessage, Tip};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Interviewer tone for a session. The control group is pinned to `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Supportive,
    #[default]
    Neutral,
    Cold,
}

impl Style {
    pub fn label(&self) -> &'static str {
        match self {
            Style::Supportive => "Warm & encouraging",
            Style::Neutral => "Professional & even",
            Style::Cold => "Brisk & skeptical",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            Style::Supportive => "Leads with reassurance, follows up gently.",
            Style::Neutral => "Sticks to the questions without commentary.",
            Style::Cold => "Pushes back and expects concise answers.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    #[default]
    Treatment,
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Standard,
    Hard,
}

/// How the server decides the interview is over, absent an explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LimitMode {
    #[default]
    Open,
    Questions {
        max: u32,
    },
    Time {
        minutes: u32,
    },
}

/// The user's setup choices, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterviewSetup {
    pub style: Style,
    pub group: Group,
    pub consent: bool,
    pub accent: String,
    pub notes: String,
    pub pack: String,
    pub difficulty: Difficulty,
    pub limit: LimitMode,
    pub custom_questions: Vec<String>,
    pub presence_enabled: bool,
    pub auto_listen: bool,
    pub auto_send_voice: bool,
    pub nudges_enabled: bool,
    pub nudge_sound: bool,
    pub nudge_haptics: bool,
}

impl Default for InterviewSetup {
    fn default() -> Self {
        Self {
            style: Style::Neutral,
            group: Group::Treatment,
            consent: false,
            accent: String::new(),
            notes: String::new(),
            pack: "general".to_string(),
            difficulty: Difficulty::Standard,
            limit: LimitMode::Open,
            custom_questions: Vec::new(),
            presence_enabled: false,
            auto_listen: true,
            auto_send_voice: true,
            nudges_enabled: true,
            nudge_sound: false,
            nudge_haptics: false,
        }
    }
}

/// The durable outcome of one interview attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub style: Style,
    pub group: Group,
    pub messages: Vec<ChatMessage>,
    pub tips: Vec<Tip>,
    pub saved_at: u64,
}

pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Local durable state: last setup choices plus at most one pending record.
#[cfg_attr(test, automock)]
pub trait SnapshotStore {
    fn save_record(&self, record: &SessionRecord) -> Result<(), PersistenceError>;
    fn load_record(&self) -> Result<Option<SessionRecord>, PersistenceError>;
    fn clear_record(&self) -> Result<(), PersistenceError>;
    fn save_setup(&self, setup: &InterviewSetup) -> Result<(), PersistenceError>;
    fn load_setup(&self) -> Result<Option<InterviewSetup>, PersistenceError>;
}

/// JSON files under a single directory, one file per key.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.path(key), json)?;
        Ok(())
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>, PersistenceError> {
        let path = self.path(key);
        if !Path::new(&path).exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

impl SnapshotStore for JsonFileStore {
    fn save_record(&self, record: &SessionRecord) -> Result<(), PersistenceError> {
        self.write("review", record)
    }

    fn load_record(&self) -> Result<Option<SessionRecord>, PersistenceError> {
        self.read("review")
    }

    fn clear_record(&self) -> Result<(), PersistenceError> {
        let path = self.path("review");
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn save_setup(&self, setup: &InterviewSetup) -> Result<(), PersistenceError> {
        self.write("setup", setup)
    }

    fn load_setup(&self) -> Result<Option<InterviewSetup>, PersistenceError> {
        self.read("setup")
    }
}
