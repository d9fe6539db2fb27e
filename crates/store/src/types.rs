use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

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

    pub fn parse(s: &str) -> Role {
        match s {
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

/// One persisted conversation message. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A CLI tool discovered and registered at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub usage: String,
    pub examples: String,
    pub learned_at: DateTime<Utc>,
}

/// Memoized result of a package installation check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageCacheEntry {
    pub name: String,
    pub installed: bool,
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

/// One raw user utterance, kept independently of the trimmed message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub input: String,
    pub timestamp: DateTime<Utc>,
}
