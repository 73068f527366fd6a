//! Domain types for the journal API.
//!
//! # Design
//! `Entry` is only ever constructed from the wire through
//! `schema::normalize_entry`, which guarantees its invariants: `id` is a
//! non-empty string, `title`/`content` are never absent, `date` parses as a
//! timestamp, and `sentiment` is either a recognized mood label or `None`.
//! Request payloads (`EntryDraft`, `ProfileUpdate`) validate on construction
//! so callers reject bad input before a request is ever built.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_CONTENT_CHARS: usize = 5000;
pub const MIN_PASSWORD_CHARS: usize = 6;

/// A single journal entry after normalization.
///
/// Only `schema::normalize_entry` (and the client operations built on it)
/// guarantees the invariants listed above. `Deserialize` is derived for
/// round-tripping already-normalized data; an `Entry` deserialized from
/// arbitrary JSON may carry an empty `id`, an unparseable `date` or an
/// unknown `sentiment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub content: String,
    /// ISO-8601 timestamp, kept in the form the server sent it.
    pub date: String,
    /// Mood label as sent by the server, only kept when recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
}

impl Entry {
    /// Parsed `date`. Falls back to the Unix epoch for entries that were not
    /// produced by normalization and carry an unparseable date.
    pub fn timestamp(&self) -> DateTime<Utc> {
        schema::parse_timestamp(&self.date).unwrap_or_default()
    }

    pub fn mood(&self) -> Option<Mood> {
        self.sentiment.as_deref().and_then(|s| s.parse().ok())
    }
}

/// The mood tags the remote service assigns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Anxious,
}

impl Mood {
    pub const ALL: [Mood; 4] = [Mood::Happy, Mood::Sad, Mood::Angry, Mood::Anxious];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Anxious => "anxious",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mood `{0}`")]
pub struct UnknownMood(pub String);

impl FromStr for Mood {
    type Err = UnknownMood;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownMood(s.to_string()))
    }
}

/// Rejections for `EntryDraft::new`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("content must not be empty")]
    EmptyContent,
    #[error("title is longer than {MAX_TITLE_CHARS} characters")]
    TitleTooLong,
    #[error("content is longer than {MAX_CONTENT_CHARS} characters")]
    ContentTooLong,
}

/// Request payload for creating or replacing an entry.
///
/// The server assigns `id`, `date` and `sentiment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub title: String,
    pub content: String,
}

impl EntryDraft {
    /// Trims both fields and checks them against the form limits.
    pub fn new(title: &str, content: &str) -> Result<Self, DraftError> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() {
            return Err(DraftError::EmptyTitle);
        }
        if content.is_empty() {
            return Err(DraftError::EmptyContent);
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(DraftError::TitleTooLong);
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(DraftError::ContentTooLong);
        }
        Ok(Self {
            title: title.to_string(),
            content: content.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("user name must not be empty")]
    EmptyUserName,
    #[error("password must be at least {MIN_PASSWORD_CHARS} characters long")]
    PasswordTooShort,
}

/// Request payload for `PUT /user`. An absent password leaves it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(rename = "userName")]
    pub user_name: String,
    #[serde(rename = "Password", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    pub fn new(user_name: &str, password: Option<&str>) -> Result<Self, ProfileError> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(ProfileError::EmptyUserName);
        }
        let password = password.filter(|p| !p.is_empty());
        if let Some(p) = password {
            if p.chars().count() < MIN_PASSWORD_CHARS {
                return Err(ProfileError::PasswordTooShort);
            }
        }
        Ok(Self {
            user_name: user_name.to_string(),
            password: password.map(str::to_string),
        })
    }
}
