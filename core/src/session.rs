//! Session context: who is signed in, with which token, and which theme.
//!
//! A `Session` is created once at startup with `init` and then mutated by
//! `login`, `logout` and `toggle_theme` for the rest of the process. It is
//! passed by reference to whatever needs it; `JournalClient` never holds one
//! and only ever receives `token()` per call.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const ENV_TOKEN: &str = "JOURNAL_TOKEN";
pub const ENV_USER: &str = "JOURNAL_USER";
pub const ENV_THEME: &str = "JOURNAL_THEME";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown theme `{0}`")]
pub struct UnknownTheme(pub String);

impl FromStr for Theme {
    type Err = UnknownTheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(UnknownTheme(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<String>,
    token: Option<String>,
    theme: Theme,
}

impl Session {
    /// A stored token is only honored together with a stored user name.
    pub fn init(token: Option<String>, user: Option<String>, theme: Theme) -> Self {
        let token = token.filter(|t| !t.is_empty());
        let user = user.filter(|u| !u.is_empty());
        match (token, user) {
            (Some(token), Some(user)) => Self {
                user: Some(user),
                token: Some(token),
                theme,
            },
            _ => Self {
                user: None,
                token: None,
                theme,
            },
        }
    }

    /// Initialize from `JOURNAL_TOKEN`, `JOURNAL_USER` and `JOURNAL_THEME`.
    /// An unrecognized theme falls back to light.
    pub fn from_env() -> Self {
        let theme = theme_or_default(std::env::var(ENV_THEME).ok().as_deref());
        Self::init(
            std::env::var(ENV_TOKEN).ok(),
            std::env::var(ENV_USER).ok(),
            theme,
        )
    }

    pub fn login(&mut self, token: impl Into<String>, user: impl Into<String>) {
        let user = user.into();
        info!(user = %user, "logged in");
        self.token = Some(token.into());
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            info!(user = %user, "logged out");
        }
        self.token = None;
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }
}

/// A missing theme is light; an unrecognized one is reported and treated
/// as light.
fn theme_or_default(raw: Option<&str>) -> Theme {
    match raw.map(str::parse::<Theme>) {
        Some(Ok(theme)) => theme,
        Some(Err(err)) => {
            warn!(error = %err, key = ENV_THEME, "ignoring unrecognized theme");
            Theme::default()
        }
        None => Theme::default(),
    }
}
