//! Persisted configuration document

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Longest accepted colour string in a theme
pub const MAX_COLOR_LEN: usize = 32;

/// Everything that survives a restart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Absent only in documents written by older versions
    #[serde(rename = "admin_pin_hashed", default, skip_serializing_if = "Option::is_none")]
    pub pin_hash: Option<PinHash>,
    #[serde(default)]
    pub logos: Vec<LogoEntry>,
    /// Absent only in documents written by older versions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl ConfigDocument {
    /// Fresh document protected by `initial_pin`
    pub fn with_pin(initial_pin: &str) -> Self {
        Self {
            pin_hash: Some(PinHash::new(initial_pin)),
            logos: Vec::new(),
            theme: Some(Theme::default()),
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme.clone().unwrap_or_default()
    }

    pub fn find_logo(&self, filename: &str) -> Option<&LogoEntry> {
        self.logos.iter().find(|logo| logo.filename == filename)
    }

    /// Fill in fields older documents lack; returns whether anything changed
    pub fn backfill(&mut self, initial_pin: &str) -> bool {
        let mut changed = false;
        if self.pin_hash.is_none() {
            self.pin_hash = Some(PinHash::new(initial_pin));
            changed = true;
        }
        if self.theme.is_none() {
            self.theme = Some(Theme::default());
            changed = true;
        }
        changed
    }
}

/// A registered logo image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoEntry {
    pub name: String,
    pub filename: String,
}

/// Viewer page styling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: String,
    pub font_color: String,
    pub low_time_minutes: u32,
    pub warning_enabled: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: "#000000".to_string(),
            font_color: "#FFFFFF".to_string(),
            low_time_minutes: 5,
            warning_enabled: true,
        }
    }
}

impl Theme {
    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [("background", &self.background), ("font_color", &self.font_color)] {
            let value = value.trim();
            if value.is_empty() || value.len() > MAX_COLOR_LEN {
                return Err(AppError::validation(format!(
                    "Theme {} must be a colour of 1 to {} characters",
                    field, MAX_COLOR_LEN
                )));
            }
        }
        Ok(())
    }
}

/// Salted SHA-256 of the admin PIN, stored as `"<salt>$<hex digest>"`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PinHash {
    salt: String,
    digest: String,
}

impl PinHash {
    /// Hash `pin` under a fresh random salt
    pub fn new(pin: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = digest(&salt, pin);
        Self { salt, digest }
    }

    pub fn verify(&self, pin: &str) -> bool {
        digest(&self.salt, pin) == self.digest
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }
}

fn digest(salt: &str, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(pin.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl TryFrom<String> for PinHash {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let (salt, digest) = value
            .split_once('$')
            .ok_or_else(|| "PIN hash must have the form <salt>$<digest>".to_string())?;
        if salt.is_empty() || digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("PIN hash is malformed".to_string());
        }
        Ok(Self {
            salt: salt.to_string(),
            digest: digest.to_ascii_lowercase(),
        })
    }
}

impl From<PinHash> for String {
    fn from(hash: PinHash) -> Self {
        format!("{}${}", hash.salt, hash.digest)
    }
}

// Never print the digest
impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinHash").field("salt", &self.salt).finish_non_exhaustive()
    }
}

/// Whether `pin` is exactly five ASCII digits
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 5 && pin.chars().all(|c| c.is_ascii_digit())
}
