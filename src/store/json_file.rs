//! JSON file config repository

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::error::{AppError, AppResult};
use super::{ConfigDocument, ConfigRepository, Fetched};

/// Stores the config document as a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "config.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigRepository for JsonFileRepository {
    fn fetch(&self) -> AppResult<Fetched> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Fetched::Missing),
            Err(e) if e.kind() == ErrorKind::InvalidData => return Ok(Fetched::Corrupt(e.to_string())),
            Err(e) => {
                return Err(AppError::io(
                    format!("Failed to read {}", self.path.display()),
                    e,
                ))
            }
        };

        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(Fetched::Found(doc)),
            Err(e) => Ok(Fetched::Corrupt(e.to_string())),
        }
    }

    fn save(&self, doc: &ConfigDocument) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io(format!("Failed to create {}", parent.display()), e))?;
        }

        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| AppError::internal(format!("Failed to serialize config: {}", e)))?;

        let temp = self.temp_path();
        fs::write(&temp, json)
            .map_err(|e| AppError::io(format!("Failed to write {}", temp.display()), e))?;
        fs::rename(&temp, &self.path)
            .map_err(|e| AppError::io(format!("Failed to replace {}", self.path.display()), e))?;

        debug!("Saved config document to {}", self.path.display());
        Ok(())
    }
}
