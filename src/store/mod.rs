//! Configuration persistence
//!
//! The config document (PIN hash, logo registry, theme) sits behind the
//! [`ConfigRepository`] trait so the backing store can be swapped freely.
//! [`ConfigStore`] layers defaults, backfill and PIN handling on top.

pub mod config_document;
pub mod json_file;
pub mod memory;

use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
pub use config_document::{is_valid_pin, ConfigDocument, LogoEntry, PinHash, Theme};
pub use json_file::JsonFileRepository;
pub use memory::MemoryRepository;

/// Result of reading the backing store
#[derive(Debug)]
pub enum Fetched {
    Found(ConfigDocument),
    Missing,
    /// Present but unreadable as a config document
    Corrupt(String),
}

/// Raw load/save of the config document
pub trait ConfigRepository: Send + Sync {
    fn fetch(&self) -> AppResult<Fetched>;
    fn save(&self, doc: &ConfigDocument) -> AppResult<()>;
}

/// Config document access with defaults and serialized read-modify-write
pub struct ConfigStore {
    repo: Arc<dyn ConfigRepository>,
    initial_pin: String,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(repo: Arc<dyn ConfigRepository>, initial_pin: impl Into<String>) -> Self {
        Self {
            repo,
            initial_pin: initial_pin.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Current document; absent or corrupt documents are replaced by defaults
    pub fn load(&self) -> AppResult<ConfigDocument> {
        match self.repo.fetch()? {
            Fetched::Found(mut doc) => {
                if doc.backfill(&self.initial_pin) {
                    info!("Config document was missing fields, saving defaults");
                    self.repo.save(&doc)?;
                }
                Ok(doc)
            }
            Fetched::Missing => {
                info!("No config document found, creating defaults");
                let doc = ConfigDocument::with_pin(&self.initial_pin);
                self.repo.save(&doc)?;
                Ok(doc)
            }
            Fetched::Corrupt(reason) => {
                warn!("Config document is corrupt ({}), using defaults", reason);
                Ok(ConfigDocument::with_pin(&self.initial_pin))
            }
        }
    }

    pub fn save(&self, doc: &ConfigDocument) -> AppResult<()> {
        self.repo.save(doc)
    }

    /// Load, mutate and fully rewrite the document
    ///
    /// Nothing is written when `updater` fails.
    pub fn update<T, F>(&self, updater: F) -> AppResult<T>
    where
        F: FnOnce(&mut ConfigDocument) -> AppResult<T>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| AppError::internal(format!("Failed to lock config store: {}", e)))?;

        let mut doc = self.load()?;
        let result = updater(&mut doc)?;
        self.repo.save(&doc)?;
        Ok(result)
    }

    /// Whether `submitted` matches the stored PIN
    pub fn check_pin(&self, submitted: &str) -> bool {
        match self.load() {
            Ok(doc) => doc
                .pin_hash
                .as_ref()
                .map(|hash| hash.verify(submitted))
                .unwrap_or(false),
            Err(e) => {
                error!("Could not load config to check PIN: {}", e);
                false
            }
        }
    }

    /// Replace the PIN after verifying the current one
    pub fn change_pin(&self, current: &str, new: &str) -> AppResult<()> {
        if !is_valid_pin(current) || !is_valid_pin(new) {
            return Err(AppError::validation("PINs must be 5 numerical digits."));
        }

        self.update(|doc| {
            let verified = doc
                .pin_hash
                .as_ref()
                .map(|hash| hash.verify(current))
                .unwrap_or(false);
            if !verified {
                return Err(AppError::auth("Current PIN is incorrect."));
            }
            doc.pin_hash = Some(PinHash::new(new));
            Ok(())
        })?;

        info!("Admin PIN changed");
        Ok(())
    }

    pub fn theme(&self) -> AppResult<Theme> {
        Ok(self.load()?.theme())
    }

    /// Replace the theme wholesale
    pub fn set_theme(&self, theme: Theme) -> AppResult<Theme> {
        theme.validate()?;
        self.update(|doc| {
            doc.theme = Some(theme.clone());
            Ok(())
        })?;
        info!("Theme updated: {:?}", theme);
        Ok(theme)
    }

    pub fn logos(&self) -> AppResult<Vec<LogoEntry>> {
        Ok(self.load()?.logos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (ConfigStore, Arc<MemoryRepository>) {
        let repo = Arc::new(MemoryRepository::new());
        (ConfigStore::new(repo.clone(), "12345"), repo)
    }

    #[test]
    fn test_first_load_persists_defaults() {
        let (store, repo) = store();
        let doc = store.load().unwrap();
        assert_eq!(doc.theme(), Theme::default());
        assert!(doc.logos.is_empty());
        assert_eq!(repo.save_count(), 1);
        assert!(store.check_pin("12345"));

        store.load().unwrap();
        assert_eq!(repo.save_count(), 1);
    }

    #[test]
    fn test_corrupt_document_uses_defaults_without_saving() {
        let (store, repo) = store();
        repo.corrupt("unexpected end of input");
        let doc = store.load().unwrap();
        assert!(doc.pin_hash.unwrap().verify("12345"));
        assert_eq!(repo.save_count(), 0);
    }

    #[test]
    fn test_check_pin_wrong_pin_is_false() {
        let (store, _) = store();
        assert!(!store.check_pin("00000"));
        assert!(!store.check_pin(""));
    }

    #[test]
    fn test_change_pin() {
        let (store, _) = store();
        store.change_pin("12345", "67890").unwrap();
        assert!(store.check_pin("67890"));
        assert!(!store.check_pin("12345"));
    }

    #[test]
    fn test_change_pin_rejects_short_pin() {
        let (store, _) = store();
        let before = store.load().unwrap().pin_hash;
        let err = store.change_pin("12345", "999").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.load().unwrap().pin_hash, before);
    }

    #[test]
    fn test_change_pin_wrong_current() {
        let (store, repo) = store();
        store.load().unwrap();
        let saves = repo.save_count();
        let err = store.change_pin("11111", "22222").unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
        assert_eq!(repo.save_count(), saves);
        assert!(store.check_pin("12345"));
    }

    #[test]
    fn test_set_theme_replaces_wholesale() {
        let (store, _) = store();
        let theme = Theme {
            background: "#123456".to_string(),
            font_color: "#abcdef".to_string(),
            low_time_minutes: 2,
            warning_enabled: false,
        };
        store.set_theme(theme.clone()).unwrap();
        assert_eq!(store.theme().unwrap(), theme);
    }

    #[test]
    fn test_existing_document_is_loaded_and_saved_wholesale() {
        let mut doc = ConfigDocument::with_pin("13579");
        doc.logos.push(LogoEntry {
            name: "Home".into(),
            filename: "home.png".into(),
        });
        let repo = Arc::new(MemoryRepository::with_document(doc.clone()));
        let store = ConfigStore::new(repo.clone(), "12345");

        assert_eq!(store.load().unwrap(), doc);
        assert!(store.check_pin("13579"));
        assert_eq!(repo.save_count(), 0);

        doc.logos.clear();
        store.save(&doc).unwrap();
        assert!(store.logos().unwrap().is_empty());
        assert_eq!(repo.save_count(), 1);
    }

    #[test]
    fn test_update_failure_does_not_save() {
        let (store, repo) = store();
        store.load().unwrap();
        let saves = repo.save_count();
        let result: AppResult<()> = store.update(|doc| {
            doc.logos.push(LogoEntry {
                name: "x".into(),
                filename: "x.png".into(),
            });
            Err(AppError::validation("nope"))
        });
        assert!(result.is_err());
        assert_eq!(repo.save_count(), saves);
        assert!(store.logos().unwrap().is_empty());
    }
}
