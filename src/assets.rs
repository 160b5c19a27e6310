//! Logo upload and deletion

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use chrono::Local;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    store::{ConfigStore, LogoEntry},
};

const DEFAULT_EXTENSION: &str = ".png";
const NAME_ATTEMPTS: usize = 5;

/// An uploaded logo before it is stored
#[derive(Debug, Clone, Default)]
pub struct LogoUpload {
    pub bytes: Option<Vec<u8>>,
    pub original_filename: String,
    pub display_name: String,
}

/// Result of removing a logo; the registry entry is gone even if a warning is set
#[derive(Debug, Clone, Serialize)]
pub struct LogoRemoval {
    pub logo: LogoEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Stores logo files on disk and registers them in the config document
pub struct AssetManager {
    upload_dir: PathBuf,
    config: Arc<ConfigStore>,
}

impl AssetManager {
    pub fn new(upload_dir: impl Into<PathBuf>, config: Arc<ConfigStore>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            config,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Write the file under a collision-resistant name, then register it
    pub fn upload_logo(&self, upload: LogoUpload) -> AppResult<LogoEntry> {
        let display_name = upload.display_name.trim();
        let bytes = match upload.bytes {
            Some(bytes) if !upload.original_filename.is_empty() => bytes,
            _ => return Err(AppError::validation("No selected file")),
        };
        if display_name.is_empty() {
            return Err(AppError::validation("Common name for logo is required"));
        }

        fs::create_dir_all(&self.upload_dir).map_err(|e| {
            AppError::io(format!("Failed to create {}", self.upload_dir.display()), e)
        })?;

        let filename = self.fresh_filename(display_name, &upload.original_filename)?;
        let path = self.upload_dir.join(&filename);
        fs::write(&path, &bytes).map_err(|e| AppError::io("Could not save logo", e))?;
        info!("Logo saved: {}", path.display());

        let entry = LogoEntry {
            name: display_name.to_string(),
            filename,
        };
        let registered = self.config.update(|doc| {
            doc.logos.push(entry.clone());
            Ok(())
        });
        if let Err(e) = registered {
            error!("Failed to register logo {}: {}", entry.filename, e);
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!("Could not remove unregistered logo {}: {}", path.display(), remove_err);
            }
            return Err(e);
        }

        Ok(entry)
    }

    /// Unregister a logo and delete its file best-effort
    pub fn delete_logo(&self, filename: &str) -> AppResult<LogoRemoval> {
        if !is_safe_filename(filename) {
            return Err(AppError::validation("Invalid filename"));
        }

        let logo = self.config.update(|doc| {
            let position = doc
                .logos
                .iter()
                .position(|logo| logo.filename == filename)
                .ok_or_else(|| AppError::not_found("Logo not found in config"))?;
            Ok(doc.logos.remove(position))
        })?;

        let path = self.upload_dir.join(filename);
        let warning = match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted logo file: {}", path.display());
                None
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Logo file not found for deletion: {}", path.display());
                Some("Logo removed from list, but its file was already missing.".to_string())
            }
            Err(e) => {
                error!("Error deleting logo file {}: {}", filename, e);
                Some(format!("Logo removed from list, but file deletion failed: {}", e))
            }
        };

        Ok(LogoRemoval { logo, warning })
    }

    pub fn logos(&self) -> AppResult<Vec<LogoEntry>> {
        self.config.logos()
    }

    fn fresh_filename(&self, display_name: &str, original_filename: &str) -> AppResult<String> {
        let registered = self.config.logos()?;
        for _ in 0..NAME_ATTEMPTS {
            let candidate = unique_filename(display_name, original_filename);
            let taken = registered.iter().any(|logo| logo.filename == candidate)
                || self.upload_dir.join(&candidate).exists();
            if !taken {
                return Ok(candidate);
            }
        }
        Err(AppError::internal("Could not generate a unique logo filename"))
    }
}

/// Filesystem-safe stem for a display name
///
/// Alphanumerics, spaces, underscores and hyphens survive; everything else
/// becomes `_`, trailing whitespace is dropped and spaces turn into `_`.
pub fn sanitize_display_name(display_name: &str) -> String {
    display_name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, ' ' | '_' | '-') { c } else { '_' })
        .collect::<String>()
        .trim_end()
        .replace(' ', "_")
}

/// Extension of the uploaded file including the dot, or `.png`
pub fn upload_extension(original_filename: &str) -> String {
    Path::new(original_filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// `{YYYYmmddHHMMSS}_{6 hex}_{sanitized name}{extension}`
pub fn unique_filename(display_name: &str, original_filename: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}{}",
        timestamp,
        &random[..6],
        sanitize_display_name(display_name),
        upload_extension(original_filename)
    )
}

/// Rejects parent-directory segments and absolute paths
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.starts_with('/')
        && !filename.contains('\\')
        && !Path::new(filename).is_absolute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRepository;

    fn manager() -> (AssetManager, Arc<ConfigStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(ConfigStore::new(Arc::new(MemoryRepository::new()), "12345"));
        let manager = AssetManager::new(dir.path().join("uploads"), config.clone());
        (manager, config, dir)
    }

    fn upload(name: &str, filename: &str) -> LogoUpload {
        LogoUpload {
            bytes: Some(vec![0x89, b'P', b'N', b'G']),
            original_filename: filename.to_string(),
            display_name: name.to_string(),
        }
    }

    fn matches_pattern(filename: &str, suffix: &str) -> bool {
        let parts: Vec<&str> = filename.splitn(3, '_').collect();
        parts.len() == 3
            && parts[0].len() == 14
            && parts[0].chars().all(|c| c.is_ascii_digit())
            && parts[1].len() == 6
            && parts[1].chars().all(|c| c.is_ascii_hexdigit())
            && parts[2] == suffix
    }

    #[test]
    fn test_sanitize_display_name() {
        assert_eq!(sanitize_display_name("Team A!"), "Team_A_");
        assert_eq!(sanitize_display_name("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_display_name("Red-Team_1  "), "Red-Team_1");
        assert_eq!(sanitize_display_name("Équipe"), "Équipe");
    }

    #[test]
    fn test_upload_extension() {
        assert_eq!(upload_extension("logo.JPG"), ".JPG");
        assert_eq!(upload_extension("archive.tar.gz"), ".gz");
        assert_eq!(upload_extension("logo"), ".png");
        assert_eq!(upload_extension(".hidden"), ".png");
        assert_eq!(upload_extension("weird.p ng"), ".png");
    }

    #[test]
    fn test_upload_registers_once_with_pattern() {
        let (manager, config, _dir) = manager();
        let entry = manager.upload_logo(upload("Team A!", "logo.JPG")).unwrap();

        assert_eq!(entry.name, "Team A!");
        assert!(matches_pattern(&entry.filename, "Team_A_.JPG"), "{}", entry.filename);
        assert!(manager.upload_dir().join(&entry.filename).exists());

        let logos = config.logos().unwrap();
        assert_eq!(logos.iter().filter(|l| l.filename == entry.filename).count(), 1);
    }

    #[test]
    fn test_repeated_uploads_get_distinct_names() {
        let (manager, config, _dir) = manager();
        let a = manager.upload_logo(upload("Same", "x.png")).unwrap();
        let b = manager.upload_logo(upload("Same", "x.png")).unwrap();
        assert_ne!(a.filename, b.filename);
        assert_eq!(config.logos().unwrap().len(), 2);
    }

    #[test]
    fn test_upload_validation() {
        let (manager, config, _dir) = manager();
        let missing_name = manager.upload_logo(upload("   ", "x.png")).unwrap_err();
        assert!(matches!(missing_name, AppError::Validation(_)));

        let missing_file = manager
            .upload_logo(LogoUpload {
                bytes: None,
                original_filename: "x.png".to_string(),
                display_name: "X".to_string(),
            })
            .unwrap_err();
        assert!(matches!(missing_file, AppError::Validation(_)));

        let empty_filename = manager.upload_logo(upload("X", "")).unwrap_err();
        assert!(matches!(empty_filename, AppError::Validation(_)));

        assert!(config.logos().unwrap().is_empty());
    }

    #[test]
    fn test_upload_write_failure_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file").unwrap();
        let config = Arc::new(ConfigStore::new(Arc::new(MemoryRepository::new()), "12345"));
        let manager = AssetManager::new(&blocker, config.clone());

        let err = manager.upload_logo(upload("X", "x.png")).unwrap_err();
        assert!(matches!(err, AppError::Io { .. }));
        assert!(config.logos().unwrap().is_empty());
    }

    #[test]
    fn test_delete_logo_removes_entry_and_file() {
        let (manager, config, _dir) = manager();
        let entry = manager.upload_logo(upload("Team", "t.png")).unwrap();

        let removal = manager.delete_logo(&entry.filename).unwrap();
        assert_eq!(removal.logo, entry);
        assert!(removal.warning.is_none());
        assert!(!manager.upload_dir().join(&entry.filename).exists());
        assert!(config.logos().unwrap().is_empty());
    }

    #[test]
    fn test_delete_logo_missing_file_warns() {
        let (manager, config, _dir) = manager();
        let entry = manager.upload_logo(upload("Team", "t.png")).unwrap();
        fs::remove_file(manager.upload_dir().join(&entry.filename)).unwrap();

        let removal = manager.delete_logo(&entry.filename).unwrap();
        assert!(removal.warning.is_some());
        assert!(config.logos().unwrap().is_empty());
    }

    #[test]
    fn test_delete_logo_rejects_traversal() {
        let (manager, config, _dir) = manager();
        manager.upload_logo(upload("Team", "t.png")).unwrap();

        for name in ["../../etc/passwd", "/etc/passwd", "..", "a\\..\\b"] {
            let err = manager.delete_logo(name).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{}", name);
        }
        assert_eq!(config.logos().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_unknown_logo() {
        let (manager, _config, _dir) = manager();
        let err = manager.delete_logo("nope.png").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
