//! On-disk show file format
//!
//! A show file is RON or JSON, picked by file extension. It wraps the show
//! content with a format version and timestamps.

use crate::error::{IoError, Result};
use crate::show::Show;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current show file format version. Bump on breaking changes to [`Show`].
pub const SHOW_FILE_VERSION: &str = "1.0.0";

/// Largest show file that will be read (16 MB)
pub const MAX_SHOW_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Serialization format of a show file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    Ron,
    Json,
}

impl ShowFormat {
    /// Pick the format from a path's extension. No extension means RON.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("ron");
        match extension {
            "json" => Ok(ShowFormat::Json),
            "ron" | "actflow" => Ok(ShowFormat::Ron),
            other => Err(IoError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Top-level structure of a saved show file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShowFile {
    pub version: String,
    pub metadata: ShowMetadata,
    pub show: Show,
}

/// Timestamps of a show file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShowMetadata {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl ShowFile {
    pub fn new(show: Show) -> Self {
        let now = Utc::now();
        Self {
            version: SHOW_FILE_VERSION.to_string(),
            metadata: ShowMetadata {
                created_at: now,
                modified_at: now,
            },
            show,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_limit(path, MAX_SHOW_FILE_SIZE)
    }

    fn load_with_limit(path: &Path, limit: u64) -> Result<Self> {
        let size = fs::metadata(path)?.len();
        if size > limit {
            return Err(IoError::FileTooLarge { size, limit });
        }

        let format = ShowFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        let file = match format {
            ShowFormat::Json => serde_json::from_str(&content)?,
            ShowFormat::Ron => ron::from_str(&content)?,
        };
        tracing::debug!(path = %path.display(), ?format, size, "show file read");
        Ok(file)
    }

    /// Write the file, updating `modified_at`
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let format = ShowFormat::from_path(path)?;
        self.metadata.modified_at = Utc::now();

        let content = match format {
            ShowFormat::Json => serde_json::to_string_pretty(self)?,
            ShowFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?,
        };
        fs::write(path, content)?;
        tracing::debug!(path = %path.display(), ?format, "show file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ShowFormat::from_path(&PathBuf::from("a.json")).unwrap(),
            ShowFormat::Json
        );
        assert_eq!(
            ShowFormat::from_path(&PathBuf::from("a.actflow")).unwrap(),
            ShowFormat::Ron
        );
        assert_eq!(
            ShowFormat::from_path(&PathBuf::from("show")).unwrap(),
            ShowFormat::Ron
        );
        assert!(matches!(
            ShowFormat::from_path(&PathBuf::from("a.txt")),
            Err(IoError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn test_modified_at_updates_on_save() {
        let mut file = ShowFile::new(Show::new("Timestamps"));
        let created = file.metadata.modified_at;
        std::thread::sleep(std::time::Duration::from_millis(10));

        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().with_extension("ron");
        file.save(&path).unwrap();

        assert!(file.metadata.modified_at > created);
        assert_eq!(ShowFile::load(&path).unwrap().metadata, file.metadata);
    }

    #[test]
    fn test_load_file_too_large() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().with_extension("ron");
        std::fs::write(&path, vec![b' '; 1024]).unwrap();

        let result = ShowFile::load_with_limit(&path, 500);
        assert!(matches!(
            result,
            Err(IoError::FileTooLarge {
                size: 1024,
                limit: 500
            })
        ));
    }
}
