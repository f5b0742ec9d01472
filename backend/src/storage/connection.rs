use crate::Result;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// JsonConnection manages the on-disk layout of a rabbitry data directory:
///
/// ```text
/// <base>/data/app_data.json   full herd document
/// <base>/data/types.json      breed vocabulary (deduplicated, sorted)
/// <base>/rabbits/<id>/        per-animal assets (at most one image)
/// ```
#[derive(Debug, Clone)]
pub struct JsonConnection {
    base_directory: PathBuf,
}

impl JsonConnection {
    /// Open a connection rooted at `base_directory`, creating the layout
    /// if it does not exist yet.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        let data_dir = base_path.join("data");
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
            info!("Created data directory: {:?}", data_dir);
        }
        let rabbits_dir = base_path.join("rabbits");
        if !rabbits_dir.exists() {
            fs::create_dir_all(&rabbits_dir)?;
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Path of the herd document.
    pub fn herd_file(&self) -> PathBuf {
        self.base_directory.join("data").join("app_data.json")
    }

    /// Path of the breed-type vocabulary file.
    pub fn types_file(&self) -> PathBuf {
        self.base_directory.join("data").join("types.json")
    }

    /// Asset directory for one animal, keyed by id.
    pub fn rabbit_dir(&self, rabbit_id: &str) -> PathBuf {
        self.base_directory.join("rabbits").join(rabbit_id)
    }
}

/// Atomic write using a temp file, so an interrupted save never leaves a
/// truncated document behind.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_creates_layout() {
        let temp_dir = TempDir::new().unwrap();
        let connection = JsonConnection::new(temp_dir.path()).unwrap();

        assert!(temp_dir.path().join("data").is_dir());
        assert!(temp_dir.path().join("rabbits").is_dir());
        assert_eq!(
            connection.herd_file(),
            temp_dir.path().join("data").join("app_data.json")
        );
        assert_eq!(
            connection.rabbit_dir("abc"),
            temp_dir.path().join("rabbits").join("abc")
        );
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");

        write_atomic(&path, "{\"a\":1}").unwrap();
        write_atomic(&path, "{\"a\":2}").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"a\":2}");
        assert!(!path.with_extension("tmp").exists());
    }
}
