use crate::domain::models::Rabbit;
use crate::error::AppError;
use crate::storage::connection::JsonConnection;
use crate::Result;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-animal image assets: each animal's folder holds at most one image,
/// named after the animal. Callers treat failures as "no image" and log
/// them; an image problem never aborts a record operation.
///
/// Compression and thumbnailing are left to the presentation side; this
/// store only normalizes the filename and copies the bytes.
#[derive(Clone)]
pub struct ImageStore {
    connection: Arc<JsonConnection>,
}

impl ImageStore {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }

    /// Generate a safe asset filename from an animal name.
    /// "Emma Lou" + photo.PNG -> "emma_lou.png"
    fn asset_filename(rabbit_name: &str, source: &Path) -> String {
        let slug: String = rabbit_name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect();

        // Collapse runs of underscores and trim the edges.
        let mut collapsed = String::new();
        let mut last_was_underscore = false;
        for c in slug.chars() {
            if c == '_' {
                if !last_was_underscore {
                    collapsed.push('_');
                }
                last_was_underscore = true;
            } else {
                collapsed.push(c);
                last_was_underscore = false;
            }
        }
        let stem = collapsed.trim_matches('_');
        let stem = if stem.is_empty() { "rabbit" } else { stem };

        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "jpg".to_string());
        format!("{}.{}", stem, extension)
    }

    /// Copy a source image into the animal's asset folder, replacing any
    /// previous image file. Returns the stored filename.
    pub fn store(&self, rabbit_id: &str, rabbit_name: &str, source: &Path) -> Result<String> {
        if !source.exists() {
            return Err(AppError::validation(format!(
                "image file does not exist: {}",
                source.display()
            )));
        }

        let dir = self.connection.rabbit_dir(rabbit_id);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let filename = Self::asset_filename(rabbit_name, source);
        fs::copy(source, dir.join(&filename))?;
        info!("Stored image '{}' for rabbit {}", filename, rabbit_id);
        Ok(filename)
    }

    /// Store a new image and delete the previous file when its name
    /// differs. A failure to remove the old file is logged, not raised.
    pub fn replace(
        &self,
        rabbit_id: &str,
        rabbit_name: &str,
        old_filename: Option<&str>,
        source: &Path,
    ) -> Result<String> {
        let filename = self.store(rabbit_id, rabbit_name, source)?;
        if let Some(old) = old_filename {
            if !old.is_empty() && old != filename {
                let old_path = self.connection.rabbit_dir(rabbit_id).join(old);
                if old_path.exists() {
                    if let Err(err) = fs::remove_file(&old_path) {
                        warn!("Could not remove stale image {:?}: {}", old_path, err);
                    }
                }
            }
        }
        Ok(filename)
    }

    /// Remove an animal's whole asset folder (used on deletion).
    pub fn remove_assets(&self, rabbit_id: &str) -> Result<()> {
        let dir = self.connection.rabbit_dir(rabbit_id);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!("Removed asset folder for rabbit {}", rabbit_id);
        }
        Ok(())
    }

    /// Absolute path of an animal's stored image, when the file exists.
    pub fn image_path(&self, rabbit: &Rabbit) -> Option<PathBuf> {
        let filename = rabbit.image_filename.as_deref()?;
        if filename.is_empty() {
            return None;
        }
        let path = self.connection.rabbit_dir(&rabbit.id).join(filename);
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (ImageStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(JsonConnection::new(temp_dir.path()).unwrap());
        (ImageStore::new(connection), temp_dir)
    }

    #[test]
    fn test_asset_filename_slugs_name_and_keeps_extension() {
        assert_eq!(
            ImageStore::asset_filename("Emma Lou", Path::new("photo.PNG")),
            "emma_lou.png"
        );
        assert_eq!(
            ImageStore::asset_filename("Kit #1", Path::new("photo")),
            "kit_1.jpg"
        );
        assert_eq!(
            ImageStore::asset_filename("??", Path::new("photo.jpg")),
            "rabbit.jpg"
        );
    }

    #[test]
    fn test_store_and_replace() {
        let (store, temp_dir) = setup();
        let source = temp_dir.path().join("source.jpg");
        std::fs::write(&source, b"img-bytes").unwrap();

        let first = store.store("r1", "Hazel", &source).unwrap();
        assert_eq!(first, "hazel.jpg");

        // Renamed animal gets a new asset name; the stale file goes away.
        let second = store.replace("r1", "Maple", Some(&first), &source).unwrap();
        assert_eq!(second, "maple.jpg");
        let dir = temp_dir.path().join("rabbits").join("r1");
        assert!(dir.join("maple.jpg").exists());
        assert!(!dir.join("hazel.jpg").exists());
    }

    #[test]
    fn test_store_missing_source_is_validation_error() {
        let (store, temp_dir) = setup();
        let missing = temp_dir.path().join("nope.jpg");
        let result = store.store("r1", "Hazel", &missing);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_remove_assets_is_idempotent() {
        let (store, temp_dir) = setup();
        let source = temp_dir.path().join("source.jpg");
        std::fs::write(&source, b"img").unwrap();
        store.store("r1", "Hazel", &source).unwrap();

        store.remove_assets("r1").unwrap();
        store.remove_assets("r1").unwrap();
        assert!(!temp_dir.path().join("rabbits").join("r1").exists());
    }
}
