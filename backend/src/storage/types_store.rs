use crate::storage::connection::{write_atomic, JsonConnection};
use crate::Result;
use log::{debug, info};
use std::fs;
use std::sync::Arc;

/// Side list of known breed/type strings, persisted deduplicated and
/// sorted. Free text on the animal record remains the source of truth;
/// this file only feeds the type picker.
#[derive(Clone)]
pub struct BreedTypesStore {
    connection: Arc<JsonConnection>,
}

impl BreedTypesStore {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }

    /// Load the vocabulary; a missing file is an empty list.
    pub fn load(&self) -> Result<Vec<String>> {
        let path = self.connection.types_file();
        if !path.exists() {
            debug!("Types file doesn't exist yet, returning empty vocabulary");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        let types: Vec<String> = serde_json::from_str(&raw)?;
        Ok(types)
    }

    /// Add a breed to the vocabulary if it is new; blank input is ignored.
    /// Returns the resulting list.
    pub fn add(&self, breed: &str) -> Result<Vec<String>> {
        let trimmed = breed.trim();
        let mut types = self.load()?;
        if trimmed.is_empty() {
            return Ok(types);
        }
        if !types.iter().any(|existing| existing == trimmed) {
            types.push(trimmed.to_string());
            info!("Added new breed type '{}'", trimmed);
        }
        types.sort();
        types.dedup();

        let raw = serde_json::to_string_pretty(&types)?;
        write_atomic(&self.connection.types_file(), &raw)?;
        Ok(types)
    }
}
