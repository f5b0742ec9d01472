use crate::domain::models::{BreedingRecord, HerdDocument, Rabbit, Sex};
use crate::error::AppError;
use crate::storage::connection::{write_atomic, JsonConnection};
use crate::Result;
use log::{debug, info, warn};
use std::fs;
use std::sync::{Arc, Mutex};

/// The record store: owns the in-memory herd document and is the single
/// source of truth injected into every service.
///
/// Reads serve from memory; `reload` re-reads the file, and every mutating
/// operation persists the full document synchronously through an atomic
/// temp-file write.
pub struct HerdStore {
    connection: Arc<JsonConnection>,
    document: Mutex<HerdDocument>,
}

impl HerdStore {
    /// Open the store, loading the persisted document. A missing file
    /// yields an empty document; a malformed one is a storage error and is
    /// propagated rather than silently dropped.
    pub fn open(connection: Arc<JsonConnection>) -> Result<Self> {
        let document = Self::read_document(&connection)?;
        info!("Loaded herd document with {} rabbits", document.rabbits.len());
        Ok(Self {
            connection,
            document: Mutex::new(document),
        })
    }

    fn read_document(connection: &JsonConnection) -> Result<HerdDocument> {
        let path = connection.herd_file();
        if !path.exists() {
            debug!("Herd document doesn't exist yet, starting empty");
            return Ok(HerdDocument::default());
        }
        let raw = fs::read_to_string(&path)?;
        let document = serde_json::from_str(&raw)?;
        Ok(document)
    }

    fn write_document(&self, document: &HerdDocument) -> Result<()> {
        let raw = serde_json::to_string_pretty(document)?;
        write_atomic(&self.connection.herd_file(), &raw)
    }

    /// Discard the in-memory document and re-read it from disk.
    pub fn reload(&self) -> Result<()> {
        let fresh = Self::read_document(&self.connection)?;
        *self.document.lock().unwrap() = fresh;
        Ok(())
    }

    /// Persist the current in-memory document.
    pub fn flush(&self) -> Result<()> {
        let document = self.document.lock().unwrap();
        self.write_document(&document)
    }

    pub fn get(&self, id: &str) -> Option<Rabbit> {
        self.document.lock().unwrap().rabbits.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.document.lock().unwrap().rabbits.contains_key(id)
    }

    pub fn all(&self) -> Vec<Rabbit> {
        self.document.lock().unwrap().rabbits.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.document.lock().unwrap().rabbits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-side cycle probe, exposed for parent-picker validation.
    pub fn would_create_cycle(&self, child_id: &str, parent_id: &str) -> bool {
        self.document
            .lock()
            .unwrap()
            .would_create_cycle(child_id, parent_id)
    }

    /// Insert or replace a single record and persist.
    pub fn insert(&self, rabbit: Rabbit) -> Result<()> {
        let mut document = self.document.lock().unwrap();
        document.rabbits.insert(rabbit.id.clone(), rabbit);
        self.write_document(&document)
    }

    /// Insert a batch (a spawned litter) with a single write.
    pub fn insert_all(&self, rabbits: Vec<Rabbit>) -> Result<()> {
        let mut document = self.document.lock().unwrap();
        for rabbit in rabbits {
            document.rabbits.insert(rabbit.id.clone(), rabbit);
        }
        self.write_document(&document)
    }

    /// Replace an existing record. Unlike `insert` this refuses to create
    /// a new animal, so a stale id surfaces as a reference error.
    pub fn update(&self, rabbit: Rabbit) -> Result<()> {
        let mut document = self.document.lock().unwrap();
        if !document.rabbits.contains_key(&rabbit.id) {
            warn!("Attempted to update a non-existent rabbit: {}", rabbit.id);
            return Err(AppError::reference(rabbit.id));
        }
        document.rabbits.insert(rabbit.id.clone(), rabbit);
        self.write_document(&document)
    }

    /// Rename an animal and rewrite every breeding-record reference to it,
    /// in every animal's history, matching by id or by the stale name.
    pub fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        let mut document = self.document.lock().unwrap();
        let old_name = match document.rabbits.get_mut(id) {
            Some(rabbit) => std::mem::replace(&mut rabbit.name, new_name.to_string()),
            None => return Err(AppError::reference(id)),
        };
        if old_name != new_name {
            document.rename_references(id, &old_name, new_name);
        }
        info!("Renamed rabbit {} from '{}' to '{}'", id, old_name, new_name);
        self.write_document(&document)
    }

    /// Remove an animal. Every breeding record that referenced it keeps
    /// its slot but has the id nulled and the sentinel name written in;
    /// children and breeding records are never cascade-deleted.
    pub fn remove(&self, id: &str) -> Result<Rabbit> {
        let mut document = self.document.lock().unwrap();
        let removed = document
            .rabbits
            .remove(id)
            .ok_or_else(|| AppError::reference(id))?;
        document.clear_references(id);
        self.write_document(&document)?;
        info!("Deleted rabbit {} ('{}')", id, removed.name);
        Ok(removed)
    }

    /// Append the same logical record to both parents' histories. The two
    /// copies are identical at creation, including the shared event id.
    pub fn add_breeding_record(
        &self,
        buck_id: &str,
        doe_id: &str,
        record: BreedingRecord,
    ) -> Result<()> {
        let mut document = self.document.lock().unwrap();
        if !document.rabbits.contains_key(buck_id) {
            return Err(AppError::reference(buck_id));
        }
        let doe = document
            .rabbits
            .get_mut(doe_id)
            .ok_or_else(|| AppError::reference(doe_id))?;
        doe.breeding_history.push(record.clone());
        // Unwrap is fine: presence checked above, and the map is not
        // touched in between.
        let buck = document.rabbits.get_mut(buck_id).unwrap();
        buck.breeding_history.push(record);
        self.write_document(&document)
    }

    /// Replace the owner's copy of a breeding record and mirror the same
    /// fields onto the partner's paired copy, so the two never diverge.
    pub fn sync_breeding_record(
        &self,
        owner_id: &str,
        index: usize,
        record: BreedingRecord,
    ) -> Result<()> {
        let mut document = self.document.lock().unwrap();
        let owner = document
            .rabbits
            .get_mut(owner_id)
            .ok_or_else(|| AppError::reference(owner_id))?;
        let slot = owner
            .breeding_history
            .get_mut(index)
            .ok_or_else(|| AppError::validation("invalid breeding record index"))?;
        *slot = record.clone();

        let partner_id = [record.mom_id.as_deref(), record.dad_id.as_deref()]
            .into_iter()
            .flatten()
            .find(|candidate| *candidate != owner_id)
            .map(str::to_string);

        match partner_id {
            Some(partner_id) => {
                if let Some(partner) = document.rabbits.get_mut(&partner_id) {
                    match partner
                        .breeding_history
                        .iter_mut()
                        .find(|candidate| candidate.is_same_event(&record))
                    {
                        Some(paired) => *paired = record,
                        None => warn!(
                            "No paired breeding record found on partner {} for event '{}'",
                            partner_id, record.event_id
                        ),
                    }
                } else {
                    debug!("Breeding record partner {} no longer exists", partner_id);
                }
            }
            None => debug!("Breeding record on {} has no surviving partner", owner_id),
        }

        self.write_document(&document)
    }

    /// Reassign parent links, enforcing sex and acyclicity at the store
    /// boundary.
    pub fn set_parents(
        &self,
        id: &str,
        mom_id: Option<String>,
        dad_id: Option<String>,
    ) -> Result<()> {
        let mut document = self.document.lock().unwrap();
        if !document.rabbits.contains_key(id) {
            return Err(AppError::reference(id));
        }
        if let Some(mom) = mom_id.as_deref() {
            Self::check_parent(&document, id, mom, Sex::Doe)?;
        }
        if let Some(dad) = dad_id.as_deref() {
            Self::check_parent(&document, id, dad, Sex::Buck)?;
        }
        let rabbit = document.rabbits.get_mut(id).unwrap();
        rabbit.mom_id = mom_id;
        rabbit.dad_id = dad_id;
        self.write_document(&document)
    }

    fn check_parent(
        document: &HerdDocument,
        child_id: &str,
        parent_id: &str,
        expected_sex: Sex,
    ) -> Result<()> {
        if parent_id == child_id {
            return Err(AppError::validation("a rabbit cannot be its own parent"));
        }
        let parent = document
            .get(parent_id)
            .ok_or_else(|| AppError::reference(parent_id))?;
        if parent.sex != Some(expected_sex) {
            return Err(AppError::validation(format!(
                "parent '{}' must be a {}",
                parent.name, expected_sex
            )));
        }
        if document.would_create_cycle(child_id, parent_id) {
            return Err(AppError::validation(format!(
                "making '{}' a parent would create a pedigree cycle",
                parent.name
            )));
        }
        Ok(())
    }
}
