use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Name written into breeding records whose parent animal has been deleted.
pub const DELETED_NAME: &str = "Deleted";

/// Sex of a breeding animal. Unregistered kits have no sex yet, which is
/// modeled as `Option<Sex>` on [`Rabbit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Buck,
    Doe,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Buck => "Buck",
            Sex::Doe => "Doe",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One breeding event, as stored in a parent's history.
///
/// A logical event is materialized as two copies, one in the buck's history
/// and one in the doe's. Both copies share the same `event_id` and must be
/// kept field-for-field identical by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingRecord {
    /// Stable id shared by the two mirrored copies of one event. Empty in
    /// documents written before event ids existed; such copies are paired
    /// by the legacy `(date_bred, mom_id, dad_id)` tuple instead.
    #[serde(default)]
    pub event_id: String,
    /// Date bred as entered (YYYY-MM-DD)
    pub date_bred: String,
    pub mom_id: Option<String>,
    /// Denormalized at creation; only updated via rename propagation
    pub mom_name: String,
    pub dad_id: Option<String>,
    pub dad_name: String,
    pub is_due: bool,
    pub missed_litter: bool,
    pub num_born: u32,
    pub num_alive: u32,
    /// Empty until the litter is born
    #[serde(default)]
    pub actual_birth_date: String,
}

impl BreedingRecord {
    pub fn generate_event_id() -> String {
        format!("breeding::{}", Uuid::new_v4())
    }

    /// Pairing key for copies written before event ids existed. First
    /// tuple match wins, so two breedings of the same pair on the same
    /// date are only unambiguous once they carry event ids.
    fn legacy_key(&self) -> (&str, Option<&str>, Option<&str>) {
        (
            self.date_bred.as_str(),
            self.mom_id.as_deref(),
            self.dad_id.as_deref(),
        )
    }

    /// Whether `other` is the paired copy of the same logical event.
    pub fn is_same_event(&self, other: &BreedingRecord) -> bool {
        if !self.event_id.is_empty() && !other.event_id.is_empty() {
            self.event_id == other.event_id
        } else {
            self.legacy_key() == other.legacy_key()
        }
    }
}

/// A single animal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rabbit {
    pub id: String,
    pub name: String,
    /// `None` only while the animal is an unregistered placeholder
    pub sex: Option<Sex>,
    pub color: String,
    /// Free text, backed by the controlled vocabulary in `types.json`.
    /// Persisted under the historical key `type`.
    #[serde(rename = "type")]
    pub breed: String,
    pub pedigree: bool,
    /// Date of birth as entered (YYYY-MM-DD)
    pub dob: String,
    #[serde(default)]
    pub image_filename: Option<String>,
    /// Weak reference; may be null or dangle after a deletion
    pub mom_id: Option<String>,
    pub dad_id: Option<String>,
    #[serde(default)]
    pub breeding_history: Vec<BreedingRecord>,
    /// Set on kits spawned from a breeding record, linking litter
    /// membership directly instead of re-deriving it from the parent pair.
    #[serde(default)]
    pub litter_event_id: Option<String>,
    #[serde(default)]
    pub is_incomplete: bool,
}

impl Rabbit {
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Parent-pair match in either orientation. Which parent ended up in
    /// which field is not guaranteed on legacy records, so both are tried.
    pub fn has_parents(&self, mom_id: Option<&str>, dad_id: Option<&str>) -> bool {
        let own = (self.mom_id.as_deref(), self.dad_id.as_deref());
        own == (mom_id, dad_id) || own == (dad_id, mom_id)
    }

    /// Display string for the sex column; empty for unregistered kits.
    pub fn sex_label(&self) -> &'static str {
        self.sex.map(|s| s.as_str()).unwrap_or("")
    }
}

/// The full persisted document: animal id -> record.
///
/// A `BTreeMap` keeps serialization order stable across saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HerdDocument {
    #[serde(default)]
    pub rabbits: BTreeMap<String, Rabbit>,
}

impl HerdDocument {
    pub fn get(&self, id: &str) -> Option<&Rabbit> {
        self.rabbits.get(id)
    }

    /// Rewrite the denormalized mom/dad names in every breeding record
    /// that references the renamed animal, matching by id or by the stale
    /// name (some legacy code paths stored only the name).
    pub fn rename_references(&mut self, id: &str, old_name: &str, new_name: &str) {
        for rabbit in self.rabbits.values_mut() {
            for record in &mut rabbit.breeding_history {
                if record.mom_id.as_deref() == Some(id) || record.mom_name == old_name {
                    record.mom_name = new_name.to_string();
                }
                if record.dad_id.as_deref() == Some(id) || record.dad_name == old_name {
                    record.dad_name = new_name.to_string();
                }
            }
        }
    }

    /// Null every breeding-record reference to a deleted animal and stamp
    /// the sentinel name in its place. Children and records themselves are
    /// never cascade-deleted.
    pub fn clear_references(&mut self, id: &str) {
        for rabbit in self.rabbits.values_mut() {
            for record in &mut rabbit.breeding_history {
                if record.mom_id.as_deref() == Some(id) {
                    record.mom_id = None;
                    record.mom_name = DELETED_NAME.to_string();
                }
                if record.dad_id.as_deref() == Some(id) {
                    record.dad_id = None;
                    record.dad_name = DELETED_NAME.to_string();
                }
            }
        }
    }

    /// Whether making `parent_id` a parent of `child_id` would close a
    /// cycle in the parent graph. Walks up from the candidate parent with
    /// a visited set, so it terminates even on already-malformed data.
    pub fn would_create_cycle(&self, child_id: &str, parent_id: &str) -> bool {
        let mut stack = vec![parent_id.to_string()];
        let mut visited = std::collections::HashSet::new();
        while let Some(current) = stack.pop() {
            if current == child_id {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            if let Some(rabbit) = self.rabbits.get(&current) {
                if let Some(mom) = &rabbit.mom_id {
                    stack.push(mom.clone());
                }
                if let Some(dad) = &rabbit.dad_id {
                    stack.push(dad.clone());
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_rabbit(id: &str, name: &str, sex: Option<Sex>) -> Rabbit {
        Rabbit {
            id: id.to_string(),
            name: name.to_string(),
            sex,
            color: "Broken".to_string(),
            breed: "Holland Lop".to_string(),
            pedigree: false,
            dob: "2023-04-01".to_string(),
            image_filename: None,
            mom_id: None,
            dad_id: None,
            breeding_history: Vec::new(),
            litter_event_id: None,
            is_incomplete: false,
        }
    }

    #[test]
    fn test_pairing_prefers_event_id() {
        let mut a = BreedingRecord {
            event_id: BreedingRecord::generate_event_id(),
            date_bred: "2024-01-01".to_string(),
            mom_id: Some("doe".to_string()),
            mom_name: "Hazel".to_string(),
            dad_id: Some("buck".to_string()),
            dad_name: "Clover".to_string(),
            is_due: true,
            missed_litter: false,
            num_born: 0,
            num_alive: 0,
            actual_birth_date: String::new(),
        };
        let b = a.clone();
        assert!(a.is_same_event(&b));

        // Same tuple, different event: not the same record.
        a.event_id = BreedingRecord::generate_event_id();
        assert!(!a.is_same_event(&b));

        // Legacy copies without event ids fall back to the tuple.
        a.event_id.clear();
        let mut legacy = b.clone();
        legacy.event_id.clear();
        assert!(a.is_same_event(&legacy));
    }

    #[test]
    fn test_has_parents_either_orientation() {
        let mut kit = plain_rabbit("kit", "Kit", None);
        kit.mom_id = Some("doe".to_string());
        kit.dad_id = Some("buck".to_string());
        assert!(kit.has_parents(Some("doe"), Some("buck")));
        assert!(kit.has_parents(Some("buck"), Some("doe")));
        assert!(!kit.has_parents(Some("doe"), None));
    }

    #[test]
    fn test_would_create_cycle() {
        let mut document = HerdDocument::default();
        let mut child = plain_rabbit("child", "Child", Some(Sex::Doe));
        child.mom_id = Some("mom".to_string());
        document.rabbits.insert("child".to_string(), child);
        document
            .rabbits
            .insert("mom".to_string(), plain_rabbit("mom", "Mom", Some(Sex::Doe)));

        // Making the child an ancestor of its own mom closes a loop.
        assert!(document.would_create_cycle("mom", "child"));
        assert!(document.would_create_cycle("child", "child"));
        assert!(!document.would_create_cycle("child", "mom"));
    }

    #[test]
    fn test_document_round_trips_with_legacy_fields_missing() {
        let raw = r#"{
            "rabbits": {
                "r1": {
                    "id": "r1",
                    "name": "Hazel",
                    "sex": "Doe",
                    "color": "Chestnut",
                    "type": "Rex",
                    "pedigree": true,
                    "dob": "2022-05-01",
                    "mom_id": null,
                    "dad_id": null
                }
            }
        }"#;
        let document: HerdDocument = serde_json::from_str(raw).unwrap();
        let rabbit = document.get("r1").unwrap();
        assert_eq!(rabbit.breed, "Rex");
        assert!(rabbit.breeding_history.is_empty());
        assert!(!rabbit.is_incomplete);
        assert!(rabbit.image_filename.is_none());
    }
}
