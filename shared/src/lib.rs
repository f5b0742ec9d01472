use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Row in the main rabbit list (complete animals only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RabbitSummary {
    pub id: String,
    pub name: String,
    /// "Buck", "Doe", or empty for an unregistered kit
    pub sex: String,
    pub color: String,
    pub breed: String,
    /// Date of birth as entered (YYYY-MM-DD)
    pub dob: String,
    pub pedigree: bool,
}

/// Row in the "register babies" list: a placeholder kit awaiting finalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitSummary {
    pub id: String,
    pub name: String,
    pub dob: String,
    pub mom_id: Option<String>,
    pub dad_id: Option<String>,
}

/// A breeding record shown once in the global breeding-history table.
///
/// `owner_id` + `index` address the copy this row was taken from, so the
/// presentation layer can open the record for editing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingRecordRow {
    pub owner_id: String,
    pub index: usize,
    pub date_bred: String,
    pub buck_name: String,
    pub doe_name: String,
    pub is_due: bool,
}

/// Row in the "who is due?" table (does only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueDoeRow {
    pub doe_id: String,
    pub record_index: usize,
    pub date_bred: String,
    pub buck_name: String,
    pub doe_name: String,
    /// Date bred plus the gestation period; `None` when the bred date
    /// could not be parsed ("unknown", not an error).
    pub expected_due: Option<NaiveDate>,
}

/// Member of a breeding record's litter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitterMemberRow {
    pub id: String,
    pub name: String,
    /// False while the kit is still an unregistered placeholder.
    pub registered: bool,
}

/// Display card for one animal in a lineage export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageCard {
    pub id: String,
    pub name: String,
    pub breed: String,
    pub sex: String,
    /// Absolute path of the animal's stored image, when one exists on disk.
    pub image_path: Option<String>,
}

/// Input to the lineage document renderer: generation 0 is the animal
/// itself, each following entry is one generation of ancestors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageSheet {
    pub generations: Vec<Vec<LineageCard>>,
}

impl LineageSheet {
    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }
}
