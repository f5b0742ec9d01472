use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::domain::models::{Rabbit, Sex};
use crate::error::AppError;
use crate::storage::{HerdStore, ImageStore};
use crate::Result;
use shared::{DueDoeRow, LineageCard, LineageSheet};

/// Rabbit gestation in days; a bred doe is expected this long after the
/// breeding date.
pub const GESTATION_DAYS: i64 = 31;

/// How many ancestor generations a lineage sheet shows beyond the animal
/// itself.
pub const DEFAULT_ANCESTOR_DEPTH: usize = 4;

/// Renders a lineage sheet to some destination (PDF, HTML, ...). The
/// engine only assembles the sheet; output formats plug in here.
pub trait LineageRenderer {
    fn render(&self, sheet: &LineageSheet, destination: &Path) -> Result<()>;
}

/// Read-side service over the herd: ancestry walks, litter lookups, due
/// dates, and lineage sheets.
#[derive(Clone)]
pub struct PedigreeService {
    store: Arc<HerdStore>,
    images: ImageStore,
}

impl PedigreeService {
    pub fn new(store: Arc<HerdStore>, images: ImageStore) -> Self {
        Self { store, images }
    }

    /// Walk the ancestry of an animal breadth-first. Generation 0 is the
    /// animal itself, generation 1 its parents, and so on up to
    /// `max_depth` generations of ancestors. Each animal appears at most
    /// once; a malformed herd with a parent cycle terminates instead of
    /// looping.
    ///
    /// An unknown id yields an empty vec.
    pub fn ancestor_generations(&self, rabbit_id: &str, max_depth: usize) -> Vec<Vec<String>> {
        if !self.store.contains(rabbit_id) {
            return Vec::new();
        }

        let mut generations = vec![vec![rabbit_id.to_string()]];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(rabbit_id.to_string());

        for _ in 0..max_depth {
            let current = generations.last().expect("at least one generation");
            let mut next = Vec::new();
            for id in current {
                let Some(rabbit) = self.store.get(id) else {
                    continue;
                };
                for parent_id in [rabbit.mom_id.as_deref(), rabbit.dad_id.as_deref()]
                    .into_iter()
                    .flatten()
                {
                    if self.store.contains(parent_id) && visited.insert(parent_id.to_string()) {
                        next.push(parent_id.to_string());
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            generations.push(next);
        }
        generations
    }

    /// All animals with exactly this parent pair, in either orientation,
    /// excluding `exclude_id` (normally the animal whose siblings are
    /// being listed).
    pub fn litter_siblings(
        &self,
        mom_id: Option<&str>,
        dad_id: Option<&str>,
        exclude_id: &str,
    ) -> Vec<Rabbit> {
        if mom_id.is_none() && dad_id.is_none() {
            return Vec::new();
        }
        self.store
            .all()
            .into_iter()
            .filter(|rabbit| rabbit.id != exclude_id && rabbit.has_parents(mom_id, dad_id))
            .collect()
    }

    /// Every doe's open `is_due` breeding records, with the expected due
    /// date (breeding date plus gestation). A record whose breeding date
    /// doesn't parse still shows up, just without a date.
    pub fn dues_for_does(&self) -> Vec<DueDoeRow> {
        let mut rows = Vec::new();
        for rabbit in self.store.all() {
            if rabbit.sex != Some(Sex::Doe) || rabbit.is_incomplete {
                continue;
            }
            for (index, record) in rabbit.breeding_history.iter().enumerate() {
                if !record.is_due {
                    continue;
                }
                let expected_due = expected_due_date(&record.date_bred);
                if expected_due.is_none() {
                    warn!(
                        "Unparsable breeding date '{}' on due record for {}",
                        record.date_bred, rabbit.name
                    );
                }
                rows.push(DueDoeRow {
                    doe_id: rabbit.id.clone(),
                    record_index: index,
                    date_bred: record.date_bred.clone(),
                    buck_name: record.dad_name.clone(),
                    doe_name: rabbit.name.clone(),
                    expected_due,
                });
            }
        }
        rows.sort_by(|a, b| a.date_bred.cmp(&b.date_bred));
        rows
    }

    /// Registered animals with no breeding records at all.
    pub fn unbred_rabbits(&self) -> Vec<Rabbit> {
        self.store
            .all()
            .into_iter()
            .filter(|rabbit| !rabbit.is_incomplete && rabbit.breeding_history.is_empty())
            .collect()
    }

    /// Assemble the lineage sheet for an animal: one card per ancestor,
    /// grouped by generation, with image paths resolved where assets
    /// exist.
    pub fn lineage_sheet(&self, rabbit_id: &str) -> Result<LineageSheet> {
        if !self.store.contains(rabbit_id) {
            return Err(AppError::reference(rabbit_id));
        }
        debug!("Building lineage sheet for {}", rabbit_id);

        let generations = self
            .ancestor_generations(rabbit_id, DEFAULT_ANCESTOR_DEPTH)
            .into_iter()
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.store.get(id))
                    .map(|rabbit| LineageCard {
                        id: rabbit.id.clone(),
                        name: rabbit.name.clone(),
                        breed: rabbit.breed.clone(),
                        sex: rabbit.sex_label().to_string(),
                        image_path: self
                            .images
                            .image_path(&rabbit)
                            .map(|path| path.display().to_string()),
                    })
                    .collect()
            })
            .collect();
        Ok(LineageSheet { generations })
    }

    /// Render an animal's lineage sheet through the given renderer.
    pub fn export_lineage(
        &self,
        rabbit_id: &str,
        renderer: &dyn LineageRenderer,
        destination: &Path,
    ) -> Result<()> {
        let sheet = self.lineage_sheet(rabbit_id)?;
        renderer.render(&sheet, destination)
    }
}

fn expected_due_date(date_bred: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_bred.trim(), "%Y-%m-%d")
        .ok()
        .map(|date| date + Duration::days(GESTATION_DAYS))
}
