use log::{info, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::commands::breeding::{
    RecordBreedingCommand, RecordBreedingResult, UpdateBreedingRecordCommand,
    UpdateBreedingRecordResult,
};
use crate::domain::models::{BreedingRecord, Rabbit, Sex};
use crate::error::AppError;
use crate::storage::HerdStore;
use crate::Result;
use shared::{BreedingRecordRow, LitterMemberRow};

/// Service for breeding events: the mirrored record pair, litter outcome
/// updates, and placeholder-kit spawning.
#[derive(Clone)]
pub struct BreedingService {
    store: Arc<HerdStore>,
}

impl BreedingService {
    pub fn new(store: Arc<HerdStore>) -> Self {
        Self { store }
    }

    /// Record one breeding event. The same logical record lands in both
    /// parents' histories; when a live litter is recorded up front,
    /// placeholder kits are spawned immediately.
    pub fn record_breeding(&self, command: RecordBreedingCommand) -> Result<RecordBreedingResult> {
        info!(
            "Recording breeding: buck={} doe={} date={}",
            command.buck_id, command.doe_id, command.date_bred
        );

        let buck = self.require_parent(&command.buck_id, Sex::Buck)?;
        let doe = self.require_parent(&command.doe_id, Sex::Doe)?;
        let date_bred = command.date_bred.trim().to_string();
        if date_bred.is_empty() {
            return Err(AppError::validation("breeding date is required"));
        }

        let record = BreedingRecord {
            event_id: BreedingRecord::generate_event_id(),
            date_bred: date_bred.clone(),
            mom_id: Some(doe.id.clone()),
            mom_name: doe.name.clone(),
            dad_id: Some(buck.id.clone()),
            dad_name: buck.name.clone(),
            is_due: command.is_due,
            missed_litter: command.missed_litter,
            num_born: command.num_born,
            num_alive: command.num_alive,
            actual_birth_date: String::new(),
        };
        self.store
            .add_breeding_record(&buck.id, &doe.id, record.clone())?;

        let spawned_kits = if !record.is_due && !record.missed_litter && record.num_alive > 0 {
            self.spawn_for_record(&record, &date_bred)?
        } else {
            Vec::new()
        };

        Ok(RecordBreedingResult {
            record,
            spawned_kits,
        })
    }

    /// Update a breeding record's outcome. `is_due` and `missed_litter`
    /// clear the outcome fields; newly recording live kits spawns one
    /// placeholder per kit. The partner's paired copy is kept identical.
    pub fn update_record(
        &self,
        command: UpdateBreedingRecordCommand,
    ) -> Result<UpdateBreedingRecordResult> {
        let owner = self
            .store
            .get(&command.owner_id)
            .ok_or_else(|| AppError::reference(&command.owner_id))?;
        let current = owner
            .breeding_history
            .get(command.index)
            .ok_or_else(|| AppError::validation("invalid breeding record index"))?
            .clone();

        let mut updated = current.clone();
        updated.is_due = command.is_due;
        updated.missed_litter = command.missed_litter;
        if updated.is_due || updated.missed_litter {
            updated.num_born = 0;
            updated.num_alive = 0;
            updated.actual_birth_date.clear();
        } else {
            updated.num_born = command.num_born;
            updated.num_alive = command.num_alive;
            updated.actual_birth_date = command.actual_birth_date.trim().to_string();
        }

        self.store
            .sync_breeding_record(&command.owner_id, command.index, updated.clone())?;

        // Spawn only on the transition into a live litter, so re-saving
        // the form doesn't duplicate the placeholders.
        let spawned_kits = if !updated.is_due
            && !updated.missed_litter
            && updated.num_alive > 0
            && current.num_alive == 0
        {
            let dob = if updated.actual_birth_date.is_empty() {
                updated.date_bred.clone()
            } else {
                updated.actual_birth_date.clone()
            };
            self.spawn_for_record(&updated, &dob)?
        } else {
            Vec::new()
        };

        Ok(UpdateBreedingRecordResult {
            record: updated,
            spawned_kits,
        })
    }

    /// Create `count` placeholder kits parented to the given pair, with
    /// names derived from the truncated parent names.
    pub fn spawn_placeholder_offspring(
        &self,
        mom_id: Option<&str>,
        dad_id: Option<&str>,
        dob: &str,
        count: u32,
    ) -> Result<Vec<Rabbit>> {
        let mom_name = mom_id
            .and_then(|id| self.store.get(id))
            .map(|rabbit| rabbit.name)
            .unwrap_or_else(|| "Mom".to_string());
        let dad_name = dad_id
            .and_then(|id| self.store.get(id))
            .map(|rabbit| rabbit.name)
            .unwrap_or_else(|| "Dad".to_string());
        self.spawn_kits(mom_id, dad_id, &mom_name, &dad_name, dob, count, None)
    }

    fn spawn_for_record(&self, record: &BreedingRecord, dob: &str) -> Result<Vec<Rabbit>> {
        self.spawn_kits(
            record.mom_id.as_deref(),
            record.dad_id.as_deref(),
            &record.mom_name,
            &record.dad_name,
            dob,
            record.num_alive,
            Some(record.event_id.clone()),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_kits(
        &self,
        mom_id: Option<&str>,
        dad_id: Option<&str>,
        mom_name: &str,
        dad_name: &str,
        dob: &str,
        count: u32,
        litter_event_id: Option<String>,
    ) -> Result<Vec<Rabbit>> {
        let prefix = format!("{}{}", truncate(mom_name, 3), truncate(dad_name, 3));
        let mut kits = Vec::with_capacity(count as usize);
        for n in 1..=count {
            kits.push(Rabbit {
                id: Rabbit::generate_id(),
                name: format!("{}_Kit{}", prefix, n),
                sex: None,
                color: String::new(),
                breed: String::new(),
                pedigree: false,
                dob: dob.to_string(),
                image_filename: None,
                mom_id: mom_id.map(str::to_string),
                dad_id: dad_id.map(str::to_string),
                breeding_history: Vec::new(),
                litter_event_id: litter_event_id.clone(),
                is_incomplete: true,
            });
        }
        self.store.insert_all(kits.clone())?;
        info!(
            "Spawned {} placeholder kit(s) for {} x {}",
            count, mom_name, dad_name
        );
        Ok(kits)
    }

    /// The litter of one breeding record: kits stamped with its event id,
    /// plus any animal whose parent pair matches in either orientation.
    pub fn litter_of_record(&self, owner_id: &str, index: usize) -> Result<Vec<LitterMemberRow>> {
        let owner = self
            .store
            .get(owner_id)
            .ok_or_else(|| AppError::reference(owner_id))?;
        let record = owner
            .breeding_history
            .get(index)
            .ok_or_else(|| AppError::validation("invalid breeding record index"))?;

        let mom_id = record.mom_id.as_deref();
        let dad_id = record.dad_id.as_deref();
        let members = self
            .store
            .all()
            .into_iter()
            .filter(|rabbit| {
                if Some(rabbit.id.as_str()) == mom_id || Some(rabbit.id.as_str()) == dad_id {
                    return false;
                }
                let by_event = !record.event_id.is_empty()
                    && rabbit.litter_event_id.as_deref() == Some(record.event_id.as_str());
                by_event || rabbit.has_parents(mom_id, dad_id)
            })
            .map(|rabbit| LitterMemberRow {
                id: rabbit.id.clone(),
                name: rabbit.name.clone(),
                registered: !rabbit.is_incomplete,
            })
            .collect();
        Ok(members)
    }

    /// Every breeding record across the herd, each logical event listed
    /// once. The doe's copy is preferred; the buck's copy only shows when
    /// the doe no longer exists.
    pub fn breeding_history_rows(&self) -> Vec<BreedingRecordRow> {
        let rabbits = self.store.all();
        let existing: HashSet<String> = rabbits.iter().map(|rabbit| rabbit.id.clone()).collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut rows = Vec::new();
        for rabbit in &rabbits {
            for (index, record) in rabbit.breeding_history.iter().enumerate() {
                let key = if record.event_id.is_empty() {
                    format!(
                        "{}|{}|{}",
                        record.date_bred,
                        record.mom_id.as_deref().unwrap_or(""),
                        record.dad_id.as_deref().unwrap_or("")
                    )
                } else {
                    record.event_id.clone()
                };
                if seen.contains(&key) {
                    continue;
                }
                // Defer to the doe's copy when she still exists.
                if rabbit.sex == Some(Sex::Buck) {
                    if let Some(mom_id) = record.mom_id.as_deref() {
                        if existing.contains(mom_id) {
                            continue;
                        }
                    }
                }
                seen.insert(key);
                rows.push(BreedingRecordRow {
                    owner_id: rabbit.id.clone(),
                    index,
                    date_bred: record.date_bred.clone(),
                    buck_name: record.dad_name.clone(),
                    doe_name: record.mom_name.clone(),
                    is_due: record.is_due,
                });
            }
        }
        rows.sort_by(|a, b| a.date_bred.cmp(&b.date_bred));
        rows
    }

    fn require_parent(&self, id: &str, expected_sex: Sex) -> Result<Rabbit> {
        let rabbit = self
            .store
            .get(id)
            .ok_or_else(|| AppError::reference(id))?;
        if rabbit.is_incomplete {
            return Err(AppError::validation(format!(
                "'{}' is not registered yet",
                rabbit.name
            )));
        }
        if rabbit.sex != Some(expected_sex) {
            warn!(
                "Rejected breeding participant '{}': expected a {}",
                rabbit.name, expected_sex
            );
            return Err(AppError::validation(format!(
                "'{}' must be a {}",
                rabbit.name, expected_sex
            )));
        }
        Ok(rabbit)
    }
}

fn truncate(name: &str, max_chars: usize) -> String {
    name.chars().take(max_chars).collect()
}
