use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;

use crate::domain::commands::rabbits::{
    AddRabbitCommand, AddRabbitResult, DeleteRabbitResult, FinalizeKitCommand, FinalizeKitResult,
    UpdateRabbitCommand, UpdateRabbitResult,
};
use crate::domain::models::{Rabbit, Sex};
use crate::error::AppError;
use crate::storage::{BreedTypesStore, HerdStore, ImageStore, JsonConnection};
use crate::Result;
use shared::{KitSummary, RabbitSummary};

/// Service for managing animal profiles: add, update, delete, and the
/// finalization of placeholder kits.
#[derive(Clone)]
pub struct RabbitService {
    store: Arc<HerdStore>,
    breed_types: BreedTypesStore,
    images: ImageStore,
}

impl RabbitService {
    pub fn new(connection: Arc<JsonConnection>, store: Arc<HerdStore>) -> Self {
        Self {
            store,
            breed_types: BreedTypesStore::new(connection.clone()),
            images: ImageStore::new(connection),
        }
    }

    /// Register a complete animal. All profile fields are required; the
    /// image is stored best-effort and never fails the add.
    pub fn add_rabbit(&self, command: AddRabbitCommand) -> Result<AddRabbitResult> {
        info!("Adding rabbit: name={}", command.name);

        let name = command.name.trim().to_string();
        let color = command.color.trim().to_string();
        let breed = command.breed.trim().to_string();
        let dob = command.dob.trim().to_string();
        Self::validate_profile(&name, &color, &breed, &dob)?;

        let id = Rabbit::generate_id();
        let image_filename = command
            .image_path
            .as_deref()
            .and_then(|path| self.store_image_best_effort(&id, &name, None, path));

        self.breed_types.add(&breed)?;

        let rabbit = Rabbit {
            id: id.clone(),
            name,
            sex: Some(command.sex),
            color,
            breed,
            pedigree: command.pedigree,
            dob,
            image_filename,
            mom_id: None,
            dad_id: None,
            breeding_history: Vec::new(),
            litter_event_id: None,
            is_incomplete: false,
        };
        self.store.insert(rabbit.clone())?;

        info!("Added rabbit '{}' with ID: {}", rabbit.name, rabbit.id);
        Ok(AddRabbitResult { rabbit })
    }

    /// Update an animal's profile, propagating a rename into every
    /// breeding record that references it and re-validating parent links.
    pub fn update_rabbit(&self, command: UpdateRabbitCommand) -> Result<UpdateRabbitResult> {
        info!("Updating rabbit: {}", command.rabbit_id);

        let existing = self
            .store
            .get(&command.rabbit_id)
            .ok_or_else(|| AppError::reference(&command.rabbit_id))?;

        let name = command.name.trim().to_string();
        let color = command.color.trim().to_string();
        let breed = command.breed.trim().to_string();
        let dob = command.dob.trim().to_string();
        Self::validate_profile(&name, &color, &breed, &dob)?;
        self.validate_parent_choice(&command.rabbit_id, command.mom_id.as_deref(), Sex::Doe)?;
        self.validate_parent_choice(&command.rabbit_id, command.dad_id.as_deref(), Sex::Buck)?;

        if name != existing.name {
            self.store.rename(&command.rabbit_id, &name)?;
        }

        // Re-read: the rename rewrote denormalized names, possibly in this
        // animal's own breeding history.
        let mut rabbit = self
            .store
            .get(&command.rabbit_id)
            .ok_or_else(|| AppError::reference(&command.rabbit_id))?;
        rabbit.sex = Some(command.sex);
        rabbit.color = color;
        rabbit.breed = breed.clone();
        rabbit.pedigree = command.pedigree;
        rabbit.dob = dob;
        self.store.update(rabbit)?;
        self.store
            .set_parents(&command.rabbit_id, command.mom_id, command.dad_id)?;
        self.breed_types.add(&breed)?;

        let rabbit = self
            .store
            .get(&command.rabbit_id)
            .ok_or_else(|| AppError::reference(&command.rabbit_id))?;
        info!("Updated rabbit '{}' ({})", rabbit.name, rabbit.id);
        Ok(UpdateRabbitResult { rabbit })
    }

    /// Replace an animal's stored image, keeping the record if the file
    /// operation fails.
    pub fn change_image(&self, rabbit_id: &str, source: &std::path::Path) -> Result<Rabbit> {
        let mut rabbit = self
            .store
            .get(rabbit_id)
            .ok_or_else(|| AppError::reference(rabbit_id))?;
        rabbit.image_filename = self.store_image_best_effort(
            rabbit_id,
            &rabbit.name,
            rabbit.image_filename.as_deref(),
            source,
        );
        self.store.update(rabbit.clone())?;
        Ok(rabbit)
    }

    /// Delete an animal. Breeding records pointing at it are relabeled in
    /// the store; its asset folder is removed best-effort.
    pub fn delete_rabbit(&self, rabbit_id: &str) -> Result<DeleteRabbitResult> {
        info!("Deleting rabbit: {}", rabbit_id);
        let removed = self.store.remove(rabbit_id)?;

        if let Err(err) = self.images.remove_assets(rabbit_id) {
            warn!("Could not remove assets for {}: {}", rabbit_id, err);
        }

        Ok(DeleteRabbitResult {
            success_message: format!("Rabbit '{}' deleted successfully", removed.name),
        })
    }

    /// Finalize an unregistered kit: all mandatory fields must be filled,
    /// after which the placeholder flag is cleared.
    pub fn finalize_kit(&self, command: FinalizeKitCommand) -> Result<FinalizeKitResult> {
        info!("Finalizing kit: {}", command.rabbit_id);

        let kit = self
            .store
            .get(&command.rabbit_id)
            .ok_or_else(|| AppError::reference(&command.rabbit_id))?;
        if !kit.is_incomplete {
            return Err(AppError::validation(format!(
                "'{}' is already registered",
                kit.name
            )));
        }

        let name = command.name.trim().to_string();
        let color = command.color.trim().to_string();
        let breed = command.breed.trim().to_string();
        let dob = command.dob.trim().to_string();
        Self::validate_profile(&name, &color, &breed, &dob)?;

        let image_filename = match command.image_path.as_deref() {
            Some(path) => self.store_image_best_effort(
                &command.rabbit_id,
                &name,
                kit.image_filename.as_deref(),
                path,
            ),
            None => kit.image_filename.clone(),
        };

        self.breed_types.add(&breed)?;

        if name != kit.name {
            self.store.rename(&command.rabbit_id, &name)?;
        }
        let mut rabbit = self
            .store
            .get(&command.rabbit_id)
            .ok_or_else(|| AppError::reference(&command.rabbit_id))?;
        rabbit.sex = Some(command.sex);
        rabbit.color = color;
        rabbit.breed = breed;
        rabbit.pedigree = command.pedigree;
        rabbit.dob = dob;
        rabbit.image_filename = image_filename;
        rabbit.is_incomplete = false;
        self.store.update(rabbit.clone())?;

        info!("Registered kit '{}' ({})", rabbit.name, rabbit.id);
        Ok(FinalizeKitResult { rabbit })
    }

    pub fn get_rabbit(&self, rabbit_id: &str) -> Option<Rabbit> {
        self.store.get(rabbit_id)
    }

    /// All complete animals, sorted case-insensitively by name.
    pub fn list_rabbits(&self) -> Vec<Rabbit> {
        let mut rabbits: Vec<Rabbit> = self
            .store
            .all()
            .into_iter()
            .filter(|rabbit| !rabbit.is_incomplete)
            .collect();
        rabbits.sort_by_key(|rabbit| rabbit.name.to_lowercase());
        rabbits
    }

    /// Placeholder kits awaiting registration.
    pub fn list_unregistered_kits(&self) -> Vec<Rabbit> {
        let mut kits: Vec<Rabbit> = self
            .store
            .all()
            .into_iter()
            .filter(|rabbit| rabbit.is_incomplete)
            .collect();
        kits.sort_by_key(|rabbit| rabbit.name.to_lowercase());
        kits
    }

    /// Name-based lookup used by the pickers; first match wins, so name
    /// collisions are the caller's problem.
    pub fn find_by_name(&self, name: &str) -> Option<Rabbit> {
        self.store
            .all()
            .into_iter()
            .find(|rabbit| rabbit.name == name)
    }

    /// Rows for the main list view.
    pub fn rabbit_summaries(&self) -> Vec<RabbitSummary> {
        self.list_rabbits()
            .into_iter()
            .map(|rabbit| RabbitSummary {
                id: rabbit.id.clone(),
                name: rabbit.name.clone(),
                sex: rabbit.sex_label().to_string(),
                color: rabbit.color.clone(),
                breed: rabbit.breed.clone(),
                dob: rabbit.dob.clone(),
                pedigree: rabbit.pedigree,
            })
            .collect()
    }

    /// Rows for the "register babies" view.
    pub fn kit_summaries(&self) -> Vec<KitSummary> {
        self.list_unregistered_kits()
            .into_iter()
            .map(|kit| KitSummary {
                id: kit.id.clone(),
                name: kit.name.clone(),
                dob: kit.dob.clone(),
                mom_id: kit.mom_id.clone(),
                dad_id: kit.dad_id.clone(),
            })
            .collect()
    }

    fn validate_profile(name: &str, color: &str, breed: &str, dob: &str) -> Result<()> {
        if name.is_empty() {
            return Err(AppError::validation("name cannot be empty"));
        }
        if name.len() > 100 {
            return Err(AppError::validation("name cannot exceed 100 characters"));
        }
        if color.is_empty() {
            return Err(AppError::validation("color cannot be empty"));
        }
        if breed.is_empty() {
            return Err(AppError::validation("type cannot be empty"));
        }
        if NaiveDate::parse_from_str(dob, "%Y-%m-%d").is_err() {
            return Err(AppError::validation(
                "date of birth must be a valid YYYY-MM-DD date",
            ));
        }
        Ok(())
    }

    /// Pre-flight the parent assignment so an invalid pick aborts the
    /// update before any mutation happens.
    fn validate_parent_choice(
        &self,
        rabbit_id: &str,
        parent_id: Option<&str>,
        expected_sex: Sex,
    ) -> Result<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        if parent_id == rabbit_id {
            return Err(AppError::validation("a rabbit cannot be its own parent"));
        }
        let parent = self
            .store
            .get(parent_id)
            .ok_or_else(|| AppError::reference(parent_id))?;
        if parent.sex != Some(expected_sex) {
            return Err(AppError::validation(format!(
                "parent '{}' must be a {}",
                parent.name, expected_sex
            )));
        }
        if self.store.would_create_cycle(rabbit_id, parent_id) {
            return Err(AppError::validation(format!(
                "making '{}' a parent would create a pedigree cycle",
                parent.name
            )));
        }
        Ok(())
    }

    fn store_image_best_effort(
        &self,
        rabbit_id: &str,
        rabbit_name: &str,
        old_filename: Option<&str>,
        source: &std::path::Path,
    ) -> Option<String> {
        match self.images.replace(rabbit_id, rabbit_name, old_filename, source) {
            Ok(filename) => Some(filename),
            Err(err) => {
                warn!("Image for '{}' could not be stored: {}", rabbit_name, err);
                old_filename.map(str::to_string)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::BreedingRecord;
    use tempfile::TempDir;

    fn setup() -> (RabbitService, Arc<HerdStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(JsonConnection::new(temp_dir.path()).unwrap());
        let store = Arc::new(HerdStore::open(connection.clone()).unwrap());
        (RabbitService::new(connection, store.clone()), store, temp_dir)
    }

    fn add_command(name: &str, sex: Sex) -> AddRabbitCommand {
        AddRabbitCommand {
            name: name.to_string(),
            sex,
            color: "Chestnut".to_string(),
            breed: "Rex".to_string(),
            pedigree: false,
            dob: "2023-03-15".to_string(),
            image_path: None,
        }
    }

    #[test]
    fn test_add_rabbit_trims_and_persists() {
        let (service, store, _temp_dir) = setup();
        let result = service.add_rabbit(add_command("  Hazel ", Sex::Doe)).unwrap();

        assert_eq!(result.rabbit.name, "Hazel");
        assert!(!result.rabbit.is_incomplete);
        assert_eq!(store.get(&result.rabbit.id).unwrap().name, "Hazel");
    }

    #[test]
    fn test_add_rabbit_validation() {
        let (service, _store, _temp_dir) = setup();

        let empty_name = add_command("   ", Sex::Doe);
        assert!(matches!(
            service.add_rabbit(empty_name),
            Err(AppError::Validation(_))
        ));

        let mut bad_dob = add_command("Hazel", Sex::Doe);
        bad_dob.dob = "2023/03/15".to_string();
        assert!(matches!(
            service.add_rabbit(bad_dob),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_add_rabbit_records_breed_in_vocabulary() {
        let (service, _store, temp_dir) = setup();
        service.add_rabbit(add_command("Hazel", Sex::Doe)).unwrap();

        let raw =
            std::fs::read_to_string(temp_dir.path().join("data").join("types.json")).unwrap();
        let types: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(types, vec!["Rex".to_string()]);
    }

    #[test]
    fn test_add_rabbit_with_unreadable_image_still_succeeds() {
        let (service, _store, temp_dir) = setup();
        let mut command = add_command("Hazel", Sex::Doe);
        command.image_path = Some(temp_dir.path().join("missing.jpg"));

        let result = service.add_rabbit(command).unwrap();
        assert!(result.rabbit.image_filename.is_none());
    }

    #[test]
    fn test_add_rabbit_with_image() {
        let (service, _store, temp_dir) = setup();
        let source = temp_dir.path().join("hazel.jpg");
        std::fs::write(&source, b"img").unwrap();
        let mut command = add_command("Hazel", Sex::Doe);
        command.image_path = Some(source);

        let result = service.add_rabbit(command).unwrap();
        assert_eq!(result.rabbit.image_filename.as_deref(), Some("hazel.jpg"));
    }

    #[test]
    fn test_update_rename_propagates_into_breeding_records() {
        let (service, store, _temp_dir) = setup();
        let doe = service.add_rabbit(add_command("Hazel", Sex::Doe)).unwrap().rabbit;
        let buck = service.add_rabbit(add_command("Clover", Sex::Buck)).unwrap().rabbit;
        let record = BreedingRecord {
            event_id: BreedingRecord::generate_event_id(),
            date_bred: "2024-01-01".to_string(),
            mom_id: Some(doe.id.clone()),
            mom_name: doe.name.clone(),
            dad_id: Some(buck.id.clone()),
            dad_name: buck.name.clone(),
            is_due: true,
            missed_litter: false,
            num_born: 0,
            num_alive: 0,
            actual_birth_date: String::new(),
        };
        store.add_breeding_record(&buck.id, &doe.id, record).unwrap();

        let command = UpdateRabbitCommand {
            rabbit_id: doe.id.clone(),
            name: "Maple".to_string(),
            sex: Sex::Doe,
            color: "Chestnut".to_string(),
            breed: "Rex".to_string(),
            pedigree: true,
            dob: "2023-03-15".to_string(),
            mom_id: None,
            dad_id: None,
        };
        let updated = service.update_rabbit(command).unwrap().rabbit;

        assert_eq!(updated.name, "Maple");
        assert!(updated.pedigree);
        let buck_after = store.get(&buck.id).unwrap();
        assert_eq!(buck_after.breeding_history[0].mom_name, "Maple");
    }

    #[test]
    fn test_update_rejects_cycle_before_mutating() {
        let (service, store, _temp_dir) = setup();
        let grandma = service.add_rabbit(add_command("Grandma", Sex::Doe)).unwrap().rabbit;
        let mom = service.add_rabbit(add_command("Mom", Sex::Doe)).unwrap().rabbit;
        store
            .set_parents(&mom.id, Some(grandma.id.clone()), None)
            .unwrap();

        let command = UpdateRabbitCommand {
            rabbit_id: grandma.id.clone(),
            name: "Grandma Prime".to_string(),
            sex: Sex::Doe,
            color: "Chestnut".to_string(),
            breed: "Rex".to_string(),
            pedigree: false,
            dob: "2023-03-15".to_string(),
            mom_id: Some(mom.id.clone()),
            dad_id: None,
        };
        assert!(matches!(
            service.update_rabbit(command),
            Err(AppError::Validation(_))
        ));
        // The rejected update must not have renamed anything.
        assert_eq!(store.get(&grandma.id).unwrap().name, "Grandma");
    }

    #[test]
    fn test_delete_rabbit_removes_record_and_assets() {
        let (service, store, temp_dir) = setup();
        let source = temp_dir.path().join("hazel.jpg");
        std::fs::write(&source, b"img").unwrap();
        let mut command = add_command("Hazel", Sex::Doe);
        command.image_path = Some(source);
        let rabbit = service.add_rabbit(command).unwrap().rabbit;
        let asset_dir = temp_dir.path().join("rabbits").join(&rabbit.id);
        assert!(asset_dir.exists());

        let result = service.delete_rabbit(&rabbit.id).unwrap();
        assert!(result.success_message.contains("Hazel"));
        assert!(store.get(&rabbit.id).is_none());
        assert!(!asset_dir.exists());
    }

    #[test]
    fn test_delete_nonexistent_rabbit_is_reference_error() {
        let (service, _store, _temp_dir) = setup();
        assert!(matches!(
            service.delete_rabbit("ghost"),
            Err(AppError::Reference(_))
        ));
    }

    #[test]
    fn test_finalize_kit_flips_placeholder_flag() {
        let (service, store, _temp_dir) = setup();
        let kit = Rabbit {
            id: Rabbit::generate_id(),
            name: "HazClo_Kit1".to_string(),
            sex: None,
            color: String::new(),
            breed: String::new(),
            pedigree: false,
            dob: "2024-02-01".to_string(),
            image_filename: None,
            mom_id: None,
            dad_id: None,
            breeding_history: Vec::new(),
            litter_event_id: None,
            is_incomplete: true,
        };
        store.insert(kit.clone()).unwrap();

        let result = service
            .finalize_kit(FinalizeKitCommand {
                rabbit_id: kit.id.clone(),
                name: "Thumper".to_string(),
                sex: Sex::Buck,
                color: "White".to_string(),
                breed: "Holland Lop".to_string(),
                pedigree: false,
                dob: "2024-02-01".to_string(),
                image_path: None,
            })
            .unwrap();

        assert!(!result.rabbit.is_incomplete);
        assert_eq!(result.rabbit.name, "Thumper");
        assert_eq!(result.rabbit.sex, Some(Sex::Buck));

        // Finalizing twice is rejected.
        let again = service.finalize_kit(FinalizeKitCommand {
            rabbit_id: kit.id,
            name: "Thumper".to_string(),
            sex: Sex::Buck,
            color: "White".to_string(),
            breed: "Holland Lop".to_string(),
            pedigree: false,
            dob: "2024-02-01".to_string(),
            image_path: None,
        });
        assert!(matches!(again, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_list_rabbits_sorted_case_insensitively() {
        let (service, _store, _temp_dir) = setup();
        service.add_rabbit(add_command("beta", Sex::Doe)).unwrap();
        service.add_rabbit(add_command("Alpha", Sex::Buck)).unwrap();

        let names: Vec<String> = service
            .list_rabbits()
            .into_iter()
            .map(|rabbit| rabbit.name)
            .collect();
        assert_eq!(names, vec!["Alpha".to_string(), "beta".to_string()]);

        let summaries = service.rabbit_summaries();
        assert_eq!(summaries[0].sex, "Buck");
        assert_eq!(summaries[1].name, "beta");
    }

    #[test]
    fn test_find_by_name() {
        let (service, _store, _temp_dir) = setup();
        let added = service.add_rabbit(add_command("Hazel", Sex::Doe)).unwrap().rabbit;

        assert_eq!(service.find_by_name("Hazel").unwrap().id, added.id);
        assert!(service.find_by_name("Nobody").is_none());
    }
}
