//! Domain-level command and result types.
//!
//! These structs are used by services inside the domain layer. The
//! presentation layer is responsible for mapping its own input forms onto
//! these internal types.

pub mod rabbits {
    use crate::domain::models::{Rabbit, Sex};
    use std::path::PathBuf;

    /// Input for registering a complete animal. Every field is required;
    /// the image is stored best-effort and its failure never aborts the add.
    #[derive(Debug, Clone)]
    pub struct AddRabbitCommand {
        pub name: String,
        pub sex: Sex,
        pub color: String,
        pub breed: String,
        pub pedigree: bool,
        pub dob: String,
        pub image_path: Option<PathBuf>,
    }

    #[derive(Debug, Clone)]
    pub struct AddRabbitResult {
        pub rabbit: Rabbit,
    }

    /// Full-profile update. The profile form submits every field, so none
    /// are optional here; parent links may be cleared by passing `None`.
    #[derive(Debug, Clone)]
    pub struct UpdateRabbitCommand {
        pub rabbit_id: String,
        pub name: String,
        pub sex: Sex,
        pub color: String,
        pub breed: String,
        pub pedigree: bool,
        pub dob: String,
        pub mom_id: Option<String>,
        pub dad_id: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateRabbitResult {
        pub rabbit: Rabbit,
    }

    /// Finalizes an unregistered placeholder kit into a complete animal.
    #[derive(Debug, Clone)]
    pub struct FinalizeKitCommand {
        pub rabbit_id: String,
        pub name: String,
        pub sex: Sex,
        pub color: String,
        pub breed: String,
        pub pedigree: bool,
        pub dob: String,
        pub image_path: Option<PathBuf>,
    }

    #[derive(Debug, Clone)]
    pub struct FinalizeKitResult {
        pub rabbit: Rabbit,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteRabbitResult {
        pub success_message: String,
    }
}

pub mod breeding {
    use crate::domain::models::{BreedingRecord, Rabbit};

    /// Input for recording one breeding event between a buck and a doe.
    #[derive(Debug, Clone)]
    pub struct RecordBreedingCommand {
        pub buck_id: String,
        pub doe_id: String,
        pub date_bred: String,
        pub is_due: bool,
        pub missed_litter: bool,
        pub num_born: u32,
        pub num_alive: u32,
    }

    #[derive(Debug, Clone)]
    pub struct RecordBreedingResult {
        pub record: BreedingRecord,
        /// Placeholder kits spawned when the litter outcome was recorded
        /// at creation time.
        pub spawned_kits: Vec<Rabbit>,
    }

    /// Patch for an existing breeding record, addressed by the owning
    /// animal and the record's position in its history.
    #[derive(Debug, Clone)]
    pub struct UpdateBreedingRecordCommand {
        pub owner_id: String,
        pub index: usize,
        pub is_due: bool,
        pub missed_litter: bool,
        pub num_born: u32,
        pub num_alive: u32,
        pub actual_birth_date: String,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateBreedingRecordResult {
        pub record: BreedingRecord,
        pub spawned_kits: Vec<Rabbit>,
    }
}
