pub mod rabbit;

pub use rabbit::{BreedingRecord, HerdDocument, Rabbit, Sex, DELETED_NAME};
