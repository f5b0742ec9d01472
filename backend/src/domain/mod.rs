//! # Domain Module
//!
//! Business logic for the rabbitry: animal records, breeding events, and
//! pedigree queries. Services own the rules; the storage layer underneath
//! only persists what they decide.

pub mod breeding_service;
pub mod commands;
pub mod models;
pub mod pedigree_service;
pub mod rabbit_service;

pub use breeding_service::BreedingService;
pub use pedigree_service::{LineageRenderer, PedigreeService};
pub use rabbit_service::RabbitService;
