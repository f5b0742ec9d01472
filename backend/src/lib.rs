//! # Rabbitry Backend
//!
//! Contains all non-UI logic for the rabbitry record-keeping application.
//!
//! The backend is split into two layers:
//! - **Domain**: business rules and services (animal profiles, breeding
//!   records, pedigree queries)
//! - **Storage**: the JSON record store, breed-type vocabulary, and
//!   per-animal image assets
//!
//! The presentation layer (forms and tables) lives outside this workspace
//! and consumes the DTOs defined in the `shared` crate.

pub mod domain;
pub mod error;
pub mod storage;

pub use error::{AppError, StorageError};

/// Convenience alias used throughout the backend.
pub type Result<T> = std::result::Result<T, AppError>;
