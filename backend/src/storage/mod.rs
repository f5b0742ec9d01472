//! # Storage Module
//!
//! File-based persistence for the rabbitry: the JSON herd document, the
//! breed-type vocabulary, and per-animal image assets. All writes go
//! through an atomic temp-file-then-rename so an interrupted save never
//! leaves a truncated document behind.

pub mod connection;
pub mod herd_store;
pub mod image_store;
pub mod types_store;

pub use connection::JsonConnection;
pub use herd_store::HerdStore;
pub use image_store::ImageStore;
pub use types_store::BreedTypesStore;
