//! Ingester for METS Archival Information Packages.
//!
//! A package manifest is parsed, validated against the AIP profile, its
//! descriptive metadata section chosen and crosswalked onto a draft object,
//! and the draft committed to a [`repository::Repository`]. Container
//! packages pull in their child packages recursively.
pub mod config;
pub mod crosswalk;
pub mod error;
pub mod finalize;
pub mod ingest;
pub mod license;
pub mod manifest;
pub mod package;
pub mod params;
pub mod repository;
pub mod schema;
pub mod select;
pub mod target;
pub mod util;
pub mod validate;
pub mod xml;

pub use error::{ErrorKind, IngestError, IngestFailure};
pub use ingest::{IngestOutcome, IngestStage, Ingester};
