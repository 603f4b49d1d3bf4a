//! tv-core - Core library for Tunevault
//!
//! This crate provides the configuration file format, the track record and
//! enrichment value types exchanged between the store and the metadata
//! refresh pass, and the checksum helper used for metadata hashes.

pub mod checksum;
pub mod config;
pub mod error;
pub mod track;

pub use checksum::compute_checksum;
pub use config::{Config, DatabaseConfig, MigrationConfig, RefreshConfig};
pub use error::{CoreError, CoreResult};
pub use track::{EnrichedFields, TrackRecord};
