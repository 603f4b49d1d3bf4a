//! Query helpers for reading and updating the library database.
//!
//! - [`schema`]: Catalog introspection (tables, columns, row counts)
//! - [`tracks`]: Track records for the metadata refresh pass

pub mod schema;
pub mod tracks;

pub use schema::{column_exists, list_tables, table_exists, table_row_count};
pub use tracks::{count_tracks, load_tracks, save_track_metadata};
