//! Constants used throughout the Sortable library.

/// First position of every collection.
pub const FIRST_POSITION: i64 = 1;

/// Largest accepted collection name, in bytes.
pub const MAX_COLLECTION_NAME_LEN: usize = 255;

/// Column holding a record's position in the SQL backends.
pub const POSITION_COLUMN: &str = "sortable_position";
