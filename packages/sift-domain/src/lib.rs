pub mod file_sync;
pub mod highlight;
pub mod ranking;

/// Owner id of documents that every caller may see.
pub const NO_OWNER_ID: i64 = 0;
