//! Persist Module
//!
//! Disk-backed store of HTTP responses: one file per request identity in a
//! flat directory, mirrored by a bounded in-memory index.

pub mod file_namer;
mod index;
mod response;
mod serializer;
mod store;

#[cfg(test)]
mod property_tests;

pub use file_namer::{
    file_name_for, is_data_file, is_temp_file, FileNamer, DATA_FILE_EXTENSION, PREFIX_LIMIT,
    PREFIX_MAX_BYTES, TEMP_FILE_PREFIX,
};
pub use index::ResponseIndex;
pub use response::StoredResponse;
pub use serializer::{EntrySerializer, JsonEntrySerializer, FORMAT_VERSION};
pub use store::PersistentResponseStore;
