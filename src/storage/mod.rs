//! Filesystem artifacts produced by capture sessions.

mod photos;

pub use photos::{read_optional, DeleteOutcome, PhotoStore, StorageError};
