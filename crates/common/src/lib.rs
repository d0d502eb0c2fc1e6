//! Identifier types shared by records, requests and saga messages.

pub mod types;

pub use types::{ParseRecordIdError, RecordId};
