//! Record store adapter.
//!
//! Provides get-by-key, put, conditional update and paginated scan over
//! JSON documents grouped in tables. The store owns no business logic; the
//! saga stages express their stock arithmetic through [`UpdateExpression`]s.

pub mod error;
pub mod expression;
pub mod memory;
pub mod postgres;
pub mod scan;
pub mod store;

pub use error::{Result, StoreError};
pub use expression::{Condition, ReturnValues, UpdateExpression};
pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;
pub use scan::{Page, ScanRequest};
pub use store::{PutMode, RecordStore, RecordStoreExt, Table};
