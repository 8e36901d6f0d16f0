pub mod backend;
pub mod config;
pub mod display;
pub mod errors;
pub mod form;
pub mod normalization;
pub mod persistence;
pub mod record;
pub mod store;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use persistence::{PersistenceAdapter, STORAGE_KEY};
pub use record::{Amount, Currency, Rating, Record, RecordId, RecordInput, RecordUpdate};
pub use store::RecordStore;
