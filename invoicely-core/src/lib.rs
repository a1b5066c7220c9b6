pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod engine;
pub mod filter;
pub mod models;
pub mod snapshot;
pub mod store;

pub use config::Config;
pub use snapshot::Snapshot;
pub use store::{OwnerContext, RecordStore, StoreError};
