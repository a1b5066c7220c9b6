//! Record store access.
//!
//! Every call is scoped by an explicit [`OwnerContext`]; the store never
//! consults ambient session state. Reads return the owner's full,
//! unordered collection.

pub mod memory;
pub mod postgres;


use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Client, ClientPatch, Invoice, InvoiceStatus, NewClient};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// The authenticated owner every read and write is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerContext {
    owner_id: String,
}

impl OwnerContext {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }
}

/// Record store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to encode document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Access to the owner's client and invoice documents.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_clients(&self, ctx: &OwnerContext) -> Result<Vec<Client>, StoreError>;

    async fn list_invoices(&self, ctx: &OwnerContext) -> Result<Vec<Invoice>, StoreError>;

    /// Stores a new client and returns its generated id.
    async fn create_client(&self, ctx: &OwnerContext, client: NewClient) -> Result<String, StoreError>;

    async fn update_client(
        &self,
        ctx: &OwnerContext,
        id: &str,
        patch: &ClientPatch,
    ) -> Result<(), StoreError>;

    /// Stores an invoice under the caller-supplied `invoice.id`.
    async fn create_invoice(&self, ctx: &OwnerContext, invoice: &Invoice) -> Result<(), StoreError>;

    async fn update_invoice_status(
        &self,
        ctx: &OwnerContext,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<(), StoreError>;

    async fn delete_invoice(&self, ctx: &OwnerContext, id: &str) -> Result<(), StoreError>;

    /// Allocates the next invoice sequence number for `(owner, day)`.
    ///
    /// The first allocation for a day is seeded with one more than the
    /// number of invoices already dated that day; later allocations
    /// increment atomically, so concurrent creations never share a number.
    async fn next_invoice_sequence(&self, ctx: &OwnerContext, day: NaiveDate) -> Result<u32, StoreError>;

    /// Connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;
}
