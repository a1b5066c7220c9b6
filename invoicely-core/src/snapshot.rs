use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::models::{
    invoice_number, Client, ClientPatch, Invoice, InvoiceStatus, NewClient, NewInvoice,
};
use crate::store::{OwnerContext, RecordStore, StoreError};

/// Both collections as of the last successful fetch.
#[derive(Debug, Clone, Default)]
pub struct SnapshotData {
    pub clients: Vec<Client>,
    pub invoices: Vec<Invoice>,
}

/// An owner's in-memory copy of their records.
///
/// Reads come from memory. Every write goes to the store and is followed
/// by a full re-fetch, so reads always reflect the latest completed write.
/// A failed fetch leaves the previous data in place.
pub struct Snapshot {
    store: Arc<dyn RecordStore>,
    ctx: OwnerContext,
    data: RwLock<SnapshotData>,
}

impl Snapshot {
    /// Fetches both collections for `ctx`.
    pub async fn load(store: Arc<dyn RecordStore>, ctx: OwnerContext) -> Result<Self, StoreError> {
        let data = fetch(store.as_ref(), &ctx).await?;
        Ok(Self {
            store,
            ctx,
            data: RwLock::new(data),
        })
    }

    pub fn owner(&self) -> &OwnerContext {
        &self.ctx
    }

    /// Re-fetches both collections, replacing the data only if both reads
    /// succeed.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        match fetch(self.store.as_ref(), &self.ctx).await {
            Ok(fresh) => {
                *self.data.write().await = fresh;
                Ok(())
            }
            Err(e) => {
                error!(
                    "Refresh failed for owner {}, keeping previous snapshot: {}",
                    self.ctx.owner_id(),
                    e
                );
                Err(e)
            }
        }
    }

    pub async fn data(&self) -> SnapshotData {
        self.data.read().await.clone()
    }

    pub async fn clients(&self) -> Vec<Client> {
        self.data.read().await.clients.clone()
    }

    pub async fn invoices(&self) -> Vec<Invoice> {
        self.data.read().await.invoices.clone()
    }

    pub async fn find_invoice(&self, id: &str) -> Option<Invoice> {
        self.data
            .read()
            .await
            .invoices
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub async fn find_client(&self, id: &str) -> Option<Client> {
        self.data
            .read()
            .await
            .clients
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// First client whose slug matches; slugs are not unique.
    pub async fn find_client_by_slug(&self, slug: &str) -> Option<Client> {
        self.data
            .read()
            .await
            .clients
            .iter()
            .find(|c| c.slug == slug)
            .cloned()
    }

    pub async fn add_client(&self, new: NewClient) -> Result<Client, StoreError> {
        let id = self.store.create_client(&self.ctx, new).await?;
        self.refresh().await?;
        self.find_client(&id)
            .await
            .ok_or_else(|| StoreError::not_found("client", id))
    }

    pub async fn update_client(&self, id: &str, patch: &ClientPatch) -> Result<Client, StoreError> {
        self.store.update_client(&self.ctx, id, patch).await?;
        self.refresh().await?;
        self.find_client(id)
            .await
            .ok_or_else(|| StoreError::not_found("client", id))
    }

    /// Creates an invoice numbered for today and returns the stored record.
    pub async fn create_invoice(&self, new: NewInvoice) -> Result<Invoice, StoreError> {
        let now = Utc::now();
        let today = now.date_naive();
        let sequence = self.store.next_invoice_sequence(&self.ctx, today).await?;
        let id = invoice_number(today, sequence);

        let invoice = Invoice::build(id, self.ctx.owner_id(), new, now);
        self.store.create_invoice(&self.ctx, &invoice).await?;
        info!("Created invoice {} for owner {}", invoice.id, self.ctx.owner_id());

        self.refresh().await?;
        Ok(self.find_invoice(&invoice.id).await.unwrap_or(invoice))
    }

    /// Moves an invoice to `status`; a no-op when it is already there.
    pub async fn set_invoice_status(
        &self,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<Invoice, StoreError> {
        let current = self
            .find_invoice(id)
            .await
            .ok_or_else(|| StoreError::not_found("invoice", id))?;
        if current.status_kind() == Some(status) {
            return Ok(current);
        }

        self.store.update_invoice_status(&self.ctx, id, status).await?;
        info!("Invoice {}: {} -> {}", id, current.status, status);

        self.refresh().await?;
        self.find_invoice(id)
            .await
            .ok_or_else(|| StoreError::not_found("invoice", id))
    }

    pub async fn delete_invoice(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete_invoice(&self.ctx, id).await?;
        info!("Deleted invoice {} for owner {}", id, self.ctx.owner_id());
        self.refresh().await
    }
}

async fn fetch(store: &dyn RecordStore, ctx: &OwnerContext) -> Result<SnapshotData, StoreError> {
    let (clients, invoices) = tokio::try_join!(store.list_clients(ctx), store.list_invoices(ctx))?;
    Ok(SnapshotData { clients, invoices })
}
