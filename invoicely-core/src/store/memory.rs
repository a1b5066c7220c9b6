use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use super::{OwnerContext, RecordStore, StoreError};
use crate::models::{
    sequence_from_existing, Client, ClientPatch, Invoice, InvoiceStatus, NewClient,
};

/// In-process record store.
///
/// Used when no database is configured and as the store behind tests.
/// Collections keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    clients: RwLock<Vec<Client>>,
    invoices: RwLock<Vec<Invoice>>,
    sequences: Mutex<HashMap<(String, NaiveDate), u32>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with documents of any owner.
    pub fn with_records(clients: Vec<Client>, invoices: Vec<Invoice>) -> Self {
        Self {
            clients: RwLock::new(clients),
            invoices: RwLock::new(invoices),
            sequences: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_clients(&self, ctx: &OwnerContext) -> Result<Vec<Client>, StoreError> {
        let clients = self.clients.read().await;
        Ok(clients
            .iter()
            .filter(|c| c.owner_id == ctx.owner_id())
            .cloned()
            .collect())
    }

    async fn list_invoices(&self, ctx: &OwnerContext) -> Result<Vec<Invoice>, StoreError> {
        let invoices = self.invoices.read().await;
        Ok(invoices
            .iter()
            .filter(|i| i.owner_id == ctx.owner_id())
            .cloned()
            .collect())
    }

    async fn create_client(&self, ctx: &OwnerContext, client: NewClient) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let client = Client::build(id.clone(), ctx.owner_id(), client, Utc::now());
        self.clients.write().await.push(client);
        info!("Created client {} for owner {}", id, ctx.owner_id());
        Ok(id)
    }

    async fn update_client(
        &self,
        ctx: &OwnerContext,
        id: &str,
        patch: &ClientPatch,
    ) -> Result<(), StoreError> {
        let mut clients = self.clients.write().await;
        let client = clients
            .iter_mut()
            .find(|c| c.id == id && c.owner_id == ctx.owner_id())
            .ok_or_else(|| StoreError::not_found("client", id))?;
        patch.apply_to(client, Utc::now());
        Ok(())
    }

    async fn create_invoice(&self, ctx: &OwnerContext, invoice: &Invoice) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().await;
        if invoices
            .iter()
            .any(|i| i.id == invoice.id && i.owner_id == ctx.owner_id())
        {
            return Err(StoreError::AlreadyExists {
                kind: "invoice",
                id: invoice.id.clone(),
            });
        }
        let mut stored = invoice.clone();
        stored.owner_id = ctx.owner_id().to_string();
        invoices.push(stored);
        Ok(())
    }

    async fn update_invoice_status(
        &self,
        ctx: &OwnerContext,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().await;
        let invoice = invoices
            .iter_mut()
            .find(|i| i.id == id && i.owner_id == ctx.owner_id())
            .ok_or_else(|| StoreError::not_found("invoice", id))?;
        invoice.status = status.to_string();
        Ok(())
    }

    async fn delete_invoice(&self, ctx: &OwnerContext, id: &str) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().await;
        let before = invoices.len();
        invoices.retain(|i| !(i.id == id && i.owner_id == ctx.owner_id()));
        if invoices.len() == before {
            return Err(StoreError::not_found("invoice", id));
        }
        Ok(())
    }

    async fn next_invoice_sequence(&self, ctx: &OwnerContext, day: NaiveDate) -> Result<u32, StoreError> {
        let mut sequences = self.sequences.lock().await;
        let key = (ctx.owner_id().to_string(), day);
        let next = match sequences.get(&key) {
            Some(last) => last + 1,
            None => {
                let owned = self.list_invoices(ctx).await?;
                sequence_from_existing(&owned, day)
            }
        };
        sequences.insert(key, next);
        Ok(next)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineItem, NewInvoice};
    use rust_decimal_macros::dec;

    fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            ..Default::default()
        }
    }

    fn invoice(id: &str, day: NaiveDate) -> Invoice {
        Invoice::build(
            id.to_string(),
            "ignored",
            NewInvoice {
                client_name: "Budi".into(),
                client_email: "budi@example.com".into(),
                invoice_date: Some(day),
                items: vec![LineItem {
                    description: "Work".into(),
                    quantity: dec!(1),
                    price: dec!(10),
                }],
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_reads_are_scoped_to_owner() {
        let store = MemoryStore::new();
        let alice = OwnerContext::new("alice");
        let bob = OwnerContext::new("bob");

        store.create_client(&alice, new_client("Acme")).await.unwrap();
        store.create_client(&bob, new_client("Globex")).await.unwrap();

        let alice_clients = store.list_clients(&alice).await.unwrap();
        assert_eq!(alice_clients.len(), 1);
        assert_eq!(alice_clients[0].name, "Acme");
        assert_eq!(alice_clients[0].owner_id, "alice");
    }

    #[tokio::test]
    async fn test_update_client_of_other_owner_is_not_found() {
        let store = MemoryStore::new();
        let alice = OwnerContext::new("alice");
        let id = store.create_client(&alice, new_client("Acme")).await.unwrap();

        let patch = ClientPatch {
            name: Some("Hijacked".into()),
            ..Default::default()
        };
        let err = store
            .update_client(&OwnerContext::new("mallory"), &id, &patch)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "client", .. }));
    }

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let store = MemoryStore::new();
        let ctx = OwnerContext::new("alice");
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        store.create_invoice(&ctx, &invoice("INV-20240501-001", day)).await.unwrap();
        let duplicate = store.create_invoice(&ctx, &invoice("INV-20240501-001", day)).await;
        assert!(matches!(duplicate, Err(StoreError::AlreadyExists { .. })));

        store
            .update_invoice_status(&ctx, "INV-20240501-001", InvoiceStatus::Paid)
            .await
            .unwrap();
        let listed = store.list_invoices(&ctx).await.unwrap();
        assert_eq!(listed[0].status, "paid");
        assert_eq!(listed[0].owner_id, "alice");

        store.delete_invoice(&ctx, "INV-20240501-001").await.unwrap();
        assert!(store.list_invoices(&ctx).await.unwrap().is_empty());
        assert!(store.delete_invoice(&ctx, "INV-20240501-001").await.is_err());
    }

    #[tokio::test]
    async fn test_invoice_ids_are_unique_per_owner() {
        let store = MemoryStore::new();
        let alice = OwnerContext::new("alice");
        let bob = OwnerContext::new("bob");
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        store.create_invoice(&alice, &invoice("INV-20240501-001", day)).await.unwrap();
        store.create_invoice(&bob, &invoice("INV-20240501-001", day)).await.unwrap();

        store
            .update_invoice_status(&bob, "INV-20240501-001", InvoiceStatus::Paid)
            .await
            .unwrap();
        assert_eq!(store.list_invoices(&alice).await.unwrap()[0].status, "pending");
        assert_eq!(store.list_invoices(&bob).await.unwrap()[0].status, "paid");

        store.delete_invoice(&alice, "INV-20240501-001").await.unwrap();
        assert!(store.list_invoices(&alice).await.unwrap().is_empty());
        assert_eq!(store.list_invoices(&bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sequence_is_seeded_from_existing_then_increments() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut seeded = invoice("INV-20240501-001", day);
        seeded.owner_id = "alice".into();
        let store = MemoryStore::with_records(vec![], vec![seeded]);
        let ctx = OwnerContext::new("alice");

        assert_eq!(store.next_invoice_sequence(&ctx, day).await.unwrap(), 2);
        assert_eq!(store.next_invoice_sequence(&ctx, day).await.unwrap(), 3);

        let other_day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(store.next_invoice_sequence(&ctx, other_day).await.unwrap(), 1);
        assert_eq!(
            store.next_invoice_sequence(&OwnerContext::new("bob"), day).await.unwrap(),
            1
        );
    }
}
