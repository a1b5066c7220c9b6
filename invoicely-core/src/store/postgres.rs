use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{OwnerContext, RecordStore, StoreError};
use crate::models::{Client, ClientPatch, Invoice, InvoiceStatus, NewClient};

/// Statements creating the document tables; each is idempotent.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS clients_owner_id_idx ON clients (owner_id)",
    r#"
    CREATE TABLE IF NOT EXISTS invoices (
        id TEXT NOT NULL,
        owner_id TEXT NOT NULL,
        data JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (owner_id, id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS invoices_owner_id_idx ON invoices (owner_id)",
    r#"
    CREATE TABLE IF NOT EXISTS invoice_sequences (
        owner_id TEXT NOT NULL,
        day DATE NOT NULL,
        last_seq INTEGER NOT NULL,
        PRIMARY KEY (owner_id, day)
    )
    "#,
];

/// Document store on PostgreSQL.
///
/// Each record is one JSONB document filtered by an `owner_id` column.
/// Invoice numbers restart per owner, so invoices are keyed by
/// `(owner_id, id)`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the document tables if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Record store schema is ready");
        Ok(())
    }

    async fn list_documents<T: DeserializeOwned>(
        &self,
        table: &'static str,
        ctx: &OwnerContext,
    ) -> Result<Vec<T>, StoreError> {
        let query = format!("SELECT id, data FROM {} WHERE owner_id = $1", table);
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(&query)
            .bind(ctx.owner_id())
            .fetch_all(&self.pool)
            .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for (id, Json(mut data)) in rows {
            // The row key is authoritative for the document id
            if let Some(obj) = data.as_object_mut() {
                obj.insert("id".to_string(), json!(id));
            }
            match serde_json::from_value(data) {
                Ok(doc) => documents.push(doc),
                Err(e) => warn!("Skipping malformed {} document {}: {}", table, id, e),
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn list_clients(&self, ctx: &OwnerContext) -> Result<Vec<Client>, StoreError> {
        self.list_documents("clients", ctx).await
    }

    async fn list_invoices(&self, ctx: &OwnerContext) -> Result<Vec<Invoice>, StoreError> {
        self.list_documents("invoices", ctx).await
    }

    async fn create_client(&self, ctx: &OwnerContext, client: NewClient) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let client = Client::build(id.clone(), ctx.owner_id(), client, Utc::now());

        sqlx::query("INSERT INTO clients (id, owner_id, data) VALUES ($1, $2, $3)")
            .bind(&id)
            .bind(ctx.owner_id())
            .bind(Json(serde_json::to_value(&client)?))
            .execute(&self.pool)
            .await?;

        info!("Created client {} for owner {}", id, ctx.owner_id());
        Ok(id)
    }

    async fn update_client(
        &self,
        ctx: &OwnerContext,
        id: &str,
        patch: &ClientPatch,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE clients SET data = data || $3 WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(ctx.owner_id())
        .bind(Json(patch.to_document(Utc::now())))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("client", id));
        }
        Ok(())
    }

    async fn create_invoice(&self, ctx: &OwnerContext, invoice: &Invoice) -> Result<(), StoreError> {
        let mut stored = invoice.clone();
        stored.owner_id = ctx.owner_id().to_string();

        let result = sqlx::query(
            r#"
            INSERT INTO invoices (id, owner_id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (owner_id, id) DO NOTHING
            "#,
        )
        .bind(&stored.id)
        .bind(ctx.owner_id())
        .bind(Json(serde_json::to_value(&stored)?))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                kind: "invoice",
                id: stored.id,
            });
        }
        Ok(())
    }

    async fn update_invoice_status(
        &self,
        ctx: &OwnerContext,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET data = jsonb_set(data, '{status}', to_jsonb($3::text))
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(id)
        .bind(ctx.owner_id())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("invoice", id));
        }
        Ok(())
    }

    async fn delete_invoice(&self, ctx: &OwnerContext, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(ctx.owner_id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("invoice", id));
        }
        Ok(())
    }

    async fn next_invoice_sequence(&self, ctx: &OwnerContext, day: NaiveDate) -> Result<u32, StoreError> {
        let (seq,): (i32,) = sqlx::query_as(
            r#"
            INSERT INTO invoice_sequences (owner_id, day, last_seq)
            VALUES (
                $1,
                $2,
                (
                    SELECT COUNT(*) + 1
                    FROM invoices
                    WHERE owner_id = $1
                        AND substring(data->>'invoice_date' from 1 for 10) = to_char($2::date, 'YYYY-MM-DD')
                )
            )
            ON CONFLICT (owner_id, day)
            DO UPDATE SET last_seq = invoice_sequences.last_seq + 1
            RETURNING last_seq
            "#,
        )
        .bind(ctx.owner_id())
        .bind(day)
        .fetch_one(&self.pool)
        .await?;

        u32::try_from(seq)
            .map_err(|_| StoreError::Unavailable(format!("invalid invoice sequence {}", seq)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
