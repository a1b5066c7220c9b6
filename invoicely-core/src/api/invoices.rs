use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;

use super::{ApiError, ApiResult, AppState};
use crate::filter::{InvoiceQuery, StatusTab};
use crate::models::{Invoice, InvoiceStatus, NewInvoice, UnknownStatus};
use crate::store::OwnerContext;

/// Query string of the invoice list.
#[derive(Debug, Default, Deserialize)]
pub struct InvoiceListQuery {
    pub year: Option<i32>,
    pub search: Option<String>,
    pub status: Option<String>,
}

impl InvoiceListQuery {
    fn into_query(self) -> ApiResult<InvoiceQuery> {
        let tab = match self.status.as_deref() {
            None | Some("") => StatusTab::All,
            Some(raw) => raw
                .parse()
                .map_err(|e: UnknownStatus| ApiError::BadRequest(e.to_string()))?,
        };
        Ok(InvoiceQuery {
            year: self.year,
            search: self.search,
            tab,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Lists invoices narrowed by year, search term and status tab, newest
/// first.
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Query(params): Query<InvoiceListQuery>,
) -> ApiResult<Json<Vec<Invoice>>> {
    let query = params.into_query()?;
    let invoices = state.snapshot(ctx).await?.invoices().await;

    let mut filtered = query.apply(&invoices);
    filtered.sort_by(|a, b| b.created_at_utc().cmp(&a.created_at_utc()));

    Ok(Json(filtered))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Invoice>> {
    state
        .snapshot(ctx)
        .await?
        .find_invoice(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("invoice {}", id)))
}

/// Creates a pending invoice numbered for today.
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Json(new_invoice): Json<NewInvoice>,
) -> ApiResult<(StatusCode, Json<Invoice>)> {
    new_invoice.validate().map_err(ApiError::Validation)?;

    let invoice = state.snapshot(ctx).await?.create_invoice(new_invoice).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

/// Moves an invoice to another status.
///
/// Only `pending`, `paid` and `overdue` are accepted.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Json<Invoice>> {
    let status: InvoiceStatus = update
        .status
        .parse()
        .map_err(|e: UnknownStatus| ApiError::Validation(vec![e.to_string()]))?;

    let invoice = state
        .snapshot(ctx)
        .await?
        .set_invoice_status(&id, status)
        .await?;
    Ok(Json(invoice))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.snapshot(ctx).await?.delete_invoice(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
