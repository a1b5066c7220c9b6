use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{ApiError, ApiResult, AppState};
use crate::engine::{compute_client_overview, compute_client_stats, sort_by_recent_activity, ClientOverview, ClientStat};
use crate::filter::{filter_by_search_term, ClientField};
use crate::models::{Client, ClientPatch, Invoice, NewClient};
use crate::store::OwnerContext;

#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    pub search: Option<String>,
}

/// A client row of the client list.
#[derive(Debug, Serialize)]
pub struct ClientSummary {
    #[serde(flatten)]
    pub client: Client,
    pub stats: ClientStat,
}

/// Client detail page: the record, its stats and its invoices.
#[derive(Debug, Serialize)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub stats: ClientStat,
    pub invoices: Vec<Invoice>,
}

/// Lists clients with their stats, most recently invoiced first.
pub async fn list_clients(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Query(query): Query<ClientListQuery>,
) -> ApiResult<Json<Vec<ClientSummary>>> {
    let data = state.snapshot(ctx).await?.data().await;

    let clients = filter_by_search_term(
        &data.clients,
        query.search.as_deref().unwrap_or_default(),
        &ClientField::DEFAULT,
    );
    let mut stats = compute_client_stats(&clients, &data.invoices);
    sort_by_recent_activity(&mut stats);

    let mut by_id: HashMap<String, Client> = HashMap::new();
    for client in clients {
        by_id.entry(client.id.clone()).or_insert(client);
    }
    let rows = stats
        .into_iter()
        .filter_map(|stats| {
            by_id
                .remove(&stats.client_id)
                .map(|client| ClientSummary { client, stats })
        })
        .collect();

    Ok(Json(rows))
}

pub async fn client_overview(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
) -> ApiResult<Json<ClientOverview>> {
    let data = state.snapshot(ctx).await?.data().await;
    let stats = compute_client_stats(&data.clients, &data.invoices);
    Ok(Json(compute_client_overview(&stats)))
}

/// Looks a client up by id, falling back to its slug.
pub async fn get_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Path(key): Path<String>,
) -> ApiResult<Json<ClientDetail>> {
    let snapshot = state.snapshot(ctx).await?;
    let client = match snapshot.find_client(&key).await {
        Some(client) => client,
        None => snapshot
            .find_client_by_slug(&key)
            .await
            .ok_or_else(|| ApiError::NotFound(format!("client {}", key)))?,
    };

    let mut invoices: Vec<Invoice> = snapshot
        .invoices()
        .await
        .into_iter()
        .filter(|invoice| invoice.client_id == client.id)
        .collect();
    let stats = compute_client_stats(std::slice::from_ref(&client), &invoices)
        .pop()
        .ok_or_else(|| ApiError::NotFound(format!("client {}", key)))?;
    invoices.sort_by(|a, b| b.created_at_utc().cmp(&a.created_at_utc()));

    Ok(Json(ClientDetail {
        client,
        stats,
        invoices,
    }))
}

pub async fn create_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Json(new_client): Json<NewClient>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    new_client.validate().map_err(ApiError::Validation)?;

    let owner = ctx.owner_id().to_string();
    let client = state.snapshot(ctx).await?.add_client(new_client).await?;
    info!("Created client {} ({}) for owner {}", client.id, client.slug, owner);

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn update_client(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Path(id): Path<String>,
    Json(patch): Json<ClientPatch>,
) -> ApiResult<Json<Client>> {
    patch.validate().map_err(ApiError::Validation)?;

    let client = state.snapshot(ctx).await?.update_client(&id, &patch).await?;
    info!("Updated client {}", client.id);

    Ok(Json(client))
}
