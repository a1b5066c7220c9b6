use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use super::{ApiResult, AppState};
use crate::engine::{build_dashboard_report, DashboardReport};
use crate::filter::{year_options, YearOptions};
use crate::store::OwnerContext;

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub year: Option<i32>,
}

/// Dashboard report for the requested year (default: the current year).
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(ctx): Extension<OwnerContext>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<DashboardReport>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let invoices = state.snapshot(ctx).await?.invoices().await;
    Ok(Json(build_dashboard_report(&invoices, year)))
}

pub async fn years() -> Json<YearOptions> {
    Json(year_options(Utc::now().year()))
}
