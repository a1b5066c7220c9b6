use chrono::{Datelike, Utc};
use dotenv::dotenv;
use invoicely_core::config::{self, ConfigError};
use invoicely_core::db::open_store;
use invoicely_core::engine::{build_dashboard_report, compute_client_overview, compute_client_stats};
use invoicely_core::{Config, OwnerContext, Snapshot};
use serde_json::json;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Prints one owner's yearly report as JSON.
///
/// Reads `REPORT_OWNER_ID` (required) and `REPORT_YEAR` (default: the
/// current year) besides the usual store settings. Logs go to stderr so
/// stdout carries only the report.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = Config::from_env()?;
    let owner = config::required("REPORT_OWNER_ID")?;
    let year = match std::env::var("REPORT_YEAR") {
        Ok(raw) => raw.trim().parse::<i32>().map_err(|_| ConfigError::Invalid {
            name: "REPORT_YEAR",
            value: raw,
        })?,
        Err(_) => Utc::now().year(),
    };

    info!("Building {} report for owner {}", year, owner);

    let store = open_store(&config).await?;
    let snapshot = Snapshot::load(store, OwnerContext::new(owner)).await?;
    let data = snapshot.data().await;

    let report = build_dashboard_report(&data.invoices, year);
    let clients = compute_client_overview(&compute_client_stats(&data.clients, &data.invoices));

    let output = json!({
        "report": report,
        "clients": clients,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
