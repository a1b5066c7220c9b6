//! Aggregation over an owner's clients and invoices.
//!
//! Every function here is pure and total: empty collections, missing
//! optional fields and malformed numbers degrade to zero, `None` or a
//! skipped record, never a panic or an error.

pub mod clients;
pub mod revenue;
pub mod summary;

use serde::Serialize;

pub use clients::{
    compute_client_overview, compute_client_stats, most_active_client, rank_clients_by_revenue,
    sort_by_recent_activity, ClientOverview, ClientStat,
};
pub use revenue::{compute_monthly_revenue, compute_top_clients, MonthlyBucket, TopClient};
pub use summary::{compute_status_distribution, compute_summary_kpis, StatusDistribution, SummaryKpis};

use crate::filter::filter_by_year;
use crate::models::Invoice;

/// Number of entries in the top-clients chart.
pub const TOP_CLIENTS: usize = 5;

/// View model behind the dashboard and report pages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub year: i32,
    pub summary: SummaryKpis,
    pub monthly: Vec<MonthlyBucket>,
    pub status: StatusDistribution,
    pub top_clients: Vec<TopClient>,
}

/// Assembles the report for `year` from the owner's full invoice list.
///
/// Counts, status split and top clients cover `year` only; the monthly
/// series also carries the previous year for comparison.
pub fn build_dashboard_report(invoices: &[Invoice], year: i32) -> DashboardReport {
    let in_year = filter_by_year(invoices, year);

    DashboardReport {
        year,
        summary: compute_summary_kpis(&in_year),
        monthly: compute_monthly_revenue(invoices, year),
        status: compute_status_distribution(&in_year),
        top_clients: compute_top_clients(&in_year, TOP_CLIENTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn invoice(client: &str, status: &str, total: i64, created_at: &str) -> Invoice {
        serde_json::from_value(json!({
            "id": format!("INV-{}", created_at),
            "client_name": client,
            "status": status,
            "total": total,
            "created_at": created_at,
        }))
        .unwrap()
    }

    #[test]
    fn test_report_scopes_to_year_with_previous_year_series() {
        let invoices = [
            invoice("Acme", "paid", 100000, "2024-03-01"),
            invoice("Globex", "pending", 50000, "2024-03-15"),
            invoice("Acme", "paid", 70000, "2023-03-10"),
        ];
        let report = build_dashboard_report(&invoices, 2024);

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.paid, 1);
        assert_eq!(report.summary.pending, 1);
        assert_eq!(report.summary.total_value, dec!(100000));
        assert_eq!(report.summary.average_invoice, dec!(100000));
        assert_eq!(report.summary.conversion_rate, 50);

        assert_eq!(report.monthly.len(), 12);
        assert_eq!(report.monthly[2].total, dec!(150000));
        assert_eq!(report.monthly[2].previous, dec!(70000));
        assert_eq!(report.status.paid, 1);
        assert_eq!(report.top_clients[0].name, "Acme");
        assert_eq!(report.top_clients[0].value, dec!(100000));
        assert_eq!(report.top_clients.len(), 2);
    }

    #[test]
    fn test_report_for_empty_year() {
        let report = build_dashboard_report(&[], 2024);
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.summary.average_invoice, Decimal::ZERO);
        assert_eq!(report.monthly.len(), 12);
        assert!(report.top_clients.is_empty());
    }

    #[test]
    fn test_report_is_idempotent() {
        let invoices = [invoice("Acme", "overdue", 10, "2024-07-01")];
        assert_eq!(
            build_dashboard_report(&invoices, 2024),
            build_dashboard_report(&invoices, 2024)
        );
    }
}
