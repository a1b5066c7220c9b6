use std::collections::HashMap;

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::Invoice;

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One calendar month of revenue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub label: &'static str,
    /// Sum of totals created in the month of the target year
    pub total: Decimal,
    /// Same month, previous year
    pub previous: Decimal,
    pub count: u32,
}

/// Buckets invoice totals by month of `created_at` for `target_year`,
/// with the prior year's totals alongside for comparison.
///
/// Always returns twelve buckets, January first. Invoices without a
/// parseable `created_at` are skipped.
pub fn compute_monthly_revenue(invoices: &[Invoice], target_year: i32) -> Vec<MonthlyBucket> {
    let mut buckets: Vec<MonthlyBucket> = MONTH_LABELS
        .iter()
        .map(|&label| MonthlyBucket {
            label,
            total: Decimal::ZERO,
            previous: Decimal::ZERO,
            count: 0,
        })
        .collect();

    let previous_year = target_year.checked_sub(1);
    for invoice in invoices {
        let Some(created) = invoice.created_at_utc() else {
            continue;
        };
        let bucket = &mut buckets[created.month0() as usize];
        if created.year() == target_year {
            bucket.total = bucket.total.saturating_add(invoice.total);
            bucket.count += 1;
        } else if Some(created.year()) == previous_year {
            bucket.previous = bucket.previous.saturating_add(invoice.total);
        }
    }
    buckets
}

/// A client's share of revenue in the top-clients chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopClient {
    pub name: String,
    pub value: Decimal,
}

/// Sums invoice totals per `client_name` and keeps the `n` largest.
///
/// Grouping is by display name, so distinct clients sharing a name are
/// merged. Ties keep first-encountered order.
pub fn compute_top_clients(invoices: &[Invoice], n: usize) -> Vec<TopClient> {
    let mut totals: Vec<TopClient> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for invoice in invoices {
        match positions.get(invoice.client_name.as_str()) {
            Some(&i) => {
                let entry = &mut totals[i];
                entry.value = entry.value.saturating_add(invoice.total);
            }
            None => {
                positions.insert(invoice.client_name.as_str(), totals.len());
                totals.push(TopClient {
                    name: invoice.client_name.clone(),
                    value: invoice.total,
                });
            }
        }
    }

    totals.sort_by(|a, b| b.value.cmp(&a.value));
    totals.truncate(n);
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn invoice(client_name: &str, total: serde_json::Value, created_at: Option<&str>) -> Invoice {
        serde_json::from_value(json!({
            "id": "INV-1",
            "client_name": client_name,
            "total": total,
            "created_at": created_at,
            "status": "paid",
        }))
        .unwrap()
    }

    #[test]
    fn test_always_twelve_buckets_in_calendar_order() {
        let buckets = compute_monthly_revenue(&[], 2024);
        assert_eq!(buckets.len(), 12);
        assert_eq!(buckets[0].label, "Jan");
        assert_eq!(buckets[11].label, "Dec");
        assert!(buckets.iter().all(|b| b.total.is_zero() && b.count == 0));
    }

    #[test]
    fn test_buckets_current_and_previous_year() {
        let invoices = [
            invoice("A", json!(100), Some("2024-03-01T08:00:00.000Z")),
            invoice("A", json!("50.5"), Some("2024-03-15")),
            invoice("B", json!(70), Some("2023-03-20")),
            invoice("B", json!(30), Some("2022-03-20")),
            invoice("B", json!(10), Some("2024-12-31T23:00:00Z")),
        ];
        let buckets = compute_monthly_revenue(&invoices, 2024);

        assert_eq!(buckets[2].total, dec!(150.5));
        assert_eq!(buckets[2].count, 2);
        assert_eq!(buckets[2].previous, dec!(70));
        assert_eq!(buckets[11].total, dec!(10));
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u32>(), 3);
    }

    #[test]
    fn test_unparseable_dates_and_totals_are_absorbed() {
        let invoices = [
            invoice("A", json!(100), None),
            invoice("A", json!(100), Some("yesterday")),
            invoice("A", json!("lots"), Some("2024-01-10")),
        ];
        let buckets = compute_monthly_revenue(&invoices, 2024);
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[0].total, Decimal::ZERO);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<u32>(), 1);
    }

    #[test]
    fn test_top_clients_groups_by_name() {
        let invoices = [
            invoice("Acme", json!(100), None),
            invoice("Globex", json!(300), None),
            invoice("Acme", json!(250), None),
            invoice("Initech", json!(300), None),
        ];
        let top = compute_top_clients(&invoices, 2);
        assert_eq!(
            top,
            vec![
                TopClient { name: "Acme".into(), value: dec!(350) },
                TopClient { name: "Globex".into(), value: dec!(300) },
            ]
        );
    }

    #[test]
    fn test_top_clients_ties_keep_first_seen() {
        let invoices = [
            invoice("Zeta", json!(10), None),
            invoice("Alpha", json!(10), None),
        ];
        let names: Vec<_> = compute_top_clients(&invoices, 5)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
        assert!(compute_top_clients(&[], 5).is_empty());
    }

    #[test]
    fn test_near_max_totals_saturate() {
        let near_max = json!("70000000000000000000000000000");
        let invoices = [
            invoice("Acme", near_max.clone(), Some("2024-01-10")),
            invoice("Acme", near_max.clone(), Some("2024-01-20")),
            invoice("Acme", near_max.clone(), Some("2023-01-10")),
            invoice("Acme", near_max, Some("2023-01-20")),
        ];

        let buckets = compute_monthly_revenue(&invoices, 2024);
        assert_eq!(buckets[0].total, Decimal::MAX);
        assert_eq!(buckets[0].previous, Decimal::MAX);
        assert_eq!(buckets[0].count, 2);

        let top = compute_top_clients(&invoices, 5);
        assert_eq!(top[0].value, Decimal::MAX);
    }

    #[test]
    fn test_lowest_year_has_no_previous_year() {
        let invoices = [invoice("Acme", json!(100), Some("2024-01-10"))];
        let buckets = compute_monthly_revenue(&invoices, i32::MIN);
        assert!(buckets.iter().all(|b| b.total.is_zero() && b.previous.is_zero()));
    }
}
