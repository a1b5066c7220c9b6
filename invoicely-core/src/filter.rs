//! Stateless filters that narrow collections before aggregation.
//!
//! The pipeline order is year, then free-text search, then status tab.
//! Debouncing of search input is the caller's concern.

use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::models::{Client, Invoice, InvoiceStatus, UnknownStatus};

/// Keeps invoices whose `created_at` falls in `year`.
pub fn filter_by_year(invoices: &[Invoice], year: i32) -> Vec<Invoice> {
    invoices
        .iter()
        .filter(|invoice| {
            invoice
                .created_at_utc()
                .is_some_and(|created| created.year() == year)
        })
        .cloned()
        .collect()
}

/// A record that exposes named text fields to free-text search.
pub trait Searchable {
    type Field: Copy;

    fn field_text(&self, field: Self::Field) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientField {
    Name,
    Email,
    Company,
}

impl ClientField {
    pub const DEFAULT: [ClientField; 3] = [ClientField::Name, ClientField::Email, ClientField::Company];
}

impl Searchable for Client {
    type Field = ClientField;

    fn field_text(&self, field: ClientField) -> Option<&str> {
        match field {
            ClientField::Name => Some(&self.name),
            ClientField::Email => Some(&self.email),
            ClientField::Company => self.company.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceField {
    Id,
    ClientName,
}

impl InvoiceField {
    pub const DEFAULT: [InvoiceField; 2] = [InvoiceField::ClientName, InvoiceField::Id];
}

impl Searchable for Invoice {
    type Field = InvoiceField;

    fn field_text(&self, field: InvoiceField) -> Option<&str> {
        match field {
            InvoiceField::Id => Some(&self.id),
            InvoiceField::ClientName => Some(&self.client_name),
        }
    }
}

/// Case-insensitive substring match over `fields`.
///
/// A blank term returns the input unchanged.
pub fn filter_by_search_term<T>(items: &[T], term: &str, fields: &[T::Field]) -> Vec<T>
where
    T: Searchable + Clone,
{
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| {
            fields.iter().any(|&field| {
                item.field_text(field)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        })
        .cloned()
        .collect()
}

/// Status tab of the invoice list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusTab {
    #[default]
    All,
    Only(InvoiceStatus),
}

impl FromStr for StatusTab {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusTab::All),
            other => other.parse().map(StatusTab::Only),
        }
    }
}

impl fmt::Display for StatusTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusTab::All => f.write_str("all"),
            StatusTab::Only(status) => f.write_str(status.as_str()),
        }
    }
}

pub fn filter_by_status_tab(invoices: &[Invoice], tab: StatusTab) -> Vec<Invoice> {
    match tab {
        StatusTab::All => invoices.to_vec(),
        StatusTab::Only(status) => invoices
            .iter()
            .filter(|invoice| invoice.status == status.as_str())
            .cloned()
            .collect(),
    }
}

/// The composed invoice list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceQuery {
    pub year: Option<i32>,
    pub search: Option<String>,
    pub tab: StatusTab,
}

impl InvoiceQuery {
    pub fn apply(&self, invoices: &[Invoice]) -> Vec<Invoice> {
        let by_year = match self.year {
            Some(year) => filter_by_year(invoices, year),
            None => invoices.to_vec(),
        };
        let searched = match self.search.as_deref() {
            Some(term) => filter_by_search_term(&by_year, term, &InvoiceField::DEFAULT),
            None => by_year,
        };
        filter_by_status_tab(&searched, self.tab)
    }
}

/// Years offered by the report year selector, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearOptions {
    pub years: Vec<i32>,
}

pub fn year_options(current_year: i32) -> YearOptions {
    YearOptions {
        years: (0..5).map(|offset| current_year - offset).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoice(id: &str, client_name: &str, status: &str, created_at: &str) -> Invoice {
        serde_json::from_value(json!({
            "id": id,
            "client_name": client_name,
            "status": status,
            "created_at": created_at,
            "total": 1,
        }))
        .unwrap()
    }

    fn client(name: &str, email: &str, company: Option<&str>) -> Client {
        serde_json::from_value(json!({
            "id": name,
            "name": name,
            "email": email,
            "company": company,
        }))
        .unwrap()
    }

    fn ids(invoices: &[Invoice]) -> Vec<&str> {
        invoices.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_year_filter_excludes_unparseable_dates() {
        let invoices = [
            invoice("a", "Acme", "paid", "2024-01-05"),
            invoice("b", "Acme", "paid", "2023-12-31T23:59:59Z"),
            invoice("c", "Acme", "paid", "not-a-date"),
            invoice("d", "Acme", "paid", "2024-11-20T10:00:00.000Z"),
        ];
        assert_eq!(ids(&filter_by_year(&invoices, 2024)), vec!["a", "d"]);
        assert!(filter_by_year(&invoices, 2020).is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_over_selected_fields() {
        let clients = [
            client("Budi", "budi@maju.co.id", Some("PT Maju")),
            client("Sari", "sari@example.com", None),
        ];
        let hits = filter_by_search_term(&clients, "MAJU", &ClientField::DEFAULT);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Budi");

        let by_name_only = filter_by_search_term(&clients, "maju", &[ClientField::Name]);
        assert!(by_name_only.is_empty());
    }

    #[test]
    fn test_blank_search_returns_input_unchanged() {
        let invoices = [
            invoice("INV-1", "Acme", "paid", "2024-01-01"),
            invoice("INV-2", "Globex", "pending", "2024-01-01"),
        ];
        assert_eq!(filter_by_search_term(&invoices, "   ", &InvoiceField::DEFAULT), invoices.to_vec());
        assert_eq!(filter_by_search_term(&invoices, "", &InvoiceField::DEFAULT), invoices.to_vec());
    }

    #[test]
    fn test_invoice_search_matches_id() {
        let invoices = [
            invoice("INV-20240501-001", "Acme", "paid", "2024-05-01"),
            invoice("INV-20240502-001", "Globex", "paid", "2024-05-02"),
        ];
        let hits = filter_by_search_term(&invoices, "0502", &InvoiceField::DEFAULT);
        assert_eq!(ids(&hits), vec!["INV-20240502-001"]);
    }

    #[test]
    fn test_status_tab() {
        let invoices = [
            invoice("a", "Acme", "paid", "2024-01-01"),
            invoice("b", "Acme", "pending", "2024-01-01"),
            invoice("c", "Acme", "weird", "2024-01-01"),
        ];
        assert_eq!(filter_by_status_tab(&invoices, StatusTab::All).len(), 3);
        let paid = filter_by_status_tab(&invoices, StatusTab::Only(InvoiceStatus::Paid));
        assert_eq!(ids(&paid), vec!["a"]);
    }

    #[test]
    fn test_status_tab_parsing() {
        assert_eq!("all".parse::<StatusTab>(), Ok(StatusTab::All));
        assert_eq!(
            "overdue".parse::<StatusTab>(),
            Ok(StatusTab::Only(InvoiceStatus::Overdue))
        );
        assert!("archived".parse::<StatusTab>().is_err());
        assert_eq!(StatusTab::Only(InvoiceStatus::Paid).to_string(), "paid");
    }

    #[test]
    fn test_query_composes_year_search_and_status() {
        let invoices = [
            invoice("a", "Acme", "paid", "2024-01-01"),
            invoice("b", "Acme", "pending", "2024-02-01"),
            invoice("c", "Acme", "paid", "2023-02-01"),
            invoice("d", "Globex", "paid", "2024-03-01"),
        ];
        let query = InvoiceQuery {
            year: Some(2024),
            search: Some("acme".into()),
            tab: StatusTab::Only(InvoiceStatus::Paid),
        };
        assert_eq!(ids(&query.apply(&invoices)), vec!["a"]);
        assert_eq!(InvoiceQuery::default().apply(&invoices).len(), 4);
    }

    #[test]
    fn test_year_options_are_five_recent_years() {
        assert_eq!(year_options(2026).years, vec![2026, 2025, 2024, 2023, 2022]);
    }
}
