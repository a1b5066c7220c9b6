use std::cmp::Ordering;
use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{parse_timestamp, Client, Invoice};

/// Per-client invoice statistics, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientStat {
    pub client_id: String,
    pub name: String,
    pub invoice_count: u32,
    pub total_spent: Decimal,
    /// Raw `created_at` of the latest invoice
    pub last_invoice_date: Option<String>,
    pub last_invoice_status: Option<String>,
}

impl ClientStat {
    fn empty(client: &Client) -> Self {
        ClientStat {
            client_id: client.id.clone(),
            name: client.name.clone(),
            invoice_count: 0,
            total_spent: Decimal::ZERO,
            last_invoice_date: None,
            last_invoice_status: None,
        }
    }

    fn record(&mut self, invoice: &Invoice) {
        self.invoice_count += 1;
        self.total_spent = self.total_spent.saturating_add(invoice.total);

        let newer = match &self.last_invoice_date {
            None => true,
            Some(current) => match (invoice.created_at_utc(), parse_timestamp(current)) {
                (Some(candidate), Some(current)) => candidate > current,
                _ => false,
            },
        };
        if newer {
            self.last_invoice_date = invoice.created_at.clone();
            self.last_invoice_status = Some(invoice.status.clone());
        }
    }
}

/// Joins invoices onto clients by `client_id`.
///
/// Returns one stat per client in input order. Invoices referencing an
/// unknown client are ignored.
pub fn compute_client_stats(clients: &[Client], invoices: &[Invoice]) -> Vec<ClientStat> {
    let mut stats: Vec<ClientStat> = clients.iter().map(ClientStat::empty).collect();
    let index: HashMap<&str, usize> = clients
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id.as_str(), i))
        // first occurrence of a duplicated id wins
        .rev()
        .collect();

    for invoice in invoices {
        if let Some(&i) = index.get(invoice.client_id.as_str()) {
            stats[i].record(invoice);
        }
    }
    stats
}

/// Client with the most invoices; ties go to the earliest in input order.
pub fn most_active_client(stats: &[ClientStat]) -> Option<&ClientStat> {
    stats.iter().fold(None, |best, stat| match best {
        Some(b) if b.invoice_count >= stat.invoice_count => Some(b),
        _ => Some(stat),
    })
}

/// Top `n` clients by total spent, ties kept in input order.
pub fn rank_clients_by_revenue(stats: &[ClientStat], n: usize) -> Vec<ClientStat> {
    let mut ranked = stats.to_vec();
    ranked.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
    ranked.truncate(n);
    ranked
}

/// Most recently invoiced first; clients without a dated invoice last.
pub fn sort_by_recent_activity(stats: &mut [ClientStat]) {
    stats.sort_by(|a, b| {
        let a_last = a.last_invoice_date.as_deref().and_then(parse_timestamp);
        let b_last = b.last_invoice_date.as_deref().and_then(parse_timestamp);
        match (a_last, b_last) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// Headline numbers for the client list page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientOverview {
    pub total_clients: usize,
    pub total_spent: Decimal,
    pub average_spent: Decimal,
    pub most_active_client: Option<ClientStat>,
}

pub fn compute_client_overview(stats: &[ClientStat]) -> ClientOverview {
    let total_spent = stats
        .iter()
        .fold(Decimal::ZERO, |sum, s| sum.saturating_add(s.total_spent));
    let average_spent = if stats.is_empty() {
        Decimal::ZERO
    } else {
        total_spent / Decimal::from(stats.len())
    };

    ClientOverview {
        total_clients: stats.len(),
        total_spent,
        average_spent,
        most_active_client: most_active_client(stats).cloned(),
    }
}
