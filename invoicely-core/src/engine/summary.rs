use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Invoice, InvoiceStatus};

/// Invoice counts per known status.
///
/// Invoices whose status is not one of the three known values are not
/// counted in any bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusDistribution {
    pub paid: u32,
    pub pending: u32,
    pub overdue: u32,
}

impl StatusDistribution {
    fn record(&mut self, status: Option<InvoiceStatus>) {
        match status {
            Some(InvoiceStatus::Paid) => self.paid += 1,
            Some(InvoiceStatus::Pending) => self.pending += 1,
            Some(InvoiceStatus::Overdue) => self.overdue += 1,
            None => {}
        }
    }
}

pub fn compute_status_distribution(invoices: &[Invoice]) -> StatusDistribution {
    let mut distribution = StatusDistribution::default();
    for invoice in invoices {
        distribution.record(invoice.status_kind());
    }
    distribution
}

/// Dashboard headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryKpis {
    /// Every invoice, whatever its status
    pub total: u32,
    pub paid: u32,
    pub pending: u32,
    pub overdue: u32,
    /// Sum of paid invoice totals
    pub total_value: Decimal,
    pub average_invoice: Decimal,
    /// Paid share of all invoices, whole percent
    pub conversion_rate: u32,
}

pub fn compute_summary_kpis(invoices: &[Invoice]) -> SummaryKpis {
    let mut counts = StatusDistribution::default();
    let mut total_value = Decimal::ZERO;

    for invoice in invoices {
        let status = invoice.status_kind();
        if status == Some(InvoiceStatus::Paid) {
            total_value = total_value.saturating_add(invoice.total);
        }
        counts.record(status);
    }

    let total = u32::try_from(invoices.len()).unwrap_or(u32::MAX);
    let average_invoice = if counts.paid == 0 {
        Decimal::ZERO
    } else {
        total_value / Decimal::from(counts.paid)
    };

    SummaryKpis {
        total,
        paid: counts.paid,
        pending: counts.pending,
        overdue: counts.overdue,
        total_value,
        average_invoice,
        conversion_rate: percentage_rounded(counts.paid, total),
    }
}

/// `round(part / whole * 100)` with halves rounded up; 0 when `whole` is 0.
fn percentage_rounded(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    ((part * 200 + whole) / (whole * 2)) as u32
}
