use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::client::is_valid_email;
use super::lenient;

/// Invoice status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 3] = [
        InvoiceStatus::Paid,
        InvoiceStatus::Pending,
        InvoiceStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown invoice status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A billed line on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub description: String,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub quantity: Decimal,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub price: Decimal,
}

impl LineItem {
    /// `quantity × price`, saturating at the largest representable amount.
    pub fn amount(&self) -> Decimal {
        self.quantity.saturating_mul(self.price)
    }

    pub fn checked_amount(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.price)
    }
}

/// Invoice record as stored in the `invoices` document collection.
///
/// Stored documents are not schema-checked: `status` is kept as the raw
/// string (see [`Invoice::status_kind`]), money fields read as zero when
/// missing or non-numeric, and dates are kept as raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct Invoice {
    /// Human-readable identifier, `INV-YYYYMMDD-NNN`
    pub id: String,

    #[serde(default)]
    pub owner_id: String,

    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub client_id: String,

    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub client_name: String,

    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub client_email: String,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text_opt")]
    pub client_address: Option<String>,

    #[serde(default)]
    pub items: Vec<LineItem>,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub subtotal: Decimal,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub tax: Decimal,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub tax_percentage: Decimal,

    #[serde(default, deserialize_with = "lenient::decimal_or_zero")]
    pub total: Decimal,

    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::text_opt")]
    pub notes: Option<String>,

    #[serde(default, deserialize_with = "lenient::text_opt")]
    pub invoice_date: Option<String>,

    #[serde(default, deserialize_with = "lenient::text_opt")]
    pub due_date: Option<String>,

    #[serde(default, deserialize_with = "lenient::text_opt")]
    pub created_at: Option<String>,
}

impl Serialize for Invoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Invoice::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Invoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut doc = Map::<String, Value>::deserialize(deserializer)?;
        lenient::adopt_legacy_key(&mut doc, "user_id", "owner_id");
        Invoice::deserialize(Value::Object(doc)).map_err(de::Error::custom)
    }
}

impl Invoice {
    /// Builds a new invoice from validated input.
    ///
    /// Totals are computed from the items, status is forced to pending and
    /// `created_at` is set to `now`. `invoice_date` defaults to the day of
    /// `now` and `due_date` to fourteen days after the invoice date.
    pub fn build(id: String, owner_id: &str, new: NewInvoice, now: DateTime<Utc>) -> Self {
        let totals = InvoiceTotals::compute(&new.items, new.tax_percentage);
        let invoice_date = new.invoice_date.unwrap_or_else(|| now.date_naive());
        let due_date = new
            .due_date
            .unwrap_or_else(|| invoice_date + Duration::days(DEFAULT_PAYMENT_TERM_DAYS));

        Invoice {
            id,
            owner_id: owner_id.to_string(),
            client_id: new.client_id.unwrap_or_default(),
            client_name: new.client_name.trim().to_string(),
            client_email: new.client_email.trim().to_string(),
            client_address: new
                .client_address
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            items: new.items,
            subtotal: totals.subtotal,
            tax: totals.tax,
            tax_percentage: new.tax_percentage,
            total: totals.total,
            status: InvoiceStatus::Pending.to_string(),
            notes: new.notes.filter(|n| !n.trim().is_empty()),
            invoice_date: date_to_timestamp(invoice_date),
            due_date: date_to_timestamp(due_date),
            created_at: Some(lenient::format_timestamp(now)),
        }
    }

    /// The status if it is one of the known values.
    pub fn status_kind(&self) -> Option<InvoiceStatus> {
        self.status.parse().ok()
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(lenient::parse_timestamp)
    }

    /// Calendar day the invoice is dated on.
    pub fn invoice_day(&self) -> Option<NaiveDate> {
        self.invoice_date
            .as_deref()
            .and_then(lenient::parse_timestamp)
            .map(|dt| dt.date_naive())
    }
}

const DEFAULT_PAYMENT_TERM_DAYS: i64 = 14;

fn date_to_timestamp(date: NaiveDate) -> Option<String> {
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| lenient::format_timestamp(midnight.and_utc()))
}

/// Subtotal, tax and total derived from line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Totals for `items`; amounts beyond the `Decimal` range saturate.
    pub fn compute(items: &[LineItem], tax_percentage: Decimal) -> Self {
        Self::checked(items, tax_percentage).unwrap_or_else(|| {
            let subtotal = items
                .iter()
                .fold(Decimal::ZERO, |sum, item| sum.saturating_add(item.amount()));
            let tax = subtotal.saturating_mul(tax_percentage) / Decimal::ONE_HUNDRED;
            InvoiceTotals {
                subtotal,
                tax,
                total: subtotal.saturating_add(tax),
            }
        })
    }

    /// Totals for `items`, or `None` when any step overflows.
    pub fn checked(items: &[LineItem], tax_percentage: Decimal) -> Option<Self> {
        let subtotal = items.iter().try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.checked_amount()?)
        })?;
        let tax = subtotal
            .checked_mul(tax_percentage)?
            .checked_div(Decimal::ONE_HUNDRED)?;
        Some(InvoiceTotals {
            subtotal,
            tax,
            total: subtotal.checked_add(tax)?,
        })
    }
}

/// Invoice creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInvoice {
    #[serde(default)]
    pub client_id: Option<String>,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tax_percentage: Decimal,
}

impl NewInvoice {
    /// Checks the form rules; returns every violated rule.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.client_name.trim().chars().count() < 2 {
            errors.push("client_name must be at least 2 characters".to_string());
        }
        if !is_valid_email(&self.client_email) {
            errors.push(format!("invalid client_email: {:?}", self.client_email));
        }
        if self.items.is_empty() {
            errors.push("at least one item is required".to_string());
        }
        for (i, item) in self.items.iter().enumerate() {
            if item.description.trim().is_empty() {
                errors.push(format!("items[{}].description must not be empty", i));
            }
            if item.quantity < Decimal::ONE {
                errors.push(format!("items[{}].quantity must be at least 1", i));
            }
            if item.price < Decimal::ZERO {
                errors.push(format!("items[{}].price must not be negative", i));
            }
        }
        if self.tax_percentage < Decimal::ZERO || self.tax_percentage > Decimal::ONE_HUNDRED {
            errors.push("tax_percentage must be between 0 and 100".to_string());
        }
        if InvoiceTotals::checked(&self.items, self.tax_percentage).is_none() {
            errors.push("invoice total exceeds the supported amount".to_string());
        }
        if let (Some(issued), Some(due)) = (self.invoice_date, self.due_date) {
            if due < issued {
                errors.push("due_date must not be before invoice_date".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Formats an invoice identifier: `INV-YYYYMMDD-NNN`.
pub fn invoice_number(date: NaiveDate, sequence: u32) -> String {
    format!("INV-{}-{:03}", date.format("%Y%m%d"), sequence)
}

/// Next 1-based sequence for `date`, counted from the invoices already
/// dated that day.
pub fn sequence_from_existing(invoices: &[Invoice], date: NaiveDate) -> u32 {
    let dated_that_day = invoices
        .iter()
        .filter(|invoice| invoice.invoice_day() == Some(date))
        .count();
    u32::try_from(dated_that_day).unwrap_or(u32::MAX - 1) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn item(description: &str, quantity: Decimal, price: Decimal) -> LineItem {
        LineItem {
            description: description.to_string(),
            quantity,
            price,
        }
    }

    fn new_invoice() -> NewInvoice {
        NewInvoice {
            client_id: Some("c1".into()),
            client_name: "PT Maju Bersama".into(),
            client_email: "finance@maju.co.id".into(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            items: vec![
                item("Design", dec!(2), dec!(150000)),
                item("Hosting", dec!(1), dec!(49999.99)),
            ],
            tax_percentage: dec!(11),
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_invariants_hold_exactly() {
        let totals = InvoiceTotals::compute(&new_invoice().items, dec!(11));
        assert_eq!(totals.subtotal, dec!(349999.99));
        assert_eq!(totals.tax, dec!(38499.9989));
        assert_eq!(totals.total, totals.subtotal + totals.tax);
    }

    #[test]
    fn test_totals_without_tax() {
        let totals = InvoiceTotals::compute(&[item("x", dec!(3), dec!(10))], Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, dec!(30));
    }

    #[test]
    fn test_build_forces_pending_and_defaults_due_date() {
        let now = lenient::parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let invoice = Invoice::build("INV-20240501-001".into(), "owner-1", new_invoice(), now);

        assert_eq!(invoice.status_kind(), Some(InvoiceStatus::Pending));
        assert_eq!(invoice.invoice_date.as_deref(), Some("2024-05-01T00:00:00.000Z"));
        assert_eq!(invoice.due_date.as_deref(), Some("2024-05-15T00:00:00.000Z"));
        assert_eq!(invoice.created_at.as_deref(), Some("2024-05-01T10:00:00.000Z"));
        let item_sum: Decimal = invoice.items.iter().map(LineItem::amount).sum();
        assert_eq!(invoice.subtotal, item_sum);
        assert_eq!(invoice.total, invoice.subtotal + invoice.tax);
    }

    #[test]
    fn test_invoice_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(invoice_number(date, 2), "INV-20240501-002");
        assert_eq!(invoice_number(date, 1000), "INV-20240501-1000");
    }

    #[test]
    fn test_second_invoice_of_the_day_gets_sequence_two() {
        let now = lenient::parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        let first = Invoice::build("INV-20240501-001".into(), "owner-1", new_invoice(), now);
        let mut other_day = new_invoice();
        other_day.invoice_date = NaiveDate::from_ymd_opt(2024, 4, 30);
        let earlier = Invoice::build("INV-20240430-001".into(), "owner-1", other_day, now);

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let seq = sequence_from_existing(&[first, earlier], date);
        assert_eq!(invoice_number(date, seq), "INV-20240501-002");
    }

    #[test]
    fn test_validation_reports_every_rule() {
        assert!(new_invoice().validate().is_ok());

        let bad = NewInvoice {
            client_name: "X".into(),
            client_email: "nope".into(),
            items: vec![item("", dec!(0), dec!(-1))],
            tax_percentage: dec!(101),
            ..Default::default()
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.len(), 6);

        let empty = NewInvoice {
            items: vec![],
            ..new_invoice()
        };
        assert_eq!(empty.validate().unwrap_err(), vec!["at least one item is required"]);
    }

    #[test]
    fn test_oversized_amounts_fail_validation_instead_of_overflowing() {
        let huge = Decimal::from_scientific("1e20").unwrap();
        let mut invoice = new_invoice();
        invoice.items = vec![item("Everything", huge, huge)];

        let errors = invoice.validate().unwrap_err();
        assert_eq!(errors, vec!["invoice total exceeds the supported amount".to_string()]);
        assert_eq!(InvoiceTotals::checked(&invoice.items, dec!(0)), None);

        let totals = InvoiceTotals::compute(&invoice.items, dec!(11));
        assert_eq!(totals.subtotal, Decimal::MAX);
        assert_eq!(totals.total, Decimal::MAX);
    }

    #[test]
    fn test_tax_overflow_is_caught() {
        let mut invoice = new_invoice();
        invoice.items = vec![item("Nearly max", dec!(1), Decimal::MAX)];
        invoice.tax_percentage = dec!(50);
        assert!(invoice.validate().is_err());
    }

    #[test]
    fn test_status_parsing_is_exact() {
        assert_eq!("paid".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Paid));
        assert!("Paid".parse::<InvoiceStatus>().is_err());
        assert!("draft".parse::<InvoiceStatus>().is_err());
    }

    #[test]
    fn test_malformed_document_reads_with_defaults() {
        let invoice: Invoice = serde_json::from_value(json!({
            "id": "INV-20240101-001",
            "user_id": "owner-1",
            "client_id": "c1",
            "client_name": "Budi",
            "total": "not a number",
            "subtotal": "120.5",
            "status": "archived",
            "created_at": "garbage",
            "items": [{"description": "x", "quantity": "2", "price": null}]
        }))
        .unwrap();

        assert_eq!(invoice.owner_id, "owner-1");
        assert_eq!(invoice.total, Decimal::ZERO);
        assert_eq!(invoice.subtotal, dec!(120.5));
        assert_eq!(invoice.status_kind(), None);
        assert_eq!(invoice.created_at_utc(), None);
        assert_eq!(invoice.items[0].quantity, dec!(2));
        assert_eq!(invoice.items[0].price, Decimal::ZERO);
        assert_eq!(invoice.invoice_date, None);
    }

    #[test]
    fn test_document_with_both_owner_spellings_is_readable() {
        let invoice: Invoice = serde_json::from_value(json!({
            "id": "INV-20240101-002",
            "owner_id": "owner-1",
            "user_id": "owner-1",
            "total": 10
        }))
        .unwrap();
        assert_eq!(invoice.owner_id, "owner-1");
        assert!(serde_json::to_value(&invoice).unwrap().get("user_id").is_none());
    }
}
