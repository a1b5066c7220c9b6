pub mod client;
pub mod invoice;
mod lenient;

pub use client::{slugify, Client, ClientPatch, NewClient};
pub use invoice::{
    invoice_number, sequence_from_existing, Invoice, InvoiceStatus, InvoiceTotals, LineItem,
    NewInvoice, UnknownStatus,
};
pub use lenient::{format_timestamp, parse_timestamp};
