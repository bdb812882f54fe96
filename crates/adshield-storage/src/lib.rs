//! Relational store for adshield.
//!
//! All tenant state lives here: companies and their notification
//! preferences, brands and ad-account attachments, digest recipients, the
//! run ledger (the per-day idempotency guard), and the notification audit
//! log. Backed by SeaORM over SQLite; the schema is owned by the
//! `migration` crate and applied on connect.

pub mod entities;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::brand::{AdAccountRow, BrandRow};
pub use store::company::{CompanyFilter, CompanyRow, CompanyUpdate};
pub use store::notification::{NotificationLogFilter, NotificationLogRow};
pub use store::run::{RunFilter, RunRow};
pub use store::user::UserRow;
pub use store::Store;
