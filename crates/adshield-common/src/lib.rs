//! Shared domain types for the adshield workspace.
//!
//! Everything that more than one crate needs lives here: the ordered
//! [`types::Severity`] scale, transient alert/digest records, snowflake id
//! generation, currency formatting, and company-local time helpers.

pub mod id;
pub mod money;
pub mod types;
pub mod tz;
