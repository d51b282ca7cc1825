//! YNAB budget gateway.
//!
//! [`YnabClient`] implements [`engine::BudgetGateway`] on top of the YNAB v1
//! REST API: category and payee lookups feed the extraction prompt, and
//! receipts are recorded as (optionally split) outflow transactions.

pub use client::{YnabClient, YnabClientBuilder};
pub use money::Milliunits;
pub use splits::{CategoryAmount, allocate};

mod api;
mod client;
mod money;
mod splits;
