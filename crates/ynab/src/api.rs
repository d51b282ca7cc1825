//! Request and response bodies of the YNAB v1 API, limited to the fields the
//! gateway reads or writes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detail: String,
}

impl ErrorDetail {
    pub(crate) fn message(&self) -> String {
        match (self.name.is_empty(), self.detail.is_empty()) {
            (false, false) => format!("{}: {}", self.name, self.detail),
            (false, true) => self.name.clone(),
            _ => self.detail.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoriesData {
    pub category_groups: Vec<CategoryGroup>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CategoryGroup {
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub categories: Vec<Category>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PayeesData {
    pub payees: Vec<Payee>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Payee {
    pub name: String,
    pub transfer_account_id: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountsData {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveTransactionWrapper {
    pub transaction: SaveTransaction,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveTransaction {
    pub account_id: String,
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub amount: i64,
    pub payee_name: String,
    /// Must be empty on split transactions.
    pub category_id: Option<String>,
    pub memo: String,
    pub cleared: &'static str,
    pub approved: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtransactions: Vec<SaveSubTransaction>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveSubTransaction {
    pub amount: i64,
    pub category_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveTransactionsData {
    #[serde(default)]
    pub transaction_ids: Vec<String>,
    pub transaction: Option<TransactionId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionId {
    pub id: String,
}
