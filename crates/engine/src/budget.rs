//! Contract of the budgeting service.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{BudgetError, Receipt};

/// One portion of a split transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitLine {
    pub category: String,
    pub amount: f64,
}

/// Transaction to record in the budget.
///
/// Amounts are positive spend figures as printed on the receipt; the gateway
/// decides how the budget represents outflows.
#[derive(Clone, Debug, PartialEq)]
pub struct NewTransaction {
    pub account: String,
    pub payee: String,
    pub category: String,
    pub date: NaiveDate,
    pub memo: String,
    pub amount: f64,
    pub splits: Option<Vec<SplitLine>>,
    pub taxes: Option<f64>,
}

impl NewTransaction {
    /// Builds the transaction for `receipt`, one split per line item.
    pub fn from_receipt(account: &str, receipt: &Receipt) -> Self {
        let splits = (!receipt.line_items.is_empty()).then(|| {
            receipt
                .line_items
                .iter()
                .map(|item| SplitLine {
                    category: item.category.clone(),
                    amount: item.line_item_total_amount,
                })
                .collect()
        });

        Self {
            account: account.to_string(),
            payee: receipt.merchant.clone(),
            category: receipt.category.clone(),
            date: receipt.transaction_date,
            memo: receipt.memo.clone(),
            amount: receipt.total_amount,
            splits,
            taxes: receipt.total_taxes,
        }
    }
}

#[async_trait]
pub trait BudgetGateway: Send + Sync {
    async fn get_all_categories(&self) -> Result<Vec<String>, BudgetError>;

    async fn get_all_payees(&self) -> Result<Vec<String>, BudgetError>;

    /// Records the transaction and returns its identifier.
    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<String, BudgetError>;
}
