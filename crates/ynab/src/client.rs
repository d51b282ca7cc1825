use async_trait::async_trait;
use engine::{BudgetError, BudgetGateway, NewTransaction};
use reqwest::{Client, header};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Milliunits,
    api::{
        Account, AccountsData, CategoriesData, Category, Envelope, ErrorBody, PayeesData,
        SaveSubTransaction, SaveTransaction, SaveTransactionWrapper, SaveTransactionsData,
    },
    splits,
};

const DEFAULT_BASE_URL: &str = "https://api.ynab.com/v1";
const MAX_PAYEE_LEN: usize = 50;
const MAX_MEMO_LEN: usize = 200;

fn request_error(err: reqwest::Error) -> BudgetError {
    BudgetError::Request(Box::new(err))
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Budget gateway talking to the YNAB API for one budget.
#[derive(Clone, Debug)]
pub struct YnabClient {
    client: Client,
    base_url: String,
    budget_id: String,
    category_groups: Vec<String>,
}

impl YnabClient {
    pub fn new(
        api_key: &str,
        budget_id: &str,
        base_url: &str,
        category_groups: Vec<String>,
    ) -> Result<Self, String> {
        let mut auth = header::HeaderValue::try_from(format!("Bearer {api_key}"))
            .map_err(|err| format!("invalid auth header value: {err}"))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            budget_id: budget_id.to_string(),
            category_groups,
        })
    }

    pub fn builder() -> YnabClientBuilder {
        YnabClientBuilder::default()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/budgets/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.budget_id,
            path.trim_start_matches('/')
        )
    }

    async fn error_from(resp: reqwest::Response) -> BudgetError {
        let status = resp.status().as_u16();
        let message = match resp.json::<ErrorBody>().await {
            Ok(body) => body.error.message(),
            Err(_) => "budget service error".to_string(),
        };
        BudgetError::Api { status, message }
    }

    async fn get_json<TResp: DeserializeOwned>(&self, path: &str) -> Result<TResp, BudgetError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(request_error)?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }

        let envelope = resp
            .json::<Envelope<TResp>>()
            .await
            .map_err(request_error)?;
        Ok(envelope.data)
    }

    async fn post_json<TReq: Serialize + ?Sized, TResp: DeserializeOwned>(
        &self,
        path: &str,
        body: &TReq,
    ) -> Result<TResp, BudgetError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp).await);
        }

        let envelope = resp
            .json::<Envelope<TResp>>()
            .await
            .map_err(request_error)?;
        Ok(envelope.data)
    }

    /// Visible categories of the configured groups, in server order.
    async fn categories(&self) -> Result<Vec<Category>, BudgetError> {
        let data: CategoriesData = self.get_json("categories").await?;
        let categories = data
            .category_groups
            .into_iter()
            .filter(|group| !group.hidden && !group.deleted)
            .filter(|group| {
                self.category_groups.is_empty()
                    || self.category_groups.iter().any(|name| *name == group.name)
            })
            .flat_map(|group| group.categories)
            .filter(|category| !category.hidden && !category.deleted)
            .collect();
        Ok(categories)
    }

    /// Matches `account` against account ids first, then names.
    async fn account_id(&self, account: &str) -> Result<String, BudgetError> {
        let data: AccountsData = self.get_json("accounts").await?;
        let open: Vec<Account> = data
            .accounts
            .into_iter()
            .filter(|a| !a.closed && !a.deleted)
            .collect();

        open.iter()
            .find(|a| a.id == account)
            .or_else(|| open.iter().find(|a| a.name.eq_ignore_ascii_case(account)))
            .map(|a| a.id.clone())
            .ok_or_else(|| BudgetError::UnknownAccount(account.to_string()))
    }
}

/// Maps a transaction onto the YNAB payload. Receipt amounts become outflows.
pub(crate) fn save_transaction(
    transaction: &NewTransaction,
    account_id: String,
    categories: &[Category],
) -> Result<SaveTransaction, BudgetError> {
    let category_id = |name: &str| {
        categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id.clone())
            .ok_or_else(|| BudgetError::UnknownCategory(name.to_string()))
    };

    let invalid_amount = || {
        BudgetError::InvalidAmount(format!(
            "{} does not fit in milliunits",
            transaction.amount
        ))
    };
    let amount = Milliunits::from_amount(transaction.amount)
        .and_then(Milliunits::checked_neg)
        .ok_or_else(invalid_amount)?;

    let groups = match transaction.splits.as_deref() {
        Some(lines) => splits::allocate(transaction.amount, lines, transaction.taxes)
            .ok_or_else(|| {
                BudgetError::InvalidAmount("line item amounts do not fit in milliunits".to_string())
            })?,
        None => Vec::new(),
    };

    let (category_id, subtransactions) = match groups.as_slice() {
        [] => (Some(category_id(&transaction.category)?), Vec::new()),
        [single] => (Some(category_id(&single.category)?), Vec::new()),
        _ => {
            let subtransactions = groups
                .iter()
                .map(|group| {
                    Ok(SaveSubTransaction {
                        amount: group
                            .amount
                            .checked_neg()
                            .ok_or_else(invalid_amount)?
                            .milliunits(),
                        category_id: category_id(&group.category)?,
                    })
                })
                .collect::<Result<Vec<_>, BudgetError>>()?;
            (None, subtransactions)
        }
    };

    Ok(SaveTransaction {
        account_id,
        date: transaction.date.format("%Y-%m-%d").to_string(),
        amount: amount.milliunits(),
        payee_name: truncate(&transaction.payee, MAX_PAYEE_LEN),
        category_id,
        memo: truncate(&transaction.memo, MAX_MEMO_LEN),
        cleared: "uncleared",
        approved: false,
        subtransactions,
    })
}

#[async_trait]
impl BudgetGateway for YnabClient {
    async fn get_all_categories(&self) -> Result<Vec<String>, BudgetError> {
        let names = self
            .categories()
            .await?
            .into_iter()
            .map(|category| category.name)
            .collect();
        Ok(names)
    }

    async fn get_all_payees(&self) -> Result<Vec<String>, BudgetError> {
        let data: PayeesData = self.get_json("payees").await?;
        let names = data
            .payees
            .into_iter()
            .filter(|payee| !payee.deleted && payee.transfer_account_id.is_none())
            .map(|payee| payee.name)
            .collect();
        Ok(names)
    }

    async fn create_transaction(&self, transaction: &NewTransaction) -> Result<String, BudgetError> {
        tracing::debug!(
            account = %transaction.account,
            payee = %transaction.payee,
            amount = transaction.amount,
            "creating transaction"
        );
        let account_id = self.account_id(&transaction.account).await?;
        let categories = self.categories().await?;
        let payload = SaveTransactionWrapper {
            transaction: save_transaction(transaction, account_id, &categories)?,
        };

        let data: SaveTransactionsData = self.post_json("transactions", &payload).await?;
        data.transaction
            .map(|tx| tx.id)
            .or_else(|| data.transaction_ids.into_iter().next())
            .ok_or_else(|| BudgetError::Api {
                status: 201,
                message: "response did not include a transaction id".to_string(),
            })
    }
}

#[derive(Default, Debug)]
pub struct YnabClientBuilder {
    api_key: String,
    budget_id: String,
    base_url: Option<String>,
    category_groups: Vec<String>,
}

impl YnabClientBuilder {
    pub fn api_key(mut self, api_key: &str) -> YnabClientBuilder {
        self.api_key = api_key.to_string();
        self
    }

    pub fn budget_id(mut self, budget_id: &str) -> YnabClientBuilder {
        self.budget_id = budget_id.to_string();
        self
    }

    /// Restrict categories to these groups. Empty means every group.
    pub fn category_groups(mut self, groups: Vec<String>) -> YnabClientBuilder {
        self.category_groups = groups;
        self
    }

    pub fn base_url(mut self, base_url: Option<&str>) -> YnabClientBuilder {
        self.base_url = base_url.map(str::to_string);
        self
    }

    pub fn build(self) -> Result<YnabClient, String> {
        tracing::info!("Initializing ynab client...");
        if self.budget_id.is_empty() {
            return Err("ynab budget id is required".to_string());
        }
        YnabClient::new(
            &self.api_key,
            &self.budget_id,
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            self.category_groups,
        )
    }
}
