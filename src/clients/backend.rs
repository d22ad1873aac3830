use std::time::Duration;

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::error::AppError;

/// Filter predicate for a table read or write. Rendered into the query
/// string the hosted store understands (`column=op.value`).
#[derive(Debug, Clone)]
pub struct Filter {
    column: String,
    op: String,
    value: String,
}

impl Filter {
    pub fn eq(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            op: "eq".to_string(),
            value: value.to_string(),
        }
    }

    pub fn gte(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            op: "gte".to_string(),
            value: value.to_string(),
        }
    }

    pub fn lte(column: &str, value: &str) -> Self {
        Self {
            column: column.to_string(),
            op: "lte".to_string(),
            value: value.to_string(),
        }
    }

    pub fn any_of(column: &str, values: &[String]) -> Self {
        Self {
            column: column.to_string(),
            op: "in".to_string(),
            value: format!("({})", values.join(",")),
        }
    }

    fn to_query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.op, self.value))
    }
}

/// Table-level access to the hosted relational store. Every call is a single
/// HTTP round trip; only `select_with_retry` layers a fixed exponential
/// backoff on top, and only the notification feed uses it.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

impl BackendClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<Vec<T>, AppError> {
        let request = self
            .http
            .get(self.table_url(table))
            .query(&query_pairs(filters));
        let response = self.send(request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| AppError::Decode(format!("{} rows from {}: {}", table, self.base_url, e)))
    }

    /// `select` with the feed's fixed exponential backoff. Gives up after the
    /// last delay and returns the final error.
    pub async fn select_with_retry<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> Result<Vec<T>, AppError> {
        let mut attempt = 0;
        loop {
            match self.select(table, filters).await {
                Ok(rows) => return Ok(rows),
                Err(err) if err.is_retryable() && attempt < RETRY_DELAYS_MS.len() => {
                    let delay_ms = RETRY_DELAYS_MS[attempt];
                    attempt += 1;
                    warn!(
                        "select {} attempt {} failed, retrying in {}ms: {}",
                        table, attempt, delay_ms, err
                    );
                    sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<(), AppError> {
        let request = self.http.post(self.table_url(table)).json(row);
        self.send(request).await?;
        Ok(())
    }

    pub async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: &serde_json::Value,
    ) -> Result<(), AppError> {
        let request = self
            .http
            .patch(self.table_url(table))
            .query(&query_pairs(filters))
            .json(patch);
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), AppError> {
        let request = self
            .http
            .delete(self.table_url(table))
            .query(&query_pairs(filters));
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, AppError> {
        let response = request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

fn query_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_query_pair).collect()
}
