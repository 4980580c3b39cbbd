use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client,
};
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::database::{FieldValue, Record, RecordStore, TableSpec, FINANCIAL_REPORTS};
use crate::error::{PipelineError, Result};
use crate::models::StoreCredentials;

/// Supabase (PostgREST) table client
pub struct SupabaseClient {
    client: Client,
    rest_base: Url,
}

impl SupabaseClient {
    /// Create a new client for the project at `credentials.url`
    pub fn new(credentials: &StoreCredentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&credentials.api_key)
            .map_err(|e| PipelineError::Config(format!("invalid SUPABASE_KEY: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))
            .map_err(|e| PipelineError::Config(format!("invalid SUPABASE_KEY: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert("Authorization", bearer);

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("fin-risk-loader/0.1")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            rest_base: rest_base(&credentials.url)?,
        })
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        Ok(self.rest_base.join(table)?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(PipelineError::Store {
            status: status.as_u16(),
            message,
        })
    }
}

/// `<project>/rest/v1/` with a trailing slash so table names join beneath it
fn rest_base(project_url: &str) -> Result<Url> {
    let trimmed = project_url.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{}/rest/v1/", trimmed)).map_err(|e| {
        PipelineError::Config(format!("invalid SUPABASE_URL '{}': {}", project_url, e))
    })?;
    Ok(url)
}

fn record_from_json(object: Map<String, Value>) -> Record {
    object
        .into_iter()
        .map(|(k, v)| {
            let value = FieldValue::from_json(&v);
            (k, value)
        })
        .collect()
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn upsert(&self, table: &TableSpec, rows: &[Record]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut url = self.table_url(table.name)?;
        url.query_pairs_mut()
            .append_pair("on_conflict", &table.key.join(","));

        debug!("Upserting {} rows to {}", rows.len(), url);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn latest_report(&self, stock_code: &str) -> Result<Option<Record>> {
        let mut url = self.table_url(FINANCIAL_REPORTS.name)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("stock_code", &format!("eq.{}", stock_code))
            .append_pair("order", "period.desc")
            .append_pair("limit", "1");

        debug!("Fetching latest report: {}", url);
        let response = self.client.get(url).send().await?;
        let response = Self::check(response).await?;

        let rows: Vec<Map<String, Value>> = response.json().await?;
        Ok(rows.into_iter().next().map(record_from_json))
    }
}
