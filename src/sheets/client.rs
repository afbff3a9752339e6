use super::types::ValuesBody;
use super::{
    AppendResult, CellValue, HealthStatus, RangeValues, ReadOptions, Result, RetryExecutor,
    RetryPolicy, SheetOperations, SheetsError, UpdateResult, WriteOptions, classify_response,
    row_range,
};
use crate::auth::{TokenCache, TokenMinter, TokenStore};
use crate::config::Config;
use crate::error::AppError;
use async_trait::async_trait;
use google_sheets4::api::{
    AppendValuesResponse, BatchGetValuesResponse, Spreadsheet, UpdateValuesResponse, ValueRange,
};
use reqwest::RequestBuilder;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, instrument, warn};
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";
const INSERT_ROWS: &str = "INSERT_ROWS";
const HEALTH_CHECK_FIELDS: &str = "spreadsheetId,properties.title";

pub struct SheetsClient {
    http_client: reqwest::Client,
    tokens: TokenCache,
    executor: RetryExecutor,
    api_base_url: Url,
    spreadsheet_id: String,
    missing_config: Vec<&'static str>,
}

impl SheetsClient {
    /// Build a client from configuration.
    ///
    /// Missing credentials or spreadsheet id do not fail here; every
    /// operation reports them as `NOT_CONFIGURED` before touching the network.
    pub fn new(config: &Config) -> std::result::Result<Self, AppError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let api_base_url = Url::parse(&config.sheets.api_base_url)
            .map_err(|e| AppError::Config(format!("Invalid Sheets API URL: {}", e)))?;
        if api_base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "Sheets API URL cannot be a base: {}",
                api_base_url
            )));
        }

        let credentials = config.google.credentials();
        let mut missing_config = Vec::new();
        if credentials.client_email.trim().is_empty() {
            missing_config.push("client_email");
        }
        if credentials.private_key_pem.trim().is_empty() {
            missing_config.push("private_key");
        }
        if config.google.spreadsheet_id.trim().is_empty() {
            missing_config.push("spreadsheet_id");
        }

        let minter = TokenMinter::new(credentials, &config.auth.token_url, http_client.clone())
            .with_lifetime(config.auth.token_lifetime());
        let tokens = TokenCache::new(minter).with_expiry_buffer(config.auth.expiry_buffer());

        Ok(Self {
            http_client,
            tokens,
            executor: RetryExecutor::new(RetryPolicy::from(&config.retry)),
            api_base_url,
            spreadsheet_id: config.google.spreadsheet_id.trim().to_string(),
            missing_config,
        })
    }

    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.tokens = self.tokens.with_store(store);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.executor = RetryExecutor::new(policy);
        self
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    fn ensure_configured(&self, endpoint: &str) -> Result<()> {
        if self.missing_config.is_empty() {
            return Ok(());
        }
        Err(log_failure(
            endpoint,
            SheetsError::NotConfigured(self.missing_config.join(", ")),
        ))
    }

    /// `{base}/{spreadsheetId}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base_url.clone();
        // Checked in `new`: the base URL always has path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.spreadsheet_id).extend(segments);
        }
        url
    }

    fn authorized_get(&self, url: &Url, token: &str) -> RequestBuilder {
        self.http_client
            .get(url.clone())
            .bearer_auth(token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
    }

    async fn send<T, F>(&self, endpoint: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> RequestBuilder,
    {
        self.send_with(&self.executor, endpoint, build).await
    }

    async fn send_with<T, F>(&self, executor: &RetryExecutor, endpoint: &str, build: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> RequestBuilder,
    {
        let build = &build;
        let result = executor
            .execute(endpoint, move |_| self.attempt(build))
            .await;

        result.map_err(|e| log_failure(endpoint, e))
    }

    async fn attempt<T, F>(&self, build: &F) -> Result<T>
    where
        T: DeserializeOwned,
        F: Fn(&str) -> RequestBuilder,
    {
        let token = self.tokens.get_token().await?;

        let response = build(token.as_str())
            .send()
            .await
            .map_err(SheetsError::network)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            let error = classify_response(status.as_u16(), retry_after.as_deref(), &body);

            if matches!(error, SheetsError::Unauthorized { .. }) {
                debug!("Access token rejected, clearing token cache");
                self.tokens.clear().await;
            }
            return Err(error);
        }

        let body = response.text().await.map_err(SheetsError::network)?;
        serde_json::from_str(&body).map_err(|e| SheetsError::InvalidResponse(e.to_string()))
    }
}

fn log_failure(endpoint: &str, error: SheetsError) -> SheetsError {
    error!(
        code = %error.code(),
        http_status = ?error.http_status(),
        details = ?error.details(),
        endpoint,
        "Sheets API request failed"
    );
    error
}

#[async_trait]
impl SheetOperations for SheetsClient {
    #[instrument(name = "Reading values", skip(self, options))]
    async fn get_values(
        &self,
        sheet_name: &str,
        range: &str,
        options: &ReadOptions,
    ) -> Result<Vec<Vec<CellValue>>> {
        self.ensure_configured("values.get")?;

        let a1_range = format!("{}!{}", sheet_name, range);
        let url = self.url(&["values", a1_range.as_str()]);
        let query = options.query_pairs();

        let response: ValueRange = self
            .send("values.get", |token| {
                self.authorized_get(&url, token).query(&query)
            })
            .await?;

        let values = response.values.unwrap_or_default();
        debug!(rows = values.len(), "Read values");
        Ok(values)
    }

    #[instrument(name = "Reading ranges", skip(self, options))]
    async fn batch_get_ranges(
        &self,
        ranges: &[String],
        options: &ReadOptions,
    ) -> Result<Vec<RangeValues>> {
        self.ensure_configured("values.batchGet")?;

        if ranges.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.url(&["values:batchGet"]);
        let mut query = options.query_pairs();
        query.extend(ranges.iter().map(|range| ("ranges", range.clone())));

        let response: BatchGetValuesResponse = self
            .send("values.batchGet", |token| {
                self.authorized_get(&url, token).query(&query)
            })
            .await?;

        // The API answers in request order; fall back to the requested range
        // when a value range comes back without one.
        let mut returned = response.value_ranges.unwrap_or_default().into_iter();
        let results = ranges
            .iter()
            .map(|requested| {
                let value_range = returned.next().unwrap_or_default();
                RangeValues {
                    range: value_range.range.unwrap_or_else(|| requested.clone()),
                    values: value_range.values.unwrap_or_default(),
                }
            })
            .collect();

        Ok(results)
    }

    #[instrument(name = "Appending row", skip(self, row, options), fields(cells = row.len()))]
    async fn append_row(
        &self,
        sheet_name: &str,
        row: &[CellValue],
        options: &WriteOptions,
    ) -> Result<AppendResult> {
        self.ensure_configured("values.append")?;

        let append_range = format!("{}:append", sheet_name);
        let url = self.url(&["values", append_range.as_str()]);
        let query = [
            ("valueInputOption", options.value_input_option()),
            ("insertDataOption", INSERT_ROWS.to_string()),
        ];
        let body = ValuesBody::single_row(row);

        let response: AppendValuesResponse = self
            .send("values.append", |token| {
                self.http_client
                    .post(url.clone())
                    .bearer_auth(token)
                    .query(&query)
                    .json(&body)
            })
            .await?;

        let result = AppendResult::from(response);
        debug!(updated_range = ?result.updates.updated_range, "Appended row");
        Ok(result)
    }

    #[instrument(name = "Updating row", skip(self, row, options), fields(cells = row.len()))]
    async fn update_row(
        &self,
        sheet_name: &str,
        row_index: u32,
        row: &[CellValue],
        options: &WriteOptions,
    ) -> Result<UpdateResult> {
        self.ensure_configured("values.update")?;

        if row_index < 1 {
            return Err(log_failure(
                "values.update",
                SheetsError::InvalidRange {
                    status: None,
                    details: json!(format!("row index must be >= 1, got {}", row_index)),
                },
            ));
        }
        if row.is_empty() {
            return Err(log_failure(
                "values.update",
                SheetsError::InvalidRange {
                    status: None,
                    details: json!("row must contain at least one cell"),
                },
            ));
        }

        let range = row_range(sheet_name, row_index, row.len());
        let url = self.url(&["values", range.as_str()]);
        let query = [("valueInputOption", options.value_input_option())];
        let body = ValuesBody::single_row(row);

        let response: UpdateValuesResponse = self
            .send("values.update", |token| {
                self.http_client
                    .put(url.clone())
                    .bearer_auth(token)
                    .query(&query)
                    .json(&body)
            })
            .await?;

        let result = UpdateResult::from(response);
        debug!(range = %range, updated_cells = result.updated_cells, "Updated row");
        Ok(result)
    }

    #[instrument(name = "Checking Sheets health", skip(self))]
    async fn health_check(&self) -> HealthStatus {
        let started = Instant::now();

        let result: Result<Spreadsheet> = match self.ensure_configured("spreadsheets.get") {
            Ok(()) => {
                let url = self.url(&[]);
                let executor = RetryExecutor::new(RetryPolicy::no_retry());
                self.send_with(&executor, "spreadsheets.get", |token| {
                    self.authorized_get(&url, token)
                        .query(&[("fields", HEALTH_CHECK_FIELDS)])
                })
                .await
            }
            Err(e) => Err(e),
        };

        let latency_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthStatus {
                connected: true,
                latency_ms,
                error: None,
            },
            Err(e) => {
                warn!(code = %e.code(), latency_ms, "Sheets health check failed");
                HealthStatus {
                    connected: false,
                    latency_ms,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
