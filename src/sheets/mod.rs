mod client;
mod error;
mod retry;
mod types;

pub use client::SheetsClient;
pub use error::{SheetsError, classify_response, parse_retry_after};
pub use retry::{RetryExecutor, RetryPolicy};
pub use types::{
    AppendResult, CellValue, DateTimeRenderOption, HealthStatus, MajorDimension, RangeValues,
    ReadOptions, UpdateResult, ValueInputOption, ValueRenderOption, WriteOptions, cell_to_string,
    column_letter, row_range,
};

use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, SheetsError>;

#[async_trait]
pub trait SheetOperations {
    async fn get_values(
        &self,
        sheet_name: &str,
        range: &str,
        options: &ReadOptions,
    ) -> Result<Vec<Vec<CellValue>>>;

    async fn batch_get_ranges(
        &self,
        ranges: &[String],
        options: &ReadOptions,
    ) -> Result<Vec<RangeValues>>;

    async fn append_row(
        &self,
        sheet_name: &str,
        row: &[CellValue],
        options: &WriteOptions,
    ) -> Result<AppendResult>;

    async fn update_row(
        &self,
        sheet_name: &str,
        row_index: u32,
        row: &[CellValue],
        options: &WriteOptions,
    ) -> Result<UpdateResult>;

    async fn health_check(&self) -> HealthStatus;
}
