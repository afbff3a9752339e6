use google_sheets4::api::{AppendValuesResponse, UpdateValuesResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single cell as returned by (or sent to) the values API.
pub type CellValue = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueRenderOption {
    FormattedValue,
    UnformattedValue,
    Formula,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateTimeRenderOption {
    SerialNumber,
    FormattedString,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MajorDimension {
    Rows,
    Columns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    Raw,
    #[default]
    UserEntered,
}

/// Query options for `values.get` and `values.batchGet`.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub value_render_option: Option<ValueRenderOption>,
    pub date_time_render_option: Option<DateTimeRenderOption>,
    pub major_dimension: Option<MajorDimension>,
}

impl ReadOptions {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(option) = self.value_render_option {
            pairs.push(("valueRenderOption", enum_str(&option)));
        }
        if let Some(option) = self.date_time_render_option {
            pairs.push(("dateTimeRenderOption", enum_str(&option)));
        }
        if let Some(dimension) = self.major_dimension {
            pairs.push(("majorDimension", enum_str(&dimension)));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    pub value_input_option: ValueInputOption,
}

impl WriteOptions {
    pub(crate) fn value_input_option(&self) -> String {
        enum_str(&self.value_input_option)
    }
}

fn enum_str<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        _ => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeValues {
    pub range: String,
    pub values: Vec<Vec<CellValue>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub updated_range: Option<String>,
    pub updated_rows: i32,
    pub updated_columns: i32,
    pub updated_cells: i32,
}

impl From<UpdateValuesResponse> for UpdateResult {
    fn from(response: UpdateValuesResponse) -> Self {
        UpdateResult {
            updated_range: response.updated_range,
            updated_rows: response.updated_rows.unwrap_or_default(),
            updated_columns: response.updated_columns.unwrap_or_default(),
            updated_cells: response.updated_cells.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendResult {
    /// Range of the table the row was appended after
    pub table_range: Option<String>,
    pub updates: UpdateResult,
}

impl From<AppendValuesResponse> for AppendResult {
    fn from(response: AppendValuesResponse) -> Self {
        AppendResult {
            table_range: response.table_range,
            updates: response.updates.map(Into::into).unwrap_or_default(),
        }
    }
}

/// Liveness report; never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub connected: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request body for append and update.
#[derive(Debug, Serialize)]
pub(crate) struct ValuesBody {
    pub(crate) values: Vec<Vec<String>>,
}

impl ValuesBody {
    pub(crate) fn single_row(row: &[CellValue]) -> Self {
        ValuesBody {
            values: vec![row.iter().map(cell_to_string).collect()],
        }
    }
}

/// The values API is string-oriented: null becomes "" and everything else
/// its plain string form.
pub fn cell_to_string(cell: &CellValue) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 1-based column number to A1 letters: 1 -> "A", 26 -> "Z", 27 -> "AA".
pub fn column_letter(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// `Sheet!A<row>:<last column><row>` for a row of `width` cells.
pub fn row_range(sheet_name: &str, row_index: u32, width: usize) -> String {
    format!(
        "{}!A{}:{}{}",
        sheet_name,
        row_index,
        column_letter(width),
        row_index
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(7), "G");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(53), "BA");
        assert_eq!(column_letter(702), "ZZ");
        assert_eq!(column_letter(703), "AAA");
        assert_eq!(column_letter(0), "");
    }

    #[test]
    fn test_row_range() {
        assert_eq!(row_range("EVENTS", 5, 1), "EVENTS!A5:A5");
        assert_eq!(row_range("EVENTS", 2, 27), "EVENTS!A2:AA2");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Value::Null), "");
        assert_eq!(cell_to_string(&json!(42)), "42");
        assert_eq!(cell_to_string(&json!(1.5)), "1.5");
        assert_eq!(cell_to_string(&json!(true)), "true");
        assert_eq!(cell_to_string(&json!("plain")), "plain");
    }

    #[test]
    fn test_values_body_coerces_row() {
        let body = ValuesBody::single_row(&[json!(null), json!(7), json!("x")]);
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"values": [["", "7", "x"]]})
        );
    }

    #[test]
    fn test_read_options_query_pairs() {
        let options = ReadOptions {
            value_render_option: Some(ValueRenderOption::UnformattedValue),
            date_time_render_option: Some(DateTimeRenderOption::FormattedString),
            major_dimension: None,
        };
        assert_eq!(
            options.query_pairs(),
            vec![
                ("valueRenderOption", "UNFORMATTED_VALUE".to_string()),
                ("dateTimeRenderOption", "FORMATTED_STRING".to_string()),
            ]
        );
        assert!(ReadOptions::default().query_pairs().is_empty());
    }

    #[test]
    fn test_default_value_input_option() {
        assert_eq!(WriteOptions::default().value_input_option(), "USER_ENTERED");
    }

    #[test]
    fn test_append_result_from_response() {
        let response: AppendValuesResponse = serde_json::from_value(json!({
            "spreadsheetId": "sheet123",
            "tableRange": "EVENTS!A1:G10",
            "updates": {
                "spreadsheetId": "sheet123",
                "updatedRange": "EVENTS!A11:G11",
                "updatedRows": 1,
                "updatedColumns": 7,
                "updatedCells": 7
            }
        }))
        .unwrap();

        let result = AppendResult::from(response);

        assert_eq!(result.table_range.as_deref(), Some("EVENTS!A1:G10"));
        assert_eq!(result.updates.updated_range.as_deref(), Some("EVENTS!A11:G11"));
        assert_eq!(result.updates.updated_cells, 7);
    }

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus {
            connected: true,
            latency_ms: 12,
            error: None,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"connected": true, "latencyMs": 12})
        );
    }
}
