use serde_json::Value;
use sheets_edge_client::error::Result;
use sheets_edge_client::sheets::{CellValue, ReadOptions, SheetOperations, WriteOptions};
use tracing::info;

/// Valid JSON is taken as-is (so `null` clears a cell); anything else is text.
pub fn parse_cell(arg: &str) -> CellValue {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
}

fn parse_cells(args: &[String]) -> Vec<CellValue> {
    args.iter().map(|arg| parse_cell(arg)).collect()
}

pub async fn get(
    client: &impl SheetOperations,
    sheet: &str,
    range: &str,
    options: &ReadOptions,
) -> Result<()> {
    let values = client.get_values(sheet, range, options).await?;
    println!("{}", serde_json::to_string_pretty(&values)?);
    Ok(())
}

pub async fn batch_get(
    client: &impl SheetOperations,
    ranges: &[String],
    options: &ReadOptions,
) -> Result<()> {
    let results = client.batch_get_ranges(ranges, options).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

pub async fn append(
    client: &impl SheetOperations,
    sheet: &str,
    cells: &[String],
    options: &WriteOptions,
) -> Result<()> {
    let result = client.append_row(sheet, &parse_cells(cells), options).await?;

    info!(
        sheet,
        updated_range = ?result.updates.updated_range,
        updated_cells = result.updates.updated_cells,
        "Row appended"
    );

    Ok(())
}

pub async fn update(
    client: &impl SheetOperations,
    sheet: &str,
    row: u32,
    cells: &[String],
    options: &WriteOptions,
) -> Result<()> {
    let result = client
        .update_row(sheet, row, &parse_cells(cells), options)
        .await?;

    info!(
        sheet,
        row,
        updated_range = ?result.updated_range,
        updated_cells = result.updated_cells,
        "Row updated"
    );

    Ok(())
}
