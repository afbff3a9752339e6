use anyhow::anyhow;
use sheets_edge_client::error::Result;
use sheets_edge_client::sheets::SheetOperations;

pub async fn execute(client: &impl SheetOperations) -> Result<()> {
    let status = client.health_check().await;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if !status.connected {
        return Err(anyhow!("Spreadsheet is not reachable").into());
    }

    Ok(())
}
