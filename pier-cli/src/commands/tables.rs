use colored::Colorize;
use pier_data::Adapter;

use super::unknown_tables;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub rows: u64,
}

/// Every table of the database with its row count, sorted by name.
pub async fn list(adapter: &dyn Adapter) -> Result<Vec<TableInfo>, Box<dyn std::error::Error>> {
    let mut tables = Vec::new();
    for name in adapter.list_tables().await? {
        let sql = format!(
            "SELECT COUNT(*) AS row_count FROM {}",
            adapter.escape_identifier(&name)
        );
        let rows = adapter
            .execute_one(&sql)
            .await?
            .and_then(|row| row.get("row_count").and_then(|n| n.parse().ok()))
            .unwrap_or(0);
        tables.push(TableInfo { name, rows });
    }
    Ok(tables)
}

pub async fn run(adapter: &dyn Adapter) -> Result<(), Box<dyn std::error::Error>> {
    let tables = list(adapter).await?;
    if tables.is_empty() {
        println!("{}", "No tables found.".dimmed());
        return Ok(());
    }

    println!("{}", "Tables:".bold());
    println!();
    println!("  {:<40} {}", "NAME".dimmed(), "ROWS".dimmed());
    println!("  {}", "-".repeat(50).dimmed());
    for table in &tables {
        println!("  {:<40} {}", table.name.cyan(), table.rows);
    }
    println!();
    println!("  {} tables total", tables.len());
    Ok(())
}

/// Delete every row of `tables`. Fails before touching anything if one of
/// them does not exist.
pub async fn empty(
    adapter: &dyn Adapter,
    tables: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    check_exist(adapter, tables).await?;
    adapter.empty_tables(tables).await?;
    for table in tables {
        println!("  {} {}", "emptied".green(), table);
    }
    Ok(())
}

pub async fn drop(adapter: &dyn Adapter, tables: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    check_exist(adapter, tables).await?;
    adapter.drop_tables(tables).await?;
    for table in tables {
        println!("  {} {}", "dropped".red(), table);
    }
    Ok(())
}

async fn check_exist(
    adapter: &dyn Adapter,
    tables: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    if tables.is_empty() {
        return Err("No tables given".into());
    }
    let missing = unknown_tables(tables, &adapter.list_tables().await?);
    if !missing.is_empty() {
        return Err(format!("Unknown table(s): {}", missing.join(", ")).into());
    }
    Ok(())
}
