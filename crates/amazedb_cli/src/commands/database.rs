//! Database lifecycle commands.

use amazedb_core::{Config, Database};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// One row of `tables` output.
#[derive(Debug, Serialize)]
pub struct TableSummary {
    /// Table name.
    pub name: String,
    /// Number of documents.
    pub documents: usize,
    /// Size of the encrypted table file in bytes.
    pub size: u64,
}

/// Creates a database.
pub fn create(root: &Path, name: &str, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::create(root, name, config)?;
    println!("✓ Database ready");
    println!("  Name: {}", db.name());
    println!("  Path: {}", db.path().display());
    Ok(())
}

/// Deletes a database directory.
pub fn drop(root: &Path, name: &str, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Never create a database just to delete it.
    let db = Database::open(root, name, config.safe_mode(false))?;
    let path = db.path().to_path_buf();
    db.drop()?;

    info!("Dropped database at {:?}", path);
    println!("✓ Database {name} dropped");
    Ok(())
}

/// Lists tables with document counts.
pub fn tables(
    root: &Path,
    name: &str,
    config: Config,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open(root, name, config)?;

    let mut summaries = Vec::new();
    for table_name in db.tables() {
        let table = db.load_table(&table_name)?;
        summaries.push(TableSummary {
            documents: table.count()?,
            size: std::fs::metadata(table.path())?.len(),
            name: table_name,
        });
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summaries)?),
        "text" => {
            println!("Database: {}", db.name());
            if summaries.is_empty() {
                println!("  (no tables)");
            }
            for summary in &summaries {
                println!(
                    "  {:<24} {:>8} docs {:>10} bytes",
                    summary.name, summary.documents, summary.size
                );
            }
        }
        other => return Err(format!("unknown format: {other} (expected text or json)").into()),
    }
    Ok(())
}
