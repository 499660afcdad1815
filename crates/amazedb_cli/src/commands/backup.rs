//! Export and import commands.

use amazedb_core::{read_export_info, Config, Database};
use std::path::Path;
use tracing::info;

/// Writes an export package and prints the key needed to import it.
pub fn export(
    root: &Path,
    database: &str,
    config: Config,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Exporting {database} to {:?}", output);

    let db = Database::open(root, database, config.safe_mode(false))?;
    let receipt = db.export(output)?;

    println!("✓ Export created successfully");
    println!("  Path: {}", receipt.path.display());
    println!("  Tables: {}", receipt.tables);
    println!("  Key: {}", receipt.key);
    println!("  Keep the key: the package cannot be opened without it.");
    Ok(())
}

/// Replaces a database's contents with an export package.
pub fn import(
    root: &Path,
    database: &str,
    config: Config,
    input: &Path,
    key: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Importing {:?} into {database}", input);

    let db = Database::open(root, database, config)?;
    let stats = db.import_data(input, key)?;

    println!("✓ Import completed");
    println!("  Tables imported: {}", stats.tables_imported);
    println!("  Tables removed: {}", stats.tables_removed);
    println!("  Documents: {}", stats.documents);
    Ok(())
}

/// Shows an export package's contents without importing it.
pub fn info(input: &Path, key: &str) -> Result<(), Box<dyn std::error::Error>> {
    let info = read_export_info(input, key)?;

    println!("Export Information");
    println!("==================");
    println!("  Database: {}", info.name);
    println!("  File size: {} bytes", info.size);
    println!("  Created: {}", format_timestamp(info.created_at));
    println!("  Tables: {}", info.tables.join(", "));
    Ok(())
}

fn format_timestamp(ms: u64) -> String {
    if ms == 0 {
        return "unknown".to_string();
    }
    let secs = ms / 1000;
    let days = secs / 86_400;
    let hours = (secs / 3600) % 24;
    let mins = (secs / 60) % 60;
    format!("{days} days, {hours:02}:{mins:02}:{:02} since epoch", secs % 60)
}
