//! Filtered reads.

use amazedb_core::{Config, Database, Filters};
use std::path::Path;

/// Arguments of the `get` command.
#[derive(Debug)]
pub struct Query<'a> {
    /// Filter in the JSON operator syntax.
    pub filter: &'a str,
    /// Field to sort by.
    pub sort: Option<&'a str>,
    /// Stop at the first match.
    pub one: bool,
}

/// Prints matching documents, one JSON object per line.
pub fn run(
    root: &Path,
    database: &str,
    table: &str,
    config: Config,
    query: &Query<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter: serde_json::Value = serde_json::from_str(query.filter)?;
    let filters = Filters::from_json(&filter)?;

    let db = Database::open(root, database, config.safe_mode(false))?;
    let table = db.load_table(table)?;

    let documents: Vec<_> = if query.one {
        table.get_one(&filters, query.sort)?.into_iter().collect()
    } else {
        table.get(&filters, query.sort)?
    };

    for document in &documents {
        println!("{}", serde_json::to_string(document)?);
    }
    Ok(())
}
