//! AmazeDB CLI
//!
//! Command-line tools for AmazeDB databases.
//!
//! # Commands
//!
//! - `create` / `drop` - Create or delete a database
//! - `tables` - List a database's tables
//! - `get` - Query a table with a JSON filter
//! - `export` / `import` / `export-info` - Backup packages
//! - `query` - Run interpreter statements from a script or stdin

mod commands;
mod interpreter;
mod session;

use amazedb_core::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// AmazeDB command-line database tools.
#[derive(Parser)]
#[command(name = "amazedb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Storage root holding the `db/` directory
    #[arg(global = true, short, long, default_value = ".")]
    root: PathBuf,

    /// Report missing or existing databases and tables as errors instead of
    /// creating or reusing them
    #[arg(global = true, long)]
    strict: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a database
    Create {
        /// Database name
        name: String,
    },

    /// Delete a database and all its tables
    Drop {
        /// Database name
        name: String,
    },

    /// List the tables of a database
    Tables {
        /// Database name
        database: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print documents matching a filter, one JSON object per line
    Get {
        /// Database name
        database: String,

        /// Table name
        table: String,

        /// Filter as JSON, e.g. '{"age": {"__gte": 18}}'
        #[arg(short, long, default_value = "{}")]
        filter: String,

        /// Field to sort by
        #[arg(short, long)]
        sort: Option<String>,

        /// Print only the first match
        #[arg(long)]
        one: bool,
    },

    /// Write an encrypted export package
    Export {
        /// Database name
        database: String,

        /// Directory to write `<database>.amazedb` into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Replace a database's tables with an export package
    Import {
        /// Database name
        database: String,

        /// Export package path
        input: PathBuf,

        /// Export key printed by `export`
        #[arg(short, long)]
        key: String,
    },

    /// Show what an export package contains
    ExportInfo {
        /// Export package path
        input: PathBuf,

        /// Export key printed by `export`
        #[arg(short, long)]
        key: String,
    },

    /// Run interpreter statements
    Query {
        /// Script file; reads stdin when omitted
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Database to select before the first statement
        #[arg(short, long)]
        database: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::default().safe_mode(!cli.strict);
    let root = cli.root.as_path();

    match cli.command {
        Commands::Create { name } => commands::database::create(root, &name, config)?,
        Commands::Drop { name } => commands::database::drop(root, &name, config)?,
        Commands::Tables { database, format } => {
            commands::database::tables(root, &database, config, &format)?;
        }
        Commands::Get {
            database,
            table,
            filter,
            sort,
            one,
        } => {
            let query = commands::get::Query {
                filter: &filter,
                sort: sort.as_deref(),
                one,
            };
            commands::get::run(root, &database, &table, config, &query)?;
        }
        Commands::Export { database, output } => {
            commands::backup::export(root, &database, config, &output)?;
        }
        Commands::Import {
            database,
            input,
            key,
        } => commands::backup::import(root, &database, config, &input, &key)?,
        Commands::ExportInfo { input, key } => commands::backup::info(&input, &key)?,
        Commands::Query { script, database } => {
            commands::query::run(root, config, script.as_deref(), database.as_deref())?;
        }
        Commands::Version => {
            println!("AmazeDB CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("AmazeDB Core v{}", amazedb_core::VERSION);
        }
    }

    Ok(())
}
