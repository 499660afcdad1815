//! Interpreter front end.

use crate::interpreter;
use crate::session::Session;
use amazedb_core::Config;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Runs statements from `script`, or stdin when `None`.
pub fn run(
    root: &Path,
    config: Config,
    script: Option<&Path>,
    database: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(root, config);
    if let Some(name) = database {
        session.use_database(name)?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = match script {
        Some(path) => interpreter::run_script(&mut session, BufReader::new(File::open(path)?), &mut out)?,
        None => interpreter::run_script(&mut session, io::stdin().lock(), &mut out)?,
    };

    if summary.failed > 0 {
        return Err(format!(
            "{} of {} statements failed",
            summary.failed,
            summary.executed + summary.failed
        )
        .into());
    }
    Ok(())
}
