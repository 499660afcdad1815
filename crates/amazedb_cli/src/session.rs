//! Interpreter session state.

use amazedb_core::{Config, CoreResult, Database};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The context statements run against: storage root, configuration and the
/// currently selected database.
#[derive(Debug)]
pub struct Session {
    root: PathBuf,
    config: Config,
    current: Option<Database>,
}

impl Session {
    /// Creates a session with no database selected.
    pub fn new(root: &Path, config: Config) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            current: None,
        }
    }

    /// Opens database `name` and makes it current.
    pub fn use_database(&mut self, name: &str) -> CoreResult<&Database> {
        let db = Database::open(&self.root, name, self.config.clone())?;
        debug!(database = name, "selected database");
        Ok(&*self.current.insert(db))
    }

    /// Creates database `name` and makes it current.
    pub fn create_database(&mut self, name: &str) -> CoreResult<&Database> {
        let db = Database::create(&self.root, name, self.config.clone())?;
        Ok(&*self.current.insert(db))
    }

    /// The selected database, if any.
    pub fn current(&self) -> Option<&Database> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn starts_without_database() {
        let temp = tempdir().unwrap();
        let session = Session::new(temp.path(), Config::default());
        assert!(session.current().is_none());
    }

    #[test]
    fn use_switches_current() {
        let temp = tempdir().unwrap();
        let mut session = Session::new(temp.path(), Config::default().sync_on_write(false));

        session.create_database("first").unwrap();
        session.use_database("second").unwrap();
        assert_eq!(session.current().map(Database::name), Some("second"));
    }

    #[test]
    fn strict_session_reports_missing_database() {
        let temp = tempdir().unwrap();
        let mut session = Session::new(temp.path(), Config::default().safe_mode(false));
        assert!(session.use_database("missing").is_err());
        assert!(session.current().is_none());
    }
}
