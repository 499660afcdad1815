//! Database configuration.

/// Configuration for creating or opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Convert "already exists" / "not found" conditions into
    /// return-existing / auto-create behavior.
    pub safe_mode: bool,

    /// Mirror each table's documents in memory so reads skip the file.
    pub preload: bool,

    /// Whether to fsync table and metadata rewrites before returning.
    pub sync_on_write: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            safe_mode: true,
            preload: false,
            sync_on_write: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets safe mode.
    #[must_use]
    pub const fn safe_mode(mut self, value: bool) -> Self {
        self.safe_mode = value;
        self
    }

    /// Sets whether tables keep an in-memory mirror.
    #[must_use]
    pub const fn preload(mut self, value: bool) -> Self {
        self.preload = value;
        self
    }

    /// Sets whether rewrites are synced to disk.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.safe_mode);
        assert!(!config.preload);
        assert!(config.sync_on_write);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .safe_mode(false)
            .preload(true)
            .sync_on_write(false);

        assert!(!config.safe_mode);
        assert!(config.preload);
        assert!(!config.sync_on_write);
    }
}
