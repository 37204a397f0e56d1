//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default time a connection waits on a locked database before giving up.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration for opening a store.
///
/// There is no default location: every store is opened at an explicit path.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backing SQLite file
    pub path: PathBuf,

    /// How long to wait on a lock held by another connection
    pub busy_timeout: Duration,

    /// Use write-ahead logging so readers see only committed operations
    pub wal: bool,
}

impl StoreConfig {
    /// Create config with default settings for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            wal: true,
        }
    }

    /// Set the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable write-ahead logging.
    pub fn wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StoreConfig::new("/tmp/library.db");
        assert_eq!(config.path, PathBuf::from("/tmp/library.db"));
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert!(config.wal);
    }

    #[test]
    fn test_config_builder() {
        let config = StoreConfig::new("library.db")
            .busy_timeout(Duration::from_millis(250))
            .wal(false);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.wal);
    }
}
