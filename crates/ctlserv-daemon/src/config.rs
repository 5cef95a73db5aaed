use std::path::PathBuf;
use std::time::Duration;

use ctlserv_common::{default_lock_path, default_runtime_dir, env_or};

const DEFAULT_LINE_CAPACITY: usize = 8192;
const DEFAULT_REPLY_CAPACITY: usize = 8192;
const DEFAULT_ACCEPT_TIMEOUT_MS: u64 = 1000;

/// Server-wide settings, inherited by every forked session.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Path of the global advisory lock file shared by all sessions.
    pub lock_path: PathBuf,
    /// Directory for transient fd hand-off rendezvous sockets.
    pub runtime_dir: PathBuf,
    /// Capacity of the inbound line buffer; exhausting it is fatal to
    /// the connection.
    pub line_capacity: usize,
    /// Capacity of the outbound status-line buffer.
    pub reply_capacity: usize,
    /// How long the listener poll blocks before housekeeping runs.
    pub accept_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self {
            lock_path: default_lock_path(),
            runtime_dir: default_runtime_dir(),
            line_capacity: env_or("CTLSERV_LINE_CAPACITY", DEFAULT_LINE_CAPACITY),
            reply_capacity: env_or("CTLSERV_REPLY_CAPACITY", DEFAULT_REPLY_CAPACITY),
            accept_timeout: Duration::from_millis(env_or(
                "CTLSERV_ACCEPT_TIMEOUT_MS",
                DEFAULT_ACCEPT_TIMEOUT_MS,
            )),
        }
    }

    pub fn with_lock_path(mut self, path: PathBuf) -> Self {
        self.lock_path = path;
        self
    }

    pub fn with_runtime_dir(mut self, dir: PathBuf) -> Self {
        self.runtime_dir = dir;
        self
    }

    pub fn with_line_capacity(mut self, capacity: usize) -> Self {
        self.line_capacity = capacity;
        self
    }

    pub fn with_reply_capacity(mut self, capacity: usize) -> Self {
        self.reply_capacity = capacity;
        self
    }

    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacities() {
        let config = DaemonConfig::from_env();
        assert_eq!(config.line_capacity, DEFAULT_LINE_CAPACITY);
        assert_eq!(config.reply_capacity, DEFAULT_REPLY_CAPACITY);
        assert_eq!(
            config.accept_timeout,
            Duration::from_millis(DEFAULT_ACCEPT_TIMEOUT_MS)
        );
    }

    #[test]
    fn test_builder_pattern() {
        let config = DaemonConfig::from_env()
            .with_lock_path(PathBuf::from("/tmp/other.lock"))
            .with_runtime_dir(PathBuf::from("/tmp/other"))
            .with_line_capacity(128)
            .with_reply_capacity(256)
            .with_accept_timeout(Duration::from_millis(50));

        assert_eq!(config.lock_path, PathBuf::from("/tmp/other.lock"));
        assert_eq!(config.runtime_dir, PathBuf::from("/tmp/other"));
        assert_eq!(config.line_capacity, 128);
        assert_eq!(config.reply_capacity, 256);
        assert_eq!(config.accept_timeout, Duration::from_millis(50));
    }
}
