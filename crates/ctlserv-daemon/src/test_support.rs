//! Shared fixtures for in-crate tests.

use std::net::{TcpListener, TcpStream};

use tempfile::TempDir;

use crate::config::DaemonConfig;
use crate::session::Session;

/// A config whose lock file and runtime dir live in a private tempdir.
/// Keep the returned guard alive for the duration of the test.
pub(crate) fn test_config() -> (TempDir, DaemonConfig) {
    let dir = TempDir::new().unwrap();
    let config = DaemonConfig::from_env()
        .with_lock_path(dir.path().join("lock"))
        .with_runtime_dir(dir.path().join("run"));
    (dir, config)
}

/// A session over a real loopback connection, plus the client end.
pub(crate) fn session_pair(config: DaemonConfig) -> (Session, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();
    (Session::new(server, config), client)
}
