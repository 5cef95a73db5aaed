//! Well-known filesystem locations shared by every session process.

use std::path::{Path, PathBuf};

/// Prefix for fd hand-off rendezvous sockets inside the runtime directory.
pub const RENDEZVOUS_PREFIX: &str = "fdpass-";

/// Path of the global advisory lock file.
///
/// Overridable with `CTLSERV_LOCK_FILE`; otherwise lives under
/// `XDG_RUNTIME_DIR` when set, `/tmp` when not.
pub fn default_lock_path() -> PathBuf {
    if let Ok(custom_path) = std::env::var("CTLSERV_LOCK_FILE") {
        return PathBuf::from(custom_path);
    }

    std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| PathBuf::from(dir).join("ctlserv.lock"))
        .unwrap_or_else(|_| PathBuf::from("/tmp/ctlserv.lock"))
}

/// Directory holding transient fd hand-off rendezvous sockets.
pub fn default_runtime_dir() -> PathBuf {
    if let Ok(custom_path) = std::env::var("CTLSERV_RUNTIME_DIR") {
        return PathBuf::from(custom_path);
    }

    std::env::var("XDG_RUNTIME_DIR")
        .map(|dir| PathBuf::from(dir).join("ctlserv"))
        .unwrap_or_else(|_| PathBuf::from("/tmp/ctlserv"))
}

/// Rendezvous socket path for a hand-off token.
pub fn rendezvous_path(runtime_dir: &Path, token: &str) -> PathBuf {
    runtime_dir.join(format!("{RENDEZVOUS_PREFIX}{token}"))
}

/// Read an environment variable and parse it, falling back to `default`
/// when unset or unparseable.
pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
