//! Startup and lifecycle errors for the server process.
//!
//! Everything here is fatal to the whole server: there is no
//! partial-degradation mode. Per-connection failures live in
//! `ctlserv_proto::ProtoError`; handler failures are plain result codes.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("invalid bind address {addr}: {reason}")]
    BadAddress { addr: String, reason: String },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to setup signal handler: {0}")]
    SignalSetup(String),

    #[error("poll failed: {0}")]
    Poll(std::io::Error),
}
