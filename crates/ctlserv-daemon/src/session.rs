//! Per-connection session state and the single-line pipeline a forked
//! session process runs before exiting.

use std::net::{Shutdown, TcpStream};

use ctlserv_proto::{DELIMITER, line_payload, read_line, set_abort_linger};
use tracing::{debug, error, warn};

use crate::commands::REGISTRY;
use crate::config::DaemonConfig;
use crate::executor::{ExecOutcome, execute};
use crate::lock::GlobalLock;
use crate::parser::parse;

/// The session's hold on its client connection. Commands may give the
/// socket away (`detach`, `send`) or swap it (`recv`); the session
/// process keeps running either way.
pub enum SocketHandle {
    Attached(TcpStream),
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Status lines are written back after every command.
    Control,
    /// Status lines accumulate but are not written; the socket is left
    /// free for raw data.
    Binary,
}

pub struct Session {
    pub conn: SocketHandle,
    pub mode: SessionMode,
    pub lock: GlobalLock,
    pub config: DaemonConfig,
}

impl Session {
    pub fn new(stream: TcpStream, config: DaemonConfig) -> Self {
        let lock = GlobalLock::new(config.lock_path.clone());
        Self {
            conn: SocketHandle::Attached(stream),
            mode: SessionMode::Control,
            lock,
            config,
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.conn, SocketHandle::Attached(_))
    }

    pub fn stream(&self) -> Option<&TcpStream> {
        match &self.conn {
            SocketHandle::Attached(stream) => Some(stream),
            SocketHandle::Detached => None,
        }
    }

    /// Release the client socket, closing this session's handle on it.
    pub fn detach(&mut self) -> Option<TcpStream> {
        match std::mem::replace(&mut self.conn, SocketHandle::Detached) {
            SocketHandle::Attached(stream) => Some(stream),
            SocketHandle::Detached => None,
        }
    }

    /// Adopt a connection received from another session. Any previous
    /// handle is dropped (closed).
    pub fn attach(&mut self, stream: TcpStream) {
        self.conn = SocketHandle::Attached(stream);
    }
}

/// Run one session to completion: read exactly one command line, parse
/// it, execute it, then shut the connection down if we still own it.
///
/// Returns the exit code for the session process. Protocol errors get
/// no clean reply; the abort linger set before the first read makes the
/// close look like a reset to the peer.
pub fn run_session(stream: TcpStream, config: DaemonConfig) -> i32 {
    if let Err(err) = set_abort_linger(&stream) {
        warn!(%err, "failed to set abort linger");
    }

    let mut buf = vec![0u8; config.line_capacity];
    let consumed = match read_line(&stream, &mut buf, DELIMITER) {
        Ok(n) => n,
        Err(err) => {
            error!(%err, "failed to read command line");
            return 1;
        }
    };

    let line = String::from_utf8_lossy(line_payload(&buf, consumed, DELIMITER)).into_owned();
    debug!(%line, "received command line");

    let list = match parse(&line, &REGISTRY) {
        Ok(list) => list,
        Err(err) => {
            error!(%err, %line, "failed to parse command line");
            return 1;
        }
    };

    let mut session = Session::new(stream, config);
    match execute(&mut session, &list) {
        Ok(ExecOutcome::Completed) => {
            if session.mode == SessionMode::Control {
                if let SocketHandle::Attached(stream) = &session.conn {
                    let _ = stream.shutdown(Shutdown::Write);
                }
            }
            0
        }
        Ok(ExecOutcome::Fatal) => {
            error!("session ended by unrecoverable command failure");
            1
        }
        Err(err) => {
            error!(%err, "failed to execute command line");
            1
        }
    }
}
