//! Out-of-band termination of a session identified by a TCP port.
//!
//! A session blocked deep inside a handler cannot process an in-band
//! "end session" command, so the only safe interrupt is by socket
//! identity: render the endpoint the way the kernel's connection tables
//! do, find the socket inode, find which session process holds that
//! inode open, and kill its whole process group.

use std::fs;
use std::io;
use std::net::{IpAddr, TcpStream};
use std::path::{Path, PathBuf};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use thiserror::Error;
use tracing::debug;

use crate::procfs::children_of;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("cannot resolve control endpoint: {0}")]
    Endpoint(io::Error),

    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed connection table row: {0}")]
    Malformed(String),
}

/// Terminate the session owning a connection on `port`, where `port`
/// substitutes into the addresses of the caller's own control
/// connection.
///
/// Returns `Ok(true)` if a session was killed, `Ok(false)` if the port
/// maps to no killable socket (no row, an ownerless `inode == 0` row
/// such as TIME_WAIT, or an inode held by no session) — a successful
/// no-op, not a failure.
pub fn kill_session_by_port(
    control: &TcpStream,
    port: u16,
    server_root: Pid,
) -> Result<bool, LookupError> {
    let local = control.local_addr().map_err(LookupError::Endpoint)?;
    let peer = control.peer_addr().map_err(LookupError::Endpoint)?;

    let table_path = match local.ip() {
        IpAddr::V4(_) => Path::new("/proc/net/tcp"),
        IpAddr::V6(_) => Path::new("/proc/net/tcp6"),
    };
    let table = fs::read_to_string(table_path).map_err(|source| LookupError::Io {
        path: table_path.to_path_buf(),
        source,
    })?;

    // The port may name a socket bound by a session itself (matched in
    // the local column against our own address) or the client end of
    // another session's connection (matched in the remote column
    // against the caller's peer address).
    let local_endpoint = kernel_endpoint(local.ip(), port);
    let peer_endpoint = kernel_endpoint(peer.ip(), port);
    let inodes = find_inodes(&table, &local_endpoint, &peer_endpoint)?;
    if inodes.is_empty() {
        debug!(port, "no connection-table entry for port");
        return Ok(false);
    }

    for pid in children_of(server_root) {
        for &inode in &inodes {
            if holds_socket_inode(pid, inode) {
                debug!(%pid, inode, port, "killing session by socket identity");
                let _ = kill(Pid::from_raw(-pid.as_raw()), Signal::SIGKILL);
                let _ = kill(pid, Signal::SIGKILL);
                return Ok(true);
            }
        }
    }

    debug!(port, ?inodes, "no session owns the matched sockets");
    Ok(false)
}

/// Render `(address, port)` as the fixed-width uppercase hex form used
/// by `/proc/net/tcp` and `/proc/net/tcp6`: the address bytes are read
/// as little-endian 32-bit groups, the port in host order.
pub fn kernel_endpoint(addr: IpAddr, port: u16) -> String {
    match addr {
        IpAddr::V4(v4) => {
            format!("{:08X}:{:04X}", u32::from_le_bytes(v4.octets()), port)
        }
        IpAddr::V6(v6) => {
            let mut hex = String::with_capacity(37);
            for group in v6.octets().chunks_exact(4) {
                let word = u32::from_le_bytes([group[0], group[1], group[2], group[3]]);
                hex.push_str(&format!("{word:08X}"));
            }
            format!("{hex}:{port:04X}")
        }
    }
}

/// Scan a connection table for rows whose local or remote endpoint
/// matches, returning the owning socket inodes. Ownerless rows
/// (`inode == 0`) are skipped.
fn find_inodes(
    table: &str,
    local_endpoint: &str,
    peer_endpoint: &str,
) -> Result<Vec<u64>, LookupError> {
    let mut inodes = Vec::new();

    for row in table.lines().skip(1) {
        let fields: Vec<&str> = row.split_whitespace().collect();
        if fields.len() < 10 {
            return Err(LookupError::Malformed(row.to_string()));
        }
        let local_address = fields[1];
        let rem_address = fields[2];

        if local_address == local_endpoint || rem_address == peer_endpoint {
            let inode: u64 = fields[9]
                .parse()
                .map_err(|_| LookupError::Malformed(row.to_string()))?;
            if inode != 0 {
                inodes.push(inode);
            }
        }
    }

    Ok(inodes)
}

/// Whether `pid` has an open descriptor on socket `inode`.
fn holds_socket_inode(pid: Pid, inode: u64) -> bool {
    let fd_dir = format!("/proc/{pid}/fd");
    let target = format!("socket:[{inode}]");

    let Ok(entries) = fs::read_dir(fd_dir) else {
        return false;
    };
    for entry in entries.flatten() {
        if let Ok(link) = fs::read_link(entry.path()) {
            if link.as_os_str() == target.as_str() {
                return true;
            }
        }
    }
    false
}
