//! Descriptor hand-off between sessions over path-named local sockets.
//!
//! The receiver binds a rendezvous socket named from a shared token,
//! the sender connects and ships one descriptor as SCM_RIGHTS ancillary
//! data (with the mandatory 1-byte payload), and the rendezvous path is
//! unlinked once the transfer completes. Orphaned paths from
//! half-finished transfers are swept at cleanup.

use std::fs;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use nix::cmsg_space;
use nix::sys::socket::{
    ControlMessage, ControlMessageOwned, MsgFlags, recvmsg, sendmsg,
};
use thiserror::Error;
use tracing::debug;

use ctlserv_common::{RENDEZVOUS_PREFIX, default_runtime_dir, rendezvous_path};

#[derive(Error, Debug)]
pub enum FdPassError {
    #[error("failed to set up rendezvous at {path}: {source}")]
    Setup { path: PathBuf, source: io::Error },

    #[error("failed to connect to rendezvous at {path}: {source}")]
    Connect { path: PathBuf, source: io::Error },

    #[error("descriptor transfer failed: {0}")]
    Transfer(io::Error),

    #[error("peer sent no descriptor")]
    NoDescriptor,
}

/// Block until a sender connects to the token's rendezvous and hand
/// back the descriptor it transfers. The rendezvous path is created
/// here and removed before returning.
pub fn receive(runtime_dir: &Path, token: &str) -> Result<OwnedFd, FdPassError> {
    fs::create_dir_all(runtime_dir).map_err(|source| FdPassError::Setup {
        path: runtime_dir.to_path_buf(),
        source,
    })?;

    let path = rendezvous_path(runtime_dir, token);
    // A leftover path from an aborted transfer would fail the bind.
    let _ = fs::remove_file(&path);

    let listener = UnixListener::bind(&path).map_err(|source| FdPassError::Setup {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "waiting for descriptor");

    let result = accept_one(&listener);
    let _ = fs::remove_file(&path);
    result
}

fn accept_one(listener: &UnixListener) -> Result<OwnedFd, FdPassError> {
    let (stream, _) = listener.accept().map_err(FdPassError::Transfer)?;
    recv_fd(stream.as_raw_fd())
}

/// Connect to the token's rendezvous and transfer `fd` to whoever is
/// waiting there. The caller is expected to close its own copy
/// afterwards.
pub fn send(runtime_dir: &Path, token: &str, fd: BorrowedFd<'_>) -> Result<(), FdPassError> {
    let path = rendezvous_path(runtime_dir, token);
    let stream = UnixStream::connect(&path).map_err(|source| FdPassError::Connect {
        path: path.clone(),
        source,
    })?;

    send_fd(stream.as_raw_fd(), fd.as_raw_fd())?;
    debug!(path = %path.display(), "descriptor sent");
    Ok(())
}

/// Remove leftover rendezvous sockets and the runtime directory.
/// Registered as the hand-off commands' global cleanup hook.
pub fn sweep() {
    sweep_dir(&default_runtime_dir());
}

pub(crate) fn sweep_dir(runtime_dir: &Path) {
    let Ok(entries) = fs::read_dir(runtime_dir) else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name.to_string_lossy().starts_with(RENDEZVOUS_PREFIX) {
            let _ = fs::remove_file(entry.path());
        }
    }
    let _ = fs::remove_dir(runtime_dir);
}

fn send_fd(socket_fd: RawFd, fd_to_send: RawFd) -> Result<(), FdPassError> {
    // sendmsg requires some data alongside the control message.
    let data = [0u8];
    let iov = [io::IoSlice::new(&data)];

    let fds = [fd_to_send];
    let cmsg = [ControlMessage::ScmRights(&fds)];

    sendmsg::<()>(socket_fd, &iov, &cmsg, MsgFlags::empty(), None)
        .map_err(|e| FdPassError::Transfer(io::Error::from(e)))?;
    Ok(())
}

fn recv_fd(socket_fd: RawFd) -> Result<OwnedFd, FdPassError> {
    let mut data = [0u8; 1];
    let mut iov = [io::IoSliceMut::new(&mut data)];
    let mut cmsg_buffer = cmsg_space!([RawFd; 1]);

    let msg = recvmsg::<()>(
        socket_fd,
        &mut iov,
        Some(&mut cmsg_buffer),
        MsgFlags::empty(),
    )
    .map_err(|e| FdPassError::Transfer(io::Error::from(e)))?;

    for cmsg in msg
        .cmsgs()
        .map_err(|e| FdPassError::Transfer(io::Error::from(e)))?
    {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            if let Some(&fd) = fds.first() {
                // SAFETY: the kernel just installed this descriptor for
                // us; nothing else owns it yet.
                return Ok(unsafe { OwnedFd::from_raw_fd(fd) });
            }
        }
    }

    Err(FdPassError::NoDescriptor)
}
