//! The `recv`/`send` commands: move a client connection between
//! sessions.

use std::net::TcpStream;
use std::os::fd::AsFd;

use tracing::error;

use crate::executor::RC_FATAL;
use crate::fdpass;
use crate::session::Session;

/// `recv,<token>` — block until a peer session sends a descriptor for
/// `token`, then adopt it as this session's client connection. The
/// previous connection handle is closed; subsequent status lines go to
/// the adopted one.
pub(super) fn recv(args: &[String], session: &mut Session) -> i32 {
    let Some(token) = args.get(1) else {
        return libc::EINVAL;
    };

    match fdpass::receive(&session.config.runtime_dir, token) {
        Ok(fd) => {
            session.attach(TcpStream::from(fd));
            0
        }
        Err(err) => {
            // A half-completed hand-off leaves the connection's
            // disposition ambiguous; the session cannot continue.
            error!(token, %err, "descriptor receive failed");
            RC_FATAL
        }
    }
}

/// `send,<token>` — transfer this session's client connection to the
/// session waiting on `token`, then close our copy. This session ends
/// up detached either way.
pub(super) fn send(args: &[String], session: &mut Session) -> i32 {
    let Some(token) = args.get(1) else {
        return libc::EINVAL;
    };
    let Some(stream) = session.detach() else {
        return libc::EINVAL;
    };

    match fdpass::send(&session.config.runtime_dir, token, stream.as_fd()) {
        Ok(()) => 0,
        Err(err) => {
            error!(token, %err, "descriptor send failed");
            RC_FATAL
        }
    }
}
