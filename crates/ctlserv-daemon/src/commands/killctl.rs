//! The `kill` command: terminate another session by TCP port.

use nix::unistd::getppid;
use tracing::{debug, error};

use crate::lookup::kill_session_by_port;
use crate::session::Session;

/// `kill,<port>` — find the session owning a connection on `port` and
/// terminate its whole process group. A port with no owning session is
/// a successful no-op.
pub(super) fn kill(args: &[String], session: &mut Session) -> i32 {
    let Some(port) = args.get(1).and_then(|p| p.parse::<u16>().ok()) else {
        return libc::EINVAL;
    };

    // The target endpoint is derived from our own control connection,
    // so a detached session has nothing to derive it from.
    let Some(control) = session.stream() else {
        return libc::EINVAL;
    };

    match kill_session_by_port(control, port, getppid()) {
        Ok(found) => {
            debug!(port, found, "session kill lookup finished");
            0
        }
        Err(err) => {
            error!(port, %err, "session kill lookup failed");
            libc::EIO
        }
    }
}
