//! Session-control commands: reply mode, socket ownership, and the
//! in-band server reset.

use nix::unistd::{getpid, getppid};
use tracing::info;

use crate::cleanup;
use crate::session::{Session, SessionMode};

/// `mode,control|binary` — switch how status lines are delivered.
/// Takes effect for this command's own status line already.
pub(super) fn mode(args: &[String], session: &mut Session) -> i32 {
    match args.get(1).map(String::as_str) {
        Some("control") => {
            session.mode = SessionMode::Control;
            0
        }
        Some("binary") => {
            session.mode = SessionMode::Binary;
            0
        }
        _ => libc::EINVAL,
    }
}

/// `detach` — close this session's handle on the client socket. The
/// session keeps running; its remaining status lines go nowhere.
pub(super) fn detach(args: &[String], session: &mut Session) -> i32 {
    if args.len() > 1 {
        return libc::EINVAL;
    }
    drop(session.detach());
    0
}

/// `reset` — run emergency cleanup against the server root: every
/// sibling session is torn down, the caller's own session is spared so
/// the client still gets this command's status line.
pub(super) fn reset(args: &[String], _session: &mut Session) -> i32 {
    if args.len() > 1 {
        return libc::EINVAL;
    }
    info!("in-band reset requested");
    cleanup::reset(&super::REGISTRY, getppid(), Some(getpid()));
    0
}
