//! Trivial commands: useful for exercising the dispatch path and for
//! keeping a session busy in tests.

use std::thread;
use std::time::Duration;

use crate::session::Session;

/// Succeeds; the status line itself echoes the arguments back.
pub(super) fn echo(_args: &[String], _session: &mut Session) -> i32 {
    0
}

/// Returns its numeric argument as the result code (default 0).
pub(super) fn noop(args: &[String], _session: &mut Session) -> i32 {
    match args.get(1) {
        None => 0,
        Some(arg) => arg.parse().unwrap_or(libc::EINVAL),
    }
}

/// Blocks the session for the given number of seconds.
pub(super) fn sleep(args: &[String], _session: &mut Session) -> i32 {
    let Some(secs) = args.get(1).and_then(|s| s.parse::<u64>().ok()) else {
        return libc::EINVAL;
    };
    thread::sleep(Duration::from_secs(secs));
    0
}
