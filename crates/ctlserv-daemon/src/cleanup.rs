//! Emergency cleanup: return the server to a pristine state.
//!
//! Runs every registered command cleanup hook, then forcibly tears down
//! all child session processes (whole process groups) and reaps what is
//! left. Invoked from the listener loop on SIGHUP/SIGINT/SIGTERM, and
//! in-band by the `reset` command. Never invoked from signal context:
//! signal delivery only flips a flag, so this code is free to log and
//! allocate.

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::procfs::children_of;
use crate::registry::Registry;

/// Reset everything owned by `parent`: cleanup hooks, child process
/// groups, zombies. `exclude` protects the invoking session when the
/// reset is requested in-band.
///
/// Idempotent: with no live children and nothing to sweep, a second
/// call observes nothing and does nothing.
pub fn reset(registry: &Registry, parent: Pid, exclude: Option<Pid>) {
    for hook in registry.cleanup_hooks() {
        hook();
    }

    kill_children(parent, exclude);
    reap_zombies();
}

fn kill_children(parent: Pid, exclude: Option<Pid>) {
    for pid in children_of(parent) {
        if Some(pid) == exclude {
            continue;
        }

        debug!(%pid, "terminating session process group");
        // Group first so the session's own descendants go with it, then
        // the session itself in case it never became a group leader.
        if let Err(err) = kill(Pid::from_raw(-pid.as_raw()), Signal::SIGKILL) {
            if err != Errno::ESRCH {
                warn!(%pid, %err, "failed to signal process group");
            }
        }
        if let Err(err) = kill(pid, Signal::SIGKILL) {
            if err != Errno::ESRCH {
                warn!(%pid, %err, "failed to signal process");
            }
        }

        // Reap it if it was ours; ECHILD means someone else's child
        // (in-band reset from a sibling session) and the server root's
        // reaper will collect it.
        let _ = waitpid(pid, None);
    }
}

/// Collect any exited children without blocking.
pub fn reap_zombies() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(pid) = status.pid() {
                    debug!(%pid, "reaped session");
                }
            }
            Err(_) => break,
        }
    }
}
