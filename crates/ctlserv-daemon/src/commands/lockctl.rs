//! The `lock`/`unlock` commands over the global advisory lock.
//!
//! Result codes: 0 acquired/released, EBUSY for a nonblocking request
//! that found the lock held, EIO for flock failures. A lock file that
//! cannot be opened at all, or a downgrade that leaves the session
//! holding nothing, is unrecoverable.

use tracing::error;

use crate::executor::RC_FATAL;
use crate::lock::{LockError, LockMode, LockStatus};
use crate::session::Session;

/// `lock,sh|ex[,nb]` to acquire, `lock,down[,nb]` to downgrade an
/// exclusive hold to shared.
pub(super) fn lock(args: &[String], session: &mut Session) -> i32 {
    let blocking = match args.get(2).map(String::as_str) {
        None => true,
        Some("nb") => false,
        Some(_) => return libc::EINVAL,
    };

    match args.get(1).map(String::as_str) {
        Some("sh") => acquire_rc(session, LockMode::Shared, blocking),
        Some("ex") => acquire_rc(session, LockMode::Exclusive, blocking),
        Some("down") => match session.lock.downgrade(blocking) {
            Ok(LockStatus::Acquired) => 0,
            Ok(LockStatus::AlreadyHeld) => libc::EBUSY,
            Err(err) => {
                // The exclusive hold is gone and shared was not
                // reacquired; the session cannot safely continue.
                error!(%err, "lock downgrade failed");
                RC_FATAL
            }
        },
        _ => libc::EINVAL,
    }
}

/// `unlock` — release whatever is held.
pub(super) fn unlock(args: &[String], session: &mut Session) -> i32 {
    if args.len() > 1 {
        return libc::EINVAL;
    }
    match session.lock.release() {
        Ok(()) => 0,
        Err(err) => {
            error!(%err, "lock release failed");
            libc::EIO
        }
    }
}

fn acquire_rc(session: &mut Session, mode: LockMode, blocking: bool) -> i32 {
    match session.lock.acquire(mode, blocking) {
        Ok(LockStatus::Acquired) => 0,
        Ok(LockStatus::AlreadyHeld) => libc::EBUSY,
        Err(err @ LockError::Open { .. }) => {
            // No lock file means no session can ever serialize against
            // us; treated like a startup failure for this process.
            error!(%err, "cannot open lock file");
            RC_FATAL
        }
        Err(err) => {
            error!(%err, "lock acquisition failed");
            libc::EIO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::GlobalLock;
    use crate::test_support::{session_pair, test_config};

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lock_shared_then_unlock() {
        let (_dir, config) = test_config();
        let (mut session, _client) = session_pair(config);

        assert_eq!(lock(&argv(&["lock", "sh"]), &mut session), 0);
        assert_eq!(unlock(&argv(&["unlock"]), &mut session), 0);
    }

    #[test]
    fn test_nonblocking_exclusive_reports_busy_not_error() {
        let (_dir, config) = test_config();
        let mut holder = GlobalLock::new(config.lock_path.clone());
        holder.acquire(LockMode::Exclusive, true).unwrap();

        let (mut session, _client) = session_pair(config);
        assert_eq!(
            lock(&argv(&["lock", "ex", "nb"]), &mut session),
            libc::EBUSY
        );
    }

    #[test]
    fn test_downgrade_ends_holding_shared() {
        let (_dir, config) = test_config();
        let (mut session, _client) = session_pair(config.clone());

        assert_eq!(lock(&argv(&["lock", "ex"]), &mut session), 0);
        assert_eq!(lock(&argv(&["lock", "down"]), &mut session), 0);

        // Another holder can now take shared, but not exclusive.
        let mut other = GlobalLock::new(config.lock_path);
        assert_eq!(
            other.acquire(LockMode::Shared, false).unwrap(),
            LockStatus::Acquired
        );
    }

    #[test]
    fn test_lock_rejects_bad_arguments() {
        let (_dir, config) = test_config();
        let (mut session, _client) = session_pair(config);

        assert_eq!(lock(&argv(&["lock"]), &mut session), libc::EINVAL);
        assert_eq!(lock(&argv(&["lock", "xx"]), &mut session), libc::EINVAL);
        assert_eq!(
            lock(&argv(&["lock", "ex", "fast"]), &mut session),
            libc::EINVAL
        );
        assert_eq!(unlock(&argv(&["unlock", "x"]), &mut session), libc::EINVAL);
    }

    #[test]
    fn test_unopenable_lock_file_is_fatal() {
        let (_dir, config) = test_config();
        let config =
            config.with_lock_path(std::path::PathBuf::from("/proc/nonexistent/ctlserv.lock"));
        let (mut session, _client) = session_pair(config);

        assert_eq!(lock(&argv(&["lock", "sh"]), &mut session), RC_FATAL);
    }
}
