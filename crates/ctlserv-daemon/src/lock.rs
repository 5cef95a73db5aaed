//! The global advisory lock shared by all sessions.
//!
//! One well-known lock file, `flock(2)` semantics: any number of shared
//! holders or exactly one exclusive holder, advisory only. The file is
//! opened lazily on first use and the open handle is reused for the
//! rest of the session process's life.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug, PartialEq, Eq)]
pub enum LockStatus {
    Acquired,
    /// A nonblocking request found the lock held in a conflicting mode.
    /// Distinguished from errors so callers can branch on it.
    AlreadyHeld,
}

#[derive(Error, Debug)]
pub enum LockError {
    #[error("failed to open lock file {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("flock failed: {0}")]
    Flock(io::Error),
}

pub struct GlobalLock {
    path: PathBuf,
    file: Option<File>,
}

impl GlobalLock {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    /// Acquire the lock in the given mode. Re-acquiring on the same
    /// handle converts the existing lock rather than stacking.
    pub fn acquire(&mut self, mode: LockMode, blocking: bool) -> Result<LockStatus, LockError> {
        let fd = self.file()?.as_raw_fd();

        let mut op = match mode {
            LockMode::Shared => libc::LOCK_SH,
            LockMode::Exclusive => libc::LOCK_EX,
        };
        if !blocking {
            op |= libc::LOCK_NB;
        }

        // SAFETY: flock is safe to call with a valid file descriptor
        let result = unsafe { libc::flock(fd, op) };
        if result == 0 {
            return Ok(LockStatus::Acquired);
        }

        let err = io::Error::last_os_error();
        if !blocking && err.kind() == io::ErrorKind::WouldBlock {
            Ok(LockStatus::AlreadyHeld)
        } else {
            Err(LockError::Flock(err))
        }
    }

    /// Drop from exclusive to shared.
    ///
    /// Not atomic: flock conversion releases the existing lock before
    /// taking the new one, so another session can slip in an exclusive
    /// acquisition in between. Callers that cannot tolerate the window
    /// must pass `blocking` so they at least end up holding shared
    /// again; a nonblocking downgrade can lose the race entirely.
    pub fn downgrade(&mut self, blocking: bool) -> Result<LockStatus, LockError> {
        self.acquire(LockMode::Shared, blocking)
    }

    /// Release any held lock. A no-op if nothing was ever acquired.
    pub fn release(&mut self) -> Result<(), LockError> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        // SAFETY: flock is safe to call with a valid file descriptor
        let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
        if result == 0 {
            Ok(())
        } else {
            Err(LockError::Flock(io::Error::last_os_error()))
        }
    }

    fn file(&mut self) -> Result<&File, LockError> {
        match &mut self.file {
            Some(file) => Ok(file),
            slot @ None => {
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(&self.path)
                    .map_err(|source| LockError::Open {
                        path: self.path.clone(),
                        source,
                    })?;
                Ok(slot.insert(file))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;
    use tempfile::TempDir;

    fn lock_pair() -> (TempDir, GlobalLock, GlobalLock) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.lock");
        // Two handles on the same path are two open file descriptions,
        // which flock treats as independent holders.
        let a = GlobalLock::new(path.clone());
        let b = GlobalLock::new(path);
        (dir, a, b)
    }

    #[test]
    fn test_exclusive_then_nonblocking_exclusive_reports_already_held() {
        let (_dir, mut a, mut b) = lock_pair();
        assert_eq!(
            a.acquire(LockMode::Exclusive, true).unwrap(),
            LockStatus::Acquired
        );
        assert_eq!(
            b.acquire(LockMode::Exclusive, false).unwrap(),
            LockStatus::AlreadyHeld
        );
    }

    #[test]
    fn test_shared_holders_coexist() {
        let (_dir, mut a, mut b) = lock_pair();
        assert_eq!(
            a.acquire(LockMode::Shared, true).unwrap(),
            LockStatus::Acquired
        );
        assert_eq!(
            b.acquire(LockMode::Shared, false).unwrap(),
            LockStatus::Acquired
        );
    }

    #[test]
    fn test_shared_blocks_nonblocking_exclusive() {
        let (_dir, mut a, mut b) = lock_pair();
        a.acquire(LockMode::Shared, true).unwrap();
        assert_eq!(
            b.acquire(LockMode::Exclusive, false).unwrap(),
            LockStatus::AlreadyHeld
        );
    }

    #[test]
    fn test_release_allows_next_exclusive() {
        let (_dir, mut a, mut b) = lock_pair();
        a.acquire(LockMode::Exclusive, true).unwrap();
        a.release().unwrap();
        assert_eq!(
            b.acquire(LockMode::Exclusive, false).unwrap(),
            LockStatus::Acquired
        );
    }

    #[test]
    fn test_downgrade_admits_shared_holder() {
        let (_dir, mut a, mut b) = lock_pair();
        a.acquire(LockMode::Exclusive, true).unwrap();
        assert_eq!(a.downgrade(true).unwrap(), LockStatus::Acquired);
        assert_eq!(
            b.acquire(LockMode::Shared, false).unwrap(),
            LockStatus::Acquired
        );
    }

    #[test]
    fn test_blocking_exclusive_eventually_succeeds() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.lock");

        let mut a = GlobalLock::new(path.clone());
        a.acquire(LockMode::Exclusive, true).unwrap();

        let waiter = thread::spawn(move || {
            let mut b = GlobalLock::new(path);
            b.acquire(LockMode::Exclusive, true).unwrap()
        });

        thread::sleep(Duration::from_millis(50));
        a.release().unwrap();
        assert_eq!(waiter.join().unwrap(), LockStatus::Acquired);
    }

    #[test]
    fn test_release_without_acquire_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut lock = GlobalLock::new(dir.path().join("test.lock"));
        lock.release().unwrap();
    }

    #[test]
    fn test_open_failure_is_reported() {
        let mut lock = GlobalLock::new(PathBuf::from("/proc/nonexistent/ctlserv.lock"));
        let err = lock.acquire(LockMode::Shared, false).unwrap_err();
        assert!(matches!(err, LockError::Open { .. }));
    }
}
