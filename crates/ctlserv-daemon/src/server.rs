//! The listener process: bind every address on the shared port, poll
//! with a bounded timeout, fork one session process per accepted
//! connection, and interleave housekeeping (zombie reaping, deferred
//! signal work) between accepts.

use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::os::fd::{AsFd, AsRawFd};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::unistd::{ForkResult, Pid, fork, getpid, setpgid};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing::{debug, info, warn};

use crate::cleanup::{reap_zombies, reset};
use crate::commands::REGISTRY;
use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::session::run_session;

/// Bind and serve until SIGINT/SIGTERM. SIGHUP resets (cleanup hooks,
/// kill all sessions) without exiting.
pub fn run_server(
    addresses: &[IpAddr],
    port: u16,
    config: DaemonConfig,
) -> Result<(), DaemonError> {
    let listeners = bind_all(addresses, port)?;
    for listener in &listeners {
        if let Ok(addr) = listener.local_addr() {
            info!(%addr, "listening");
        }
    }

    let reset_pending = Arc::new(AtomicBool::new(false));
    let shutdown_pending = Arc::new(AtomicBool::new(false));
    spawn_signal_watcher(Arc::clone(&reset_pending), Arc::clone(&shutdown_pending))?;

    let root = getpid();
    info!(%root, port, "server ready");

    loop {
        if shutdown_pending.load(Ordering::SeqCst) {
            info!("shutdown requested, resetting and exiting");
            reset(&REGISTRY, root, None);
            return Ok(());
        }
        if reset_pending.swap(false, Ordering::SeqCst) {
            info!("reset requested");
            reset(&REGISTRY, root, None);
        }

        reap_zombies();

        let mut fds: Vec<PollFd> = listeners
            .iter()
            .map(|l| PollFd::new(l.as_fd(), PollFlags::POLLIN))
            .collect();
        let timeout_ms = config.accept_timeout.as_millis().min(u16::MAX as u128) as u16;

        let ready = match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(0) => continue,
            Ok(_) => fds
                .iter()
                .enumerate()
                .filter(|(_, fd)| {
                    fd.revents()
                        .map(|ev| ev.intersects(PollFlags::POLLIN))
                        .unwrap_or(false)
                })
                .map(|(i, _)| i)
                .collect::<Vec<_>>(),
            Err(Errno::EINTR) => continue,
            Err(err) => return Err(DaemonError::Poll(std::io::Error::from(err))),
        };
        drop(fds);

        for index in ready {
            accept_and_fork(&listeners, index, &config);
        }
    }
}

fn bind_all(addresses: &[IpAddr], port: u16) -> Result<Vec<TcpListener>, DaemonError> {
    let mut listeners = Vec::with_capacity(addresses.len());
    for addr in addresses {
        let sockaddr = SocketAddr::new(*addr, port);
        let listener = TcpListener::bind(sockaddr).map_err(|source| DaemonError::Bind {
            addr: sockaddr.to_string(),
            source,
        })?;
        listeners.push(listener);
    }
    Ok(listeners)
}

fn spawn_signal_watcher(
    reset_pending: Arc<AtomicBool>,
    shutdown_pending: Arc<AtomicBool>,
) -> Result<(), DaemonError> {
    let mut signals = Signals::new([SIGHUP, SIGINT, SIGTERM])
        .map_err(|e| DaemonError::SignalSetup(e.to_string()))?;

    thread::Builder::new()
        .name("signal-watcher".to_string())
        .spawn(move || {
            // Flags only. The accept loop does the actual cleanup, so
            // nothing heavy ever runs in response to a signal here and
            // a concurrently forked child cannot inherit a lock this
            // thread holds.
            for signal in signals.forever() {
                match signal {
                    SIGHUP => reset_pending.store(true, Ordering::SeqCst),
                    _ => shutdown_pending.store(true, Ordering::SeqCst),
                }
            }
        })
        .map_err(|e| DaemonError::SignalSetup(format!("failed to spawn signal watcher: {e}")))?;

    Ok(())
}

fn accept_and_fork(listeners: &[TcpListener], index: usize, config: &DaemonConfig) {
    let (stream, peer) = match listeners[index].accept() {
        Ok(pair) => pair,
        Err(err) => {
            warn!(%err, "accept failed");
            return;
        }
    };

    // SAFETY: the child immediately moves to its own process group,
    // closes the listeners and runs the session pipeline; it never
    // touches state another thread could have locked mid-fork.
    match unsafe { fork() } {
        Ok(ForkResult::Child) => {
            process::exit(session_child(stream, listeners, config.clone()));
        }
        Ok(ForkResult::Parent { child }) => {
            debug!(%child, %peer, "session forked");
            // The accepted descriptor belongs to the session now.
            drop(stream);
        }
        Err(err) => {
            warn!(%err, %peer, "fork failed, dropping connection");
            drop(stream);
        }
    }
}

fn session_child(stream: TcpStream, listeners: &[TcpListener], config: DaemonConfig) -> i32 {
    // Own process group, so the session and any children it spawns can
    // be signalled as one unit.
    if let Err(err) = setpgid(Pid::from_raw(0), Pid::from_raw(0)) {
        warn!(%err, "setpgid failed");
    }

    // The listening sockets are the parent's concern; close our copies
    // so the session only ever owns its accepted connection.
    for listener in listeners {
        let _ = nix::unistd::close(listener.as_raw_fd());
    }

    run_session(stream, config)
}
