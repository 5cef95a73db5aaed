#![deny(clippy::all)]

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use ctlserv_daemon::{DaemonConfig, DaemonError, run_server};

/// Command/control test server: one forked session process per TCP
/// connection, a line of `;`/`,`-delimited commands per session.
#[derive(Parser, Debug)]
#[command(name = "ctlserv", version, about)]
struct Cli {
    /// One or more addresses to bind, followed by the shared TCP port
    #[arg(required = true, num_args = 2.., value_name = "ADDR... PORT")]
    bind: Vec<String>,

    /// Override the global advisory lock file path
    #[arg(long, value_name = "PATH")]
    lock_file: Option<PathBuf>,

    /// Override the fd hand-off rendezvous directory
    #[arg(long, value_name = "PATH")]
    runtime_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Path overrides flow through the environment: the registry's
    // cleanup hooks resolve paths from there, and forked sessions
    // inherit it.
    if let Some(path) = &cli.lock_file {
        std::env::set_var("CTLSERV_LOCK_FILE", path);
    }
    if let Some(dir) = &cli.runtime_dir {
        std::env::set_var("CTLSERV_RUNTIME_DIR", dir);
    }

    let (addresses, port) = match parse_bind_args(&cli.bind) {
        Ok(parts) => parts,
        Err(err) => {
            error!(%err, "invalid arguments");
            return ExitCode::from(2);
        }
    };

    match run_server(&addresses, port, DaemonConfig::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "server failed");
            ExitCode::FAILURE
        }
    }
}

/// Split the positional arguments into bind addresses and the trailing
/// port.
fn parse_bind_args(bind: &[String]) -> Result<(Vec<IpAddr>, u16), DaemonError> {
    let Some((port_arg, addr_args)) = bind.split_last() else {
        return Err(DaemonError::BadAddress {
            addr: String::new(),
            reason: "no arguments".to_string(),
        });
    };

    let port = port_arg.parse::<u16>().map_err(|_| DaemonError::BadAddress {
        addr: port_arg.clone(),
        reason: "not a valid port".to_string(),
    })?;

    let addresses = addr_args
        .iter()
        .map(|arg| {
            arg.parse::<IpAddr>().map_err(|_| DaemonError::BadAddress {
                addr: arg.clone(),
                reason: "not a valid IP address".to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((addresses, port))
}
