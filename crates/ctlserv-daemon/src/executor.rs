//! Walks a parsed command list, collecting and reporting status lines.

use ctlserv_proto::{ProtoError, ReplyBuffer, rebuild_args};
use tracing::debug;

use crate::parser::CommandList;
use crate::session::{Session, SessionMode, SocketHandle};

/// Sentinel result code, outside the normal 0..=255 range: the handler
/// could not complete and the session's state can no longer be trusted.
/// The remaining commands on the line are not run.
pub const RC_FATAL: i32 = -128;

#[derive(Debug, PartialEq, Eq)]
pub enum ExecOutcome {
    Completed,
    /// A handler returned [`RC_FATAL`]; the session must exit.
    Fatal,
}

/// Execute every command in list order.
///
/// Each command contributes one `"<rc> <args>"` line to the bounded
/// reply buffer; in Control mode with an attached socket the buffer is
/// flushed after every command. A nonzero rc never stops the walk —
/// only [`RC_FATAL`] or a protocol error does.
pub fn execute(session: &mut Session, list: &CommandList) -> Result<ExecOutcome, ProtoError> {
    let mut reply = ReplyBuffer::new(session.config.reply_capacity);

    for cmd in list {
        let rc = (cmd.descriptor.handler)(&cmd.args, session);
        debug!(command = cmd.descriptor.name, rc, "command finished");

        reply.push_status(rc, &rebuild_args(&cmd.args))?;
        if session.mode == SessionMode::Control {
            if let SocketHandle::Attached(stream) = &mut session.conn {
                reply.flush_to(stream)?;
            }
        }

        if rc == RC_FATAL {
            return Ok(ExecOutcome::Fatal);
        }
    }

    Ok(ExecOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::REGISTRY;
    use crate::parser::parse;
    use crate::test_support::{session_pair, test_config};
    use std::io::Read;

    #[test]
    fn test_reports_one_line_per_command() {
        let (_dir, config) = test_config();
        let (mut session, mut client) = session_pair(config);
        let list = parse("echo,foo;noop,7;noop,0", &REGISTRY).unwrap();

        let outcome = execute(&mut session, &list).unwrap();
        assert_eq!(outcome, ExecOutcome::Completed);

        drop(session);
        let mut out = Vec::new();
        client.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0 echo,foo\n7 noop,7\n0 noop,0\n");
    }

    #[test]
    fn test_nonzero_rc_does_not_stop_execution() {
        let (_dir, config) = test_config();
        let (mut session, mut client) = session_pair(config);
        // sleep with a bad argument reports 22 and the line continues.
        let list = parse("sleep,nope;echo,after", &REGISTRY).unwrap();

        let outcome = execute(&mut session, &list).unwrap();
        assert_eq!(outcome, ExecOutcome::Completed);

        drop(session);
        let mut out = Vec::new();
        client.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"22 sleep,nope\n0 echo,after\n");
    }

    #[test]
    fn test_fatal_rc_aborts_remaining_commands() {
        // recv cannot set up its rendezvous under an uncreatable
        // directory, which is an unrecoverable hand-off failure.
        let (_dir, config) = test_config();
        let config =
            config.with_runtime_dir(std::path::PathBuf::from("/proc/nonexistent/ctlserv"));
        let (mut session, mut client) = session_pair(config);
        let list = parse("recv,tok;echo,never", &REGISTRY).unwrap();

        let outcome = execute(&mut session, &list).unwrap();
        assert_eq!(outcome, ExecOutcome::Fatal);

        drop(session);
        let mut out = Vec::new();
        client.read_to_end(&mut out).unwrap();
        assert_eq!(out, format!("{RC_FATAL} recv,tok\n").as_bytes());
    }

    #[test]
    fn test_reply_overflow_is_a_protocol_error() {
        let (_dir, config) = test_config();
        let (mut session, _client) = session_pair(config.with_reply_capacity(8));
        session.mode = SessionMode::Binary;
        let list = parse("echo,aaaa;echo,bbbb", &REGISTRY).unwrap();

        let err = execute(&mut session, &list).unwrap_err();
        assert!(matches!(err, ProtoError::ReplyOverflow { .. }));
    }
}
