//! The command set, registered as one static table.
//!
//! Handlers are thin: argument validation, one call into the owning
//! module, an errno-style result code. Anything a handler cannot
//! recover from comes back as [`crate::executor::RC_FATAL`].

mod basic;
mod control;
mod handoff;
mod killctl;
mod lockctl;

use crate::fdpass;
use crate::registry::{CommandDescriptor, Registry};

pub static REGISTRY: Registry = Registry::new(COMMANDS);

static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "echo",
        handler: basic::echo,
        cleanup: None,
    },
    CommandDescriptor {
        name: "noop",
        handler: basic::noop,
        cleanup: None,
    },
    CommandDescriptor {
        name: "sleep",
        handler: basic::sleep,
        cleanup: None,
    },
    CommandDescriptor {
        name: "mode",
        handler: control::mode,
        cleanup: None,
    },
    CommandDescriptor {
        name: "detach",
        handler: control::detach,
        cleanup: None,
    },
    CommandDescriptor {
        name: "reset",
        handler: control::reset,
        cleanup: None,
    },
    CommandDescriptor {
        name: "lock",
        handler: lockctl::lock,
        cleanup: None,
    },
    CommandDescriptor {
        name: "unlock",
        handler: lockctl::unlock,
        cleanup: None,
    },
    CommandDescriptor {
        name: "kill",
        handler: killctl::kill,
        cleanup: None,
    },
    CommandDescriptor {
        name: "recv",
        handler: handoff::recv,
        cleanup: Some(fdpass::sweep),
    },
    CommandDescriptor {
        name: "send",
        handler: handoff::send,
        cleanup: None,
    },
];
