//! The command registry: a static table mapping command names to
//! handlers, fixed before the first fork and shared read-only by every
//! session process. No dynamic registration, no plugin loading.

use crate::session::Session;

/// Handler signature shared by every command.
///
/// `args[0]` is the command name. Normal results are 0..=255; the
/// sentinel [`crate::executor::RC_FATAL`] marks the session as
/// unrecoverable.
pub type CommandHandler = fn(&[String], &mut Session) -> i32;

/// Global cleanup hook, run by emergency cleanup. Must not depend on
/// per-session state; the pointers are fixed at compile time so the
/// hooks are safe to run from any process at any point.
pub type CleanupHook = fn();

#[derive(Debug)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub handler: CommandHandler,
    pub cleanup: Option<CleanupHook>,
}

pub struct Registry {
    commands: &'static [CommandDescriptor],
}

impl Registry {
    pub const fn new(commands: &'static [CommandDescriptor]) -> Self {
        Self { commands }
    }

    /// Exact-name lookup.
    pub fn lookup(&self, name: &str) -> Option<&'static CommandDescriptor> {
        self.commands.iter().find(|d| d.name == name)
    }

    pub fn cleanup_hooks(&self) -> impl Iterator<Item = CleanupHook> + '_ {
        self.commands.iter().filter_map(|d| d.cleanup)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.iter().map(|d| d.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::REGISTRY;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for name in REGISTRY.names() {
            assert!(seen.insert(name), "duplicate command name: {name}");
        }
    }

    #[test]
    fn test_lookup_is_exact_match() {
        assert!(REGISTRY.lookup("echo").is_some());
        assert!(REGISTRY.lookup("ech").is_none());
        assert!(REGISTRY.lookup("echoo").is_none());
        assert!(REGISTRY.lookup("ECHO").is_none());
    }

    #[test]
    fn test_lookup_unknown_name() {
        assert!(REGISTRY.lookup("no-such-command").is_none());
    }

    #[test]
    fn test_cleanup_hooks_present() {
        assert!(REGISTRY.cleanup_hooks().count() >= 1);
    }
}
