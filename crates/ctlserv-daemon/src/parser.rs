//! Turns one received line into an ordered list of resolved commands.

use ctlserv_proto::{ProtoError, split_args, split_commands};

use crate::registry::{CommandDescriptor, Registry};

#[derive(Debug)]
pub struct ParsedCommand {
    pub args: Vec<String>,
    pub descriptor: &'static CommandDescriptor,
}

/// Commands in declaration order, which is also execution order.
/// Navigable both ways; never reordered or deduplicated.
#[derive(Debug)]
pub struct CommandList(Vec<ParsedCommand>);

impl CommandList {
    pub fn iter(&self) -> std::slice::Iter<'_, ParsedCommand> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ParsedCommand> {
        self.0.get(index)
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a ParsedCommand;
    type IntoIter = std::slice::Iter<'a, ParsedCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Parse a line of `;`-separated commands against the registry.
///
/// A segment with no arguments or an unresolvable name fails the whole
/// line; partial lists are never executed.
pub fn parse(line: &str, registry: &Registry) -> Result<CommandList, ProtoError> {
    let mut commands = Vec::new();
    for segment in split_commands(line) {
        let args = split_args(segment);
        let name = match args.first() {
            Some(name) => name,
            None => return Err(ProtoError::EmptyCommand),
        };
        let descriptor = registry
            .lookup(name)
            .ok_or_else(|| ProtoError::UnknownCommand(name.clone()))?;
        commands.push(ParsedCommand { args, descriptor });
    }
    Ok(CommandList(commands))
}
