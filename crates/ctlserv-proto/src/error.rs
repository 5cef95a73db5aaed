use thiserror::Error;

/// Protocol-level failures. Every variant is fatal to the connection it
/// occurred on; none of them is reported back to the client as a status
/// line.
#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("line buffer exhausted ({capacity} bytes) before delimiter")]
    BufferExhausted { capacity: usize },

    #[error("connection closed by peer before delimiter")]
    ConnectionClosed,

    #[error("empty command segment")]
    EmptyCommand,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("reply buffer exhausted ({capacity} bytes)")]
    ReplyOverflow { capacity: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<nix::errno::Errno> for ProtoError {
    fn from(errno: nix::errno::Errno) -> Self {
        ProtoError::Io(std::io::Error::from(errno))
    }
}
