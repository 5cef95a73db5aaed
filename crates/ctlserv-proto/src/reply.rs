//! Bounded accumulation of per-command status lines.

use std::io::Write;

use crate::error::ProtoError;

/// Accumulates `"<rc> <args>"` status lines up to a fixed capacity.
///
/// Flushing is write-and-shift: whatever the writer accepts is removed
/// from the front of the buffer, so a short write followed by a retry
/// only resends the remainder.
#[derive(Debug)]
pub struct ReplyBuffer {
    buf: Vec<u8>,
    capacity: usize,
}

impl ReplyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one status line. Fails if the line would push the buffer
    /// past its capacity; the caller must treat that as fatal.
    pub fn push_status(&mut self, rc: i32, args: &str) -> Result<(), ProtoError> {
        let line = format!("{rc} {args}\n");
        if self.buf.len() + line.len() > self.capacity {
            return Err(ProtoError::ReplyOverflow {
                capacity: self.capacity,
            });
        }
        self.buf.extend_from_slice(line.as_bytes());
        Ok(())
    }

    /// Write buffered bytes out, removing whatever was accepted.
    pub fn flush_to(&mut self, writer: &mut impl Write) -> Result<(), ProtoError> {
        while !self.buf.is_empty() {
            let written = writer.write(&self.buf)?;
            if written == 0 {
                return Err(ProtoError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "peer accepted no bytes",
                )));
            }
            self.buf.drain(..written);
        }
        writer.flush()?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }
}
