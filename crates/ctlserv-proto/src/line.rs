//! Delimiter-bounded reads over a raw stream socket.
//!
//! The reader never consumes past the delimiter: it peeks a small window
//! with `MSG_PEEK`, scans it, and only consumes up to (and including) the
//! delimiter once found. Bytes after the delimiter stay queued in the
//! kernel for whatever the command handlers do with the socket next.

use std::os::fd::{AsFd, AsRawFd};

use nix::sys::socket::{MsgFlags, recv, setsockopt, sockopt};

use crate::error::ProtoError;

/// Wire delimiter for command lines.
pub const DELIMITER: u8 = b'\n';

/// Peek window size. Bounds how much of the kernel buffer is inspected
/// per iteration; the consumed-byte count is independent of this value.
pub const PEEK_CHUNK: usize = 16;

/// Read one delimiter-terminated line into `buf`.
///
/// Returns the number of bytes consumed, including the delimiter.
/// Fails with [`ProtoError::BufferExhausted`] if `buf` fills up before a
/// delimiter arrives, and [`ProtoError::ConnectionClosed`] on EOF.
pub fn read_line(sock: &impl AsFd, buf: &mut [u8], delimiter: u8) -> Result<usize, ProtoError> {
    read_line_chunked(sock, buf, delimiter, PEEK_CHUNK)
}

/// [`read_line`] with an explicit peek-window size.
pub fn read_line_chunked(
    sock: &impl AsFd,
    buf: &mut [u8],
    delimiter: u8,
    chunk: usize,
) -> Result<usize, ProtoError> {
    let fd = sock.as_fd().as_raw_fd();
    let chunk = chunk.max(1);
    let mut filled = 0usize;

    loop {
        if filled == buf.len() {
            return Err(ProtoError::BufferExhausted { capacity: buf.len() });
        }

        let window = chunk.min(buf.len() - filled);
        let peeked = recv(fd, &mut buf[filled..filled + window], MsgFlags::MSG_PEEK)?;
        if peeked == 0 {
            return Err(ProtoError::ConnectionClosed);
        }

        match buf[filled..filled + peeked].iter().position(|&b| b == delimiter) {
            Some(k) => {
                consume_exact(fd, &mut buf[filled..filled + k + 1])?;
                return Ok(filled + k + 1);
            }
            None => {
                consume_exact(fd, &mut buf[filled..filled + peeked])?;
                filled += peeked;
            }
        }
    }
}

/// Strip the delimiter, and a `\r` immediately before it, from a line
/// previously filled by [`read_line`].
pub fn line_payload(buf: &[u8], consumed: usize, delimiter: u8) -> &[u8] {
    let mut end = consumed;
    if end > 0 && buf[end - 1] == delimiter {
        end -= 1;
    }
    if end > 0 && buf[end - 1] == b'\r' {
        end -= 1;
    }
    &buf[..end]
}

/// Arrange for close() to abort the connection (RST) instead of
/// lingering, so a session dying mid-protocol looks like a reset to the
/// peer rather than a clean EOF.
pub fn set_abort_linger(sock: &impl AsFd) -> Result<(), ProtoError> {
    let linger = libc::linger {
        l_onoff: 1,
        l_linger: 0,
    };
    setsockopt(sock, sockopt::Linger, &linger)?;
    Ok(())
}

fn consume_exact(fd: i32, buf: &mut [u8]) -> Result<(), ProtoError> {
    let mut done = 0usize;
    while done < buf.len() {
        let n = recv(fd, &mut buf[done..], MsgFlags::empty())?;
        if n == 0 {
            return Err(ProtoError::ConnectionClosed);
        }
        done += n;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;

    fn pair_with(input: &[u8]) -> (UnixStream, UnixStream) {
        let (mut tx, rx) = UnixStream::pair().unwrap();
        tx.write_all(input).unwrap();
        (tx, rx)
    }

    #[test]
    fn test_read_line_consumes_through_delimiter() {
        let (_tx, rx) = pair_with(b"echo,hello\nrest");
        let mut buf = [0u8; 64];
        let consumed = read_line(&rx, &mut buf, DELIMITER).unwrap();
        assert_eq!(consumed, 11);
        assert_eq!(&buf[..consumed], b"echo,hello\n");
    }

    #[test]
    fn test_read_line_leaves_following_bytes_unread() {
        let (_tx, mut rx) = pair_with(b"first\nsecond");
        let mut buf = [0u8; 64];
        read_line(&rx, &mut buf, DELIMITER).unwrap();

        let mut rest = [0u8; 6];
        rx.read_exact(&mut rest).unwrap();
        assert_eq!(&rest, b"second");
    }

    #[test]
    fn test_read_line_chunk_size_invariance() {
        let input = b"a,somewhat,longer,command,line;noop,7\n";
        for chunk in [1, 2, 3, 5, 16, 64] {
            let (_tx, rx) = pair_with(input);
            let mut buf = [0u8; 128];
            let consumed = read_line_chunked(&rx, &mut buf, DELIMITER, chunk).unwrap();
            assert_eq!(consumed, input.len(), "chunk={chunk}");
            assert_eq!(&buf[..consumed], input, "chunk={chunk}");
        }
    }

    #[test]
    fn test_read_line_exact_capacity_without_delimiter_fails() {
        let (_tx, rx) = pair_with(&[b'x'; 32]);
        let mut buf = [0u8; 32];
        let err = read_line(&rx, &mut buf, DELIMITER).unwrap_err();
        assert!(matches!(err, ProtoError::BufferExhausted { capacity: 32 }));
    }

    #[test]
    fn test_read_line_delimiter_at_last_buffer_position_succeeds() {
        let mut input = vec![b'x'; 31];
        input.push(DELIMITER);
        let (_tx, rx) = pair_with(&input);
        let mut buf = [0u8; 32];
        let consumed = read_line(&rx, &mut buf, DELIMITER).unwrap();
        assert_eq!(consumed, 32);
    }

    #[test]
    fn test_read_line_eof_before_delimiter() {
        let (tx, rx) = pair_with(b"partial");
        drop(tx);
        let mut buf = [0u8; 64];
        let err = read_line(&rx, &mut buf, DELIMITER).unwrap_err();
        assert!(matches!(err, ProtoError::ConnectionClosed));
    }

    #[test]
    fn test_line_payload_strips_delimiter_and_cr() {
        let mut buf = [0u8; 16];
        buf[..7].copy_from_slice(b"echo\r\nx");
        assert_eq!(line_payload(&buf, 6, DELIMITER), b"echo");
    }

    #[test]
    fn test_line_payload_without_cr() {
        let mut buf = [0u8; 16];
        buf[..5].copy_from_slice(b"echo\n");
        assert_eq!(line_payload(&buf, 5, DELIMITER), b"echo");
    }

    #[test]
    fn test_line_payload_empty_line() {
        let buf = [DELIMITER; 1];
        assert_eq!(line_payload(&buf, 1, DELIMITER), b"");
    }

    #[test]
    fn test_set_abort_linger_accepts_stream_socket() {
        let (tx, _rx) = UnixStream::pair().unwrap();
        set_abort_linger(&tx).unwrap();
    }
}
