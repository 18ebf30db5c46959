//! Length-prefixed reframing for stream transports: on the wire each frame
//! is `HEX_LEN ++ '.' ++ FRAME_BYTES`, `HEX_LEN` the lowercase hex ASCII
//! encoding of `len(FRAME_BYTES)` with no leading zeros.

use thiserror::Error;

/// Errors the stream reframer can hit while parsing a length prefix.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    /// The parsed length exceeds the configured ceiling. The caller must
    /// drop the whole connection, not just this one frame, since the
    /// stream's byte alignment with subsequent frames can no longer be
    /// trusted.
    #[error("frame length {0} exceeds the {1}-byte ceiling")]
    Oversize(usize, usize),
}

/// Prefix `frame_bytes` with its hex length, for writing onto a stream
/// socket.
#[must_use]
pub fn wrap_frame(frame_bytes: &[u8]) -> Vec<u8> {
    let mut out = format!("{:x}.", frame_bytes.len()).into_bytes();
    out.extend_from_slice(frame_bytes);
    out
}

/// Accumulates bytes read off a stream socket and yields complete frames as
/// they become available, across arbitrarily many `feed` calls regardless
/// of how the underlying reads happened to split the wire bytes.
///
/// A malformed (non-hex, non-UTF8) prefix is logged and discarded up to the
/// next `.`, so one corrupted frame doesn't wedge the whole connection. A
/// frame whose declared length exceeds `max_frame_len` is reported as
/// [`FramingError::Oversize`]; the caller is expected to close the
/// connection rather than keep reading from a buffer an attacker can no
/// longer be trusted to have aligned correctly.
#[derive(Debug, Default)]
pub struct Framer {
    buffer: Vec<u8>,
    max_frame_len: usize,
}

impl Framer {
    /// A framer with no buffered bytes, rejecting frames over
    /// `max_frame_len` bytes.
    #[must_use]
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_frame_len,
        }
    }

    /// Append `bytes` to the internal buffer and extract every complete
    /// frame now available, in wire order.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Vec<u8>>, FramingError> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        loop {
            let Some(dot) = self.buffer.iter().position(|&b| b == b'.') else {
                break;
            };
            let prefix = &self.buffer[..dot];
            let size = match std::str::from_utf8(prefix).ok().and_then(|s| usize::from_str_radix(s, 16).ok()) {
                Some(size) => size,
                None => {
                    tracing::warn!(
                        prefix = %String::from_utf8_lossy(prefix),
                        "malformed stream frame length prefix; discarding up to next '.'"
                    );
                    self.buffer.drain(..=dot);
                    continue;
                }
            };
            if size > self.max_frame_len {
                return Err(FramingError::Oversize(size, self.max_frame_len));
            }

            let available = self.buffer.len() - (dot + 1);
            if available < size {
                break;
            }

            let start = dot + 1;
            let end = start + size;
            frames.push(self.buffer[start..end].to_vec());
            self.buffer.drain(..end);
        }

        Ok(frames)
    }
}
