//! Digest accumulator for signed byte ranges.

use std::io::{self, Write};

/// Append-only sink collecting the bytes a signature covers.
///
/// A fresh accumulator is created for every signing or validation attempt
/// (see [`SignatureHandler::new_digest`](super::SignatureHandler::new_digest)).
/// The document writer feeds it the whole ByteRange; the signer then reads
/// the bytes back to compute the CMS message digest.
#[derive(Debug, Default, Clone)]
pub struct DigestAccumulator {
    buffer: Vec<u8>,
}

impl DigestAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Write for DigestAccumulator {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
