//! Text chunks from an open streaming response.
//!
//! `ChunkSource` is the only place transport bytes become text. UTF-8 is
//! decoded incrementally: a character split across two byte chunks is held
//! back until its remaining bytes arrive.

use futures_util::StreamExt;

use crate::traits::{ByteStream, HttpError};

/// Lazy, finite, non-restartable sequence of text chunks.
pub struct ChunkSource {
    inner: ByteStream,
    /// Bytes of a character whose tail has not arrived yet (at most 3)
    carry: Vec<u8>,
    finished: bool,
    bytes_read: u64,
}

impl ChunkSource {
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            carry: Vec::new(),
            finished: false,
            bytes_read: 0,
        }
    }

    /// Wait for the next chunk of text.
    ///
    /// Returns:
    /// - `Ok(Some(text))` - a non-empty chunk
    /// - `Ok(None)` - the body ended; every later call returns this too
    /// - `Err(error)` - the transport failed; the source is finished
    pub async fn next_chunk(&mut self) -> Result<Option<String>, HttpError> {
        loop {
            if self.finished {
                return Ok(None);
            }

            match self.inner.next().await {
                Some(Ok(bytes)) => {
                    self.bytes_read += bytes.len() as u64;
                    self.carry.extend_from_slice(&bytes);
                    let text = self.take_complete();
                    // A chunk holding only part of a character yields nothing yet
                    if !text.is_empty() {
                        return Ok(Some(text));
                    }
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(e);
                }
                None => {
                    self.finished = true;
                    if self.carry.is_empty() {
                        return Ok(None);
                    }
                    // Truncated character at end of body
                    let rest = std::mem::take(&mut self.carry);
                    return Ok(Some(String::from_utf8_lossy(&rest).into_owned()));
                }
            }
        }
    }

    /// Total bytes received from the transport so far.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode everything except an incomplete trailing character.
    fn take_complete(&mut self) -> String {
        let keep = incomplete_tail_len(&self.carry);
        let complete = self.carry.len() - keep;
        let text = String::from_utf8_lossy(&self.carry[..complete]).into_owned();
        self.carry.drain(..complete);
        text
    }
}

impl From<ByteStream> for ChunkSource {
    fn from(inner: ByteStream) -> Self {
        Self::new(inner)
    }
}

/// Length of a multi-byte sequence at the end of `bytes` that still needs
/// more bytes, or 0 if the buffer ends on a character boundary.
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    for back in 1..=len.min(3) {
        let byte = bytes[len - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            // continuation byte, keep looking for the lead
            continue;
        }
        let needed = if byte & 0b1110_0000 == 0b1100_0000 {
            2
        } else if byte & 0b1111_0000 == 0b1110_0000 {
            3
        } else if byte & 0b1111_1000 == 0b1111_0000 {
            4
        } else {
            1
        };
        return if needed > back { back } else { 0 };
    }
    0
}
