//! Blank-line framing of the chat stream.
//!
//! The buffer only knows about delimiters. It never looks inside a frame,
//! so a frame comes out identical however the transport cut it up.

/// Accumulates chunk text and hands back complete frames.
///
/// Invariant: between calls, `pending` is exactly the text received so far
/// that does not yet end in a delimiter.
#[derive(Debug, Default, Clone)]
pub struct FrameBuffer {
    pending: String,
    /// Byte offset in `pending` before which no delimiter can start
    scan_from: usize,
}

/// Find the earliest frame delimiter at or after `from`.
///
/// Returns the delimiter's start offset and length. `\n\n` and `\r\n\r\n`
/// are both accepted; they can never start at the same offset, so the
/// left-to-right scan is unambiguous.
fn find_delimiter(bytes: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' if bytes.get(i + 1) == Some(&b'\n') => return Some((i, 2)),
            b'\r' if bytes[i..].starts_with(b"\r\n\r\n") => return Some((i, 4)),
            _ => {}
        }
        i += 1;
    }
    None
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed, in order.
    ///
    /// The text after the last delimiter (possibly empty) stays buffered,
    /// even when the chunk ended exactly on a delimiter.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);

        let mut frames = Vec::new();
        let mut start = 0;
        let mut from = self.scan_from;
        while let Some((at, len)) = find_delimiter(self.pending.as_bytes(), from) {
            frames.push(self.pending[start..at].to_string());
            start = at + len;
            from = start;
        }

        if start > 0 {
            self.pending.drain(..start);
        }
        // A delimiter completed by the next chunk starts at most 3 bytes back.
        self.scan_from = self.pending.len().saturating_sub(3);

        frames
    }

    /// Drain the remainder at end of stream.
    ///
    /// Returns it as a final frame unless it is blank. Servers that close
    /// the connection without a trailing blank line still get their last
    /// frame delivered.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        self.scan_from = 0;
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }

    /// Text received but not yet part of a complete frame.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.scan_from = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_all(chunks: &[&str]) -> (Vec<String>, String) {
        let mut buffer = FrameBuffer::new();
        let mut frames = Vec::new();
        for chunk in chunks {
            frames.extend(buffer.push(chunk));
        }
        (frames, buffer.pending().to_string())
    }

    #[test]
    fn test_single_complete_frame() {
        let (frames, pending) = push_all(&["data: \"hi\"\n\n"]);
        assert_eq!(frames, vec!["data: \"hi\""]);
        assert_eq!(pending, "");
    }

    #[test]
    fn test_incomplete_frame_is_rebuffered() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push("event: sources\nda").is_empty());
        assert_eq!(buffer.pending(), "event: sources\nda");
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let (frames, pending) = push_all(&["data: a\n", "\ndata: b\n", "\n"]);
        assert_eq!(frames, vec!["data: a", "data: b"]);
        assert_eq!(pending, "");
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let (frames, pending) = push_all(&["data: 1\n\ndata: 2\n\ndata: 3"]);
        assert_eq!(frames, vec!["data: 1", "data: 2"]);
        assert_eq!(pending, "data: 3");
    }

    #[test]
    fn test_crlf_delimiter() {
        let (frames, _) = push_all(&["data: a\r\n\r", "\ndata: b\r\n\r\n"]);
        assert_eq!(frames, vec!["data: a", "data: b"]);
    }

    #[test]
    fn test_mixed_delimiters_take_earliest() {
        let (frames, _) = push_all(&["data: a\n\ndata: b\r\n\r\ndata: c\n\n"]);
        assert_eq!(frames, vec!["data: a", "data: b", "data: c"]);
    }

    #[test]
    fn test_empty_frames_between_delimiters() {
        let (frames, _) = push_all(&["\n\n\n\ndata: x\n\n"]);
        assert_eq!(frames, vec!["", "", "data: x"]);
    }

    #[test]
    fn test_every_single_split_matches_whole() {
        let stream = concat!(
            "event: sources\n",
            "data: [{\"filename\":\"a.pdf\",\"score\":0.9,\"preview\":\"x\"}]\n\n",
            "data: \"Hel\"\n\n",
            "data: \"lo\"\r\n\r\n",
            "data: [DONE]\n\n",
        );
        let (expected, _) = push_all(&[stream]);
        for split in 0..=stream.len() {
            let (frames, pending) = push_all(&[&stream[..split], &stream[split..]]);
            assert_eq!(frames, expected, "split at {}", split);
            assert_eq!(pending, "");
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let stream = "data: \"日本語\"\n\nevent: title\ndata: x\n\n";
        let (expected, _) = push_all(&[stream]);
        let chars: Vec<String> = stream.chars().map(String::from).collect();
        let refs: Vec<&str> = chars.iter().map(String::as_str).collect();
        let (frames, _) = push_all(&refs);
        assert_eq!(frames, expected);
    }

    #[test]
    fn test_finish_returns_unterminated_frame() {
        let mut buffer = FrameBuffer::new();
        buffer.push("data: \"tail\"");
        assert_eq!(buffer.finish().as_deref(), Some("data: \"tail\""));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_finish_ignores_whitespace() {
        let mut buffer = FrameBuffer::new();
        buffer.push("data: x\n\n\n");
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_reset_clears_pending() {
        let mut buffer = FrameBuffer::new();
        buffer.push("data: partial");
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.push("data: y\n\n"), vec!["data: y"]);
    }
}
