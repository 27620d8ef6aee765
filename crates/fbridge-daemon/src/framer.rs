//! Line framing for daemon stdout
//!
//! Pipe reads hand us arbitrary chunks: a chunk may end in the middle of a
//! JSON payload or in the middle of a multi-byte UTF-8 sequence. The framer
//! keeps raw bytes until a `\n` arrives and only then decodes the line, so a
//! split code point is reassembled before decoding.

/// Accumulates byte chunks and yields complete lines
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Bytes received after the last newline
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the complete lines it finished
    ///
    /// Lines are yielded lazily in arrival order. Each line has its `\n`
    /// and an optional trailing `\r` removed. Unterminated trailing bytes stay
    /// buffered for the next chunk.
    pub fn push(&mut self, chunk: &[u8]) -> Lines<'_> {
        self.buffer.extend_from_slice(chunk);
        Lines { framer: self }
    }

    /// Flush the unterminated remainder at end of stream
    ///
    /// Returns `None` if nothing is buffered.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        Some(decode(&rest))
    }

    /// Number of bytes waiting for a terminator
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    fn next_line(&mut self) -> Option<String> {
        let newline = self.buffer.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buffer.drain(..=newline).collect();
        Some(decode(&line[..newline]))
    }
}

/// Iterator over the complete lines of a [`LineFramer`]
///
/// Dropping the iterator early leaves the remaining complete lines in the
/// framer; they are returned by the next `push`.
#[derive(Debug)]
pub struct Lines<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.framer.next_line()
    }
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
