//! Wire framer: splits inbound bytes into newline-terminated request lines
//! and pre-encodes outbound reply lines so partial writes can be retried.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::str;

/// Accumulates bytes read off the wire and yields complete request lines.
#[derive(Default)]
pub struct LineReader {
    buf: String,
}

impl LineReader {
    pub fn new() -> LineReader {
        LineReader { buf: String::new() }
    }

    /// Feed a chunk of freshly-read bytes. On success, returns the complete
    /// lines found (in order); any trailing partial line is held back in
    /// `self.buf` for the next call. Empty fragments (consecutive newlines)
    /// are dropped.
    ///
    /// If `bytes` is not valid UTF-8, the chunk is discarded entirely and the
    /// existing buffer is left untouched — the caller logs this and keeps the
    /// connection open, it is not a fatal error.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<String>, str::Utf8Error> {
        let text = str::from_utf8(bytes)?;
        self.buf.push_str(text);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.find('\n') {
            let line: String = self.buf.drain(..=pos).collect();
            let line = line[..line.len() - 1].to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }
}

/// Queues reply lines and flushes them to a writer, tolerating partial sends.
#[derive(Default)]
pub struct LineWriter {
    queue: VecDeque<String>,
    pending: Vec<u8>,
}

impl LineWriter {
    pub fn new() -> LineWriter {
        LineWriter {
            queue: VecDeque::new(),
            pending: Vec::new(),
        }
    }

    pub fn push(&mut self, line: String) {
        self.queue.push_back(line);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.pending.is_empty()
    }

    /// Drain as much of the queue as the writer will currently accept. A
    /// `WouldBlock` is not an error here: it just means "try again on the next
    /// write-ready event".
    pub fn flush<W: Write>(&mut self, stream: &mut W) -> io::Result<()> {
        loop {
            if self.pending.is_empty() {
                match self.queue.pop_front() {
                    Some(line) => {
                        self.pending.reserve(line.len() + 1);
                        self.pending.extend_from_slice(line.as_bytes());
                        self.pending.push(b'\n');
                    }
                    None => return Ok(()),
                }
            }

            match stream.write(&self.pending) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.pending.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}
