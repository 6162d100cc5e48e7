//! Per-connection session state: the bound user (if any), the inbound request
//! queue the dispatcher drains, and the outbound reply queue the wire framer
//! flushes.

use crate::framer::{LineReader, LineWriter};
use mio::net::TcpStream;
use mio::Token;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::str::Utf8Error;

pub struct Session {
    pub token: Token,
    pub stream: TcpStream,
    pub peer_addr: SocketAddr,
    pub user: Option<String>,
    pub inbound: VecDeque<String>,
    reader: LineReader,
    writer: LineWriter,
    /// Whether WRITE interest is currently registered with the poller.
    /// Invariant: this is only ever true while `writer` is non-empty.
    pub write_registered: bool,
}

impl Session {
    pub fn new(token: Token, stream: TcpStream, peer_addr: SocketAddr) -> Session {
        Session {
            token,
            stream,
            peer_addr,
            user: None,
            inbound: VecDeque::new(),
            reader: LineReader::new(),
            writer: LineWriter::new(),
            write_registered: false,
        }
    }

    /// Read up to 1024 bytes and frame them into `inbound`. Returns `Ok(true)`
    /// if the peer closed the connection (0-byte read), `Ok(false)` otherwise.
    /// An undecodable chunk is reported but does not close the session.
    pub fn read_once(&mut self) -> io::Result<ReadOutcome> {
        use io::Read;

        let mut buf = [0u8; 1024];
        let n = self.stream.read(&mut buf)?;
        if n == 0 {
            return Ok(ReadOutcome::Closed);
        }

        match self.reader.feed(&buf[..n]) {
            Ok(lines) => {
                self.inbound.extend(lines);
                Ok(ReadOutcome::Read)
            }
            Err(err) => Ok(ReadOutcome::InvalidUtf8(err)),
        }
    }

    pub fn enqueue_reply(&mut self, line: String) {
        self.writer.push(line);
    }

    pub fn wants_write(&self) -> bool {
        !self.writer.is_empty()
    }

    pub fn flush_writes(&mut self) -> io::Result<()> {
        self.writer.flush(&mut self.stream)
    }
}

pub enum ReadOutcome {
    Read,
    Closed,
    InvalidUtf8(Utf8Error),
}
