//! Fatal startup errors get their own type so `main` can map them to a
//! nonzero exit code; per-connection I/O failures are handled where they
//! occur (see `chat-net::server`) rather than threaded through here.

use std::fmt;
use std::io;
use std::net::AddrParseError;

/// Errors that abort the process before (or while) bringing up the listener.
#[derive(Debug)]
pub enum ChatError {
    Bind { addr: String, source: io::Error },
    AddrParse(AddrParseError),
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::Bind { addr, source } => write!(f, "failed to bind {addr}: {source}"),
            ChatError::AddrParse(err) => write!(f, "invalid listen address: {err}"),
        }
    }
}

impl std::error::Error for ChatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChatError::Bind { source, .. } => Some(source),
            ChatError::AddrParse(err) => Some(err),
        }
    }
}

impl From<AddrParseError> for ChatError {
    #[inline]
    fn from(err: AddrParseError) -> Self {
        ChatError::AddrParse(err)
    }
}
