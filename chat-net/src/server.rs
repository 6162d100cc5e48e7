//! Connection multiplexer: the single-threaded, non-blocking event loop that
//! accepts sockets, drives reads/writes off a readiness selector, drains each
//! session's dispatcher and honors graceful shutdown.

use crate::registry::channel::ChannelRegistry;
use crate::registry::user::UserRegistry;
use crate::session::{ReadOutcome, Session};
use chat_flux::error::ChatError;
use chat_flux::logging::{debug, info, warn, Logger};
use hashbrown::HashMap;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// The readiness selector polls with this timeout, which doubles as the
/// granularity for shutdown responsiveness: after an interrupt, the server is
/// guaranteed to notice within one tick.
const POLL_TIMEOUT: Duration = Duration::from_secs(1);
const LISTENER_TOKEN: Token = Token(0);

pub struct ChatServer {
    poll: Poll,
    listener: TcpListener,
    pub(crate) sessions: HashMap<Token, Session>,
    next_token: usize,
    pub(crate) users: UserRegistry,
    pub(crate) channels: ChannelRegistry,
    pub(crate) log: Logger,
}

impl ChatServer {
    pub fn bind(addr: SocketAddr, log: Logger) -> Result<ChatServer, ChatError> {
        let mut listener = TcpListener::bind(addr).map_err(|source| ChatError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let poll = Poll::new().map_err(|source| ChatError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)
            .map_err(|source| ChatError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        info!(log, "listening"; "addr" => addr.to_string());

        Ok(ChatServer {
            poll,
            listener,
            sessions: HashMap::new(),
            next_token: 1,
            users: UserRegistry::new(),
            channels: ChannelRegistry::new(),
            log,
        })
    }

    /// The address actually bound (useful when `bind` was asked for port 0).
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the event loop until `shutdown` is observed set. Returns once the
    /// listener and every session socket have been torn down.
    pub fn run(&mut self, shutdown: &AtomicBool) -> io::Result<()> {
        let mut events = Events::with_capacity(1024);

        loop {
            match self.poll.poll(&mut events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            let tokens: Vec<(Token, bool, bool)> = events
                .iter()
                .map(|e| (e.token(), e.is_readable(), e.is_writable()))
                .collect();

            for (token, readable, writable) in tokens {
                if token == LISTENER_TOKEN {
                    self.accept_all();
                    continue;
                }
                if readable {
                    self.handle_readable(token);
                }
                if writable {
                    self.handle_writable(token);
                }
            }

            self.drain_dispatch();
            self.sync_write_interest();

            if shutdown.load(Ordering::Relaxed) {
                break;
            }
        }

        self.shutdown_all();
        Ok(())
    }

    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let token = Token(self.next_token);
                    self.next_token += 1;

                    if let Err(err) = self
                        .poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE)
                    {
                        warn!(self.log, "failed to register new connection"; "err" => err.to_string());
                        continue;
                    }

                    info!(self.log, "accepted connection"; "addr" => addr.to_string());
                    self.sessions.insert(token, Session::new(token, stream, addr));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(self.log, "accept failed"; "err" => e.to_string());
                    break;
                }
            }
        }
    }

    fn handle_readable(&mut self, token: Token) {
        loop {
            let outcome = match self.sessions.get_mut(&token) {
                Some(session) => session.read_once(),
                None => return,
            };

            match outcome {
                Ok(ReadOutcome::Read) => continue,
                Ok(ReadOutcome::Closed) => {
                    self.close_session(token, "peer closed");
                    return;
                }
                Ok(ReadOutcome::InvalidUtf8(err)) => {
                    if let Some(session) = self.sessions.get(&token) {
                        warn!(self.log, "discarding undecodable read";
                            "addr" => session.peer_addr.to_string(), "err" => err.to_string());
                    }
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    self.close_session(token, &e.to_string());
                    return;
                }
            }
        }
    }

    fn handle_writable(&mut self, token: Token) {
        let result = match self.sessions.get_mut(&token) {
            Some(session) => session.flush_writes(),
            None => return,
        };
        if let Err(e) = result {
            self.close_session(token, &e.to_string());
        }
    }

    /// Drain every live session's inbound queue through the dispatcher. A
    /// session's own handler may enqueue replies on *other* sessions (SAY's
    /// broadcast), so this always runs to a fixed point over a token snapshot
    /// taken up front rather than interleaving with readiness handling.
    fn drain_dispatch(&mut self) {
        let tokens: Vec<Token> = self.sessions.keys().copied().collect();
        for token in tokens {
            loop {
                let line = match self.sessions.get_mut(&token) {
                    Some(session) => session.inbound.pop_front(),
                    None => break,
                };
                match line {
                    Some(line) => {
                        debug!(self.log, "dispatch"; "token" => format!("{token:?}"), "line" => &line);
                        self.dispatch_line(token, &line);
                    }
                    None => break,
                }
            }
        }
    }

    /// Ensure WRITE interest is registered for exactly the sessions that
    /// currently have something queued (invariant 4 in §3).
    fn sync_write_interest(&mut self) {
        let tokens: Vec<Token> = self.sessions.keys().copied().collect();
        for token in tokens {
            let (wants_write, currently_registered) = {
                let session = &self.sessions[&token];
                (session.wants_write(), session.write_registered)
            };

            if wants_write == currently_registered {
                continue;
            }

            let interest = if wants_write {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };

            let session = self.sessions.get_mut(&token).unwrap();
            if self
                .poll
                .registry()
                .reregister(&mut session.stream, token, interest)
                .is_ok()
            {
                session.write_registered = wants_write;
            }
        }
    }

    fn close_session(&mut self, token: Token, reason: &str) {
        if let Some(mut session) = self.sessions.remove(&token) {
            if let Some(name) = session.user.take() {
                self.users.logout(&name);
            }
            let _ = self.poll.registry().deregister(&mut session.stream);
            info!(self.log, "closing connection"; "addr" => session.peer_addr.to_string(), "reason" => reason);
        }
    }

    fn shutdown_all(&mut self) {
        info!(self.log, "shutting down");
        let tokens: Vec<Token> = self.sessions.keys().copied().collect();
        for token in tokens {
            self.close_session(token, "server shutdown");
        }
        let _ = self.poll.registry().deregister(&mut self.listener);
    }
}
