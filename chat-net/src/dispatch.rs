//! Command dispatcher and broadcast fan-out.
//!
//! Arity checking is a small descriptor table consulted generically, rather
//! than per-handler decorators — each verb still gets its own handler because
//! the *shape* of a reply (whether the channel name echoes back, whether
//! there's a reply at all) genuinely differs verb to verb.

use crate::server::ChatServer;
use chat_flux::logging::debug;
use mio::Token;

struct VerbSpec {
    min: usize,
    max: usize,
    requires_auth: bool,
}

const UNBOUNDED: usize = usize::MAX;

fn spec_for(verb: &str) -> Option<VerbSpec> {
    match verb {
        "REGISTER" => Some(VerbSpec { min: 2, max: 2, requires_auth: false }),
        "LOGIN" => Some(VerbSpec { min: 2, max: 2, requires_auth: false }),
        "CREATE" => Some(VerbSpec { min: 1, max: 1, requires_auth: true }),
        "JOIN" => Some(VerbSpec { min: 1, max: 1, requires_auth: true }),
        "SAY" => Some(VerbSpec { min: 2, max: UNBOUNDED, requires_auth: true }),
        "CHANNELS" => Some(VerbSpec { min: 0, max: 0, requires_auth: false }),
        _ => None,
    }
}

impl ChatServer {
    /// Tokenize, validate arity, dispatch and (for verbs that reply) enqueue
    /// the formatted result line on the originating session.
    pub(crate) fn dispatch_line(&mut self, token: Token, line: &str) {
        let mut tokens = line.split_whitespace();
        let verb = match tokens.next() {
            Some(verb) => verb,
            None => return, // empty/whitespace-only line: no reply, no crash
        };
        let args: Vec<&str> = tokens.collect();

        let spec = match spec_for(verb) {
            Some(spec) => spec,
            None => {
                self.reply(token, "RESULT ERROR unknown message type".to_string());
                return;
            }
        };

        if args.len() < spec.min {
            self.reply(token, format!("RESULT {verb} ERROR not enough arguments"));
            return;
        }
        if args.len() > spec.max {
            self.reply(token, format!("RESULT {verb} ERROR too many arguments"));
            return;
        }

        let reply = match verb {
            "REGISTER" => Some(self.handle_register(&args)),
            "LOGIN" => Some(self.handle_login(token, &args)),
            "CREATE" => Some(self.handle_create(token, &args)),
            "JOIN" => Some(self.handle_join(token, &args)),
            "SAY" => {
                self.handle_say(token, &args);
                None
            }
            "CHANNELS" => Some(self.handle_channels()),
            _ => unreachable!("spec_for only returns Some for known verbs"),
        };

        if let Some(reply) = reply {
            self.reply(token, reply);
        }
    }

    fn reply(&mut self, token: Token, line: String) {
        if let Some(session) = self.sessions.get_mut(&token) {
            session.enqueue_reply(line);
        }
    }

    fn current_user(&self, token: Token) -> Option<String> {
        self.sessions.get(&token).and_then(|s| s.user.clone())
    }

    fn handle_register(&mut self, args: &[&str]) -> String {
        let ok = self.users.register(args[0], args[1]);
        format!("RESULT REGISTER {}", ok as u8)
    }

    fn handle_login(&mut self, token: Token, args: &[&str]) -> String {
        // A session may only ever be bound to one user; a second LOGIN
        // attempt on an already-bound session is rejected up front so we
        // never ask the registry to double-bind a session to two names.
        if self.current_user(token).is_some() {
            return "RESULT LOGIN 0".to_string();
        }
        let ok = self.users.login(args[0], token, args[1]);
        if ok {
            if let Some(session) = self.sessions.get_mut(&token) {
                session.user = Some(args[0].to_string());
            }
        }
        format!("RESULT LOGIN {}", ok as u8)
    }

    fn handle_create(&mut self, token: Token, args: &[&str]) -> String {
        let name = args[0];
        if self.current_user(token).is_none() {
            return format!("RESULT CREATE {name} 0");
        }
        let ok = self.channels.create(name);
        format!("RESULT CREATE {name} {}", ok as u8)
    }

    fn handle_join(&mut self, token: Token, args: &[&str]) -> String {
        let name = args[0];
        let user = match self.current_user(token) {
            Some(user) => user,
            None => return format!("RESULT JOIN {name} 0"),
        };
        let ok = self.channels.add_member(name, &user);
        format!("RESULT JOIN {name} {}", ok as u8)
    }

    /// SAY never produces a reply, success or failure: unauthenticated
    /// sessions, unknown channels and non-members are all silent no-ops.
    fn handle_say(&mut self, token: Token, args: &[&str]) {
        let channel_name = args[0];
        let words = &args[1..];

        let user = match self.current_user(token) {
            Some(user) => user,
            None => return,
        };

        let is_member = self
            .channels
            .find(channel_name)
            .map(|channel| channel.members.contains(&user))
            .unwrap_or(false);
        if !is_member {
            return;
        }

        self.broadcast(&user, channel_name, words);
    }

    fn handle_channels(&mut self) -> String {
        format!("RESULT CHANNELS {}", self.channels.list_names().join(", "))
    }

    /// Push `RECV <user> <channel> <words...>` onto every current member's
    /// outbound queue, in channel-membership order, including the sayer's
    /// own session. Offline members (no bound session) are skipped silently.
    fn broadcast(&mut self, sayer: &str, channel_name: &str, words: &[&str]) {
        let line = format!("RECV {sayer} {channel_name} {}", words.join(" "));

        let members: Vec<String> = match self.channels.find(channel_name) {
            Some(channel) => channel.members.iter().cloned().collect(),
            None => return,
        };

        for member in members {
            if let Some(session_token) = self.users.find(&member).and_then(|u| u.bound_session) {
                debug!(self.log, "broadcast"; "to" => &member, "channel" => channel_name);
                self.reply(session_token, line.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatServer;
    use sloggers::terminal::{Destination, TerminalLoggerBuilder};
    use sloggers::types::Severity;
    use sloggers::Build;
    use std::net::SocketAddr;
    use std::sync::atomic::AtomicBool;

    fn test_logger() -> chat_flux::logging::Logger {
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(Severity::Critical);
        builder.destination(Destination::Stderr);
        builder.build().unwrap()
    }

    fn server() -> ChatServer {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        ChatServer::bind(addr, test_logger()).unwrap()
    }

    /// Attach a real (loopback) socket pair as session `token` and hand back
    /// the client end, so tests can read whatever the dispatcher replies.
    fn add_session(server: &mut ChatServer, token: Token) -> std::net::TcpStream {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let client = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server_std, addr) = listener.accept().unwrap();
        server_std.set_nonblocking(true).unwrap();
        let mio_stream = mio::net::TcpStream::from_std(server_std);
        server.sessions.insert(token, crate::session::Session::new(token, mio_stream, addr));
        client
    }

    fn read_reply(client: &mut std::net::TcpStream) -> String {
        use std::io::Read;
        client.set_nonblocking(false).unwrap();
        client
            .set_read_timeout(Some(std::time::Duration::from_millis(500)))
            .unwrap();
        let mut buf = [0u8; 1024];
        let n = client.read(&mut buf).unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn unknown_verb_reply_has_no_verb_echoed() {
        let mut srv = server();
        let mut client = add_session(&mut srv, Token(1));
        srv.dispatch_line(Token(1), "BOGUS");
        srv.sessions.get_mut(&Token(1)).unwrap().flush_writes().unwrap();
        assert_eq!(read_reply(&mut client), "RESULT ERROR unknown message type\n");
    }

    #[test]
    fn register_then_duplicate_register_flips_to_zero() {
        let mut srv = server();
        let mut client = add_session(&mut srv, Token(1));
        srv.dispatch_line(Token(1), "REGISTER alice hunter2");
        srv.dispatch_line(Token(1), "REGISTER alice hunter2");
        srv.sessions.get_mut(&Token(1)).unwrap().flush_writes().unwrap();
        assert_eq!(read_reply(&mut client), "RESULT REGISTER 1\nRESULT REGISTER 0\n");
    }

    #[test]
    fn arity_error_echoes_verb() {
        let mut srv = server();
        let mut client = add_session(&mut srv, Token(1));
        srv.dispatch_line(Token(1), "REGISTER onlyone");
        srv.sessions.get_mut(&Token(1)).unwrap().flush_writes().unwrap();
        assert_eq!(read_reply(&mut client), "RESULT REGISTER ERROR not enough arguments\n");
    }

    #[test]
    fn say_never_replies_even_when_silently_dropped() {
        let mut srv = server();
        let mut client = add_session(&mut srv, Token(1));
        srv.dispatch_line(Token(1), "SAY nope hello");
        let result = srv.sessions.get_mut(&Token(1)).unwrap().flush_writes();
        assert!(result.is_ok());
        client.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 16];
        use std::io::Read;
        assert_eq!(client.read(&mut buf).unwrap_err().kind(), std::io::ErrorKind::WouldBlock);
    }

    #[test]
    fn say_broadcasts_to_every_member_including_sayer() {
        let mut srv = server();
        let mut alice = add_session(&mut srv, Token(1));
        let mut bob = add_session(&mut srv, Token(2));

        srv.dispatch_line(Token(1), "REGISTER alice pw");
        srv.dispatch_line(Token(1), "LOGIN alice pw");
        srv.dispatch_line(Token(2), "REGISTER bob pw");
        srv.dispatch_line(Token(2), "LOGIN bob pw");
        srv.dispatch_line(Token(1), "CREATE lobby");
        srv.dispatch_line(Token(1), "JOIN lobby");
        srv.dispatch_line(Token(2), "JOIN lobby");
        srv.dispatch_line(Token(1), "SAY lobby hello there");

        for token in [Token(1), Token(2)] {
            srv.sessions.get_mut(&token).unwrap().flush_writes().unwrap();
        }

        let alice_reply = read_reply(&mut alice);
        assert!(alice_reply.ends_with("RECV alice lobby hello there\n"));
        let bob_reply = read_reply(&mut bob);
        assert!(bob_reply.ends_with("RESULT JOIN lobby 1\nRECV alice lobby hello there\n"));
    }

    #[test]
    fn channels_are_sorted_and_comma_separated() {
        let mut srv = server();
        srv.channels.create("zeta");
        srv.channels.create("alpha");
        assert_eq!(srv.handle_channels(), "RESULT CHANNELS alpha, zeta");
    }

    #[test]
    fn channels_empty_registry_has_trailing_space() {
        let mut srv = server();
        assert_eq!(srv.handle_channels(), "RESULT CHANNELS ");
    }
}
