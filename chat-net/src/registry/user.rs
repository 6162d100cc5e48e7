//! Process-wide user registry: a flat, name-keyed collection with a
//! non-owning back-reference to whichever session is currently logged in
//! (teardown always clears this before the session drops).

use chat_flux::credential::{self, Hash, Salt};
use hashbrown::HashMap;
use mio::Token;

pub struct User {
    pub name: String,
    salt: Salt,
    hash: Hash,
    pub bound_session: Option<Token>,
}

impl User {
    #[inline]
    pub fn is_logged_in(&self) -> bool {
        self.bound_session.is_some()
    }
}

#[derive(Default)]
pub struct UserRegistry {
    users: HashMap<String, User>,
}

impl UserRegistry {
    pub fn new() -> UserRegistry {
        UserRegistry { users: HashMap::new() }
    }

    /// Register a brand new user. Returns `false` if the name is already taken.
    /// Does not log the new user in — a subsequent LOGIN is required.
    pub fn register(&mut self, name: &str, password: &str) -> bool {
        if self.users.contains_key(name) {
            return false;
        }
        let (salt, hash) = credential::make_credential(password);
        self.users.insert(
            name.to_string(),
            User {
                name: name.to_string(),
                salt,
                hash,
                bound_session: None,
            },
        );
        true
    }

    pub fn find(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    /// Bind `session` to `name` iff the user exists, isn't already bound, and
    /// `password` verifies. A double-login attempt returns `false` without
    /// touching the password check — it must never become a password oracle.
    pub fn login(&mut self, name: &str, session: Token, password: &str) -> bool {
        let user = match self.users.get_mut(name) {
            Some(user) => user,
            None => return false,
        };
        if user.bound_session.is_some() {
            return false;
        }
        if !credential::verify(password, &user.salt, &user.hash) {
            return false;
        }
        user.bound_session = Some(session);
        true
    }

    /// Idempotent: clears the bound session if `name` is currently logged in.
    pub fn logout(&mut self, name: &str) {
        if let Some(user) = self.users.get_mut(name) {
            user.bound_session = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(n: usize) -> Token {
        Token(n)
    }

    #[test]
    fn register_rejects_duplicate_name() {
        let mut reg = UserRegistry::new();
        assert!(reg.register("alice", "hunter2"));
        assert!(!reg.register("alice", "different"));
    }

    #[test]
    fn login_requires_correct_password() {
        let mut reg = UserRegistry::new();
        reg.register("alice", "hunter2");
        assert!(!reg.login("alice", token(1), "wrong"));
        assert!(reg.login("alice", token(1), "hunter2"));
    }

    #[test]
    fn login_fails_silently_when_already_bound() {
        let mut reg = UserRegistry::new();
        reg.register("alice", "hunter2");
        assert!(reg.login("alice", token(1), "hunter2"));
        // Second login attempt, even with the right password, fails: one bound
        // session at a time. This must not leak anything about the password.
        assert!(!reg.login("alice", token(2), "hunter2"));
        assert_eq!(reg.find("alice").unwrap().bound_session, Some(token(1)));
    }

    #[test]
    fn logout_then_login_succeeds_again() {
        let mut reg = UserRegistry::new();
        reg.register("alice", "hunter2");
        reg.login("alice", token(1), "hunter2");
        reg.logout("alice");
        assert!(reg.login("alice", token(2), "hunter2"));
    }

    #[test]
    fn login_unknown_user_fails() {
        let mut reg = UserRegistry::new();
        assert!(!reg.login("nobody", token(1), "whatever"));
    }
}
