//! Process-wide channel registry. Membership uses an `IndexSet` so insertion
//! order is retained for deterministic broadcast fan-out, while `insert`
//! itself gives us JOIN's de-duplication for free.

use hashbrown::HashMap;
use indexmap::IndexSet;

pub struct Channel {
    pub name: String,
    pub members: IndexSet<String>,
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Channel>,
}

impl ChannelRegistry {
    pub fn new() -> ChannelRegistry {
        ChannelRegistry { channels: HashMap::new() }
    }

    /// Returns `false` if the name is already taken.
    pub fn create(&mut self, name: &str) -> bool {
        if self.channels.contains_key(name) {
            return false;
        }
        self.channels.insert(
            name.to_string(),
            Channel {
                name: name.to_string(),
                members: IndexSet::new(),
            },
        );
        true
    }

    pub fn find(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Returns `true` iff `user` was not already a member of `channel`.
    /// `false` if the channel doesn't exist.
    pub fn add_member(&mut self, channel: &str, user: &str) -> bool {
        match self.channels.get_mut(channel) {
            Some(channel) => channel.members.insert(user.to_string()),
            None => false,
        }
    }

    /// Channel names sorted ascending by code point.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }
}
