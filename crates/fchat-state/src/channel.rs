//! Joined channels.

use std::collections::BTreeSet;

use fchat_protocol::ChannelMode;
use serde::{Deserialize, Serialize};

/// A channel the client is in.
///
/// Channels are looked up case-insensitively by the store; `name` keeps
/// the spelling the server used when the channel was first seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Display name, or the `ADH-...` code of a private channel.
    pub name: String,
    pub title: String,
    pub description: String,
    /// Unknown until `ICH` or `RMO` arrives.
    pub mode: Option<ChannelMode>,
    pub owner: Option<String>,
    /// Channel operators in the order the server listed them.
    pub chanops: Vec<String>,
    pub members: BTreeSet<String>,
}

impl Channel {
    /// An empty channel named `name`.
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            description: String::new(),
            mode: None,
            owner: None,
            chanops: Vec::new(),
            members: BTreeSet::new(),
        }
    }

    /// The lowercase key the store files this channel under.
    pub fn key(&self) -> String {
        normalize(&self.name)
    }

    pub fn is_member(&self, character: &str) -> bool {
        self.members.contains(character)
    }

    pub fn is_chanop(&self, character: &str) -> bool {
        self.chanops.iter().any(|op| op == character)
    }

    /// Number of characters in the channel.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Applies a `COL` op list.
    ///
    /// The server puts the owner first. A channel without an owner gets an
    /// empty first entry, which is dropped; whoever is first afterwards is
    /// recorded as owner. If nobody is left, the known owner stays. An
    /// empty list leaves the channel untouched.
    pub(crate) fn set_chanops(&mut self, mut oplist: Vec<String>) {
        if oplist.is_empty() {
            return;
        }
        if oplist[0].is_empty() {
            oplist.remove(0);
        }
        if let Some(first) = oplist.first() {
            self.owner = Some(first.clone());
        }
        self.chanops = oplist;
    }

    pub(crate) fn add_chanop(&mut self, character: &str) {
        if !self.is_chanop(character) {
            self.chanops.push(character.to_string());
        }
    }

    pub(crate) fn remove_chanop(&mut self, character: &str) {
        self.chanops.retain(|op| op != character);
    }
}

/// Channel names compare case-insensitively.
pub(crate) fn normalize(name: &str) -> String {
    name.to_lowercase()
}
