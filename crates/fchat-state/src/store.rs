//! The state store: every collection the server keeps us in sync with.
//!
//! The store knows nothing about frames or opcodes. It exposes one
//! mutator per kind of server event, taking the already-decoded payload,
//! and read accessors that borrow the current state. Whoever owns the
//! connection decides which mutator a frame maps to.
//!
//! # Idempotence
//!
//! Every mutator is add-if-absent / remove-if-present / overwrite, so
//! replaying an event is harmless. Events about characters or channels
//! the store has never heard of are dropped rather than creating
//! half-filled entries, except where noted.

use std::collections::{BTreeSet, HashMap};

use fchat_protocol::{
    ChannelCharacter, ChannelDescription, ChannelInit, ChannelJoin,
    ChannelLeave, ChanopList, CharacterList, CharacterOnline, IgnoreAction,
    IgnoreUpdate, ModeChange, ServerVariable, StatusChange, TypingChange,
};
use serde_json::Value;

use crate::channel::normalize;
use crate::{Channel, Character, StateConfig};

/// Local mirror of server state for one session.
///
/// Created empty, filled by server pushes after identification, and
/// [`reset`](Self::reset) whenever a new session starts.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    config: StateConfig,
    own_character: Option<String>,

    characters: HashMap<String, Character>,
    /// Keyed by lowercase channel name.
    channels: HashMap<String, Channel>,

    chatops: BTreeSet<String>,
    ignore_list: BTreeSet<String>,
    friends: BTreeSet<String>,

    server_variables: HashMap<String, Value>,
    user_count: Option<u64>,
}

impl StateStore {
    pub fn new(config: StateConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Forgets everything and starts over as `own_character`.
    ///
    /// The config survives; everything the server told us does not.
    pub fn reset(&mut self, own_character: Option<String>) {
        *self = Self {
            config: self.config.clone(),
            own_character,
            ..Self::default()
        };
    }

    /// The character this session identified as.
    pub fn own_character(&self) -> Option<&str> {
        self.own_character.as_deref()
    }

    fn is_own(&self, character: &str) -> bool {
        self.own_character.as_deref() == Some(character)
    }

    // -----------------------------------------------------------------------
    // Readers
    // -----------------------------------------------------------------------

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    /// All online characters, in no particular order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    /// Looks a channel up by name, ignoring case.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&normalize(name))
    }

    /// Joined channels, in no particular order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn chatops(&self) -> &BTreeSet<String> {
        &self.chatops
    }

    pub fn is_chatop(&self, character: &str) -> bool {
        self.chatops.contains(character)
    }

    pub fn ignore_list(&self) -> &BTreeSet<String> {
        &self.ignore_list
    }

    pub fn is_ignored(&self, character: &str) -> bool {
        self.ignore_list.contains(character)
    }

    pub fn friends(&self) -> &BTreeSet<String> {
        &self.friends
    }

    pub fn server_variable(&self, name: &str) -> Option<&Value> {
        self.server_variables.get(name)
    }

    pub fn server_variables(&self) -> &HashMap<String, Value> {
        &self.server_variables
    }

    /// Connected user count from the last `CON`.
    pub fn user_count(&self) -> Option<u64> {
        self.user_count
    }

    // -----------------------------------------------------------------------
    // Roster
    // -----------------------------------------------------------------------

    /// `LIS`: a batch of online characters. The server sends the full
    /// roster in several batches, so this adds to the roster rather than
    /// replacing it.
    pub fn load_characters(&mut self, list: CharacterList) {
        for (name, gender, status, status_message) in list.characters {
            let entry = self
                .characters
                .entry(name.clone())
                .or_insert_with(|| Character::new(name, "", ""));
            entry.gender = gender;
            entry.status = status;
            entry.status_message = status_message;
        }
        tracing::trace!(online = self.characters.len(), "roster batch loaded");
    }

    /// `NLN`: a character came online.
    pub fn character_online(&mut self, event: CharacterOnline) {
        let entry = self
            .characters
            .entry(event.identity.clone())
            .or_insert_with(|| Character::new(event.identity, "", ""));
        entry.gender = event.gender;
        entry.status = event.status;
        entry.status_message.clear();
    }

    /// `FLN`: a character went offline. Returns whether they were known.
    pub fn character_offline(&mut self, name: &str) -> bool {
        let known = self.characters.remove(name).is_some();
        if self.config.prune_offline_from_channels {
            for channel in self.channels.values_mut() {
                channel.members.remove(name);
            }
        }
        known
    }

    /// `STA`: status change. Ignored for characters not in the roster.
    pub fn status_changed(&mut self, event: StatusChange) {
        if let Some(character) = self.characters.get_mut(&event.character) {
            character.status = event.status;
            character.status_message = event.statusmsg;
        }
    }

    /// `TPN`: typing indicator. Ignored for characters not in the roster.
    pub fn typing_changed(&mut self, event: TypingChange) {
        if let Some(character) = self.characters.get_mut(&event.character) {
            character.typing = event.status;
        }
    }

    // -----------------------------------------------------------------------
    // Channels
    // -----------------------------------------------------------------------

    /// `JCH`: someone joined a channel.
    ///
    /// When it is us, the channel is created (or its title refreshed if we
    /// somehow already had it). Anyone else is added to the member set of
    /// a channel we are in.
    pub fn channel_joined(&mut self, event: ChannelJoin) {
        let key = normalize(&event.channel);
        let who = event.character.identity;

        if self.is_own(&who) {
            tracing::debug!(channel = %event.channel, "joined channel");
            self.channels
                .entry(key)
                .and_modify(|c| c.title = event.title.clone())
                .or_insert_with(|| Channel::new(event.channel, event.title));
        } else if let Some(channel) = self.channels.get_mut(&key) {
            channel.members.insert(who);
        }
    }

    /// `LCH`: someone left a channel. When it is us, the channel is gone.
    pub fn channel_left(&mut self, event: ChannelLeave) {
        let key = normalize(&event.channel);
        if self.is_own(&event.character) {
            if self.channels.remove(&key).is_some() {
                tracing::debug!(channel = %event.channel, "left channel");
            }
        } else if let Some(channel) = self.channels.get_mut(&key) {
            channel.members.remove(&event.character);
        }
    }

    /// `ICH`: initial member list and mode. Replaces the member set, and
    /// creates the channel if its `JCH` has not been seen.
    pub fn channel_initialized(&mut self, event: ChannelInit) {
        let channel = self
            .channels
            .entry(normalize(&event.channel))
            .or_insert_with(|| Channel::new(event.channel.clone(), event.channel));
        channel.members = event.users.into_iter().map(|u| u.identity).collect();
        channel.mode = Some(event.mode);
    }

    /// `CDS`: channel description.
    pub fn description_changed(&mut self, event: ChannelDescription) {
        if let Some(channel) = self.channel_mut(&event.channel) {
            channel.description = event.description;
        }
    }

    /// `COL`: full chanop list, owner first.
    pub fn chanops_listed(&mut self, event: ChanopList) {
        if let Some(channel) = self.channel_mut(&event.channel) {
            channel.set_chanops(event.oplist);
        }
    }

    /// `COA`: a chanop was added.
    pub fn chanop_added(&mut self, event: ChannelCharacter) {
        if let Some(channel) = self.channel_mut(&event.channel) {
            channel.add_chanop(&event.character);
        }
    }

    /// `COR`: a chanop was removed.
    pub fn chanop_removed(&mut self, event: ChannelCharacter) {
        if let Some(channel) = self.channel_mut(&event.channel) {
            channel.remove_chanop(&event.character);
        }
    }

    /// `CSO`: channel ownership changed hands.
    pub fn owner_changed(&mut self, event: ChannelCharacter) {
        if let Some(channel) = self.channel_mut(&event.channel) {
            channel.owner = Some(event.character);
        }
    }

    /// `RMO`: channel mode changed.
    pub fn mode_changed(&mut self, event: ModeChange) {
        if let Some(channel) = self.channel_mut(&event.channel) {
            channel.mode = Some(event.mode);
        }
    }

    fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&normalize(name))
    }

    // -----------------------------------------------------------------------
    // Lists and server info
    // -----------------------------------------------------------------------

    /// `ADL`: full chatop list.
    pub fn chatops_listed(&mut self, ops: Vec<String>) {
        self.chatops = ops.into_iter().collect();
    }

    /// `AOP`
    pub fn chatop_added(&mut self, character: String) {
        self.chatops.insert(character);
    }

    /// `DOP`
    pub fn chatop_removed(&mut self, character: &str) {
        self.chatops.remove(character);
    }

    /// `IGN`: `init` replaces the list, `add`/`delete` edit it. Other
    /// actions only exist client-side and change nothing.
    pub fn ignore_updated(&mut self, event: IgnoreUpdate) {
        match event.action {
            IgnoreAction::Init => {
                self.ignore_list = event.characters.into_iter().collect();
            }
            IgnoreAction::Add => {
                if let Some(character) = event.character {
                    self.ignore_list.insert(character);
                }
            }
            IgnoreAction::Delete => {
                if let Some(character) = event.character {
                    self.ignore_list.remove(&character);
                }
            }
            IgnoreAction::Notify | IgnoreAction::List => {}
        }
    }

    /// `FRL`: full friends list.
    pub fn friends_listed(&mut self, characters: Vec<String>) {
        self.friends = characters.into_iter().collect();
    }

    /// `VAR`: server variables are only ever added or overwritten.
    pub fn variable_set(&mut self, event: ServerVariable) {
        self.server_variables.insert(event.variable, event.value);
    }

    /// `CON`
    pub fn user_count_set(&mut self, count: u64) {
        self.user_count = Some(count);
    }
}

#[cfg(test)]
mod tests {
    use fchat_protocol::{ChannelMode, Identity, TypingStatus};
    use serde_json::json;

    use super::*;

    fn store_as(me: &str) -> StateStore {
        let mut store = StateStore::default();
        store.reset(Some(me.to_string()));
        store
    }

    fn online(name: &str) -> CharacterOnline {
        CharacterOnline {
            identity: name.into(),
            gender: "Female".into(),
            status: "online".into(),
        }
    }

    fn join(who: &str, channel: &str) -> ChannelJoin {
        ChannelJoin {
            character: Identity {
                identity: who.into(),
            },
            channel: channel.into(),
            title: channel.into(),
        }
    }

    #[test]
    fn test_reset_keeps_config_drops_state() {
        let mut store = StateStore::new(StateConfig {
            prune_offline_from_channels: true,
        });
        store.character_online(online("Bob"));
        store.user_count_set(4);

        store.reset(Some("Me".into()));

        assert!(store.config().prune_offline_from_channels);
        assert_eq!(store.own_character(), Some("Me"));
        assert_eq!(store.character_count(), 0);
        assert_eq!(store.user_count(), None);
    }

    #[test]
    fn test_load_characters_adds_to_roster() {
        let mut store = store_as("Me");
        store.character_online(online("Ann"));
        store.load_characters(CharacterList {
            characters: vec![(
                "Bob".into(),
                "Male".into(),
                "busy".into(),
                "brb".into(),
            )],
        });

        assert_eq!(store.character_count(), 2);
        let bob = store.character("Bob").unwrap();
        assert_eq!(bob.status, "busy");
        assert_eq!(bob.status_message, "brb");
    }

    #[test]
    fn test_character_online_twice_is_one_entry() {
        let mut store = store_as("Me");
        store.character_online(online("Bob"));
        store.character_online(online("Bob"));
        assert_eq!(store.character_count(), 1);
    }

    #[test]
    fn test_status_changed_unknown_character_is_noop() {
        let mut store = store_as("Me");
        store.status_changed(StatusChange {
            status: "away".into(),
            character: "Ghost".into(),
            statusmsg: String::new(),
        });
        store.typing_changed(TypingChange {
            character: "Ghost".into(),
            status: TypingStatus::Typing,
        });
        assert!(store.character("Ghost").is_none());
    }

    #[test]
    fn test_typing_changed_known_character_updates() {
        let mut store = store_as("Me");
        store.character_online(online("Bob"));
        store.typing_changed(TypingChange {
            character: "Bob".into(),
            status: TypingStatus::Paused,
        });
        assert_eq!(store.character("Bob").unwrap().typing, TypingStatus::Paused);
    }

    #[test]
    fn test_channel_left_self_removes_channel() {
        let mut store = store_as("Me");
        store.channel_joined(join("Me", "Frontpage"));
        store.channel_left(ChannelLeave {
            channel: "FRONTPAGE".into(),
            character: "Me".into(),
        });
        assert!(store.channel("Frontpage").is_none());
    }

    #[test]
    fn test_channel_initialized_replaces_members_and_sets_mode() {
        let mut store = store_as("Me");
        store.channel_joined(join("Me", "Frontpage"));
        store.channel_joined(join("Old", "Frontpage"));

        store.channel_initialized(ChannelInit {
            users: vec![
                Identity {
                    identity: "Me".into(),
                },
                Identity {
                    identity: "Ann".into(),
                },
            ],
            channel: "Frontpage".into(),
            mode: ChannelMode::Both,
        });

        let channel = store.channel("frontpage").unwrap();
        assert!(!channel.is_member("Old"));
        assert!(channel.is_member("Ann"));
        assert_eq!(channel.mode, Some(ChannelMode::Both));
    }

    #[test]
    fn test_ignore_updated_init_add_delete() {
        let mut store = store_as("Me");
        store.ignore_updated(IgnoreUpdate {
            action: IgnoreAction::Init,
            characters: vec!["A".into(), "B".into()],
            character: None,
        });
        store.ignore_updated(IgnoreUpdate {
            action: IgnoreAction::Add,
            characters: Vec::new(),
            character: Some("C".into()),
        });
        store.ignore_updated(IgnoreUpdate {
            action: IgnoreAction::Delete,
            characters: Vec::new(),
            character: Some("A".into()),
        });

        let names: Vec<_> = store.ignore_list().iter().cloned().collect();
        assert_eq!(names, ["B", "C"]);
    }

    #[test]
    fn test_variable_set_overwrites() {
        let mut store = store_as("Me");
        store.variable_set(ServerVariable {
            variable: "chat_max".into(),
            value: json!(4096),
        });
        store.variable_set(ServerVariable {
            variable: "chat_max".into(),
            value: json!(8192),
        });
        assert_eq!(store.server_variable("chat_max"), Some(&json!(8192)));
    }

    #[test]
    fn test_chatop_added_and_removed() {
        let mut store = store_as("Me");
        store.chatops_listed(vec!["Admin".into()]);
        store.chatop_added("Mod".into());
        store.chatop_added("Mod".into());
        store.chatop_removed("Admin");

        assert!(store.is_chatop("Mod"));
        assert!(!store.is_chatop("Admin"));
        assert_eq!(store.chatops().len(), 1);
    }
}
