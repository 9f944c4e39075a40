//! Payload shapes for the frames the client acts on.
//!
//! Only commands that feed local state (or that the client must build
//! itself, like `IDN`) get a typed struct here. Everything else is handed
//! to callers as a raw [`serde_json::Value`] inside a [`Frame`].
//!
//! Field names follow the wire exactly, which is why some of them are
//! lowercase run-togethers like `statusmsg` and `oplist`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Opcode, ProtocolError};

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One decoded line from the wire.
///
/// `opcode` is kept as the raw three letters so frames with codes this
/// crate does not know about still reach raw-frame listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The three-letter command code.
    pub opcode: String,
    /// The JSON body, or an empty object for bare commands.
    pub payload: Value,
}

impl Frame {
    /// Creates a frame from its parts.
    pub fn new(opcode: impl Into<String>, payload: Value) -> Self {
        Self {
            opcode: opcode.into(),
            payload,
        }
    }

    /// The opcode as a known [`Opcode`], or `None` if it is not part of
    /// the protocol reference.
    pub fn command(&self) -> Option<Opcode> {
        self.opcode.parse().ok()
    }

    /// Deserializes the payload into a typed struct.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload).map_err(|source| ProtocolError::Payload {
            opcode: self.opcode.clone(),
            source,
        })
    }
}

// ---------------------------------------------------------------------------
// Enumerated wire values
// ---------------------------------------------------------------------------

/// A character's typing indicator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TypingStatus {
    /// Not typing.
    #[default]
    Clear,
    /// Actively typing.
    Typing,
    /// Started typing, then stopped.
    Paused,
}

/// What a channel accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Chat messages only.
    Chat,
    /// Roleplay ads only.
    Ads,
    /// Both chat and ads.
    Both,
}

/// The `action` field of an `IGN` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreAction {
    /// Full list replacement.
    Init,
    /// One name added.
    Add,
    /// One name removed.
    Delete,
    /// Tell a character they are ignored (outbound only).
    Notify,
    /// Ask for the list (outbound only).
    List,
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// The `IDN` identification request sent right after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identify {
    /// Always `"ticket"`.
    pub method: String,
    pub account: String,
    pub ticket: String,
    pub character: String,
    /// Client name.
    pub cname: String,
    /// Client version.
    pub cversion: String,
}

impl Identify {
    /// Builds a ticket-method identification.
    pub fn with_ticket(
        account: impl Into<String>,
        ticket: impl Into<String>,
        character: impl Into<String>,
        cname: impl Into<String>,
        cversion: impl Into<String>,
    ) -> Self {
        Self {
            method: "ticket".to_string(),
            account: account.into(),
            ticket: ticket.into(),
            character: character.into(),
            cname: cname.into(),
            cversion: cversion.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// `{ "identity": "Name" }`, used inside `JCH` and `ICH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub identity: String,
}

/// Any payload that is just `{ "character": "Name" }` (`FLN`, `AOP`,
/// `DOP`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRef {
    pub character: String,
}

/// `ERR`: the server rejected something.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    pub number: i64,
    pub message: String,
}

/// `VAR`: one server variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    pub variable: String,
    pub value: Value,
}

/// `CON`: how many characters are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCount {
    pub count: u64,
}

/// `LIS`: a batch of online characters as
/// `[name, gender, status, statusmsg]` tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterList {
    pub characters: Vec<(String, String, String, String)>,
}

/// `NLN`: a character came online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterOnline {
    pub identity: String,
    pub gender: String,
    pub status: String,
}

/// `STA`: a character changed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: String,
    pub character: String,
    #[serde(default)]
    pub statusmsg: String,
}

/// `TPN`: a character's typing indicator changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingChange {
    pub character: String,
    pub status: TypingStatus,
}

/// `FRL`: the full friends list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendList {
    pub characters: Vec<String>,
}

/// `IGN`: ignore list update. `init` carries `characters`; `add` and
/// `delete` carry `character`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreUpdate {
    pub action: IgnoreAction,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub character: Option<String>,
}

/// `ADL`: the full chatop list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatopList {
    pub ops: Vec<String>,
}

/// `JCH`: someone (maybe us) joined a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelJoin {
    pub character: Identity,
    pub channel: String,
    #[serde(default)]
    pub title: String,
}

/// `LCH`: someone (maybe us) left a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLeave {
    pub channel: String,
    pub character: String,
}

/// `ICH`: initial member list and mode, sent after we join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInit {
    pub users: Vec<Identity>,
    pub channel: String,
    pub mode: ChannelMode,
}

/// `CDS`: channel description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelDescription {
    pub channel: String,
    pub description: String,
}

/// `COL`: the channel's operator list. The first entry is the owner, or
/// an empty string when the channel has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChanopList {
    pub channel: String,
    pub oplist: Vec<String>,
}

/// `COA`, `COR`, `CSO`: a character/channel pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCharacter {
    pub character: String,
    pub channel: String,
}

/// `RMO`: channel mode change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeChange {
    pub mode: ChannelMode,
    pub channel: String,
}

/// `CIU`: we were invited to a channel. `name` is the channel key,
/// `title` its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInvite {
    pub sender: String,
    pub title: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_as_reads_typed_struct() {
        let frame = Frame::new(
            "NLN",
            json!({"identity": "Bob", "gender": "Male", "status": "online"}),
        );
        let nln: CharacterOnline = frame.payload_as().unwrap();
        assert_eq!(nln.identity, "Bob");
        assert_eq!(nln.gender, "Male");
    }

    #[test]
    fn test_payload_as_missing_field_names_the_opcode() {
        let frame = Frame::new("FLN", json!({}));
        let err = frame.payload_as::<CharacterRef>().unwrap_err();
        assert!(matches!(
            &err,
            ProtocolError::Payload { opcode, .. } if opcode == "FLN"
        ));
    }

    #[test]
    fn test_command_known_and_unknown() {
        assert_eq!(Frame::new("PIN", json!({})).command(), Some(Opcode::Pin));
        assert_eq!(Frame::new("XYZ", json!({})).command(), None);
    }

    #[test]
    fn test_character_list_reads_tuples() {
        let list: CharacterList = serde_json::from_value(json!({
            "characters": [["Ann", "Female", "online", ""], ["Bo", "Male", "busy", "afk"]]
        }))
        .unwrap();
        assert_eq!(list.characters.len(), 2);
        assert_eq!(list.characters[1].3, "afk");
    }

    #[test]
    fn test_ignore_update_init_and_add_shapes() {
        let init: IgnoreUpdate = serde_json::from_value(
            json!({"action": "init", "characters": ["A", "B"]}),
        )
        .unwrap();
        assert_eq!(init.action, IgnoreAction::Init);
        assert_eq!(init.characters, vec!["A", "B"]);
        assert_eq!(init.character, None);

        let add: IgnoreUpdate =
            serde_json::from_value(json!({"action": "add", "character": "C"}))
                .unwrap();
        assert_eq!(add.character.as_deref(), Some("C"));
        assert!(add.characters.is_empty());
    }

    #[test]
    fn test_identify_serializes_wire_field_names() {
        let idn = Identify::with_ticket("acc", "tkt", "Char", "fchat", "0.1");
        let value = serde_json::to_value(&idn).unwrap();
        assert_eq!(value["method"], "ticket");
        assert_eq!(value["cname"], "fchat");
        assert_eq!(value["cversion"], "0.1");
    }

    #[test]
    fn test_typing_status_default_is_clear() {
        assert_eq!(TypingStatus::default(), TypingStatus::Clear);
        let t: TypingStatus = serde_json::from_value(json!("paused")).unwrap();
        assert_eq!(t, TypingStatus::Paused);
    }
}
