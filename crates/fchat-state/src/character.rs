//! Online characters.

use fchat_protocol::TypingStatus;
use serde::{Deserialize, Serialize};

/// A character the server has reported as online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Unique, case-sensitive name.
    pub name: String,
    pub gender: String,
    /// `online`, `looking`, `busy`, `dnd`, `idle`, `away`, ...
    pub status: String,
    /// Free-text status message. Empty when none is set.
    pub status_message: String,
    pub typing: TypingStatus,
}

impl Character {
    /// A freshly online character with no status message.
    pub fn new(
        name: impl Into<String>,
        gender: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            gender: gender.into(),
            status: status.into(),
            status_message: String::new(),
            typing: TypingStatus::Clear,
        }
    }
}
