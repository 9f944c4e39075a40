//! Client configuration.

use fchat_auth::TicketConfig;
use fchat_state::StateConfig;
use serde::{Deserialize, Serialize};

/// Settings for an [`FchatClient`](crate::FchatClient).
///
/// Every field has a usable default, so the usual way to build one is
/// struct-update syntax:
///
/// ```rust
/// use fchat::ClientConfig;
///
/// let config = ClientConfig {
///     client_name: "my-bot".into(),
///     join_on_invite: true,
///     ..ClientConfig::default()
/// };
/// assert!(config.auto_ping);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket endpoint of the chat server.
    pub chat_url: String,

    /// Sent as `cname` when identifying.
    pub client_name: String,

    /// Sent as `cversion` when identifying.
    pub client_version: String,

    /// Answer every server `PIN` with a `PIN`. The server drops clients
    /// that stay silent for too long.
    pub auto_ping: bool,

    /// Join a channel as soon as an invitation (`CIU`) for it arrives.
    pub join_on_invite: bool,

    /// Where tickets come from and how long they stay valid.
    pub ticket: TicketConfig,

    /// Policy for the local state mirror.
    pub state: StateConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chat_url: "wss://chat.f-list.net/chat2".to_string(),
            client_name: env!("CARGO_PKG_NAME").to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            auto_ping: true,
            join_on_invite: false,
            ticket: TicketConfig::default(),
            state: StateConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.chat_url, "wss://chat.f-list.net/chat2");
        assert!(config.auto_ping);
        assert!(!config.join_on_invite);
        assert!(!config.state.prune_offline_from_channels);
    }
}
