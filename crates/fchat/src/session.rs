//! Connection state machine and the session record.

use std::fmt;

/// Where the client is in its connection lifecycle.
///
/// ```text
/// Disconnected → AwaitingTicket → Connecting → Open → Identified → Closed
///                       │              │         │         │
///                       └──────────────┴────┬────┴─────────┘
///                                           ↓
///                                        Errored
/// ```
///
/// `Closed` and `Errored` are terminal until `connect` is called again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No connection has been attempted yet.
    #[default]
    Disconnected,
    /// Waiting for the ticket endpoint.
    AwaitingTicket,
    /// Opening the socket.
    Connecting,
    /// Socket open, `IDN` sent, no answer yet.
    Open,
    /// The server accepted our `IDN`.
    Identified,
    /// The socket was closed by either side.
    Closed,
    /// A ticket or transport failure ended the session.
    Errored,
}

impl ConnectionState {
    /// Returns `true` for states that only a new `connect` can leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }

    /// Returns `true` while a socket is open.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Open | Self::Identified)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::AwaitingTicket => "awaiting-ticket",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Identified => "identified",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Who this client is logged in as, and how far along the connection is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub account: String,
    pub character: String,
    pub state: ConnectionState,
}

impl Session {
    pub(crate) fn new(account: impl Into<String>, character: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            character: character.into(),
            state: ConnectionState::Disconnected,
        }
    }
}
