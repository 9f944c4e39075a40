//! # fchat
//!
//! Async client engine for the F-Chat protocol.
//!
//! A client logs in with a short-lived ticket from the account API, opens
//! a WebSocket to the chat server and identifies with `IDN`. From then on
//! the server pushes three-letter commands; this crate decodes them,
//! mirrors rosters and channels locally, and hands every command to
//! callbacks you register.
//!
//! ## Layers
//!
//! | Crate | What it does |
//! |---|---|
//! | `fchat-transport` | WebSocket connection behind `Connector`/`Connection` |
//! | `fchat-protocol` | opcodes, frames and the `OPCODE {json}` line codec |
//! | `fchat-auth` | ticket fetching, caching and single-flight refresh |
//! | `fchat-state` | the local mirror of server state |
//! | `fchat` (this crate) | dispatcher, connection manager, outbound helpers |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fchat::prelude::*;
//!
//! # async fn run() -> Result<(), FchatError> {
//! let client = FchatClient::websocket(
//!     ClientConfig::default(),
//!     Credentials::new("account", "password"),
//! );
//! client.on(Opcode::Con, |frame| println!("{} users online", frame.payload["count"]));
//! client.connect("My Character", None).await?;
//! # Ok(())
//! # }
//! ```

mod actions;
mod client;
mod config;
mod dispatch;
mod error;
mod session;

pub use client::FchatClient;
pub use config::ClientConfig;
pub use dispatch::{Dispatcher, Reaction};
pub use error::FchatError;
pub use session::{ConnectionState, Session};

pub use fchat_auth as auth;
pub use fchat_protocol as protocol;
pub use fchat_state as state;
pub use fchat_transport as transport;

/// Everything needed to run a client.
pub mod prelude {
    pub use crate::{
        ClientConfig, ConnectionState, Dispatcher, FchatClient, FchatError,
        Session,
    };
    pub use fchat_auth::{
        ApiClient, ApiConfig, AuthError, Credentials, HttpTicketSource,
        TicketBroker, TicketConfig, TicketSource,
    };
    pub use fchat_protocol::{
        ChannelMode, Codec, Frame, LineCodec, Opcode, ProtocolError,
        TypingStatus,
    };
    pub use fchat_state::{Channel, Character, StateConfig, StateStore};
    pub use fchat_transport::{
        Connection, ConnectionId, Connector, TransportError,
        WebSocketConnector,
    };
}
