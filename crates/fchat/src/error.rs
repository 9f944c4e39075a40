//! Unified error type for the fchat client.

use fchat_auth::AuthError;
use fchat_protocol::ProtocolError;
use fchat_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` variants let `?` lift sub-crate errors directly. The
/// remaining variants originate in this crate.
#[derive(Debug, thiserror::Error)]
pub enum FchatError {
    /// The socket failed to open, send or receive.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded, or an inbound frame was malformed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No ticket could be obtained.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The server reported an error with an `ERR` frame.
    #[error("server error {number}: {message}")]
    Server {
        /// Numeric code from the protocol reference.
        number: i64,
        /// Human-readable text sent by the server.
        message: String,
    },

    /// A command was sent while no connection is open.
    #[error("not connected")]
    NotConnected,
}
