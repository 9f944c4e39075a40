//! Error types for the protocol layer.
//!
//! Each crate in fchat defines its own error enum. When you see a
//! `ProtocolError`, the problem is in how a frame was written or read,
//! not in networking or authentication.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outgoing payload failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The JSON body of an incoming frame is malformed.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The frame is not `OPCODE` or `OPCODE <json>`.
    ///
    /// Examples: a lowercase opcode, or a body glued to the opcode
    /// without the separating space.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The frame parsed, but its payload does not have the shape the
    /// opcode requires (missing fields, wrong types).
    #[error("invalid {opcode} payload: {source}")]
    Payload {
        /// The opcode whose payload was rejected.
        opcode: String,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}
