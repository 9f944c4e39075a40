//! Wire protocol for fchat.
//!
//! This crate defines the "language" the client and the chat server speak:
//!
//! - **Opcodes** ([`Opcode`], [`Direction`]): the closed set of
//!   three-letter command codes.
//! - **Frames and payloads** ([`Frame`], [`Identify`], [`ChannelJoin`],
//!   etc.): what travels on each line.
//! - **Codec** ([`Codec`] trait, [`LineCodec`]): how frames become text
//!   and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong doing that.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw text lines) and the
//! dispatcher (state updates and callbacks). It doesn't know about
//! connections or tickets; it only knows how to read and write frames.
//!
//! ```text
//! Transport (lines) → Protocol (Frame) → Dispatcher (state + callbacks)
//! ```

mod codec;
mod error;
mod opcode;
mod types;

pub use codec::{Codec, LineCodec, OPCODE_LEN};
pub use error::ProtocolError;
pub use opcode::{Direction, Opcode};
pub use types::{
    ChannelCharacter, ChannelDescription, ChannelInit, ChannelInvite,
    ChannelJoin, ChannelLeave, ChannelMode, ChanopList, CharacterList,
    CharacterOnline, CharacterRef, ChatopList, FriendList, Frame, Identify,
    Identity, IgnoreAction, IgnoreUpdate, ModeChange, ServerError,
    ServerVariable, StatusChange, TypingChange, TypingStatus, UserCount,
};
