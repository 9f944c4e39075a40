//! State mirror for fchat.
//!
//! The server never answers "who is online?" on demand; it pushes a full
//! roster once after identification and then streams deltas. This crate
//! keeps a local copy of everything it pushes:
//!
//! - [`Character`]s currently online, with status and typing indicator
//! - [`Channel`]s the client has joined, with members and chanops
//! - the global chatop list, the ignore list and the friends list
//! - server variables and the last reported user count
//!
//! # Key types
//!
//! - [`StateStore`]: owns every collection; mutated one event at a time
//! - [`StateConfig`]: policy switches for ambiguous events
//!
//! All mutators are idempotent: applying the same event twice leaves the
//! store exactly as applying it once.

mod channel;
mod character;
mod config;
mod store;

pub use channel::Channel;
pub use character::Character;
pub use config::StateConfig;
pub use fchat_protocol::{ChannelMode, IgnoreAction, TypingStatus};
pub use store::StateStore;
