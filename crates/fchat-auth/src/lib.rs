//! Ticket management for fchat.
//!
//! The chat server only lets a client identify with a short-lived ticket
//! issued by a separate REST endpoint. This crate handles:
//!
//! 1. **Fetching**: the [`TicketSource`] trait, with [`HttpTicketSource`]
//!    posting credentials over HTTPS
//! 2. **Caching and refresh**: [`TicketBroker`] keeps the current ticket,
//!    notices expiry, and makes sure concurrent callers share one refresh
//! 3. **Authenticated API calls**: [`ApiClient`] merges account and
//!    ticket into requests for the account JSON API
//!
//! # How it fits in the stack
//!
//! ```text
//! Client (above)  ← asks for a ticket before opening the socket
//!     ↕
//! Auth (this crate)  ← caches tickets, talks HTTP
//! ```

mod api;
mod broker;
mod error;
mod source;
mod ticket;

pub use api::{ApiClient, ApiConfig};
pub use broker::TicketBroker;
pub use error::AuthError;
pub use source::{HttpTicketSource, TicketSource};
pub use ticket::{
    Bookmark, Credentials, Friend, Ticket, TicketConfig, TicketRequest,
    TicketResponse,
};
