//! Ticket types: credentials, the request we send, the response we get,
//! and the cached [`Ticket`] itself.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

use crate::AuthError;

// ---------------------------------------------------------------------------
// TicketConfig
// ---------------------------------------------------------------------------

/// Where tickets come from and how long they stay valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketConfig {
    /// The ticket endpoint, POSTed with form-encoded credentials.
    pub ticket_url: String,

    /// How long a ticket is trusted after it was issued. The server does
    /// not tell us, so this is a local policy.
    pub expiration_period: Duration,
}

impl Default for TicketConfig {
    fn default() -> Self {
        Self {
            ticket_url: "https://www.f-list.net/json/getApiTicket.php"
                .to_string(),
            expiration_period: Duration::from_secs(30 * 60),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Account name and password.
///
/// `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account: String,
    pub password: String,
}

impl Credentials {
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TicketRequest / TicketResponse
// ---------------------------------------------------------------------------

/// The form body sent to the ticket endpoint.
///
/// The `no_*` flags ask the server to leave account data out of the
/// response; flags that are `false` are not sent at all.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TicketRequest {
    pub account: String,
    pub password: String,
    #[serde(skip_serializing_if = "is_false")]
    pub no_characters: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub no_friends: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub no_bookmarks: bool,
}

impl TicketRequest {
    /// A request for the ticket alone.
    pub fn lean(credentials: &Credentials) -> Self {
        Self {
            account: credentials.account.clone(),
            password: credentials.password.clone(),
            no_characters: true,
            no_friends: true,
            no_bookmarks: true,
        }
    }

    /// A request for the ticket plus characters, friends and bookmarks.
    pub fn full(credentials: &Credentials) -> Self {
        Self {
            no_characters: false,
            no_friends: false,
            no_bookmarks: false,
            ..Self::lean(credentials)
        }
    }
}

impl fmt::Debug for TicketRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketRequest")
            .field("account", &self.account)
            .field("no_characters", &self.no_characters)
            .field("no_friends", &self.no_friends)
            .field("no_bookmarks", &self.no_bookmarks)
            .finish_non_exhaustive()
    }
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// A friendship between one of our characters and someone else's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub source_name: String,
    pub dest_name: String,
}

/// A bookmarked character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
}

/// What the ticket endpoint answers.
///
/// On success `error` is absent or the empty string. The account data
/// fields are only filled for a [`TicketRequest::full`] request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketResponse {
    #[serde(default)]
    pub ticket: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub default_character: Option<String>,
    /// Character names (or a name→id map, depending on API version).
    #[serde(default)]
    pub characters: Value,
    #[serde(default)]
    pub friends: Vec<Friend>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

impl TicketResponse {
    /// The ticket, or why there isn't one.
    pub fn ticket(&self) -> Result<&str, AuthError> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(AuthError::Rejected(error.to_string()));
        }
        self.ticket
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AuthError::Unparsable("response carries no ticket".into())
            })
    }

    /// Bookmarked character names.
    pub fn bookmark_names(&self) -> Vec<String> {
        self.bookmarks.iter().map(|b| b.name.clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// A ticket issued for one account, stamped with when we got it.
///
/// `issued_at` uses Tokio's clock so tests can move time with
/// `tokio::time::advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub value: String,
    pub account: String,
    pub issued_at: Instant,
}

impl Ticket {
    /// When this ticket stops being trusted.
    pub fn expires_at(&self, period: Duration) -> Instant {
        self.issued_at + period
    }

    /// Returns `true` once `now` has reached the expiry instant.
    pub fn is_expired(&self, period: Duration, now: Instant) -> bool {
        now >= self.expires_at(period)
    }
}
