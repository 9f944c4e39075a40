//! The ticket broker: a cached ticket plus single-flight refresh.
//!
//! Any number of tasks may ask for a ticket at the same time. While a
//! refresh is running they all attach to the same in-flight operation
//! and see the same outcome, so the ticket endpoint is hit at most once
//! per account at a time.
//!
//! # How the single flight works
//!
//! A refresh is a spawned Tokio task. Its `JoinHandle` is wrapped in a
//! [`Shared`] future and parked in `in_flight`; every caller that arrives
//! before it settles clones that future instead of starting another
//! request. The task itself stores the new ticket and clears `in_flight`
//! whether it succeeds or fails, so the slot is freed even when every
//! waiter has gone away (for example after a disconnect).

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{
    AuthError, Credentials, Ticket, TicketConfig, TicketRequest,
    TicketResponse, TicketSource,
};

/// What a finished refresh hands to every waiter.
#[derive(Debug, Clone)]
struct Refreshed {
    ticket: Ticket,
    response: Arc<TicketResponse>,
}

type InFlight = Shared<BoxFuture<'static, Result<Refreshed, AuthError>>>;

#[derive(Default)]
struct BrokerState {
    cached: Option<Ticket>,
    in_flight: Option<InFlight>,
}

/// Acquires, caches and refreshes tickets for one account.
///
/// ## Lifecycle
///
/// ```text
/// get_ticket() ──(no ticket / expired / forced)──→ refresh task ──→ cached
///      │                                               ↑
///      └──(refresh already running)────── attach ──────┘
/// ```
pub struct TicketBroker<S: TicketSource> {
    source: Arc<S>,
    credentials: Credentials,
    config: TicketConfig,
    state: Arc<Mutex<BrokerState>>,
}

impl<S: TicketSource> TicketBroker<S> {
    /// Creates a broker with an empty cache.
    pub fn new(source: S, credentials: Credentials, config: TicketConfig) -> Self {
        Self {
            source: Arc::new(source),
            credentials,
            config,
            state: Arc::new(Mutex::new(BrokerState::default())),
        }
    }

    /// The account this broker fetches tickets for.
    pub fn account(&self) -> &str {
        &self.credentials.account
    }

    /// The broker's configuration.
    pub fn config(&self) -> &TicketConfig {
        &self.config
    }

    /// Returns a valid ticket, fetching one only when needed.
    ///
    /// - A refresh is already running → wait for it and return its
    ///   result, even when `force_refresh` is set.
    /// - A cached, unexpired ticket exists and `force_refresh` is not set
    ///   → return it without touching the network.
    /// - Otherwise → start one refresh and wait for it.
    ///
    /// # Errors
    /// Returns the refresh's [`AuthError`]; every caller attached to the
    /// same refresh receives the same error.
    pub async fn get_ticket(
        &self,
        force_refresh: bool,
    ) -> Result<Ticket, AuthError> {
        let refresh = {
            let mut state = self.state.lock().await;

            if let Some(in_flight) = &state.in_flight {
                tracing::trace!(account = %self.credentials.account, "joining in-flight ticket refresh");
                in_flight.clone()
            } else {
                if !force_refresh {
                    let period = self.config.expiration_period;
                    if let Some(ticket) = state
                        .cached
                        .as_ref()
                        .filter(|t| !t.is_expired(period, Instant::now()))
                    {
                        return Ok(ticket.clone());
                    }
                }
                let refresh =
                    self.spawn_refresh(TicketRequest::lean(&self.credentials));
                state.in_flight = Some(refresh.clone());
                refresh
            }
        };

        refresh.await.map(|r| r.ticket)
    }

    /// Fetches a ticket together with the account's characters, friends
    /// and bookmarks. The ticket also replaces the cached one.
    ///
    /// If a lean refresh is running, this waits for it to settle first so
    /// there is still only one request in flight.
    pub async fn request_full(&self) -> Result<TicketResponse, AuthError> {
        let refresh = loop {
            let pending = {
                let mut state = self.state.lock().await;
                match &state.in_flight {
                    Some(in_flight) => in_flight.clone(),
                    None => {
                        let refresh = self
                            .spawn_refresh(TicketRequest::full(&self.credentials));
                        state.in_flight = Some(refresh.clone());
                        break refresh;
                    }
                }
            };
            // Outcome of somebody else's refresh is theirs to handle.
            let _ = pending.await;
        };

        refresh
            .await
            .map(|r| TicketResponse::clone(&r.response))
    }

    /// The cached ticket, without refreshing. Mostly useful for logging.
    pub async fn current_ticket(&self) -> Option<Ticket> {
        self.state.lock().await.cached.clone()
    }

    /// Drops the cached ticket so the next [`get_ticket`](Self::get_ticket)
    /// fetches a new one. A running refresh is left alone.
    pub async fn invalidate(&self) {
        self.state.lock().await.cached = None;
    }

    /// Starts a refresh on a background task and returns the shared
    /// handle to its outcome.
    ///
    /// Must be called with `state` locked, and the result stored in
    /// `in_flight` before the lock is released.
    fn spawn_refresh(&self, request: TicketRequest) -> InFlight {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let account = self.credentials.account.clone();

        let task = tokio::spawn(async move {
            let result = match source.fetch(&request).await {
                Ok(response) => response.ticket().map(|value| Refreshed {
                    ticket: Ticket {
                        value: value.to_string(),
                        account: account.clone(),
                        issued_at: Instant::now(),
                    },
                    response: Arc::new(response.clone()),
                }),
                Err(e) => Err(e),
            };

            let mut state = state.lock().await;
            state.in_flight = None;
            match &result {
                Ok(refreshed) => {
                    state.cached = Some(refreshed.ticket.clone());
                    tracing::info!(%account, "ticket refreshed");
                }
                Err(e) => {
                    tracing::warn!(%account, error = %e, "ticket refresh failed");
                }
            }
            result
        });

        async move {
            task.await
                .unwrap_or_else(|e| Err(AuthError::Aborted(e.to_string())))
        }
        .boxed()
        .shared()
    }
}
