//! Ticket-authenticated calls to the account JSON API.
//!
//! The chat core itself needs only one thing from the REST side beyond
//! tickets: a way to POST to an endpoint with `account` and a valid
//! `ticket` merged into the form. Endpoint-specific helpers (bookmarks,
//! friend requests, character data, ...) are thin wrappers callers can
//! build on top of [`ApiClient::send_authenticated_request`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::source::post_form;
use crate::{AuthError, TicketBroker, TicketSource};

/// Where the account API lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Prefix for every endpoint path, e.g. `https://www.f-list.net`.
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.f-list.net".to_string(),
        }
    }
}

/// Sends form-encoded requests to the account API.
pub struct ApiClient<S: TicketSource> {
    http: reqwest::Client,
    config: ApiConfig,
    broker: Arc<TicketBroker<S>>,
}

impl<S: TicketSource> ApiClient<S> {
    /// Creates a client that takes tickets from `broker`.
    pub fn new(config: ApiConfig, broker: Arc<TicketBroker<S>>) -> Self {
        Self::with_client(reqwest::Client::new(), config, broker)
    }

    /// Creates a client that shares an existing HTTP client.
    pub fn with_client(
        http: reqwest::Client,
        config: ApiConfig,
        broker: Arc<TicketBroker<S>>,
    ) -> Self {
        Self {
            http,
            config,
            broker,
        }
    }

    /// POSTs `payload` plus `account` and a valid `ticket` to
    /// `base_url + endpoint` and returns the JSON answer.
    ///
    /// # Errors
    /// - whatever [`TicketBroker::get_ticket`] fails with
    /// - [`AuthError::Rejected`] if the answer carries a non-empty `error`
    /// - [`AuthError::Http`] / [`AuthError::Unparsable`] for transport or
    ///   body failures
    pub async fn send_authenticated_request(
        &self,
        endpoint: &str,
        mut payload: Map<String, Value>,
    ) -> Result<Value, AuthError> {
        let ticket = self.broker.get_ticket(false).await?;
        payload.insert("account".into(), Value::String(ticket.account));
        payload.insert("ticket".into(), Value::String(ticket.value));
        self.send_request(endpoint, payload).await
    }

    /// POSTs `payload` as-is, for endpoints that need no ticket.
    pub async fn send_request(
        &self,
        endpoint: &str,
        payload: Map<String, Value>,
    ) -> Result<Value, AuthError> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        tracing::debug!(%url, "account API request");

        let answer: Value = post_form(&self.http, &url, &payload).await?;
        if let Some(error) = answer
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty())
        {
            return Err(AuthError::Rejected(error.to_string()));
        }
        Ok(answer)
    }
}
