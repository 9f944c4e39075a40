//! Where tickets come from.
//!
//! The broker doesn't care how a ticket is fetched, only that something
//! implements [`TicketSource`]. Production code uses [`HttpTicketSource`];
//! tests plug in an in-memory source that counts calls.

use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{AuthError, TicketRequest, TicketResponse};

/// Fetches a fresh ticket response for the given credentials.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → the source lives inside the broker, which
///   runs refreshes on background Tokio tasks.
/// - The returned future is `Send` for the same reason.
pub trait TicketSource: Send + Sync + 'static {
    /// Performs one round trip to the ticket endpoint.
    ///
    /// # Returns
    /// - `Ok(TicketResponse)`: the endpoint answered with parseable JSON
    ///   (which may still carry an `error` field)
    /// - `Err(AuthError)`: the request failed or the body was not JSON
    fn fetch(
        &self,
        request: &TicketRequest,
    ) -> impl Future<Output = Result<TicketResponse, AuthError>> + Send;
}

/// A [`TicketSource`] that POSTs form-encoded credentials over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTicketSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTicketSource {
    /// Creates a source for `url` with a default HTTP client.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Creates a source that shares an existing HTTP client.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// The endpoint this source talks to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TicketSource for HttpTicketSource {
    async fn fetch(
        &self,
        request: &TicketRequest,
    ) -> Result<TicketResponse, AuthError> {
        tracing::debug!(account = %request.account, url = %self.url, "requesting ticket");
        post_form(&self.client, &self.url, request).await
    }
}

/// POSTs `form` as `application/x-www-form-urlencoded` and parses the
/// JSON answer.
pub(crate) async fn post_form<F, R>(
    client: &reqwest::Client,
    url: &str,
    form: &F,
) -> Result<R, AuthError>
where
    F: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| AuthError::Http(e.to_string()))?;

    response
        .json::<R>()
        .await
        .map_err(|e| AuthError::Unparsable(e.to_string()))
}
