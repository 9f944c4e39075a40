//! Concurrency tests for the ticket broker's single-flight refresh.
//!
//! The source below blocks every fetch on a semaphore, so the test
//! decides exactly when the "network" answers and can pile up callers
//! in front of one in-flight request.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fchat_auth::{
    AuthError, Credentials, TicketBroker, TicketConfig, TicketRequest,
    TicketResponse, TicketSource,
};
use futures_util::future::join_all;
use tokio::sync::Semaphore;

struct GatedSource {
    calls: Arc<AtomicUsize>,
    gate: Arc<Semaphore>,
    fail: bool,
}

impl TicketSource for GatedSource {
    async fn fetch(
        &self,
        _request: &TicketRequest,
    ) -> Result<TicketResponse, AuthError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;
        permit.forget();

        if self.fail {
            return Err(AuthError::Http("connection reset".into()));
        }
        Ok(TicketResponse {
            ticket: Some(format!("ticket-{n}")),
            ..TicketResponse::default()
        })
    }
}

fn gated(fail: bool) -> (Arc<TicketBroker<GatedSource>>, Arc<AtomicUsize>, Arc<Semaphore>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Semaphore::new(0));
    let broker = TicketBroker::new(
        GatedSource {
            calls: Arc::clone(&calls),
            gate: Arc::clone(&gate),
            fail,
        },
        Credentials::new("acc", "pw"),
        TicketConfig::default(),
    );
    (Arc::new(broker), calls, gate)
}

/// Spawns `n` concurrent `get_ticket` calls and lets them all queue up
/// before the gate opens.
async fn race(
    broker: &Arc<TicketBroker<GatedSource>>,
    gate: &Semaphore,
    n: usize,
    force: bool,
) -> Vec<Result<String, AuthError>> {
    let handles: Vec<_> = (0..n)
        .map(|_| {
            let broker = Arc::clone(broker);
            tokio::spawn(async move {
                broker.get_ticket(force).await.map(|t| t.value)
            })
        })
        .collect();

    // Let every caller reach the broker before the answer arrives.
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    gate.add_permits(n);

    join_all(handles)
        .await
        .into_iter()
        .map(|r| r.expect("task should not panic"))
        .collect()
}

#[tokio::test]
async fn test_concurrent_get_ticket_makes_one_request() {
    let (broker, calls, gate) = gated(false);

    let results = race(&broker, &gate, 8, false).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap(), "ticket-1");
    }
}

#[tokio::test]
async fn test_concurrent_forced_refresh_still_shares_one_request() {
    let (broker, calls, gate) = gated(false);

    let results = race(&broker, &gate, 5, true).await;

    // Forced callers that arrive while a refresh runs attach to it.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap(), "ticket-1");
    }
}

#[tokio::test]
async fn test_concurrent_failure_reaches_every_waiter() {
    let (broker, calls, gate) = gated(true);

    let results = race(&broker, &gate, 4, false).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(
            result.unwrap_err(),
            AuthError::Http("connection reset".into())
        );
    }

    // A later caller starts a fresh attempt.
    gate.add_permits(1);
    broker.get_ticket(false).await.unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refresh_completes_after_waiters_are_gone() {
    let (broker, calls, gate) = gated(false);

    // Start a refresh, then abandon the only waiter.
    let waiter = {
        let broker = Arc::clone(&broker);
        tokio::spawn(async move { broker.get_ticket(false).await })
    };
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    waiter.abort();

    gate.add_permits(1);
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }

    // The background refresh still landed in the cache.
    let ticket = broker.get_ticket(false).await.unwrap();
    assert_eq!(ticket.value, "ticket-1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
