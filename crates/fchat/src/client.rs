//! `FchatClient`: the connection manager.
//!
//! Ties the layers together: ticket → transport → codec → dispatcher.
//!
//! ```text
//! connect() ──→ TicketBroker ──→ Connector::connect ──→ send IDN
//!                                        │
//!                              reader task (one per socket)
//!                                        │
//!                  recv → LineCodec::decode → Dispatcher::dispatch
//! ```
//!
//! # Generations
//!
//! Every `connect` and `disconnect` bumps a generation counter. Work that
//! started under an older generation (a ticket request still in flight,
//! a reader task draining a dead socket) checks the counter before it
//! touches anything and quietly drops its result when it has been
//! superseded. That is what lets `disconnect` return immediately without
//! waiting for the ticket endpoint.

use std::sync::{Arc, Mutex, PoisonError};

use fchat_auth::{
    Credentials, HttpTicketSource, TicketBroker, TicketSource,
};
use fchat_protocol::{Codec, Frame, Identify, LineCodec, Opcode, ProtocolError};
use fchat_state::StateStore;
use fchat_transport::{Connection, Connector, WebSocketConnector};
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::dispatch::Reaction;
use crate::{ClientConfig, ConnectionState, Dispatcher, FchatError, Session};

/// The socket currently owned by the client, if any.
struct Link<T> {
    generation: u64,
    connection: Option<Arc<T>>,
    reader: Option<JoinHandle<()>>,
}

/// Session record plus the generation it belongs to.
#[derive(Default)]
struct SessionSlot {
    generation: u64,
    session: Option<Session>,
}

struct ClientInner<S: TicketSource, C: Connector> {
    config: ClientConfig,
    broker: Arc<TicketBroker<S>>,
    connector: C,
    codec: LineCodec,
    dispatcher: Dispatcher,
    link: tokio::sync::Mutex<Link<C::Connection>>,
    session: Mutex<SessionSlot>,
}

/// An F-Chat client.
///
/// Cheap to clone: clones share one connection, one state store and one
/// set of callbacks.
///
/// # Example
///
/// ```rust,no_run
/// use fchat::prelude::*;
///
/// # async fn run() -> Result<(), FchatError> {
/// let client = FchatClient::websocket(
///     ClientConfig::default(),
///     Credentials::new("account", "password"),
/// );
/// client.on(Opcode::Msg, |frame| println!("{}", frame.payload));
/// client.connect("My Character", None).await?;
/// client.join_channel("Frontpage").await?;
/// # Ok(())
/// # }
/// ```
pub struct FchatClient<S: TicketSource, C: Connector> {
    inner: Arc<ClientInner<S, C>>,
}

impl<S: TicketSource, C: Connector> Clone for FchatClient<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl FchatClient<HttpTicketSource, WebSocketConnector> {
    /// A client that fetches tickets over HTTPS and talks to the chat
    /// server over a WebSocket, both at the URLs in `config`.
    pub fn websocket(config: ClientConfig, credentials: Credentials) -> Self {
        let source = HttpTicketSource::new(config.ticket.ticket_url.clone());
        Self::new(config, credentials, source, WebSocketConnector)
    }
}

impl<S: TicketSource, C: Connector> FchatClient<S, C> {
    /// Creates a client with its own ticket broker.
    pub fn new(
        config: ClientConfig,
        credentials: Credentials,
        source: S,
        connector: C,
    ) -> Self {
        let broker = TicketBroker::new(source, credentials, config.ticket.clone());
        Self::with_broker(config, Arc::new(broker), connector)
    }

    /// Creates a client that shares `broker`, e.g. with an
    /// [`ApiClient`](fchat_auth::ApiClient) for the same account.
    pub fn with_broker(
        config: ClientConfig,
        broker: Arc<TicketBroker<S>>,
        connector: C,
    ) -> Self {
        let dispatcher = Dispatcher::new(config.state.clone());
        Self {
            inner: Arc::new(ClientInner {
                config,
                broker,
                connector,
                codec: LineCodec,
                dispatcher,
                link: tokio::sync::Mutex::new(Link {
                    generation: 0,
                    connection: None,
                    reader: None,
                }),
                session: Mutex::new(SessionSlot::default()),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The ticket broker this client identifies with.
    pub fn broker(&self) -> &Arc<TicketBroker<S>> {
        &self.inner.broker
    }

    /// The dispatcher, for registering callbacks.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    // -----------------------------------------------------------------------
    // Callback shortcuts
    // -----------------------------------------------------------------------

    /// See [`Dispatcher::on`].
    pub fn on(&self, opcode: Opcode, callback: impl Fn(&Frame) + Send + Sync + 'static) {
        self.inner.dispatcher.on(opcode, callback);
    }

    /// See [`Dispatcher::on_raw`].
    pub fn on_raw(&self, callback: impl Fn(&Frame) + Send + Sync + 'static) {
        self.inner.dispatcher.on_raw(callback);
    }

    /// See [`Dispatcher::on_error`].
    pub fn on_error(&self, callback: impl Fn(&FchatError) + Send + Sync + 'static) {
        self.inner.dispatcher.on_error(callback);
    }

    /// See [`Dispatcher::on_open`].
    pub fn on_open(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.inner.dispatcher.on_open(callback);
    }

    /// See [`Dispatcher::on_close`].
    pub fn on_close(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner.dispatcher.on_close(callback);
    }

    /// See [`Dispatcher::on_state_change`].
    pub fn on_state_change(
        &self,
        callback: impl Fn(ConnectionState) + Send + Sync + 'static,
    ) {
        self.inner.dispatcher.on_state_change(callback);
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    /// Runs `f` against the mirrored server state.
    pub fn with_state<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        self.inner.dispatcher.with_state(f)
    }

    /// A point-in-time copy of the mirrored server state.
    pub fn state(&self) -> StateStore {
        self.inner.dispatcher.snapshot()
    }

    /// The current session, or `None` before the first `connect`.
    pub fn session(&self) -> Option<Session> {
        self.inner.slot().session.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner
            .slot()
            .session
            .as_ref()
            .map_or(ConnectionState::Disconnected, |s| s.state)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Connects as `character`.
    ///
    /// Any existing connection is torn down first. The ticket is
    /// `provided_ticket` if given, otherwise whatever the broker hands
    /// out. Once the socket is open, `IDN` is sent, the open callback
    /// runs, and a reader task starts feeding frames to the dispatcher.
    ///
    /// Returns `Ok(())` without connecting if a later `connect` or
    /// `disconnect` superseded this one while it was waiting.
    ///
    /// # Errors
    /// [`FchatError::Auth`] if no ticket could be obtained,
    /// [`FchatError::Transport`] if the socket could not be opened or
    /// `IDN` could not be sent. Either way the session ends `Errored`
    /// and the error callback has already been told.
    pub async fn connect(
        &self,
        character: &str,
        provided_ticket: Option<String>,
    ) -> Result<(), FchatError> {
        let inner = &self.inner;
        let account = inner.broker.account().to_string();

        let (generation, old) = {
            let mut link = inner.link.lock().await;
            let generation = inner.begin_session(&account, character);
            link.generation = generation;
            // Generations must reach the store in the order they were issued.
            inner
                .dispatcher
                .reset_state(generation, Some(character.to_string()));
            (generation, take_link(&mut link))
        };
        if let Some(old) = old {
            tracing::debug!(id = %old.id(), "replacing existing connection");
            let _ = old.close().await;
        }
        inner.transition(generation, ConnectionState::AwaitingTicket);

        let ticket = match provided_ticket {
            Some(ticket) => ticket,
            None => match inner.broker.get_ticket(false).await {
                Ok(ticket) => ticket.value,
                Err(e) => return inner.fail(generation, e.into()),
            },
        };
        if !inner.is_current(generation) {
            tracing::debug!(%character, "connect superseded while waiting for ticket");
            return Ok(());
        }

        let identify = Identify::with_ticket(
            &account,
            &ticket,
            character,
            &inner.config.client_name,
            &inner.config.client_version,
        );
        let identify = match serde_json::to_value(&identify) {
            Ok(body) => body,
            Err(e) => return inner.fail(generation, ProtocolError::Encode(e).into()),
        };

        inner.transition(generation, ConnectionState::Connecting);
        let connection = match inner.connector.connect(&inner.config.chat_url).await {
            Ok(connection) => Arc::new(connection),
            Err(e) => return inner.fail(generation, e.into()),
        };

        let mut link = inner.link.lock().await;
        if !inner.is_current(generation) {
            drop(link);
            let _ = connection.close().await;
            return Ok(());
        }
        tracing::info!(id = %connection.id(), url = %inner.config.chat_url, %character, "connected");
        inner.transition(generation, ConnectionState::Open);

        if let Err(e) = inner.write(&connection, Opcode::Idn, Some(&identify)).await {
            drop(link);
            let _ = connection.close().await;
            return inner.fail(generation, e);
        }
        inner.dispatcher.notify_open(&ticket);

        let reader = tokio::spawn(read_loop(
            Arc::clone(inner),
            Arc::clone(&connection),
            generation,
        ));
        link.connection = Some(connection);
        link.reader = Some(reader);
        Ok(())
    }

    /// Sends one command on the open connection.
    ///
    /// A transport failure ends the session: the socket is dropped, the
    /// session moves to `Errored` and the error callback is told.
    ///
    /// # Errors
    /// [`FchatError::NotConnected`] when no socket is open, otherwise
    /// whatever encoding or the transport fails with.
    pub async fn send(
        &self,
        opcode: Opcode,
        payload: Option<&Value>,
    ) -> Result<(), FchatError> {
        let inner = &self.inner;
        let (generation, connection) = {
            let link = inner.link.lock().await;
            let connection =
                link.connection.clone().ok_or(FchatError::NotConnected)?;
            (link.generation, connection)
        };

        match inner.write(&connection, opcode, payload).await {
            Err(err @ FchatError::Transport(_)) => {
                let dropped = {
                    let mut link = inner.link.lock().await;
                    link.generation == generation && take_link(&mut link).is_some()
                };
                if !dropped {
                    return Err(err);
                }
                let _ = connection.close().await;
                tracing::debug!(id = %connection.id(), %opcode, "send failed");
                match inner.fail(generation, err) {
                    Ok(()) => Err(FchatError::NotConnected),
                    Err(err) => Err(err),
                }
            }
            result => result,
        }
    }

    /// Closes the connection, if there is one, and runs the close
    /// callback. A ticket request still in flight finishes in the
    /// background and its result is dropped.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        let (connection, was_live) = {
            let mut link = inner.link.lock().await;
            let (generation, was_live) = inner.end_session();
            link.generation = generation;
            (take_link(&mut link), was_live)
        };

        if was_live {
            inner.dispatcher.notify_state(ConnectionState::Closed);
        }
        if let Some(connection) = connection {
            tracing::info!(id = %connection.id(), "disconnecting");
            let _ = connection.close().await;
            inner.dispatcher.notify_close();
        }
    }
}

/// Empties `link`, stopping its reader. Returns the connection it held.
fn take_link<T>(link: &mut Link<T>) -> Option<Arc<T>> {
    if let Some(reader) = link.reader.take() {
        reader.abort();
    }
    link.connection.take()
}

impl<S: TicketSource, C: Connector> ClientInner<S, C> {
    fn slot(&self) -> std::sync::MutexGuard<'_, SessionSlot> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new generation with a fresh session record.
    fn begin_session(&self, account: &str, character: &str) -> u64 {
        let mut slot = self.slot();
        slot.generation += 1;
        slot.session = Some(Session::new(account, character));
        slot.generation
    }

    /// Starts a new generation that has no live session. Returns the
    /// generation and whether the previous session was still live.
    fn end_session(&self) -> (u64, bool) {
        let mut slot = self.slot();
        slot.generation += 1;
        let was_live = match slot.session.as_mut() {
            Some(session) if !session.state.is_terminal() => {
                session.state = ConnectionState::Closed;
                true
            }
            _ => false,
        };
        (slot.generation, was_live)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.slot().generation == generation
    }

    /// Moves the session of `generation` to `state` and tells the state
    /// callback. Stale generations are ignored.
    fn transition(&self, generation: u64, state: ConnectionState) -> bool {
        {
            let mut slot = self.slot();
            if slot.generation != generation {
                return false;
            }
            match slot.session.as_mut() {
                Some(session) if session.state != state => {
                    tracing::debug!(from = %session.state, to = %state, "connection state");
                    session.state = state;
                }
                _ => return false,
            }
        }
        self.dispatcher.notify_state(state);
        true
    }

    /// Ends `generation` as `Errored`, reports `err`, and hands it back.
    ///
    /// A failure of a superseded generation is logged and swallowed.
    fn fail(&self, generation: u64, err: FchatError) -> Result<(), FchatError> {
        if self.transition(generation, ConnectionState::Errored) {
            tracing::warn!(error = %err, "connection failed");
            self.dispatcher.report(&err);
        } else if !self.is_current(generation) {
            tracing::debug!(error = %err, "ignoring failure of superseded connection");
            return Ok(());
        }
        Err(err)
    }

    async fn write(
        &self,
        connection: &C::Connection,
        opcode: Opcode,
        payload: Option<&Value>,
    ) -> Result<(), FchatError> {
        let line = self.codec.encode(opcode, payload)?;
        tracing::trace!(id = %connection.id(), frame = %line, "sent");
        connection.send(&line).await?;
        Ok(())
    }

    /// Handles one line from the socket of `generation`.
    async fn on_line(&self, connection: &C::Connection, generation: u64, line: &str) {
        tracing::trace!(id = %connection.id(), frame = %line, "received");

        let frame = match self.codec.decode(line) {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(id = %connection.id(), error = %e, "dropping malformed frame");
                self.dispatcher.report(&FchatError::Protocol(e));
                return;
            }
        };

        let reaction = self.dispatcher.dispatch_for(generation, &frame);
        let reply = match reaction {
            Some(Reaction::Identified) => {
                self.transition(generation, ConnectionState::Identified);
                None
            }
            Some(Reaction::Ping) if self.config.auto_ping => Some((Opcode::Pin, None)),
            Some(Reaction::Invited { channel }) if self.config.join_on_invite => {
                tracing::debug!(%channel, "joining on invite");
                Some((Opcode::Jch, Some(serde_json::json!({ "channel": channel }))))
            }
            _ => None,
        };

        if let Some((opcode, payload)) = reply {
            if let Err(e) = self.write(connection, opcode, payload.as_ref()).await {
                tracing::debug!(%opcode, error = %e, "automatic reply failed");
                self.dispatcher.report(&e);
            }
        }
    }

    /// Ends `generation` after its socket stopped, clean or not.
    async fn on_end(&self, generation: u64, error: Option<FchatError>) {
        {
            let mut link = self.link.lock().await;
            if link.generation == generation {
                link.connection = None;
                link.reader = None;
            }
        }

        match error {
            None => {
                if self.transition(generation, ConnectionState::Closed) {
                    self.dispatcher.notify_close();
                }
            }
            Some(err) => {
                let _ = self.fail(generation, err);
            }
        }
    }
}

/// Reads frames until the socket ends. One per connection, so frames are
/// handled strictly in arrival order.
async fn read_loop<S: TicketSource, C: Connector>(
    inner: Arc<ClientInner<S, C>>,
    connection: Arc<C::Connection>,
    generation: u64,
) {
    loop {
        match connection.recv().await {
            Ok(Some(line)) => {
                if !inner.is_current(generation) {
                    break;
                }
                inner.on_line(&connection, generation, &line).await;
            }
            Ok(None) => {
                tracing::info!(id = %connection.id(), "connection closed");
                inner.on_end(generation, None).await;
                break;
            }
            Err(e) => {
                tracing::debug!(id = %connection.id(), error = %e, "recv error");
                let _ = connection.close().await;
                inner.on_end(generation, Some(e.into())).await;
                break;
            }
        }
    }
}
