//! The dispatcher: decoded frame → state mutation → callbacks.
//!
//! Every inbound frame goes through [`Dispatcher::dispatch`], in arrival
//! order, from the connection's single reader task. For each frame:
//!
//!   1. The built-in table applies the frame to the [`StateStore`]
//!      (most opcodes have no state effect).
//!   2. `ERR` frames are also reported to the error callback.
//!   3. The raw callback sees the frame, known opcode or not.
//!   4. The callback registered for the opcode, if any, runs last, so it
//!      observes the state after the update.
//!
//! Some frames need the connection to act (answer a ping, join on
//! invite, mark the session identified). The dispatcher has no socket, so
//! it hands those back as a [`Reaction`].
//!
//! Callbacks are plain closures. There is exactly one slot per opcode:
//! registering again replaces the previous closure.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use fchat_protocol::{
    ChannelInvite, CharacterRef, ChatopList, Frame, FriendList, Opcode,
    ProtocolError, ServerError, UserCount,
};
use fchat_state::{StateConfig, StateStore};

use crate::{ConnectionState, FchatError};

type FrameCallback = Arc<dyn Fn(&Frame) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&FchatError) + Send + Sync>;
type OpenCallback = Arc<dyn Fn(&str) + Send + Sync>;
type CloseCallback = Arc<dyn Fn() + Send + Sync>;
type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Follow-up work a frame asks of the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// The server pinged us.
    Ping,
    /// We were invited to the channel named here.
    Invited { channel: String },
    /// The server accepted our identification.
    Identified,
}

/// What the built-in table wants done once the state lock is released.
enum Effect {
    React(Reaction),
    Report(FchatError),
}

/// Outcome of running a frame through the built-in table.
enum Applied {
    /// The frame belongs to a session that has since been replaced.
    Stale,
    Done(Option<Effect>),
}

/// The store plus the session generation it currently mirrors.
struct Mirror {
    generation: u64,
    store: StateStore,
}

#[derive(Default)]
struct Callbacks {
    by_opcode: HashMap<Opcode, FrameCallback>,
    raw: Option<FrameCallback>,
    error: Option<ErrorCallback>,
    open: Option<OpenCallback>,
    close: Option<CloseCallback>,
    state_change: Option<StateCallback>,
}

/// Routes frames into the state store and out to registered callbacks.
pub struct Dispatcher {
    state: RwLock<Mirror>,
    callbacks: Mutex<Callbacks>,
}

impl Dispatcher {
    /// Creates a dispatcher with an empty store.
    pub fn new(config: StateConfig) -> Self {
        Self {
            state: RwLock::new(Mirror {
                generation: 0,
                store: StateStore::new(config),
            }),
            callbacks: Mutex::new(Callbacks::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Sets the callback for `opcode`, replacing any previous one.
    pub fn on(
        &self,
        opcode: Opcode,
        callback: impl Fn(&Frame) + Send + Sync + 'static,
    ) {
        self.callbacks().by_opcode.insert(opcode, Arc::new(callback));
    }

    /// Removes the callback for `opcode`.
    pub fn off(&self, opcode: Opcode) {
        self.callbacks().by_opcode.remove(&opcode);
    }

    /// Sets the callback that sees every decoded frame, including ones
    /// with opcodes outside the protocol reference.
    pub fn on_raw(&self, callback: impl Fn(&Frame) + Send + Sync + 'static) {
        self.callbacks().raw = Some(Arc::new(callback));
    }

    /// Sets the callback for decode failures, server `ERR`s, and ticket
    /// or transport failures.
    pub fn on_error(
        &self,
        callback: impl Fn(&FchatError) + Send + Sync + 'static,
    ) {
        self.callbacks().error = Some(Arc::new(callback));
    }

    /// Sets the callback run once the socket is open and `IDN` is sent.
    /// It receives the ticket that was used.
    pub fn on_open(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        self.callbacks().open = Some(Arc::new(callback));
    }

    /// Sets the callback run when the socket closes.
    pub fn on_close(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.callbacks().close = Some(Arc::new(callback));
    }

    /// Sets the callback run on every connection state transition.
    pub fn on_state_change(
        &self,
        callback: impl Fn(ConnectionState) + Send + Sync + 'static,
    ) {
        self.callbacks().state_change = Some(Arc::new(callback));
    }

    // -----------------------------------------------------------------------
    // State access
    // -----------------------------------------------------------------------

    /// Runs `f` against the current state.
    ///
    /// Safe to call from inside a callback: the store is never locked
    /// while callbacks run.
    pub fn with_state<R>(&self, f: impl FnOnce(&StateStore) -> R) -> R {
        let mirror = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&mirror.store)
    }

    /// A copy of the whole store as it is right now.
    pub fn snapshot(&self) -> StateStore {
        self.with_state(StateStore::clone)
    }

    /// Empties the store for session `generation` as `own_character`.
    /// From then on [`dispatch_for`](Self::dispatch_for) drops frames of
    /// any other generation.
    pub(crate) fn reset_state(&self, generation: u64, own_character: Option<String>) {
        let mut mirror = self.state.write().unwrap_or_else(PoisonError::into_inner);
        mirror.generation = generation;
        mirror.store.reset(own_character);
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Processes one inbound frame.
    ///
    /// A payload that does not fit its opcode is reported to the error
    /// callback and leaves the state untouched; the opcode callback is
    /// skipped for that frame, the raw callback still sees it.
    pub fn dispatch(&self, frame: &Frame) -> Option<Reaction> {
        self.route(None, frame)
    }

    /// Like [`dispatch`](Self::dispatch), for a frame read by session
    /// `generation`. If the store has been reset for another session in
    /// the meantime, the frame is dropped without touching state or
    /// running callbacks.
    pub(crate) fn dispatch_for(&self, generation: u64, frame: &Frame) -> Option<Reaction> {
        self.route(Some(generation), frame)
    }

    fn route(&self, generation: Option<u64>, frame: &Frame) -> Option<Reaction> {
        let opcode = frame.command();

        let applied = match self.apply(generation, opcode, frame) {
            Ok(Applied::Stale) => {
                tracing::debug!(opcode = %frame.opcode, "dropping frame of superseded session");
                return None;
            }
            Ok(Applied::Done(effect)) => Ok(effect),
            Err(e) => Err(e),
        };

        let mut reaction = None;
        let applied = match applied {
            Ok(Some(Effect::React(r))) => {
                reaction = Some(r);
                true
            }
            Ok(Some(Effect::Report(err))) => {
                tracing::debug!(error = %err, "server reported an error");
                self.report(&err);
                true
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(opcode = %frame.opcode, error = %e, "bad payload");
                self.report(&FchatError::Protocol(e));
                false
            }
        };

        let (raw, handler) = {
            let callbacks = self.callbacks();
            let handler = match opcode {
                Some(opcode) if applied => callbacks.by_opcode.get(&opcode).cloned(),
                _ => None,
            };
            (callbacks.raw.clone(), handler)
        };
        if let Some(raw) = raw {
            guarded(&frame.opcode, || raw(frame));
        }
        if let Some(handler) = handler {
            guarded(&frame.opcode, || handler(frame));
        }

        reaction
    }

    /// The built-in table. Holds the write lock only while mutating, and
    /// checks the generation under that same lock.
    fn apply(
        &self,
        generation: Option<u64>,
        opcode: Option<Opcode>,
        frame: &Frame,
    ) -> Result<Applied, ProtocolError> {
        let mut mirror = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if generation.is_some_and(|g| g != mirror.generation) {
            return Ok(Applied::Stale);
        }
        let Some(opcode) = opcode else {
            tracing::trace!(opcode = %frame.opcode, "unknown opcode");
            return Ok(Applied::Done(None));
        };

        let mut effect = None;
        let state = &mut mirror.store;

        match opcode {
            Opcode::Lis => state.load_characters(frame.payload_as()?),
            Opcode::Nln => state.character_online(frame.payload_as()?),
            Opcode::Fln => {
                let CharacterRef { character } = frame.payload_as()?;
                state.character_offline(&character);
            }
            Opcode::Sta => state.status_changed(frame.payload_as()?),
            Opcode::Tpn => state.typing_changed(frame.payload_as()?),

            Opcode::Jch => state.channel_joined(frame.payload_as()?),
            Opcode::Lch => state.channel_left(frame.payload_as()?),
            Opcode::Ich => state.channel_initialized(frame.payload_as()?),
            Opcode::Cds => state.description_changed(frame.payload_as()?),
            Opcode::Col => state.chanops_listed(frame.payload_as()?),
            Opcode::Coa => state.chanop_added(frame.payload_as()?),
            Opcode::Cor => state.chanop_removed(frame.payload_as()?),
            Opcode::Cso => state.owner_changed(frame.payload_as()?),
            Opcode::Rmo => state.mode_changed(frame.payload_as()?),

            Opcode::Adl => {
                let ChatopList { ops } = frame.payload_as()?;
                state.chatops_listed(ops);
            }
            Opcode::Aop => {
                let CharacterRef { character } = frame.payload_as()?;
                state.chatop_added(character);
            }
            Opcode::Dop => {
                let CharacterRef { character } = frame.payload_as()?;
                state.chatop_removed(&character);
            }
            Opcode::Ign => state.ignore_updated(frame.payload_as()?),
            Opcode::Frl => {
                let FriendList { characters } = frame.payload_as()?;
                state.friends_listed(characters);
            }
            Opcode::Var => state.variable_set(frame.payload_as()?),
            Opcode::Con => {
                let UserCount { count } = frame.payload_as()?;
                state.user_count_set(count);
            }

            Opcode::Err => {
                let ServerError { number, message } = frame.payload_as()?;
                effect = Some(Effect::Report(FchatError::Server { number, message }));
            }
            Opcode::Idn => effect = Some(Effect::React(Reaction::Identified)),
            Opcode::Pin => effect = Some(Effect::React(Reaction::Ping)),
            Opcode::Ciu => {
                let ChannelInvite { name, .. } = frame.payload_as()?;
                effect = Some(Effect::React(Reaction::Invited { channel: name }));
            }

            _ => {}
        }

        Ok(Applied::Done(effect))
    }

    // -----------------------------------------------------------------------
    // Lifecycle notifications
    // -----------------------------------------------------------------------

    /// Hands `err` to the error callback, if one is set.
    pub(crate) fn report(&self, err: &FchatError) {
        let callback = self.callbacks().error.clone();
        if let Some(callback) = callback {
            guarded("error", || callback(err));
        }
    }

    pub(crate) fn notify_open(&self, ticket: &str) {
        let callback = self.callbacks().open.clone();
        if let Some(callback) = callback {
            guarded("open", || callback(ticket));
        }
    }

    pub(crate) fn notify_close(&self) {
        let callback = self.callbacks().close.clone();
        if let Some(callback) = callback {
            guarded("close", || callback());
        }
    }

    pub(crate) fn notify_state(&self, state: ConnectionState) {
        let callback = self.callbacks().state_change.clone();
        if let Some(callback) = callback {
            guarded("state", || callback(state));
        }
    }

    fn callbacks(&self) -> std::sync::MutexGuard<'_, Callbacks> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs a caller-supplied callback so that a panic in it costs only the
/// current frame.
fn guarded(what: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(callback = %what, "callback panicked");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fchat_protocol::{Codec, LineCodec};

    use super::*;

    fn frame(line: &str) -> Frame {
        LineCodec.decode(line).unwrap().unwrap()
    }

    fn dispatcher_as(me: &str) -> Dispatcher {
        let dispatcher = Dispatcher::new(StateConfig::default());
        dispatcher.reset_state(1, Some(me.into()));
        dispatcher
    }

    #[test]
    fn test_dispatch_callback_sees_updated_state() {
        let dispatcher = Arc::new(dispatcher_as("Me"));
        let seen = Arc::new(Mutex::new(None));

        let d = Arc::clone(&dispatcher);
        let s = Arc::clone(&seen);
        dispatcher.on(Opcode::Nln, move |_| {
            let online = d.with_state(|state| state.character("Bob").is_some());
            *s.lock().unwrap() = Some(online);
        });

        dispatcher.dispatch(&frame(
            r#"NLN {"identity":"Bob","gender":"Male","status":"online"}"#,
        ));
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_on_twice_last_registration_wins() {
        let dispatcher = dispatcher_as("Me");
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&first);
        dispatcher.on(Opcode::Msg, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&second);
        dispatcher.on(Opcode::Msg, move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&frame(
            r#"MSG {"character":"Bob","message":"hi","channel":"Frontpage"}"#,
        ));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_removes_callback() {
        let dispatcher = dispatcher_as("Me");
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        dispatcher.on(Opcode::Hlo, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.off(Opcode::Hlo);

        dispatcher.dispatch(&frame(r#"HLO {"message":"Welcome."}"#));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_opcode_reaches_raw_callback_only() {
        let dispatcher = dispatcher_as("Me");
        let raw = Arc::new(Mutex::new(Vec::new()));
        let r = Arc::clone(&raw);
        dispatcher.on_raw(move |frame| r.lock().unwrap().push(frame.opcode.clone()));

        let reaction = dispatcher.dispatch(&frame(r#"ZZZ {"x":1}"#));

        assert_eq!(reaction, None);
        assert_eq!(*raw.lock().unwrap(), ["ZZZ"]);
    }

    #[test]
    fn test_err_frame_reports_server_error() {
        let dispatcher = dispatcher_as("Me");
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = Arc::clone(&errors);
        dispatcher.on_error(move |err| e.lock().unwrap().push(err.to_string()));

        dispatcher.dispatch(&frame(r#"ERR {"number":2,"message":"Too many connections."}"#));

        assert_eq!(
            *errors.lock().unwrap(),
            ["server error 2: Too many connections."]
        );
    }

    #[test]
    fn test_bad_payload_reported_state_untouched() {
        let dispatcher = dispatcher_as("Me");
        let errors = Arc::new(AtomicUsize::new(0));
        let handled = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&errors);
        dispatcher.on_error(move |err| {
            assert!(matches!(err, FchatError::Protocol(ProtocolError::Payload { .. })));
            e.fetch_add(1, Ordering::SeqCst);
        });
        let h = Arc::clone(&handled);
        dispatcher.on(Opcode::Nln, move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        });

        dispatcher.dispatch(&frame(r#"NLN {"identity":42}"#));

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.with_state(StateStore::character_count), 0);
    }

    #[test]
    fn test_panicking_callback_does_not_poison_dispatch() {
        let dispatcher = dispatcher_as("Me");
        dispatcher.on(Opcode::Nln, |_| panic!("callback bug"));

        dispatcher.dispatch(&frame(
            r#"NLN {"identity":"Bob","gender":"Male","status":"online"}"#,
        ));
        dispatcher.dispatch(&frame(
            r#"NLN {"identity":"Ann","gender":"Female","status":"online"}"#,
        ));

        assert_eq!(dispatcher.with_state(StateStore::character_count), 2);
    }

    #[test]
    fn test_reactions() {
        let dispatcher = dispatcher_as("Me");
        assert_eq!(dispatcher.dispatch(&frame("PIN")), Some(Reaction::Ping));
        assert_eq!(
            dispatcher.dispatch(&frame(r#"IDN {"character":"Me"}"#)),
            Some(Reaction::Identified)
        );
        assert_eq!(
            dispatcher.dispatch(&frame(
                r#"CIU {"sender":"Ann","title":"Ann's Room","name":"ADH-42"}"#
            )),
            Some(Reaction::Invited {
                channel: "ADH-42".into()
            })
        );
    }

    #[test]
    fn test_con_and_var_recorded() {
        let dispatcher = dispatcher_as("Me");
        dispatcher.dispatch(&frame(r#"CON {"count":1234}"#));
        dispatcher.dispatch(&frame(r#"VAR {"variable":"chat_max","value":4096}"#));

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.user_count(), Some(1234));
        assert_eq!(
            snapshot.server_variable("chat_max"),
            Some(&serde_json::json!(4096))
        );
    }

    #[test]
    fn test_dispatch_for_superseded_generation_is_dropped() {
        let dispatcher = dispatcher_as("Me");
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        dispatcher.on_raw(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        dispatcher.reset_state(2, Some("Alt".into()));

        let reaction = dispatcher.dispatch_for(
            1,
            &frame(r#"NLN {"identity":"Bob","gender":"Male","status":"online"}"#),
        );
        assert_eq!(reaction, None);
        assert_eq!(dispatcher.with_state(StateStore::character_count), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        dispatcher.dispatch_for(
            2,
            &frame(r#"NLN {"identity":"Bob","gender":"Male","status":"online"}"#),
        );
        assert_eq!(dispatcher.with_state(StateStore::character_count), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
