//! Receive-only viewer session
//!
//! Drives one WHEP pull connection and keeps it alive. Every start or restart
//! is an *attempt* identified by a generation number and owning a fresh
//! transport and a fresh signaling exchange:
//!
//! ```text
//!   start()/restart()           (sync) generation += 1, state = Signaled, notify
//!        │
//!        ▼
//!   retire previous attempt     exchange.stop(), transport.close()
//!   build new attempt           TransportFactory::create(), SignalingFactory::create()
//!   install observers           callbacks tagged with the generation
//!   recvonly audio + video
//!   exchange.view(url)          ── Err ──► state = Failed, notify
//!        │
//!        ▼
//!   transport callbacks         Connecting / Connected / Disconnected / ...
//! ```
//!
//! Callbacks and results carrying an older generation are ignored, which is
//! how a retired transport's handlers are detached. `stop()` also bumps the
//! generation, so nothing in flight can change state after it. An attempt
//! that finishes its handshake after being superseded deletes the resource
//! it created.
//!
//! The watchdog runs every `watchdog_interval` while the session is started
//! and restarts it whenever the state is `Disconnected`, `Closed` or
//! `Failed`. At most one restart is in flight at a time.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::config::SessionConfig;
use super::state::{SessionState, SessionStatus};
use super::watchdog::Watchdog;
use crate::bridge::{StatusStore, Subscribable};
use crate::error::Result;
use crate::signaling::{SignalingExchange, SignalingFactory};
use crate::stats::SessionStats;
use crate::transport::{RemoteTrack, TrackKind, Transport, TransportFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptKind {
    Start,
    Restart,
    /// Restart requested by a watchdog tick
    Recovery,
}

impl AttemptKind {
    fn is_restart(self) -> bool {
        self != AttemptKind::Start
    }
}

/// Transport and exchange of one attempt; retired together
struct Attempt {
    transport: Arc<dyn Transport>,
    exchange: Arc<dyn SignalingExchange>,
}

struct Inner {
    /// Current attempt; bumped by every start, restart and stop
    generation: u64,
    attempt: Option<Attempt>,
    watchdog: Option<Watchdog>,
    /// Generation of the restart in flight
    restarting: Option<u64>,
    remote_tracks: Vec<RemoteTrack>,
    stats: SessionStats,
}

/// A self-healing receive-only session for one resource id
pub struct ViewerSession {
    id: String,
    config: Arc<SessionConfig>,
    transports: Arc<dyn TransportFactory>,
    signaling: Arc<dyn SignalingFactory>,
    store: StatusStore,
    inner: Mutex<Inner>,
}

impl ViewerSession {
    /// Create an idle session
    pub fn new(
        id: impl Into<String>,
        config: Arc<SessionConfig>,
        transports: Arc<dyn TransportFactory>,
        signaling: Arc<dyn SignalingFactory>,
    ) -> Arc<Self> {
        let id = id.into();
        Arc::new(Self {
            store: StatusStore::new(id.clone()),
            id,
            config,
            transports,
            signaling,
            inner: Mutex::new(Inner {
                generation: 0,
                attempt: None,
                watchdog: None,
                restarting: None,
                remote_tracks: Vec::new(),
                stats: SessionStats::new(),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current immutable status
    pub fn status(&self) -> Arc<SessionStatus> {
        self.store.snapshot()
    }

    pub fn state(&self) -> SessionState {
        self.store.state()
    }

    /// Whether the session has been started and not stopped since
    pub fn is_started(&self) -> bool {
        self.inner.lock().watchdog.is_some()
    }

    /// Whether a restart is in flight
    pub fn is_restarting(&self) -> bool {
        self.inner.lock().restarting.is_some()
    }

    /// Remote tracks delivered during the current attempt
    pub fn remote_tracks(&self) -> Vec<RemoteTrack> {
        self.inner.lock().remote_tracks.clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.inner.lock().stats.clone()
    }

    /// Start the session
    ///
    /// Sets `Signaled`, notifies and arms the watchdog before returning. The
    /// returned future performs the handshake; it never fails, a failed
    /// handshake shows up as `Failed`.
    pub fn start(self: &Arc<Self>) -> impl Future<Output = ()> + Send + 'static {
        let generation = self.begin_attempt(AttemptKind::Start);
        self.arm_watchdog();

        tracing::info!(session = %self.id, generation = ?generation, "Session started");

        let session = Arc::clone(self);
        async move {
            if let Some(generation) = generation {
                session.attempt(generation).await;
            }
        }
    }

    /// Stop the session
    ///
    /// The watchdog is cancelled and the current attempt invalidated before
    /// returning. The returned future tears down the server resource and
    /// closes the transport; failures are logged.
    pub fn stop(self: &Arc<Self>) -> impl Future<Output = ()> + Send + 'static {
        let (watchdog, attempt) = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.restarting = None;
            inner.remote_tracks.clear();
            (inner.watchdog.take(), inner.attempt.take())
        };
        if let Some(watchdog) = watchdog {
            watchdog.cancel();
        }

        let session = Arc::clone(self);
        async move {
            if let Some(attempt) = attempt {
                retire(&session.id, attempt).await;
            }
            tracing::info!(session = %session.id, state = %session.state(), "Session stopped");
        }
    }

    /// Replace the transport with a brand-new one and renegotiate
    ///
    /// A no-op while another restart is in flight. The watchdog is not armed
    /// by a restart.
    pub fn restart(self: &Arc<Self>) -> impl Future<Output = ()> + Send + 'static {
        let previous = self.state();
        let guard = self.reserve_restart(AttemptKind::Restart);

        match guard {
            Some(ref guard) => tracing::info!(
                session = %self.id,
                generation = guard.generation,
                previous = %previous,
                "Restarting session"
            ),
            None => tracing::debug!(session = %self.id, "Restart already in progress"),
        }

        run_restart(guard)
    }

    /// Watchdog tick
    ///
    /// Launches a restart when the session is started, no restart is in
    /// flight, and the state is restartable. Returns the restart's task.
    pub fn run(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let previous = self.state();
        let guard = self.reserve_restart(AttemptKind::Recovery)?;

        tracing::debug!(
            session = %self.id,
            generation = guard.generation,
            previous = %previous,
            "Watchdog triggered restart"
        );
        Some(tokio::spawn(run_restart(Some(guard))))
    }

    fn arm_watchdog(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if inner.watchdog.is_some() {
            return;
        }

        let session = Arc::downgrade(self);
        let watchdog = Watchdog::spawn(self.config.watchdog_interval, move || {
            match session.upgrade() {
                Some(session) => {
                    session.run();
                    true
                }
                None => false,
            }
        });
        tracing::debug!(session = %self.id, period = ?watchdog.period(), "Watchdog armed");
        inner.watchdog = Some(watchdog);
    }

    fn reserve_restart(self: &Arc<Self>, kind: AttemptKind) -> Option<RestartGuard> {
        self.begin_attempt(kind).map(|generation| RestartGuard {
            session: Arc::clone(self),
            generation,
        })
    }

    /// Open a new attempt and publish `Signaled`
    ///
    /// Returns `None` for a restart while another restart is in flight, and
    /// for a recovery unless the session is started and in a restartable
    /// state. The checks and the reservation happen under one lock.
    fn begin_attempt(&self, kind: AttemptKind) -> Option<u64> {
        let generation = {
            let mut inner = self.inner.lock();
            if kind.is_restart() && inner.restarting.is_some() {
                return None;
            }
            if kind == AttemptKind::Recovery
                && (inner.watchdog.is_none() || !self.store.state().is_restartable())
            {
                return None;
            }

            inner.generation += 1;
            let generation = inner.generation;
            if kind.is_restart() {
                inner.restarting = Some(generation);
            }
            inner.remote_tracks.clear();
            inner.stats.on_attempt(kind.is_restart());
            if self.store.set(SessionState::Signaled) {
                inner.stats.on_transition(SessionState::Signaled);
            }
            generation
        };

        self.store.notify();
        Some(generation)
    }

    async fn attempt(self: &Arc<Self>, generation: u64) {
        match self.negotiate(generation).await {
            Ok(()) => {}
            Err(e) => {
                if self.transition(generation, SessionState::Failed) {
                    self.inner.lock().stats.on_handshake_failure();
                    tracing::warn!(
                        session = %self.id,
                        generation = generation,
                        handshake = e.is_handshake(),
                        error = %e,
                        "Connection attempt failed"
                    );
                } else {
                    tracing::debug!(
                        session = %self.id,
                        generation = generation,
                        error = %e,
                        "Superseded attempt failed"
                    );
                }
            }
        }
    }

    async fn negotiate(self: &Arc<Self>, generation: u64) -> Result<()> {
        let previous = self.inner.lock().attempt.take();
        if let Some(previous) = previous {
            retire(&self.id, previous).await;
        }

        let transport = self.transports.create().await?;
        let exchange = self.signaling.create(&self.id);
        if !self.install(generation, &transport, &exchange) {
            close_quietly(&self.id, transport.as_ref()).await;
            return Ok(());
        }

        transport.add_receive_only_track(TrackKind::Audio).await?;
        transport.add_receive_only_track(TrackKind::Video).await?;

        let url = self.config.resource_url(&self.id)?;
        exchange.view(transport.as_ref(), &url).await?;

        if self.is_current(generation) {
            tracing::debug!(session = %self.id, generation = generation, url = %url, "Handshake complete");
        } else {
            // Whoever superseded this attempt may have retired it before the
            // resource existed.
            tracing::debug!(session = %self.id, generation = generation, "Late handshake, tearing down");
            teardown_quietly(&self.id, exchange.as_ref()).await;
        }
        Ok(())
    }

    /// Make `transport` and `exchange` the session's attempt for `generation`
    ///
    /// Returns false if the attempt has been superseded.
    fn install(
        self: &Arc<Self>,
        generation: u64,
        transport: &Arc<dyn Transport>,
        exchange: &Arc<dyn SignalingExchange>,
    ) -> bool {
        let session = Arc::downgrade(self);
        transport.on_connection_state_change(Box::new(move |state| {
            if let Some(session) = session.upgrade() {
                session.on_transport_state(generation, state.into());
            }
        }));

        let session = Arc::downgrade(self);
        transport.on_remote_track(Box::new(move |track| {
            if let Some(session) = session.upgrade() {
                session.on_remote_track(generation, track);
            }
        }));

        let displaced = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return false;
            }
            inner.attempt.replace(Attempt {
                transport: Arc::clone(transport),
                exchange: Arc::clone(exchange),
            })
        };

        if let Some(displaced) = displaced {
            let id = self.id.clone();
            tokio::spawn(async move { retire(&id, displaced).await });
        }
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    /// Write `state` for `generation` and notify
    ///
    /// Returns false, without notifying, if the attempt has been superseded.
    fn transition(&self, generation: u64, state: SessionState) -> bool {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return false;
            }
            if self.store.set(state) {
                inner.stats.on_transition(state);
                tracing::debug!(session = %self.id, generation = generation, state = %state, "State changed");
            }
        }

        self.store.notify();
        true
    }

    fn on_transport_state(&self, generation: u64, state: SessionState) {
        if !self.transition(generation, state) {
            tracing::debug!(
                session = %self.id,
                generation = generation,
                state = %state,
                "Ignoring state from retired transport"
            );
            return;
        }

        match state {
            SessionState::Connected => {
                tracing::info!(session = %self.id, generation = generation, "Session connected")
            }
            s if s.is_restartable() => tracing::warn!(
                session = %self.id,
                generation = generation,
                state = %s,
                "Transport left connected state"
            ),
            _ => {}
        }
    }

    fn on_remote_track(&self, generation: u64, track: RemoteTrack) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        tracing::debug!(
            session = %self.id,
            kind = %track.kind,
            track = %track.id,
            stream = %track.stream_id,
            "Remote track received"
        );
        inner.remote_tracks.push(track);
    }
}

impl Subscribable for ViewerSession {
    fn store(&self) -> &StatusStore {
        &self.store
    }
}

impl std::fmt::Debug for ViewerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("started", &self.is_started())
            .finish()
    }
}

/// Clears the restart-in-flight mark when the restart ends or is dropped
struct RestartGuard {
    session: Arc<ViewerSession>,
    generation: u64,
}

impl Drop for RestartGuard {
    fn drop(&mut self) {
        let mut inner = self.session.inner.lock();
        if inner.restarting == Some(self.generation) {
            inner.restarting = None;
        }
    }
}

/// Run a reserved restart, then notify once more unless it was superseded
fn run_restart(guard: Option<RestartGuard>) -> impl Future<Output = ()> + Send + 'static {
    async move {
        if let Some(guard) = guard {
            guard.session.attempt(guard.generation).await;
            if guard.session.is_current(guard.generation) {
                guard.session.store.notify();
            }
        }
    }
}

async fn retire(id: &str, attempt: Attempt) {
    teardown_quietly(id, attempt.exchange.as_ref()).await;
    close_quietly(id, attempt.transport.as_ref()).await;
}

async fn teardown_quietly(id: &str, exchange: &dyn SignalingExchange) {
    if let Err(e) = exchange.stop().await {
        tracing::warn!(session = %id, error = %e, "Failed to tear down WHEP resource");
    }
}

async fn close_quietly(id: &str, transport: &dyn Transport) {
    if let Err(e) = transport.close().await {
        tracing::warn!(session = %id, error = %e, "Failed to close transport");
    }
}
