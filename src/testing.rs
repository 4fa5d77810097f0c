//! In-memory transport and signaling doubles for unit tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use url::Url;

use crate::bridge::SessionBridge;
use crate::error::{Error, HandshakeError, Result};
use crate::session::state::SessionState;
use crate::signaling::{SignalingExchange, SignalingFactory};
use crate::transport::{
    ConnectionState, ConnectionStateHandler, RemoteTrack, RemoteTrackHandler, TrackKind,
    Transport, TransportFactory,
};

type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;
type TrackCallback = Arc<dyn Fn(RemoteTrack) + Send + Sync>;

/// Transport whose connection events are driven by the test
#[derive(Default)]
pub(crate) struct FakeTransport {
    state_handler: Mutex<Option<StateCallback>>,
    track_handler: Mutex<Option<TrackCallback>>,
    tracks: Mutex<Vec<TrackKind>>,
    answers: Mutex<Vec<String>>,
    close_calls: AtomicUsize,
    fail_close: AtomicBool,
}

impl FakeTransport {
    /// Report a connection state through the installed observer
    pub fn emit(&self, state: ConnectionState) {
        let handler = self.state_handler.lock().clone();
        if let Some(handler) = handler {
            handler(state);
        }
    }

    /// Deliver a remote track through the installed observer
    pub fn deliver(&self, track: RemoteTrack) {
        let handler = self.track_handler.lock().clone();
        if let Some(handler) = handler {
            handler(track);
        }
    }

    pub fn tracks(&self) -> Vec<TrackKind> {
        self.tracks.lock().clone()
    }

    pub fn answers(&self) -> Vec<String> {
        self.answers.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn add_receive_only_track(&self, kind: TrackKind) -> Result<()> {
        self.tracks.lock().push(kind);
        Ok(())
    }

    fn on_connection_state_change(&self, handler: ConnectionStateHandler) {
        *self.state_handler.lock() = Some(Arc::from(handler));
    }

    fn on_remote_track(&self, handler: RemoteTrackHandler) {
        *self.track_handler.lock() = Some(Arc::from(handler));
    }

    async fn create_offer(&self) -> Result<String> {
        Ok("v=0 offer".to_string())
    }

    async fn apply_answer(&self, sdp: String) -> Result<()> {
        self.answers.lock().push(sdp);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        // Real peer connections report Closed once closed.
        self.emit(ConnectionState::Closed);
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(Error::Transport("close failed".into()));
        }
        Ok(())
    }
}

/// Factory recording every transport it builds
#[derive(Default)]
pub(crate) struct FakeTransportFactory {
    created: Mutex<Vec<Arc<FakeTransport>>>,
    fail: AtomicBool,
}

impl FakeTransportFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.created.lock().len()
    }

    /// Transport built by the `index`-th successful `create`
    pub fn get(&self, index: usize) -> Arc<FakeTransport> {
        Arc::clone(&self.created.lock()[index])
    }

    pub fn latest(&self) -> Arc<FakeTransport> {
        let created = self.created.lock();
        Arc::clone(created.last().expect("no transport created"))
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportFactory for FakeTransportFactory {
    async fn create(&self) -> Result<Arc<dyn Transport>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transport("no peer connection".into()));
        }
        let transport = Arc::new(FakeTransport::default());
        self.created.lock().push(Arc::clone(&transport));
        Ok(transport)
    }
}

/// Signaling exchange with scripted outcomes
#[derive(Default)]
pub(crate) struct FakeExchange {
    reject: AtomicBool,
    fail_stop: AtomicBool,
    gate: Mutex<Option<Arc<Semaphore>>>,
    views: AtomicUsize,
    stops: AtomicUsize,
    urls: Mutex<Vec<Url>>,
}

impl FakeExchange {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting() -> Arc<Self> {
        let exchange = Self::default();
        exchange.reject.store(true, Ordering::SeqCst);
        Arc::new(exchange)
    }

    pub fn set_reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn fail_stop(&self) {
        self.fail_stop.store(true, Ordering::SeqCst);
    }

    /// Hold every following `view` until [`FakeExchange::release`]
    pub fn hold(&self) {
        *self.gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let one held `view` proceed
    pub fn release(&self) {
        if let Some(gate) = self.gate.lock().as_ref() {
            gate.add_permits(1);
        }
    }

    pub fn views(&self) -> usize {
        self.views.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl SignalingExchange for FakeExchange {
    async fn view(&self, transport: &dyn Transport, url: &Url) -> Result<()> {
        self.views.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.clone());

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.reject.load(Ordering::SeqCst) {
            return Err(HandshakeError::UnexpectedStatus(503).into());
        }

        let _offer = transport.create_offer().await?;
        transport.apply_answer("v=0 answer".to_string()).await
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(Error::Teardown(500));
        }
        Ok(())
    }
}

/// Hands the same exchange to every attempt and records the session ids
#[derive(Default)]
pub(crate) struct FakeSignaling {
    pub exchange: Arc<FakeExchange>,
    ids: Mutex<Vec<String>>,
}

impl FakeSignaling {
    pub fn new(exchange: Arc<FakeExchange>) -> Arc<Self> {
        Arc::new(Self {
            exchange,
            ids: Mutex::new(Vec::new()),
        })
    }

    pub fn ids(&self) -> Vec<String> {
        self.ids.lock().clone()
    }
}

impl SignalingFactory for FakeSignaling {
    fn create(&self, id: &str) -> Arc<dyn SignalingExchange> {
        self.ids.lock().push(id.to_string());
        self.exchange.clone()
    }
}

/// Server side of [`ResourceExchange`]: hands out numbered resources
///
/// Each exchange remembers only the resource of its own last `view`, like
/// [`crate::signaling::WhepClient`]. While held, every `view` waits on its
/// own gate, released by index.
#[derive(Default)]
pub(crate) struct FakeWhepServer {
    next_resource: AtomicUsize,
    live: Mutex<Vec<usize>>,
    hold: AtomicBool,
    gates: Mutex<Vec<Arc<Semaphore>>>,
}

impl FakeWhepServer {
    pub fn holding() -> Arc<Self> {
        let server = Self::default();
        server.hold.store(true, Ordering::SeqCst);
        Arc::new(server)
    }

    /// Let the `index`-th view proceed
    pub fn release(&self, index: usize) {
        self.gates.lock()[index].add_permits(1);
    }

    pub fn views(&self) -> usize {
        self.gates.lock().len()
    }

    /// Resources created and not deleted, in creation order
    pub fn live(&self) -> Vec<usize> {
        self.live.lock().clone()
    }
}

/// Factory giving every attempt its own [`ResourceExchange`]
pub(crate) struct ResourceSignaling {
    pub server: Arc<FakeWhepServer>,
}

impl ResourceSignaling {
    pub fn new(server: &Arc<FakeWhepServer>) -> Arc<Self> {
        Arc::new(Self {
            server: Arc::clone(server),
        })
    }
}

impl SignalingFactory for ResourceSignaling {
    fn create(&self, _id: &str) -> Arc<dyn SignalingExchange> {
        Arc::new(ResourceExchange {
            server: Arc::clone(&self.server),
            resource: Mutex::new(None),
        })
    }
}

pub(crate) struct ResourceExchange {
    server: Arc<FakeWhepServer>,
    resource: Mutex<Option<usize>>,
}

#[async_trait]
impl SignalingExchange for ResourceExchange {
    async fn view(&self, transport: &dyn Transport, _url: &Url) -> Result<()> {
        let gate = Arc::new(Semaphore::new(0));
        self.server.gates.lock().push(Arc::clone(&gate));
        if self.server.hold.load(Ordering::SeqCst) {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let _offer = transport.create_offer().await?;
        let resource = self.server.next_resource.fetch_add(1, Ordering::SeqCst);
        self.server.live.lock().push(resource);
        transport.apply_answer(format!("v=0 answer {}", resource)).await?;
        *self.resource.lock() = Some(resource);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        let resource = self.resource.lock().take();
        if let Some(resource) = resource {
            self.server.live.lock().retain(|live| *live != resource);
        }
        Ok(())
    }
}

/// Records the state of every new snapshot seen by a subscriber
///
/// Like a rendering layer, it only records when the snapshot `Arc` changed.
pub(crate) fn record_states(bridge: &SessionBridge) -> Arc<Mutex<Vec<SessionState>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let last = Mutex::new(bridge.get_snapshot());
    let reader = bridge.clone();
    let sink = Arc::clone(&seen);

    bridge.subscribe(move || {
        let snapshot = reader.get_snapshot();
        let mut last = last.lock();
        if !Arc::ptr_eq(&last, &snapshot) {
            sink.lock().push(snapshot.state);
            *last = snapshot;
        }
    });

    seen
}

/// Let spawned tasks run until they block
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
