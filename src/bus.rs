//! The event bus: lifecycle, polling and fan-out tied together.

use crate::api::ConvoApi;
use crate::error::{ApiError, BusError, BusFault, ErrorCode, Result, Retry};
use crate::listeners::{Disposer, ListenerRegistry};
use crate::poller::{
    advance_cursor, collect_batch, filter_convo, InFlight, PollCounters, PollIntervals,
    PollStats, DEFAULT_POLL_INTERVAL,
};
use crate::state::{transition, BusEvent, BusStatus, Effect};
use crate::types::{ConvoId, GetLogParams, ListConvosParams, LogEntry, Revision};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

/// Bus configuration.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Poll interval when no caller asks for a faster one.
    pub default_poll_interval: Duration,

    /// Credential forwarded with every remote call.
    pub authorization: String,

    /// How many conversations to list when seeding the cursor.
    pub setup_list_limit: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_poll_interval: DEFAULT_POLL_INTERVAL,
            authorization: String::new(),
            setup_list_limit: 1,
        }
    }
}

impl BusConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_poll_interval.is_zero() {
            return Err(BusError::InvalidConfig(
                "default poll interval must be greater than 0".to_string(),
            ));
        }
        if self.setup_list_limit == 0 {
            return Err(BusError::InvalidConfig(
                "setup list limit must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Externally visible state of the bus.
///
/// Snapshots are immutable and shared: repeated reads return the same `Arc`
/// until the bus changes.
#[derive(Clone, Debug)]
pub struct BusSnapshot {
    pub status: BusStatus,
    /// Latest observed revision. Hidden until setup has finished.
    pub rev: Option<Revision>,
    /// Present only in the error state.
    pub error: Option<BusFault>,
}

type ObserverFn = dyn Fn() + Send + Sync;
type TrailFn = dyn Fn(&[LogEntry]) + Send + Sync;
type ConnectFn = dyn Fn() + Send + Sync;
type ErrorFn = dyn Fn(&BusFault) + Send + Sync;

/// Counter for per-instance log ids.
static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct BusState {
    status: BusStatus,
    fault: Option<BusFault>,
    rev: Option<Revision>,
    snapshot: Option<Arc<BusSnapshot>>,
}

#[derive(Default)]
struct PollTimer {
    handle: Option<JoinHandle<()>>,
    interval: Option<Duration>,
}

struct BusInner {
    id: u64,
    api: Arc<dyn ConvoApi>,
    config: BusConfig,
    runtime: Handle,

    state: Mutex<BusState>,
    intervals: Mutex<PollIntervals>,
    timer: Mutex<PollTimer>,
    in_flight: AtomicBool,
    counters: PollCounters,

    observers: ListenerRegistry<ObserverFn>,
    trails: ListenerRegistry<TrailFn>,
    connect_listeners: ListenerRegistry<ConnectFn>,
    error_listeners: ListenerRegistry<ErrorFn>,
}

/// Keeps the message log of one session in sync and fans entries out.
///
/// Cloning is cheap and every clone drives the same bus. The bus is inert
/// until the first observer subscribes (or `init` is called) and stops
/// polling once the last observer leaves.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus on the current tokio runtime.
    pub fn new(api: Arc<dyn ConvoApi>, config: BusConfig) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| BusError::NoRuntime)?;

        let inner = BusInner {
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
            api,
            intervals: Mutex::new(PollIntervals::new(config.default_poll_interval)),
            config,
            runtime,
            state: Mutex::new(BusState::default()),
            timer: Mutex::new(PollTimer::default()),
            in_flight: AtomicBool::new(false),
            counters: PollCounters::default(),
            observers: ListenerRegistry::new(),
            trails: ListenerRegistry::new(),
            connect_listeners: ListenerRegistry::new(),
            error_listeners: ListenerRegistry::new(),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    // --- Commands ---

    /// Start a session: clear the cursor and fetch it again.
    pub fn init(&self) {
        self.inner.init();
    }

    /// Keep polling at the default interval while the app is in the background.
    pub fn background(&self) {
        self.inner.background();
    }

    /// Stop polling but keep the cursor.
    pub fn suspend(&self) {
        self.inner.suspend();
    }

    /// Return to `Ready` and restart polling.
    pub fn resume(&self) {
        self.inner.resume();
    }

    /// Feed an event to the state machine directly.
    pub fn dispatch(&self, event: BusEvent) {
        self.inner.dispatch(event);
    }

    // --- Observable state ---

    /// Register an observer that is called after every change.
    ///
    /// The first observer initializes the bus (or resumes it after a
    /// suspension); disposing the last one suspends it.
    pub fn subscribe(&self, observer: impl Fn() + Send + Sync + 'static) -> Disposer {
        self.inner.subscribe(Arc::new(observer))
    }

    /// Current snapshot, shared until the next change.
    pub fn get_snapshot(&self) -> Arc<BusSnapshot> {
        self.inner.get_snapshot()
    }

    // --- Polling ---

    /// Ask for polling at least this often while the bus is ready.
    pub fn request_poll_interval(&self, interval: Duration) -> Disposer {
        self.inner.request_poll_interval(interval)
    }

    // --- Listeners ---

    /// Receive every non-empty batch of new log entries.
    pub fn trail(&self, handler: impl Fn(&[LogEntry]) + Send + Sync + 'static) -> Disposer {
        let id = self.inner.trails.add(Arc::new(handler));
        self.inner.disposer(move |inner| {
            inner.trails.remove(id);
        })
    }

    /// Receive only the entries of one conversation. Batches with no
    /// matching entry are not delivered.
    pub fn trail_convo(
        &self,
        convo_id: impl Into<ConvoId>,
        handler: impl Fn(&[LogEntry]) + Send + Sync + 'static,
    ) -> Disposer {
        let convo_id = convo_id.into();
        self.trail(move |batch| {
            let entries = filter_convo(batch, &convo_id);
            if !entries.is_empty() {
                handler(entries.as_slice());
            }
        })
    }

    /// Called when the bus connects. Fires immediately if it already is.
    pub fn on_connect(&self, handler: impl Fn() + Send + Sync + 'static) -> Disposer {
        let handler: Arc<ConnectFn> = Arc::new(handler);
        let id = self.inner.connect_listeners.add(Arc::clone(&handler));
        if self.status().is_connected() {
            handler();
        }
        self.inner.disposer(move |inner| {
            inner.connect_listeners.remove(id);
        })
    }

    /// Called on every fault. Fires immediately if the bus is already failed.
    pub fn on_error(&self, handler: impl Fn(&BusFault) + Send + Sync + 'static) -> Disposer {
        let handler: Arc<ErrorFn> = Arc::new(handler);
        let id = self.inner.error_listeners.add(Arc::clone(&handler));
        if self.status() == BusStatus::Error {
            handler(&self.inner.current_fault());
        }
        self.inner.disposer(move |inner| {
            inner.error_listeners.remove(id);
        })
    }

    // --- Inspection ---

    /// Current lifecycle status.
    pub fn status(&self) -> BusStatus {
        self.inner.state.lock().status
    }

    /// Latest observed revision, including one seeded mid-setup.
    pub fn cursor(&self) -> Option<Revision> {
        self.inner.state.lock().rev.clone()
    }

    /// Interval the poll timer runs at, if it is running.
    pub fn effective_poll_interval(&self) -> Option<Duration> {
        let timer = self.inner.timer.lock();
        timer.handle.as_ref().and(timer.interval)
    }

    /// True while a poll timer is installed.
    pub fn is_polling(&self) -> bool {
        self.inner.timer.lock().handle.is_some()
    }

    /// Number of live snapshot observers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.len()
    }

    pub fn poll_stats(&self) -> PollStats {
        self.inner.counters.snapshot()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("EventBus")
            .field("id", &self.inner.id)
            .field("status", &state.status)
            .field("rev", &state.rev)
            .finish()
    }
}

impl BusInner {
    fn init(self: &Arc<Self>) {
        debug!(bus = self.id, "init");
        self.dispatch(BusEvent::Init);
    }

    fn background(self: &Arc<Self>) {
        debug!(bus = self.id, "background");
        self.dispatch(BusEvent::Background);
    }

    fn suspend(self: &Arc<Self>) {
        debug!(bus = self.id, "suspend");
        self.dispatch(BusEvent::Suspend);
    }

    fn resume(self: &Arc<Self>) {
        debug!(bus = self.id, "resume");
        self.dispatch(BusEvent::Resume);
    }

    /// Apply `event`. Returns false when the current status ignores it.
    ///
    /// Timer effects run while the state lock is held, so concurrent
    /// dispatches start and stop the timer in the order their transitions
    /// were committed. Listeners run after the lock is released.
    fn dispatch(self: &Arc<Self>, event: BusEvent) -> bool {
        let mut state = self.state.lock();
        let prev = state.status;
        let Some(step) = transition(prev, &event) else {
            drop(state);
            debug!(bus = self.id, event = event.name(), status = %prev, "dispatch ignored");
            return false;
        };

        state.status = step.next;
        for effect in &step.effects {
            match effect {
                Effect::RecordFault => {
                    state.fault = match &event {
                        BusEvent::Error(fault) => fault.clone(),
                        _ => None,
                    };
                }
                Effect::ClearSession => {
                    state.fault = None;
                    state.rev = None;
                }
                _ => {}
            }
        }
        state.snapshot = None;

        debug!(
            bus = self.id,
            event = event.name(),
            prev = %prev,
            next = %step.next,
            "dispatch"
        );

        for effect in &step.effects {
            match effect {
                Effect::BeginSetup => self.spawn_setup(),
                Effect::ResetPoll => self.reset_poll(step.next),
                Effect::StopPoll => self.stop_poll(),
                _ => {}
            }
        }
        drop(state);

        for effect in &step.effects {
            match effect {
                Effect::EmitConnect => {
                    self.connect_listeners.emit("connect", |handler| handler());
                }
                Effect::EmitError => {
                    let fault = self.current_fault();
                    self.error_listeners.emit("error", |handler| handler(&fault));
                }
                _ => {}
            }
        }

        self.commit();
        true
    }

    /// Tell every observer that the snapshot changed.
    fn commit(&self) {
        self.observers.emit("observer", |observer| observer());
    }

    fn subscribe(self: &Arc<Self>, observer: Arc<ObserverFn>) -> Disposer {
        if self.observers.is_empty() {
            let status = self.state.lock().status;
            match status {
                BusStatus::Suspended => self.resume(),
                _ => self.init(),
            }
        }

        let id = self.observers.add(observer);
        self.disposer(move |inner| {
            if inner.observers.remove(id) && inner.observers.is_empty() {
                inner.suspend();
            }
        })
    }

    fn get_snapshot(self: &Arc<Self>) -> Arc<BusSnapshot> {
        let mut state = self.state.lock();
        if let Some(snapshot) = &state.snapshot {
            return Arc::clone(snapshot);
        }

        let rev = match state.status {
            BusStatus::Uninitialized | BusStatus::Initializing => None,
            _ => state.rev.clone(),
        };
        let error = match state.status {
            BusStatus::Error => Some(
                state
                    .fault
                    .clone()
                    .unwrap_or_else(|| self.unknown_fault()),
            ),
            _ => None,
        };

        let snapshot = Arc::new(BusSnapshot {
            status: state.status,
            rev,
            error,
        });
        state.snapshot = Some(Arc::clone(&snapshot));
        snapshot
    }

    fn request_poll_interval(self: &Arc<Self>, interval: Duration) -> Disposer {
        let id = self.intervals.lock().request(interval);
        self.reset_poll_if_active();

        self.disposer(move |inner| {
            if inner.intervals.lock().release(id) {
                inner.reset_poll_if_active();
            }
        })
    }

    fn disposer(
        self: &Arc<Self>,
        remove: impl FnOnce(&Arc<BusInner>) + Send + 'static,
    ) -> Disposer {
        let weak: Weak<BusInner> = Arc::downgrade(self);
        Disposer::new(move || {
            if let Some(inner) = weak.upgrade() {
                remove(&inner);
            }
        })
    }

    // --- Faults ---

    fn retry_handle(self: &Arc<Self>) -> Retry {
        let weak = Arc::downgrade(self);
        Retry::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.init();
            }
        })
    }

    fn unknown_fault(self: &Arc<Self>) -> BusFault {
        BusFault::new(ErrorCode::Unknown, None, self.retry_handle())
    }

    fn current_fault(self: &Arc<Self>) -> BusFault {
        let fault = self.state.lock().fault.clone();
        fault.unwrap_or_else(|| self.unknown_fault())
    }

    // --- Setup ---

    fn spawn_setup(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move { inner.setup().await });
    }

    async fn setup(self: Arc<Self>) {
        debug!(bus = self.id, "setup");

        match self.initialize_latest_rev().await {
            Ok(moved) => {
                // A bus suspended mid-setup ignores Ready but still shows the cursor.
                if !self.dispatch(BusEvent::Ready) && moved {
                    self.commit();
                }
            }
            Err(e) => {
                error!(bus = self.id, error = %e, "setup failed");
                let fault = BusFault::new(ErrorCode::InitFailed, Some(e), self.retry_handle());
                self.dispatch(BusEvent::Error(Some(fault)));
            }
        }
    }

    /// Seed the cursor from the newest conversation. Returns true if it moved.
    async fn initialize_latest_rev(&self) -> std::result::Result<bool, ApiError> {
        debug!(bus = self.id, "initialize latest rev");

        let params = ListConvosParams {
            limit: Some(self.config.setup_list_limit),
            cursor: None,
        };
        let page = self
            .api
            .list_convos(params, &self.config.authorization)
            .await?;

        let mut state = self.state.lock();
        let before = state.rev.clone();
        for convo in &page.convos {
            advance_cursor(&mut state.rev, &convo.rev);
        }
        let moved = state.rev != before;
        if moved {
            state.snapshot = None;
        }
        Ok(moved)
    }

    // --- Polling ---

    fn reset_poll_if_active(self: &Arc<Self>) {
        let state = self.state.lock();
        if state.status.is_polling() {
            self.reset_poll(state.status);
        }
    }

    /// Restart the timer for `status`. Callers hold the state lock.
    fn reset_poll(self: &Arc<Self>, status: BusStatus) {
        let interval = self.intervals.lock().effective(status);
        self.stop_poll();
        self.start_poll(interval);
    }

    fn start_poll(self: &Arc<Self>, period: Duration) {
        if !self.in_flight.load(Ordering::Acquire) {
            self.spawn_poll();
        }

        let weak = Arc::downgrade(self);
        let handle = self.runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.on_tick();
            }
        });

        let mut timer = self.timer.lock();
        if let Some(previous) = timer.handle.replace(handle) {
            previous.abort();
        }
        timer.interval = Some(period);
        debug!(bus = self.id, interval_ms = period.as_millis() as u64, "poll started");
    }

    fn stop_poll(&self) {
        let mut timer = self.timer.lock();
        if let Some(handle) = timer.handle.take() {
            handle.abort();
            debug!(bus = self.id, "poll stopped");
        }
        timer.interval = None;
    }

    fn on_tick(self: &Arc<Self>) {
        // An aborted timer can still be mid-tick on another worker.
        if !self.state.lock().status.is_polling() {
            return;
        }
        if self.in_flight.load(Ordering::Acquire) {
            let skipped = self.counters.skipped();
            warn!(bus = self.id, skipped, "previous poll still in flight; tick skipped");
            return;
        }
        self.spawn_poll();
    }

    fn spawn_poll(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.runtime.spawn(async move { inner.poll().await });
    }

    async fn poll(self: Arc<Self>) {
        let Some(_flight) = InFlight::acquire(&self.in_flight) else {
            return;
        };
        self.counters.started();

        let cursor = self.state.lock().rev.clone();
        debug!(bus = self.id, cursor = ?cursor, "poll");

        let result = self
            .api
            .get_log(GetLogParams { cursor }, &self.config.authorization)
            .await;

        match result {
            Ok(page) => self.ingest(page.logs),
            Err(e) => {
                self.counters.failed();
                error!(bus = self.id, error = %e, "poll events failed");
                let fault = BusFault::new(ErrorCode::PollFailed, Some(e), self.retry_handle());
                self.dispatch(BusEvent::Error(Some(fault)));
            }
        }
    }

    /// Advance the cursor over a page of entries and publish what was new.
    fn ingest(&self, entries: Vec<LogEntry>) {
        let (batch, moved) = {
            let mut state = self.state.lock();
            let before = state.rev.clone();
            let batch = collect_batch(&mut state.rev, entries);
            let moved = state.rev != before;
            if moved {
                state.snapshot = None;
            }
            (batch, moved)
        };

        if !batch.is_empty() {
            debug!(bus = self.id, count = batch.len(), "publishing log batch");
            self.trails.emit("trail", |handler| handler(batch.as_slice()));
        }
        if moved {
            self.commit();
        }
    }
}

impl Drop for BusInner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().handle.take() {
            handle.abort();
        }
    }
}
