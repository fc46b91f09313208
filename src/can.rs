//! Raw CAN transport types shared between the decode/encode layer and the
//! process boundary that actually owns a socket.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// One CAN frame: a 29-bit extended arbitration ID and up to 8 payload
/// bytes. Carries no timestamp or channel identity; those are a transport
/// concern, not a protocol one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    pub id: u32,
    pub payload: Vec<u8>,
}

impl CanFrame {
    pub fn new(id: u32, payload: impl Into<Vec<u8>>) -> Self {
        Self { id, payload: payload.into() }
    }
}

/// Failure sending a frame to the underlying transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstraction over whatever actually puts bytes on the wire (a SocketCAN
/// handle, a test double, a simulator). Devices hold a `Arc<dyn CanSink>`
/// and never touch the transport directly.
pub trait CanSink: Send + Sync {
    fn send(&self, frame: CanFrame) -> Result<(), TransportError>;
}

/// Receives a [`CanStatsSnapshot`] every time [`CanStats::notify_observers`]
/// is called, typically on a fixed interval from the receive loop.
pub type BusStatsObserver = Arc<dyn Fn(&CanStatsSnapshot) + Send + Sync>;

/// Running counters of bus activity, surfaced alongside entity state for
/// operational visibility. Mirrors `ScheiberCanBus`'s statistics: counts,
/// the set of distinct arbitration ids seen, and uptime since the bus
/// started listening.
#[derive(Default)]
pub struct CanStats {
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    frames_dropped: AtomicU64,
    unique_ids: Mutex<HashSet<u32>>,
    start_time: Mutex<Option<Instant>>,
    observers: Mutex<Vec<BusStatsObserver>>,
}

impl std::fmt::Debug for CanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanStats").field("snapshot", &self.snapshot()).finish()
    }
}

impl CanStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the moment the bus started listening, for uptime reporting.
    /// Idempotent: a bus that's already running keeps its original start.
    pub fn mark_started(&self) {
        self.start_time.lock().unwrap().get_or_insert_with(Instant::now);
    }

    pub fn record_received(&self, arbitration_id: u32) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.unique_ids.lock().unwrap().insert(arbitration_id);
    }

    pub fn record_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscribe(&self, observer: BusStatsObserver) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Publishes a fresh snapshot to every subscribed observer.
    pub fn notify_observers(&self) {
        let snapshot = self.snapshot();
        let observers: Vec<BusStatsObserver> = self.observers.lock().unwrap().clone();
        for observer in &observers {
            observer(&snapshot);
        }
    }

    pub fn snapshot(&self) -> CanStatsSnapshot {
        let uptime = self.start_time.lock().unwrap().map(|t| t.elapsed());
        CanStatsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            unique_ids: self.unique_ids.lock().unwrap().len(),
            uptime,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanStatsSnapshot {
    pub frames_received: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub unique_ids: usize,
    pub uptime: Option<Duration>,
}

/// Wraps a [`CanSink`], recording every successful send against a shared
/// [`CanStats`]. Lets a device's outgoing commands contribute to the same
/// counters as the inbound side without the device itself knowing about
/// statistics.
pub struct InstrumentedSink {
    inner: Arc<dyn CanSink>,
    stats: Arc<CanStats>,
}

impl InstrumentedSink {
    pub fn new(inner: Arc<dyn CanSink>, stats: Arc<CanStats>) -> Self {
        Self { inner, stats }
    }
}

impl CanSink for InstrumentedSink {
    fn send(&self, frame: CanFrame) -> Result<(), TransportError> {
        let result = self.inner.send(frame);
        if result.is_ok() {
            self.stats.record_sent();
        }
        result
    }
}
