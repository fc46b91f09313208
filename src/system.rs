//! Top-level device manager: routes incoming frames, tracks unknown ids,
//! and coordinates periodic state persistence.

use crate::can::{BusStatsObserver, CanFrame, CanStats, CanStatsSnapshot};
use crate::device::{Device, DeviceFamily};
use crate::error::{ConfigError, PersistError};
use crate::matcher::Matcher;
use crate::persistence::{self, PersistedState};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Interval between dirty-gated persistence flushes.
const STATE_SAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Interval between bus-statistics observer notifications, matching
/// `ScheiberCanBus`'s `_stats_interval`.
const STATS_NOTIFY_INTERVAL: Duration = Duration::from_secs(10);

fn device_key(family: DeviceFamily, bus_id: u8) -> String {
    format!("{family:?}_{bus_id}").to_lowercase()
}

/// Owns every configured device, routes CAN frames to them, and persists
/// their combined state to disk.
pub struct System {
    devices: Vec<Device>,
    matchers: Vec<(usize, Matcher)>,
    unknown_ids: Mutex<HashSet<u32>>,
    state_path: Option<PathBuf>,
    dirty: AtomicBool,
    stats: CanStats,
}

impl System {
    /// Builds the system from already-constructed devices. Fails if two
    /// devices share a `(family, bus_id)` identity.
    pub fn new(devices: Vec<Device>, state_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for device in &devices {
            if !seen.insert((device.family(), device.bus_id())) {
                return Err(ConfigError::DuplicateDevice { family: device.family(), bus_id: device.bus_id() });
            }
        }

        let mut matchers = Vec::new();
        for (index, device) in devices.iter().enumerate() {
            for matcher in device.matchers() {
                matchers.push((index, matcher));
            }
        }

        Ok(Self {
            devices,
            matchers,
            unknown_ids: Mutex::new(HashSet::new()),
            state_path,
            dirty: AtomicBool::new(false),
            stats: CanStats::new(),
        })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Current bus activity counters, for operational visibility.
    pub fn stats(&self) -> CanStatsSnapshot {
        self.stats.snapshot()
    }

    /// Registers an observer notified with a fresh [`CanStatsSnapshot`]
    /// every [`STATS_NOTIFY_INTERVAL`] while [`System::run`] is driving the
    /// receive loop.
    pub fn subscribe_stats(&self, observer: BusStatsObserver) {
        self.stats.subscribe(observer);
    }

    /// Routes one incoming frame to every device with a matching matcher.
    /// Frames matching nothing are logged once per distinct arbitration id
    /// and counted as dropped.
    pub fn handle_frame(&self, frame: &CanFrame) {
        self.stats.record_received(frame.id);
        let mut matched = false;
        for (index, matcher) in &self.matchers {
            if matcher.matches(frame.id) {
                matched = true;
                self.devices[*index].process_message(frame);
                self.dirty.store(true, Ordering::Release);
            }
        }

        if !matched {
            self.stats.record_dropped();
            let mut unknown = self.unknown_ids.lock().unwrap();
            if unknown.insert(frame.id) {
                warn!("unknown CAN id: 0x{:08X}, {} byte payload", frame.id, frame.payload.len());
            }
        }
    }

    /// Loads persisted state from `state_path`, if configured, applying it
    /// to every device without sending anything on the bus.
    pub async fn load_state(&self) -> Result<(), PersistError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        let path = path.clone();
        let state = tokio::task::spawn_blocking(move || persistence::load(&path)).await.expect("load task panicked")?;
        for device in &self.devices {
            let key = device_key(device.family(), device.bus_id());
            if let Some(device_state) = state.get(&key) {
                device.restore_from_state(device_state);
                info!("restored state for {key}");
            }
        }
        Ok(())
    }

    /// Collects every device's current state and writes it atomically to
    /// `state_path`, if configured and dirty. A no-op otherwise.
    pub async fn flush_state(&self) -> Result<(), PersistError> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }

        let mut state = PersistedState::new();
        for device in &self.devices {
            let key = device_key(device.family(), device.bus_id());
            state.insert(key, device.store_to_state());
        }

        let path = path.clone();
        tokio::task::spawn_blocking(move || persistence::save_atomic(&path, &state))
            .await
            .expect("save task panicked")?;
        debug!("flushed state");
        Ok(())
    }

    /// Drives the receive loop: reads frames from `frames` and dispatches
    /// them, flushes state every [`STATE_SAVE_INTERVAL`] when dirty, and
    /// exits (after a final flush) once `stop` reports `true`.
    pub async fn run(&self, mut frames: mpsc::Receiver<CanFrame>, mut stop: watch::Receiver<bool>) {
        if let Err(e) = self.load_state().await {
            warn!("failed to load persisted state: {e}");
        }
        self.stats.mark_started();

        let mut ticker = tokio::time::interval(STATE_SAVE_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut stats_ticker = tokio::time::interval(STATS_NOTIFY_INTERVAL);
        stats_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                frame = frames.recv() => {
                    match frame {
                        Some(frame) => self.handle_frame(&frame),
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.flush_state().await {
                        warn!("periodic state flush failed: {e}");
                    }
                }
                _ = stats_ticker.tick() => {
                    self.stats.notify_observers();
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        if let Err(e) = self.flush_state().await {
            warn!("final state flush failed: {e}");
        }
        info!("system stopped with {} devices", self.devices.len());
    }
}
