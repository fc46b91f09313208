//! Time-stepped brightness transitions and flash effects.
//!
//! Both engines share the same shape: a map from output key to a cancel
//! flag, a background stepper task per active effect, and a hard guarantee
//! that starting a new effect on an output cancels whatever was running
//! there. At most one transition and one flash can be active on a given
//! output at a time; starting one kind cancels the other.

use crate::easing::Easing;
use crate::output::{DimmableLight, OutputKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Interval between steps of a fade or flash.
const STEP_DELAY: Duration = Duration::from_millis(20);

fn cancel_flag(map: &Mutex<HashMap<OutputKey, Arc<AtomicBool>>>, key: OutputKey) -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let mut guard = map.lock().unwrap();
    if let Some(previous) = guard.insert(key, flag.clone()) {
        previous.store(true, Ordering::Release);
    }
    flag
}

fn clear_if_current(map: &Mutex<HashMap<OutputKey, Arc<AtomicBool>>>, key: OutputKey, flag: &Arc<AtomicBool>) {
    let mut guard = map.lock().unwrap();
    if let Some(current) = guard.get(&key) {
        if Arc::ptr_eq(current, flag) {
            guard.remove(&key);
        }
    }
}

/// Drives brightness fades between arbitrary start and target levels over a
/// fixed duration, stepping every [`STEP_DELAY`].
pub struct TransitionEngine {
    active: Mutex<HashMap<OutputKey, Arc<AtomicBool>>>,
}

impl TransitionEngine {
    pub fn new() -> Self {
        Self { active: Mutex::new(HashMap::new()) }
    }

    /// Cancels any transition running on `key`, if one is active. A no-op
    /// otherwise.
    pub fn cancel(&self, key: OutputKey) {
        if let Some(flag) = self.active.lock().unwrap().remove(&key) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Starts a fade on `light` to `target` over `duration` using `easing`.
    /// The target brightness is recorded on `light` immediately, before the
    /// stepper runs a single tick, so a reader calling `light.state()` right
    /// away already sees the brightness the fade is driving towards.
    pub fn start(self: &Arc<Self>, light: Arc<DimmableLight>, target: u8, duration: Duration, easing: Easing) {
        let key = light.key();
        let flag = cancel_flag(&self.active, key);
        let start_brightness = light.brightness();
        light.record_transition_target(target);

        let engine = self.clone();
        tokio::spawn(async move {
            let steps = (duration.as_millis() / STEP_DELAY.as_millis()).max(1) as u32;
            for step in 1..=steps {
                if flag.load(Ordering::Acquire) {
                    return;
                }
                tokio::time::sleep(STEP_DELAY).await;
                if flag.load(Ordering::Acquire) {
                    return;
                }
                let t = step as f64 / steps as f64;
                let eased = easing.apply(t);
                let delta = target as f64 - start_brightness as f64;
                let level = (start_brightness as f64 + delta * eased).round().clamp(0.0, 255.0) as u8;
                light.send_step(level);
            }
            clear_if_current(&engine.active, key, &flag);
        });
    }
}

impl Default for TransitionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives a flash: snap to full brightness, hold, then restore the
/// pre-flash `(state, brightness)`.
pub struct FlashController {
    active: Mutex<HashMap<OutputKey, Arc<AtomicBool>>>,
}

impl FlashController {
    pub fn new() -> Self {
        Self { active: Mutex::new(HashMap::new()) }
    }

    pub fn cancel(&self, key: OutputKey) {
        if let Some(flag) = self.active.lock().unwrap().remove(&key) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Starts a flash on `light` for `duration`, capturing its current
    /// `(state, brightness)` before changing anything so it can be restored
    /// afterwards.
    pub fn start(self: &Arc<Self>, light: Arc<DimmableLight>, duration: Duration) {
        let key = light.key();
        let flag = cancel_flag(&self.active, key);
        let (pre_state, pre_brightness) = light.state();

        let controller = self.clone();
        tokio::spawn(async move {
            if flag.load(Ordering::Acquire) {
                return;
            }
            light.send_step(255);
            tokio::time::sleep(duration).await;
            if flag.load(Ordering::Acquire) {
                return;
            }
            let restore_level = if pre_state { pre_brightness } else { 0 };
            light.send_step(restore_level);
            clear_if_current(&controller.active, key, &flag);
        });
    }
}

impl Default for FlashController {
    fn default() -> Self {
        Self::new()
    }
}
