//! Basic ON/OFF switch output.

use super::{notify_all, Observer, PropertyValue, SendFn};
use std::sync::Mutex;

/// A plain ON/OFF output. MQTT state transitions are driven by confirmed
/// hardware state, never by the command itself: [`Switch::set`] publishes a
/// command but leaves `state` untouched until [`Switch::ingest`] sees the
/// CAN echo.
pub struct Switch {
    device_id: u8,
    slot: u8,
    name: String,
    entity_id: String,
    send: SendFn,
    state: Mutex<bool>,
    observers: Mutex<Vec<Observer>>,
}

impl Switch {
    pub fn new(device_id: u8, slot: u8, name: impl Into<String>, entity_id: impl Into<String>, send: SendFn) -> Self {
        Self {
            device_id,
            slot,
            name: name.into(),
            entity_id: entity_id.into(),
            send,
            state: Mutex::new(false),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Requests the hardware turn ON or OFF. Does not touch `state`.
    pub fn set(&self, on: bool) {
        (self.send)(self.slot, on, None);
    }

    pub fn state(&self) -> bool {
        *self.state.lock().unwrap()
    }

    pub fn subscribe(&self, observer: Observer) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Applies a decoded CAN frame value. Notifies observers only if the
    /// value actually changed; a no-op ingest must not emit spurious
    /// notifications.
    pub fn ingest(&self, state: bool) {
        let changed = {
            let mut guard = self.state.lock().unwrap();
            if *guard == state {
                false
            } else {
                *guard = state;
                true
            }
        };
        if changed {
            notify_all(&self.observers, "state", PropertyValue::State(state));
        }
    }

    /// Restores persisted state without invoking the send callback or
    /// notifying observers: restoring is side-effect-free on the bus.
    pub fn restore(&self, state: bool) {
        *self.state.lock().unwrap() = state;
    }
}
