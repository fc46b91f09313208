//! Per-output state cells with observer fan-out.

pub mod light;
pub mod switch;

pub use light::DimmableLight;
pub use switch::Switch;

use std::sync::{Arc, Mutex};

/// A value carried by an observer notification. Notification order within
/// one change is always `state` before `brightness`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyValue {
    State(bool),
    Brightness(u8),
}

/// `(property_name, value)` observer callback registered by the state-sink
/// collaborator. Delivery is synchronous, on whatever thread performed the
/// change, against a snapshot of the observer list taken under the output's
/// mutex.
pub type Observer = Arc<dyn Fn(&str, PropertyValue) + Send + Sync>;

/// Identifies one output within the whole gateway: its owning device's bus
/// id and its slot (0-5). Used as the key for the transition/flash engines'
/// "at most one active effect per output" bookkeeping.
pub type OutputKey = (u8, u8);

/// Sends a command for `slot` with `state`/`brightness` down to the device's
/// CAN transport. `brightness` is `None` for switch commands, where the
/// concrete brightness (0 or 255) is an implementation detail of how the
/// device encodes "on"/"off".
pub type SendFn = Arc<dyn Fn(u8, bool, Option<u8>) + Send + Sync>;

/// Notifies every observer currently registered, against a snapshot taken
/// under `observers`'s lock so user callbacks never run while the lock is
/// held.
pub(crate) fn notify_all(observers: &Mutex<Vec<Observer>>, name: &str, value: PropertyValue) {
    let snapshot: Vec<Observer> = observers.lock().unwrap().clone();
    for observer in &snapshot {
        observer(name, value);
    }
}
