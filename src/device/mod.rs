//! Device-level protocol handling: one device instance owns every output on
//! a single bus id and dispatches incoming frames to them.

pub mod bloc9;

pub use bloc9::Bloc9;

use crate::can::CanFrame;
use crate::matcher::Matcher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The family of device a bus id belongs to. A tagged union stands in for
/// dynamic dispatch across device implementations: today there is exactly
/// one family, but new ones are added as variants, not as new trait impls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    Bloc9,
}

/// One protocol device on the bus. Wraps exactly one family-specific
/// implementation and forwards every operation to it.
pub enum Device {
    Bloc9(Bloc9),
}

impl Device {
    pub fn family(&self) -> DeviceFamily {
        match self {
            Device::Bloc9(_) => DeviceFamily::Bloc9,
        }
    }

    pub fn bus_id(&self) -> u8 {
        match self {
            Device::Bloc9(device) => device.bus_id(),
        }
    }

    /// Every matcher this device wants to see frames for, in no particular
    /// order.
    pub fn matchers(&self) -> Vec<Matcher> {
        match self {
            Device::Bloc9(device) => device.matchers(),
        }
    }

    pub fn process_message(&self, frame: &CanFrame) {
        match self {
            Device::Bloc9(device) => device.process_message(frame),
        }
    }

    /// Applies persisted state without sending anything on the bus.
    pub fn restore_from_state(&self, state: &HashMap<String, Value>) {
        match self {
            Device::Bloc9(device) => device.restore_from_state(state),
        }
    }

    pub fn store_to_state(&self) -> HashMap<String, Value> {
        match self {
            Device::Bloc9(device) => device.store_to_state(),
        }
    }

    /// Registers an observer for this device's `device_info` events, fired
    /// on every heartbeat.
    pub fn subscribe_device_info(&self, observer: bloc9::DeviceInfoObserver) {
        match self {
            Device::Bloc9(device) => device.subscribe_device_info(observer),
        }
    }
}
