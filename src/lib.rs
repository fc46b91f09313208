#![recursion_limit = "256"]

//! Core protocol library for bridging a Scheiber Bloc9 CAN-bus lighting
//! network to a Home-Assistant-style MQTT state sink: frame decode/encode,
//! per-output state, time-stepped transitions, and durable persistence.
//! MQTT publishing itself lives at the integration's edge, not here; this
//! crate exposes plain observer callbacks for whatever sink wants them.

pub mod can;
pub mod codec;
pub mod config;
pub mod device;
pub mod easing;
pub mod error;
pub mod matcher;
pub mod output;
pub mod persistence;
pub mod system;
pub mod transitions;

pub use can::{BusStatsObserver, CanFrame, CanSink, CanStats, CanStatsSnapshot, InstrumentedSink, TransportError};
pub use codec::DIM_THRESHOLD;
pub use config::{Configuration, DeviceConfig, OutputConfig, ResolvedOutput};
pub use device::{Bloc9, Device, DeviceFamily};
pub use easing::{Easing, DEFAULT_EASING};
pub use error::{ConfigError, DecodeError, EasingError, PersistError};
pub use matcher::{Matcher, MessageClass};
pub use output::{DimmableLight, Observer, OutputKey, PropertyValue, SendFn, Switch};
pub use system::System;
