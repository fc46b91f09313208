//! Declarative configuration: which Bloc9 outputs are exposed as entities.

use crate::device::DeviceFamily;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One light or switch bound to a numbered output (`s1`..`s6`). Deserialized
/// from the configuration document, or assembled programmatically via the
/// generated builder (`OutputConfig::builder()...build()`).
#[derive(Debug, Clone, Deserialize, Serialize, bon::Builder)]
pub struct OutputConfig {
    #[builder(into)]
    pub name: String,
    #[serde(default)]
    #[builder(into)]
    pub entity_id: Option<String>,
    #[builder(into)]
    pub output: String,
    /// Set only when the output's initial brightness must be forced at
    /// startup, bypassing restored or on-device state. Rarely used: it
    /// sends a command the moment the device comes online.
    #[serde(default)]
    pub initial_brightness: Option<u8>,
}

impl OutputConfig {
    /// Resolves the entity id to use, generating one from `name` when the
    /// configuration doesn't set it explicitly.
    fn resolved_entity_id(&self) -> String {
        self.entity_id.clone().unwrap_or_else(|| slugify(&self.name))
    }

    /// Parses `s1`..`s6` into a zero-based slot index.
    fn slot(&self) -> Result<u8, ConfigError> {
        let bytes = self.output.as_bytes();
        if bytes.len() == 2 && bytes[0] == b's' && bytes[1].is_ascii_digit() {
            let n = bytes[1] - b'0';
            if (1..=6).contains(&n) {
                return Ok(n - 1);
            }
        }
        Err(ConfigError::InvalidSlot(self.output.clone()))
    }
}

fn slugify(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    let mut slug = String::new();
    let mut last_was_underscore = false;
    for c in cleaned.chars() {
        let mapped = if c.is_whitespace() { '_' } else { c.to_ascii_lowercase() };
        if mapped == '_' {
            if !last_was_underscore && !slug.is_empty() {
                slug.push('_');
            }
            last_was_underscore = true;
        } else {
            slug.push(mapped);
            last_was_underscore = false;
        }
    }
    slug.trim_matches('_').to_string()
}

/// One Bloc9 device and its exposed outputs.
#[derive(Debug, Clone, Deserialize, Serialize, bon::Builder)]
pub struct DeviceConfig {
    pub bus_id: u8,
    #[serde(default)]
    #[builder(into)]
    pub name: Option<String>,
    #[serde(default)]
    #[builder(default)]
    pub lights: Vec<OutputConfig>,
    #[serde(default)]
    #[builder(default)]
    pub switches: Vec<OutputConfig>,
}

impl DeviceConfig {
    pub fn device_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| format!("Bloc9 {}", self.bus_id))
    }
}

/// Top-level configuration: the set of Bloc9 devices to bridge to MQTT.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default)]
    pub bloc9: Vec<DeviceConfig>,

    /// Any top-level key that isn't a recognized device family, captured
    /// here instead of silently dropped so [`Configuration::validate`] can
    /// reject it with [`ConfigError::UnknownDeviceType`].
    #[serde(flatten)]
    pub unknown_device_families: std::collections::BTreeMap<String, serde_yaml::Value>,
}

/// One fully-resolved output assignment, produced by [`Configuration::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub bus_id: u8,
    pub slot: u8,
    pub name: String,
    pub entity_id: String,
    pub is_light: bool,
    pub initial_brightness: Option<u8>,
}

impl Configuration {
    /// Parses from YAML text. An empty document yields an empty
    /// configuration rather than an error: the gateway runs with zero
    /// discovered entities until one is added.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validates structural and cross-device invariants and produces the
    /// flattened list of outputs to construct:
    ///
    /// - `bus_id` must fit in 0..=15 (the Bloc9 device-id address space).
    /// - no two devices may share a `(family, bus_id)` pair.
    /// - `output` must name a valid slot (`s1`..`s6`) and must not be
    ///   claimed by both a light and a switch on the same device.
    /// - entity ids must be globally unique once the `light.`/`switch.`
    ///   component prefix is applied.
    pub fn validate(&self) -> Result<Vec<ResolvedOutput>, ConfigError> {
        if let Some(key) = self.unknown_device_families.keys().next() {
            return Err(ConfigError::UnknownDeviceType(key.clone()));
        }

        let mut seen_devices: HashSet<(DeviceFamily, u8)> = HashSet::new();
        let mut seen_entity_ids: HashSet<String> = HashSet::new();
        let mut resolved = Vec::new();

        for device in &self.bloc9 {
            if device.bus_id > 15 {
                return Err(ConfigError::BusIdOutOfRange(device.bus_id));
            }
            if !seen_devices.insert((DeviceFamily::Bloc9, device.bus_id)) {
                return Err(ConfigError::DuplicateDevice { family: DeviceFamily::Bloc9, bus_id: device.bus_id });
            }

            let mut claimed_slots: HashSet<u8> = HashSet::new();

            for light in &device.lights {
                let slot = light.slot()?;
                if !claimed_slots.insert(slot) {
                    return Err(ConfigError::SlotAssignedTwice { slot: light.output.clone() });
                }
                let entity_id = light.resolved_entity_id();
                let full_id = format!("light.{entity_id}");
                if !seen_entity_ids.insert(full_id.clone()) {
                    return Err(ConfigError::DuplicateEntityId(full_id));
                }
                resolved.push(ResolvedOutput {
                    bus_id: device.bus_id,
                    slot,
                    name: light.name.clone(),
                    entity_id,
                    is_light: true,
                    initial_brightness: light.initial_brightness,
                });
            }

            for switch in &device.switches {
                let slot = switch.slot()?;
                if !claimed_slots.insert(slot) {
                    return Err(ConfigError::SlotAssignedTwice { slot: switch.output.clone() });
                }
                let entity_id = switch.resolved_entity_id();
                let full_id = format!("switch.{entity_id}");
                if !seen_entity_ids.insert(full_id.clone()) {
                    return Err(ConfigError::DuplicateEntityId(full_id));
                }
                resolved.push(ResolvedOutput {
                    bus_id: device.bus_id,
                    slot,
                    name: switch.name.clone(),
                    entity_id,
                    is_light: false,
                    initial_brightness: None,
                });
            }
        }

        Ok(resolved)
    }
}
