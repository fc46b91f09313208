//! Bloc9: six dimmable-or-switched outputs (S1-S6) behind one bus id.

use crate::can::{CanFrame, CanSink};
use crate::codec::{command_arbitration_id, decode_switch_pair, heartbeat_arbitration_id, switch_pair_arbitration_id};
use crate::matcher::Matcher;
use crate::output::{DimmableLight, Observer, Switch};
use crate::transitions::{FlashController, TransitionEngine};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// `(device_type, bus_id, outputs)` snapshot published on every heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: &'static str,
    pub bus_id: u8,
    pub outputs: Vec<(String, String)>,
}

pub type DeviceInfoObserver = Arc<dyn Fn(&DeviceInfo) + Send + Sync>;

enum OutputHandle {
    Light(Arc<DimmableLight>),
    Switch(Arc<Switch>),
}

impl OutputHandle {
    fn ingest(&self, state: bool, brightness: u8) {
        match self {
            OutputHandle::Light(light) => light.ingest(state, brightness),
            OutputHandle::Switch(switch) => switch.ingest(state),
        }
    }

    fn slot(&self) -> u8 {
        match self {
            OutputHandle::Light(light) => light.slot(),
            OutputHandle::Switch(switch) => switch.slot(),
        }
    }

    fn name(&self) -> String {
        match self {
            OutputHandle::Light(light) => light.name().to_string(),
            OutputHandle::Switch(switch) => switch.name().to_string(),
        }
    }
}

/// Six-output Bloc9 device. Dispatch is a flat lookup table from
/// arbitration id to the outputs sharing that switch-pair frame, built once
/// at construction so `process_message` never has to search.
pub struct Bloc9 {
    device_id: u8,
    lights: Vec<Arc<DimmableLight>>,
    switches: Vec<Arc<Switch>>,
    heartbeat_id: u32,
    command_echo_id: u32,
    dispatch: HashMap<u32, Vec<OutputHandle>>,
    device_info_observers: Mutex<Vec<DeviceInfoObserver>>,
}

/// Configuration for one output slot (0-5), shared by lights and switches.
pub struct OutputSpec {
    pub slot: u8,
    pub name: String,
    pub entity_id: String,
}

impl Bloc9 {
    pub fn new(
        device_id: u8,
        light_specs: Vec<OutputSpec>,
        switch_specs: Vec<OutputSpec>,
        can_sink: Arc<dyn CanSink>,
    ) -> Self {
        let transitions = Arc::new(TransitionEngine::new());
        let flashes = Arc::new(FlashController::new());

        let mut lights = Vec::new();
        for spec in light_specs {
            let send = send_switch_command(device_id, can_sink.clone());
            lights.push(DimmableLight::new(
                device_id,
                spec.slot,
                spec.name,
                spec.entity_id,
                send,
                transitions.clone(),
                flashes.clone(),
            ));
        }

        let mut switches = Vec::new();
        for spec in switch_specs {
            let send = send_switch_command(device_id, can_sink.clone());
            switches.push(Arc::new(Switch::new(device_id, spec.slot, spec.name, spec.entity_id, send)));
        }

        let mut dispatch: HashMap<u32, Vec<OutputHandle>> = HashMap::new();
        for light in &lights {
            let id = switch_pair_arbitration_id(device_id, light.slot());
            dispatch.entry(id).or_default().push(OutputHandle::Light(light.clone()));
        }
        for switch in &switches {
            let id = switch_pair_arbitration_id(device_id, switch.slot());
            dispatch.entry(id).or_default().push(OutputHandle::Switch(switch.clone()));
        }

        Self {
            device_id,
            lights,
            switches,
            heartbeat_id: heartbeat_arbitration_id(device_id),
            command_echo_id: command_arbitration_id(device_id),
            dispatch,
            device_info_observers: Mutex::new(Vec::new()),
        }
    }

    pub fn bus_id(&self) -> u8 {
        self.device_id
    }

    pub fn lights(&self) -> &[Arc<DimmableLight>] {
        &self.lights
    }

    pub fn switches(&self) -> &[Arc<Switch>] {
        &self.switches
    }

    pub fn subscribe_device_info(&self, observer: DeviceInfoObserver) {
        self.device_info_observers.lock().unwrap().push(observer);
    }

    /// Exposes an observer registration convenience for the output on
    /// `slot`, if any.
    pub fn subscribe_output(&self, slot: u8, observer: Observer) {
        if let Some(light) = self.lights.iter().find(|l| l.slot() == slot) {
            light.subscribe(observer);
        } else if let Some(switch) = self.switches.iter().find(|s| s.slot() == slot) {
            switch.subscribe(observer);
        }
    }

    /// Every matcher this device needs to see on the bus: one per distinct
    /// switch-pair arbitration id in use, plus heartbeat and command echo.
    pub fn matchers(&self) -> Vec<Matcher> {
        let mut matchers: Vec<Matcher> = self
            .dispatch
            .keys()
            .map(|&pattern| Matcher::new(pattern, 0xFFFF_FFFF))
            .collect();
        matchers.push(Matcher::new(self.heartbeat_id, 0xFFFF_FFFF));
        matchers.push(Matcher::new(self.command_echo_id, 0xFFFF_FFFF));
        matchers
    }

    pub fn process_message(&self, frame: &CanFrame) {
        if frame.id == self.heartbeat_id {
            self.publish_device_info();
            return;
        }
        if frame.id == self.command_echo_id {
            return;
        }
        let Some(outputs) = self.dispatch.get(&frame.id) else {
            return;
        };
        let Ok([lower, higher]) = decode_switch_pair(&frame.payload) else {
            return;
        };
        for output in outputs {
            let (state, brightness) = if output.slot() % 2 == 0 { lower } else { higher };
            output.ingest(state, brightness);
        }
    }

    fn publish_device_info(&self) {
        let mut outputs: Vec<(String, String)> =
            (0..6).map(|slot| (format!("s{}", slot + 1), "unknown".to_string())).collect();
        for light in &self.lights {
            outputs[light.slot() as usize].1 = light.name().to_string();
        }
        for switch in &self.switches {
            outputs[switch.slot() as usize].1 = switch.name().to_string();
        }
        let info = DeviceInfo { device_type: "bloc9", bus_id: self.device_id, outputs };
        let snapshot: Vec<DeviceInfoObserver> = self.device_info_observers.lock().unwrap().clone();
        for observer in &snapshot {
            observer(&info);
        }
    }

    /// Applies persisted per-output state without sending anything on the
    /// bus; the device reconciles with reality on the next heartbeat or
    /// switch-pair frame.
    pub fn restore_from_state(&self, state: &HashMap<String, Value>) {
        for light in &self.lights {
            let key = format!("s{}", light.slot() + 1);
            if let Some(saved) = state.get(&key) {
                let brightness = saved.get("brightness").and_then(Value::as_u64).unwrap_or(0) as u8;
                let on = saved.get("state").and_then(Value::as_bool).unwrap_or(brightness > 0);
                light.restore(on, brightness);
            }
        }
        for switch in &self.switches {
            let key = format!("s{}", switch.slot() + 1);
            if let Some(saved) = state.get(&key) {
                let on = saved.get("state").and_then(Value::as_bool).unwrap_or(false);
                switch.restore(on);
            }
        }
    }

    pub fn store_to_state(&self) -> HashMap<String, Value> {
        let mut state = HashMap::new();
        for light in &self.lights {
            let (on, brightness) = light.state();
            state.insert(format!("s{}", light.slot() + 1), json!({ "state": on, "brightness": brightness }));
        }
        for switch in &self.switches {
            state.insert(format!("s{}", switch.slot() + 1), json!({ "state": switch.state() }));
        }
        state
    }
}

fn send_switch_command(device_id: u8, can_sink: Arc<dyn CanSink>) -> crate::output::SendFn {
    Arc::new(move |slot, state, brightness| {
        let brightness = brightness.unwrap_or(if state { 255 } else { 0 });
        let payload = crate::codec::encode_command(slot, state, brightness);
        let id = command_arbitration_id(device_id);
        let _ = can_sink.send(CanFrame::new(id, payload.to_vec()));
    })
}
