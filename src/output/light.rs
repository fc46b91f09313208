//! Dimmable light output: brightness, fades, and flashes.

use super::{notify_all, Observer, OutputKey, PropertyValue, SendFn};
use crate::codec::DIM_THRESHOLD;
use crate::easing::Easing;
use crate::transitions::{FlashController, TransitionEngine};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
struct LightState {
    state: bool,
    brightness: u8,
}

/// A dimmable output. [`TransitionEngine::start`] writes the final target
/// into this struct's state *before* the stepper task starts animating
/// towards it, so that a reader calling [`DimmableLight::state`] right after
/// starting a fade sees the brightness the fade is driving towards rather
/// than the pre-fade value.
pub struct DimmableLight {
    device_id: u8,
    slot: u8,
    name: String,
    entity_id: String,
    send: SendFn,
    state: Mutex<LightState>,
    observers: Mutex<Vec<Observer>>,
    transitions: Arc<TransitionEngine>,
    flashes: Arc<FlashController>,
}

impl DimmableLight {
    pub fn new(
        device_id: u8,
        slot: u8,
        name: impl Into<String>,
        entity_id: impl Into<String>,
        send: SendFn,
        transitions: Arc<TransitionEngine>,
        flashes: Arc<FlashController>,
    ) -> Arc<Self> {
        Arc::new(Self {
            device_id,
            slot,
            name: name.into(),
            entity_id: entity_id.into(),
            send,
            state: Mutex::new(LightState { state: false, brightness: 0 }),
            observers: Mutex::new(Vec::new()),
            transitions,
            flashes,
        })
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn key(&self) -> OutputKey {
        (self.device_id, self.slot)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn state(&self) -> (bool, u8) {
        let guard = self.state.lock().unwrap();
        (guard.state, guard.brightness)
    }

    pub fn brightness(&self) -> u8 {
        self.state.lock().unwrap().brightness
    }

    pub fn subscribe(&self, observer: Observer) {
        self.observers.lock().unwrap().push(observer);
    }

    /// Immediate brightness change: cancels any active transition/flash,
    /// sets state synchronously, and sends the command. Unlike
    /// [`crate::output::Switch::set`], this path is optimistic: it notifies
    /// observers immediately rather than waiting for the echo.
    pub fn set_brightness(self: &Arc<Self>, brightness: u8) {
        self.transitions.cancel(self.key());
        self.flashes.cancel(self.key());
        self.apply_and_notify(brightness);
    }

    fn apply_and_notify(&self, brightness: u8) {
        let state = brightness > DIM_THRESHOLD;
        let (state_changed, brightness_changed) = {
            let mut guard = self.state.lock().unwrap();
            let state_changed = guard.state != state;
            let brightness_changed = guard.brightness != brightness;
            guard.state = state;
            guard.brightness = brightness;
            (state_changed, brightness_changed)
        };
        (self.send)(self.slot, state, Some(brightness));
        if state_changed {
            notify_all(&self.observers, "state", PropertyValue::State(state));
        }
        if brightness_changed {
            notify_all(&self.observers, "brightness", PropertyValue::Brightness(brightness));
        }
    }

    /// Sends one transition/flash step without touching observers: MQTT
    /// state is driven by confirmed hardware echoes, not by the stepper's
    /// own in-flight values.
    pub(crate) fn send_step(&self, brightness: u8) {
        let state = brightness > DIM_THRESHOLD;
        let mut guard = self.state.lock().unwrap();
        guard.state = state;
        guard.brightness = brightness;
        drop(guard);
        (self.send)(self.slot, state, Some(brightness));
    }

    /// Records the transition's final target immediately, without sending
    /// or notifying.
    pub(crate) fn record_transition_target(&self, target: u8) {
        let state = target > DIM_THRESHOLD;
        let mut guard = self.state.lock().unwrap();
        guard.state = state;
        guard.brightness = target;
    }

    /// Fades to `target` over `duration` using `easing`.
    pub fn fade_to(self: &Arc<Self>, target: u8, duration: Duration, easing: Easing) {
        self.flashes.cancel(self.key());
        self.transitions.start(self.clone(), target, duration, easing);
    }

    /// Flashes ON at full brightness, then restores the pre-flash state.
    pub fn flash(self: &Arc<Self>, duration: Duration) {
        self.transitions.cancel(self.key());
        self.flashes.start(self.clone(), duration);
    }

    /// Applies a decoded value from the CAN bus. A threshold-snap command
    /// echo reporting `state=ON` alongside a zero brightness byte would be
    /// misleading if taken at face value, but `codec::decode_half` already
    /// rewrites that exact byte pattern to `(true, 255)` before it reaches
    /// here (the hardware-quirk rule), so no separate reconciliation step is
    /// needed at this layer: every decoded value can be applied directly.
    pub fn ingest(&self, state_can: bool, brightness_can: u8) {
        let (state_changed, brightness_changed) = {
            let mut guard = self.state.lock().unwrap();
            let state_changed = guard.state != state_can;
            let brightness_changed = guard.brightness != brightness_can;
            guard.state = state_can;
            guard.brightness = brightness_can;
            (state_changed, brightness_changed)
        };

        if state_changed {
            notify_all(&self.observers, "state", PropertyValue::State(state_can));
        }
        if brightness_changed {
            notify_all(&self.observers, "brightness", PropertyValue::Brightness(brightness_can));
        }
    }

    /// Restores persisted state without invoking the send callback: the
    /// startup path must not send CAN frames derived from restored state.
    pub fn restore(&self, state: bool, brightness: u8) {
        let mut guard = self.state.lock().unwrap();
        guard.state = state;
        guard.brightness = brightness;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn light(send: SendFn) -> Arc<DimmableLight> {
        DimmableLight::new(
            7,
            0,
            "s1",
            "s1",
            send,
            Arc::new(TransitionEngine::new()),
            Arc::new(FlashController::new()),
        )
    }

    fn noop_send() -> SendFn {
        Arc::new(|_, _, _| {})
    }

    #[test]
    fn set_brightness_invariant() {
        for b in [0u8, 2, 3, 128, 255] {
            let light = light(noop_send());
            light.set_brightness(b);
            assert_eq!(light.brightness(), b);
            assert_eq!(light.state().0, b > DIM_THRESHOLD);
        }
    }

    #[test]
    fn set_brightness_notifies_observers_immediately() {
        let light = light(noop_send());
        let seen: Arc<Mutex<Vec<(String, PropertyValue)>>> = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        light.subscribe(Arc::new(move |name, value| {
            seen2.lock().unwrap().push((name.to_string(), value));
        }));
        light.set_brightness(100);
        let recorded = seen.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                ("state".to_string(), PropertyValue::State(true)),
                ("brightness".to_string(), PropertyValue::Brightness(100)),
            ]
        );
    }

    #[test]
    fn ingest_suppresses_no_op_notification() {
        let light = light(noop_send());
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        light.subscribe(Arc::new(move |_, _| {
            calls2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }));
        light.ingest(false, 0); // already (false, 0)
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn record_transition_target_updates_state_immediately() {
        let light = light(noop_send());
        light.record_transition_target(255);
        assert_eq!(light.state(), (true, 255));
    }

    #[test]
    fn ingest_applies_decoded_values_directly() {
        // codec::decode_half never emits (state=true, brightness=0): its
        // hardware-quirk rule rewrites that exact byte pattern to
        // (true, 255) before a value reaches ingest. So ingest has no
        // reconciliation to do; it just applies whatever it's given.
        let light = light(noop_send());
        light.ingest(true, 180);
        assert_eq!(light.state(), (true, 180));
        light.ingest(false, 0);
        assert_eq!(light.state(), (false, 0));
    }

    #[test]
    fn restore_does_not_send() {
        let sent = Arc::new(AtomicUsize::new(0));
        let sent2 = sent.clone();
        let light = light(Arc::new(move |_, _, _| {
            sent2.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }));
        light.restore(true, 180);
        assert_eq!(light.state(), (true, 180));
        assert_eq!(sent.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
