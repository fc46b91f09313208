//! Bit/byte-level decode and encode of Bloc9 frame payloads.

use crate::error::DecodeError;
use crate::matcher::{tagged_device_byte, MessageClass};

/// Brightness values in `[0, DIM_THRESHOLD]` mean OFF; values in
/// `[255 - DIM_THRESHOLD, 255]` mean full ON with no PWM. The threshold is
/// symmetric at both ends.
pub const DIM_THRESHOLD: u8 = 2;

/// Decodes one 4-byte half of a switch-pair payload into `(state,
/// brightness)`, applying the derivation rule and hardware quirk:
///
/// - `state := state_bit || brightness > DIM_THRESHOLD`
/// - if `state_bit` is set and `brightness == 0`, the hardware is reporting
///   "full on, no PWM"; treat brightness as 255.
fn decode_half(half: &[u8; 4]) -> (bool, u8) {
    let mut brightness = half[0];
    let state_bit = (half[3] & 0x01) != 0;

    if state_bit && brightness == 0 {
        brightness = 255;
    }

    let state = state_bit || brightness > DIM_THRESHOLD;
    (state, brightness)
}

/// Decodes a switch-pair frame payload (S1S2, S3S4, or S5S6 class) into the
/// two outputs it carries: `[lower_slot, higher_slot]`. The lower-index
/// (even) slot occupies bytes 0-3; the higher-index (odd) slot occupies
/// bytes 4-7.
///
/// Returns [`DecodeError::ShortFrame`] if the payload is not exactly 8
/// bytes; the caller must leave output state untouched in that case.
pub fn decode_switch_pair(payload: &[u8]) -> Result<[(bool, u8); 2], DecodeError> {
    if payload.len() < 8 {
        return Err(DecodeError::ShortFrame(payload.len()));
    }

    let lower: [u8; 4] = payload[0..4].try_into().unwrap();
    let higher: [u8; 4] = payload[4..8].try_into().unwrap();

    Ok([decode_half(&lower), decode_half(&higher)])
}

/// The `(mode, level)` byte pair chosen by threshold snapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Hard OFF, no PWM.
    Off,
    /// Full ON, no PWM.
    On,
    /// PWM dimming at `level` (1..=254).
    Pwm(u8),
}

fn snap(brightness: u8) -> Mode {
    if brightness <= DIM_THRESHOLD {
        Mode::Off
    } else if brightness >= 255 - DIM_THRESHOLD {
        Mode::On
    } else {
        Mode::Pwm(brightness.clamp(1, 254))
    }
}

/// Encodes an outgoing command for one slot into the 4-byte payload
/// `[slot, mode, 0, level]`, applying the threshold-snapping rule:
///
/// - `brightness <= DIM_THRESHOLD`: `mode=0x00, level=0x00`
/// - `brightness >= 255 - DIM_THRESHOLD`: `mode=0x01, level=0x00`
/// - otherwise: `mode=0x11, level=brightness.clamp(1, 254)`
///
/// `state` does not otherwise affect the encoding: the hardware derives its
/// own state bit from `mode`/`level`, and the protocol has no separate
/// "state but zero brightness" representation.
pub fn encode_command(slot: u8, _state: bool, brightness: u8) -> [u8; 4] {
    match snap(brightness) {
        Mode::Off => [slot, 0x00, 0x00, 0x00],
        Mode::On => [slot, 0x01, 0x00, 0x00],
        Mode::Pwm(level) => [slot, 0x11, 0x00, level],
    }
}

/// The arbitration ID used for every outgoing Bloc9 command from `device_id`:
/// the `Command` class prefix OR-ed with the tagged device byte.
pub const fn command_arbitration_id(device_id: u8) -> u32 {
    0x0236_0600 | (tagged_device_byte(device_id) as u32)
}

/// The arbitration ID matching heartbeat frames for `device_id`.
pub const fn heartbeat_arbitration_id(device_id: u8) -> u32 {
    0x0000_0600 | (tagged_device_byte(device_id) as u32)
}

/// Returns the arbitration ID for the switch-pair message class that owns
/// `slot` (0-5), on `device_id`.
pub const fn switch_pair_arbitration_id(device_id: u8, slot: u8) -> u32 {
    let class = match slot {
        0 | 1 => MessageClass::S1S2,
        2 | 3 => MessageClass::S3S4,
        _ => MessageClass::S5S6,
    };
    match class {
        MessageClass::S1S2 => 0x0216_0600 | (tagged_device_byte(device_id) as u32),
        MessageClass::S3S4 => 0x0218_0600 | (tagged_device_byte(device_id) as u32),
        MessageClass::S5S6 => 0x021A_0600 | (tagged_device_byte(device_id) as u32),
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_short_frames() {
        assert_eq!(decode_switch_pair(&[0; 7]), Err(DecodeError::ShortFrame(7)));
    }

    #[test]
    fn decode_s1_on_from_physical_button() {
        // id=0x021606D0 (not exercised here), payload [0x64, 0, 0, 0x01, 0, 0, 0, 0].
        let payload = [0x64, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        let [s1, s2] = decode_switch_pair(&payload).unwrap();
        assert_eq!(s1, (true, 100));
        assert_eq!(s2, (false, 0));
    }

    #[test]
    fn decode_hardware_quirk_full_on_no_pwm() {
        // state_bit=1, brightness=0 => (true, 255)
        let payload = [0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
        let [s1, _] = decode_switch_pair(&payload).unwrap();
        assert_eq!(s1, (true, 255));
    }

    #[test]
    fn decode_threshold_derivation_without_state_bit() {
        // state_bit=0, brightness=3 => (true, 3)
        let payload = [0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let [s1, _] = decode_switch_pair(&payload).unwrap();
        assert_eq!(s1, (true, 3));
    }

    #[test]
    fn decode_at_rest_off() {
        let payload = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let [s1, s2] = decode_switch_pair(&payload).unwrap();
        assert_eq!(s1, (false, 0));
        assert_eq!(s2, (false, 0));
    }

    #[test]
    fn encode_boundary_table() {
        for b in [0u8, 1, 2] {
            assert_eq!(encode_command(3, true, b), [3, 0x00, 0x00, 0x00]);
        }
        for b in [3u8, 128, 252] {
            assert_eq!(encode_command(3, true, b), [3, 0x11, 0x00, b]);
        }
        for b in [253u8, 254, 255] {
            assert_eq!(encode_command(3, true, b), [3, 0x01, 0x00, 0x00]);
        }
    }

    #[test]
    fn round_trip_law() {
        for b in [0u8, 3, 50, 128, 200, 252, 255] {
            let [_, mode, _, level] = encode_command(1, true, b);
            // Reconstruct what the device would echo for this command: the
            // state bit is set for ON/PWM modes, clear for OFF.
            let state_bit = mode != 0x00;
            let payload = [level, 0, 0, u8::from(state_bit), 0, 0, 0, 0];
            let [decoded, _] = decode_switch_pair(&payload).unwrap();
            let expected = match b {
                0 | 1 | 2 => (false, 0),
                253 | 254 | 255 => (true, 255),
                other => (true, other),
            };
            assert_eq!(decoded, expected, "b={b}");
        }
    }

    #[test]
    fn command_arbitration_id_matches_worked_example() {
        assert_eq!(command_arbitration_id(10), 0x0236_06D0);
        assert_eq!(switch_pair_arbitration_id(10, 0), 0x0216_06D0);
    }
}
