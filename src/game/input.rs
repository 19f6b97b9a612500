//! Player Input
//!
//! Raw device polling happens outside the core. Each tick the host hands
//! over a `RawInput` snapshot; every player samples it through the
//! `InputSource` chosen at registration and gets back a quantized
//! `InputFrame`. Quantizing to i8 axes keeps recorded inputs replayable.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::game::player::PlayerId;

/// Convert an i8 axis value to [-1, 1].
///
/// `-128` is reserved for "no input" and maps to 0.
#[inline]
pub fn axis_to_f32(value: i8) -> f32 {
    if value == InputFrame::NO_INPUT {
        0.0
    } else {
        value as f32 / 127.0
    }
}

/// Quantize a [-1, 1] axis value to i8.
#[inline]
pub fn axis_from_f32(value: f32) -> i8 {
    (value.clamp(-1.0, 1.0) * 127.0).round() as i8
}

// =============================================================================
// INPUT FRAME
// =============================================================================

/// One player's movement intent for a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Movement X direction: -127 (left) to +127 (right)
    /// -128 = no input
    pub move_x: i8,

    /// Movement Y direction: -127 (back) to +127 (forward)
    /// -128 = no input
    pub move_y: i8,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFrame {
    /// Special value indicating no input (stick released)
    pub const NO_INPUT: i8 = -128;

    /// Create an idle frame.
    pub const fn new() -> Self {
        Self {
            move_x: Self::NO_INPUT,
            move_y: Self::NO_INPUT,
        }
    }

    /// Create input with a movement direction.
    pub const fn with_movement(move_x: i8, move_y: i8) -> Self {
        Self { move_x, move_y }
    }

    /// Quantize a continuous direction.
    pub fn from_vec2(direction: Vec2) -> Self {
        if direction == Vec2::ZERO {
            return Self::new();
        }
        Self::with_movement(axis_from_f32(direction.x), axis_from_f32(direction.y))
    }

    /// Movement as a vector with components in [-1, 1].
    #[inline]
    pub fn move_direction(&self) -> Vec2 {
        Vec2::new(axis_to_f32(self.move_x), axis_to_f32(self.move_y))
    }

    /// Check if this is an idle frame.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.move_direction() == Vec2::ZERO
    }
}

// =============================================================================
// RAW INPUT
// =============================================================================

/// Keys the keyboard mappings use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    W,
    A,
    S,
    D,
    Up,
    Down,
    Left,
    Right,
}

/// Device state polled by the host for one tick.
#[derive(Clone, Debug, Default)]
pub struct RawInput {
    /// Keys currently held
    pub keys_down: BTreeSet<Key>,
    /// Virtual joystick axes by index (x right, y forward)
    pub joysticks: BTreeMap<u8, Vec2>,
}

impl RawInput {
    /// Empty snapshot (nothing pressed).
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as held.
    pub fn press(&mut self, key: Key) -> &mut Self {
        self.keys_down.insert(key);
        self
    }

    /// Set a joystick's axes.
    pub fn set_joystick(&mut self, index: u8, axes: Vec2) -> &mut Self {
        self.joysticks.insert(index, axes);
        self
    }

    #[inline]
    fn held(&self, key: Key) -> f32 {
        if self.keys_down.contains(&key) {
            1.0
        } else {
            0.0
        }
    }
}

// =============================================================================
// INPUT SOURCE
// =============================================================================

/// Where a player's movement comes from. Chosen once at registration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InputSource {
    /// Four keys mapped to the two movement axes.
    Keyboard {
        /// Forward
        up: Key,
        /// Back
        down: Key,
        /// Left
        left: Key,
        /// Right
        right: Key,
    },
    /// An on-screen or physical stick.
    VirtualJoystick {
        /// Joystick index in `RawInput::joysticks`
        index: u8,
        /// Magnitudes below this read as no input
        dead_zone: f32,
    },
}

impl InputSource {
    /// Default dead zone for joystick sources.
    pub const DEFAULT_DEAD_ZONE: f32 = 0.1;

    /// WASD keyboard mapping.
    pub const fn wasd() -> Self {
        Self::Keyboard {
            up: Key::W,
            down: Key::S,
            left: Key::A,
            right: Key::D,
        }
    }

    /// Arrow-key keyboard mapping.
    pub const fn arrows() -> Self {
        Self::Keyboard {
            up: Key::Up,
            down: Key::Down,
            left: Key::Left,
            right: Key::Right,
        }
    }

    /// Default binding by player number: player 1 gets WASD, player 2 the
    /// arrow keys, everyone after that a virtual joystick (index `n - 3`).
    pub fn default_for(id: PlayerId) -> Self {
        match id.number() {
            0 | 1 => Self::wasd(),
            2 => Self::arrows(),
            n => Self::VirtualJoystick {
                index: n.saturating_sub(3).min(u8::MAX as u32) as u8,
                dead_zone: Self::DEFAULT_DEAD_ZONE,
            },
        }
    }

    /// Read this source from a device snapshot.
    pub fn sample(&self, raw: &RawInput) -> InputFrame {
        let direction = match self {
            Self::Keyboard { up, down, left, right } => {
                let v = Vec2::new(
                    raw.held(*right) - raw.held(*left),
                    raw.held(*up) - raw.held(*down),
                );
                v.normalize_or_zero()
            }
            Self::VirtualJoystick { index, dead_zone } => {
                let axes = raw.joysticks.get(index).copied().unwrap_or(Vec2::ZERO);
                if axes.length() < *dead_zone {
                    Vec2::ZERO
                } else {
                    axes.clamp_length_max(1.0)
                }
            }
        };
        InputFrame::from_vec2(direction)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_conversion() {
        assert_eq!(axis_to_f32(0), 0.0);
        assert_eq!(axis_to_f32(127), 1.0);
        assert_eq!(axis_to_f32(-127), -1.0);
        assert_eq!(axis_to_f32(-128), 0.0);

        assert_eq!(axis_from_f32(1.0), 127);
        assert_eq!(axis_from_f32(-2.0), -127);
        assert_eq!(axis_from_f32(0.0), 0);
    }

    #[test]
    fn test_idle_frame() {
        assert!(InputFrame::new().is_idle());
        assert!(InputFrame::from_vec2(Vec2::ZERO).is_idle());
        assert!(!InputFrame::with_movement(127, 0).is_idle());
    }

    #[test]
    fn test_keyboard_sampling() {
        let mut raw = RawInput::new();
        raw.press(Key::W).press(Key::D);

        let frame = InputSource::wasd().sample(&raw);
        let dir = frame.move_direction();
        assert!(dir.x > 0.7 && dir.y > 0.7);
        assert!(dir.length() <= 1.01);

        // Arrow player ignores WASD
        assert!(InputSource::arrows().sample(&raw).is_idle());
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut raw = RawInput::new();
        raw.press(Key::Left).press(Key::Right);
        assert!(InputSource::arrows().sample(&raw).is_idle());
    }

    #[test]
    fn test_joystick_dead_zone() {
        let source = InputSource::VirtualJoystick { index: 0, dead_zone: 0.2 };
        let mut raw = RawInput::new();

        raw.set_joystick(0, Vec2::new(0.1, 0.05));
        assert!(source.sample(&raw).is_idle());

        raw.set_joystick(0, Vec2::new(0.0, -1.0));
        assert_eq!(source.sample(&raw), InputFrame::with_movement(0, -127));

        // Missing joystick reads as idle
        let other = InputSource::VirtualJoystick { index: 5, dead_zone: 0.2 };
        assert!(other.sample(&raw).is_idle());
    }

    #[test]
    fn test_default_bindings() {
        assert_eq!(InputSource::default_for(PlayerId::new(1)), InputSource::wasd());
        assert_eq!(InputSource::default_for(PlayerId::new(2)), InputSource::arrows());
        assert_eq!(
            InputSource::default_for(PlayerId::new(4)),
            InputSource::VirtualJoystick { index: 1, dead_zone: InputSource::DEFAULT_DEAD_ZONE }
        );
    }
}
