use crate::addr::Position;
use crate::error::Fault;
use serde::{Deserialize, Serialize};

/// Monotonic milliseconds.
pub type Millis = u64;

/// Logical key identifier.
///
/// The low byte carries the HID usage for plain keys. `Key::NONE` asks the
/// host to resolve the key through its keymap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(pub u16);

const DUAL_ROLE_FIRST: u16 = 0x5001;
pub const DUAL_ROLE_COUNT: usize = 4;

impl Key {
    pub const NONE: Key = Key(0);

    pub const fn from_usage(usage: u8) -> Self {
        Self(usage as u16)
    }

    /// The dual-role key bound to tap/hold slot `idx`.
    pub const fn dual_role(idx: usize) -> Self {
        Self(DUAL_ROLE_FIRST + idx as u16)
    }

    pub fn dual_role_index(self) -> Option<usize> {
        let first = DUAL_ROLE_FIRST;
        let last = DUAL_ROLE_FIRST + DUAL_ROLE_COUNT as u16 - 1;
        if (first..=last).contains(&self.0) {
            Some((self.0 - first) as usize)
        } else {
            None
        }
    }

    pub fn is_dual_role(self) -> bool {
        self.dual_role_index().is_some()
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// Raw switch state for one scan cycle.
///
/// `IS_PRESSED` alone is a fresh down edge, `WAS_PRESSED` alone a release,
/// both together a held key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyState(u8);

impl KeyState {
    pub const WAS_PRESSED: u8 = 0x01;
    pub const IS_PRESSED: u8 = 0x02;

    pub const IDLE: KeyState = KeyState(0);
    pub const DOWN: KeyState = KeyState(Self::IS_PRESSED);
    pub const UP: KeyState = KeyState(Self::WAS_PRESSED);
    pub const HELD: KeyState = KeyState(Self::IS_PRESSED | Self::WAS_PRESSED);

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn is_pressed(self) -> bool {
        self.0 & Self::IS_PRESSED != 0
    }

    pub const fn was_pressed(self) -> bool {
        self.0 & Self::WAS_PRESSED != 0
    }

    pub const fn toggled_on(self) -> bool {
        self.is_pressed() && !self.was_pressed()
    }

    pub const fn toggled_off(self) -> bool {
        self.was_pressed() && !self.is_pressed()
    }

    pub const fn is_held(self) -> bool {
        self.is_pressed() && self.was_pressed()
    }

    pub const fn is_idle(self) -> bool {
        self.0 == 0
    }
}

/// One key transition flowing through the plugin chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyswitchEvent {
    pub pos: Position,
    pub key: Key,
    pub state: KeyState,
    /// Synthesized by an engine rather than read from the matrix.
    pub injected: bool,
}

impl KeyswitchEvent {
    pub const fn new(pos: Position, key: Key, state: KeyState) -> Self {
        Self {
            pos,
            key,
            state,
            injected: false,
        }
    }

    pub const fn injected(pos: Position, key: Key, state: KeyState) -> Self {
        Self {
            pos,
            key,
            state,
            injected: true,
        }
    }
}

/// Tri-state hook result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue with the next plugin in the chain.
    Pass,
    /// Stop the chain; the event does not reach the report.
    Consumed,
    /// Abort processing of this event.
    Fatal(Fault),
}

impl EventResult {
    pub fn is_fatal(&self) -> bool {
        matches!(self, EventResult::Fatal(_))
    }
}

/// HID keyboard usages used by the keymap, tests and the simulator.
pub mod keys {
    use super::Key;

    pub const A: Key = Key::from_usage(0x04);
    pub const B: Key = Key::from_usage(0x05);
    pub const C: Key = Key::from_usage(0x06);
    pub const D: Key = Key::from_usage(0x07);
    pub const E: Key = Key::from_usage(0x08);
    pub const F: Key = Key::from_usage(0x09);
    pub const I: Key = Key::from_usage(0x0C);
    pub const S: Key = Key::from_usage(0x16);
    pub const Z: Key = Key::from_usage(0x1D);
    pub const ENTER: Key = Key::from_usage(0x28);
    pub const ESCAPE: Key = Key::from_usage(0x29);
    pub const SPACE: Key = Key::from_usage(0x2C);
    pub const LEFT_CONTROL: Key = Key::from_usage(0xE0);
    pub const LEFT_SHIFT: Key = Key::from_usage(0xE1);
    pub const LEFT_ALT: Key = Key::from_usage(0xE2);
    pub const LEFT_GUI: Key = Key::from_usage(0xE3);

    /// Resolves a key name as written in simulator scripts (`"a"`, `"lshift"`,
    /// `"dual2"`, `"0x2c"`).
    pub fn from_name(name: &str) -> Option<Key> {
        let lower = name.to_ascii_lowercase();
        if let Some(hex) = lower.strip_prefix("0x") {
            return u16::from_str_radix(hex, 16).ok().map(Key);
        }
        if let Some(idx) = lower.strip_prefix("dual") {
            return match idx.parse::<usize>() {
                Ok(n) if (1..=super::DUAL_ROLE_COUNT).contains(&n) => Some(Key::dual_role(n - 1)),
                _ => None,
            };
        }
        let bytes = lower.as_bytes();
        if bytes.len() == 1 {
            let c = bytes[0];
            return match c {
                b'a'..=b'z' => Some(Key::from_usage(0x04 + (c - b'a'))),
                b'1'..=b'9' => Some(Key::from_usage(0x1E + (c - b'1'))),
                b'0' => Some(Key::from_usage(0x27)),
                _ => None,
            };
        }
        match lower.as_str() {
            "enter" => Some(ENTER),
            "esc" | "escape" => Some(ESCAPE),
            "space" => Some(SPACE),
            "tab" => Some(Key::from_usage(0x2B)),
            "backspace" => Some(Key::from_usage(0x2A)),
            "lctrl" => Some(LEFT_CONTROL),
            "lshift" => Some(LEFT_SHIFT),
            "lalt" => Some(LEFT_ALT),
            "lgui" => Some(LEFT_GUI),
            "rctrl" => Some(Key::from_usage(0xE4)),
            "rshift" => Some(Key::from_usage(0xE5)),
            "ralt" => Some(Key::from_usage(0xE6)),
            "rgui" => Some(Key::from_usage(0xE7)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state_predicates() {
        assert!(KeyState::DOWN.toggled_on());
        assert!(!KeyState::DOWN.was_pressed());
        assert!(KeyState::UP.toggled_off());
        assert!(!KeyState::UP.is_pressed());
        assert!(KeyState::HELD.is_held());
        assert!(!KeyState::HELD.toggled_on());
        assert!(!KeyState::HELD.toggled_off());
        assert!(KeyState::IDLE.is_idle());
    }

    #[test]
    fn test_dual_role_range() {
        assert_eq!(Key::dual_role(0).dual_role_index(), Some(0));
        assert_eq!(Key::dual_role(3).dual_role_index(), Some(3));
        assert_eq!(Key(Key::dual_role(3).0 + 1).dual_role_index(), None);
        assert!(!keys::A.is_dual_role());
        assert!(!Key::NONE.is_dual_role());
    }

    #[test]
    fn test_key_names() {
        assert_eq!(keys::from_name("a"), Some(keys::A));
        assert_eq!(keys::from_name("Z"), Some(keys::Z));
        assert_eq!(keys::from_name("lshift"), Some(keys::LEFT_SHIFT));
        assert_eq!(keys::from_name("dual1"), Some(Key::dual_role(0)));
        assert_eq!(keys::from_name("dual5"), None);
        assert_eq!(keys::from_name("0x2c"), Some(keys::SPACE));
        assert_eq!(keys::from_name("nope"), None);
    }
}
