use crate::types::{Key, Millis, DUAL_ROLE_COUNT};
use serde::{Deserialize, Serialize};

/// Timing and bindings for the dual-role keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapHoldConfig {
    /// A dual-role key held this long commits to hold.
    #[serde(default = "default_tap_time_ms")]
    pub tap_time_ms: Millis,
    /// A tapped key stays reported at most this long after the press.
    #[serde(default = "default_active_time_max_ms")]
    pub active_time_max_ms: Millis,
    /// Key emitted by each slot.
    #[serde(default)]
    pub actual_keys: [Key; DUAL_ROLE_COUNT],
}

fn default_tap_time_ms() -> Millis {
    180
}

fn default_active_time_max_ms() -> Millis {
    320
}

impl Default for TapHoldConfig {
    fn default() -> Self {
        Self {
            tap_time_ms: default_tap_time_ms(),
            active_time_max_ms: default_active_time_max_ms(),
            actual_keys: [Key::NONE; DUAL_ROLE_COUNT],
        }
    }
}

impl TapHoldConfig {
    pub fn with_actual(mut self, slot: usize, key: Key) -> Self {
        if slot < DUAL_ROLE_COUNT {
            self.actual_keys[slot] = key;
        }
        self
    }
}
