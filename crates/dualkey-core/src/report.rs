use crate::types::{Key, KeyswitchEvent};

/// HID keyboard report under construction for the current cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    keys: Vec<Key>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        if key.is_none() {
            return;
        }
        if let Err(at) = self.keys.binary_search(&key) {
            self.keys.insert(at, key);
        }
    }

    pub fn release(&mut self, key: Key) {
        if let Ok(at) = self.keys.binary_search(&key) {
            self.keys.remove(at);
        }
    }

    /// Final stage of the chain: whatever survived the plugins lands here.
    pub fn apply(&mut self, event: &KeyswitchEvent) {
        if event.state.is_pressed() {
            self.press(event.key);
        } else if event.state.toggled_off() {
            self.release(event.key);
        }
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn contains(&self, key: Key) -> bool {
        self.keys.binary_search(&key).is_ok()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
