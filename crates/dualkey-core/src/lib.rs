pub mod addr;
pub mod config;
pub mod error;
pub mod hooks;
pub mod keyboard;
pub mod queue;
pub mod report;
pub mod tap_hold;
pub mod types;

pub use addr::Position;
pub use config::TapHoldConfig;
pub use error::{CycleError, Fault, QueueError};
pub use hooks::{Context, Effect, Hardware, Plugin};
pub use keyboard::Keyboard;
pub use queue::{QueueEngine, QueueState};
pub use report::Report;
pub use tap_hold::{SlotState, TapHoldEngine};
pub use types::{keys, EventResult, Key, KeyState, KeyswitchEvent, Millis};
