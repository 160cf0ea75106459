use crate::addr::Position;
use crate::error::QueueError;
use crate::queue::{QueueEngine, StopPredicate};
use crate::report::Report;
use crate::types::{EventResult, Key, KeyState, KeyswitchEvent, Millis};

/// Capabilities the firmware host provides.
pub trait Hardware {
    /// Monotonic wall clock.
    fn millis(&mut self) -> Millis;
    /// Scans the matrix once and returns the non-idle switches.
    fn scan_matrix(&mut self) -> Vec<KeyswitchEvent>;
    /// Keymap lookup for events carrying `Key::NONE`.
    fn lookup(&self, pos: Position) -> Key;
    /// Hands a finished report to the USB/HID transport.
    fn send_report(&mut self, report: &Report);
}

/// Side effects a hook asks the driver to perform once it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run an event through the whole chain.
    Inject(KeyswitchEvent),
    /// Send the report as assembled so far.
    FlushReport,
}

/// What a hook can see and request during one call.
pub struct Context<'a> {
    now: Millis,
    queue: Option<&'a mut QueueEngine>,
    effects: &'a mut Vec<Effect>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        now: Millis,
        queue: Option<&'a mut QueueEngine>,
        effects: &'a mut Vec<Effect>,
    ) -> Self {
        Self {
            now,
            queue,
            effects,
        }
    }

    /// Start of the current (possibly virtual) cycle.
    pub fn millis(&self) -> Millis {
        self.now
    }

    /// Asks the queue engine to record the cycles that follow.
    pub fn start_queue(&mut self, timeout_ms: u16, stop: StopPredicate) -> Result<(), QueueError> {
        match self.queue.as_deref_mut() {
            Some(queue) => queue.start_queue(self.now, timeout_ms, stop),
            None => Err(QueueError::ReplayInProgress),
        }
    }

    pub fn inject(&mut self, pos: Position, key: Key, state: KeyState) {
        self.effects
            .push(Effect::Inject(KeyswitchEvent::injected(pos, key, state)));
    }

    /// Re-runs an event that was held back earlier in the cycle.
    pub fn reinject(&mut self, event: KeyswitchEvent) {
        self.effects.push(Effect::Inject(KeyswitchEvent {
            injected: true,
            ..event
        }));
    }

    pub fn flush_report(&mut self) {
        self.effects.push(Effect::FlushReport);
    }
}

/// One stage of the event chain. Every hook passes through by default.
pub trait Plugin {
    fn before_each_cycle(&mut self, _ctx: &mut Context<'_>) -> EventResult {
        EventResult::Pass
    }

    /// May rewrite `event.key` for the plugins after it.
    fn on_keyswitch_event(
        &mut self,
        _ctx: &mut Context<'_>,
        _event: &mut KeyswitchEvent,
    ) -> EventResult {
        EventResult::Pass
    }

    fn before_reporting_state(&mut self, _ctx: &mut Context<'_>) -> EventResult {
        EventResult::Pass
    }

    fn after_each_cycle(&mut self, _ctx: &mut Context<'_>) -> EventResult {
        EventResult::Pass
    }
}
