//! Dual-role keys: a quick tap sends the slot's key briefly, a long press or a
//! press rolled into another key holds it.
//!
//! Each slot runs its own state machine. Timeouts are checked before the
//! cycle's events, key activity is collected while events flow, and the
//! decisions that depend on that activity are taken right before the report
//! is sent.

use crate::addr::Position;
use crate::config::TapHoldConfig;
use crate::error::Fault;
use crate::hooks::{Context, Plugin};
use crate::types::{EventResult, Key, KeyState, KeyswitchEvent, Millis, DUAL_ROLE_COUNT};
use tracing::{debug, trace};

pub const ENTRY_CNT: usize = DUAL_ROLE_COUNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Waiting for a press.
    #[default]
    Idle,
    /// Pressed, waiting for release, timeout or another key.
    PressedIdle,
    /// Another key went down while pressed; waiting for timeout or release.
    PressedPreQueue,
    /// Released before the timeout; the key stays reported for a while.
    PressedDelayed,
    /// Held past the timeout.
    PressedReal,
    /// Deferred release goes out this cycle.
    ReleaseThisCycle,
}

impl SlotState {
    fn name(self) -> &'static str {
        match self {
            SlotState::Idle => "IDLE",
            SlotState::PressedIdle => "PRESSED_IDLE",
            SlotState::PressedPreQueue => "PRESSED_PRE_QUEUE",
            SlotState::PressedDelayed => "PRESSED_DELAYED",
            SlotState::PressedReal => "PRESSED_REAL",
            SlotState::ReleaseThisCycle => "RELEASE_THIS_CYCLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slot {
    pub pressed_at: Millis,
    pub actual_key: Key,
    pub source: Position,
    pub state: SlotState,
}

pub struct TapHoldEngine {
    tap_time_ms: Millis,
    active_time_max_ms: Millis,
    actual_keys: [Key; ENTRY_CNT],
    slots: [Slot; ENTRY_CNT],
    /// Slots with a pending timeout.
    waiting: u8,
    /// Slots that react to another key going down.
    listening: u8,
    /// Slots whose release is injected later.
    injecting: u8,
    real_key_down_this_cycle: bool,
    /// Real presses held back until the pre-report sweep.
    held_back: Vec<KeyswitchEvent>,
}

impl Default for TapHoldEngine {
    fn default() -> Self {
        Self::new(TapHoldConfig::default())
    }
}

impl TapHoldEngine {
    pub fn new(config: TapHoldConfig) -> Self {
        Self {
            tap_time_ms: config.tap_time_ms,
            active_time_max_ms: config.active_time_max_ms,
            actual_keys: config.actual_keys,
            slots: [Slot::default(); ENTRY_CNT],
            waiting: 0,
            listening: 0,
            injecting: 0,
            real_key_down_this_cycle: false,
            held_back: Vec::new(),
        }
    }

    /// Binds the key a slot emits. Out-of-range slots are ignored.
    pub fn set_actual(&mut self, slot: usize, actual: Key) {
        if slot < ENTRY_CNT {
            self.actual_keys[slot] = actual;
        }
    }

    fn set_state(&mut self, idx: usize, state: SlotState) {
        trace!(
            "TapHold: slot {} {} -> {}",
            idx,
            self.slots[idx].state.name(),
            state.name()
        );
        self.slots[idx].state = state;
    }

    fn clear_bits(&mut self, idx: usize) {
        let mask = !(1u8 << idx);
        self.waiting &= mask;
        self.listening &= mask;
        self.injecting &= mask;
    }

    fn invalid(&self, idx: usize, transition: &'static str) -> EventResult {
        let fault = Fault::InvalidSlotTransition {
            slot: idx,
            state: self.slots[idx].state.name(),
            transition,
        };
        tracing::error!("TapHold: {}", fault);
        EventResult::Fatal(fault)
    }

    fn press(&mut self, ctx: &mut Context<'_>, idx: usize, event: &mut KeyswitchEvent) -> EventResult {
        let actual = self.actual_keys[idx];
        let bit = 1u8 << idx;
        self.slots[idx] = Slot {
            pressed_at: ctx.millis(),
            actual_key: actual,
            source: event.pos,
            state: self.slots[idx].state,
        };
        self.set_state(idx, SlotState::PressedIdle);
        self.waiting |= bit;
        self.listening |= bit;
        self.injecting &= !bit;

        // Report the key right away; a tap only shortens how long it stays.
        event.key = actual;
        EventResult::Pass
    }

    fn on_dual_role_event(
        &mut self,
        ctx: &mut Context<'_>,
        idx: usize,
        event: &mut KeyswitchEvent,
    ) -> EventResult {
        let slot = self.slots[idx];

        if event.state.toggled_on() {
            return match slot.state {
                SlotState::Idle => self.press(ctx, idx, event),
                SlotState::PressedDelayed | SlotState::ReleaseThisCycle => {
                    // Pressed again before the tap ran out: end the tap with a
                    // visible gap, then start over.
                    debug!("TapHold: slot {} re-pressed during its tap", idx);
                    if slot.state == SlotState::PressedDelayed {
                        ctx.inject(slot.source, slot.actual_key, KeyState::HELD);
                        ctx.flush_report();
                    }
                    ctx.inject(slot.source, slot.actual_key, KeyState::UP);
                    ctx.flush_report();
                    self.clear_bits(idx);
                    self.press(ctx, idx, event)
                }
                _ => self.invalid(idx, "toggle-on"),
            };
        }

        if event.state.toggled_off() {
            return match slot.state {
                SlotState::PressedIdle => {
                    self.set_state(idx, SlotState::PressedDelayed);
                    self.injecting |= 1u8 << idx;
                    EventResult::Consumed
                }
                SlotState::PressedPreQueue | SlotState::PressedReal => {
                    self.set_state(idx, SlotState::Idle);
                    self.clear_bits(idx);
                    event.key = slot.actual_key;
                    EventResult::Pass
                }
                _ => self.invalid(idx, "toggle-off"),
            };
        }

        if event.state.is_held() {
            return match slot.state {
                SlotState::PressedIdle | SlotState::PressedPreQueue | SlotState::PressedReal => {
                    event.key = slot.actual_key;
                    EventResult::Pass
                }
                _ => self.invalid(idx, "held"),
            };
        }

        self.invalid(idx, "idle")
    }
}

impl Plugin for TapHoldEngine {
    fn before_each_cycle(&mut self, ctx: &mut Context<'_>) -> EventResult {
        self.real_key_down_this_cycle = false;
        self.held_back.clear();

        if self.waiting == 0 {
            return EventResult::Pass;
        }

        let now = ctx.millis();
        for idx in 0..ENTRY_CNT {
            let bit = 1u8 << idx;
            if self.waiting & bit == 0 {
                continue;
            }
            let slot = self.slots[idx];
            let elapsed = now.saturating_sub(slot.pressed_at);
            match slot.state {
                SlotState::PressedIdle | SlotState::PressedPreQueue
                    if elapsed >= self.tap_time_ms =>
                {
                    debug!("TapHold: slot {} held for {} ms, committing to hold", idx, elapsed);
                    self.set_state(idx, SlotState::PressedReal);
                    self.waiting &= !bit;
                    self.listening &= !bit;
                }
                SlotState::PressedDelayed if elapsed >= self.active_time_max_ms => {
                    self.set_state(idx, SlotState::ReleaseThisCycle);
                    self.waiting &= !bit;
                    self.listening &= !bit;
                }
                _ => {}
            }
        }

        EventResult::Pass
    }

    fn on_keyswitch_event(
        &mut self,
        ctx: &mut Context<'_>,
        event: &mut KeyswitchEvent,
    ) -> EventResult {
        if let Some(idx) = event.key.dual_role_index() {
            return self.on_dual_role_event(ctx, idx, event);
        }

        if event.injected || !event.state.toggled_on() || self.listening == 0 {
            return EventResult::Pass;
        }

        // Decided before the report: a pending tap has to leave it first, and
        // the release of a slot may still follow in this scan.
        self.real_key_down_this_cycle = true;
        trace!("TapHold: holding back {:?} until the slots are decided", event.key);
        self.held_back.push(*event);
        EventResult::Consumed
    }

    fn before_reporting_state(&mut self, ctx: &mut Context<'_>) -> EventResult {
        let real_key_down = std::mem::take(&mut self.real_key_down_this_cycle);

        for idx in 0..ENTRY_CNT {
            let bit = 1u8 << idx;
            let slot = self.slots[idx];
            let rolled = real_key_down && self.listening & bit != 0;

            match slot.state {
                SlotState::PressedIdle if rolled => {
                    debug!("TapHold: slot {} rolled into another key, holding", idx);
                    self.set_state(idx, SlotState::PressedPreQueue);
                    self.listening &= !bit;
                }
                SlotState::PressedDelayed if rolled => {
                    debug!("TapHold: slot {} tap finalized by another key", idx);
                    ctx.inject(slot.source, slot.actual_key, KeyState::HELD);
                    ctx.flush_report();
                    ctx.inject(slot.source, slot.actual_key, KeyState::UP);
                    self.set_state(idx, SlotState::Idle);
                    self.clear_bits(idx);
                }
                SlotState::PressedDelayed => {
                    ctx.inject(slot.source, slot.actual_key, KeyState::HELD);
                }
                SlotState::ReleaseThisCycle => {
                    ctx.inject(slot.source, slot.actual_key, KeyState::UP);
                    self.set_state(idx, SlotState::Idle);
                    self.clear_bits(idx);
                }
                _ => {}
            }
        }

        for event in self.held_back.drain(..) {
            ctx.reinject(event);
        }

        EventResult::Pass
    }
}

#[cfg(test)]
impl TapHoldEngine {
    pub(crate) fn reset(&mut self) {
        self.slots = [Slot::default(); ENTRY_CNT];
        self.waiting = 0;
        self.listening = 0;
        self.injecting = 0;
        self.real_key_down_this_cycle = false;
        self.held_back.clear();
    }

    pub(crate) fn slot(&self, idx: usize) -> Slot {
        self.slots[idx]
    }

    pub(crate) fn masks(&self) -> (u8, u8, u8) {
        (self.waiting, self.listening, self.injecting)
    }
}
