//! Simulator scripts: a keymap, dual-role bindings and a press/release
//! timeline, run against a virtual matrix.

use anyhow::{bail, Context as _, Result};
use dualkey_core::addr::KEY_COUNT;
use dualkey_core::queue::StopPredicate;
use dualkey_core::{
    keys, Context, EventResult, Hardware, Key, KeyState, Keyboard, KeyswitchEvent, Millis,
    Plugin, Position, Report, TapHoldConfig, TapHoldEngine,
};
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    /// Timings; `actual_keys` may be left out when `dual_roles` is given.
    #[serde(default)]
    pub tap_hold: TapHoldConfig,
    /// Key names emitted by the dual-role slots, in slot order.
    #[serde(default)]
    pub dual_roles: Vec<KeyName>,
    pub keymap: Vec<KeymapEntry>,
    #[serde(default)]
    pub queue: Option<QueueTrigger>,
    pub steps: Vec<Step>,
    /// How long to keep scanning after the last step.
    #[serde(default = "default_tail_ms")]
    pub tail_ms: Millis,
}

fn default_tail_ms() -> Millis {
    500
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct KeymapEntry {
    pub row: u8,
    pub col: u8,
    pub key: KeyName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueueTrigger {
    pub trigger: (u8, u8),
    pub stop: (u8, u8),
    pub timeout_ms: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Step {
    pub at_ms: Millis,
    #[serde(default)]
    pub press: Vec<(u8, u8)>,
    #[serde(default)]
    pub release: Vec<(u8, u8)>,
}

/// A key written by name in the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyName(pub Key);

impl<'de> Deserialize<'de> for KeyName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        keys::from_name(&name)
            .map(KeyName)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown key name {:?}", name)))
    }
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing script {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let script: Script = serde_json::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    fn validate(&self) -> Result<()> {
        for entry in &self.keymap {
            if !Position::new(entry.row, entry.col).is_valid() {
                bail!("keymap entry ({}, {}) is outside the matrix", entry.row, entry.col);
            }
        }
        if self.dual_roles.len() > self.tap_hold.actual_keys.len() {
            bail!(
                "{} dual-role bindings given, only {} slots exist",
                self.dual_roles.len(),
                self.tap_hold.actual_keys.len()
            );
        }
        let mut last = 0;
        for step in &self.steps {
            if step.at_ms < last {
                bail!("steps must be in time order ({} after {})", step.at_ms, last);
            }
            last = step.at_ms;
            for &(row, col) in step.press.iter().chain(&step.release) {
                if !Position::new(row, col).is_valid() {
                    bail!("step at {} ms names ({}, {}) outside the matrix", step.at_ms, row, col);
                }
            }
        }
        Ok(())
    }

    pub fn tap_hold_config(&self) -> TapHoldConfig {
        let mut config = self.tap_hold.clone();
        for (slot, name) in self.dual_roles.iter().enumerate() {
            config = config.with_actual(slot, name.0);
        }
        config
    }

    fn end_ms(&self) -> Millis {
        self.steps.last().map_or(0, |s| s.at_ms) + self.tail_ms
    }
}

/// Matrix whose switches follow the script's timeline.
pub struct SimMatrix {
    clock: Millis,
    cycle_ms: Millis,
    keymap: BTreeMap<Position, Key>,
    steps: Vec<Step>,
    next_step: usize,
    down: BTreeSet<Position>,
    reports: Vec<(Millis, Vec<Key>)>,
}

impl SimMatrix {
    pub fn new(script: &Script, cycle_ms: Millis) -> Self {
        let keymap = script
            .keymap
            .iter()
            .map(|e| (Position::new(e.row, e.col), e.key.0))
            .collect();
        Self {
            clock: 0,
            cycle_ms: cycle_ms.max(1),
            keymap,
            steps: script.steps.clone(),
            next_step: 0,
            down: BTreeSet::new(),
            reports: Vec::new(),
        }
    }

    pub fn reports(&self) -> &[(Millis, Vec<Key>)] {
        &self.reports
    }
}

impl Hardware for SimMatrix {
    fn millis(&mut self) -> Millis {
        self.clock
    }

    fn scan_matrix(&mut self) -> Vec<KeyswitchEvent> {
        let before = self.down.clone();
        while let Some(step) = self.steps.get(self.next_step) {
            if step.at_ms > self.clock {
                break;
            }
            for &(row, col) in &step.press {
                self.down.insert(Position::new(row, col));
            }
            for &(row, col) in &step.release {
                self.down.remove(&Position::new(row, col));
            }
            self.next_step += 1;
        }
        self.clock += self.cycle_ms;

        before
            .union(&self.down)
            .map(|&pos| {
                let state = match (before.contains(&pos), self.down.contains(&pos)) {
                    (false, true) => KeyState::DOWN,
                    (true, true) => KeyState::HELD,
                    _ => KeyState::UP,
                };
                KeyswitchEvent::new(pos, Key::NONE, state)
            })
            .collect()
    }

    fn lookup(&self, pos: Position) -> Key {
        self.keymap.get(&pos).copied().unwrap_or(Key::NONE)
    }

    fn send_report(&mut self, report: &Report) {
        self.reports.push((self.clock, report.keys().to_vec()));
    }
}

fn stop_at<const IDX: usize>(event: &KeyswitchEvent) -> bool {
    event.state.toggled_on() && event.pos.index() == IDX
}

macro_rules! stop_table {
    ($($idx:literal)*) => {
        [$(stop_at::<$idx> as StopPredicate),*]
    };
}

/// One stop predicate per matrix position, indexed by `Position::index`.
const STOP_AT: [StopPredicate; KEY_COUNT] = stop_table!(
    0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15
    16 17 18 19 20 21 22 23 24 25 26 27 28 29 30 31
    32 33 34 35 36 37 38 39 40 41 42 43 44 45 46 47
    48 49 50 51 52 53 54 55 56 57 58 59 60 61 62 63
);

/// Arms a recording whenever the trigger position goes down.
pub struct QueueTriggerPlugin {
    trigger: Position,
    stop: StopPredicate,
    timeout_ms: u16,
}

impl QueueTriggerPlugin {
    pub fn new(trigger: &QueueTrigger) -> Result<Self> {
        let stop = Position::new(trigger.stop.0, trigger.stop.1);
        if !stop.is_valid() {
            bail!("queue stop ({}, {}) is outside the matrix", stop.row, stop.col);
        }
        Ok(Self {
            trigger: Position::new(trigger.trigger.0, trigger.trigger.1),
            stop: STOP_AT[stop.index()],
            timeout_ms: trigger.timeout_ms,
        })
    }
}

impl Plugin for QueueTriggerPlugin {
    fn on_keyswitch_event(
        &mut self,
        ctx: &mut Context<'_>,
        event: &mut KeyswitchEvent,
    ) -> EventResult {
        if event.pos == self.trigger && event.state.toggled_on() && !event.injected {
            match ctx.start_queue(self.timeout_ms, self.stop) {
                Ok(()) => info!("Sim: recording armed at {} ms", ctx.millis()),
                Err(e) => debug!("Sim: recording not armed: {}", e),
            }
        }
        EventResult::Pass
    }
}

/// Runs the whole script and returns every report that was sent.
pub fn run(script: &Script, cycle_ms: Millis) -> Result<Vec<(Millis, Vec<Key>)>> {
    let mut kb = Keyboard::new(SimMatrix::new(script, cycle_ms));
    if let Some(trigger) = &script.queue {
        kb.register(Box::new(QueueTriggerPlugin::new(trigger)?));
    }
    kb.register(Box::new(TapHoldEngine::new(script.tap_hold_config())));

    let end = script.end_ms();
    while kb.hardware_mut().millis() <= end {
        let at = kb.hardware_mut().millis();
        kb.cycle().with_context(|| format!("cycle at {} ms", at))?;
    }

    let dropped = kb.queue().dropped_words();
    if dropped > 0 {
        warn!("Sim: last recording dropped {} words", dropped);
    }

    Ok(kb.hardware().reports().to_vec())
}
