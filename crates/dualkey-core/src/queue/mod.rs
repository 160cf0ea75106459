//! Records a burst of scan cycles and replays it as if it happened live.
//!
//! A plugin arms a recording with [`QueueEngine::start_queue`]. At the start
//! of the next cycle the engine scans in a tight loop until the deadline
//! passes or the stop predicate fires, storing only state changes. It then
//! replays the stored timeline through the rest of the plugin chain, one
//! virtual cycle per timestamp word, before handing control back to the host.

pub mod ring;
pub mod word;

use crate::addr::{Position, KEY_COUNT};
use crate::error::{Fault, QueueError};
use crate::types::{EventResult, Key, KeyState, KeyswitchEvent, Millis};
use ring::RingBuffer;
use tracing::{debug, trace, warn};
use word::{Timestamp, Update, Word, MAX_OFFSET};

/// Capacity of the recording buffer, in words.
pub const QUEUE_SIZE: usize = 32;

/// Decides from one recorded event whether the recording should end.
pub type StopPredicate = fn(&KeyswitchEvent) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Preparing,
    Record,
    Replay,
}

impl QueueState {
    fn name(self) -> &'static str {
        match self {
            QueueState::Idle => "IDLE",
            QueueState::Preparing => "PREPARING",
            QueueState::Record => "RECORD",
            QueueState::Replay => "REPLAY",
        }
    }
}

/// Host operations the engine needs while it runs virtual cycles.
///
/// Hook methods run every plugin except the queue itself.
pub trait CycleRunner {
    /// Wall clock.
    fn millis(&mut self) -> Millis;
    /// One raw matrix scan, with keys already resolved.
    fn scan(&mut self) -> Vec<KeyswitchEvent>;
    /// Overrides the clock plugins see as the start of the current cycle.
    fn set_cycle_start(&mut self, at: Millis);
    fn before_each_cycle(&mut self) -> EventResult;
    /// Runs `event` through the chain as if it came from the matrix.
    fn handle_keyswitch_event(&mut self, event: KeyswitchEvent) -> EventResult;
    fn before_reporting_state(&mut self) -> EventResult;
    /// Sends the assembled report and starts a fresh one.
    fn send_report(&mut self);
    fn after_each_cycle(&mut self) -> EventResult;
}

/// Per-position bookkeeping, reset at the start of recording and replay.
#[derive(Debug, Clone, Copy, Default)]
struct Flag {
    /// Last state written to the stream.
    recorded: KeyState,
    /// State to emit in the current virtual cycle.
    replay: KeyState,
    /// A genuine down edge was replayed here; stop using the override key.
    no_override: bool,
}

/// Scratch for the virtual cycle being recorded.
#[derive(Debug, Clone, Copy, Default)]
struct CycleScratch {
    should_stop: bool,
    record_cycle: bool,
    last_update: Option<usize>,
    saw_update: bool,
}

pub struct QueueEngine {
    state: QueueState,
    buffer: RingBuffer<QUEUE_SIZE>,
    flags: [Flag; KEY_COUNT],
    overrides: [Option<Key>; KEY_COUNT],
    stop: Option<StopPredicate>,
    deadline: Millis,
    cycle: CycleScratch,
    #[cfg(test)]
    stop_after_record: bool,
}

impl Default for QueueEngine {
    fn default() -> Self {
        Self {
            state: QueueState::Idle,
            buffer: RingBuffer::default(),
            flags: [Flag::default(); KEY_COUNT],
            overrides: [None; KEY_COUNT],
            stop: None,
            deadline: 0,
            cycle: CycleScratch::default(),
            #[cfg(test)]
            stop_after_record: false,
        }
    }
}

impl QueueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Words dropped by the most recent recording because the buffer was full.
    pub fn dropped_words(&self) -> usize {
        self.buffer.dropped()
    }

    /// Arms a recording that starts with the next cycle.
    ///
    /// `now` is the start of the current cycle. A second request in the same
    /// cycle succeeds only if it is identical to the pending one.
    pub fn start_queue(
        &mut self,
        now: Millis,
        timeout_ms: u16,
        stop: StopPredicate,
    ) -> Result<(), QueueError> {
        if timeout_ms > MAX_OFFSET {
            return Err(QueueError::TimeoutTooLong(timeout_ms));
        }
        let deadline = now + Millis::from(timeout_ms);

        match self.state {
            QueueState::Idle => {
                self.stop = Some(stop);
                self.deadline = deadline;
                self.state = QueueState::Preparing;
                debug!("Queue: armed, deadline {}", deadline);
                Ok(())
            }
            QueueState::Preparing => {
                let same_stop = self.stop.is_some_and(|s| std::ptr::fn_addr_eq(s, stop));
                if same_stop && self.deadline == deadline {
                    trace!("Queue: duplicate start request ignored");
                    Ok(())
                } else {
                    debug!("Queue: conflicting start request rejected");
                    Err(QueueError::Conflict)
                }
            }
            QueueState::Replay => Err(QueueError::ReplayInProgress),
            QueueState::Record => Err(QueueError::Recording),
        }
    }

    pub fn before_each_cycle<R: CycleRunner + ?Sized>(&mut self, runner: &mut R) -> EventResult {
        match self.state {
            QueueState::Idle | QueueState::Replay => return EventResult::Pass,
            QueueState::Record => {
                return EventResult::Fatal(Fault::UnexpectedQueueState(self.state.name()))
            }
            QueueState::Preparing => {}
        }

        let base = self.record(runner);

        #[cfg(test)]
        if self.stop_after_record {
            return EventResult::Pass;
        }

        self.replay(runner, base)
    }

    /// Recording side of the chain. Other states pass events through.
    pub fn on_keyswitch_event(&mut self, event: &KeyswitchEvent) -> EventResult {
        match self.state {
            QueueState::Idle | QueueState::Preparing | QueueState::Replay => {
                return EventResult::Pass
            }
            QueueState::Record => {}
        }

        if let Some(stop) = self.stop {
            self.cycle.should_stop |= stop(event);
        }

        if !event.pos.is_valid() {
            warn!("Queue: ignoring event at {:?} outside the matrix", event.pos);
            return EventResult::Consumed;
        }

        let idx = event.pos.index();
        let recorded = self.flags[idx].recorded;

        // Already down when recording began: keep the key it maps to now.
        if recorded.is_idle() && event.state.was_pressed() {
            self.overrides[idx] = Some(event.key);
        }

        if event.state != recorded {
            // Continuations of a press are rebuilt during replay, so only
            // releases and fresh presses go into the stream.
            if !event.state.is_pressed() || !recorded.is_pressed() {
                self.cycle.saw_update = true;
                let update = Update::new(idx as u8, event.state, false);
                if let Some(at) = self.push(update.into()) {
                    self.cycle.last_update = Some(at);
                }
            }
            self.cycle.record_cycle = true;
            self.flags[idx].recorded = event.state;
        }

        EventResult::Consumed
    }

    fn push(&mut self, word: Word) -> Option<usize> {
        let stored = self.buffer.push(word);
        if stored.is_none() && self.buffer.dropped() == 1 {
            warn!(
                "Queue: buffer full after {} words, dropping the rest of the recording",
                QUEUE_SIZE
            );
        }
        stored
    }

    /// Runs the scan loop until the deadline or the stop predicate. Returns
    /// the wall-clock base the offsets are relative to.
    fn record<R: CycleRunner + ?Sized>(&mut self, runner: &mut R) -> Millis {
        self.state = QueueState::Record;
        self.buffer.clear();
        self.flags = [Flag::default(); KEY_COUNT];
        self.overrides = [None; KEY_COUNT];

        let base = runner.millis();
        let mut needs_new_ts = true;
        let mut ts_slot: Option<usize> = None;
        let mut cycles = 0usize;

        loop {
            let now = runner.millis();
            if now > self.deadline {
                break;
            }

            let offset = u16::try_from(now - base).unwrap_or(MAX_OFFSET).min(MAX_OFFSET);
            let ts = Timestamp::new(offset).pack();
            if needs_new_ts {
                ts_slot = self.push(ts);
            } else if let Some(slot) = ts_slot {
                // Nothing changed last cycle: move its timestamp forward.
                self.buffer.set(slot, ts);
            }

            self.cycle = CycleScratch::default();
            for mut event in runner.scan() {
                event.injected = false;
                self.on_keyswitch_event(&event);
            }
            cycles += 1;

            if self.cycle.record_cycle {
                match (self.cycle.last_update, ts_slot) {
                    (Some(at), _) => {
                        if let Some(w) = self.buffer.get(at) {
                            self.buffer.set(at, w.mark_last_update());
                        }
                    }
                    (None, Some(slot)) => {
                        if let Some(w) = self.buffer.get(slot) {
                            self.buffer.set(slot, w.mark_no_updates());
                        }
                    }
                    (None, None) => {}
                }
                if self.cycle.saw_update && self.cycle.last_update.is_none() {
                    trace!("Queue: updates of this cycle were dropped");
                }
                needs_new_ts = true;
            } else {
                needs_new_ts = false;
            }

            if self.cycle.should_stop {
                break;
            }
        }

        debug!(
            "Queue: recorded {} cycles into {} words ({} dropped)",
            cycles,
            self.buffer.len(),
            self.buffer.dropped()
        );
        base
    }

    fn replay<R: CycleRunner + ?Sized>(&mut self, runner: &mut R, base: Millis) -> EventResult {
        self.state = QueueState::Replay;
        for flag in self.flags.iter_mut() {
            *flag = Flag::default();
        }

        let mut first_fault: Option<Fault> = None;
        let mut note = |result: EventResult| {
            if let EventResult::Fatal(fault) = result {
                tracing::error!("Queue: replayed cycle failed: {}", fault);
                first_fault.get_or_insert(fault);
            }
        };

        while let Some(word) = self.buffer.pop() {
            let ts = Timestamp::unpack(word);
            runner.set_cycle_start(base + Millis::from(ts.offset));
            note(runner.before_each_cycle());

            if !ts.no_explicit_updates {
                while let Some(word) = self.buffer.pop() {
                    let update = Update::unpack(word);
                    let idx = usize::from(update.pos_idx);
                    if idx >= KEY_COUNT {
                        warn!("Queue: update for unknown position {}", idx);
                    } else {
                        let flag = &mut self.flags[idx];
                        flag.replay = update.state;
                        if update.state.toggled_on() {
                            flag.no_override = true;
                        }
                    }
                    if update.is_last {
                        break;
                    }
                }
            }

            for idx in 0..KEY_COUNT {
                let flag = self.flags[idx];
                if flag.replay.is_idle() {
                    continue;
                }
                let key = if flag.no_override {
                    Key::NONE
                } else {
                    self.overrides[idx].unwrap_or(Key::NONE)
                };
                let event = KeyswitchEvent::new(Position::from_index(idx), key, flag.replay);
                note(runner.handle_keyswitch_event(event));

                self.flags[idx].replay = if flag.replay.toggled_on() {
                    KeyState::HELD
                } else if flag.replay.toggled_off() {
                    KeyState::IDLE
                } else {
                    flag.replay
                };
            }

            note(runner.before_reporting_state());
            runner.send_report();
            note(runner.after_each_cycle());
        }

        self.state = QueueState::Idle;
        self.stop = None;

        // Back to real time for the host's own cycle.
        let now = runner.millis();
        runner.set_cycle_start(now);
        debug!("Queue: replay finished at {}", now);

        match first_fault {
            Some(fault) => EventResult::Fatal(fault),
            None => EventResult::Pass,
        }
    }
}

#[cfg(test)]
impl QueueEngine {
    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn set_stop_after_record(&mut self, stop: bool) {
        self.stop_after_record = stop;
    }

    pub(crate) fn words(&self) -> Vec<Word> {
        self.buffer.iter().collect()
    }

    pub(crate) fn force_state(&mut self, state: QueueState) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::keys;
    use std::collections::VecDeque;

    const K_A: Position = Position::new(1, 1);
    const K_B: Position = Position::new(1, 2);
    const K_C: Position = Position::new(1, 3);
    const K_STOP: Position = Position::new(2, 1);

    fn stop_on_z(event: &KeyswitchEvent) -> bool {
        event.key == keys::Z
    }

    fn stop_never(_event: &KeyswitchEvent) -> bool {
        false
    }

    fn down(pos: Position, key: Key) -> KeyswitchEvent {
        KeyswitchEvent::new(pos, key, KeyState::DOWN)
    }

    fn held(pos: Position, key: Key) -> KeyswitchEvent {
        KeyswitchEvent::new(pos, key, KeyState::HELD)
    }

    fn up(pos: Position, key: Key) -> KeyswitchEvent {
        KeyswitchEvent::new(pos, key, KeyState::UP)
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CycleStart(Millis),
        BeforeCycle,
        Event(KeyswitchEvent),
        BeforeReport,
        Report,
        AfterCycle,
    }

    /// Scripted scans; the clock advances 10 ms per scan.
    struct FakeRunner {
        now: Millis,
        scans: VecDeque<Vec<KeyswitchEvent>>,
        calls: Vec<Call>,
        fail_on: Option<Key>,
    }

    impl FakeRunner {
        fn new(now: Millis) -> Self {
            Self {
                now,
                scans: VecDeque::new(),
                calls: Vec::new(),
                fail_on: None,
            }
        }

        fn queue_scan(&mut self, events: Vec<KeyswitchEvent>) {
            self.scans.push_back(events);
        }

        fn events(&self) -> Vec<KeyswitchEvent> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Event(e) => Some(*e),
                    _ => None,
                })
                .collect()
        }
    }

    impl CycleRunner for FakeRunner {
        fn millis(&mut self) -> Millis {
            self.now
        }

        fn scan(&mut self) -> Vec<KeyswitchEvent> {
            let events = self.scans.pop_front().unwrap_or_default();
            self.now += 10;
            events
        }

        fn set_cycle_start(&mut self, at: Millis) {
            self.calls.push(Call::CycleStart(at));
        }

        fn before_each_cycle(&mut self) -> EventResult {
            self.calls.push(Call::BeforeCycle);
            EventResult::Pass
        }

        fn handle_keyswitch_event(&mut self, event: KeyswitchEvent) -> EventResult {
            self.calls.push(Call::Event(event));
            if Some(event.key) == self.fail_on {
                return EventResult::Fatal(Fault::UnexpectedQueueState("test"));
            }
            EventResult::Pass
        }

        fn before_reporting_state(&mut self) -> EventResult {
            self.calls.push(Call::BeforeReport);
            EventResult::Pass
        }

        fn send_report(&mut self) {
            self.calls.push(Call::Report);
        }

        fn after_each_cycle(&mut self) -> EventResult {
            self.calls.push(Call::AfterCycle);
            EventResult::Pass
        }
    }

    fn ts(offset: u16) -> Word {
        Timestamp::new(offset).pack()
    }

    fn quiet(offset: u16) -> Word {
        Timestamp::quiet(offset).pack()
    }

    fn upd(pos: Position, state: KeyState, last: bool) -> Word {
        Update::new(pos.index() as u8, state, last).pack()
    }

    fn scripted_burst(runner: &mut FakeRunner) {
        // One of each; everything is recorded.
        runner.queue_scan(vec![down(K_A, keys::A), up(K_B, keys::B), held(K_C, keys::C)]);
        // A goes down -> held: implicit update only.
        runner.queue_scan(vec![held(K_A, keys::A), held(K_C, keys::C)]);
        // Nothing changes.
        runner.queue_scan(vec![held(K_A, keys::A), held(K_C, keys::C)]);
        // A up, B down, Z down stops the recording.
        runner.queue_scan(vec![
            up(K_A, keys::A),
            down(K_B, keys::B),
            held(K_C, keys::C),
            down(K_STOP, keys::Z),
        ]);
    }

    #[test]
    fn test_idle_passes_through() {
        let mut queue = QueueEngine::new();
        let mut runner = FakeRunner::new(100);
        assert_eq!(queue.before_each_cycle(&mut runner), EventResult::Pass);
        assert_eq!(queue.on_keyswitch_event(&down(K_A, keys::A)), EventResult::Pass);
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn test_start_queue_enters_preparing() {
        let mut queue = QueueEngine::new();
        assert_eq!(queue.start_queue(100, 400, stop_on_z), Ok(()));
        assert_eq!(queue.state(), QueueState::Preparing);
        assert_eq!(queue.on_keyswitch_event(&down(K_A, keys::A)), EventResult::Pass);
    }

    #[test]
    fn test_duplicate_start_is_idempotent() {
        let mut queue = QueueEngine::new();
        queue.start_queue(100, 400, stop_on_z).unwrap();
        assert_eq!(queue.start_queue(100, 400, stop_on_z), Ok(()));
        assert_eq!(queue.state(), QueueState::Preparing);
    }

    #[test]
    fn test_conflicting_start_is_rejected() {
        let mut queue = QueueEngine::new();
        queue.start_queue(100, 400, stop_on_z).unwrap();
        assert_eq!(queue.start_queue(100, 400, stop_never), Err(QueueError::Conflict));
        assert_eq!(queue.start_queue(100, 200, stop_on_z), Err(QueueError::Conflict));
        assert_eq!(queue.state(), QueueState::Preparing);
    }

    #[test]
    fn test_start_rejected_during_replay_and_record() {
        let mut queue = QueueEngine::new();
        queue.force_state(QueueState::Replay);
        assert_eq!(queue.start_queue(0, 10, stop_on_z), Err(QueueError::ReplayInProgress));
        queue.force_state(QueueState::Record);
        assert_eq!(queue.start_queue(0, 10, stop_on_z), Err(QueueError::Recording));
    }

    #[test]
    fn test_start_rejects_oversized_timeout() {
        let mut queue = QueueEngine::new();
        assert_eq!(
            queue.start_queue(0, 0x8000, stop_on_z),
            Err(QueueError::TimeoutTooLong(0x8000))
        );
        assert_eq!(queue.state(), QueueState::Idle);
    }

    #[test]
    fn test_before_cycle_while_recording_is_fatal() {
        let mut queue = QueueEngine::new();
        queue.force_state(QueueState::Record);
        let mut runner = FakeRunner::new(0);
        assert!(queue.before_each_cycle(&mut runner).is_fatal());
    }

    #[test]
    fn test_record_coalesces_quiet_cycles() {
        let mut queue = QueueEngine::new();
        queue.set_stop_after_record(true);
        let mut runner = FakeRunner::new(120);
        queue.start_queue(100, 400, stop_on_z).unwrap();
        scripted_burst(&mut runner);

        assert_eq!(queue.before_each_cycle(&mut runner), EventResult::Pass);
        assert_eq!(queue.state(), QueueState::Record);
        assert_eq!(
            queue.words(),
            vec![
                ts(0),
                upd(K_A, KeyState::DOWN, false),
                upd(K_B, KeyState::UP, false),
                upd(K_C, KeyState::HELD, true),
                quiet(10),
                ts(30),
                upd(K_A, KeyState::UP, false),
                upd(K_B, KeyState::DOWN, false),
                upd(K_STOP, KeyState::DOWN, true),
            ]
        );
        assert_eq!(queue.dropped_words(), 0);
        // Recording never reaches the rest of the chain.
        assert!(runner.calls.is_empty());
    }

    #[test]
    fn test_record_ends_at_deadline() {
        let mut queue = QueueEngine::new();
        queue.set_stop_after_record(true);
        let mut runner = FakeRunner::new(0);
        queue.start_queue(0, 50, stop_never).unwrap();
        runner.queue_scan(vec![down(K_A, keys::A)]);

        queue.before_each_cycle(&mut runner);
        // Scans at 0..=50; only the first changes anything.
        assert_eq!(runner.now, 60);
        assert_eq!(queue.words(), vec![ts(0), upd(K_A, KeyState::DOWN, true), ts(50)]);
    }

    #[test]
    fn test_replay_reconstructs_timeline() {
        let mut queue = QueueEngine::new();
        let mut runner = FakeRunner::new(120);
        queue.start_queue(100, 400, stop_on_z).unwrap();
        scripted_burst(&mut runner);

        assert_eq!(queue.before_each_cycle(&mut runner), EventResult::Pass);
        assert_eq!(queue.state(), QueueState::Idle);

        let cycle_starts: Vec<Millis> = runner
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::CycleStart(t) => Some(*t),
                _ => None,
            })
            .collect();
        // Three virtual cycles, then the resync to the wall clock.
        assert_eq!(cycle_starts, vec![120, 130, 150, 160]);

        let reports = runner.calls.iter().filter(|c| **c == Call::Report).count();
        assert_eq!(reports, 3);

        assert_eq!(
            runner.events(),
            vec![
                // Cycle 0: A down (no override), B up and C held keep the
                // keys captured while recording.
                KeyswitchEvent::new(K_A, Key::NONE, KeyState::DOWN),
                KeyswitchEvent::new(K_B, keys::B, KeyState::UP),
                KeyswitchEvent::new(K_C, keys::C, KeyState::HELD),
                // Cycle +10: holds are carried forward.
                KeyswitchEvent::new(K_A, Key::NONE, KeyState::HELD),
                KeyswitchEvent::new(K_C, keys::C, KeyState::HELD),
                // Cycle +30.
                KeyswitchEvent::new(K_A, Key::NONE, KeyState::UP),
                KeyswitchEvent::new(K_B, Key::NONE, KeyState::DOWN),
                KeyswitchEvent::new(K_C, keys::C, KeyState::HELD),
                KeyswitchEvent::new(K_STOP, Key::NONE, KeyState::DOWN),
            ]
        );
    }

    #[test]
    fn test_override_suppressed_after_first_down() {
        let mut queue = QueueEngine::new();
        let mut runner = FakeRunner::new(0);
        queue.start_queue(0, 400, stop_on_z).unwrap();
        // B is mid-release when recording begins, then pressed again twice.
        runner.queue_scan(vec![up(K_B, keys::S)]);
        runner.queue_scan(vec![down(K_B, keys::B)]);
        runner.queue_scan(vec![up(K_B, keys::B)]);
        runner.queue_scan(vec![down(K_B, keys::B)]);
        runner.queue_scan(vec![held(K_B, keys::B), down(K_STOP, keys::Z)]);

        queue.before_each_cycle(&mut runner);

        let at_b: Vec<KeyswitchEvent> = runner.events().into_iter().filter(|e| e.pos == K_B).collect();
        assert_eq!(at_b[0], KeyswitchEvent::new(K_B, keys::S, KeyState::UP));
        assert!(at_b[1..].iter().all(|e| e.key == Key::NONE), "{:?}", at_b);
        assert_eq!(at_b.len(), 5);
    }

    #[test]
    fn test_overflow_drops_are_counted() {
        let mut queue = QueueEngine::new();
        queue.set_stop_after_record(true);
        let mut runner = FakeRunner::new(0);
        queue.start_queue(0, 1000, stop_on_z).unwrap();
        // Alternate press/release on two keys: three words per cycle.
        for i in 0..20 {
            let state = if i % 2 == 0 { KeyState::DOWN } else { KeyState::UP };
            runner.queue_scan(vec![
                KeyswitchEvent::new(K_A, keys::A, state),
                KeyswitchEvent::new(K_B, keys::B, state),
            ]);
        }
        runner.queue_scan(vec![down(K_STOP, keys::Z)]);

        queue.before_each_cycle(&mut runner);
        let words = queue.words();
        assert_eq!(words.len(), QUEUE_SIZE);
        assert!(queue.dropped_words() > 0);
        // The stored prefix ends on a complete cycle marker or a timestamp.
        let last = *words.last().unwrap();
        let last_update = Update::unpack(last);
        assert!(last_update.is_last || Timestamp::unpack(last).offset % 10 == 0);
    }

    #[test]
    fn test_truncated_recording_still_replays() {
        let mut queue = QueueEngine::new();
        let mut runner = FakeRunner::new(0);
        queue.start_queue(0, 1000, stop_on_z).unwrap();
        for i in 0..20 {
            let state = if i % 2 == 0 { KeyState::DOWN } else { KeyState::UP };
            runner.queue_scan(vec![KeyswitchEvent::new(K_A, keys::A, state)]);
        }
        runner.queue_scan(vec![down(K_STOP, keys::Z)]);

        assert_eq!(queue.before_each_cycle(&mut runner), EventResult::Pass);
        assert_eq!(queue.state(), QueueState::Idle);
        assert!(queue.dropped_words() > 0);
        // 16 complete cycles fit into 32 words.
        assert_eq!(runner.events().len(), 16);
    }

    #[test]
    fn test_replay_fault_is_reported_after_finishing() {
        let mut queue = QueueEngine::new();
        let mut runner = FakeRunner::new(0);
        runner.fail_on = Some(keys::C);
        queue.start_queue(0, 400, stop_on_z).unwrap();
        runner.queue_scan(vec![held(K_C, keys::C)]);
        runner.queue_scan(vec![held(K_C, keys::C), down(K_STOP, keys::Z)]);

        assert!(queue.before_each_cycle(&mut runner).is_fatal());
        assert_eq!(queue.state(), QueueState::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut queue = QueueEngine::new();
        queue.start_queue(0, 10, stop_on_z).unwrap();
        queue.reset();
        assert_eq!(queue.state(), QueueState::Idle);
        assert!(queue.words().is_empty());
    }
}
