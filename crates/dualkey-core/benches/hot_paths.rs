use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dualkey_core::{
    keys, Context, EventResult, Hardware, Key, KeyState, Keyboard, KeyswitchEvent, Millis,
    Plugin, Position, Report, TapHoldConfig, TapHoldEngine,
};

const TM1: Position = Position::new(3, 0);
const P_A: Position = Position::new(1, 1);
const P_Z: Position = Position::new(2, 1);

/// Endless matrix: each call to `scan_matrix` returns the next scan of a
/// fixed loop.
struct LoopMatrix {
    clock: Millis,
    scans: Vec<Vec<KeyswitchEvent>>,
    next: usize,
}

impl LoopMatrix {
    fn new(scans: Vec<Vec<KeyswitchEvent>>) -> Self {
        Self {
            clock: 0,
            scans,
            next: 0,
        }
    }
}

impl Hardware for LoopMatrix {
    fn millis(&mut self) -> Millis {
        self.clock
    }

    fn scan_matrix(&mut self) -> Vec<KeyswitchEvent> {
        self.clock += 10;
        let scan = self.scans[self.next].clone();
        self.next = (self.next + 1) % self.scans.len();
        scan
    }

    fn lookup(&self, pos: Position) -> Key {
        match pos {
            TM1 => Key::dual_role(0),
            P_A => keys::A,
            P_Z => keys::Z,
            _ => Key::NONE,
        }
    }

    fn send_report(&mut self, report: &Report) {
        black_box(report);
    }
}

fn ev(pos: Position, state: KeyState) -> KeyswitchEvent {
    KeyswitchEvent::new(pos, Key::NONE, state)
}

fn bench_tap_hold_tap(c: &mut Criterion) {
    // Press, hold two scans, release, then idle long enough for the tap to end.
    let mut scans = vec![
        vec![ev(TM1, KeyState::DOWN)],
        vec![ev(TM1, KeyState::HELD)],
        vec![ev(TM1, KeyState::HELD)],
        vec![ev(TM1, KeyState::UP)],
    ];
    scans.extend((0..32).map(|_| Vec::new()));

    let config = TapHoldConfig::default().with_actual(0, keys::E);
    let mut kb = Keyboard::new(LoopMatrix::new(scans)).with_plugin(TapHoldEngine::new(config));
    c.bench_function("tap_hold/tap_cycle", |b| {
        b.iter(|| black_box(kb.cycle()));
    });
}

fn bench_tap_hold_rolling(c: &mut Criterion) {
    let scans = vec![
        vec![ev(TM1, KeyState::DOWN)],
        vec![ev(P_A, KeyState::DOWN), ev(TM1, KeyState::HELD)],
        vec![ev(P_A, KeyState::UP), ev(TM1, KeyState::HELD)],
        vec![ev(TM1, KeyState::UP)],
    ];

    let config = TapHoldConfig::default().with_actual(0, keys::E);
    let mut kb = Keyboard::new(LoopMatrix::new(scans)).with_plugin(TapHoldEngine::new(config));
    c.bench_function("tap_hold/rolling_cycle", |b| {
        b.iter(|| black_box(kb.cycle()));
    });
}

fn stop_on_z(event: &KeyswitchEvent) -> bool {
    event.key == keys::Z && event.state.toggled_on()
}

struct RecordOnA;

impl Plugin for RecordOnA {
    fn on_keyswitch_event(
        &mut self,
        ctx: &mut Context<'_>,
        event: &mut KeyswitchEvent,
    ) -> EventResult {
        if event.key == keys::A && event.state.toggled_on() {
            let _ = ctx.start_queue(300, stop_on_z);
        }
        EventResult::Pass
    }
}

fn bench_queue_record_replay(c: &mut Criterion) {
    // Each loop arms a recording, feeds a short burst and stops on Z.
    let scans = vec![
        vec![ev(P_A, KeyState::DOWN)],
        vec![ev(P_A, KeyState::HELD)],
        vec![ev(P_A, KeyState::UP), ev(TM1, KeyState::DOWN)],
        vec![ev(TM1, KeyState::HELD)],
        vec![ev(TM1, KeyState::UP)],
        vec![ev(P_Z, KeyState::DOWN)],
        vec![ev(P_Z, KeyState::UP)],
        Vec::new(),
    ];

    let config = TapHoldConfig::default().with_actual(0, keys::E);
    let mut kb = Keyboard::new(LoopMatrix::new(scans))
        .with_plugin(RecordOnA)
        .with_plugin(TapHoldEngine::new(config));
    c.bench_function("queue/record_replay_burst", |b| {
        b.iter(|| {
            // Live press arms the queue; the next cycle records and replays.
            black_box(kb.cycle());
            black_box(kb.cycle());
        });
    });
}

criterion_group!(
    benches,
    bench_tap_hold_tap,
    bench_tap_hold_rolling,
    bench_queue_record_replay
);
criterion_main!(benches);
