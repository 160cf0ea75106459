//! Cycle driver: runs the hook chain once per scan and sends the report.

use crate::error::CycleError;
use crate::hooks::{Context, Effect, Hardware, Plugin};
use crate::queue::{CycleRunner, QueueEngine};
use crate::report::Report;
use crate::types::{EventResult, KeyswitchEvent, Millis};
use tracing::{debug, error, trace};

#[derive(Debug, Clone, Copy)]
enum Hook {
    BeforeEachCycle,
    BeforeReportingState,
    AfterEachCycle,
}

impl Hook {
    fn name(self) -> &'static str {
        match self {
            Hook::BeforeEachCycle => "before_each_cycle",
            Hook::BeforeReportingState => "before_reporting_state",
            Hook::AfterEachCycle => "after_each_cycle",
        }
    }
}

/// Everything downstream of the queue engine.
struct Chain<H> {
    hw: H,
    plugins: Vec<Box<dyn Plugin>>,
    report: Report,
    now: Millis,
    fault: Option<CycleError>,
}

impl<H: Hardware> Chain<H> {
    fn note(&mut self, hook: &'static str, result: EventResult) -> EventResult {
        if let EventResult::Fatal(fault) = result {
            error!("Keyboard: {} aborted: {}", hook, fault);
            self.fault.get_or_insert(CycleError::Fatal { hook, fault });
        }
        result
    }

    fn run_hook(&mut self, mut queue: Option<&mut QueueEngine>, hook: Hook) -> EventResult {
        for i in 0..self.plugins.len() {
            let mut effects = Vec::new();
            let result = {
                let mut ctx = Context::new(self.now, queue.as_deref_mut(), &mut effects);
                let plugin = &mut self.plugins[i];
                match hook {
                    Hook::BeforeEachCycle => plugin.before_each_cycle(&mut ctx),
                    Hook::BeforeReportingState => plugin.before_reporting_state(&mut ctx),
                    Hook::AfterEachCycle => plugin.after_each_cycle(&mut ctx),
                }
            };
            self.apply_effects(queue.as_deref_mut(), effects);

            match result {
                EventResult::Pass => {}
                EventResult::Consumed => return result,
                EventResult::Fatal(_) => return self.note(hook.name(), result),
            }
        }
        EventResult::Pass
    }

    fn dispatch(
        &mut self,
        mut queue: Option<&mut QueueEngine>,
        mut event: KeyswitchEvent,
    ) -> EventResult {
        // Injected events carry the key they mean, even when that is none.
        if event.key.is_none() && !event.injected {
            event.key = self.hw.lookup(event.pos);
        }

        if let Some(queue) = queue.as_deref_mut() {
            match queue.on_keyswitch_event(&event) {
                EventResult::Pass => {}
                EventResult::Consumed => return EventResult::Consumed,
                result => return self.note("queue", result),
            }
        }

        for i in 0..self.plugins.len() {
            let mut effects = Vec::new();
            let result = {
                let mut ctx = Context::new(self.now, queue.as_deref_mut(), &mut effects);
                self.plugins[i].on_keyswitch_event(&mut ctx, &mut event)
            };
            self.apply_effects(queue.as_deref_mut(), effects);

            match result {
                EventResult::Pass => {}
                EventResult::Consumed => return result,
                EventResult::Fatal(_) => return self.note("on_keyswitch_event", result),
            }
        }

        self.report.apply(&event);
        EventResult::Pass
    }

    fn apply_effects(&mut self, mut queue: Option<&mut QueueEngine>, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Inject(event) => {
                    trace!("Keyboard: inject {:?} {:?} at {:?}", event.key, event.state, event.pos);
                    self.dispatch(queue.as_deref_mut(), event);
                }
                Effect::FlushReport => {
                    trace!("Keyboard: flush {:?}", self.report.keys());
                    self.hw.send_report(&self.report);
                }
            }
        }
    }

    fn scan_resolved(&mut self) -> Vec<KeyswitchEvent> {
        let mut events = self.hw.scan_matrix();
        for event in events.iter_mut() {
            if event.key.is_none() {
                event.key = self.hw.lookup(event.pos);
            }
        }
        events
    }

    fn send_and_clear(&mut self) {
        self.hw.send_report(&self.report);
        self.report.clear();
    }
}

/// Replay side: the queue engine drives the plugins directly.
impl<H: Hardware> CycleRunner for Chain<H> {
    fn millis(&mut self) -> Millis {
        self.hw.millis()
    }

    fn scan(&mut self) -> Vec<KeyswitchEvent> {
        self.scan_resolved()
    }

    fn set_cycle_start(&mut self, at: Millis) {
        self.now = at;
    }

    fn before_each_cycle(&mut self) -> EventResult {
        self.run_hook(None, Hook::BeforeEachCycle)
    }

    fn handle_keyswitch_event(&mut self, event: KeyswitchEvent) -> EventResult {
        self.dispatch(None, event)
    }

    fn before_reporting_state(&mut self) -> EventResult {
        self.run_hook(None, Hook::BeforeReportingState)
    }

    fn send_report(&mut self) {
        self.send_and_clear();
    }

    fn after_each_cycle(&mut self) -> EventResult {
        self.run_hook(None, Hook::AfterEachCycle)
    }
}

/// Firmware main loop body. The queue engine always runs first; plugins
/// follow in registration order.
pub struct Keyboard<H: Hardware> {
    queue: QueueEngine,
    chain: Chain<H>,
}

impl<H: Hardware> Keyboard<H> {
    pub fn new(hardware: H) -> Self {
        Self {
            queue: QueueEngine::new(),
            chain: Chain {
                hw: hardware,
                plugins: Vec::new(),
                report: Report::new(),
                now: 0,
                fault: None,
            },
        }
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        self.chain.plugins.push(plugin);
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.register(Box::new(plugin));
        self
    }

    pub fn queue(&self) -> &QueueEngine {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut QueueEngine {
        &mut self.queue
    }

    pub fn hardware(&self) -> &H {
        &self.chain.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.chain.hw
    }

    /// Start of the current cycle as plugins see it.
    pub fn millis(&self) -> Millis {
        self.chain.now
    }

    /// Runs one full scan cycle. A fatal hook result aborts only the event or
    /// hook sequence that raised it; the rest of the cycle still runs and the
    /// first fault is returned.
    pub fn cycle(&mut self) -> Result<(), CycleError> {
        let chain = &mut self.chain;
        chain.fault = None;
        chain.now = chain.hw.millis();

        let result = self.queue.before_each_cycle(&mut *chain);
        if chain.fault.is_none() {
            chain.note("queue", result);
        }

        chain.run_hook(Some(&mut self.queue), Hook::BeforeEachCycle);

        let events = chain.scan_resolved();
        for event in events {
            chain.dispatch(Some(&mut self.queue), event);
        }

        chain.run_hook(Some(&mut self.queue), Hook::BeforeReportingState);
        chain.send_and_clear();
        chain.run_hook(Some(&mut self.queue), Hook::AfterEachCycle);

        match chain.fault.take() {
            Some(err) => {
                debug!("Keyboard: cycle at {} finished with {}", chain.now, err);
                Err(err)
            }
            None => Ok(()),
        }
    }
}
