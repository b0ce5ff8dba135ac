#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use u_simengine::engine::{
    ExecutionContext, LifecycleState, ProgressInfo, Simulation, SimulationListener,
};
use u_simengine::{BoxError, SimulationError};

/// Everything a listener observed, in delivery order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
    transitions: Mutex<Vec<(LifecycleState, LifecycleState)>>,
    failures: Mutex<Vec<String>>,
    progress: Mutex<Vec<ProgressInfo>>,
    refreshes: AtomicU64,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn transitions(&self) -> Vec<(LifecycleState, LifecycleState)> {
        self.transitions.lock().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    pub fn progress(&self) -> Vec<ProgressInfo> {
        self.progress.lock().clone()
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Callback names only, without transitions.
    pub fn callbacks(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| !e.contains("->"))
            .collect()
    }

    fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }
}

impl SimulationListener for Recorder {
    fn on_state_change(&self, from: LifecycleState, to: LifecycleState, _reason: &str) {
        self.transitions.lock().push((from, to));
        self.push(format!("{from}->{to}"));
    }

    fn on_init(&self) {
        self.push("init");
    }

    fn on_ready(&self) {
        self.push("ready");
    }

    fn on_run(&self) {
        self.push("run");
    }

    fn on_resume(&self) {
        self.push("resume");
    }

    fn on_pause(&self) {
        self.push("pause");
    }

    fn on_done(&self) {
        self.push("done");
    }

    fn on_fail(&self, error: &SimulationError) {
        self.failures.lock().push(error.to_string());
        self.push("fail");
    }

    fn on_cancel_requested(&self) {
        self.push("cancel");
    }

    fn on_message(&self, text: &str) {
        self.push(format!("message:{text}"));
    }

    fn on_progress(&self, info: &ProgressInfo) {
        self.progress.lock().push(info.clone());
    }

    fn on_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts of computation callbacks, shared with the test.
#[derive(Debug, Default)]
pub struct Calls {
    pub init: AtomicU64,
    pub step: AtomicU64,
    pub cancel: AtomicU64,
    pub shutdown: AtomicU64,
}

impl Calls {
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::SeqCst)
    }
}

/// How a [`Scripted`] computation misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    InitError,
    InitPanic,
    StepError(u64),
    StepPanic(u64),
}

/// Steps until `limit` (`u64::MAX` for "forever"), optionally failing.
pub struct Scripted {
    pub calls: Arc<Calls>,
    pub limit: u64,
    pub fault: Fault,
    pub step_delay: Duration,
    pub refresh_every_step: bool,
}

impl Scripted {
    pub fn new(limit: u64) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let sim = Self {
            calls: Arc::clone(&calls),
            limit,
            fault: Fault::None,
            step_delay: Duration::ZERO,
            refresh_every_step: false,
        };
        (sim, calls)
    }

    pub fn endless() -> (Self, Arc<Calls>) {
        let (mut sim, calls) = Self::new(u64::MAX);
        sim.step_delay = Duration::from_micros(200);
        (sim, calls)
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = fault;
        self
    }
}

impl Simulation for Scripted {
    fn init(&mut self, ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.calls.init.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::InitError => return Err("bad input".into()),
            Fault::InitPanic => panic!("init exploded"),
            _ => {}
        }
        ctx.post_message("initialized");
        Ok(())
    }

    fn step(&mut self, ctx: &ExecutionContext) -> Result<bool, BoxError> {
        let n = self.calls.step.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fault {
            Fault::StepError(at) if at == n => return Err(format!("diverged at {n}").into()),
            Fault::StepPanic(at) if at == n => panic!("step {n} exploded"),
            _ => {}
        }
        if !self.step_delay.is_zero() {
            thread::sleep(self.step_delay);
        }
        if self.refresh_every_step {
            ctx.request_refresh();
        }
        Ok(n < self.limit)
    }

    fn cancel(&mut self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.calls.cancel.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn shutdown(&mut self, _ctx: &ExecutionContext) -> Result<(), BoxError> {
        self.calls.shutdown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn progress(&self, _ctx: &ExecutionContext) -> ProgressInfo {
        if self.limit == u64::MAX {
            ProgressInfo::indeterminate()
        } else {
            let done = self.calls.step.load(Ordering::SeqCst);
            ProgressInfo::determinate(done as f64 / self.limit as f64)
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Polls `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Every observed edge is legal and consecutive edges chain.
pub fn assert_legal_path(transitions: &[(LifecycleState, LifecycleState)]) {
    for &(from, to) in transitions {
        assert!(from.can_transition_to(to), "illegal edge {from} -> {to}");
    }
    for pair in transitions.windows(2) {
        assert_eq!(pair[0].1, pair[1].0, "broken path: {transitions:?}");
    }
}
