//! Host-side bridge that swaps computations behind stable subscriptions.

use std::sync::Arc;

use tracing::debug;

use super::config::EngineConfig;
use super::listener::{ListenerId, SimulationListener};
use super::runner::Engine;
use super::state::LifecycleState;
use super::types::Simulation;
use crate::error::EngineError;

struct Subscription {
    id: ListenerId,
    engine_id: ListenerId,
    listener: Arc<dyn SimulationListener>,
}

/// Keeps one outward engine identity across computation replacements.
///
/// A live engine's computation is never mutated in place. Instead,
/// [`switch`](EngineBridge::switch) winds the current engine down to a
/// terminal state, builds a fresh one with the same configuration in
/// `SWITCHING`, re-subscribes every bridge listener, and moves it to `NEW`.
/// Listeners observe `... -> TERMINATED -> SWITCHING -> NEW` and then the new
/// run's events.
pub struct EngineBridge {
    engine: Engine,
    config: EngineConfig,
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

impl EngineBridge {
    pub fn new(
        simulation: impl Simulation + 'static,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let engine = Engine::new(simulation, config.clone())?;
        Ok(Self {
            engine,
            config,
            subscriptions: Vec::new(),
            next_id: 0,
        })
    }

    /// The engine currently behind the bridge.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Subscribes a listener to this and every future engine.
    pub fn add_listener(&mut self, listener: Arc<dyn SimulationListener>) -> ListenerId {
        let engine_id = self.engine.add_listener(Arc::clone(&listener));
        let id = self.next_listener_id();
        self.subscriptions.push(Subscription {
            id,
            engine_id,
            listener,
        });
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let Some(index) = self.subscriptions.iter().position(|s| s.id == id) else {
            return false;
        };
        let subscription = self.subscriptions.remove(index);
        self.engine.remove_listener(subscription.engine_id);
        true
    }

    /// Replaces the hosted computation.
    ///
    /// Blocks until the current engine has fully terminated: a run that is
    /// still active is stopped first, so `SWITCHING` is never entered from
    /// `RUNNING`. The new engine starts out in `NEW`; call `start()` on it.
    pub fn switch(&mut self, simulation: impl Simulation + 'static) -> Result<(), EngineError> {
        let state = self.engine.state();
        if state != LifecycleState::New && !state.is_terminal() {
            self.engine.stop();
        }
        self.engine.join()?;
        let from = self.engine.state();

        let next = Engine::build(
            Box::new(simulation),
            self.config.clone(),
            LifecycleState::Switching,
        )?;
        for subscription in &mut self.subscriptions {
            subscription.engine_id = next.add_listener(Arc::clone(&subscription.listener));
        }
        next.complete_switch(from);
        debug!(%from, name = %self.config.name, "simulation switched");

        // The old engine is terminal; dropping it releases its threads.
        self.engine = next;
        Ok(())
    }

    fn next_listener_id(&mut self) -> ListenerId {
        let id = ListenerId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }
}

impl std::fmt::Debug for EngineBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineBridge")
            .field("engine", &self.engine)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}
