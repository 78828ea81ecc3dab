use std::sync::Arc;

use deck_core::script::Script;
use deck_core::store::DefaultKv;
use deck_core::{RunSimulator, ScriptStore};
use tokio::sync::{Mutex, MutexGuard, Notify};
use tracing::warn;

/// The store together with the simulator whose timers mutate it.
pub struct Deck {
    pub store: ScriptStore<DefaultKv>,
    pub sim: RunSimulator,
}

impl Deck {
    pub fn new(store: ScriptStore<DefaultKv>, sim: RunSimulator) -> Self {
        Self { store, sim }
    }

    /// Wipe every script and log, re-seed the demo records and drop all queued run steps.
    pub fn reset(&mut self) {
        self.store.reset();
        self.sim = RunSimulator::new(self.sim.timing());
        self.report_persist_error();
    }

    /// Log a failed snapshot write, if the last mutation produced one.
    pub fn report_persist_error(&mut self) {
        if let Some(err) = self.store.take_persist_error() {
            warn!(error = %err, "snapshot not saved");
        }
    }
}

/// Handle shared by every module. Cloning is cheap.
#[derive(Clone)]
pub struct SharedDeck {
    inner: Arc<Mutex<Deck>>,
    wake: Arc<Notify>,
}

impl SharedDeck {
    pub fn new(deck: Deck) -> Self {
        Self { inner: Arc::new(Mutex::new(deck)), wake: Arc::new(Notify::new()) }
    }

    pub async fn lock(&self) -> MutexGuard<'_, Deck> {
        self.inner.lock().await
    }

    /// Start a simulated run and wake the driver so it picks up the new deadline.
    pub async fn run(&self, id: &str) -> Option<Script> {
        let mut deck = self.lock().await;
        let Deck { store, sim } = &mut *deck;
        let started = sim.run(store, id, now());
        deck.report_persist_error();
        let script = deck.store.get(id).cloned();
        drop(deck);
        if started {
            self.wake.notify_one();
        }
        script
    }

    /// Resolves when a run was started since the last wake-up.
    pub async fn woken(&self) {
        self.wake.notified().await
    }
}

/// Current instant on tokio's clock, so paused-time tests move it too.
pub fn now() -> std::time::Instant {
    tokio::time::Instant::now().into_std()
}
