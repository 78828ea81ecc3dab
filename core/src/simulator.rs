use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use crate::registry::ScriptStore;
use crate::script::{LogEntry, LogKind, ScriptPatch, ScriptStatus};
use crate::store::Kv;
use crate::timers::Timers;

/// Delays of a simulated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTiming {
    /// From start until `completed`.
    pub run: Duration,
    /// From `completed` back to `idle`.
    pub settle: Duration,
}

impl Default for RunTiming {
    fn default() -> Self {
        Self { run: Duration::from_secs(3), settle: Duration::from_secs(5) }
    }
}

/// Deferred step of a simulated run, keyed by script id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStep {
    /// Log success and mark `completed`.
    Complete(String),
    /// Mark `idle`.
    Reset(String),
}

/// Drives `idle -> running -> completed -> idle` for requested runs.
///
/// Nothing is executed. Runs are independent per id and are never
/// deduplicated or cancelled; a second run on a busy script restarts the
/// sequence alongside the first. Steps against a deleted script do nothing.
#[derive(Debug, Default)]
pub struct RunSimulator {
    timing: RunTiming,
    timers: Timers<RunStep>,
}

impl RunSimulator {
    /// Simulator with the given delays.
    pub fn new(timing: RunTiming) -> Self {
        Self { timing, timers: Timers::new() }
    }

    /// Configured delays.
    pub fn timing(&self) -> RunTiming {
        self.timing
    }

    /// Start a run of script `id` at `now`. Returns `false` (and does nothing) for unknown ids.
    pub fn run<K: Kv>(&mut self, store: &mut ScriptStore<K>, id: &str, now: Instant) -> bool {
        let Some(name) = store.get(id).map(|s| s.name.clone()) else {
            debug!(%id, "run: no such script");
            return false;
        };
        store.update(
            id,
            ScriptPatch {
                status: Some(ScriptStatus::Running),
                last_run: Some(Some(Utc::now())),
                ..ScriptPatch::default()
            },
        );
        store.append_log(
            id,
            LogEntry::new(LogKind::Info, format!("Script '{name}' started execution.")),
        );
        info!(%id, %name, "run started");
        self.timers.schedule_after(now, self.timing.run, RunStep::Complete(id.to_string()));
        true
    }

    /// Fire every step due at `now`, in deadline order. Returns how many fired.
    ///
    /// A completion schedules its reset relative to its own deadline, so one
    /// call far enough in the future walks a run all the way back to idle.
    pub fn advance<K: Kv>(&mut self, store: &mut ScriptStore<K>, now: Instant) -> usize {
        let mut fired = 0;
        while let Some((due, step)) = self.timers.pop_due(now) {
            fired += 1;
            match step {
                RunStep::Complete(id) => {
                    store.append_log(
                        &id,
                        LogEntry::new(LogKind::Success, "Script execution completed successfully."),
                    );
                    if store.update(&id, ScriptPatch::status(ScriptStatus::Completed)) {
                        info!(%id, "run completed");
                    }
                    self.timers.schedule_after(due, self.timing.settle, RunStep::Reset(id));
                }
                RunStep::Reset(id) => {
                    if store.update(&id, ScriptPatch::status(ScriptStatus::Idle)) {
                        debug!(%id, "back to idle");
                    }
                }
            }
        }
        fired
    }

    /// When the next step becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Number of steps still queued.
    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::scripts_key;
    use crate::script::{NewScript, Script, ScriptType};
    use crate::store::{KvSerde, MemKv};

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn empty_store() -> ScriptStore<MemKv> {
        let kv = MemKv::new();
        kv.put_t(&scripts_key(), &Vec::<Script>::new()).unwrap();
        ScriptStore::open(kv).unwrap()
    }

    fn kinds(store: &ScriptStore<MemKv>, id: &str) -> Vec<LogKind> {
        store.logs(id).iter().map(|e| e.kind).collect()
    }

    #[test]
    fn walks_through_all_states() {
        let mut store = empty_store();
        let mut sim = RunSimulator::default();
        let id = store.add(NewScript::new("Backup Job", ScriptType::Backup)).id;
        let t0 = Instant::now();

        assert!(sim.run(&mut store, &id, t0));
        assert_eq!(store.get(&id).unwrap().status, ScriptStatus::Running);
        assert_eq!(store.logs(&id).last().unwrap().kind, LogKind::Info);
        assert_eq!(store.logs(&id)[0].message, "Script 'Backup Job' started execution.");

        assert_eq!(sim.advance(&mut store, t0 + secs(2)), 0);
        assert_eq!(store.get(&id).unwrap().status, ScriptStatus::Running);

        assert_eq!(sim.advance(&mut store, t0 + secs(3)), 1);
        assert_eq!(store.get(&id).unwrap().status, ScriptStatus::Completed);
        assert_eq!(store.logs(&id).last().unwrap().kind, LogKind::Success);

        assert_eq!(sim.advance(&mut store, t0 + secs(7)), 0);
        assert_eq!(sim.advance(&mut store, t0 + secs(8)), 1);
        assert_eq!(store.get(&id).unwrap().status, ScriptStatus::Idle);
        assert_eq!(sim.pending(), 0);
    }

    #[test]
    fn single_advance_past_both_delays_reaches_idle() {
        let mut store = empty_store();
        let mut sim = RunSimulator::default();
        let id = store.add(NewScript::new("Backup Job", ScriptType::Backup)).id;
        let t0 = Instant::now();

        sim.run(&mut store, &id, t0);
        assert_eq!(sim.advance(&mut store, t0 + secs(60)), 2);
        assert_eq!(store.get(&id).unwrap().status, ScriptStatus::Idle);
        assert_eq!(kinds(&store, &id), [LogKind::Info, LogKind::Success]);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let mut store = empty_store();
        let mut sim = RunSimulator::default();
        assert!(!sim.run(&mut store, "missing", Instant::now()));
        assert_eq!(sim.pending(), 0);
        assert!(store.logs("missing").is_empty());
    }

    #[test]
    fn double_run_interleaves_without_dedup() {
        let mut store = empty_store();
        let mut sim = RunSimulator::default();
        let id = store.add(NewScript::new("Twice", ScriptType::Custom)).id;
        let t0 = Instant::now();

        sim.run(&mut store, &id, t0);
        sim.run(&mut store, &id, t0 + secs(1));
        assert_eq!(kinds(&store, &id), [LogKind::Info, LogKind::Info]);

        // first completion lands while the second run is still in flight
        sim.advance(&mut store, t0 + secs(3));
        assert_eq!(store.get(&id).unwrap().status, ScriptStatus::Completed);

        sim.advance(&mut store, t0 + secs(8));
        assert_eq!(store.get(&id).unwrap().status, ScriptStatus::Idle);
        assert_eq!(sim.pending(), 1);

        sim.advance(&mut store, t0 + secs(9));
        assert_eq!(
            kinds(&store, &id),
            [LogKind::Info, LogKind::Info, LogKind::Success, LogKind::Success]
        );
        assert_eq!(sim.pending(), 0);
    }

    #[test]
    fn delete_mid_run_lets_steps_fizzle() {
        let mut store = empty_store();
        let mut sim = RunSimulator::default();
        let keep = store.add(NewScript::new("Keep", ScriptType::Custom)).id;
        let gone = store.add(NewScript::new("Gone", ScriptType::Custom)).id;
        let t0 = Instant::now();

        sim.run(&mut store, &gone, t0);
        store.delete(&gone);
        assert_eq!(sim.advance(&mut store, t0 + secs(10)), 2);

        assert!(store.get(&gone).is_none());
        assert!(store.logs(&gone).is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&keep).unwrap().status, ScriptStatus::Idle);
    }

    #[test]
    fn runs_on_different_scripts_are_independent() {
        let mut store = empty_store();
        let mut sim = RunSimulator::new(RunTiming { run: secs(1), settle: secs(1) });
        let a = store.add(NewScript::new("A", ScriptType::Custom)).id;
        let b = store.add(NewScript::new("B", ScriptType::Custom)).id;
        let t0 = Instant::now();

        sim.run(&mut store, &a, t0);
        sim.advance(&mut store, t0 + secs(1));
        sim.run(&mut store, &b, t0 + secs(1));

        assert_eq!(store.get(&a).unwrap().status, ScriptStatus::Completed);
        assert_eq!(store.get(&b).unwrap().status, ScriptStatus::Running);
        assert_eq!(sim.next_deadline(), Some(t0 + secs(2)));
    }

    #[test]
    fn run_stamps_last_run() {
        let mut store = empty_store();
        let mut sim = RunSimulator::default();
        let id = store.add(NewScript::new("A", ScriptType::Custom)).id;
        assert!(store.get(&id).unwrap().last_run.is_none());

        let before = Utc::now();
        sim.run(&mut store, &id, Instant::now());
        assert!(store.get(&id).unwrap().last_run.unwrap() >= before);
    }
}
