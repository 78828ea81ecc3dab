use std::time::{Duration, Instant};

use chrono::{NaiveTime, Utc};
use deck_core::registry::{logs_key, scripts_key};
use deck_core::schedule::{Frequency, Schedule, Weekday};
use deck_core::script::{LogKind, NewScript, Script, ScriptStatus, ScriptType};
use deck_core::store::{open_default, Kv, KvSerde};
use deck_core::{RunSimulator, ScriptStore};

fn fresh_fs_store(dir: &std::path::Path) -> ScriptStore<deck_core::store::FsKv> {
    let kv = open_default(dir).unwrap();
    kv.put_t(&scripts_key(), &Vec::<Script>::new()).unwrap();
    ScriptStore::open(kv).unwrap()
}

fn reload(dir: &std::path::Path) -> ScriptStore<deck_core::store::FsKv> {
    ScriptStore::open(open_default(dir).unwrap()).unwrap()
}

#[test]
fn round_trip_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let store = fresh_fs_store(dir.path());
    assert!(store.is_empty());
    assert!(reload(dir.path()).is_empty());
}

#[test]
fn round_trip_single_record() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = fresh_fs_store(dir.path());
    store.add(
        NewScript::new("Weekly Report", ScriptType::Notification)
            .description("mail the numbers")
            .code("send()")
            .schedule(Schedule::new(
                Frequency::Weekly,
                NaiveTime::from_hms_opt(9, 30, 0),
                None,
                vec![Weekday::Monday, Weekday::Thursday],
                None,
            )),
    );
    assert_eq!(reload(dir.path()).list(), store.list());
}

#[test]
fn round_trip_many_records_with_logs() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = fresh_fs_store(dir.path());
    let mut sim = RunSimulator::default();
    for (i, kind) in ScriptType::ALL.into_iter().enumerate() {
        store.add(NewScript::new(format!("script {i}"), kind));
    }
    let first = store.list()[0].id.clone();
    let t0 = Instant::now();
    sim.run(&mut store, &first, t0);
    sim.advance(&mut store, t0 + Duration::from_secs(3));

    let back = reload(dir.path());
    assert_eq!(back.list(), store.list());
    assert_eq!(back.logs(&first), store.logs(&first));
    assert_eq!(back.get(&first).unwrap().status, ScriptStatus::Completed);
}

#[test]
fn fresh_directory_seeds_demo_records_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = ScriptStore::open(open_default(dir.path()).unwrap()).unwrap();
    let names: Vec<&str> = store.list().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["File Organizer", "Data Cleaner"]);

    let kv = open_default(dir.path()).unwrap();
    assert!(kv.get(&scripts_key()).is_some());
    assert!(kv.get(&logs_key()).is_none());
    assert_eq!(reload(dir.path()).len(), 2);
}

#[test]
fn backup_job_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = fresh_fs_store(dir.path());
    let mut sim = RunSimulator::default();

    let job = store.add(NewScript::new("Backup Job", ScriptType::Backup));
    assert_eq!(store.len(), 1);
    assert_eq!(job.status, ScriptStatus::Idle);
    assert_eq!(job.last_run, None);

    let called = Utc::now();
    let t0 = Instant::now();
    sim.run(&mut store, &job.id, t0);
    let running = store.get(&job.id).unwrap();
    assert_eq!(running.status, ScriptStatus::Running);
    assert!(running.last_run.unwrap() >= called);

    sim.advance(&mut store, t0 + Duration::from_secs(9));
    assert_eq!(store.get(&job.id).unwrap().status, ScriptStatus::Idle);
    let kinds: Vec<LogKind> = store.logs(&job.id).iter().map(|e| e.kind).collect();
    assert_eq!(kinds, [LogKind::Info, LogKind::Success]);

    // the reset to idle was persisted too
    assert_eq!(reload(dir.path()).get(&job.id).unwrap().status, ScriptStatus::Idle);
}

#[test]
fn get_on_never_created_id_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = reload(dir.path());
    assert!(store.get("does-not-exist").is_none());
}
