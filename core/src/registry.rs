use std::collections::BTreeMap;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog;
use crate::error::StoreError;
use crate::script::{LogEntry, NewScript, Script, ScriptExport, ScriptPatch};
use crate::store::{ns, Kv, KvSerde};

/// Namespace of the two persisted blobs.
pub const BLOB_NS: &str = "automation";

/// Key of the serialized script collection.
pub fn scripts_key() -> Vec<u8> {
    ns(BLOB_NS, "scripts")
}

/// Key of the serialized log map (script id -> entries).
pub fn logs_key() -> Vec<u8> {
    ns(BLOB_NS, "logs")
}

/// Authoritative set of scripts and their logs, mirrored to a [`Kv`].
///
/// Every mutation rewrites the full collection (and, when logs change, the
/// full log map). Writes are best-effort: a failed write keeps the in-memory
/// change, logs a warning and is retained for [`ScriptStore::take_persist_error`].
pub struct ScriptStore<K: Kv> {
    kv: K,
    scripts: Vec<Script>,
    logs: BTreeMap<String, Vec<LogEntry>>,
    persist_error: Option<StoreError>,
}

impl<K: Kv> ScriptStore<K> {
    /// Load both blobs from `kv`, seeding the demo records if no collection was ever saved.
    ///
    /// Seeding writes the collection immediately, so it happens once per fresh
    /// storage area. A blob that fails to parse is an error.
    pub fn open(kv: K) -> Result<Self, StoreError> {
        let stored: Option<Vec<Script>> = kv.get_t(&scripts_key())?;
        let logs: BTreeMap<String, Vec<LogEntry>> = kv.get_t(&logs_key())?.unwrap_or_default();

        match stored {
            Some(scripts) => {
                debug!(count = scripts.len(), "loaded scripts");
                Ok(Self { kv, scripts, logs, persist_error: None })
            }
            None => {
                let mut store = Self { kv, scripts: Vec::new(), logs, persist_error: None };
                store.seed();
                Ok(store)
            }
        }
    }

    /// Drop every script and log, in memory and in the [`Kv`], then seed the demo records again.
    ///
    /// Leaves the store exactly as [`ScriptStore::open`] leaves fresh storage.
    pub fn reset(&mut self) {
        let had_scripts = self.kv.delete(&scripts_key());
        let had_logs = self.kv.delete(&logs_key());
        debug!(had_scripts, had_logs, "removed blobs");
        self.logs.clear();
        self.seed();
    }

    /// All scripts in insertion order.
    pub fn list(&self) -> &[Script] {
        &self.scripts
    }

    /// Number of scripts.
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// True when there are no scripts.
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    /// The script with `id`, if any.
    pub fn get(&self, id: &str) -> Option<&Script> {
        self.scripts.iter().find(|s| s.id == id)
    }

    /// Create a script with a fresh id, the current time and no logs.
    pub fn add(&mut self, data: NewScript) -> Script {
        let script = Script {
            id: Uuid::new_v4().simple().to_string(),
            name: data.name,
            description: data.description,
            code: data.code,
            kind: data.kind,
            status: data.status,
            created_at: Utc::now(),
            last_run: data.last_run,
            schedule: data.schedule,
            logs: Vec::new(),
        };
        debug!(id = %script.id, name = %script.name, "add script");
        self.scripts.push(script.clone());
        self.save_scripts();
        script
    }

    /// Overwrite the given fields of script `id`. Unknown ids are a silent no-op.
    ///
    /// Returns whether a script matched.
    pub fn update(&mut self, id: &str, patch: ScriptPatch) -> bool {
        let Some(script) = self.scripts.iter_mut().find(|s| s.id == id) else {
            debug!(%id, "update: no such script");
            return false;
        };
        patch.apply_to(script);
        self.save_scripts();
        true
    }

    /// Remove script `id` and its logs. Unknown ids are a silent no-op.
    ///
    /// Returns whether a script was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.scripts.len();
        self.scripts.retain(|s| s.id != id);
        let removed = self.scripts.len() != before;
        let had_logs = self.logs.remove(id).is_some();
        if removed {
            debug!(%id, "delete script");
            self.save_scripts();
        }
        if had_logs {
            self.save_logs();
        }
        removed
    }

    /// Log entries of script `id`; empty when it has none or does not exist.
    pub fn logs(&self, id: &str) -> &[LogEntry] {
        self.logs.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append one entry to the log of script `id`. Dropped if the script does not exist.
    pub fn append_log(&mut self, id: &str, entry: LogEntry) -> bool {
        if self.get(id).is_none() {
            debug!(%id, "append_log: no such script");
            return false;
        }
        self.logs.entry(id.to_string()).or_default().push(entry);
        self.save_logs();
        true
    }

    /// Empty the log of script `id` without touching the script itself.
    pub fn clear_logs(&mut self, id: &str) {
        if self.get(id).is_none() {
            return;
        }
        self.logs.insert(id.to_string(), Vec::new());
        self.save_logs();
    }

    /// Export form of script `id`.
    pub fn export(&self, id: &str) -> Result<ScriptExport, StoreError> {
        self.get(id)
            .map(Script::export)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Add a script from an exported document.
    pub fn import(&mut self, doc: ScriptExport) -> Script {
        self.add(doc.into_new_script())
    }

    /// Most recent persistence failure since the last call, if any.
    pub fn take_persist_error(&mut self) -> Option<StoreError> {
        self.persist_error.take()
    }

    /// The backing key/value store.
    pub fn kv(&self) -> &K {
        &self.kv
    }

    fn seed(&mut self) {
        info!("seeding demo records");
        self.scripts = catalog::demo_scripts();
        self.save_scripts();
    }

    fn save_scripts(&mut self) {
        let res = self.kv.put_t(&scripts_key(), &self.scripts);
        self.record(res);
    }

    fn save_logs(&mut self) {
        let res = self.kv.put_t(&logs_key(), &self.logs);
        self.record(res);
    }

    fn record(&mut self, res: Result<(), StoreError>) {
        if let Err(err) = res {
            warn!(error = %err, "persist failed, keeping in-memory state");
            self.persist_error = Some(err);
        }
    }
}
