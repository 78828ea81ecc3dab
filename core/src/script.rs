use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::schedule::Schedule;

/// Category tag of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptType {
    /// Sorting and moving files.
    FileOrganization,
    /// Cleaning tabular data.
    DataCleaning,
    /// Housekeeping on the host.
    SystemMaintenance,
    /// Fetching and extracting web content.
    WebScraping,
    /// Archiving data.
    Backup,
    /// Sending alerts.
    Notification,
    /// Anything else.
    Custom,
}

impl ScriptType {
    /// Every category, in display order.
    pub const ALL: [ScriptType; 7] = [
        ScriptType::FileOrganization,
        ScriptType::DataCleaning,
        ScriptType::SystemMaintenance,
        ScriptType::WebScraping,
        ScriptType::Backup,
        ScriptType::Notification,
        ScriptType::Custom,
    ];

    /// Wire tag, e.g. `"file-organization"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptType::FileOrganization => "file-organization",
            ScriptType::DataCleaning => "data-cleaning",
            ScriptType::SystemMaintenance => "system-maintenance",
            ScriptType::WebScraping => "web-scraping",
            ScriptType::Backup => "backup",
            ScriptType::Notification => "notification",
            ScriptType::Custom => "custom",
        }
    }

    /// Friendly name shown to users.
    pub fn display_name(self) -> &'static str {
        match self {
            ScriptType::FileOrganization => "File Organization",
            ScriptType::DataCleaning => "Data Cleaning",
            ScriptType::SystemMaintenance => "System Maintenance",
            ScriptType::WebScraping => "Web Scraping",
            ScriptType::Backup => "Backup",
            ScriptType::Notification => "Notification",
            ScriptType::Custom => "Custom Script",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        ScriptType::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| format!("unknown script type {s:?}"))
    }
}

/// Lifecycle status of a script.
///
/// Only `Idle`, `Running` and `Completed` are produced by the run simulator.
/// `Failed` and `Scheduled` are valid values that only an explicit update sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptStatus {
    /// Not running.
    #[default]
    Idle,
    /// A simulated run is in flight.
    Running,
    /// The last simulated run finished.
    Completed,
    /// Never set by the simulator.
    Failed,
    /// Never set by the simulator.
    Scheduled,
}

impl ScriptStatus {
    /// Wire tag, e.g. `"running"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptStatus::Idle => "idle",
            ScriptStatus::Running => "running",
            ScriptStatus::Completed => "completed",
            ScriptStatus::Failed => "failed",
            ScriptStatus::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for ScriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScriptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idle" => Ok(ScriptStatus::Idle),
            "running" => Ok(ScriptStatus::Running),
            "completed" => Ok(ScriptStatus::Completed),
            "failed" => Ok(ScriptStatus::Failed),
            "scheduled" => Ok(ScriptStatus::Scheduled),
            other => Err(format!("unknown status {other:?}")),
        }
    }
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Informational.
    Info,
    /// Something odd.
    Warning,
    /// Something broke.
    Error,
    /// A run finished well.
    Success,
}

impl LogKind {
    /// Wire tag, e.g. `"success"`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogKind::Info => "info",
            LogKind::Warning => "warning",
            LogKind::Error => "error",
            LogKind::Success => "success",
        }
    }
}

/// One timestamped message attached to a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Free text.
    pub message: String,
}

impl LogEntry {
    /// Entry stamped `now`.
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self { timestamp: Utc::now(), kind, message: message.into() }
    }
}

/// A stored automation script. `code` is never parsed or executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Opaque unique id.
    pub id: String,
    /// Display name; duplicates are allowed.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Script body.
    pub code: String,
    /// Category tag.
    #[serde(rename = "type")]
    pub kind: ScriptType,
    /// Lifecycle status.
    pub status: ScriptStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Start of the most recent run.
    pub last_run: Option<DateTime<Utc>>,
    /// Recurrence configuration, display only.
    pub schedule: Option<Schedule>,
    /// Always empty in stored records; live entries sit in the store's log map.
    #[serde(default)]
    pub logs: Vec<LogEntry>,
}

impl Script {
    /// Portable form used by export.
    pub fn export(&self) -> ScriptExport {
        ScriptExport {
            name: self.name.clone(),
            description: self.description.clone(),
            code: self.code.clone(),
            kind: self.kind,
        }
    }
}

/// Everything needed to create a script; id, creation time and logs are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScript {
    /// Display name.
    pub name: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Script body.
    #[serde(default)]
    pub code: String,
    /// Category tag.
    #[serde(rename = "type")]
    pub kind: ScriptType,
    /// Initial status, normally idle.
    #[serde(default)]
    pub status: ScriptStatus,
    /// Initial last-run time, normally none.
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    /// Recurrence configuration.
    #[serde(default)]
    pub schedule: Option<Schedule>,
}

impl NewScript {
    /// Idle, unscheduled, never-run script with empty body.
    pub fn new(name: impl Into<String>, kind: ScriptType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            code: String::new(),
            kind,
            status: ScriptStatus::Idle,
            last_run: None,
            schedule: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the body.
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Attach a schedule.
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }
}

/// Sparse field overrides applied by [`crate::registry::ScriptStore::update`].
///
/// `None` leaves a field alone. For the nullable fields the inner `None`
/// clears the value, so `{"schedule": null}` removes a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPatch {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// New category.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ScriptType>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ScriptStatus>,
    /// New last-run time, or `Some(None)` to clear it.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub last_run: Option<Option<DateTime<Utc>>>,
    /// New schedule, or `Some(None)` to clear it.
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Option<Schedule>>,
}

impl ScriptPatch {
    /// Patch that only sets the status.
    pub fn status(status: ScriptStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    /// True when the patch overrides nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the given fields of `script`, leaving the rest untouched.
    pub fn apply_to(self, script: &mut Script) {
        if let Some(v) = self.name {
            script.name = v;
        }
        if let Some(v) = self.description {
            script.description = v;
        }
        if let Some(v) = self.code {
            script.code = v;
        }
        if let Some(v) = self.kind {
            script.kind = v;
        }
        if let Some(v) = self.status {
            script.status = v;
        }
        if let Some(v) = self.last_run {
            script.last_run = v;
        }
        if let Some(v) = self.schedule {
            script.schedule = v;
        }
    }
}

// A present `null` must become `Some(None)`, not `None`.
fn nullable<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// Downloadable form of a script: no id, status, schedule or logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptExport {
    /// Display name.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Script body.
    pub code: String,
    /// Category tag.
    #[serde(rename = "type")]
    pub kind: ScriptType,
}

impl ScriptExport {
    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// File name for the download: lowercased name, whitespace runs as `-`, `.json` suffix.
    ///
    /// A blank name falls back to `script.json`.
    pub fn file_name(&self) -> String {
        let slug: Vec<String> = self.name.split_whitespace().map(str::to_lowercase).collect();
        if slug.is_empty() {
            return "script.json".to_string();
        }
        format!("{}.json", slug.join("-"))
    }

    /// Fresh idle, unscheduled script with the exported fields.
    pub fn into_new_script(self) -> NewScript {
        NewScript::new(self.name, self.kind).description(self.description).code(self.code)
    }
}
