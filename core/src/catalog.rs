//! Built-in content: the demo records a fresh store starts with and the template gallery.

use chrono::Utc;
use serde::Serialize;

use crate::script::{NewScript, Script, ScriptStatus, ScriptType};

const FILE_ORGANIZER: &str = include_str!("../assets/file_organizer.py");
const DATA_CLEANER: &str = include_str!("../assets/data_cleaner.py");
const SYSTEM_BACKUP: &str = include_str!("../assets/system_backup.py");
const LOG_ANALYZER: &str = include_str!("../assets/log_analyzer.py");

/// Starting point for a new script.
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    /// Stable template id, e.g. `"template1"`.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Free text.
    pub description: &'static str,
    /// Category tag.
    #[serde(rename = "type")]
    pub kind: ScriptType,
    /// Search tags.
    pub tags: &'static [&'static str],
    /// Script body.
    pub code: &'static str,
}

impl Template {
    /// Idle, unscheduled script carrying the template's fields.
    pub fn instantiate(&self) -> NewScript {
        NewScript::new(self.name, self.kind)
            .description(self.description)
            .code(self.code)
    }
}

/// The template gallery.
pub const TEMPLATES: &[Template] = &[
    Template {
        id: "template1",
        name: "File Organizer",
        description: "Organizes files in a directory based on their file type",
        kind: ScriptType::FileOrganization,
        tags: &["files", "organization", "cleanup"],
        code: FILE_ORGANIZER,
    },
    Template {
        id: "template2",
        name: "Data Cleaner",
        description: "Cleans and formats CSV data files",
        kind: ScriptType::DataCleaning,
        tags: &["data", "csv", "cleaning"],
        code: DATA_CLEANER,
    },
    Template {
        id: "template3",
        name: "System Backup",
        description: "Creates compressed backups of important directories",
        kind: ScriptType::Backup,
        tags: &["backup", "system", "archive"],
        code: SYSTEM_BACKUP,
    },
    Template {
        id: "template4",
        name: "Log Analyzer",
        description: "Parses log files and generates summary reports",
        kind: ScriptType::DataCleaning,
        tags: &["logs", "analysis", "reports"],
        code: LOG_ANALYZER,
    },
];

/// Look a template up by id.
pub fn template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// The two records a fresh store is seeded with.
pub fn demo_scripts() -> Vec<Script> {
    let now = Utc::now();
    let demo = |id: &str, name: &str, description: &str, code: &str, kind| Script {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        code: code.to_string(),
        kind,
        status: ScriptStatus::Idle,
        created_at: now,
        last_run: None,
        schedule: None,
        logs: Vec::new(),
    };
    vec![
        demo(
            "1",
            "File Organizer",
            "Organizes files in a directory based on their type",
            FILE_ORGANIZER,
            ScriptType::FileOrganization,
        ),
        demo(
            "2",
            "Data Cleaner",
            "Cleans and formats CSV data files",
            DATA_CLEANER,
            ScriptType::DataCleaning,
        ),
    ]
}
