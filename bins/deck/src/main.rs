mod render;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use deck_core::catalog::{self, TEMPLATES};
use deck_core::cfg::{self, AppId, Config};
use deck_core::schedule::{parse_time, Frequency, Schedule, Weekday};
use deck_core::script::{NewScript, ScriptExport, ScriptPatch, ScriptStatus, ScriptType};
use deck_core::stats::{recently_run, Stats};
use deck_core::store::{open_default, DefaultKv};
use deck_core::{logx, RunSimulator, ScriptStore};
use tracing::{debug, warn};

const APP: AppId = AppId {
    qualifier: "com",
    organization: "local",
    application: env!("CARGO_PKG_NAME"),
};

#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Author, organize and simulate automation scripts"
)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Directory holding the script blobs
    #[arg(long, global = true)]
    data_dir: Option<String>,
    /// Simulated run time (ms)
    #[arg(long, global = true)]
    run_ms: Option<u64>,
    /// Time spent in `completed` before going idle (ms)
    #[arg(long, global = true)]
    settle_ms: Option<u64>,
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List scripts
    List {
        /// Only scripts with this status
        #[arg(long)]
        status: Option<ScriptStatus>,
    },
    /// Show one script with its code
    Show { id: String },
    /// Create a script
    Add {
        #[arg(long)]
        name: String,
        #[arg(long = "type", default_value = "custom")]
        kind: ScriptType,
        #[arg(long, default_value = "")]
        description: String,
        /// Read the body from a file
        #[arg(long, conflicts_with = "code")]
        code_file: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
    },
    /// Change fields of a script
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        kind: Option<ScriptType>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "code")]
        code_file: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        status: Option<ScriptStatus>,
    },
    /// Attach a schedule (stored only, never fired)
    Schedule {
        id: String,
        #[arg(long)]
        frequency: Frequency,
        /// Time of day, HH:MM
        #[arg(long, default_value = "12:00")]
        time: String,
        /// Date for once/monthly, YYYY-MM-DD (default: tomorrow)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Weekday for weekly; repeat for several
        #[arg(long = "day")]
        days: Vec<Weekday>,
        /// Expression for custom
        #[arg(long)]
        cron: Option<String>,
    },
    /// Remove a schedule
    Unschedule { id: String },
    /// Delete a script and its logs
    Delete { id: String },
    /// Simulate a run and wait until the script is idle again
    Run { id: String },
    /// Print a script's log
    Logs { id: String },
    /// Empty a script's log
    ClearLogs { id: String },
    /// Write the export document of a script
    Export {
        id: String,
        /// Directory to write into; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Add a script from an export document
    Import { file: PathBuf },
    /// List the template gallery
    Templates,
    /// Add a script from a template
    UseTemplate { template: String },
    /// Dashboard counters
    Stats,
    /// Delete every script and log, then restore the demo scripts
    Reset {
        /// Confirm; nothing is removed without it
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut cfg, cfg_err) = match cfg::load_or_init(&APP) {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };
    if let Some(dir) = cli.data_dir.clone() {
        cfg.data_dir = Some(dir);
    }
    if let Some(ms) = cli.run_ms {
        cfg.run_ms = ms;
    }
    if let Some(ms) = cli.settle_ms {
        cfg.settle_ms = ms;
    }

    let level = match cli.verbose {
        0 => cfg.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    logx::init(level);
    if let Some(e) = cfg_err {
        warn!("config unavailable, using defaults: {e:#}");
    }

    let data_dir = cfg.resolve_data_dir(&APP)?;
    debug!("data_dir={}", data_dir.display());
    let mut store = ScriptStore::open(open_default(&data_dir)?)
        .with_context(|| format!("open store in {}", data_dir.display()))?;
    let mut sim = RunSimulator::new(cfg.timing());

    let res = dispatch(cli.cmd, cli.json, &mut store, &mut sim).await;
    if let Some(e) = store.take_persist_error() {
        eprintln!("warning: changes were not saved: {e}");
    }
    res
}

async fn dispatch(
    cmd: Command,
    json: bool,
    store: &mut ScriptStore<DefaultKv>,
    sim: &mut RunSimulator,
) -> Result<()> {
    match cmd {
        Command::List { status } => {
            let scripts: Vec<_> = store
                .list()
                .iter()
                .filter(|s| status.map_or(true, |st| s.status == st))
                .cloned()
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&scripts)?);
            } else {
                print!("{}", render::script_table(&scripts));
            }
        }

        Command::Show { id } => {
            let script = store.get(&id).with_context(|| format!("script {id} not found"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(script)?);
            } else {
                print!("{}", render::script_detail(script, store.logs(&id)));
            }
        }

        Command::Add { name, kind, description, code_file, code } => {
            let code = read_code(code_file, code)?.unwrap_or_default();
            let script = store.add(NewScript::new(name, kind).description(description).code(code));
            println!("{}", script.id);
        }

        Command::Edit { id, name, kind, description, code_file, code, status } => {
            let patch = ScriptPatch {
                name,
                description,
                code: read_code(code_file, code)?,
                kind,
                status,
                ..ScriptPatch::default()
            };
            if patch.is_empty() {
                bail!("nothing to change");
            }
            require(store.update(&id, patch), &id)?;
        }

        Command::Schedule { id, frequency, time, date, days, cron } => {
            if frequency == Frequency::Weekly && days.is_empty() {
                bail!("weekly schedules need at least one --day");
            }
            if frequency == Frequency::Custom && cron.is_none() {
                bail!("custom schedules need --cron");
            }
            let time = parse_time(&time).with_context(|| format!("bad time {time:?}, want HH:MM"))?;
            let date = date.or_else(|| Utc::now().date_naive().succ_opt());
            let schedule = Schedule::new(frequency, Some(time), date, days, cron);
            let described = schedule.describe();
            let patch = ScriptPatch { schedule: Some(Some(schedule)), ..ScriptPatch::default() };
            require(store.update(&id, patch), &id)?;
            println!("{described}");
        }

        Command::Unschedule { id } => {
            let patch = ScriptPatch { schedule: Some(None), ..ScriptPatch::default() };
            require(store.update(&id, patch), &id)?;
        }

        Command::Delete { id } => {
            require(store.delete(&id), &id)?;
        }

        Command::Run { id } => run_to_idle(store, sim, &id).await?,

        Command::Logs { id } => {
            store.get(&id).with_context(|| format!("script {id} not found"))?;
            let logs = store.logs(&id);
            if json {
                println!("{}", serde_json::to_string_pretty(logs)?);
            } else if logs.is_empty() {
                println!("no log entries");
            } else {
                for e in logs {
                    println!("{}", render::log_line(e));
                }
            }
        }

        Command::ClearLogs { id } => {
            store.get(&id).with_context(|| format!("script {id} not found"))?;
            store.clear_logs(&id);
        }

        Command::Export { id, out } => {
            let doc = store.export(&id)?;
            let body = doc.to_json()?;
            match out {
                Some(dir) => {
                    let path = dir.join(doc.file_name());
                    fs::write(&path, body).with_context(|| format!("write {}", path.display()))?;
                    println!("{}", path.display());
                }
                None => println!("{body}"),
            }
        }

        Command::Import { file } => {
            let txt =
                fs::read_to_string(&file).with_context(|| format!("read {}", file.display()))?;
            let doc: ScriptExport =
                serde_json::from_str(&txt).with_context(|| format!("parse {}", file.display()))?;
            println!("{}", store.import(doc).id);
        }

        Command::Templates => {
            if json {
                println!("{}", serde_json::to_string_pretty(TEMPLATES)?);
            } else {
                for t in TEMPLATES {
                    println!("{}", render::template_row(t));
                }
            }
        }

        Command::UseTemplate { template } => {
            let t = catalog::template(&template)
                .with_context(|| format!("template {template} not found"))?;
            println!("{}", store.add(t.instantiate()).id);
        }

        Command::Stats => {
            let stats = Stats::collect(store.list(), Utc::now());
            let recent = recently_run(store.list());
            if json {
                let v = serde_json::json!({ "stats": stats, "recent": recent });
                println!("{}", serde_json::to_string_pretty(&v)?);
            } else {
                print!("{}", render::stats(&stats, &recent));
            }
        }

        Command::Reset { yes } => {
            if !yes {
                bail!("this deletes all scripts and logs; pass --yes to confirm");
            }
            store.reset();
            println!("restored {} demo scripts", store.len());
        }
    }
    Ok(())
}

/// Start a run and fire its steps in real time until nothing is pending.
async fn run_to_idle(
    store: &mut ScriptStore<DefaultKv>,
    sim: &mut RunSimulator,
    id: &str,
) -> Result<()> {
    if !sim.run(store, id, Instant::now()) {
        bail!("script {id} not found");
    }
    report(store, id);
    while let Some(deadline) = sim.next_deadline() {
        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
        let fired = sim.advance(store, Instant::now());
        debug!(fired, "advanced");
        report(store, id);
    }
    Ok(())
}

fn report(store: &ScriptStore<DefaultKv>, id: &str) {
    if let Some(s) = store.get(id) {
        let last = store.logs(id).last().map(|e| e.message.as_str()).unwrap_or("");
        println!("{:<9}  {}", s.status, last);
    }
}

fn read_code(file: Option<PathBuf>, inline: Option<String>) -> Result<Option<String>> {
    match (file, inline) {
        (Some(path), _) => Ok(Some(
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?,
        )),
        (None, inline) => Ok(inline),
    }
}

fn require(found: bool, id: &str) -> Result<()> {
    if !found {
        bail!("script {id} not found");
    }
    Ok(())
}
