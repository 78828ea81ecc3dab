mod deck;
mod driver;
mod module;
#[cfg(feature = "web-api")]
mod web;

use anyhow::Context;
use clap::Parser;
use deck_core::cfg::{self, AppId};
use deck_core::store::open_default;
use deck_core::{logx, RunSimulator, ScriptStore};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::deck::{Deck, SharedDeck};
use crate::module::{Module, ModuleCtx};

const APP: AppId = AppId {
    qualifier: "com",
    organization: "local",
    application: env!("CARGO_PKG_NAME"),
};

#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version,
    about = "Script deck daemon: owns the store and drives simulated runs"
)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Directory holding the script blobs
    #[arg(long)]
    data_dir: Option<String>,
    /// Listen address of the HTTP control plane
    #[arg(long)]
    http: Option<String>,
    /// Simulated run time (ms)
    #[arg(long)]
    run_ms: Option<u64>,
    /// Time spent in `completed` before going idle (ms)
    #[arg(long)]
    settle_ms: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = cfg::load_or_init(&APP).context("load config")?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = Some(dir);
    }
    if let Some(addr) = cli.http {
        cfg.http_addr = addr;
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

    let data_dir = cfg.resolve_data_dir(&APP)?;
    let store = ScriptStore::open(open_default(&data_dir)?)
        .with_context(|| format!("open store in {}", data_dir.display()))?;
    info!("{} boot data_dir={} scripts={}", APP.application, data_dir.display(), store.len());

    let deck = SharedDeck::new(Deck::new(store, RunSimulator::new(cfg.timing())));
    let (tx, rx) = watch::channel(false);
    let ctx = ModuleCtx { deck, shutdown: rx };

    let mut modules: Vec<Box<dyn Module>> = vec![Box::new(driver::Driver)];
    #[cfg(feature = "web-api")]
    modules.push(Box::new(web::WebServer::new(cfg.http_addr.parse().context("parse http_addr")?)));

    let handles: Vec<_> = modules
        .into_iter()
        .map(|m| {
            info!("starting module {}", m.name());
            (m.name(), m.spawn(ctx.clone()))
        })
        .collect();

    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
    info!("shutdown requested");
    let _ = tx.send(true);

    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(())) => info!("module {name} stopped"),
            Ok(Err(e)) => warn!("module {name} failed: {e:#}"),
            Err(e) => warn!("module {name} panicked: {e}"),
        }
    }
    Ok(())
}
