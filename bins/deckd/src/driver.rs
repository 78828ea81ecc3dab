use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::deck::{now, Deck};
use crate::module::{Module, ModuleCtx};

/// Fires the simulator's deferred steps when they come due.
///
/// All steps run on this one task under the deck lock, so status and log
/// writes of concurrent runs interleave only between steps.
pub struct Driver;

impl Module for Driver {
    fn name(&self) -> &'static str {
        "driver"
    }

    fn spawn(self: Box<Self>, mut ctx: ModuleCtx) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            loop {
                let deadline = ctx.deck.lock().await.sim.next_deadline();
                tokio::select! {
                    _ = sleep_until(Instant::from_std(deadline.unwrap_or_else(now))), if deadline.is_some() => {
                        let mut deck = ctx.deck.lock().await;
                        let Deck { store, sim } = &mut *deck;
                        let fired = sim.advance(store, now());
                        deck.report_persist_error();
                        debug!(fired, pending = deck.sim.pending(), "advanced runs");
                    }
                    _ = ctx.deck.woken() => {}
                    changed = ctx.shutdown.changed() => {
                        if changed.is_err() || *ctx.shutdown.borrow() {
                            let pending = ctx.deck.lock().await.sim.pending();
                            info!(pending, "driver stopping");
                            break;
                        }
                    }
                }
            }
            Ok(())
        })
    }
}
