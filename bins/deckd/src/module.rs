use tokio::task::JoinHandle;

use crate::deck::SharedDeck;

#[derive(Clone)]
pub struct ModuleCtx {
    pub deck: SharedDeck,
    pub shutdown: tokio::sync::watch::Receiver<bool>,
}

pub trait Module: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, ctx: ModuleCtx) -> JoinHandle<anyhow::Result<()>>;
}
