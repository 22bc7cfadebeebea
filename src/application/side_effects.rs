//! Fire-and-forget side effects (cache invalidation, user notifications).
//!
//! Services enqueue effects after their primary write has committed; a
//! background task executes them. A failed effect is logged and dropped, it
//! never reaches the caller.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::domain::notification::Notification;
use crate::domain::ports::{CacheProvider, Notifier, SideEffectError};

pub fn product_cache_key(id: uuid::Uuid) -> String {
    format!("product:{id}")
}

#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    InvalidateCache(String),
    Notify(Notification),
}

/// Sending half of the side-effect queue, shared by every service.
#[derive(Debug, Clone)]
pub struct SideEffects {
    tx: UnboundedSender<SideEffect>,
}

impl SideEffects {
    pub fn channel() -> (Self, UnboundedReceiver<SideEffect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn dispatch(&self, effect: SideEffect) {
        if let Err(e) = self.tx.send(effect) {
            log::warn!("side-effect worker is gone, dropping {:?}", e.0);
        }
    }

    pub fn invalidate(&self, key: impl Into<String>) {
        self.dispatch(SideEffect::InvalidateCache(key.into()));
    }

    pub fn notify(&self, notification: Notification) {
        self.dispatch(SideEffect::Notify(notification));
    }
}

fn execute(
    effect: &SideEffect,
    cache: &dyn CacheProvider,
    notifier: &dyn Notifier,
) -> Result<(), SideEffectError> {
    match effect {
        SideEffect::InvalidateCache(key) => cache.invalidate(key),
        SideEffect::Notify(notification) => notifier.notify(notification),
    }
}

/// Drains the queue until every [`SideEffects`] sender has been dropped.
pub async fn run(
    mut rx: UnboundedReceiver<SideEffect>,
    cache: Arc<dyn CacheProvider>,
    notifier: Arc<dyn Notifier>,
) {
    while let Some(effect) = rx.recv().await {
        if let Err(e) = execute(&effect, cache.as_ref(), notifier.as_ref()) {
            log::warn!("side effect {:?} failed: {}", effect, e);
        }
    }
    log::info!("side-effect worker stopped");
}
