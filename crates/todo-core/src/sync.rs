//! Background task keeping a session's list in step with the store

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::{SyncConfig, SyncMode};
use crate::identity::Identity;
use crate::session::TodoSession;

/// When the list is re-fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// On identity change and on every tick, skipping ticks where the
    /// store's revision has not moved
    Polling { interval: Duration },
    /// Only on identity change
    OnIdentityChange,
}

impl SyncStrategy {
    pub fn from_config(config: &SyncConfig) -> Self {
        match config.mode {
            SyncMode::Polling => SyncStrategy::Polling {
                interval: config.poll_interval(),
            },
            SyncMode::OnIdentityChange => SyncStrategy::OnIdentityChange,
        }
    }
}

/// Running sync loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct SyncTask {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SyncTask {
    /// Start syncing `session` against the identities published on `identity`.
    ///
    /// The identity current at spawn time is applied immediately.
    pub fn spawn(
        session: TodoSession,
        identity: watch::Receiver<Option<Identity>>,
        strategy: SyncStrategy,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run(session, identity, strategy, token.clone()));
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for it to exit
    pub async fn cancel(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("sync task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for SyncTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn apply_identity(session: &TodoSession, identity: Option<Identity>) {
    if let Err(e) = session.set_identity(identity).await {
        tracing::warn!("reload after identity change failed: {}", e);
    }
}

async fn run(
    session: TodoSession,
    mut identity: watch::Receiver<Option<Identity>>,
    strategy: SyncStrategy,
    token: CancellationToken,
) {
    let current = identity.borrow_and_update().clone();
    apply_identity(&session, current).await;

    let mut ticker = match strategy {
        SyncStrategy::Polling { interval } => {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes at once; the initial load already ran
            ticker.reset();
            Some(ticker)
        }
        SyncStrategy::OnIdentityChange => None,
    };
    let mut seen = None;

    tracing::debug!("sync loop started with {:?}", strategy);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            changed = identity.changed() => {
                if changed.is_err() {
                    tracing::debug!("identity source closed");
                    break;
                }
                let current = identity.borrow_and_update().clone();
                apply_identity(&session, current).await;
                seen = None;
                if let Some(ticker) = ticker.as_mut() {
                    ticker.reset();
                }
            }
            _ = tick(&mut ticker) => {
                if session.identity().is_none() {
                    continue;
                }
                match session.reload_if_changed(&mut seen).await {
                    Ok(true) => tracing::debug!("list refreshed at revision {:?}", seen),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("periodic reload failed: {}", e),
                }
            }
        }
    }
    tracing::debug!("sync loop stopped");
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
