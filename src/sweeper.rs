//! Background reclamation of idle buffers.

use crate::pool::PoolInner;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Owns the sweep task of one pool. Dropping it cancels the task.
pub(crate) struct Sweeper {
    token: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    pub(crate) fn spawn(pool: Weak<PoolInner>, period: Duration, handle: &Handle) -> Self {
        let token = CancellationToken::new();
        let task = handle.spawn(run(pool, period, token.clone()));
        Self {
            token,
            task: Mutex::new(Some(task)),
        }
    }

    pub(crate) async fn stop(&self) {
        self.token.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Sweeper task failed: {}", e);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run(pool: Weak<PoolInner>, period: Duration, token: CancellationToken) {
    // A period past the clock's range never ticks.
    let now = Instant::now();
    let Some(start) = now.checked_add(period).filter(|start| start.checked_add(period).is_some())
    else {
        token.cancelled().await;
        debug!("buffer pool sweeper stopped");
        return;
    };
    let mut interval = time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = interval.tick() => {
                let Some(pool) = pool.upgrade() else { break };
                let result = AssertUnwindSafe(async { pool.sweep() }).catch_unwind().await;
                if let Err(err) = result {
                    let panic_msg = if let Some(msg) = err.downcast_ref::<&str>() {
                        msg.to_string()
                    } else if let Some(msg) = err.downcast_ref::<String>() {
                        msg.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    error!("Sweep panicked: {}", panic_msg);
                }
            }
        }
    }

    debug!("buffer pool sweeper stopped");
}
