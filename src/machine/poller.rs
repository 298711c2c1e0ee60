//! Background git remote poller.
//!
//! Checks immediately, then once per interval, until a remote shows up. Finding a remote stops
//! the poller for good. Stopping the handle, dropping it, or disposing the machine cancels it.

use super::DeploymentMachine;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodic git remote check bound to one machine.
pub struct RemotePoller {
    machine: DeploymentMachine,
    interval: Duration,
}

impl RemotePoller {
    pub fn new(machine: DeploymentMachine, interval: Duration) -> Self {
        Self { machine, interval }
    }

    /// Spawn the polling task on the current tokio runtime.
    pub fn spawn(self) -> RemotePollHandle {
        let cancel = self.machine.inner.cancel.child_token();
        let task_cancel = cancel.clone();
        let Self { machine, interval } = self;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        debug!("Remote poll cancelled");
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                match machine.poll_git_remote_once().await {
                    Ok(true) => {
                        info!("Remote poll finished");
                        break;
                    }
                    Ok(false) => {}
                    Err(_) => break,
                }
            }
        });

        RemotePollHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Owner of a running [`RemotePoller`]. Dropping it stops the poll.
pub struct RemotePollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RemotePollHandle {
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the poller to end on its own (remote found) or through cancellation.
    pub async fn wait(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RemotePollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
