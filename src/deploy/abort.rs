// ABOUTME: One-shot abort channel for in-flight deployments.
// ABOUTME: Ctrl+C hooks in through a scoped guard, not a global handler table.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Process-wide "stop the deployment" switch.
///
/// Closing is one-shot and idempotent: once aborted, a channel never
/// un-aborts. Every phase polls it at iteration boundaries and races its
/// sleeps against it.
#[derive(Clone)]
pub struct AbortChannel {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trip the switch. Safe to call more than once.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    /// Non-blocking poll.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve when the channel is aborted. Never resolves otherwise.
    pub async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for returns immediately when already aborted
        let _ = rx.wait_for(|aborted| *aborted).await;
    }

    /// Sleep for `duration`, returning early with `true` on abort.
    pub async fn sleep_abortable(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.aborted() => true,
        }
    }

    /// Install a Ctrl+C listener that aborts this channel.
    ///
    /// The hook owns signal handling for as long as the guard lives;
    /// dropping the guard detaches it. Callers embedding the orchestrator
    /// in a larger program should skip this and wire their own
    /// cancellation into [`AbortChannel::abort`].
    pub fn hook_ctrl_c(&self) -> CtrlCHook {
        let channel = self.clone();
        let task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                channel.abort();
            }
        });
        CtrlCHook { task }
    }
}

impl Default for AbortChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard for an installed Ctrl+C hook. Detaches the listener on drop.
pub struct CtrlCHook {
    task: JoinHandle<()>,
}

impl Drop for CtrlCHook {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn abort_is_observable_and_idempotent() {
        let abort = AbortChannel::new();
        assert!(!abort.is_aborted());

        abort.abort();
        abort.abort();
        assert!(abort.is_aborted());

        // resolves immediately once aborted
        abort.aborted().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_runs_to_completion_without_abort() {
        let abort = AbortChannel::new();
        assert!(!abort.sleep_abortable(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_returns_early_on_abort() {
        let abort = AbortChannel::new();
        let sleeper = abort.clone();

        let handle = tokio::spawn(async move {
            sleeper.sleep_abortable(Duration::from_secs(3600)).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        abort.abort();

        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn clones_share_the_switch() {
        let abort = AbortChannel::new();
        let other = abort.clone();
        other.abort();
        assert!(abort.is_aborted());
    }
}
