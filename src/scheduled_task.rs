use std::future::Future;
use std::sync::Arc;

use rocket::tokio::{
    self,
    sync::Notify,
    task::JoinHandle,
    time::{Duration, MissedTickBehavior},
};

/// A task run periodically in the background.
/// The first run happens immediately. It can be triggered early or cancelled.
pub struct RecurringTask {
    task_handle: JoinHandle<()>,
    signal: Arc<Notify>,
}

impl RecurringTask {
    /// Run `task` now and then every `period`. A run is never started while
    /// the previous one is still going.
    pub fn spawn<F, Fut>(period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let signal = Arc::new(Notify::new());

        let task_signal = signal.clone();
        let task_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = task_signal.notified() => {}
                }
                task().await;
            }
        });

        Self {
            task_handle,
            signal,
        }
    }

    /// Run the task as soon as possible instead of waiting for the next period.
    pub fn trigger_now(&self) {
        self.signal.notify_one();
    }

    /// Stop the task. A run in progress is aborted at its next await point.
    pub async fn cancel(self) {
        self.task_handle.abort();
        // The only possible error is the cancellation itself.
        let _ = self.task_handle.await;
    }
}
