use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

type Action<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// Collapses bursts of values into one action per quiet period
///
/// Owns at most one pending timer. `schedule` replaces the pending value and
/// restarts the timer; the action runs with the latest value once `delay`
/// passes without another call. Cancelling (or dropping) only stops a timer
/// that has not fired yet: an action that already started runs to completion.
pub struct Debouncer<T> {
    delay: Duration,
    action: Action<T>,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the quiet period for subsequent calls to `schedule`
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn schedule(&mut self, value: T) {
        let replaced = self.cancel();
        trace!(replaced, delay_ms = self.delay.as_millis() as u64, "Debounce timer armed");

        let action = Arc::clone(&self.action);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detach so a later cancel cannot interrupt the action mid-flight
            tokio::spawn(action(value));
        }));
    }

    /// Cancel the pending timer; returns whether one was still waiting
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::Mutex;

    fn recording_debouncer(delay_ms: u64) -> (Debouncer<u32>, Arc<Mutex<Vec<u32>>>) {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&fired);
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move |value| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(value);
            }
            .boxed()
        });
        (debouncer, fired)
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_fires_once_with_last_value() {
        let (mut debouncer, fired) = recording_debouncer(1000);

        for value in 1..=5 {
            debouncer.schedule(value);
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        settle().await;
        assert_eq!(*fired.lock().unwrap(), vec![5]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_quiet_periods_fire_separately() {
        let (mut debouncer, fired) = recording_debouncer(100);

        debouncer.schedule(1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        settle().await;
        debouncer.schedule(2);
        tokio::time::sleep(Duration::from_millis(150)).await;
        settle().await;

        assert_eq!(*fired.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_action() {
        let (mut debouncer, fired) = recording_debouncer(100);

        debouncer.schedule(7);
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(500)).await;
        settle().await;
        assert!(fired.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_timer() {
        let (mut debouncer, fired) = recording_debouncer(100);
        debouncer.schedule(9);
        drop(debouncer);

        tokio::time::sleep(Duration::from_millis(500)).await;
        settle().await;
        assert!(fired.lock().unwrap().is_empty());
    }
}
