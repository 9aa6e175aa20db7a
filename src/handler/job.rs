use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Future;
use futures_timer::Delay;

/// A background job run periodically.
#[derive(Debug)]
pub(crate) struct PeriodicJob {
    interval: Duration,
    delay: Delay,
}

impl PeriodicJob {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            delay: Delay::new(interval),
        }
    }

    /// Returns `true` if the job is due, the next run is scheduled one
    /// interval from now.
    pub fn is_ready(&mut self, cx: &mut Context<'_>) -> bool {
        if let Poll::Ready(()) = Future::poll(Pin::new(&mut self.delay), cx) {
            self.delay.reset(self.interval);
            // register the waker with the rescheduled timer
            let _ = Future::poll(Pin::new(&mut self.delay), cx);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker_ref;

    #[async_std::test]
    async fn fires_after_interval() {
        let mut job = PeriodicJob::new(Duration::from_millis(10));
        let mut cx = Context::from_waker(noop_waker_ref());
        assert!(!job.is_ready(&mut cx));
        async_std::task::sleep(Duration::from_millis(30)).await;
        assert!(job.is_ready(&mut cx));
        assert!(!job.is_ready(&mut cx));
    }
}
