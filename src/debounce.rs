use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Single-slot debounce timer.
///
/// Each [`push`](Debouncer::push) replaces the held payload and restarts the
/// countdown. [`ready`](Debouncer::ready) hands the payload out once it has
/// sat untouched for the whole quiet period.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet_period: Duration,
    slot: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            slot: None,
            deadline: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Returns the payload that was waiting, if any.
    pub fn push(&mut self, payload: T) -> Option<T> {
        self.deadline = Some(Instant::now() + self.quiet_period);
        self.slot.replace(payload)
    }

    pub fn is_armed(&self) -> bool {
        self.slot.is_some()
    }

    /// Waits out the quiet period and takes the payload.
    ///
    /// Never resolves while the slot is empty. Cancel safe: dropping the
    /// future before it resolves leaves the slot untouched.
    pub async fn ready(&mut self) -> T {
        loop {
            match self.deadline {
                Some(deadline) if self.slot.is_some() => {
                    sleep_until(deadline).await;
                    // A push can only happen between polls, so the deadline
                    // we slept on is still current here.
                    self.deadline = None;
                    if let Some(payload) = self.slot.take() {
                        return payload;
                    }
                }
                _ => std::future::pending::<()>().await,
            }
        }
    }
}
