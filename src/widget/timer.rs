use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::bus::{Event, EventBus};

/// A restartable one-shot timer that reports expiry through the event bus.
///
/// Each arm gets a new generation number which travels with the expiry
/// event. Only the expiry matching the current generation is honoured, so a
/// timer that was reset or cancelled never fires late, even when its event
/// was already sitting in the queue.
#[derive(Debug, Default)]
pub struct SingleShotTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl SingleShotTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending expiry and arm again. `make` builds the event to
    /// publish from the new generation.
    pub fn reset<F>(&mut self, delay: Duration, bus: &EventBus, make: F) -> u64
    where
        F: FnOnce(u64) -> Event,
    {
        self.cancel();
        self.generation += 1;
        let event = make(self.generation);
        let bus = bus.clone();
        // Deadline is fixed at arm time, not when the task is first polled
        let deadline = Instant::now() + delay;
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            bus.publish(event);
        }));
        self.generation
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Consume an expiry. Returns false for stale generations.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.handle.is_some() && generation == self.generation {
            self.handle = None;
            true
        } else {
            false
        }
    }
}

impl Drop for SingleShotTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
