//! Per-frame callbacks.

use std::fmt;

use web_time::Instant;

use crate::subscription::{Registry, Subscription};

/// Host facility delivering one callback per rendered frame.
///
/// The callback receives the time elapsed since the previous frame, in seconds. It is never
/// invoked concurrently with itself.
pub trait FrameClock {
    /// Registers `callback` until the returned subscription is dropped.
    fn on_frame(&self, callback: Box<dyn FnMut(f64)>) -> Subscription;
}

/// Single-threaded [`FrameClock`] driven by the host render loop.
///
/// Cloning the scheduler gives another handle to the same set of callbacks.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    callbacks: Registry<f64>,
}

impl FrameScheduler {
    /// Creates a scheduler without callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one frame to every registered callback.
    ///
    /// Returns the number of callbacks invoked.
    pub fn tick(&self, delta_time: f64) -> usize {
        let started = Instant::now();
        let called = self.callbacks.emit(&delta_time);
        log::trace!(
            "Frame tick dt={delta_time:.4}s delivered to {called} callback(s) in {:?}",
            started.elapsed()
        );
        called
    }

    /// Number of currently registered callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.callbacks.len()
    }
}

impl FrameClock for FrameScheduler {
    fn on_frame(&self, mut callback: Box<dyn FnMut(f64)>) -> Subscription {
        self.callbacks.subscribe(move |delta_time: &f64| callback(*delta_time))
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn delivers_delta_to_subscribers() {
        let scheduler = FrameScheduler::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        let _subscription = scheduler.on_frame(Box::new(move |dt| sink.borrow_mut().push(dt)));

        scheduler.tick(0.016);
        scheduler.tick(0.0);

        assert_eq!(*received.borrow(), vec![0.016, 0.0]);
    }

    #[test]
    fn tick_without_subscribers() {
        let scheduler = FrameScheduler::new();
        assert_eq!(scheduler.tick(1.0), 0);
    }

    #[test]
    fn clones_share_callbacks() {
        let scheduler = FrameScheduler::new();
        let handle = scheduler.clone();
        let subscription = handle.on_frame(Box::new(|_| {}));

        assert_eq!(scheduler.subscriber_count(), 1);
        drop(subscription);
        assert_eq!(scheduler.subscriber_count(), 0);
    }
}
