//! Callback registry with scoped subscriptions.
//!
//! Both the frame clock and the simulation variable store hand out [`Subscription`] guards.
//! A callback stays registered for as long as its guard lives and is removed exactly once
//! when the guard is dropped or cancelled.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Box<dyn FnMut(&T)>;

struct Entry<T> {
    id: u64,
    // `None` while the callback is being invoked.
    callback: Option<Callback<T>>,
}

struct Inner<T> {
    next_id: u64,
    entries: Vec<Entry<T>>,
}

trait Detach {
    fn detach(&self, id: u64) -> bool;
}

impl<T> Detach for RefCell<Inner<T>> {
    fn detach(&self, id: u64) -> bool {
        let mut inner = self.borrow_mut();
        let len_before = inner.entries.len();
        inner.entries.retain(|entry| entry.id != id);
        inner.entries.len() != len_before
    }
}

/// Single-threaded list of callbacks receiving values of type `T`.
pub(crate) struct Registry<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }
}

impl<T: 'static> Registry<T> {
    pub(crate) fn subscribe(&self, callback: impl FnMut(&T) + 'static) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push(Entry {
                id,
                callback: Some(Box::new(callback)),
            });
            id
        };

        let registry: Weak<dyn Detach> = Rc::downgrade(&self.inner) as Weak<dyn Detach>;
        Subscription {
            id,
            registry: Some(registry),
        }
    }

    /// Invokes every registered callback with `value` and returns how many were called.
    ///
    /// Callbacks may subscribe or unsubscribe while being invoked. Callbacks added during
    /// emission are first called on the next emission.
    pub(crate) fn emit(&self, value: &T) -> usize {
        let ids: Vec<u64> = self.inner.borrow().entries.iter().map(|e| e.id).collect();

        let mut called = 0;
        for id in ids {
            let taken = {
                let mut inner = self.inner.borrow_mut();
                inner
                    .entries
                    .iter_mut()
                    .find(|entry| entry.id == id)
                    .and_then(|entry| entry.callback.take())
            };

            let Some(mut callback) = taken else {
                continue;
            };

            callback(value);
            called += 1;

            let mut inner = self.inner.borrow_mut();
            if let Some(entry) = inner.entries.iter_mut().find(|entry| entry.id == id) {
                entry.callback = Some(callback);
            }
        }

        called
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// Guard of a registered callback. Dropping it unregisters the callback.
#[must_use = "the callback is unregistered as soon as the subscription is dropped"]
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// Unregisters the callback now.
    ///
    /// Returns `false` if the registry was already gone.
    pub fn cancel(mut self) -> bool {
        self.release()
    }

    /// Returns true if the registry the callback belongs to still exists.
    pub fn is_active(&self) -> bool {
        self.registry
            .as_ref()
            .is_some_and(|registry| registry.strong_count() > 0)
    }

    fn release(&mut self) -> bool {
        match self.registry.take().and_then(|weak| weak.upgrade()) {
            Some(registry) => registry.detach(self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn drop_unregisters() {
        let registry = Registry::<u32>::default();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let subscription = registry.subscribe(move |_| counter.set(counter.get() + 1));

        assert_eq!(registry.emit(&1), 1);
        drop(subscription);
        assert_eq!(registry.emit(&2), 0);
        assert_eq!(hits.get(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn cancel_after_registry_dropped() {
        let registry = Registry::<u32>::default();
        let subscription = registry.subscribe(|_| {});
        drop(registry);

        assert!(!subscription.is_active());
        assert!(!subscription.cancel());
    }

    #[test]
    fn callback_can_unsubscribe_itself() {
        let registry = Registry::<u32>::default();
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let inner_slot = slot.clone();
        let subscription = registry.subscribe(move |_| {
            inner_slot.borrow_mut().take();
        });
        *slot.borrow_mut() = Some(subscription);

        assert_eq!(registry.emit(&0), 1);
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.emit(&0), 0);
    }

    #[test]
    fn subscribing_during_emit_waits_for_next_round() {
        let registry = Registry::<u32>::default();
        let keep = Rc::new(RefCell::new(Vec::new()));
        let inner_registry = registry.clone();
        let inner_keep = keep.clone();
        let _outer = registry.subscribe(move |_| {
            let sub = inner_registry.subscribe(|_| {});
            inner_keep.borrow_mut().push(sub);
        });

        assert_eq!(registry.emit(&0), 1);
        assert_eq!(registry.emit(&0), 2);
    }
}
