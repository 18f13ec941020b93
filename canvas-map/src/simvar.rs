//! Simulation variable access for overlays.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::subscription::{Registry, Subscription};

/// Read and subscribe access to simulation variables, addressed by name and unit.
pub trait SimVarSource {
    /// Current value of the variable, if it is known.
    fn get(&self, name: &str, unit: &str) -> Option<f64>;

    /// Calls `callback` with every new value of the variable until the subscription is dropped.
    fn subscribe(&self, name: &str, unit: &str, callback: Box<dyn FnMut(f64)>) -> Subscription;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SimVarKey {
    name: String,
    unit: String,
}

impl SimVarKey {
    fn new(name: &str, unit: &str) -> Self {
        Self {
            name: name.to_owned(),
            unit: unit.to_owned(),
        }
    }
}

#[derive(Default)]
struct StoreInner {
    values: HashMap<SimVarKey, f64>,
    listeners: HashMap<SimVarKey, Registry<f64>>,
}

/// In-memory [`SimVarSource`] filled by the host. Clones share the same values.
#[derive(Clone, Default)]
pub struct SimVarStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl SimVarStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable and notifies its subscribers if the value changed.
    pub fn set(&self, name: &str, unit: &str, value: f64) {
        let key = SimVarKey::new(name, unit);
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            let previous = inner.values.insert(key.clone(), value);
            if previous == Some(value) {
                return;
            }
            inner.listeners.get(&key).cloned()
        };

        if let Some(listeners) = listeners {
            let notified = listeners.emit(&value);
            log::trace!("SimVar {name} ({unit}) = {value}, {notified} subscriber(s) notified");
        }
    }

    /// Number of variables with a value.
    pub fn len(&self) -> usize {
        self.inner.borrow().values.len()
    }

    /// Returns true if no variable has a value.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SimVarSource for SimVarStore {
    fn get(&self, name: &str, unit: &str) -> Option<f64> {
        self.inner
            .borrow()
            .values
            .get(&SimVarKey::new(name, unit))
            .copied()
    }

    fn subscribe(&self, name: &str, unit: &str, mut callback: Box<dyn FnMut(f64)>) -> Subscription {
        let registry = self
            .inner
            .borrow_mut()
            .listeners
            .entry(SimVarKey::new(name, unit))
            .or_default()
            .clone();
        registry.subscribe(move |value: &f64| callback(*value))
    }
}

impl fmt::Debug for SimVarStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimVarStore")
            .field("values", &self.inner.borrow().values.len())
            .finish()
    }
}
