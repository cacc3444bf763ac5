//! Mutable observable values

use super::listener::{Dispatcher, Listener, ListenerSet};
use super::{DataBinding, Observable};
use crate::error::Result;
use std::sync::{PoisonError, RwLock};

/// A single value with change notification
///
/// Setting an equal value is not a change and notifies nobody.
pub struct Value<T> {
    value: RwLock<T>,
    listeners: ListenerSet,
}

/// Observable string, the cell type of every row property
pub type StringValue = Value<String>;

/// Observable boolean
pub type BoolValue = Value<bool>;

impl<T> Value<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    /// Create a value delivering notifications through `dispatcher`
    pub fn new(initial: T, dispatcher: Dispatcher) -> Self {
        Self {
            value: RwLock::new(initial),
            listeners: ListenerSet::new(dispatcher),
        }
    }

    /// Create a value on the shared background dispatcher
    pub fn with_value(initial: T) -> Self {
        Self::new(initial, Dispatcher::default())
    }

    /// Current value
    pub fn current(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store `value`, notifying listeners if it differs from the current one
    ///
    /// Returns whether the value changed.
    pub fn replace(&self, value: T) -> bool {
        {
            let mut guard = self.value.write().unwrap_or_else(PoisonError::into_inner);
            if *guard == value {
                return false;
            }
            *guard = value;
        }
        self.listeners.notify();
        true
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<T> std::fmt::Debug for Value<T>
where
    T: Clone + PartialEq + Send + Sync + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("value", &self.current())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> DataBinding for Value<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    fn add_listener(&self, listener: Listener) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.listeners.remove(listener);
    }
}

impl<T> Observable<T> for Value<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    fn get(&self) -> Result<T> {
        Ok(self.current())
    }

    fn set(&self, value: T) -> Result<()> {
        self.replace(value);
        Ok(())
    }
}
