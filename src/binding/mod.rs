//! Observable data contracts
//!
//! This module defines the interfaces the UI layer binds to, independent of
//! where the data comes from:
//!
//! - [`DataBinding`] - listener registration shared by everything observable
//! - [`Observable`] - a single readable/writable value
//! - [`DataList`] - an observable indexed collection (tables, search views,
//!   merge views and the neighbor list all implement it)
//! - [`DataItem`] - one entry of a [`DataList`], exposing named string properties
//!
//! Registering a listener always triggers one catch-up notification so the
//! listener can initialize itself from the current state. After that it is
//! notified at least once per logical change, on whatever thread the
//! [`Dispatcher`] delivers on.
//!
//! # Example
//!
//! ```ignore
//! use routerview_rs::binding::{listener, logic, DataBinding, Observable};
//!
//! let gate = logic::not(logic::or(vec![table_a.exists("mac-address", mac), table_b.exists("mac-address", mac)]));
//! gate.add_listener(listener(move || refresh_button()));
//! let disabled = gate.get()?;
//! ```

pub mod listener;
pub mod logic;
pub mod value;

pub use listener::{listener, DataListener, Dispatcher, FnListener, Listener, ListenerSet};
pub use logic::{And, Not, Or};
pub use value::{BoolValue, StringValue, Value};

use crate::error::Result;
use std::sync::Arc;

/// Listener registration
pub trait DataBinding: Send + Sync {
    /// Register `listener`; it is notified once right away, then on every change
    fn add_listener(&self, listener: Listener);

    /// Unregister `listener`; unknown listeners are ignored
    fn remove_listener(&self, listener: &Listener);
}

/// A readable, possibly writable, observable value
pub trait Observable<T>: DataBinding {
    /// Current value; derived observables may fail to compute it
    fn get(&self) -> Result<T>;

    /// Replace the value; read-only observables fail with `NotSupported`
    fn set(&self, value: T) -> Result<()>;
}

/// Shared boolean observable
pub type SharedBool = Arc<dyn Observable<bool>>;

/// Shared string observable
pub type SharedString = Arc<dyn Observable<String>>;

/// One entry of a [`DataList`]
pub trait DataItem: Send + Sync {
    /// Stable key of the item within its list
    fn key(&self) -> String;

    /// Observable for a named property
    fn get(&self, property: &str) -> Result<SharedString>;

    /// Current value of a named property
    fn value(&self, property: &str) -> Result<String> {
        self.get(property)?.get()
    }
}

/// Shared data item
pub type SharedItem = Arc<dyn DataItem>;

/// Observable indexed collection
pub trait DataList: DataBinding {
    /// Number of items
    fn len(&self) -> usize;

    /// Whether the list holds no item
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`
    fn get_item(&self, index: usize) -> Result<SharedItem>;
}

/// Shared data list
pub type SharedList = Arc<dyn DataList>;
