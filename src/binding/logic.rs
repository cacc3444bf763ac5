//! Boolean combinators over observables
//!
//! [`Not`], [`And`] and [`Or`] hold no state of their own: reads are evaluated
//! against the members on demand, writes and listener registration are
//! forwarded to every member.

use super::listener::Listener;
use super::{DataBinding, Observable, SharedBool};
use crate::error::Result;
use std::sync::Arc;

/// Logical negation of another boolean observable
pub struct Not {
    inner: SharedBool,
}

impl Not {
    pub fn new(inner: SharedBool) -> Self {
        Self { inner }
    }
}

impl DataBinding for Not {
    fn add_listener(&self, listener: Listener) {
        self.inner.add_listener(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.inner.remove_listener(listener);
    }
}

impl Observable<bool> for Not {
    fn get(&self) -> Result<bool> {
        self.inner.get().map(|v| !v)
    }

    fn set(&self, value: bool) -> Result<()> {
        self.inner.set(!value)
    }
}

/// True when every member is true; `And` of nothing is true
pub struct And {
    members: Vec<SharedBool>,
}

impl And {
    pub fn new(members: Vec<SharedBool>) -> Self {
        Self { members }
    }
}

impl DataBinding for And {
    fn add_listener(&self, listener: Listener) {
        for member in &self.members {
            member.add_listener(listener.clone());
        }
    }

    fn remove_listener(&self, listener: &Listener) {
        for member in &self.members {
            member.remove_listener(listener);
        }
    }
}

impl Observable<bool> for And {
    fn get(&self) -> Result<bool> {
        for member in &self.members {
            if !member.get()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn set(&self, value: bool) -> Result<()> {
        self.members.iter().try_for_each(|m| m.set(value))
    }
}

/// True when any member is true; `Or` of nothing is false
pub struct Or {
    members: Vec<SharedBool>,
}

impl Or {
    pub fn new(members: Vec<SharedBool>) -> Self {
        Self { members }
    }
}

impl DataBinding for Or {
    fn add_listener(&self, listener: Listener) {
        for member in &self.members {
            member.add_listener(listener.clone());
        }
    }

    fn remove_listener(&self, listener: &Listener) {
        for member in &self.members {
            member.remove_listener(listener);
        }
    }
}

impl Observable<bool> for Or {
    fn get(&self) -> Result<bool> {
        for member in &self.members {
            if member.get()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn set(&self, value: bool) -> Result<()> {
        self.members.iter().try_for_each(|m| m.set(value))
    }
}

/// `Not` as a shared handle
pub fn not(inner: SharedBool) -> SharedBool {
    Arc::new(Not::new(inner))
}

/// `And` as a shared handle
pub fn and(members: Vec<SharedBool>) -> SharedBool {
    Arc::new(And::new(members))
}

/// `Or` as a shared handle
pub fn or(members: Vec<SharedBool>) -> SharedBool {
    Arc::new(Or::new(members))
}
