//! Existence checks over a table

use super::DataTable;
use crate::binding::{DataBinding, Listener, Observable};
use crate::error::{Result, RouterViewError};

/// Read-only boolean: does any row have `property` equal to `value`
///
/// Evaluated on every read; listeners are registered on the table.
#[derive(Clone, Debug)]
pub struct Exists {
    table: DataTable,
    property: String,
    value: String,
}

impl Exists {
    pub fn new(table: DataTable, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            table,
            property: property.into(),
            value: value.into(),
        }
    }
}

impl DataBinding for Exists {
    fn add_listener(&self, listener: Listener) {
        self.table.add_listener(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.table.remove_listener(listener);
    }
}

impl Observable<bool> for Exists {
    fn get(&self) -> Result<bool> {
        Ok(self
            .table
            .rows()
            .iter()
            .any(|row| row.matches(&self.property, &self.value)))
    }

    fn set(&self, _value: bool) -> Result<()> {
        Err(RouterViewError::NotSupported(format!(
            "existence of {}={} is read-only",
            self.property, self.value
        )))
    }
}
