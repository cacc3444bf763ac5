//! Filtered views over a table

use super::row::Row;
use super::DataTable;
use crate::binding::{DataBinding, DataList, Listener, SharedItem};
use crate::error::{Result, RouterViewError};
use std::sync::Arc;

/// Live projection of the rows whose `property` equals `value`
///
/// Holds no state of its own. Every query rescans the table, so the view is
/// always current, and any table change is reported as a possible view change.
#[derive(Clone, Debug)]
pub struct SearchView {
    table: DataTable,
    property: String,
    value: String,
}

impl SearchView {
    pub fn new(table: DataTable, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            table,
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Matching rows, in table order
    pub fn rows(&self) -> Vec<Arc<Row>> {
        self.table
            .rows()
            .into_iter()
            .filter(|row| row.matches(&self.property, &self.value))
            .collect()
    }

    /// Number of matching rows
    pub fn len(&self) -> usize {
        self.table
            .rows()
            .iter()
            .filter(|row| row.matches(&self.property, &self.value))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th matching row
    pub fn get_at(&self, index: usize) -> Result<Arc<Row>> {
        self.table
            .rows()
            .into_iter()
            .filter(|row| row.matches(&self.property, &self.value))
            .nth(index)
            .ok_or_else(|| {
                RouterViewError::NotFound(format!(
                    "match {} for {}={}",
                    index, self.property, self.value
                ))
            })
    }
}

impl DataBinding for SearchView {
    fn add_listener(&self, listener: Listener) {
        self.table.add_listener(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.table.remove_listener(listener);
    }
}

impl DataList for SearchView {
    fn len(&self) -> usize {
        SearchView::len(self)
    }

    fn get_item(&self, index: usize) -> Result<SharedItem> {
        let row: SharedItem = self.get_at(index)?;
        Ok(row)
    }
}
