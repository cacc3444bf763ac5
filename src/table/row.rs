//! Table rows

use super::record::Record;
use crate::binding::{
    DataBinding, DataItem, Dispatcher, Listener, ListenerSet, SharedString, StringValue,
};
use crate::error::{Result, RouterViewError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// One addressable row of a [`DataTable`](super::DataTable)
///
/// Each property is its own [`StringValue`], so a cell bound to one property is
/// only woken by changes to that property. Listener registration on the row as a
/// whole is delegated to the owning table, which the row does not keep alive.
pub struct Row {
    id: String,
    properties: RwLock<HashMap<String, Arc<StringValue>>>,
    table_listeners: Weak<ListenerSet>,
    dispatcher: Dispatcher,
}

impl Row {
    pub(crate) fn from_record(
        record: &Record,
        table_listeners: Weak<ListenerSet>,
        dispatcher: Dispatcher,
    ) -> Self {
        let properties = record
            .properties()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    Arc::new(StringValue::new(v.to_string(), dispatcher.clone())),
                )
            })
            .collect();
        Self {
            id: record.id().to_string(),
            properties: RwLock::new(properties),
            table_listeners,
            dispatcher,
        }
    }

    /// Row identifier; empty for rows the device does not address
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Observable for `property`
    pub fn get(&self, property: &str) -> Result<Arc<StringValue>> {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(property)
            .cloned()
            .ok_or_else(|| RouterViewError::KeyNotFound(property.to_string()))
    }

    /// Current value of `property`
    pub fn value(&self, property: &str) -> Result<String> {
        Ok(self.get(property)?.current())
    }

    /// Whether `property` currently equals `value`
    pub fn matches(&self, property: &str, value: &str) -> bool {
        self.get(property)
            .map(|v| v.current() == value)
            .unwrap_or(false)
    }

    /// Property names, sorted
    pub fn properties(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Current values of every property
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.properties
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.current()))
            .collect()
    }

    /// Merge an update into this row; returns whether anything changed
    ///
    /// Properties missing from the record are left alone.
    pub(crate) fn apply(&self, record: &Record) -> bool {
        let mut changed = false;
        for (key, value) in record.properties() {
            let existing = self
                .properties
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned();
            match existing {
                Some(cell) => changed |= cell.replace(value.to_string()),
                None => {
                    self.properties
                        .write()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(
                            key.to_string(),
                            Arc::new(StringValue::new(value.to_string(), self.dispatcher.clone())),
                        );
                    changed = true;
                }
            }
        }
        changed
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("id", &self.id)
            .field("properties", &self.snapshot())
            .finish()
    }
}

impl DataBinding for Row {
    fn add_listener(&self, listener: Listener) {
        if let Some(listeners) = self.table_listeners.upgrade() {
            listeners.add(listener);
        }
    }

    fn remove_listener(&self, listener: &Listener) {
        if let Some(listeners) = self.table_listeners.upgrade() {
            listeners.remove(listener);
        }
    }
}

impl DataItem for Row {
    fn key(&self) -> String {
        self.id.clone()
    }

    fn get(&self, property: &str) -> Result<SharedString> {
        let cell: SharedString = Row::get(self, property)?;
        Ok(cell)
    }

    fn value(&self, property: &str) -> Result<String> {
        Row::value(self, property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::listener;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(record: &Record) -> Row {
        Row::from_record(record, Weak::new(), Dispatcher::inline())
    }

    #[test]
    fn test_from_record() {
        let r = row(&Record::new().with(".id", "*1").with("mac", "aa:bb"));
        assert_eq!(r.id(), "*1");
        assert_eq!(r.value("mac").unwrap(), "aa:bb");
        assert!(matches!(r.get(".id"), Err(RouterViewError::KeyNotFound(_))));
        assert_eq!(r.properties(), vec!["mac".to_string()]);
    }

    #[test]
    fn test_apply_is_additive() {
        let r = row(&Record::new().with(".id", "*1").with("mac", "aa:bb").with("mtu", "1500"));
        assert!(r.apply(&Record::new().with(".id", "*1").with("mac", "ee:ff").with("comment", "x")));
        assert_eq!(r.value("mac").unwrap(), "ee:ff");
        assert_eq!(r.value("mtu").unwrap(), "1500");
        assert_eq!(r.value("comment").unwrap(), "x");
    }

    #[test]
    fn test_apply_same_values_is_no_change() {
        let rec = Record::new().with(".id", "*1").with("mac", "aa:bb");
        let r = row(&rec);
        assert!(!r.apply(&rec));
    }

    #[test]
    fn test_cell_listener_sees_update() {
        let r = row(&Record::new().with(".id", "*1").with("mac", "aa:bb"));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        r.get("mac").unwrap().add_listener(listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        r.apply(&Record::new().with(".id", "*1").with("mac", "cc:dd"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_row_listener_without_table_is_noop() {
        let r = row(&Record::new().with(".id", "*1"));
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        r.add_listener(listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
