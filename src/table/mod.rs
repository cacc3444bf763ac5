//! Live data tables
//!
//! A [`DataTable`] mirrors one resource path of one connected router. It is
//! built from the device snapshot and then kept current by a reconciliation
//! worker thread applying the device's update stream.
//!
//! # Architecture
//!
//! - **Snapshot**: rows are created in device order; a row's identifier comes
//!   from the reserved [`ID_KEY`] property
//! - **Streaming**: only when at least one snapshot row carries an identifier;
//!   tables of unaddressable rows stay static
//! - **Reconciliation**: the worker is the only writer. New identifiers are
//!   appended, known ones are updated in place, records without an identifier
//!   are dropped
//! - **Readers**: any thread, through a `RwLock` on the row map and order
//!
//! Positions are append-only: the row at an index never changes once assigned.
//!
//! # Example
//!
//! ```ignore
//! use routerview_rs::binding::{listener, DataBinding, Dispatcher};
//! use routerview_rs::table::DataTable;
//!
//! let leases = DataTable::open(&connector, &target, "/ip/dhcp-server/lease", Dispatcher::default())?;
//! leases.add_listener(listener(move || ui.request_repaint()));
//!
//! let row = leases.get_at(0)?;
//! let mac = row.get("mac-address")?;
//! ```

pub mod exists;
pub mod record;
pub mod row;
pub mod search;

pub use exists::Exists;
pub use record::{Record, ID_KEY};
pub use row::Row;
pub use search::SearchView;

use crate::binding::{
    BoolValue, DataBinding, DataList, Dispatcher, Listener, ListenerSet, SharedBool, SharedItem,
};
use crate::device::{ConnectionTarget, Connector, DeviceClient, StreamEvent};
use crate::error::{Result, ResultExt, RouterViewError};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread::JoinHandle;

/// Map key prefix for snapshot rows without an identifier
const UNADDRESSED_PREFIX: char = '\u{0}';

#[derive(Default)]
struct TableState {
    rows: HashMap<String, Arc<Row>>,
    order: Vec<String>,
}

impl TableState {
    fn row_at(&self, index: usize) -> Option<&Arc<Row>> {
        self.order.get(index).and_then(|key| self.rows.get(key))
    }

    fn ordered(&self) -> Vec<Arc<Row>> {
        self.order
            .iter()
            .filter_map(|key| self.rows.get(key).cloned())
            .collect()
    }
}

struct TableInner {
    path: String,
    state: RwLock<TableState>,
    listeners: Arc<ListenerSet>,
    stale: Arc<BoolValue>,
    dispatcher: Dispatcher,
    streaming: bool,
    closed: AtomicBool,
    cancel: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TableInner {
    fn new_row(&self, record: &Record) -> Arc<Row> {
        Arc::new(Row::from_record(
            record,
            Arc::downgrade(&self.listeners),
            self.dispatcher.clone(),
        ))
    }

    /// Apply one streamed record
    fn apply(&self, record: &Record) {
        let id = record.id();
        if id.is_empty() {
            tracing::debug!(path = %self.path, "Dropping update without identifier");
            return;
        }

        let existing = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .get(id)
            .cloned();

        let changed = match existing {
            Some(row) => !self.closed.load(Ordering::SeqCst) && row.apply(record),
            None => {
                let row = self.new_row(record);
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if self.closed.load(Ordering::SeqCst) {
                    return;
                }
                state.order.push(id.to_string());
                state.rows.insert(id.to_string(), row);
                true
            }
        };

        if changed {
            self.listeners.notify();
        }
    }
}

/// Reactive table of rows for one resource path
///
/// Cloning is cheap and yields another handle to the same table. The
/// reconciliation worker stops on [`DataTable::close`] or once every handle is
/// dropped.
#[derive(Clone)]
pub struct DataTable {
    inner: Arc<TableInner>,
}

impl DataTable {
    /// Connect to a router and load `path`
    pub fn open(
        connector: &dyn Connector,
        target: &ConnectionTarget,
        path: &str,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let client = connector
            .connect(target)
            .with_context(|| format!("Failed to connect to {}", target.address()))?;
        Self::from_client(client, path, dispatcher)
    }

    /// Load `path` over an already authenticated client
    ///
    /// The table takes ownership of the client and closes it when streaming
    /// ends, or right away for static tables and on failure.
    pub fn from_client(
        mut client: Box<dyn DeviceClient>,
        path: &str,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let records = match client.fetch_snapshot(path) {
            Ok(records) => records,
            Err(e) => {
                client.close();
                return Err(e);
            }
        };

        let listeners = Arc::new(ListenerSet::new(dispatcher.clone()));
        let mut state = TableState::default();
        let mut streaming = false;
        for (position, record) in records.iter().enumerate() {
            let key = if record.id().is_empty() {
                format!("{}{}", UNADDRESSED_PREFIX, position)
            } else {
                streaming = true;
                record.id().to_string()
            };
            if let Some(row) = state.rows.get(&key) {
                row.apply(record);
                continue;
            }
            let row = Arc::new(Row::from_record(
                record,
                Arc::downgrade(&listeners),
                dispatcher.clone(),
            ));
            state.order.push(key.clone());
            state.rows.insert(key, row);
        }

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let inner = Arc::new(TableInner {
            path: path.to_string(),
            state: RwLock::new(state),
            listeners,
            stale: Arc::new(BoolValue::new(false, dispatcher.clone())),
            dispatcher,
            streaming,
            closed: AtomicBool::new(false),
            cancel: Mutex::new(Some(cancel_tx)),
            worker: Mutex::new(None),
        });

        tracing::info!(
            path,
            rows = records.len(),
            streaming,
            "Loaded table snapshot"
        );

        if !streaming {
            client.close();
            return Ok(Self { inner });
        }

        let thread_name = format!("table {}", path);
        let handle = Reconciler::start(
            client,
            path,
            Arc::downgrade(&inner),
            cancel_rx,
            |work| std::thread::Builder::new().name(thread_name).spawn(work),
        )?;
        *inner.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(Self { inner })
    }

    /// Resource path this table mirrors
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Whether the table receives live updates
    pub fn is_streaming(&self) -> bool {
        self.inner.streaming
    }

    /// Whether the table only holds its snapshot
    pub fn is_static(&self) -> bool {
        !self.inner.streaming
    }

    /// Row by identifier
    pub fn get(&self, id: &str) -> Result<Arc<Row>> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .get(id)
            .cloned()
            .ok_or_else(|| RouterViewError::NotFound(id.to_string()))
    }

    /// Row by position
    pub fn get_at(&self, index: usize) -> Result<Arc<Row>> {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        let len = state.rows.len();
        if index >= len {
            return Err(RouterViewError::OutOfBounds { index, len });
        }
        state
            .row_at(index)
            .cloned()
            .ok_or(RouterViewError::OutOfBounds { index, len })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every row, in position order
    pub fn rows(&self) -> Vec<Arc<Row>> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered()
    }

    /// Row identifiers in position order; unaddressed rows show as `""`
    pub fn keys(&self) -> Vec<String> {
        self.rows().iter().map(|r| r.id().to_string()).collect()
    }

    /// Live view of the rows whose `property` equals `value`
    pub fn search(&self, property: &str, value: &str) -> SearchView {
        SearchView::new(self.clone(), property, value)
    }

    /// Whether any row has `property` equal to `value`, evaluated on each read
    pub fn exists(&self, property: &str, value: &str) -> SharedBool {
        Arc::new(Exists::new(self.clone(), property, value))
    }

    /// Set once live updates stopped for any reason other than [`close`](Self::close)
    pub fn stale(&self) -> SharedBool {
        self.inner.stale.clone()
    }

    pub fn is_stale(&self) -> bool {
        self.inner.stale.current()
    }

    /// Stop reconciliation and drop every listener
    ///
    /// Idempotent. Notifications already queued may still be delivered.
    pub fn close(&self) {
        {
            let _state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        self.inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner.listeners.clear();

        let handle = self
            .inner
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.thread().id() != std::thread::current().id() && handle.join().is_err() {
                tracing::error!(path = %self.inner.path, "Reconciliation worker panicked");
            }
        }
        tracing::info!(path = %self.inner.path, "Closed table");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for DataTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataTable")
            .field("path", &self.inner.path)
            .field("rows", &self.len())
            .field("streaming", &self.inner.streaming)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DataBinding for DataTable {
    fn add_listener(&self, listener: Listener) {
        self.inner.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.inner.listeners.remove(listener);
    }
}

impl DataList for DataTable {
    fn len(&self) -> usize {
        DataTable::len(self)
    }

    fn get_item(&self, index: usize) -> Result<SharedItem> {
        let row: SharedItem = self.get_at(index)?;
        Ok(row)
    }
}

enum Exit {
    Cancelled,
    Dropped,
    Failed(String),
}

/// Single writer of a streaming table
struct Reconciler {
    client: Box<dyn DeviceClient>,
    path: String,
    table: Weak<TableInner>,
    cancel: Receiver<()>,
}

type Work = Box<dyn FnOnce() + Send>;

impl Reconciler {
    /// Run a reconciler on the thread created by `spawn`
    ///
    /// The client is handed over only once the thread exists; if spawning
    /// fails it is closed here.
    fn start<S>(
        mut client: Box<dyn DeviceClient>,
        path: &str,
        table: Weak<TableInner>,
        cancel: Receiver<()>,
        spawn: S,
    ) -> Result<JoinHandle<()>>
    where
        S: FnOnce(Work) -> std::io::Result<JoinHandle<()>>,
    {
        let (handoff_tx, handoff_rx) = bounded::<Box<dyn DeviceClient>>(1);
        let worker_path = path.to_string();
        let spawned = spawn(Box::new(move || {
            if let Ok(client) = handoff_rx.recv() {
                Reconciler {
                    client,
                    path: worker_path,
                    table,
                    cancel,
                }
                .run();
            }
        }));

        match spawned {
            Ok(handle) => {
                if let Err(unsent) = handoff_tx.send(client) {
                    unsent.into_inner().close();
                }
                Ok(handle)
            }
            Err(e) => {
                client.close();
                Err(RouterViewError::from(e)).context("Failed to spawn reconciliation worker")
            }
        }
    }

    fn run(mut self) {
        let exit = match self.client.subscribe(&self.path) {
            Ok(subscription) => {
                tracing::debug!(path = %self.path, "Subscribed to updates");
                self.pump(&subscription.updates)
            }
            Err(e) => Exit::Failed(e.to_string()),
        };

        self.client.close();

        match exit {
            Exit::Cancelled => tracing::debug!(path = %self.path, "Reconciliation cancelled"),
            Exit::Dropped => tracing::debug!(path = %self.path, "Table dropped, stopping updates"),
            Exit::Failed(reason) => {
                tracing::warn!(path = %self.path, %reason, "Update stream ended, table is stale");
                if let Some(table) = self.table.upgrade() {
                    table.stale.replace(true);
                }
            }
        }
    }

    fn pump(&self, updates: &Receiver<StreamEvent>) -> Exit {
        loop {
            select! {
                recv(updates) -> event => match event {
                    Ok(StreamEvent::Record(record)) => {
                        let Some(table) = self.table.upgrade() else {
                            return Exit::Dropped;
                        };
                        table.apply(&record);
                    }
                    Ok(StreamEvent::Error(message)) => return Exit::Failed(message),
                    Err(_) => return Exit::Failed("update stream closed".to_string()),
                },
                recv(self.cancel) -> _ => return Exit::Cancelled,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{listener, Observable};
    use crate::device::{MockConnector, MockDeviceClient, Subscription};
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    fn rec(id: &str, mac: &str) -> Record {
        Record::new().with(ID_KEY, id).with("mac", mac)
    }

    /// Client serving a fixed snapshot and handing out `updates` on subscribe
    fn client_with(
        snapshot: Vec<Record>,
        updates: Receiver<StreamEvent>,
    ) -> Box<dyn DeviceClient> {
        let mut client = MockDeviceClient::new();
        client
            .expect_fetch_snapshot()
            .returning(move |_| Ok(snapshot.clone()));
        let mut updates = Some(updates);
        client.expect_subscribe().returning(move |_| {
            updates
                .take()
                .map(Subscription::new)
                .ok_or_else(|| RouterViewError::Subscribe {
                    path: "/test".into(),
                    message: "already subscribed".into(),
                })
        });
        client.expect_close().return_const(());
        Box::new(client)
    }

    #[test]
    fn test_snapshot_rows_in_order() {
        let (_tx, rx) = unbounded();
        let table = DataTable::from_client(
            client_with(vec![rec("1", "aa:bb"), rec("2", "cc:dd")], rx),
            "/test",
            Dispatcher::inline(),
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.is_streaming());
        assert_eq!(table.get_at(0).unwrap().value("mac").unwrap(), "aa:bb");
        assert_eq!(table.get("2").unwrap().value("mac").unwrap(), "cc:dd");
        assert!(matches!(table.get("3"), Err(RouterViewError::NotFound(_))));
        assert!(matches!(
            table.get_at(2),
            Err(RouterViewError::OutOfBounds { index: 2, len: 2 })
        ));
        table.close();
    }

    #[test]
    fn test_unaddressed_snapshot_is_static() {
        let mut client = MockDeviceClient::new();
        client.expect_fetch_snapshot().returning(|_| {
            Ok(vec![
                Record::new().with("temperature", "41"),
                Record::new().with("voltage", "24.1"),
            ])
        });
        client.expect_subscribe().never();
        client.expect_close().times(1).return_const(());

        let table =
            DataTable::from_client(Box::new(client), "/system/health", Dispatcher::inline())
                .unwrap();
        assert!(table.is_static());
        assert_eq!(table.len(), 2);
        assert_eq!(table.keys(), vec!["", ""]);
        assert!(table.get("").is_err());
        assert_eq!(table.get_at(1).unwrap().value("voltage").unwrap(), "24.1");
    }

    #[test]
    fn test_spawn_failure_closes_client() {
        let mut client = MockDeviceClient::new();
        client.expect_subscribe().never();
        client.expect_close().times(1).return_const(());
        let (_cancel_tx, cancel_rx) = bounded(1);

        let result = Reconciler::start(
            Box::new(client),
            "/ip/arp",
            Weak::new(),
            cancel_rx,
            |_work| Err(std::io::Error::new(std::io::ErrorKind::Other, "no threads left")),
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("reconciliation worker"));
    }

    #[test]
    fn test_snapshot_failure_closes_client() {
        let mut client = MockDeviceClient::new();
        client.expect_fetch_snapshot().returning(|path| {
            Err(RouterViewError::Snapshot {
                path: path.to_string(),
                message: "no such command".into(),
            })
        });
        client.expect_close().times(1).return_const(());

        let result = DataTable::from_client(Box::new(client), "/bogus", Dispatcher::inline());
        assert!(matches!(result, Err(RouterViewError::Snapshot { .. })));
    }

    #[test]
    fn test_open_propagates_connect_error() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(|_| Err(RouterViewError::Auth("invalid user name or password".into())));
        let target = ConnectionTarget::new("gw", false, "admin", "wrong");

        let err = DataTable::open(&connector, &target, "/ip/arp", Dispatcher::inline())
            .err()
            .unwrap();
        assert!(err.to_string().contains("gw:8728"));
        assert!(matches!(
            err,
            RouterViewError::WithContext { ref source, .. } if matches!(**source, RouterViewError::Auth(_))
        ));
    }

    #[test]
    fn test_stream_upserts_and_drops_unaddressed() {
        let (tx, rx) = unbounded();
        let table = DataTable::from_client(
            client_with(vec![rec("1", "aa:bb"), rec("2", "cc:dd")], rx),
            "/test",
            Dispatcher::inline(),
        )
        .unwrap();

        tx.send(StreamEvent::Record(rec("1", "ee:ff"))).unwrap();
        tx.send(StreamEvent::Record(Record::new().with("mac", "00:00"))).unwrap();
        tx.send(StreamEvent::Record(rec("3", "11:22"))).unwrap();

        assert!(wait_until(|| table.len() == 3));
        assert!(wait_until(|| table.get_at(0).unwrap().value("mac").unwrap() == "ee:ff"));
        assert_eq!(table.keys(), vec!["1", "2", "3"]);
        table.close();
    }

    #[test]
    fn test_repeated_record_notifies_once() {
        let (tx, rx) = unbounded();
        let table = DataTable::from_client(
            client_with(vec![rec("1", "aa:bb")], rx),
            "/test",
            Dispatcher::inline(),
        )
        .unwrap();

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        table.add_listener(listener(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tx.send(StreamEvent::Record(rec("1", "ee:ff"))).unwrap();
        tx.send(StreamEvent::Record(rec("1", "ee:ff"))).unwrap();
        // a marker row tells us both updates were processed
        tx.send(StreamEvent::Record(rec("2", "marker"))).unwrap();

        // catch-up, first update, marker row
        assert!(wait_until(|| count.load(Ordering::SeqCst) >= 3));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("1").unwrap().value("mac").unwrap(), "ee:ff");
        table.close();
    }

    #[test]
    fn test_stream_error_marks_stale() {
        let (tx, rx) = unbounded();
        let table = DataTable::from_client(
            client_with(vec![rec("1", "aa:bb")], rx),
            "/test",
            Dispatcher::inline(),
        )
        .unwrap();
        assert!(!table.is_stale());

        tx.send(StreamEvent::Error("connection reset".into())).unwrap();
        assert!(wait_until(|| table.is_stale()));
        assert!(table.stale().get().unwrap());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_subscribe_failure_marks_stale() {
        let mut client = MockDeviceClient::new();
        client
            .expect_fetch_snapshot()
            .returning(|_| Ok(vec![rec("1", "aa:bb")]));
        client.expect_subscribe().returning(|path| {
            Err(RouterViewError::Subscribe {
                path: path.to_string(),
                message: "not listenable".into(),
            })
        });
        client.expect_close().return_const(());

        let table =
            DataTable::from_client(Box::new(client), "/test", Dispatcher::inline()).unwrap();
        assert!(wait_until(|| table.is_stale()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_close_stops_updates_and_is_idempotent() {
        let (tx, rx) = unbounded();
        let table = DataTable::from_client(
            client_with(vec![rec("1", "aa:bb")], rx),
            "/test",
            Dispatcher::inline(),
        )
        .unwrap();

        table.close();
        table.close();
        assert!(table.is_closed());

        let _ = tx.send(StreamEvent::Record(rec("2", "cc:dd")));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(table.len(), 1);
        assert!(!table.is_stale());
    }

    #[test]
    fn test_duplicate_snapshot_ids_merge() {
        let (_tx, rx) = unbounded();
        let table = DataTable::from_client(
            client_with(
                vec![rec("1", "aa:bb"), Record::new().with(ID_KEY, "1").with("mtu", "1500")],
                rx,
            ),
            "/test",
            Dispatcher::inline(),
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("1").unwrap().value("mtu").unwrap(), "1500");
        table.close();
    }
}
