//! In-memory device for testing without a router
//!
//! [`MockDevice`] serves snapshots from a per-path table and lets the test push
//! stream events to every open subscription of a path. Handles are cheap clones
//! of shared state, so a test keeps one handle while the table under test owns a
//! client produced by [`Connector::connect`].
//!
//! # Example
//!
//! ```ignore
//! use routerview_rs::device::mock::MockDevice;
//! use routerview_rs::table::Record;
//!
//! let device = MockDevice::new()
//!     .with_snapshot("/ip/arp", vec![Record::new().with(".id", "*1").with("address", "10.0.0.2")]);
//! let table = DataTable::open(&device, &target, "/ip/arp", Dispatcher::inline())?;
//!
//! device.push("/ip/arp", Record::new().with(".id", "*2").with("address", "10.0.0.3"));
//! ```

use super::{ConnectionTarget, Connector, DeviceClient, StreamEvent, Subscription};
use crate::error::{Result, RouterViewError};
use crate::table::Record;
use crossbeam_channel::{unbounded, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MockState {
    snapshots: HashMap<String, Vec<Record>>,
    credentials: Option<(String, String)>,
    refuse: Option<String>,
    /// (client id, path, sender) for every open subscription
    subscribers: Vec<(u64, String, Sender<StreamEvent>)>,
    next_client: u64,
    connects: usize,
    closes: usize,
}

/// Scriptable in-memory device
#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockState>>,
}

impl MockDevice {
    /// Create a device with no resources
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `records` as the snapshot of `path`
    pub fn with_snapshot(self, path: &str, records: Vec<Record>) -> Self {
        self.set_snapshot(path, records);
        self
    }

    /// Require these credentials on connect
    pub fn with_credentials(self, user: &str, password: &str) -> Self {
        self.state().credentials = Some((user.to_string(), password.to_string()));
        self
    }

    /// Fail every connect attempt with `message`
    pub fn refuse_connections(self, message: &str) -> Self {
        self.state().refuse = Some(message.to_string());
        self
    }

    /// Replace the snapshot of `path`
    pub fn set_snapshot(&self, path: &str, records: Vec<Record>) {
        self.state().snapshots.insert(path.to_string(), records);
    }

    /// Deliver a record to every open subscription of `path`
    ///
    /// Returns the number of subscriptions that received it.
    pub fn push(&self, path: &str, record: Record) -> usize {
        self.send(path, StreamEvent::Record(record))
    }

    /// Report a transport failure on every open subscription of `path`
    pub fn fail_stream(&self, path: &str, message: &str) -> usize {
        self.send(path, StreamEvent::Error(message.to_string()))
    }

    /// Drop every open subscription of `path` without an error event
    pub fn drop_streams(&self, path: &str) {
        self.state().subscribers.retain(|(_, p, _)| p != path);
    }

    fn send(&self, path: &str, event: StreamEvent) -> usize {
        let mut state = self.state();
        state
            .subscribers
            .retain(|(_, p, tx)| p != path || tx.send(event.clone()).is_ok());
        state.subscribers.iter().filter(|(_, p, _)| p == path).count()
    }

    /// Number of open subscriptions of `path`
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.state()
            .subscribers
            .iter()
            .filter(|(_, p, _)| p == path)
            .count()
    }

    /// Number of successful connects so far
    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    /// Number of closed clients so far
    pub fn close_count(&self) -> usize {
        self.state().closes
    }
}

impl Connector for MockDevice {
    fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn DeviceClient>> {
        let mut state = self.state();
        if let Some(message) = &state.refuse {
            return Err(RouterViewError::Connection(format!(
                "{}: {}",
                target.address(),
                message
            )));
        }
        if let Some((user, password)) = &state.credentials {
            if *user != target.user || *password != target.password {
                return Err(RouterViewError::Auth(format!(
                    "invalid user name or password for {}",
                    target.user
                )));
            }
        }
        state.next_client += 1;
        state.connects += 1;
        Ok(Box::new(MockClient {
            id: state.next_client,
            device: self.clone(),
            closed: false,
        }))
    }
}

struct MockClient {
    id: u64,
    device: MockDevice,
    closed: bool,
}

impl DeviceClient for MockClient {
    fn fetch_snapshot(&mut self, path: &str) -> Result<Vec<Record>> {
        if self.closed {
            return Err(RouterViewError::Connection("client closed".to_string()));
        }
        self.device
            .state()
            .snapshots
            .get(path)
            .cloned()
            .ok_or_else(|| RouterViewError::Snapshot {
                path: path.to_string(),
                message: "no such command".to_string(),
            })
    }

    fn subscribe(&mut self, path: &str) -> Result<Subscription> {
        if self.closed {
            return Err(RouterViewError::Subscribe {
                path: path.to_string(),
                message: "client closed".to_string(),
            });
        }
        let (tx, rx) = unbounded();
        self.device
            .state()
            .subscribers
            .push((self.id, path.to_string(), tx));
        Ok(Subscription::new(rx))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.device.state();
        state.subscribers.retain(|(id, _, _)| *id != self.id);
        state.closes += 1;
    }
}

impl Drop for MockClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ConnectionTarget {
        ConnectionTarget::new("mock", false, "admin", "secret")
    }

    #[test]
    fn test_snapshot_and_missing_path() {
        let device = MockDevice::new().with_snapshot(
            "/ip/arp",
            vec![Record::new().with(".id", "*1").with("address", "10.0.0.2")],
        );
        let mut client = device.connect(&target()).unwrap();
        assert_eq!(client.fetch_snapshot("/ip/arp").unwrap().len(), 1);
        assert!(matches!(
            client.fetch_snapshot("/nope"),
            Err(RouterViewError::Snapshot { .. })
        ));
    }

    #[test]
    fn test_credentials_checked() {
        let device = MockDevice::new().with_credentials("admin", "secret");
        assert!(device.connect(&target()).is_ok());

        let wrong = ConnectionTarget::new("mock", false, "admin", "guess");
        assert!(matches!(device.connect(&wrong), Err(RouterViewError::Auth(_))));
        assert_eq!(device.connect_count(), 1);
    }

    #[test]
    fn test_refused_connection() {
        let device = MockDevice::new().refuse_connections("connection refused");
        let err = device.connect(&target()).err().unwrap();
        assert!(matches!(err, RouterViewError::Connection(_)));
    }

    #[test]
    fn test_push_reaches_subscribers_until_close() {
        let device = MockDevice::new();
        let mut client = device.connect(&target()).unwrap();
        let sub = client.subscribe("/interface").unwrap();

        assert_eq!(device.push("/interface", Record::new().with(".id", "*1")), 1);
        assert_eq!(device.push("/ip/arp", Record::new()), 0);
        assert!(matches!(sub.updates.try_recv(), Ok(StreamEvent::Record(_))));

        client.close();
        assert_eq!(device.subscriber_count("/interface"), 0);
        assert_eq!(device.close_count(), 1);
        assert!(sub.updates.recv().is_err());
    }
}
