//! Device access seam
//!
//! The wire protocol to the router lives outside this crate. Tables only need
//! two things from a connected device, for one resource path at a time:
//!
//! - [`DeviceClient::fetch_snapshot`] - the current rows, in device order
//! - [`DeviceClient::subscribe`] - an unbounded stream of created/updated rows
//!
//! A [`Connector`] dials and authenticates, handing back a client. The
//! in-memory [`mock::MockDevice`] implements both traits for tests and demos.

pub mod mock;

use crate::config::{API_PORT, API_TLS_PORT};
use crate::error::Result;
use crate::table::Record;
use crossbeam_channel::Receiver;

/// Where and how to connect to a router
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    /// Host name or address
    pub host: String,
    /// Use the TLS API port
    pub ssl: bool,
    /// Login name
    pub user: String,
    /// Login password
    pub password: String,
    /// Explicit port, overriding the API default
    pub port: Option<u16>,
}

impl ConnectionTarget {
    pub fn new(
        host: impl Into<String>,
        ssl: bool,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            ssl,
            user: user.into(),
            password: password.into(),
            port: None,
        }
    }

    /// Override the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Port to dial
    pub fn port(&self) -> u16 {
        self.port
            .unwrap_or(if self.ssl { API_TLS_PORT } else { API_PORT })
    }

    /// `host:port` to dial
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }
}

impl std::fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("host", &self.host)
            .field("ssl", &self.ssl)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("port", &self.port())
            .finish()
    }
}

/// One event of an update stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A created or updated row
    Record(Record),
    /// The transport failed; no further events follow
    Error(String),
}

/// An open update stream
///
/// A disconnected receiver means the transport went away.
#[derive(Debug)]
pub struct Subscription {
    pub updates: Receiver<StreamEvent>,
}

impl Subscription {
    pub fn new(updates: Receiver<StreamEvent>) -> Self {
        Self { updates }
    }
}

/// An authenticated session with one device
#[cfg_attr(test, mockall::automock)]
pub trait DeviceClient: Send {
    /// Current rows under `path`, in device order
    fn fetch_snapshot(&mut self, path: &str) -> Result<Vec<Record>>;

    /// Stream of created and updated rows under `path`
    fn subscribe(&mut self, path: &str) -> Result<Subscription>;

    /// Tear the session down; ends every open subscription
    fn close(&mut self);
}

/// Dials and authenticates device sessions
#[cfg_attr(test, mockall::automock)]
pub trait Connector: Send + Sync {
    /// Connect and log in; the session is ready for queries
    fn connect(&self, target: &ConnectionTarget) -> Result<Box<dyn DeviceClient>>;
}
