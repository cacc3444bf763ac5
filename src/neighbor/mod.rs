//! Routers discovered on the local network
//!
//! Routers announce themselves with periodic discovery broadcasts (see
//! [`mndp`]). A [`NeighborList`] turns that feed into an observable list keyed
//! by sender address: the first announcement of a sender appends a
//! [`Neighbor`], later ones refresh it in place. Announcements without any IP
//! address are useless for connecting and are ignored.
//!
//! # Example
//!
//! ```ignore
//! use routerview_rs::neighbor::NeighborList;
//!
//! let neighbors = NeighborList::listen(&config.discovery, Dispatcher::default())?;
//! neighbors.add_listener(listener(move || picker.refresh()));
//! for n in neighbors.neighbors() {
//!     println!("{}", n.display());
//! }
//! ```

pub mod listener;
pub mod mndp;

pub use listener::DiscoveryListener;
pub use mndp::{DiscoveryMessage, Field, Tag};

use crate::binding::{
    DataBinding, DataItem, DataList, Dispatcher, Listener, ListenerSet, Observable, SharedItem,
    SharedString,
};
use crate::config::DiscoveryConfig;
use crate::error::{Result, ResultExt, RouterViewError};
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread::JoinHandle;

struct Announcement {
    message: DiscoveryMessage,
    last_seen: DateTime<Utc>,
}

/// A router known from its discovery broadcasts
pub struct Neighbor {
    address: String,
    latest: Arc<RwLock<Announcement>>,
    list_listeners: Weak<ListenerSet>,
}

impl Neighbor {
    /// Sender address of the announcements, the neighbor's key
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Display value of `tag` from the latest announcement, empty when absent
    pub fn field(&self, tag: Tag) -> String {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .message
            .value(tag)
    }

    /// Announced IPv4 address, else IPv6 address
    pub fn ip(&self) -> String {
        let v4 = self.field(Tag::Ipv4Address);
        if v4.is_empty() {
            self.field(Tag::Ipv6Address)
        } else {
            v4
        }
    }

    /// One-line summary, `identity (mac, ip) platform - version`
    pub fn display(&self) -> String {
        format!(
            "{} ({}, {}) {} - {}",
            self.field(Tag::Identity),
            self.field(Tag::MacAddress),
            self.ip(),
            self.field(Tag::Platform),
            self.field(Tag::Version)
        )
    }

    /// When the latest announcement arrived
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_seen
    }

    /// Latest announcement
    pub fn message(&self) -> DiscoveryMessage {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .message
            .clone()
    }

    fn refresh(&self, message: DiscoveryMessage) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Announcement {
            message,
            last_seen: Utc::now(),
        };
    }
}

impl std::fmt::Debug for Neighbor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neighbor")
            .field("address", &self.address)
            .field("display", &self.display())
            .finish()
    }
}

impl DataBinding for Neighbor {
    fn add_listener(&self, listener: Listener) {
        if let Some(listeners) = self.list_listeners.upgrade() {
            listeners.add(listener);
        }
    }

    fn remove_listener(&self, listener: &Listener) {
        if let Some(listeners) = self.list_listeners.upgrade() {
            listeners.remove(listener);
        }
    }
}

impl Observable<String> for Neighbor {
    fn get(&self) -> Result<String> {
        Ok(self.display())
    }

    fn set(&self, _value: String) -> Result<()> {
        Err(RouterViewError::NotSupported(
            "neighbors are read-only".to_string(),
        ))
    }
}

impl DataItem for Neighbor {
    fn key(&self) -> String {
        self.address.clone()
    }

    fn get(&self, property: &str) -> Result<SharedString> {
        let tag = Tag::from_property(property)
            .ok_or_else(|| RouterViewError::KeyNotFound(property.to_string()))?;
        Ok(Arc::new(NeighborField {
            latest: self.latest.clone(),
            tag,
            list_listeners: self.list_listeners.clone(),
        }))
    }
}

/// Read-only view of one announced field
struct NeighborField {
    latest: Arc<RwLock<Announcement>>,
    tag: Tag,
    list_listeners: Weak<ListenerSet>,
}

impl DataBinding for NeighborField {
    fn add_listener(&self, listener: Listener) {
        if let Some(listeners) = self.list_listeners.upgrade() {
            listeners.add(listener);
        }
    }

    fn remove_listener(&self, listener: &Listener) {
        if let Some(listeners) = self.list_listeners.upgrade() {
            listeners.remove(listener);
        }
    }
}

impl Observable<String> for NeighborField {
    fn get(&self) -> Result<String> {
        Ok(self
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .message
            .value(self.tag))
    }

    fn set(&self, _value: String) -> Result<()> {
        Err(RouterViewError::NotSupported(format!(
            "field {} is read-only",
            self.tag.property().unwrap_or("?")
        )))
    }
}

#[derive(Default)]
struct NeighborState {
    by_address: HashMap<String, Arc<Neighbor>>,
    order: Vec<String>,
}

struct ListInner {
    state: RwLock<NeighborState>,
    listeners: Arc<ListenerSet>,
    closed: AtomicBool,
    cancel: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    discovery: Mutex<Option<DiscoveryListener>>,
}

impl ListInner {
    fn apply(&self, message: DiscoveryMessage) {
        if !message.has_address() {
            tracing::debug!(src = %message.src, "Ignoring announcement without address");
            return;
        }
        let address = message.src.to_string();

        let existing = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_address
            .get(&address)
            .cloned();

        match existing {
            Some(neighbor) => {
                if self.closed.load(Ordering::SeqCst) {
                    return;
                }
                neighbor.refresh(message);
            }
            None => {
                let neighbor = Arc::new(Neighbor {
                    address: address.clone(),
                    latest: Arc::new(RwLock::new(Announcement {
                        message,
                        last_seen: Utc::now(),
                    })),
                    list_listeners: Arc::downgrade(&self.listeners),
                });
                let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
                if self.closed.load(Ordering::SeqCst) {
                    return;
                }
                tracing::info!(%address, neighbor = %neighbor.display(), "Discovered neighbor");
                state.order.push(address.clone());
                state.by_address.insert(address, neighbor);
            }
        }

        self.listeners.notify();
    }
}

/// Observable list of discovered routers
///
/// Cloning yields another handle to the same list.
#[derive(Clone)]
pub struct NeighborList {
    inner: Arc<ListInner>,
}

impl NeighborList {
    /// Build a list fed by `feed`
    ///
    /// The worker stops when the feed disconnects, on [`close`](Self::close),
    /// or once every handle is dropped.
    pub fn new(feed: Receiver<DiscoveryMessage>, dispatcher: Dispatcher) -> Result<Self> {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let inner = Arc::new(ListInner {
            state: RwLock::new(NeighborState::default()),
            listeners: Arc::new(ListenerSet::new(dispatcher)),
            closed: AtomicBool::new(false),
            cancel: Mutex::new(Some(cancel_tx)),
            worker: Mutex::new(None),
            discovery: Mutex::new(None),
        });

        let list = Arc::downgrade(&inner);
        let handle = std::thread::Builder::new()
            .name("routerview-neighbors".to_string())
            .spawn(move || run(list, feed, cancel_rx))
            .map_err(RouterViewError::from)
            .context("Failed to spawn neighbor worker")?;
        *inner.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Ok(Self { inner })
    }

    /// Build a list fed by a UDP discovery listener
    ///
    /// With discovery disabled the list stays empty.
    pub fn listen(config: &DiscoveryConfig, dispatcher: Dispatcher) -> Result<Self> {
        let (tx, rx) = unbounded();
        if !config.enabled {
            tracing::info!("Neighbor discovery disabled");
            return Self::new(rx, dispatcher);
        }
        let discovery = DiscoveryListener::spawn(config, tx)?;
        let list = Self::new(rx, dispatcher)?;
        *list
            .inner
            .discovery
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(discovery);
        Ok(list)
    }

    /// Local address of the discovery socket, if this list owns one
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.inner
            .discovery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(DiscoveryListener::local_addr)
    }

    pub fn len(&self) -> usize {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_address
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Neighbor at `index`, in discovery order
    pub fn get(&self, index: usize) -> Result<Arc<Neighbor>> {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        let len = state.by_address.len();
        state
            .order
            .get(index)
            .and_then(|address| state.by_address.get(address))
            .cloned()
            .ok_or(RouterViewError::OutOfBounds { index, len })
    }

    /// Neighbor announcing from `address` (`ip:port`)
    pub fn get_by_address(&self, address: &str) -> Result<Arc<Neighbor>> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_address
            .get(address)
            .cloned()
            .ok_or_else(|| RouterViewError::NotFound(address.to_string()))
    }

    /// Every neighbor, in discovery order
    pub fn neighbors(&self) -> Vec<Arc<Neighbor>> {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .order
            .iter()
            .filter_map(|address| state.by_address.get(address).cloned())
            .collect()
    }

    /// Stop listening and drop every listener; idempotent
    pub fn close(&self) {
        {
            let _state = self.inner.state.write().unwrap_or_else(PoisonError::into_inner);
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return;
            }
        }
        let discovery = self
            .inner
            .discovery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut discovery) = discovery {
            discovery.stop();
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
                tracing::error!("Neighbor worker panicked");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for NeighborList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborList")
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DataBinding for NeighborList {
    fn add_listener(&self, listener: Listener) {
        self.inner.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.inner.listeners.remove(listener);
    }
}

impl DataList for NeighborList {
    fn len(&self) -> usize {
        NeighborList::len(self)
    }

    fn get_item(&self, index: usize) -> Result<SharedItem> {
        let neighbor: SharedItem = self.get(index)?;
        Ok(neighbor)
    }
}

fn run(list: Weak<ListInner>, feed: Receiver<DiscoveryMessage>, cancel: Receiver<()>) {
    loop {
        select! {
            recv(feed) -> message => match message {
                Ok(message) => {
                    let Some(inner) = list.upgrade() else {
                        break;
                    };
                    inner.apply(message);
                }
                Err(_) => {
                    tracing::debug!("Discovery feed closed");
                    break;
                }
            },
            recv(cancel) -> _ => break,
        }
    }
    tracing::debug!("Neighbor worker stopped");
}
