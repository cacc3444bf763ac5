//! Listener sets and notification dispatch
//!
//! Every observable owns a [`ListenerSet`]. Listeners are identity-keyed by the
//! address of their `Arc`, so registering the same handle twice is a no-op and
//! removal needs the same handle that was added.
//!
//! Delivery goes through a [`Dispatcher`]:
//!
//! - [`Dispatcher::Background`] hands each batch to a worker thread over a
//!   crossbeam channel (fire-and-forget, the setter never runs listener code)
//! - [`Dispatcher::Inline`] calls listeners on the notifying thread, which keeps
//!   tests and headless tools deterministic

use crate::config::NotifyMode;
use crossbeam_channel::{unbounded, Sender};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Callback invoked when observed data may have changed
pub trait DataListener: Send + Sync {
    /// Called once after registration and after every change
    fn data_changed(&self);
}

/// Shared listener handle; identity is the `Arc` address
pub type Listener = Arc<dyn DataListener>;

/// Adapter turning a closure into a [`DataListener`]
pub struct FnListener<F>(F);

impl<F> DataListener for FnListener<F>
where
    F: Fn() + Send + Sync,
{
    fn data_changed(&self) {
        (self.0)()
    }
}

/// Wrap a closure as a listener handle
pub fn listener<F>(f: F) -> Listener
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

fn identity(listener: &Listener) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

type Batch = Vec<Listener>;

static SHARED_WORKER: OnceLock<Sender<Batch>> = OnceLock::new();

/// Delivers notification batches to listeners
#[derive(Clone)]
pub enum Dispatcher {
    /// Call listeners on the notifying thread
    Inline,
    /// Queue batches to a worker thread
    Background(Sender<Batch>),
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatcher::Inline => f.write_str("Dispatcher::Inline"),
            Dispatcher::Background(_) => f.write_str("Dispatcher::Background"),
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::background()
    }
}

impl Dispatcher {
    /// Synchronous dispatcher
    pub fn inline() -> Self {
        Dispatcher::Inline
    }

    /// Dispatcher backed by the process-wide notification thread
    pub fn background() -> Self {
        let sender = SHARED_WORKER.get_or_init(|| spawn_worker("routerview-notify"));
        Dispatcher::Background(sender.clone())
    }

    /// Dispatcher backed by its own worker thread
    ///
    /// The thread exits once every clone of the dispatcher is dropped.
    pub fn dedicated(name: &str) -> Self {
        Dispatcher::Background(spawn_worker(name))
    }

    /// Build the dispatcher selected in the configuration
    pub fn from_mode(mode: NotifyMode) -> Self {
        match mode {
            NotifyMode::Background => Self::background(),
            NotifyMode::Inline => Self::inline(),
        }
    }

    /// Deliver `listeners` one `data_changed` call each
    pub fn dispatch(&self, listeners: Batch) {
        if listeners.is_empty() {
            return;
        }
        match self {
            Dispatcher::Inline => deliver(listeners),
            Dispatcher::Background(sender) => {
                if let Err(err) = sender.send(listeners) {
                    tracing::warn!("Notification worker gone, delivering inline");
                    deliver(err.into_inner());
                }
            }
        }
    }
}

fn deliver(listeners: Batch) {
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener.data_changed())).is_err() {
            tracing::error!("Listener panicked during notification");
        }
    }
}

fn spawn_worker(name: &str) -> Sender<Batch> {
    let (tx, rx) = unbounded::<Batch>();
    let spawned = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            for batch in rx.iter() {
                deliver(batch);
            }
            tracing::debug!("Notification worker stopped");
        });
    if let Err(e) = spawned {
        // The receiver is gone with the closure, so every send fails and falls back inline.
        tracing::error!("Failed to spawn notification worker: {}", e);
    }
    tx
}

/// Identity-keyed set of listeners owned by one observable
pub struct ListenerSet {
    listeners: RwLock<HashMap<usize, Listener>>,
    dispatcher: Dispatcher,
}

impl ListenerSet {
    /// Create an empty set delivering through `dispatcher`
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            dispatcher,
        }
    }

    /// The dispatcher used for this set
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Register a listener and queue its catch-up notification
    pub fn add(&self, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(identity(&listener), listener.clone());
        self.dispatcher.dispatch(vec![listener]);
    }

    /// Unregister a listener; unknown handles are ignored
    pub fn remove(&self, listener: &Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&identity(listener));
    }

    /// Notify a snapshot of the currently registered listeners
    pub fn notify(&self) {
        let snapshot: Batch = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        self.dispatcher.dispatch(snapshot);
    }

    /// Drop every registered listener
    pub fn clear(&self) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn counter() -> (Arc<AtomicUsize>, Listener) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            listener(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn test_add_fires_catch_up() {
        let set = ListenerSet::new(Dispatcher::inline());
        let (count, l) = counter();
        set.add(l);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_identity_keyed() {
        let set = ListenerSet::new(Dispatcher::inline());
        let (count, l) = counter();
        set.add(l.clone());
        set.add(l.clone());
        assert_eq!(set.len(), 1);

        set.notify();
        // two catch-ups plus one notification for a single registration
        assert_eq!(count.load(Ordering::SeqCst), 3);

        set.remove(&l);
        assert!(set.is_empty());
        set.notify();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_clear_drops_listeners() {
        let set = ListenerSet::new(Dispatcher::inline());
        let (count, l) = counter();
        set.add(l);
        set.clear();
        set.notify();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_background_dispatch_is_eventual() {
        let set = ListenerSet::new(Dispatcher::dedicated("test-notify"));
        let (count, l) = counter();
        set.add(l);
        set.notify();

        let deadline = Instant::now() + Duration::from_secs(2);
        while count.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_listener_does_not_stop_delivery() {
        let set = ListenerSet::new(Dispatcher::inline());
        set.add(listener(|| panic!("boom")));
        let (count, l) = counter();
        set.add(l);
        set.notify();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
