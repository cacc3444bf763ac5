//! Live concatenation of several data lists
//!
//! A [`MergeView`] presents its members as one indexed list, e.g. the lease
//! searches of every connected router. Each member's length is cached and kept
//! current by a watcher listener registered on that member, so `len` and
//! index resolution never call into the members' locks more than needed.
//! The merge's own listeners are notified by those watchers after the cached
//! length is stored, so a listener always reads the refreshed `len`.
//!
//! Members are fixed at construction. Closing the view only unregisters the
//! watchers; the members stay owned by the caller.

use crate::binding::{
    DataBinding, DataList, DataListener, Dispatcher, Listener, ListenerSet, SharedItem,
    SharedList,
};
use crate::error::{Result, RouterViewError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Refreshes one cached member length, then notifies the merge's listeners
struct LengthWatcher {
    member: Weak<dyn DataList>,
    slot: usize,
    lengths: Arc<Vec<AtomicUsize>>,
    listeners: Weak<ListenerSet>,
}

impl DataListener for LengthWatcher {
    fn data_changed(&self) {
        if let Some(member) = self.member.upgrade() {
            self.lengths[self.slot].store(member.len(), Ordering::SeqCst);
        }
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.notify();
        }
    }
}

/// Observable concatenation of [`DataList`]s
pub struct MergeView {
    members: Vec<SharedList>,
    lengths: Arc<Vec<AtomicUsize>>,
    watchers: Mutex<Vec<Listener>>,
    listeners: Arc<ListenerSet>,
}

impl MergeView {
    /// Merge `members` in order, notifying on the shared background dispatcher
    pub fn new(members: Vec<SharedList>) -> Self {
        Self::with_dispatcher(members, Dispatcher::default())
    }

    /// Merge `members` in order
    ///
    /// Every member length is read on its own scoped thread before the view is
    /// returned. `dispatcher` delivers the merge's own notifications.
    pub fn with_dispatcher(members: Vec<SharedList>, dispatcher: Dispatcher) -> Self {
        let initial: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = members
                .iter()
                .map(|member| scope.spawn(move || member.len()))
                .collect();
            handles
                .into_iter()
                .zip(&members)
                .map(|(handle, member)| handle.join().unwrap_or_else(|_| member.len()))
                .collect()
        });
        let lengths: Arc<Vec<AtomicUsize>> =
            Arc::new(initial.into_iter().map(AtomicUsize::new).collect());
        let listeners = Arc::new(ListenerSet::new(dispatcher));

        let watchers: Vec<Listener> = members
            .iter()
            .enumerate()
            .map(|(slot, member)| {
                let watcher: Listener = Arc::new(LengthWatcher {
                    member: Arc::downgrade(member),
                    slot,
                    lengths: lengths.clone(),
                    listeners: Arc::downgrade(&listeners),
                });
                member.add_listener(watcher.clone());
                watcher
            })
            .collect();

        tracing::debug!(members = members.len(), "Created merge view");

        Self {
            members,
            lengths,
            watchers: Mutex::new(watchers),
            listeners,
        }
    }

    /// Number of members
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Cached length of every member, in order
    pub fn member_lengths(&self) -> Vec<usize> {
        self.lengths
            .iter()
            .map(|len| len.load(Ordering::SeqCst))
            .collect()
    }

    /// Sum of the cached member lengths
    pub fn len(&self) -> usize {
        self.lengths
            .iter()
            .map(|len| len.load(Ordering::SeqCst))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item at `index`, owned by the first member whose range contains it
    pub fn get_item(&self, index: usize) -> Result<SharedItem> {
        let mut offset = 0;
        for (member, len) in self.members.iter().zip(self.lengths.iter()) {
            let len = len.load(Ordering::SeqCst);
            if index < offset + len {
                return member.get_item(index - offset);
            }
            offset += len;
        }
        Err(RouterViewError::NotFound(format!(
            "merged item {} of {}",
            index, offset
        )))
    }

    /// Unregister the length watchers; idempotent
    pub fn close(&self) {
        let watchers = std::mem::take(
            &mut *self.watchers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if watchers.is_empty() {
            return;
        }
        for (member, watcher) in self.members.iter().zip(&watchers) {
            member.remove_listener(watcher);
        }
        tracing::debug!(members = self.members.len(), "Closed merge view");
    }

    pub fn is_closed(&self) -> bool {
        self.watchers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Drop for MergeView {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for MergeView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeView")
            .field("lengths", &self.member_lengths())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DataBinding for MergeView {
    fn add_listener(&self, listener: Listener) {
        self.listeners.add(listener);
    }

    fn remove_listener(&self, listener: &Listener) {
        self.listeners.remove(listener);
    }
}

impl DataList for MergeView {
    fn len(&self) -> usize {
        MergeView::len(self)
    }

    fn get_item(&self, index: usize) -> Result<SharedItem> {
        MergeView::get_item(self, index)
    }
}
