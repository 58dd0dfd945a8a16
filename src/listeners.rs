//! Callback registry with explicit unsubscribe handles.
//!
//! Registration is keyed on the identity of the `Arc` holding the callback,
//! so registering the same `Arc` twice keeps a single entry.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

struct Entries<F: ?Sized> {
    next_id: u64,
    items: Vec<(u64, Arc<F>)>,
}

pub struct Registry<F: ?Sized> {
    entries: Arc<Mutex<Entries<F>>>,
}

impl<F: ?Sized> Default for Registry<F> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                next_id: 0,
                items: Vec::new(),
            })),
        }
    }
}

fn same_callback<F: ?Sized>(a: &Arc<F>, b: &Arc<F>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

fn lock<F: ?Sized>(entries: &Mutex<Entries<F>>) -> MutexGuard<'_, Entries<F>> {
    // A panicking callback never runs under this lock, so the data is intact.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<F: ?Sized> Registry<F> {
    pub fn register(&self, callback: Arc<F>) -> Subscription<F> {
        let mut entries = lock(&self.entries);
        let existing = entries
            .items
            .iter()
            .find(|(_, cb)| same_callback(cb, &callback))
            .map(|(id, _)| *id);

        let id = match existing {
            Some(id) => id,
            None => {
                let id = entries.next_id;
                entries.next_id += 1;
                entries.items.push((id, callback));
                id
            }
        };

        Subscription {
            id,
            entries: Arc::downgrade(&self.entries),
        }
    }

    // Cloned out so callers invoke them without holding the lock.
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        lock(&self.entries)
            .items
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by a registration. Dropping it leaves the callback
/// registered; call [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription<F: ?Sized> {
    id: u64,
    entries: Weak<Mutex<Entries<F>>>,
}

impl<F: ?Sized> Subscription<F> {
    /// Remove the callback. Returns `false` if it was already gone or the
    /// owning registry has been dropped.
    pub fn unsubscribe(self) -> bool {
        let Some(entries) = self.entries.upgrade() else {
            return false;
        };
        let mut entries = lock(&entries);
        let before = entries.items.len();
        entries.items.retain(|(id, _)| *id != self.id);
        entries.items.len() != before
    }
}
