//! Single-threaded event signals with handle-based subscriptions.
//!
//! Listeners live in a small arena owned by the signal. `subscribe` hands
//! back a [`Subscription`] that removes the listener when dropped, so a
//! listener is detached exactly once no matter which path tears its owner
//! down. Emission snapshots the arena first: listeners may subscribe,
//! unsubscribe or drop other subscriptions from inside a callback.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

type Callback<E> = Rc<dyn Fn(&E)>;

/// Identifier of a listener within one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Slot<E> {
    id: ListenerId,
    callback: Callback<E>,
}

struct Listeners<E> {
    slots: RefCell<SmallVec<[Slot<E>; 4]>>,
    next_id: Cell<u64>,
}

impl<E> Listeners<E> {
    fn contains(&self, id: ListenerId) -> bool {
        self.slots.borrow().iter().any(|slot| slot.id == id)
    }
}

trait Detach {
    fn detach(&self, id: ListenerId) -> bool;
}

impl<E> Detach for Listeners<E> {
    fn detach(&self, id: ListenerId) -> bool {
        let mut slots = self.slots.borrow_mut();
        match slots.iter().position(|slot| slot.id == id) {
            Some(index) => {
                slots.remove(index);
                true
            }
            None => false,
        }
    }
}

/// A typed event source.
pub struct Signal<E> {
    listeners: Rc<Listeners<E>>,
}

impl<E: 'static> Signal<E> {
    pub fn new() -> Self {
        Self {
            listeners: Rc::new(Listeners {
                slots: RefCell::new(SmallVec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Register a listener. It stays attached while the returned
    /// subscription is alive.
    #[must_use = "dropping the subscription detaches the listener"]
    pub fn subscribe(&self, callback: impl Fn(&E) + 'static) -> Subscription {
        let id = ListenerId(self.listeners.next_id.get());
        self.listeners.next_id.set(id.0 + 1);
        self.listeners.slots.borrow_mut().push(Slot {
            id,
            callback: Rc::new(callback),
        });

        let listeners: Rc<dyn Detach> = self.listeners.clone();
        Subscription {
            signal: Rc::downgrade(&listeners),
            id,
            active: true,
        }
    }

    /// Deliver `event` to every listener attached when emission starts and
    /// still attached when its turn comes.
    pub fn emit(&self, event: &E) {
        let snapshot: SmallVec<[(ListenerId, Callback<E>); 4]> = self
            .listeners
            .slots
            .borrow()
            .iter()
            .map(|slot| (slot.id, Rc::clone(&slot.callback)))
            .collect();

        for (id, callback) in snapshot {
            if self.listeners.contains(id) {
                callback(event);
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.slots.borrow().len()
    }
}

impl<E: 'static> Default for Signal<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an attached listener. Detaches on drop.
pub struct Subscription {
    signal: Weak<dyn Detach>,
    id: ListenerId,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the listener is still attached to a live signal.
    pub fn is_active(&self) -> bool {
        self.active && self.signal.strong_count() > 0
    }

    /// Detach now. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}

    fn detach(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(signal) = self.signal.upgrade() {
            signal.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
