//! Subscribe/dispatch registry for notification callbacks.
//!
//! A subscription is identified by the [`SubscriptionId`] returned from
//! [`ObserverList::subscribe`], not by the callback itself, so a caller can
//! replace its handler without re-registering: unsubscribe the old id,
//! subscribe the new closure, and the rest of the list is untouched.

/// Handle returned by [`ObserverList::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

/// Ordered list of callbacks for events of type `E`
pub struct ObserverList<E> {
    next_id: u64,
    observers: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Default for ObserverList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ObserverList<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<E> ObserverList<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            observers: Vec::new(),
        }
    }

    /// Register a callback. Callbacks run in registration order.
    pub fn subscribe(&mut self, callback: Box<dyn FnMut(&E) + Send>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, callback));
        id
    }

    /// Remove a callback. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Deliver an event to every registered callback
    pub fn dispatch(&mut self, event: &E) {
        for (_, callback) in &mut self.observers {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Drop every callback
    pub fn clear(&mut self) {
        self.observers.clear();
    }
}
