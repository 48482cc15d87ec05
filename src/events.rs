//! Change notifications for bookings.
//!
//! The booking service publishes one event per successful mutation. Views
//! subscribe while they are mounted and drop their subscription when the
//! user leaves them; the journal stays subscribed for the whole run.

use crate::model::{Booking, BookingStatus};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingEvent {
    Created(Booking),
    StatusChanged {
        id: String,
        from: BookingStatus,
        to: BookingStatus,
    },
    Deleted {
        id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&BookingEvent)>;

#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&BookingEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    /// Deliver to every listener in subscription order.
    /// Listeners may subscribe or unsubscribe while being called.
    pub fn publish(&self, event: &BookingEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}
