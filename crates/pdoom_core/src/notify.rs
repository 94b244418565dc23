//! Fire-and-forget notifications to the presentation layer.
//!
//! Notifications carry no control flow: a session behaves identically
//! with zero or many observers.

use std::fmt;
use std::sync::mpsc::Sender;

use crate::actions::ActionResult;
use crate::error::ErrorRecord;
use crate::turn::Phase;

/// Something that happened inside the kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// State changed; observers should refresh their snapshot.
    GameStateUpdated {
        /// Current turn.
        turn: u32,
    },
    /// The turn phase changed.
    TurnPhaseChanged {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
    },
    /// An event fired and is pending.
    EventTriggered {
        /// Event id.
        event_id: String,
        /// Turn it fired on.
        turn: u32,
    },
    /// A queued action ran (or was skipped).
    ActionExecuted(ActionResult),
    /// An entry point rejected a call or the session failed.
    ErrorOccurred(ErrorRecord),
}

/// Receives notifications.
pub trait GameObserver {
    /// Handle one notification. Must not call back into the session.
    fn notify(&mut self, notification: &Notification);
}

impl GameObserver for Sender<Notification> {
    fn notify(&mut self, notification: &Notification) {
        // a dropped receiver just means nobody is listening any more
        let _ = self.send(notification.clone());
    }
}

/// The subscriber list owned by a session.
#[derive(Default)]
pub struct Observers {
    observers: Vec<Box<dyn GameObserver + Send>>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}

impl Observers {
    /// Add a subscriber.
    pub fn subscribe(&mut self, observer: Box<dyn GameObserver + Send>) {
        self.observers.push(observer);
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver to every subscriber in subscription order.
    pub fn publish(&mut self, notification: &Notification) {
        for observer in &mut self.observers {
            observer.notify(notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_channel_observer_receives() {
        let (tx, rx) = mpsc::channel();
        let mut observers = Observers::default();
        observers.subscribe(Box::new(tx));
        observers.publish(&Notification::GameStateUpdated { turn: 4 });
        assert_eq!(rx.try_recv(), Ok(Notification::GameStateUpdated { turn: 4 }));
    }

    #[test]
    fn test_dropped_receiver_is_harmless() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut observers = Observers::default();
        observers.subscribe(Box::new(tx));
        observers.publish(&Notification::GameStateUpdated { turn: 0 });
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn test_zero_observers() {
        let mut observers = Observers::default();
        assert!(observers.is_empty());
        observers.publish(&Notification::GameStateUpdated { turn: 0 });
    }
}
