//! Recording notification port.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::host::{HostError, NotificationPort};
use crate::protocol::Notification;

/// Port that records delivered notifications.
///
/// While disconnected every send fails, the way a message to a closed popup
/// does; attempts are still counted.
#[derive(Debug, Default)]
pub struct SimPort {
    delivered: Mutex<Vec<Notification>>,
    attempts: AtomicUsize,
    disconnected: AtomicBool,
}

impl SimPort {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }

    /// Drain delivered notifications.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.delivered.lock().unwrap())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.disconnected.store(false, Ordering::SeqCst);
    }
}

impl NotificationPort for SimPort {
    fn send(&self, notification: &Notification) -> Result<(), HostError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(HostError::Disconnected);
        }
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
