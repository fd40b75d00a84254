//! Online/offline signal fed by the platform layer.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// Publishes connectivity transitions to any number of subscribers.
///
/// Setting the current value again is not a transition and wakes nobody.
#[derive(Debug)]
pub struct ConnectivitySignal {
    sender: watch::Sender<Connectivity>,
}

impl ConnectivitySignal {
    pub fn new(initial: Connectivity) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn current(&self) -> Connectivity {
        *self.sender.borrow()
    }

    /// Record a new connectivity value; returns whether it changed
    pub fn set(&self, connectivity: Connectivity) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == connectivity {
                false
            } else {
                *current = connectivity;
                true
            }
        });
        if changed {
            tracing::info!("Connectivity changed: {:?}", connectivity);
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(Connectivity::Online)
    }
}
