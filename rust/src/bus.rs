//! Named-channel event bus with one listener per channel.
//!
//! Publishers only need a clone of the [`EventBus`]; they never see the listener.
//! Publishing on a channel nobody listens to is dropped on the floor: there is no
//! buffering and no delivery guarantee.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;

type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

struct Slot {
    token: u64,
    listener: Listener,
}

#[derive(Default)]
struct BusInner {
    next_token: AtomicU64,
    channels: RwLock<HashMap<String, Slot>>,
}

#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let channels: Vec<String> = match self.inner.channels.read() {
            Ok(g) => g.keys().cloned().collect(),
            Err(poison) => poison.into_inner().keys().cloned().collect(),
        };
        f.debug_struct("EventBus")
            .field("subscribed", &channels)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount the listener for `channel`. Returns `None` while another listener is
    /// mounted there; the existing one is left untouched.
    pub fn subscribe(
        &self,
        channel: &str,
        listener: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Option<Subscription> {
        let token = self.inner.next_token.fetch_add(1, Ordering::Relaxed);
        let mut channels = match self.inner.channels.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        if channels.contains_key(channel) {
            tracing::warn!(channel, "event bus: channel already has a listener");
            return None;
        }
        channels.insert(
            channel.to_string(),
            Slot {
                token,
                listener: Arc::new(listener),
            },
        );
        tracing::debug!(channel, token, "event bus: listener mounted");
        Some(Subscription {
            bus: Arc::downgrade(&self.inner),
            channel: channel.to_string(),
            token,
        })
    }

    /// Fire-and-forget. Returns whether a listener received the payload.
    pub fn publish(&self, channel: &str, payload: Value) -> bool {
        let listener = {
            let channels = match self.inner.channels.read() {
                Ok(g) => g,
                Err(poison) => poison.into_inner(),
            };
            channels.get(channel).map(|slot| slot.listener.clone())
        };
        // Call outside the lock so a listener may publish or unsubscribe.
        match listener {
            Some(listener) => {
                listener(&payload);
                true
            }
            None => {
                tracing::trace!(channel, "event bus: no listener, dropped");
                false
            }
        }
    }

    pub fn has_subscriber(&self, channel: &str) -> bool {
        match self.inner.channels.read() {
            Ok(g) => g.contains_key(channel),
            Err(poison) => poison.into_inner().contains_key(channel),
        }
    }
}

/// Keeps a listener mounted. Dropping it unmounts the listener.
pub struct Subscription {
    bus: Weak<BusInner>,
    channel: String,
    token: u64,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("token", &self.token)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.bus.upgrade() else {
            return;
        };
        let mut channels = match inner.channels.write() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        if channels
            .get(&self.channel)
            .is_some_and(|slot| slot.token == self.token)
        {
            channels.remove(&self.channel);
            tracing::debug!(channel = %self.channel, "event bus: listener unmounted");
        }
    }
}
