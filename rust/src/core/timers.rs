// Toast expiry timers on the actor's tokio runtime.

use std::collections::HashMap;
use std::time::Duration;

use flume::Sender;

use crate::toast::ExpiryScheduler;
use crate::updates::{CoreMsg, InternalEvent};

/// Each armed timer sleeps on the runtime, then posts `ToastExpired` back to the actor.
pub(super) struct RuntimeExpiry {
    handle: tokio::runtime::Handle,
    core_sender: Sender<CoreMsg>,
    pending: HashMap<String, tokio::task::JoinHandle<()>>,
}

impl RuntimeExpiry {
    pub(super) fn new(handle: tokio::runtime::Handle, core_sender: Sender<CoreMsg>) -> Self {
        Self {
            handle,
            core_sender,
            pending: HashMap::new(),
        }
    }
}

impl ExpiryScheduler for RuntimeExpiry {
    fn schedule(&mut self, id: &str, after: Duration) {
        let tx = self.core_sender.clone();
        let toast_id = id.to_string();
        let task = self.handle.spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::ToastExpired {
                id: toast_id,
            })));
        });
        if let Some(stale) = self.pending.insert(id.to_string(), task) {
            stale.abort();
        }
    }

    fn cancel(&mut self, id: &str) {
        if let Some(task) = self.pending.remove(id) {
            task.abort();
        }
    }
}
