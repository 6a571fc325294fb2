// Toasts: the broadcast payload, the visible queue and its expiry timers.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bus::EventBus;
use crate::state::{Toast, ToastVariant};

/// Well-known channel for toast requests from code that has no handle to the app.
pub const TOAST_CHANNEL: &str = "app:toast";

pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(2200);

/// Broadcast payload: `{ "text": string, "variant"?: "info" | "success" | "error" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastEvent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl ToastEvent {
    /// Payloads without a string `text` are not toasts and yield `None`.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        let text = payload.get("text")?.as_str()?.to_string();
        let variant = payload
            .get("variant")
            .and_then(Value::as_str)
            .map(ToString::to_string);
        Some(Self { text, variant })
    }

    pub fn variant(&self) -> ToastVariant {
        self.variant
            .as_deref()
            .map(ToastVariant::from_name)
            .unwrap_or_default()
    }
}

/// Ask whoever is listening on [`TOAST_CHANNEL`] to show a toast.
/// Silently does nothing when no provider is mounted.
pub fn emit_toast(bus: &EventBus, text: impl Into<String>, variant: ToastVariant) {
    let event = ToastEvent {
        text: text.into(),
        variant: Some(variant.as_str().to_string()),
    };
    match serde_json::to_value(&event) {
        Ok(payload) => {
            bus.publish(TOAST_CHANNEL, payload);
        }
        Err(e) => tracing::debug!(%e, "toast event encode failed"),
    }
}

/// Timer backend for toast expiry. `schedule` arms one timer per id; when it fires the
/// owner must call [`ToastCenter::dismiss`] with that id.
pub trait ExpiryScheduler {
    fn schedule(&mut self, id: &str, after: Duration);
    fn cancel(&mut self, id: &str);
}

/// Visible toasts in emission order, each with exactly one armed expiry timer.
pub struct ToastCenter<S: ExpiryScheduler> {
    visible: Vec<Toast>,
    armed: HashSet<String>,
    duration: Duration,
    scheduler: S,
}

impl<S: ExpiryScheduler> ToastCenter<S> {
    pub fn new(scheduler: S, duration: Duration) -> Self {
        Self {
            visible: Vec::new(),
            armed: HashSet::new(),
            duration,
            scheduler,
        }
    }

    pub fn show(&mut self, text: impl Into<String>, variant: ToastVariant) -> Toast {
        let toast = Toast {
            id: uuid::Uuid::new_v4().simple().to_string(),
            text: text.into(),
            variant,
        };
        self.visible.push(toast.clone());
        self.scheduler.schedule(&toast.id, self.duration);
        self.armed.insert(toast.id.clone());
        tracing::debug!(id = %toast.id, variant = variant.as_str(), "toast shown");
        toast
    }

    /// Remove the toast and disarm its timer. Unknown ids are a no-op; returns whether
    /// anything was removed.
    pub fn dismiss(&mut self, id: &str) -> bool {
        if self.armed.remove(id) {
            self.scheduler.cancel(id);
        }
        let before = self.visible.len();
        self.visible.retain(|t| t.id != id);
        let removed = self.visible.len() != before;
        if removed {
            tracing::debug!(id, "toast dismissed");
        }
        removed
    }

    pub fn visible(&self) -> &[Toast] {
        &self.visible
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }
}

impl<S: ExpiryScheduler> Drop for ToastCenter<S> {
    fn drop(&mut self) {
        for id in self.armed.drain() {
            self.scheduler.cancel(&id);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Records timers instead of running them; tests fire them by hand.
    #[derive(Default, Clone)]
    pub(crate) struct ManualScheduler {
        pub(crate) armed: Arc<Mutex<HashMap<String, Duration>>>,
        pub(crate) cancelled: Arc<Mutex<Vec<String>>>,
    }

    impl ExpiryScheduler for ManualScheduler {
        fn schedule(&mut self, id: &str, after: Duration) {
            self.armed.lock().unwrap().insert(id.to_string(), after);
        }

        fn cancel(&mut self, id: &str) {
            self.armed.lock().unwrap().remove(id);
            self.cancelled.lock().unwrap().push(id.to_string());
        }
    }

    fn center() -> ToastCenter<ManualScheduler> {
        ToastCenter::new(ManualScheduler::default(), DEFAULT_TOAST_DURATION)
    }

    #[test]
    fn show_appends_and_arms_timer() {
        let mut c = center();
        let first = c.show("one", ToastVariant::Info);
        let second = c.show("two", ToastVariant::Error);

        let texts: Vec<&str> = c.visible().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
        assert_ne!(first.id, second.id);

        let armed = c.scheduler().armed.lock().unwrap();
        assert_eq!(armed.get(&first.id), Some(&Duration::from_millis(2200)));
        assert!(armed.contains_key(&second.id));
    }

    #[test]
    fn dismiss_removes_and_cancels() {
        let mut c = center();
        let t = c.show("x", ToastVariant::Info);
        assert!(c.dismiss(&t.id));
        assert!(c.visible().is_empty());
        assert!(c.scheduler().armed.lock().unwrap().is_empty());
        assert_eq!(*c.scheduler().cancelled.lock().unwrap(), vec![t.id.clone()]);
    }

    #[test]
    fn dismiss_twice_and_unknown_are_noops() {
        let mut c = center();
        let t = c.show("x", ToastVariant::Success);
        assert!(c.dismiss(&t.id));
        assert!(!c.dismiss(&t.id));
        assert!(!c.dismiss("never-issued"));
        // Only the first dismissal touched the timer.
        assert_eq!(c.scheduler().cancelled.lock().unwrap().len(), 1);
    }

    #[test]
    fn late_timer_after_manual_dismiss_does_not_resurrect() {
        let mut c = center();
        let keep = c.show("keep", ToastVariant::Info);
        let gone = c.show("gone", ToastVariant::Info);
        assert!(c.dismiss(&gone.id));
        // A timer that raced the dismissal fires anyway.
        assert!(!c.dismiss(&gone.id));
        assert_eq!(c.visible(), &[keep]);
    }

    #[test]
    fn expiry_leaves_others_in_order() {
        let mut c = center();
        let a = c.show("a", ToastVariant::Info);
        let b = c.show("b", ToastVariant::Info);
        let d = c.show("c", ToastVariant::Info);
        assert!(c.dismiss(&b.id));
        let ids: Vec<&str> = c.visible().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), d.id.as_str()]);
    }

    #[test]
    fn dropping_center_cancels_pending_timers() {
        let scheduler = ManualScheduler::default();
        let armed = scheduler.armed.clone();
        {
            let mut c = ToastCenter::new(scheduler, DEFAULT_TOAST_DURATION);
            c.show("a", ToastVariant::Info);
            c.show("b", ToastVariant::Info);
        }
        assert!(armed.lock().unwrap().is_empty());
    }

    #[test]
    fn payload_parsing() {
        let ev = ToastEvent::from_payload(&serde_json::json!({"text": "hi"})).unwrap();
        assert_eq!(ev.variant(), ToastVariant::Info);

        let ev =
            ToastEvent::from_payload(&serde_json::json!({"text": "ok", "variant": "success"}))
                .unwrap();
        assert_eq!(ev.variant(), ToastVariant::Success);

        let ev = ToastEvent::from_payload(&serde_json::json!({"text": "?", "variant": "loud"}))
            .unwrap();
        assert_eq!(ev.variant(), ToastVariant::Info);

        assert!(ToastEvent::from_payload(&serde_json::json!({"text": 5})).is_none());
        assert!(ToastEvent::from_payload(&serde_json::json!({"msg": "x"})).is_none());
        assert!(ToastEvent::from_payload(&serde_json::json!("x")).is_none());
    }

    #[test]
    fn emit_without_provider_is_silent() {
        let bus = EventBus::new();
        emit_toast(&bus, "nobody home", ToastVariant::Error);
    }

    #[test]
    fn emit_reaches_mounted_provider() {
        let bus = EventBus::new();
        let seen: Arc<Mutex<Vec<ToastEvent>>> = Arc::default();
        let sink = seen.clone();
        let _sub = bus
            .subscribe(TOAST_CHANNEL, move |payload| {
                if let Some(ev) = ToastEvent::from_payload(payload) {
                    sink.lock().unwrap().push(ev);
                }
            })
            .expect("mounted");

        emit_toast(&bus, "saved", ToastVariant::Success);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "saved");
        assert_eq!(seen[0].variant(), ToastVariant::Success);
    }
}
