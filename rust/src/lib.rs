mod actions;
mod bus;
mod chat_list;
mod core;
mod identity;
mod logging;
mod state;
mod toast;
mod updates;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};

pub use actions::AppAction;
pub use bus::{EventBus, Subscription};
pub use chat_list::{
    build_chat_list, display_name, preview, rank, unread_count, AttachmentKind,
    RankedConversation,
};
pub use identity::{normalize, resolve_scanned, IdentityError, PeerIdentity};
pub use state::*;
pub use toast::{
    emit_toast, ExpiryScheduler, ToastCenter, ToastEvent, DEFAULT_TOAST_DURATION, TOAST_CHANNEL,
};
pub use updates::*;

uniffi::setup_scaffolding!();

#[uniffi::export(callback_interface)]
pub trait AppReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: AppUpdate);
}

#[derive(uniffi::Object)]
pub struct FfiApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
    bus: EventBus,
}

#[uniffi::export]
impl FfiApp {
    #[uniffi::constructor]
    pub fn new(data_dir: String) -> Arc<Self> {
        Self::with_event_bus(data_dir, EventBus::new())
    }

    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn AppReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }

    /// Direct toast handle for code that lives next to the app.
    pub fn toasts(&self) -> Arc<ToastHandle> {
        Arc::new(ToastHandle {
            core_tx: Some(self.core_tx.clone()),
        })
    }
}

impl FfiApp {
    /// Start the app with a caller-owned bus so other modules can broadcast toasts
    /// through it without a reference to the app.
    pub fn with_event_bus(data_dir: String, bus: EventBus) -> Arc<Self> {
        logging::init_logging(&data_dir);
        tracing::info!(data_dir = %data_dir, "FfiApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));

        // Actor loop thread (single threaded "app actor").
        let core_tx_for_core = core_tx.clone();
        let shared_for_core = shared_state.clone();
        let bus_for_core = bus.clone();
        thread::spawn(move || {
            let mut core = crate::core::AppCore::new(
                update_tx,
                core_tx_for_core,
                data_dir,
                shared_for_core,
                bus_for_core,
            );
            while let Ok(msg) = core_rx.recv() {
                if matches!(msg, CoreMsg::Shutdown) {
                    break;
                }
                core.handle_message(msg);
            }
            tracing::info!("app actor stopped");
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            bus,
        })
    }

    pub fn event_bus(&self) -> EventBus {
        self.bus.clone()
    }
}

impl Drop for FfiApp {
    fn drop(&mut self) {
        // The actor holds its own sender (timers), so the channel never closes by itself.
        let _ = self.core_tx.send(CoreMsg::Shutdown);
    }
}

/// Show/dismiss toasts without going through the broadcast channel. A detached handle,
/// or one whose app has stopped, silently ignores every call.
#[derive(uniffi::Object)]
pub struct ToastHandle {
    core_tx: Option<Sender<CoreMsg>>,
}

#[uniffi::export]
impl ToastHandle {
    #[uniffi::constructor]
    pub fn detached() -> Arc<Self> {
        Arc::new(Self { core_tx: None })
    }

    pub fn show(&self, text: String, variant: Option<ToastVariant>) {
        self.send(AppAction::ShowToast { text, variant });
    }

    pub fn dismiss(&self, id: String) {
        self.send(AppAction::DismissToast { id });
    }
}

impl ToastHandle {
    fn send(&self, action: AppAction) {
        if let Some(tx) = &self.core_tx {
            let _ = tx.send(CoreMsg::Action(action));
        }
    }
}
