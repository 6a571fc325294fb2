mod config;
mod store;
mod timers;

use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::bus::{EventBus, Subscription};
use crate::chat_list::build_chat_list;
use crate::identity::{normalize, resolve_scanned, IdentityError, PeerIdentity};
use crate::state::{AppState, ChatMessage, ToastVariant};
use crate::toast::{ToastCenter, ToastEvent, TOAST_CHANNEL};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

use store::{ChatStore, ContactStore, StoreDir};
use timers::RuntimeExpiry;

/// Single-threaded app actor. Every mutation of chat list or toast state happens in
/// `handle_message`, one message at a time.
pub struct AppCore {
    state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    shared_state: Arc<RwLock<AppState>>,

    chats: ChatStore,
    contacts: ContactStore,
    selected_peer: Option<PeerIdentity>,

    // Mounted toast provider: holds the broadcast listener for as long as the actor lives.
    _toast_subscription: Option<Subscription>,
    toasts: ToastCenter<RuntimeExpiry>,

    // Declared last so pending timers are cancelled before the runtime shuts down.
    _runtime: tokio::runtime::Runtime,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        bus: EventBus,
    ) -> Self {
        let config = config::load_app_config(&data_dir);

        let store_dir = if config.persist_stores() {
            if let Err(e) = std::fs::create_dir_all(&data_dir) {
                tracing::warn!(%e, data_dir = %data_dir, "failed to create data dir");
            }
            StoreDir::at(&data_dir)
        } else {
            StoreDir::memory()
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("chatlist-timers")
            .enable_time()
            .build()
            .expect("tokio runtime");

        let toasts = ToastCenter::new(
            RuntimeExpiry::new(runtime.handle().clone(), core_sender.clone()),
            config.toast_duration(),
        );
        let toast_subscription = mount_toast_provider(&bus, core_sender);

        let mut this = Self {
            state: AppState::empty(),
            rev: 0,
            update_sender,
            shared_state,
            chats: ChatStore::open(store_dir.clone()),
            contacts: ContactStore::open(store_dir),
            selected_peer: None,
            _toast_subscription: toast_subscription,
            toasts,
            _runtime: runtime,
        };

        this.rebuild_chat_list();
        // Ensure FfiApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        tracing::info!(chats = this.state.chat_list.len(), "app core ready");
        this
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn emit_toasts(&mut self) {
        self.state.toasts = self.toasts.visible().to_vec();
        self.emit_state();
    }

    fn rebuild_chat_list(&mut self) {
        self.state.chat_list = build_chat_list(
            self.chats.conversations(),
            self.chats.last_read(),
            self.contacts.aliases(),
            self.selected_peer.as_ref(),
        );
        self.state.selected_peer = self.selected_peer.as_ref().map(|p| p.as_hex().to_string());
    }

    fn refresh_chat_list(&mut self) {
        self.rebuild_chat_list();
        self.emit_state();
    }

    fn toast(&mut self, text: impl Into<String>, variant: ToastVariant) {
        self.toasts.show(text, variant);
        self.emit_toasts();
    }

    fn dismiss_toast(&mut self, id: &str) {
        if self.toasts.dismiss(id) {
            self.emit_toasts();
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                // Never log `?action` directly: it carries message bodies and aliases.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
            // The actor loop stops before handing us this one.
            CoreMsg::Shutdown => {}
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::ToastRequested(event) => {
                let variant = event.variant();
                tracing::info!(variant = variant.as_str(), "toast broadcast");
                self.toast(event.text, variant);
            }
            InternalEvent::ToastExpired { id } => self.dismiss_toast(&id),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            // Chat list
            AppAction::StartChat { peer_input } => match normalize(&peer_input) {
                Ok(peer) => self.select_peer(peer),
                Err(IdentityError::EmptyInput) => {}
                Err(e) => {
                    tracing::info!(error = %e, "start_chat: rejected peer input");
                    self.toast(e.user_message(), ToastVariant::Error);
                }
            },
            AppAction::SelectPeer { peer_pubkey } => {
                let Some(peer) = parse_known_peer(&peer_pubkey, "select_peer") else {
                    return;
                };
                self.select_peer(peer);
            }
            AppAction::SetAlias { peer_pubkey, alias } => {
                let Some(peer) = parse_known_peer(&peer_pubkey, "set_alias") else {
                    return;
                };
                self.contacts.set_alias(&peer, &alias);
                self.refresh_chat_list();
            }

            // Conversation store feed
            AppAction::AppendMessage {
                peer_pubkey,
                message,
            } => {
                let Some(peer) = parse_known_peer(&peer_pubkey, "append_message") else {
                    return;
                };
                self.append_message(peer, message);
            }
            AppAction::MarkRead { peer_pubkey, ts } => {
                let Some(peer) = parse_known_peer(&peer_pubkey, "mark_read") else {
                    return;
                };
                if self.chats.mark_read(&peer, ts) {
                    self.refresh_chat_list();
                }
            }

            // QR scanner
            AppAction::OpenScanner => {
                if !self.state.qr_scanner_open {
                    self.state.qr_scanner_open = true;
                    self.emit_state();
                }
            }
            AppAction::CloseScanner => {
                if self.state.qr_scanner_open {
                    self.state.qr_scanner_open = false;
                    self.emit_state();
                }
            }
            AppAction::ScanResult { text } => {
                if !self.state.qr_scanner_open {
                    tracing::debug!("scan_result: scanner is closed, ignoring");
                    return;
                }
                self.state.qr_scanner_open = false;
                match resolve_scanned(&text) {
                    Ok(peer) => self.select_peer(peer),
                    Err(e) => {
                        // Scans of unrelated QR codes are expected; no toast.
                        tracing::debug!(error = %e, "scan_result: not a peer npub");
                        self.emit_state();
                    }
                }
            }

            // Toasts
            AppAction::ShowToast { text, variant } => {
                self.toast(text, variant.unwrap_or_default());
            }
            AppAction::DismissToast { id } => self.dismiss_toast(&id),
        }
    }

    fn select_peer(&mut self, peer: PeerIdentity) {
        tracing::info!(peer = %peer, "select_peer");
        self.chats.ensure_conversation(&peer);
        self.chats.mark_all_read(&peer);
        self.selected_peer = Some(peer);
        self.refresh_chat_list();
    }

    fn append_message(&mut self, peer: PeerIdentity, message: ChatMessage) {
        let ts = message.ts;
        self.chats.append(&peer, message);
        // The open conversation is being read as messages arrive.
        if self.selected_peer.as_ref() == Some(&peer) {
            self.chats.mark_read(&peer, ts);
        }
        self.refresh_chat_list();
    }
}

fn parse_known_peer(raw: &str, op: &'static str) -> Option<PeerIdentity> {
    match normalize(raw) {
        Ok(peer) => Some(peer),
        Err(e) => {
            tracing::warn!(op, error = %e, "ignoring action with invalid peer pubkey");
            None
        }
    }
}

/// Forward `app:toast` broadcasts into the actor. Malformed payloads are dropped here so
/// they never reach the actor queue.
fn mount_toast_provider(bus: &EventBus, core_sender: Sender<CoreMsg>) -> Option<Subscription> {
    let subscription = bus.subscribe(TOAST_CHANNEL, move |payload| {
        match ToastEvent::from_payload(payload) {
            Some(event) => {
                let _ = core_sender.send(CoreMsg::Internal(Box::new(
                    InternalEvent::ToastRequested(event),
                )));
            }
            None => tracing::debug!("ignoring toast broadcast without text"),
        }
    });
    if subscription.is_none() {
        tracing::warn!("another toast provider is mounted; broadcasts will not reach this app");
    }
    subscription
}
