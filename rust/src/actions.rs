use crate::state::{ChatMessage, ToastVariant};

#[derive(uniffi::Enum, Debug, Clone, PartialEq)]
pub enum AppAction {
    // Chat list
    StartChat {
        peer_input: String,
    },
    SelectPeer {
        peer_pubkey: String,
    },
    SetAlias {
        peer_pubkey: String,
        alias: String,
    },

    // Conversation store feed
    AppendMessage {
        peer_pubkey: String,
        message: ChatMessage,
    },
    MarkRead {
        peer_pubkey: String,
        ts: i64,
    },

    // QR scanner
    OpenScanner,
    CloseScanner,
    ScanResult {
        text: String,
    },

    // Toasts
    ShowToast {
        text: String,
        variant: Option<ToastVariant>,
    },
    DismissToast {
        id: String,
    },
}

impl AppAction {
    /// Log-safe action tag (never includes message text or aliases).
    pub fn tag(&self) -> &'static str {
        match self {
            // Chat list
            AppAction::StartChat { .. } => "StartChat",
            AppAction::SelectPeer { .. } => "SelectPeer",
            AppAction::SetAlias { .. } => "SetAlias",

            // Conversation store feed
            AppAction::AppendMessage { .. } => "AppendMessage",
            AppAction::MarkRead { .. } => "MarkRead",

            // QR scanner
            AppAction::OpenScanner => "OpenScanner",
            AppAction::CloseScanner => "CloseScanner",
            AppAction::ScanResult { .. } => "ScanResult",

            // Toasts
            AppAction::ShowToast { .. } => "ShowToast",
            AppAction::DismissToast { .. } => "DismissToast",
        }
    }
}
