use serde::{Deserialize, Serialize};

#[derive(uniffi::Record, Clone, Debug, Default, PartialEq)]
pub struct AppState {
    pub rev: u64,
    pub chat_list: Vec<ChatListEntry>,
    pub selected_peer: Option<String>,
    pub qr_scanner_open: bool,
    /// Visible toasts, oldest first.
    pub toasts: Vec<Toast>,
}

impl AppState {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One row of the chat list, already ranked.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatListEntry {
    pub peer_pubkey: String,
    pub peer_npub: Option<String>,
    pub display_name: String,
    pub has_alias: bool,
    pub unread_count: u32,
    pub last_message_preview: String,
    pub last_message_at: Option<i64>,
    pub is_selected: bool,
}

#[derive(uniffi::Record, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
    // Older stored messages carry a single attachment instead of a list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl ChatMessage {
    pub fn text(ts: i64, text: impl Into<String>) -> Self {
        Self {
            ts,
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastVariant {
    #[default]
    Info,
    Success,
    Error,
}

impl ToastVariant {
    /// Unknown names fall back to `Info`, the way an unrecognized variant renders.
    pub fn from_name(name: &str) -> Self {
        match name {
            "success" => ToastVariant::Success,
            "error" => ToastVariant::Error,
            _ => ToastVariant::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToastVariant::Info => "info",
            ToastVariant::Success => "success",
            ToastVariant::Error => "error",
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub id: String,
    pub text: String,
    pub variant: ToastVariant,
}
