//! Chat list projection: ranking, unread counts and last-message previews.
//!
//! Everything here is a pure function of the conversation, watermark and alias maps.
//! The actor recomputes the whole list after every store mutation instead of patching
//! it incrementally.

use std::collections::HashMap;

use crate::identity::PeerIdentity;
use crate::state::{ChatListEntry, ChatMessage};

const IMAGE_PREFIX: &str = "data:image/";
const VIDEO_PREFIX: &str = "data:video/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
}

impl AttachmentKind {
    /// Prefix rule on the data URI. Anything that is not image or video counts as audio.
    pub fn classify(uri: &str) -> Self {
        if uri.starts_with(IMAGE_PREFIX) {
            AttachmentKind::Image
        } else if uri.starts_with(VIDEO_PREFIX) {
            AttachmentKind::Video
        } else {
            AttachmentKind::Audio
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Video => "video",
            AttachmentKind::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedConversation {
    pub peer: PeerIdentity,
    pub unread_count: u32,
    pub last_message_preview: String,
    pub last_message_at: Option<i64>,
}

/// Messages strictly newer than the watermark.
pub fn unread_count(messages: &[ChatMessage], watermark: i64) -> u32 {
    let n = messages.iter().filter(|m| m.ts > watermark).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// One-line summary of a message for the chat list.
pub fn preview(message: &ChatMessage) -> String {
    if let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    if !message.attachments.is_empty() {
        let labels: Vec<&str> = message
            .attachments
            .iter()
            .map(|a| AttachmentKind::classify(a).label())
            .collect();
        return format!("[{}]", labels.join(", "));
    }
    match message.attachment.as_deref().filter(|a| !a.is_empty()) {
        Some(a) => format!("[{}]", AttachmentKind::classify(a).label()),
        None => String::new(),
    }
}

/// Rank conversations by their last message, most recent first.
///
/// The sort key is the `ts` of the last message in insertion order, not the maximum
/// `ts`. Empty conversations sort as `0`. Equal keys fall back to the peer hex so the
/// output never depends on map iteration order.
pub fn rank(
    conversations: &HashMap<PeerIdentity, Vec<ChatMessage>>,
    last_read: &HashMap<PeerIdentity, i64>,
) -> Vec<RankedConversation> {
    let mut ranked: Vec<RankedConversation> = conversations
        .iter()
        .map(|(peer, messages)| {
            let watermark = last_read.get(peer).copied().unwrap_or(0);
            let last = messages.last();
            RankedConversation {
                peer: peer.clone(),
                unread_count: unread_count(messages, watermark),
                last_message_preview: last.map(preview).unwrap_or_default(),
                last_message_at: last.map(|m| m.ts),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        let ka = a.last_message_at.unwrap_or(0);
        let kb = b.last_message_at.unwrap_or(0);
        kb.cmp(&ka).then_with(|| a.peer.cmp(&b.peer))
    });
    ranked
}

pub fn display_name(peer: &PeerIdentity, alias: Option<&str>) -> String {
    match alias.filter(|a| !a.is_empty()) {
        Some(a) => a.to_string(),
        None => peer.short(),
    }
}

/// Ranked rows with aliases and selection resolved, ready for `AppState`.
pub fn build_chat_list(
    conversations: &HashMap<PeerIdentity, Vec<ChatMessage>>,
    last_read: &HashMap<PeerIdentity, i64>,
    aliases: &HashMap<PeerIdentity, String>,
    selected: Option<&PeerIdentity>,
) -> Vec<ChatListEntry> {
    rank(conversations, last_read)
        .into_iter()
        .map(|r| {
            let alias = aliases.get(&r.peer).map(String::as_str);
            ChatListEntry {
                peer_npub: r.peer.to_npub(),
                display_name: display_name(&r.peer, alias),
                has_alias: alias.is_some_and(|a| !a.is_empty()),
                unread_count: r.unread_count,
                last_message_preview: r.last_message_preview,
                last_message_at: r.last_message_at,
                is_selected: selected == Some(&r.peer),
                peer_pubkey: r.peer.into_hex(),
            }
        })
        .collect()
}
