// Key-value stores the chat list reads from: conversations, read watermarks, aliases.
// Each is a JSON file in the data dir, loaded once and rewritten on change.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::identity::PeerIdentity;
use crate::state::ChatMessage;

const CONVERSATIONS_FILE: &str = "conversations.json";
const LAST_READ_FILE: &str = "last_read.json";
const ALIASES_FILE: &str = "aliases.json";

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(_) => return T::default(),
    };
    match serde_json::from_str::<T>(&data) {
        Ok(v) => v,
        Err(e) => {
            // Keep the unreadable file so the next save cannot destroy it.
            let aside = corrupt_path(path);
            match std::fs::rename(path, &aside) {
                Ok(()) => tracing::warn!(
                    %e,
                    path = %path.display(),
                    moved_to = %aside.display(),
                    "failed to parse store file; moved aside"
                ),
                Err(rename_err) => tracing::warn!(
                    %e,
                    %rename_err,
                    path = %path.display(),
                    "failed to parse store file and to move it aside"
                ),
            }
            T::default()
        }
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    path.with_file_name(name)
}

/// Write through a sibling temp file renamed over the target, so readers see either
/// the old contents or the new ones.
fn save_json<T: Serialize>(path: &Path, value: &T) {
    let json = match serde_json::to_vec(value) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(%e, "failed to encode store file");
            return;
        }
    };
    if let Err(e) = write_atomic(path, &json) {
        tracing::warn!(%e, path = %path.display(), "failed to write store file");
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Where a store persists, if anywhere.
#[derive(Debug, Clone)]
pub struct StoreDir(Option<PathBuf>);

impl StoreDir {
    pub fn at(data_dir: &str) -> Self {
        Self(Some(PathBuf::from(data_dir)))
    }

    pub fn memory() -> Self {
        Self(None)
    }

    fn file(&self, name: &str) -> Option<PathBuf> {
        self.0.as_ref().map(|d| d.join(name))
    }
}

pub struct ChatStore {
    dir: StoreDir,
    conversations: HashMap<PeerIdentity, Vec<ChatMessage>>,
    last_read: HashMap<PeerIdentity, i64>,
}

impl ChatStore {
    pub fn open(dir: StoreDir) -> Self {
        let conversations = dir
            .file(CONVERSATIONS_FILE)
            .map(|p| load_json(&p))
            .unwrap_or_default();
        let last_read = dir
            .file(LAST_READ_FILE)
            .map(|p| load_json(&p))
            .unwrap_or_default();
        Self {
            dir,
            conversations,
            last_read,
        }
    }

    pub fn conversations(&self) -> &HashMap<PeerIdentity, Vec<ChatMessage>> {
        &self.conversations
    }

    pub fn last_read(&self) -> &HashMap<PeerIdentity, i64> {
        &self.last_read
    }

    /// Make sure `peer` is listed, even before the first message.
    pub fn ensure_conversation(&mut self, peer: &PeerIdentity) {
        if !self.conversations.contains_key(peer) {
            self.conversations.insert(peer.clone(), Vec::new());
            self.save_conversations();
        }
    }

    pub fn append(&mut self, peer: &PeerIdentity, message: ChatMessage) {
        self.conversations
            .entry(peer.clone())
            .or_default()
            .push(message);
        self.save_conversations();
    }

    /// Move the watermark forward; never backwards.
    pub fn mark_read(&mut self, peer: &PeerIdentity, ts: i64) -> bool {
        let current = self.last_read.get(peer).copied().unwrap_or(0);
        if ts <= current {
            return false;
        }
        self.last_read.insert(peer.clone(), ts);
        self.save_last_read();
        true
    }

    /// Mark everything currently in the conversation as read.
    pub fn mark_all_read(&mut self, peer: &PeerIdentity) -> bool {
        let newest = self
            .conversations
            .get(peer)
            .and_then(|msgs| msgs.iter().map(|m| m.ts).max());
        match newest {
            Some(ts) => self.mark_read(peer, ts),
            None => false,
        }
    }

    fn save_conversations(&self) {
        if let Some(path) = self.dir.file(CONVERSATIONS_FILE) {
            save_json(&path, &self.conversations);
        }
    }

    fn save_last_read(&self) {
        if let Some(path) = self.dir.file(LAST_READ_FILE) {
            save_json(&path, &self.last_read);
        }
    }
}

pub struct ContactStore {
    dir: StoreDir,
    aliases: HashMap<PeerIdentity, String>,
}

impl ContactStore {
    pub fn open(dir: StoreDir) -> Self {
        let aliases = dir
            .file(ALIASES_FILE)
            .map(|p| load_json(&p))
            .unwrap_or_default();
        Self { dir, aliases }
    }

    pub fn aliases(&self) -> &HashMap<PeerIdentity, String> {
        &self.aliases
    }

    /// An empty label clears the alias.
    pub fn set_alias(&mut self, peer: &PeerIdentity, label: &str) {
        if label.is_empty() {
            self.aliases.remove(peer);
        } else {
            self.aliases.insert(peer.clone(), label.to_string());
        }
        if let Some(path) = self.dir.file(ALIASES_FILE) {
            save_json(&path, &self.aliases);
        }
    }
}
