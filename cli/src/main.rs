use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use pika_chatlist_core::{ChatListEntry, ChatMessage, PeerIdentity, build_chat_list, normalize};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "pika-chatlist", version, about = "Inspect peer identities and chat lists")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Normalize a hex or npub peer key to canonical lowercase hex.
    Resolve { input: String },
    /// Print the npub form of a hex peer key.
    Encode { hex: String },
    /// Rank the conversations in a snapshot file the way the chat list shows them.
    Rank {
        snapshot: PathBuf,
        /// Print rows as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

/// `{ "conversations": {hex: [message]}, "last_read": {hex: ts}, "aliases": {hex: name} }`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Snapshot {
    conversations: HashMap<PeerIdentity, Vec<ChatMessage>>,
    last_read: HashMap<PeerIdentity, i64>,
    aliases: HashMap<PeerIdentity, String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Resolve { input } => println!("{}", resolve(&input)?),
        Cmd::Encode { hex } => println!("{}", encode(&hex)?),
        Cmd::Rank { snapshot, json } => {
            let rows = rank_snapshot(&snapshot)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for line in render_rows(&rows) {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

fn resolve(input: &str) -> Result<String> {
    let peer = normalize(input).map_err(|e| anyhow!("{}: {e}", e.user_message()))?;
    Ok(peer.into_hex())
}

fn encode(hex: &str) -> Result<String> {
    let peer: PeerIdentity = hex.parse().context("parse peer pubkey")?;
    peer.to_npub()
        .ok_or_else(|| anyhow!("cannot encode {peer} as npub"))
}

fn rank_snapshot(path: &Path) -> Result<Vec<ChatListEntry>> {
    let raw = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let snapshot: Snapshot =
        serde_json::from_slice(&raw).with_context(|| format!("parse {}", path.display()))?;
    tracing::debug!(
        conversations = snapshot.conversations.len(),
        aliases = snapshot.aliases.len(),
        "snapshot loaded"
    );
    Ok(build_chat_list(
        &snapshot.conversations,
        &snapshot.last_read,
        &snapshot.aliases,
        None,
    ))
}

fn render_rows(rows: &[ChatListEntry]) -> Vec<String> {
    rows.iter()
        .map(|r| {
            let unread = if r.unread_count > 0 {
                format!(" ({})", r.unread_count)
            } else {
                String::new()
            };
            format!("{}{unread}  {}", r.display_name, r.last_message_preview)
        })
        .collect()
}
