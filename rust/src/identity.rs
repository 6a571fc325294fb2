// Peer identity parsing: hex or npub in, canonical lowercase hex out.

use std::fmt;
use std::sync::OnceLock;

use nostr::nips::nip19::{FromBech32, ToBech32};
use nostr::PublicKey;
use serde::{Deserialize, Serialize};

const NPUB_PREFIX: &str = "npub";
const SHORT_DISPLAY_CHARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("empty peer input")]
    EmptyInput,
    #[error("could not decode npub")]
    DecodeFailure,
    #[error("expected 64 hex characters")]
    InvalidFormat,
}

impl IdentityError {
    /// Message shown to the user when a typed peer reference is rejected.
    pub fn user_message(&self) -> &'static str {
        match self {
            IdentityError::EmptyInput => "Enter a pubkey or npub",
            IdentityError::DecodeFailure | IdentityError::InvalidFormat => "Invalid pubkey",
        }
    }
}

/// Canonical peer key: always 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PeerIdentity(String);

impl PeerIdentity {
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    pub fn into_hex(self) -> String {
        self.0
    }

    /// Bech32 form for sharing. Any well-formed key encodes; there is no curve check,
    /// so `None` only surfaces an encoder failure inside nostr.
    pub fn to_npub(&self) -> Option<String> {
        PublicKey::from_hex(&self.0).ok()?.to_bech32().ok()
    }

    /// Display fallback when no alias is set.
    pub fn short(&self) -> String {
        format!("{}\u{2026}", &self.0[..SHORT_DISPLAY_CHARS])
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PeerIdentity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        normalize(&value)
    }
}

impl From<PeerIdentity> for String {
    fn from(value: PeerIdentity) -> Self {
        value.0
    }
}

impl std::str::FromStr for PeerIdentity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
    }
}

fn hex_key_re() -> &'static regex::Regex {
    static HEX_KEY_RE: OnceLock<regex::Regex> = OnceLock::new();
    HEX_KEY_RE.get_or_init(|| {
        regex::Regex::new(r"^[0-9a-fA-F]{64}$").expect("static hex key regex")
    })
}

/// Resolve a typed peer reference (hex or npub) to its canonical form.
pub fn normalize(input: &str) -> Result<PeerIdentity, IdentityError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::EmptyInput);
    }

    let candidate = if trimmed.starts_with(NPUB_PREFIX) {
        decode_npub(trimmed)?
    } else {
        trimmed.to_string()
    };

    if !hex_key_re().is_match(&candidate) {
        return Err(IdentityError::InvalidFormat);
    }
    Ok(PeerIdentity(candidate.to_ascii_lowercase()))
}

/// Resolve a QR scan payload. Scanned codes must carry an npub; anything else is
/// rejected so the scanner never selects a peer from arbitrary text.
pub fn resolve_scanned(text: &str) -> Result<PeerIdentity, IdentityError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(IdentityError::EmptyInput);
    }
    if !trimmed.starts_with(NPUB_PREFIX) {
        return Err(IdentityError::InvalidFormat);
    }
    normalize(trimmed)
}

fn decode_npub(s: &str) -> Result<String, IdentityError> {
    match PublicKey::from_bech32(s) {
        Ok(pk) => Ok(pk.to_hex()),
        Err(e) => {
            tracing::debug!(%e, "npub decode failed");
            Err(IdentityError::DecodeFailure)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // NIP-19 reference pair.
    const NPUB: &str = "npub10elfcs4fr0l0r8af98jlmgdh9c8tcxjvz9qkw038js35mp4dma8qzvjptg";
    const HEX: &str = "7e7e9c42a91bfef19fa929e5fda1b72e0ebc1a4c1141673e2794234d86addf4e";

    #[test]
    fn hex_is_lowercased() {
        let upper = HEX.to_ascii_uppercase();
        let id = normalize(&upper).unwrap();
        assert_eq!(id.as_hex(), HEX);
        assert_eq!(id.as_hex().len(), 64);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let id = normalize(&format!("  {HEX}\n")).unwrap();
        assert_eq!(id.as_hex(), HEX);
    }

    #[test]
    fn npub_decodes_to_hex() {
        assert_eq!(normalize(NPUB).unwrap().as_hex(), HEX);
    }

    #[test]
    fn npub_round_trip_matches_direct_hex() {
        let direct = normalize(HEX).unwrap();
        let npub = direct.to_npub().expect("encodable key");
        assert_eq!(normalize(&npub).unwrap(), direct);
    }

    #[test]
    fn empty_input_is_reported() {
        assert_eq!(normalize(""), Err(IdentityError::EmptyInput));
        assert_eq!(normalize("   \t"), Err(IdentityError::EmptyInput));
    }

    #[test]
    fn malformed_npub_is_decode_failure() {
        assert_eq!(normalize("npub1notreal"), Err(IdentityError::DecodeFailure));
        // Flip the last checksum character.
        let mut broken = NPUB.to_string();
        broken.pop();
        broken.push('q');
        assert_eq!(normalize(&broken), Err(IdentityError::DecodeFailure));
    }

    #[test]
    fn wrong_shape_is_invalid_format() {
        assert_eq!(normalize(&HEX[..63]), Err(IdentityError::InvalidFormat));
        assert_eq!(
            normalize(&format!("{HEX}0")),
            Err(IdentityError::InvalidFormat)
        );
        let bad_char = format!("g{}", &HEX[1..]);
        assert_eq!(normalize(&bad_char), Err(IdentityError::InvalidFormat));
        assert_eq!(normalize("nsec1abc"), Err(IdentityError::InvalidFormat));
    }

    #[test]
    fn scanned_payload_requires_npub() {
        assert_eq!(resolve_scanned(NPUB).unwrap().as_hex(), HEX);
        assert_eq!(resolve_scanned(HEX), Err(IdentityError::InvalidFormat));
        assert_eq!(resolve_scanned(""), Err(IdentityError::EmptyInput));
        assert_eq!(
            resolve_scanned("npub1garbage"),
            Err(IdentityError::DecodeFailure)
        );
    }

    #[test]
    fn serde_rejects_invalid_keys() {
        let ok: PeerIdentity = serde_json::from_str(&format!("\"{}\"", HEX.to_uppercase())).unwrap();
        assert_eq!(ok.as_hex(), HEX);
        assert!(serde_json::from_str::<PeerIdentity>("\"abc\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), format!("\"{HEX}\""));
    }

    #[test]
    fn any_well_formed_key_encodes_and_decodes_back() {
        for c in ['0', 'a', 'b', 'f'] {
            let peer = normalize(&c.to_string().repeat(64)).unwrap();
            let npub = peer.to_npub().expect("encodable key");
            assert!(npub.starts_with("npub1"), "{npub}");
            assert_eq!(normalize(&npub).unwrap(), peer);
        }
    }

    #[test]
    fn short_form_keeps_ten_chars() {
        let id = normalize(HEX).unwrap();
        assert_eq!(id.short(), "7e7e9c42a9\u{2026}");
    }

    #[test]
    fn user_messages() {
        assert_eq!(IdentityError::InvalidFormat.user_message(), "Invalid pubkey");
        assert_eq!(IdentityError::DecodeFailure.user_message(), "Invalid pubkey");
    }
}
