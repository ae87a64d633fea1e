//! Nostr event model and the unsigned drafts the responder produces.

use serde::{Deserialize, Serialize};

/// Profile metadata (`kind 0`).
pub const KIND_METADATA: u32 = 0;
/// Flat top-level text note.
pub const KIND_TEXT_NOTE: u32 = 1;
/// Lightweight reaction, used only when grading quiz answers.
pub const KIND_REACTION: u32 = 7;
/// Public channel message (NIP-28); always carries a thread root.
pub const KIND_CHANNEL_MESSAGE: u32 = 42;

/// Wrapper for a Nostr tag expressed as an array of strings.
///
/// The first element is the discriminator and the rest is positional data:
///
/// - `e` – `["e", id, relay, marker?, pubkey?]` where marker is `root` or `reply`
/// - `p` – `["p", pubkey, relay?]`
/// - `emoji` – `["emoji", shortcode, url]`
/// - `k` – `["k", kind]`
///
/// Tags are kept verbatim so unknown tags survive a round trip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tag(pub Vec<String>);

impl Tag {
    /// Build a tag from string slices.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tag(parts.into_iter().map(Into::into).collect())
    }

    /// Discriminator such as `e` or `p`.
    pub fn kind(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Positional value at `idx`.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True for an `e` tag carrying the given marker in the fourth slot.
    pub fn is_marked_event_ref(&self, marker: &str) -> bool {
        self.len() >= 4 && self.kind() == Some("e") && self.get(3) == Some(marker)
    }
}

/// Core Nostr event received from clients and returned after signing.
///
/// ```json
/// {
///   "id": "aa11",
///   "pubkey": "1cc7...",
///   "kind": 42,
///   "created_at": 1700000000,
///   "tags": [["e", "c8d5...", "", "root"]],
///   "content": "shanten 123456789m11222p",
///   "sig": "deadbeef"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Event identifier (hex of SHA-256 hash).
    pub id: String,
    /// Author public key (hex).
    pub pubkey: String,
    /// Unix timestamp of creation.
    pub created_at: u64,
    /// Kind number, e.g. `1` or `42`.
    pub kind: u32,
    /// Ordered tags.
    pub tags: Vec<Tag>,
    /// Event content body.
    pub content: String,
    /// Schnorr signature over the event hash.
    pub sig: String,
}

impl Event {
    /// First `e` tag marked `root`.
    pub fn root_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|t| t.is_marked_event_ref("root"))
    }

    /// First `e` tag marked `reply`.
    pub fn reply_tag(&self) -> Option<&Tag> {
        self.tags.iter().find(|t| t.is_marked_event_ref("reply"))
    }
}

/// Unsigned event proposed by the responder. Only [`crate::signer::Signer`]
/// turns it into an [`Event`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Draft {
    pub content: String,
    pub kind: u32,
    pub tags: Vec<Tag>,
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_serializes_as_plain_array() {
        let tag = Tag::new(["e", "abc", "", "root"]);
        assert_eq!(
            serde_json::to_string(&tag).unwrap(),
            r#"["e","abc","","root"]"#
        );
    }

    #[test]
    fn event_parses_from_json() {
        let ev: Event = serde_json::from_value(serde_json::json!({
            "id": "aa11",
            "pubkey": "p",
            "kind": 42,
            "created_at": 10,
            "tags": [["e", "root-id", "", "root"], ["e", "parent", "", "reply"], ["p", "x"]],
            "content": "hi",
            "sig": "00"
        }))
        .unwrap();
        assert_eq!(ev.root_tag().unwrap().get(1), Some("root-id"));
        assert_eq!(ev.reply_tag().unwrap().get(1), Some("parent"));
        assert_eq!(ev.tags[2].kind(), Some("p"));
    }

    #[test]
    fn short_e_tag_is_not_a_marked_reference() {
        let tag = Tag::new(["e", "abc"]);
        assert!(!tag.is_marked_event_ref("root"));
    }
}
