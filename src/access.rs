//! Admission policy for inbound events.

use std::collections::HashSet;

use tracing::debug;

use crate::{
    error::{ResponseError, Result},
    event::{Event, KIND_CHANNEL_MESSAGE, KIND_TEXT_NOTE},
};

/// Channels the bots answer in by default.
pub const DEFAULT_ALLOWED_CHANNELS: [&str; 4] = [
    "c8d5c2709a5670d6f621ac8020ac3e4fc3057a4961a15319f7c0818309407723",
    "8206e76969256cd33277eeb00a45e445504dfb321788b5c3cc5d23b561765a74",
    "330fc57e48e39427dd5ea555b0741a3f715a55e10f8bb6616c27ec92ebc5e64b",
    "5b0703f5add2bb9e636bcae1ef7870ba6a591a93b6b556aca0f14b0919006598",
];

/// Authors never answered: the table bot that posts game state.
pub const DEFAULT_DENIED_AUTHORS: [&str; 1] =
    ["93e68a5f7bf6d35f0cb1288160e42ecdb3396b80bb686a528199dfc5e58ceb25"];

const DENIED_TAGS: [&str; 2] = ["content-warning", "proxy"];

/// Static deny and allow lists.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    denied_authors: HashSet<String>,
    allowed_channels: HashSet<String>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_DENIED_AUTHORS.iter().map(|s| s.to_string()),
            DEFAULT_ALLOWED_CHANNELS.iter().map(|s| s.to_string()),
        )
    }
}

impl AccessPolicy {
    pub fn new(
        denied_authors: impl IntoIterator<Item = String>,
        allowed_channels: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            denied_authors: denied_authors.into_iter().collect(),
            allowed_channels: allowed_channels.into_iter().collect(),
        }
    }

    /// Decide whether `event` may be answered.
    ///
    /// Channel messages without a root tag and unsupported kinds are errors
    /// rather than a quiet `false`.
    pub fn is_allowed(&self, event: &Event) -> Result<bool> {
        if self.denied_authors.contains(&event.pubkey) {
            debug!(author = %event.pubkey, "author is denied");
            return Ok(false);
        }
        if event
            .tags
            .iter()
            .any(|t| t.kind().is_some_and(|k| DENIED_TAGS.contains(&k)))
        {
            debug!(id = %event.id, "event carries a denied tag");
            return Ok(false);
        }
        match event.kind {
            KIND_TEXT_NOTE => Ok(true),
            KIND_CHANNEL_MESSAGE => {
                let root = event.root_tag().ok_or(ResponseError::MissingThreadRoot)?;
                let allowed = root
                    .get(1)
                    .is_some_and(|id| self.allowed_channels.contains(id));
                if !allowed {
                    debug!(channel = ?root.get(1), "channel is not allowed");
                }
                Ok(allowed)
            }
            kind => Err(ResponseError::UnsupportedKind(kind)),
        }
    }
}
