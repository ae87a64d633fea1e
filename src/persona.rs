//! Profile metadata published by each bot identity.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    error::{ResponseError, Result},
    event::{Draft, KIND_METADATA},
    signer::SignError,
};

/// Kind 0 metadata object. Fields serialize in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub about: String,
    pub bot: bool,
    pub display_name: String,
    pub name: String,
    pub nip05: String,
    pub picture: String,
    pub website: String,
    pub lud16: String,
}

impl Profile {
    /// Profile of one of the player bots.
    pub fn player(name: &str, display_name: &str) -> Self {
        Self {
            about: "麻雀プレイヤーbot".into(),
            bot: true,
            display_name: display_name.into(),
            name: name.into(),
            nip05: format!("{name}@nikolat.github.io"),
            picture: format!("https://nikolat.github.io/avatar/{name}.png"),
            website: format!("https://github.com/nikolat/jong-{name}"),
            lud16: "nikolat@coinos.io".into(),
        }
    }
}

/// Hex public key → profile.
#[derive(Debug, Clone)]
pub struct PersonaTable {
    profiles: HashMap<String, Profile>,
}

impl Default for PersonaTable {
    fn default() -> Self {
        Self::new([
            (
                "1cc73c7cc29a6c0070f39856fdb835bc9e6cbdf4dcdd207fa9eff8cf4d5699df",
                Profile::player("rinrin", "リンリン"),
            ),
            (
                "c5f93ee20ede33299d192d182fa95d523416d669c5c8887e6b2a2456c2e0c300",
                Profile::player("chunchun", "チュンチュン"),
            ),
            (
                "75fb3240d4af1255a249cf33f9223529ec41f223bb8dd93b82bbe6e799f9e4a1",
                Profile::player("whanwhan", "ホワンホワン"),
            ),
        ])
    }
}

impl PersonaTable {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Profile)>) -> Self {
        Self {
            profiles: entries
                .into_iter()
                .map(|(k, p)| (k.to_string(), p))
                .collect(),
        }
    }

    pub fn profile_for(&self, pubkey: &str) -> Result<&Profile> {
        self.profiles
            .get(pubkey)
            .ok_or_else(|| ResponseError::UnknownPersona(pubkey.to_string()))
    }

    /// Metadata draft for the identity `pubkey`.
    pub fn draft_for(&self, pubkey: &str, created_at: u64) -> Result<Draft> {
        let content = serde_json::to_string(self.profile_for(pubkey)?).map_err(SignError::from)?;
        Ok(Draft {
            content,
            kind: KIND_METADATA,
            tags: Vec::new(),
            created_at,
        })
    }
}
