//! Event id hashing, Schnorr signing and verification.

use rand::RngCore;
use secp256k1::{schnorr::Signature, Keypair, Message, Secp256k1, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use crate::{
    event::{Draft, Event},
    nip19::{self, Nip19Error},
};

/// Failures while signing or verifying events.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("invalid secret key: {0}")]
    InvalidKey(String),
    #[error("id mismatch")]
    IdMismatch,
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("signature error: {0}")]
    Secp(#[from] secp256k1::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid key encoding: {0}")]
    Nip19(#[from] Nip19Error),
}

/// Signing identity of one bot.
#[derive(Clone)]
pub struct Signer {
    keypair: Keypair,
    pubkey: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("pubkey", &self.pubkey)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Build a signer from a hex-encoded 32-byte secret key.
    pub fn from_hex(seckey: &str) -> Result<Self, SignError> {
        let bytes = hex::decode(seckey.trim())?;
        let secp = Secp256k1::new();
        let keypair = Keypair::from_seckey_slice(&secp, &bytes)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        Ok(Self::from_keypair(keypair))
    }

    /// Build a signer from an `nsec1` bech32 or hex secret key.
    pub fn from_secret(seckey: &str) -> Result<Self, SignError> {
        Self::from_hex(&nip19::to_hex(nip19::NSEC, seckey)?)
    }

    /// Throwaway identity for local debugging.
    pub fn generate() -> Result<Self, SignError> {
        let secp = Secp256k1::new();
        let mut sk = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut sk);
        let keypair = Keypair::from_seckey_slice(&secp, &sk)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        Ok(Self::from_keypair(keypair))
    }

    fn from_keypair(keypair: Keypair) -> Self {
        let pubkey = hex::encode(keypair.x_only_public_key().0.serialize());
        Self { keypair, pubkey }
    }

    /// Hex x-only public key.
    pub fn public_key(&self) -> &str {
        &self.pubkey
    }

    /// Compute the id and signature for `draft` under this identity.
    pub fn sign(&self, draft: &Draft) -> Result<Event, SignError> {
        let mut ev = Event {
            id: String::new(),
            pubkey: self.pubkey.clone(),
            created_at: draft.created_at,
            kind: draft.kind,
            tags: draft.tags.clone(),
            content: draft.content.clone(),
            sig: String::new(),
        };
        let hash = event_hash(&ev)?;
        ev.id = hex::encode(hash);
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest_slice(&hash)?;
        let sig = secp.sign_schnorr_no_aux_rand(&msg, &self.keypair);
        ev.sig = hex::encode(sig.as_ref());
        Ok(ev)
    }
}

/// Recompute the Nostr event hash from its fields.
pub fn event_hash(ev: &Event) -> Result<[u8; 32], SignError> {
    let arr = serde_json::json!([0, ev.pubkey, ev.created_at, ev.kind, ev.tags, ev.content]);
    let data = serde_json::to_vec(&arr)?;
    let hash = Sha256::digest(&data);
    Ok(hash.into())
}

/// Verify an event's ID and Schnorr signature.
pub fn verify_event(ev: &Event) -> Result<(), SignError> {
    let hash = event_hash(ev)?;
    if hex::encode(hash) != ev.id {
        return Err(SignError::IdMismatch);
    }
    let sig = Signature::from_slice(&hex::decode(&ev.sig)?)?;
    let pk = XOnlyPublicKey::from_slice(&hex::decode(&ev.pubkey)?)?;
    let secp = Secp256k1::verification_only();
    let msg = Message::from_digest_slice(&hash)?;
    secp.verify_schnorr(&sig, &msg, &pk)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Tag;

    const SK: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    fn draft() -> Draft {
        Draft {
            content: "hello".into(),
            kind: 1,
            tags: vec![Tag::new(["p", "abc", ""])],
            created_at: 1,
        }
    }

    #[test]
    fn signed_event_verifies() {
        let signer = Signer::from_hex(SK).unwrap();
        let ev = signer.sign(&draft()).unwrap();
        assert_eq!(ev.pubkey, signer.public_key());
        assert_eq!(ev.id.len(), 64);
        assert_eq!(ev.sig.len(), 128);
        verify_event(&ev).unwrap();
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = Signer::from_hex(SK).unwrap();
        assert_eq!(signer.sign(&draft()).unwrap(), signer.sign(&draft()).unwrap());
    }

    #[test]
    fn tampered_content_fails_verification() {
        let signer = Signer::from_hex(SK).unwrap();
        let mut ev = signer.sign(&draft()).unwrap();
        ev.content.push('!');
        assert!(matches!(verify_event(&ev), Err(SignError::IdMismatch)));
    }

    #[test]
    fn bad_signature_is_rejected() {
        let signer = Signer::from_hex(SK).unwrap();
        let mut ev = signer.sign(&draft()).unwrap();
        ev.sig = "00".repeat(64);
        assert!(verify_event(&ev).is_err());
    }

    #[test]
    fn rejects_malformed_key() {
        assert!(Signer::from_hex("zz").is_err());
        assert!(Signer::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn generated_keys_differ() {
        let a = Signer::generate().unwrap();
        let b = Signer::generate().unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn nsec_and_hex_name_the_same_key() {
        let nsec = "nsec1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqstywftw";
        let a = Signer::from_secret(nsec).unwrap();
        let b = Signer::from_secret(SK).unwrap();
        assert_eq!(a.public_key(), b.public_key());
        assert!(matches!(
            Signer::from_secret("npub1rnrnclxznfkqqu8nnpt0mwp4hj0xe005mnwjqlafaluv7n2kn80sy53aq2"),
            Err(SignError::Nip19(_))
        ));
    }

    #[test]
    fn matches_known_event_vector() {
        // NIP-01 serialization keeps non-ASCII text and escapes quotes and newlines;
        // signed with the BIP-340 nonce for an all-zero aux.
        let signer = Signer::from_hex(SK).unwrap();
        let ev = signer
            .sign(&Draft {
                content: "和了\n\"q\"".into(),
                kind: 1,
                tags: vec![Tag::new(["p", "abc", ""])],
                created_at: 1_700_000_000,
            })
            .unwrap();
        assert_eq!(
            ev.pubkey,
            "1b84c5567b126440995d3ed5aaba0565d71e1834604819ff9c17f5e9d5dd078f"
        );
        assert_eq!(
            ev.id,
            "8a3843ad3c1d159b4b555d940c3542cc2c3495bc4108f8400f2f4a7b96b15470"
        );
        assert_eq!(
            ev.sig,
            concat!(
                "a925ca0948a2b06b5bdfff360eb865be30dc1fc35e3f6a09ec1a4dba76c118b4",
                "2f043bd8a1068882ce16c8a9a1310064a7e14c7ba648f6ae5f5c007e88043674"
            )
        );
        verify_event(&ev).unwrap();
    }
}
