//! NIP-19 bech32 keys and ids (`npub`, `nsec`, `note`).

use bech32::{Bech32, Hrp};

pub const NPUB: Hrp = Hrp::parse_unchecked("npub");
pub const NSEC: Hrp = Hrp::parse_unchecked("nsec");
pub const NOTE: Hrp = Hrp::parse_unchecked("note");

#[derive(Debug, thiserror::Error)]
pub enum Nip19Error {
    #[error("bech32: {0}")]
    Decode(#[from] bech32::DecodeError),
    #[error("bech32: {0}")]
    Encode(#[from] bech32::EncodeError),
    #[error("expected `{expected}` but found `{found}`")]
    WrongPrefix { expected: String, found: String },
    #[error("expected 32 bytes, found {0}")]
    Length(usize),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// 32 bytes behind `hrp`-prefixed bech32 text.
pub fn decode(hrp: Hrp, text: &str) -> Result<[u8; 32], Nip19Error> {
    let (found, data) = bech32::decode(text.trim())?;
    if found != hrp {
        return Err(Nip19Error::WrongPrefix {
            expected: hrp.to_string(),
            found: found.to_string(),
        });
    }
    data.as_slice()
        .try_into()
        .map_err(|_| Nip19Error::Length(data.len()))
}

/// Encode a hex key or id under `hrp`.
pub fn encode(hrp: Hrp, hex_value: &str) -> Result<String, Nip19Error> {
    let bytes = hex::decode(hex_value)?;
    if bytes.len() != 32 {
        return Err(Nip19Error::Length(bytes.len()));
    }
    Ok(bech32::encode::<Bech32>(hrp, &bytes)?)
}

/// Lowercase hex of `text`, which is either hex already or bech32 under `hrp`.
pub fn to_hex(hrp: Hrp, text: &str) -> Result<String, Nip19Error> {
    let text = text.trim();
    if text.starts_with(&format!("{hrp}1")) {
        return decode(hrp, text).map(hex::encode);
    }
    let bytes = hex::decode(text)?;
    if bytes.len() != 32 {
        return Err(Nip19Error::Length(bytes.len()));
    }
    Ok(hex::encode(bytes))
}
