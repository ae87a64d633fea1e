//! Riichi mahjong hand evaluation: parsing, shanten, waits and scoring.
//!
//! Everything here is pure; the responder only calls [`parse_hand`],
//! [`shanten`], [`machi`] and [`score`].

mod score;
mod shanten;
mod tile;

pub use score::{score, ScoreResult, WinContext};
pub use shanten::{machi, shanten};
pub use tile::{glyphs, parse_hand, Glyph, Suit, Tile};
#[cfg(test)]
pub use tile::tiles_in;

/// Reasons a hand string cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandError {
    /// A `<rank><suit>` pair that names no tile, such as `8z` or `0m`.
    #[error("unknown tile: {0}")]
    UnknownToken(String),
    #[error("malformed hand: {0}")]
    Malformed(String),
    #[error("expected {expected} tiles, found {found}")]
    WrongLength { expected: &'static str, found: usize },
    #[error("more than four copies of {0}")]
    TooManyCopies(String),
}
