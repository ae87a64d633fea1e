//! Mapping between tiles and the custom emoji used to draw them.

use std::collections::HashMap;

use regex::Regex;

use crate::{
    error::{ResponseError, Result},
    mahjong::{Glyph, Suit, Tile},
};

const HONOR_NAMES: [&str; 7] = ["east", "south", "west", "north", "white", "green", "red"];
const DEFAULT_URL_BASE: &str = "https://awayuki.github.io/emoji";

/// Bidirectional tile ⇄ shortcode codec with a static shortcode → URL table.
#[derive(Debug, Clone)]
pub struct EmojiCodec {
    urls: HashMap<String, String>,
    pattern: Regex,
}

impl Default for EmojiCodec {
    fn default() -> Self {
        let urls = Tile::all()
            .map(|tile| {
                let code = Self::shortcode(tile);
                let file = code.replacen('_', "-", 1);
                (code, format!("{DEFAULT_URL_BASE}/{file}.png"))
            })
            .collect();
        Self::with_urls(urls)
    }
}

impl EmojiCodec {
    /// Codec resolving shortcodes through `urls`.
    pub fn with_urls(urls: HashMap<String, String>) -> Self {
        Self {
            urls,
            pattern: Regex::new(r":(mahjong_[a-z0-9]+):").expect("static pattern"),
        }
    }

    /// Shortcode of a tile, e.g. `mahjong_m5` or `mahjong_east`.
    pub fn shortcode(tile: Tile) -> String {
        match tile.suit() {
            Suit::Honor => format!("mahjong_{}", HONOR_NAMES[tile.rank() as usize - 1]),
            suit => format!("mahjong_{}{}", suit.letter(), tile.rank()),
        }
    }

    /// Shortcode of a raw `<rank><suit>` token.
    pub fn encode(&self, token: &str) -> Result<String> {
        token
            .parse::<Tile>()
            .map(Self::shortcode)
            .map_err(|_| ResponseError::UnknownToken(token.to_string()))
    }

    /// Tile named by a shortcode.
    pub fn decode(&self, shortcode: &str) -> Result<Tile> {
        let unknown = || ResponseError::UnknownShortcode(shortcode.to_string());
        let rest = shortcode.strip_prefix("mahjong_").ok_or_else(unknown)?;
        if let Some(pos) = HONOR_NAMES.iter().position(|n| *n == rest) {
            return Tile::new(Suit::Honor, pos as u8 + 1).ok_or_else(unknown);
        }
        let mut chars = rest.chars();
        let (Some(letter), Some(rank), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(unknown());
        };
        match (Suit::from_letter(letter), rank.to_digit(10)) {
            (Some(suit), Some(rank)) if suit != Suit::Honor => {
                Tile::new(suit, rank as u8).ok_or_else(unknown)
            }
            _ => Err(unknown()),
        }
    }

    /// Image URL registered for `shortcode`.
    pub fn url(&self, shortcode: &str) -> Result<&str> {
        self.urls
            .get(shortcode)
            .map(String::as_str)
            .ok_or_else(|| ResponseError::UnknownShortcode(shortcode.to_string()))
    }

    /// Render hand notation with every token replaced by `:shortcode:`.
    /// Meld brackets are kept as written.
    pub fn annotate(&self, glyphs: &[Glyph]) -> Result<String> {
        let mut out = String::new();
        for glyph in glyphs {
            match glyph {
                Glyph::Token(tok) => {
                    out.push(':');
                    out.push_str(&self.encode(tok)?);
                    out.push(':');
                }
                Glyph::Bracket(c) => out.push(*c),
            }
        }
        Ok(out)
    }

    /// Render tiles as consecutive `:shortcode:` runs.
    pub fn annotate_tiles(&self, tiles: &[Tile]) -> String {
        tiles
            .iter()
            .map(|t| format!(":{}:", Self::shortcode(*t)))
            .collect()
    }

    /// Tiles drawn in annotated `text`, in order. Plain text is ignored.
    pub fn tokens_in(&self, text: &str) -> Result<Vec<Tile>> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|code| self.decode(code.as_str()))
            .collect()
    }

    /// Inverse of [`annotate`](Self::annotate): replace every `:shortcode:`
    /// with its token and keep everything else.
    pub fn deannotate(&self, text: &str) -> Result<String> {
        let mut out = String::new();
        let mut last = 0;
        for caps in self.pattern.captures_iter(text) {
            let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            out.push_str(&self.decode(code.as_str())?.to_string());
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }
}
