//! One reply composer per command.
//!
//! Composers never sign anything. They return a [`Reply`] that the responder
//! stamps and signs. Problems the user can fix (bad hand shape, not a winning
//! hand, no yaku) are answered in text; only tokens that name no tile at all
//! are fatal.

use crate::{
    emoji::EmojiCodec,
    error::{ResponseError, Result},
    event::{Draft, Event, Tag},
    mahjong::{self, glyphs, parse_hand, Glyph, HandError, ScoreResult, Tile, WinContext},
    tags::{emoji_tags, thread_tags},
};

pub const MALFORMED_HAND: &str = "手牌の形式が正しくありません";
pub const PERSONA_UPDATED: &str = r"\s[0]kind0 updated.";

/// Unsigned reply content plus tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub content: String,
    pub tags: Vec<Tag>,
    /// `None` answers with the kind of the input event.
    pub kind: Option<u32>,
}

impl Reply {
    pub fn text(content: impl Into<String>, tags: Vec<Tag>) -> Self {
        Self {
            content: content.into(),
            tags,
            kind: None,
        }
    }

    /// Draft answering `input`, one second after it.
    pub fn into_draft(self, input: &Event) -> Draft {
        Draft {
            content: self.content,
            kind: self.kind.unwrap_or(input.kind),
            tags: self.tags,
            created_at: input.created_at.saturating_add(1),
        }
    }
}

/// Parse a single `<rank><suit>` token.
pub(crate) fn tile(token: &str) -> Result<Tile> {
    token
        .parse()
        .map_err(|_| ResponseError::UnknownToken(token.to_string()))
}

/// Wind argument of `score`, `default` when absent. `Ok(None)` for a tile
/// that is not 1z-4z.
fn wind(token: Option<&str>, default: Tile) -> Result<Option<Tile>> {
    match token {
        None => Ok(Some(default)),
        Some(token) => Ok(Some(tile(token)?).filter(|t| t.is_wind())),
    }
}

/// Tiles of already validated glyphs, in written order.
fn tiles_of(glyphs: &[Glyph]) -> Vec<Tile> {
    glyphs
        .iter()
        .filter_map(|g| match g {
            Glyph::Token(t) => t.parse().ok(),
            Glyph::Bracket(_) => None,
        })
        .collect()
}

/// Text reply for a hand that cannot be evaluated; unknown tiles stay fatal.
fn malformed(event: &Event, err: HandError) -> Result<Reply> {
    match err {
        HandError::UnknownToken(tok) => Err(ResponseError::UnknownToken(tok)),
        other => {
            tracing::debug!(id = %event.id, "hand rejected: {other}");
            Ok(Reply::text(MALFORMED_HAND, thread_tags(event)))
        }
    }
}

/// Lexed hand together with its emoji rendering.
struct Rendered {
    text: String,
    tiles: Vec<Tile>,
}

/// `Ok(Err(reply))` when the hand is too broken to even draw.
fn render(
    codec: &EmojiCodec,
    event: &Event,
    hand: &str,
) -> Result<std::result::Result<Rendered, Reply>> {
    let glyphs = match glyphs(hand) {
        Ok(g) => g,
        Err(e) => return malformed(event, e).map(Err),
    };
    Ok(Ok(Rendered {
        text: codec.annotate(&glyphs)?,
        tiles: tiles_of(&glyphs),
    }))
}

fn tags_with_emoji(codec: &EmojiCodec, event: &Event, tiles: &[Tile]) -> Result<Vec<Tag>> {
    let mut tags = thread_tags(event);
    tags.extend(emoji_tags(codec, tiles)?);
    Ok(tags)
}

/// Lines describing a scored hand: yakuman or yaku with fu and han, then
/// the point total.
pub fn breakdown(result: &ScoreResult) -> Vec<String> {
    let mut lines = Vec::new();
    if result.yakuman.is_empty() {
        lines.extend(result.yaku.iter().map(|(name, han)| format!("{name} {han}翻")));
        lines.push(format!("{}符{}翻", result.fu, result.han));
    } else {
        for (name, mult) in &result.yakuman {
            let times = if *mult >= 2 {
                format!("{mult}倍")
            } else {
                String::new()
            };
            lines.push(format!("{name} {times}役満"));
        }
    }
    lines.push(format!("{}点", result.points));
    lines
}

pub fn shanten(codec: &EmojiCodec, event: &Event, hand: &str) -> Result<Reply> {
    let rendered = match render(codec, event, hand)? {
        Ok(r) => r,
        Err(reply) => return Ok(reply),
    };
    let value = match parse_hand(hand).and_then(|h| mahjong::shanten(&h)) {
        Ok(v) => v,
        Err(e) => return malformed(event, e),
    };
    let result = match value {
        -1 => "和了".to_string(),
        0 => "聴牌(テンパイ)".to_string(),
        n => format!("{n}向聴(シャンテン)"),
    };
    Ok(Reply::text(
        format!("{}\n{result}", rendered.text),
        tags_with_emoji(codec, event, &rendered.tiles)?,
    ))
}

pub fn score(
    codec: &EmojiCodec,
    event: &Event,
    hand: &str,
    winning: &str,
    round_wind: Option<&str>,
    seat_wind: Option<&str>,
) -> Result<Reply> {
    let rendered = match render(codec, event, hand)? {
        Ok(r) => r,
        Err(reply) => return Ok(reply),
    };
    let winning = tile(winning)?;
    let defaults = WinContext::default();
    let (Some(round_wind), Some(seat_wind)) = (
        wind(round_wind, defaults.round_wind)?,
        wind(seat_wind, defaults.seat_wind)?,
    ) else {
        tracing::debug!(id = %event.id, "wind argument is not a wind tile");
        return Ok(Reply::text(MALFORMED_HAND, thread_tags(event)));
    };
    let ctx = WinContext {
        round_wind,
        seat_wind,
        ..defaults
    };

    let head = format!("{} :{}:", rendered.text, EmojiCodec::shortcode(winning));
    let mut shown = rendered.tiles;
    shown.push(winning);
    let tags = tags_with_emoji(codec, event, &shown)?;

    let scored = match parse_hand(hand).and_then(|h| mahjong::score(&h, winning, &ctx)) {
        Ok(s) => s,
        Err(e) => return malformed(event, e),
    };
    let body = match scored {
        None => "和了れません".to_string(),
        Some(r) if r.points == 0 => "役がありません".to_string(),
        Some(r) => breakdown(&r).join("\n"),
    };
    Ok(Reply::text(format!("{head}\n{body}"), tags))
}

pub fn machi(codec: &EmojiCodec, event: &Event, hand: &str) -> Result<Reply> {
    let rendered = match render(codec, event, hand)? {
        Ok(r) => r,
        Err(reply) => return Ok(reply),
    };
    let parsed = match parse_hand(hand) {
        Ok(h) => h,
        Err(e) => return malformed(event, e),
    };
    let value = match mahjong::shanten(&parsed) {
        Ok(v) => v,
        Err(e) => return malformed(event, e),
    };
    if value != 0 {
        let verdict = if value > 0 {
            "テンパイしていません"
        } else {
            "和了っています"
        };
        return Ok(Reply::text(
            format!("{}\n{verdict}", rendered.text),
            tags_with_emoji(codec, event, &rendered.tiles)?,
        ));
    }
    let waits = match mahjong::machi(&parsed) {
        Ok(w) => w,
        Err(e) => return malformed(event, e),
    };
    let mut shown = waits.clone();
    shown.extend(&rendered.tiles);
    Ok(Reply::text(
        format!("{}\n待ち: {}", rendered.text, codec.annotate_tiles(&waits)),
        tags_with_emoji(codec, event, &shown)?,
    ))
}

pub fn persona(event: &Event) -> Reply {
    Reply::text(PERSONA_UPDATED, thread_tags(event))
}
