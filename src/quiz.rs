//! "How many points?" quiz: puzzle generation and grading.
//!
//! Nothing about an asked puzzle is kept. When an answer arrives the puzzle
//! event is fetched back from the relay and its content decoded again.

use std::str::FromStr;

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info};

use crate::{
    compose::{breakdown, tile, Reply},
    emoji::EmojiCodec,
    error::{ResponseError, Result},
    event::{Draft, Event, Tag, KIND_CHANNEL_MESSAGE, KIND_REACTION},
    mahjong::{glyphs, parse_hand, score, Glyph, ScoreResult, Tile, WinContext},
    relay::RelayClient,
    signer::{verify_event, Signer},
    tags::{emoji_tags, fav_tags, thread_tags},
};

pub const PUZZLE_PROMPT: &str = "この手牌は何点？(数字でリプライしてね)";
pub const ASK_FOR_TARGET: &str = "どの問題への回答かリプライで指定してね";
pub const PUZZLE_NOT_FOUND: &str = "問題が見つかりませんでした";
const CORRECT: &str = "⭕";
const INCORRECT: &str = "❌";

/// Built-in puzzles: `<hand> <winning> <tsumo|ron> <round wind> <seat wind>`.
const DEFAULT_ENTRIES: [&str; 10] = [
    "234m567m2355p678s 4p ron 1z 1z",
    "123456789m2299p 2p tsumo 1z 2z",
    "<234m>456p78s234s55p 6s ron 1z 2z",
    "222m333p444s555s7z 7z ron 2z 3z",
    "1133m55p77p99s11z2z 2z tsumo 1z 1z",
    "111p234p678p9p555z 9p ron 2z 2z",
    "123m123p123s456m7p 7p ron 1z 3z",
    "<222m><555p>777s99s11z 1z ron 1z 2z",
    "1112345678999m 5m tsumo 1z 1z",
    "234p345p456p678p5s 5s ron 2z 4z",
];

/// A puzzle with its precomputed answer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizEntry {
    pub hand: String,
    glyphs: Vec<Glyph>,
    pub winning: Tile,
    pub ctx: WinContext,
    pub answer: ScoreResult,
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("invalid quiz entry `{0}`")]
pub struct InvalidEntry(String);

impl FromStr for QuizEntry {
    type Err = InvalidEntry;

    /// Only hands that win with at least one yaku are accepted.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || InvalidEntry(s.to_string());
        let fields: Vec<&str> = s.split_whitespace().collect();
        let &[hand, winning, how, round, seat] = fields.as_slice() else {
            return Err(invalid());
        };
        let tsumo = match how {
            "tsumo" => true,
            "ron" => false,
            _ => return Err(invalid()),
        };
        let parse = |t: &str| t.parse::<Tile>().map_err(|_| invalid());
        let wind = |t: &str| {
            parse(t)
                .ok()
                .filter(|w| w.is_wind())
                .ok_or_else(invalid)
        };
        let ctx = WinContext {
            round_wind: wind(round)?,
            seat_wind: wind(seat)?,
            tsumo,
        };
        let winning = parse(winning)?;
        let glyphs = glyphs(hand).map_err(|_| invalid())?;
        let parsed = parse_hand(hand).map_err(|_| invalid())?;
        let answer = score(&parsed, winning, &ctx)
            .map_err(|_| invalid())?
            .filter(|r| r.points > 0)
            .ok_or_else(invalid)?;
        Ok(Self {
            hand: hand.to_string(),
            glyphs,
            winning,
            ctx,
            answer,
        })
    }
}

/// The pool puzzles are drawn from.
#[derive(Debug, Clone)]
pub struct QuizCorpus {
    entries: Vec<QuizEntry>,
}

impl Default for QuizCorpus {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ENTRIES
                .iter()
                .filter_map(|line| line.parse().ok())
                .collect(),
        }
    }
}

impl QuizCorpus {
    pub fn new(entries: Vec<QuizEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&QuizEntry> {
        self.entries.choose(rng).ok_or(ResponseError::EmptyCorpus)
    }
}

/// Puzzle fields recovered from a puzzle event.
#[derive(Debug, Clone, PartialEq)]
struct Puzzle {
    hand: String,
    winning: Tile,
    ctx: WinContext,
}

/// Puzzle generation and grading for one quiz channel.
#[derive(Debug, Clone)]
pub struct QuizEngine {
    pub corpus: QuizCorpus,
    /// Root event id puzzles are posted under.
    pub channel: String,
}

impl QuizEngine {
    pub fn new(corpus: QuizCorpus, channel: impl Into<String>) -> Self {
        Self {
            corpus,
            channel: channel.into(),
        }
    }

    /// Draft of the kind 42 puzzle for `entry`.
    pub fn puzzle_draft(
        &self,
        codec: &EmojiCodec,
        entry: &QuizEntry,
        now: u64,
    ) -> Result<Draft> {
        let hand = codec.annotate(&entry.glyphs)?;
        let how = if entry.ctx.tsumo { "ツモ" } else { "ロン" };
        let code = EmojiCodec::shortcode;
        let content = format!(
            "{PUZZLE_PROMPT}\n{hand} :{}:\n{how} 場風:{}: 自風:{}:",
            code(entry.winning),
            code(entry.ctx.round_wind),
            code(entry.ctx.seat_wind),
        );
        let mut shown = codec.tokens_in(&hand)?;
        shown.extend([entry.winning, entry.ctx.round_wind, entry.ctx.seat_wind]);
        let mut tags = vec![Tag::new(["e", self.channel.as_str(), "", "root"])];
        tags.extend(emoji_tags(codec, &shown)?);
        Ok(Draft {
            content,
            kind: KIND_CHANNEL_MESSAGE,
            tags,
            created_at: now,
        })
    }

    /// Draft of the spoiler-tagged answer to the signed `puzzle`.
    pub fn answer_draft(&self, entry: &QuizEntry, puzzle: &Event) -> Draft {
        Draft {
            content: breakdown(&entry.answer).join("\n"),
            kind: KIND_CHANNEL_MESSAGE,
            tags: vec![
                Tag::new(["e", self.channel.as_str(), "", "root"]),
                Tag::new(["e", puzzle.id.as_str(), "", "reply"]),
                Tag::new(["content-warning", "答え"]),
            ],
            created_at: puzzle.created_at.saturating_add(1),
        }
    }

    /// Pick a puzzle and return it signed together with its answer.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        codec: &EmojiCodec,
        rng: &mut R,
        signer: &Signer,
        now: u64,
    ) -> Result<Vec<Event>> {
        let entry = self.corpus.choose(rng)?;
        let puzzle = signer.sign(&self.puzzle_draft(codec, entry, now)?)?;
        let answer = signer.sign(&self.answer_draft(entry, &puzzle))?;
        info!(puzzle = %puzzle.id, hand = %entry.hand, "quiz generated");
        Ok(vec![puzzle, answer])
    }

    /// Grade `event`, an answer of `points`, against the puzzle it replies to.
    ///
    /// Only puzzles signed by `author` are graded.
    pub async fn grade(
        &self,
        codec: &EmojiCodec,
        relay: &dyn RelayClient,
        author: &str,
        event: &Event,
        points: u32,
    ) -> Result<Reply> {
        let target = event
            .reply_tag()
            .or_else(|| event.root_tag())
            .and_then(|t| t.get(1));
        let Some(puzzle_id) = target else {
            return Ok(Reply::text(ASK_FOR_TARGET, thread_tags(event)));
        };
        let fetched = relay.fetch_latest(puzzle_id).await?;
        let expected = fetched
            .as_ref()
            .filter(|puzzle| puzzle.pubkey == author && verify_event(puzzle).is_ok())
            .and_then(|puzzle| decode_puzzle(codec, &puzzle.content))
            .and_then(|p| {
                let hand = parse_hand(&p.hand).ok()?;
                score(&hand, p.winning, &p.ctx).ok().flatten()
            });
        let Some(expected) = expected else {
            debug!(puzzle_id, "no puzzle behind the answer");
            return Ok(Reply::text(PUZZLE_NOT_FOUND, thread_tags(event)));
        };
        let correct = expected.points == points;
        info!(puzzle_id, points, expected = expected.points, correct, "quiz graded");
        Ok(Reply {
            content: if correct { CORRECT } else { INCORRECT }.to_string(),
            tags: fav_tags(event),
            kind: Some(KIND_REACTION),
        })
    }
}

/// Recover the puzzle from its content. `None` for anything that is not a
/// puzzle posted by [`QuizEngine::puzzle_draft`].
fn decode_puzzle(codec: &EmojiCodec, content: &str) -> Option<Puzzle> {
    let mut lines = content.lines();
    if lines.next()? != PUZZLE_PROMPT {
        return None;
    }
    let shown = codec.deannotate(lines.next()?).ok()?;
    let (hand, winning) = shown.rsplit_once(' ')?;
    let situation = codec.deannotate(lines.next()?).ok()?;
    let mut words = situation.split_whitespace();
    let tsumo = match words.next()? {
        "ツモ" => true,
        "ロン" => false,
        _ => return None,
    };
    let round_wind = tile(words.next()?.strip_prefix("場風")?)
        .ok()
        .filter(|t| t.is_wind())?;
    let seat_wind = tile(words.next()?.strip_prefix("自風")?)
        .ok()
        .filter(|t| t.is_wind())?;
    Some(Puzzle {
        hand: hand.trim().to_string(),
        winning: tile(winning).ok()?,
        ctx: WinContext {
            round_wind,
            seat_wind,
            tsumo,
        },
    })
}
