//! Tiles, melds and the hand notation parser.
//!
//! Hands are written as `<rank><suit>` tokens, either expanded (`1m2m3m`) or
//! compressed (`123m`). `<...>` wraps an open meld and `(...)` a concealed
//! kan, e.g. `234p55s<111z>(9999m)`.

use std::{fmt, str::FromStr};

use super::HandError;

/// Number of distinct tile kinds.
pub const KINDS: usize = 34;

/// Per-kind tile counts indexed by [`Tile::index`].
pub type Counts = [u8; KINDS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Man,
    Pin,
    Sou,
    Honor,
}

impl Suit {
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'm' => Some(Suit::Man),
            'p' => Some(Suit::Pin),
            's' => Some(Suit::Sou),
            'z' => Some(Suit::Honor),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Suit::Man => 'm',
            Suit::Pin => 'p',
            Suit::Sou => 's',
            Suit::Honor => 'z',
        }
    }

    fn offset(self) -> u8 {
        match self {
            Suit::Man => 0,
            Suit::Pin => 9,
            Suit::Sou => 18,
            Suit::Honor => 27,
        }
    }

    fn max_rank(self) -> u8 {
        if self == Suit::Honor {
            7
        } else {
            9
        }
    }
}

/// One tile kind, stored as an index in `0..34`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile(u8);

impl Tile {
    pub const EAST: Tile = Tile(27);
    pub const SOUTH: Tile = Tile(28);
    pub const WEST: Tile = Tile(29);
    pub const NORTH: Tile = Tile(30);
    pub const WHITE: Tile = Tile(31);
    pub const GREEN: Tile = Tile(32);
    pub const RED: Tile = Tile(33);

    pub fn new(suit: Suit, rank: u8) -> Option<Self> {
        if rank == 0 || rank > suit.max_rank() {
            return None;
        }
        Some(Tile(suit.offset() + rank - 1))
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        (idx < KINDS).then_some(Tile(idx as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn suit(self) -> Suit {
        match self.0 {
            0..=8 => Suit::Man,
            9..=17 => Suit::Pin,
            18..=26 => Suit::Sou,
            _ => Suit::Honor,
        }
    }

    /// 1-based rank within the suit.
    pub fn rank(self) -> u8 {
        self.0 - self.suit().offset() + 1
    }

    pub fn is_honor(self) -> bool {
        self.suit() == Suit::Honor
    }

    pub fn is_terminal(self) -> bool {
        !self.is_honor() && (self.rank() == 1 || self.rank() == 9)
    }

    /// Terminal or honor.
    pub fn is_yaochu(self) -> bool {
        self.is_honor() || self.is_terminal()
    }

    pub fn is_dragon(self) -> bool {
        self.0 >= Tile::WHITE.0
    }

    pub fn is_wind(self) -> bool {
        self.is_honor() && !self.is_dragon()
    }

    /// Tile `steps` ranks above this one in the same suit.
    pub fn next(self, steps: u8) -> Option<Tile> {
        if self.is_honor() {
            return None;
        }
        Tile::new(self.suit(), self.rank() + steps)
    }

    pub fn all() -> impl Iterator<Item = Tile> {
        (0..KINDS as u8).map(Tile)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank(), self.suit().letter())
    }
}

impl FromStr for Tile {
    type Err = HandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(r), Some(c), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(HandError::UnknownToken(s.to_string()));
        };
        r.to_digit(10)
            .zip(Suit::from_letter(c))
            .and_then(|(rank, suit)| Tile::new(suit, rank as u8))
            .ok_or_else(|| HandError::UnknownToken(s.to_string()))
    }
}

/// A lexical element of hand notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glyph {
    /// Two-character `<rank><suit>` token; not yet validated as a real tile.
    Token(String),
    /// One of `<`, `>`, `(`, `)`.
    Bracket(char),
}

/// Split hand notation into tokens and brackets, expanding compressed runs.
///
/// Ranks are only checked to be digits here so that callers can report the
/// exact token (`8z`, `0m`) that is not a real tile.
pub fn glyphs(text: &str) -> Result<Vec<Glyph>, HandError> {
    let mut out = Vec::new();
    let mut ranks = String::new();
    for c in text.chars() {
        match c {
            '0'..='9' => ranks.push(c),
            'm' | 'p' | 's' | 'z' => {
                if ranks.is_empty() {
                    return Err(HandError::Malformed(format!("suit `{c}` without rank")));
                }
                out.extend(ranks.drain(..).map(|r| Glyph::Token(format!("{r}{c}"))));
            }
            '<' | '>' | '(' | ')' => {
                if !ranks.is_empty() {
                    return Err(HandError::Malformed(format!("ranks `{ranks}` without suit")));
                }
                out.push(Glyph::Bracket(c));
            }
            other => return Err(HandError::Malformed(format!("unexpected `{other}`"))),
        }
    }
    if !ranks.is_empty() {
        return Err(HandError::Malformed(format!("ranks `{ranks}` without suit")));
    }
    Ok(out)
}

/// Parse every token of `text` as a tile, ignoring brackets.
#[cfg(test)]
pub fn tiles_in(text: &str) -> Result<Vec<Tile>, HandError> {
    glyphs(text)?
        .into_iter()
        .filter_map(|g| match g {
            Glyph::Token(t) => Some(t.parse()),
            Glyph::Bracket(_) => None,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeldKind {
    Chi,
    Pon,
    Kan,
}

/// A called or declared set outside the concealed part of the hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meld {
    pub kind: MeldKind,
    /// Sorted tiles of the meld.
    pub tiles: Vec<Tile>,
    /// `false` only for a concealed kan.
    pub open: bool,
}

impl Meld {
    fn from_tiles(mut tiles: Vec<Tile>, open: bool) -> Result<Self, HandError> {
        tiles.sort();
        let same = tiles.windows(2).all(|w| w[0] == w[1]);
        let kind = match tiles.len() {
            3 if same => MeldKind::Pon,
            3 if tiles[0].next(1) == Some(tiles[1]) && tiles[0].next(2) == Some(tiles[2]) => {
                MeldKind::Chi
            }
            4 if same => MeldKind::Kan,
            _ => {
                let shown: String = tiles.iter().map(Tile::to_string).collect();
                return Err(HandError::Malformed(format!("invalid meld `{shown}`")));
            }
        };
        if !open && kind != MeldKind::Kan {
            return Err(HandError::Malformed("only a kan may be concealed".into()));
        }
        Ok(Self { kind, tiles, open })
    }

    pub fn first(&self) -> Tile {
        self.tiles[0]
    }
}

/// Concealed tiles plus declared melds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Hand {
    /// Sorted concealed tiles.
    pub concealed: Vec<Tile>,
    pub melds: Vec<Meld>,
}

impl Hand {
    /// Size of the hand with every kan counted as three tiles.
    pub fn tile_count(&self) -> usize {
        self.concealed.len() + 3 * self.melds.len()
    }

    /// True unless some meld was called from another player.
    pub fn is_closed(&self) -> bool {
        self.melds.iter().all(|m| !m.open)
    }

    /// Counts of the concealed part only.
    pub fn counts(&self) -> Counts {
        let mut c = [0u8; KINDS];
        for t in &self.concealed {
            c[t.index()] += 1;
        }
        c
    }

    /// Counts of every tile in the hand, melds included.
    pub fn visible_counts(&self) -> Counts {
        let mut c = self.counts();
        for t in self.melds.iter().flat_map(|m| &m.tiles) {
            c[t.index()] += 1;
        }
        c
    }

    /// Copy of the hand with `tile` added to the concealed part.
    pub fn with_tile(&self, tile: Tile) -> Hand {
        let mut hand = self.clone();
        hand.concealed.push(tile);
        hand.concealed.sort();
        hand
    }

    /// Every tile of the hand in notation order, melds last.
    pub fn all_tiles(&self) -> Vec<Tile> {
        let mut out = self.concealed.clone();
        out.extend(self.melds.iter().flat_map(|m| m.tiles.iter().copied()));
        out
    }

    pub(crate) fn check_copies(&self) -> Result<(), HandError> {
        let counts = self.visible_counts();
        match Tile::all().find(|t| counts[t.index()] > 4) {
            Some(t) => Err(HandError::TooManyCopies(t.to_string())),
            None => Ok(()),
        }
    }
}

/// Parse hand notation into concealed tiles and melds.
pub fn parse_hand(text: &str) -> Result<Hand, HandError> {
    let mut hand = Hand::default();
    // (closing bracket, tiles collected so far) while inside a meld
    let mut group: Option<(char, Vec<Tile>)> = None;
    for glyph in glyphs(text)? {
        match glyph {
            Glyph::Token(tok) => {
                let tile: Tile = tok.parse()?;
                match group.as_mut() {
                    Some((_, tiles)) => tiles.push(tile),
                    None => hand.concealed.push(tile),
                }
            }
            Glyph::Bracket(open @ ('<' | '(')) => {
                if group.is_some() {
                    return Err(HandError::Malformed("nested meld".into()));
                }
                let close = if open == '<' { '>' } else { ')' };
                group = Some((close, Vec::new()));
            }
            Glyph::Bracket(close) => match group.take() {
                Some((expected, tiles)) if expected == close => {
                    hand.melds.push(Meld::from_tiles(tiles, close == '>')?);
                }
                _ => return Err(HandError::Malformed(format!("unbalanced `{close}`"))),
            },
        }
    }
    if group.is_some() {
        return Err(HandError::Malformed("unclosed meld".into()));
    }
    hand.concealed.sort();
    hand.check_copies()?;
    Ok(hand)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Tile {
        s.parse().unwrap()
    }

    #[test]
    fn tile_properties() {
        assert_eq!(t("1m").index(), 0);
        assert_eq!(t("9s").index(), 26);
        assert_eq!(t("1z"), Tile::EAST);
        assert_eq!(t("7z"), Tile::RED);
        assert!(t("9p").is_terminal());
        assert!(t("5z").is_dragon());
        assert!(t("4z").is_wind());
        assert!(!t("5m").is_yaochu());
        assert_eq!(t("8m").next(1), Some(t("9m")));
        assert_eq!(t("9m").next(1), None);
        assert_eq!(Tile::all().count(), 34);
    }

    #[test]
    fn display_round_trips() {
        for tile in Tile::all() {
            assert_eq!(tile.to_string().parse::<Tile>().unwrap(), tile);
        }
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert_eq!("8z".parse::<Tile>(), Err(HandError::UnknownToken("8z".into())));
        assert!("0m".parse::<Tile>().is_err());
        assert!("1x".parse::<Tile>().is_err());
    }

    #[test]
    fn compressed_and_expanded_notation_agree() {
        let a = parse_hand("123456789m11222p").unwrap();
        let b = parse_hand("1m2m3m4m5m6m7m8m9m1p1p2p2p2p").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.tile_count(), 14);
    }

    #[test]
    fn parses_melds() {
        let hand = parse_hand("234p55s<111z>(9999m)<3s2s4s>").unwrap();
        assert_eq!(hand.concealed.len(), 5);
        assert_eq!(hand.melds.len(), 3);
        assert_eq!(hand.melds[0].kind, MeldKind::Pon);
        assert!(hand.melds[0].open);
        assert_eq!(hand.melds[1].kind, MeldKind::Kan);
        assert!(!hand.melds[1].open);
        assert_eq!(hand.melds[2].kind, MeldKind::Chi);
        assert_eq!(hand.melds[2].first(), t("2s"));
        assert_eq!(hand.tile_count(), 14);
        assert!(!hand.is_closed());
    }

    #[test]
    fn malformed_hands_fail() {
        assert!(matches!(parse_hand("123"), Err(HandError::Malformed(_))));
        assert!(matches!(parse_hand("<12m"), Err(HandError::Malformed(_))));
        assert!(matches!(parse_hand("(111m)"), Err(HandError::Malformed(_))));
        assert!(matches!(parse_hand("<135m>"), Err(HandError::Malformed(_))));
        assert!(matches!(parse_hand("<12m>3m"), Err(HandError::Malformed(_))));
        assert_eq!(
            parse_hand("11111m"),
            Err(HandError::TooManyCopies("1m".into()))
        );
        assert_eq!(parse_hand("18z"), Err(HandError::UnknownToken("8z".into())));
    }

    #[test]
    fn glyphs_keep_brackets() {
        let g = glyphs("1<23m>").unwrap_err();
        assert!(matches!(g, HandError::Malformed(_)));
        let g = glyphs("<23m>").unwrap();
        assert_eq!(
            g,
            vec![
                Glyph::Bracket('<'),
                Glyph::Token("2m".into()),
                Glyph::Token("3m".into()),
                Glyph::Bracket('>'),
            ]
        );
    }
}
