//! Yaku, fu and point calculation for a completed hand.
//!
//! Every decomposition of the hand and every reading of the winning tile is
//! scored; the most valuable interpretation wins. Riichi and dora cannot be
//! expressed in hand notation and are never counted.

use super::{
    shanten::{chiitoitsu_shanten, kokushi_shanten, shanten_of},
    tile::{Counts, Hand, MeldKind, Suit, Tile, KINDS},
    HandError,
};

/// Situation of the win.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinContext {
    pub round_wind: Tile,
    pub seat_wind: Tile,
    /// Self-drawn win; otherwise won on a discard.
    pub tsumo: bool,
}

impl Default for WinContext {
    fn default() -> Self {
        Self {
            round_wind: Tile::EAST,
            seat_wind: Tile::EAST,
            tsumo: false,
        }
    }
}

impl WinContext {
    pub fn is_dealer(&self) -> bool {
        self.seat_wind == Tile::EAST
    }
}

/// Best scoring of a winning hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreResult {
    /// Total points received; `0` when no yaku applies.
    pub points: u32,
    pub fu: u32,
    pub han: u32,
    /// Regular yaku with their han value.
    pub yaku: Vec<(&'static str, u32)>,
    /// Yakuman with their multiplier; when present `yaku` is empty.
    pub yakuman: Vec<(&'static str, u32)>,
}

/// Score `hand` completed by `winning`. Returns `Ok(None)` when the 14 tiles
/// do not form a winning hand.
pub fn score(
    hand: &Hand,
    winning: Tile,
    ctx: &WinContext,
) -> Result<Option<ScoreResult>, HandError> {
    let full = hand.with_tile(winning);
    full.check_copies()?;
    if full.tile_count() != 14 {
        return Ok(None);
    }
    let counts = full.counts();
    if shanten_of(&counts, full.melds.len()) != -1 {
        return Ok(None);
    }
    let closed = full.is_closed();
    let mut candidates = Vec::new();
    if full.melds.is_empty() && kokushi_shanten(&counts) == -1 {
        candidates.push(finish(Vec::new(), vec![("国士無双", 1)], 0, ctx));
    }
    if full.melds.is_empty() && chiitoitsu_shanten(&counts) == -1 {
        candidates.push(score_chiitoitsu(&full, ctx));
    }
    let melds: Vec<Set> = full
        .melds
        .iter()
        .map(|m| Set {
            shape: match m.kind {
                MeldKind::Chi => Shape::Sequence,
                MeldKind::Pon => Shape::Triplet,
                MeldKind::Kan => Shape::Quad,
            },
            first: m.first(),
            open: m.open,
            by_ron: false,
        })
        .collect();
    for (pair, concealed) in decompositions(&counts) {
        for form in readings(pair, &concealed, &melds, winning, ctx) {
            candidates.push(score_form(&form, closed, &counts, ctx));
        }
    }
    Ok(candidates
        .into_iter()
        .max_by_key(|r| (r.points, r.han, r.fu)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Sequence,
    Triplet,
    Quad,
}

#[derive(Debug, Clone, Copy)]
struct Set {
    shape: Shape,
    first: Tile,
    open: bool,
    /// Triplet completed by a discard; scored as an open triplet.
    by_ron: bool,
}

impl Set {
    fn tiles(&self) -> Vec<Tile> {
        match self.shape {
            Shape::Sequence => (0..3).filter_map(|k| self.first.next(k)).collect(),
            Shape::Triplet => vec![self.first; 3],
            Shape::Quad => vec![self.first; 4],
        }
    }

    fn is_pon_like(&self) -> bool {
        self.shape != Shape::Sequence
    }

    fn is_concealed_triplet(&self) -> bool {
        self.is_pon_like() && !self.open && !self.by_ron
    }

    fn has_yaochu(&self) -> bool {
        self.tiles().iter().any(|t| t.is_yaochu())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Ryanmen,
    Kanchan,
    Penchan,
    Shanpon,
    Tanki,
}

/// One reading of the hand: pair, four sets and how the last tile fit.
#[derive(Debug, Clone)]
struct Form {
    pair: Tile,
    sets: Vec<Set>,
    wait: Wait,
}

fn decompositions(counts: &Counts) -> Vec<(Tile, Vec<Set>)> {
    let mut out = Vec::new();
    let mut c = *counts;
    for pair in Tile::all() {
        if c[pair.index()] < 2 {
            continue;
        }
        c[pair.index()] -= 2;
        let mut sets = Vec::new();
        let mut found = Vec::new();
        extract_sets(&mut c, &mut sets, &mut found);
        out.extend(found.into_iter().map(|s| (pair, s)));
        c[pair.index()] += 2;
    }
    out
}

fn extract_sets(c: &mut Counts, current: &mut Vec<Set>, out: &mut Vec<Vec<Set>>) {
    let Some(i) = (0..KINDS).find(|&k| c[k] > 0) else {
        out.push(current.clone());
        return;
    };
    let Some(tile) = Tile::from_index(i) else {
        return;
    };
    if c[i] >= 3 {
        c[i] -= 3;
        current.push(Set {
            shape: Shape::Triplet,
            first: tile,
            open: false,
            by_ron: false,
        });
        extract_sets(c, current, out);
        current.pop();
        c[i] += 3;
    }
    if let (Some(b), Some(d)) = (tile.next(1), tile.next(2)) {
        if c[b.index()] > 0 && c[d.index()] > 0 {
            for k in [i, b.index(), d.index()] {
                c[k] -= 1;
            }
            current.push(Set {
                shape: Shape::Sequence,
                first: tile,
                open: false,
                by_ron: false,
            });
            extract_sets(c, current, out);
            current.pop();
            for k in [i, b.index(), d.index()] {
                c[k] += 1;
            }
        }
    }
}

/// Every way the winning tile can have completed the decomposition.
fn readings(
    pair: Tile,
    concealed: &[Set],
    melds: &[Set],
    winning: Tile,
    ctx: &WinContext,
) -> Vec<Form> {
    let build = |sets: Vec<Set>, wait| {
        let mut all = sets;
        all.extend_from_slice(melds);
        Form {
            pair,
            sets: all,
            wait,
        }
    };
    let mut out = Vec::new();
    if pair == winning {
        out.push(build(concealed.to_vec(), Wait::Tanki));
    }
    for (k, set) in concealed.iter().enumerate() {
        let wait = match set.shape {
            Shape::Triplet if set.first == winning => Wait::Shanpon,
            Shape::Sequence if set.tiles().contains(&winning) => {
                match winning.rank() - set.first.rank() {
                    1 => Wait::Kanchan,
                    0 if set.first.rank() == 7 => Wait::Penchan,
                    2 if set.first.rank() == 1 => Wait::Penchan,
                    _ => Wait::Ryanmen,
                }
            }
            _ => continue,
        };
        let mut sets = concealed.to_vec();
        if wait == Wait::Shanpon && !ctx.tsumo {
            sets[k].by_ron = true;
        }
        out.push(build(sets, wait));
    }
    out
}

fn score_form(form: &Form, closed: bool, counts: &Counts, ctx: &WinContext) -> ScoreResult {
    let tiles: Vec<Tile> = form
        .sets
        .iter()
        .flat_map(Set::tiles)
        .chain([form.pair, form.pair])
        .collect();
    let yakuman = form_yakuman(form, closed, counts, &tiles);
    if !yakuman.is_empty() {
        return finish(Vec::new(), yakuman, 0, ctx);
    }

    let mut yaku: Vec<(&'static str, u32)> = Vec::new();
    let open_penalty = |han: u32| if closed { han } else { han - 1 };
    let sequences: Vec<&Set> = form
        .sets
        .iter()
        .filter(|s| s.shape == Shape::Sequence)
        .collect();
    let triplets: Vec<&Set> = form.sets.iter().filter(|s| s.is_pon_like()).collect();
    let is_value_tile =
        |t: Tile| t.is_dragon() || t == ctx.round_wind || t == ctx.seat_wind;

    let pinfu = closed
        && sequences.len() == 4
        && !is_value_tile(form.pair)
        && form.wait == Wait::Ryanmen;

    if closed && ctx.tsumo {
        yaku.push(("門前清自摸和", 1));
    }
    if pinfu {
        yaku.push(("平和", 1));
    }
    if tiles.iter().all(|t| !t.is_yaochu()) {
        yaku.push(("断幺九", 1));
    }
    if closed {
        let mut firsts: Vec<Tile> = sequences.iter().map(|s| s.first).collect();
        firsts.sort();
        let mut peiko = 0;
        let mut k = 0;
        while k + 1 < firsts.len() {
            if firsts[k] == firsts[k + 1] {
                peiko += 1;
                k += 2;
            } else {
                k += 1;
            }
        }
        match peiko {
            2 => yaku.push(("二盃口", 3)),
            1 => yaku.push(("一盃口", 1)),
            _ => {}
        }
    }
    for set in &triplets {
        let name = match set.first {
            Tile::WHITE => Some("役牌 白"),
            Tile::GREEN => Some("役牌 發"),
            Tile::RED => Some("役牌 中"),
            _ => None,
        };
        if let Some(name) = name {
            yaku.push((name, 1));
        }
        if set.first == ctx.round_wind {
            yaku.push(("場風牌", 1));
        }
        if set.first == ctx.seat_wind {
            yaku.push(("自風牌", 1));
        }
    }
    let has_seq = |suit: Suit, rank: u8| {
        sequences
            .iter()
            .any(|s| Tile::new(suit, rank) == Some(s.first))
    };
    if (1..=7).any(|r| [Suit::Man, Suit::Pin, Suit::Sou].iter().all(|&s| has_seq(s, r))) {
        yaku.push(("三色同順", open_penalty(2)));
    }
    if [Suit::Man, Suit::Pin, Suit::Sou]
        .iter()
        .any(|&s| [1, 4, 7].iter().all(|&r| has_seq(s, r)))
    {
        yaku.push(("一気通貫", open_penalty(2)));
    }
    let all_blocks_yaochu = form.sets.iter().all(Set::has_yaochu) && form.pair.is_yaochu();
    if all_blocks_yaochu && !sequences.is_empty() {
        if tiles.iter().any(|t| t.is_honor()) {
            yaku.push(("混全帯幺九", open_penalty(2)));
        } else {
            yaku.push(("純全帯幺九", open_penalty(3)));
        }
    }
    if triplets.len() == 4 {
        yaku.push(("対々和", 2));
    }
    if form.sets.iter().filter(|s| s.is_concealed_triplet()).count() == 3 {
        yaku.push(("三暗刻", 2));
    }
    let has_pon = |suit: Suit, rank: u8| {
        triplets
            .iter()
            .any(|s| Tile::new(suit, rank) == Some(s.first))
    };
    if (1..=9).any(|r| [Suit::Man, Suit::Pin, Suit::Sou].iter().all(|&s| has_pon(s, r))) {
        yaku.push(("三色同刻", 2));
    }
    if form.sets.iter().filter(|s| s.shape == Shape::Quad).count() == 3 {
        yaku.push(("三槓子", 2));
    }
    if tiles.iter().all(|t| t.is_yaochu()) {
        yaku.push(("混老頭", 2));
    }
    let dragon_sets = triplets.iter().filter(|s| s.first.is_dragon()).count();
    if dragon_sets == 2 && form.pair.is_dragon() {
        yaku.push(("小三元", 2));
    }
    push_flush(&mut yaku, &tiles, closed);

    let fu = if pinfu {
        if ctx.tsumo {
            20
        } else {
            30
        }
    } else {
        form_fu(form, closed, ctx)
    };
    finish(yaku, Vec::new(), fu, ctx)
}

fn push_flush(yaku: &mut Vec<(&'static str, u32)>, tiles: &[Tile], closed: bool) {
    let mut suits: Vec<Suit> = tiles
        .iter()
        .filter(|t| !t.is_honor())
        .map(|t| t.suit())
        .collect();
    suits.sort();
    suits.dedup();
    let honors = tiles.iter().any(|t| t.is_honor());
    let penalty = u32::from(!closed);
    match (suits.len(), honors) {
        (1, false) => yaku.push(("清一色", 6 - penalty)),
        (1, true) => yaku.push(("混一色", 3 - penalty)),
        _ => {}
    }
}

fn form_yakuman(
    form: &Form,
    closed: bool,
    counts: &Counts,
    tiles: &[Tile],
) -> Vec<(&'static str, u32)> {
    let mut out = Vec::new();
    let triplets: Vec<&Set> = form.sets.iter().filter(|s| s.is_pon_like()).collect();
    if form.sets.iter().filter(|s| s.is_concealed_triplet()).count() == 4 {
        out.push(("四暗刻", 1));
    }
    if triplets.iter().filter(|s| s.first.is_dragon()).count() == 3 {
        out.push(("大三元", 1));
    }
    let wind_sets = triplets.iter().filter(|s| s.first.is_wind()).count();
    if wind_sets == 4 {
        out.push(("大四喜", 2));
    } else if wind_sets == 3 && form.pair.is_wind() {
        out.push(("小四喜", 1));
    }
    if tiles.iter().all(|t| t.is_honor()) {
        out.push(("字一色", 1));
    }
    if tiles.iter().all(|t| t.is_terminal()) {
        out.push(("清老頭", 1));
    }
    if tiles.iter().all(|t| is_green(*t)) {
        out.push(("緑一色", 1));
    }
    if form.sets.iter().filter(|s| s.shape == Shape::Quad).count() == 4 {
        out.push(("四槓子", 1));
    }
    if closed && form.sets.iter().all(|s| s.shape != Shape::Quad) && is_nine_gates(counts) {
        out.push(("九蓮宝燈", 1));
    }
    out
}

fn is_green(t: Tile) -> bool {
    t == Tile::GREEN || (t.suit() == Suit::Sou && matches!(t.rank(), 2 | 3 | 4 | 6 | 8))
}

fn is_nine_gates(counts: &Counts) -> bool {
    [Suit::Man, Suit::Pin, Suit::Sou].iter().any(|&suit| {
        let Some(base) = Tile::new(suit, 1).map(Tile::index) else {
            return false;
        };
        let total: u8 = counts.iter().sum();
        let in_suit: u8 = counts[base..base + 9].iter().sum();
        in_suit == total
            && (0..9).all(|r| {
                let need = if r == 0 || r == 8 { 3 } else { 1 };
                counts[base + r] >= need
            })
    })
}

fn score_chiitoitsu(full: &Hand, ctx: &WinContext) -> ScoreResult {
    let tiles = full.all_tiles();
    if tiles.iter().all(|t| t.is_honor()) {
        return finish(Vec::new(), vec![("字一色", 1)], 0, ctx);
    }
    let mut yaku = vec![("七対子", 2)];
    if ctx.tsumo {
        yaku.push(("門前清自摸和", 1));
    }
    if tiles.iter().all(|t| !t.is_yaochu()) {
        yaku.push(("断幺九", 1));
    }
    if tiles.iter().all(|t| t.is_yaochu()) {
        yaku.push(("混老頭", 2));
    }
    push_flush(&mut yaku, &tiles, true);
    finish(yaku, Vec::new(), 25, ctx)
}

fn form_fu(form: &Form, closed: bool, ctx: &WinContext) -> u32 {
    let mut fu: u32 = 20;
    if closed && !ctx.tsumo {
        fu += 10;
    }
    if ctx.tsumo {
        fu += 2;
    }
    if matches!(form.wait, Wait::Kanchan | Wait::Penchan | Wait::Tanki) {
        fu += 2;
    }
    if form.pair.is_dragon() {
        fu += 2;
    }
    if form.pair == ctx.round_wind {
        fu += 2;
    }
    if form.pair == ctx.seat_wind {
        fu += 2;
    }
    for set in form.sets.iter().filter(|s| s.is_pon_like()) {
        let mut value = if set.first.is_yaochu() { 4 } else { 2 };
        if set.is_concealed_triplet() {
            value *= 2;
        }
        if set.shape == Shape::Quad {
            value *= 4;
        }
        fu += value;
    }
    if !closed && fu == 20 {
        return 30;
    }
    fu.div_ceil(10) * 10
}

fn finish(
    yaku: Vec<(&'static str, u32)>,
    yakuman: Vec<(&'static str, u32)>,
    fu: u32,
    ctx: &WinContext,
) -> ScoreResult {
    let han: u32 = yaku.iter().map(|(_, h)| h).sum();
    let base = if !yakuman.is_empty() {
        8000 * yakuman.iter().map(|(_, m)| m).sum::<u32>()
    } else if han == 0 {
        0
    } else {
        base_points(fu, han)
    };
    ScoreResult {
        points: payment(base, ctx),
        fu,
        han,
        yaku,
        yakuman,
    }
}

fn base_points(fu: u32, han: u32) -> u32 {
    match han {
        0..=4 => (fu << (han + 2)).min(2000),
        5 => 2000,
        6 | 7 => 3000,
        8..=10 => 4000,
        11 | 12 => 6000,
        _ => 8000,
    }
}

fn round_up(points: u32) -> u32 {
    points.div_ceil(100) * 100
}

fn payment(base: u32, ctx: &WinContext) -> u32 {
    match (ctx.tsumo, ctx.is_dealer()) {
        (false, true) => round_up(base * 6),
        (false, false) => round_up(base * 4),
        (true, true) => 3 * round_up(base * 2),
        (true, false) => 2 * round_up(base) + round_up(base * 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mahjong::parse_hand;

    fn ctx(round: &str, seat: &str, tsumo: bool) -> WinContext {
        WinContext {
            round_wind: round.parse().unwrap(),
            seat_wind: seat.parse().unwrap(),
            tsumo,
        }
    }

    fn run(hand: &str, winning: &str, ctx: WinContext) -> Option<ScoreResult> {
        score(&parse_hand(hand).unwrap(), winning.parse().unwrap(), &ctx).unwrap()
    }

    fn names(r: &ScoreResult) -> Vec<&'static str> {
        r.yaku.iter().map(|(n, _)| *n).collect()
    }

    #[test]
    fn dealer_pinfu_tanyao_ron() {
        let r = run("234m567m2355p678s", "4p", ctx("1z", "1z", false)).unwrap();
        assert_eq!(names(&r), vec!["平和", "断幺九"]);
        assert_eq!((r.fu, r.han, r.points), (30, 2, 2900));
    }

    #[test]
    fn non_dealer_ittsu_tsumo() {
        let r = run("123456789m2299p", "2p", ctx("1z", "2z", true)).unwrap();
        assert_eq!(names(&r), vec!["門前清自摸和", "一気通貫"]);
        assert_eq!((r.fu, r.han, r.points), (30, 3, 4000));
    }

    #[test]
    fn chiitoitsu_uses_fixed_fu() {
        let r = run("1133m55p77p99s11z2z", "2z", ctx("1z", "1z", true)).unwrap();
        assert_eq!(names(&r), vec!["七対子", "門前清自摸和"]);
        assert_eq!((r.fu, r.han, r.points), (25, 3, 4800));
    }

    #[test]
    fn open_tanyao_gets_thirty_fu() {
        let r = run("<234m>456p78s234s55p", "6s", ctx("1z", "2z", false)).unwrap();
        assert_eq!(names(&r), vec!["断幺九"]);
        assert_eq!((r.fu, r.han, r.points), (30, 1, 1000));
    }

    #[test]
    fn ron_on_shanpon_is_an_open_triplet() {
        let r = run("<222m><555p>777s99s11z", "1z", ctx("1z", "2z", false)).unwrap();
        assert_eq!(names(&r), vec!["場風牌", "対々和"]);
        assert_eq!((r.fu, r.han, r.points), (40, 3, 5200));
    }

    #[test]
    fn suuankou_is_yakuman() {
        let r = run("222m333p444s555s7z", "7z", ctx("2z", "3z", false)).unwrap();
        assert_eq!(r.yakuman, vec![("四暗刻", 1)]);
        assert!(r.yaku.is_empty());
        assert_eq!(r.points, 32000);
    }

    #[test]
    fn nine_gates_dealer_tsumo() {
        let r = run("1112345678999m", "5m", ctx("1z", "1z", true)).unwrap();
        assert_eq!(r.yakuman, vec![("九蓮宝燈", 1)]);
        assert_eq!(r.points, 48000);
    }

    #[test]
    fn honitsu_reaches_mangan() {
        let r = run("111p234p678p9p555z", "9p", ctx("2z", "2z", false)).unwrap();
        assert!(names(&r).contains(&"混一色"));
        assert!(names(&r).contains(&"役牌 白"));
        assert_eq!(r.points, 8000);
    }

    #[test]
    fn kokushi() {
        let r = run("19m19p19s1234567z", "1m", ctx("1z", "2z", false)).unwrap();
        assert_eq!(r.yakuman, vec![("国士無双", 1)]);
        assert_eq!(r.points, 32000);
    }

    #[test]
    fn incomplete_hand_is_none() {
        assert!(run("123m456p789s11z", "1z", WinContext::default()).is_none());
        assert!(run("123456789m1122p", "5s", WinContext::default()).is_none());
    }

    #[test]
    fn complete_hand_without_yaku_scores_zero() {
        let r = run("<123m>456p789s234s5p", "5p", ctx("1z", "2z", false)).unwrap();
        assert!(r.yaku.is_empty());
        assert_eq!(r.points, 0);
    }

    #[test]
    fn fifth_copy_is_rejected() {
        let hand = parse_hand("1111m234p567s789s2z").unwrap();
        assert_eq!(
            score(&hand, "1m".parse().unwrap(), &WinContext::default()),
            Err(HandError::TooManyCopies("1m".into()))
        );
    }

    #[test]
    fn payment_table() {
        let ron = ctx("1z", "2z", false);
        let tsumo = ctx("1z", "2z", true);
        assert_eq!(payment(480, &ron), 2000);
        assert_eq!(payment(960, &tsumo), 4000);
        assert_eq!(base_points(30, 4), 1920);
        assert_eq!(base_points(40, 4), 2000);
        assert_eq!(base_points(30, 13), 8000);
    }
}
