//! Distance-to-win and wait calculation.

use std::collections::HashSet;

use super::{
    tile::{Counts, Hand, Suit, Tile, KINDS},
    HandError,
};

/// Shanten number of a 13 or 14 tile hand: `-1` is a complete hand, `0` is
/// ready. Seven pairs and thirteen orphans count only for meld-free hands.
pub fn shanten(hand: &Hand) -> Result<i32, HandError> {
    let found = hand.tile_count();
    if found != 13 && found != 14 {
        return Err(HandError::WrongLength {
            expected: "13 or 14",
            found,
        });
    }
    hand.check_copies()?;
    Ok(shanten_of(&hand.counts(), hand.melds.len()))
}

/// Tiles that would complete a ready 13-tile hand. Tiles whose four copies
/// are already in the hand are left out.
pub fn machi(hand: &Hand) -> Result<Vec<Tile>, HandError> {
    let found = hand.tile_count();
    if found != 13 {
        return Err(HandError::WrongLength {
            expected: "13",
            found,
        });
    }
    hand.check_copies()?;
    let visible = hand.visible_counts();
    let mut counts = hand.counts();
    let mut waits = Vec::new();
    for tile in Tile::all() {
        if visible[tile.index()] >= 4 {
            continue;
        }
        counts[tile.index()] += 1;
        if shanten_of(&counts, hand.melds.len()) == -1 {
            waits.push(tile);
        }
        counts[tile.index()] -= 1;
    }
    Ok(waits)
}

pub(crate) fn shanten_of(counts: &Counts, melds: usize) -> i32 {
    let regular = regular_shanten(counts, melds);
    if melds > 0 {
        return regular;
    }
    regular.min(chiitoitsu_shanten(counts)).min(kokushi_shanten(counts))
}

pub(crate) fn chiitoitsu_shanten(counts: &Counts) -> i32 {
    let pairs = counts.iter().filter(|&&c| c >= 2).count() as i32;
    let kinds = counts.iter().filter(|&&c| c >= 1).count() as i32;
    6 - pairs + (7 - kinds).max(0)
}

pub(crate) fn kokushi_shanten(counts: &Counts) -> i32 {
    let orphans: Vec<usize> = Tile::all()
        .filter(|t| t.is_yaochu())
        .map(Tile::index)
        .collect();
    let kinds = orphans.iter().filter(|&&i| counts[i] >= 1).count() as i32;
    let pair = orphans.iter().any(|&i| counts[i] >= 2);
    13 - kinds - i32::from(pair)
}

fn regular_shanten(counts: &Counts, melds: usize) -> i32 {
    let mut best = block_shanten(counts, melds, false);
    let mut c = *counts;
    for i in 0..KINDS {
        if c[i] >= 2 {
            c[i] -= 2;
            best = best.min(block_shanten(&c, melds, true));
            c[i] += 2;
        }
    }
    best
}

/// Best shanten with the pair already decided, combining per-suit
/// (sets, partial sets) options.
fn block_shanten(counts: &Counts, melds: usize, pair: bool) -> i32 {
    let mut combos: HashSet<(usize, usize)> = HashSet::from([(melds, 0)]);
    for suit in [Suit::Man, Suit::Pin, Suit::Sou] {
        let start = Tile::new(suit, 1).map(Tile::index).unwrap_or_default();
        let mut slice = [0u8; 9];
        slice.copy_from_slice(&counts[start..start + 9]);
        let mut options = HashSet::new();
        suit_blocks(&mut slice, 0, 0, 0, &mut options);
        combos = combos
            .iter()
            .flat_map(|&(s, p)| options.iter().map(move |&(os, op)| (s + os, p + op)))
            .collect();
    }
    let honors = &counts[Tile::EAST.index()..];
    let honor_sets = honors.iter().filter(|&&c| c >= 3).count();
    let honor_pairs = honors.iter().filter(|&&c| c == 2).count();
    combos
        .into_iter()
        .map(|(s, p)| {
            let sets = (s + honor_sets).min(4);
            let partials = (p + honor_pairs).min(4 - sets);
            8 - 2 * sets as i32 - partials as i32 - i32::from(pair)
        })
        .min()
        .unwrap_or(8)
}

/// Enumerate (sets, partials) reachable in one numbered suit.
fn suit_blocks(
    c: &mut [u8; 9],
    i: usize,
    sets: usize,
    partials: usize,
    out: &mut HashSet<(usize, usize)>,
) {
    let Some(i) = (i..9).find(|&k| c[k] > 0) else {
        out.insert((sets, partials));
        return;
    };
    if c[i] >= 3 {
        c[i] -= 3;
        suit_blocks(c, i, sets + 1, partials, out);
        c[i] += 3;
    }
    if i + 2 < 9 && c[i + 1] > 0 && c[i + 2] > 0 {
        take(c, &[i, i + 1, i + 2]);
        suit_blocks(c, i, sets + 1, partials, out);
        give(c, &[i, i + 1, i + 2]);
    }
    if c[i] >= 2 {
        c[i] -= 2;
        suit_blocks(c, i, sets, partials + 1, out);
        c[i] += 2;
    }
    if i + 1 < 9 && c[i + 1] > 0 {
        take(c, &[i, i + 1]);
        suit_blocks(c, i, sets, partials + 1, out);
        give(c, &[i, i + 1]);
    }
    if i + 2 < 9 && c[i + 2] > 0 {
        take(c, &[i, i + 2]);
        suit_blocks(c, i, sets, partials + 1, out);
        give(c, &[i, i + 2]);
    }
    // leave the remaining copies of `i` isolated
    let held = c[i];
    c[i] = 0;
    suit_blocks(c, i + 1, sets, partials, out);
    c[i] = held;
}

fn take(c: &mut [u8; 9], idx: &[usize]) {
    for &i in idx {
        c[i] -= 1;
    }
}

fn give(c: &mut [u8; 9], idx: &[usize]) {
    for &i in idx {
        c[i] += 1;
    }
}
