//! Partition search over concealed tiles.
//!
//! A regular split takes the lowest remaining tile and tries every meld it
//! can start: pung, pair (once), chow. Forcing the lowest tile keeps each
//! partition unique.

use smallvec::SmallVec;

use crate::tiles::{Meld, Suit, Tile};

/// Melds of one split. Four melds and a pair at most.
pub type Split = SmallVec<[Meld; 5]>;

/// Every split of sorted `tiles` into pungs/chows and exactly one pair.
#[must_use]
pub fn regular_splits(tiles: &[Tile]) -> Vec<Split> {
    let mut out = Vec::new();
    if tiles.len() % 3 == 2 {
        let mut rest = tiles.to_vec();
        rest.sort_unstable();
        search(&mut rest, false, &mut Split::new(), &mut out, false);
    }
    out
}

/// Whether sorted `tiles` split into pungs/chows and one pair.
#[must_use]
pub fn has_regular_split(tiles: &[Tile]) -> bool {
    if tiles.len() % 3 != 2 {
        return false;
    }
    let mut rest = tiles.to_vec();
    rest.sort_unstable();
    let mut out = Vec::new();
    search(&mut rest, false, &mut Split::new(), &mut out, true)
}

fn take(rest: &mut Vec<Tile>, tile: Tile, n: usize) -> bool {
    if rest.iter().filter(|t| **t == tile).count() < n {
        return false;
    }
    for _ in 0..n {
        if let Some(i) = rest.iter().position(|t| *t == tile) {
            rest.remove(i);
        }
    }
    true
}

fn give(rest: &mut Vec<Tile>, tiles: &[Tile]) {
    for tile in tiles {
        let at = rest.partition_point(|t| t <= tile);
        rest.insert(at, *tile);
    }
}

/// Returns true when `first_only` and a split was found.
fn search(rest: &mut Vec<Tile>, have_pair: bool, current: &mut Split, out: &mut Vec<Split>, first_only: bool) -> bool {
    let Some(&low) = rest.first() else {
        if have_pair {
            out.push(current.clone());
            return first_only;
        }
        return false;
    };

    let mut candidates: SmallVec<[(Meld, bool); 3]> = SmallVec::new();
    candidates.push((Meld::pung(low, true), have_pair));
    if !have_pair {
        candidates.push((Meld::pair(low, true), true));
    }
    if let Some(chow) = Meld::chow(low, true) {
        candidates.push((chow, have_pair));
    }

    for (meld, pair_after) in candidates {
        let mut taken: SmallVec<[Tile; 3]> = SmallVec::new();
        let complete = meld.tiles().iter().all(|t| {
            let ok = take(rest, *t, 1);
            if ok {
                taken.push(*t);
            }
            ok
        });
        if complete {
            current.push(meld);
            let done = search(rest, pair_after, current, out, first_only);
            current.pop();
            if done {
                give(rest, &taken);
                return true;
            }
        }
        give(rest, &taken);
    }
    false
}

/// One of each terminal and honour plus a duplicate of one of them.
#[must_use]
pub fn is_thirteen_orphans(tiles: &[Tile]) -> bool {
    if tiles.len() != 14 {
        return false;
    }
    let mut distinct: Vec<Tile> = tiles.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    distinct == orphans()
}

/// The thirteen tiles an orphans hand needs, sorted.
fn orphans() -> Vec<Tile> {
    let mut tiles: Vec<Tile> = Suit::SUITED
        .iter()
        .flat_map(|suit| [1, 9].into_iter().filter_map(move |r| Tile::new(*suit, r)))
        .collect();
    tiles.extend(Tile::full_set(false).into_iter().filter(|t| t.is_honour()));
    tiles.sort_unstable();
    tiles.dedup();
    tiles
}

/// Greedy split for hands that are not complete: pungs of every triple and
/// kong-sized run, pairs of every double. Remaining tiles stay loose.
#[must_use]
pub fn greedy_split(tiles: &[Tile]) -> Split {
    let mut sorted = tiles.to_vec();
    sorted.sort_unstable();
    let mut melds = Split::new();
    let mut i = 0;
    while i < sorted.len() {
        let tile = sorted[i];
        let run = sorted[i..].iter().take_while(|t| **t == tile).count();
        match run {
            n if n >= 3 => melds.push(Meld::pung(tile, true)),
            2 => melds.push(Meld::pair(tile, true)),
            _ => {}
        }
        i += run;
    }
    melds
}
