//! Melds: pairs, chows, pungs and kongs.
//!
//! ## Invariants
//!
//! - Chow: three consecutive ranks of one suited suit
//! - Pung / Kong: three / four identical tiles
//! - Pair: two identical tiles
//! - No bonus tile is ever part of a meld
//!
//! A kong remembers where it came from ([`KongOrigin`]); scoring does not
//! distinguish the exposed origins but robbing the kong does.
//!
//! ## Text form
//!
//! Concatenated tiles, upper-case when concealed (`S5S5S5`), lower-case when
//! exposed (`b1b2b3`). Kongs carry an origin suffix: `:p` extended pung,
//! `:d` claimed discard, `:c` concealed.

use super::tile::{parse_tiles, Tile, TileParseError};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeldKind {
    Pair,
    Chow,
    Pung,
    Kong,
}

impl MeldKind {
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            MeldKind::Pair => 2,
            MeldKind::Chow | MeldKind::Pung => 3,
            MeldKind::Kong => 4,
        }
    }
}

impl std::fmt::Display for MeldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MeldKind::Pair => "Pair",
            MeldKind::Chow => "Chow",
            MeldKind::Pung => "Pung",
            MeldKind::Kong => "Kong",
        };
        write!(f, "{name}")
    }
}

/// How a kong came together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KongOrigin {
    /// A fourth tile added to an exposed pung.
    ExtendedPung,
    /// Three concealed tiles plus a claimed discard.
    ClaimedDiscard,
    /// Four concealed tiles declared by their holder.
    Concealed,
}

impl KongOrigin {
    const fn suffix(self) -> char {
        match self {
            KongOrigin::ExtendedPung => 'p',
            KongOrigin::ClaimedDiscard => 'd',
            KongOrigin::Concealed => 'c',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MeldError {
    #[error("{0} tiles cannot form a meld")]
    WrongSize(usize),

    #[error("tiles {0} do not form a meld")]
    NotAMeld(String),

    #[error("bonus tile {0} cannot be part of a meld")]
    BonusTile(Tile),

    #[error("meld text mixes concealed and exposed tiles: {0}")]
    MixedCase(String),

    #[error(transparent)]
    Tile(#[from] TileParseError),
}

/// A validated group of tiles.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Meld {
    kind: MeldKind,
    tiles: SmallVec<[Tile; 4]>,
    concealed: bool,
    kong_origin: Option<KongOrigin>,
}

impl Meld {
    /// Build a meld from tiles, inferring its kind.
    ///
    /// Chow tiles may come in any order; they are stored ascending. A kong
    /// built this way gets [`KongOrigin::Concealed`] when concealed and
    /// [`KongOrigin::ClaimedDiscard`] otherwise.
    pub fn from_tiles(tiles: &[Tile], concealed: bool) -> Result<Self, MeldError> {
        if let Some(bonus) = tiles.iter().find(|t| t.is_bonus()) {
            return Err(MeldError::BonusTile(*bonus));
        }
        let mut sorted: SmallVec<[Tile; 4]> = tiles.iter().copied().collect();
        sorted.sort_unstable();
        let all_same = sorted.windows(2).all(|w| w[0] == w[1]);
        let kind = match (sorted.len(), all_same) {
            (2, true) => MeldKind::Pair,
            (3, true) => MeldKind::Pung,
            (4, true) => MeldKind::Kong,
            (3, false) if is_run(&sorted) => MeldKind::Chow,
            (2..=4, _) => return Err(MeldError::NotAMeld(tiles_text(tiles))),
            (n, _) => return Err(MeldError::WrongSize(n)),
        };
        let kong_origin = (kind == MeldKind::Kong).then_some(if concealed {
            KongOrigin::Concealed
        } else {
            KongOrigin::ClaimedDiscard
        });
        Ok(Self { kind, tiles: sorted, concealed, kong_origin })
    }

    fn same(kind: MeldKind, tile: Tile, concealed: bool) -> Self {
        assert!(!tile.is_bonus(), "Bonus tiles never form melds");
        Self {
            kind,
            tiles: std::iter::repeat(tile).take(kind.size()).collect(),
            concealed,
            kong_origin: None,
        }
    }

    pub fn pair(tile: Tile, concealed: bool) -> Self {
        Self::same(MeldKind::Pair, tile, concealed)
    }

    pub fn pung(tile: Tile, concealed: bool) -> Self {
        Self::same(MeldKind::Pung, tile, concealed)
    }

    /// A kong; concealed exactly when its origin is [`KongOrigin::Concealed`].
    pub fn kong(tile: Tile, origin: KongOrigin) -> Self {
        let mut meld = Self::same(MeldKind::Kong, tile, origin == KongOrigin::Concealed);
        meld.kong_origin = Some(origin);
        meld
    }

    /// Chow starting at `first`, or `None` when the run leaves the suit.
    #[must_use]
    pub fn chow(first: Tile, concealed: bool) -> Option<Self> {
        let second = first.next_in_suit()?;
        let third = second.next_in_suit()?;
        Some(Self {
            kind: MeldKind::Chow,
            tiles: SmallVec::from_slice(&[first, second, third]),
            concealed,
            kong_origin: None,
        })
    }

    #[must_use]
    pub fn kind(&self) -> MeldKind {
        self.kind
    }

    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Lowest tile; the defining tile for pairs, pungs and kongs.
    #[must_use]
    pub fn first(&self) -> Tile {
        self.tiles[0]
    }

    #[must_use]
    pub fn is_concealed(&self) -> bool {
        self.concealed
    }

    #[must_use]
    pub fn kong_origin(&self) -> Option<KongOrigin> {
        self.kong_origin
    }

    #[must_use]
    pub fn is_pung_or_kong(&self) -> bool {
        matches!(self.kind, MeldKind::Pung | MeldKind::Kong)
    }

    #[must_use]
    pub fn contains(&self, tile: Tile) -> bool {
        self.tiles.contains(&tile)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Same meld with the concealed flag replaced.
    #[must_use]
    pub fn with_concealed(mut self, concealed: bool) -> Self {
        self.concealed = concealed;
        if self.kind == MeldKind::Kong && self.kong_origin == Some(KongOrigin::Concealed) && !concealed {
            self.kong_origin = Some(KongOrigin::ClaimedDiscard);
        }
        self
    }

    /// Canonical ordering key: defining tile, then kind, then exposure.
    fn sort_key(&self) -> (Tile, MeldKind, bool) {
        (self.first(), self.kind, self.concealed)
    }
}

impl PartialOrd for Meld {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Meld {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.kong_origin.cmp(&other.kong_origin))
    }
}

fn is_run(sorted: &[Tile]) -> bool {
    sorted.len() == 3
        && sorted[0].is_suited()
        && sorted[0].next_in_suit() == Some(sorted[1])
        && sorted[1].next_in_suit() == Some(sorted[2])
}

fn tiles_text(tiles: &[Tile]) -> String {
    tiles.iter().map(|t| t.exposed_name()).collect()
}

impl std::fmt::Display for Meld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for tile in &self.tiles {
            if self.concealed {
                write!(f, "{}", tile.concealed_name())?;
            } else {
                write!(f, "{}", tile.exposed_name())?;
            }
        }
        if let Some(origin) = self.kong_origin {
            write!(f, ":{}", origin.suffix())?;
        }
        Ok(())
    }
}

impl FromStr for Meld {
    type Err = MeldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (body, origin) = match s.split_once(':') {
            Some((body, "p")) => (body, Some(KongOrigin::ExtendedPung)),
            Some((body, "d")) => (body, Some(KongOrigin::ClaimedDiscard)),
            Some((body, "c")) => (body, Some(KongOrigin::Concealed)),
            Some(_) => return Err(MeldError::NotAMeld(s.to_string())),
            None => (s, None),
        };
        let upper = body.chars().step_by(2).filter(|c| c.is_ascii_uppercase()).count();
        let concealed = match upper {
            0 => false,
            n if n * 2 == body.len() => true,
            _ => return Err(MeldError::MixedCase(s.to_string())),
        };
        let tiles = parse_tiles(body)?;
        let mut meld = Self::from_tiles(&tiles, concealed)?;
        match (meld.kind, origin) {
            (MeldKind::Kong, Some(origin)) => {
                if (origin == KongOrigin::Concealed) != concealed {
                    return Err(MeldError::NotAMeld(s.to_string()));
                }
                meld.kong_origin = Some(origin);
            }
            (MeldKind::Kong, None) => {}
            (_, Some(_)) => return Err(MeldError::NotAMeld(s.to_string())),
            (_, None) => {}
        }
        Ok(meld)
    }
}
