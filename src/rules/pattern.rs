//! Rule patterns.
//!
//! Patterns are tagged predicate trees over structured melds and tiles.
//! [`MeldPattern`] judges one scoring unit (a meld or a bonus tile);
//! [`HandPattern`] judges a whole decomposition of a hand.
//!
//! Both support `All`/`Any`/`Not` combinators; hand patterns add `Count`
//! to require a number of qualifying melds.

use serde::{Deserialize, Serialize};

use crate::tiles::{Meld, MeldKind, Suit, Tile, TileSource, Wind};

use super::decompose;
use super::encoder::{ClaimContext, EncodedHand};

/// Predicate over a single tile.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TilePattern {
    Suited,
    Honour,
    Terminal,
    TerminalOrHonour,
    Simple,
    Green,
    Dragon,
    Wind,
    Suit(Suit),
}

impl TilePattern {
    #[must_use]
    pub fn matches(&self, tile: Tile) -> bool {
        match self {
            TilePattern::Suited => tile.is_suited(),
            TilePattern::Honour => tile.is_honour(),
            TilePattern::Terminal => tile.is_terminal(),
            TilePattern::TerminalOrHonour => tile.is_terminal_or_honour(),
            TilePattern::Simple => tile.is_simple(),
            TilePattern::Green => tile.is_green(),
            TilePattern::Dragon => tile.suit() == Suit::Dragon,
            TilePattern::Wind => tile.suit() == Suit::Wind,
            TilePattern::Suit(suit) => tile.suit() == *suit,
        }
    }
}

/// Predicate over one scoring unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeldPattern {
    // === Shape ===
    Kind(MeldKind),

    /// Pung or kong.
    PungOrKong,

    Concealed,

    Exposed,

    // === Tiles ===
    /// Every tile of the meld matches.
    Tiles(TilePattern),

    /// Wind tiles of the player's own wind.
    OwnWind,

    /// Wind tiles of the prevailing wind.
    RoundWind,

    /// A bonus tile of the given suit (flower or season).
    Bonus(Suit),

    // === Combinators ===
    All(Vec<MeldPattern>),

    Any(Vec<MeldPattern>),

    Not(Box<MeldPattern>),

    Always,
}

impl MeldPattern {
    pub fn tiles(pattern: TilePattern) -> Self {
        Self::Tiles(pattern)
    }

    pub fn all(patterns: impl IntoIterator<Item = MeldPattern>) -> Self {
        Self::All(patterns.into_iter().collect())
    }

    pub fn any(patterns: impl IntoIterator<Item = MeldPattern>) -> Self {
        Self::Any(patterns.into_iter().collect())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Add another pattern with AND.
    pub fn and(self, other: MeldPattern) -> Self {
        match self {
            Self::All(mut patterns) => {
                patterns.push(other);
                Self::All(patterns)
            }
            _ => Self::All(vec![self, other]),
        }
    }

    /// Add another pattern with OR.
    pub fn or(self, other: MeldPattern) -> Self {
        match self {
            Self::Any(mut patterns) => {
                patterns.push(other);
                Self::Any(patterns)
            }
            _ => Self::Any(vec![self, other]),
        }
    }
}

/// Predicate over a whole decomposed hand.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandPattern {
    // === Melds ===
    /// Between `min` and `max` melds match.
    Count {
        meld: MeldPattern,
        min: usize,
        max: Option<usize>,
    },

    /// Every meld matches.
    EveryMeld(MeldPattern),

    /// The meld completed by the last tile matches.
    LastMeld(MeldPattern),

    /// Four melds and a pair.
    Regular,

    // === Tiles ===
    EveryTile(TilePattern),

    AnyTile(TilePattern),

    /// All suited tiles share one suit and at least one is present.
    SingleSuit,

    // === Bonus tiles ===
    /// At least `min` bonus tiles of `suit`.
    BonusCount { suit: Suit, min: usize },

    /// No bonus tiles at all.
    NoBonus,

    /// The bonus tile of `suit` belonging to the player's own wind.
    OwnBonus(Suit),

    // === Last tile ===
    /// The last tile was drawn rather than taken from another player.
    SelfDrawn,

    LastSource(TileSource),

    /// No other tile would have completed the hand.
    LastTileOnlyPossible,

    // === Claim context ===
    /// The player sits East.
    Dealer,

    CallAtBeginning,

    OriginalCall,

    // === Irregular and special shapes ===
    ThirteenOrphans,

    /// Concealed 1112345678999 of one suit plus any tile of that suit.
    NineGates,

    /// One suit: pungs of 1 and 9, one each of 2-8, one of 2/5/8 paired.
    WindingSnake,

    // === Combinators ===
    All(Vec<HandPattern>),

    Any(Vec<HandPattern>),

    Not(Box<HandPattern>),

    Always,

    Never,
}

impl HandPattern {
    pub fn count(meld: MeldPattern, min: usize) -> Self {
        Self::Count { meld, min, max: None }
    }

    pub fn count_exactly(meld: MeldPattern, n: usize) -> Self {
        Self::Count { meld, min: n, max: Some(n) }
    }

    /// No meld matches.
    pub fn none(meld: MeldPattern) -> Self {
        Self::Count { meld, min: 0, max: Some(0) }
    }

    pub fn all(patterns: impl IntoIterator<Item = HandPattern>) -> Self {
        Self::All(patterns.into_iter().collect())
    }

    pub fn any(patterns: impl IntoIterator<Item = HandPattern>) -> Self {
        Self::Any(patterns.into_iter().collect())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    pub fn and(self, other: HandPattern) -> Self {
        match self {
            Self::All(mut patterns) => {
                patterns.push(other);
                Self::All(patterns)
            }
            _ => Self::All(vec![self, other]),
        }
    }

    pub fn or(self, other: HandPattern) -> Self {
        match self {
            Self::Any(mut patterns) => {
                patterns.push(other);
                Self::Any(patterns)
            }
            _ => Self::Any(vec![self, other]),
        }
    }
}

/// A unit scored by meld rules.
#[derive(Clone, Copy, Debug)]
pub enum Unit<'a> {
    Meld(&'a Meld),
    Bonus(Tile),
}

/// One decomposition of an encoded hand, as seen by patterns.
pub struct PatternContext<'a> {
    pub encoded: &'a EncodedHand,
    /// Fixed melds followed by the concealed split.
    pub melds: &'a [Meld],
    /// Live tiles: concealed tiles plus the tiles of fixed melds.
    pub tiles: &'a [Tile],
    pub last_meld: Option<&'a Meld>,
    pub regular: bool,
}

impl<'a> PatternContext<'a> {
    fn own_wind(&self) -> Wind {
        self.encoded.own_wind()
    }

    fn round_wind(&self) -> Wind {
        self.encoded.round_wind()
    }

    fn claim(&self) -> ClaimContext {
        self.encoded.claim_context()
    }
}

/// Evaluator for rule patterns.
pub struct PatternEvaluator;

impl PatternEvaluator {
    /// Check a meld pattern against one unit.
    pub fn evaluate_unit(pattern: &MeldPattern, unit: Unit<'_>, ctx: &PatternContext) -> bool {
        match (pattern, unit) {
            (MeldPattern::All(patterns), _) => patterns.iter().all(|p| Self::evaluate_unit(p, unit, ctx)),
            (MeldPattern::Any(patterns), _) => patterns.iter().any(|p| Self::evaluate_unit(p, unit, ctx)),
            (MeldPattern::Not(inner), _) => !Self::evaluate_unit(inner, unit, ctx),
            (MeldPattern::Always, _) => true,

            (MeldPattern::Bonus(suit), Unit::Bonus(tile)) => tile.suit() == *suit,
            (_, Unit::Bonus(_)) => false,

            (MeldPattern::Bonus(_), Unit::Meld(_)) => false,
            (MeldPattern::Kind(kind), Unit::Meld(meld)) => meld.kind() == *kind,
            (MeldPattern::PungOrKong, Unit::Meld(meld)) => meld.is_pung_or_kong(),
            (MeldPattern::Concealed, Unit::Meld(meld)) => meld.is_concealed(),
            (MeldPattern::Exposed, Unit::Meld(meld)) => !meld.is_concealed(),
            (MeldPattern::Tiles(tile), Unit::Meld(meld)) => meld.tiles().iter().all(|t| tile.matches(*t)),
            (MeldPattern::OwnWind, Unit::Meld(meld)) => meld.first() == Tile::wind(ctx.own_wind()),
            (MeldPattern::RoundWind, Unit::Meld(meld)) => meld.first() == Tile::wind(ctx.round_wind()),
        }
    }

    /// Check a meld pattern against a meld.
    pub fn evaluate_meld(pattern: &MeldPattern, meld: &Meld, ctx: &PatternContext) -> bool {
        Self::evaluate_unit(pattern, Unit::Meld(meld), ctx)
    }

    /// Check a hand pattern against a decomposition.
    pub fn evaluate_hand(pattern: &HandPattern, ctx: &PatternContext) -> bool {
        match pattern {
            HandPattern::Count { meld, min, max } => {
                let n = ctx.melds.iter().filter(|m| Self::evaluate_meld(meld, m, ctx)).count();
                n >= *min && max.map_or(true, |max| n <= max)
            }

            HandPattern::EveryMeld(meld) => ctx.melds.iter().all(|m| Self::evaluate_meld(meld, m, ctx)),

            HandPattern::LastMeld(meld) => ctx.last_meld.is_some_and(|m| Self::evaluate_meld(meld, m, ctx)),

            HandPattern::Regular => ctx.regular,

            HandPattern::EveryTile(tile) => ctx.tiles.iter().all(|t| tile.matches(*t)),

            HandPattern::AnyTile(tile) => ctx.tiles.iter().any(|t| tile.matches(*t)),

            HandPattern::SingleSuit => {
                let mut suits = ctx.tiles.iter().filter(|t| t.is_suited()).map(|t| t.suit());
                match suits.next() {
                    Some(first) => suits.all(|s| s == first),
                    None => false,
                }
            }

            HandPattern::BonusCount { suit, min } => {
                ctx.encoded.bonus().iter().filter(|t| t.suit() == *suit).count() >= *min
            }

            HandPattern::NoBonus => ctx.encoded.bonus().is_empty(),

            HandPattern::OwnBonus(suit) => ctx
                .encoded
                .bonus()
                .iter()
                .any(|t| t.suit() == *suit && t.as_wind() == Some(ctx.own_wind())),

            HandPattern::SelfDrawn => ctx.encoded.last_source().is_some_and(TileSource::is_self_drawn),

            HandPattern::LastSource(source) => ctx.encoded.last_source() == Some(*source),

            HandPattern::LastTileOnlyPossible => last_tile_only_possible(ctx.encoded),

            HandPattern::Dealer => ctx.own_wind() == Wind::East,

            HandPattern::CallAtBeginning => ctx.claim().call_at_beginning,

            HandPattern::OriginalCall => ctx.claim().original_call,

            HandPattern::ThirteenOrphans => decompose::is_thirteen_orphans(ctx.encoded.concealed())
                && ctx.encoded.fixed_melds().is_empty(),

            HandPattern::NineGates => {
                ctx.encoded.fixed_melds().is_empty() && rank_profile(ctx.tiles).is_some_and(|counts| {
                    counts[1] >= 3 && counts[9] >= 3 && (2..=8).all(|r| counts[r] >= 1)
                })
            }

            HandPattern::WindingSnake => {
                ctx.melds.iter().all(|m| m.kind() != MeldKind::Kong)
                    && rank_profile(ctx.tiles).is_some_and(|counts| {
                        counts[1] == 3
                            && counts[9] == 3
                            && (2..=8).all(|r| counts[r] == 1 || (counts[r] == 2 && matches!(r, 2 | 5 | 8)))
                            && (2..=8).filter(|r| counts[*r] == 2).count() == 1
                    })
            }

            HandPattern::All(patterns) => patterns.iter().all(|p| Self::evaluate_hand(p, ctx)),

            HandPattern::Any(patterns) => patterns.iter().any(|p| Self::evaluate_hand(p, ctx)),

            HandPattern::Not(inner) => !Self::evaluate_hand(inner, ctx),

            HandPattern::Always => true,

            HandPattern::Never => false,
        }
    }
}

/// Rank counts of a 14-tile single-suit hand, indexed 1..=9.
fn rank_profile(tiles: &[Tile]) -> Option<[usize; 10]> {
    let first = tiles.first()?;
    if tiles.len() != 14 || !tiles.iter().all(|t| t.is_suited() && t.suit() == first.suit()) {
        return None;
    }
    let mut counts = [0usize; 10];
    for tile in tiles {
        counts[tile.rank() as usize] += 1;
    }
    Some(counts)
}

fn last_tile_only_possible(encoded: &EncodedHand) -> bool {
    let Some(last) = encoded.last_tile() else {
        return false;
    };
    let mut waiting: Vec<Tile> = encoded.concealed().to_vec();
    let Some(i) = waiting.iter().position(|t| *t == last) else {
        return false;
    };
    waiting.remove(i);
    let fixed = encoded.fixed_melds().is_empty();
    Tile::full_set(false)
        .into_iter()
        .filter(|t| *t != last)
        .all(|candidate| {
            let mut tiles = waiting.clone();
            tiles.push(candidate);
            tiles.sort_unstable();
            !(decompose::has_regular_split(&tiles) || (fixed && decompose::is_thirteen_orphans(&tiles)))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::encoder::EncodedHand;
    use crate::tiles::{parse_tiles, Dragon, KongOrigin};

    fn encoded(concealed: &str) -> EncodedHand {
        EncodedHand::new(parse_tiles(concealed).unwrap(), Vec::new(), Vec::new(), Wind::East, Wind::East)
    }

    fn ctx<'a>(encoded: &'a EncodedHand, melds: &'a [Meld], tiles: &'a [Tile]) -> PatternContext<'a> {
        PatternContext {
            encoded,
            melds,
            tiles,
            last_meld: melds.last(),
            regular: true,
        }
    }

    #[test]
    fn test_meld_combinators() {
        let enc = encoded("");
        let melds = [Meld::pung(Tile::dragon(Dragon::Red), false)];
        let c = ctx(&enc, &melds, &[]);

        let dragon_pung = MeldPattern::PungOrKong.and(MeldPattern::tiles(TilePattern::Dragon));
        assert!(PatternEvaluator::evaluate_meld(&dragon_pung, &melds[0], &c));

        let concealed = MeldPattern::Concealed;
        assert!(!PatternEvaluator::evaluate_meld(&concealed, &melds[0], &c));
        assert!(PatternEvaluator::evaluate_meld(&concealed.negate(), &melds[0], &c));

        let either = MeldPattern::Kind(MeldKind::Chow).or(MeldPattern::Exposed);
        assert!(PatternEvaluator::evaluate_meld(&either, &melds[0], &c));
    }

    #[test]
    fn test_wind_patterns() {
        let enc = EncodedHand::new(Vec::new(), Vec::new(), Vec::new(), Wind::South, Wind::East);
        let melds = [Meld::pung(Tile::wind(Wind::South), true), Meld::pung(Tile::wind(Wind::East), true)];
        let c = ctx(&enc, &melds, &[]);
        assert!(PatternEvaluator::evaluate_meld(&MeldPattern::OwnWind, &melds[0], &c));
        assert!(!PatternEvaluator::evaluate_meld(&MeldPattern::RoundWind, &melds[0], &c));
        assert!(PatternEvaluator::evaluate_meld(&MeldPattern::RoundWind, &melds[1], &c));
    }

    #[test]
    fn test_bonus_units() {
        let enc = encoded("");
        let c = ctx(&enc, &[], &[]);
        let flower = Unit::Bonus(Tile::flower(Wind::North));
        assert!(PatternEvaluator::evaluate_unit(&MeldPattern::Bonus(Suit::Flower), flower, &c));
        assert!(!PatternEvaluator::evaluate_unit(&MeldPattern::Bonus(Suit::Season), flower, &c));
        assert!(!PatternEvaluator::evaluate_unit(&MeldPattern::PungOrKong, flower, &c));
    }

    #[test]
    fn test_count() {
        let enc = encoded("");
        let melds = [
            Meld::kong(Tile::bamboo(1), KongOrigin::Concealed),
            Meld::kong(Tile::bamboo(2), KongOrigin::ClaimedDiscard),
            Meld::pung(Tile::bamboo(3), false),
        ];
        let c = ctx(&enc, &melds, &[]);
        let kongs = MeldPattern::Kind(MeldKind::Kong);
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::count(kongs.clone(), 2), &c));
        assert!(!PatternEvaluator::evaluate_hand(&HandPattern::count(kongs.clone(), 3), &c));
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::count_exactly(kongs, 2), &c));
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::none(MeldPattern::Kind(MeldKind::Chow)), &c));
    }

    #[test]
    fn test_single_suit() {
        let enc = encoded("");
        let tiles = parse_tiles("b1b2b3dgdgdg").unwrap();
        let c = ctx(&enc, &[], &tiles);
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::SingleSuit, &c));
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::AnyTile(TilePattern::Honour), &c));

        let honours = parse_tiles("dgdgdg").unwrap();
        let c = ctx(&enc, &[], &honours);
        assert!(!PatternEvaluator::evaluate_hand(&HandPattern::SingleSuit, &c));
    }

    #[test]
    fn test_nine_gates_profile() {
        let tiles = parse_tiles("c1c1c1c2c3c4c5c5c6c7c8c9c9c9").unwrap();
        let enc = encoded("c1c1c1c2c3c4c5c5c6c7c8c9c9c9");
        let c = ctx(&enc, &[], &tiles);
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::NineGates, &c));
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::WindingSnake, &c));

        let tiles = parse_tiles("c1c1c1c2c3c4c4c5c6c7c8c9c9c9").unwrap();
        let c = ctx(&enc, &[], &tiles);
        assert!(PatternEvaluator::evaluate_hand(&HandPattern::NineGates, &c));
        assert!(!PatternEvaluator::evaluate_hand(&HandPattern::WindingSnake, &c));
    }

    #[test]
    fn test_last_tile_only_possible() {
        // Waiting on the middle of b4-b6 only
        let enc = encoded("b4b5b6c1c1c1c2c2c2c3c3c3dbdb")
            .with_last(Tile::bamboo(5), TileSource::Wall);
        assert!(last_tile_only_possible(&enc));

        // b2 b3 waits on b1 or b4
        let enc = encoded("b2b3b4c1c1c1c2c2c2c3c3c3dbdb")
            .with_last(Tile::bamboo(4), TileSource::Wall);
        assert!(!last_tile_only_possible(&enc));
    }
}
