//! Hand encoding: the rule engine's only input.
//!
//! [`EncodedHand`] is a canonical token sequence built from a hand and the
//! circumstances of the win. It never refers back to mutable player or game
//! state.
//!
//! ## Text form
//!
//! Space-separated tokens in this order:
//!
//! | token          | meaning                                    |
//! |----------------|--------------------------------------------|
//! | `M:<meld>`     | one fixed meld, sorted canonically         |
//! | `R:<tiles>`    | concealed tiles, sorted                    |
//! | `B:<tiles>`    | bonus tiles, sorted                        |
//! | `W:<own><rnd>` | own wind and round wind, e.g. `W:se`       |
//! | `L:<tile><src>`| last tile and its source, e.g. `L:b5z`     |
//! | `F:<flags>`    | `C` call at beginning, `O` original call   |
//!
//! ```
//! use mahjong_table::rules::EncodedHand;
//!
//! let text = "M:b1b2b3 R:C5C5C5S7S8S9WeWeDgDgDg W:ee L:wew";
//! let hand: EncodedHand = text.parse().unwrap();
//! assert_eq!(hand.to_string(), text);
//! ```

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::tiles::{parse_tiles, Hand, Meld, Tile, TileSource, Wind};

use super::ruleset::RuleError;

/// Circumstances of a claim that scoring depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimContext {
    /// Won on the very first discard of the hand.
    pub call_at_beginning: bool,
    /// The winner declared an original call with their first discard.
    pub original_call: bool,
}

/// One token of an encoded hand.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Meld(Meld),
    Concealed(Vec<Tile>),
    Bonus(Vec<Tile>),
    Winds { own: Wind, round: Wind },
    Last { tile: Tile, source: TileSource },
    Flags(ClaimContext),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Meld(meld) => write!(f, "M:{meld}"),
            Token::Concealed(tiles) => {
                write!(f, "R:")?;
                tiles.iter().try_for_each(|t| write!(f, "{}", t.concealed_name()))
            }
            Token::Bonus(tiles) => {
                write!(f, "B:")?;
                tiles.iter().try_for_each(|t| write!(f, "{}", t.exposed_name()))
            }
            Token::Winds { own, round } => write!(f, "W:{}{}", own.letter(), round.letter()),
            Token::Last { tile, source } => write!(f, "L:{}{}", tile.exposed_name(), source.letter()),
            Token::Flags(flags) => {
                write!(f, "F:")?;
                if flags.call_at_beginning {
                    write!(f, "C")?;
                }
                if flags.original_call {
                    write!(f, "O")?;
                }
                Ok(())
            }
        }
    }
}

/// Canonical encoding of a hand for rule evaluation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedHand {
    fixed_melds: Vec<Meld>,
    concealed: Vec<Tile>,
    bonus: Vec<Tile>,
    own_wind: Wind,
    round_wind: Wind,
    last: Option<(Tile, TileSource)>,
    claim: ClaimContext,
}

impl EncodedHand {
    pub fn new(
        mut concealed: Vec<Tile>,
        mut fixed_melds: Vec<Meld>,
        mut bonus: Vec<Tile>,
        own_wind: Wind,
        round_wind: Wind,
    ) -> Self {
        concealed.sort_unstable();
        fixed_melds.sort();
        bonus.sort_unstable();
        Self {
            fixed_melds,
            concealed,
            bonus,
            own_wind,
            round_wind,
            last: None,
            claim: ClaimContext::default(),
        }
    }

    /// Encode a player's hand as it stands.
    pub fn encode(hand: &Hand, own_wind: Wind, round_wind: Wind, claim: ClaimContext) -> Self {
        let mut encoded = Self::new(
            hand.concealed().to_vec(),
            hand.melds().to_vec(),
            hand.bonus().to_vec(),
            own_wind,
            round_wind,
        )
        .with_claim_context(claim);
        if let (Some(tile), Some(source)) = (hand.last_tile(), hand.last_source()) {
            encoded = encoded.with_last(tile, source);
        }
        encoded
    }

    /// Mark the last tile without adding it.
    #[must_use]
    pub fn with_last(mut self, tile: Tile, source: TileSource) -> Self {
        self.last = Some((tile, source));
        self
    }

    /// Add a tile to the concealed tiles and make it the last tile.
    #[must_use]
    pub fn with_tile(mut self, tile: Tile, source: TileSource) -> Self {
        let at = self.concealed.partition_point(|t| *t <= tile);
        self.concealed.insert(at, tile);
        self.with_last(tile, source)
    }

    #[must_use]
    pub fn with_claim_context(mut self, claim: ClaimContext) -> Self {
        self.claim = claim;
        self
    }

    #[must_use]
    pub fn fixed_melds(&self) -> &[Meld] {
        &self.fixed_melds
    }

    #[must_use]
    pub fn concealed(&self) -> &[Tile] {
        &self.concealed
    }

    #[must_use]
    pub fn bonus(&self) -> &[Tile] {
        &self.bonus
    }

    #[must_use]
    pub fn own_wind(&self) -> Wind {
        self.own_wind
    }

    #[must_use]
    pub fn round_wind(&self) -> Wind {
        self.round_wind
    }

    #[must_use]
    pub fn last_tile(&self) -> Option<Tile> {
        self.last.map(|(tile, _)| tile)
    }

    #[must_use]
    pub fn last_source(&self) -> Option<TileSource> {
        self.last.map(|(_, source)| source)
    }

    #[must_use]
    pub fn claim_context(&self) -> ClaimContext {
        self.claim
    }

    /// `concealed + 3 × fixed melds`.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.concealed.len() + 3 * self.fixed_melds.len()
    }

    /// Live tiles: concealed plus every fixed meld tile.
    #[must_use]
    pub fn live_tiles(&self) -> Vec<Tile> {
        let mut tiles: Vec<Tile> = self
            .fixed_melds
            .iter()
            .flat_map(|m| m.tiles().iter().copied())
            .chain(self.concealed.iter().copied())
            .collect();
        tiles.sort_unstable();
        tiles
    }

    /// The canonical token sequence.
    #[must_use]
    pub fn tokens(&self) -> Vec<Token> {
        let mut tokens: Vec<Token> = self.fixed_melds.iter().cloned().map(Token::Meld).collect();
        if !self.concealed.is_empty() {
            tokens.push(Token::Concealed(self.concealed.clone()));
        }
        if !self.bonus.is_empty() {
            tokens.push(Token::Bonus(self.bonus.clone()));
        }
        tokens.push(Token::Winds {
            own: self.own_wind,
            round: self.round_wind,
        });
        if let Some((tile, source)) = self.last {
            tokens.push(Token::Last { tile, source });
        }
        if self.claim != ClaimContext::default() {
            tokens.push(Token::Flags(self.claim));
        }
        tokens
    }
}

impl std::fmt::Display for EncodedHand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens: Vec<String> = self.tokens().iter().map(ToString::to_string).collect();
        write!(f, "{}", tokens.join(" "))
    }
}

fn invalid(token: &str, why: impl std::fmt::Display) -> RuleError {
    RuleError::InvalidEncoding(format!("{token}: {why}"))
}

impl FromStr for EncodedHand {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut melds = Vec::new();
        let mut concealed = Vec::new();
        let mut bonus = Vec::new();
        let mut winds = None;
        let mut last = None;
        let mut claim = ClaimContext::default();

        for token in s.split_whitespace() {
            let (tag, body) = token
                .split_once(':')
                .ok_or_else(|| invalid(token, "missing tag"))?;
            match tag {
                "M" => melds.push(body.parse::<Meld>().map_err(|e| invalid(token, e))?),
                "R" => concealed.extend(parse_tiles(body).map_err(|e| invalid(token, e))?),
                "B" => {
                    let tiles = parse_tiles(body).map_err(|e| invalid(token, e))?;
                    if !tiles.iter().all(|t| t.is_bonus()) {
                        return Err(invalid(token, "not a bonus tile"));
                    }
                    bonus.extend(tiles);
                }
                "W" => {
                    let mut chars = body.chars();
                    let own = chars.next().and_then(Wind::from_letter);
                    let round = chars.next().and_then(Wind::from_letter);
                    match (own, round, chars.next()) {
                        (Some(own), Some(round), None) => winds = Some((own, round)),
                        _ => return Err(invalid(token, "bad winds")),
                    }
                }
                "L" => {
                    let (tile, source) = match (body.get(..2), body.get(2..)) {
                        (Some(tile), Some(source)) if source.len() == 1 => (tile, source),
                        _ => return Err(invalid(token, "bad last tile")),
                    };
                    let tile: Tile = tile.parse().map_err(|e| invalid(token, e))?;
                    let source = source
                        .chars()
                        .next()
                        .and_then(TileSource::from_letter)
                        .ok_or_else(|| invalid(token, "bad tile source"))?;
                    last = Some((tile, source));
                }
                "F" => {
                    for flag in body.chars() {
                        match flag {
                            'C' => claim.call_at_beginning = true,
                            'O' => claim.original_call = true,
                            _ => return Err(invalid(token, "unknown flag")),
                        }
                    }
                }
                _ => return Err(invalid(token, "unknown tag")),
            }
        }

        let (own, round) = winds.ok_or_else(|| RuleError::InvalidEncoding("missing W: token".into()))?;
        let mut encoded = Self::new(concealed, melds, bonus, own, round).with_claim_context(claim);
        if let Some((tile, source)) = last {
            encoded = encoded.with_last(tile, source);
        }
        Ok(encoded)
    }
}
