//! Tile value type and its two-character textual forms.
//!
//! A tile is a suit plus a rank. Suited tiles (characters, bamboo, circles)
//! rank 1-9; winds rank East..North; dragons rank white, green, red; flowers
//! and seasons rank 1-4 and belong to the wind of the same number.
//!
//! ## Text form
//!
//! Two characters: suit letter then value. Upper-case suit letter marks a
//! concealed tile (`B5`), lower-case an exposed one (`b5`). Bonus tiles are
//! always written lower-case.
//!
//! | suit      | letter | values        |
//! |-----------|--------|---------------|
//! | character | `c`    | `1`-`9`       |
//! | bamboo    | `b`    | `1`-`9`       |
//! | circle    | `s`    | `1`-`9`       |
//! | wind      | `w`    | `e s w n`     |
//! | dragon    | `d`    | `b g r`       |
//! | flower    | `f`    | `e s w n`     |
//! | season    | `y`    | `e s w n`     |

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Tile suit.
///
/// The declaration order is the canonical sort order of tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Character,
    Bamboo,
    Circle,
    Wind,
    Dragon,
    Flower,
    Season,
}

impl Suit {
    /// The three suits with ranks 1-9.
    pub const SUITED: [Suit; 3] = [Suit::Character, Suit::Bamboo, Suit::Circle];

    /// Lower-case suit letter.
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Suit::Character => 'c',
            Suit::Bamboo => 'b',
            Suit::Circle => 's',
            Suit::Wind => 'w',
            Suit::Dragon => 'd',
            Suit::Flower => 'f',
            Suit::Season => 'y',
        }
    }

    /// Parse a suit letter (either case).
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'c' => Some(Suit::Character),
            'b' => Some(Suit::Bamboo),
            's' => Some(Suit::Circle),
            'w' => Some(Suit::Wind),
            'd' => Some(Suit::Dragon),
            'f' => Some(Suit::Flower),
            'y' => Some(Suit::Season),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_suited(self) -> bool {
        matches!(self, Suit::Character | Suit::Bamboo | Suit::Circle)
    }

    #[must_use]
    pub const fn is_honour(self) -> bool {
        matches!(self, Suit::Wind | Suit::Dragon)
    }

    #[must_use]
    pub const fn is_bonus(self) -> bool {
        matches!(self, Suit::Flower | Suit::Season)
    }

    /// Highest rank in this suit.
    #[must_use]
    pub const fn max_rank(self) -> u8 {
        match self {
            Suit::Character | Suit::Bamboo | Suit::Circle => 9,
            Suit::Dragon => 3,
            Suit::Wind | Suit::Flower | Suit::Season => 4,
        }
    }
}

/// Seat and round wind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Wind {
    East,
    South,
    West,
    North,
}

impl Wind {
    /// Winds in playing order.
    pub const ALL: [Wind; 4] = [Wind::East, Wind::South, Wind::West, Wind::North];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Wind at index `i` (modulo 4).
    #[must_use]
    pub const fn from_index(i: usize) -> Self {
        Self::ALL[i % 4]
    }

    /// The following wind (North wraps to East).
    #[must_use]
    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Wind::East => 'e',
            Wind::South => 's',
            Wind::West => 'w',
            Wind::North => 'n',
        }
    }

    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'e' => Some(Wind::East),
            's' => Some(Wind::South),
            'w' => Some(Wind::West),
            'n' => Some(Wind::North),
            _ => None,
        }
    }
}

impl std::fmt::Display for Wind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter().to_ascii_uppercase())
    }
}

/// Dragon colours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dragon {
    White,
    Green,
    Red,
}

impl Dragon {
    pub const ALL: [Dragon; 3] = [Dragon::White, Dragon::Green, Dragon::Red];

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Dragon::White => 'b',
            Dragon::Green => 'g',
            Dragon::Red => 'r',
        }
    }
}

/// Failure to parse a tile from text.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid tile '{0}'")]
pub struct TileParseError(pub String);

/// An immutable tile value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tile {
    suit: Suit,
    rank: u8,
}

impl Tile {
    /// Create a tile, validating the rank for the suit.
    #[must_use]
    pub fn new(suit: Suit, rank: u8) -> Option<Self> {
        (1..=suit.max_rank()).contains(&rank).then_some(Self { suit, rank })
    }

    fn suited(suit: Suit, rank: u8) -> Self {
        assert!((1..=9).contains(&rank), "Suited rank must be 1-9");
        Self { suit, rank }
    }

    pub fn character(rank: u8) -> Self {
        Self::suited(Suit::Character, rank)
    }

    pub fn bamboo(rank: u8) -> Self {
        Self::suited(Suit::Bamboo, rank)
    }

    pub fn circle(rank: u8) -> Self {
        Self::suited(Suit::Circle, rank)
    }

    #[must_use]
    pub const fn wind(wind: Wind) -> Self {
        Self { suit: Suit::Wind, rank: wind as u8 + 1 }
    }

    #[must_use]
    pub const fn dragon(dragon: Dragon) -> Self {
        Self { suit: Suit::Dragon, rank: dragon as u8 + 1 }
    }

    #[must_use]
    pub const fn flower(wind: Wind) -> Self {
        Self { suit: Suit::Flower, rank: wind as u8 + 1 }
    }

    #[must_use]
    pub const fn season(wind: Wind) -> Self {
        Self { suit: Suit::Season, rank: wind as u8 + 1 }
    }

    #[must_use]
    pub const fn suit(self) -> Suit {
        self.suit
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        self.rank
    }

    #[must_use]
    pub const fn is_suited(self) -> bool {
        self.suit.is_suited()
    }

    #[must_use]
    pub const fn is_honour(self) -> bool {
        self.suit.is_honour()
    }

    #[must_use]
    pub const fn is_bonus(self) -> bool {
        self.suit.is_bonus()
    }

    /// Suited 1 or 9.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.suit.is_suited() && (self.rank == 1 || self.rank == 9)
    }

    /// Suited 2..=8.
    #[must_use]
    pub const fn is_simple(self) -> bool {
        self.suit.is_suited() && self.rank >= 2 && self.rank <= 8
    }

    #[must_use]
    pub const fn is_terminal_or_honour(self) -> bool {
        self.is_terminal() || self.is_honour()
    }

    /// Bamboo 2, 3, 4, 6, 8 and the green dragon.
    #[must_use]
    pub const fn is_green(self) -> bool {
        match self.suit {
            Suit::Bamboo => matches!(self.rank, 2 | 3 | 4 | 6 | 8),
            Suit::Dragon => self.rank == Dragon::Green as u8 + 1,
            _ => false,
        }
    }

    /// The wind of a wind tile, flower or season.
    #[must_use]
    pub const fn as_wind(self) -> Option<Wind> {
        match self.suit {
            Suit::Wind | Suit::Flower | Suit::Season => Some(Wind::from_index(self.rank as usize - 1)),
            _ => None,
        }
    }

    /// Next rank in a suited suit, for chow building.
    #[must_use]
    pub fn next_in_suit(self) -> Option<Self> {
        if self.is_suited() && self.rank < 9 {
            Some(Self { suit: self.suit, rank: self.rank + 1 })
        } else {
            None
        }
    }

    fn value_char(self) -> char {
        match self.suit {
            Suit::Character | Suit::Bamboo | Suit::Circle => (b'0' + self.rank) as char,
            Suit::Dragon => Dragon::ALL[self.rank as usize - 1].letter(),
            Suit::Wind | Suit::Flower | Suit::Season => Wind::ALL[self.rank as usize - 1].letter(),
        }
    }

    /// Upper-case suit letter form, e.g. `B5`. Bonus tiles stay lower-case.
    #[must_use]
    pub fn concealed_name(self) -> String {
        let letter = if self.is_bonus() {
            self.suit.letter()
        } else {
            self.suit.letter().to_ascii_uppercase()
        };
        format!("{}{}", letter, self.value_char())
    }

    /// Lower-case form, e.g. `b5`.
    #[must_use]
    pub fn exposed_name(self) -> String {
        format!("{}{}", self.suit.letter(), self.value_char())
    }

    /// Parse a tile and report whether it was written in concealed form.
    pub fn parse_with_case(text: &str) -> Result<(Self, bool), TileParseError> {
        let err = || TileParseError(text.to_string());
        let mut chars = text.chars();
        let (Some(suit_char), Some(value), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(err());
        };
        let suit = Suit::from_letter(suit_char).ok_or_else(err)?;
        let rank = match suit {
            Suit::Character | Suit::Bamboo | Suit::Circle => value.to_digit(10).ok_or_else(err)? as u8,
            Suit::Dragon => match value {
                'b' => 1,
                'g' => 2,
                'r' => 3,
                _ => return Err(err()),
            },
            Suit::Wind | Suit::Flower | Suit::Season => Wind::from_letter(value).ok_or_else(err)? as u8 + 1,
        };
        let tile = Self::new(suit, rank).ok_or_else(err)?;
        let concealed = suit_char.is_ascii_uppercase();
        if concealed && tile.is_bonus() {
            return Err(err());
        }
        Ok((tile, concealed))
    }

    /// Every tile of a 4-player set: 136 tiles, 144 with flowers and seasons.
    #[must_use]
    pub fn full_set(with_bonus: bool) -> Vec<Tile> {
        let mut tiles = Vec::with_capacity(if with_bonus { 144 } else { 136 });
        for suit in [Suit::Character, Suit::Bamboo, Suit::Circle, Suit::Wind, Suit::Dragon] {
            for rank in 1..=suit.max_rank() {
                for _ in 0..4 {
                    tiles.push(Tile { suit, rank });
                }
            }
        }
        if with_bonus {
            for wind in Wind::ALL {
                tiles.push(Tile::flower(wind));
                tiles.push(Tile::season(wind));
            }
        }
        tiles
    }
}

impl std::fmt::Display for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.exposed_name())
    }
}

impl FromStr for Tile {
    type Err = TileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tile::parse_with_case(s).map(|(tile, _)| tile)
    }
}

/// Parse a run of concatenated two-character tiles, e.g. `b1b2b3`.
pub fn parse_tiles(text: &str) -> Result<Vec<Tile>, TileParseError> {
    if !text.is_ascii() || text.len() % 2 != 0 {
        return Err(TileParseError(text.to_string()));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| text[i..i + 2].parse())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_set_sizes() {
        assert_eq!(Tile::full_set(false).len(), 136);
        assert_eq!(Tile::full_set(true).len(), 144);
        assert_eq!(Tile::full_set(true).iter().filter(|t| t.is_bonus()).count(), 8);
    }

    #[test]
    fn test_text_forms() {
        let tile = Tile::bamboo(5);
        assert_eq!(tile.concealed_name(), "B5");
        assert_eq!(tile.exposed_name(), "b5");
        assert_eq!(Tile::dragon(Dragon::Green).concealed_name(), "Dg");
        assert_eq!(Tile::wind(Wind::North).exposed_name(), "wn");
        assert_eq!(Tile::flower(Wind::East).concealed_name(), "fe");
    }

    #[test]
    fn test_parse() {
        assert_eq!("s9".parse::<Tile>().unwrap(), Tile::circle(9));
        assert_eq!(Tile::parse_with_case("S9").unwrap(), (Tile::circle(9), true));
        assert_eq!("dr".parse::<Tile>().unwrap(), Tile::dragon(Dragon::Red));
        assert_eq!("yw".parse::<Tile>().unwrap(), Tile::season(Wind::West));

        assert!("s0".parse::<Tile>().is_err());
        assert!("x1".parse::<Tile>().is_err());
        assert!("dx".parse::<Tile>().is_err());
        assert!("b12".parse::<Tile>().is_err());
        assert!("Fe".parse::<Tile>().is_err());
    }

    #[test]
    fn test_parse_tiles() {
        let tiles = parse_tiles("b1b2b3").unwrap();
        assert_eq!(tiles, vec![Tile::bamboo(1), Tile::bamboo(2), Tile::bamboo(3)]);
        assert!(parse_tiles("b1b").is_err());
    }

    #[test]
    fn test_classification() {
        assert!(Tile::character(1).is_terminal());
        assert!(Tile::character(5).is_simple());
        assert!(Tile::wind(Wind::East).is_honour());
        assert!(Tile::dragon(Dragon::Red).is_terminal_or_honour());
        assert!(Tile::bamboo(6).is_green());
        assert!(!Tile::bamboo(5).is_green());
        assert_eq!(Tile::season(Wind::South).as_wind(), Some(Wind::South));
        assert_eq!(Tile::bamboo(9).next_in_suit(), None);
        assert_eq!(Tile::dragon(Dragon::White).next_in_suit(), None);
    }

    #[test]
    fn test_wind_rotation() {
        assert_eq!(Wind::North.next(), Wind::East);
        assert_eq!(format!("{}", Wind::South), "S");
    }

    #[test]
    #[should_panic(expected = "Suited rank must be 1-9")]
    fn test_invalid_rank_panics() {
        let _ = Tile::circle(10);
    }
}
