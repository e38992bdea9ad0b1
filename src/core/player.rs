//! Seats, per-seat storage and player state.
//!
//! ## Seat
//!
//! Type-safe seat index 0-3 in seating order. Play and claim tie-breaks walk
//! seats in this order. Seats are only built through [`Seat::new`] (which
//! wraps around) or checked conversions, so indexing a `SeatMap` never goes
//! out of range.
//!
//! ## SeatMap
//!
//! Fixed four-entry storage indexed by `Seat`.
//!
//! ## Player
//!
//! Wind, balance, hand and per-hand flags of one participant.

use crate::tiles::{Hand, Wind};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Number of seats at a table.
pub const SEAT_COUNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SeatError {
    #[error("there is no seat {0}")]
    OutOfRange(u8),

    #[error("a table has exactly 4 seats, got {0}")]
    WrongCount(usize),
}

/// Seat identifier, 0-based in seating order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Seat(u8);

impl TryFrom<u8> for Seat {
    type Error = SeatError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        if usize::from(id) < SEAT_COUNT {
            Ok(Self(id))
        } else {
            Err(SeatError::OutOfRange(id))
        }
    }
}

impl From<Seat> for u8 {
    fn from(seat: Seat) -> Self {
        seat.0
    }
}

impl Seat {
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id % SEAT_COUNT as u8)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The seat playing after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self::new(self.0 + 1)
    }

    /// How many steps after `from` this seat sits (0 for the same seat).
    #[must_use]
    pub const fn distance_after(self, from: Seat) -> usize {
        (self.index() + SEAT_COUNT - from.index()) % SEAT_COUNT
    }

    /// All four seats in seating order.
    pub fn all() -> impl Iterator<Item = Seat> {
        (0..SEAT_COUNT as u8).map(Seat)
    }

    /// The other three seats, starting with the one after `self`.
    pub fn others(self) -> impl Iterator<Item = Seat> {
        (1..SEAT_COUNT as u8).map(move |i| Seat::new(self.0 + i))
    }
}

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seat {}", self.0)
    }
}

/// Per-seat data storage with O(1) access.
///
/// ## Example
///
/// ```
/// use mahjong_table::core::{Seat, SeatMap};
///
/// let mut balance: SeatMap<i64> = SeatMap::with_value(0);
/// balance[Seat::new(2)] += 16;
/// assert_eq!(balance[Seat::new(2)], 16);
/// assert_eq!(balance.iter().map(|(_, v)| v).sum::<i64>(), 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSeatMap<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct SeatMap<T> {
    data: Vec<T>,
}

/// Unchecked wire form of a [`SeatMap`].
#[derive(Deserialize)]
struct RawSeatMap<T> {
    data: Vec<T>,
}

impl<T> TryFrom<RawSeatMap<T>> for SeatMap<T> {
    type Error = SeatError;

    fn try_from(raw: RawSeatMap<T>) -> Result<Self, Self::Error> {
        Self::from_vec(raw.data)
    }
}

impl<T> SeatMap<T> {
    /// Create with values from a factory function.
    pub fn new(factory: impl Fn(Seat) -> T) -> Self {
        Self {
            data: Seat::all().map(factory).collect(),
        }
    }

    /// Build from exactly four values in seating order.
    pub fn from_vec(data: Vec<T>) -> Result<Self, SeatError> {
        if data.len() != SEAT_COUNT {
            return Err(SeatError::WrongCount(data.len()));
        }
        Ok(Self { data })
    }

    pub fn with_value(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(|_| value.clone())
    }

    pub fn with_default() -> Self
    where
        T: Default,
    {
        Self::new(|_| T::default())
    }

    #[must_use]
    pub fn get(&self, seat: Seat) -> &T {
        &self.data[seat.index()]
    }

    pub fn get_mut(&mut self, seat: Seat) -> &mut T {
        &mut self.data[seat.index()]
    }

    /// Iterate over (Seat, &T) pairs in seating order.
    pub fn iter(&self) -> impl Iterator<Item = (Seat, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (Seat(i as u8), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Seat, &mut T)> {
        self.data.iter_mut().enumerate().map(|(i, v)| (Seat(i as u8), v))
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }
}

impl<T> Index<Seat> for SeatMap<T> {
    type Output = T;

    fn index(&self, seat: Seat) -> &Self::Output {
        self.get(seat)
    }
}

impl<T> IndexMut<Seat> for SeatMap<T> {
    fn index_mut(&mut self, seat: Seat) -> &mut Self::Output {
        self.get_mut(seat)
    }
}

/// One participant at the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub wind: Wind,
    pub balance: i64,
    pub hand: Hand,
    /// Set after the first discard of the hand.
    pub has_discarded: bool,
    pub made_original_call: bool,
    /// Cleared when the player may no longer go out this hand.
    pub may_still_win: bool,
    pub is_robot: bool,
}

impl Player {
    #[must_use]
    pub fn new(name: impl Into<String>, wind: Wind) -> Self {
        Self {
            name: name.into(),
            wind,
            balance: 0,
            hand: Hand::new(),
            has_discarded: false,
            made_original_call: false,
            may_still_win: true,
            is_robot: false,
        }
    }

    #[must_use]
    pub fn robot(mut self) -> Self {
        self.is_robot = true;
        self
    }

    /// Reset hand and per-hand flags for a new deal.
    pub fn reset_for_hand(&mut self) {
        self.hand = Hand::new();
        self.has_discarded = false;
        self.made_original_call = false;
        self.may_still_win = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_basics() {
        let s0 = Seat::new(0);
        assert_eq!(s0.index(), 0);
        assert_eq!(s0.next(), Seat::new(1));
        assert_eq!(Seat::new(3).next(), Seat::new(0));
        assert_eq!(format!("{}", Seat::new(2)), "Seat 2");
    }

    #[test]
    fn test_seat_distance() {
        // Seats after West (2): North, East, South
        let west = Seat::new(2);
        assert_eq!(Seat::new(3).distance_after(west), 1);
        assert_eq!(Seat::new(0).distance_after(west), 2);
        assert_eq!(Seat::new(1).distance_after(west), 3);
        assert_eq!(west.distance_after(west), 0);
    }

    #[test]
    fn test_seat_others() {
        let others: Vec<_> = Seat::new(2).others().collect();
        assert_eq!(others, vec![Seat::new(3), Seat::new(0), Seat::new(1)]);
    }

    #[test]
    fn test_seat_map_new() {
        let map: SeatMap<i32> = SeatMap::new(|s| s.index() as i32 * 10);
        assert_eq!(map[Seat::new(0)], 0);
        assert_eq!(map[Seat::new(3)], 30);
    }

    #[test]
    fn test_seat_map_mutation() {
        let mut map: SeatMap<i64> = SeatMap::with_default();
        map[Seat::new(1)] = -20;
        map[Seat::new(3)] += 20;
        assert_eq!(map.values().sum::<i64>(), 0);
    }

    #[test]
    fn test_seat_map_wrong_size() {
        assert_eq!(SeatMap::from_vec(vec![1, 2, 3]), Err(SeatError::WrongCount(3)));
        assert_eq!(SeatMap::from_vec(vec![0; 5]), Err(SeatError::WrongCount(5)));
        assert!(SeatMap::from_vec(vec![1, 2, 3, 4]).is_ok());
    }

    /// Out-of-range seats are refused instead of indexing past the map.
    #[test]
    fn test_seat_checked_conversion() {
        assert_eq!(Seat::try_from(3), Ok(Seat::new(3)));
        assert_eq!(Seat::try_from(4), Err(SeatError::OutOfRange(4)));
        assert_eq!(u8::from(Seat::new(6)), 2);
    }

    /// Decoding rejects seats and maps a table cannot have.
    #[test]
    fn test_deserialization_checks_seats() {
        assert_eq!(serde_json::from_str::<Seat>("1").unwrap(), Seat::new(1));
        assert_eq!(serde_json::to_string(&Seat::new(1)).unwrap(), "1");
        assert!(serde_json::from_str::<Seat>("9").is_err());
        assert!(serde_json::from_str::<SeatMap<i32>>(r#"{"data":[1,2,3]}"#).is_err());
        let map: SeatMap<i32> = serde_json::from_str(r#"{"data":[1,2,3,4]}"#).unwrap();
        assert_eq!(map[Seat::new(3)], 4);
    }

    #[test]
    fn test_seat_map_serialization() {
        let map: SeatMap<i32> = SeatMap::new(|s| s.index() as i32 + 1);
        let json = serde_json::to_string(&map).unwrap();
        let deserialized: SeatMap<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, deserialized);
    }

    #[test]
    fn test_player_reset() {
        let mut player = Player::new("Ann", Wind::South).robot();
        player.has_discarded = true;
        player.may_still_win = false;
        player.reset_for_hand();
        assert!(!player.has_discarded);
        assert!(player.may_still_win);
        assert!(player.is_robot);
    }
}
