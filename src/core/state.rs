//! Game state of one table.
//!
//! ## GameState
//!
//! Everything the coordinator owns between answers:
//! - The four players, their winds and balances
//! - Prevailing wind, dealer, hand, round and rotation counters
//! - Active seat, last discard and the discard pile
//! - The wall
//! - The move log
//!
//! Seats are fixed for the whole game; winds move. The dealer sits East and
//! `wind_of(seat)` counts from the dealer.
//!
//! The discard pile and move log use `im` vectors so snapshots of the state
//! are cheap to take between hands.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::player::{Player, Seat, SeatMap, SEAT_COUNT};
use crate::protocol::Message;
use crate::tiles::{Tile, Wall, Wind};

/// One logged move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Running number across the game.
    pub seq: u32,
    pub hand: u32,
    /// The seat the move is about.
    pub seat: Seat,
    pub message: Message,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    pub players: SeatMap<Player>,
    pub round_wind: Wind,
    pub dealer: Seat,
    /// Hands dealt so far, counting the current one.
    pub hand_number: u32,
    /// Completed rounds.
    pub round: u8,
    /// Rotations within the current round.
    pub rotation: u8,
    pub active: Seat,
    pub last_discard: Option<(Seat, Tile)>,
    pub discards: Vector<(Seat, Tile)>,
    pub wall: Wall,
    moves: Vector<MoveRecord>,
    next_seq: u32,
}

impl GameState {
    /// A game before its first hand; seat 0 deals first.
    #[must_use]
    pub fn new(names: SeatMap<String>) -> Self {
        let players = SeatMap::new(|seat| Player::new(names[seat].clone(), Wind::from_index(seat.index())));
        Self {
            players,
            round_wind: Wind::East,
            dealer: Seat::new(0),
            hand_number: 0,
            round: 0,
            rotation: 0,
            active: Seat::new(0),
            last_discard: None,
            discards: Vector::new(),
            wall: Wall::from_tiles(Vec::new(), 0),
            moves: Vector::new(),
            next_seq: 0,
        }
    }

    #[must_use]
    pub fn wind_of(&self, seat: Seat) -> Wind {
        Wind::from_index(seat.distance_after(self.dealer))
    }

    #[must_use]
    pub fn seat_of(&self, wind: Wind) -> Seat {
        Seat::new((self.dealer.index() + wind.index()) as u8)
    }

    #[must_use]
    pub fn winds(&self) -> SeatMap<Wind> {
        SeatMap::new(|seat| self.wind_of(seat))
    }

    #[must_use]
    pub fn balances(&self) -> SeatMap<i64> {
        SeatMap::new(|seat| self.players[seat].balance)
    }

    /// Start a new hand on `wall`.
    pub fn begin_hand(&mut self, wall: Wall) {
        self.hand_number += 1;
        for seat in Seat::all() {
            let wind = self.wind_of(seat);
            let player = &mut self.players[seat];
            player.reset_for_hand();
            player.wind = wind;
        }
        self.active = self.dealer;
        self.last_discard = None;
        self.discards.clear();
        self.wall = wall;
    }

    /// Log a move and return its sequence number.
    pub fn record(&mut self, seat: Seat, message: Message) -> u32 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.moves.push_back(MoveRecord {
            seq,
            hand: self.hand_number,
            seat,
            message,
        });
        seq
    }

    /// Sequence number the next logged move will get.
    #[must_use]
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    #[must_use]
    pub fn moves(&self) -> &Vector<MoveRecord> {
        &self.moves
    }

    pub fn moves_of_hand(&self, hand: u32) -> impl Iterator<Item = &MoveRecord> {
        self.moves.iter().filter(move |m| m.hand == hand)
    }

    pub fn discard(&mut self, seat: Seat, tile: Tile) {
        self.last_discard = Some((seat, tile));
        self.discards.push_back((seat, tile));
    }

    /// Take the last discard off the pile for a claim.
    pub fn take_last_discard(&mut self) -> Option<Tile> {
        let (_, tile) = self.last_discard.take()?;
        self.discards.pop_back();
        Some(tile)
    }

    /// Pass the deal to the next seat. Returns true when a round completed.
    pub fn rotate(&mut self) -> bool {
        self.dealer = self.dealer.next();
        self.rotation += 1;
        if usize::from(self.rotation) == SEAT_COUNT {
            self.rotation = 0;
            self.round += 1;
            self.round_wind = self.round_wind.next();
            return true;
        }
        false
    }

    #[must_use]
    pub fn is_finished(&self, round_limit: u8) -> bool {
        self.round >= round_limit
    }

    /// Every tile of the hand: wall, hands (bonus tiles included) and
    /// discard pile.
    #[must_use]
    pub fn all_tiles(&self) -> Vec<Tile> {
        let mut tiles: Vec<Tile> = self.wall.tiles().collect();
        for player in self.players.values() {
            tiles.extend(player.hand.all_tiles());
        }
        tiles.extend(self.discards.iter().map(|(_, tile)| *tile));
        tiles.sort_unstable();
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> SeatMap<String> {
        SeatMap::new(|seat| format!("P{}", seat.index()))
    }

    #[test]
    fn test_winds_follow_dealer() {
        let mut state = GameState::new(names());
        assert_eq!(state.wind_of(Seat::new(0)), Wind::East);
        state.rotate();
        assert_eq!(state.wind_of(Seat::new(1)), Wind::East);
        assert_eq!(state.wind_of(Seat::new(0)), Wind::North);
        assert_eq!(state.seat_of(Wind::South), Seat::new(2));
    }

    #[test]
    fn test_round_completes_after_four_rotations() {
        let mut state = GameState::new(names());
        assert!(!state.rotate());
        assert!(!state.rotate());
        assert!(!state.rotate());
        assert!(state.rotate());
        assert_eq!(state.round, 1);
        assert_eq!(state.round_wind, Wind::South);
        assert_eq!(state.dealer, Seat::new(0));
        assert!(state.is_finished(1));
        assert!(!state.is_finished(2));
    }

    #[test]
    fn test_begin_hand_resets() {
        let mut state = GameState::new(names());
        state.discard(Seat::new(1), Tile::bamboo(1));
        state.rotate();
        state.begin_hand(Wall::from_tiles(Tile::full_set(false), 16));
        assert_eq!(state.hand_number, 1);
        assert!(state.discards.is_empty());
        assert_eq!(state.active, Seat::new(1));
        assert_eq!(state.players[Seat::new(1)].wind, Wind::East);
        assert_eq!(state.all_tiles().len(), 136);
    }

    #[test]
    fn test_move_log() {
        let mut state = GameState::new(names());
        state.begin_hand(Wall::from_tiles(Vec::new(), 0));
        let a = state.record(Seat::new(0), Message::ShowBonus { tile: Tile::flower(Wind::East) });
        let b = state.record(Seat::new(1), Message::Aborted { reason: "x".into() });
        assert_eq!((a, b), (0, 1));
        assert_eq!(state.moves_of_hand(1).count(), 2);
        assert_eq!(state.moves_of_hand(2).count(), 0);
    }

    #[test]
    fn test_take_last_discard() {
        let mut state = GameState::new(names());
        state.discard(Seat::new(0), Tile::bamboo(1));
        state.discard(Seat::new(1), Tile::bamboo(2));
        assert_eq!(state.take_last_discard(), Some(Tile::bamboo(2)));
        assert_eq!(state.discards.len(), 1);
        assert_eq!(state.take_last_discard(), None);
    }
}
