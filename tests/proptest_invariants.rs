//! Property-based invariant tests.
//!
//! Uses proptest to generate seeds and claim combinations, and verifies:
//! - Shuffling never gains or loses a tile
//! - Draws, discards, claimed melds and kongs never gain or lose a tile
//! - The same seed always builds the same wall
//! - Only the highest claim wins and Mah Jongg ties go to the nearest claimant

use proptest::prelude::*;

use mahjong_table::core::{GameRng, GameState, Seat, SeatMap};
use mahjong_table::protocol::{Answer, ClaimArbiter, ClaimKind, ProtocolViolation};
use mahjong_table::tiles::{Tile, TileSource, Wall};

const KINDS: [ClaimKind; 5] = [
    ClaimKind::NoClaim,
    ClaimKind::Chow,
    ClaimKind::Pung,
    ClaimKind::Kong,
    ClaimKind::MahJongg,
];

fn answer(kind: ClaimKind) -> Answer {
    match kind {
        ClaimKind::NoClaim => Answer::NoClaim,
        ClaimKind::MahJongg => Answer::MahJongg { melds: Vec::new() },
        kind => Answer::Claim { kind, tiles: Vec::new() },
    }
}

/// Answers of the three seats after `discarder`. Chows only come from the
/// next seat.
fn answers(discarder: Seat, kinds: &[usize]) -> Vec<(Seat, Answer)> {
    discarder
        .others()
        .zip(kinds)
        .map(|(seat, &k)| {
            let kind = match KINDS[k] {
                ClaimKind::Chow if seat != discarder.next() => ClaimKind::NoClaim,
                kind => kind,
            };
            (seat, answer(kind))
        })
        .collect()
}

/// Play one hand on a shuffled wall, steered by `choices`: which tile to
/// discard, whether to declare a kong and whether a seat holding a pair of
/// the discard calls it. Checks the whole tile set after every step.
fn play_steered_hand(seed: u64, choices: &[u8]) -> Result<(), TestCaseError> {
    let wall = Wall::shuffled(&mut GameRng::new(seed), false, 16);
    let mut expected: Vec<Tile> = wall.tiles().collect();
    expected.sort_unstable();
    let mut state = GameState::new(SeatMap::new(|seat| seat.to_string()));
    state.begin_hand(wall);
    for _ in 0..13 {
        for seat in Seat::all() {
            let tile = state.wall.deal_to(false).unwrap();
            state.players[seat].hand.add(tile, TileSource::Wall);
        }
    }
    prop_assert_eq!(&state.all_tiles(), &expected);

    let mut seat = state.dealer;
    let mut draw = Some(false);
    for &choice in choices {
        if let Some(dead_end) = draw {
            let Ok(tile) = state.wall.deal_to(dead_end) else {
                break;
            };
            let source = if dead_end { TileSource::DeadWall } else { TileSource::Wall };
            state.players[seat].hand.add(tile, source);
            prop_assert_eq!(&state.all_tiles(), &expected, "after drawing {}", tile);
        }

        let kong = state.players[seat].hand.kong_candidates().first().copied();
        if let Some(tile) = kong.filter(|_| choice % 2 == 0) {
            state.players[seat].hand.declare_kong(tile).unwrap();
            prop_assert_eq!(&state.all_tiles(), &expected, "after a kong of {}", tile);
            draw = Some(true);
            continue;
        }

        let concealed = state.players[seat].hand.concealed().to_vec();
        let tile = concealed[usize::from(choice) % concealed.len()];
        state.players[seat].hand.discard(tile).unwrap();
        state.discard(seat, tile);
        prop_assert_eq!(&state.all_tiles(), &expected, "after discarding {}", tile);

        let caller = seat
            .others()
            .find(|other| state.players[*other].hand.count_concealed(tile) >= 2)
            .filter(|_| choice % 3 == 0);
        match caller {
            Some(caller) => {
                let size = if state.players[caller].hand.count_concealed(tile) == 3 { 4 } else { 3 };
                let taken = state.take_last_discard().unwrap();
                state.players[caller].hand.claim_meld(taken, &vec![taken; size]).unwrap();
                prop_assert_eq!(&state.all_tiles(), &expected, "after calling {}", taken);
                seat = caller;
                draw = (size == 4).then_some(true);
            }
            None => {
                seat = seat.next();
                draw = Some(false);
            }
        }
    }
    Ok(())
}

proptest! {
    /// Claimed melds and kongs move tiles without creating or losing any.
    #[test]
    fn test_claims_and_kongs_keep_every_tile(seed in any::<u64>(), choices in prop::collection::vec(any::<u8>(), 1..150)) {
        play_steered_hand(seed, &choices)?;
    }

    /// A shuffled wall holds exactly one tile set.
    #[test]
    fn test_shuffled_wall_keeps_every_tile(seed in any::<u64>(), bonus in any::<bool>()) {
        let wall = Wall::shuffled(&mut GameRng::new(seed), bonus, 16);
        let mut tiles: Vec<Tile> = wall.tiles().collect();
        tiles.sort_unstable();
        let mut expected = Tile::full_set(bonus);
        expected.sort_unstable();
        prop_assert_eq!(tiles, expected);
        prop_assert_eq!(wall.dead_count(), 16);
    }

    /// Shuffling is reproducible from the seed and hand number.
    #[test]
    fn test_same_seed_same_wall(seed in any::<u64>(), hand in 1u32..64) {
        let rng = GameRng::new(seed);
        let a = Wall::shuffled(&mut rng.for_hand(hand), true, 16);
        let b = Wall::shuffled(&mut rng.for_hand(hand), true, 16);
        prop_assert_eq!(a.digest(), b.digest());
        prop_assert_eq!(a, b);
    }

    /// Only the highest claim wins; ties go to the nearest claimant.
    #[test]
    fn test_highest_claim_wins(discarder in 0u8..4, kinds in prop::collection::vec(0usize..5, 3)) {
        let discarder = Seat::new(discarder);
        let answers = answers(discarder, &kinds);
        let top = answers.iter().map(|(_, a)| a.claim_kind()).max().unwrap_or(ClaimKind::NoClaim);
        let contenders: Vec<Seat> = answers
            .iter()
            .filter(|(_, a)| a.claim_kind() == top)
            .map(|(seat, _)| *seat)
            .collect();

        let selected = ClaimArbiter::select(discarder, &answers);
        let mut reversed = answers.clone();
        reversed.reverse();
        prop_assert_eq!(&selected, &ClaimArbiter::select(discarder, &reversed));

        match selected {
            Ok(None) => prop_assert_eq!(top, ClaimKind::NoClaim),
            Ok(Some(decision)) => {
                prop_assert_eq!(decision.kind(), top);
                let nearest = contenders
                    .iter()
                    .min_by_key(|seat| discarder.distance_after(**seat))
                    .copied();
                prop_assert_eq!(Some(decision.seat), nearest);
            }
            Err(ProtocolViolation::DuplicateClaim { kind, .. }) => {
                prop_assert_eq!(kind, top);
                prop_assert_ne!(top, ClaimKind::MahJongg);
                prop_assert!(contenders.len() > 1);
            }
            Err(other) => prop_assert!(false, "unexpected violation {}", other),
        }
    }
}
