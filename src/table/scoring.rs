//! Settlement of a finished hand.
//!
//! ## Payments
//!
//! Every pair of players settles once:
//! - The winner collects their own score from each loser and pays nobody
//! - Two losers settle the difference of their scores
//! - Any amount between East and another player is doubled
//!
//! A drawn hand settles nothing.
//!
//! ## Manual rules
//!
//! Some rules depend on how the hand was won rather than on its tiles. The
//! coordinator describes those circumstances in [`WinCircumstances`] and
//! [`manual_rules`] names the matching rules for the evaluation context.

use crate::core::{Seat, SeatMap};
use crate::rules::EvaluationContext;
use crate::rulesets::classical;
use crate::tiles::TileSource;

/// Amount multiplier for settlements involving the dealer.
const DEALER_FACTOR: i64 = 2;

/// Net change per seat; the payments always sum to zero.
#[must_use]
pub fn payments(scores: &SeatMap<i64>, winner: Option<Seat>, dealer: Seat) -> SeatMap<i64> {
    let mut payments = SeatMap::with_value(0i64);
    let Some(winner) = winner else {
        return payments;
    };
    for payer in Seat::all() {
        for payee in Seat::all().filter(|s| *s > payer) {
            let factor = if payer == dealer || payee == dealer { DEALER_FACTOR } else { 1 };
            // Positive: `payer` pays `payee`.
            let amount = if payee == winner {
                scores[payee]
            } else if payer == winner {
                -scores[payer]
            } else {
                scores[payee] - scores[payer]
            } * factor;
            payments[payer] -= amount;
            payments[payee] += amount;
        }
    }
    payments
}

/// Whether the deal passes on: East did not win.
#[must_use]
pub fn should_rotate(winner: Option<Seat>, dealer: Seat) -> bool {
    winner != Some(dealer)
}

/// How a hand was won.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WinCircumstances {
    pub winner: Seat,
    pub dealer: Seat,
    pub source: TileSource,
    /// Live tiles left in the wall when the hand was won.
    pub wall_remaining: usize,
    /// Discards made in the hand before the winning tile.
    pub discards_before: usize,
    /// The winning tile was the dealer's first discard.
    pub on_first_discard: bool,
}

impl WinCircumstances {
    /// Won on the very first discard of the hand.
    #[must_use]
    pub fn call_at_beginning(&self) -> bool {
        self.on_first_discard && self.source == TileSource::Discard
    }
}

/// Manual rules that hold for a win.
#[must_use]
pub fn manual_rules(win: &WinCircumstances) -> EvaluationContext {
    let mut context = EvaluationContext::new();
    let wall_empty = win.wall_remaining == 0;
    match win.source {
        TileSource::DeadWall => context = context.with_rule(classical::DEAD_WALL),
        TileSource::Wall if wall_empty => context = context.with_rule(classical::LAST_TILE_OF_WALL),
        TileSource::Discard if wall_empty => context = context.with_rule(classical::LAST_TILE_OF_WALL_DISCARDED),
        TileSource::RobbedKong => context = context.with_rule(classical::ROBBING_THE_KONG),
        _ => {}
    }
    if win.call_at_beginning() {
        context = context.with_rule(classical::CALL_AT_BEGINNING);
        if win.winner != win.dealer {
            context = context.with_rule(classical::BLESSING_OF_EARTH);
        }
    }
    if win.winner == win.dealer && win.discards_before == 0 && win.source.is_self_drawn() {
        context = context.with_rule(classical::BLESSING_OF_HEAVEN);
    }
    context
}
