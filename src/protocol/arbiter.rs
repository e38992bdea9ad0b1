//! Claim arbitration.
//!
//! Of all answers to one discard only the highest claim counts:
//! Mah Jongg > Kong > Pung > Chow > No Claim. Lower claims are dropped
//! without notice. Several Mah Jongg claims go to the claimant seated nearest
//! the discarder on the side it passes the turn from: with East, South,
//! West, North seated in that order, South beats East on a West discard.
//! Two equal lower claims are a violation, as is a Chow from anyone but
//! the next seat.
//!
//! A Mah Jongg claim is checked with the rule engine before it is accepted.

use crate::core::Seat;
use crate::rules::{EncodedHand, RuleEngine, Ruleset};
use crate::tiles::{Tile, TileSource};

use super::message::{Answer, ClaimKind};
use super::violation::ProtocolViolation;

/// The accepted claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub seat: Seat,
    pub answer: Answer,
}

impl Decision {
    #[must_use]
    pub fn kind(&self) -> ClaimKind {
        self.answer.claim_kind()
    }
}

/// Arbiter for one ruleset.
#[derive(Clone, Copy, Debug)]
pub struct ClaimArbiter<'a> {
    ruleset: &'a Ruleset,
}

impl<'a> ClaimArbiter<'a> {
    #[must_use]
    pub fn new(ruleset: &'a Ruleset) -> Self {
        Self { ruleset }
    }

    /// Pick the winning claim by priority alone.
    pub fn select(discarder: Seat, answers: &[(Seat, Answer)]) -> Result<Option<Decision>, ProtocolViolation> {
        if let Some((seat, _)) = answers
            .iter()
            .find(|(seat, answer)| answer.claim_kind() == ClaimKind::Chow && *seat != discarder.next())
        {
            return Err(ProtocolViolation::ChowOutOfTurn(*seat));
        }

        let Some(top) = answers.iter().map(|(_, a)| a.claim_kind()).max() else {
            return Ok(None);
        };
        if top == ClaimKind::NoClaim {
            return Ok(None);
        }

        let mut best: Vec<&(Seat, Answer)> = answers.iter().filter(|(_, a)| a.claim_kind() == top).collect();
        best.sort_by_key(|(seat, _)| discarder.distance_after(*seat));
        if top != ClaimKind::MahJongg && best.len() > 1 {
            return Err(ProtocolViolation::DuplicateClaim {
                kind: top,
                first: best[0].0,
                second: best[1].0,
            });
        }
        Ok(best.first().map(|(seat, answer)| Decision {
            seat: *seat,
            answer: answer.clone(),
        }))
    }

    /// Pick the winning claim and verify a Mah Jongg claim.
    ///
    /// `encode` yields the claimant's hand without the claimed tile.
    pub fn decide(
        &self,
        discarder: Seat,
        tile: Tile,
        source: TileSource,
        answers: &[(Seat, Answer)],
        encode: impl Fn(Seat) -> EncodedHand,
    ) -> Result<Option<Decision>, ProtocolViolation> {
        let decision = Self::select(discarder, answers)?;
        if let Some(decision) = &decision {
            if decision.kind() == ClaimKind::MahJongg {
                let encoded = encode(decision.seat).with_tile(tile, source);
                if !RuleEngine::maybe_mahjongg(&encoded, self.ruleset) {
                    return Err(ProtocolViolation::NotWinning(decision.seat));
                }
            }
        }
        Ok(decision)
    }
}
