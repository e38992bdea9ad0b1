//! Protocol violations: answers the table cannot accept.
//!
//! Every violation names the offending seat. The table aborts on the first
//! one and does not retry.

use thiserror::Error;

use crate::core::Seat;
use crate::rules::RuleError;
use crate::tiles::{HandError, MeldKind, Tile};

use super::message::ClaimKind;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("{0} said Chow but does not play next")]
    ChowOutOfTurn(Seat),

    #[error("{first} and {second} both said {kind}")]
    DuplicateClaim { kind: ClaimKind, first: Seat, second: Seat },

    #[error("{seat} said {said} for a {meld}")]
    WrongClaimKind { seat: Seat, said: ClaimKind, meld: MeldKind },

    #[error("{seat} claimed a tile: {reason}")]
    BadClaim { seat: Seat, reason: HandError },

    #[error("{seat} declared an invalid kong: {reason}")]
    InvalidKong { seat: Seat, reason: HandError },

    #[error("{0} claimed Mah Jongg without passing all concealed tiles")]
    UnusedConcealedTiles(Seat),

    #[error("{0} claimed Mah Jongg but this is not a winning hand")]
    NotWinning(Seat),

    #[error("{0} passed on a winning discard and may not win on a discard before discarding again")]
    MayNotWin(Seat),

    #[error("{seat} discarded {tile} but does not have it")]
    InvalidDiscard { seat: Seat, tile: Tile },

    #[error("{0} made an original call after their first discard")]
    LateOriginalCall(Seat),

    #[error("{seat} answered {answer} out of turn")]
    OutOfTurn { seat: Seat, answer: String },

    #[error("{0} lost the connection while active")]
    Disconnected(Seat),

    #[error("hand of {seat} could not be evaluated: {reason}")]
    Evaluation { seat: Seat, reason: RuleError },
}

impl ProtocolViolation {
    /// The seat at fault.
    #[must_use]
    pub fn offender(&self) -> Seat {
        match self {
            ProtocolViolation::ChowOutOfTurn(seat)
            | ProtocolViolation::UnusedConcealedTiles(seat)
            | ProtocolViolation::NotWinning(seat)
            | ProtocolViolation::MayNotWin(seat)
            | ProtocolViolation::LateOriginalCall(seat)
            | ProtocolViolation::Disconnected(seat) => *seat,
            ProtocolViolation::DuplicateClaim { second, .. } => *second,
            ProtocolViolation::WrongClaimKind { seat, .. }
            | ProtocolViolation::BadClaim { seat, .. }
            | ProtocolViolation::InvalidKong { seat, .. }
            | ProtocolViolation::InvalidDiscard { seat, .. }
            | ProtocolViolation::OutOfTurn { seat, .. }
            | ProtocolViolation::Evaluation { seat, .. } => *seat,
        }
    }
}
