//! Messages from the table to a seat, and the seat's answers.
//!
//! Every message is addressed: the transport call carries the seat the
//! message is about (the discarder, the claimant, the drawer). Private
//! content such as a player's own hand is only put into messages sent to
//! that player.

use serde::{Deserialize, Serialize};

use crate::core::{Seat, SeatMap};
use crate::rules::RulesetHash;
use crate::tiles::{Hand, Meld, MeldKind, Tile, Wind};

/// What a seat wants from a discard, in ascending priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimKind {
    NoClaim,
    Chow,
    Pung,
    Kong,
    MahJongg,
}

impl ClaimKind {
    /// The meld a claim of this kind exposes.
    #[must_use]
    pub const fn meld_kind(self) -> Option<MeldKind> {
        match self {
            ClaimKind::Chow => Some(MeldKind::Chow),
            ClaimKind::Pung => Some(MeldKind::Pung),
            ClaimKind::Kong => Some(MeldKind::Kong),
            ClaimKind::NoClaim | ClaimKind::MahJongg => None,
        }
    }
}

impl std::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClaimKind::NoClaim => "No Claim",
            ClaimKind::Chow => "Chow",
            ClaimKind::Pung => "Pung",
            ClaimKind::Kong => "Kong",
            ClaimKind::MahJongg => "Mah Jongg",
        };
        write!(f, "{name}")
    }
}

/// An event or question sent by the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Asked of every seat before the first hand.
    ReadyForGameStart {
        seat: Seat,
        names: SeatMap<String>,
        ruleset: RulesetHash,
        seed: u64,
    },

    HandStarting {
        hand: u32,
        winds: SeatMap<Wind>,
        round_wind: Wind,
    },

    /// The addressee's own tiles after the deal.
    Dealt { tiles: Vec<Tile> },

    /// A bonus tile set aside; public.
    ShowBonus { tile: Tile },

    /// The drawn tile is only shown to the drawer.
    PickedTile { tile: Option<Tile>, dead_end: bool },

    /// Asked of the active player after a draw or claim.
    YourTurn { seq: u32, hand: Hand },

    Discarded { tile: Tile, original_call: bool },

    /// Asked of every other seat after a discard.
    ClaimOpportunity { seq: u32, tile: Tile, hand: Hand },

    /// Asked of every other seat when a pung is extended to a kong.
    RobKongOpportunity { seq: u32, tile: Tile, hand: Hand },

    /// Another seat's answer to the current claim question.
    ClaimAnnounced { seq: u32, claim: ClaimKind },

    Called { claim: ClaimKind, meld: Meld },

    DeclaredKong { meld: Meld },

    DeclaredMahJongg { hand: Hand },

    HandEnded {
        winner: Option<Seat>,
        scores: SeatMap<i64>,
        payments: SeatMap<i64>,
    },

    GameOver { balances: SeatMap<i64> },

    Aborted { reason: String },
}

/// A seat's answer to a question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Answer {
    Ready,

    NotReady,

    NoClaim,

    Discard { tile: Tile, original_call: bool },

    /// Declare a kong of this tile on one's own turn.
    DeclareKong(Tile),

    /// Chow, pung or kong of the discard; `tiles` includes the discard.
    Claim { kind: ClaimKind, tiles: Vec<Tile> },

    /// The concealed part of a winning hand, grouped into melds. A claimed
    /// discard or robbed tile is part of one of them.
    MahJongg { melds: Vec<Meld> },
}

impl Answer {
    /// Plain discard without an original call.
    #[must_use]
    pub fn discard(tile: Tile) -> Self {
        Answer::Discard {
            tile,
            original_call: false,
        }
    }

    /// How this answer ranks against a discard.
    #[must_use]
    pub fn claim_kind(&self) -> ClaimKind {
        match self {
            Answer::Claim { kind, .. } => *kind,
            Answer::MahJongg { .. } => ClaimKind::MahJongg,
            _ => ClaimKind::NoClaim,
        }
    }
}
