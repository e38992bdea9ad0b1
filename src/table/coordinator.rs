//! Turn coordinator: runs one table from the ready handshake to game over.
//!
//! ## Phases
//!
//! ```text
//! Idle → Dealing → AwaitingDraw → AwaitingDiscardResponse → AwaitingClaims
//!      → Resolving → HandEnd → NextHand | GameEnd
//! ```
//!
//! Any phase may end in `Aborted`. The coordinator owns the wall and the
//! game state; seats only see messages and answer questions through their
//! [`Remote`]. Every wait is bounded by the claim timeout and falls back to
//! a default answer. A seat whose transport fails, including a notification
//! it does not take within the claim timeout, is unreachable for the rest of
//! the game: it is no longer told or asked anything, its claims count as no
//! claim, and its own turn aborts the table.
//!
//! ## Violations
//!
//! An answer the table cannot accept aborts the table. All seats are told
//! why, the reason names the offender, and the partial state stays
//! readable through [`TableCoordinator::state`]. Aborted hands are never
//! scored or recorded. Drawn hands score zero for everybody.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use mahjong_table::core::{Seat, SeatMap, TableConfig};
//! use mahjong_table::protocol::{Remote, RobotRemote};
//! use mahjong_table::rulesets::classical;
//! use mahjong_table::table::{InMemoryPersistence, SeatSetup, TableCoordinator};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().start_paused(true).build().unwrap().block_on(async {
//! let ruleset = Arc::new(classical::ruleset().unwrap());
//! let config = TableConfig::new(7).with_round_limit(1).with_claim_timeout(Duration::from_millis(200));
//! let seats = SeatMap::new(|seat| SeatSetup {
//!     name: format!("Robot {}", seat.index()),
//!     remote: Arc::new(RobotRemote::new(seat, Arc::clone(&ruleset), config.claim_timeout)) as Arc<dyn Remote>,
//! });
//! let mut table = TableCoordinator::new(config, ruleset, seats, Arc::new(InMemoryPersistence::new())).unwrap();
//! let summary = table.run().await.unwrap();
//! assert_eq!(summary.balances.values().sum::<i64>(), 0);
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::{ConfigError, GameRng, GameState, Seat, SeatMap, TableConfig};
use crate::protocol::{
    collect, Answer, ClaimArbiter, ClaimKind, CollectOptions, Collected, Decision, Message, ProtocolViolation, Remote,
};
use crate::rules::decompose;
use crate::rules::{ClaimContext, EncodedHand, EvaluationContext, EvaluationResult, RuleEngine, Ruleset};
use crate::tiles::{HandError, KongOrigin, Meld, Tile, TileSource, Wall};

use super::persistence::{GameId, HandRecord, Persistence, PersistenceError};
use super::scoring::{self, WinCircumstances};

/// Tiles dealt to each seat.
const DEAL_SIZE: usize = 13;

/// Pause before retrying a failed hand record; grows linearly per attempt.
const PERSIST_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TablePhase {
    Idle,
    Dealing,
    AwaitingDraw,
    AwaitingDiscardResponse,
    AwaitingClaims,
    Resolving,
    HandEnd,
    NextHand,
    GameEnd,
    Aborted(String),
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("table aborted: {0}")]
    Aborted(String),

    #[error("game start cancelled: {0} is not ready")]
    NotReady(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// One seat as handed to the coordinator.
#[derive(Clone)]
pub struct SeatSetup {
    pub name: String,
    pub remote: Arc<dyn Remote>,
}

impl std::fmt::Debug for SeatSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatSetup").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Result of one played hand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandOutcome {
    pub hand: u32,
    pub winner: Option<Seat>,
    pub scores: SeatMap<i64>,
    pub payments: SeatMap<i64>,
    /// The winner's evaluation.
    pub result: Option<EvaluationResult>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSummary {
    pub game: GameId,
    pub hands: Vec<HandOutcome>,
    pub balances: SeatMap<i64>,
}

/// How the active player's turn begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TurnStart {
    Draw,
    /// After a kong: draw from the dead end.
    Replacement,
    /// After claiming a chow or pung: discard without drawing.
    AfterClaim,
}

/// How the active player's answer ended their turn.
enum TurnEnd {
    Discarded(Tile),
    Kong,
    Won(WinCircumstances),
}

/// How the claims on a discard were resolved.
enum ClaimEnd {
    Passed,
    Called { seat: Seat, kind: ClaimKind },
    Won(WinCircumstances),
}

pub struct TableCoordinator {
    config: TableConfig,
    ruleset: Arc<Ruleset>,
    remotes: SeatMap<Arc<dyn Remote>>,
    persistence: Arc<dyn Persistence>,
    state: GameState,
    phase: TablePhase,
    rng: GameRng,
    prepared_walls: VecDeque<Wall>,
    game_id: Option<GameId>,
    unreachable: SeatMap<bool>,
}

impl TableCoordinator {
    /// Seat four participants. Fails on an invalid configuration.
    pub fn new(
        config: TableConfig,
        ruleset: Arc<Ruleset>,
        seats: SeatMap<SeatSetup>,
        persistence: Arc<dyn Persistence>,
    ) -> Result<Self, TableError> {
        config.validate()?;
        let names = SeatMap::new(|seat| seats[seat].name.clone());
        let remotes = SeatMap::new(|seat| Arc::clone(&seats[seat].remote));
        Ok(Self {
            rng: GameRng::new(config.seed),
            config,
            ruleset,
            remotes,
            persistence,
            state: GameState::new(names),
            phase: TablePhase::Idle,
            prepared_walls: VecDeque::new(),
            game_id: None,
            unreachable: SeatMap::with_value(false),
        })
    }

    /// Deal the next hand from `wall` instead of a shuffled one.
    #[must_use]
    pub fn with_prepared_wall(mut self, wall: Wall) -> Self {
        self.prepared_walls.push_back(wall);
        self
    }

    /// Mark seats as robots in the game state.
    #[must_use]
    pub fn with_robots(mut self, robots: &[Seat]) -> Self {
        for seat in robots {
            self.state.players[*seat].is_robot = true;
        }
        self
    }

    #[must_use]
    pub fn phase(&self) -> &TablePhase {
        &self.phase
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    #[must_use]
    pub fn game_id(&self) -> Option<GameId> {
        self.game_id
    }

    /// Seats lost to a failed transport, in seating order.
    #[must_use]
    pub fn unreachable_seats(&self) -> Vec<Seat> {
        self.unreachable.iter().filter(|(_, lost)| **lost).map(|(seat, _)| seat).collect()
    }

    /// Play the whole game.
    pub async fn run(&mut self) -> Result<GameSummary, TableError> {
        self.ready_handshake().await?;
        let game = self.persistence.reserve_game_id().await?;
        self.game_id = Some(game);
        info!(%game, seed = self.config.seed, ruleset = self.ruleset.name(), "game starting");

        let mut hands = Vec::new();
        while !self.state.is_finished(self.config.round_limit) {
            let outcome = self.play_hand().await?;
            self.persist(game, &outcome).await?;
            self.phase = TablePhase::NextHand;
            if scoring::should_rotate(outcome.winner, self.state.dealer) && self.state.rotate() {
                info!(round = self.state.round, wind = %self.state.round_wind, "round complete");
            }
            hands.push(outcome);
        }

        self.phase = TablePhase::GameEnd;
        let balances = self.state.balances();
        let message = Message::GameOver {
            balances: balances.clone(),
        };
        self.state.record(self.state.dealer, message.clone());
        self.tell_all(self.state.dealer, message).await;
        info!(%game, hands = hands.len(), ?balances, "game over");
        Ok(GameSummary { game, hands, balances })
    }

    async fn ready_handshake(&mut self) -> Result<(), TableError> {
        let names = SeatMap::new(|seat| self.state.players[seat].name.clone());
        let questions = Seat::all()
            .map(|seat| {
                let message = Message::ReadyForGameStart {
                    seat,
                    names: names.clone(),
                    ruleset: self.ruleset.hash(),
                    seed: self.config.seed,
                };
                (seat, message)
            })
            .collect();
        let options = CollectOptions {
            timeout: self.config.claim_timeout,
            default: Answer::NotReady,
            announce: None,
        };
        let collected = self.ask(self.state.dealer, questions, options).await;

        let refusing = Seat::all().find(|seat| collected.answer_of(*seat) != Some(&Answer::Ready));
        if let Some(seat) = refusing {
            let name = self.state.players[seat].name.clone();
            warn!(%seat, %name, "game start cancelled");
            let reason = format!("{name} is not ready");
            self.phase = TablePhase::Aborted(reason.clone());
            self.tell_all(seat, Message::Aborted { reason }).await;
            return Err(TableError::NotReady(name));
        }
        Ok(())
    }

    async fn persist(&self, game: GameId, outcome: &HandOutcome) -> Result<(), TableError> {
        let record = HandRecord {
            game,
            hand: outcome.hand,
            ruleset: self.ruleset.hash(),
            seed: self.config.seed,
            wall_digest: self.state.wall.digest().to_owned(),
            winner: outcome.winner,
            scores: outcome.scores.clone(),
            payments: outcome.payments.clone(),
            balances: self.state.balances(),
            move_count: self.state.moves_of_hand(outcome.hand).count(),
        };
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.persistence.record_hand(record.clone()).await {
                Ok(ack) => {
                    debug!(%game, hand = outcome.hand, ?ack, "hand persisted");
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < self.config.persist_retries => {
                    warn!(%game, hand = outcome.hand, attempt, error = %e, "recording hand failed, retrying");
                    tokio::time::sleep(PERSIST_BACKOFF * attempt).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Deal and play one hand, then score it.
    pub async fn play_hand(&mut self) -> Result<HandOutcome, TableError> {
        self.phase = TablePhase::Dealing;
        let number = self.state.hand_number + 1;
        let wall = match self.prepared_walls.pop_front() {
            Some(wall) => wall,
            None => Wall::shuffled(
                &mut self.rng.for_hand(number),
                self.config.with_bonus_tiles,
                self.config.dead_wall_size,
            ),
        };
        self.state.begin_hand(wall);
        info!(
            hand = number,
            dealer = %self.state.dealer,
            wind = %self.state.round_wind,
            digest = self.state.wall.digest(),
            "hand starting"
        );

        let starting = Message::HandStarting {
            hand: number,
            winds: self.state.winds(),
            round_wind: self.state.round_wind,
        };
        self.state.record(self.state.dealer, starting.clone());
        self.tell_all(self.state.dealer, starting).await;

        if !self.deal().await {
            info!(hand = number, "wall exhausted while dealing");
            return self.finish_hand(None).await;
        }

        let mut start = TurnStart::Draw;
        loop {
            let active = self.state.active;
            if start != TurnStart::AfterClaim {
                self.phase = TablePhase::AwaitingDraw;
                if self.draw(active, start == TurnStart::Replacement).await.is_none() {
                    info!(hand = number, "wall exhausted, drawn hand");
                    return self.finish_hand(None).await;
                }
            }

            self.phase = TablePhase::AwaitingDiscardResponse;
            let tile = match self.active_turn(active).await? {
                TurnEnd::Won(win) => return self.finish_hand(Some(win)).await,
                TurnEnd::Kong => {
                    start = TurnStart::Replacement;
                    continue;
                }
                TurnEnd::Discarded(tile) => tile,
            };

            self.phase = TablePhase::AwaitingClaims;
            match self.claims(active, tile).await? {
                ClaimEnd::Passed => {
                    self.state.active = active.next();
                    start = TurnStart::Draw;
                }
                ClaimEnd::Called { seat, kind } => {
                    self.state.active = seat;
                    start = if kind == ClaimKind::Kong {
                        TurnStart::Replacement
                    } else {
                        TurnStart::AfterClaim
                    };
                }
                ClaimEnd::Won(win) => return self.finish_hand(Some(win)).await,
            }
        }
    }

    /// Deal thirteen tiles to each seat, dealer first. False when the wall
    /// ran out.
    async fn deal(&mut self) -> bool {
        let dealer = self.state.dealer;
        let order: Vec<Seat> = std::iter::once(dealer).chain(dealer.others()).collect();
        for _ in 0..DEAL_SIZE {
            for &seat in &order {
                if self.draw_silently(seat, false).await.is_none() {
                    return false;
                }
            }
        }
        for &seat in &order {
            let tiles = self.state.players[seat].hand.concealed().to_vec();
            self.tell(seat, seat, Message::Dealt { tiles }).await;
        }
        true
    }

    /// Draw for `seat`, setting bonus tiles aside and replacing them from
    /// the dead end. `None` when the wall is empty.
    async fn draw_silently(&mut self, seat: Seat, mut dead_end: bool) -> Option<Tile> {
        loop {
            let tile = match self.state.wall.deal_to(dead_end) {
                Ok(tile) => tile,
                Err(_) => return None,
            };
            let source = if dead_end { TileSource::DeadWall } else { TileSource::Wall };
            self.state.players[seat].hand.add(tile, source);
            if !tile.is_bonus() {
                return Some(tile);
            }
            debug!(%seat, %tile, "bonus tile");
            let message = Message::ShowBonus { tile };
            self.state.record(seat, message.clone());
            self.tell_all(seat, message).await;
            dead_end = true;
        }
    }

    /// Draw at the start of a turn and show the tile to the drawer only.
    async fn draw(&mut self, seat: Seat, dead_end: bool) -> Option<Tile> {
        let tile = self.draw_silently(seat, dead_end).await?;
        debug!(%seat, %tile, dead_end, remaining = self.state.wall.remaining_count(), "tile drawn");
        self.state.record(
            seat,
            Message::PickedTile {
                tile: Some(tile),
                dead_end,
            },
        );
        for other in Seat::all() {
            let shown = (other == seat).then_some(tile);
            self.tell(other, seat, Message::PickedTile { tile: shown, dead_end }).await;
        }
        Some(tile)
    }

    async fn active_turn(&mut self, seat: Seat) -> Result<TurnEnd, TableError> {
        if self.unreachable[seat] {
            return Err(self.abort(ProtocolViolation::Disconnected(seat)).await);
        }
        let hand = self.state.players[seat].hand.clone();
        let fallback = hand
            .last_tile()
            .filter(|tile| hand.count_concealed(*tile) > 0)
            .or_else(|| hand.concealed().last().copied());
        let default = fallback.map_or(Answer::NoClaim, Answer::discard);

        let question = Message::YourTurn {
            seq: self.state.next_seq(),
            hand,
        };
        let options = CollectOptions {
            timeout: self.config.claim_timeout,
            default,
            announce: None,
        };
        let collected = self.ask(seat, vec![(seat, question)], options).await;
        let answer = match collected.answer_of(seat) {
            Some(answer) if !collected.removed.contains(&seat) => answer.clone(),
            _ => return Err(self.abort(ProtocolViolation::Disconnected(seat)).await),
        };
        debug!(%seat, ?answer, "turn answer");

        match answer {
            Answer::Discard { tile, original_call } => self.discard(seat, tile, original_call).await,
            Answer::DeclareKong(tile) => self.declare_kong(seat, tile).await,
            Answer::MahJongg { melds } => {
                let source = self.state.players[seat].hand.last_source().unwrap_or(TileSource::Wall);
                self.accept_mahjongg(seat, &melds).await?;
                Ok(TurnEnd::Won(self.circumstances(seat, source, false)))
            }
            other => Err(self
                .abort(ProtocolViolation::OutOfTurn {
                    seat,
                    answer: format!("{other:?}"),
                })
                .await),
        }
    }

    async fn discard(&mut self, seat: Seat, tile: Tile, original_call: bool) -> Result<TurnEnd, TableError> {
        if original_call && self.state.players[seat].has_discarded {
            return Err(self.abort(ProtocolViolation::LateOriginalCall(seat)).await);
        }
        if self.state.players[seat].hand.discard(tile).is_err() {
            return Err(self.abort(ProtocolViolation::InvalidDiscard { seat, tile }).await);
        }
        let player = &mut self.state.players[seat];
        player.has_discarded = true;
        player.made_original_call |= original_call;
        player.may_still_win = true;
        self.state.discard(seat, tile);

        let message = Message::Discarded { tile, original_call };
        self.state.record(seat, message.clone());
        self.tell_all(seat, message).await;
        Ok(TurnEnd::Discarded(tile))
    }

    async fn declare_kong(&mut self, seat: Seat, tile: Tile) -> Result<TurnEnd, TableError> {
        let meld = match self.state.players[seat].hand.declare_kong(tile) {
            Ok(meld) => meld,
            Err(reason) => return Err(self.abort(ProtocolViolation::InvalidKong { seat, reason }).await),
        };
        debug!(%seat, %meld, "kong declared");
        let message = Message::DeclaredKong { meld: meld.clone() };
        self.state.record(seat, message.clone());
        self.tell_all(seat, message).await;

        if meld.kong_origin() != Some(KongOrigin::ExtendedPung) {
            return Ok(TurnEnd::Kong);
        }
        match self.rob_kong(seat, tile).await? {
            Some(win) => Ok(TurnEnd::Won(win)),
            None => Ok(TurnEnd::Kong),
        }
    }

    /// Offer the tile that extended a pung to the other seats. Only Mah
    /// Jongg counts.
    async fn rob_kong(&mut self, seat: Seat, tile: Tile) -> Result<Option<WinCircumstances>, TableError> {
        let seq = self.state.next_seq();
        let questions = seat
            .others()
            .map(|other| {
                let hand = self.state.players[other].hand.clone();
                (other, Message::RobKongOpportunity { seq, tile, hand })
            })
            .collect();
        let options = CollectOptions {
            timeout: self.config.claim_timeout,
            default: Answer::NoClaim,
            announce: None,
        };
        let answers: Vec<(Seat, Answer)> = self
            .ask(seat, questions, options)
            .await
            .answers
            .into_iter()
            .map(|(other, answer)| match answer.claim_kind() {
                ClaimKind::MahJongg => (other, answer),
                _ => (other, Answer::NoClaim),
            })
            .collect();
        if let Some(robber) = self.barred_winner(&answers) {
            return Err(self.abort(ProtocolViolation::MayNotWin(robber)).await);
        }

        let Some(decision) = self.arbitrate(seat, tile, TileSource::RobbedKong, &answers).await? else {
            return Ok(None);
        };
        let Answer::MahJongg { melds } = decision.answer else {
            return Ok(None);
        };
        let robber = decision.seat;
        info!(%robber, victim = %seat, %tile, "kong robbed");
        self.state.players[seat].hand.surrender_robbed_tile(tile);
        self.state.players[robber].hand.add(tile, TileSource::RobbedKong);
        self.accept_mahjongg(robber, &melds).await?;
        Ok(Some(self.circumstances(robber, TileSource::RobbedKong, false)))
    }

    async fn claims(&mut self, discarder: Seat, tile: Tile) -> Result<ClaimEnd, TableError> {
        let seq = self.state.next_seq();
        let questions = discarder
            .others()
            .map(|seat| {
                let hand = self.state.players[seat].hand.clone();
                (seat, Message::ClaimOpportunity { seq, tile, hand })
            })
            .collect();
        let options = CollectOptions {
            timeout: self.config.claim_timeout,
            default: Answer::NoClaim,
            announce: Some(seq),
        };
        let answers = self.ask(discarder, questions, options).await.answers;

        if let Some(seat) = self.barred_winner(&answers) {
            return Err(self.abort(ProtocolViolation::MayNotWin(seat)).await);
        }

        self.phase = TablePhase::Resolving;
        let decision = self.arbitrate(discarder, tile, TileSource::Discard, &answers).await?;
        if decision.as_ref().map(Decision::kind) != Some(ClaimKind::MahJongg) {
            self.note_passed_wins(tile, &answers);
        }

        let Some(Decision { seat, answer }) = decision else {
            return Ok(ClaimEnd::Passed);
        };
        let on_first_discard = self.discards_made() == 1;
        self.state.take_last_discard();
        match answer {
            Answer::MahJongg { melds } => {
                self.state.players[seat].hand.add(tile, TileSource::Discard);
                self.accept_mahjongg(seat, &melds).await?;
                Ok(ClaimEnd::Won(self.circumstances(seat, TileSource::Discard, on_first_discard)))
            }
            Answer::Claim { kind, tiles } => {
                self.call(seat, kind, tile, &tiles).await?;
                Ok(ClaimEnd::Called { seat, kind })
            }
            other => Err(self
                .abort(ProtocolViolation::OutOfTurn {
                    seat,
                    answer: format!("{other:?}"),
                })
                .await),
        }
    }

    async fn arbitrate(
        &mut self,
        discarder: Seat,
        tile: Tile,
        source: TileSource,
        answers: &[(Seat, Answer)],
    ) -> Result<Option<Decision>, TableError> {
        let ruleset = Arc::clone(&self.ruleset);
        let decided = ClaimArbiter::new(&ruleset).decide(discarder, tile, source, answers, |seat| self.encode(seat));
        match decided {
            Ok(decision) => {
                if let Some(decision) = &decision {
                    debug!(seat = %decision.seat, claim = %decision.kind(), "claim accepted");
                }
                Ok(decision)
            }
            Err(violation) => Err(self.abort(violation).await),
        }
    }

    /// A seat declaring Mah Jongg on another player's tile after letting a
    /// winning discard pass since its own last discard.
    fn barred_winner(&self, answers: &[(Seat, Answer)]) -> Option<Seat> {
        answers
            .iter()
            .find(|(seat, answer)| answer.claim_kind() == ClaimKind::MahJongg && !self.state.players[*seat].may_still_win)
            .map(|(seat, _)| *seat)
    }

    /// Seats that let a winning discard pass may not win on a discard
    /// until they discard themselves.
    fn note_passed_wins(&mut self, tile: Tile, answers: &[(Seat, Answer)]) {
        for (seat, _) in answers {
            let encoded = self.encode(*seat).with_tile(tile, TileSource::Discard);
            if RuleEngine::maybe_mahjongg(&encoded, &self.ruleset) {
                debug!(%seat, %tile, "winning discard passed");
                self.state.players[*seat].may_still_win = false;
            }
        }
    }

    async fn call(&mut self, seat: Seat, kind: ClaimKind, tile: Tile, tiles: &[Tile]) -> Result<(), TableError> {
        let violation = match Meld::from_tiles(tiles, false) {
            Ok(meld) if Some(meld.kind()) == kind.meld_kind() => None,
            Ok(meld) => Some(ProtocolViolation::WrongClaimKind {
                seat,
                said: kind,
                meld: meld.kind(),
            }),
            Err(e) => Some(ProtocolViolation::BadClaim {
                seat,
                reason: HandError::Meld(e),
            }),
        };
        if let Some(violation) = violation {
            return Err(self.abort(violation).await);
        }
        let meld = match self.state.players[seat].hand.claim_meld(tile, tiles) {
            Ok(meld) => meld,
            Err(reason) => return Err(self.abort(ProtocolViolation::BadClaim { seat, reason }).await),
        };
        debug!(%seat, %meld, claim = %kind, "discard called");
        let message = Message::Called { claim: kind, meld };
        self.state.record(seat, message.clone());
        self.tell_all(seat, message).await;
        Ok(())
    }

    /// Check a declared winning hand: the declared melds must use exactly
    /// the concealed tiles, and the whole hand must win.
    async fn accept_mahjongg(&mut self, seat: Seat, melds: &[Meld]) -> Result<(), TableError> {
        let hand = &self.state.players[seat].hand;
        let mut declared: Vec<Tile> = melds.iter().flat_map(|m| m.tiles().iter().copied()).collect();
        declared.sort_unstable();
        let complete = if melds.is_empty() {
            hand.melds().is_empty() && decompose::is_thirteen_orphans(hand.concealed())
        } else {
            declared == hand.concealed()
        };
        if !complete {
            return Err(self.abort(ProtocolViolation::UnusedConcealedTiles(seat)).await);
        }
        if !RuleEngine::maybe_mahjongg(&self.encode(seat), &self.ruleset) {
            return Err(self.abort(ProtocolViolation::NotWinning(seat)).await);
        }

        let hand = self.state.players[seat].hand.clone();
        info!(%seat, %hand, "mah jongg");
        let message = Message::DeclaredMahJongg { hand };
        self.state.record(seat, message.clone());
        self.tell_all(seat, message).await;
        Ok(())
    }

    fn encode(&self, seat: Seat) -> EncodedHand {
        let player = &self.state.players[seat];
        EncodedHand::encode(
            &player.hand,
            self.state.wind_of(seat),
            self.state.round_wind,
            ClaimContext::default(),
        )
    }

    fn discards_made(&self) -> usize {
        self.state
            .moves_of_hand(self.state.hand_number)
            .filter(|m| matches!(m.message, Message::Discarded { .. }))
            .count()
    }

    fn circumstances(&self, winner: Seat, source: TileSource, on_first_discard: bool) -> WinCircumstances {
        WinCircumstances {
            winner,
            dealer: self.state.dealer,
            source,
            wall_remaining: self.state.wall.remaining_count(),
            discards_before: self.discards_made(),
            on_first_discard,
        }
    }

    async fn finish_hand(&mut self, win: Option<WinCircumstances>) -> Result<HandOutcome, TableError> {
        self.phase = TablePhase::HandEnd;
        let winner = win.map(|w| w.winner);
        let mut scores = SeatMap::with_value(0i64);
        let mut result = None;

        // A drawn hand scores nothing; hands may be short after a failed deal.
        let scored: Vec<Seat> = if winner.is_some() { Seat::all().collect() } else { Vec::new() };
        for seat in scored {
            let mut encoded = self.encode(seat);
            let mut context = EvaluationContext::new();
            if let Some(win) = win.filter(|w| w.winner == seat) {
                encoded = encoded.with_claim_context(ClaimContext {
                    call_at_beginning: win.call_at_beginning(),
                    original_call: self.state.players[seat].made_original_call,
                });
                context = scoring::manual_rules(&win);
            }
            let evaluated = match RuleEngine::evaluate(&encoded, &self.ruleset, &context) {
                Ok(evaluated) => evaluated,
                Err(reason) => return Err(self.abort(ProtocolViolation::Evaluation { seat, reason }).await),
            };
            scores[seat] = evaluated.total_points;
            if Some(seat) == winner {
                if !evaluated.is_winning {
                    return Err(self.abort(ProtocolViolation::NotWinning(seat)).await);
                }
                result = Some(evaluated);
            }
        }

        let payments = scoring::payments(&scores, winner, self.state.dealer);
        for (seat, payment) in payments.iter() {
            self.state.players[seat].balance += payment;
        }
        info!(hand = self.state.hand_number, ?winner, ?scores, ?payments, "hand ended");

        let message = Message::HandEnded {
            winner,
            scores: scores.clone(),
            payments: payments.clone(),
        };
        let about = winner.unwrap_or(self.state.dealer);
        self.state.record(about, message.clone());
        self.tell_all(about, message).await;

        Ok(HandOutcome {
            hand: self.state.hand_number,
            winner,
            scores,
            payments,
            result,
        })
    }

    /// Abort the table over `violation` and tell everybody why.
    async fn abort(&mut self, violation: ProtocolViolation) -> TableError {
        let offender = violation.offender();
        let reason = format!("{}: {violation}", self.state.players[offender].name);
        warn!(%offender, %reason, "table aborted");
        self.phase = TablePhase::Aborted(reason.clone());
        let message = Message::Aborted { reason: reason.clone() };
        self.state.record(offender, message.clone());
        self.tell_all(offender, message).await;
        TableError::Aborted(reason)
    }

    /// Ask the reachable addressees. Seats whose transport fails become
    /// unreachable.
    async fn ask(&mut self, about: Seat, questions: Vec<(Seat, Message)>, options: CollectOptions) -> Collected {
        let questions = questions
            .into_iter()
            .filter(|(seat, _)| !self.unreachable[*seat])
            .collect();
        let collected = collect(&self.remotes, about, questions, options).await;
        for &seat in &collected.removed {
            self.lose(seat);
        }
        collected
    }

    async fn tell(&mut self, to: Seat, about: Seat, message: Message) {
        if self.unreachable[to] {
            return;
        }
        let sent = tokio::time::timeout(self.config.claim_timeout, self.remotes[to].notify(about, message)).await;
        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(seat = %to, error = %e, "notification lost");
                self.lose(to);
            }
            Err(_) => {
                warn!(seat = %to, "notification timed out");
                self.lose(to);
            }
        }
    }

    fn lose(&mut self, seat: Seat) {
        if !self.unreachable[seat] {
            warn!(%seat, name = %self.state.players[seat].name, "seat unreachable, treated as disconnected");
            self.unreachable[seat] = true;
        }
    }

    async fn tell_all(&mut self, about: Seat, message: Message) {
        for seat in Seat::all() {
            self.tell(seat, about, message.clone()).await;
        }
    }
}
