//! In-process robot player.
//!
//! Robots win whenever the rule engine says they can, claim every pung and
//! kong, declare kongs as soon as they hold them, and otherwise discard
//! their least connected tile.
//!
//! ## Chow back-off
//!
//! A chow loses to any other claim, so a robot that could chow first waits
//! for the other seats' announcements: it chows at once when both other
//! seats passed, gives up when someone claims more, and chows anyway when
//! its budget of 0.95 × claim timeout runs out. Waits double from 20ms.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::Seat;
use crate::rules::{ClaimContext, EncodedHand, RuleEngine, Ruleset};
use crate::tiles::{Hand, Meld, Tile, TileSource, Wind};

use super::message::{Answer, ClaimKind, Message};
use super::remote::{Remote, TransportError};

const FIRST_BACKOFF: Duration = Duration::from_millis(20);
const BACKOFF_SHARE: f64 = 0.95;

#[derive(Debug)]
struct RobotView {
    own_wind: Wind,
    round_wind: Wind,
    /// (seq, seat, claim) announcements.
    announced: Vec<(u32, Seat, ClaimKind)>,
}

/// A robot seat.
#[derive(Debug)]
pub struct RobotRemote {
    seat: Seat,
    ruleset: Arc<Ruleset>,
    claim_timeout: Duration,
    view: Mutex<RobotView>,
}

enum Verdict {
    Chow,
    Yield,
    Wait,
}

impl RobotRemote {
    #[must_use]
    pub fn new(seat: Seat, ruleset: Arc<Ruleset>, claim_timeout: Duration) -> Self {
        Self {
            seat,
            ruleset,
            claim_timeout,
            view: Mutex::new(RobotView {
                own_wind: Wind::East,
                round_wind: Wind::East,
                announced: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn seat(&self) -> Seat {
        self.seat
    }

    async fn winds(&self) -> (Wind, Wind) {
        let view = self.view.lock().await;
        (view.own_wind, view.round_wind)
    }

    /// Concealed melds of a winning hand, if `hand` (plus `extra`) wins.
    async fn winning(&self, hand: &Hand, extra: Option<(Tile, TileSource)>) -> Option<Vec<Meld>> {
        let (own, round) = self.winds().await;
        let mut encoded = EncodedHand::encode(hand, own, round, ClaimContext::default());
        if let Some((tile, source)) = extra {
            encoded = encoded.with_tile(tile, source);
        }
        let mut melds = RuleEngine::winning_melds(&encoded, &self.ruleset)?;
        Some(melds.split_off(hand.melds().len().min(melds.len())))
    }

    async fn take_turn(&self, hand: &Hand) -> Answer {
        if let Some(melds) = self.winning(hand, None).await {
            return Answer::MahJongg { melds };
        }
        if let Some(tile) = hand.kong_candidates().first() {
            return Answer::DeclareKong(*tile);
        }
        match choose_discard(hand) {
            Some(tile) => Answer::discard(tile),
            None => Answer::NoClaim,
        }
    }

    async fn consider_discard(&self, seq: u32, discarder: Seat, tile: Tile, hand: &Hand) -> Answer {
        if let Some(melds) = self.winning(hand, Some((tile, TileSource::Discard))).await {
            return Answer::MahJongg { melds };
        }
        match hand.count_concealed(tile) {
            n if n >= 3 => {
                return Answer::Claim {
                    kind: ClaimKind::Kong,
                    tiles: vec![tile; 4],
                }
            }
            2 => {
                return Answer::Claim {
                    kind: ClaimKind::Pung,
                    tiles: vec![tile; 3],
                }
            }
            _ => {}
        }
        if discarder.next() == self.seat {
            if let Some(tiles) = chow_options(hand, tile).into_iter().next() {
                return self.chow_after_backoff(seq, tiles).await;
            }
        }
        Answer::NoClaim
    }

    async fn verdict(&self, seq: u32) -> Verdict {
        let view = self.view.lock().await;
        let others = view.announced.iter().filter(|(s, seat, _)| *s == seq && *seat != self.seat);
        let mut passes = 0;
        for (_, _, claim) in others {
            if *claim > ClaimKind::Chow {
                return Verdict::Yield;
            }
            if *claim == ClaimKind::NoClaim {
                passes += 1;
            }
        }
        if passes >= 2 {
            Verdict::Chow
        } else {
            Verdict::Wait
        }
    }

    async fn chow_after_backoff(&self, seq: u32, tiles: Vec<Tile>) -> Answer {
        let chow = Answer::Claim {
            kind: ClaimKind::Chow,
            tiles,
        };
        let budget = self.claim_timeout.mul_f64(BACKOFF_SHARE);
        let mut waited = Duration::ZERO;
        let mut step = FIRST_BACKOFF;
        loop {
            match self.verdict(seq).await {
                Verdict::Chow => return chow,
                Verdict::Yield => return Answer::NoClaim,
                Verdict::Wait => {}
            }
            if waited >= budget {
                debug!(seat = %self.seat, seq, "chow back-off exhausted");
                return chow;
            }
            let pause = step.min(budget - waited);
            tokio::time::sleep(pause).await;
            waited += pause;
            step *= 2;
        }
    }
}

#[async_trait]
impl Remote for RobotRemote {
    async fn notify(&self, about: Seat, message: Message) -> Result<(), TransportError> {
        let mut view = self.view.lock().await;
        match message {
            Message::HandStarting { winds, round_wind, .. } => {
                view.own_wind = winds[self.seat];
                view.round_wind = round_wind;
                view.announced.clear();
            }
            Message::ClaimAnnounced { seq, claim } => view.announced.push((seq, about, claim)),
            _ => {}
        }
        Ok(())
    }

    async fn ask(&self, about: Seat, message: Message) -> Result<Answer, TransportError> {
        let answer = match message {
            Message::ReadyForGameStart { .. } => Answer::Ready,
            Message::YourTurn { hand, .. } => self.take_turn(&hand).await,
            Message::ClaimOpportunity { seq, tile, hand } => self.consider_discard(seq, about, tile, &hand).await,
            Message::RobKongOpportunity { tile, hand, .. } => {
                match self.winning(&hand, Some((tile, TileSource::RobbedKong))).await {
                    Some(melds) => Answer::MahJongg { melds },
                    None => Answer::NoClaim,
                }
            }
            _ => Answer::NoClaim,
        };
        Ok(answer)
    }
}

/// Tiles of every chow the hand can form with `tile`, claimed tile included.
#[must_use]
pub fn chow_options(hand: &Hand, tile: Tile) -> Vec<Vec<Tile>> {
    if !tile.is_suited() {
        return Vec::new();
    }
    let rank = tile.rank();
    (rank.saturating_sub(2).max(1)..=rank)
        .filter_map(|first| {
            let first = Tile::new(tile.suit(), first)?;
            let meld = Meld::chow(first, false)?;
            let own: Vec<Tile> = meld.tiles().iter().copied().filter(|t| *t != tile).collect();
            hand.has_concealed(&own).then(|| meld.tiles().to_vec())
        })
        .collect()
}

/// The concealed tile with the fewest partners; ties go to the higher tile.
#[must_use]
pub fn choose_discard(hand: &Hand) -> Option<Tile> {
    hand.concealed()
        .iter()
        .copied()
        .min_by_key(|tile| (connections(hand, *tile), Reverse(*tile)))
}

fn connections(hand: &Hand, tile: Tile) -> usize {
    let same = hand.count_concealed(tile) - 1;
    let near = if tile.is_suited() {
        hand.concealed()
            .iter()
            .filter(|t| t.suit() == tile.suit() && t.rank().abs_diff(tile.rank()) as usize <= 2 && **t != tile)
            .count()
    } else {
        0
    };
    same * 3 + near
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SeatMap;
    use crate::rulesets::classical;
    use crate::tiles::parse_tiles;

    fn robot(seat: u8) -> RobotRemote {
        RobotRemote::new(
            Seat::new(seat),
            Arc::new(classical::ruleset().unwrap()),
            Duration::from_secs(1),
        )
    }

    fn hand(tiles: &str) -> Hand {
        Hand::from_parts(parse_tiles(tiles).unwrap(), Vec::new(), Vec::new())
    }

    #[test]
    fn test_chow_options() {
        let h = hand("b2b3b5c1");
        let options = chow_options(&h, Tile::bamboo(4));
        assert_eq!(options.len(), 2);
        assert!(chow_options(&h, Tile::circle(2)).is_empty());
    }

    #[test]
    fn test_choose_discard_prefers_isolated_honour() {
        let h = hand("b1b2b3c5c5dgwe");
        // dg and we are both isolated; the higher tile goes first
        let tile = choose_discard(&h).unwrap();
        assert!(tile.is_honour());
        assert_eq!(tile, Tile::dragon(crate::tiles::Dragon::Green).max(Tile::wind(Wind::East)));
    }

    #[tokio::test]
    async fn test_claims_pung() {
        let r = robot(2);
        let answer = r
            .ask(
                Seat::new(0),
                Message::ClaimOpportunity {
                    seq: 1,
                    tile: Tile::circle(5),
                    hand: hand("s5s5b1b2b4c7c8c9dgdgwewewn"),
                },
            )
            .await
            .unwrap();
        assert_eq!(answer.claim_kind(), ClaimKind::Pung);
    }

    #[tokio::test]
    async fn test_claims_winning_discard() {
        let r = robot(1);
        r.notify(
            Seat::new(0),
            Message::HandStarting {
                hand: 1,
                winds: SeatMap::new(|s| Wind::from_index(s.index())),
                round_wind: Wind::East,
            },
        )
        .await
        .unwrap();
        let answer = r
            .ask(
                Seat::new(0),
                Message::ClaimOpportunity {
                    seq: 1,
                    tile: Tile::circle(1),
                    hand: hand("c1c2c3c4c5c6c7c8c9b1b2b3s1"),
                },
            )
            .await
            .unwrap();
        match answer {
            Answer::MahJongg { melds } => assert_eq!(melds.len(), 5),
            other => panic!("expected Mah Jongg, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_chow_waits_for_passes() {
        let r = Arc::new(robot(1));
        let asking = Arc::clone(&r);
        let task = tokio::spawn(async move {
            asking
                .ask(
                    Seat::new(0),
                    Message::ClaimOpportunity {
                        seq: 3,
                        tile: Tile::bamboo(4),
                        hand: hand("b2b3c1c1c9wewswwwndbdgdrs9"),
                    },
                )
                .await
        });
        r.notify(Seat::new(2), Message::ClaimAnnounced { seq: 3, claim: ClaimKind::NoClaim })
            .await
            .unwrap();
        r.notify(Seat::new(3), Message::ClaimAnnounced { seq: 3, claim: ClaimKind::NoClaim })
            .await
            .unwrap();
        let answer = task.await.unwrap().unwrap();
        assert_eq!(answer.claim_kind(), ClaimKind::Chow);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chow_yields_to_pung() {
        let r = Arc::new(robot(1));
        r.notify(Seat::new(3), Message::ClaimAnnounced { seq: 4, claim: ClaimKind::Pung })
            .await
            .unwrap();
        let answer = r
            .ask(
                Seat::new(0),
                Message::ClaimOpportunity {
                    seq: 4,
                    tile: Tile::bamboo(4),
                    hand: hand("b2b3c1c1c9wewswwwndbdgdrs9"),
                },
            )
            .await
            .unwrap();
        assert_eq!(answer, Answer::NoClaim);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chow_after_budget() {
        let r = robot(1);
        let start = tokio::time::Instant::now();
        let answer = r
            .ask(
                Seat::new(0),
                Message::ClaimOpportunity {
                    seq: 5,
                    tile: Tile::bamboo(4),
                    hand: hand("b2b3c1c1c9wewswwwndbdgdrs9"),
                },
            )
            .await
            .unwrap();
        assert_eq!(answer.claim_kind(), ClaimKind::Chow);
        assert!(start.elapsed() <= Duration::from_millis(950));
        assert!(start.elapsed() >= Duration::from_millis(900));
    }

    /// With exposed melds, the declared melds cover the concealed tiles
    /// and the claimed tile, nothing else.
    #[tokio::test]
    async fn test_winning_declaration_skips_exposed_melds() {
        let r = robot(1);
        let exposed = vec!["b5b5b5".parse().unwrap(), "s7s8s9".parse().unwrap()];
        let hand = Hand::from_parts(parse_tiles("c1c2c3dgdgdgwe").unwrap(), exposed, Vec::new());
        let answer = r
            .ask(
                Seat::new(0),
                Message::ClaimOpportunity {
                    seq: 6,
                    tile: Tile::wind(Wind::East),
                    hand,
                },
            )
            .await
            .unwrap();
        let Answer::MahJongg { melds } = answer else {
            panic!("expected Mah Jongg, got {answer:?}");
        };
        let mut declared: Vec<Tile> = melds.iter().flat_map(|m| m.tiles().iter().copied()).collect();
        declared.sort_unstable();
        assert_eq!(declared, parse_tiles("c1c2c3wewedgdgdg").unwrap());
    }
}
