//! Response aggregation for one broadcast.
//!
//! An [`Aggregation`] holds one answer slot per addressed seat. It completes
//! when every slot is filled or removed, or when it is forced; the completion
//! callback runs exactly once. Answers are kept in seat order, so the order
//! in which they arrive never changes the outcome.
//!
//! [`collect`] drives one aggregation over the transports: one task per
//! addressee, a shared deadline, default answers for whoever is late.
//! Announcements of answers to the other addressees are bounded by the same
//! timeout and finish before `collect` returns.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::core::{Seat, SeatMap};

use super::message::{Answer, Message};
use super::remote::Remote;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("{0} was not asked")]
    NotAddressed(Seat),

    #[error("{0} answered twice")]
    AlreadyAnswered(Seat),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot {
    Pending,
    Filled(Answer),
    /// The seat went away before answering.
    Removed,
}

pub type CompletionCallback = Box<dyn FnOnce(&[(Seat, Answer)]) + Send>;

/// Answer slots for one broadcast.
pub struct Aggregation {
    slots: Vec<(Seat, Slot)>,
    complete: bool,
    callback: Option<CompletionCallback>,
}

impl std::fmt::Debug for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregation")
            .field("slots", &self.slots)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

impl Aggregation {
    /// One pending slot per addressee. With no addressees it is complete.
    pub fn open(addressees: impl IntoIterator<Item = Seat>) -> Self {
        let mut seats: Vec<Seat> = addressees.into_iter().collect();
        seats.sort_unstable();
        seats.dedup();
        let complete = seats.is_empty();
        Self {
            slots: seats.into_iter().map(|s| (s, Slot::Pending)).collect(),
            complete,
            callback: None,
        }
    }

    fn slot_mut(&mut self, seat: Seat) -> Result<&mut Slot, AggregationError> {
        self.slots
            .iter_mut()
            .find(|(s, _)| *s == seat)
            .map(|(_, slot)| slot)
            .ok_or(AggregationError::NotAddressed(seat))
    }

    /// Fill a slot. Returns `false` if the aggregation already completed and
    /// the answer was ignored.
    pub fn fill(&mut self, seat: Seat, answer: Answer) -> Result<bool, AggregationError> {
        if self.complete {
            return Ok(false);
        }
        let slot = self.slot_mut(seat)?;
        if matches!(slot, Slot::Filled(_)) {
            return Err(AggregationError::AlreadyAnswered(seat));
        }
        if *slot == Slot::Removed {
            return Ok(false);
        }
        *slot = Slot::Filled(answer);
        self.check_complete();
        Ok(true)
    }

    /// Drop a seat's slot, e.g. on disconnect.
    pub fn remove(&mut self, seat: Seat) -> bool {
        if self.complete {
            return false;
        }
        let removed = match self.slot_mut(seat) {
            Ok(slot) if *slot == Slot::Pending => {
                *slot = Slot::Removed;
                true
            }
            _ => false,
        };
        self.check_complete();
        removed
    }

    /// Fill every pending slot with `default` and complete.
    pub fn force_complete(&mut self, default: impl Fn(Seat) -> Answer) {
        if self.complete {
            return;
        }
        for (seat, slot) in &mut self.slots {
            if *slot == Slot::Pending {
                *slot = Slot::Filled(default(*seat));
            }
        }
        self.finish();
    }

    /// Run `callback` on completion, or now if already complete.
    pub fn on_complete(&mut self, callback: CompletionCallback) {
        if self.complete {
            callback(&self.answers());
        } else {
            self.callback = Some(callback);
        }
    }

    fn check_complete(&mut self) {
        if self.slots.iter().all(|(_, slot)| *slot != Slot::Pending) {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.complete = true;
        if let Some(callback) = self.callback.take() {
            callback(&self.answers());
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn pending(&self) -> impl Iterator<Item = Seat> + '_ {
        self.slots.iter().filter(|(_, slot)| *slot == Slot::Pending).map(|(seat, _)| *seat)
    }

    /// Filled answers in seat order.
    #[must_use]
    pub fn answers(&self) -> Vec<(Seat, Answer)> {
        self.slots
            .iter()
            .filter_map(|(seat, slot)| match slot {
                Slot::Filled(answer) => Some((*seat, answer.clone())),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn removed(&self) -> Vec<Seat> {
        self.slots
            .iter()
            .filter(|(_, slot)| *slot == Slot::Removed)
            .map(|(seat, _)| *seat)
            .collect()
    }
}

/// Outcome of [`collect`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collected {
    /// Seat order; late seats carry the default answer.
    pub answers: Vec<(Seat, Answer)>,
    /// Seats whose transport failed.
    pub removed: Vec<Seat>,
    pub timed_out: Vec<Seat>,
}

impl Collected {
    #[must_use]
    pub fn answer_of(&self, seat: Seat) -> Option<&Answer> {
        self.answers.iter().find(|(s, _)| *s == seat).map(|(_, a)| a)
    }
}

/// How [`collect`] treats one broadcast.
#[derive(Clone, Debug)]
pub struct CollectOptions {
    pub timeout: Duration,
    /// Answer for seats still pending at the deadline.
    pub default: Answer,
    /// Announce each answer to the other addressees under this sequence
    /// number.
    pub announce: Option<u32>,
}

/// Ask every addressee and gather the answers.
pub async fn collect(
    remotes: &SeatMap<Arc<dyn Remote>>,
    about: Seat,
    questions: Vec<(Seat, Message)>,
    options: CollectOptions,
) -> Collected {
    let addressees: Vec<Seat> = questions.iter().map(|(seat, _)| *seat).collect();
    let mut aggregation = Aggregation::open(addressees.iter().copied());
    aggregation.on_complete(Box::new(|answers| debug!(answers = answers.len(), "aggregation complete")));

    let mut tasks = JoinSet::new();
    let mut announcements = JoinSet::new();
    for (seat, message) in questions {
        let remote = Arc::clone(&remotes[seat]);
        tasks.spawn(async move { (seat, remote.ask(about, message).await) });
    }

    let deadline = tokio::time::sleep(options.timeout);
    tokio::pin!(deadline);
    let mut timed_out = Vec::new();

    while !aggregation.is_complete() {
        tokio::select! {
            joined = tasks.join_next() => match joined {
                Some(Ok((seat, Ok(answer)))) => {
                    debug!(%seat, ?answer, "answer received");
                    if let Some(seq) = options.announce {
                        announce(&mut announcements, remotes, &addressees, seat, seq, &answer, options.timeout);
                    }
                    if let Err(e) = aggregation.fill(seat, answer) {
                        warn!(%seat, error = %e, "answer dropped");
                    }
                }
                Some(Ok((seat, Err(e)))) => {
                    warn!(%seat, error = %e, "transport lost while waiting for answer");
                    aggregation.remove(seat);
                }
                Some(Err(e)) => warn!(error = %e, "answer task failed"),
                None => break,
            },
            () = &mut deadline => {
                timed_out = aggregation.pending().collect();
                debug!(?timed_out, "claim timeout");
                let default = options.default.clone();
                aggregation.force_complete(|_| default.clone());
            }
        }
    }
    if !aggregation.is_complete() {
        timed_out.extend(aggregation.pending());
        let default = options.default.clone();
        aggregation.force_complete(|_| default.clone());
    }
    while let Some(joined) = announcements.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "announcement task failed");
        }
    }

    Collected {
        answers: aggregation.answers(),
        removed: aggregation.removed(),
        timed_out,
    }
}

fn announce(
    announcements: &mut JoinSet<()>,
    remotes: &SeatMap<Arc<dyn Remote>>,
    addressees: &[Seat],
    from: Seat,
    seq: u32,
    answer: &Answer,
    timeout: Duration,
) {
    let claim = answer.claim_kind();
    for &other in addressees.iter().filter(|s| **s != from) {
        let remote = Arc::clone(&remotes[other]);
        announcements.spawn(async move {
            let message = Message::ClaimAnnounced { seq, claim };
            match tokio::time::timeout(timeout, remote.notify(from, message)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(seat = %other, error = %e, "announcement not delivered"),
                Err(_) => debug!(seat = %other, "announcement timed out"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn seats(ids: &[u8]) -> Vec<Seat> {
        ids.iter().map(|i| Seat::new(*i)).collect()
    }

    #[test]
    fn test_completes_when_all_filled() {
        let mut agg = Aggregation::open(seats(&[1, 2, 3]));
        assert!(agg.fill(Seat::new(2), Answer::NoClaim).unwrap());
        assert!(!agg.is_complete());
        agg.fill(Seat::new(1), Answer::NoClaim).unwrap();
        agg.remove(Seat::new(3));
        assert!(agg.is_complete());
        assert_eq!(agg.answers().len(), 2);
        assert_eq!(agg.removed(), seats(&[3]));
    }

    #[test]
    fn test_callback_fires_once() {
        let fired = Arc::new(Mutex::new(0));
        let mut agg = Aggregation::open(seats(&[0, 1]));
        let counter = Arc::clone(&fired);
        agg.on_complete(Box::new(move |_| *counter.lock().unwrap() += 1));

        agg.fill(Seat::new(0), Answer::NoClaim).unwrap();
        agg.force_complete(|_| Answer::NoClaim);
        agg.force_complete(|_| Answer::NoClaim);
        assert!(!agg.fill(Seat::new(1), Answer::Ready).unwrap());
        assert_eq!(*fired.lock().unwrap(), 1);
        assert_eq!(agg.answers()[1], (Seat::new(1), Answer::NoClaim));
    }

    #[test]
    fn test_callback_runs_immediately_when_complete() {
        let fired = Arc::new(Mutex::new(false));
        let mut agg = Aggregation::open(Vec::new());
        assert!(agg.is_complete());
        let flag = Arc::clone(&fired);
        agg.on_complete(Box::new(move |answers| {
            assert!(answers.is_empty());
            *flag.lock().unwrap() = true;
        }));
        assert!(*fired.lock().unwrap());
    }

    #[test]
    fn test_fill_errors() {
        let mut agg = Aggregation::open(seats(&[1, 2]));
        assert_eq!(
            agg.fill(Seat::new(0), Answer::NoClaim),
            Err(AggregationError::NotAddressed(Seat::new(0)))
        );
        agg.fill(Seat::new(1), Answer::NoClaim).unwrap();
        assert_eq!(
            agg.fill(Seat::new(1), Answer::NoClaim),
            Err(AggregationError::AlreadyAnswered(Seat::new(1)))
        );
    }

    #[test]
    fn test_fill_order_is_irrelevant() {
        let pung = Answer::Claim {
            kind: crate::protocol::ClaimKind::Pung,
            tiles: Vec::new(),
        };
        let mut a = Aggregation::open(seats(&[1, 2, 3]));
        let mut b = Aggregation::open(seats(&[3, 2, 1]));
        a.fill(Seat::new(1), Answer::NoClaim).unwrap();
        a.fill(Seat::new(3), pung.clone()).unwrap();
        a.fill(Seat::new(2), Answer::NoClaim).unwrap();
        b.fill(Seat::new(2), Answer::NoClaim).unwrap();
        b.fill(Seat::new(3), pung).unwrap();
        b.fill(Seat::new(1), Answer::NoClaim).unwrap();
        assert_eq!(a.answers(), b.answers());
    }
}
