//! Answer collection tests over channel peers.
//!
//! These tests verify collecting answers to one broadcast:
//! - Late seats get the default answer at the deadline
//! - Lost seats are removed instead of awaited
//! - Answers are announced to the other addressees

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use mahjong_table::core::{Seat, SeatMap};
use mahjong_table::protocol::{
    collect, peer_channel, Answer, ClaimKind, CollectOptions, Message, PeerEndpoint, Remote,
};
use mahjong_table::tiles::{Hand, Tile};

const TIMEOUT: Duration = Duration::from_secs(1);
const SEQ: u32 = 17;

/// Answer every question with `answer`, or hold it unanswered when `None`.
/// Returns everything received once the table side is gone.
fn serve(mut endpoint: PeerEndpoint, answer: Option<Answer>) -> JoinHandle<Vec<(Seat, Message)>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        let mut held = Vec::new();
        while let Some(envelope) = endpoint.recv().await {
            seen.push((envelope.about, envelope.message.clone()));
            if envelope.reply.is_none() {
                continue;
            }
            match &answer {
                Some(answer) => envelope.answer(answer.clone()),
                None => held.push(envelope),
            }
        }
        seen
    })
}

fn opportunity() -> Message {
    Message::ClaimOpportunity {
        seq: SEQ,
        tile: Tile::circle(5),
        hand: Hand::from_parts(Vec::new(), Vec::new(), Vec::new()),
    }
}

fn pung() -> Answer {
    Answer::Claim {
        kind: ClaimKind::Pung,
        tiles: vec![Tile::circle(5); 3],
    }
}

fn options(announce: Option<u32>) -> CollectOptions {
    CollectOptions {
        timeout: TIMEOUT,
        default: Answer::NoClaim,
        announce,
    }
}

/// A fast answer, a silent seat and a lost seat: the silent one gets the
/// default at the deadline, the lost one is removed.
#[tokio::test(start_paused = true)]
async fn test_timeout_and_disconnect() {
    let (discarder, _discarder_end) = peer_channel(8);
    let (fast, fast_end) = peer_channel(8);
    let (silent, silent_end) = peer_channel(8);
    let (lost, lost_end) = peer_channel(8);
    drop(lost_end);
    let fast_task = serve(fast_end, Some(pung()));
    let silent_task = serve(silent_end, None);

    let seats: Vec<Arc<dyn Remote>> = vec![Arc::new(discarder), Arc::new(fast), Arc::new(silent), Arc::new(lost)];
    let remotes = SeatMap::from_vec(seats).unwrap();
    let questions = (1..4).map(|i| (Seat::new(i), opportunity())).collect();

    let started = Instant::now();
    let collected = collect(&remotes, Seat::new(0), questions, options(Some(SEQ))).await;
    assert!(started.elapsed() >= TIMEOUT);

    assert_eq!(collected.answer_of(Seat::new(1)), Some(&pung()));
    assert_eq!(collected.answer_of(Seat::new(2)), Some(&Answer::NoClaim));
    assert_eq!(collected.answer_of(Seat::new(3)), None);
    assert_eq!(collected.timed_out, vec![Seat::new(2)]);
    assert_eq!(collected.removed, vec![Seat::new(3)]);

    drop(remotes);
    fast_task.await.unwrap();
    let seen = silent_task.await.unwrap();
    assert!(seen.contains(&(
        Seat::new(1),
        Message::ClaimAnnounced {
            seq: SEQ,
            claim: ClaimKind::Pung,
        }
    )));
}

/// When everybody answers, collection ends without waiting for the
/// deadline and nothing is announced unless asked for.
#[tokio::test(start_paused = true)]
async fn test_complete_before_deadline() {
    let mut tasks = Vec::new();
    let mut seats: Vec<Arc<dyn Remote>> = Vec::new();
    for _ in Seat::all() {
        let (remote, endpoint) = peer_channel(8);
        tasks.push(serve(endpoint, Some(Answer::Ready)));
        seats.push(Arc::new(remote));
    }
    let remotes = SeatMap::from_vec(seats).unwrap();
    let questions = Seat::all().map(|seat| (seat, opportunity())).collect();

    let started = Instant::now();
    let collected = collect(&remotes, Seat::new(0), questions, options(None)).await;
    assert!(started.elapsed() < TIMEOUT);
    assert!(collected.timed_out.is_empty());
    assert!(collected.removed.is_empty());
    assert_eq!(collected.answers.len(), 4);
    assert!(collected.answers.iter().all(|(_, answer)| *answer == Answer::Ready));

    drop(remotes);
    for task in tasks {
        let seen = task.await.unwrap();
        assert_eq!(seen.len(), 1);
    }
}

/// Nobody asked: nothing to wait for.
#[tokio::test(start_paused = true)]
async fn test_empty_broadcast() {
    let remotes: SeatMap<Arc<dyn Remote>> = SeatMap::new(|_| Arc::new(peer_channel(1).0) as Arc<dyn Remote>);
    let collected = collect(&remotes, Seat::new(0), Vec::new(), options(None)).await;
    assert!(collected.answers.is_empty());
    assert!(collected.timed_out.is_empty());
}
