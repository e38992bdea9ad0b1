//! Transport to one seat.
//!
//! The table talks to every seat through [`Remote`]: `notify` is
//! fire-and-forget and must not wait on the seat, `ask` waits for an
//! [`Answer`]. Robots implement it
//! in-process; a network peer is reached through [`PeerRemote`], the table
//! end of a channel pair whose other end ([`PeerEndpoint`]) belongs to the
//! connection handler.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::core::Seat;

use super::message::{Answer, Message};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection lost")]
    Disconnected,

    /// The seat stopped reading and its queue is full.
    #[error("peer is not reading")]
    Stalled,
}

/// One seat's transport.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Deliver an event; no answer expected. Returns without waiting for
    /// the seat to read it.
    async fn notify(&self, about: Seat, message: Message) -> Result<(), TransportError>;

    /// Deliver a question and wait for the answer.
    async fn ask(&self, about: Seat, message: Message) -> Result<Answer, TransportError>;
}

/// A message as seen by the connection handler.
#[derive(Debug)]
pub struct Envelope {
    pub about: Seat,
    pub message: Message,
    /// Present for questions.
    pub reply: Option<oneshot::Sender<Answer>>,
}

impl Envelope {
    /// Answer a question. Events and dropped tables are ignored.
    pub fn answer(self, answer: Answer) {
        if let Some(reply) = self.reply {
            let _ = reply.send(answer);
        }
    }
}

/// The table end of a network peer.
#[derive(Clone, Debug)]
pub struct PeerRemote {
    outbox: mpsc::Sender<Envelope>,
}

/// The connection end of a network peer.
#[derive(Debug)]
pub struct PeerEndpoint {
    inbox: mpsc::Receiver<Envelope>,
}

impl PeerEndpoint {
    /// Next message from the table; `None` once the table dropped its end.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.inbox.recv().await
    }
}

/// Create a connected peer pair with room for `capacity` queued messages.
#[must_use]
pub fn peer_channel(capacity: usize) -> (PeerRemote, PeerEndpoint) {
    let (outbox, inbox) = mpsc::channel(capacity.max(1));
    (PeerRemote { outbox }, PeerEndpoint { inbox })
}

#[async_trait]
impl Remote for PeerRemote {
    async fn notify(&self, about: Seat, message: Message) -> Result<(), TransportError> {
        let envelope = Envelope {
            about,
            message,
            reply: None,
        };
        self.outbox.try_send(envelope).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Stalled,
            TrySendError::Closed(_) => TransportError::Disconnected,
        })
    }

    async fn ask(&self, about: Seat, message: Message) -> Result<Answer, TransportError> {
        let (reply, answer) = oneshot::channel();
        self.outbox
            .send(Envelope {
                about,
                message,
                reply: Some(reply),
            })
            .await
            .map_err(|_| TransportError::Disconnected)?;
        answer.await.map_err(|_| TransportError::Disconnected)
    }
}
