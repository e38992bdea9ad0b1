//! Table-to-seat protocol: messages, transports, answer collection and
//! claim arbitration.
//!
//! - `message`: addressed events and questions, and the answers
//! - `remote`: the `Remote` transport trait and the channel-backed peer
//! - `aggregator`: answer slots for one broadcast and async collection
//! - `arbiter`: priority and tie-break between claims on one discard
//! - `robot`: in-process automated player
//! - `violation`: answers that abort the table

pub mod message;
pub mod remote;
pub mod aggregator;
pub mod arbiter;
pub mod robot;
pub mod violation;

pub use message::{Answer, ClaimKind, Message};
pub use remote::{peer_channel, Envelope, PeerEndpoint, PeerRemote, Remote, TransportError};
pub use aggregator::{collect, Aggregation, AggregationError, Collected, CollectOptions, CompletionCallback, Slot};
pub use arbiter::{ClaimArbiter, Decision};
pub use robot::RobotRemote;
pub use violation::ProtocolViolation;
