//! Error taxonomy shared across all barrier flavors.

use thiserror::Error;

/// Errors surfaced by barrier construction and by message-passing waits.
///
/// There are no retryable errors here: once a barrier is built with a
/// valid, matching participant count, a correctly participating group
/// completes every wait. A participant that never arrives is a
/// precondition violation and manifests as a wait that never returns, not
/// as an error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarrierError {
    /// A barrier or transport mesh was requested for zero participants.
    #[error("participant count must be at least 1")]
    InvalidParticipantCount,

    /// A transport endpoint disagrees with its group about membership.
    #[error("rank {rank} is out of range for {participants} participants")]
    RankMismatch { rank: usize, participants: usize },

    /// A peer's channel closed while a signal from it was still expected.
    #[error("transport to rank {peer} disconnected mid-barrier")]
    Disconnected { peer: usize },

    /// A signal arrived stamped for a different generation or round than
    /// the one being waited on.
    #[error("stale signal from rank {peer}: expected stamp {expected:#x}, got {actual:#x}")]
    StaleMessage {
        peer: usize,
        expected: u64,
        actual: u64,
    },
}
