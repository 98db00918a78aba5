//! Classical barrier-synchronization algorithms.
//!
//! A barrier is a rendezvous: none of the `P` cooperating participants may
//! proceed past it until every one of them has reached it. This crate
//! implements four classical constructions of that guarantee, each built
//! around a different communication topology:
//!
//! - [`CentralizedBarrier`] — one shared counter plus a sense-reversing
//!   release flag; the simplest variant and the baseline the others improve
//!   on.
//! - [`TreeBarrier`] — the MCS tree barrier: 4-ary arrival fan-in, binary
//!   wakeup fan-out, every rank spinning only on flags in its own
//!   cache-padded node.
//! - [`DisseminationBarrier`] — `ceil(log2 P)` rounds of pairwise signaling
//!   after which every rank has transitively heard from every other; works
//!   for any `P`, not only powers of two.
//! - [`mp`] — message-passing renditions of the counter, dissemination and
//!   tournament barriers, generic over any blocking point-to-point
//!   [`Transport`].
//!
//! All variants share one lifecycle. Construction validates the participant
//! count and computes the communication topology once, as a pure function
//! of rank and `P`; each rank then drives an arbitrary number of
//! generations through its own waiter handle via [`Barrier::wait`];
//! dropping the handles releases everything. Reuse across generations is
//! race-free by sense reversal (or parity alternation) rather than by
//! resetting shared state, so a fast rank entering generation `g + 1` can
//! never clobber a flag a slow rank is still reading in generation `g`.
//!
//! Waiting is deliberate busy-waiting in the shared-memory variants, with
//! [`crossbeam::utils::Backoff`] degrading to yields once a spin has gone
//! on long enough to suggest oversubscription. The message-passing variants
//! suspend only inside the transport's blocking receive. No variant detects
//! a participant that never shows up: that is a precondition violation, and
//! the wait simply never completes.

pub mod centralized;
pub mod dissemination;
pub mod error;
pub mod mp;
pub mod topology;
pub mod transport;
pub mod tree;

pub use centralized::{CentralizedBarrier, CentralizedWaiter};
pub use dissemination::{DisseminationBarrier, DisseminationWaiter};
pub use error::BarrierError;
pub use transport::{channel_mesh, ChannelTransport, Transport};
pub use tree::{TreeBarrier, TreeWaiter};

/// The contract shared by every barrier flavor in this crate.
///
/// A value of an implementing type belongs to exactly one rank. `wait`
/// takes `&mut self` because the participant-private state (sense bit,
/// parity, generation counter) lives in the handle itself.
pub trait Barrier {
    /// This participant's 0-based rank.
    fn rank(&self) -> usize;

    /// Total number of participants in the group.
    fn participants(&self) -> usize;

    /// Blocks until all participants have entered the current generation.
    ///
    /// Callable repeatedly; each call is one generation. Shared-memory
    /// implementations always return `Ok`; message-passing ones surface
    /// transport faults.
    fn wait(&mut self) -> Result<(), BarrierError>;
}
