//! Sense-reversing centralized counter barrier.
//!
//! The naive baseline: one shared counter armed to `P` and one shared sense
//! flag. The last rank to arrive re-arms the counter and flips the global
//! sense; everyone else spins until the global sense matches the private
//! sense they brought into this generation. Reversing sense instead of
//! resetting a "released" flag is what makes the barrier reusable: a fast
//! rank starting generation `g + 1` never clears state a slow rank is still
//! reading to leave generation `g`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::{Backoff, CachePadded};

use crate::error::BarrierError;
use crate::Barrier;

struct Shared {
    participants: usize,
    // Padded apart: arrivers hammer `count` while waiters poll `sense`.
    count: CachePadded<AtomicUsize>,
    sense: CachePadded<AtomicBool>,
}

/// Shared-memory centralized barrier instance.
///
/// Construct once, then [`into_waiters`](Self::into_waiters) and hand each
/// handle to its own thread.
pub struct CentralizedBarrier {
    shared: Arc<Shared>,
}

impl CentralizedBarrier {
    /// Allocates the shared counter/sense block for `participants` ranks.
    pub fn new(participants: usize) -> Result<Self, BarrierError> {
        if participants == 0 {
            return Err(BarrierError::InvalidParticipantCount);
        }
        Ok(Self {
            shared: Arc::new(Shared {
                participants,
                count: CachePadded::new(AtomicUsize::new(participants)),
                sense: CachePadded::new(AtomicBool::new(false)),
            }),
        })
    }

    /// Hands out one waiter per rank, in rank order.
    pub fn into_waiters(self) -> Vec<CentralizedWaiter> {
        (0..self.shared.participants)
            .map(|rank| CentralizedWaiter {
                shared: Arc::clone(&self.shared),
                rank,
                local_sense: false,
            })
            .collect()
    }
}

/// One rank's handle onto a [`CentralizedBarrier`].
pub struct CentralizedWaiter {
    shared: Arc<Shared>,
    rank: usize,
    local_sense: bool,
}

impl Barrier for CentralizedWaiter {
    fn rank(&self) -> usize {
        self.rank
    }

    fn participants(&self) -> usize {
        self.shared.participants
    }

    fn wait(&mut self) -> Result<(), BarrierError> {
        self.local_sense = !self.local_sense;
        if self.shared.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last to arrive: re-arm the counter for the next generation
            // before publishing the release.
            self.shared
                .count
                .store(self.shared.participants, Ordering::Relaxed);
            self.shared.sense.store(self.local_sense, Ordering::Release);
        } else {
            let backoff = Backoff::new();
            while self.shared.sense.load(Ordering::Acquire) != self.local_sense {
                backoff.snooze();
            }
        }
        Ok(())
    }
}
