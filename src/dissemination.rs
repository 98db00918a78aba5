//! Shared-memory dissemination barrier.
//!
//! No root and no tree: in round `k` every rank signals `(rank + 2^k) mod P`
//! and waits to be signaled by `(rank - 2^k) mod P`. After `ceil(log2 P)`
//! rounds each rank has transitively heard from every other, which is the
//! full rendezvous. Works for any `P`, not only powers of two.
//!
//! Reuse is handled with two parity banks of flags instead of resets:
//! consecutive generations alternate banks, and the logical sense only
//! flips when parity wraps from 1 back to 0. By the time a bank is reused
//! (two generations later) the full-rendezvous guarantee of the generation
//! in between ensures everyone is done reading it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::utils::{Backoff, CachePadded};

use crate::error::BarrierError;
use crate::topology;
use crate::Barrier;

// One rank's flags: flags[parity][round], written by that round's partner.
struct FlagBlock {
    flags: [Box<[CachePadded<AtomicBool>]>; 2],
}

fn flag_bank(rounds: u32) -> Box<[CachePadded<AtomicBool>]> {
    (0..rounds)
        .map(|_| CachePadded::new(AtomicBool::new(false)))
        .collect()
}

/// Shared-memory dissemination barrier instance.
pub struct DisseminationBarrier {
    nodes: Arc<[FlagBlock]>,
}

impl DisseminationBarrier {
    /// Allocates `ceil(log2 participants)` rounds of flags per rank.
    pub fn new(participants: usize) -> Result<Self, BarrierError> {
        if participants == 0 {
            return Err(BarrierError::InvalidParticipantCount);
        }
        let rounds = topology::ceil_log2(participants);
        let nodes: Arc<[FlagBlock]> = (0..participants)
            .map(|_| FlagBlock {
                flags: [flag_bank(rounds), flag_bank(rounds)],
            })
            .collect();
        Ok(Self { nodes })
    }

    /// Hands out one waiter per rank, in rank order.
    pub fn into_waiters(self) -> Vec<DisseminationWaiter> {
        let participants = self.nodes.len();
        let rounds = topology::ceil_log2(participants);
        (0..participants)
            .map(|rank| DisseminationWaiter {
                nodes: Arc::clone(&self.nodes),
                rank,
                peers: (0..rounds)
                    .map(|k| topology::dissemination_peer(rank, k, participants))
                    .collect(),
                parity: 0,
                sense: true,
            })
            .collect()
    }
}

/// One rank's handle onto a [`DisseminationBarrier`].
pub struct DisseminationWaiter {
    nodes: Arc<[FlagBlock]>,
    rank: usize,
    // Outgoing partner per round, fixed at init.
    peers: Box<[usize]>,
    parity: usize,
    sense: bool,
}

impl Barrier for DisseminationWaiter {
    fn rank(&self) -> usize {
        self.rank
    }

    fn participants(&self) -> usize {
        self.nodes.len()
    }

    fn wait(&mut self) -> Result<(), BarrierError> {
        for (k, &peer) in self.peers.iter().enumerate() {
            self.nodes[peer].flags[self.parity][k].store(self.sense, Ordering::Release);

            let mine = &self.nodes[self.rank].flags[self.parity][k];
            let backoff = Backoff::new();
            while mine.load(Ordering::Acquire) != self.sense {
                backoff.snooze();
            }
        }
        if self.parity == 1 {
            self.sense = !self.sense;
        }
        self.parity ^= 1;
        Ok(())
    }
}
