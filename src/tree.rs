//! MCS tree barrier: 4-ary arrival fan-in, binary wakeup fan-out, only
//! local spinning.
//!
//! Each rank owns one node in a shared arena. During arrival it spins on
//! the `child_not_ready` slots of its own node until every live child has
//! reported in, re-arms those slots for the next generation, then reports
//! into the slot its parent spins on. During wakeup a non-root rank spins
//! on its own `parent_sense` until the parent propagates this generation's
//! sense down, then forwards it to its own wakeup children. Every spin
//! variable lives in the spinner's own cache-padded node, so no two ranks
//! contend on a line, and each rank touches a fixed seven locations per
//! generation regardless of `P`.
//!
//! Cross-rank references are `(rank, slot)` indices resolved through the
//! arena rather than pointers; each live slot keeps exactly one writer and
//! one reader for the life of the instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::utils::{Backoff, CachePadded};
use log::debug;

use crate::error::BarrierError;
use crate::topology::{self, TREE_ARRIVAL_ARITY, TREE_WAKEUP_ARITY};
use crate::Barrier;

struct TreeNode {
    have_child: [bool; TREE_ARRIVAL_ARITY],
    child_not_ready: [AtomicBool; TREE_ARRIVAL_ARITY],
    parent_sense: AtomicBool,
}

/// Shared-memory MCS tree barrier instance.
pub struct TreeBarrier {
    nodes: Arc<[CachePadded<TreeNode>]>,
}

impl TreeBarrier {
    /// Allocates the node arena for `participants` ranks. The tree shape is
    /// fixed here and never recomputed.
    pub fn new(participants: usize) -> Result<Self, BarrierError> {
        if participants == 0 {
            return Err(BarrierError::InvalidParticipantCount);
        }
        let nodes: Arc<[CachePadded<TreeNode>]> = (0..participants)
            .map(|i| {
                let have_child = topology::tree_have_child(i, participants);
                CachePadded::new(TreeNode {
                    have_child,
                    child_not_ready: have_child.map(AtomicBool::new),
                    parent_sense: AtomicBool::new(false),
                })
            })
            .collect();
        debug!("tree barrier arena built for {} ranks", participants);
        Ok(Self { nodes })
    }

    /// Hands out one waiter per rank, in rank order.
    pub fn into_waiters(self) -> Vec<TreeWaiter> {
        let participants = self.nodes.len();
        (0..participants)
            .map(|rank| TreeWaiter {
                nodes: Arc::clone(&self.nodes),
                rank,
                parent: topology::tree_parent(rank),
                wakeup_children: topology::tree_wakeup_children(rank, participants),
                sense: true,
            })
            .collect()
    }
}

/// One rank's handle onto a [`TreeBarrier`].
pub struct TreeWaiter {
    nodes: Arc<[CachePadded<TreeNode>]>,
    rank: usize,
    parent: Option<(usize, usize)>,
    wakeup_children: [Option<usize>; TREE_WAKEUP_ARITY],
    sense: bool,
}

impl Barrier for TreeWaiter {
    fn rank(&self) -> usize {
        self.rank
    }

    fn participants(&self) -> usize {
        self.nodes.len()
    }

    fn wait(&mut self) -> Result<(), BarrierError> {
        let node = &self.nodes[self.rank];

        // Arrival: wait for every live child of this node to report in.
        for j in 0..TREE_ARRIVAL_ARITY {
            if node.have_child[j] {
                let backoff = Backoff::new();
                while node.child_not_ready[j].load(Ordering::Acquire) {
                    backoff.snooze();
                }
            }
        }

        // Re-arm before reporting up. The children are still parked in the
        // wakeup phase below, and they observe this store through the
        // parent_sense release that wakes them, so their next-generation
        // report cannot land before it.
        for j in 0..TREE_ARRIVAL_ARITY {
            node.child_not_ready[j].store(node.have_child[j], Ordering::Relaxed);
        }

        if let Some((parent, slot)) = self.parent {
            // Tell the parent this whole subtree has arrived.
            self.nodes[parent].child_not_ready[slot].store(false, Ordering::Release);

            // Wakeup: wait for the parent to propagate this generation's
            // sense. The root skips this and starts the release instead.
            let backoff = Backoff::new();
            while node.parent_sense.load(Ordering::Acquire) != self.sense {
                backoff.snooze();
            }
        }

        for child in self.wakeup_children.into_iter().flatten() {
            self.nodes[child].parent_sense.store(self.sense, Ordering::Release);
        }
        self.sense = !self.sense;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn rejects_zero_participants() {
        assert!(matches!(
            TreeBarrier::new(0),
            Err(BarrierError::InvalidParticipantCount)
        ));
    }

    #[test]
    fn single_rank_never_blocks() {
        let mut waiters = TreeBarrier::new(1).unwrap().into_waiters();
        for _ in 0..10 {
            waiters[0].wait().unwrap();
        }
    }

    #[test]
    fn p4_waiters_see_the_specified_shape() {
        let waiters = TreeBarrier::new(4).unwrap().into_waiters();
        assert_eq!(waiters[0].parent, None);
        for (i, w) in waiters.iter().enumerate().skip(1) {
            assert_eq!(w.parent, Some((0, i - 1)));
        }
        assert_eq!(waiters[0].nodes[0].have_child, [true, true, true, false]);
    }

    #[test]
    fn five_ranks_rendezvous() {
        let waiters = TreeBarrier::new(5).unwrap().into_waiters();
        let arrived = AtomicUsize::new(0);
        thread::scope(|s| {
            for mut w in waiters {
                let arrived = &arrived;
                s.spawn(move || {
                    for g in 1..=8 {
                        arrived.fetch_add(1, Ordering::SeqCst);
                        w.wait().unwrap();
                        assert!(arrived.load(Ordering::SeqCst) >= 5 * g);
                    }
                });
            }
        });
        assert_eq!(arrived.load(Ordering::SeqCst), 40);
    }
}
