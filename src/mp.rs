//! Message-passing barrier variants.
//!
//! These use no shared memory at all: every arrival and release is a
//! zero-payload signal over a blocking [`Transport`], so the transport's
//! receive is the only suspension point and no separate poll loop exists.
//! Three variants, in increasing sophistication:
//!
//! - [`CounterBarrier`] — rank 0 collects one arrival from every other rank
//!   and then fans a release back out. O(P) at the root; the naive baseline.
//! - [`DisseminationBarrier`] — the doubling scheme; no root, every rank
//!   does `ceil(log2 P)` symmetric exchanges.
//! - [`TournamentBarrier`] — a static pairwise elimination bracket; losers
//!   park after signaling, the champion (always rank 0) turns the bracket
//!   around, winners wake the losers on the way back down.
//!
//! Every signal is stamped with `(generation << 8) | (round << 1) | phase`
//! and receivers verify the stamp, so a signal from a previous generation
//! surfaces as [`BarrierError::StaleMessage`] instead of silently
//! satisfying the wrong wait.

use log::debug;

use crate::error::BarrierError;
use crate::topology::{self, Role, TournamentRound};
use crate::transport::Transport;
use crate::Barrier;

const ARRIVAL: u64 = 0;
const RELEASE: u64 = 1;

fn stamp(generation: u64, round: u32, phase: u64) -> u64 {
    (generation << 8) | (u64::from(round) << 1) | phase
}

fn check_membership<T: Transport>(transport: &T) -> Result<(), BarrierError> {
    let participants = transport.participants();
    if participants == 0 {
        return Err(BarrierError::InvalidParticipantCount);
    }
    if transport.rank() >= participants {
        return Err(BarrierError::RankMismatch {
            rank: transport.rank(),
            participants,
        });
    }
    Ok(())
}

/// Rank-0 collector barrier: every other rank sends one arrival to rank 0
/// and blocks on the release; rank 0 receives all `P - 1` arrivals, then
/// sends each rank its release.
pub struct CounterBarrier<T> {
    transport: T,
    generation: u64,
}

impl<T: Transport> CounterBarrier<T> {
    /// Wraps a transport endpoint. Collective: every rank of the group must
    /// construct its own barrier over its own endpoint.
    pub fn new(transport: T) -> Result<Self, BarrierError> {
        check_membership(&transport)?;
        Ok(Self {
            transport,
            generation: 0,
        })
    }
}

impl<T: Transport> Barrier for CounterBarrier<T> {
    fn rank(&self) -> usize {
        self.transport.rank()
    }

    fn participants(&self) -> usize {
        self.transport.participants()
    }

    fn wait(&mut self) -> Result<(), BarrierError> {
        let participants = self.transport.participants();
        let arrive = stamp(self.generation, 0, ARRIVAL);
        let release = stamp(self.generation, 0, RELEASE);
        if self.transport.rank() == 0 {
            for peer in 1..participants {
                self.transport.recv(peer, arrive)?;
            }
            for peer in 1..participants {
                self.transport.send(peer, release)?;
            }
        } else {
            self.transport.send(0, arrive)?;
            self.transport.recv(0, release)?;
        }
        self.generation += 1;
        Ok(())
    }
}

/// Message-passing dissemination barrier: in round `k`, signal
/// `(rank + 2^k) mod P` and block on the signal from `(rank - 2^k) mod P`.
/// The blocking receive itself enforces the round's wait.
pub struct DisseminationBarrier<T> {
    transport: T,
    rounds: u32,
    generation: u64,
}

impl<T: Transport> DisseminationBarrier<T> {
    /// Wraps a transport endpoint; fixes the round count at
    /// `ceil(log2 P)`.
    pub fn new(transport: T) -> Result<Self, BarrierError> {
        check_membership(&transport)?;
        let rounds = topology::ceil_log2(transport.participants());
        Ok(Self {
            transport,
            rounds,
            generation: 0,
        })
    }
}

impl<T: Transport> Barrier for DisseminationBarrier<T> {
    fn rank(&self) -> usize {
        self.transport.rank()
    }

    fn participants(&self) -> usize {
        self.transport.participants()
    }

    fn wait(&mut self) -> Result<(), BarrierError> {
        let participants = self.transport.participants();
        let rank = self.transport.rank();
        for k in 0..self.rounds {
            let s = stamp(self.generation, k, ARRIVAL);
            self.transport
                .send(topology::dissemination_peer(rank, k, participants), s)?;
            self.transport
                .recv(topology::dissemination_source(rank, k, participants), s)?;
        }
        self.generation += 1;
        Ok(())
    }
}

/// Message-passing tournament barrier over a static elimination bracket.
///
/// Arrival climbs from round 1: a loser signals its opponent and leaves the
/// phase, a winner blocks for its opponent's signal and climbs, a bye
/// climbs silently, and the champion — always rank 0, in the top round —
/// collects the last arrival and answers it, starting the release. Wakeup
/// descends from wherever arrival stopped: winners wake the loser that
/// ceded to them, and reaching the round-0 dropout ends the generation.
/// Roles and opponents are immutable for the life of the instance, so no
/// re-arming step exists.
pub struct TournamentBarrier<T> {
    transport: T,
    bracket: Vec<TournamentRound>,
    generation: u64,
}

impl<T: Transport> TournamentBarrier<T> {
    /// Wraps a transport endpoint and computes this rank's bracket once.
    pub fn new(transport: T) -> Result<Self, BarrierError> {
        check_membership(&transport)?;
        let bracket = topology::tournament_bracket(transport.rank(), transport.participants());
        debug!(
            "tournament bracket for rank {}/{} spans {} rounds",
            transport.rank(),
            transport.participants(),
            bracket.len()
        );
        Ok(Self {
            transport,
            bracket,
            generation: 0,
        })
    }
}

impl<T: Transport> Barrier for TournamentBarrier<T> {
    fn rank(&self) -> usize {
        self.transport.rank()
    }

    fn participants(&self) -> usize {
        self.transport.participants()
    }

    fn wait(&mut self) -> Result<(), BarrierError> {
        // A lone rank's bracket holds only the round-0 dropout.
        if self.bracket.len() == 1 {
            self.generation += 1;
            return Ok(());
        }

        // Arrival: climb until eliminated (loser) or crowned (champion).
        let mut round = 1;
        loop {
            let here = self.bracket[round];
            match (here.role, here.opponent) {
                (Role::Loser, Some(opponent)) => {
                    self.transport
                        .send(opponent, stamp(self.generation, round as u32, ARRIVAL))?;
                    self.transport
                        .recv(opponent, stamp(self.generation, round as u32, RELEASE))?;
                    break;
                }
                (Role::Winner, Some(opponent)) => {
                    self.transport
                        .recv(opponent, stamp(self.generation, round as u32, ARRIVAL))?;
                }
                (Role::Champion, Some(opponent)) => {
                    self.transport
                        .recv(opponent, stamp(self.generation, round as u32, ARRIVAL))?;
                    self.transport
                        .send(opponent, stamp(self.generation, round as u32, RELEASE))?;
                    break;
                }
                // A bye climbs without talking; dropout/inactive rounds are
                // never climbed into.
                _ => {}
            }
            round += 1;
        }

        // Wakeup: descend from wherever arrival stopped, waking the loser
        // that ceded each round on the way up.
        loop {
            round -= 1;
            let here = self.bracket[round];
            match (here.role, here.opponent) {
                (Role::Winner, Some(opponent)) => {
                    self.transport
                        .send(opponent, stamp(self.generation, round as u32, RELEASE))?;
                }
                (Role::Dropout, _) => break,
                _ => {}
            }
        }

        self.generation += 1;
        Ok(())
    }
}
