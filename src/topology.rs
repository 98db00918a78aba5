//! Closed-form communication topologies.
//!
//! Every barrier in this crate works out who talks to whom exactly once, at
//! construction time, as a pure function of `(rank, participant count)`.
//! Those functions live here, away from any thread or atomic, which is what
//! makes them testable by plain recomputation.

use log::trace;

/// Rounds needed for information to reach every rank by doubling:
/// `ceil(log2(p))`. Zero for `p = 1`.
pub fn ceil_log2(p: usize) -> u32 {
    debug_assert!(p >= 1);
    p.next_power_of_two().trailing_zeros()
}

/// Arrival fan-in of the tree barrier.
pub const TREE_ARRIVAL_ARITY: usize = 4;

/// Wakeup fan-out of the tree barrier.
pub const TREE_WAKEUP_ARITY: usize = 2;

/// Which of rank `i`'s four arrival slots have a live child behind them:
/// slot `j` is live iff `4*i + j + 1 < p`.
pub fn tree_have_child(i: usize, p: usize) -> [bool; TREE_ARRIVAL_ARITY] {
    let mut have = [false; TREE_ARRIVAL_ARITY];
    for (j, slot) in have.iter_mut().enumerate() {
        *slot = TREE_ARRIVAL_ARITY * i + j + 1 < p;
    }
    have
}

/// The `(parent rank, arrival slot)` that rank `i` reports into, or `None`
/// for the root, which reports to nobody.
pub fn tree_parent(i: usize) -> Option<(usize, usize)> {
    if i == 0 {
        None
    } else {
        Some(((i - 1) / TREE_ARRIVAL_ARITY, (i - 1) % TREE_ARRIVAL_ARITY))
    }
}

/// The ranks `i` wakes in the binary wakeup tree: `2i+1` and `2i+2` where
/// they exist.
pub fn tree_wakeup_children(i: usize, p: usize) -> [Option<usize>; TREE_WAKEUP_ARITY] {
    let mut kids = [None; TREE_WAKEUP_ARITY];
    for (j, kid) in kids.iter_mut().enumerate() {
        let c = 2 * i + j + 1;
        if c < p {
            *kid = Some(c);
        }
    }
    kids
}

/// The rank that `i` signals in dissemination round `k`: `(i + 2^k) mod p`.
pub fn dissemination_peer(i: usize, k: u32, p: usize) -> usize {
    (i + (1usize << k)) % p
}

/// The rank whose round-`k` signal `i` waits for: `(i - 2^k) mod p`.
pub fn dissemination_source(i: usize, k: u32, p: usize) -> usize {
    (i + p - (1usize << k)) % p
}

/// A participant's standing in one round of the tournament bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Waits for its opponent's arrival signal, then climbs to the next
    /// round.
    Winner,
    /// Signals its opponent, leaves the arrival phase, and waits to be
    /// woken by that same opponent on the way back down.
    Loser,
    /// Unopposed this round; climbs without signaling anyone.
    Bye,
    /// Rank 0 in the top round: globally last to arrive, first to release.
    Champion,
    /// The round-0 marker that ends the wakeup descent.
    Dropout,
    /// Not playing in this round.
    Inactive,
}

/// One round of a rank's bracket: its role and, where the role exchanges
/// signals, the opponent it exchanges them with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TournamentRound {
    pub role: Role,
    pub opponent: Option<usize>,
}

/// Role of rank `i` in round `k` of a `p`-participant tournament.
pub fn tournament_role(i: usize, k: u32, p: usize) -> Role {
    if k == 0 {
        return Role::Dropout;
    }
    let full = 1usize << k;
    let half = full >> 1;
    if i % full == 0 && i + half < p && full < p {
        Role::Winner
    } else if i % full == 0 && i + half >= p {
        Role::Bye
    } else if i % full == half {
        Role::Loser
    } else if i == 0 && full >= p {
        Role::Champion
    } else {
        Role::Inactive
    }
}

fn tournament_opponent(i: usize, k: u32, role: Role) -> Option<usize> {
    let half = (1usize << k) >> 1;
    match role {
        Role::Loser => Some(i - half),
        Role::Winner | Role::Champion => Some(i + half),
        Role::Bye | Role::Dropout | Role::Inactive => None,
    }
}

/// Full bracket for rank `i`: roles and opponents for rounds
/// `0..=ceil_log2(p)`. Round 0 is always [`Role::Dropout`].
pub fn tournament_bracket(i: usize, p: usize) -> Vec<TournamentRound> {
    let bracket: Vec<TournamentRound> = (0..=ceil_log2(p))
        .map(|k| {
            let role = tournament_role(i, k, p);
            TournamentRound {
                role,
                opponent: tournament_opponent(i, k, role),
            }
        })
        .collect();
    trace!("tournament bracket for rank {}/{}: {:?}", i, p, bracket);
    bracket
}
