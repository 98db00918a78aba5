//! Cross-algorithm integration checks: every variant must deliver the full
//! rendezvous guarantee and stay reusable across many generations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use rand::Rng;

use barricade::{
    channel_mesh, mp, Barrier, CentralizedBarrier, DisseminationBarrier, TreeBarrier,
};

const RENDEZVOUS_COUNTS: [usize; 8] = [1, 2, 3, 4, 5, 8, 16, 17];
const REUSE_COUNTS: [usize; 8] = [2, 3, 4, 7, 8, 16, 31, 32];

/// Drives every waiter through `generations` generations on its own thread,
/// asserting at each exit that all ranks had entered that generation first.
fn exercise<B: Barrier + Send>(waiters: Vec<B>, generations: usize, jitter: bool) {
    let p = waiters.len();
    let entered: Vec<AtomicUsize> = (0..generations).map(|_| AtomicUsize::new(0)).collect();
    thread::scope(|s| {
        for (rank, mut w) in waiters.into_iter().enumerate() {
            assert_eq!(w.rank(), rank);
            assert_eq!(w.participants(), p);
            let entered = &entered;
            s.spawn(move || {
                let mut rng = rand::thread_rng();
                for g in 0..generations {
                    if jitter && rng.gen_bool(0.2) {
                        thread::sleep(Duration::from_micros(rng.gen_range(0..150)));
                    }
                    entered[g].fetch_add(1, Ordering::SeqCst);
                    w.wait().unwrap();
                    // Each rank enters generation g exactly once, and no
                    // exit may precede the last of those entries.
                    assert_eq!(entered[g].load(Ordering::SeqCst), p);
                }
            });
        }
    });
}

fn centralized(p: usize) -> Vec<impl Barrier + Send> {
    CentralizedBarrier::new(p).unwrap().into_waiters()
}

fn tree(p: usize) -> Vec<impl Barrier + Send> {
    TreeBarrier::new(p).unwrap().into_waiters()
}

fn dissemination(p: usize) -> Vec<impl Barrier + Send> {
    DisseminationBarrier::new(p).unwrap().into_waiters()
}

fn mp_counter(p: usize) -> Vec<impl Barrier + Send> {
    channel_mesh(p)
        .unwrap()
        .into_iter()
        .map(|t| mp::CounterBarrier::new(t).unwrap())
        .collect()
}

fn mp_dissemination(p: usize) -> Vec<impl Barrier + Send> {
    channel_mesh(p)
        .unwrap()
        .into_iter()
        .map(|t| mp::DisseminationBarrier::new(t).unwrap())
        .collect()
}

fn mp_tournament(p: usize) -> Vec<impl Barrier + Send> {
    channel_mesh(p)
        .unwrap()
        .into_iter()
        .map(|t| mp::TournamentBarrier::new(t).unwrap())
        .collect()
}

#[test]
fn centralized_full_rendezvous() {
    for p in RENDEZVOUS_COUNTS {
        exercise(centralized(p), 40, true);
    }
}

#[test]
fn tree_full_rendezvous() {
    for p in RENDEZVOUS_COUNTS {
        exercise(tree(p), 40, true);
    }
}

#[test]
fn dissemination_full_rendezvous() {
    for p in RENDEZVOUS_COUNTS {
        exercise(dissemination(p), 40, true);
    }
}

#[test]
fn mp_counter_full_rendezvous() {
    for p in RENDEZVOUS_COUNTS {
        exercise(mp_counter(p), 40, true);
    }
}

#[test]
fn mp_dissemination_full_rendezvous() {
    for p in RENDEZVOUS_COUNTS {
        exercise(mp_dissemination(p), 40, true);
    }
}

#[test]
fn mp_tournament_full_rendezvous() {
    for p in RENDEZVOUS_COUNTS {
        exercise(mp_tournament(p), 40, true);
    }
}

#[test]
fn centralized_reuse_1000_generations() {
    for p in REUSE_COUNTS {
        exercise(centralized(p), 1000, false);
    }
}

#[test]
fn tree_reuse_1000_generations() {
    for p in REUSE_COUNTS {
        exercise(tree(p), 1000, false);
    }
}

#[test]
fn dissemination_reuse_1000_generations() {
    for p in REUSE_COUNTS {
        exercise(dissemination(p), 1000, false);
    }
}

#[test]
fn mp_counter_reuse_1000_generations() {
    for p in REUSE_COUNTS {
        exercise(mp_counter(p), 1000, false);
    }
}

#[test]
fn mp_dissemination_reuse_1000_generations() {
    for p in REUSE_COUNTS {
        exercise(mp_dissemination(p), 1000, false);
    }
}

#[test]
fn mp_tournament_reuse_1000_generations() {
    for p in REUSE_COUNTS {
        exercise(mp_tournament(p), 1000, false);
    }
}

#[test]
fn machine_sized_run() {
    // One run shaped like a real host: a thread per core.
    let p = num_cpus::get().max(2);
    exercise(tree(p), 200, true);
    exercise(mp_tournament(p), 200, true);
}
