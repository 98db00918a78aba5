//! Blocking point-to-point transport for the message-passing barriers.
//!
//! Signals carry no payload of their own; the only datum on the wire is a
//! `u64` stamp the barriers use to encode (generation, round, phase), so a
//! signal left over from a past generation can never be mistaken for the
//! one currently being waited on.

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::error::BarrierError;

/// Blocking, rank-addressed signal exchange.
///
/// The contract mirrors the usual two-sided send/receive pair: `send`
/// delivers one stamped signal to `dest`, `recv` blocks until the next
/// signal from `src` arrives and fails if its stamp is not the expected
/// one. Implementations must preserve ordering per directed `(src, dest)`
/// pair.
pub trait Transport {
    /// This endpoint's rank, in `0..participants()`.
    fn rank(&self) -> usize;

    /// Total number of ranks in the group.
    fn participants(&self) -> usize;

    /// Delivers one signal stamped `stamp` to `dest`.
    fn send(&mut self, dest: usize, stamp: u64) -> Result<(), BarrierError>;

    /// Blocks until the next signal from `src` arrives; verifies its stamp.
    fn recv(&mut self, src: usize, stamp: u64) -> Result<(), BarrierError>;
}

/// In-process [`Transport`] over a fully connected crossbeam-channel mesh:
/// one unbounded FIFO channel per directed pair of ranks.
pub struct ChannelTransport {
    rank: usize,
    outboxes: Vec<Sender<u64>>,
    inboxes: Vec<Receiver<u64>>,
}

/// Builds the endpoints of a fully connected `participants`-rank mesh;
/// endpoint `i` belongs to rank `i`. This doubles as the rank-enumeration
/// collaborator: an endpoint knows its own rank and the group size.
pub fn channel_mesh(participants: usize) -> Result<Vec<ChannelTransport>, BarrierError> {
    if participants == 0 {
        return Err(BarrierError::InvalidParticipantCount);
    }
    let mut outboxes: Vec<Vec<Sender<u64>>> =
        (0..participants).map(|_| Vec::with_capacity(participants)).collect();
    let mut inboxes: Vec<Vec<Receiver<u64>>> =
        (0..participants).map(|_| Vec::with_capacity(participants)).collect();
    // Self-channels are created too; they stay unused but keep indexing flat.
    for src in 0..participants {
        for dest in 0..participants {
            let (tx, rx) = unbounded();
            outboxes[src].push(tx);
            inboxes[dest].push(rx);
        }
    }
    Ok(outboxes
        .into_iter()
        .zip(inboxes)
        .enumerate()
        .map(|(rank, (outboxes, inboxes))| ChannelTransport {
            rank,
            outboxes,
            inboxes,
        })
        .collect())
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn participants(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&mut self, dest: usize, stamp: u64) -> Result<(), BarrierError> {
        self.outboxes[dest]
            .send(stamp)
            .map_err(|_| BarrierError::Disconnected { peer: dest })
    }

    fn recv(&mut self, src: usize, stamp: u64) -> Result<(), BarrierError> {
        let actual = self.inboxes[src]
            .recv()
            .map_err(|_| BarrierError::Disconnected { peer: src })?;
        if actual != stamp {
            return Err(BarrierError::StaleMessage {
                peer: src,
                expected: stamp,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_participants() {
        assert!(matches!(
            channel_mesh(0),
            Err(BarrierError::InvalidParticipantCount)
        ));
    }

    #[test]
    fn mesh_routes_by_rank() {
        let mut mesh = channel_mesh(3).unwrap();
        for (i, ep) in mesh.iter().enumerate() {
            assert_eq!(ep.rank(), i);
            assert_eq!(ep.participants(), 3);
        }
        let mut two = mesh.pop().unwrap();
        let mut one = mesh.pop().unwrap();
        let mut zero = mesh.pop().unwrap();

        zero.send(2, 7).unwrap();
        one.send(2, 9).unwrap();
        two.recv(0, 7).unwrap();
        two.recv(1, 9).unwrap();
    }

    #[test]
    fn stamp_mismatch_is_reported() {
        let mut mesh = channel_mesh(2).unwrap();
        let mut one = mesh.pop().unwrap();
        let mut zero = mesh.pop().unwrap();

        zero.send(1, 41).unwrap();
        assert_eq!(
            one.recv(0, 42),
            Err(BarrierError::StaleMessage {
                peer: 0,
                expected: 42,
                actual: 41,
            })
        );
    }

    #[test]
    fn dropped_peer_is_reported() {
        let mut mesh = channel_mesh(2).unwrap();
        let mut one = mesh.pop().unwrap();
        drop(mesh); // rank 0's endpoint, and with it every sender to rank 1

        assert_eq!(
            one.recv(0, 0),
            Err(BarrierError::Disconnected { peer: 0 })
        );
    }
}
