//! Transport abstraction for inter-rank communication.
//!
//! Provides a trait for the two operations the solver needs from its
//! messaging layer (boundary-row transfer and max-reduction) and a
//! single-rank implementation. Multi-rank implementations live in
//! `channel` (in-process threads) and, behind the `distributed` feature,
//! `comm_mpi`.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{HeatgridError, Result};

/// Travel direction of a halo message, also its wire tag.
///
/// `Down` messages carry a rank's bottom real row toward the next higher
/// rank; `Up` messages carry the top real row toward the next lower rank.
/// Keeping the two on distinct channels means a rank whose upper and lower
/// neighbor are the same rank (two-rank ring) cannot confuse them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    /// Message tag for transports with a tagged wire format.
    pub fn tag(self) -> i32 {
        match self {
            Direction::Down => 100,
            Direction::Up => 101,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Down => write!(f, "down"),
            Direction::Up => write!(f, "up"),
        }
    }
}

/// One ghost-row destination of a halo round: where the row comes from
/// and the buffer it lands in.
pub struct GhostRecv<'a> {
    pub from: usize,
    pub direction: Direction,
    pub into: &'a mut [f64],
}

/// Messaging layer under the halo exchange and the convergence reduction.
///
/// A message is one boundary row of `columns` values. `send` must not
/// block on the peer (this is what makes compute/communication overlap
/// possible and keeps a linear chain of ranks from deadlocking on mutual
/// sends); `recv` blocks until the matching message has arrived. Any
/// failure is non-recoverable: the relaxation cannot proceed with missing
/// boundary data, so errors abort the run.
pub trait Transport: Send {
    fn rank(&self) -> usize;

    fn num_ranks(&self) -> usize;

    /// Hand a row to the transport for delivery to `to`; returns without
    /// waiting for the peer.
    fn send(&mut self, to: usize, direction: Direction, row: &[f64]) -> Result<()>;

    /// Block until the row travelling `direction` from `from` arrives,
    /// then copy it into `into`.
    fn recv(&mut self, from: usize, direction: Direction, into: &mut [f64]) -> Result<()>;

    /// Block until every ghost row of the round has arrived.
    ///
    /// A transport that defers its sends must issue them here, so a
    /// round's sends and receives are in flight together and a ring of
    /// mutually waiting ranks cannot form.
    fn complete_halo(&mut self, recvs: &mut [GhostRecv<'_>]) -> Result<()> {
        for r in recvs.iter_mut() {
            self.recv(r.from, r.direction, r.into)?;
        }
        Ok(())
    }

    /// Max of `local` across all ranks, available to every rank.
    fn all_reduce_max(&mut self, local: f64) -> Result<f64>;
}

/// Single-rank transport. Sends are queued locally and received back by
/// the same rank, which is exactly what a one-rank ring needs: the top
/// ghost row becomes a copy of the rank's own bottom row and vice versa.
#[derive(Debug, Default)]
pub struct Loopback {
    queues: [VecDeque<Vec<f64>>; 2],
}

impl Loopback {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(direction: Direction) -> usize {
        match direction {
            Direction::Down => 0,
            Direction::Up => 1,
        }
    }
}

impl Transport for Loopback {
    fn rank(&self) -> usize {
        0
    }

    fn num_ranks(&self) -> usize {
        1
    }

    fn send(&mut self, to: usize, direction: Direction, row: &[f64]) -> Result<()> {
        if to != 0 {
            return Err(HeatgridError::Transport {
                rank: 0,
                direction,
                msg: format!("no rank {to} in a single-rank universe"),
            });
        }
        self.queues[Self::slot(direction)].push_back(row.to_vec());
        Ok(())
    }

    fn recv(&mut self, from: usize, direction: Direction, into: &mut [f64]) -> Result<()> {
        let row = self.queues[Self::slot(direction)]
            .pop_front()
            .ok_or_else(|| HeatgridError::Transport {
                rank: 0,
                direction,
                msg: format!("no message pending from rank {from}"),
            })?;
        if row.len() != into.len() {
            return Err(HeatgridError::Transport {
                rank: 0,
                direction,
                msg: format!("expected {} values, got {}", into.len(), row.len()),
            });
        }
        into.copy_from_slice(&row);
        Ok(())
    }

    fn all_reduce_max(&mut self, local: f64) -> Result<f64> {
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_reduce_is_identity() {
        let mut t = Loopback::new();
        assert_eq!(t.all_reduce_max(42.0).unwrap(), 42.0);
        assert_eq!(t.all_reduce_max(-1.5).unwrap(), -1.5);
    }

    #[test]
    fn loopback_rank_and_size() {
        let t = Loopback::new();
        assert_eq!(t.rank(), 0);
        assert_eq!(t.num_ranks(), 1);
    }

    #[test]
    fn loopback_delivers_to_itself_per_direction() {
        let mut t = Loopback::new();
        t.send(0, Direction::Down, &[1.0, 2.0]).unwrap();
        t.send(0, Direction::Up, &[3.0, 4.0]).unwrap();

        let mut buf = [0.0; 2];
        t.recv(0, Direction::Up, &mut buf).unwrap();
        assert_eq!(buf, [3.0, 4.0]);
        t.recv(0, Direction::Down, &mut buf).unwrap();
        assert_eq!(buf, [1.0, 2.0]);
    }

    #[test]
    fn loopback_errors_without_a_pending_message() {
        let mut t = Loopback::new();
        let mut buf = [0.0; 2];
        assert!(t.recv(0, Direction::Down, &mut buf).is_err());
    }

    #[test]
    fn loopback_rejects_foreign_ranks() {
        let mut t = Loopback::new();
        assert!(t.send(1, Direction::Down, &[0.0]).is_err());
    }

    #[test]
    fn complete_halo_fills_every_listed_row() {
        let mut t = Loopback::new();
        t.send(0, Direction::Down, &[1.0, 2.0]).unwrap();
        t.send(0, Direction::Up, &[3.0, 4.0]).unwrap();

        let mut top = [0.0; 2];
        let mut bottom = [0.0; 2];
        let mut recvs = [
            GhostRecv {
                from: 0,
                direction: Direction::Down,
                into: &mut top,
            },
            GhostRecv {
                from: 0,
                direction: Direction::Up,
                into: &mut bottom,
            },
        ];
        t.complete_halo(&mut recvs).unwrap();
        assert_eq!(top, [1.0, 2.0]);
        assert_eq!(bottom, [3.0, 4.0]);
    }

    #[test]
    fn direction_tags_are_distinct() {
        assert_ne!(Direction::Down.tag(), Direction::Up.tag());
    }
}
