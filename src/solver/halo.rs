//! Ghost-row exchange with the vertical neighbors.
//!
//! `post` hands this rank's outermost real rows to the transport and
//! returns a [`PendingHalo`] token; `wait` consumes the token, blocking
//! until both ghost rows have been received. The move-only token is the
//! protocol's state machine: a round cannot be posted twice or waited on
//! without a post. Ghost cells may only be read after `wait` returns.

use super::comm::{Direction, GhostRecv, Transport};
use crate::config::Topology;
use crate::error::Result;
use crate::grid::Grid;
use crate::partition::RowPartition;

/// The ranks adjacent to this band, if any.
///
/// In a linear topology the first rank has no neighbor above and the last
/// none below; those edges are fixed domain boundary instead. In a ring
/// the ends wrap around, including the one-rank ring whose both neighbors
/// are the rank itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    pub above: Option<usize>,
    pub below: Option<usize>,
}

impl Neighbors {
    pub fn of(rank: usize, num_ranks: usize, topology: Topology) -> Self {
        match topology {
            Topology::Linear => Self {
                above: rank.checked_sub(1),
                below: (rank + 1 < num_ranks).then_some(rank + 1),
            },
            Topology::Ring => Self {
                above: Some((rank + num_ranks - 1) % num_ranks),
                below: Some((rank + 1) % num_ranks),
            },
        }
    }
}

/// In-flight halo round. Records which ghost rows have a sender.
#[derive(Debug)]
#[must_use = "a posted halo round must be waited on before ghost rows are read"]
pub struct PendingHalo {
    from_above: Option<usize>,
    from_below: Option<usize>,
}

pub struct HaloExchange {
    neighbors: Neighbors,
}

impl HaloExchange {
    pub fn new(partition: &RowPartition, topology: Topology) -> Self {
        Self {
            neighbors: Neighbors::of(partition.rank(), partition.num_ranks(), topology),
        }
    }

    pub fn neighbors(&self) -> Neighbors {
        self.neighbors
    }

    /// Issue the sends of this rank's top and bottom real rows. Returns
    /// immediately; the transport delivers in the background.
    pub fn post<T: Transport>(&self, transport: &mut T, grid: &Grid) -> Result<PendingHalo> {
        if let Some(above) = self.neighbors.above {
            transport.send(above, Direction::Up, grid.interior_row(1))?;
        }
        if let Some(below) = self.neighbors.below {
            transport.send(below, Direction::Down, grid.interior_row(grid.local_rows()))?;
        }
        Ok(PendingHalo {
            from_above: self.neighbors.above,
            from_below: self.neighbors.below,
        })
    }

    /// Block until the neighbors' rows have arrived in `grid`'s ghost
    /// rows. An edge without a neighbor is left untouched; it holds the
    /// fixed domain boundary.
    ///
    /// Both receives go to the transport as one round, so a transport
    /// that defers its sends can put the whole round in flight at once.
    pub fn wait<T: Transport>(
        &self,
        transport: &mut T,
        pending: PendingHalo,
        grid: &mut Grid,
    ) -> Result<()> {
        let (top, bottom) = grid.ghost_rows_mut();
        let mut recvs = Vec::with_capacity(2);
        if let Some(above) = pending.from_above {
            recvs.push(GhostRecv {
                from: above,
                direction: Direction::Down,
                into: top,
            });
        }
        if let Some(below) = pending.from_below {
            recvs.push(GhostRecv {
                from: below,
                direction: Direction::Up,
                into: bottom,
            });
        }
        transport.complete_halo(&mut recvs)
    }
}
