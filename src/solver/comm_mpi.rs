//! MPI transport for multi-node runs.
//!
//! Requires the `distributed` feature and an MPI installation. The caller
//! must initialize MPI before constructing the transport:
//!
//! ```ignore
//! let _universe = mpi::initialize().expect("MPI init failed");
//! let mut transport = MpiTransport::new();
//! ```
//!
//! Sends are buffered at `send` time and issued together with the round's
//! receives as immediate (non-blocking) requests inside one request scope.
//! With every rank's sends and receives in flight at once, no cycle of
//! ranks can wait on each other's rendezvous, ring topology included.
//!
//! MPI's default error handler aborts the whole communicator on a transport
//! fault, which is the semantics the solver wants; these methods therefore
//! never observe a failure themselves.
//! TODO: issue the sends inside `post` from transport-owned buffers once
//! the requests can outlive a scope, restoring compute overlap on the MPI
//! path (the channel transport already overlaps).

use mpi::collective::SystemOperation;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

use super::comm::{Direction, GhostRecv, Transport};
use crate::error::Result;

/// MPI-backed transport over the world communicator.
pub struct MpiTransport {
    pending_sends: Vec<(usize, Direction, Vec<f64>)>,
}

impl MpiTransport {
    pub fn new() -> Self {
        Self {
            pending_sends: Vec::new(),
        }
    }
}

impl Default for MpiTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MpiTransport {
    fn rank(&self) -> usize {
        SimpleCommunicator::world().rank() as usize
    }

    fn num_ranks(&self) -> usize {
        SimpleCommunicator::world().size() as usize
    }

    fn send(&mut self, to: usize, direction: Direction, row: &[f64]) -> Result<()> {
        self.pending_sends.push((to, direction, row.to_vec()));
        Ok(())
    }

    fn recv(&mut self, from: usize, direction: Direction, into: &mut [f64]) -> Result<()> {
        let mut recvs = [GhostRecv {
            from,
            direction,
            into,
        }];
        self.complete_halo(&mut recvs)
    }

    fn complete_halo(&mut self, recvs: &mut [GhostRecv<'_>]) -> Result<()> {
        let world = SimpleCommunicator::world();
        let sends = std::mem::take(&mut self.pending_sends);

        mpi::request::scope(|scope| {
            let send_requests: Vec<_> = sends
                .iter()
                .map(|(to, dir, buf)| {
                    world
                        .process_at_rank(*to as i32)
                        .immediate_send_with_tag(scope, &buf[..], dir.tag())
                })
                .collect();
            let recv_requests: Vec<_> = recvs
                .iter_mut()
                .map(|r| {
                    world
                        .process_at_rank(r.from as i32)
                        .immediate_receive_into_with_tag(scope, r.into, r.direction.tag())
                })
                .collect();

            for request in recv_requests {
                request.wait();
            }
            for request in send_requests {
                request.wait();
            }
        });

        Ok(())
    }

    fn all_reduce_max(&mut self, local: f64) -> Result<f64> {
        let world = SimpleCommunicator::world();
        let mut global = 0.0f64;
        world.all_reduce_into(&local, &mut global, SystemOperation::max());
        Ok(global)
    }
}
