//! In-process multi-rank transport: one thread per rank, wired with
//! channels.
//!
//! Each rank owns two inboxes, one per travel direction, and holds the
//! senders feeding its neighbors' inboxes (ring-wired, so the wrap links
//! exist even when a linear topology leaves them unused). Channel sends
//! are buffered and never block on the peer; `recv` blocks until the row
//! arrives. The max-reduction gathers to rank 0 and broadcasts back over
//! dedicated channels; a rank that aborts mid-run drops its endpoints,
//! which turns every peer's pending wait into a transport failure instead
//! of a hang.

use std::sync::mpsc::{channel, Receiver, Sender};

use super::comm::{Direction, Transport};
use crate::error::{HeatgridError, Result};

/// A rank's side of the reduction tree. Rank 0 gathers one value per
/// round from every other rank over a per-rank channel and broadcasts the
/// result back; per-rank gather channels (rather than one shared inbox)
/// make a single dead rank detectable while the others stay connected.
enum ReduceRole {
    Leader {
        gather: Vec<Receiver<f64>>,
        broadcast: Vec<Sender<f64>>,
    },
    Member {
        gather: Sender<f64>,
        broadcast: Receiver<f64>,
    },
}

/// One rank's endpoint of the channel fabric.
pub struct ChannelTransport {
    rank: usize,
    num_ranks: usize,
    /// Feeds the `Down` inbox of rank + 1 (mod P).
    to_below: Sender<Vec<f64>>,
    /// Feeds the `Up` inbox of rank - 1 (mod P).
    to_above: Sender<Vec<f64>>,
    /// `Down`-travelling arrivals, i.e. rows sent by the rank above.
    from_above: Receiver<Vec<f64>>,
    /// `Up`-travelling arrivals, i.e. rows sent by the rank below.
    from_below: Receiver<Vec<f64>>,
    reduce: ReduceRole,
}

/// Builder for a fully wired set of [`ChannelTransport`]s.
pub struct ChannelFabric;

impl ChannelFabric {
    /// Wire `num_ranks` endpoints and return them in rank order.
    pub fn connect(num_ranks: usize) -> Result<Vec<ChannelTransport>> {
        if num_ranks == 0 {
            return Err(HeatgridError::Config(
                "at least one rank is required".to_string(),
            ));
        }

        // One gather/broadcast channel pair per non-leader rank.
        let (gather_tx, gather_rx): (Vec<_>, Vec<_>) = (1..num_ranks).map(|_| channel()).unzip();
        let (bcast_tx, bcast_rx): (Vec<_>, Vec<_>) = (1..num_ranks).map(|_| channel()).unzip();

        let mut reduce_roles = Vec::with_capacity(num_ranks);
        reduce_roles.push(ReduceRole::Leader {
            gather: gather_rx,
            broadcast: bcast_tx,
        });
        for (gather, broadcast) in gather_tx.into_iter().zip(bcast_rx) {
            reduce_roles.push(ReduceRole::Member { gather, broadcast });
        }

        // down_channels[r] is rank r's inbox for Down-travelling rows,
        // up_channels[r] the inbox for Up-travelling rows.
        let (down_tx, down_rx): (Vec<_>, Vec<_>) = (0..num_ranks).map(|_| channel()).unzip();
        let (up_tx, up_rx): (Vec<_>, Vec<_>) = (0..num_ranks).map(|_| channel()).unzip();

        let transports = down_rx
            .into_iter()
            .zip(up_rx)
            .zip(reduce_roles)
            .enumerate()
            .map(|(rank, ((from_above, from_below), reduce))| ChannelTransport {
                rank,
                num_ranks,
                to_below: down_tx[(rank + 1) % num_ranks].clone(),
                to_above: up_tx[(rank + num_ranks - 1) % num_ranks].clone(),
                from_above,
                from_below,
                reduce,
            })
            .collect();

        Ok(transports)
    }
}

impl ChannelTransport {
    fn failure(&self, direction: Direction, msg: String) -> HeatgridError {
        HeatgridError::Transport {
            rank: self.rank,
            direction,
            msg,
        }
    }
}

impl Transport for ChannelTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    fn send(&mut self, to: usize, direction: Direction, row: &[f64]) -> Result<()> {
        let sender = match direction {
            Direction::Down => &self.to_below,
            Direction::Up => &self.to_above,
        };
        sender
            .send(row.to_vec())
            .map_err(|_| self.failure(direction, format!("rank {to} hung up")))
    }

    fn recv(&mut self, from: usize, direction: Direction, into: &mut [f64]) -> Result<()> {
        let inbox = match direction {
            Direction::Down => &self.from_above,
            Direction::Up => &self.from_below,
        };
        let row = inbox.recv().map_err(|_| {
            self.failure(
                direction,
                format!("rank {from} hung up before sending its boundary row"),
            )
        })?;
        if row.len() != into.len() {
            return Err(self.failure(
                direction,
                format!("expected {} values, got {}", into.len(), row.len()),
            ));
        }
        into.copy_from_slice(&row);
        Ok(())
    }

    fn all_reduce_max(&mut self, local: f64) -> Result<f64> {
        // Gather travels toward rank 0, the broadcast away from it; a
        // dropped endpoint on either leg means the owning rank aborted
        // and the run must be torn down.
        let rank = self.rank;
        let hung_up = |direction| HeatgridError::Transport {
            rank,
            direction,
            msg: "a rank aborted during the convergence reduction".to_string(),
        };

        match &mut self.reduce {
            ReduceRole::Leader { gather, broadcast } => {
                let mut global = local;
                for rx in gather.iter() {
                    global = global.max(rx.recv().map_err(|_| hung_up(Direction::Up))?);
                }
                for tx in broadcast.iter() {
                    tx.send(global).map_err(|_| hung_up(Direction::Down))?;
                }
                Ok(global)
            }
            ReduceRole::Member { gather, broadcast } => {
                gather.send(local).map_err(|_| hung_up(Direction::Up))?;
                broadcast.recv().map_err(|_| hung_up(Direction::Down))
            }
        }
    }
}
