//! Row-band domain decomposition.
//!
//! The global grid is split into contiguous bands of whole rows. When the
//! row count does not divide evenly, the first `global_rows % num_ranks`
//! ranks each take one extra row, so band sizes differ by at most one.

use crate::error::{HeatgridError, Result};

/// One rank's share of the global row range. Computed once at startup,
/// immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPartition {
    rank: usize,
    num_ranks: usize,
    global_rows: usize,
    local_rows: usize,
    global_start_row: usize,
}

impl RowPartition {
    /// Decompose `global_rows` over `num_ranks` and return `rank`'s band.
    ///
    /// Every rank must own at least one row, so `num_ranks > global_rows`
    /// is a configuration error.
    pub fn new(global_rows: usize, num_ranks: usize, rank: usize) -> Result<Self> {
        if num_ranks == 0 {
            return Err(HeatgridError::Config(
                "at least one rank is required".to_string(),
            ));
        }
        if rank >= num_ranks {
            return Err(HeatgridError::Config(format!(
                "rank {rank} out of range for {num_ranks} ranks"
            )));
        }
        if global_rows == 0 {
            return Err(HeatgridError::Config(
                "global row count must be positive".to_string(),
            ));
        }
        if num_ranks > global_rows {
            return Err(HeatgridError::Config(format!(
                "{num_ranks} ranks cannot partition {global_rows} rows without an empty band"
            )));
        }

        let base = global_rows / num_ranks;
        let extra = global_rows % num_ranks;

        let (local_rows, global_start_row) = if rank < extra {
            (base + 1, rank * (base + 1))
        } else {
            (base, extra * (base + 1) + (rank - extra) * base)
        };

        Ok(Self {
            rank,
            num_ranks,
            global_rows,
            local_rows,
            global_start_row,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    pub fn global_rows(&self) -> usize {
        self.global_rows
    }

    pub fn local_rows(&self) -> usize {
        self.local_rows
    }

    /// Global index of this band's first row.
    pub fn global_start_row(&self) -> usize {
        self.global_start_row
    }

    pub fn is_first(&self) -> bool {
        self.rank == 0
    }

    pub fn is_last(&self) -> bool {
        self.rank + 1 == self.num_ranks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The bands of all ranks must tile [0, global_rows) exactly,
    /// in rank order, with no gaps or overlaps.
    #[test]
    fn bands_tile_the_global_range() {
        for global_rows in 1..=40 {
            for num_ranks in 1..=global_rows {
                let mut next_row = 0;
                for rank in 0..num_ranks {
                    let p = RowPartition::new(global_rows, num_ranks, rank).unwrap();
                    assert_eq!(
                        p.global_start_row(),
                        next_row,
                        "gap or overlap at rank {rank} of {num_ranks} for {global_rows} rows"
                    );
                    assert!(p.local_rows() >= 1);
                    next_row += p.local_rows();
                }
                assert_eq!(next_row, global_rows);
            }
        }
    }

    #[test]
    fn first_ranks_take_the_extra_rows() {
        // 10 rows over 4 ranks: 3, 3, 2, 2.
        let sizes: Vec<usize> = (0..4)
            .map(|r| RowPartition::new(10, 4, r).unwrap().local_rows())
            .collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
    }

    #[test]
    fn even_division_has_equal_bands() {
        for rank in 0..5 {
            let p = RowPartition::new(100, 5, rank).unwrap();
            assert_eq!(p.local_rows(), 20);
            assert_eq!(p.global_start_row(), rank * 20);
        }
    }

    #[test]
    fn more_ranks_than_rows_is_rejected() {
        assert!(RowPartition::new(3, 4, 0).is_err());
    }

    #[test]
    fn zero_inputs_are_rejected() {
        assert!(RowPartition::new(0, 1, 0).is_err());
        assert!(RowPartition::new(10, 0, 0).is_err());
    }

    #[test]
    fn out_of_range_rank_is_rejected() {
        assert!(RowPartition::new(10, 2, 2).is_err());
    }

    #[test]
    fn first_and_last_flags() {
        let p = RowPartition::new(10, 3, 0).unwrap();
        assert!(p.is_first() && !p.is_last());
        let p = RowPartition::new(10, 3, 2).unwrap();
        assert!(!p.is_first() && p.is_last());
        let p = RowPartition::new(10, 1, 0).unwrap();
        assert!(p.is_first() && p.is_last());
    }
}
