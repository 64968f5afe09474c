//! Rank-local grid storage and the current/next double buffer.
//!
//! A `Grid` holds `(local_rows + 2) x (columns + 2)` values in row-major
//! order: one ghost row above and below the band, and one fixed boundary
//! column on each side. `BufferPair` owns two such grids and swaps which
//! one is "current" by flipping an index, never copying cell data.

use crate::error::{HeatgridError, Result};
use crate::partition::RowPartition;

/// Temperature applied along the hot edges of the global domain.
pub const BOUNDARY_TEMP: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    local_rows: usize,
    columns: usize,
    stride: usize,
    data: Vec<f64>,
}

impl Grid {
    /// Allocate a zeroed grid with the ghost margin included.
    ///
    /// Allocation goes through `try_reserve_exact` so exhaustion surfaces
    /// as an error on the owning rank instead of an abort.
    pub fn new(local_rows: usize, columns: usize) -> Result<Self> {
        let stride = columns + 2;
        let len = (local_rows + 2).checked_mul(stride).ok_or_else(|| {
            HeatgridError::Allocation(format!(
                "grid of {local_rows}x{columns} rows overflows the address space"
            ))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            HeatgridError::Allocation(format!(
                "could not reserve {len} cells for a {local_rows}x{columns} band: {e}"
            ))
        })?;
        data.resize(len, 0.0);

        Ok(Self {
            local_rows,
            columns,
            stride,
            data,
        })
    }

    pub fn local_rows(&self) -> usize {
        self.local_rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Read a cell in the padded index space: rows `0..=local_rows+1`,
    /// columns `0..=columns+1`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert!(i <= self.local_rows + 1 && j <= self.columns + 1);
        self.data[i * self.stride + j]
    }

    /// Write an updatable cell: rows `1..=local_rows`, columns
    /// `1..=columns`. Ghost rows are written by the halo exchange through
    /// the dedicated views and the fixed cells only by `apply_boundary`,
    /// so a write landing outside the interior is always a bug.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        assert!(
            (1..=self.local_rows).contains(&i) && (1..=self.columns).contains(&j),
            "write outside the updatable interior: ({i},{j})"
        );
        self.data[i * self.stride + j] = value;
    }

    /// The `columns` real values of row `i`, without the fixed side cells.
    pub fn interior_row(&self, i: usize) -> &[f64] {
        let start = i * self.stride + 1;
        &self.data[start..start + self.columns]
    }

    /// Mutable view of the top ghost row (row 0), interior span only.
    pub fn top_ghost_mut(&mut self) -> &mut [f64] {
        &mut self.data[1..1 + self.columns]
    }

    /// Mutable view of the bottom ghost row (row `local_rows + 1`).
    pub fn bottom_ghost_mut(&mut self) -> &mut [f64] {
        let start = (self.local_rows + 1) * self.stride + 1;
        &mut self.data[start..start + self.columns]
    }

    /// Both ghost rows at once, `(top, bottom)`, borrowed disjointly so
    /// a halo round can fill them in a single transport call.
    pub fn ghost_rows_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        let split = (self.local_rows + 1) * self.stride;
        let (top, bottom) = self.data.split_at_mut(split);
        (
            &mut top[1..1 + self.columns],
            &mut bottom[1..1 + self.columns],
        )
    }

    /// Apply the fixed boundary values for this rank's band.
    ///
    /// Left column 0; right column a linear gradient through this band's
    /// slice of the global 0..BOUNDARY_TEMP range; top padding row 0 on the
    /// first rank; bottom padding row a 0..BOUNDARY_TEMP gradient across
    /// the columns on the last rank. Interior cells stay 0.
    fn apply_boundary(&mut self, partition: &RowPartition) {
        let rows = self.local_rows;
        let cols = self.columns;
        let stride = self.stride;

        let t_min =
            partition.global_start_row() as f64 * BOUNDARY_TEMP / partition.global_rows() as f64;
        let t_max = (partition.global_start_row() + rows) as f64 * BOUNDARY_TEMP
            / partition.global_rows() as f64;

        // Fixed cells sit outside the interior that `set` covers, so this
        // writer indexes the storage directly.
        for i in 0..=rows + 1 {
            self.data[i * stride] = 0.0;
            self.data[i * stride + cols + 1] = t_min + (t_max - t_min) / rows as f64 * i as f64;
        }

        if partition.is_first() {
            for j in 0..=cols + 1 {
                self.data[j] = 0.0;
            }
        }
        if partition.is_last() {
            for j in 0..=cols + 1 {
                self.data[(rows + 1) * stride + j] = BOUNDARY_TEMP / cols as f64 * j as f64;
            }
        }
    }
}

/// The current/next grids of one rank. `current` is read by the stencil
/// and receives ghost rows; `next` is written. `swap` flips which is which.
#[derive(Debug)]
pub struct BufferPair {
    grids: [Grid; 2],
    current: usize,
}

impl BufferPair {
    pub fn new(local_rows: usize, columns: usize) -> Result<Self> {
        Ok(Self {
            grids: [Grid::new(local_rows, columns)?, Grid::new(local_rows, columns)?],
            current: 0,
        })
    }

    /// Zero both grids and apply the fixed boundary values to both, so the
    /// fixed cells hold their value no matter how many swaps occur.
    pub fn initialize(&mut self, partition: &RowPartition) {
        for grid in &mut self.grids {
            grid.data.fill(0.0);
            grid.apply_boundary(partition);
        }
    }

    pub fn current(&self) -> &Grid {
        &self.grids[self.current]
    }

    /// Borrow `(current, next)` disjointly for one relaxation step.
    pub fn split_mut(&mut self) -> (&mut Grid, &mut Grid) {
        let (a, b) = self.grids.split_at_mut(1);
        if self.current == 0 {
            (&mut a[0], &mut b[0])
        } else {
            (&mut b[0], &mut a[0])
        }
    }

    /// O(1) exchange of the current/next identities. Views obtained before
    /// the call refer to the other buffer afterwards and must be re-fetched.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    /// Consume the pair, keeping only the current grid.
    pub fn into_current(self) -> Grid {
        let [a, b] = self.grids;
        if self.current == 0 {
            a
        } else {
            b
        }
    }
}
