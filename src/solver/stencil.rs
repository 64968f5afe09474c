//! The 5-point averaging update, split so communication can overlap.
//!
//! `interior_pass` covers the rows that do not touch the ghost margin and
//! runs while the halo round is in flight. `boundary_pass` covers the top
//! and bottom real rows and must only run after the exchange completes.
//! Each pass folds its max per-cell change into its return value, so the
//! driver never rescans the grid for the convergence measure.

use crate::grid::Grid;

/// Update one row of `next` from `prev`, returning the row's max change.
fn update_row(prev: &Grid, next: &mut Grid, i: usize) -> f64 {
    let mut delta = 0.0f64;
    for j in 1..=prev.columns() {
        let value = 0.25
            * (prev.get(i + 1, j) + prev.get(i - 1, j) + prev.get(i, j + 1) + prev.get(i, j - 1));
        delta = delta.max((value - prev.get(i, j)).abs());
        next.set(i, j, value);
    }
    delta
}

/// Rows `2..=local_rows-1`: no ghost dependency, safe while the halo
/// round is still in flight. Empty for bands of one or two rows.
pub fn interior_pass(prev: &Grid, next: &mut Grid) -> f64 {
    let mut delta = 0.0f64;
    for i in 2..prev.local_rows() {
        delta = delta.max(update_row(prev, next, i));
    }
    delta
}

/// Rows `1` and `local_rows`: read the just-received ghost rows, so this
/// must run after the halo `wait`. A one-row band is both at once and is
/// updated exactly once, from both ghosts.
pub fn boundary_pass(prev: &Grid, next: &mut Grid) -> f64 {
    let rows = prev.local_rows();
    let mut delta = update_row(prev, next, 1);
    if rows > 1 {
        delta = delta.max(update_row(prev, next, rows));
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(local_rows: usize, columns: usize) -> (Grid, Grid) {
        (
            Grid::new(local_rows, columns).unwrap(),
            Grid::new(local_rows, columns).unwrap(),
        )
    }

    #[test]
    fn update_is_the_mean_of_the_four_neighbors() {
        let (mut prev, mut next) = pair(3, 3);
        prev.set(1, 2, 8.0);
        prev.set(3, 2, 4.0);
        prev.set(2, 1, 2.0);
        prev.set(2, 3, 6.0);

        let delta = boundary_pass(&prev, &mut next).max(interior_pass(&prev, &mut next));
        assert_eq!(next.get(2, 2), 5.0);
        // Largest change: (1,2) drops from 8 to 0.
        assert_eq!(delta, 8.0);
    }

    #[test]
    fn interior_pass_skips_ghost_dependent_rows() {
        let (mut prev, mut next) = pair(4, 2);
        // Poison the ghost rows; the interior pass must not read them.
        prev.top_ghost_mut().fill(f64::NAN);
        prev.bottom_ghost_mut().fill(f64::NAN);
        for i in 1..=4 {
            for j in 1..=2 {
                prev.set(i, j, 1.0);
            }
        }
        interior_pass(&prev, &mut next);
        assert!(next.get(2, 1).is_finite());
        assert!(next.get(3, 2).is_finite());
        // Boundary rows were not written.
        assert_eq!(next.get(1, 1), 0.0);
        assert_eq!(next.get(4, 1), 0.0);
    }

    #[test]
    fn boundary_pass_reads_the_ghost_rows() {
        let (mut prev, mut next) = pair(2, 2);
        prev.top_ghost_mut().copy_from_slice(&[4.0, 4.0]);
        prev.bottom_ghost_mut().copy_from_slice(&[8.0, 8.0]);

        boundary_pass(&prev, &mut next);
        // Row 1 averages the top ghost; row 2 the bottom ghost.
        assert_eq!(next.get(1, 1), 1.0);
        assert_eq!(next.get(2, 1), 2.0);
    }

    #[test]
    fn one_row_band_uses_both_ghosts_at_once() {
        let (mut prev, mut next) = pair(1, 2);
        prev.top_ghost_mut().copy_from_slice(&[2.0, 2.0]);
        prev.bottom_ghost_mut().copy_from_slice(&[6.0, 6.0]);

        let delta = boundary_pass(&prev, &mut next);
        assert_eq!(next.get(1, 1), 2.0);
        assert_eq!(next.get(1, 2), 2.0);
        assert_eq!(delta, 2.0);
    }

    #[test]
    fn two_row_band_has_no_interior() {
        let (mut prev, mut next) = pair(2, 2);
        for i in 1..=2 {
            for j in 1..=2 {
                prev.set(i, j, 1.0);
            }
        }
        assert_eq!(interior_pass(&prev, &mut next), 0.0);
        assert_eq!(next.get(1, 1), 0.0);
        assert_eq!(next.get(2, 2), 0.0);
    }

    #[test]
    fn passes_cover_every_updatable_row_exactly_once() {
        for rows in 1..=5 {
            let (mut prev, mut next) = pair(rows, 2);
            for i in 1..=rows {
                for j in 1..=2 {
                    prev.set(i, j, 1.0);
                }
            }
            interior_pass(&prev, &mut next);
            boundary_pass(&prev, &mut next);
            // Every updatable cell was written (averages of 1-valued rows
            // and 0-valued margins are strictly positive).
            for i in 1..=rows {
                for j in 1..=2 {
                    assert!(next.get(i, j) > 0.0, "rows={rows} cell ({i},{j}) missed");
                }
            }
        }
    }

    #[test]
    fn fixed_cells_are_never_written() {
        let (mut prev, mut next) = pair(3, 3);
        for i in 1..=3 {
            for j in 1..=3 {
                prev.set(i, j, 7.0);
            }
        }
        prev.top_ghost_mut().fill(7.0);
        prev.bottom_ghost_mut().fill(7.0);
        interior_pass(&prev, &mut next);
        boundary_pass(&prev, &mut next);
        for i in 0..=4 {
            assert_eq!(next.get(i, 0), 0.0);
            assert_eq!(next.get(i, 4), 0.0);
        }
        for j in 0..=4 {
            assert_eq!(next.get(0, j), 0.0);
            assert_eq!(next.get(4, j), 0.0);
        }
    }
}
