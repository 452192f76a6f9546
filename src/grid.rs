// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Two-dimensional maps
//!
//! Every per-pixel array the carver keeps (the pixels themselves, the
//! energy, the bias, the rigidity mask, the resample cache) is one of
//! these.  They all share the same allocation width, so that carving a
//! seam out of one is the same index arithmetic as carving it out of
//! any other.

use crate::error::{checked_area, try_vec, CarveError, Result};
use std::ops::{Index, IndexMut};

/// An addressable two-dimensional field of cells, each cell holding
/// `depth` consecutive values.  Rows are `width` cells apart no matter
/// how many of them are currently live.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<P: Copy> {
    width: usize,
    height: usize,
    depth: usize,
    data: Vec<P>,
}

impl<P: Copy> Grid<P> {
    /// A new map with every value set to `fill`.
    pub fn new(width: usize, height: usize, depth: usize, fill: P) -> Result<Self> {
        let len = checked_area(width, height, depth)?;
        Ok(Grid {
            width,
            height,
            depth,
            data: try_vec(len, fill)?,
        })
    }

    /// Wrap an existing buffer.  The buffer must hold exactly
    /// `width * height * depth` values.
    pub fn from_vec(width: usize, height: usize, depth: usize, data: Vec<P>) -> Result<Self> {
        let len = checked_area(width, height, depth)?;
        if data.len() != len {
            return Err(CarveError::Argument(format!(
                "buffer holds {} values, {}x{}x{} needs {}",
                data.len(),
                width,
                height,
                depth,
                len
            )));
        }
        Ok(Grid {
            width,
            height,
            depth,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn as_slice(&self) -> &[P] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [P] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<P> {
        self.data
    }

    // Absolutely, the number one name of this game is keep the index
    // math in a singular location and never, ever mess with it.
    #[inline]
    fn get_index(&self, x: usize, y: usize) -> usize {
        (y * self.width + x) * self.depth
    }

    #[inline]
    pub fn cell(&self, x: usize, y: usize) -> &[P] {
        let index = self.get_index(x, y);
        &self.data[index..index + self.depth]
    }

    #[inline]
    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut [P] {
        let index = self.get_index(x, y);
        let depth = self.depth;
        &mut self.data[index..index + depth]
    }

    /// Cut one cell out of every row, shifting the rest of the live row
    /// one step toward the seam.  `seam[y]` is the cell removed from row
    /// `y`; the removed cells are returned in row order.
    pub fn remove_along_rows(&mut self, seam: &[usize], live_width: usize) -> Vec<P> {
        let depth = self.depth;
        let mut removed = Vec::with_capacity(seam.len() * depth);
        for (y, &x) in seam.iter().enumerate() {
            let at = self.get_index(x, y);
            let end = self.get_index(live_width, y);
            removed.extend_from_slice(&self.data[at..at + depth]);
            self.data.copy_within(at + depth..end, at);
        }
        removed
    }

    /// The inverse of `remove_along_rows`: open a gap at `seam[y]` in
    /// every row and write the matching cell of `values` into it.  The
    /// live width must be smaller than the allocation.
    pub fn insert_along_rows(&mut self, seam: &[usize], live_width: usize, values: &[P]) {
        debug_assert!(live_width < self.width);
        let depth = self.depth;
        for (y, &x) in seam.iter().enumerate() {
            let at = self.get_index(x, y);
            let end = self.get_index(live_width, y);
            self.data.copy_within(at..end, at + depth);
            self.data[at..at + depth].copy_from_slice(&values[y * depth..(y + 1) * depth]);
        }
    }

    /// A fresh map holding only the live `live_width x live_height`
    /// region, with the allocation shrunk to fit.
    pub fn compact(&self, live_width: usize, live_height: usize) -> Result<Self> {
        let len = checked_area(live_width, live_height, self.depth)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| CarveError::OutOfMemory { elements: len })?;
        for y in 0..live_height {
            let start = self.get_index(0, y);
            data.extend_from_slice(&self.data[start..start + live_width * self.depth]);
        }
        Grid::from_vec(live_width, live_height, self.depth, data)
    }

    /// A fresh map whose rows are the columns of the live region.
    pub fn transposed(&self, live_width: usize, live_height: usize) -> Result<Self>
    where
        P: Default,
    {
        let mut out = Grid::new(live_height, live_width, self.depth, P::default())?;
        for y in 0..live_height {
            for x in 0..live_width {
                out.cell_mut(y, x).copy_from_slice(self.cell(x, y));
            }
        }
        Ok(out)
    }

    /// A fresh map one cell wider than the live region, where the cell
    /// at `seam[y]` appears twice in every row.
    pub fn with_duplicated(&self, seam: &[usize], live_width: usize) -> Result<Self> {
        let marks: Vec<Vec<usize>> = seam.iter().map(|&x| vec![x + 1]).collect();
        self.inflated(&marks, live_width, |left, _| left)
    }

    /// A fresh map with new cells opened up in every row.  `marks[y]`
    /// lists, in ascending order, the live cells of row `y` that get a
    /// new cell in front of them; `live_width` appends one.  The new
    /// value is `blend(left, right)` of its two neighbours, with the
    /// missing one replaced by the other at a border.  Every row must
    /// gain the same number of cells.
    pub fn inflated<F>(&self, marks: &[Vec<usize>], live_width: usize, blend: F) -> Result<Self>
    where
        F: Fn(P, P) -> P,
    {
        let added = marks.first().map_or(0, Vec::len);
        if marks.iter().any(|row| row.len() != added) {
            return Err(CarveError::Argument(
                "every row must gain the same number of cells".to_string(),
            ));
        }
        let len = checked_area(live_width + added, marks.len(), self.depth)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| CarveError::OutOfMemory { elements: len })?;
        for (y, row) in marks.iter().enumerate() {
            let mut next = row.iter().peekable();
            for x in 0..=live_width {
                while next.peek() == Some(&&x) {
                    next.next();
                    let right = cq!(x < live_width, Some(x), None);
                    let (l, r) = match (x.checked_sub(1), right) {
                        (Some(l), Some(r)) => (l, r),
                        (Some(n), None) | (None, Some(n)) => (n, n),
                        (None, None) => {
                            return Err(CarveError::Argument(
                                "cannot widen an empty row".to_string(),
                            ))
                        }
                    };
                    let (l, r) = (self.cell(l, y), self.cell(r, y));
                    data.extend(l.iter().zip(r).map(|(&a, &b)| blend(a, b)));
                }
                if x < live_width {
                    data.extend_from_slice(self.cell(x, y));
                }
            }
            if let Some(m) = next.next() {
                return Err(CarveError::Argument(format!(
                    "row {}: cell {} is out of order or past the live width {}",
                    y, m, live_width
                )));
            }
        }
        Grid::from_vec(live_width + added, marks.len(), self.depth, data)
    }

    /// Collect the first value of each live cell, row by row.
    pub fn live_values(&self, live_width: usize, live_height: usize) -> Vec<P> {
        let mut out = Vec::with_capacity(live_width * live_height);
        for y in 0..live_height {
            for x in 0..live_width {
                out.push(self.data[self.get_index(x, y)]);
            }
        }
        out
    }
}

impl<P: Copy> Index<(usize, usize)> for Grid<P> {
    type Output = P;

    /// A convenience addressing mode for single-valued maps.
    fn index(&self, (x, y): (usize, usize)) -> &P {
        let index = self.get_index(x, y);
        &self.data[index]
    }
}

impl<P: Copy> IndexMut<(usize, usize)> for Grid<P> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut P {
        let index = self.get_index(x, y);
        &mut self.data[index]
    }
}

/// One cell of the cumulative-cost table: the cheapest total cost of
/// any seam reaching this pixel, and the column it came from.
#[derive(Default, Debug, Copy, Clone, PartialEq)]
pub(crate) struct CostAndParent {
    pub cost: f64,
    pub parent: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting(width: usize, height: usize) -> Grid<u32> {
        Grid::from_vec(width, height, 1, (0..(width * height) as u32).collect()).unwrap()
    }

    #[test]
    fn rejects_mismatched_buffers() {
        assert!(Grid::from_vec(3, 3, 1, vec![0u8; 8]).is_err());
        assert!(Grid::from_vec(3, 3, 2, vec![0u8; 18]).is_ok());
    }

    #[test]
    fn removal_compacts_each_row() {
        let mut grid = counting(4, 3);
        let removed = grid.remove_along_rows(&[1, 3, 0], 4);
        assert_eq!(removed, vec![1, 7, 8]);
        assert_eq!(grid.live_values(3, 3), vec![0, 2, 3, 4, 5, 6, 9, 10, 11]);
    }

    #[test]
    fn insertion_undoes_removal() {
        let mut grid = counting(4, 3);
        let seam = [2, 2, 1];
        let removed = grid.remove_along_rows(&seam, 4);
        grid.insert_along_rows(&seam, 3, &removed);
        assert_eq!(grid, counting(4, 3));
    }

    #[test]
    fn multi_valued_cells_move_together() {
        let mut grid = Grid::from_vec(3, 1, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let removed = grid.remove_along_rows(&[0], 3);
        assert_eq!(removed, vec![1, 2]);
        assert_eq!(grid.cell(0, 0), &[3, 4]);
        assert_eq!(grid.cell(1, 0), &[5, 6]);
    }

    #[test]
    fn compact_drops_dead_columns() {
        let mut grid = counting(4, 2);
        grid.remove_along_rows(&[3, 0], 4);
        let small = grid.compact(3, 2).unwrap();
        assert_eq!(small.width(), 3);
        assert_eq!(small.as_slice(), &[0, 1, 2, 5, 6, 7]);
    }

    #[test]
    fn transposing_twice_is_identity() {
        let grid = counting(5, 3);
        let flipped = grid.transposed(5, 3).unwrap();
        assert_eq!((flipped.width(), flipped.height()), (3, 5));
        assert_eq!(flipped[(2, 1)], grid[(1, 2)]);
        assert_eq!(flipped.transposed(3, 5).unwrap(), grid);
    }

    #[test]
    fn duplication_widens_by_one() {
        let grid = counting(3, 2);
        let wide = grid.with_duplicated(&[0, 2], 3).unwrap();
        assert_eq!(wide.width(), 4);
        assert_eq!(wide.as_slice(), &[0, 0, 1, 2, 3, 4, 5, 5]);
    }

    #[test]
    fn inflation_blends_each_new_cell_from_its_neighbours() {
        let grid = Grid::from_vec(4, 2, 1, vec![10, 20, 30, 40, 1, 2, 3, 4]).unwrap();
        let marks = vec![vec![0, 2, 4], vec![1, 2, 3]];
        let wide = grid.inflated(&marks, 4, |a, b| a + b).unwrap();
        assert_eq!(wide.width(), 7);
        assert_eq!(
            wide.as_slice(),
            &[20, 10, 20, 50, 30, 40, 80, 1, 3, 2, 5, 3, 7, 4]
        );
        assert!(grid.inflated(&[vec![0], vec![]], 4, |a, _| a).is_err());
        assert!(grid.inflated(&[vec![2, 1], vec![0, 1]], 4, |a, _| a).is_err());
    }
}
