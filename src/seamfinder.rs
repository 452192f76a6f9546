// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Find the cheapest seam
//!
//! The cumulative-cost table is built one storage row at a time; each
//! cell holds the cheapest cost of any connected seam from the top row
//! down to it, and the column it came from.  The seam is recovered by
//! walking the back pointers up from the cheapest cell of the bottom
//! row.  Seams always run top to bottom in storage; the carver
//! transposes its grids to carve the other way.

use crate::error::{try_vec, CarveError, Result};
use crate::grid::{CostAndParent, Grid};
use crate::orientation::Orientation;

/// One connected path through the live raster, one position per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seam {
    orientation: Orientation,
    coords: Vec<usize>,
}

impl Seam {
    pub(crate) fn new(orientation: Orientation, coords: Vec<usize>) -> Self {
        Seam {
            orientation,
            coords,
        }
    }

    /// The position of the seam in every line: columns when carving
    /// width, rows when carving height.
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The seam as `(x, y)` image coordinates.
    pub fn points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let orientation = self.orientation;
        self.coords
            .iter()
            .enumerate()
            .map(move |(line, &pos)| orientation.map(pos, line))
    }

    /// Adjacent positions never differ by more than one.
    pub fn is_connected(&self) -> bool {
        self.coords
            .windows(2)
            .all(|w| cq!(w[0] > w[1], w[0] - w[1], w[1] - w[0]) <= 1)
    }
}

/// Everything the dynamic program reads, in storage orientation.
pub(crate) struct SeamSearch<'a> {
    pub energy: &'a Grid<f32>,
    pub bias: Option<&'a Grid<f32>>,
    /// Bias is divided by the width the pass started from.
    pub bias_scale: f64,
    pub rigidity: f32,
    pub rigidity_mask: Option<&'a Grid<f32>>,
    pub width: usize,
    pub height: usize,
    /// Prefer the right diagonal, and the rightmost of equal minima.
    pub prefer_right: bool,
}

impl<'a> SeamSearch<'a> {
    #[inline]
    fn pixel_cost(&self, x: usize, y: usize) -> f64 {
        let bias = self.bias.map_or(0.0, |b| f64::from(b[(x, y)]));
        f64::from(self.energy[(x, y)]) + bias * self.bias_scale
    }

    // The curvature penalty for stepping `delta` columns into `(x, y)`.
    #[inline]
    fn step_penalty(&self, x: usize, y: usize, delta: usize) -> f64 {
        if delta == 0 || self.rigidity == 0.0 {
            return 0.0;
        }
        let mask = self.rigidity_mask.map_or(1.0, |m| f64::from(m[(x, y)]));
        f64::from(self.rigidity) * mask * (delta as f64).powf(1.5) / self.height as f64
    }

    /// Fill `costs` (reused between calls) and return the seam's column
    /// in every row.
    pub fn run(&self, costs: &mut Vec<CostAndParent>) -> Result<Vec<usize>> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(CarveError::State("cannot search an empty raster".to_string()));
        }
        if costs.len() < width * height {
            *costs = try_vec(width * height, CostAndParent::default())?;
        }
        let at = |x: usize, y: usize| y * width + x;
        let maxwidth = width - 1;
        let diagonals: [isize; 2] = cq!(self.prefer_right, [1, -1], [-1, 1]);

        // Populate the first row with their native costs.
        for x in 0..width {
            costs[at(x, 0)] = CostAndParent {
                cost: self.pixel_cost(x, 0),
                parent: x,
            };
        }

        // Straight ahead wins ties; a diagonal has to be strictly
        // cheaper to displace it.
        for y in 1..height {
            for x in 0..width {
                let mut best = CostAndParent {
                    cost: costs[at(x, y - 1)].cost,
                    parent: x,
                };
                for &dx in diagonals.iter() {
                    let px = x as isize + dx;
                    if px < 0 || px > maxwidth as isize {
                        continue;
                    }
                    let px = px as usize;
                    let cost = costs[at(px, y - 1)].cost + self.step_penalty(x, y, 1);
                    if cost < best.cost {
                        best = CostAndParent { cost, parent: px };
                    }
                }
                costs[at(x, y)] = CostAndParent {
                    cost: best.cost + self.pixel_cost(x, y),
                    parent: best.parent,
                };
            }
        }

        // Find the x coordinate of the bottommost seam with the least
        // energy.
        let last = height - 1;
        let mut seam_col = (0..width).fold(cq!(self.prefer_right, maxwidth, 0), |best, x| {
            let (c, b) = (costs[at(x, last)].cost, costs[at(best, last)].cost);
            cq!(c < b || (self.prefer_right && c == b), x, best)
        });

        // Working backwards, generate a vec of x coordinates that that
        // map to the seam, reverse and return.
        Ok((0..height)
            .rev()
            .fold(Vec::<usize>::with_capacity(height), |mut acc, y| {
                acc.push(seam_col);
                seam_col = costs[at(seam_col, y)].parent;
                acc
            })
            .into_iter()
            .rev()
            .collect())
    }
}
