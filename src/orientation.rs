// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Image dimensional flipper
//!
//! The carver only ever knows how to remove a seam that runs from the
//! top of its working grid to the bottom.  To carve the other way it
//! flips the grid 90°, so that what the caller calls a column is, in
//! storage, a row.  `Orientation` records which way round the storage
//! is, and `map` is the one and only place that translates between the
//! caller's `(x, y)` and the storage `(column, row)`.

/// Which way round the working grid is stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Orientation {
    /// Storage rows are image rows; seams remove image columns.
    Normal,
    /// Storage rows are image columns; seams remove image rows.
    Transposed,
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Normal
    }
}

impl Orientation {
    pub fn turn(self) -> Self {
        match self {
            Orientation::Normal => Orientation::Transposed,
            Orientation::Transposed => Orientation::Normal,
        }
    }

    pub fn is_transposed(self) -> bool {
        self == Orientation::Transposed
    }

    /// Translate a coordinate pair between caller space and storage.
    /// The mapping is its own inverse, so the same call works in both
    /// directions; it applies equally to `(width, height)` pairs.
    #[inline]
    pub fn map(self, x: usize, y: usize) -> (usize, usize) {
        match self {
            Orientation::Normal => (x, y),
            Orientation::Transposed => (y, x),
        }
    }

    /// What a single removed seam takes out of the image.
    pub fn carved_lines(self) -> &'static str {
        match self {
            Orientation::Normal => "columns",
            Orientation::Transposed => "rows",
        }
    }
}

/// The caller-facing dimension a resize pass works on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

impl Axis {
    pub fn turn(self) -> Self {
        match self {
            Axis::Width => Axis::Height,
            Axis::Height => Axis::Width,
        }
    }

    /// The storage orientation in which seams shrink or grow this axis.
    pub fn orientation(self) -> Orientation {
        match self {
            Axis::Width => Orientation::Normal,
            Axis::Height => Orientation::Transposed,
        }
    }

    /// Pick this axis' member of a `(width, height)` pair.
    pub fn pick(self, width: usize, height: usize) -> usize {
        match self {
            Axis::Width => width,
            Axis::Height => height,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Width => "width",
            Axis::Height => "height",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_is_an_involution() {
        for &o in &[Orientation::Normal, Orientation::Transposed] {
            let (a, b) = o.map(3, 7);
            assert_eq!(o.map(a, b), (3, 7));
        }
        assert_eq!(Orientation::Transposed.map(3, 7), (7, 3));
    }

    #[test]
    fn axes_choose_their_orientation() {
        assert_eq!(Axis::Width.orientation(), Orientation::Normal);
        assert_eq!(Axis::Height.orientation(), Orientation::Transposed);
        assert_eq!(Axis::Width.turn(), Axis::Height);
        assert_eq!(Axis::Height.pick(4, 9), 9);
    }
}
