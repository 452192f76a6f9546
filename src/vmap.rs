// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visibility maps
//!
//! A `VMap` is the record of one removal: where the seam ran and what
//! it took with it.  The carver keeps a stack of them as its undo
//! history, and, when asked, a second list of snapshots that outlives
//! flattening and transposition.

use crate::orientation::Orientation;
use crate::sample::Sample;

#[derive(Debug, Clone, PartialEq)]
pub struct VMap<S: Sample> {
    pub(crate) orientation: Orientation,
    pub(crate) seam: Vec<usize>,
    pub(crate) channels: usize,
    pub(crate) pixels: Vec<S>,
    pub(crate) bias: Option<Vec<f32>>,
    pub(crate) rigidity: Option<Vec<f32>>,
    pub(crate) width_before: usize,
}

impl<S: Sample> VMap<S> {
    /// The orientation the carver was in when the seam was removed.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// The removed position in every storage line.
    pub fn seam(&self) -> &[usize] {
        &self.seam
    }

    /// The removed samples, one pixel per line, in line order.
    pub fn pixels(&self) -> &[S] {
        &self.pixels
    }

    pub fn pixel(&self, line: usize) -> &[S] {
        &self.pixels[line * self.channels..(line + 1) * self.channels]
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// The length of the carved dimension just before the removal.
    pub fn width_before(&self) -> usize {
        self.width_before
    }

    /// The removed pixels as `(x, y)` image coordinates, valid for the
    /// image as it was just before the removal.
    pub fn points(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let orientation = self.orientation;
        self.seam
            .iter()
            .enumerate()
            .map(move |(line, &pos)| orientation.map(pos, line))
    }
}

/// Completed removals, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct VMapList<S: Sample> {
    vmaps: Vec<VMap<S>>,
}

impl<S: Sample> Default for VMapList<S> {
    fn default() -> Self {
        VMapList { vmaps: Vec::new() }
    }
}

impl<S: Sample> VMapList<S> {
    pub(crate) fn push(&mut self, vmap: VMap<S>) {
        self.vmaps.push(vmap);
    }

    pub fn len(&self) -> usize {
        self.vmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vmaps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<VMap<S>> {
        self.vmaps.iter()
    }

    pub fn get(&self, index: usize) -> Option<&VMap<S>> {
        self.vmaps.get(index)
    }

    pub fn last(&self) -> Option<&VMap<S>> {
        self.vmaps.last()
    }

    pub fn clear(&mut self) {
        self.vmaps.clear();
    }
}

impl<'a, S: Sample> IntoIterator for &'a VMapList<S> {
    type Item = &'a VMap<S>;
    type IntoIter = std::slice::Iter<'a, VMap<S>>;

    fn into_iter(self) -> Self::IntoIter {
        self.vmaps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transposed_points_swap_axes() {
        let vmap = VMap::<u8> {
            orientation: Orientation::Transposed,
            seam: vec![4, 5],
            channels: 2,
            pixels: vec![1, 2, 3, 4],
            bias: None,
            rigidity: None,
            width_before: 6,
        };
        assert_eq!(vmap.points().collect::<Vec<_>>(), vec![(0, 4), (1, 5)]);
        assert_eq!(vmap.pixel(1), &[3, 4]);

        let mut list = VMapList::default();
        assert!(list.is_empty());
        list.push(vmap.clone());
        assert_eq!(list.last(), Some(&vmap));
        assert_eq!((&list).into_iter().count(), 1);
        list.clear();
        assert_eq!(list.len(), 0);
    }
}
