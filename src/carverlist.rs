// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Attached carvers
//!
//! An attached carver holds an auxiliary raster (an alpha mask, a depth
//! channel) that must lose and gain exactly the pixels its root does.
//! Dropping a carver drops its attachments with it.

use crate::carver::Carver;
use crate::error::Result;
use crate::sample::Sample;

#[derive(Debug)]
pub struct CarverList<S: Sample> {
    carvers: Vec<Carver<S>>,
}

impl<S: Sample> Default for CarverList<S> {
    fn default() -> Self {
        CarverList {
            carvers: Vec::new(),
        }
    }
}

impl<S: Sample> CarverList<S> {
    pub(crate) fn push(&mut self, carver: Carver<S>) {
        self.carvers.push(carver);
    }

    pub fn len(&self) -> usize {
        self.carvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.carvers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<Carver<S>> {
        self.carvers.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<Carver<S>> {
        self.carvers.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&Carver<S>> {
        self.carvers.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Carver<S>> {
        self.carvers.get_mut(index)
    }

    /// Apply `f` to every carver in the list, stopping at the first
    /// error.
    pub fn for_each<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Carver<S>) -> Result<()>,
    {
        self.carvers.iter_mut().try_for_each(|c| f(c))
    }

    /// Apply `f` to every carver in the list and, depth first, to
    /// everything attached to them.
    pub fn for_each_recursive<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut Carver<S>) -> Result<()>,
    {
        for carver in self.carvers.iter_mut() {
            f(carver)?;
            carver.attached_mut().for_each_recursive(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;

    fn carver(width: usize) -> Carver<u8> {
        let raster = Raster::from_fn(width, 3, 1, |x, y, _| (x * 16 + y) as u8).unwrap();
        Carver::new(raster).unwrap()
    }

    #[test]
    fn recursion_reaches_nested_attachments() {
        let mut middle = carver(4);
        middle.init(0.0).unwrap();
        middle.attach(carver(4)).unwrap();
        let mut root = carver(4);
        root.init(0.0).unwrap();
        root.attach(middle).unwrap();

        let mut seen = 0;
        root.attached_mut()
            .for_each_recursive(&mut |c: &mut Carver<u8>| {
                seen += 1;
                c.set_use_cache(false);
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, 2);
        assert_eq!(root.attached().len(), 1);

        root.remove_seam().unwrap();
        let nested = root.attached().get(0).unwrap().attached().get(0).unwrap();
        assert_eq!(nested.width(), 3);
    }
}
