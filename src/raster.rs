// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The raster handed to, and returned by, the carver.

use crate::error::{checked_area, CarveError, Result};
use crate::sample::Sample;

/// An interleaved pixel buffer: `height` rows of `width` pixels, each
/// pixel `channels` samples long.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster<S: Sample> {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<S>,
}

impl<S: Sample> Raster<S> {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<S>) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(CarveError::Argument(format!(
                "a {}x{} raster with {} channels is empty",
                width, height, channels
            )));
        }
        let len = checked_area(width, height, channels)?;
        if data.len() != len {
            return Err(CarveError::Argument(format!(
                "raster buffer holds {} samples, expected {}",
                data.len(),
                len
            )));
        }
        Ok(Raster {
            width,
            height,
            channels,
            data,
        })
    }

    /// Build a raster by asking `f` for every sample.
    pub fn from_fn<F>(width: usize, height: usize, channels: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize, usize) -> S,
    {
        let mut data = Vec::with_capacity(checked_area(width, height, channels)?);
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    data.push(f(x, y, c));
                }
            }
        }
        Raster::new(width, height, channels, data)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[S] {
        let at = (y * self.width + x) * self.channels;
        &self.data[at..at + self.channels]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [S] {
        let at = (y * self.width + x) * self.channels;
        let channels = self.channels;
        &mut self.data[at..at + channels]
    }

    pub fn as_slice(&self) -> &[S] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<S> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rasters_are_rejected() {
        assert!(Raster::<u8>::new(0, 3, 1, vec![]).is_err());
        assert!(Raster::<u8>::new(2, 2, 1, vec![0; 3]).is_err());
    }

    #[test]
    fn pixels_are_interleaved() {
        let r = Raster::from_fn(3, 2, 2, |x, y, c| (10 * y + x + 100 * c) as u16).unwrap();
        assert_eq!(r.pixel(2, 1), &[12, 112]);
        assert_eq!(r.as_slice().len(), 12);
    }
}
