// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The reading window
//!
//! An energy function never touches the raster directly.  Before each
//! evaluation the carver fills a small square buffer, `2 * radius + 1`
//! pixels on a side, centred on the pixel being scored.  Reads that
//! fall off the image replicate the nearest border pixel.
//!
//! When the resample cache is on, the per-pixel conversion (to
//! brightness, luma, RGBA, or normalised raw channels) is done once per
//! pixel ahead of time, and the window is filled from that cache.  The
//! values are the same either way.

use crate::carver::Carver;
use crate::error::{try_vec, CarveError, Result};
use crate::grid::Grid;
use crate::pixel::ChannelLayout;
use crate::sample::Sample;

/// What one window slot holds.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReaderType {
    /// One value: brightness.
    Brightness,
    /// One value: luma.
    Luma,
    /// Four values: red, green, blue, alpha.
    Rgba,
    /// Every channel, normalised but otherwise untouched.
    Custom,
}

impl ReaderType {
    pub fn values_per_pixel(self, channels: usize) -> usize {
        match self {
            ReaderType::Brightness | ReaderType::Luma => 1,
            ReaderType::Rgba => 4,
            ReaderType::Custom => channels,
        }
    }
}

/// The live pixels a window is filled from.
pub(crate) struct WindowSource<'a, S: Sample> {
    pub pixels: &'a Grid<S>,
    pub layout: &'a ChannelLayout,
    pub cache: Option<&'a Grid<f64>>,
    pub width: usize,
    pub height: usize,
}

impl<'a, S: Sample> WindowSource<'a, S> {
    #[inline]
    fn load(&self, reader: ReaderType, x: usize, y: usize, out: &mut [f64]) {
        match self.cache {
            Some(cache) => out.copy_from_slice(cache.cell(x, y)),
            None => convert(self.layout, self.pixels.cell(x, y), reader, out),
        }
    }
}

#[inline]
fn convert<S: Sample>(layout: &ChannelLayout, px: &[S], reader: ReaderType, out: &mut [f64]) {
    match reader {
        ReaderType::Brightness => out[0] = layout.brightness(px),
        ReaderType::Luma => out[0] = layout.luma(px),
        ReaderType::Rgba => layout.rgba(px, out),
        ReaderType::Custom => out
            .iter_mut()
            .zip(px.iter())
            .for_each(|(o, v)| *o = v.to_unit()),
    }
}

/// Precompute the reader values of every live pixel.  The cache has
/// the same allocation as the pixel grid so that seams can be carved
/// out of both in step.
pub(crate) fn build_cache<S: Sample>(
    pixels: &Grid<S>,
    layout: &ChannelLayout,
    reader: ReaderType,
    width: usize,
    height: usize,
) -> Result<Grid<f64>> {
    let depth = reader.values_per_pixel(layout.channels());
    let mut cache = Grid::new(pixels.width(), pixels.height(), depth, 0.0)?;
    for y in 0..height {
        for x in 0..width {
            convert(layout, pixels.cell(x, y), reader, cache.cell_mut(x, y));
        }
    }
    Ok(cache)
}

#[derive(Debug, Clone)]
pub struct ReadingWindow {
    radius: usize,
    side: usize,
    reader: ReaderType,
    depth: usize,
    use_cache: bool,
    buffer: Vec<f64>,
}

impl ReadingWindow {
    fn with_reader(radius: usize, reader: ReaderType, depth: usize) -> Result<Self> {
        if radius == 0 {
            return Err(CarveError::Argument(
                "reading window radius must be at least 1".to_string(),
            ));
        }
        if depth == 0 {
            return Err(CarveError::Argument(
                "reading window needs at least one channel".to_string(),
            ));
        }
        let side = 2 * radius + 1;
        Ok(ReadingWindow {
            radius,
            side,
            reader,
            depth,
            use_cache: false,
            buffer: try_vec(side * side * depth, 0.0)?,
        })
    }

    /// A single-valued window reading brightness or luma.
    pub fn new_std(radius: usize, reader: ReaderType) -> Result<Self> {
        match reader {
            ReaderType::Brightness | ReaderType::Luma => Self::with_reader(radius, reader, 1),
            other => Err(CarveError::Argument(format!(
                "{:?} is not a single-valued reader",
                other
            ))),
        }
    }

    pub fn new_rgba(radius: usize) -> Result<Self> {
        Self::with_reader(radius, ReaderType::Rgba, 4)
    }

    pub fn new_custom(radius: usize, channels: usize) -> Result<Self> {
        Self::with_reader(radius, ReaderType::Custom, channels)
    }

    /// The window an energy function with this radius and reader needs
    /// on an image with `channels` channels.
    pub fn for_reader(radius: usize, reader: ReaderType, channels: usize) -> Result<Self> {
        match reader {
            ReaderType::Brightness | ReaderType::Luma => Self::new_std(radius, reader),
            ReaderType::Rgba => Self::new_rgba(radius),
            ReaderType::Custom => Self::new_custom(radius, channels),
        }
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn reader_type(&self) -> ReaderType {
        self.reader
    }

    /// Whether the last fill came from the resample cache.
    pub fn uses_cache(&self) -> bool {
        self.use_cache
    }

    /// Fill the window around `(x, y)` of the carver's working grid.
    /// The coordinates are storage coordinates: when the carver is
    /// transposed, `x` runs along image rows.
    pub fn fill<S: Sample>(&mut self, carver: &Carver<S>, x: usize, y: usize) -> Result<()> {
        let source = carver.window_source();
        if x >= source.width || y >= source.height {
            return Err(CarveError::Argument(format!(
                "({}, {}) is outside the {}x{} working grid",
                x, y, source.width, source.height
            )));
        }
        if source.cache.map_or(false, |c| c.depth() != self.depth) {
            return Err(CarveError::State(
                "resample cache does not match the window reader".to_string(),
            ));
        }
        self.fill_from(&source, x, y);
        Ok(())
    }

    pub(crate) fn fill_from<S: Sample>(&mut self, source: &WindowSource<S>, x: usize, y: usize) {
        let r = self.radius as isize;
        let (mx, my) = (source.width as isize - 1, source.height as isize - 1);
        let (x, y) = (x as isize, y as isize);
        let depth = self.depth;
        let mut at = 0;
        for dy in -r..=r {
            let sy = clamp_coord!(y + dy, my) as usize;
            for dx in -r..=r {
                let sx = clamp_coord!(x + dx, mx) as usize;
                source.load(self.reader, sx, sy, &mut self.buffer[at..at + depth]);
                at += depth;
            }
        }
        self.use_cache = source.cache.is_some();
    }

    #[inline]
    fn slot(&self, dx: isize, dy: isize) -> usize {
        let r = self.radius as isize;
        debug_assert!(dx.abs() <= r && dy.abs() <= r);
        (((dy + r) as usize) * self.side + (dx + r) as usize) * self.depth
    }

    #[inline]
    pub fn read_bright(&self, dx: isize, dy: isize) -> f64 {
        debug_assert_eq!(self.reader, ReaderType::Brightness);
        self.buffer[self.slot(dx, dy)]
    }

    #[inline]
    pub fn read_luma(&self, dx: isize, dy: isize) -> f64 {
        debug_assert_eq!(self.reader, ReaderType::Luma);
        self.buffer[self.slot(dx, dy)]
    }

    #[inline]
    pub fn read_rgba(&self, dx: isize, dy: isize, channel: usize) -> f64 {
        debug_assert_eq!(self.reader, ReaderType::Rgba);
        self.buffer[self.slot(dx, dy) + channel]
    }

    #[inline]
    pub fn read_custom(&self, dx: isize, dy: isize, channel: usize) -> f64 {
        debug_assert_eq!(self.reader, ReaderType::Custom);
        self.buffer[self.slot(dx, dy) + channel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use approx::assert_abs_diff_eq;

    fn ramp() -> (Grid<u8>, ChannelLayout) {
        // 4x3 grey ramp, value = 10 * x + 100 * y
        let data = (0..3)
            .flat_map(|y| (0..4).map(move |x| (10 * x + 100 * y) as u8))
            .collect();
        (
            Grid::from_vec(4, 3, 1, data).unwrap(),
            ChannelLayout::for_channels(1),
        )
    }

    #[test]
    fn radius_must_be_positive() {
        assert!(ReadingWindow::new_std(0, ReaderType::Brightness).is_err());
        assert!(ReadingWindow::new_std(1, ReaderType::Rgba).is_err());
        assert!(ReadingWindow::new_custom(2, 0).is_err());
    }

    #[test]
    fn borders_replicate() {
        let (pixels, layout) = ramp();
        let source = WindowSource {
            pixels: &pixels,
            layout: &layout,
            cache: None,
            width: 4,
            height: 3,
        };
        let mut rw = ReadingWindow::new_std(1, ReaderType::Brightness).unwrap();
        rw.fill_from(&source, 0, 0);
        let v = |n: f64| n / 255.0;
        assert_eq!(rw.read_bright(0, 0), v(0.0));
        assert_eq!(rw.read_bright(-1, 0), v(0.0));
        assert_eq!(rw.read_bright(-1, -1), v(0.0));
        assert_eq!(rw.read_bright(1, 0), v(10.0));
        assert_eq!(rw.read_bright(1, 1), v(110.0));
        rw.fill_from(&source, 3, 2);
        assert_eq!(rw.read_bright(1, 1), v(230.0));
        assert_eq!(rw.read_bright(-1, 0), v(220.0));
    }

    #[test]
    fn cached_reads_match_direct_reads() {
        let (pixels, layout) = ramp();
        let cache = build_cache(&pixels, &layout, ReaderType::Luma, 4, 3).unwrap();
        let direct = WindowSource {
            pixels: &pixels,
            layout: &layout,
            cache: None,
            width: 4,
            height: 3,
        };
        let cached = WindowSource {
            cache: Some(&cache),
            ..direct
        };
        let mut a = ReadingWindow::new_std(2, ReaderType::Luma).unwrap();
        let mut b = a.clone();
        for y in 0..3 {
            for x in 0..4 {
                a.fill_from(&direct, x, y);
                b.fill_from(&cached, x, y);
                assert!(!a.uses_cache());
                assert!(b.uses_cache());
                assert_eq!(a.buffer, b.buffer);
            }
        }
    }

    #[test]
    fn custom_reader_exposes_every_channel() {
        let pixels = Grid::from_vec(1, 1, 3, vec![0u8, 51, 255]).unwrap();
        let layout = ChannelLayout::for_channels(3);
        let source = WindowSource {
            pixels: &pixels,
            layout: &layout,
            cache: None,
            width: 1,
            height: 1,
        };
        let mut rw = ReadingWindow::new_custom(1, 3).unwrap();
        rw.fill_from(&source, 0, 0);
        assert_eq!(rw.read_custom(1, 1, 1), 0.2);
        assert_eq!(rw.read_custom(-1, 0, 2), 1.0);
    }

    #[test]
    fn fill_reads_the_live_carver_grid() {
        let raster = Raster::from_fn(9, 4, 1, |x, y, _| ((x * 37 + y * 11) % 256) as u8).unwrap();
        let mut carver = Carver::new(raster).unwrap();
        carver.init(0.0).unwrap();
        for _ in 0..3 {
            carver.remove_seam().unwrap();
        }
        let live = carver.raster().unwrap();
        let mut rw = ReadingWindow::new_std(1, ReaderType::Brightness).unwrap();
        rw.fill(&carver, 5, 3).unwrap();
        assert!(rw.uses_cache());
        let v = |x: usize, y: usize| f64::from(live.pixel(x, y)[0]) / 255.0;
        assert_abs_diff_eq!(rw.read_bright(0, 0), v(5, 3), epsilon = 1e-12);
        assert_abs_diff_eq!(rw.read_bright(-1, -1), v(4, 2), epsilon = 1e-12);
        assert_abs_diff_eq!(rw.read_bright(1, 1), v(5, 3), epsilon = 1e-12);

        assert!(matches!(rw.fill(&carver, 6, 0), Err(CarveError::Argument(_))));
        assert!(matches!(rw.fill(&carver, 0, 4), Err(CarveError::Argument(_))));
        let mut rgba = ReadingWindow::new_rgba(1).unwrap();
        assert!(matches!(rgba.fill(&carver, 0, 0), Err(CarveError::State(_))));
    }
}
