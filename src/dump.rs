// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Render carver state as images, for looking at.

use crate::error::{CarveError, Result};
use crate::sample::Sample;
use crate::vmap::VMap;
use image::{GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use std::convert::TryFrom;

fn dimension(v: usize) -> Result<u32> {
    u32::try_from(v).map_err(|_| CarveError::Image(format!("{} does not fit an image", v)))
}

/// Scale an energy map so that its largest value is white.  A map of
/// all zeros comes out black.
pub fn energy_to_image(energy: &[f32], width: usize, height: usize) -> Result<GrayImage> {
    if energy.len() != width * height {
        return Err(CarveError::Argument(format!(
            "{} energies for a {}x{} image",
            energy.len(),
            width,
            height
        )));
    }
    let factor = energy.iter().cloned().fold(0.0f32, f32::max);
    let scale = cq!(factor > 0.0, 255.0 / factor, 0.0);
    let data = energy
        .iter()
        .map(|&e| (e.max(0.0) * scale).round().min(255.0) as u8)
        .collect();
    let out: Option<ImageBuffer<Luma<u8>, Vec<u8>>> =
        ImageBuffer::from_raw(dimension(width)?, dimension(height)?, data);
    out.ok_or_else(|| CarveError::Image("energy buffer does not fit".to_string()))
}

/// Paint the removed seam of `vmap` onto a copy of `base`, which must
/// be the image as it was just before the removal.
pub fn vmap_to_image<S: Sample>(
    base: &RgbImage,
    vmap: &VMap<S>,
    colour: Rgb<u8>,
) -> Result<RgbImage> {
    let mut out = base.clone();
    for (x, y) in vmap.points() {
        let (x, y) = (dimension(x)?, dimension(y)?);
        if x >= out.width() || y >= out.height() {
            return Err(CarveError::Argument(format!(
                "seam point ({}, {}) lies outside the {}x{} image",
                x,
                y,
                out.width(),
                out.height()
            )));
        }
        out.put_pixel(x, y, colour);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carver::Carver;
    use crate::raster::Raster;

    #[test]
    fn energy_is_scaled_to_white() {
        let img = energy_to_image(&[0.0, 0.5, 1.0, 0.25], 2, 2).unwrap();
        assert_eq!(img.into_raw(), vec![0, 128, 255, 64]);
        let black = energy_to_image(&[0.0; 4], 4, 1).unwrap();
        assert!(black.pixels().all(|p| p.0 == [0]));
        assert!(energy_to_image(&[1.0; 3], 2, 2).is_err());
    }

    #[test]
    fn seams_are_painted_where_they_ran() {
        let raster = Raster::from_fn(5, 4, 3, |x, y, _| (x * 40 + y) as u8).unwrap();
        let base = RgbImage::from_raw(5, 4, raster.as_slice().to_vec()).unwrap();
        let mut carver = Carver::new(raster).unwrap();
        carver.init(0.0).unwrap();
        let seam = carver.remove_seam().unwrap();
        let red = Rgb([255, 0, 0]);
        let painted = vmap_to_image(&base, &carver.history()[0], red).unwrap();
        for (y, &x) in seam.coords().iter().enumerate() {
            assert_eq!(*painted.get_pixel(x as u32, y as u32), red);
        }
        let marked = painted.pixels().filter(|&&p| p == red).count();
        assert_eq!(marked, 4);
    }
}
