// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bias and rigidity overlays
//!
//! Both overlays are addressed in image coordinates.  A buffer placed
//! partly off the image is clipped to the overlap; a buffer entirely
//! off the image is an argument error that leaves the carver as it
//! was.  Writing to either overlay flattens the history first, since
//! the recorded seams carry the overlay values they removed.
//!
//! A positive bias protects pixels, a negative one attracts seams.  The
//! rigidity mask scales the curvature penalty per pixel; where there is
//! no mask the scale is one.

use crate::carver::Carver;
use crate::error::{checked_area, CarveError, Result};
use crate::grid::Grid;
use crate::sample::Sample;

// The part of a `width x height` buffer placed at `(x_off, y_off)`
// that lands on the image, as buffer-relative and image-relative
// starting points and an extent.
struct Overlap {
    buf_x: usize,
    buf_y: usize,
    img_x: usize,
    img_y: usize,
    width: usize,
    height: usize,
}

fn overlap(
    width: usize,
    height: usize,
    x_off: isize,
    y_off: isize,
    image_width: usize,
    image_height: usize,
) -> Result<Overlap> {
    let clip = |len: usize, off: isize, image: usize| -> Option<(usize, usize, usize)> {
        let start = off.max(0) as usize;
        let skip = (-off).max(0) as usize;
        let end = (off + len as isize).min(image as isize);
        cq!(
            end > start as isize && skip < len,
            Some((skip, start, end as usize - start)),
            None
        )
    };
    match (
        clip(width, x_off, image_width),
        clip(height, y_off, image_height),
    ) {
        (Some((buf_x, img_x, width)), Some((buf_y, img_y, height))) => Ok(Overlap {
            buf_x,
            buf_y,
            img_x,
            img_y,
            width,
            height,
        }),
        _ => Err(CarveError::Argument(format!(
            "a {}x{} area at ({}, {}) lies outside the {}x{} image",
            width, height, x_off, y_off, image_width, image_height
        ))),
    }
}

fn check_buffer(len: usize, width: usize, height: usize, channels: usize) -> Result<()> {
    let wanted = checked_area(width, height, channels)?;
    if len < wanted || wanted == 0 {
        return Err(CarveError::Argument(format!(
            "buffer holds {} values, a {}x{} area needs {}",
            len, width, height, wanted
        )));
    }
    Ok(())
}

impl<S: Sample> Carver<S> {
    // Flatten, make sure the overlay exists, and hand every overlapping
    // `(image offset in buffer, storage cell)` pair to `apply`.
    fn write_overlay<F>(
        &mut self,
        rigidity: bool,
        width: usize,
        height: usize,
        x_off: isize,
        y_off: isize,
        mut apply: F,
    ) -> Result<()>
    where
        F: FnMut(usize, &mut f32),
    {
        let area = overlap(width, height, x_off, y_off, self.width(), self.height())?;
        self.flatten_internal()?;
        let orientation = self.orientation();
        let (w, h) = (self.w, self.h);
        let fill = cq!(rigidity, 1.0, 0.0);
        let overlay = cq!(rigidity, &mut self.rigidity_mask, &mut self.bias);
        if overlay.is_none() {
            *overlay = Some(Grid::new(w, h, 1, fill)?);
        }
        if let Some(grid) = overlay.as_mut() {
            for y in 0..area.height {
                for x in 0..area.width {
                    let offset = (area.buf_y + y) * width + area.buf_x + x;
                    let (sx, sy) = orientation.map(area.img_x + x, area.img_y + y);
                    apply(offset, &mut grid[(sx, sy)]);
                }
            }
        }
        Ok(())
    }

    /// Add `factor * buffer[i] / 2` to the bias under a `width x
    /// height` buffer placed at `(x_off, y_off)`.  A factor of zero
    /// does nothing at all.
    pub fn bias_add_area(
        &mut self,
        buffer: &[f32],
        factor: f32,
        width: usize,
        height: usize,
        x_off: isize,
        y_off: isize,
    ) -> Result<()> {
        self.require_active()?;
        if factor == 0.0 {
            return Ok(());
        }
        check_buffer(buffer.len(), width, height, 1)?;
        self.write_overlay(false, width, height, x_off, y_off, |i, b| {
            *b += factor * buffer[i] / 2.0
        })
    }

    /// As `bias_add_area`, for a buffer covering the whole image.
    pub fn bias_add(&mut self, buffer: &[f32], factor: f32) -> Result<()> {
        let (width, height) = (self.width(), self.height());
        self.bias_add_area(buffer, factor, width, height, 0, 0)
    }

    pub fn bias_add_xy(&mut self, bias: f32, x: usize, y: usize) -> Result<()> {
        self.bias_add_area(&[bias], 1.0, 1, 1, x as isize, y as isize)
    }

    /// Add bias from an 8-bit buffer of `channels` channels.  The
    /// colour channels are averaged; the last channel is alpha when
    /// there are two, or four or more.
    pub fn bias_add_rgb_area(
        &mut self,
        buffer: &[u8],
        factor: f32,
        channels: usize,
        width: usize,
        height: usize,
        x_off: isize,
        y_off: isize,
    ) -> Result<()> {
        self.require_active()?;
        if factor == 0.0 {
            return Ok(());
        }
        check_buffer(buffer.len(), width, height, channels)?;
        self.write_overlay(false, width, height, x_off, y_off, |i, b| {
            *b += factor * rgb_value(&buffer[i * channels..(i + 1) * channels]) / 2.0
        })
    }

    pub fn bias_add_rgb(&mut self, buffer: &[u8], factor: f32, channels: usize) -> Result<()> {
        let (width, height) = (self.width(), self.height());
        self.bias_add_rgb_area(buffer, factor, channels, width, height, 0, 0)
    }

    pub fn bias_clear(&mut self) -> Result<()> {
        self.require_active()?;
        self.bias = None;
        Ok(())
    }

    /// Overwrite the rigidity mask under a buffer.  The mask starts
    /// out as all ones the first time it is written.
    pub fn rigidity_mask_add_area(
        &mut self,
        buffer: &[f32],
        width: usize,
        height: usize,
        x_off: isize,
        y_off: isize,
    ) -> Result<()> {
        self.require_active()?;
        check_buffer(buffer.len(), width, height, 1)?;
        self.write_overlay(true, width, height, x_off, y_off, |i, m| *m = buffer[i])
    }

    pub fn rigidity_mask_add(&mut self, buffer: &[f32]) -> Result<()> {
        let (width, height) = (self.width(), self.height());
        self.rigidity_mask_add_area(buffer, width, height, 0, 0)
    }

    pub fn rigidity_mask_add_xy(&mut self, rigidity: f32, x: usize, y: usize) -> Result<()> {
        self.rigidity_mask_add_area(&[rigidity], 1, 1, x as isize, y as isize)
    }

    pub fn rigidity_mask_add_rgb_area(
        &mut self,
        buffer: &[u8],
        channels: usize,
        width: usize,
        height: usize,
        x_off: isize,
        y_off: isize,
    ) -> Result<()> {
        self.require_active()?;
        check_buffer(buffer.len(), width, height, channels)?;
        self.write_overlay(true, width, height, x_off, y_off, |i, m| {
            *m = rgb_value(&buffer[i * channels..(i + 1) * channels])
        })
    }

    pub fn rigidity_mask_add_rgb(&mut self, buffer: &[u8], channels: usize) -> Result<()> {
        let (width, height) = (self.width(), self.height());
        self.rigidity_mask_add_rgb_area(buffer, channels, width, height, 0, 0)
    }

    pub fn rigidity_mask_clear(&mut self) -> Result<()> {
        self.require_active()?;
        self.rigidity_mask = None;
        Ok(())
    }
}

// Mean of the colour channels in [0, 1], scaled by alpha when there is
// one.
fn rgb_value(px: &[u8]) -> f32 {
    let has_alpha = px.len() == 2 || px.len() >= 4;
    let colours = cq!(has_alpha, &px[..px.len() - 1], px);
    let sum: f32 = colours.iter().map(|&c| f32::from(c)).sum();
    let value = sum / (255.0 * colours.len() as f32);
    cq!(
        has_alpha,
        value * f32::from(px[px.len() - 1]) / 255.0,
        value
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use approx::assert_abs_diff_eq;

    fn carver(width: usize, height: usize) -> Carver<u8> {
        let raster = Raster::from_fn(width, height, 1, |x, y, _| (x * 7 + y * 13) as u8).unwrap();
        let mut carver = Carver::new(raster).unwrap();
        carver.init(0.0).unwrap();
        carver
    }

    #[test]
    fn zero_factor_leaves_the_bias_alone() {
        let mut c = carver(4, 3);
        c.bias_add(&[1.0; 12], 0.0).unwrap();
        assert!(c.bias_map().is_none());
        c.bias_add_xy(4.0, 1, 1).unwrap();
        let before = c.bias_map();
        c.bias_add_area(&[9.0; 4], 0.0, 2, 2, 0, 0).unwrap();
        c.bias_add_rgb_area(&[200; 12], 0.0, 3, 2, 2, 0, 0).unwrap();
        assert_eq!(c.bias_map(), before);
    }

    #[test]
    fn areas_are_clipped_to_the_image() {
        let mut c = carver(4, 3);
        let buffer = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        c.bias_add_area(&buffer, 2.0, 3, 2, -1, 2).unwrap();
        let bias = c.bias_map().unwrap();
        // Only the first row of the buffer, minus its first value,
        // lands on the bottom row of the image.
        assert_eq!(&bias[8..12], &[2.0, 3.0, 0.0, 0.0]);
        assert!(bias[..8].iter().all(|&b| b == 0.0));
    }

    #[test]
    fn areas_entirely_outside_are_rejected() {
        let mut c = carver(4, 3);
        assert!(c.bias_add_area(&[1.0; 4], 1.0, 2, 2, 4, 0).is_err());
        assert!(c.bias_add_area(&[1.0; 4], 1.0, 2, 2, -2, 0).is_err());
        assert!(c.rigidity_mask_add_area(&[1.0; 4], 2, 2, 0, 3).is_err());
        assert!(c.bias_add_area(&[1.0; 3], 1.0, 2, 2, 0, 0).is_err());
        assert!(c.bias_map().is_none());
        assert!(c.rigidity_mask().is_none());
        // The carver is still usable.
        c.remove_seam().unwrap();
    }

    #[test]
    fn rgb_bias_uses_alpha() {
        assert_abs_diff_eq!(rgb_value(&[255, 0, 0]), 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb_value(&[255, 255, 255, 0]), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb_value(&[255, 51]), 0.2, epsilon = 1e-6);
        let mut c = carver(2, 1);
        c.bias_add_rgb(&[255, 255, 255, 255, 0, 0, 0, 255], 4.0, 4)
            .unwrap();
        assert_eq!(c.bias_map().unwrap(), vec![2.0, 0.0]);
    }

    #[test]
    fn rigidity_is_assigned_over_a_field_of_ones() {
        let mut c = carver(3, 2);
        c.rigidity_mask_add_xy(0.5, 2, 1).unwrap();
        c.rigidity_mask_add_xy(0.25, 2, 1).unwrap();
        assert_eq!(
            c.rigidity_mask().unwrap(),
            vec![1.0, 1.0, 1.0, 1.0, 1.0, 0.25]
        );
        c.rigidity_mask_clear().unwrap();
        assert!(c.rigidity_mask().is_none());
    }

    #[test]
    fn overlays_follow_a_transposed_carver() {
        let mut c = carver(4, 3);
        c.transpose().unwrap();
        c.bias_add_xy(10.0, 3, 0).unwrap();
        c.transpose().unwrap();
        let bias = c.bias_map().unwrap();
        assert_eq!(bias[3], 5.0);
        assert_eq!(bias.iter().filter(|&&b| b != 0.0).count(), 1);
    }

    #[test]
    fn writing_an_overlay_flattens() {
        let mut c = carver(5, 3);
        c.remove_seam().unwrap();
        assert_eq!(c.history().len(), 1);
        c.bias_add_xy(1.0, 0, 0).unwrap();
        assert!(c.history().is_empty());
        assert_eq!(c.bias_map().unwrap().len(), 12);
    }

    #[test]
    fn strong_bias_attracts_the_seam() {
        let mut c = carver(6, 4);
        c.bias_add_area(&[-1000.0; 4], 1.0, 1, 4, 4, 0).unwrap();
        let seam = c.remove_seam().unwrap();
        assert!(seam.coords().iter().all(|&x| x == 4));
    }
}
