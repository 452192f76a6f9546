// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Moving rasters in and out of the `image` crate.

use crate::error::{CarveError, Result};
use crate::raster::Raster;
use crate::sample::Sample;
use image::{DynamicImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};
use std::convert::TryFrom;

/// A raster of whichever depth the decoded image had.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyRaster {
    U8(Raster<u8>),
    U16(Raster<u16>),
    F32(Raster<f32>),
}

fn raster<S: Sample>(width: u32, height: u32, channels: usize, data: Vec<S>) -> Result<Raster<S>> {
    Raster::new(width as usize, height as usize, channels, data)
}

impl AnyRaster {
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        let (w, h) = (image.width(), image.height());
        Ok(match image {
            DynamicImage::ImageLuma8(b) => AnyRaster::U8(raster(w, h, 1, b.into_raw())?),
            DynamicImage::ImageLumaA8(b) => AnyRaster::U8(raster(w, h, 2, b.into_raw())?),
            DynamicImage::ImageRgb8(b) => AnyRaster::U8(raster(w, h, 3, b.into_raw())?),
            DynamicImage::ImageRgba8(b) => AnyRaster::U8(raster(w, h, 4, b.into_raw())?),
            DynamicImage::ImageLuma16(b) => AnyRaster::U16(raster(w, h, 1, b.into_raw())?),
            DynamicImage::ImageLumaA16(b) => AnyRaster::U16(raster(w, h, 2, b.into_raw())?),
            DynamicImage::ImageRgb16(b) => AnyRaster::U16(raster(w, h, 3, b.into_raw())?),
            DynamicImage::ImageRgba16(b) => AnyRaster::U16(raster(w, h, 4, b.into_raw())?),
            DynamicImage::ImageRgb32F(b) => AnyRaster::F32(raster(w, h, 3, b.into_raw())?),
            DynamicImage::ImageRgba32F(b) => AnyRaster::F32(raster(w, h, 4, b.into_raw())?),
            other => AnyRaster::U8(raster(w, h, 4, other.to_rgba8().into_raw())?),
        })
    }

    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            AnyRaster::U8(r) => r.dimensions(),
            AnyRaster::U16(r) => r.dimensions(),
            AnyRaster::F32(r) => r.dimensions(),
        }
    }

    pub fn into_dynamic(self) -> Result<DynamicImage> {
        let mismatch = || CarveError::Image("buffer does not match its dimensions".to_string());
        let size = |r: (usize, usize)| -> Result<(u32, u32)> {
            let fit = |v: usize| {
                u32::try_from(v).map_err(|_| CarveError::Image(format!("{} is too large", v)))
            };
            Ok((fit(r.0)?, fit(r.1)?))
        };
        macro_rules! wrap {
            ($pixel: ident, $variant: ident, $w: expr, $h: expr, $data: expr) => {
                ImageBuffer::<$pixel<_>, _>::from_raw($w, $h, $data)
                    .map(DynamicImage::$variant)
                    .ok_or_else(mismatch)
            };
        }
        match self {
            AnyRaster::U8(r) => {
                let ((w, h), channels) = (size(r.dimensions())?, r.channels());
                let data = r.into_vec();
                match channels {
                    1 => wrap!(Luma, ImageLuma8, w, h, data),
                    2 => wrap!(LumaA, ImageLumaA8, w, h, data),
                    3 => wrap!(Rgb, ImageRgb8, w, h, data),
                    4 => wrap!(Rgba, ImageRgba8, w, h, data),
                    n => Err(unsupported(n)),
                }
            }
            AnyRaster::U16(r) => {
                let ((w, h), channels) = (size(r.dimensions())?, r.channels());
                let data = r.into_vec();
                match channels {
                    1 => wrap!(Luma, ImageLuma16, w, h, data),
                    2 => wrap!(LumaA, ImageLumaA16, w, h, data),
                    3 => wrap!(Rgb, ImageRgb16, w, h, data),
                    4 => wrap!(Rgba, ImageRgba16, w, h, data),
                    n => Err(unsupported(n)),
                }
            }
            AnyRaster::F32(r) => {
                let ((w, h), channels) = (size(r.dimensions())?, r.channels());
                let data = r.into_vec();
                match channels {
                    3 => wrap!(Rgb, ImageRgb32F, w, h, data),
                    4 => wrap!(Rgba, ImageRgba32F, w, h, data),
                    n => Err(unsupported(n)),
                }
            }
        }
    }
}

fn unsupported(channels: usize) -> CarveError {
    CarveError::Image(format!("no image format holds {} channels", channels))
}
