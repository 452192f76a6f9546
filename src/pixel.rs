// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pixel interpretation
//!
//! Given the channels of one pixel, reduce them to the scalar the
//! energy functions want: brightness, luma, an RGBA quadruple, or a
//! single raw channel.  Several colour models are understood, from
//! plain grey to CMYK with alpha; anything else is `Custom`, where the
//! last channel is taken to be alpha.

use crate::error::{CarveError, Result};
use crate::sample::Sample;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageType {
    Grey,
    GreyA,
    Rgb,
    Rgba,
    Cmy,
    Cmyk,
    Cmyka,
    Custom,
}

impl ImageType {
    /// The image type a bare channel count implies.
    pub fn for_channels(channels: usize) -> Self {
        match channels {
            1 => ImageType::Grey,
            2 => ImageType::GreyA,
            3 => ImageType::Rgb,
            4 => ImageType::Rgba,
            5 => ImageType::Cmyka,
            _ => ImageType::Custom,
        }
    }

    fn is_subtractive(self) -> bool {
        match self {
            ImageType::Cmy | ImageType::Cmyk | ImageType::Cmyka => true,
            _ => false,
        }
    }
}

/// How the channels of a pixel are to be read.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    channels: usize,
    image_type: ImageType,
    alpha: Option<usize>,
    black: Option<usize>,
}

impl ChannelLayout {
    pub fn for_channels(channels: usize) -> Self {
        let image_type = ImageType::for_channels(channels);
        // A channel count always agrees with the type it implies.
        Self::with_image_type(channels, image_type).unwrap_or(ChannelLayout {
            channels,
            image_type: ImageType::Custom,
            alpha: channels.checked_sub(1),
            black: None,
        })
    }

    pub fn with_image_type(channels: usize, image_type: ImageType) -> Result<Self> {
        let (expected, alpha, black) = match image_type {
            ImageType::Grey => (Some(1), None, None),
            ImageType::GreyA => (Some(2), Some(1), None),
            ImageType::Rgb | ImageType::Cmy => (Some(3), None, None),
            ImageType::Rgba => (Some(4), Some(3), None),
            ImageType::Cmyk => (Some(4), None, Some(3)),
            ImageType::Cmyka => (Some(5), Some(4), Some(3)),
            ImageType::Custom => (None, channels.checked_sub(1), None),
        };
        if let Some(n) = expected {
            if n != channels {
                return Err(CarveError::Argument(format!(
                    "{:?} images have {} channels, not {}",
                    image_type, n, channels
                )));
            }
        }
        Ok(ChannelLayout {
            channels,
            image_type,
            alpha,
            black,
        })
    }

    /// Mark `channel` as alpha (or drop alpha with `None`); the layout
    /// becomes `Custom`.
    pub fn with_alpha(self, channel: Option<usize>) -> Result<Self> {
        self.check_channel(channel)?;
        Ok(ChannelLayout {
            alpha: channel,
            image_type: ImageType::Custom,
            ..self
        })
    }

    /// Mark `channel` as black (or drop it with `None`); the layout
    /// becomes `Custom`.
    pub fn with_black(self, channel: Option<usize>) -> Result<Self> {
        self.check_channel(channel)?;
        Ok(ChannelLayout {
            black: channel,
            image_type: ImageType::Custom,
            ..self
        })
    }

    fn check_channel(&self, channel: Option<usize>) -> Result<()> {
        match channel {
            Some(c) if c >= self.channels => Err(CarveError::Argument(format!(
                "channel {} out of range for a {}-channel image",
                c, self.channels
            ))),
            _ => Ok(()),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn alpha_channel(&self) -> Option<usize> {
        self.alpha
    }

    pub fn black_channel(&self) -> Option<usize> {
        self.black
    }

    #[inline]
    fn alpha_of<S: Sample>(&self, px: &[S]) -> f64 {
        self.alpha.map_or(1.0, |a| px[a].to_unit())
    }

    // Mean of the colour channels, ignoring alpha and black, before
    // any inversion or weighting.
    fn colour_mean<S: Sample>(&self, px: &[S]) -> f64 {
        let (sum, n) = px
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != self.alpha && Some(*i) != self.black)
            .fold((0.0, 0usize), |(s, n), (_, v)| (s + v.to_unit(), n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    /// Perceived brightness in `[0, 1]`, premultiplied by alpha.
    pub fn brightness<S: Sample>(&self, px: &[S]) -> f64 {
        let mut b = self.colour_mean(px);
        if self.image_type.is_subtractive() {
            b = 1.0 - b;
        }
        if let Some(k) = self.black {
            b *= 1.0 - px[k].to_unit();
        }
        b * self.alpha_of(px)
    }

    // Additive RGB for the colour models that have one.
    fn rgb<S: Sample>(&self, px: &[S]) -> Option<[f64; 3]> {
        match self.image_type {
            ImageType::Grey | ImageType::GreyA => {
                let v = px[0].to_unit();
                Some([v, v, v])
            }
            ImageType::Rgb | ImageType::Rgba => {
                Some([px[0].to_unit(), px[1].to_unit(), px[2].to_unit()])
            }
            ImageType::Cmy | ImageType::Cmyk | ImageType::Cmyka => {
                let k = self.black.map_or(0.0, |k| px[k].to_unit());
                Some([
                    (1.0 - px[0].to_unit()) * (1.0 - k),
                    (1.0 - px[1].to_unit()) * (1.0 - k),
                    (1.0 - px[2].to_unit()) * (1.0 - k),
                ])
            }
            ImageType::Custom => None,
        }
    }

    /// Rec. 709 luma in `[0, 1]`, premultiplied by alpha.  Custom
    /// layouts have no defined primaries and fall back to brightness.
    pub fn luma<S: Sample>(&self, px: &[S]) -> f64 {
        match self.rgb(px) {
            Some([r, g, b]) => (0.2126 * r + 0.7152 * g + 0.0722 * b) * self.alpha_of(px),
            None => self.brightness(px),
        }
    }

    /// Fill `out[0..4]` with red, green, blue and alpha.
    pub fn rgba<S: Sample>(&self, px: &[S], out: &mut [f64]) {
        let alpha = self.alpha_of(px);
        match self.rgb(px) {
            Some(rgb) => out[..3].copy_from_slice(&rgb),
            None => {
                let b = self.brightness(px) / cq!(alpha > 0.0, alpha, 1.0);
                out[..3].copy_from_slice(&[b, b, b]);
            }
        }
        out[3] = alpha;
    }
}
