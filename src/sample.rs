// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sample types
//!
//! A raster holds 8- or 16-bit integer samples, or 32- or 64-bit
//! floats.  Colour math always happens on values normalised to
//! `[0, 1]`, so the energy functions never see the storage depth.

use num_traits::{NumCast, ToPrimitive};
use std::fmt::Debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ColorDepth {
    U8,
    U16,
    F32,
    F64,
}

/// A single channel value of a pixel.
pub trait Sample: Copy + Default + PartialOrd + NumCast + Send + Sync + Debug + 'static {
    const DEPTH: ColorDepth;

    /// The value that represents full intensity.
    fn max_intensity() -> f64;

    /// Convert from `[0, 1]` back to storage, rounding integer depths.
    fn from_unit(v: f64) -> Self;

    /// The mean of two samples, as used when a seam is re-inserted.
    fn midpoint(a: Self, b: Self) -> Self;

    #[inline]
    fn to_unit(self) -> f64 {
        ToPrimitive::to_f64(&self).unwrap_or(0.0) / Self::max_intensity()
    }
}

macro_rules! integer_sample {
    ($t: ty, $depth: expr) => {
        impl Sample for $t {
            const DEPTH: ColorDepth = $depth;

            #[inline]
            fn max_intensity() -> f64 {
                <f64 as From<$t>>::from(<$t>::max_value())
            }

            fn from_unit(v: f64) -> Self {
                let v = v.max(0.0).min(1.0) * Self::max_intensity();
                <$t as NumCast>::from(v + 0.5).unwrap_or_default()
            }

            fn midpoint(a: Self, b: Self) -> Self {
                let m = (<f64 as From<$t>>::from(a) + <f64 as From<$t>>::from(b)) / 2.0;
                <$t as NumCast>::from(m + 0.5).unwrap_or_default()
            }
        }
    };
}

macro_rules! float_sample {
    ($t: ty, $depth: expr) => {
        impl Sample for $t {
            const DEPTH: ColorDepth = $depth;

            #[inline]
            fn max_intensity() -> f64 {
                1.0
            }

            fn from_unit(v: f64) -> Self {
                v as $t
            }

            fn midpoint(a: Self, b: Self) -> Self {
                (a + b) / 2.0
            }
        }
    };
}

integer_sample!(u8, ColorDepth::U8);
integer_sample!(u16, ColorDepth::U16);
float_sample!(f32, ColorDepth::F32);
float_sample!(f64, ColorDepth::F64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_samples_normalise_to_unit_range() {
        assert_eq!(255u8.to_unit(), 1.0);
        assert_eq!(0u16.to_unit(), 0.0);
        assert_eq!(u8::from_unit(1.0), 255);
        assert_eq!(u8::from_unit(2.0), 255);
        assert_eq!(u16::from_unit(0.5), 32768);
    }

    #[test]
    fn midpoints_round_half_up_for_integers() {
        assert_eq!(<u8 as Sample>::midpoint(10, 11), 11);
        assert_eq!(<u8 as Sample>::midpoint(10, 12), 11);
        assert_eq!(<u8 as Sample>::midpoint(255, 255), 255);
        assert_eq!(<u16 as Sample>::midpoint(0, 65535), 32768);
        assert_eq!(<f32 as Sample>::midpoint(0.25, 0.75), 0.5);
    }
}
