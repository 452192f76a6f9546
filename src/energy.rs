// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calculate the energy of an image
//!
//! An energy function turns a filled reading window into a single
//! non-negative importance score.  The built-in functions are all
//! central-difference gradients over brightness or luma, read through a
//! radius-one window, so border pixels see their own value replicated
//! outward.  Callers may register their own function with its own
//! radius and reader.

use crate::error::{CarveError, Result};
use crate::grid::Grid;
use crate::rwindow::{ReaderType, ReadingWindow, WindowSource};
use crate::sample::Sample;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BuiltinEnergy {
    /// Euclidean norm of the brightness gradient.
    GradNorm,
    /// Mean of the absolute brightness gradient components.
    GradSumAbs,
    /// Absolute horizontal brightness gradient.
    GradXAbs,
    LumaGradNorm,
    LumaGradSumAbs,
    LumaGradXAbs,
    /// Zero everywhere; seams follow the bias alone.
    Null,
}

impl BuiltinEnergy {
    pub const ALL: [BuiltinEnergy; 7] = [
        BuiltinEnergy::GradNorm,
        BuiltinEnergy::GradSumAbs,
        BuiltinEnergy::GradXAbs,
        BuiltinEnergy::LumaGradNorm,
        BuiltinEnergy::LumaGradSumAbs,
        BuiltinEnergy::LumaGradXAbs,
        BuiltinEnergy::Null,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinEnergy::GradNorm => "grad-norm",
            BuiltinEnergy::GradSumAbs => "grad-sumabs",
            BuiltinEnergy::GradXAbs => "grad-xabs",
            BuiltinEnergy::LumaGradNorm => "luma-grad-norm",
            BuiltinEnergy::LumaGradSumAbs => "luma-grad-sumabs",
            BuiltinEnergy::LumaGradXAbs => "luma-grad-xabs",
            BuiltinEnergy::Null => "null",
        }
    }

    pub fn reader_type(self) -> ReaderType {
        match self {
            BuiltinEnergy::LumaGradNorm
            | BuiltinEnergy::LumaGradSumAbs
            | BuiltinEnergy::LumaGradXAbs => ReaderType::Luma,
            _ => ReaderType::Brightness,
        }
    }

    pub fn radius(self) -> usize {
        1
    }

    pub fn evaluate(self, window: &ReadingWindow) -> f32 {
        let read = |dx, dy| match self.reader_type() {
            ReaderType::Luma => window.read_luma(dx, dy),
            _ => window.read_bright(dx, dy),
        };
        let gx = || (read(1, 0) - read(-1, 0)) / 2.0;
        let gy = || (read(0, 1) - read(0, -1)) / 2.0;
        let e = match self {
            BuiltinEnergy::GradNorm | BuiltinEnergy::LumaGradNorm => {
                let (gx, gy) = (gx(), gy());
                (gx * gx + gy * gy).sqrt()
            }
            BuiltinEnergy::GradSumAbs | BuiltinEnergy::LumaGradSumAbs => {
                (gx().abs() + gy().abs()) / 2.0
            }
            BuiltinEnergy::GradXAbs | BuiltinEnergy::LumaGradXAbs => gx().abs(),
            BuiltinEnergy::Null => 0.0,
        };
        e as f32
    }
}

impl FromStr for BuiltinEnergy {
    type Err = CarveError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_ascii_lowercase().replace('_', "-");
        BuiltinEnergy::ALL
            .iter()
            .cloned()
            .find(|e| e.name() == wanted)
            .ok_or_else(|| CarveError::Argument(format!("unknown energy function '{}'", s)))
    }
}

impl fmt::Display for BuiltinEnergy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Signature of a caller-supplied energy function: storage `x` and
/// `y`, live width and height, and the window filled around `(x, y)`.
/// Anything else the function needs it captures.
pub type EnergyFn = dyn Fn(usize, usize, usize, usize, &ReadingWindow) -> f32 + Send + Sync;

#[derive(Clone)]
pub struct CustomEnergy {
    func: Arc<EnergyFn>,
    radius: usize,
    reader: ReaderType,
}

#[derive(Clone)]
pub enum EnergyFunction {
    Builtin(BuiltinEnergy),
    Custom(CustomEnergy),
}

impl EnergyFunction {
    pub fn custom<F>(radius: usize, reader: ReaderType, func: F) -> Result<Self>
    where
        F: Fn(usize, usize, usize, usize, &ReadingWindow) -> f32 + Send + Sync + 'static,
    {
        if radius == 0 {
            return Err(CarveError::Argument(
                "energy radius must be at least 1".to_string(),
            ));
        }
        Ok(EnergyFunction::Custom(CustomEnergy {
            func: Arc::new(func),
            radius,
            reader,
        }))
    }

    pub fn radius(&self) -> usize {
        match self {
            EnergyFunction::Builtin(b) => b.radius(),
            EnergyFunction::Custom(c) => c.radius,
        }
    }

    pub fn reader_type(&self) -> ReaderType {
        match self {
            EnergyFunction::Builtin(b) => b.reader_type(),
            EnergyFunction::Custom(c) => c.reader,
        }
    }

    /// A window shaped for this function on a `channels`-channel image.
    pub fn window(&self, channels: usize) -> Result<ReadingWindow> {
        ReadingWindow::for_reader(self.radius(), self.reader_type(), channels)
    }

    #[inline]
    pub fn evaluate(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        window: &ReadingWindow,
    ) -> f32 {
        match self {
            EnergyFunction::Builtin(b) => b.evaluate(window),
            EnergyFunction::Custom(c) => (c.func)(x, y, width, height, window),
        }
    }
}

impl Default for EnergyFunction {
    fn default() -> Self {
        EnergyFunction::Builtin(BuiltinEnergy::GradXAbs)
    }
}

impl From<BuiltinEnergy> for EnergyFunction {
    fn from(b: BuiltinEnergy) -> Self {
        EnergyFunction::Builtin(b)
    }
}

impl fmt::Debug for EnergyFunction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EnergyFunction::Builtin(b) => write!(f, "Builtin({})", b),
            EnergyFunction::Custom(c) => f
                .debug_struct("Custom")
                .field("radius", &c.radius)
                .field("reader", &c.reader)
                .finish(),
        }
    }
}

// One row of the energy map.  `row` is the slice of the map starting
// at column zero of storage row `y`.
#[inline]
fn energy_row<S: Sample>(
    src: &WindowSource<S>,
    func: &EnergyFunction,
    window: &mut ReadingWindow,
    y: usize,
    columns: std::ops::Range<usize>,
    row: &mut [f32],
) {
    for x in columns {
        window.fill_from(src, x, y);
        row[x] = func.evaluate(x, y, src.width, src.height, window);
    }
}

/// Compute the energy of every live pixel.
#[cfg(not(feature = "threaded"))]
pub(crate) fn fill_energy_map<S: Sample>(
    src: &WindowSource<S>,
    func: &EnergyFunction,
    window: &mut ReadingWindow,
    energy: &mut Grid<f32>,
) -> Result<()> {
    let stride = energy.width();
    for (y, row) in energy
        .as_mut_slice()
        .chunks_mut(stride)
        .take(src.height)
        .enumerate()
    {
        energy_row(src, func, window, y, 0..src.width, row);
    }
    Ok(())
}

/// Compute the energy of every live pixel, one band of rows per core.
#[cfg(feature = "threaded")]
pub(crate) fn fill_energy_map<S: Sample>(
    src: &WindowSource<S>,
    func: &EnergyFunction,
    window: &mut ReadingWindow,
    energy: &mut Grid<f32>,
) -> Result<()> {
    let stride = energy.width();
    let bands = num_cpus::get().max(1);
    let rows_per_band = (src.height + bands - 1) / bands;
    let live = &mut energy.as_mut_slice()[..stride * src.height];
    crossbeam::scope(|scope| {
        for (band, chunk) in live.chunks_mut(stride * rows_per_band).enumerate() {
            let mut window = window.clone();
            scope.spawn(move |_| {
                for (i, row) in chunk.chunks_mut(stride).enumerate() {
                    let y = band * rows_per_band + i;
                    energy_row(src, func, &mut window, y, 0..src.width, row);
                }
            });
        }
    })
    .map_err(|_| CarveError::State("an energy worker panicked".to_string()))
}

/// Recompute only the energies a removed seam can have changed.  A
/// pixel's window moved if any pixel within `radius` of it, in the
/// same line or the lines `radius` above and below, shifted.
pub(crate) fn update_energy_band<S: Sample>(
    src: &WindowSource<S>,
    func: &EnergyFunction,
    window: &mut ReadingWindow,
    energy: &mut Grid<f32>,
    seam: &[usize],
) {
    let r = func.radius();
    let (width, height) = (src.width, src.height);
    let stride = energy.width();
    for y in 0..height {
        let lines = y.saturating_sub(r)..(y + r + 1).min(seam.len());
        let (lo, hi) = seam[lines]
            .iter()
            .fold((usize::max_value(), 0), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        let start = lo.saturating_sub(r + 1);
        let end = (hi + r + 1).min(width);
        if start >= end {
            continue;
        }
        let row = &mut energy.as_mut_slice()[y * stride..(y + 1) * stride];
        energy_row(src, func, window, y, start..end, row);
    }
}
