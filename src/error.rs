// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors and outcomes
//!
//! Every carver operation reports through `CarveError`.  Cancelling a
//! resize is not an error: it comes back as `Outcome::Cancelled`, and
//! the raster is left at the last size that was fully carved.

use failure::Fail;

/// The three families of failure a caller has to tell apart.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inactive carver, nothing left to carve, inconsistent state.
    State,
    /// An array or window could not be allocated.
    Allocation,
    /// Bad area, radius, channel index or buffer size.
    Argument,
}

#[derive(Debug, Fail)]
pub enum CarveError {
    #[fail(display = "the carver is not active")]
    Inactive,

    #[fail(display = "invalid carver state: {}", _0)]
    State(String),

    #[fail(display = "no {} left to carve", axis)]
    Exhausted { axis: &'static str },

    #[fail(display = "out of memory allocating {} elements", elements)]
    OutOfMemory { elements: usize },

    #[fail(display = "invalid argument: {}", _0)]
    Argument(String),

    #[fail(display = "image conversion failed: {}", _0)]
    Image(String),
}

impl CarveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CarveError::Inactive | CarveError::State(_) | CarveError::Exhausted { .. } => {
                ErrorKind::State
            }
            CarveError::OutOfMemory { .. } => ErrorKind::Allocation,
            CarveError::Argument(_) | CarveError::Image(_) => ErrorKind::Argument,
        }
    }

    /// State and allocation errors abort a multi-seam resize; argument
    /// errors on overlays leave the carver untouched and usable.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Argument
    }
}

pub type Result<T> = std::result::Result<T, CarveError>;

/// How a resize ended when it did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Cancelled,
}

/// Allocate a vector of `len` copies of `fill`, reporting failure
/// instead of aborting the process.
pub(crate) fn try_vec<P: Clone>(len: usize, fill: P) -> Result<Vec<P>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| CarveError::OutOfMemory { elements: len })?;
    data.resize(len, fill);
    Ok(data)
}

/// `a * b * c` for buffer sizes, with overflow treated as exhaustion.
pub(crate) fn checked_area(a: usize, b: usize, c: usize) -> Result<usize> {
    a.checked_mul(b)
        .and_then(|ab| ab.checked_mul(c))
        .ok_or(CarveError::OutOfMemory {
            elements: usize::max_value(),
        })
}
