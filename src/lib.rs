// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

// #![deny(missing_docs)]

//! Liquid rescaling: content-aware resizing by seam carving.
//!
//! A [`Carver`] takes ownership of a [`Raster`], scores every pixel
//! with an energy function, and repeatedly removes (or duplicates) the
//! cheapest connected path of pixels across the image until it reaches
//! the requested size.  Bias and rigidity overlays steer the seams;
//! the history of removals makes every intermediate size reachable
//! again without recomputation.

#[macro_use]
mod macros;

pub mod bias;
pub mod carver;
pub mod carverlist;
pub mod dump;
pub mod energy;
pub mod error;
pub mod grid;
pub mod imageio;
pub mod orientation;
pub mod pixel;
pub mod progress;
pub mod raster;
pub mod rwindow;
pub mod sample;
pub mod seamcarver;
pub mod seamfinder;
pub mod vmap;

pub use carver::Carver;
pub use carverlist::CarverList;
pub use dump::{energy_to_image, vmap_to_image};
pub use energy::{BuiltinEnergy, EnergyFunction};
pub use error::{CarveError, ErrorKind, Outcome, Result};
pub use imageio::AnyRaster;
pub use orientation::{Axis, Orientation};
pub use pixel::{ChannelLayout, ImageType};
pub use progress::Progress;
pub use raster::Raster;
pub use rwindow::{ReaderType, ReadingWindow};
pub use sample::{ColorDepth, Sample};
pub use seamcarver::{CancelHandle, ResizeOrder};
pub use seamfinder::Seam;
pub use vmap::{VMap, VMapList};
