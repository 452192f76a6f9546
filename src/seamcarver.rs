// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seamcarve - resizing to a target
//!
//! The resize entry points, with helpers for a single pass along one
//! axis and for the interleaved order.  Each pass orients the carver
//! for its axis, then removes or inserts one seam at a time, checking
//! for cancellation before every seam.  Growing past the recorded
//! history adds seams in batches of at most `enl_step` times the width,
//! so the new pixels spread over distinct seams.  A cancelled resize
//! leaves the raster at the last size it fully reached.

use crate::carver::Carver;
use crate::error::{CarveError, Outcome, Result};
use crate::orientation::Axis;
use crate::progress::Progress;
use crate::sample::Sample;
use log::debug;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which dimension is carved first.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResizeOrder {
    /// Width first, then height.
    Horizontal,
    /// Height first, then width.
    Vertical,
    /// One seam along each axis in turn while both still differ from
    /// the target, then whatever is left.
    Interleaved,
}

impl Default for ResizeOrder {
    fn default() -> Self {
        ResizeOrder::Horizontal
    }
}

impl FromStr for ResizeOrder {
    type Err = CarveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" | "width" => Ok(ResizeOrder::Horizontal),
            "vertical" | "height" => Ok(ResizeOrder::Vertical),
            "interleaved" | "both" => Ok(ResizeOrder::Interleaved),
            _ => Err(CarveError::Argument(format!("unknown resize order '{}'", s))),
        }
    }
}

/// A flag another thread may raise to stop a resize between seams.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// Seams between flips of the diagonal preference, or zero for never.
fn switch_interval(total: usize, frequency: usize) -> usize {
    cq!(
        frequency == 0 || total == 0,
        0,
        (total - 1) / frequency + 1
    )
}

impl<S: Sample> Carver<S> {
    /// Resize to `width x height`, removing or inserting seams as
    /// needed, in the carver's resize order.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<Outcome> {
        self.resize_with_progress(width, height, &mut Progress::default())
    }

    pub fn resize_with_progress(
        &mut self,
        width: usize,
        height: usize,
        progress: &mut Progress,
    ) -> Result<Outcome> {
        self.require_active()?;
        if width == 0 || height == 0 {
            return Err(CarveError::Argument(format!(
                "cannot resize to {}x{}",
                width, height
            )));
        }
        debug!(
            "resizing {}x{} to {}x{} ({:?})",
            self.width(),
            self.height(),
            width,
            height,
            self.resize_order
        );
        let outcome = match self.resize_order {
            ResizeOrder::Horizontal => self.resize_both(Axis::Width, width, height, progress),
            ResizeOrder::Vertical => self.resize_both(Axis::Height, width, height, progress),
            ResizeOrder::Interleaved => self.resize_interleaved(width, height, progress),
        };
        self.cancel.reset();
        outcome
    }

    pub fn resize_width(&mut self, width: usize, progress: &mut Progress) -> Result<Outcome> {
        self.resize_single(Axis::Width, width, progress)
    }

    pub fn resize_height(&mut self, height: usize, progress: &mut Progress) -> Result<Outcome> {
        self.resize_single(Axis::Height, height, progress)
    }

    fn resize_single(
        &mut self,
        axis: Axis,
        target: usize,
        progress: &mut Progress,
    ) -> Result<Outcome> {
        self.require_active()?;
        if target == 0 {
            return Err(CarveError::Argument(format!("cannot resize {} to 0", axis.name())));
        }
        let outcome = self.resize_axis(axis, target, progress);
        self.cancel.reset();
        outcome
    }

    fn resize_both(
        &mut self,
        first: Axis,
        width: usize,
        height: usize,
        progress: &mut Progress,
    ) -> Result<Outcome> {
        let second = first.turn();
        match self.resize_axis(first, first.pick(width, height), progress)? {
            Outcome::Completed => self.resize_axis(second, second.pick(width, height), progress),
            Outcome::Cancelled => Ok(Outcome::Cancelled),
        }
    }

    // Transpose if the carver is carving the other axis, and make the
    // current size the reference for bias scaling.
    fn orient(&mut self, axis: Axis) -> Result<()> {
        if self.orientation() != axis.orientation() {
            self.transpose_internal()?;
        }
        self.w_start = self.w;
        self.h_start = self.h;
        Ok(())
    }

    // Move toward `target` and return how many seams that took: one
    // removal or replayed insertion, or a batch of fresh insertions
    // once the history is used up.
    fn step(&mut self, axis: Axis, target: usize, remaining: usize) -> Result<usize> {
        if axis.pick(self.width(), self.height()) > target {
            self.remove_seam()?;
            return Ok(1);
        }
        let batch = remaining.min(self.enlargement_limit());
        if self.history().is_empty() && batch > 1 {
            self.enlarge(batch)?;
            return Ok(batch);
        }
        self.insert_seam()?;
        Ok(1)
    }

    fn resize_axis(
        &mut self,
        axis: Axis,
        target: usize,
        progress: &mut Progress,
    ) -> Result<Outcome> {
        let current = axis.pick(self.width(), self.height());
        if current == target {
            return Ok(Outcome::Completed);
        }
        self.orient(axis)?;
        let total = cq!(current > target, current - target, target - current);
        let update_every = progress.update_interval(total);
        let switch_every = switch_interval(total, self.side_switch_frequency);
        self.prefer_right = false;
        progress.begin(axis);
        let mut done = 0;
        while done < total {
            if self.cancel.is_cancelled() {
                debug!("{} pass cancelled after {} of {} seams", axis.name(), done, total);
                return Ok(Outcome::Cancelled);
            }
            if switch_every > 0 && (done + switch_every / 2) % switch_every == 0 {
                self.prefer_right = !self.prefer_right;
            }
            let before = done;
            done += self.step(axis, target, total - done)?;
            if done / update_every > before / update_every || done == total {
                progress.update(done as f64 / total as f64);
            }
        }
        progress.finish(axis);
        Ok(Outcome::Completed)
    }

    fn resize_interleaved(
        &mut self,
        width: usize,
        height: usize,
        progress: &mut Progress,
    ) -> Result<Outcome> {
        let distance = |have: usize, want: usize| cq!(have > want, have - want, want - have);
        let paired = distance(self.width(), width).min(distance(self.height(), height)) * 2;
        if paired > 0 {
            let update_every = progress.update_interval(paired);
            let mut axis = Axis::Width;
            progress.begin(axis);
            for done in 0..paired {
                if self.cancel.is_cancelled() {
                    debug!("interleaved pass cancelled after {} of {} seams", done, paired);
                    return Ok(Outcome::Cancelled);
                }
                self.orient(axis)?;
                self.step(axis, axis.pick(width, height), 1)?;
                if (done + 1) % update_every == 0 || done + 1 == paired {
                    progress.update((done + 1) as f64 / paired as f64);
                }
                axis = axis.turn();
            }
            progress.finish(Axis::Width);
        }
        self.resize_both(Axis::Width, width, height, progress)
    }
}
