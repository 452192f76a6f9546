// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Progress reporting
//!
//! A plain value handed to a resize.  Missing callbacks are simply not
//! called; the pass messages are also logged at `info`.

use crate::orientation::Axis;
use log::info;
use std::fmt;

pub type InitFn = Box<dyn FnMut(&str) + Send>;
pub type UpdateFn = Box<dyn FnMut(f64) + Send>;

pub struct Progress {
    init_width_message: String,
    end_width_message: String,
    init_height_message: String,
    end_height_message: String,
    update_step: f64,
    init: Option<InitFn>,
    update: Option<UpdateFn>,
    end: Option<InitFn>,
}

impl Default for Progress {
    fn default() -> Self {
        Progress {
            init_width_message: "Resizing width...".to_string(),
            end_width_message: "done".to_string(),
            init_height_message: "Resizing height...".to_string(),
            end_height_message: "done".to_string(),
            update_step: 0.02,
            init: None,
            update: None,
            end: None,
        }
    }
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width_messages(mut self, init: &str, end: &str) -> Self {
        self.init_width_message = init.to_string();
        self.end_width_message = end.to_string();
        self
    }

    pub fn height_messages(mut self, init: &str, end: &str) -> Self {
        self.init_height_message = init.to_string();
        self.end_height_message = end.to_string();
        self
    }

    /// The fraction of a pass between two `update` calls.
    pub fn update_step(mut self, step: f64) -> Self {
        self.update_step = step.max(0.0);
        self
    }

    pub fn on_init<F: FnMut(&str) + Send + 'static>(mut self, f: F) -> Self {
        self.init = Some(Box::new(f));
        self
    }

    pub fn on_update<F: FnMut(f64) + Send + 'static>(mut self, f: F) -> Self {
        self.update = Some(Box::new(f));
        self
    }

    pub fn on_end<F: FnMut(&str) + Send + 'static>(mut self, f: F) -> Self {
        self.end = Some(Box::new(f));
        self
    }

    /// Seams between two updates in a pass of `total` seams.
    pub fn update_interval(&self, total: usize) -> usize {
        ((total as f64 * self.update_step) as usize).max(1)
    }

    pub(crate) fn begin(&mut self, axis: Axis) {
        let message = match axis {
            Axis::Width => &self.init_width_message,
            Axis::Height => &self.init_height_message,
        };
        info!("{}", message);
        if let Some(f) = self.init.as_mut() {
            f(message);
        }
    }

    pub(crate) fn update(&mut self, fraction: f64) {
        if let Some(f) = self.update.as_mut() {
            f(fraction);
        }
    }

    pub(crate) fn finish(&mut self, axis: Axis) {
        let message = match axis {
            Axis::Width => &self.end_width_message,
            Axis::Height => &self.end_height_message,
        };
        info!("{}", message);
        if let Some(f) = self.end.as_mut() {
            f(message);
        }
    }
}

impl fmt::Debug for Progress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Progress")
            .field("init_width_message", &self.init_width_message)
            .field("end_width_message", &self.end_width_message)
            .field("init_height_message", &self.init_height_message)
            .field("end_height_message", &self.end_height_message)
            .field("update_step", &self.update_step)
            .field("init", &self.init.is_some())
            .field("update", &self.update.is_some())
            .field("end", &self.end.is_some())
            .finish()
    }
}
