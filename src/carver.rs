// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The carver
//!
//! A `Carver` owns one raster and everything needed to carve it: the
//! energy map, the optional bias and rigidity overlays, the resample
//! cache, and the history of removed seams.  All of these share one
//! storage layout.  Seams always run top to bottom through storage;
//! to carve rows instead of columns, every grid is transposed and the
//! orientation flag flipped.  Callers never see storage coordinates:
//! the public accessors translate through `Orientation::map`.
//!
//! In storage terms `w` is the live length of every line and `w0` the
//! allocated one.  Every recorded removal accounts for exactly one
//! column of the gap between them, so `w0 - w == history.len()`.
//! Flattening drops the history and shrinks the allocation to fit.

use crate::carverlist::CarverList;
use crate::energy::{fill_energy_map, update_energy_band, EnergyFunction};
use crate::error::{CarveError, Result};
use crate::grid::{CostAndParent, Grid};
use crate::orientation::Orientation;
use crate::pixel::{ChannelLayout, ImageType};
use crate::raster::Raster;
use crate::rwindow::{build_cache, ReadingWindow, WindowSource};
use crate::sample::Sample;
use crate::seamcarver::{CancelHandle, ResizeOrder};
use crate::seamfinder::{Seam, SeamSearch};
use crate::vmap::{VMap, VMapList};
use itertools::iproduct;
use log::{debug, trace};

#[derive(Debug)]
pub struct Carver<S: Sample> {
    pixels: Grid<S>,
    layout: ChannelLayout,
    pub(crate) w: usize,
    pub(crate) h: usize,
    w0: usize,
    h0: usize,
    pub(crate) w_start: usize,
    pub(crate) h_start: usize,
    orientation: Orientation,
    active: bool,
    rigidity: f32,
    enl_step: f32,
    energy_fn: EnergyFunction,
    window: ReadingWindow,
    energy: Option<Grid<f32>>,
    energy_valid_for: Option<Orientation>,
    pub(crate) bias: Option<Grid<f32>>,
    pub(crate) rigidity_mask: Option<Grid<f32>>,
    rcache: Option<Grid<f64>>,
    use_cache: bool,
    costs: Vec<CostAndParent>,
    history: Vec<VMap<S>>,
    redo: Vec<VMap<S>>,
    dump_vmaps: bool,
    flushed: VMapList<S>,
    attached: CarverList<S>,
    pub(crate) prefer_right: bool,
    pub(crate) side_switch_frequency: usize,
    pub(crate) resize_order: ResizeOrder,
    pub(crate) cancel: CancelHandle,
}

impl<S: Sample> Carver<S> {
    /// Take ownership of a raster.  The carver starts inactive, with
    /// the `GradXAbs` energy function.
    pub fn new(raster: Raster<S>) -> Result<Self> {
        let (width, height, channels) = (raster.width(), raster.height(), raster.channels());
        let pixels = Grid::from_vec(width, height, channels, raster.into_vec())?;
        let energy_fn = EnergyFunction::default();
        let window = energy_fn.window(channels)?;
        Ok(Carver {
            pixels,
            layout: ChannelLayout::for_channels(channels),
            w: width,
            h: height,
            w0: width,
            h0: height,
            w_start: width,
            h_start: height,
            orientation: Orientation::Normal,
            active: false,
            rigidity: 0.0,
            enl_step: 2.0,
            energy_fn,
            window,
            energy: None,
            energy_valid_for: None,
            bias: None,
            rigidity_mask: None,
            rcache: None,
            use_cache: true,
            costs: Vec::new(),
            history: Vec::new(),
            redo: Vec::new(),
            dump_vmaps: false,
            flushed: VMapList::default(),
            attached: CarverList::default(),
            prefer_right: false,
            side_switch_frequency: 0,
            resize_order: ResizeOrder::default(),
            cancel: CancelHandle::default(),
        })
    }

    /// Activate the carver: allocate its energy map and fix the
    /// rigidity coefficient.
    pub fn init(&mut self, rigidity: f32) -> Result<()> {
        if self.active {
            return Err(CarveError::State("the carver is already active".to_string()));
        }
        if !rigidity.is_finite() || rigidity < 0.0 {
            return Err(CarveError::Argument(format!(
                "rigidity must be a non-negative number, not {}",
                rigidity
            )));
        }
        self.energy = Some(Grid::new(self.pixels.width(), self.pixels.height(), 1, 0.0)?);
        self.energy_valid_for = None;
        self.rigidity = rigidity;
        self.w_start = self.w;
        self.h_start = self.h;
        self.active = true;
        debug!(
            "carver activated at {}x{}, rigidity {}",
            self.width(),
            self.height(),
            rigidity
        );
        Ok(())
    }

    /// Deactivate the carver, keeping the raster at its current size
    /// and dropping every map and the history.
    pub fn release(&mut self) -> Result<()> {
        self.flatten_internal()?;
        self.active = false;
        self.energy = None;
        self.energy_valid_for = None;
        self.bias = None;
        self.rigidity_mask = None;
        self.rcache = None;
        self.costs = Vec::new();
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn require_active(&self) -> Result<()> {
        cq!(self.active, Ok(()), Err(CarveError::Inactive))
    }

    /// Current image width.
    pub fn width(&self) -> usize {
        self.orientation.map(self.w, self.h).0
    }

    /// Current image height.
    pub fn height(&self) -> usize {
        self.orientation.map(self.w, self.h).1
    }

    /// The width of the raster the history can restore.
    pub fn ref_width(&self) -> usize {
        self.orientation.map(self.w0, self.h0).0
    }

    pub fn ref_height(&self) -> usize {
        self.orientation.map(self.w0, self.h0).1
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn image_type(&self) -> ImageType {
        self.layout.image_type()
    }

    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn rigidity(&self) -> f32 {
        self.rigidity
    }

    pub fn energy_function(&self) -> &EnergyFunction {
        &self.energy_fn
    }

    pub fn set_energy_function<E: Into<EnergyFunction>>(&mut self, energy_fn: E) -> Result<()> {
        let energy_fn = energy_fn.into();
        self.window = energy_fn.window(self.channels())?;
        self.energy_fn = energy_fn;
        self.invalidate_energy();
        self.rcache = None;
        Ok(())
    }

    pub fn set_image_type(&mut self, image_type: ImageType) -> Result<()> {
        self.layout = ChannelLayout::with_image_type(self.channels(), image_type)?;
        self.invalidate_energy();
        self.rcache = None;
        Ok(())
    }

    pub fn set_alpha_channel(&mut self, channel: Option<usize>) -> Result<()> {
        self.layout = self.layout.with_alpha(channel)?;
        self.invalidate_energy();
        self.rcache = None;
        Ok(())
    }

    pub fn set_black_channel(&mut self, channel: Option<usize>) -> Result<()> {
        self.layout = self.layout.with_black(channel)?;
        self.invalidate_energy();
        self.rcache = None;
        Ok(())
    }

    /// Convert each pixel for the energy function once, instead of on
    /// every read.  On by default.
    pub fn set_use_cache(&mut self, use_cache: bool) {
        self.use_cache = use_cache;
        if !use_cache {
            self.rcache = None;
        }
    }

    pub fn set_side_switch_frequency(&mut self, frequency: usize) {
        self.side_switch_frequency = frequency;
    }

    /// Cap each enlargement at `step` times the width it starts from.
    /// Must lie in `(1, 2]`; the default is 2.
    pub fn set_enl_step(&mut self, step: f32) -> Result<()> {
        if !(step > 1.0 && step <= 2.0) {
            return Err(CarveError::Argument(format!(
                "the enlargement step must lie in (1, 2], not {}",
                step
            )));
        }
        self.enl_step = step;
        Ok(())
    }

    pub fn enl_step(&self) -> f32 {
        self.enl_step
    }

    pub fn set_resize_order(&mut self, order: ResizeOrder) {
        self.resize_order = order;
    }

    /// Keep a snapshot of every removal in `vmap_list()`.
    pub fn set_dump_vmaps(&mut self, dump: bool) {
        self.dump_vmaps = dump;
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn history(&self) -> &[VMap<S>] {
        &self.history
    }

    pub fn vmap_list(&self) -> &VMapList<S> {
        &self.flushed
    }

    pub fn vmap_list_mut(&mut self) -> &mut VMapList<S> {
        &mut self.flushed
    }

    pub fn attached(&self) -> &CarverList<S> {
        &self.attached
    }

    pub fn attached_mut(&mut self) -> &mut CarverList<S> {
        &mut self.attached
    }

    pub(crate) fn window_source(&self) -> WindowSource<S> {
        WindowSource {
            pixels: &self.pixels,
            layout: &self.layout,
            cache: self.rcache.as_ref(),
            width: self.w,
            height: self.h,
        }
    }

    fn invalidate_energy(&mut self) {
        self.energy_valid_for = None;
    }

    fn ensure_cache(&mut self) -> Result<()> {
        if self.use_cache && self.rcache.is_none() {
            self.rcache = Some(build_cache(
                &self.pixels,
                &self.layout,
                self.energy_fn.reader_type(),
                self.w,
                self.h,
            )?);
        }
        Ok(())
    }

    fn ensure_energy(&mut self) -> Result<()> {
        if self.energy_valid_for == Some(self.orientation) {
            return Ok(());
        }
        self.ensure_cache()?;
        let (gw, gh) = (self.pixels.width(), self.pixels.height());
        if self
            .energy
            .as_ref()
            .map_or(true, |e| (e.width(), e.height()) != (gw, gh))
        {
            self.energy = Some(Grid::new(gw, gh, 1, 0.0)?);
        }
        let src = WindowSource {
            pixels: &self.pixels,
            layout: &self.layout,
            cache: self.rcache.as_ref(),
            width: self.w,
            height: self.h,
        };
        if let Some(energy) = self.energy.as_mut() {
            fill_energy_map(&src, &self.energy_fn, &mut self.window, energy)?;
        }
        trace!("energy map rebuilt for {}x{}", self.w, self.h);
        self.energy_valid_for = Some(self.orientation);
        Ok(())
    }

    // After a removal, bring a still-valid energy map up to date.  A
    // map that was already stale can no longer be trusted in any
    // orientation.
    fn update_energy(&mut self, seam: &[usize]) {
        if self.energy_valid_for != Some(self.orientation) {
            self.energy_valid_for = None;
            return;
        }
        let src = WindowSource {
            pixels: &self.pixels,
            layout: &self.layout,
            cache: self.rcache.as_ref(),
            width: self.w,
            height: self.h,
        };
        if let Some(energy) = self.energy.as_mut() {
            update_energy_band(&src, &self.energy_fn, &mut self.window, energy, seam);
        }
    }

    fn search(&mut self) -> Result<Vec<usize>> {
        let energy = self
            .energy
            .as_ref()
            .ok_or_else(|| CarveError::State("no energy map".to_string()))?;
        SeamSearch {
            energy,
            bias: self.bias.as_ref(),
            bias_scale: 1.0 / self.w_start.max(1) as f64,
            rigidity: self.rigidity,
            rigidity_mask: self.rigidity_mask.as_ref(),
            width: self.w,
            height: self.h,
            prefer_right: self.prefer_right,
        }
        .run(&mut self.costs)
    }

    /// The seam the next removal would take, without removing it.
    pub fn find_seam(&mut self) -> Result<Seam> {
        self.require_active()?;
        self.ensure_energy()?;
        let coords = self.search()?;
        Ok(Seam::new(self.orientation, coords))
    }

    /// Remove one seam across the carved dimension.  If earlier
    /// removals were undone, the most recently undone one is re-applied
    /// instead of searching.
    pub fn remove_seam(&mut self) -> Result<Seam> {
        self.require_active()?;
        if self.w <= 1 {
            return Err(CarveError::Exhausted {
                axis: self.orientation.carved_lines(),
            });
        }
        let coords = match self.redo.last() {
            Some(vmap) => {
                let coords = vmap.seam.clone();
                self.redo_line()?;
                coords
            }
            None => {
                self.ensure_energy()?;
                let coords = self.search()?;
                self.carve_line(&coords)?;
                coords
            }
        };
        trace!("removed seam, {} {} left", self.w, self.orientation.carved_lines());
        Ok(Seam::new(self.orientation, coords))
    }

    /// Add one seam across the carved dimension.  While there are
    /// recorded removals the most recent one is put back, with the
    /// inserted pixel interpolated from its neighbours; after that, a
    /// fresh seam is searched and duplicated.
    pub fn insert_seam(&mut self) -> Result<Seam> {
        self.require_active()?;
        let coords = match self.history.last() {
            Some(vmap) => {
                let coords = vmap.seam.clone();
                self.replay_line()?;
                coords
            }
            None => {
                self.flatten_internal()?;
                self.ensure_energy()?;
                let coords = self.search()?;
                self.duplicate_line(&coords)?;
                coords
            }
        };
        trace!("inserted seam, {} {} now", self.w, self.orientation.carved_lines());
        Ok(Seam::new(self.orientation, coords))
    }

    /// Grow by `count` distinct seams at once.  The `count` cheapest
    /// seams are found by carving them out one after another; then the
    /// image is restored and every pixel they covered gets a new pixel
    /// in front of it, the mean of it and its left neighbour.  The
    /// history is discarded.
    pub fn enlarge(&mut self, count: usize) -> Result<()> {
        self.require_active()?;
        if count == 0 {
            return Ok(());
        }
        if count >= self.w {
            return Err(CarveError::Argument(format!(
                "cannot find {} seams across {} {}",
                count,
                self.w,
                self.orientation.carved_lines()
            )));
        }
        self.flatten_internal()?;
        for _ in 0..count {
            self.ensure_energy()?;
            let coords = self.search()?;
            self.carve_line(&coords)?;
        }
        let marks = self.removed_cells();
        while !self.history.is_empty() {
            self.undo_line()?;
        }
        self.inflate_lines(&marks)?;
        debug!("enlarged by {} {}", count, self.orientation.carved_lines());
        Ok(())
    }

    // Seams a single enlargement may add at the current width.
    pub(crate) fn enlargement_limit(&self) -> usize {
        let limit = ((self.enl_step - 1.0) * self.w as f32) as usize;
        limit.saturating_sub(1).max(1).min(self.w - 1)
    }

    // Per line, the allocated cells the recorded removals took out,
    // ascending.
    fn removed_cells(&self) -> Vec<Vec<usize>> {
        let mut live: Vec<Vec<usize>> = (0..self.h).map(|_| (0..self.w0).collect()).collect();
        let mut marks = vec![Vec::with_capacity(self.history.len()); self.h];
        for vmap in &self.history {
            for (y, &x) in vmap.seam.iter().enumerate() {
                marks[y].push(live[y].remove(x));
            }
        }
        for row in &mut marks {
            row.sort_unstable();
        }
        marks
    }

    /// Put the most recent removal back exactly as it was.
    pub fn undo_seam(&mut self) -> Result<()> {
        self.require_active()?;
        self.undo_line()
    }

    /// Re-apply the most recently undone removal.
    pub fn redo_seam(&mut self) -> Result<()> {
        self.require_active()?;
        self.redo_line()
    }

    /// Move to any width reached so far by undoing or redoing recorded
    /// removals.  No seam is searched.
    pub fn set_width(&mut self, width: usize) -> Result<()> {
        self.navigate(Orientation::Normal, width)
    }

    /// As `set_width`, for a carver that is carving rows.
    pub fn set_height(&mut self, height: usize) -> Result<()> {
        self.navigate(Orientation::Transposed, height)
    }

    fn navigate(&mut self, orientation: Orientation, target: usize) -> Result<()> {
        self.require_active()?;
        if self.orientation != orientation {
            return Err(CarveError::State(format!(
                "the carver is carving {}; its history cannot restore {}",
                self.orientation.carved_lines(),
                orientation.carved_lines()
            )));
        }
        let lowest = self.w - self.redo.len();
        if target < lowest || target > self.w0 {
            return Err(CarveError::Argument(format!(
                "{} is outside the recorded range {}..={}",
                target, lowest, self.w0
            )));
        }
        while self.w < target {
            self.undo_line()?;
        }
        while self.w > target {
            self.redo_seam()?;
        }
        Ok(())
    }

    /// Discard the history and shrink every grid to the live size.
    pub fn flatten(&mut self) -> Result<()> {
        self.require_active()?;
        self.flatten_internal()
    }

    /// Swap the roles of rows and columns.  The history is flattened
    /// first.  Transposing twice restores every map exactly.
    pub fn transpose(&mut self) -> Result<()> {
        self.require_active()?;
        self.transpose_internal()
    }

    /// Attach an auxiliary carver that will lose and gain exactly the
    /// pixels this one does.  It must be the same size and carve the
    /// same way; it need not be active.
    pub fn attach(&mut self, mut aux: Carver<S>) -> Result<()> {
        self.require_active()?;
        self.flatten_internal()?;
        aux.flatten_internal()?;
        if aux.orientation != self.orientation {
            return Err(CarveError::Argument(
                "an attached carver must carve the same way as its root".to_string(),
            ));
        }
        if (aux.w, aux.h) != (self.w, self.h) {
            return Err(CarveError::Argument(format!(
                "cannot attach a {}x{} carver to a {}x{} one",
                aux.width(),
                aux.height(),
                self.width(),
                self.height()
            )));
        }
        self.attached.push(aux);
        Ok(())
    }

    /// The energy of every live pixel, row by row in image orientation.
    pub fn energy_map(&mut self) -> Result<Vec<f32>> {
        self.require_active()?;
        self.ensure_energy()?;
        let energy = self
            .energy
            .as_ref()
            .ok_or_else(|| CarveError::State("no energy map".to_string()))?;
        Ok(self.to_image_layout(energy))
    }

    pub fn bias_map(&self) -> Option<Vec<f32>> {
        self.bias.as_ref().map(|b| self.to_image_layout(b))
    }

    pub fn rigidity_mask(&self) -> Option<Vec<f32>> {
        self.rigidity_mask.as_ref().map(|m| self.to_image_layout(m))
    }

    fn to_image_layout(&self, grid: &Grid<f32>) -> Vec<f32> {
        let orientation = self.orientation;
        iproduct!(0..self.height(), 0..self.width())
            .map(|(y, x)| {
                let (sx, sy) = orientation.map(x, y);
                grid[(sx, sy)]
            })
            .collect()
    }

    /// Every live pixel as `(x, y, samples)`, row by row in image
    /// orientation.
    pub fn scan(&self) -> impl Iterator<Item = (usize, usize, &[S])> + '_ {
        let orientation = self.orientation;
        iproduct!(0..self.height(), 0..self.width()).map(move |(y, x)| {
            let (sx, sy) = orientation.map(x, y);
            (x, y, self.pixels.cell(sx, sy))
        })
    }

    /// The pixels of line `line` across the carved dimension: an image
    /// row while carving columns, an image column while carving rows.
    pub fn scan_line(&self, line: usize) -> Result<impl Iterator<Item = &[S]> + '_> {
        if line >= self.h {
            return Err(CarveError::Argument(format!("line {} of {}", line, self.h)));
        }
        Ok((0..self.w).map(move |x| self.pixels.cell(x, line)))
    }

    /// A copy of the live raster in image orientation.
    pub fn raster(&self) -> Result<Raster<S>> {
        let orientation = self.orientation;
        Raster::from_fn(self.width(), self.height(), self.channels(), |x, y, c| {
            let (sx, sy) = orientation.map(x, y);
            self.pixels.cell(sx, sy)[c]
        })
    }

    pub fn into_raster(self) -> Result<Raster<S>> {
        if self.orientation == Orientation::Normal && self.w == self.w0 && self.h == self.h0 {
            let (w, h, channels) = (self.w, self.h, self.channels());
            return Raster::new(w, h, channels, self.pixels.into_vec());
        }
        self.raster()
    }

    // Structural operations.  Each one is mirrored, in the same order,
    // on every attached carver.

    fn carve_line(&mut self, seam: &[usize]) -> Result<()> {
        let w = self.w;
        let pixels = self.pixels.remove_along_rows(seam, w);
        let bias = self.bias.as_mut().map(|b| b.remove_along_rows(seam, w));
        let rigidity = self
            .rigidity_mask
            .as_mut()
            .map(|m| m.remove_along_rows(seam, w));
        if let Some(energy) = self.energy.as_mut() {
            energy.remove_along_rows(seam, w);
        }
        if let Some(cache) = self.rcache.as_mut() {
            cache.remove_along_rows(seam, w);
        }
        let vmap = VMap {
            orientation: self.orientation,
            seam: seam.to_vec(),
            channels: self.channels(),
            pixels,
            bias,
            rigidity,
            width_before: w,
        };
        if self.dump_vmaps {
            self.flushed.push(vmap.clone());
        }
        self.history.push(vmap);
        self.w -= 1;
        self.update_energy(seam);
        self.attached.for_each(|c| c.carve_line(seam))
    }

    fn redo_line(&mut self) -> Result<()> {
        let vmap = self
            .redo
            .pop()
            .ok_or_else(|| CarveError::State("nothing to redo".to_string()))?;
        let w = self.w;
        self.pixels.remove_along_rows(&vmap.seam, w);
        if let Some(bias) = self.bias.as_mut() {
            bias.remove_along_rows(&vmap.seam, w);
        }
        if let Some(mask) = self.rigidity_mask.as_mut() {
            mask.remove_along_rows(&vmap.seam, w);
        }
        if let Some(energy) = self.energy.as_mut() {
            energy.remove_along_rows(&vmap.seam, w);
        }
        if let Some(cache) = self.rcache.as_mut() {
            cache.remove_along_rows(&vmap.seam, w);
        }
        self.w -= 1;
        self.update_energy(&vmap.seam);
        self.history.push(vmap);
        self.attached.for_each(|c| c.redo_line())
    }

    fn undo_line(&mut self) -> Result<()> {
        let vmap = self
            .history
            .pop()
            .ok_or_else(|| CarveError::State("nothing to undo".to_string()))?;
        self.restore_line(&vmap, &vmap.pixels);
        self.redo.push(vmap);
        self.attached.for_each(|c| c.undo_line())
    }

    fn replay_line(&mut self) -> Result<()> {
        let vmap = self
            .history
            .pop()
            .ok_or_else(|| CarveError::State("no removal to replay".to_string()))?;
        let channels = self.channels();
        let mut values = Vec::with_capacity(vmap.seam.len() * channels);
        for (y, &p) in vmap.seam.iter().enumerate() {
            let left = cq!(p > 0, Some(p - 1), None);
            let right = cq!(p < self.w, Some(p), None);
            match (left, right) {
                (Some(l), Some(r)) => {
                    let (l, r) = (self.pixels.cell(l, y), self.pixels.cell(r, y));
                    values.extend(l.iter().zip(r).map(|(&a, &b)| S::midpoint(a, b)));
                }
                (Some(n), None) | (None, Some(n)) => {
                    values.extend_from_slice(self.pixels.cell(n, y));
                }
                (None, None) => values.extend_from_slice(vmap.pixel(y)),
            }
        }
        self.restore_line(&vmap, &values);
        self.redo.clear();
        self.attached.for_each(|c| c.replay_line())
    }

    // Open the recorded seam back up, filling it with `values`; the
    // bias and rigidity come back exactly as they were.
    fn restore_line(&mut self, vmap: &VMap<S>, values: &[S]) {
        let w = self.w;
        self.pixels.insert_along_rows(&vmap.seam, w, values);
        if let (Some(bias), Some(old)) = (self.bias.as_mut(), vmap.bias.as_ref()) {
            bias.insert_along_rows(&vmap.seam, w, old);
        }
        if let (Some(mask), Some(old)) = (self.rigidity_mask.as_mut(), vmap.rigidity.as_ref()) {
            mask.insert_along_rows(&vmap.seam, w, old);
        }
        self.invalidate_energy();
        self.rcache = None;
        self.w += 1;
    }

    fn duplicate_line(&mut self, seam: &[usize]) -> Result<()> {
        let w = self.w;
        self.pixels = self.pixels.with_duplicated(seam, w)?;
        if let Some(bias) = self.bias.as_ref() {
            self.bias = Some(bias.with_duplicated(seam, w)?);
        }
        if let Some(mask) = self.rigidity_mask.as_ref() {
            self.rigidity_mask = Some(mask.with_duplicated(seam, w)?);
        }
        self.energy = None;
        self.invalidate_energy();
        self.rcache = None;
        self.w += 1;
        self.w0 = self.w;
        self.attached.for_each(|c| c.duplicate_line(seam))
    }

    fn inflate_lines(&mut self, marks: &[Vec<usize>]) -> Result<()> {
        let w = self.w;
        self.pixels = self.pixels.inflated(marks, w, S::midpoint)?;
        if let Some(bias) = self.bias.as_ref() {
            self.bias = Some(bias.inflated(marks, w, |a, b| (a + b) / 2.0)?);
        }
        if let Some(mask) = self.rigidity_mask.as_ref() {
            self.rigidity_mask = Some(mask.inflated(marks, w, |a, b| (a + b) / 2.0)?);
        }
        self.energy = None;
        self.invalidate_energy();
        self.rcache = None;
        self.history.clear();
        self.redo.clear();
        self.w += marks.first().map_or(0, Vec::len);
        self.w0 = self.w;
        self.attached.for_each(|c| c.inflate_lines(marks))
    }

    pub(crate) fn flatten_internal(&mut self) -> Result<()> {
        self.redo.clear();
        if self.w != self.w0 || self.h != self.h0 {
            let (w, h) = (self.w, self.h);
            debug!("flattening {} removals", self.history.len());
            self.pixels = self.pixels.compact(w, h)?;
            if let Some(energy) = self.energy.as_ref() {
                self.energy = Some(energy.compact(w, h)?);
            }
            if let Some(bias) = self.bias.as_ref() {
                self.bias = Some(bias.compact(w, h)?);
            }
            if let Some(mask) = self.rigidity_mask.as_ref() {
                self.rigidity_mask = Some(mask.compact(w, h)?);
            }
            if let Some(cache) = self.rcache.as_ref() {
                self.rcache = Some(cache.compact(w, h)?);
            }
            self.w0 = w;
            self.h0 = h;
        }
        self.history.clear();
        self.attached.for_each(|c| c.flatten_internal())
    }

    pub(crate) fn transpose_internal(&mut self) -> Result<()> {
        self.flatten_internal()?;
        let (w, h) = (self.w, self.h);
        self.pixels = self.pixels.transposed(w, h)?;
        if let Some(energy) = self.energy.as_ref() {
            self.energy = Some(energy.transposed(w, h)?);
        }
        if let Some(bias) = self.bias.as_ref() {
            self.bias = Some(bias.transposed(w, h)?);
        }
        if let Some(mask) = self.rigidity_mask.as_ref() {
            self.rigidity_mask = Some(mask.transposed(w, h)?);
        }
        if let Some(cache) = self.rcache.as_ref() {
            self.rcache = Some(cache.transposed(w, h)?);
        }
        self.w = h;
        self.h = w;
        self.w0 = h;
        self.h0 = w;
        std::mem::swap(&mut self.w_start, &mut self.h_start);
        self.orientation = self.orientation.turn();
        debug!("transposed; now carving {}", self.orientation.carved_lines());
        self.attached.for_each(|c| c.transpose_internal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::BuiltinEnergy;
    use crate::rwindow::ReaderType;

    // 10x10 grey, flat background with a bright stripe in column 5.
    fn striped() -> Raster<u8> {
        Raster::from_fn(10, 10, 1, |x, _, _| cq!(x == 5, 255, 40)).unwrap()
    }

    fn brightness() -> EnergyFunction {
        EnergyFunction::custom(1, ReaderType::Brightness, |_, _, _, _, rw| {
            rw.read_bright(0, 0) as f32
        })
        .unwrap()
    }

    // Flat columns: bright ones between dim ones of rising value.
    fn bars() -> Raster<u8> {
        let values = [200, 10, 200, 20, 200, 30, 200, 40, 200, 50];
        Raster::from_fn(10, 4, 1, |x, _, _| values[x]).unwrap()
    }

    fn noise(width: usize, height: usize, channels: usize) -> Raster<u8> {
        Raster::from_fn(width, height, channels, |x, y, c| {
            ((x * 31 + y * 17 + c * 7 + x * y * 3) % 251) as u8
        })
        .unwrap()
    }

    fn active(raster: Raster<u8>) -> Carver<u8> {
        let mut carver = Carver::new(raster).unwrap();
        carver.init(0.0).unwrap();
        carver
    }

    #[test]
    fn inactive_carvers_refuse_to_carve() {
        let mut carver = Carver::new(striped()).unwrap();
        assert!(matches!(carver.remove_seam(), Err(CarveError::Inactive)));
        assert!(matches!(carver.transpose(), Err(CarveError::Inactive)));
        carver.init(0.0).unwrap();
        assert!(matches!(carver.init(0.0), Err(CarveError::State(_))));
        carver.release().unwrap();
        assert!(!carver.is_active());
    }

    #[test]
    fn seams_avoid_the_stripe() {
        let mut carver = active(striped());
        carver.set_energy_function(brightness()).unwrap();
        let seam = carver.remove_seam().unwrap();
        assert_eq!(seam.len(), 10);
        assert!(seam.is_connected());
        assert!(seam.coords().iter().all(|&x| x < 5) || seam.coords().iter().all(|&x| x > 5));
        let raster = carver.raster().unwrap();
        assert_eq!(raster.dimensions(), (9, 10));
        let stripe = (0..9).filter(|&x| (0..10).all(|y| raster.pixel(x, y)[0] == 255));
        assert_eq!(stripe.count(), 1);
    }

    #[test]
    fn gradient_ties_stay_left_of_the_stripe() {
        let mut carver = active(striped());
        carver.set_energy_function(BuiltinEnergy::GradNorm).unwrap();
        let seam = carver.find_seam().unwrap();
        // Central differences only see the stripe from its neighbours,
        // so the stripe is as flat as the background and the leftmost
        // zero-cost seam wins.
        assert!(seam.is_connected());
        assert!(seam.coords().iter().all(|&x| x < 4));
    }

    #[test]
    fn exhausted_at_one_line() {
        let mut carver = active(noise(2, 3, 1));
        carver.remove_seam().unwrap();
        assert!(matches!(
            carver.remove_seam(),
            Err(CarveError::Exhausted { axis: "columns" })
        ));
    }

    #[test]
    fn history_tracks_the_allocation() {
        let mut carver = active(noise(8, 5, 3));
        for _ in 0..3 {
            carver.remove_seam().unwrap();
            assert_eq!(carver.ref_width() - carver.width(), carver.history().len());
        }
        carver.insert_seam().unwrap();
        assert_eq!(carver.history().len(), 2);
        assert_eq!(carver.width(), 6);
        carver.flatten().unwrap();
        assert_eq!((carver.ref_width(), carver.history().len()), (6, 0));
    }

    #[test]
    fn undo_and_redo_are_lossless() {
        let original = noise(9, 6, 2);
        let mut carver = active(original.clone());
        let mut seams = Vec::new();
        for _ in 0..4 {
            seams.push(carver.remove_seam().unwrap());
        }
        let narrow = carver.raster().unwrap();
        carver.set_width(9).unwrap();
        assert_eq!(carver.raster().unwrap(), original);
        carver.set_width(7).unwrap();
        carver.set_width(5).unwrap();
        assert_eq!(carver.raster().unwrap(), narrow);
        assert!(carver.set_width(4).is_err());
        assert!(carver.set_height(6).is_err());

        // A removal after an undo re-applies the undone seam.
        carver.undo_seam().unwrap();
        assert_eq!(carver.remove_seam().unwrap(), seams[3]);
    }

    #[test]
    fn replayed_insertion_restores_all_but_the_seam() {
        let original = noise(7, 5, 1);
        let mut carver = active(original.clone());
        let seam = carver.remove_seam().unwrap();
        carver.insert_seam().unwrap();
        let restored = carver.raster().unwrap();
        for y in 0..5 {
            let s = seam.coords()[y];
            for x in 0..7 {
                if x != s {
                    assert_eq!(restored.pixel(x, y), original.pixel(x, y));
                    continue;
                }
                let v = restored.pixel(x, y)[0];
                let left = cq!(x > 0, original.pixel(x.max(1) - 1, y)[0], v);
                let right = cq!(x < 6, original.pixel((x + 1).min(6), y)[0], v);
                assert!(v >= left.min(right) && v <= left.max(right));
            }
        }
    }

    #[test]
    fn fresh_insertion_duplicates_a_seam() {
        let mut carver = active(striped());
        let seam = carver.insert_seam().unwrap();
        assert_eq!((carver.width(), carver.ref_width()), (11, 11));
        let raster = carver.raster().unwrap();
        for (y, &x) in seam.coords().iter().enumerate() {
            assert_eq!(raster.pixel(x, y), raster.pixel(x + 1, y));
        }
    }

    #[test]
    fn enlargement_spreads_over_distinct_seams() {
        let mut carver = active(bars());
        carver.set_energy_function(brightness()).unwrap();
        carver.enlarge(5).unwrap();
        assert_eq!((carver.width(), carver.ref_width()), (15, 15));
        assert!(carver.history().is_empty());
        let expected = [
            200, 105, 10, 200, 110, 20, 200, 115, 30, 200, 120, 40, 200, 125, 50,
        ];
        let raster = carver.raster().unwrap();
        for y in 0..4 {
            let row: Vec<u8> = (0..15).map(|x| raster.pixel(x, y)[0]).collect();
            assert_eq!(row, expected);
        }
        assert!(carver.enlarge(15).is_err());
    }

    #[test]
    fn enlargement_step_is_validated() {
        let mut carver = active(bars());
        assert_eq!(carver.enl_step(), 2.0);
        assert_eq!(carver.enlargement_limit(), 9);
        assert!(carver.set_enl_step(1.0).is_err());
        assert!(carver.set_enl_step(2.5).is_err());
        assert!(carver.set_enl_step(f32::NAN).is_err());
        carver.set_enl_step(1.5).unwrap();
        assert_eq!(carver.enlargement_limit(), 4);
    }

    #[test]
    fn attached_carvers_follow_an_enlargement() {
        let mut root = active(bars());
        root.set_energy_function(brightness()).unwrap();
        root.bias_add_xy(4.0, 0, 0).unwrap();
        let mask = Raster::from_fn(10, 4, 1, |x, _, _| (x * 10) as u8).unwrap();
        root.attach(Carver::new(mask).unwrap()).unwrap();
        root.enlarge(2).unwrap();
        let aux = root.attached().get(0).unwrap();
        assert_eq!((aux.width(), aux.ref_width()), (12, 12));
        let raster = aux.raster().unwrap();
        let row: Vec<u8> = (0..12).map(|x| raster.pixel(x, 0)[0]).collect();
        assert_eq!(row, vec![0, 5, 10, 20, 25, 30, 40, 50, 60, 70, 80, 90]);
        let bias = root.bias_map().unwrap();
        assert_eq!((bias[0], bias[1], bias[2]), (2.0, 1.0, 0.0));
    }

    #[test]
    fn rgba_energies_carve_alike_with_and_without_the_cache() {
        let red_shift = EnergyFunction::custom(1, ReaderType::Rgba, |_, _, _, _, rw| {
            let dx = rw.read_rgba(1, 0, 0) - rw.read_rgba(-1, 0, 0);
            let alpha = rw.read_rgba(0, 0, 3);
            (dx.abs() * alpha) as f32
        })
        .unwrap();
        let mut cached = active(noise(10, 7, 4));
        let mut direct = active(noise(10, 7, 4));
        cached.set_energy_function(red_shift.clone()).unwrap();
        direct.set_energy_function(red_shift).unwrap();
        direct.set_use_cache(false);
        for _ in 0..3 {
            assert_eq!(cached.remove_seam().unwrap(), direct.remove_seam().unwrap());
        }
        assert_eq!(cached.rcache.as_ref().map(Grid::depth), Some(4));
        assert!(direct.rcache.is_none());
        assert_eq!(cached.energy_map().unwrap(), direct.energy_map().unwrap());
        assert_eq!(cached.raster().unwrap(), direct.raster().unwrap());
    }

    #[test]
    fn transposing_twice_is_exact() {
        let mut carver = active(noise(6, 4, 1));
        carver.bias_add_xy(12.0, 1, 2).unwrap();
        carver.rigidity_mask_add_xy(0.25, 3, 0).unwrap();
        let energy = carver.energy_map().unwrap();
        let before = (
            carver.pixels.clone(),
            carver.energy.clone(),
            carver.bias.clone(),
            carver.rigidity_mask.clone(),
        );
        carver.transpose().unwrap();
        assert_eq!((carver.width(), carver.height()), (6, 4));
        assert_eq!(carver.orientation(), Orientation::Transposed);
        assert_eq!(carver.bias_map().unwrap()[2 * 6 + 1], 6.0);
        carver.transpose().unwrap();
        assert_eq!(carver.orientation(), Orientation::Normal);
        let after = (
            carver.pixels.clone(),
            carver.energy.clone(),
            carver.bias.clone(),
            carver.rigidity_mask.clone(),
        );
        assert_eq!(before, after);
        assert_eq!(carver.energy_map().unwrap(), energy);
    }

    #[test]
    fn incremental_energy_matches_a_rebuild() {
        let mut carver = active(noise(12, 9, 3));
        carver.set_energy_function(BuiltinEnergy::LumaGradNorm).unwrap();
        for _ in 0..4 {
            carver.remove_seam().unwrap();
        }
        let incremental = carver.energy_map().unwrap();
        carver.invalidate_energy();
        assert_eq!(carver.energy_map().unwrap(), incremental);
    }

    #[test]
    fn cached_and_uncached_carving_agree() {
        let mut cached = active(noise(10, 7, 4));
        let mut direct = active(noise(10, 7, 4));
        direct.set_use_cache(false);
        for _ in 0..3 {
            assert_eq!(cached.remove_seam().unwrap(), direct.remove_seam().unwrap());
        }
        assert_eq!(cached.raster().unwrap(), direct.raster().unwrap());
    }

    #[test]
    fn attached_carvers_follow_in_lock_step() {
        let mut root = active(noise(8, 6, 3));
        let mask = Raster::from_fn(8, 6, 1, |x, y, _| (x + 10 * y) as u8).unwrap();
        root.attach(Carver::new(mask).unwrap()).unwrap();
        assert!(root.attach(Carver::new(noise(7, 6, 1)).unwrap()).is_err());

        let seam = root.remove_seam().unwrap();
        {
            let aux = root.attached().get(0).unwrap().raster().unwrap();
            for (y, &s) in seam.coords().iter().enumerate() {
                let expected: Vec<u8> = (0..8)
                    .filter(|&x| x != s)
                    .map(|x| (x + 10 * y) as u8)
                    .collect();
                let got: Vec<u8> = (0..7).map(|x| aux.pixel(x, y)[0]).collect();
                assert_eq!(got, expected);
            }
        }
        root.transpose().unwrap();
        root.remove_seam().unwrap();
        let aux = root.attached().get(0).unwrap();
        assert_eq!((aux.width(), aux.height()), (7, 5));
        assert_eq!(aux.orientation(), Orientation::Transposed);
        root.undo_seam().unwrap();
        assert_eq!(root.attached().get(0).unwrap().height(), 6);
    }

    #[test]
    fn dumped_vmaps_survive_flattening() {
        let mut carver = active(noise(6, 3, 1));
        carver.set_dump_vmaps(true);
        carver.remove_seam().unwrap();
        carver.remove_seam().unwrap();
        carver.flatten().unwrap();
        assert!(carver.history().is_empty());
        assert_eq!(carver.vmap_list().len(), 2);
        let first = carver.vmap_list().get(0).unwrap();
        assert_eq!(first.width_before(), 6);
        assert_eq!(first.points().count(), 3);
    }

    #[test]
    fn scanning_follows_image_orientation() {
        let mut carver = active(noise(5, 3, 1));
        let original = carver.raster().unwrap();
        carver.transpose().unwrap();
        for (x, y, px) in carver.scan() {
            assert_eq!(px, original.pixel(x, y));
        }
        let column: Vec<u8> = carver.scan_line(2).unwrap().map(|p| p[0]).collect();
        assert_eq!(column, (0..3).map(|y| original.pixel(2, y)[0]).collect::<Vec<_>>());
        assert!(carver.scan_line(5).is_err());
        assert_eq!(carver.into_raster().unwrap(), original);
    }
}
