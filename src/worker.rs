// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A worker drives a sampler over its share of the rows and streams
//! the results through its slot writer.
//!
//! Worker `k` of `n` takes rows `k, k+n, k+2n, …`.  The cost of a row
//! varies wildly (rows through the heart of the set iterate to `i_max`
//! on every pixel), and striding spreads the expensive rows across all
//! the workers where handing out contiguous bands would not.

use itertools::iproduct;
use log::debug;
use std::iter::StepBy;
use std::ops::Range;

use crate::channel::{SlotWriter, WorkerStats};
use crate::errors::Result;
use crate::sampler::{SampleStats, Sampler};

/// One worker's assignment.
pub struct Worker<'a, S: Sampler> {
    index: usize,
    workers: usize,
    sampler: &'a S,
    jitters: &'a [f64],
}

impl<'a, S: Sampler> Worker<'a, S> {
    /// Worker `index` of `workers`, sampling each of its rows once per
    /// jitter offset.
    pub fn new(index: usize, workers: usize, sampler: &'a S, jitters: &'a [f64]) -> Self {
        Worker {
            index,
            workers: workers.max(1),
            sampler,
            jitters,
        }
    }

    /// The rows this worker is responsible for.
    pub fn rows(&self) -> StepBy<Range<usize>> {
        let rows = self.sampler.plane().integral_plane.1;
        (self.index..rows).step_by(self.workers)
    }

    /// Sample every assigned row at every offset, then flush the last
    /// partial slot and report.
    pub fn run(self, mut writer: SlotWriter) -> Result<WorkerStats> {
        debug!(
            "worker {} of {} starting on {} rows",
            self.index,
            self.workers,
            self.rows().len()
        );
        let mut sampled = SampleStats::default();
        for (row, jitter) in iproduct!(self.rows(), self.jitters.iter()) {
            sampled += self.sampler.sample_row(row, *jitter, &mut writer)?;
        }
        let stats = writer.finish(sampled)?;
        debug!(
            "worker {} done: {} points, {} escaped, {} hits in {} slots",
            self.index, sampled.points, sampled.escaped, sampled.hits, stats.publications
        );
        Ok(stats)
    }
}
