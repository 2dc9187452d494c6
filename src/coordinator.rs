// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The coordinator is the only thing that ever writes to the image.
//! It sits in one loop: take whichever published slot is ready, add
//! its records to the accumulator, hand the slot back, and count the
//! workers that have said they're done.  When all of them have, the
//! render is over.

use log::{debug, warn};

use crate::accumulator::Accumulator;
use crate::channel::{Publication, Readiness, SlotReader, WorkerStats};
use crate::display::Screen;
use crate::errors::Result;

/// How many workers have finished, out of how many started.  Only ever
/// counts up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Completion {
    completed: usize,
    expected: usize,
}

impl Completion {
    /// Nobody done yet.
    pub fn new(expected: usize) -> Completion {
        Completion {
            completed: 0,
            expected,
        }
    }

    /// Count one more finished worker.  Returns true if that was the
    /// last one.
    pub fn record(&mut self) -> bool {
        if self.completed < self.expected {
            self.completed += 1;
        }
        self.is_done()
    }

    /// Workers finished so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Workers started.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Whether everyone is finished.
    pub fn is_done(&self) -> bool {
        self.completed == self.expected
    }
}

/// What happened during a render, per worker.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderReport {
    /// Each worker's own account of itself, indexed by worker.
    /// Abandoned workers keep a zeroed entry.
    pub workers: Vec<WorkerStats>,
    /// Records the coordinator applied, indexed by worker.
    pub applied: Vec<u64>,
    /// Publications drained, across all workers.
    pub batches: u64,
    /// Workers that went away without finishing.
    pub abandoned: Vec<usize>,
}

impl RenderReport {
    fn new(workers: usize) -> RenderReport {
        RenderReport {
            workers: (0..workers)
                .map(|worker| WorkerStats {
                    worker,
                    ..WorkerStats::default()
                })
                .collect(),
            applied: vec![0; workers],
            batches: 0,
            abandoned: vec![],
        }
    }

    /// Records the workers say they produced.
    pub fn produced(&self) -> u64 {
        self.workers.iter().map(|w| w.sampled.hits).sum()
    }

    /// Records the coordinator applied.
    pub fn total_applied(&self) -> u64 {
        self.applied.iter().sum()
    }
}

/// The single writer of the image accumulator.
pub struct Coordinator {
    accumulator: Accumulator,
    completion: Completion,
    finished: Vec<bool>,
    report: RenderReport,
}

impl Coordinator {
    /// Take charge of `accumulator` for a render by `workers` workers.
    pub fn new(accumulator: Accumulator, workers: usize) -> Coordinator {
        Coordinator {
            accumulator,
            completion: Completion::new(workers),
            finished: vec![false; workers],
            report: RenderReport::new(workers),
        }
    }

    /// The image so far.
    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// How many workers have finished.
    pub fn completion(&self) -> Completion {
        self.completion
    }

    /// Drain `reader` until every worker has finished.  The screen is
    /// told after every batch applied, empty or not; it gets no say in
    /// the result.
    pub fn run(&mut self, reader: &SlotReader, screen: &mut dyn Screen) -> Result<()> {
        while !self.completion.is_done() {
            let publication = reader.drain_next_ready()?;
            if self.handle(publication, reader) {
                screen.mark_changed(&self.accumulator);
            }
        }
        debug!(
            "all {} workers complete after {} batches",
            self.completion.expected(),
            self.report.batches
        );
        Ok(())
    }

    // Returns whether a batch was applied.
    fn handle(&mut self, publication: Publication, reader: &SlotReader) -> bool {
        let worker = publication.worker;
        if worker >= self.finished.len() || self.finished[worker] {
            warn!("ignoring slot {} from finished or unknown worker {}", publication.slot, worker);
            return false;
        }

        match publication.readiness {
            Readiness::Full => {
                self.apply(&publication);
                reader.acknowledge(publication);
                true
            }
            Readiness::Final(stats) => {
                self.apply(&publication);
                reader.acknowledge(publication);
                self.report.workers[worker] = stats;
                self.complete(worker);
                true
            }
            Readiness::Abandoned => {
                warn!(
                    "worker {} went away without finishing; its remaining rows are missing",
                    worker
                );
                self.report.abandoned.push(worker);
                self.complete(worker);
                false
            }
        }
    }

    fn apply(&mut self, publication: &Publication) {
        let applied = self.accumulator.apply(publication.records());
        if applied != publication.count {
            warn!(
                "worker {} slot {}: {} of {} records fell outside the image",
                publication.worker,
                publication.slot,
                publication.count - applied,
                publication.count
            );
        }
        self.report.applied[publication.worker] += applied as u64;
        self.report.batches += 1;
    }

    fn complete(&mut self, worker: usize) {
        self.finished[worker] = true;
        self.completion.record();
        debug!(
            "worker {} complete ({} of {})",
            worker,
            self.completion.completed(),
            self.completion.expected()
        );
    }

    /// Hand back the image and the report.
    pub fn finish(self) -> (Accumulator, RenderReport) {
        (self.accumulator, self.report)
    }
}
