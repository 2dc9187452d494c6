// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! One complete render: a slot channel per worker, the workers on
//! their own threads, and the coordinator on the calling thread.

use log::{error, info, warn};
use std::str::FromStr;
use std::time::Duration;

use crate::accumulator::Accumulator;
use crate::channel::{slot_channels, SlotGeometry};
use crate::coordinator::{Coordinator, RenderReport};
use crate::display::Screen;
use crate::errors::{RenderError, Result};
use crate::params::FractalParams;
use crate::sampler::{jitter_offsets, Buddhabrot, EscapeTime, Sampler};
use crate::worker::Worker;

/// The most sub-pixel passes a render may ask for.
pub const MAX_PASSES: usize = 64;

/// Which picture to make.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Orbit density of the escaping points.
    Buddhabrot,
    /// The classic Mandelbrot, coloured by escape time.
    EscapeTime,
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<RenderMode, String> {
        match s.to_ascii_lowercase().as_str() {
            "buddhabrot" | "buddha" => Ok(RenderMode::Buddhabrot),
            "mandelbrot" | "escape-time" => Ok(RenderMode::EscapeTime),
            _ => Err(format!("unknown render mode {}", s)),
        }
    }
}

/// Everything needed to run one render.
#[derive(Clone, Debug)]
pub struct Renderer {
    params: FractalParams,
    workers: usize,
    mode: RenderMode,
    passes: Option<usize>,
    geometry: SlotGeometry,
    stall_timeout: Option<Duration>,
}

impl Renderer {
    /// A Buddhabrot render of `params`, one worker per CPU.
    pub fn new(params: FractalParams) -> Renderer {
        Renderer {
            params,
            workers: num_cpus::get(),
            mode: RenderMode::Buddhabrot,
            passes: None,
            geometry: SlotGeometry::default(),
            stall_timeout: None,
        }
    }

    /// Use `workers` worker threads.
    pub fn workers(self, workers: usize) -> Renderer {
        Renderer { workers, ..self }
    }

    /// Render a different picture.
    pub fn mode(self, mode: RenderMode) -> Renderer {
        Renderer { mode, ..self }
    }

    /// Sample each pixel at `passes` sub-pixel offsets instead of the
    /// mode's default.
    pub fn passes(self, passes: usize) -> Renderer {
        Renderer {
            passes: Some(passes),
            ..self
        }
    }

    /// Size the slot rings.
    pub fn geometry(self, geometry: SlotGeometry) -> Renderer {
        Renderer { geometry, ..self }
    }

    /// Fail the render if no worker publishes anything for `timeout`.
    pub fn stall_timeout(self, timeout: Option<Duration>) -> Renderer {
        Renderer {
            stall_timeout: timeout,
            ..self
        }
    }

    /// Run the render to completion, telling `screen` as the image
    /// fills in.
    pub fn render(&self, screen: &mut dyn Screen) -> Result<(Accumulator, RenderReport)> {
        self.params.validate()?;
        if self.workers == 0 {
            return Err(RenderError::NoWorkers);
        }
        match self.mode {
            RenderMode::Buddhabrot => self.render_with(&Buddhabrot::new(&self.params)?, screen),
            RenderMode::EscapeTime => self.render_with(&EscapeTime::new(&self.params)?, screen),
        }
    }

    fn render_with<S: Sampler>(
        &self,
        sampler: &S,
        screen: &mut dyn Screen,
    ) -> Result<(Accumulator, RenderReport)> {
        let passes = self.passes.unwrap_or_else(|| sampler.default_passes());
        if passes == 0 || passes > MAX_PASSES {
            return Err(RenderError::InvalidValue {
                field: "passes",
                expected: "between 1 and 64",
            });
        }
        let jitters = jitter_offsets(self.params.delta, passes);

        let (writers, mut reader) = slot_channels(self.workers, self.geometry)?;
        reader.set_stall_timeout(self.stall_timeout);
        let mut coordinator = Coordinator::new(
            Accumulator::new(self.params.cols, self.params.rows),
            self.workers,
        );

        info!(
            "rendering {:?} {}x{} at {}{:+}i, delta {}, i_max {}: {} workers, {} passes",
            self.mode,
            self.params.cols,
            self.params.rows,
            self.params.x,
            self.params.y,
            self.params.delta,
            self.params.i_max,
            self.workers,
            passes
        );

        let workers = self.workers;
        let scoped = crossbeam::scope(|s| {
            // Owned in here so it is dropped, releasing any worker
            // waiting on an acknowledgement, before the workers are
            // joined.
            let reader = reader;

            let mut handles = Vec::with_capacity(workers);
            for (index, writer) in writers.into_iter().enumerate() {
                let worker = Worker::new(index, workers, sampler, &jitters);
                match s
                    .builder()
                    .name(format!("worker-{}", index))
                    .spawn(move |_| worker.run(writer))
                {
                    Ok(handle) => handles.push(handle),
                    Err(cause) => return Err(RenderError::Spawn { worker: index, cause }),
                }
            }

            let outcome = coordinator.run(&reader, screen);
            drop(reader);

            for (index, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => warn!("worker {} stopped early: {}", index, e),
                    Err(_) => error!("worker {} panicked", index),
                }
            }
            outcome
        });
        match scoped {
            Ok(outcome) => outcome?,
            Err(_) => return Err(RenderError::WorkersGone(workers)),
        }

        let (accumulator, report) = coordinator.finish();
        if report.abandoned.is_empty() && report.total_applied() != report.produced() {
            warn!(
                "workers produced {} hits but {} were applied",
                report.produced(),
                report.total_applied()
            );
        }
        info!(
            "render complete: {} hits in {} batches, {} of {} pixels lit",
            report.total_applied(),
            report.batches,
            accumulator.lit_cells(),
            accumulator.len()
        );
        Ok((accumulator, report))
    }
}
