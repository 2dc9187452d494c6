#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Slotbrot: a parallel Buddhabrot renderer
//!
//! The Buddhabrot is a variant of the Mandelbrot set that explores
//! where points go rather than how fast they leave.  Each point `c` on
//! the complex plane is iterated as `z ← z² + c`; if it escapes, every
//! point its orbit visited on the way out is mapped back to the
//! nearest pixel and that pixel is brightened a little.  Millions of
//! orbits stacked on top of one another make the ghostly seated
//! figure that gives the image its name.
//!
//! The work splits naturally: every starting point is independent.
//! What doesn't split is the image itself, which everybody wants to
//! write to at once.  Slotbrot gives the image a single owner, the
//! coordinator, and has every worker stream its hits to it through a
//! small ring of fixed-size slots:
//!
//! * a worker fills a slot with hit records and publishes it;
//! * the coordinator drains whichever slot is ready, adds it to the
//!   image, and hands the slot back;
//! * a worker that runs out of free slots waits until one comes back.
//!
//! Because slots travel by ownership, a slot is only ever in one
//! place, and what a worker wrote is always visible to the coordinator
//! that receives it.  Because adding hits to the image is commutative,
//! the finished picture doesn't depend on how many workers there were
//! or in which order their slots arrived.
//!
//! ```no_run
//! use slotbrot::{FractalParams, Headless, Renderer};
//!
//! # fn main() -> slotbrot::Result<()> {
//! let params = FractalParams::load("fractal.data", &Headless::with_dimensions(640, 480))?;
//! let (mut image, report) = Renderer::new(params).workers(4).render(&mut Headless::new())?;
//! image.finalize();
//! slotbrot::write_image("buddha.png", &image)?;
//! println!("{} hits", report.total_applied());
//! # Ok(())
//! # }
//! ```

pub mod accumulator;
pub mod channel;
pub mod coordinator;
pub mod display;
pub mod encode;
pub mod errors;
pub mod params;
pub mod planes;
pub mod render;
pub mod sampler;
pub mod worker;

pub use crate::accumulator::{Accumulator, Argb, HitRecord};
pub use crate::channel::{SlotGeometry, WorkerStats};
pub use crate::coordinator::RenderReport;
pub use crate::display::{Headless, Preview, Screen};
pub use crate::encode::{read_image, write_image};
pub use crate::errors::{RenderError, Result};
pub use crate::params::FractalParams;
pub use crate::render::{RenderMode, Renderer};
