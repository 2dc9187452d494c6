// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Whatever is showing the image while it renders.  The renderer asks
//! it two things: how big an image to make when the parameters don't
//! say, and (after every batch) to take note that the image changed.
//! Neither answer affects what ends up in the image.

use log::{debug, warn};
use std::path::PathBuf;

use crate::accumulator::Accumulator;
use crate::encode::write_image;

/// A place the image is shown.
pub trait Screen {
    /// The size, columns then rows, to use when the parameters don't
    /// give one.
    fn default_dimensions(&self) -> Option<(usize, usize)>;

    /// The accumulator has changed.  Advisory only.
    fn mark_changed(&mut self, _accumulator: &Accumulator) {}
}

/// No screen at all.
#[derive(Clone, Debug, Default)]
pub struct Headless {
    dimensions: Option<(usize, usize)>,
}

impl Headless {
    /// A headless screen with no default size.
    pub fn new() -> Headless {
        Headless { dimensions: None }
    }

    /// A headless screen that claims to be `cols × rows`.
    pub fn with_dimensions(cols: usize, rows: usize) -> Headless {
        Headless {
            dimensions: Some((cols, rows)),
        }
    }
}

impl Screen for Headless {
    fn default_dimensions(&self) -> Option<(usize, usize)> {
        self.dimensions
    }
}

/// A live view: every `every` changes, the image so far is written to
/// a preview file that an image viewer can keep reloading.
#[derive(Clone, Debug)]
pub struct Preview {
    path: PathBuf,
    every: u64,
    changes: u64,
    written: u64,
    dimensions: Option<(usize, usize)>,
}

impl Preview {
    /// Write a preview to `path` on every `every`th change.
    pub fn new<P: Into<PathBuf>>(path: P, every: u64) -> Preview {
        Preview {
            path: path.into(),
            every: every.max(1),
            changes: 0,
            written: 0,
            dimensions: None,
        }
    }

    /// Also offer a default size.
    pub fn with_dimensions(self, cols: usize, rows: usize) -> Preview {
        Preview {
            dimensions: Some((cols, rows)),
            ..self
        }
    }

    /// How many previews have been written.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Screen for Preview {
    fn default_dimensions(&self) -> Option<(usize, usize)> {
        self.dimensions
    }

    fn mark_changed(&mut self, accumulator: &Accumulator) {
        self.changes += 1;
        if self.changes % self.every != 0 {
            return;
        }
        match write_image(&self.path, accumulator) {
            Ok(()) => {
                self.written += 1;
                debug!("preview {} written to {}", self.written, self.path.display());
            }
            Err(e) => warn!("live preview failed: {}", e),
        }
    }
}
