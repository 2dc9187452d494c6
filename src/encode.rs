// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Writing the finished image out, and reading one back in.  The file
//! format follows the extension (`.png`, `.pnm`, `.tiff`, …); alpha is
//! always written fully opaque.

use image::ColorType;
use std::convert::TryFrom;
use std::fmt::Display;
use std::path::Path;

use crate::accumulator::Accumulator;
use crate::errors::{RenderError, Result};

fn encode_error<E: Display>(path: &Path, reason: E) -> RenderError {
    RenderError::Encode {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn dimension(path: &Path, n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| encode_error(path, format!("{} pixels is too large", n)))
}

/// Write `accumulator` to `path` as RGBA with alpha forced to 255.
/// The accumulator itself is left alone.
pub fn write_image<P: AsRef<Path>>(path: P, accumulator: &Accumulator) -> Result<()> {
    let path = path.as_ref();
    let width = dimension(path, accumulator.cols())?;
    let height = dimension(path, accumulator.rows())?;
    let mut pixels = accumulator.to_rgba();
    for alpha in pixels.iter_mut().skip(3).step_by(4) {
        *alpha = 255;
    }
    image::save_buffer(path, &pixels, width, height, ColorType::Rgba8)
        .map_err(|e| encode_error(path, e))
}

/// Read an image back into an accumulator.
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Accumulator> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|e| encode_error(path, e))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Accumulator::from_rgba(width as usize, height as usize, &image.into_raw())
        .ok_or_else(|| encode_error(path, "pixel data does not match the dimensions"))
}
