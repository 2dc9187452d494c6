// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The fractal parameters: how big the image is, where it's centered
//! on the complex plane, how far apart pixels are, and how long we're
//! willing to iterate.  They're read from a small text file of
//! `key = value` lines:
//!
//! ```text
//! cols = 800
//! rows = 600
//! x = -0.5
//! y = 0
//! delta = 0.005
//! i_max = 2000
//! ```
//!
//! Once a render starts the parameters never change.

use std::fs;
use std::path::Path;

use log::info;

use crate::display::Screen;
use crate::errors::{RenderError, Result};

/// Immutable per-run configuration shared by every worker.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FractalParams {
    /// Width of the image, in pixels.
    pub cols: usize,
    /// Height of the image, in pixels.
    pub rows: usize,
    /// Real coordinate of the center of the image.
    pub x: f64,
    /// Imaginary coordinate of the center of the image.
    pub y: f64,
    /// Distance on the complex plane between adjacent pixels.
    pub delta: f64,
    /// Maximum number of iterations per point.
    pub i_max: usize,
}

impl FractalParams {
    /// Read and validate a parameter file.  Zero or missing dimensions
    /// are filled in from the screen's defaults.
    pub fn load<P: AsRef<Path>>(path: P, screen: &dyn Screen) -> Result<FractalParams> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|cause| RenderError::ParamsIo {
            path: path.display().to_string(),
            cause,
        })?;
        FractalParams::parse(&text, screen)
    }

    /// Parse the text of a parameter file.  Keys are case-insensitive;
    /// blank lines and lines starting with `#` are skipped.  Anything
    /// else that isn't a known `key = number` pair is an error.
    pub fn parse(text: &str, screen: &dyn Screen) -> Result<FractalParams> {
        let mut raw = RawParams::default();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            raw.set(index + 1, line)?;
        }
        raw.resolve(screen)
    }

    /// The view the Buddhabrot is usually wanted in: the whole set,
    /// centered on the origin, four units tall.
    pub fn framed(self) -> FractalParams {
        FractalParams {
            x: 0.0,
            y: 0.0,
            delta: 4.0 / (self.rows as f64),
            ..self
        }
    }

    /// Check the values make a renderable image.
    pub fn validate(&self) -> Result<()> {
        if self.cols == 0 {
            return Err(RenderError::InvalidValue {
                field: "cols",
                expected: "at least 1",
            });
        }
        if self.rows == 0 {
            return Err(RenderError::InvalidValue {
                field: "rows",
                expected: "at least 1",
            });
        }
        // Four bytes a pixel once encoded.
        if self.cols.checked_mul(self.rows).and_then(|n| n.checked_mul(4)).is_none() {
            return Err(RenderError::InvalidValue {
                field: "cols/rows",
                expected: "small enough to fit in memory",
            });
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(RenderError::InvalidValue {
                field: "x/y",
                expected: "finite",
            });
        }
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(RenderError::InvalidValue {
                field: "delta",
                expected: "a positive number",
            });
        }
        if self.i_max == 0 {
            return Err(RenderError::InvalidValue {
                field: "i_max",
                expected: "at least 1",
            });
        }
        Ok(())
    }

    /// The number of cells in the image.
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    /// Whether the image has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }
}

#[derive(Default, Debug)]
struct RawParams {
    cols: Option<f64>,
    rows: Option<f64>,
    x: Option<f64>,
    y: Option<f64>,
    delta: Option<f64>,
    i_max: Option<f64>,
}

impl RawParams {
    fn set(&mut self, line: usize, text: &str) -> Result<()> {
        let (key, value) = match text.find('=') {
            Some(index) => (text[..index].trim(), text[index + 1..].trim()),
            None => {
                return Err(RenderError::Malformed {
                    line,
                    text: text.to_string(),
                })
            }
        };

        let field = match key.to_ascii_lowercase().as_str() {
            "cols" => &mut self.cols,
            "rows" => &mut self.rows,
            "x" => &mut self.x,
            "y" => &mut self.y,
            "delta" => &mut self.delta,
            "i_max" => &mut self.i_max,
            _ => {
                return Err(RenderError::UnknownKey {
                    line,
                    key: key.to_string(),
                })
            }
        };

        let number = value.parse::<f64>().map_err(|_| RenderError::BadNumber {
            line,
            key: key.to_string(),
            value: value.to_string(),
        })?;
        *field = Some(number);
        Ok(())
    }

    fn resolve(self, screen: &dyn Screen) -> Result<FractalParams> {
        let x = self.x.ok_or(RenderError::MissingField("x"))?;
        let y = self.y.ok_or(RenderError::MissingField("y"))?;
        let delta = self.delta.ok_or(RenderError::MissingField("delta"))?;
        let i_max = self.i_max.ok_or(RenderError::MissingField("i_max"))?;

        let mut cols = whole("cols", self.cols.unwrap_or(0.0))?;
        let mut rows = whole("rows", self.rows.unwrap_or(0.0))?;
        if cols == 0 || rows == 0 {
            let (default_cols, default_rows) =
                screen.default_dimensions().ok_or(RenderError::NoDimensions)?;
            if cols == 0 {
                cols = default_cols;
                info!("cols detected as {}", cols);
            }
            if rows == 0 {
                rows = default_rows;
                info!("rows detected as {}", rows);
            }
        }

        let params = FractalParams {
            cols,
            rows,
            x,
            y,
            delta,
            i_max: whole("i_max", i_max)?,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Floors a parameter to a pixel or iteration count.
fn whole(field: &'static str, value: f64) -> Result<usize> {
    if !value.is_finite() || value < 0.0 || value >= usize::MAX as f64 {
        return Err(RenderError::InvalidValue {
            field,
            expected: "a non-negative whole number",
        });
    }
    Ok(value.floor() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Headless;

    const GOOD: &str = "cols = 640\nrows = 480\nx = -0.5\ny = 0\ndelta = 0.005\ni_max = 2000\n";

    #[test]
    fn parses_a_complete_file() {
        let params = FractalParams::parse(GOOD, &Headless::new()).unwrap();
        assert_eq!(
            params,
            FractalParams {
                cols: 640,
                rows: 480,
                x: -0.5,
                y: 0.0,
                delta: 0.005,
                i_max: 2000,
            }
        );
        assert_eq!(params.len(), 640 * 480);
    }

    #[test]
    fn keys_are_case_insensitive_and_comments_skipped() {
        let text = "# a comment\n\nCOLS=10\nRows = 12.9\nX = 1\nY = 2\nDelta = 0.5\nI_MAX = 30.7\n";
        let params = FractalParams::parse(text, &Headless::new()).unwrap();
        assert_eq!(params.cols, 10);
        assert_eq!(params.rows, 12);
        assert_eq!(params.i_max, 30);
    }

    #[test]
    fn unknown_keys_are_fatal() {
        let text = format!("{}zoom = 3\n", GOOD);
        match FractalParams::parse(&text, &Headless::new()) {
            Err(RenderError::UnknownKey { line, key }) => {
                assert_eq!(line, 7);
                assert_eq!(key, "zoom");
            }
            other => panic!("expected an unknown key, got {:?}", other),
        }
    }

    #[test]
    fn lines_without_an_equals_sign_are_fatal() {
        let text = "cols 640\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::Malformed { line: 1, .. }) => {}
            other => panic!("expected a malformed line, got {:?}", other),
        }
    }

    #[test]
    fn values_must_be_numbers() {
        let text = "x = left\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::BadNumber { key, .. }) => assert_eq!(key, "x"),
            other => panic!("expected a bad number, got {:?}", other),
        }
    }

    #[test]
    fn required_fields_must_be_present() {
        let text = "cols = 4\nrows = 4\nx = 0\ny = 0\ni_max = 50\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::MissingField("delta")) => {}
            other => panic!("expected missing delta, got {:?}", other),
        }
    }

    #[test]
    fn zero_is_a_perfectly_good_center() {
        let text = "cols = 4\nrows = 4\nx = 0\ny = 0\ndelta = 1.0\ni_max = 50\n";
        let params = FractalParams::parse(text, &Headless::new()).unwrap();
        assert_eq!(params.x, 0.0);
        assert_eq!(params.y, 0.0);
    }

    #[test]
    fn missing_dimensions_come_from_the_screen() {
        let text = "rows = 0\nx = 0\ny = 0\ndelta = 0.01\ni_max = 100\n";
        let params = FractalParams::parse(text, &Headless::with_dimensions(320, 200)).unwrap();
        assert_eq!((params.cols, params.rows), (320, 200));

        let text = "rows = 50\nx = 0\ny = 0\ndelta = 0.01\ni_max = 100\n";
        let params = FractalParams::parse(text, &Headless::with_dimensions(320, 200)).unwrap();
        assert_eq!((params.cols, params.rows), (320, 50));
    }

    #[test]
    fn missing_dimensions_without_a_default_are_fatal() {
        let text = "x = 0\ny = 0\ndelta = 0.01\ni_max = 100\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::NoDimensions) => {}
            other => panic!("expected no dimensions, got {:?}", other),
        }
    }

    #[test]
    fn delta_must_be_positive() {
        let text = "cols = 4\nrows = 4\nx = 0\ny = 0\ndelta = -1\ni_max = 50\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::InvalidValue { field: "delta", .. }) => {}
            other => panic!("expected an invalid delta, got {:?}", other),
        }
    }

    #[test]
    fn dimensions_too_large_to_allocate_are_refused() {
        let text = "cols = 1e20\nrows = 10\nx = 0\ny = 0\ndelta = 0.01\ni_max = 100\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::InvalidValue { field: "cols", .. }) => {}
            other => panic!("expected oversized cols, got {:?}", other),
        }

        let text = "cols = 1e19\nrows = 1e19\nx = 0\ny = 0\ndelta = 0.01\ni_max = 100\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::InvalidValue { field: "cols/rows", .. }) => {}
            other => panic!("expected an oversized image, got {:?}", other),
        }

        let text = "cols = 4294967296\nrows = 4294967296\nx = 0\ny = 0\ndelta = 0.01\ni_max = 100\n";
        match FractalParams::parse(text, &Headless::new()) {
            Err(RenderError::InvalidValue { field: "cols/rows", .. }) => {}
            other => panic!("expected an oversized image, got {:?}", other),
        }

        let huge = FractalParams {
            cols: usize::MAX / 2,
            rows: 3,
            x: 0.0,
            y: 0.0,
            delta: 0.01,
            i_max: 100,
        };
        assert!(!huge.is_empty());
        assert!(huge.validate().is_err());
    }

    #[test]
    fn framing_centers_on_the_origin() {
        let params = FractalParams::parse(GOOD, &Headless::new()).unwrap().framed();
        assert_eq!((params.x, params.y), (0.0, 0.0));
        assert_eq!(params.delta, 4.0 / 480.0);
        assert_eq!(params.i_max, 2000);
    }
}
