//! Contains the PlaneMapper struct, which describes a relationship
//! between a rectangle on the integral plane with an origin at 0,0,
//! and a window onto the complex plane described by its center and
//! the distance between adjacent pixels.
use num::Complex;

use crate::errors::Result;
use crate::params::FractalParams;

/// Describes the width and height of an integral plane that is assumed to start at
/// 0,0 and all values are assumed to be non-negative integers.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// Describes the column, row of a pixel in the integral plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Contains the definitions of two planes: an integral cartesian plane,
/// and a complex, real cartesian plane.  Maps points from one to the
/// other.  Columns run along the real axis and rows along the
/// imaginary axis.
#[derive(Debug, Clone)]
pub struct PlaneMapper {
    /// The size of the integral cartesian plane, columns then rows.
    pub integral_plane: IntegralPlane,
    /// The point on the complex plane that pixel 0,0 maps to.
    pub origin: Complex<f64>,
    // The width and height of one pixel on the complex plane.
    delta: f64,
}

impl PlaneMapper {
    /// Constructor.  The image is centered on `x + yi`, each pixel
    /// `delta` wide and tall.
    pub fn new(params: &FractalParams) -> Result<PlaneMapper> {
        params.validate()?;

        let x_min = params.x - (params.delta * params.cols as f64 / 2.0);
        let y_min = params.y - (params.delta * params.rows as f64 / 2.0);

        Ok(PlaneMapper {
            integral_plane: IntegralPlane(params.cols, params.rows),
            origin: Complex::new(x_min, y_min),
            delta: params.delta,
        })
    }

    /// The total number of points in the integral grid.  Used to
    /// calculate memory needs.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Describes that the integral plane is of a size.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// The distance between adjacent pixels on the complex plane.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Given a pixel on the integral cartesian plane, map it to the
    /// complex plane.  `jitter` nudges the point along the imaginary
    /// axis so a pixel can be sampled at several sub-pixel positions.
    pub fn pixel_to_point(&self, pixel: &Pixel, jitter: f64) -> Complex<f64> {
        Complex::new(
            self.origin.re + (pixel.0 as f64) * self.delta,
            self.origin.im + (pixel.1 as f64) * self.delta + jitter,
        )
    }

    /// Given a complex number corresponding to a location on the
    /// complex cartesian plane, return the pixel it falls into, if it
    /// falls into the image at all.
    pub fn point_to_pixel(&self, point: &Complex<f64>) -> Option<Pixel> {
        let left = (point.re - self.origin.re) / self.delta;
        let top = (point.im - self.origin.im) / self.delta;
        // Written so NaN fails both comparisons.
        if !(left >= 0.0
            && left < (self.integral_plane.0 as f64)
            && top >= 0.0
            && top < (self.integral_plane.1 as f64))
        {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }

    /// The pixel an orbit value is plotted at.  The orbit's imaginary
    /// part picks the column and its real part the row, which turns
    /// the Buddhabrot upright.
    pub fn orbit_to_pixel(&self, z: &Complex<f64>) -> Option<Pixel> {
        self.point_to_pixel(&Complex::new(z.im, z.re))
    }

    /// The linear offset of a pixel from the root of the image buffer.
    pub fn pixel_to_offset(&self, pixel: &Pixel) -> usize {
        pixel.1 * self.integral_plane.0 + pixel.0
    }

    /// Since the Buddhabrot actually tracks the progress of a complex
    /// number as it orbits, we have to map those complex numbers back
    /// to the pixel plane.  This function takes an orbit value, maps it
    /// to pixel coordinates, then returns the linear offset from the
    /// root of the image buffer.
    pub fn orbit_to_offset(&self, z: &Complex<f64>) -> Option<usize> {
        self.orbit_to_pixel(z).map(|pixel| self.pixel_to_offset(&pixel))
    }
}
