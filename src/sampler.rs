// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The trajectory samplers.  A sampler walks one row of the image at
//! one sub-pixel offset and turns what it finds into [`HitRecord`]s.
//!
//! The Buddhabrot sampler is the interesting one.  Every pixel is
//! iterated under `z ← z² + c`; the points that escape are iterated a
//! second time, and every step of that second orbit (after a short
//! warm-up) lands as a hit on whatever pixel the orbit passes over.
//! Points that never escape contribute nothing.
//!
//! The escape-time sampler is the plain Mandelbrot: one hit per
//! escaping pixel, coloured by how long it took to escape.

use num::Complex;
use std::ops::AddAssign;

use crate::accumulator::{Argb, HitRecord};
use crate::errors::Result;
use crate::params::FractalParams;
use crate::planes::{Pixel, PlaneMapper};

/// Orbit steps skipped before plotting; they only add background fog.
pub const WARMUP: usize = 20;

/// What each Buddhabrot hit adds: one unit of red and one of green.
pub const HIT_COLOUR: Argb = Argb::new(0, 1, 1, 0);

/// Sub-pixel passes per render unless told otherwise.
pub const DEFAULT_PASSES: usize = 8;

/// Somewhere to put hit records as they're produced.
pub trait HitSink {
    /// Accept one record.  Fails only if the records can no longer be
    /// delivered anywhere.
    fn hit(&mut self, record: HitRecord) -> Result<()>;
}

impl HitSink for Vec<HitRecord> {
    fn hit(&mut self, record: HitRecord) -> Result<()> {
        self.push(record);
        Ok(())
    }
}

/// Counters kept while sampling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleStats {
    /// Points iterated.
    pub points: u64,
    /// Points that escaped before `i_max`.
    pub escaped: u64,
    /// Hit records emitted.
    pub hits: u64,
}

impl AddAssign for SampleStats {
    fn add_assign(&mut self, other: SampleStats) {
        self.points += other.points;
        self.escaped += other.escaped;
        self.hits += other.hits;
    }
}

/// A way of turning rows of the image into hits.
pub trait Sampler: Sync {
    /// The plane the sampler maps through.
    fn plane(&self) -> &PlaneMapper;

    /// How many sub-pixel passes this sampler wants by default.
    fn default_passes(&self) -> usize;

    /// Sample every column of `row`, shifted by `jitter`, into `sink`.
    fn sample_row<K: HitSink>(&self, row: usize, jitter: f64, sink: &mut K) -> Result<SampleStats>;
}

/// This is our classic iterator function, which either returns the
/// index of the iteration at which `|z|² > 4`, or nothing at all if
/// the point is still bounded after `i_max` iterations.
pub fn escape_time(c: Complex<f64>, i_max: usize) -> Option<usize> {
    let mut z = Complex::new(0.0_f64, 0.0_f64);
    for i in 0..i_max {
        z = z * z + c;
        if z.norm_sqr() > 4.0 {
            return Some(i);
        }
    }
    None
}

/// The sub-pixel offsets for `passes` passes: `k·delta/passes` for
/// `k` in `0..passes`.
pub fn jitter_offsets(delta: f64, passes: usize) -> Vec<f64> {
    (0..passes)
        .map(|k| delta * (k as f64) / (passes as f64))
        .collect()
}

/// The trajectory-density renderer.
#[derive(Debug, Clone)]
pub struct Buddhabrot {
    plane: PlaneMapper,
    i_max: usize,
}

impl Buddhabrot {
    /// A sampler for the given parameters.
    pub fn new(params: &FractalParams) -> Result<Buddhabrot> {
        Ok(Buddhabrot {
            plane: PlaneMapper::new(params)?,
            i_max: params.i_max,
        })
    }

    /// Iterate one point and, if it escapes, plot its orbit.
    pub fn trace<K: HitSink>(&self, c: Complex<f64>, sink: &mut K) -> Result<SampleStats> {
        let mut stats = SampleStats {
            points: 1,
            ..SampleStats::default()
        };
        if let Some(i) = escape_time(c, self.i_max) {
            stats.escaped = 1;
            stats.hits = self.replay(c, i, sink)?;
        }
        Ok(stats)
    }

    /// Walk the first `steps` values of the orbit of `c` again and
    /// emit a hit for each one past the warm-up that lands inside the
    /// image.  Returns the number of hits.
    pub fn replay<K: HitSink>(&self, c: Complex<f64>, steps: usize, sink: &mut K) -> Result<u64> {
        let mut hits = 0;
        let mut z = Complex::new(0.0_f64, 0.0_f64);
        for j in 0..steps {
            z = z * z + c;
            if z.norm_sqr() > 4.0 {
                break;
            }
            if j < WARMUP {
                continue;
            }
            if let Some(offset) = self.plane.orbit_to_offset(&z) {
                sink.hit(HitRecord::new(offset, HIT_COLOUR))?;
                hits += 1;
            }
        }
        Ok(hits)
    }
}

impl Sampler for Buddhabrot {
    fn plane(&self) -> &PlaneMapper {
        &self.plane
    }

    fn default_passes(&self) -> usize {
        DEFAULT_PASSES
    }

    fn sample_row<K: HitSink>(&self, row: usize, jitter: f64, sink: &mut K) -> Result<SampleStats> {
        let mut stats = SampleStats::default();
        for column in 0..self.plane.integral_plane.0 {
            let c = self.plane.pixel_to_point(&Pixel(column, row), jitter);
            stats += self.trace(c, sink)?;
        }
        Ok(stats)
    }
}

/// The plain Mandelbrot, coloured by escape time.
#[derive(Debug, Clone)]
pub struct EscapeTime {
    plane: PlaneMapper,
    i_max: usize,
}

impl EscapeTime {
    /// A sampler for the given parameters.
    pub fn new(params: &FractalParams) -> Result<EscapeTime> {
        Ok(EscapeTime {
            plane: PlaneMapper::new(params)?,
            i_max: params.i_max,
        })
    }
}

impl Sampler for EscapeTime {
    fn plane(&self) -> &PlaneMapper {
        &self.plane
    }

    fn default_passes(&self) -> usize {
        1
    }

    fn sample_row<K: HitSink>(&self, row: usize, jitter: f64, sink: &mut K) -> Result<SampleStats> {
        let mut stats = SampleStats::default();
        for column in 0..self.plane.integral_plane.0 {
            let pixel = Pixel(column, row);
            let c = self.plane.pixel_to_point(&pixel, jitter);
            stats.points += 1;
            if let Some(i) = escape_time(c, self.i_max) {
                let offset = self.plane.pixel_to_offset(&pixel);
                sink.hit(HitRecord::new(offset, colour_map(i, self.i_max)))?;
                stats.escaped += 1;
                stats.hits += 1;
            }
        }
        Ok(stats)
    }
}

fn interpolate(x: f64, x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> f64 {
    let x = (x - x_min) / (x_max - x_min);
    x * (y_max - y_min) + y_min
}

/// A simplified hue ramp: `i / (i_max + 1)` is the hue, saturation
/// and value are fixed at 0.8.  Always fully opaque.
pub fn colour_map(i: usize, i_max: usize) -> Argb {
    const SATURATION: f64 = 0.8;
    const VALUE: f64 = 0.8;
    let v_min = VALUE * (1.0 - SATURATION);
    let hue = (i as f64) / ((i_max + 1) as f64);

    let (r, g, b) = if hue < 0.25 {
        (VALUE, interpolate(hue, 0.0, 0.25, v_min, VALUE), v_min)
    } else if hue < 0.5 {
        (interpolate(hue, 0.25, 0.5, VALUE, v_min), VALUE, v_min)
    } else if hue < 0.75 {
        (v_min, VALUE, interpolate(hue, 0.5, 0.75, v_min, VALUE))
    } else {
        (v_min, interpolate(hue, 0.75, 1.0, VALUE, v_min), VALUE)
    };

    let channel = |v: f64| (v * 255.0) as u8;
    Argb::new(255, channel(r), channel(g), channel(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(cols: usize, rows: usize, delta: f64, i_max: usize) -> FractalParams {
        FractalParams {
            cols,
            rows,
            x: 0.0,
            y: 0.0,
            delta,
            i_max,
        }
    }

    /// Scan the real axis just right of the cusp, where escape times
    /// fall slowly, for a point escaping at exactly `wanted`.
    fn point_escaping_at(wanted: usize) -> Complex<f64> {
        let mut re = 0.26;
        while re < 0.5 {
            let c = Complex::new(re, 0.0);
            if escape_time(c, 1000) == Some(wanted) {
                return c;
            }
            re += 1e-5;
        }
        panic!("nothing escapes at {}", wanted);
    }

    #[test]
    fn escape_time_finds_the_bounded_set() {
        assert_eq!(escape_time(Complex::new(0.0, 0.0), 500), None);
        assert_eq!(escape_time(Complex::new(-1.0, 0.0), 500), None);
        assert_eq!(escape_time(Complex::new(-2.0, 0.0), 500), None);
        assert_eq!(escape_time(Complex::new(2.0, 2.0), 500), Some(0));
        assert_eq!(escape_time(Complex::new(1.0, 0.0), 500), Some(2));
    }

    #[test]
    fn jitter_offsets_divide_the_pixel_evenly() {
        assert_eq!(jitter_offsets(1.0, 8), vec![0.0, 0.125, 0.25, 0.375, 0.5, 0.625, 0.75, 0.875]);
        assert_eq!(jitter_offsets(0.5, 1), vec![0.0]);
    }

    #[test]
    fn warmup_suppresses_short_orbits() {
        let sampler = Buddhabrot::new(&params(4, 4, 1.0, 100)).unwrap();
        // The orbit of zero stays at zero, in the middle of the image.
        let mut hits: Vec<HitRecord> = vec![];
        assert_eq!(sampler.replay(Complex::new(0.0, 0.0), 20, &mut hits).unwrap(), 0);
        assert!(hits.is_empty());
        assert_eq!(sampler.replay(Complex::new(0.0, 0.0), 21, &mut hits).unwrap(), 1);
        assert_eq!(hits, vec![HitRecord::new(10, HIT_COLOUR)]);
    }

    #[test]
    fn escaping_at_twenty_plots_nothing_and_at_twenty_one_plots_once() {
        let sampler = Buddhabrot::new(&params(4, 4, 1.0, 1000)).unwrap();

        let mut hits: Vec<HitRecord> = vec![];
        let stats = sampler.trace(point_escaping_at(20), &mut hits).unwrap();
        assert_eq!(stats, SampleStats { points: 1, escaped: 1, hits: 0 });
        assert!(hits.is_empty());

        let stats = sampler.trace(point_escaping_at(21), &mut hits).unwrap();
        assert_eq!(stats, SampleStats { points: 1, escaped: 1, hits: 1 });
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn bounded_points_plot_nothing() {
        let sampler = Buddhabrot::new(&params(4, 4, 1.0, 200)).unwrap();
        let mut hits: Vec<HitRecord> = vec![];
        let stats = sampler.trace(Complex::new(-0.1, 0.1), &mut hits).unwrap();
        assert_eq!(stats, SampleStats { points: 1, escaped: 0, hits: 0 });
        assert!(hits.is_empty());
    }

    #[test]
    fn rows_are_sampled_column_by_column() {
        let sampler = Buddhabrot::new(&params(64, 64, 4.0 / 64.0, 300)).unwrap();
        let mut hits: Vec<HitRecord> = vec![];
        let mut stats = SampleStats::default();
        for row in 0..64 {
            stats += sampler.sample_row(row, 0.0, &mut hits).unwrap();
        }
        assert_eq!(stats.points, 64 * 64);
        assert!(stats.escaped > 0);
        assert_eq!(stats.hits, hits.len() as u64);
        assert!(hits.iter().all(|h| h.offset < 64 * 64 && h.increment == HIT_COLOUR));
    }

    #[test]
    fn sampling_is_deterministic() {
        let sampler = Buddhabrot::new(&params(32, 32, 4.0 / 32.0, 200)).unwrap();
        let mut first: Vec<HitRecord> = vec![];
        let mut second: Vec<HitRecord> = vec![];
        sampler.sample_row(11, 0.125 * 4.0 / 32.0, &mut first).unwrap();
        sampler.sample_row(11, 0.125 * 4.0 / 32.0, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn escape_time_colours_only_escaping_pixels() {
        let sampler = EscapeTime::new(&params(8, 8, 0.5, 100)).unwrap();
        let mut hits: Vec<HitRecord> = vec![];
        let stats = sampler.sample_row(4, 0.0, &mut hits).unwrap();
        assert_eq!(stats.points, 8);
        assert_eq!(stats.hits, stats.escaped);
        // Row 4 is the real axis: -2 (bounded) through 1.5 (escapes).
        assert!(hits.iter().all(|h| h.offset >= 32 && h.offset < 40));
        assert!(!hits.iter().any(|h| h.offset == 32));
        assert!(hits.iter().any(|h| h.offset == 39));
        assert!(hits.iter().all(|h| h.increment.a == 255));
    }

    #[test]
    fn colour_map_walks_the_hue_ramp() {
        assert_eq!(colour_map(0, 99), Argb::new(255, 204, 40, 40));
        assert_eq!(colour_map(99, 99), Argb::new(255, 40, 47, 204));
    }
}
