// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The image accumulator: one additive colour cell per pixel, and the
//! hit records that get added to it.
//!
//! Only the coordinator ever holds the accumulator mutably; workers
//! describe what they want added as [`HitRecord`]s and ship them over
//! their slot channel.  Additions saturate per channel, so a cell
//! ends up at `min(255, sum of increments)` in each channel no matter
//! which order the records arrive in.

use std::ops::Add;

/// One four-channel pixel: alpha, red, green, blue.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Argb {
    /// Alpha.
    pub a: u8,
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Argb {
    /// Transparent black, the starting value of every cell.
    pub const ZERO: Argb = Argb::new(0, 0, 0, 0);

    /// Build a pixel from its four channels.
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Argb {
        Argb { a, r, g, b }
    }

    /// Per-channel saturating addition.
    pub fn saturating_add(self, other: Argb) -> Argb {
        Argb {
            a: self.a.saturating_add(other.a),
            r: self.r.saturating_add(other.r),
            g: self.g.saturating_add(other.g),
            b: self.b.saturating_add(other.b),
        }
    }

    /// Whether any colour channel is lit.  Alpha doesn't count.
    pub fn is_lit(&self) -> bool {
        self.r != 0 || self.g != 0 || self.b != 0
    }

    /// Sum of the colour channels.
    pub fn brightness(&self) -> u64 {
        u64::from(self.r) + u64::from(self.g) + u64::from(self.b)
    }
}

impl Add for Argb {
    type Output = Argb;

    fn add(self, other: Argb) -> Argb {
        self.saturating_add(other)
    }
}

/// A resolved pixel offset plus the amount to add there.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HitRecord {
    /// Row-major index into the accumulator.
    pub offset: usize,
    /// What gets added to the cell.
    pub increment: Argb,
}

impl HitRecord {
    /// A hit at `offset`.
    pub fn new(offset: usize, increment: Argb) -> HitRecord {
        HitRecord { offset, increment }
    }
}

/// A `rows × cols` grid of additive cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Accumulator {
    cols: usize,
    rows: usize,
    cells: Vec<Argb>,
}

impl Accumulator {
    /// A black, transparent image.
    pub fn new(cols: usize, rows: usize) -> Accumulator {
        Accumulator {
            cols,
            rows,
            cells: vec![Argb::ZERO; cols * rows],
        }
    }

    /// Width in pixels.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Height in pixels.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the image has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[Argb] {
        &self.cells
    }

    /// The cell at `col`, `row`, if it exists.
    pub fn get(&self, col: usize, row: usize) -> Option<Argb> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells.get(row * self.cols + col).cloned()
    }

    /// Add a batch of hits, in order.  Returns how many landed; a
    /// record whose offset is outside the image is skipped.
    pub fn apply(&mut self, records: &[HitRecord]) -> usize {
        let mut applied = 0;
        for record in records {
            if let Some(cell) = self.cells.get_mut(record.offset) {
                *cell = cell.saturating_add(record.increment);
                applied += 1;
            }
        }
        applied
    }

    /// Fix alpha at fully opaque, ready for encoding.
    pub fn finalize(&mut self) {
        for cell in &mut self.cells {
            cell.a = 255;
        }
    }

    /// Number of cells with any colour in them.
    pub fn lit_cells(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_lit()).count()
    }

    /// Sum of every colour channel of every cell.
    pub fn total(&self) -> u64 {
        self.cells.iter().map(Argb::brightness).sum()
    }

    /// The cells as RGBA bytes, the layout image encoders want.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.cells.len() * 4);
        for cell in &self.cells {
            bytes.extend_from_slice(&[cell.r, cell.g, cell.b, cell.a]);
        }
        bytes
    }

    /// Rebuild an accumulator from RGBA bytes.  Returns `None` when the
    /// byte count doesn't match the dimensions.
    pub fn from_rgba(cols: usize, rows: usize, bytes: &[u8]) -> Option<Accumulator> {
        if bytes.len() != cols * rows * 4 {
            return None;
        }
        let cells = bytes
            .chunks(4)
            .map(|px| Argb::new(px[3], px[0], px[1], px[2]))
            .collect();
        Some(Accumulator { cols, rows, cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    const HIT: Argb = Argb::new(0, 1, 1, 0);

    #[test]
    fn channels_saturate_instead_of_carrying() {
        let a = Argb::new(0, 250, 10, 255);
        let b = Argb::new(0, 10, 10, 1);
        assert_eq!(a + b, Argb::new(0, 255, 20, 255));
    }

    #[test]
    fn apply_adds_in_place() {
        let mut acc = Accumulator::new(3, 2);
        let applied = acc.apply(&[
            HitRecord::new(0, HIT),
            HitRecord::new(5, HIT),
            HitRecord::new(5, HIT),
        ]);
        assert_eq!(applied, 3);
        assert_eq!(acc.get(0, 0), Some(HIT));
        assert_eq!(acc.get(2, 1), Some(Argb::new(0, 2, 2, 0)));
        assert_eq!(acc.lit_cells(), 2);
        assert_eq!(acc.total(), 6);
    }

    #[test]
    fn out_of_range_records_are_skipped() {
        let mut acc = Accumulator::new(2, 2);
        assert_eq!(acc.apply(&[HitRecord::new(4, HIT), HitRecord::new(3, HIT)]), 1);
        assert_eq!(acc.get(2, 0), None);
        assert_eq!(acc.total(), 2);
    }

    #[test]
    fn application_order_does_not_matter() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut records: Vec<HitRecord> = (0..20_000)
            .map(|_| {
                let lift = rng.gen_range(0, 4);
                HitRecord::new(rng.gen_range(0, 64), Argb::new(0, lift, 1, lift * 2))
            })
            .collect();

        let mut forwards = Accumulator::new(8, 8);
        for batch in records.chunks(97) {
            forwards.apply(batch);
        }

        records.shuffle(&mut rng);
        let mut shuffled = Accumulator::new(8, 8);
        for batch in records.chunks(31) {
            shuffled.apply(batch);
        }

        assert_eq!(forwards, shuffled);
    }

    #[test]
    fn finalize_makes_everything_opaque() {
        let mut acc = Accumulator::new(2, 1);
        acc.apply(&[HitRecord::new(1, HIT)]);
        acc.finalize();
        assert_eq!(acc.cells(), &[Argb::new(255, 0, 0, 0), Argb::new(255, 1, 1, 0)]);
        assert_eq!(acc.lit_cells(), 1);
    }

    #[test]
    fn rgba_bytes_round_trip() {
        let mut acc = Accumulator::new(2, 2);
        acc.apply(&[HitRecord::new(2, Argb::new(9, 1, 2, 3))]);
        let bytes = acc.to_rgba();
        assert_eq!(&bytes[8..12], &[1, 2, 3, 9]);
        assert_eq!(Accumulator::from_rgba(2, 2, &bytes), Some(acc));
        assert_eq!(Accumulator::from_rgba(3, 2, &bytes), None);
    }
}
