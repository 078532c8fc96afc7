// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Binary raster masks and the geometric helpers built on top of them.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A fixed-shape binary raster: `1` where a segment or background covers the
/// pixel, `0` elsewhere.
///
/// Masks are supplied by the external segmenter and are never mutated by the
/// engine; they serialize as 2-D integer arrays of `{0, 1}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask(Array2<u8>);

impl Mask {
    /// Builds a mask from a dense row-major raster. Panics if any value is
    /// not `0` or `1` — masks are binary by construction.
    pub fn new(data: Array2<u8>) -> Self {
        debug_assert!(
            data.iter().all(|&v| v == 0 || v == 1),
            "mask raster must be binary"
        );
        Self(data)
    }

    pub fn shape(&self) -> (usize, usize) {
        let dim = self.0.dim();
        (dim.0, dim.1)
    }

    /// `size = ||mask||₁`.
    pub fn popcount(&self) -> u64 {
        self.0.iter().map(|&v| u64::from(v)).sum()
    }

    pub fn is_set(&self, row: usize, col: usize) -> bool {
        self.0[[row, col]] != 0
    }

    pub fn as_array(&self) -> &Array2<u8> {
        &self.0
    }

    fn foreground_coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let (h, w) = self.shape();
        (0..h).flat_map(move |r| (0..w).filter_map(move |c| self.is_set(r, c).then_some((r, c))))
    }

    /// Whether `self` and `other` share any foreground pixel.
    pub fn overlaps(&self, other: &Mask) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        self.0.iter().zip(other.0.iter()).any(|(&a, &b)| a != 0 && b != 0)
    }
}

impl Serialize for Mask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let (h, w) = self.shape();
        let mut rows = Vec::with_capacity(h);
        for r in 0..h {
            let mut row = Vec::with_capacity(w);
            for c in 0..w {
                row.push(u8::from(self.is_set(r, c)));
            }
            rows.push(row);
        }
        rows.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Mask {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let rows: Vec<Vec<u8>> = Vec::deserialize(deserializer)?;
        let h = rows.len();
        let w = rows.first().map_or(0, Vec::len);
        let mut data = Array2::zeros((h, w));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, v) in row.into_iter().enumerate() {
                data[[r, c]] = v;
            }
        }
        Ok(Mask::new(data))
    }
}

/// Minimum exact Euclidean distance (in pixels) between the foreground of
/// `a` and the foreground of `b`, minus one so that touching masks report a
/// separation of zero.
///
/// Overlapping masks are defined to have separation `0` without computing a
/// distance at all — callers should not rely on this being a real pairwise
/// minimum once masks overlap.
pub fn pixel_separation(a: &Mask, b: &Mask) -> f64 {
    if a.overlaps(b) {
        return 0.0;
    }

    let mut min_dist_sq = f64::INFINITY;
    let b_coords: Vec<(usize, usize)> = b.foreground_coords().collect();

    for (ar, ac) in a.foreground_coords() {
        for &(br, bc) in &b_coords {
            let dr = ar as f64 - br as f64;
            let dc = ac as f64 - bc as f64;
            let d_sq = dr * dr + dc * dc;
            if d_sq < min_dist_sq {
                min_dist_sq = d_sq;
            }
        }
    }

    if min_dist_sq.is_infinite() {
        // One of the masks is empty; segment validation rejects a zero-mask
        // segment before this is ever reached, but don't propagate infinity
        // into a cost.
        return 0.0;
    }

    (min_dist_sq.sqrt() - 1.0).max(0.0)
}
