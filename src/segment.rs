// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Immutable candidate-segment descriptors and per-frame containers of
//! candidate segmentations.

use serde::{Deserialize, Serialize};

use crate::mask::Mask;

/// A candidate cell region within one frame.
///
/// `Segment` is logically immutable once delivered by the external
/// segmenter: the engine never recomputes `mask`/`centroid`/`size`/etc, and
/// never mutates a `Segment` during a build. Transient incoming/outgoing
/// assignment back-references live in a build-scoped
/// [`crate::graph::SegmentContext`] arena instead, indexed in parallel with
/// the segment arena, so segments stay cheap to share across builds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Unique integer within the enclosing frame's flattened segment list.
    pub seg_id: u32,

    pub frame_id: u32,

    /// Name of the `Segmentation` this candidate came from.
    pub name: String,

    /// Persisted as `mask_image` (§6): a 2-D array of `{0, 1}`.
    #[serde(rename = "mask_image")]
    pub mask: Mask,

    /// (row, column) in pixels.
    pub centroid: (f64, f64),

    /// Pixel count; must equal `mask.popcount()`.
    pub size: u64,

    /// Isoperimetric quotient `4π·area / perimeter²`, in `[0, 1]`.
    pub compactness: f64,

    pub channel_intensities: Vec<f64>,

    /// Indices of other candidate segments in the same frame's flattened
    /// segment list whose mask overlaps this one. Symmetric and reflexive
    /// by construction: `a ∈ conflicts(b) ⟺ b ∈ conflicts(a)`, and
    /// `a ∈ conflicts(a)`.
    pub conflicts: Vec<u32>,

    /// If true, division assignments involving this segment are suppressed.
    #[serde(default)]
    pub manually_chosen: bool,
}

impl Segment {
    /// Checks the invariants a segment must satisfy before it may enter a
    /// build: non-empty mask, size matching popcount, centroid inside the
    /// mask's bounding box.
    pub fn validate(&self) -> Result<(), String> {
        if self.size == 0 || self.mask.popcount() == 0 {
            return Err(format!(
                "segment {}/{} has zero-pixel mask",
                self.frame_id, self.seg_id
            ));
        }
        if self.mask.popcount() != self.size {
            return Err(format!(
                "segment {}/{} size {} does not match mask popcount {}",
                self.frame_id,
                self.seg_id,
                self.size,
                self.mask.popcount()
            ));
        }
        let (h, w) = self.mask.shape();
        if self.centroid.0 < 0.0
            || self.centroid.1 < 0.0
            || self.centroid.0 >= h as f64
            || self.centroid.1 >= w as f64
        {
            return Err(format!(
                "segment {}/{} centroid {:?} lies outside mask bounds {:?}",
                self.frame_id, self.seg_id, self.centroid, (h, w)
            ));
        }
        Ok(())
    }
}

/// One named candidate segmentation of a frame.
///
/// A frame may hold multiple `Segmentation`s from different segmenters or
/// parameter choices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    pub name: String,
    pub segmentation_channel_id: u32,
    pub background_mask: Mask,
    pub background_intensities: Vec<f64>,
    pub segments: Vec<Segment>,
}

/// One processed frame: its shape, opaque channel filenames, and the
/// `Segmentation`s competing to describe it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFrame {
    pub frame_no: u32,
    pub frame_shape: (usize, usize),
    pub image_names: Vec<String>,
    pub segmentations: Vec<Segmentation>,
}

impl ProcessedFrame {
    /// All segments in this frame, in the flattened order the graph builder
    /// uses for conflict-clique indexing: every `Segmentation`'s `segments`,
    /// concatenated in list order.
    pub fn flattened_segments(&self) -> impl Iterator<Item = &Segment> {
        self.segmentations.iter().flat_map(|s| s.segments.iter())
    }
}
