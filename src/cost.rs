// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Pure numeric cost functions mapping segments (and segment pairs/triples)
//! to the costs biasing the factor graph toward biologically plausible
//! solutions.
//!
//! Every function here is stateless given a [`CostParameters`]; none of them
//! touch the MILP model or the segment arena. That's what makes the cost
//! computations embarrassingly parallel even though nothing in this crate
//! currently parallelizes them.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::mask::pixel_separation;
use crate::segment::Segment;

/// Tunable parameters for the cost model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostParameters {
    /// Normalizer for the conflict-count reward.
    pub max_conflicts: f64,
    pub conflict_min_cost: f64,
    pub conflict_max_cost: f64,
    pub compactness_min_cost: f64,
    pub compactness_max_cost: f64,
    pub compactness_mid_point: f64,
    pub compactness_slope: f64,
    /// Constant cost of an EXIT assignment.
    pub exit_cost: f64,
    /// Multiplies `|segment_cost|` to yield the appearance cost.
    pub appearance_cost_scale: f64,
    /// Prune threshold: a candidate `DivisionNode` is dropped if its cost is
    /// at or above this value.
    pub max_cost: f64,
}

impl Default for CostParameters {
    /// The parameters the original tool's curation GUI hard-codes
    /// (`CostParameters(1, 1, 3, 1, 3, 0.66, 20, 0, 2, 30)` in
    /// `GUI/TrackingEditor.py`), not invented round numbers: benefits live in
    /// `[1, 3]` rather than `[0, 0.5]`, and `max_cost = 30` gives the
    /// division-cost threshold (whose own logistic multipliers only range
    /// over `[0, 0.25]`, see [`CostCalculator::division_cost`]) enough
    /// headroom that ordinary mother/daughter size mismatches stay below it.
    fn default() -> Self {
        Self {
            max_conflicts: 1.0,
            conflict_min_cost: 1.0,
            conflict_max_cost: 3.0,
            compactness_min_cost: 1.0,
            compactness_max_cost: 3.0,
            compactness_mid_point: 0.66,
            compactness_slope: 20.0,
            exit_cost: 0.0,
            appearance_cost_scale: 2.0,
            max_cost: 30.0,
        }
    }
}

/// Fixed constants of the division-cost logistic multipliers. Unlike
/// [`CostParameters`], these are not exposed as tunables: they stay as
/// internal constants of the division-cost formula rather than threading
/// through `CostParameters`.
struct DivisionConstants;

impl DivisionConstants {
    const SIZE_SLOPE: f64 = 10.0;
    const SEPARATION_SLOPE: f64 = 2.0;
    const BASE_COST_OFFSET: f64 = 0.8;
    const MAX_DAUGHTER_SIZE: f64 = 230.0;
    const MIN_MOTHER_RATIO: f64 = 2.0;
    const MAX_SEPARATION: f64 = 1.0;
    /// Range of the logistic multipliers themselves — distinct from
    /// `CostParameters::max_cost`, which thresholds the *final* division
    /// cost. Named `MULTIPLIER_MAX` rather than reusing `max_cost` to keep
    /// the two from being confused.
    const MULTIPLIER_MIN: f64 = 0.0;
    const MULTIPLIER_MAX: f64 = 0.25;
}

fn sigmoid(min_val: f64, max_val: f64, slope: f64, mid_point: f64, x: f64) -> f64 {
    min_val + (max_val - min_val) / (1.0 + (-slope * (x - mid_point)).exp())
}

fn find_midpoint(min_val: f64, max_val: f64, slope: f64, x: f64, y: f64) -> f64 {
    (1.0 / slope) * (((max_val - min_val) / (y - min_val)) - 1.0).ln() + x
}

fn squared_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)
}

/// Stateless cost calculator parameterized by [`CostParameters`].
pub struct CostCalculator {
    params: CostParameters,
}

impl CostCalculator {
    pub fn new(params: CostParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CostParameters {
        &self.params
    }

    /// `segment_cost(s) = −(conflict_benefit(s) + compactness_benefit(s))`.
    ///
    /// Negative by construction: segments with many overlapping competitors
    /// and near-circular shape are more likely to be real cells and are
    /// encouraged.
    pub fn segment_cost(&self, segment: &Segment) -> f64 {
        -(self.conflict_benefit(segment) + self.compactness_benefit(segment))
    }

    fn conflict_benefit(&self, segment: &Segment) -> f64 {
        let p = &self.params;
        let scale = (p.conflict_max_cost - p.conflict_min_cost) / p.max_conflicts;
        scale * segment.conflicts.len() as f64 + p.conflict_min_cost
    }

    fn compactness_benefit(&self, segment: &Segment) -> f64 {
        let p = &self.params;
        p.compactness_min_cost
            + (p.compactness_max_cost - p.compactness_min_cost)
                / (1.0 + (-p.compactness_slope * (segment.compactness - p.compactness_mid_point)).exp())
    }

    /// `mapping_cost(old, new)`: squared separation-ratio plus squared
    /// size-ratio, each normalized so identical, co-located segments cost 0.
    pub fn mapping_cost(&self, old: &Segment, new: &Segment) -> f64 {
        let separation_squared = squared_distance(old.centroid, new.centroid);
        let radius_squared = old.size as f64 / PI;
        let separation_ratio = separation_squared / radius_squared;

        let size_ratio = old.size as f64 / new.size as f64 + new.size as f64 / old.size as f64;

        separation_ratio.powi(2) + size_ratio.powi(2) - 4.0
    }

    /// `appearance_cost(s) = −appearance_cost_scale · segment_cost(s)`.
    ///
    /// Positive by construction (`segment_cost` is itself negative),
    /// encouraging persistence once a cell has appeared.
    pub fn appearance_cost(&self, segment: &Segment) -> f64 {
        -self.params.appearance_cost_scale * self.segment_cost(segment)
    }

    /// Constant EXIT cost.
    pub fn exit_cost(&self) -> f64 {
        self.params.exit_cost
    }

    /// `division_cost(old, d1, d2)`: cost of the mother mapping plus the
    /// daughter appearing, modulated by three logistic multipliers on
    /// daughter size, mother/daughter size ratio, and inter-mask pixel
    /// separation.
    ///
    /// Ties in mother/daughter assignment use strict `<`: if the two
    /// candidates are equal in size, `new_1` is treated as the mother (see
    /// DESIGN.md).
    pub fn division_cost(&self, old: &Segment, new_1: &Segment, new_2: &Segment) -> f64 {
        let (mother, daughter) = if new_1.size < new_2.size {
            (new_2, new_1)
        } else {
            (new_1, new_2)
        };

        let separation = pixel_separation(&mother.mask, &daughter.mask);

        let threshold_cost = DivisionConstants::MULTIPLIER_MAX / 2.0;

        let separation_midpoint = find_midpoint(
            DivisionConstants::MULTIPLIER_MIN,
            DivisionConstants::MULTIPLIER_MAX,
            DivisionConstants::SEPARATION_SLOPE,
            DivisionConstants::MAX_SEPARATION,
            threshold_cost,
        );
        let separation_mult = sigmoid(
            DivisionConstants::MULTIPLIER_MIN,
            DivisionConstants::MULTIPLIER_MAX,
            DivisionConstants::SEPARATION_SLOPE,
            separation_midpoint,
            separation,
        );

        let daughter_midpoint = find_midpoint(
            DivisionConstants::MULTIPLIER_MIN,
            DivisionConstants::MULTIPLIER_MAX,
            DivisionConstants::SIZE_SLOPE,
            1.0,
            threshold_cost,
        );
        let daughter_mult = sigmoid(
            DivisionConstants::MULTIPLIER_MIN,
            DivisionConstants::MULTIPLIER_MAX,
            DivisionConstants::SIZE_SLOPE,
            daughter_midpoint,
            daughter.size as f64 / DivisionConstants::MAX_DAUGHTER_SIZE,
        );

        let mother_midpoint = find_midpoint(
            DivisionConstants::MULTIPLIER_MIN,
            DivisionConstants::MULTIPLIER_MAX,
            DivisionConstants::SIZE_SLOPE,
            DivisionConstants::MIN_MOTHER_RATIO,
            threshold_cost,
        );
        let mother_mult = sigmoid(
            DivisionConstants::MULTIPLIER_MIN,
            DivisionConstants::MULTIPLIER_MAX,
            DivisionConstants::SIZE_SLOPE,
            mother_midpoint,
            2.0 * mother_midpoint - (mother.size as f64 / daughter.size as f64),
        );

        let base_cost = self.mapping_cost(old, mother) + self.appearance_cost(daughter);

        base_cost * (DivisionConstants::BASE_COST_OFFSET + mother_mult + daughter_mult + separation_mult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    use crate::mask::Mask;

    fn seg(size: u64, centroid: (f64, f64), compactness: f64, conflicts: Vec<u32>) -> Segment {
        Segment {
            seg_id: 0,
            frame_id: 0,
            name: "t".into(),
            mask: Mask::new(array![[1, 1], [1, 1]]),
            centroid,
            size,
            compactness,
            channel_intensities: vec![],
            conflicts,
            manually_chosen: false,
        }
    }

    #[test]
    fn mapping_cost_is_zero_for_identical_segments() {
        let calc = CostCalculator::new(CostParameters::default());
        let a = seg(100, (10.0, 10.0), 0.9, vec![]);
        let b = a.clone();
        assert!((calc.mapping_cost(&a, &b)).abs() < 1e-9);
    }

    #[test]
    fn mapping_cost_grows_with_size_mismatch() {
        let calc = CostCalculator::new(CostParameters::default());
        let a = seg(100, (10.0, 10.0), 0.9, vec![]);
        let b = seg(400, (10.0, 10.0), 0.9, vec![]);
        assert!(calc.mapping_cost(&a, &b) > 0.0);
    }

    #[test]
    fn more_conflicts_and_better_compactness_lower_segment_cost() {
        let calc = CostCalculator::new(CostParameters::default());
        let round_crowded = seg(100, (0.0, 0.0), 0.95, vec![1, 2, 3]);
        let angular_isolated = seg(100, (0.0, 0.0), 0.2, vec![]);
        assert!(calc.segment_cost(&round_crowded) < calc.segment_cost(&angular_isolated));
    }

    #[test]
    fn appearance_cost_is_positive() {
        let calc = CostCalculator::new(CostParameters::default());
        let s = seg(100, (0.0, 0.0), 0.9, vec![1]);
        assert!(calc.appearance_cost(&s) > 0.0);
    }

    #[test]
    fn division_cost_picks_larger_segment_as_mother() {
        let calc = CostCalculator::new(CostParameters::default());
        let old = seg(400, (0.0, 0.0), 0.9, vec![]);
        let small = seg(100, (1.0, 0.0), 0.8, vec![]);
        let big = seg(300, (-1.0, 0.0), 0.8, vec![]);
        // Mother is whichever of new_1/new_2 is larger; both orderings
        // should agree on which one plays the mother role and so give the
        // same cost.
        let cost_a = calc.division_cost(&old, &small, &big);
        let cost_b = calc.division_cost(&old, &big, &small);
        assert!((cost_a - cost_b).abs() < 1e-9);
    }
}
