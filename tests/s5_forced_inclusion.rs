//! The constraint editor (C6): after the unforced solve picks the cheaper
//! candidate (§ S4), forcing the other candidate's `SegmentNode` flips the
//! answer, and un-forcing it returns to the original optimum — all without
//! rebuilding the graph.

mod common;

use test_log::test;

use cell_track_engine::{CostCalculator, SolverStatus, TrackingEngine};
use common::{segment, single_segmentation_frame, test_cost_params};

fn conflicting_pair(frame_id: u32) -> Vec<cell_track_engine::Segment> {
    let mut a = segment(0, frame_id, "seg", 10, 10, 300, 0.9, vec![1]);
    let mut b = segment(1, frame_id, "seg", 10, 20, 310, 0.3, vec![0]);
    a.manually_chosen = true;
    b.manually_chosen = true;
    vec![a, b]
}

#[test]
fn forcing_the_costlier_candidate_flips_the_answer_and_un_forcing_reverts_it() {
    let frames =
        vec![single_segmentation_frame(0, conflicting_pair(0)), single_segmentation_frame(1, conflicting_pair(1))];

    let calc = CostCalculator::new(test_cost_params());
    let mut engine = TrackingEngine::new(&frames, calc, false, "/data").unwrap();

    // Unforced: A (size 300) wins, as in S4.
    let status = engine.solve(10.0).unwrap();
    assert!(matches!(status, SolverStatus::SolvedOptimal | SolverStatus::SolvedFeasible));
    let baseline = engine.solution().unwrap();
    assert_eq!(baseline.cells[0].segment_at(0).unwrap().size, 300);

    // B's SegmentNode at frame 0 is seg_ref 1 in build order (frame 0's A,
    // then frame 0's B, then frame 1's A, frame 1's B).
    let b_frame0_seg_ref = 1;
    let b_node_ref = engine.builder().segment_node_ref(b_frame0_seg_ref);
    assert!(!engine.is_forced(b_node_ref));

    engine.force(b_node_ref, true).unwrap();
    assert!(engine.is_forced(b_node_ref));

    let status = engine.solve(10.0).unwrap();
    assert!(matches!(status, SolverStatus::SolvedOptimal | SolverStatus::SolvedFeasible));
    let forced = engine.solution().unwrap();

    let frame0_choice = forced
        .cells
        .iter()
        .find_map(|c| c.segment_at(0))
        .expect("some cell must cover frame 0 once B is forced in");
    assert_eq!(frame0_choice.size, 310, "forcing B must make it the frame-0 choice");

    for frame_no in 0..2u32 {
        let chosen_in_frame: Vec<_> = forced.cells.iter().filter_map(|c| c.segment_at(frame_no)).collect();
        assert_eq!(chosen_in_frame.len(), 1, "the conflict clique still allows only one per frame");
    }

    // Un-forcing returns to the S4 answer without rebuilding the graph.
    engine.force(b_node_ref, false).unwrap();
    assert!(!engine.is_forced(b_node_ref));

    let status = engine.solve(10.0).unwrap();
    assert!(matches!(status, SolverStatus::SolvedOptimal | SolverStatus::SolvedFeasible));
    let reverted = engine.solution().unwrap();
    assert_eq!(reverted.cells[0].segment_at(0).unwrap().size, 300);
}
