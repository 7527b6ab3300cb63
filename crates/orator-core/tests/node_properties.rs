//! Property tests for node construction.

use proptest::prelude::*;

use orator_core::errors::NodeError;
use orator_core::models::Node;

/// Rectangular finite feature sequences.
fn features() -> impl Strategy<Value = Vec<Vec<f32>>> {
    (1_usize..6, 1_usize..13).prop_flat_map(|(frames, dims)| {
        prop::collection::vec(prop::collection::vec(-100.0_f32..100.0, dims), frames)
    })
}

proptest! {
    #[test]
    fn rectangular_finite_features_are_accepted(frames in features()) {
        let expected_frames = frames.len();
        let expected_dims = frames[0].len();
        let node = Node::new("n", frames).unwrap();
        prop_assert_eq!(node.frame_count(), expected_frames);
        prop_assert_eq!(node.dimensions(), expected_dims);
        prop_assert_eq!(node.description_count(), 0);
    }

    #[test]
    fn a_short_frame_is_reported_where_it_occurs(
        mut frames in features(),
        at in any::<prop::sample::Index>(),
    ) {
        let dims = frames[0].len();
        prop_assume!(frames.len() > 1);
        let frame = 1 + at.index(frames.len() - 1);
        frames[frame].push(0.0);

        let err = Node::new("n", frames).unwrap_err();
        prop_assert_eq!(
            err,
            NodeError::RaggedFeatures {
                node: "n".to_string(),
                frame,
                expected: dims,
                found: dims + 1,
            }
        );
    }

    #[test]
    fn non_finite_values_are_rejected(
        mut frames in features(),
        at in any::<(prop::sample::Index, prop::sample::Index)>(),
        poison in prop_oneof![Just(f32::NAN), Just(f32::INFINITY), Just(f32::NEG_INFINITY)],
    ) {
        let frame = at.0.index(frames.len());
        let dimension = at.1.index(frames[frame].len());
        frames[frame][dimension] = poison;

        let err = Node::new("n", frames).unwrap_err();
        let is_non_finite = matches!(err, NodeError::NonFiniteFeature { .. });
        prop_assert!(is_non_finite);
    }
}
