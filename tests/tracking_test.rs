use std::path::Path;

use keypoint_tracker_rs::tracker::{from_crop_space, fuse_visibility};
use keypoint_tracker_rs::{
    Crop, Frame, FrameBuilder, KeypointTracker, Keypoints, NUM_KEYPOINTS, Predictor, Rect,
    SearchOutput, TrackPhase, TrackerError,
};
use nalgebra::Point2;
use ndarray::Array3;

/// Predictor returning canned search results and numbering its embeddings.
struct ScriptedPredictor {
    loaded: bool,
    embeddings: u32,
    points: [Point2<f32>; NUM_KEYPOINTS],
    confidences: [f32; NUM_KEYPOINTS],
    searched_with: Vec<(u32, u32)>,
}

impl ScriptedPredictor {
    fn new(confidences: [f32; NUM_KEYPOINTS]) -> Self {
        Self {
            loaded: false,
            embeddings: 0,
            points: std::array::from_fn(|i| {
                Point2::new(0.35 + 0.025 * i as f32, 0.3 + 0.03 * i as f32)
            }),
            confidences,
            searched_with: Vec::new(),
        }
    }
}

impl Predictor for ScriptedPredictor {
    type Embedding = u32;
    type Error = std::convert::Infallible;

    fn load(&mut self, _: &Path, _: &Path) -> Result<(), Self::Error> {
        self.loaded = true;
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.loaded
    }

    fn embed(
        &mut self,
        _: &Crop,
        _: &[Point2<f32>; NUM_KEYPOINTS],
        _: &[bool; NUM_KEYPOINTS],
    ) -> Result<u32, Self::Error> {
        self.embeddings += 1;
        Ok(self.embeddings)
    }

    fn search(
        &mut self,
        _: &Crop,
        static_embedding: &u32,
        dynamic_embedding: &u32,
    ) -> Result<SearchOutput, Self::Error> {
        self.searched_with.push((*static_embedding, *dynamic_embedding));
        Ok(SearchOutput {
            points: self.points,
            confidences: self.confidences,
        })
    }
}

const FIXTURE: [f32; 2 * NUM_KEYPOINTS] = [
    320.0, 100.0, // head
    300.0, 130.0, 340.0, 130.0, // shoulders
    280.0, 180.0, 360.0, 180.0, // elbows
    260.0, 240.0, 380.0, 240.0, // wrists
    300.0, 250.0, 340.0, 250.0, // hips
    290.0, 320.0, 350.0, 320.0, // knees
    285.0, 390.0, 355.0, 390.0, // ankles
];

fn image() -> Array3<u8> {
    Array3::from_shape_fn((480, 640, 3), |(y, x, c)| ((x + y + 30 * c) % 256) as u8)
}

fn frame(frame_id: i64, visibility: &[f32]) -> Frame {
    FrameBuilder::new(frame_id)
        .size(640, 480)
        .keypoints(&FIXTURE)
        .visibility(visibility)
        .build()
        .unwrap()
}

fn tracker(confidences: [f32; NUM_KEYPOINTS]) -> KeypointTracker<ScriptedPredictor> {
    let mut tracker = KeypointTracker::with_default_config(ScriptedPredictor::new(confidences));
    tracker.load("template.pt", "search.pt").unwrap();
    tracker
}

fn all_visible() -> Vec<f32> {
    vec![1.0; NUM_KEYPOINTS]
}

#[test]
fn test_init_box_from_fixture() {
    let mut tracker = tracker([0.9; NUM_KEYPOINTS]);
    tracker.init(image().view(), &frame(0, &all_visible())).unwrap();

    let state = tracker.state().unwrap();
    let bbox = state.bbox();

    // x in [260, 380], y in [100, 390]; 10% of the extent added per side
    assert!((bbox.x - 248.0).abs() < 1e-3);
    assert!((bbox.y - 71.0).abs() < 1e-3);
    assert!((bbox.width - 144.0).abs() < 1e-3);
    assert!((bbox.height - 348.0).abs() < 1e-3);

    assert_eq!(
        state.templates().static_embedding(),
        state.templates().dynamic_embedding()
    );
    assert_eq!(state.fused_visibility(), &[true; NUM_KEYPOINTS]);
    assert_eq!(tracker.phase(), TrackPhase::Initialized);
}

#[test]
fn test_init_without_visible_keypoint_fails() {
    let mut tracker = tracker([0.9; NUM_KEYPOINTS]);
    let err = tracker
        .init(image().view(), &frame(0, &[0.0; NUM_KEYPOINTS]))
        .unwrap_err();
    assert!(matches!(err, TrackerError::EmptyVisibleSet));
    assert!(tracker.state().is_none());
    assert_eq!(tracker.phase(), TrackPhase::Uninitialized);
}

#[test]
fn test_never_seen_keypoint_is_suppressed() {
    let mut confidences = [0.99; NUM_KEYPOINTS];
    confidences[0] = 0.9;
    confidences[1] = 0.3;
    confidences[2] = 0.95;
    let mut tracker = tracker(confidences);

    let mut visibility = all_visible();
    visibility[1] = 0.0;
    tracker.init(image().view(), &frame(0, &visibility)).unwrap();

    let output = tracker.run(image().view(), &frame(1, &[])).unwrap();
    let mut expected = [true; NUM_KEYPOINTS];
    expected[1] = false;
    assert_eq!(output.visible, expected);
    assert_eq!(output.confidences[1], 0.0);
    assert_eq!(output.confidences[0], 0.9);
    assert_eq!(tracker.phase(), TrackPhase::Tracking);
}

#[test]
fn test_high_raw_confidence_cannot_revive_hidden_keypoint() {
    let mut tracker = tracker([0.99; NUM_KEYPOINTS]);
    let mut visibility = all_visible();
    visibility[4] = 0.0;
    tracker.init(image().view(), &frame(0, &visibility)).unwrap();

    let output = tracker.run(image().view(), &frame(1, &[])).unwrap();
    assert!(!output.visible[4]);
    assert_eq!(output.visibility_flags()[4], 0);
}

#[test]
fn test_run_moves_box_onto_confident_keypoints() {
    let mut confidences = [0.9; NUM_KEYPOINTS];
    confidences[12] = 0.2;
    let mut tracker = tracker(confidences);
    tracker.init(image().view(), &frame(0, &all_visible())).unwrap();
    let search_box = tracker.state().unwrap().bbox();

    let output = tracker.run(image().view(), &frame(1, &[])).unwrap();

    let resize_factor = 320.0 / search_box.crop_size(5.0);
    let points = tracker.predictor().points;
    let mapped: Vec<Point2<f32>> = points
        .iter()
        .map(|p| from_crop_space(p, &search_box, resize_factor, 320, true))
        .collect();
    let expected = Rect::enclosing(&mapped[..12]).unwrap();

    assert!((output.bbox.x - expected.x).abs() < 1e-2);
    assert!((output.bbox.y - expected.y).abs() < 1e-2);
    assert!((output.bbox.width - expected.width).abs() < 1e-2);
    assert!((output.bbox.height - expected.height).abs() < 1e-2);
    assert_eq!(tracker.state().unwrap().bbox(), output.bbox);
    assert_eq!(tracker.state().unwrap().frame_id(), 1);

    for p in &output.keypoints {
        assert!((0.0..=(630.0 / 640.0)).contains(&p.x));
        assert!((0.0..=(470.0 / 480.0)).contains(&p.y));
    }
}

#[test]
fn test_run_without_confident_keypoint_keeps_box() {
    let mut tracker = tracker([0.1; NUM_KEYPOINTS]);
    tracker.init(image().view(), &frame(0, &all_visible())).unwrap();
    let before = tracker.state().unwrap().bbox();

    let output = tracker.run(image().view(), &frame(1, &[])).unwrap();
    assert_eq!(output.bbox, before);
    assert!(output.visible.iter().all(|&v| !v));
}

#[test]
fn test_update_with_hidden_keypoints_is_noop() {
    let mut tracker = tracker([0.9; NUM_KEYPOINTS]);
    let mut visibility = all_visible();
    visibility[7] = 0.0;
    tracker.init(image().view(), &frame(0, &visibility)).unwrap();
    tracker.run(image().view(), &frame(1, &[])).unwrap();
    let before = tracker.state().unwrap().clone();

    tracker
        .update(image().view(), &frame(2, &[0.0; NUM_KEYPOINTS]))
        .unwrap();

    let after = tracker.state().unwrap();
    assert_eq!(after.bbox(), before.bbox());
    assert_eq!(
        after.templates().dynamic_embedding(),
        before.templates().dynamic_embedding()
    );
    assert_eq!(after.fused_visibility(), before.fused_visibility());
    assert_eq!(tracker.predictor().embeddings, 1);
}

#[test]
fn test_update_feeds_next_search() {
    let mut tracker = tracker([0.9; NUM_KEYPOINTS]);
    tracker.init(image().view(), &frame(0, &all_visible())).unwrap();
    tracker.run(image().view(), &frame(1, &[])).unwrap();
    tracker.update(image().view(), &frame(1, &all_visible())).unwrap();
    tracker.run(image().view(), &frame(2, &[])).unwrap();

    assert_eq!(tracker.predictor().searched_with, vec![(1, 1), (1, 2)]);
}

#[test]
fn test_fused_visibility_is_monotonic_across_calls() {
    let mut tracker = tracker([0.9; NUM_KEYPOINTS]);
    let mut visibility = vec![0.0; NUM_KEYPOINTS];
    visibility[0] = 1.0;
    visibility[5] = 1.0;
    tracker.init(image().view(), &frame(0, &visibility)).unwrap();

    let corrections: Vec<Vec<f32>> = vec![
        (0..NUM_KEYPOINTS).map(|i| (i == 2) as u8 as f32).collect(),
        vec![0.0; NUM_KEYPOINTS],
        (0..NUM_KEYPOINTS).map(|i| (i % 4 == 1) as u8 as f32).collect(),
        (0..NUM_KEYPOINTS).map(|i| (i == 0) as u8 as f32).collect(),
    ];

    let mut expected = *tracker.state().unwrap().fused_visibility();
    for (step, correction) in corrections.iter().enumerate() {
        let fid = step as i64 + 1;
        let previous = *tracker.state().unwrap().fused_visibility();

        tracker.run(image().view(), &frame(fid, &[])).unwrap();
        assert_eq!(tracker.state().unwrap().fused_visibility(), &previous);

        let correction_frame = frame(fid, correction);
        tracker.update(image().view(), &correction_frame).unwrap();
        expected = fuse_visibility(&expected, &correction_frame.keypoints.visibility);

        let fused = tracker.state().unwrap().fused_visibility();
        assert_eq!(fused, &expected);
        for i in 0..NUM_KEYPOINTS {
            assert!(!previous[i] || fused[i], "keypoint {i} cleared at step {step}");
        }
    }
}

#[test]
fn test_update_clamps_keypoints_into_frame() {
    let mut tracker = tracker([0.9; NUM_KEYPOINTS]);
    tracker.init(image().view(), &frame(0, &all_visible())).unwrap();

    let mut points = [Point2::new(-100.0, -100.0); NUM_KEYPOINTS];
    points[0] = Point2::new(900.0, 900.0);
    let wild = Frame::new(1, 640, 480, Keypoints::new(points, [true; NUM_KEYPOINTS]));
    tracker.update(image().view(), &wild).unwrap();

    assert_eq!(*tracker.state().unwrap().templates().dynamic_embedding(), 2);
}
