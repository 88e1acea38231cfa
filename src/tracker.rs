mod coords;
mod crop;
mod keypoint_tracker;
mod keypoints;
mod rect;
mod template;
mod track_state;

pub use coords::{CLIP_MARGIN, clip_point, from_crop_space, to_crop_space};
pub use crop::{Crop, sample_target, sample_target_unresized};
pub use keypoint_tracker::{KeypointTracker, TrackOutput, TrackerConfig, TrackerState};
pub use keypoints::{Frame, Keypoints, NUM_KEYPOINTS, VISIBILITY_THRESHOLD};
pub use rect::{BOX_MARGIN, Rect};
pub use template::{TemplateBank, fuse_visibility};
pub use track_state::TrackPhase;
