use crate::media::Frame;

/// One detected body landmark in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Keypoint {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct EstimateOptions {
    pub max_results: usize,
    pub mirror: bool,
}

impl Default for EstimateOptions {
    fn default() -> Self {
        Self {
            max_results: 1,
            mirror: false,
        }
    }
}

/// The external pose-inference model. Opaque to this crate; may return an
/// empty result when no person is visible.
pub trait PoseEstimator {
    fn estimate(&mut self, frame: &Frame, options: &EstimateOptions) -> Vec<Keypoint>;
}

/// A straight segment between two detected keypoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletonLine {
    pub from: (f64, f64),
    pub to: (f64, f64),
}

/// Keypoints below this confidence are not connected into the skeleton.
pub const MIN_SKELETON_SCORE: f64 = 0.3;

/// Standard 17-point pose topology (named keypoint pairs).
pub const SKELETON_EDGES: [(&str, &str); 16] = [
    ("nose", "left_eye"),
    ("nose", "right_eye"),
    ("left_eye", "left_ear"),
    ("right_eye", "right_ear"),
    ("left_shoulder", "right_shoulder"),
    ("left_shoulder", "left_elbow"),
    ("left_elbow", "left_wrist"),
    ("right_shoulder", "right_elbow"),
    ("right_elbow", "right_wrist"),
    ("left_shoulder", "left_hip"),
    ("right_shoulder", "right_hip"),
    ("left_hip", "right_hip"),
    ("left_hip", "left_knee"),
    ("left_knee", "left_ankle"),
    ("right_hip", "right_knee"),
    ("right_knee", "right_ankle"),
];

/// Connects keypoints into skeleton lines. An edge is emitted only when both
/// endpoints are present and confident enough.
pub fn derive_skeleton(keypoints: &[Keypoint]) -> Vec<SkeletonLine> {
    let find = |name: &str| {
        keypoints
            .iter()
            .find(|kp| kp.name == name && kp.score >= MIN_SKELETON_SCORE)
    };

    SKELETON_EDGES
        .iter()
        .filter_map(|(a, b)| {
            let from = find(a)?;
            let to = find(b)?;
            Some(SkeletonLine {
                from: (from.x, from.y),
                to: (to.x, to.y),
            })
        })
        .collect()
}

/// Render sink for the latest pose. External view plumbing; not part of the
/// loop's testable contract beyond being handed the latest result.
pub trait PoseSink {
    fn render(&mut self, keypoints: &[Keypoint], skeleton: &[SkeletonLine]);
}
