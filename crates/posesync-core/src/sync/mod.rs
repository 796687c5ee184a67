use std::fmt;

use log::{debug, info};

/// Returned by [`StreamSynchronizer::apply`] when the caller did not gate on
/// [`StreamSynchronizer::can_apply`]. This is a caller bug, not a user-facing
/// retry condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarksIncomplete;

impl fmt::Display for MarksIncomplete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot apply offset: both marks must be set")
    }
}

impl std::error::Error for MarksIncomplete {}

/// Owns the constant offset between the video clock and the sensor clock,
/// together with the two-point marking state used to compute it.
///
/// The offset is defined so that `data_time = video_time - offset`. It is
/// only ever updated atomically by [`apply`](Self::apply) from both marks.
#[derive(Debug, Clone, Default)]
pub struct StreamSynchronizer {
    offset_seconds: f64,
    video_mark: Option<f64>,
    data_mark: Option<f64>,
}

impl StreamSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_seconds(&self) -> f64 {
        self.offset_seconds
    }

    /// Restores a previously persisted offset without touching the marks.
    pub fn set_offset_seconds(&mut self, offset: f64) {
        self.offset_seconds = offset;
    }

    /// Records the video-side mark. Marking again overwrites the prior mark.
    /// Times are accepted verbatim; downstream consumers clamp.
    pub fn mark_video(&mut self, time: f64) {
        debug!("Marked video at {time:.3}s");
        self.video_mark = Some(time);
    }

    /// Records the data-side mark. Marking again overwrites the prior mark.
    pub fn mark_data(&mut self, time: f64) {
        debug!("Marked data at {time:.3}s");
        self.data_mark = Some(time);
    }

    pub fn video_mark(&self) -> Option<f64> {
        self.video_mark
    }

    pub fn data_mark(&self) -> Option<f64> {
        self.data_mark
    }

    pub fn can_apply(&self) -> bool {
        self.video_mark.is_some() && self.data_mark.is_some()
    }

    /// Computes `offset = video_mark - data_mark` and clears both marks as one
    /// atomic transition. The just-applied marks are not readable afterward.
    pub fn apply(&mut self) -> Result<f64, MarksIncomplete> {
        let (video, data) = match (self.video_mark.take(), self.data_mark.take()) {
            (Some(v), Some(d)) => (v, d),
            (video, data) => {
                // Restore whichever mark was present; the transition must not
                // fire partially.
                self.video_mark = video;
                self.data_mark = data;
                return Err(MarksIncomplete);
            }
        };

        self.offset_seconds = video - data;
        info!(
            "Applied sync offset {:.3}s (video {:.3}s ↔ data {:.3}s)",
            self.offset_seconds, video, data
        );
        Ok(self.offset_seconds)
    }

    /// Clears both marks without touching the offset.
    pub fn reset(&mut self) {
        self.video_mark = None;
        self.data_mark = None;
    }

    /// Shifts a video-clock time into the sensor timeline.
    pub fn data_time_for(&self, video_time: f64) -> f64 {
        video_time - self.offset_seconds
    }
}
