use std::sync::Arc;

/// One decoded video frame together with the playback time it belongs to.
#[derive(Debug, Clone)]
pub struct Frame {
    pub video_time: f64,
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

/// Outcome of asking the media source for the current frame.
#[derive(Debug, Clone)]
pub enum MediaPoll {
    /// Not enough buffered data for this tick. A valid suspension point, not
    /// an error; the loop reschedules without side effects.
    Pending,
    /// A frame is available for the current playback position.
    Ready(Frame),
    /// The media source failed terminally; the loop stops.
    Failed(String),
}

/// The external video collaborator as seen by the tracking loop.
pub trait MediaSource {
    fn poll(&mut self) -> MediaPoll;
}
