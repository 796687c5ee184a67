use crate::series::TimeSeries;

/// Default duration of the playback window in seconds.
pub const DEFAULT_WINDOW_SECONDS: f64 = 5.0;

/// The visible sub-range of the sensor timeline plus the normalized marker
/// position within it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowView {
    pub visible_start: f64,
    pub visible_end: f64,
    pub marker_fraction: f64,
}

/// Computes the playback window around the adjusted time.
///
/// `adjusted = video_time - offset`; the window is centered on it, clamped to
/// zero on the left and deliberately unclamped on the right (it may extend
/// past the last sample). Pure and idempotent.
pub fn playback_view(video_time: f64, offset_seconds: f64, window_seconds: f64) -> WindowView {
    let adjusted = video_time - offset_seconds;
    let visible_start = (adjusted - window_seconds / 2.0).max(0.0);
    let visible_end = adjusted + window_seconds / 2.0;

    let span = visible_end - visible_start;
    let marker_fraction = if span <= 0.0 {
        0.0
    } else {
        ((adjusted - visible_start) / span).clamp(0.0, 1.0)
    };

    WindowView {
        visible_start,
        visible_end,
        marker_fraction,
    }
}

/// Full-series view used for initial-load rendering: the entire timeline from
/// zero, never narrower than one window.
pub fn full_view(series: &TimeSeries, window_seconds: f64) -> WindowView {
    WindowView {
        visible_start: 0.0,
        visible_end: window_seconds.max(series.last_time()),
        marker_fraction: 0.0,
    }
}
