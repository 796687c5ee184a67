use serde::{Deserialize, Serialize};

/// A user-placed marker on the video timeline.
///
/// Annotations live in insertion order; that order is also the display and
/// report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub time: f64,
    pub label: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    #[serde(default)]
    pub notes: String,
}

impl Annotation {
    /// Builds an annotation at `time`. An empty label defaults to the
    /// formatted time.
    pub fn new(time: f64, label: &str, event_type: &str, notes: &str) -> Self {
        let label = if label.is_empty() {
            format_time(time)
        } else {
            label.to_string()
        };
        Self {
            time,
            label,
            event_type: event_type.to_string(),
            notes: notes.to_string(),
        }
    }
}

/// Formats seconds as `M:SS.s` for labels and reports.
pub fn format_time(seconds: f64) -> String {
    let clamped = seconds.max(0.0);
    let minutes = (clamped / 60.0).floor() as u64;
    let rest = clamped - minutes as f64 * 60.0;
    format!("{}:{:04.1}", minutes, rest)
}
