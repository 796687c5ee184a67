use std::fmt;

/// The fixed sensor channel set: three axes for each of three sensor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    AccelX,
    AccelY,
    AccelZ,
    GyroX,
    GyroY,
    GyroZ,
    MagX,
    MagY,
    MagZ,
}

pub const CHANNEL_COUNT: usize = 9;

pub const ALL_CHANNELS: [Channel; CHANNEL_COUNT] = [
    Channel::AccelX,
    Channel::AccelY,
    Channel::AccelZ,
    Channel::GyroX,
    Channel::GyroY,
    Channel::GyroZ,
    Channel::MagX,
    Channel::MagY,
    Channel::MagZ,
];

impl Channel {
    /// Canonical column name as it appears in sample-source headers.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::AccelX => "accel_x",
            Channel::AccelY => "accel_y",
            Channel::AccelZ => "accel_z",
            Channel::GyroX => "gyro_x",
            Channel::GyroY => "gyro_y",
            Channel::GyroZ => "gyro_z",
            Channel::MagX => "mag_x",
            Channel::MagY => "mag_y",
            Channel::MagZ => "mag_z",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL_CHANNELS.iter().copied().find(|c| c.name() == name)
    }

    /// Position of this channel within a [`Sample`]'s value array.
    pub fn index(&self) -> usize {
        ALL_CHANNELS
            .iter()
            .position(|c| c == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One sensor reading across all channels. Immutable once parsed; its time is
/// implied by its position in the owning sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    values: [f64; CHANNEL_COUNT],
}

impl Sample {
    pub fn new(values: [f64; CHANNEL_COUNT]) -> Self {
        Self { values }
    }

    pub fn zeroed() -> Self {
        Self::new([0.0; CHANNEL_COUNT])
    }

    pub fn get(&self, channel: Channel) -> f64 {
        self.values[channel.index()]
    }

    pub fn values(&self) -> &[f64; CHANNEL_COUNT] {
        &self.values
    }
}

/// An ordered sample sequence with its derived time axis.
///
/// Invariant: `times.len() == samples.len()` and `times[i] == i / sample_rate_hz`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    samples: Vec<Sample>,
    times: Vec<f64>,
    sample_rate_hz: f64,
}

impl TimeSeries {
    pub fn from_samples(samples: Vec<Sample>, sample_rate_hz: f64) -> Self {
        let times = (0..samples.len())
            .map(|i| i as f64 / sample_rate_hz)
            .collect();
        Self {
            samples,
            times,
            sample_rate_hz,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Time of the last sample, or zero when the series is empty.
    pub fn last_time(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }
}

/// Owns the currently loaded series. Replaced wholesale on each successful
/// parse; cleared on reset.
#[derive(Debug, Default)]
pub struct TimeSeriesStore {
    series: Option<TimeSeries>,
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, series: TimeSeries) {
        log::info!(
            "Loaded time series: {} samples at {} Hz ({:.2}s)",
            series.len(),
            series.sample_rate_hz(),
            series.last_time()
        );
        self.series = Some(series);
    }

    pub fn current(&self) -> Option<&TimeSeries> {
        self.series.as_ref()
    }

    pub fn reset(&mut self) {
        self.series = None;
    }
}
