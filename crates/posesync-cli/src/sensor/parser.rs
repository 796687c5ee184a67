use std::path::Path;

use csv::ReaderBuilder;
use posesync_core::series::{Channel, Sample, TimeSeries, CHANNEL_COUNT};

use crate::errors::{PosesyncError, Result};

/// Parser for fixed-rate sensor samples from delimited text.
///
/// The header row names the channels; recognized names are the nine canonical
/// channel columns (`accel_x` .. `mag_z`), any other columns are ignored.
/// Field-level problems are row-local: an unparseable value becomes `0.0` and
/// the row is kept.
pub struct SensorCsvParser;

impl SensorCsvParser {
    pub fn parse_file<P: AsRef<Path>>(path: P, sample_rate_hz: f64) -> Result<TimeSeries> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_text(&text, sample_rate_hz)
    }

    pub fn parse_text(text: &str, sample_rate_hz: f64) -> Result<TimeSeries> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(PosesyncError::SensorFormat(
                "sample source has no header row".to_string(),
            ));
        }

        // Map each recognized header column to its channel once up front.
        let columns: Vec<(usize, Channel)> = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| Channel::from_name(name.trim()).map(|c| (idx, c)))
            .collect();

        if columns.is_empty() {
            return Err(PosesyncError::SensorFormat(format!(
                "no recognized sensor channels among columns: {}",
                headers.iter().collect::<Vec<_>>().join(", ")
            )));
        }

        let mut samples = Vec::new();
        let mut substituted = 0usize;

        for record in reader.records() {
            let record = record?;
            let mut values = [0.0f64; CHANNEL_COUNT];
            for (idx, channel) in &columns {
                let raw = record.get(*idx).unwrap_or("");
                values[channel.index()] = match raw.trim().parse::<f64>() {
                    Ok(value) => value,
                    Err(_) => {
                        // Row-local recovery: neutral default, row is kept.
                        substituted += 1;
                        0.0
                    }
                };
            }
            samples.push(Sample::new(values));
        }

        if substituted > 0 {
            log::warn!("Substituted 0 for {substituted} unparseable sensor fields");
        }
        log::info!("Parsed {} sensor samples at {sample_rate_hz} Hz", samples.len());

        Ok(TimeSeries::from_samples(samples, sample_rate_hz))
    }
}
