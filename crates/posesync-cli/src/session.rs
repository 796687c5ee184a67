use std::io::{Read, Seek, Write};

use log::info;
use posesync_core::annotate::Annotation;
use posesync_core::project::{MediaIdentity, ProjectStore, Storage};
use posesync_core::series::{TimeSeries, TimeSeriesStore};
use posesync_core::sync::StreamSynchronizer;

use crate::bundle;
use crate::errors::{PosesyncError, Result};
use crate::sensor::SensorCsvParser;

/// Owns the live state of one review session and keeps the pieces coherent:
/// the synchronizer, the loaded time series, and the identity-keyed project
/// store. Marking and annotation actions route through here so every
/// mutating action also persists.
pub struct Session<S: Storage> {
    synchronizer: StreamSynchronizer,
    series: TimeSeriesStore,
    store: ProjectStore<S>,
    sensor_source: Option<(String, String)>,
}

impl<S: Storage> Session<S> {
    pub fn new(storage: S, sample_rate_hz: f64) -> Self {
        Self {
            synchronizer: StreamSynchronizer::new(),
            series: TimeSeriesStore::new(),
            store: ProjectStore::new(storage, sample_rate_hz),
            sensor_source: None,
        }
    }

    pub fn synchronizer(&self) -> &StreamSynchronizer {
        &self.synchronizer
    }

    pub fn series(&self) -> Option<&TimeSeries> {
        self.series.current()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.store.record().timestamps
    }

    pub fn notes(&self) -> &str {
        &self.store.record().notes
    }

    /// Keys the session to a loaded video. If a project was previously saved
    /// for this identity, its offset, annotations, and notes replace the live
    /// state wholesale. Returns true when a stored project was restored.
    pub fn load_video(&mut self, name: &str, byte_size: u64) -> bool {
        let restored = self.store.attach_media(MediaIdentity::new(name, byte_size));
        match restored {
            Some(record) => {
                self.synchronizer.set_offset_seconds(record.sync_offset);
                true
            }
            None => {
                self.synchronizer.set_offset_seconds(0.0);
                false
            }
        }
    }

    /// Parses delimited sensor text into the live time series, replacing any
    /// previous series wholesale.
    pub fn load_sensor_text(&mut self, file_name: &str, text: &str) -> Result<()> {
        let rate = self.store.record().sample_rate_hz;
        let series = SensorCsvParser::parse_text(text, rate)?;
        self.series.replace(series);
        self.sensor_source = Some((file_name.to_string(), text.to_string()));
        Ok(())
    }

    pub fn mark_video(&mut self, time: f64) {
        self.synchronizer.mark_video(time);
    }

    pub fn mark_data(&mut self, time: f64) {
        self.synchronizer.mark_data(time);
    }

    pub fn can_apply_sync(&self) -> bool {
        self.synchronizer.can_apply()
    }

    /// Applies the two-point offset and persists it.
    pub fn apply_sync(&mut self) -> Result<f64> {
        let offset = self.synchronizer.apply()?;
        self.store.set_offset(offset);
        Ok(offset)
    }

    pub fn reset_sync_marks(&mut self) {
        self.synchronizer.reset();
    }

    pub fn add_annotation(&mut self, time: f64, label: &str, event_type: &str, notes: &str) {
        self.store.add_annotation(time, label, event_type, notes);
    }

    pub fn delete_annotation(&mut self, index: usize) -> Result<Annotation> {
        Ok(self.store.delete_annotation(index)?)
    }

    pub fn set_notes(&mut self, notes: &str) {
        self.store.set_notes(notes);
    }

    /// Writes the self-contained bundle: aggregate, media bytes, and (when a
    /// sensor source is loaded) the raw sample text.
    pub fn export_bundle<W: Write + Seek>(&self, writer: W, video_bytes: &[u8]) -> Result<()> {
        let identity = self.store.identity().ok_or(PosesyncError::NoMedia)?;
        let sensor = self
            .sensor_source
            .as_ref()
            .map(|(name, text)| (name.as_str(), text.as_str()));
        bundle::export_bundle(
            writer,
            self.store.record(),
            &identity.name,
            video_bytes,
            sensor,
        )
    }

    /// Reads a bundle and merges it into the session: the aggregate replaces
    /// live state, the store is re-keyed to the bundled media's identity, and
    /// the time series is rebuilt through the parse contract. Returns the
    /// media entry so the host can hand it to its player.
    pub fn import_bundle<R: Read + Seek>(
        &mut self,
        reader: R,
    ) -> Result<Option<(String, Vec<u8>)>> {
        let contents = bundle::import_bundle(reader)?;

        self.synchronizer
            .set_offset_seconds(contents.record.sync_offset);
        self.synchronizer.reset();

        match &contents.video {
            Some((name, bytes)) => {
                let identity = MediaIdentity::new(name, bytes.len() as u64);
                self.store.rekey(identity, contents.record.clone());
            }
            None => self.store.replace_record(contents.record.clone()),
        }

        match contents.sensor_text.clone() {
            Some((name, text)) => self.load_sensor_text(&name, &text)?,
            None => self.series.reset(),
        }

        info!(
            "Imported bundle: offset {:.3}s, {} annotations",
            contents.record.sync_offset,
            contents.record.timestamps.len()
        );
        Ok(contents.video)
    }

    /// Clears live state in a fixed order: sync marks first, then the loaded
    /// series, then the sensor source. Persisted projects are untouched.
    pub fn reset(&mut self) {
        self.synchronizer.reset();
        self.series.reset();
        self.sensor_source = None;
    }
}
