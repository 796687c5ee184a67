use std::io::{Read, Seek, Write};

use log::{info, warn};
use posesync_core::project::ProjectRecord;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::errors::{PosesyncError, Result};

pub const METADATA_ENTRY: &str = "metadata.json";
pub const VIDEO_PREFIX: &str = "video/";
pub const DATA_PREFIX: &str = "data/";

/// Everything a bundle yields on import. Metadata is load-bearing; the media
/// and sample-source portions are optional (partial-success policy).
#[derive(Debug)]
pub struct BundleContents {
    pub record: ProjectRecord,
    pub video: Option<(String, Vec<u8>)>,
    pub sensor_text: Option<(String, String)>,
}

/// Writes a self-contained bundle: the serialized aggregate, the raw media
/// bytes under `video/`, and (when present) the raw sample-source text under
/// `data/`.
pub fn export_bundle<W: Write + Seek>(
    writer: W,
    record: &ProjectRecord,
    video_name: &str,
    video_bytes: &[u8],
    sensor: Option<(&str, &str)>,
) -> Result<()> {
    let mut record = record.clone();
    record.video_file_name = Some(video_name.to_string());
    record.csv_file_name = sensor.map(|(name, _)| name.to_string());

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();

    zip.start_file(METADATA_ENTRY, options)?;
    zip.write_all(serde_json::to_string_pretty(&record)?.as_bytes())?;

    zip.start_file(format!("{VIDEO_PREFIX}{video_name}"), options)?;
    zip.write_all(video_bytes)?;

    if let Some((name, text)) = sensor {
        zip.start_file(format!("{DATA_PREFIX}{name}"), options)?;
        zip.write_all(text.as_bytes())?;
    }

    zip.finish()?;
    info!(
        "Exported bundle for {video_name} ({} annotations, {} media bytes)",
        record.timestamps.len(),
        video_bytes.len()
    );
    Ok(())
}

/// Reads a bundle back. A missing or malformed metadata entry aborts the
/// import; a missing media or sample-source entry merely leaves that portion
/// unset. When several entries share a grouping, the first wins.
pub fn import_bundle<R: Read + Seek>(reader: R) -> Result<BundleContents> {
    let mut archive = ZipArchive::new(reader)?;

    let record = {
        let mut entry = archive
            .by_name(METADATA_ENTRY)
            .map_err(|_| PosesyncError::BundleFormat("missing metadata entry".to_string()))?;
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        ProjectRecord::from_json(&text)
            .map_err(|err| PosesyncError::BundleFormat(format!("malformed metadata: {err}")))?
    };

    let mut video: Option<(String, Vec<u8>)> = None;
    let mut sensor_text: Option<(String, String)> = None;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();

        if video.is_none() {
            if let Some(file_name) = name.strip_prefix(VIDEO_PREFIX) {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut bytes)?;
                video = Some((file_name.to_string(), bytes));
                continue;
            }
        }
        if sensor_text.is_none() {
            if let Some(file_name) = name.strip_prefix(DATA_PREFIX) {
                let mut text = String::new();
                entry.read_to_string(&mut text)?;
                sensor_text = Some((file_name.to_string(), text));
            }
        }
    }

    if video.is_none() {
        warn!("Bundle has no media entry; continuing with metadata only");
    }
    if sensor_text.is_none() {
        warn!("Bundle has no sample-source entry; continuing without sensor data");
    }

    Ok(BundleContents {
        record,
        video,
        sensor_text,
    })
}
