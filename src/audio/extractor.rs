//! Metadata extraction from audio containers.
//!
//! Extraction never fails the caller: a malformed-but-accepted file yields
//! fallback metadata (size and format populated, duration/sample-rate
//! defaulted) and a warning in the logs. WAV headers are read natively with
//! hound for exact frame counts; MP3 and FLAC go through lofty's
//! general-purpose stream-info probe.

use super::format::AudioFormat;
use super::metadata::AudioMetadata;
use anyhow::Result;
use lofty::{AudioFile, Probe};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Seam for metadata extraction, so orchestration can be tested with a
/// counting or canned extractor.
pub trait MetadataExtractor: Send + Sync {
    /// Extract metadata from raw upload bytes. Stages the bytes to a temp
    /// file for parsing; the staging file is removed before returning.
    fn extract_upload(
        &self,
        original_filename: &str,
        format: AudioFormat,
        data: &[u8],
    ) -> AudioMetadata;

    /// Extract metadata from an already-stored asset file.
    fn extract_stored(
        &self,
        path: &Path,
        format: AudioFormat,
        file_size_bytes: u64,
    ) -> AudioMetadata;
}

/// Stream info pulled out of a container header, before merging into an
/// [`AudioMetadata`] record.
struct StreamInfo {
    duration_secs: f64,
    sample_rate: Option<u32>,
    bit_rate_kbps: Option<u32>,
    channels: Option<u16>,
}

/// Extractor backed by hound (WAV) and lofty (MP3/FLAC).
pub struct StreamInfoExtractor {
    /// Directory for staging upload bytes during parsing.
    staging_dir: PathBuf,
}

impl StreamInfoExtractor {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    /// Create the staging directory if it does not exist yet.
    pub fn init(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.staging_dir)
    }

    /// Write upload bytes to a uniquely-named temp file in the staging
    /// directory. Concurrent uploads sharing an original filename get
    /// distinct paths from the random name component. The file is removed
    /// when the returned handle drops, on every exit path.
    fn stage(&self, format: AudioFormat, data: &[u8]) -> std::io::Result<NamedTempFile> {
        let mut staged = tempfile::Builder::new()
            .prefix("staged-")
            .suffix(&format!(".{}", format.as_str()))
            .tempfile_in(&self.staging_dir)?;
        staged.write_all(data)?;
        staged.flush()?;
        Ok(staged)
    }
}

impl MetadataExtractor for StreamInfoExtractor {
    fn extract_upload(
        &self,
        original_filename: &str,
        format: AudioFormat,
        data: &[u8],
    ) -> AudioMetadata {
        let file_size_bytes = data.len() as u64;

        let staged = match self.stage(format, data) {
            Ok(staged) => staged,
            Err(e) => {
                warn!("Failed to stage upload {}: {}", original_filename, e);
                return AudioMetadata::fallback(format, file_size_bytes);
            }
        };

        debug!(
            "Staged {} ({} bytes) at {}",
            original_filename,
            file_size_bytes,
            staged.path().display()
        );

        self.extract_stored(staged.path(), format, file_size_bytes)
    }

    fn extract_stored(
        &self,
        path: &Path,
        format: AudioFormat,
        file_size_bytes: u64,
    ) -> AudioMetadata {
        let mut metadata = AudioMetadata::fallback(format, file_size_bytes);

        let parsed = match format {
            AudioFormat::Wav => read_wav_info(path),
            AudioFormat::Mp3 | AudioFormat::Flac => read_stream_info(path),
        };

        match parsed {
            Ok(info) => {
                metadata.duration_secs = info.duration_secs;
                if let Some(rate) = info.sample_rate {
                    metadata.sample_rate = rate;
                }
                metadata.bit_rate_kbps = info.bit_rate_kbps;
                metadata.channels = info.channels;
            }
            Err(e) => {
                // Degraded extraction is not an error for the caller: the
                // record keeps its fallback values.
                warn!(
                    "Failed to extract stream info from {}: {}",
                    path.display(),
                    e
                );
            }
        }

        metadata
    }
}

/// Read frame count and frame rate straight from the WAV header.
/// Duration is the exact division frames / rate; no estimation.
fn read_wav_info(path: &Path) -> Result<StreamInfo> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.duration();

    Ok(StreamInfo {
        duration_secs: frames as f64 / spec.sample_rate as f64,
        sample_rate: Some(spec.sample_rate),
        bit_rate_kbps: None,
        channels: Some(spec.channels),
    })
}

/// Probe compressed formats with lofty and take whatever stream properties
/// it reports. Fields the probe cannot determine stay at their defaults.
fn read_stream_info(path: &Path) -> Result<StreamInfo> {
    let tagged_file = Probe::open(path)?.read()?;
    let properties = tagged_file.properties();

    Ok(StreamInfo {
        duration_secs: properties.duration().as_secs_f64(),
        sample_rate: properties.sample_rate(),
        bit_rate_kbps: properties.audio_bitrate(),
        channels: properties.channels().map(u16::from),
    })
}
