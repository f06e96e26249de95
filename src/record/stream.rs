//! The streaming capture backend.

use crate::foundation::core::{FrameRGBA, TimestampMs};
use crate::foundation::error::{MiravaError, MiravaResult};
use crate::record::backend::{
    AudioManifest, CaptureBackend, CaptureConfig, CaptureKind, ContainerManifest, MediaBlob,
    MediaChunk, assemble_blob, validate_frame,
};

/// Chunk emission interval used by the container recorder.
const DEFAULT_TIMESLICE_MS: f64 = 1000.0;

/// Container-capture backend, the fallback when encoded-frame assembly is
/// unavailable.
///
/// Frames are buffered into timeslices; every elapsed timeslice becomes one
/// container chunk, and `end` flushes the partial slice and assembles a
/// webm-flavoured blob.
pub struct StreamRecorder {
    timeslice_ms: f64,
    cfg: Option<CaptureConfig>,
    chunks: Vec<MediaChunk>,
    slice: Vec<u8>,
    slice_start_ts: Option<f64>,
    frame_count: u64,
    last_ts: Option<f64>,
}

impl StreamRecorder {
    /// A recorder with the default one-second timeslice.
    pub fn new() -> Self {
        Self::with_timeslice(DEFAULT_TIMESLICE_MS)
    }

    /// A recorder emitting a chunk every `timeslice_ms` of captured media.
    pub fn with_timeslice(timeslice_ms: f64) -> Self {
        Self {
            timeslice_ms: timeslice_ms.max(1.0),
            cfg: None,
            chunks: Vec::new(),
            slice: Vec::new(),
            slice_start_ts: None,
            frame_count: 0,
            last_ts: None,
        }
    }

    fn flush_slice(&mut self) {
        let Some(start_ts) = self.slice_start_ts else {
            return;
        };
        if self.slice.is_empty() {
            return;
        }
        self.chunks.push(MediaChunk {
            timestamp_ms: start_ts,
            data: std::mem::take(&mut self.slice),
        });
    }
}

impl Default for StreamRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for StreamRecorder {
    fn kind(&self) -> CaptureKind {
        CaptureKind::MediaRecorder
    }

    fn begin(&mut self, cfg: CaptureConfig) -> MiravaResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(MiravaError::capture(
                "stream capture width/height must be non-zero",
            ));
        }
        self.chunks.clear();
        self.slice.clear();
        self.slice_start_ts = None;
        self.frame_count = 0;
        self.last_ts = None;
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRGBA, timestamp: TimestampMs) -> MiravaResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| MiravaError::capture("stream capture not started"))?;
        validate_frame(cfg, self.last_ts, frame, timestamp)?;
        self.last_ts = Some(timestamp.0);

        match self.slice_start_ts {
            None => self.slice_start_ts = Some(timestamp.0),
            Some(start) if timestamp.0 - start >= self.timeslice_ms => {
                self.flush_slice();
                self.slice_start_ts = Some(timestamp.0);
            }
            Some(_) => {}
        }
        self.slice.extend_from_slice(&frame.data);
        self.frame_count += 1;
        Ok(())
    }

    fn end(&mut self) -> MiravaResult<MediaBlob> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| MiravaError::capture("stream capture not started"))?;
        self.flush_slice();
        let manifest = ContainerManifest {
            container: "webm".to_string(),
            mime_type: "video/webm".to_string(),
            width: cfg.width,
            height: cfg.height,
            frame_rate: cfg.fps,
            video_bit_rate: cfg.video_bit_rate,
            audio: cfg.audio.as_ref().map(|track| AudioManifest {
                bit_rate: cfg.audio_bit_rate,
                sample_rate: track.sample_rate(),
            }),
            frame_count: self.frame_count,
            chunk_count: self.chunks.len() as u64,
            duration_ms: self.frame_count as f64 * cfg.fps.frame_interval_ms(),
        };
        let blob = assemble_blob(&manifest, &self.chunks)?;
        self.chunks.clear();
        self.slice_start_ts = None;
        Ok(blob)
    }
}
