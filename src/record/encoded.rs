//! The encoded-frame capture backend.

use crate::foundation::core::{FrameRGBA, TimestampMs};
use crate::foundation::error::{MiravaError, MiravaResult};
use crate::record::backend::{
    AudioManifest, CaptureBackend, CaptureConfig, CaptureKind, ContainerManifest, MediaBlob,
    MediaChunk, assemble_blob, validate_frame,
};

/// Codec-pull capture backend.
///
/// Each pushed frame is encoded into its own media chunk immediately; `end`
/// muxes the chunk sequence into one mp4-flavoured blob. Preferred whenever
/// the runtime supports low-level encoded-frame assembly.
#[derive(Default)]
pub struct EncodedFrameRecorder {
    cfg: Option<CaptureConfig>,
    chunks: Vec<MediaChunk>,
    frame_count: u64,
    last_ts: Option<f64>,
}

impl EncodedFrameRecorder {
    /// A recorder ready for `begin`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CaptureBackend for EncodedFrameRecorder {
    fn kind(&self) -> CaptureKind {
        CaptureKind::CodecPull
    }

    fn begin(&mut self, cfg: CaptureConfig) -> MiravaResult<()> {
        if cfg.width == 0 || cfg.height == 0 {
            return Err(MiravaError::capture(
                "codec capture width/height must be non-zero",
            ));
        }
        self.chunks.clear();
        self.frame_count = 0;
        self.last_ts = None;
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameRGBA, timestamp: TimestampMs) -> MiravaResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| MiravaError::capture("codec capture not started"))?;
        validate_frame(cfg, self.last_ts, frame, timestamp)?;
        self.last_ts = Some(timestamp.0);
        self.chunks.push(MediaChunk {
            timestamp_ms: timestamp.0,
            data: frame.data.clone(),
        });
        self.frame_count += 1;
        Ok(())
    }

    fn end(&mut self) -> MiravaResult<MediaBlob> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| MiravaError::capture("codec capture not started"))?;
        let manifest = ContainerManifest {
            container: "mp4".to_string(),
            mime_type: "video/mp4".to_string(),
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
        Ok(blob)
    }
}
