//! The capture backend contract shared by the interchangeable recorders.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::foundation::core::{FrameRGBA, Fps, TimestampMs};
use crate::foundation::error::{MiravaError, MiravaResult};

/// Which capture backend a recording runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CaptureKind {
    /// Low-level encoded-frame assembly: frames are pulled and encoded one by
    /// one, then muxed on finish.
    CodecPull,
    /// Container-level stream capture: the runtime recorder emits periodic
    /// container chunks.
    MediaRecorder,
}

/// A live audio input owned by the recording for its whole duration.
///
/// Clones share the same underlying track; stopping any clone stops them all.
/// The controller stops the track on every exit path of `finish`, including
/// error exits, and tests observe that through [`AudioTrack::is_stopped`].
#[derive(Clone, Debug)]
pub struct AudioTrack {
    label: String,
    sample_rate: u32,
    stopped: Arc<AtomicBool>,
}

impl AudioTrack {
    /// A new live track.
    pub fn new(label: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            label: label.into(),
            sample_rate,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Human-readable source label, e.g. `"microphone"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sample rate of the track in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Release the underlying input. Idempotent.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// True once the track has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Runtime capabilities the recording controller probes at `start`.
///
/// This is the media layer of the host environment, injected so tests can
/// script capability divergence (no codec support, denied microphone).
pub trait CaptureRuntime {
    /// True when the runtime supports low-level encoded-frame assembly; the
    /// controller then prefers [`CaptureKind::CodecPull`].
    fn encoded_frame_capture_supported(&self) -> bool;

    /// Acquire a microphone track, prompting for permission if needed.
    /// Fails with [`MiravaError::AudioPermissionDenied`] when refused.
    fn acquire_microphone(&self, sample_rate: u32) -> MiravaResult<AudioTrack>;
}

/// Fixed-answer runtime for tests and demos.
#[derive(Clone, Copy, Debug)]
pub struct FixedCaptureRuntime {
    /// Whether encoded-frame capture is reported as supported.
    pub encoded_frame_capture: bool,
    /// Whether microphone acquisition succeeds.
    pub microphone_allowed: bool,
}

impl Default for FixedCaptureRuntime {
    fn default() -> Self {
        Self {
            encoded_frame_capture: true,
            microphone_allowed: true,
        }
    }
}

impl CaptureRuntime for FixedCaptureRuntime {
    fn encoded_frame_capture_supported(&self) -> bool {
        self.encoded_frame_capture
    }

    fn acquire_microphone(&self, sample_rate: u32) -> MiravaResult<AudioTrack> {
        if !self.microphone_allowed {
            return Err(MiravaError::AudioPermissionDenied);
        }
        Ok(AudioTrack::new("microphone", sample_rate))
    }
}

/// Configuration handed to a backend at `begin`.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target video frame rate.
    pub fps: Fps,
    /// Video bit rate in bits per second.
    pub video_bit_rate: u32,
    /// Audio bit rate in bits per second, used when `audio` is present.
    pub audio_bit_rate: u32,
    /// Audio input, if the recording captures sound.
    pub audio: Option<AudioTrack>,
}

/// Audio parameters recorded in the container manifest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AudioManifest {
    /// Audio bit rate in bits per second.
    pub bit_rate: u32,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
}

/// Header describing the assembled media object. Serialized as the first
/// line of [`MediaBlob::data`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ContainerManifest {
    /// Container family, `"mp4"` or `"webm"`.
    pub container: String,
    /// MIME type of the blob.
    pub mime_type: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Video frame rate.
    pub frame_rate: Fps,
    /// Video bit rate in bits per second.
    pub video_bit_rate: u32,
    /// Audio parameters, when sound was recorded.
    pub audio: Option<AudioManifest>,
    /// Number of captured video frames.
    pub frame_count: u64,
    /// Number of media chunks that follow the header.
    pub chunk_count: u64,
    /// Total media duration in milliseconds.
    pub duration_ms: f64,
}

/// One buffered piece of captured media. Chunk sequences are ordered and
/// append-only.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaChunk {
    /// Capture timestamp of the first frame in this chunk.
    pub timestamp_ms: f64,
    /// Chunk payload.
    pub data: Vec<u8>,
}

/// The single contiguous media object a recording produces on finish.
#[derive(Clone, Debug)]
pub struct MediaBlob {
    /// MIME type, e.g. `"video/mp4"`.
    pub mime_type: String,
    /// Manifest line followed by length-prefixed chunk payloads.
    pub data: Vec<u8>,
    /// Number of captured video frames.
    pub frame_count: u64,
    /// Total media duration in milliseconds.
    pub duration_ms: f64,
}

impl MediaBlob {
    /// Parse the container manifest back out of the blob header.
    pub fn manifest(&self) -> MiravaResult<ContainerManifest> {
        let header_end = self
            .data
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| MiravaError::capture("media blob is missing its manifest header"))?;
        serde_json::from_slice(&self.data[..header_end])
            .map_err(|e| MiravaError::capture(format!("media blob manifest is corrupt: {e}")))
    }
}

/// Contract both capture backends satisfy identically.
///
/// `begin` is called exactly once before any frame; `push_frame` receives
/// frames in strictly increasing timestamp order; `end` assembles everything
/// buffered so far into one [`MediaBlob`] and invalidates the backend. A
/// backend must never drop a frame silently: any ingestion problem is an
/// error, which the controller latches until the next `finish`.
pub trait CaptureBackend {
    /// Which backend this is.
    fn kind(&self) -> CaptureKind;

    /// Start a capture with the given configuration.
    fn begin(&mut self, cfg: CaptureConfig) -> MiravaResult<()>;

    /// Ingest one rendered frame.
    fn push_frame(&mut self, frame: &FrameRGBA, timestamp: TimestampMs) -> MiravaResult<()>;

    /// Flush buffered chunks into one contiguous media object.
    fn end(&mut self) -> MiravaResult<MediaBlob>;
}

/// Shared frame admission checks: size must match the capture configuration
/// and timestamps must be strictly increasing.
pub(crate) fn validate_frame(
    cfg: &CaptureConfig,
    last_ts: Option<f64>,
    frame: &FrameRGBA,
    timestamp: TimestampMs,
) -> MiravaResult<()> {
    if frame.width != cfg.width || frame.height != cfg.height {
        return Err(MiravaError::capture(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.width, cfg.height
        )));
    }
    if let Some(last) = last_ts
        && timestamp.0 <= last
    {
        return Err(MiravaError::capture(
            "capture received an out-of-order frame timestamp",
        ));
    }
    Ok(())
}

/// Serialize `manifest` and the chunk payloads into the blob wire shape:
/// one JSON header line, then each chunk as a little-endian u32 length
/// prefix plus payload.
pub(crate) fn assemble_blob(
    manifest: &ContainerManifest,
    chunks: &[MediaChunk],
) -> MiravaResult<MediaBlob> {
    let mut data = serde_json::to_vec(manifest)
        .map_err(|e| MiravaError::capture(format!("serialize container manifest: {e}")))?;
    data.push(b'\n');
    for chunk in chunks {
        let len = u32::try_from(chunk.data.len())
            .map_err(|_| MiravaError::capture("media chunk exceeds u32 length"))?;
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&chunk.data);
    }
    Ok(MediaBlob {
        mime_type: manifest.mime_type.clone(),
        data,
        frame_count: manifest.frame_count,
        duration_ms: manifest.duration_ms,
    })
}
