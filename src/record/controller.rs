//! The recording state machine over the capture backends.

use crate::foundation::core::{FrameRGBA, Fps, TimestampMs};
use crate::foundation::error::{MiravaError, MiravaResult};
use crate::record::backend::{
    AudioTrack, CaptureBackend, CaptureConfig, CaptureKind, CaptureRuntime, MediaBlob,
};
use crate::record::encoded::EncodedFrameRecorder;
use crate::record::stream::StreamRecorder;

/// Default audio bit rate in bits per second.
pub const DEFAULT_AUDIO_BIT_RATE: u32 = 128_000;
/// Default audio sample rate in Hz.
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 44_100;
/// Default video bit rate in bits per second.
pub const DEFAULT_VIDEO_BIT_RATE: u32 = 4_000_000;
/// Default video frame rate in frames per second.
pub const DEFAULT_VIDEO_FRAME_RATE: u32 = 30;

/// Tolerance for float jitter when pacing captures against tick timestamps.
const PACING_EPS_MS: f64 = 1e-3;

/// Recording state machine phases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordingState {
    /// No recording active.
    #[default]
    Idle,
    /// `start` succeeded but no frame has been captured yet (e.g. waiting out
    /// microphone-permission latency or the first tick).
    Starting,
    /// Frames are being captured.
    Recording,
    /// `finish` is flushing buffered media.
    Finishing,
    /// A frame capture failed; the error surfaces on the next `finish`.
    Error,
}

/// Caller-facing recording options. All fields have defaults and are fixed
/// for the whole recording once `start` accepts them.
#[derive(Clone, Debug)]
pub struct RecordingOptions {
    /// Record microphone sound. Ignored when `audio_track` is supplied.
    pub record_audio: bool,
    /// Record this externally supplied track instead of the microphone.
    pub audio_track: Option<AudioTrack>,
    /// Audio bit rate in bits per second.
    pub audio_bit_rate: u32,
    /// Audio sample rate in Hz, used when acquiring the microphone.
    pub audio_sample_rate: u32,
    /// Video bit rate in bits per second.
    pub video_bit_rate: u32,
    /// Video frame rate in frames per second.
    pub video_frame_rate: u32,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            record_audio: false,
            audio_track: None,
            audio_bit_rate: DEFAULT_AUDIO_BIT_RATE,
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            video_bit_rate: DEFAULT_VIDEO_BIT_RATE,
            video_frame_rate: DEFAULT_VIDEO_FRAME_RATE,
        }
    }
}

struct Pacing {
    first_ts: f64,
    interval_ms: f64,
    captured: u64,
}

/// Drives one recording at a time over a capability-selected backend.
///
/// State machine: idle → starting → recording → finishing → idle, with error
/// reachable from starting and recording. The backend is chosen once at
/// `start` by probing the runtime (codec-pull when supported, container
/// capture otherwise) and never switched mid-recording. Acquired media
/// tracks are stopped on every exit path of `finish`, including error exits.
pub struct RecordingController {
    runtime: Box<dyn CaptureRuntime>,
    state: RecordingState,
    backend: Option<Box<dyn CaptureBackend>>,
    audio_track: Option<AudioTrack>,
    capture_error: Option<MiravaError>,
    pacing: Option<Pacing>,
}

impl RecordingController {
    /// A controller probing capabilities through `runtime`.
    pub fn new(runtime: Box<dyn CaptureRuntime>) -> Self {
        Self {
            runtime,
            state: RecordingState::Idle,
            backend: None,
            audio_track: None,
            capture_error: None,
            pacing: None,
        }
    }

    /// Current state machine phase.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Which backend the active recording runs on, if one is active.
    pub fn backend_kind(&self) -> Option<CaptureKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    /// Begin recording frames of `width` x `height`.
    ///
    /// Fails with [`MiravaError::RecordingAlreadyActive`] unless idle; a
    /// failed recording must be collected with `finish` before a new one can
    /// start. Microphone denial fails with
    /// [`MiravaError::AudioPermissionDenied`] and leaves the state idle.
    #[tracing::instrument(skip(self, options))]
    pub fn start(
        &mut self,
        options: RecordingOptions,
        width: u32,
        height: u32,
    ) -> MiravaResult<()> {
        if self.state != RecordingState::Idle {
            return Err(MiravaError::RecordingAlreadyActive);
        }
        let fps = Fps::new(options.video_frame_rate, 1)
            .map_err(|_| MiravaError::validation("video_frame_rate must be > 0"))?;

        // An explicit track wins over `record_audio`; the controller owns
        // whichever track it ends up with until `finish`.
        let audio_track = match options.audio_track {
            Some(track) => Some(track),
            None if options.record_audio => {
                Some(self.runtime.acquire_microphone(options.audio_sample_rate)?)
            }
            None => None,
        };

        let mut backend: Box<dyn CaptureBackend> =
            if self.runtime.encoded_frame_capture_supported() {
                Box::new(EncodedFrameRecorder::new())
            } else {
                Box::new(StreamRecorder::new())
            };

        let cfg = CaptureConfig {
            width,
            height,
            fps,
            video_bit_rate: options.video_bit_rate,
            audio_bit_rate: options.audio_bit_rate,
            audio: audio_track.clone(),
        };
        if let Err(e) = backend.begin(cfg) {
            if let Some(track) = audio_track {
                track.stop();
            }
            return Err(e);
        }

        self.backend = Some(backend);
        self.audio_track = audio_track;
        self.capture_error = None;
        self.pacing = Some(Pacing {
            first_ts: 0.0,
            interval_ms: fps.frame_interval_ms(),
            captured: 0,
        });
        self.state = RecordingState::Starting;
        Ok(())
    }

    /// Offer one rendered frame to the active recording.
    ///
    /// Frames are captured at the configured frame rate, paced by the tick
    /// timestamps; offering faster than the target rate skips intermediate
    /// frames by design, slower simply captures every offered frame. The
    /// first captured frame moves starting → recording. A capture failure
    /// latches the error state; it surfaces on the next `finish`.
    pub fn on_frame(&mut self, frame: &FrameRGBA, timestamp: TimestampMs) {
        if !matches!(
            self.state,
            RecordingState::Starting | RecordingState::Recording
        ) {
            return;
        }
        let Some(pacing) = self.pacing.as_mut() else {
            return;
        };

        if pacing.captured == 0 {
            pacing.first_ts = timestamp.0;
        } else {
            let due_at = pacing.first_ts + pacing.captured as f64 * pacing.interval_ms;
            if timestamp.0 + PACING_EPS_MS < due_at {
                return;
            }
        }

        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        match backend.push_frame(frame, timestamp) {
            Ok(()) => {
                pacing.captured += 1;
                if self.state == RecordingState::Starting {
                    self.state = RecordingState::Recording;
                }
            }
            Err(e) => {
                self.capture_error.get_or_insert(e);
                self.state = RecordingState::Error;
            }
        }
    }

    /// Stop the recording and assemble the captured media.
    ///
    /// Valid from starting or recording; transitions through finishing and
    /// always returns to idle with every acquired track stopped. From the
    /// error state this surfaces the latched capture error. From idle it
    /// fails with [`MiravaError::NotRecording`].
    #[tracing::instrument(skip(self))]
    pub fn finish(&mut self) -> MiravaResult<MediaBlob> {
        match self.state {
            RecordingState::Idle | RecordingState::Finishing => Err(MiravaError::NotRecording),
            RecordingState::Error => {
                let err = self
                    .capture_error
                    .take()
                    .unwrap_or_else(|| MiravaError::capture("frame capture failed"));
                self.teardown();
                Err(err)
            }
            RecordingState::Starting | RecordingState::Recording => {
                self.state = RecordingState::Finishing;
                let result = match self.backend.as_mut() {
                    Some(backend) => backend.end(),
                    None => Err(MiravaError::capture("no capture backend active")),
                };
                self.teardown();
                result
            }
        }
    }

    /// Discard any active recording and release its resources. Used on
    /// session shutdown; produces no media object.
    pub(crate) fn shutdown(&mut self) {
        self.capture_error = None;
        self.teardown();
    }

    /// Release everything a recording holds and return to idle.
    fn teardown(&mut self) {
        if let Some(track) = self.audio_track.take() {
            track.stop();
        }
        self.backend = None;
        self.pacing = None;
        self.state = RecordingState::Idle;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/record/controller.rs"]
mod tests;
