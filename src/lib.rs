//! Mirava is a real-time AR effect compositing session engine.
//!
//! A session multiplexes independently loaded AR effects onto a live frame
//! stream, exposes a typed variable interop surface into the loaded effect
//! graph, and records the composited output through one of two
//! interchangeable capture backends.
//!
//! # Session overview
//!
//! 1. **Inject capabilities**: a [`TrackingEngine`] (the opaque native
//!    tracker/renderer), an [`EffectFetcher`] (package IO), and a
//!    [`CaptureRuntime`] (media capabilities of the host).
//! 2. **Drive frames**: call [`ArSession::process_frame`] per camera frame.
//!    The tick never blocks on loads, permissions, or recording.
//! 3. **Mutate freely**: [`ArSession::switch_effect`] serializes loads per
//!    slot with last-writer-wins supersession; recording runs a strict
//!    idle → starting → recording → finishing state machine.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Engine as capability**: the native engine is an injected interface,
//!   so the session core is testable against a scripted fake.
//! - **Lazy cancellation**: superseded effect loads are discarded at
//!   completion time by a generation check, never interrupted mid-flight.
//! - **No wall clock**: frame pacing derives from tick timestamps, keeping
//!   recording deterministic for a given input sequence.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Cancellable effect loading into named slots.
pub mod effects;
/// The native tracking/rendering engine boundary.
pub mod engine;
/// Video recording over interchangeable capture backends.
pub mod record;
/// Typed variable interop with loaded effects.
pub mod scripting;
/// The session façade.
pub mod session;
/// Pointer/touch demultiplexing.
pub mod touch;

pub use crate::foundation::core::{FrameRGBA, Fps, Point, Rect, TimestampMs};
pub use crate::foundation::error::{MiravaError, MiravaResult};

pub use crate::effects::fetch::{EffectFetcher, FileFetcher, MemoryFetcher};
pub use crate::effects::slots::{LoadOutcome, LoadTicket, SlotManager};
pub use crate::effects::source::{DEFAULT_SLOT, EffectSource, MAX_FACE_INDEX, SwitchOptions};
pub use crate::engine::backend::{
    EffectHandle, FaceData, FootData, TickOutput, TrackingEngine, WristData,
};
pub use crate::record::backend::{
    AudioManifest, AudioTrack, CaptureBackend, CaptureConfig, CaptureKind, CaptureRuntime,
    ContainerManifest, FixedCaptureRuntime, MediaBlob, MediaChunk,
};
pub use crate::record::controller::{
    DEFAULT_AUDIO_BIT_RATE, DEFAULT_AUDIO_SAMPLE_RATE, DEFAULT_VIDEO_BIT_RATE,
    DEFAULT_VIDEO_FRAME_RATE, RecordingController, RecordingOptions, RecordingState,
};
pub use crate::record::encoded::EncodedFrameRecorder;
pub use crate::record::stream::StreamRecorder;
pub use crate::scripting::vars::{VarStore, VarType};
pub use crate::session::ar_session::{ArSession, SessionOptions};
pub use crate::session::callbacks::SessionCallbacks;
pub use crate::touch::router::{PointerEvent, TouchEvent, TouchListener, TouchPhase, TouchRouter};
