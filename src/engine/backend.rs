//! The engine call/callback surface and the data types exchanged across it.

use smallvec::SmallVec;

use crate::foundation::core::{FrameRGBA, Point, Rect};
use crate::foundation::error::MiravaResult;

/// Opaque identifier of an effect resource constructed inside the engine.
///
/// A handle is exclusively owned by the slot that loaded it and must be
/// released back to the engine exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectHandle(u64);

impl EffectHandle {
    /// Wrap a raw engine resource id. Engine implementations call this.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw engine resource id.
    pub fn as_raw(self) -> u64 {
        self.0
    }
}

/// Per-face tracking result delivered on every tick while face tracking runs.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceData {
    /// True if this face is currently detected.
    pub detected: bool,
    /// (x, y, z) translation of the face in 3D space.
    pub translation: [f64; 3],
    /// (x, y, z) rotation of the face in 3D space.
    pub rotation: [f64; 3],
    /// Rectangle containing the face in screen coordinates.
    pub face_rect: Rect,
    /// 2D face landmarks in screen space.
    pub landmarks2d: Vec<Point>,
}

/// Per-foot tracking result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FootData {
    /// True if the foot is currently detected.
    pub detected: bool,
}

/// Wrist tracking result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WristData {
    /// True if the wrist is currently detected.
    pub detected: bool,
    /// True for the left hand, false for the right.
    pub is_left: bool,
}

/// Everything the engine produced for one processed input frame.
#[derive(Clone, Debug, Default)]
pub struct TickOutput {
    /// The composited output frame.
    pub frame: FrameRGBA,
    /// Tracked faces, present only while some loaded effect runs face tracking.
    pub faces: SmallVec<[FaceData; 4]>,
    /// Left/right foot tracking results, when foot tracking runs.
    pub feet: Option<(FootData, FootData)>,
    /// Wrist tracking result, when wrist tracking runs.
    pub wrist: Option<WristData>,
    /// True once segmentation has finished initializing.
    pub segmentation_initialized: bool,
    /// True once foot tracking has finished initializing.
    pub foot_tracking_initialized: bool,
}

/// Capability surface of the native tracking/rendering engine.
///
/// Everything behind this trait is out of scope for the session core: the
/// inference models, the 3D renderer, physics, and the effect package format
/// are all opaque. Implementations are single-threaded; every call happens on
/// the session thread.
pub trait TrackingEngine {
    /// Construct an effect from package bytes, bound to `slot` and attached
    /// to face `face`, returning the engine resource handle.
    fn load_effect(&mut self, bytes: &[u8], slot: &str, face: u32) -> MiravaResult<EffectHandle>;

    /// Release an effect resource. Called exactly once per handle.
    fn release_effect(&mut self, handle: EffectHandle);

    /// Override the environment map used for PBR materials.
    fn set_environment_map(&mut self, bytes: &[u8]) -> MiravaResult<()>;

    /// Override the environment map used by the diamond shader.
    fn set_diamond_environment_map(&mut self, bytes: &[u8]) -> MiravaResult<()>;

    /// Process one input frame: run tracking, composite loaded effects, and
    /// return the rendered frame plus tracking results.
    fn process_frame(&mut self, input: &FrameRGBA) -> MiravaResult<TickOutput>;

    /// Fire a named animation trigger in the currently loaded effects.
    fn fire_trigger(&mut self, trigger: &str);
}
