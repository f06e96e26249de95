//! Session event callbacks and their cardinality contract.

use crate::engine::backend::{FaceData, FootData, WristData};

/// Listeners for engine events, with an explicit cardinality contract.
///
/// Per-frame events fire on every processed frame while the relevant tracker
/// runs. Edge events fire only when the observed value changes. Fire-once
/// events fire at most once per session, and never re-fire for a listener
/// attached after the fact; use the session's `is_*_initialized` queries
/// before attaching one.
#[derive(Default)]
pub struct SessionCallbacks {
    /// Per-frame: tracked faces, while some loaded effect runs face tracking.
    pub on_face_tracked: Option<Box<dyn FnMut(&[FaceData])>>,
    /// Edge: a face entered or left the camera field of view.
    pub on_face_visibility_changed: Option<Box<dyn FnMut(bool)>>,
    /// Per-frame: left and right foot tracking results.
    pub on_feet_tracked: Option<Box<dyn FnMut(&FootData, &FootData)>>,
    /// Per-frame: wrist tracking result.
    pub on_wrist_tracked: Option<Box<dyn FnMut(&WristData)>>,
    /// Fire-once: foot tracking finished initializing.
    pub on_foot_tracking_initialized: Option<Box<dyn FnMut()>>,
    /// Fire-once: segmentation finished initializing.
    pub on_segmentation_initialized: Option<Box<dyn FnMut()>>,
}

impl std::fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("on_face_tracked", &self.on_face_tracked.is_some())
            .field(
                "on_face_visibility_changed",
                &self.on_face_visibility_changed.is_some(),
            )
            .field("on_feet_tracked", &self.on_feet_tracked.is_some())
            .field("on_wrist_tracked", &self.on_wrist_tracked.is_some())
            .field(
                "on_foot_tracking_initialized",
                &self.on_foot_tracking_initialized.is_some(),
            )
            .field(
                "on_segmentation_initialized",
                &self.on_segmentation_initialized.is_some(),
            )
            .finish()
    }
}
