//! The AR session façade and its configuration options.

use std::sync::Arc;

use crate::effects::fetch::EffectFetcher;
use crate::effects::slots::{LoadTicket, PumpEvent, SlotManager};
use crate::effects::source::{EffectSource, SwitchOptions};
use crate::engine::backend::{EffectHandle, TickOutput, TrackingEngine};
use crate::foundation::core::{FrameRGBA, TimestampMs};
use crate::foundation::error::{MiravaError, MiravaResult};
use crate::record::backend::{CaptureRuntime, MediaBlob};
use crate::record::controller::{RecordingController, RecordingOptions, RecordingState};
use crate::scripting::vars::VarStore;
use crate::session::callbacks::SessionCallbacks;
use crate::touch::router::{PointerEvent, TouchListener, TouchRouter};

/// Construction parameters for [`ArSession`].
#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    /// Width of the presentation surface in pixels.
    pub width: u32,
    /// Height of the presentation surface in pixels.
    pub height: u32,
}

/// The AR compositing session.
///
/// A session is driven by calling [`process_frame`](ArSession::process_frame)
/// for every camera/video frame. Every mutation operation offered here
/// (switching effects, recording, setting variables, touch delivery) runs on
/// that same thread and never blocks the frame tick: anything that does real
/// IO happens on worker threads and settles when the tick pumps completions.
pub struct ArSession {
    engine: Box<dyn TrackingEngine>,
    slots: SlotManager,
    vars: VarStore,
    touch: TouchRouter,
    recorder: RecordingController,
    /// Event listeners. Attach and detach freely between frames.
    pub callbacks: SessionCallbacks,
    options: SessionOptions,
    last_frame: Option<FrameRGBA>,
    face_visible: bool,
    foot_tracking_initialized: bool,
    segmentation_initialized: bool,
    paused: bool,
    shut_down: bool,
}

impl ArSession {
    /// Compose a session from its injected capabilities.
    pub fn new(
        engine: Box<dyn TrackingEngine>,
        fetcher: Arc<dyn EffectFetcher>,
        capture: Box<dyn CaptureRuntime>,
        options: SessionOptions,
    ) -> MiravaResult<Self> {
        if options.width == 0 || options.height == 0 {
            return Err(MiravaError::validation(
                "session width/height must be non-zero",
            ));
        }
        Ok(Self {
            engine,
            slots: SlotManager::new(fetcher),
            vars: VarStore::new(),
            touch: TouchRouter::new(),
            recorder: RecordingController::new(capture),
            callbacks: SessionCallbacks::default(),
            options,
            last_frame: None,
            face_visible: false,
            foot_tracking_initialized: false,
            segmentation_initialized: false,
            paused: false,
            shut_down: false,
        })
    }

    /// Drive one tick: settle finished effect loads, process the input frame
    /// through the engine, feed the recorder, and dispatch event callbacks.
    ///
    /// Loads settle even while paused; engine processing, recording, and
    /// callbacks are skipped until unpaused. An engine failure is returned to
    /// the caller but leaves the session usable for the next tick.
    pub fn process_frame(
        &mut self,
        input: &FrameRGBA,
        timestamp: TimestampMs,
    ) -> MiravaResult<()> {
        self.ensure_live()?;

        for event in self.slots.pump(self.engine.as_mut()) {
            if let PumpEvent::Applied { slot } = event {
                self.vars.register_slot(&slot);
            }
        }
        if self.paused {
            return Ok(());
        }

        let output = self.engine.process_frame(input)?;
        self.recorder.on_frame(&output.frame, timestamp);
        self.dispatch(&output);
        self.last_frame = Some(output.frame);
        Ok(())
    }

    /// Switch the AR effect loaded in a slot. See
    /// [`SlotManager::switch_effect`] for the supersession contract.
    pub fn switch_effect(
        &mut self,
        source: impl Into<EffectSource>,
        options: SwitchOptions,
    ) -> MiravaResult<LoadTicket> {
        self.ensure_live()?;
        self.slots.switch_effect(source.into(), options)
    }

    /// Clear `slot`: cancel its pending load, release its effect, and drop
    /// its scripting variables. A no-op on an empty or unknown slot.
    pub fn clear_effect(&mut self, slot: &str) -> MiravaResult<()> {
        self.ensure_live()?;
        self.slots.clear_effect(slot, self.engine.as_mut());
        self.vars.drop_slot(slot);
        Ok(())
    }

    /// Handle of the effect currently loaded in `slot`, if any.
    pub fn active_effect(&self, slot: &str) -> Option<EffectHandle> {
        self.slots.active_effect(slot)
    }

    /// True while an effect load is pending on `slot`.
    pub fn is_effect_loading(&self, slot: &str) -> bool {
        self.slots.is_loading(slot)
    }

    /// Start video recording of the composited output.
    pub fn start_video_recording(&mut self, options: RecordingOptions) -> MiravaResult<()> {
        self.ensure_live()?;
        self.recorder
            .start(options, self.options.width, self.options.height)
    }

    /// Stop recording and return the assembled media object.
    pub fn finish_video_recording(&mut self) -> MiravaResult<MediaBlob> {
        self.ensure_live()?;
        self.recorder.finish()
    }

    /// Current phase of the recording state machine.
    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    /// The scripting variable interop surface.
    pub fn scripting(&self) -> &VarStore {
        &self.vars
    }

    /// Mutable scripting variable interop surface.
    pub fn scripting_mut(&mut self) -> &mut VarStore {
        &mut self.vars
    }

    /// Deliver a raw pointer event from the presentation surface.
    pub fn pointer_event(&mut self, event: PointerEvent) {
        if self.shut_down {
            return;
        }
        self.touch.handle(event);
    }

    /// Register the touch listener, replacing any previous one.
    pub fn set_touch_listener(&mut self, listener: TouchListener) -> Option<TouchListener> {
        self.touch.set_listener(listener)
    }

    /// Remove the touch listener.
    pub fn clear_touch_listener(&mut self) -> Option<TouchListener> {
        self.touch.clear_listener()
    }

    /// PNG-encode the most recently composited frame.
    pub fn take_screenshot(&self) -> MiravaResult<Vec<u8>> {
        self.ensure_live()?;
        let frame = self
            .last_frame
            .as_ref()
            .ok_or_else(|| MiravaError::validation("no frame has been processed yet"))?;
        let img =
            image::RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
                .ok_or_else(|| MiravaError::validation("last frame has inconsistent dimensions"))?;
        let mut png = std::io::Cursor::new(Vec::new());
        use anyhow::Context as _;
        img.write_to(&mut png, image::ImageFormat::Png)
            .context("encode screenshot PNG")?;
        Ok(png.into_inner())
    }

    /// Pause or resume engine processing. While paused, ticks still settle
    /// effect loads but render, record, and dispatch nothing.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Fire a named animation trigger in the loaded effects.
    pub fn fire_trigger(&mut self, trigger: &str) -> MiravaResult<()> {
        self.ensure_live()?;
        self.engine.fire_trigger(trigger);
        Ok(())
    }

    /// True once foot tracking reported initialized.
    pub fn is_foot_tracking_initialized(&self) -> bool {
        self.foot_tracking_initialized
    }

    /// True once segmentation reported initialized.
    pub fn is_segmentation_initialized(&self) -> bool {
        self.segmentation_initialized
    }

    /// Release every held resource: pending loads settle as canceled, effect
    /// handles are released, any active recording is discarded with its
    /// tracks stopped. Further session calls fail; shutdown itself is
    /// idempotent.
    #[tracing::instrument(skip(self))]
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.slots.clear_all(self.engine.as_mut());
        self.recorder.shutdown();
        self.touch.reset();
        self.vars = VarStore::new();
        self.last_frame = None;
        self.shut_down = true;
    }

    fn ensure_live(&self) -> MiravaResult<()> {
        if self.shut_down {
            return Err(MiravaError::validation("session has been shut down"));
        }
        Ok(())
    }

    fn dispatch(&mut self, output: &TickOutput) {
        if !output.faces.is_empty() {
            if let Some(cb) = self.callbacks.on_face_tracked.as_mut() {
                cb(&output.faces);
            }
            let visible = output.faces.iter().any(|f| f.detected);
            if visible != self.face_visible {
                self.face_visible = visible;
                if let Some(cb) = self.callbacks.on_face_visibility_changed.as_mut() {
                    cb(visible);
                }
            }
        }
        if let Some((left, right)) = output.feet.as_ref() {
            if let Some(cb) = self.callbacks.on_feet_tracked.as_mut() {
                cb(left, right);
            }
        }
        if let Some(wrist) = output.wrist.as_ref() {
            if let Some(cb) = self.callbacks.on_wrist_tracked.as_mut() {
                cb(wrist);
            }
        }
        if output.foot_tracking_initialized && !self.foot_tracking_initialized {
            self.foot_tracking_initialized = true;
            if let Some(cb) = self.callbacks.on_foot_tracking_initialized.as_mut() {
                cb();
            }
        }
        if output.segmentation_initialized && !self.segmentation_initialized {
            self.segmentation_initialized = true;
            if let Some(cb) = self.callbacks.on_segmentation_initialized.as_mut() {
                cb();
            }
        }
    }
}
