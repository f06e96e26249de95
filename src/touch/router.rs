//! Pointer/touch routing for the presentation surface.

use crate::foundation::core::Point;

/// Phase of a touch or pointer interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TouchPhase {
    /// Touch started.
    Start,
    /// Touch is pressed and moving.
    Move,
    /// Touch ended.
    End,
}

/// Raw pointer event from the presentation surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    /// Identity of the pointer as assigned by the surface.
    pub pointer_id: u64,
    /// Position in surface coordinates.
    pub position: Point,
    /// Event phase.
    pub phase: TouchPhase,
}

/// Normalized touch event delivered to the registered listener.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    /// Position in surface coordinates.
    pub position: Point,
    /// Event phase.
    pub phase: TouchPhase,
}

/// The single listener receiving normalized touch events.
pub type TouchListener = Box<dyn FnMut(TouchEvent)>;

struct ActiveGesture {
    pointer_id: u64,
    last_position: Point,
}

/// Demultiplexes raw pointer events into one normalized gesture stream.
///
/// At most one gesture is active at a time, first-touch-wins: while a gesture
/// is in progress, `Start` and `Move` events from other pointers are ignored.
/// `End` from the active pointer always clears the gesture, wherever it
/// lands. Each accepted event is delivered to exactly one listener; dispatch
/// is synchronous, so swapping the listener between events never loses one.
#[derive(Default)]
pub struct TouchRouter {
    active: Option<ActiveGesture>,
    listener: Option<TouchListener>,
}

impl TouchRouter {
    /// A router with no active gesture and no listener.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the listener. Returns the previous one, if any.
    pub fn set_listener(&mut self, listener: TouchListener) -> Option<TouchListener> {
        self.listener.replace(listener)
    }

    /// Remove the listener. Accepted events are dropped until a new one is set.
    pub fn clear_listener(&mut self) -> Option<TouchListener> {
        self.listener.take()
    }

    /// Forget the active gesture, e.g. when the surface is invalidated.
    pub fn reset(&mut self) {
        self.active = None;
    }

    /// Position of the active gesture, if one is in progress.
    pub fn active_position(&self) -> Option<Point> {
        self.active.as_ref().map(|g| g.last_position)
    }

    /// Route one raw pointer event. Returns the normalized event if it was
    /// accepted and delivered (or would have been, had a listener been set).
    pub fn handle(&mut self, event: PointerEvent) -> Option<TouchEvent> {
        let accepted = match event.phase {
            TouchPhase::Start => {
                if self.active.is_some() {
                    return None;
                }
                self.active = Some(ActiveGesture {
                    pointer_id: event.pointer_id,
                    last_position: event.position,
                });
                true
            }
            TouchPhase::Move => match self.active.as_mut() {
                Some(gesture) if gesture.pointer_id == event.pointer_id => {
                    gesture.last_position = event.position;
                    true
                }
                _ => false,
            },
            TouchPhase::End => match self.active.as_ref() {
                Some(gesture) if gesture.pointer_id == event.pointer_id => {
                    self.active = None;
                    true
                }
                _ => false,
            },
        };
        if !accepted {
            return None;
        }

        let normalized = TouchEvent {
            position: event.position,
            phase: event.phase,
        };
        if let Some(listener) = self.listener.as_mut() {
            listener(normalized);
        }
        Some(normalized)
    }
}
