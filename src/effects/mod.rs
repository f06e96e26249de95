//! Effect slots: cancellable asynchronous loading of AR effects.
//!
//! A slot holds at most one active effect and at most one in-flight load.
//! Loads fetch off the session thread and apply on it; a superseded load is
//! discarded at completion time by a generation check rather than interrupted
//! mid-flight.

pub mod fetch;
pub mod slots;
pub mod source;
