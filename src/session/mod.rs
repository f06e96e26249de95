//! The session façade: composes the engine, effect slots, scripting
//! variables, touch routing, and recording behind one per-frame drive loop.

pub mod ar_session;
pub mod callbacks;
