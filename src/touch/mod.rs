//! Pointer/touch demultiplexing for the presentation surface.

pub mod router;
