//! Video recording: a state machine over two interchangeable capture backends.
//!
//! Backends satisfy one begin/push/end contract and are selected once per
//! recording by capability probing, never switched mid-recording.

pub mod backend;
pub mod controller;
pub mod encoded;
pub mod stream;
