//! The native tracking/rendering engine boundary.
//!
//! The engine is an injected capability, not a base class: the session core
//! only sees the narrow call/callback surface in [`backend`], so it can be
//! driven by a scripted fake in tests.

pub mod backend;
