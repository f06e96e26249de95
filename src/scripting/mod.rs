//! Typed variable interop with the loaded effect graph.

pub mod vars;
