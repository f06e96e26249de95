//! Describes where an effect is loaded from.

use std::sync::Arc;

/// The slot used when the caller does not name one.
pub const DEFAULT_SLOT: &str = "DEFAULT_SLOT";

/// Highest face index an effect can attach to.
pub const MAX_FACE_INDEX: u32 = 3;

/// Where effect package bytes come from.
///
/// The package format itself is opaque; only the engine understands it.
#[derive(Clone, Debug)]
pub enum EffectSource {
    /// A URL or path resolved by the session's [`EffectFetcher`](crate::effects::fetch::EffectFetcher).
    Url(String),
    /// Already-fetched package bytes.
    Bytes(Arc<[u8]>),
}

impl EffectSource {
    /// Short description used in error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            EffectSource::Url(url) => url.clone(),
            EffectSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
        }
    }
}

impl From<&str> for EffectSource {
    fn from(url: &str) -> Self {
        EffectSource::Url(url.to_string())
    }
}

impl From<String> for EffectSource {
    fn from(url: String) -> Self {
        EffectSource::Url(url)
    }
}

impl From<Vec<u8>> for EffectSource {
    fn from(bytes: Vec<u8>) -> Self {
        EffectSource::Bytes(bytes.into())
    }
}

/// Options for `switch_effect`.
#[derive(Clone, Debug)]
pub struct SwitchOptions {
    /// Target slot. Replacing or clearing an effect later uses the same name.
    pub slot: String,
    /// Face index (0..=3) a face-filter effect attaches to.
    pub face: u32,
    /// Optional environment map applied together with the effect.
    pub envmap: Option<EffectSource>,
    /// Optional diamond-shader environment map applied together with the effect.
    pub diamond_envmap: Option<EffectSource>,
}

impl Default for SwitchOptions {
    fn default() -> Self {
        Self {
            slot: DEFAULT_SLOT.to_string(),
            face: 0,
            envmap: None,
            diamond_envmap: None,
        }
    }
}

impl SwitchOptions {
    /// Options targeting a named slot, other fields default.
    pub fn for_slot(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            ..Self::default()
        }
    }
}
