//! Process-lifetime state: the registry, the active codec and settings.

use fedit_codec::CodecMode;
use fedit_core::{ContentStore, Registry};

use crate::endpoint::Endpoint;
use crate::error::FeditError;
use crate::settings::FeditSettings;

/// Built once at startup and shared by reference with every request.
#[derive(Debug)]
pub struct FeditEnv {
    pub registry: Registry,
    pub codec: CodecMode,
    pub settings: FeditSettings,
}

impl FeditEnv {
    /// The built-in adapters plus the codec `settings` select.
    pub fn new(settings: FeditSettings) -> Result<Self, FeditError> {
        Ok(Self::with_registry(crate::build_registry()?, settings))
    }

    pub fn with_registry(registry: Registry, settings: FeditSettings) -> Self {
        let codec = CodecMode::from_config(&settings.codec);
        log::info!(
            "fedit ready: {} adapters, {} shared context, routes under {}",
            registry.len(),
            codec.kind(),
            settings.url_prefix
        );
        Self {
            registry,
            codec,
            settings,
        }
    }

    /// Request handler bound to `store`.
    pub fn endpoint<'a>(&'a self, store: &'a dyn ContentStore) -> Endpoint<'a> {
        Endpoint::new(self, store)
    }
}
