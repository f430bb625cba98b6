//! # fedit-adapters
//!
//! The concrete adapters and the two surfaces that drive them.
//!
//! ## Adapters
//!
//! | identifier   | edits                                         |
//! |--------------|-----------------------------------------------|
//! | `field`      | one field of an object                        |
//! | `block`      | one block of a block-tree field               |
//! | `dom-block`  | a block the page already renders              |
//! | `model`      | an object as a whole                          |
//! | `field_func` | `field`, reporting back to a frontend function |
//! | `block_func` | `block`, reporting back to a frontend function |
//!
//! ## Surfaces
//!
//! Templates call [`render_tag`] for every `{% fedit ... %}` site. Editors
//! talk back through the [`Endpoint`], which the hosting web framework feeds
//! with [`EditRequest`]s.
//!
//! ```rust
//! use fedit_adapters::{FeditEnv, FeditSettings};
//!
//! let env = FeditEnv::new(FeditSettings::default()).unwrap();
//! assert!(env.registry.contains("block"));
//! assert!(env.registry.contains("field_func"));
//! ```

pub mod block;
pub mod endpoint;
pub mod env;
pub mod error;
pub mod field;
pub mod funcs;
pub mod http;
pub mod model;
pub mod routes;
pub mod settings;
pub mod tags;
pub mod toolbar;

mod html;

use fedit_core::{Registry, RegistryError};

pub use block::{BlockAdapter, BlockAdapterKind, BLOCK_IDENTIFIER, DOM_BLOCK_IDENTIFIER};
pub use endpoint::Endpoint;
pub use env::FeditEnv;
pub use error::FeditError;
pub use field::{FieldAdapter, FieldAdapterKind, FIELD_IDENTIFIER};
pub use funcs::{FuncAdapter, FuncAdapterKind};
pub use http::{EditRequest, EditResponse};
pub use model::{ModelAdapter, ModelAdapterKind, MODEL_IDENTIFIER};
pub use routes::{AdapterPath, Route, RouteError};
pub use settings::{FeditSettings, SettingsError};
pub use tags::{encode_shared_context, render_tag, TagInvocation};
pub use toolbar::{render_toolbar, toolbar_items, ToolbarItem};

/// Registry holding every built-in adapter. Call once at startup; add
/// project adapters to the returned value before sharing it.
pub fn build_registry() -> Result<Registry, RegistryError> {
    let mut registry = Registry::new();
    registry.register(FieldAdapterKind)?;
    registry.register(BlockAdapterKind::inline())?;
    registry.register(BlockAdapterKind::dom_positioned())?;
    registry.register(ModelAdapterKind)?;
    registry.register(FuncAdapterKind::new(FieldAdapterKind))?;
    registry.register(FuncAdapterKind::new(BlockAdapterKind::inline()))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry() {
        let registry = build_registry().unwrap();
        assert_eq!(
            registry.identifiers().collect::<Vec<_>>(),
            vec!["block", "block_func", "dom-block", "field", "field_func", "model"]
        );
        assert!(!registry.lookup("model").unwrap().kind().field_required());
        assert_eq!(
            registry.lookup("field_func").unwrap().usage(),
            "{% fedit field_func instance.field name=<str> target=<str> %}"
        );
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = build_registry().unwrap();
        assert!(matches!(
            registry.register(FieldAdapterKind),
            Err(RegistryError::Duplicate { .. })
        ));
    }
}
