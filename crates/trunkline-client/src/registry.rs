//! Game-variant registry.
//!
//! Variants are resolved through an explicit factory map at configuration
//! load time; asking for an unknown tag fails up front instead of at first
//! use.

use std::collections::BTreeMap;

use thiserror::Error;
use trunkline_core::{load_catalog, CatalogError, CatalogSource, PhaseSchedule, TileCatalog, TrainRoster};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown game variant '{0}'")]
    UnknownVariant(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Everything a variant contributes: tiles, phases and the train roster.
pub struct GameData {
    pub catalog: TileCatalog,
    pub schedule: PhaseSchedule,
    pub trains: TrainRoster,
}

pub type VariantBuilder = fn() -> Result<GameData, RegistryError>;

/// Explicit tag -> constructor map.
#[derive(Default)]
pub struct VariantRegistry {
    builders: BTreeMap<String, VariantBuilder>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry: just the embedded base variant.
    pub fn with_base() -> Self {
        let mut registry = Self::new();
        registry.register("base", build_base);
        registry
    }

    pub fn register(&mut self, tag: impl Into<String>, builder: VariantBuilder) {
        self.builders.insert(tag.into(), builder);
    }

    pub fn resolve(&self, tag: &str) -> Result<GameData, RegistryError> {
        let builder = self
            .builders
            .get(tag)
            .ok_or_else(|| RegistryError::UnknownVariant(tag.to_string()))?;
        builder()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}

fn build_base() -> Result<GameData, RegistryError> {
    let (catalog, schedule) = load_catalog(CatalogSource::Embedded)?;
    Ok(GameData {
        catalog,
        schedule,
        // 2- and 3-stop trains to start with.
        trains: TrainRoster::new(vec![2, 3]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_variant_resolves() {
        let registry = VariantRegistry::with_base();
        let data = registry.resolve("base").unwrap();
        assert!(!data.catalog.is_empty());
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["base"]);
    }

    #[test]
    fn unknown_variant_fails_at_resolve_time() {
        let registry = VariantRegistry::with_base();
        assert!(matches!(
            registry.resolve("1830"),
            Err(RegistryError::UnknownVariant(_))
        ));
    }
}
