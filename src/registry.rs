// Microgame registry: a read-only lookup from id to factory.
// Built once at startup and shared with engines by Rc; never mutated afterwards.

use std::collections::HashMap;
use std::fmt;

use crate::error::EngineError;
use crate::microgame::{Avoid, Catch, Collect, Microgame, MicrogameSetup};
use crate::types::MicrogameId;

/// Constructs a unit without starting it.
pub type MicrogameFactory = Box<dyn Fn(MicrogameSetup) -> Result<Box<dyn Microgame>, EngineError>>;

pub struct MicrogameRegistry {
    factories: HashMap<MicrogameId, MicrogameFactory>,
}

impl MicrogameRegistry {
    /// Start an empty registry. Use [`RegistryBuilder::build`] to freeze it.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder {
            factories: HashMap::new(),
        }
    }

    /// Registry containing the built-in game types.
    pub fn with_builtins() -> Self {
        Self::builder()
            .register("avoid", |setup| Ok(Box::new(Avoid::new(setup))))
            .register("catch", |setup| Ok(Box::new(Catch::new(setup))))
            .register("collect", |setup| Ok(Box::new(Collect::new(setup))))
            .build()
    }

    pub fn contains(&self, id: &MicrogameId) -> bool {
        self.factories.contains_key(id)
    }

    /// Construct the unit registered under `id`.
    pub fn spawn(&self, id: &MicrogameId, setup: MicrogameSetup) -> Result<Box<dyn Microgame>, EngineError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| EngineError::UnknownMicrogame(id.clone()))?;
        factory(setup)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&MicrogameId> {
        let mut ids: Vec<_> = self.factories.keys().collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for MicrogameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrogameRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

pub struct RegistryBuilder {
    factories: HashMap<MicrogameId, MicrogameFactory>,
}

impl RegistryBuilder {
    /// Register a factory. A later registration for the same id replaces the earlier one.
    pub fn register<F>(mut self, id: impl Into<MicrogameId>, factory: F) -> Self
    where
        F: Fn(MicrogameSetup) -> Result<Box<dyn Microgame>, EngineError> + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
        self
    }

    pub fn build(self) -> MicrogameRegistry {
        MicrogameRegistry {
            factories: self.factories,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::SkinConfig;
    use crate::microgame::result_channel;

    fn setup() -> MicrogameSetup {
        let (reporter, _slot) = result_channel();
        MicrogameSetup {
            reporter,
            skin: SkinConfig::new(),
            variant: None,
            seed: 0,
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = MicrogameRegistry::with_builtins();
        let ids: Vec<&str> = registry.ids().into_iter().map(MicrogameId::as_str).collect();
        assert_eq!(ids, vec!["avoid", "catch", "collect"]);
        assert!(registry.spawn(&MicrogameId::new("catch"), setup()).is_ok());
    }

    #[test]
    fn unknown_id_is_an_error() {
        let registry = MicrogameRegistry::with_builtins();
        let err = registry
            .spawn(&MicrogameId::new("tetris"), setup())
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::UnknownMicrogame(id) if id.as_str() == "tetris"));
    }

    #[test]
    fn factory_errors_pass_through() {
        let registry = MicrogameRegistry::builder()
            .register("broken", |_| Err(EngineError::InvalidConfig("no assets".into())))
            .build();
        assert!(registry.contains(&MicrogameId::new("broken")));
        assert!(registry.spawn(&MicrogameId::new("broken"), setup()).is_err());
    }
}
