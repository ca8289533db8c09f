//! Parameter Registry
//!
//! Lookup tables populated once at startup from configuration:
//! - exposed parameter id → (mixer, backend key)
//! - mixer group id → (mixer, bus) routing destination
//!
//! Reads and writes are delegated to the resolved mixer backend.

use std::collections::HashMap;

use crate::backend::{GroupId, MixerBackend, MixerId, ParameterId};
use crate::config::AudioManagerConfig;
use crate::error::RegistryError;

/// Resolved exposed parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposedParameter {
    pub id: ParameterId,
    /// Owning mixer
    pub mixer: MixerId,
    /// Backend-specific parameter name
    pub key: String,
}

/// Resolved routing destination for a voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerGroup {
    pub id: GroupId,
    pub mixer: MixerId,
    /// Backend bus path
    pub bus: String,
}

/// Parameter and group lookup
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    parameters: HashMap<ParameterId, ExposedParameter>,
    groups: HashMap<GroupId, MixerGroup>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a validated configuration
    pub fn from_config(config: &AudioManagerConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();

        for mixer in &config.mixers {
            for group in &mixer.groups {
                registry.register_group(group.id.clone(), mixer.id.clone(), group.bus.clone())?;
            }
            for param in &mixer.parameters {
                registry.register_parameter(param.id.clone(), mixer.id.clone(), param.key.clone())?;
            }
        }

        log::debug!(
            "Parameter registry: {} parameters, {} groups",
            registry.parameters.len(),
            registry.groups.len()
        );

        Ok(registry)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn register_parameter(
        &mut self,
        id: ParameterId,
        mixer: MixerId,
        key: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if self.parameters.contains_key(&id) {
            return Err(RegistryError::DuplicateParameter(id));
        }
        let param = ExposedParameter {
            id: id.clone(),
            mixer,
            key: key.into(),
        };
        self.parameters.insert(id, param);
        Ok(())
    }

    pub fn register_group(
        &mut self,
        id: GroupId,
        mixer: MixerId,
        bus: impl Into<String>,
    ) -> Result<(), RegistryError> {
        if self.groups.contains_key(&id) {
            return Err(RegistryError::DuplicateGroup(id));
        }
        let group = MixerGroup {
            id: id.clone(),
            mixer,
            bus: bus.into(),
        };
        self.groups.insert(id, group);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn resolve(&self, id: &ParameterId) -> Option<&ExposedParameter> {
        self.parameters.get(id)
    }

    pub fn resolve_group(&self, id: &GroupId) -> Option<&MixerGroup> {
        self.groups.get(id)
    }

    pub fn contains(&self, id: &ParameterId) -> bool {
        self.parameters.contains_key(id)
    }

    pub fn parameter_ids(&self) -> impl Iterator<Item = &ParameterId> {
        self.parameters.keys()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BACKEND ACCESS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Read the current value through the owning mixer
    pub fn get<M: MixerBackend + ?Sized>(
        &self,
        id: &ParameterId,
        mixer: &M,
    ) -> Result<f32, RegistryError> {
        let param = self
            .resolve(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        mixer
            .get_parameter(&param.mixer, &param.key)
            .ok_or_else(|| RegistryError::BackendRejected(id.clone()))
    }

    /// Write a value through the owning mixer
    pub fn set<M: MixerBackend + ?Sized>(
        &self,
        id: &ParameterId,
        value: f32,
        mixer: &mut M,
    ) -> Result<(), RegistryError> {
        let param = self
            .resolve(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))?;
        write_parameter(param, value, mixer)
    }
}

/// Write to an already-resolved parameter
pub(crate) fn write_parameter<M: MixerBackend + ?Sized>(
    param: &ExposedParameter,
    value: f32,
    mixer: &mut M,
) -> Result<(), RegistryError> {
    if mixer.set_parameter(&param.mixer, &param.key, value) {
        Ok(())
    } else {
        Err(RegistryError::BackendRejected(param.id.clone()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimMixer;

    fn registry() -> ParameterRegistry {
        let mut reg = ParameterRegistry::new();
        reg.register_parameter("MasterVolume".into(), "master".into(), "master_volume")
            .unwrap();
        reg.register_group("Music".into(), "master".into(), "Master/Music")
            .unwrap();
        reg
    }

    #[test]
    fn test_resolve() {
        let reg = registry();
        let param = reg.resolve(&"MasterVolume".into()).unwrap();
        assert_eq!(param.mixer, MixerId::from("master"));
        assert_eq!(param.key, "master_volume");

        assert!(reg.resolve(&"Nope".into()).is_none());
        assert_eq!(reg.resolve_group(&"Music".into()).unwrap().bus, "Master/Music");
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut reg = registry();
        let err = reg
            .register_parameter("MasterVolume".into(), "other".into(), "x")
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateParameter("MasterVolume".into()));

        let err = reg
            .register_group("Music".into(), "other".into(), "x")
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateGroup("Music".into()));
    }

    #[test]
    fn test_get_set_through_backend() {
        let reg = registry();
        let mut mixer = SimMixer::new();
        mixer.insert("master", "master_volume", -10.0);

        let id = ParameterId::from("MasterVolume");
        assert_eq!(reg.get(&id, &mixer), Ok(-10.0));
        assert_eq!(reg.set(&id, -3.0, &mut mixer), Ok(()));
        assert_eq!(mixer.value("master", "master_volume"), Some(-3.0));
    }

    #[test]
    fn test_missing_mapping_and_backend_failure() {
        let reg = registry();
        let mut mixer = SimMixer::new();

        let unknown = ParameterId::from("Pitch");
        assert_eq!(reg.get(&unknown, &mixer), Err(RegistryError::NotFound(unknown.clone())));
        assert_eq!(
            reg.set(&unknown, 1.0, &mut mixer),
            Err(RegistryError::NotFound(unknown))
        );

        // Known id, but the mixer does not expose the key
        let id = ParameterId::from("MasterVolume");
        assert_eq!(reg.get(&id, &mixer), Err(RegistryError::BackendRejected(id.clone())));
        mixer.set_read_only(true);
        assert_eq!(
            reg.set(&id, 0.0, &mut mixer),
            Err(RegistryError::BackendRejected(id))
        );
    }
}
