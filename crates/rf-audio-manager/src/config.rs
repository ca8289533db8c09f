//! Audio Manager Configuration
//!
//! JSON description of the mixers the manager drives: their routing groups,
//! their exposed parameters, which group music plays on, and the one-shot
//! voice pool policy.
//!
//! ```json
//! {
//!   "mixers": [
//!     {
//!       "name": "Master Mixer",
//!       "id": "master",
//!       "groups": [{ "id": "Music", "bus": "Master/Music" }],
//!       "parameters": [{ "id": "MasterVolume", "key": "master_volume" }]
//!     }
//!   ],
//!   "music_group": "Music",
//!   "pool": { "initial_count": 8, "growable": true }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::backend::{GroupId, MixerId, ParameterId};
use crate::error::{AudioManagerResult, ConfigError};
use crate::pool::PoolPolicy;

/// Routing group declared by a mixer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub id: GroupId,
    /// Backend bus path
    pub bus: String,
}

/// Exposed parameter declared by a mixer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterConfig {
    pub id: ParameterId,
    /// Backend parameter name
    pub key: String,
}

/// One mixer and everything it exposes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Display name
    #[serde(default)]
    pub name: String,
    pub id: MixerId,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
    #[serde(default)]
    pub parameters: Vec<ParameterConfig>,
}

impl MixerConfig {
    pub fn new(id: impl Into<MixerId>) -> Self {
        let id = id.into();
        Self {
            name: id.to_string(),
            id,
            groups: Vec::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_group(mut self, id: impl Into<GroupId>, bus: impl Into<String>) -> Self {
        self.groups.push(GroupConfig {
            id: id.into(),
            bus: bus.into(),
        });
        self
    }

    pub fn with_parameter(mut self, id: impl Into<ParameterId>, key: impl Into<String>) -> Self {
        self.parameters.push(ParameterConfig {
            id: id.into(),
            key: key.into(),
        });
        self
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AudioManagerConfig {
    #[serde(default)]
    pub mixers: Vec<MixerConfig>,
    /// Group the music channel is routed to
    #[serde(default)]
    pub music_group: Option<GroupId>,
    #[serde(default)]
    pub pool: PoolPolicy,
}

impl AudioManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mixer(mut self, mixer: MixerConfig) -> Self {
        self.mixers.push(mixer);
        self
    }

    pub fn with_music_group(mut self, group: impl Into<GroupId>) -> Self {
        self.music_group = Some(group.into());
        self
    }

    pub fn with_pool(mut self, pool: PoolPolicy) -> Self {
        self.pool = pool;
        self
    }

    /// Parse and validate
    pub fn from_json(json: &str) -> AudioManagerResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> AudioManagerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ids are unique, keys are non-empty and the music group exists
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut mixers = HashSet::new();
        let mut groups = HashSet::new();
        let mut parameters = HashSet::new();

        for mixer in &self.mixers {
            if !mixers.insert(&mixer.id) {
                return Err(ConfigError::DuplicateMixer(mixer.id.to_string()));
            }

            for group in &mixer.groups {
                if !groups.insert(&group.id) {
                    return Err(ConfigError::DuplicateGroup(group.id.to_string()));
                }
                if group.bus.trim().is_empty() {
                    return Err(ConfigError::EmptyKey(group.id.to_string()));
                }
            }

            for param in &mixer.parameters {
                if !parameters.insert(&param.id) {
                    return Err(ConfigError::DuplicateParameter(param.id.to_string()));
                }
                if param.key.trim().is_empty() {
                    return Err(ConfigError::EmptyKey(param.id.to_string()));
                }
            }
        }

        if let Some(music) = &self.music_group {
            if !groups.contains(music) {
                return Err(ConfigError::UnknownMusicGroup(music.to_string()));
            }
        }

        Ok(())
    }

    /// Total exposed parameters across all mixers
    pub fn parameter_count(&self) -> usize {
        self.mixers.iter().map(|m| m.parameters.len()).sum()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
