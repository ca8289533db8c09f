//! Error types for the audio manager

use thiserror::Error;

use crate::backend::{GroupId, ParameterId};
use crate::pool::PoolHandle;

/// Registry lookup / backend access failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown exposed parameter: {0}")]
    NotFound(ParameterId),

    #[error("Mixer backend rejected access to {0}")]
    BackendRejected(ParameterId),

    #[error("Duplicate exposed parameter: {0}")]
    DuplicateParameter(ParameterId),

    #[error("Duplicate mixer group: {0}")]
    DuplicateGroup(GroupId),
}

/// Reasons a fade request is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FadeError {
    #[error("Unknown exposed parameter: {0}")]
    UnknownParameter(ParameterId),

    #[error("Fade already running on {0} and abort was not requested")]
    Busy(ParameterId),

    #[error("Could not read initial value of {0}")]
    ReadFailed(ParameterId),
}

/// Pool misuse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Handle {0:?} belongs to another pool")]
    ForeignHandle(PoolHandle),

    #[error("Handle {0:?} does not refer to a live instance")]
    UnknownInstance(PoolHandle),

    #[error("Instance {0:?} is already free")]
    DoubleRelease(PoolHandle),
}

/// One-shot dispatch failures (all are soft: logged and skipped)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Sound has no clip assigned")]
    MissingClip,

    #[error("No pooled voice available")]
    NoInstanceAvailable,

    #[error("No mixer group registered for {0}")]
    MissingRoute(GroupId),
}

/// Configuration validation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate mixer: {0}")]
    DuplicateMixer(String),

    #[error("Duplicate mixer group: {0}")]
    DuplicateGroup(String),

    #[error("Duplicate exposed parameter: {0}")]
    DuplicateParameter(String),

    #[error("Empty backend key for {0}")]
    EmptyKey(String),

    #[error("Music group {0} is not declared by any mixer")]
    UnknownMusicGroup(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum AudioManagerError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Fade rejected: {0}")]
    Fade(#[from] FadeError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Command queue full")]
    QueueFull,
}

/// Result type alias
pub type AudioManagerResult<T> = Result<T, AudioManagerError>;
