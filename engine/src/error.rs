use plugwork_core::OperationError;
use plugwork_scene::SceneError;

use crate::attribute::{DescriptorError, StagingError};
use crate::config::ConfigError;
use crate::factory::{FactoryError, ObjectKind};
use crate::modifier::ModifierError;

/// Error type for the public entry points of the engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("'{node}' already has an attribute named '{name}'")]
    DuplicateAttributeName { node: String, name: String },
    #[error("'{node}' has no attribute '{name}'")]
    AttributeNotFound { node: String, name: String },
    /// The wrapped object lacks the capability an entry point needs.
    #[error("{what} is not available on a {kind}")]
    Unsupported { what: &'static str, kind: ObjectKind },
    #[error("expected a {expected}, got a {actual}")]
    WrongKind {
        expected: &'static str,
        actual: ObjectKind,
    },
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error(transparent)]
    Modifier(#[from] ModifierError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type EngineResult<T = ()> = Result<T, EngineError>;
