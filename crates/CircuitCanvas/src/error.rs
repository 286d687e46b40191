use thiserror::Error;

use crate::model::{Mode, ModuleId, PortId};

/// Failures raised by the scene store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("module {0:?} is not part of the scene")]
    ModuleNotFound(ModuleId),
    #[error("port {0:?} is not part of the scene")]
    PortNotFound(PortId),
    #[error("a wire needs at least two ports, got {0}")]
    WireTooShort(usize),
}

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("cannot change mode from {from:?} to {to:?}")]
    InvalidTransition { from: Mode, to: Mode },
    #[error("palette selection is not available in {0:?} mode")]
    PaletteUnavailable(Mode),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("canvas builder is missing a {0}")]
    MissingCollaborator(&'static str),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("failed to spawn stepping thread: {0}")]
    Spawn(#[from] std::io::Error),
}
