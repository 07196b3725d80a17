use thiserror::Error;

use crate::api::types::InstanceId;

pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Errors raised by the resource collaborator. Never retried automatically.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    #[error("resource '{0}' not found")]
    NotFound(String),

    #[error("resource '{0}' is already registered")]
    Duplicate(String),

    #[error("resource '{name}' is corrupt: {reason}")]
    Corrupt { name: String, reason: String },

    #[error("malformed manifest: {0}")]
    Manifest(String),
}

/// Errors raised by the physics bridge. Fatal to the sync call that raised them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("instance {0} already has a physics body")]
    DuplicateBody(InstanceId),

    #[error("instance {0} has no physics body")]
    UnknownBody(InstanceId),

    #[error("invalid body shape: {0}")]
    InvalidShape(String),
}

/// Engine-level invariant violations, plus wrapped collaborator errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a scene named '{0}' is already registered")]
    DuplicateScene(String),

    #[error("no scene named '{0}' is registered")]
    SceneNotFound(String),

    #[error("a game object named '{0}' is already registered")]
    DuplicateObject(String),

    #[error("no game object named '{0}' is registered")]
    ObjectNotFound(String),

    #[error("no instance matches {0}")]
    InstanceNotFound(String),

    #[error("no scene is active")]
    NoActiveScene,

    #[error("image index {index} is out of range for a sprite with {frames} frame(s)")]
    ImageIndexOutOfRange { index: u32, frames: u32 },

    #[error("unknown engine mode '{0}'")]
    UnknownMode(String),

    #[error("engine is already running")]
    AlreadyRunning,

    #[error("engine thread did not stop within {0} ms")]
    StopTimeout(u64),

    #[error("invalid engine state: {0}")]
    InvalidState(String),

    #[error("step panicked: {0}")]
    Panicked(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

impl EngineError {
    /// Non-zero process exit status carried by this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::DuplicateScene(_)
            | EngineError::SceneNotFound(_)
            | EngineError::DuplicateObject(_)
            | EngineError::ObjectNotFound(_)
            | EngineError::InstanceNotFound(_)
            | EngineError::NoActiveScene => 2,
            EngineError::ImageIndexOutOfRange { .. } => 3,
            EngineError::UnknownMode(_) => 4,
            EngineError::AlreadyRunning | EngineError::StopTimeout(_) => 5,
            EngineError::InvalidState(_) => 6,
            EngineError::Panicked(_) => 7,
            EngineError::Fatal(_) => 8,
            EngineError::Resource(_) => 10,
            EngineError::Physics(_) => 11,
        }
    }

    /// Whether the user may choose to continue after this error was reported.
    pub fn is_continuable(&self) -> bool {
        !matches!(self, EngineError::Fatal(_) | EngineError::InvalidState(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let err: EngineError = ResourceError::NotFound("hero".into()).into();
        assert_eq!(err.to_string(), "resource 'hero' not found");
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn exit_codes_are_non_zero() {
        let errors = [
            EngineError::NoActiveScene,
            EngineError::Panicked("boom".into()),
            EngineError::Fatal("device lost".into()),
            EngineError::Physics(PhysicsError::InvalidShape("radius 0".into())),
        ];
        assert!(errors.iter().all(|e| e.exit_code() != 0));
    }

    #[test]
    fn fatal_errors_are_not_continuable() {
        assert!(!EngineError::Fatal("x".into()).is_continuable());
        assert!(!EngineError::InvalidState("x".into()).is_continuable());
        assert!(EngineError::Panicked("x".into()).is_continuable());
        assert!(EngineError::SceneNotFound("x".into()).is_continuable());
    }
}
