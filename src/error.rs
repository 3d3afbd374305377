//! Viewer error handling
//!
//! One error type for the whole viewer. Subsystems map their failures into
//! it with the helpers below instead of calling unwrap().

use std::path::PathBuf;

/// Errors produced by the viewer and its subsystems
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    /// Invalid configuration value (rejected before the subsystem starts)
    #[error("Invalid configuration for {component}: {reason}")]
    Configuration { component: String, reason: String },

    /// GPU buffer/framebuffer allocation or capacity failure
    #[error("GPU resource '{resource}' unavailable: {reason}")]
    Resource { resource: String, reason: String },

    /// Audio collaborator refused a trigger
    #[error("Audio trigger for '{clip}' failed: {reason}")]
    AudioTrigger { clip: String, reason: String },

    /// Configuration file could not be read or parsed
    #[error("Failed to load config from {path:?}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    /// Surface could not be acquired or presented
    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    /// Irrecoverable graphics context failure
    #[error("Graphics context failure in {component}: {error}")]
    Context { component: String, error: String },
}

/// Type alias for viewer operation results
pub type ViewerResult<T> = Result<T, ViewerError>;

impl ViewerError {
    /// Whether the render loop has to stop on this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ViewerError::Context { .. } | ViewerError::Surface(wgpu::SurfaceError::OutOfMemory)
        )
    }
}

/// Helper trait for attaching a component context to foreign errors
pub trait ViewerErrorContext<T> {
    fn viewer_context(self, component: &str) -> ViewerResult<T>;
}

impl<T, E> ViewerErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn viewer_context(self, component: &str) -> ViewerResult<T> {
        self.map_err(|e| ViewerError::Context {
            component: component.to_string(),
            error: e.to_string(),
        })
    }
}

/// Create a configuration error
pub fn configuration_error(component: &str, reason: impl std::fmt::Display) -> ViewerError {
    ViewerError::Configuration {
        component: component.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a GPU resource error
pub fn resource_error(resource: &str, reason: impl std::fmt::Display) -> ViewerError {
    ViewerError::Resource {
        resource: resource.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an audio trigger error
pub fn audio_error(clip: &str, reason: impl std::fmt::Display) -> ViewerError {
    ViewerError::AudioTrigger {
        clip: clip.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_display() {
        let result: Result<(), String> = Err("device lost".to_string());
        let err = result.viewer_context("renderer").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("device lost"));
    }

    #[test]
    fn test_resource_error_is_recoverable() {
        let err = resource_error("rain vertex buffer", "too large");
        assert!(!err.is_fatal());
        assert_eq!(
            err.to_string(),
            "GPU resource 'rain vertex buffer' unavailable: too large"
        );
    }
}
