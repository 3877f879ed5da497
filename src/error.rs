//! Startup error types.
//!
//! Every error here is fatal: the animation never starts and the message is
//! logged to the developer console.

use std::fmt;

use thiserror::Error;

/// Programmable pipeline stage a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Vertex => f.write_str("vertex"),
            Stage::Fragment => f.write_str("fragment"),
        }
    }
}

/// The generated program could not be built.
#[derive(Debug, Error)]
pub enum ShaderBuildError {
    /// A stage failed to parse or validate; `log` is the rendered diagnostic.
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: Stage, log: String },

    /// The two stages do not fit together.
    #[error("shader program failed to link: {log}")]
    Link { log: String },

    /// More sources than the uniform array can hold.
    #[error("{count} metaballs exceed the uniform capacity of {max}")]
    TooManySources { count: usize, max: usize },
}

/// A name the renderer binds against is missing from the linked program.
#[derive(Debug, Error)]
pub enum BindingResolutionError {
    #[error("can not find attribute {0}")]
    Attribute(String),

    #[error("can not find uniform {0}")]
    Uniform(String),
}

/// Anything that stops the field from starting.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Shader(#[from] ShaderBuildError),

    #[error(transparent)]
    Binding(#[from] BindingResolutionError),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// The canvas can't be as large as the viewport on this device.
    #[error("viewport {width}x{height} exceeds the device texture limit of {max}")]
    ViewportTooLarge { width: u32, height: u32, max: u32 },

    /// The page is missing something the field needs (window, canvas, ...).
    #[error("host environment: {0}")]
    Host(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_carries_stage_and_log() {
        let err = ShaderBuildError::Compile {
            stage: Stage::Fragment,
            log: "expected ';'".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fragment"), "missing stage in: {msg}");
        assert!(msg.contains("expected ';'"), "missing log in: {msg}");
    }

    #[test]
    fn too_many_sources_reports_both_numbers() {
        let msg = ShaderBuildError::TooManySources {
            count: 2000,
            max: 1024,
        }
        .to_string();
        assert!(msg.contains("2000") && msg.contains("1024"), "got: {msg}");
    }

    #[test]
    fn binding_errors_name_the_missing_handle() {
        let attr = BindingResolutionError::Attribute("position".into()).to_string();
        let uniform = BindingResolutionError::Uniform("metaballs".into()).to_string();
        assert_eq!(attr, "can not find attribute position");
        assert_eq!(uniform, "can not find uniform metaballs");
    }

    #[test]
    fn init_error_is_transparent_over_build_errors() {
        let inner = BindingResolutionError::Uniform("metaballs".into());
        let expected = inner.to_string();
        let err: InitError = inner.into();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn viewport_too_large_reports_size_and_limit() {
        let msg = InitError::ViewportTooLarge {
            width: 2560,
            height: 1440,
            max: 2048,
        }
        .to_string();
        assert_eq!(
            msg,
            "viewport 2560x1440 exceeds the device texture limit of 2048"
        );
    }
}
