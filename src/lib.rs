//! Metaball Field - an animated blob background rendered with WebGPU
//!
//! Core modules:
//! - `sim`: Moving metaballs and a CPU reference of the field
//! - `renderer`: Generated shader program and WebGPU pipeline
//! - `driver`: One-frame-at-a-time loop body
//! - `preferences`: Page language/theme attributes
//! - `error`: Startup errors

pub mod driver;
pub mod error;
pub mod preferences;
pub mod renderer;
pub mod sim;

pub use driver::{FrameDriver, FrameTarget};
pub use error::{BindingResolutionError, InitError, ShaderBuildError, Stage};
pub use preferences::{Language, Preferences, Theme};

/// Field configuration constants
pub mod consts {
    /// Viewport area (px²) per metaball
    pub const AREA_PER_SOURCE: f64 = 16000.0;

    /// Spawn radius is drawn from [MIN, MIN + SPAN)
    pub const SAMPLED_RADIUS_MIN: f32 = 10.0;
    pub const SAMPLED_RADIUS_SPAN: f32 = 60.0;
    /// Influence radius = sampled radius * scale
    pub const INFLUENCE_SCALE: f32 = 0.75;

    /// Each velocity component is drawn from [-SPREAD/2, SPREAD/2) px/tick
    pub const SPEED_SPREAD: f32 = 3.0;

    /// Field value where a blob begins
    pub const THRESHOLD: f32 = 0.99;
    /// Rim width is 1 / RIM_SHARPNESS in field units
    pub const RIM_SHARPNESS: f32 = 100.0;

    /// Uniform array capacity: 16 KiB WebGL2 uniform block / 16-byte rows
    pub const MAX_SOURCES: usize = 1024;
}
