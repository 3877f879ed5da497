//! WebGPU rendering module
//!
//! The field is evaluated per pixel in a generated fragment shader drawn over
//! a full-screen quad.

pub mod metaball_pipeline;
pub mod shader;
pub mod vertex;

pub use metaball_pipeline::MetaballRenderState;
pub use shader::{ProgramBindings, ProgramSpec, ShaderProgram, UniformSlot};
