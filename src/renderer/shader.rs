//! Metaball shader program generation
//!
//! The fragment stage loops over a fixed number of sources and scales the
//! gradient by a fixed viewport, so both are written into the WGSL source as
//! `const` declarations instead of uniforms. A new viewport size or source
//! count needs a new program.
//!
//! Building a program runs the same checks a GL driver would at compile and
//! link time, on the CPU through naga, so a bad program is reported before
//! any GPU object is created.

use wgpu::naga;

use crate::consts::*;
use crate::error::{BindingResolutionError, InitError, ShaderBuildError, Stage};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";
/// Vertex input carrying the quad corner
pub const POSITION_ATTRIBUTE: &str = "position";
/// Uniform array of `(x, y, r, _)` rows
pub const METABALLS_UNIFORM: &str = "metaballs";

const VERTEX_SOURCE: &str = r#"@vertex
fn vs_main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    // position specifies only x and y; z is 0 and w is 1
    return vec4<f32>(position, 0.0, 1.0);
}
"#;

/// Build-time constants of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramSpec {
    pub width: u32,
    pub height: u32,
    /// Number of metaballs the fragment stage sums over
    pub count: usize,
}

impl ProgramSpec {
    pub fn new(width: u32, height: u32, count: usize) -> Self {
        Self {
            width,
            height,
            count,
        }
    }

    /// Length of the uniform array. WGSL arrays can't be empty, so an empty
    /// field still gets one (unused) row.
    pub fn uniform_len(&self) -> usize {
        self.count.max(1)
    }
}

/// Where the uniform array lives in the bind group layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub group: u32,
    pub binding: u32,
}

/// Handles the renderer binds against, resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramBindings {
    pub position_location: u32,
    pub metaballs: UniformSlot,
}

/// A compiled, linked and resolved metaball program.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    pub spec: ProgramSpec,
    pub vertex_source: String,
    pub fragment_source: String,
    pub bindings: ProgramBindings,
}

impl ShaderProgram {
    /// Generate, compile and link both stages for `spec`, then resolve the
    /// position attribute and the metaballs uniform.
    pub fn build(spec: ProgramSpec) -> Result<Self, InitError> {
        if spec.count > MAX_SOURCES {
            return Err(ShaderBuildError::TooManySources {
                count: spec.count,
                max: MAX_SOURCES,
            }
            .into());
        }

        let vertex_source = vertex_source();
        let fragment_source = fragment_source(&spec);

        let vertex = compile(Stage::Vertex, &vertex_source)?;
        let fragment = compile(Stage::Fragment, &fragment_source)?;
        link(&vertex, &fragment)?;

        let bindings = ProgramBindings {
            position_location: resolve_attribute(&vertex, VERTEX_ENTRY, POSITION_ATTRIBUTE)?,
            metaballs: resolve_uniform(&fragment, METABALLS_UNIFORM)?,
        };

        log::debug!(
            "Built metaball program {}x{} with {} sources ({} + {} bytes of WGSL)",
            spec.width,
            spec.height,
            spec.count,
            vertex_source.len(),
            fragment_source.len()
        );

        Ok(Self {
            spec,
            vertex_source,
            fragment_source,
            bindings,
        })
    }
}

/// Pass-through vertex stage for a full-screen quad.
pub fn vertex_source() -> String {
    VERTEX_SOURCE.to_string()
}

/// Fragment stage specialized to `spec`.
pub fn fragment_source(spec: &ProgramSpec) -> String {
    format!(
        r#"const WIDTH: f32 = {width:.1};
const HEIGHT: f32 = {height:.1};
const COUNT: u32 = {count}u;
const THRESHOLD: f32 = {threshold:?};
const RIM_SHARPNESS: f32 = {sharpness:.1};

@group(0) @binding(0)
var<uniform> {uniform}: array<vec4<f32>, {len}>;

@fragment
fn fs_main(@builtin(position) frag_coord: vec4<f32>) -> @location(0) vec4<f32> {{
    // Bottom-left origin, matching the simulation's pixel space
    let x = frag_coord.x;
    let y = HEIGHT - frag_coord.y;

    var sum = 0.0;
    for (var i = 0u; i < COUNT; i = i + 1u) {{
        let metaball = {uniform}[i];
        let dx = metaball.x - x;
        let dy = metaball.y - y;
        let radius = metaball.z;
        sum = sum + (radius * radius) / (dx * dx + dy * dy);
    }}

    if (sum >= THRESHOLD) {{
        let weight = clamp(1.0 - (sum - THRESHOLD) * RIM_SHARPNESS, 0.0, 1.0);
        let gradient = vec3<f32>(x / WIDTH, y / HEIGHT, 1.0);
        return vec4<f32>(mix(gradient, vec3<f32>(0.0), vec3<f32>(weight)), 1.0);
    }}

    return vec4<f32>(0.0, 0.0, 0.0, 1.0);
}}
"#,
        width = spec.width as f32,
        height = spec.height as f32,
        count = spec.count,
        threshold = THRESHOLD,
        sharpness = RIM_SHARPNESS,
        uniform = METABALLS_UNIFORM,
        len = spec.uniform_len(),
    )
}

/// Parse and validate one stage.
pub fn compile(stage: Stage, source: &str) -> Result<naga::Module, ShaderBuildError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderBuildError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| ShaderBuildError::Compile {
        stage,
        log: e.emit_to_string(source),
    })?;

    Ok(module)
}

/// Check that the two stages form a program: both entry points exist with
/// the right stage, and every fragment input location is a vertex output.
pub fn link(vertex: &naga::Module, fragment: &naga::Module) -> Result<(), ShaderBuildError> {
    let vs = find_entry(vertex, VERTEX_ENTRY, naga::ShaderStage::Vertex)?;
    let fs = find_entry(fragment, FRAGMENT_ENTRY, naga::ShaderStage::Fragment)?;

    let outputs = vs
        .function
        .result
        .as_ref()
        .map(|r| locations(vertex, r.ty, r.binding.as_ref()))
        .unwrap_or_default();

    for arg in &fs.function.arguments {
        for location in locations(fragment, arg.ty, arg.binding.as_ref()) {
            if !outputs.contains(&location) {
                return Err(ShaderBuildError::Link {
                    log: format!(
                        "fragment input at location {location} is not written by the vertex stage"
                    ),
                });
            }
        }
    }

    Ok(())
}

/// Location of the named input of a vertex entry point.
pub fn resolve_attribute(
    module: &naga::Module,
    entry: &str,
    name: &str,
) -> Result<u32, BindingResolutionError> {
    module
        .entry_points
        .iter()
        .filter(|ep| ep.name == entry)
        .flat_map(|ep| ep.function.arguments.iter())
        .find_map(|arg| match (&arg.name, &arg.binding) {
            (Some(n), Some(naga::Binding::Location { location, .. })) if n == name => {
                Some(*location)
            }
            _ => None,
        })
        .ok_or_else(|| BindingResolutionError::Attribute(name.to_string()))
}

/// Group and binding of the named uniform.
pub fn resolve_uniform(
    module: &naga::Module,
    name: &str,
) -> Result<UniformSlot, BindingResolutionError> {
    module
        .global_variables
        .iter()
        .find_map(|(_, var)| match (&var.name, var.space, &var.binding) {
            (Some(n), naga::AddressSpace::Uniform, Some(rb)) if n == name => Some(UniformSlot {
                group: rb.group,
                binding: rb.binding,
            }),
            _ => None,
        })
        .ok_or_else(|| BindingResolutionError::Uniform(name.to_string()))
}

fn find_entry<'a>(
    module: &'a naga::Module,
    name: &str,
    stage: naga::ShaderStage,
) -> Result<&'a naga::EntryPoint, ShaderBuildError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == stage)
        .ok_or_else(|| ShaderBuildError::Link {
            log: format!("missing {stage:?} entry point `{name}`"),
        })
}

/// User-defined locations carried by a value, either directly or through
/// the members of a struct.
fn locations(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
) -> Vec<u32> {
    match binding {
        Some(naga::Binding::Location { location, .. }) => vec![*location],
        Some(naga::Binding::BuiltIn(_)) => Vec::new(),
        None => match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|m| match &m.binding {
                    Some(naga::Binding::Location { location, .. }) => Some(*location),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
    }
}
