//! Full-screen quad geometry

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Quad corner in clip space
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
}

impl QuadVertex {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { position: [x, y] }
    }

    /// Position attribute at the location resolved from the program.
    pub fn attribute(location: u32) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            offset: 0,
            shader_location: location,
            format: wgpu::VertexFormat::Float32x2,
        }
    }

    pub fn desc(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }
}

/// Two triangles sharing the TR-BL diagonal when drawn as a strip.
pub const QUAD: [QuadVertex; 4] = [
    QuadVertex::new(-1.0, 1.0),  // top left
    QuadVertex::new(-1.0, -1.0), // bottom left
    QuadVertex::new(1.0, 1.0),   // top right
    QuadVertex::new(1.0, -1.0),  // bottom right
];

/// Upload the quad into a static vertex buffer. Done once; never rewritten.
pub fn upload_geometry(device: &wgpu::Device) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad_vertices"),
        contents: bytemuck::cast_slice(&QUAD),
        usage: wgpu::BufferUsages::VERTEX,
    })
}
