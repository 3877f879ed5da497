//! Metaball WebGPU render pipeline
//!
//! Draws the whole field in a single full-screen pass; all the work happens
//! in the fragment stage built by `shader`.

use bytemuck::{Pod, Zeroable};

use super::shader::ShaderProgram;
use super::vertex::{QUAD, QuadVertex, upload_geometry};
use crate::driver::FrameTarget;
use crate::error::InitError;
use crate::sim::Snapshot;

// ============================================================================
// GPU DATA STRUCTURES (must match shader)
// ============================================================================

/// One uniform array element. WGSL uniform arrays have a 16-byte stride, so
/// each `(x, y, r)` triple is padded to a vec4.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MetaballRow {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    _pad: f32,
}

/// Write the snapshot's `(x, y, r)` triples into `rows` in source order.
/// Rows past the last source are zeroed.
pub fn fill_uniform_rows(rows: &mut [MetaballRow], snapshot: &Snapshot) {
    let mut entries = snapshot.entries.iter();
    for row in rows.iter_mut() {
        *row = match entries.next() {
            Some(e) => MetaballRow {
                x: e.x,
                y: e.y,
                r: e.z,
                _pad: 0.0,
            },
            None => MetaballRow::zeroed(),
        };
    }
}

/// Device limits to request: WebGL2 level, except that textures may be as
/// large as the adapter allows so the canvas can cover big viewports.
pub fn device_limits(adapter_limits: wgpu::Limits) -> wgpu::Limits {
    wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter_limits)
}

/// Fail if a `width` x `height` surface is larger than `limits` allow.
pub fn check_viewport(width: u32, height: u32, limits: &wgpu::Limits) -> Result<(), InitError> {
    let max = limits.max_texture_dimension_2d;
    if width > max || height > max {
        return Err(InitError::ViewportTooLarge { width, height, max });
    }
    Ok(())
}

// ============================================================================
// METABALL RENDER STATE
// ============================================================================

pub struct MetaballRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,

    vertex_buffer: wgpu::Buffer,
    metaballs_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    bind_group_index: u32,
    /// Staging rows for the uniform, reused every frame
    rows: Vec<MetaballRow>,
}

impl MetaballRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        program: &ShaderProgram,
    ) -> Result<Self, InitError> {
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("metaball-device"),
                required_features: wgpu::Features::empty(),
                required_limits: device_limits(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let width = program.spec.width;
        let height = program.spec.height;
        check_viewport(width, height, &device.limits())?;

        let surface_caps = surface.get_capabilities(adapter);
        log::info!("Surface formats: {:?}", surface_caps.formats);

        // Shader output goes to the canvas as-is, so avoid sRGB encoding
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| InitError::Host("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        log::info!("Using surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let vertex_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("metaball_vertex"),
            source: wgpu::ShaderSource::Wgsl(program.vertex_source.as_str().into()),
        });
        let fragment_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("metaball_fragment"),
            source: wgpu::ShaderSource::Wgsl(program.fragment_source.as_str().into()),
        });

        let vertex_buffer = upload_geometry(&device);

        let uniform_len = program.spec.uniform_len();
        let metaballs_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("metaballs"),
            size: (std::mem::size_of::<MetaballRow>() * uniform_len) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let slot = program.bindings.metaballs;
        // The generated program only uses group 0; anything else would need
        // empty layouts in front of it.
        if slot.group != 0 {
            return Err(InitError::Host(format!(
                "metaballs uniform must live in bind group 0, found group {}",
                slot.group
            )));
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("metaball_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: slot.binding,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("metaball_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: slot.binding,
                resource: metaballs_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("metaball_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let attributes = [QuadVertex::attribute(program.bindings.position_location)];
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("metaball_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_shader,
                entry_point: Some(super::shader::VERTEX_ENTRY),
                buffers: &[QuadVertex::desc(&attributes)],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_shader,
                entry_point: Some(super::shader::FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            pipeline,
            vertex_buffer,
            metaballs_buffer,
            bind_group,
            bind_group_index: slot.group,
            rows: vec![MetaballRow::zeroed(); uniform_len],
        })
    }

    /// Reapply the surface configuration at the fixed program size.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Upload the snapshot into the metaballs uniform and draw one frame.
    pub fn render(&mut self, snapshot: &Snapshot) -> Result<(), wgpu::SurfaceError> {
        fill_uniform_rows(&mut self.rows, snapshot);
        self.queue
            .write_buffer(&self.metaballs_buffer, 0, bytemuck::cast_slice(&self.rows));

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("metaball_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("metaball_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(self.bind_group_index, &self.bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..QUAD.len() as u32, 0..1); // Two-triangle strip
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl FrameTarget for MetaballRenderState {
    fn render_frame(&mut self, snapshot: &Snapshot) {
        match self.render(snapshot) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory!");
            }
            Err(e) => log::warn!("Render error: {:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_matches_uniform_stride() {
        assert_eq!(std::mem::size_of::<MetaballRow>(), 16);
    }

    use glam::Vec3;

    fn snapshot(entries: &[[f32; 3]]) -> Snapshot {
        Snapshot {
            entries: entries.iter().map(|e| Vec3::from_array(*e)).collect(),
        }
    }

    #[test]
    fn test_uniform_rows_follow_snapshot_order() {
        let snap = snapshot(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let mut rows = vec![MetaballRow::zeroed(); 2];
        fill_uniform_rows(&mut rows, &snap);
        let floats: &[f32] = bytemuck::cast_slice(&rows);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]);
        assert_eq!(&floats[..3], &snap.packed()[..3]);
    }

    #[test]
    fn test_uniform_rows_pad_empty_field() {
        let mut rows = vec![MetaballRow::zeroed(); 1];
        fill_uniform_rows(&mut rows, &Snapshot::default());
        assert_eq!(rows, vec![MetaballRow::zeroed()]);
    }

    #[test]
    fn test_uniform_rows_are_rewritten_in_place() {
        let mut rows = vec![MetaballRow::zeroed(); 2];
        fill_uniform_rows(&mut rows, &snapshot(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
        let before = rows.as_ptr();

        fill_uniform_rows(&mut rows, &snapshot(&[[7.0, 8.0, 9.0]]));
        assert_eq!(rows.as_ptr(), before);
        let floats: &[f32] = bytemuck::cast_slice(&rows);
        assert_eq!(floats, &[7.0, 8.0, 9.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_device_limits_cover_large_viewports() {
        // wgpu's default limits allow 8192 px textures, like desktop WebGPU
        let limits = device_limits(wgpu::Limits::default());
        assert!(check_viewport(2560, 1440, &limits).is_ok());
        assert!(check_viewport(3440, 1440, &limits).is_ok());
        assert!(check_viewport(7680, 4320, &limits).is_ok());
    }

    #[test]
    fn test_device_limits_keep_webgl2_uniform_size() {
        let limits = device_limits(wgpu::Limits::default());
        let webgl2 = wgpu::Limits::downlevel_webgl2_defaults();
        assert_eq!(
            limits.max_uniform_buffer_binding_size,
            webgl2.max_uniform_buffer_binding_size
        );
        assert_eq!(
            limits.max_texture_dimension_2d,
            wgpu::Limits::default().max_texture_dimension_2d
        );
    }

    #[test]
    fn test_viewport_over_texture_limit_is_rejected() {
        let limits = wgpu::Limits::downlevel_webgl2_defaults();
        assert!(check_viewport(2048, 2048, &limits).is_ok());
        let err = check_viewport(2560, 1440, &limits).unwrap_err();
        assert!(matches!(
            err,
            InitError::ViewportTooLarge {
                width: 2560,
                height: 1440,
                max: 2048
            }
        ));
        assert!(check_viewport(1000, 2049, &limits).is_err());
    }
}
