use nalgebra_glm as glm;
use wgpu::util::DeviceExt;

/// Unit quad spanning [-0.5, 0.5] on both axes, drawn as a triangle strip
const QUAD_VERTICES: [glm::Vec2; 4] = [
    glm::Vec2::new(-0.5, -0.5),
    glm::Vec2::new(0.5, -0.5),
    glm::Vec2::new(-0.5, 0.5),
    glm::Vec2::new(0.5, 0.5),
];

pub struct Renderer<'window> {
    pub gpu: crate::gpu::Gpu<'window>,
    quad: QuadRender,
    debug: crate::debug::DebugRender,
    clear_color: wgpu::Color,
}

impl<'window> Renderer<'window> {
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'window>>,
        width: u32,
        height: u32,
        config: &crate::config::Config,
        quad_capacity: usize,
    ) -> anyhow::Result<Self> {
        let gpu = crate::gpu::Gpu::new_async(window, width, height).await?;
        let shader_sources = crate::shader::ShaderSources::load(config).await?;
        let program = crate::shader::ShaderProgram::new(&gpu.device, &shader_sources);
        let quad = QuadRender::new(&gpu, &program, quad_capacity);
        let debug = crate::debug::DebugRender::new(&gpu, &program);
        let clear_color = wgpu::Color {
            r: config.clear_color.x as f64,
            g: config.clear_color.y as f64,
            b: config.clear_color.z as f64,
            a: config.clear_color.w as f64,
        };
        Ok(Self {
            gpu,
            quad,
            debug,
            clear_color,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    pub fn render_frame(&mut self, scene: &crate::scene::Scene) {
        self.quad.update(&self.gpu, &scene.quads());

        let mut drawer = crate::debug::DebugDrawer::new(scene.camera(), scene.pixels_per_meter());
        scene.world.debug_draw(&mut drawer);
        self.debug.update(&self.gpu, &drawer);

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(surface_texture) => surface_texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gpu.reconfigure();
                return;
            }
            Err(error) => {
                log::warn!("Skipping frame: {error}");
                return;
            }
        };

        let surface_texture_view =
            surface_texture
                .texture
                .create_view(&wgpu::TextureViewDescriptor {
                    label: wgpu::Label::default(),
                    aspect: wgpu::TextureAspect::default(),
                    format: Some(self.gpu.surface_format),
                    dimension: None,
                    base_mip_level: 0,
                    mip_level_count: None,
                    base_array_layer: 0,
                    array_layer_count: None,
                });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        encoder.insert_debug_marker("Render scene");

        // This scope around the render_pass prevents the
        // render_pass from holding a borrow to the encoder,
        // which would prevent calling `.finish()` in
        // preparation for queue submission.
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.quad.render(&mut render_pass);
            self.debug.render(&mut render_pass);
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        surface_texture.present();
    }
}

/// Draws one colored unit quad per visual entity
struct QuadRender {
    vertex_buffer: wgpu::Buffer,
    uniforms: UniformSlots,
    quad_count: usize,
    pipeline: wgpu::RenderPipeline,
}

impl QuadRender {
    fn new(
        gpu: &crate::gpu::Gpu,
        program: &crate::shader::ShaderProgram,
        capacity: usize,
    ) -> Self {
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(&QUAD_VERTICES),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let uniforms = UniformSlots::new(gpu, "Quad", capacity);
        let pipeline = create_pipeline(
            gpu,
            program,
            uniforms.layout(),
            wgpu::PrimitiveTopology::TriangleStrip,
            "Quad Pipeline",
        );

        Self {
            vertex_buffer,
            uniforms,
            quad_count: 0,
            pipeline,
        }
    }

    fn update(&mut self, gpu: &crate::gpu::Gpu, quads: &[crate::scene::QuadDraw]) {
        if quads.len() > self.uniforms.capacity {
            log::warn!(
                "Drawing {} of {} quads, uniform capacity exceeded",
                self.uniforms.capacity,
                quads.len()
            );
        }
        self.quad_count = quads.len().min(self.uniforms.capacity);

        let uniforms = quads[..self.quad_count]
            .iter()
            .map(ShaderUniform::from)
            .collect::<Vec<_>>();
        self.uniforms.write(gpu, &uniforms);
    }

    fn render<'rp>(&'rp self, render_pass: &mut wgpu::RenderPass<'rp>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        for index in 0..self.quad_count {
            self.uniforms.bind(render_pass, index);
            render_pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
        }
    }
}

/// Per-draw uniforms of the shared shader program, one slot per draw call
/// selected with a dynamic offset
pub(crate) struct UniformSlots {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    stride: u64,
    capacity: usize,
    label: &'static str,
}

impl UniformSlots {
    pub(crate) fn new(gpu: &crate::gpu::Gpu, label: &'static str, capacity: usize) -> Self {
        let layout = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<ShaderUniform>() as u64,
                        ),
                    },
                    count: None,
                }],
                label: Some(label),
            });
        let stride = aligned_stride(std::mem::size_of::<ShaderUniform>(), gpu.alignment());
        let capacity = capacity.max(1);
        let (buffer, bind_group) = create_slots(gpu, &layout, label, stride, capacity);
        Self {
            layout,
            buffer,
            bind_group,
            stride,
            capacity,
            label,
        }
    }

    pub(crate) fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Grows the buffer when there are more uniforms than slots
    pub(crate) fn write_growing(&mut self, gpu: &crate::gpu::Gpu, uniforms: &[ShaderUniform]) {
        if uniforms.len() > self.capacity {
            self.capacity = uniforms.len().next_power_of_two();
            let (buffer, bind_group) =
                create_slots(gpu, &self.layout, self.label, self.stride, self.capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
        }
        self.write(gpu, uniforms);
    }

    pub(crate) fn write(&self, gpu: &crate::gpu::Gpu, uniforms: &[ShaderUniform]) {
        let count = uniforms.len().min(self.capacity);
        let bytes = pack_uniforms(&uniforms[..count], self.stride as usize);
        if !bytes.is_empty() {
            gpu.queue.write_buffer(&self.buffer, 0, &bytes);
        }
    }

    pub(crate) fn bind<'rp>(&'rp self, render_pass: &mut wgpu::RenderPass<'rp>, slot: usize) {
        let offset = (slot as u64 * self.stride) as wgpu::DynamicOffset;
        render_pass.set_bind_group(0, &self.bind_group, &[offset]);
    }
}

fn create_slots(
    gpu: &crate::gpu::Gpu,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    stride: u64,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: stride * capacity as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<ShaderUniform>() as u64),
            }),
        }],
        label: Some(label),
    });
    (buffer, bind_group)
}

/// Builds a pipeline over the shared shader program. Vertices are 2D positions.
pub(crate) fn create_pipeline(
    gpu: &crate::gpu::Gpu,
    program: &crate::shader::ShaderProgram,
    uniform_bind_group_layout: &wgpu::BindGroupLayout,
    topology: wgpu::PrimitiveTopology,
    label: &str,
) -> wgpu::RenderPipeline {
    let pipeline_layout = gpu
        .device
        .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[uniform_bind_group_layout],
            push_constant_ranges: &[],
        });
    gpu.device
        .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &program.vertex,
                entry_point: crate::shader::VERTEX_ENTRY_POINT,
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<glm::Vec2>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                }],
            },
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            fragment: Some(wgpu::FragmentState {
                module: &program.fragment,
                entry_point: crate::shader::FRAGMENT_ENTRY_POINT,
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
        })
}

/// Matches the `Uniform` struct of the default shaders
#[repr(C)]
#[derive(Default, Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct ShaderUniform {
    pub mvp: glm::Mat4,
    pub color: glm::Vec4,
}

impl ShaderUniform {
    pub fn new(mvp: glm::Mat4, color: &glm::Vec3) -> Self {
        Self {
            mvp,
            color: glm::vec3_to_vec4(color),
        }
    }
}

impl From<&crate::scene::QuadDraw> for ShaderUniform {
    fn from(quad: &crate::scene::QuadDraw) -> Self {
        Self::new(quad.mvp, &quad.color)
    }
}

fn aligned_stride(size: usize, alignment: u64) -> u64 {
    let size = size as u64;
    let alignment = alignment.max(1);
    size.div_ceil(alignment) * alignment
}

/// Lays out the uniforms at `stride` byte intervals
pub(crate) fn pack_uniforms(uniforms: &[ShaderUniform], stride: usize) -> Vec<u8> {
    let mut bytes = vec![0_u8; uniforms.len() * stride];
    for (index, uniform) in uniforms.iter().enumerate() {
        let start = index * stride;
        let uniform_bytes = bytemuck::bytes_of(uniform);
        bytes[start..start + uniform_bytes.len()].copy_from_slice(uniform_bytes);
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(80, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(257, 256), 512);
        assert_eq!(aligned_stride(80, 0), 80);
    }

    #[test]
    fn uniforms_are_packed_at_stride_offsets() {
        let scene = crate::scene::Scene::new(&crate::config::Config::default()).unwrap();
        let uniforms = scene
            .quads()
            .iter()
            .map(ShaderUniform::from)
            .collect::<Vec<_>>();
        let bytes = pack_uniforms(&uniforms, 256);

        assert_eq!(bytes.len(), 512);
        let second: ShaderUniform =
            bytemuck::pod_read_unaligned(&bytes[256..256 + std::mem::size_of::<ShaderUniform>()]);
        assert_eq!(second, uniforms[1]);
        assert!(bytes[std::mem::size_of::<ShaderUniform>()..256]
            .iter()
            .all(|byte| *byte == 0));
    }

    #[test]
    fn quad_spans_unit_square() {
        let min = QUAD_VERTICES
            .iter()
            .fold(glm::vec2(f32::MAX, f32::MAX), |acc, v| glm::min2(&acc, v));
        let max = QUAD_VERTICES
            .iter()
            .fold(glm::vec2(f32::MIN, f32::MIN), |acc, v| glm::max2(&acc, v));
        assert_eq!(min, glm::vec2(-0.5, -0.5));
        assert_eq!(max, glm::vec2(0.5, 0.5));
    }
}
