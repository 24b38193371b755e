use crate::render::{ShaderUniform, UniformSlots};
use nalgebra_glm as glm;
use wgpu::util::DeviceExt;

const CIRCLE_SEGMENTS: usize = 16;
const INITIAL_PRIMITIVE_CAPACITY: usize = 16;

/// One debug callback: a color and its span of line-list vertices
#[derive(Debug, Clone, PartialEq)]
pub struct DebugPrimitive {
    pub color: glm::Vec3,
    pub vertices: std::ops::Range<u32>,
}

/// Turns the physics world's debug callbacks into line vertices.
/// Geometry stays in physics units; [`DebugDrawer::mvp`] scales it to pixels.
pub struct DebugDrawer {
    projection: glm::Mat4,
    view: glm::Mat4,
    pixels_per_meter: f32,
    vertices: Vec<glm::Vec2>,
    primitives: Vec<DebugPrimitive>,
}

impl DebugDrawer {
    pub fn new(camera: &crate::scene::Camera, pixels_per_meter: f32) -> Self {
        Self {
            projection: *camera.projection(),
            view: *camera.view(),
            pixels_per_meter,
            vertices: Vec::new(),
            primitives: Vec::new(),
        }
    }

    pub fn mvp(&self) -> glm::Mat4 {
        let unit_conversion = glm::scaling(&glm::vec3(
            self.pixels_per_meter,
            self.pixels_per_meter,
            1.0,
        ));
        self.projection * self.view * unit_conversion
    }

    pub fn vertices(&self) -> &[glm::Vec2] {
        &self.vertices
    }

    pub fn primitives(&self) -> &[DebugPrimitive] {
        &self.primitives
    }

    /// Uniforms for each primitive, in draw order
    pub(crate) fn uniforms(&self) -> Vec<ShaderUniform> {
        let mvp = self.mvp();
        self.primitives
            .iter()
            .map(|primitive| ShaderUniform::new(mvp, &primitive.color))
            .collect()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.primitives.clear();
    }

    fn record(&mut self, color: glm::Vec3, lines: impl FnOnce(&mut Vec<glm::Vec2>)) {
        let start = self.vertices.len() as u32;
        lines(&mut self.vertices);
        let end = self.vertices.len() as u32;
        if end > start {
            self.primitives.push(DebugPrimitive {
                color,
                vertices: start..end,
            });
        }
    }
}

fn push_loop(vertices: &mut Vec<glm::Vec2>, points: &[glm::Vec2]) {
    if points.len() < 2 {
        return;
    }
    for (index, start) in points.iter().enumerate() {
        vertices.push(*start);
        vertices.push(points[(index + 1) % points.len()]);
    }
}

impl crate::physics::DebugDraw for DebugDrawer {
    fn draw_polygon(&mut self, vertices: &[glm::Vec2], color: glm::Vec3) {
        self.record(color, |lines| push_loop(lines, vertices));
    }

    fn draw_segment(&mut self, start: glm::Vec2, end: glm::Vec2, color: glm::Vec3) {
        self.record(color, |lines| lines.extend([start, end]));
    }

    fn draw_circle(&mut self, center: glm::Vec2, radius: f32, color: glm::Vec3) {
        let points = (0..CIRCLE_SEGMENTS)
            .map(|index| {
                let theta = index as f32 / CIRCLE_SEGMENTS as f32 * std::f32::consts::TAU;
                center + glm::vec2(theta.cos(), theta.sin()) * radius
            })
            .collect::<Vec<_>>();
        self.record(color, |lines| {
            push_loop(lines, &points);
            // Radius marker
            lines.extend([center, center + glm::vec2(radius, 0.0)]);
        });
    }
}

/// Draws the debug lines through the shared shader program, one draw call per primitive
pub struct DebugRender {
    vertex_buffer: wgpu::Buffer,
    uniforms: UniformSlots,
    primitives: Vec<DebugPrimitive>,
    pipeline: wgpu::RenderPipeline,
}

impl DebugRender {
    pub fn new(gpu: &crate::gpu::Gpu, program: &crate::shader::ShaderProgram) -> Self {
        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Debug Vertex Buffer"),
                contents: &[],
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        let uniforms = UniformSlots::new(gpu, "Debug", INITIAL_PRIMITIVE_CAPACITY);
        let pipeline = crate::render::create_pipeline(
            gpu,
            program,
            uniforms.layout(),
            wgpu::PrimitiveTopology::LineList,
            "Debug Line Pipeline",
        );

        Self {
            vertex_buffer,
            uniforms,
            primitives: Vec::new(),
            pipeline,
        }
    }

    pub fn update(&mut self, gpu: &crate::gpu::Gpu, drawer: &DebugDrawer) {
        self.primitives = drawer.primitives().to_vec();
        if self.primitives.is_empty() {
            return;
        }

        self.uniforms.write_growing(gpu, &drawer.uniforms());

        let vertices = drawer.vertices();
        if (self.vertex_buffer.size() as usize) < std::mem::size_of_val(vertices) {
            self.vertex_buffer = gpu
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Debug Vertex Buffer"),
                    contents: bytemuck::cast_slice(vertices),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
        } else {
            gpu.queue
                .write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(vertices));
        }
    }

    pub fn render<'rp>(&'rp self, render_pass: &mut wgpu::RenderPass<'rp>) {
        if self.primitives.is_empty() {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        for (slot, primitive) in self.primitives.iter().enumerate() {
            self.uniforms.bind(render_pass, slot);
            render_pass.draw(primitive.vertices.clone(), 0..1);
        }
    }
}
