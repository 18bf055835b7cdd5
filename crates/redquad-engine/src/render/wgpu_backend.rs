use std::collections::HashMap;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::coords::{ColorRgba, Vec4, Viewport};
use crate::device::Gpu;
use crate::shader::{AttributeInfo, AttributeSlot, ShaderError, UniformSlot};

use super::{GraphicsDevice, ProgramSource, Topology, UniformValue, VERTEX_STRIDE};

/// Program created by `WgpuDevice`.
///
/// Holds shader modules, the pipeline layout and the uniform buffers. The
/// `TriangleList` pipeline is built with the program; other topologies are
/// built on first use. The device caches all of them.
#[derive(Clone)]
pub struct WgpuProgram {
    id: u64,
    label: String,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_entry: String,
    layout: wgpu::PipelineLayout,
    attributes: Vec<AttributeInfo>,
    uniform_buffers: Vec<(u32, wgpu::Buffer)>,
    bind_group: Option<wgpu::BindGroup>,
}

/// Vertex buffer created by `WgpuDevice`.
#[derive(Clone)]
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
    vertex_count: u32,
}

/// A draw with every piece of state it needs captured at record time.
struct DrawCall {
    program: WgpuProgram,
    vertex_buffers: Vec<wgpu::Buffer>,
    viewport: Option<Viewport>,
    topology: Topology,
    first: u32,
    count: u32,
}

enum Op<D = DrawCall> {
    Clear(ColorRgba),
    Draw(D),
}

/// One render pass: an optional clear followed by its draws.
#[derive(Debug, PartialEq)]
struct Pass<D> {
    clear: Option<ColorRgba>,
    draws: Vec<D>,
}

/// Splits a recorded frame into passes. Every clear starts a pass; draws
/// recorded before any clear go into a leading pass that loads.
fn plan_passes<D>(ops: impl IntoIterator<Item = Op<D>>) -> Vec<Pass<D>> {
    let mut passes: Vec<Pass<D>> = Vec::new();
    for op in ops {
        match op {
            Op::Clear(color) => passes.push(Pass { clear: Some(color), draws: Vec::new() }),
            Op::Draw(draw) => match passes.last_mut() {
                Some(pass) => pass.draws.push(draw),
                None => passes.push(Pass { clear: None, draws: vec![draw] }),
            },
        }
    }
    passes
}

/// `GraphicsDevice` backed by wgpu.
///
/// Calls made during a frame are recorded and turned into render passes by
/// [`WgpuDevice::encode`]. Each `clear` opens a new pass with a clear load op;
/// draws before the first clear load the previous contents. Uniform writes go
/// to the queue immediately, so a frame sees the last value written.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,

    clear_color: ColorRgba,
    viewport: Option<Viewport>,
    current: Option<WgpuProgram>,
    bound: Vec<Option<WgpuBuffer>>,

    pending: Vec<Op>,
    pipelines: HashMap<(u64, Topology), wgpu::RenderPipeline>,
    next_program_id: u64,
}

impl WgpuDevice {
    pub fn new(gpu: &Gpu<'_>) -> Self {
        Self::with_device(gpu.device().clone(), gpu.queue().clone(), gpu.surface_format())
    }

    /// Device rendering into targets of `surface_format`.
    pub fn with_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            surface_format,
            clear_color: ColorRgba::default(),
            viewport: None,
            current: None,
            bound: Vec::new(),
            pending: Vec::new(),
            pipelines: HashMap::new(),
            next_program_id: 0,
        }
    }

    /// Number of recorded clears and draws not yet encoded.
    pub fn pending_ops(&self) -> usize {
        self.pending.len()
    }

    /// Drops the recorded frame without encoding it.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
    }

    /// Encodes the recorded frame into `encoder`, targeting `view`.
    ///
    /// `target` is the size of `view`; viewports are clamped to it.
    pub fn encode(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        target: PhysicalSize<u32>,
    ) {
        let passes = plan_passes(self.pending.drain(..));

        for draw in passes.iter().flat_map(|p| &p.draws) {
            self.ensure_pipeline(&draw.program, draw.topology);
        }

        for Pass { clear, draws } in &passes {
            let load = clear.map_or(wgpu::LoadOp::Load, |c| wgpu::LoadOp::Clear(c.to_wgpu()));
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("redquad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in draws {
                let Some(pipeline) = self.pipelines.get(&(draw.program.id, draw.topology)) else {
                    continue;
                };

                let vp = draw
                    .viewport
                    .unwrap_or(Viewport::full(target.width, target.height));
                let Some((x, y, w, h)) = vp.to_top_left(target.width, target.height) else {
                    continue;
                };

                rpass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
                rpass.set_pipeline(pipeline);
                if let Some(bind_group) = &draw.program.bind_group {
                    rpass.set_bind_group(0, bind_group, &[]);
                }
                for (slot, buffer) in draw.vertex_buffers.iter().enumerate() {
                    rpass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }
                rpass.draw(draw.first..draw.first + draw.count, 0..1);
            }
        }
    }

    /// Builds and caches the pipeline for `(program, topology)` on first use.
    /// A pipeline the GPU rejects is logged and its draws are dropped.
    fn ensure_pipeline(&mut self, program: &WgpuProgram, topology: Topology) {
        let key = (program.id, topology);
        if self.pipelines.contains_key(&key) {
            return;
        }

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = build_pipeline(&self.device, self.surface_format, program, topology);
        if let Some(err) = pollster::block_on(scope.pop()) {
            log::error!("pipeline for `{}` ({topology:?}) rejected: {err}", program.label);
            return;
        }

        log::debug!("built pipeline for `{}` ({topology:?})", program.label);
        self.pipelines.insert(key, pipeline);
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    program: &WgpuProgram,
    topology: Topology,
) -> wgpu::RenderPipeline {
    // One buffer per attribute, each holding tightly packed `Vec4`s.
    let attrs: Vec<[wgpu::VertexAttribute; 1]> = program
        .attributes
        .iter()
        .map(|a| {
            [wgpu::VertexAttribute {
                format: a.format.to_wgpu(),
                offset: 0,
                shader_location: a.location,
            }]
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = attrs
        .iter()
        .map(|a| wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: a,
        })
        .collect();

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(program.label.as_str()),
        layout: Some(&program.layout),

        vertex: wgpu::VertexState {
            module: &program.vertex_module,
            entry_point: Some(program.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &program.fragment_module,
            entry_point: Some(program.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: topology.to_wgpu(),
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

impl GraphicsDevice for WgpuDevice {
    type Program = WgpuProgram;
    type Buffer = WgpuBuffer;

    /// Creates the modules, uniform buffers and the `TriangleList` pipeline
    /// inside one validation scope, so anything the GPU rejects is returned
    /// here rather than on the first frame.
    fn create_program(&mut self, source: &ProgramSource<'_>) -> Result<WgpuProgram, ShaderError> {
        let label = source.label;
        let interface = source.interface;

        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(format!("{label} vertex").as_str()),
            source: wgpu::ShaderSource::Wgsl(source.vertex.into()),
        });
        let fragment_module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(format!("{label} fragment").as_str()),
            source: wgpu::ShaderSource::Wgsl(source.fragment.into()),
        });

        let mut bgl_entries = Vec::with_capacity(interface.uniforms.len());
        let mut uniform_buffers = Vec::with_capacity(interface.uniforms.len());
        for u in &interface.uniforms {
            bgl_entries.push(wgpu::BindGroupLayoutEntry {
                binding: u.binding,
                visibility: u.stages,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(u.kind.size()),
                },
                count: None,
            });

            // Zero-initialised, padded to a 16-byte multiple.
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(format!("{label} {}", u.name).as_str()),
                size: u.kind.size().next_multiple_of(16),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            uniform_buffers.push((u.binding, buffer));
        }

        let (layout, bind_group) = if uniform_buffers.is_empty() {
            let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[],
                immediate_size: 0,
            });
            (layout, None)
        } else {
            let bgl = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &bgl_entries,
            });
            let entries: Vec<wgpu::BindGroupEntry<'_>> = uniform_buffers
                .iter()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: *binding,
                    resource: buffer.as_entire_binding(),
                })
                .collect();
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bgl,
                entries: &entries,
            });
            let layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });
            (layout, Some(bind_group))
        };

        let program = WgpuProgram {
            id: self.next_program_id,
            label: label.to_string(),
            vertex_module,
            fragment_module,
            vertex_entry: interface.vertex_entry.clone(),
            fragment_entry: interface.fragment_entry.clone(),
            layout,
            attributes: interface.attributes.clone(),
            uniform_buffers,
            bind_group,
        };
        let pipeline =
            build_pipeline(&self.device, self.surface_format, &program, Topology::TriangleList);

        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(ShaderError::link(format!("`{label}` rejected by the GPU: {err}")));
        }

        self.next_program_id += 1;
        self.pipelines.insert((program.id, Topology::TriangleList), pipeline);
        Ok(program)
    }

    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vec4]) -> WgpuBuffer {
        if !vertices.iter().all(|v| v.is_finite()) {
            log::warn!("vertex buffer `{label}` contains non-finite positions");
        }
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        WgpuBuffer {
            buffer,
            vertex_count: vertices.len() as u32,
        }
    }

    fn set_clear_color(&mut self, color: ColorRgba) {
        if !color.is_finite() {
            log::warn!("ignoring non-finite clear colour {color:?}");
            return;
        }
        self.clear_color = color;
    }

    fn clear(&mut self) {
        self.pending.push(Op::Clear(self.clear_color));
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn use_program(&mut self, program: &WgpuProgram) {
        self.current = Some(program.clone());
    }

    fn bind_vertex_buffer(&mut self, attribute: &AttributeSlot, buffer: &WgpuBuffer) {
        let slot = attribute.slot as usize;
        if self.bound.len() <= slot {
            self.bound.resize(slot + 1, None);
        }
        self.bound[slot] = Some(buffer.clone());
    }

    fn set_uniform(&mut self, uniform: &UniformSlot, value: UniformValue) {
        let Some(program) = &self.current else {
            log::warn!("set_uniform without a current program; ignored");
            return;
        };
        let Some((_, buffer)) = program
            .uniform_buffers
            .iter()
            .find(|(binding, _)| *binding == uniform.binding)
        else {
            log::warn!(
                "program `{}` has no uniform at @binding({}); ignored",
                program.label,
                uniform.binding
            );
            return;
        };
        self.queue.write_buffer(buffer, 0, value.as_bytes());
    }

    fn draw_arrays(&mut self, topology: Topology, first: u32, count: u32) {
        if count == 0 {
            return;
        }
        let Some(program) = &self.current else {
            log::warn!("draw_arrays without a current program; ignored");
            return;
        };

        let end = first.saturating_add(count);
        let mut vertex_buffers = Vec::with_capacity(program.attributes.len());
        for (slot, attr) in program.attributes.iter().enumerate() {
            match self.bound.get(slot).and_then(Option::as_ref) {
                Some(b) if b.vertex_count >= end => vertex_buffers.push(b.buffer.clone()),
                Some(b) => {
                    log::warn!(
                        "draw of {first}..{end} overruns `{}` buffer of {} vertices; ignored",
                        attr.name,
                        b.vertex_count
                    );
                    return;
                }
                None => {
                    log::warn!(
                        "attribute `{}` has no vertex buffer bound; draw ignored",
                        attr.name
                    );
                    return;
                }
            }
        }

        self.pending.push(Op::Draw(DrawCall {
            program: program.clone(),
            vertex_buffers,
            viewport: self.viewport,
            topology,
            first,
            count,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::VertexBuffer;
    use crate::shader::{AttributeFormat, Shader, ShaderLibrary, UniformKind};

    const RED: ColorRgba = ColorRgba::new(1.0, 0.0, 0.0, 1.0);
    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

    const VS: &str = include_str!("../../../redquad/shaders/vertex.wgsl");
    const FS: &str = include_str!("../../../redquad/shaders/fragment.wgsl");

    fn noop_device() -> WgpuDevice {
        let (device, queue) = wgpu::Device::noop(&wgpu::DeviceDescriptor::default());
        WgpuDevice::with_device(device, queue, FORMAT)
    }

    fn quad_shader(gl: &mut WgpuDevice) -> Shader<WgpuDevice> {
        ShaderLibrary::compile_source(gl, "vertex.wgsl", VS, "fragment.wgsl", FS).unwrap()
    }

    fn quad() -> [Vec4; 6] {
        [
            Vec4::point(1.0, 1.0, 0.0),
            Vec4::point(-1.0, 1.0, 0.0),
            Vec4::point(-1.0, -1.0, 0.0),
            Vec4::point(-1.0, -1.0, 0.0),
            Vec4::point(1.0, -1.0, 0.0),
            Vec4::point(1.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn quad_program_builds_its_pipeline_up_front() {
        let mut gl = noop_device();
        let shader = quad_shader(&mut gl);

        let program = shader.program();
        assert!(gl.pipelines.contains_key(&(program.id, Topology::TriangleList)));
        assert_eq!(program.attributes.len(), 1);
        assert!(program.bind_group.is_some());
    }

    #[test]
    fn vec3_uniform_buffer_is_padded() {
        let mut gl = noop_device();
        let shader = quad_shader(&mut gl);

        let (binding, buffer) = &shader.program().uniform_buffers[0];
        assert_eq!(*binding, 0);
        assert_eq!(buffer.size(), 16);
    }

    #[test]
    fn programs_get_distinct_ids() {
        let mut gl = noop_device();
        let a = quad_shader(&mut gl);
        let b = quad_shader(&mut gl);
        assert_ne!(a.program().id, b.program().id);
        assert_eq!(gl.pipelines.len(), 2);
    }

    #[test]
    fn gpu_rejected_program_is_an_error() {
        let mut gl = noop_device();
        let interface = quad_shader(&mut gl).interface().clone();
        let before = gl.pipelines.len();

        // Integer colour against a float surface format.
        let fragment = "
            @group(0) @binding(0)
            var<uniform> u_colour: vec3<f32>;

            @fragment
            fn fs_main() -> @location(0) vec4<i32> {
                return vec4<i32>(vec3<i32>(u_colour), 1);
            }
        ";
        let result = gl.create_program(&ProgramSource {
            label: "bad",
            vertex: VS,
            fragment,
            interface: &interface,
        });

        assert!(matches!(result, Err(ShaderError::Link { .. })));
        assert_eq!(gl.pipelines.len(), before);
    }

    #[test]
    fn integer_colour_output_fails_before_the_gpu() {
        let mut gl = noop_device();
        let fragment = "
            @fragment
            fn fs_main() -> @location(0) vec4<i32> {
                return vec4<i32>(1, 0, 0, 1);
            }
        ";
        let result =
            ShaderLibrary::compile_source(&mut gl, "vertex.wgsl", VS, "bad.wgsl", fragment);
        assert!(matches!(result, Err(ShaderError::Link { .. })));
        assert!(gl.pipelines.is_empty());
    }

    #[test]
    fn draw_past_buffer_end_is_dropped() {
        let mut gl = noop_device();
        let shader = quad_shader(&mut gl);
        let a_position = shader.attribute("a_position", AttributeFormat::Float32x4).unwrap();
        let short = VertexBuffer::new(&mut gl, "short", &quad()[..3]);

        shader.enable(&mut gl);
        shader.set_attribute(&mut gl, &a_position, &short);

        gl.draw_arrays(Topology::TriangleList, 0, 6);
        gl.draw_arrays(Topology::TriangleList, 1, 3);
        assert_eq!(gl.pending_ops(), 0);

        gl.draw_arrays(Topology::TriangleList, 0, 3);
        assert_eq!(gl.pending_ops(), 1);
    }

    #[test]
    fn draw_without_program_or_buffer_is_dropped() {
        let mut gl = noop_device();
        gl.draw_arrays(Topology::TriangleList, 0, 3);
        assert_eq!(gl.pending_ops(), 0);

        let shader = quad_shader(&mut gl);
        shader.enable(&mut gl);
        gl.draw_arrays(Topology::TriangleList, 0, 3);
        assert_eq!(gl.pending_ops(), 0);
    }

    #[test]
    fn quad_frame_encodes_and_submits() {
        let mut gl = noop_device();
        let shader = quad_shader(&mut gl);
        let a_position = shader.attribute("a_position", AttributeFormat::Float32x4).unwrap();
        let u_colour = shader.uniform("u_colour", UniformKind::Vec3).unwrap();
        let buffer = VertexBuffer::new(&mut gl, "quad", &quad());

        gl.set_viewport(Viewport::full(64, 48));
        gl.set_clear_color(ColorRgba::black());
        gl.clear();
        shader.enable(&mut gl);
        shader.set_attribute(&mut gl, &a_position, &buffer);
        let red = UniformValue::Vec3(crate::coords::Vec3::new(1.0, 0.0, 0.0));
        shader.set_uniform(&mut gl, &u_colour, red);
        gl.draw_arrays(Topology::TriangleList, 0, buffer.len());
        assert_eq!(gl.pending_ops(), 2);

        let target = gl.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("target"),
            size: wgpu::Extent3d { width: 64, height: 48, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = gl
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        let scope = gl.device.push_error_scope(wgpu::ErrorFilter::Validation);
        gl.encode(&mut encoder, &view, PhysicalSize::new(64, 48));
        gl.queue.submit(std::iter::once(encoder.finish()));
        assert!(pollster::block_on(scope.pop()).is_none());

        assert_eq!(gl.pending_ops(), 0);
        assert_eq!(gl.pipelines.len(), 1);
    }

    #[test]
    fn clear_then_draws_is_one_pass() {
        let passes = plan_passes([Op::Clear(RED), Op::Draw(1), Op::Draw(2)]);
        assert_eq!(passes, vec![Pass { clear: Some(RED), draws: vec![1, 2] }]);
    }

    #[test]
    fn draws_before_clear_load_previous_contents() {
        let passes = plan_passes([Op::Draw(1), Op::Clear(RED), Op::Draw(2)]);
        assert_eq!(
            passes,
            vec![
                Pass { clear: None, draws: vec![1] },
                Pass { clear: Some(RED), draws: vec![2] },
            ]
        );
    }

    #[test]
    fn each_clear_opens_a_pass() {
        let passes = plan_passes::<u32>([Op::Clear(RED), Op::Clear(ColorRgba::black())]);
        assert_eq!(passes.len(), 2);
        assert!(passes.iter().all(|p| p.draws.is_empty()));
        assert!(plan_passes::<u32>([]).is_empty());
    }
}
