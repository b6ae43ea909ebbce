use std::ops::Range;
use std::sync::Arc;

use glam::Vec2;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::{Camera, CameraUniform};
use crate::color::Color;
use crate::input::{self, Cursor};
use crate::models::{CircleInstance, LineVertex, Vertex2D};
use crate::scene::{FieldParams, Scene};
use crate::sim;
use crate::time::FrameClock;

/// Viewports narrower than this get the constrained (6-network) field.
const CONSTRAINED_VIEWPORT_WIDTH: u32 = 768;
/// Connection line opacity.
const LINE_ALPHA: f32 = 0.3;

const LINES_WGSL: &str = include_str!("./shaders/lines.wgsl");
const CIRCLES_WGSL: &str = include_str!("./shaders/circles.wgsl");

/// Vertex/instance spans of one network, so each network draws its
/// connection lines first and its nodes on top of them.
struct NetworkRange {
    lines: Range<u32>,
    circles: Range<u32>,
}

/// Rebuild the per-frame vertex data from scene state.
///
/// Connection indices are re-checked against the node vector here; a
/// missing peer just drops that segment rather than panicking.
fn rebuild_geometry(
    scene: &Scene,
    circle_instances: &mut Vec<CircleInstance>,
    line_vertices: &mut Vec<LineVertex>,
    network_ranges: &mut Vec<NetworkRange>,
) {
    circle_instances.clear();
    line_vertices.clear();
    network_ranges.clear();

    let line_color = {
        let mut rgba = Color::from((255, 255, 255)).into_linear_rgba();
        rgba[3] = LINE_ALPHA;
        rgba
    };

    for network in &scene.networks {
        let lines_start = line_vertices.len() as u32;
        for node in &network.nodes {
            for &target in &node.connections {
                let Some(peer) = network.nodes.get(target) else {
                    continue;
                };
                line_vertices.push(LineVertex {
                    position: node.position.into(),
                    color: line_color,
                });
                line_vertices.push(LineVertex {
                    position: peer.position.into(),
                    color: line_color,
                });
            }
        }

        let circles_start = circle_instances.len() as u32;
        for node in &network.nodes {
            let mut color = node.color.into_linear_rgba();
            color[3] = sim::node_alpha(node);
            circle_instances.push(CircleInstance {
                position: node.position.into(),
                radius: node.radius,
                color,
            });
        }

        network_ranges.push(NetworkRange {
            lines: lines_start..line_vertices.len() as u32,
            circles: circles_start..circle_instances.len() as u32,
        });
    }
}

pub struct State {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,

    pub camera: Camera,
    pub camera_buffer: wgpu::Buffer,
    pub camera_bind_group: wgpu::BindGroup,
    pub camera_uniform: CameraUniform,
    pub camera_needs_update: bool,

    pub line_render_pipeline: wgpu::RenderPipeline,
    pub circle_render_pipeline: wgpu::RenderPipeline,

    circle_instances: Vec<CircleInstance>,
    circle_instance_buffer: wgpu::Buffer,
    quad_vertex_buffer: wgpu::Buffer,
    quad_index_buffer: wgpu::Buffer,

    line_vertices: Vec<LineVertex>,
    line_vertex_buffer: wgpu::Buffer,

    network_ranges: Vec<NetworkRange>,

    pub scene: Scene,
    pub params: FieldParams,
    /// Host override for the constrained-display policy; `None` derives it
    /// from the viewport width.
    pub constrained_override: Option<bool>,

    pub clock: FrameClock,
}

impl State {
    // Takes Arc<Window> for setup, doesn't store it.
    pub async fn new(window_arc: Arc<Window>) -> anyhow::Result<State> {
        let size = window_arc.inner_size();

        let gpu = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        // Surface itself is !Send on WASM due to HtmlCanvasElement
        let surface = gpu.create_surface(window_arc)?;

        let adapter = gpu
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let texture_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or_else(|| {
                log::warn!(
                    "No sRGB surface format found, falling back to {:?}",
                    surface_caps.formats[0]
                );
                surface_caps.formats[0]
            });

        let needs_shader_srgb_output_conversion = !texture_format.is_srgb();

        log::info!(
            "Using {} ({:?}, Target Format: {:?}), Needs Shader sRGB Output Conversion: {}",
            adapter_info.name,
            adapter_info.backend,
            texture_format,
            needs_shader_srgb_output_conversion
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = Camera::new(size.width, size.height);
        let camera_uniform = CameraUniform {
            view_proj: camera.build_view_projection_matrix().to_cols_array_2d(),
            needs_srgb_output_conversion: needs_shader_srgb_output_conversion as u32,
            _padding: [0; 3],
        };

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Camera Bind Group Layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("Camera Bind Group"),
        });

        let lines_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lines Shader"),
            source: wgpu::ShaderSource::Wgsl(LINES_WGSL.into()),
        });

        let circles_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Circles Shader"),
            source: wgpu::ShaderSource::Wgsl(CIRCLES_WGSL.into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&camera_bind_group_layout],
                push_constant_ranges: &[],
            });

        let line_render_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Line Render Pipeline"),
                layout: Some(&render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &lines_shader_module,
                    entry_point: Some("vs_main"),
                    buffers: &[LineVertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &lines_shader_module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: texture_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::LineList,
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
                multiview: None,
                cache: None,
            });

        let circle_render_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Circle Render Pipeline"),
                layout: Some(&render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &circles_shader_module,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex2D::layout(), CircleInstance::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &circles_shader_module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: texture_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // The pixel-space projection flips y, which mirrors the
                    // quad winding; a flat scene has nothing to cull anyway.
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
                multiview: None,
                cache: None,
            });

        let params = FieldParams::default();
        let constrained = size.width < CONSTRAINED_VIEWPORT_WIDTH;
        let scene = Scene::generate(
            size.width.max(1) as f32,
            size.height.max(1) as f32,
            &params,
            constrained,
            &mut rand::rng(),
        );

        let mut circle_instances = Vec::new();
        let mut line_vertices = Vec::new();
        let mut network_ranges = Vec::new();
        rebuild_geometry(
            &scene,
            &mut circle_instances,
            &mut line_vertices,
            &mut network_ranges,
        );

        let circle_instance_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Circle Instance Buffer"),
                contents: bytemuck::cast_slice(&circle_instances),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(Vertex2D::QUAD_VERTICES.as_slice()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(Vertex2D::QUAD_INDICES.as_slice()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let line_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line Vertex Buffer"),
            contents: bytemuck::cast_slice(&line_vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
            camera,
            camera_buffer,
            camera_bind_group,
            camera_uniform,
            camera_needs_update: true,
            line_render_pipeline,
            circle_render_pipeline,
            circle_instances,
            circle_instance_buffer,
            quad_vertex_buffer,
            quad_index_buffer,
            line_vertices,
            line_vertex_buffer,
            network_ranges,
            scene,
            params,
            constrained_override: None,
            clock: FrameClock::new(),
        })
    }

    fn constrained_display(&self) -> bool {
        self.constrained_override
            .unwrap_or(self.config.width < CONSTRAINED_VIEWPORT_WIDTH)
    }

    /// Throw the current generation away and scatter a fresh field. Any
    /// in-flight drag dies with the old scene.
    pub fn rebuild_scene(&mut self) {
        let width = self.config.width.max(1) as f32;
        let height = self.config.height.max(1) as f32;
        let constrained = self.constrained_display();
        self.scene = Scene::generate(width, height, &self.params, constrained, &mut rand::rng());
        log::info!(
            "Rebuilt scene: {} networks, {} nodes ({}x{}, constrained: {})",
            self.scene.networks.len(),
            self.scene.node_count(),
            width,
            height,
            constrained
        );
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            log::info!("Resize {}, {}", width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            self.camera.resize(width, height);
            self.camera_needs_update = true;
            self.is_surface_configured = true;

            // Destructive reset: the field is regenerated for the new
            // viewport, nothing carries over.
            self.rebuild_scene();
        }
    }

    /// Advance the simulation one tick and refresh GPU-side geometry.
    pub fn update(&mut self) {
        sim::step(&mut self.scene);

        // Split borrows: geometry vectors are rebuilt from the scene.
        let Self {
            scene,
            circle_instances,
            line_vertices,
            network_ranges,
            ..
        } = self;
        rebuild_geometry(scene, circle_instances, line_vertices, network_ranges);

        self.upload_geometry();

        if self.camera_needs_update {
            self.camera_uniform.view_proj =
                self.camera.build_view_projection_matrix().to_cols_array_2d();
            self.queue.write_buffer(
                &self.camera_buffer,
                0,
                bytemuck::cast_slice(&[self.camera_uniform]),
            );
            self.camera_needs_update = false;
        }
    }

    fn upload_geometry(&mut self) {
        let circle_data = bytemuck::cast_slice(&self.circle_instances);
        let line_data = bytemuck::cast_slice(&self.line_vertices);

        if self.circle_instance_buffer.size() < circle_data.len() as u64 {
            self.circle_instance_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Circle Instance Buffer (Resized)"),
                        contents: circle_data,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    });
        } else {
            self.queue
                .write_buffer(&self.circle_instance_buffer, 0, circle_data);
        }

        if self.line_vertex_buffer.size() < line_data.len() as u64 {
            self.line_vertex_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Line Vertex Buffer (Resized)"),
                        contents: line_data,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    });
        } else {
            self.queue
                .write_buffer(&self.line_vertex_buffer, 0, line_data);
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        self.clock.tick();

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(
                            Color::from((10, 14, 26)).into_linear_wgpu_color(),
                        ),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            // Network by network: connection lines first, then the glowing
            // nodes on top of them.
            for range in &self.network_ranges {
                if !range.lines.is_empty() {
                    render_pass.set_pipeline(&self.line_render_pipeline);
                    render_pass.set_vertex_buffer(0, self.line_vertex_buffer.slice(..));
                    render_pass.draw(range.lines.clone(), 0..1);
                }

                if !range.circles.is_empty() {
                    render_pass.set_pipeline(&self.circle_render_pipeline);
                    render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
                    render_pass.set_vertex_buffer(1, self.circle_instance_buffer.slice(..));
                    render_pass
                        .set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    render_pass.draw_indexed(
                        0..Vertex2D::QUAD_INDICES.len() as u32,
                        0,
                        range.circles.clone(),
                    );
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    // --- Pointer plumbing; mouse and touch both land here with
    // --- surface-local coordinates.

    pub fn pointer_down_at(&mut self, position: Vec2) -> Cursor {
        input::pointer_down(&mut self.scene, position)
    }

    pub fn pointer_moved(&mut self, position: Vec2) -> Cursor {
        input::pointer_move(&mut self.scene, position)
    }

    pub fn pointer_up(&mut self) -> Cursor {
        input::pointer_up(&mut self.scene)
    }
}
