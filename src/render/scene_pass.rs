use bytemuck::{Pod, Zeroable};
use cgmath::{Matrix4, Rad};
use wgpu::util::DeviceExt;

use crate::config::{Color, MaterialSettings};
use crate::geometry::{cube, MeshVertex, TorusKnot};
use crate::scene::{ParticleField, SceneContext, Transform};

pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Dynamic uniform offsets must be aligned to this.
const OBJECT_STRIDE: wgpu::BufferAddress = 256;

const SHAPE_SLOT: u32 = 0;
const WIREFRAME_SLOT: u32 = 1;
const PARTICLE_SLOT: u32 = 2;
const FIRST_CUBE_SLOT: u32 = 3;

const FRAME_GROUP_ID: u32 = 0;
const OBJECT_GROUP_ID: u32 = 1;

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightUniform {
    position: [f32; 4],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniform {
    view_projection: [[f32; 4]; 4],
    camera_position: [f32; 4],
    ambient: [f32; 4],
    fog: [f32; 4],
    lights: [LightUniform; 3],
    particles: [f32; 4],
    viewport: [f32; 4],
}

impl FrameUniform {
    pub fn from_scene(scene: &SceneContext, width: u32, height: u32) -> Self {
        let graph = &scene.graph;
        let config = &scene.config;
        let (ambient, ambient_intensity) = graph.ambient;
        let ambient = ambient.linear();
        let fog = config.background.linear();
        let p = graph.camera.position;

        Self {
            view_projection: graph.camera.view_projection().into(),
            camera_position: [p.x, p.y, p.z, 1.0],
            ambient: [
                ambient.r * ambient_intensity,
                ambient.g * ambient_intensity,
                ambient.b * ambient_intensity,
                1.0,
            ],
            fog: [fog.r, fog.g, fog.b, config.fog_density],
            lights: graph.lights.map(|light| {
                let color = light.color.linear();
                LightUniform {
                    position: [light.position.x, light.position.y, light.position.z, light.range],
                    color: [color.r, color.g, color.b, light.intensity],
                }
            }),
            particles: [
                config.particle_size,
                config.particle_opacity,
                height as f32 * 0.5,
                0.0,
            ],
            viewport: [width as f32, height as f32, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, Pod, Zeroable)]
pub struct ObjectUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    emissive: [f32; 4],
    material: [f32; 4],
}

impl ObjectUniform {
    fn lit(transform: &Transform, color: Color, material: MaterialSettings) -> Self {
        let color = color.linear();
        let glow = material.emissive_intensity;
        Self {
            model: transform.model_matrix().into(),
            color: [color.r, color.g, color.b, 1.0],
            emissive: [color.r * glow, color.g * glow, color.b * glow, 0.0],
            material: [material.metalness, material.roughness, 0.0, 0.0],
        }
    }

    fn unlit(model: Matrix4<f32>, color: Color, opacity: f32) -> Self {
        let color = color.linear();
        Self {
            model: model.into(),
            color: [color.r, color.g, color.b, opacity],
            ..Self::default()
        }
    }
}

fn object_slot_count(cube_count: usize) -> u32 {
    FIRST_CUBE_SLOT + cube_count as u32
}

fn object_offset(slot: u32) -> wgpu::DynamicOffset {
    (slot as wgpu::BufferAddress * OBJECT_STRIDE) as wgpu::DynamicOffset
}

/// Packs every per-object uniform into one buffer image at `OBJECT_STRIDE` spacing.
pub fn pack_objects(scene: &SceneContext) -> Vec<u8> {
    let graph = &scene.graph;
    let config = &scene.config;
    let slots = object_slot_count(graph.cubes.len());
    let mut bytes = vec![0u8; (slots as wgpu::BufferAddress * OBJECT_STRIDE) as usize];

    let mut put = |slot: u32, uniform: ObjectUniform| {
        let start = object_offset(slot) as usize;
        let data = bytemuck::bytes_of(&uniform);
        bytes[start..start + data.len()].copy_from_slice(data);
    };

    put(
        SHAPE_SLOT,
        ObjectUniform::lit(&graph.shape.transform, graph.shape.color, config.shape_material),
    );
    put(
        WIREFRAME_SLOT,
        ObjectUniform::unlit(
            graph.shape.wireframe.model_matrix(),
            graph.shape.wireframe_color,
            config.wireframe_opacity,
        ),
    );
    put(
        PARTICLE_SLOT,
        ObjectUniform::unlit(
            Matrix4::from_angle_y(Rad(graph.particles.rotation_y)),
            Color::from_hex(0xffffff),
            config.particle_opacity,
        ),
    );
    for (i, cube) in graph.cubes.iter().enumerate() {
        put(
            FIRST_CUBE_SLOT + i as u32,
            ObjectUniform::lit(&cube.transform, cube.color, config.cube_material),
        );
    }
    bytes
}

/// Vertex and index buffers for everything the scene draws.
pub struct SceneGeometry {
    knot_vertices: wgpu::Buffer,
    knot_indices: wgpu::Buffer,
    knot_index_count: u32,
    knot_lines: wgpu::Buffer,
    knot_line_count: u32,
    cube_vertices: wgpu::Buffer,
    cube_indices: wgpu::Buffer,
    cube_index_count: u32,
    cube_count: u32,
    particle_positions: wgpu::Buffer,
    particle_colors: wgpu::Buffer,
    particle_count: u32,
    uploaded_revision: Option<u64>,
}

impl SceneGeometry {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, scene: &SceneContext) -> Self {
        let knot = TorusKnot::centerpiece().mesh();
        let lines = knot.wireframe_indices();
        let box_mesh = cube(scene.config.cube_size);
        let particles = &scene.graph.particles;

        let knot_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Knot Vertex Buffer"),
            contents: bytemuck::cast_slice(&knot.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let knot_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Knot Index Buffer"),
            contents: bytemuck::cast_slice(&knot.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let knot_lines = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Knot Line Index Buffer"),
            contents: bytemuck::cast_slice(&lines),
            usage: wgpu::BufferUsages::INDEX,
        });
        let cube_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(&box_mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let cube_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Index Buffer"),
            contents: bytemuck::cast_slice(&box_mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let particle_positions = particle_buffer(device, "Particle Position Buffer", particles.positions().len());
        let particle_colors = particle_buffer(device, "Particle Color Buffer", particles.colors().len());
        if !particles.is_empty() {
            queue.write_buffer(&particle_colors, 0, bytemuck::cast_slice(particles.colors()));
        }

        Self {
            knot_vertices,
            knot_indices,
            knot_index_count: knot.indices.len() as u32,
            knot_lines,
            knot_line_count: lines.len() as u32,
            cube_vertices,
            cube_indices,
            cube_index_count: box_mesh.indices.len() as u32,
            cube_count: scene.graph.cubes.len() as u32,
            particle_positions,
            particle_colors,
            particle_count: particles.len() as u32,
            uploaded_revision: None,
        }
    }

    /// Re-uploads particle positions when the field has moved since the last upload.
    pub fn sync_particles(&mut self, queue: &wgpu::Queue, field: &ParticleField) {
        if field.is_empty() || self.uploaded_revision == Some(field.revision()) {
            return;
        }
        queue.write_buffer(&self.particle_positions, 0, bytemuck::cast_slice(field.positions()));
        self.uploaded_revision = Some(field.revision());
    }
}

fn particle_buffer(device: &wgpu::Device, label: &str, floats: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: (floats * std::mem::size_of::<f32>()).max(16) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub struct ScenePass {
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    particle_pipeline: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene: Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<FrameUniform>() as u64),
                },
                count: None,
            }],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene: Object Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniform>() as u64),
                },
                count: None,
            }],
        });
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let shader = device.create_shader_module(wgpu::include_wgsl!("scene.wgsl"));

        let mesh_vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3],
        };
        let particle_layouts = [
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &wgpu::vertex_attr_array![0 => Float32x3],
            },
            wgpu::VertexBufferLayout {
                array_stride: 12,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &wgpu::vertex_attr_array![1 => Float32x3],
            },
        ];

        let alpha_blend = wgpu::BlendState::ALPHA_BLENDING;
        let additive_blend = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let mesh_pipeline = create_pipeline(
            device,
            &layout,
            &shader,
            PipelineSpec {
                label: "Scene Mesh Pipeline",
                vertex_entry: "vs_mesh",
                fragment_entry: "fs_mesh",
                buffers: std::slice::from_ref(&mesh_vertex_layout),
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                blend: None,
                depth_write_enabled: true,
            },
        );
        let line_pipeline = create_pipeline(
            device,
            &layout,
            &shader,
            PipelineSpec {
                label: "Scene Wireframe Pipeline",
                vertex_entry: "vs_mesh",
                fragment_entry: "fs_line",
                buffers: std::slice::from_ref(&mesh_vertex_layout),
                topology: wgpu::PrimitiveTopology::LineList,
                cull_mode: None,
                blend: Some(alpha_blend),
                depth_write_enabled: false,
            },
        );
        let particle_pipeline = create_pipeline(
            device,
            &layout,
            &shader,
            PipelineSpec {
                label: "Scene Particle Pipeline",
                vertex_entry: "vs_particle",
                fragment_entry: "fs_particle",
                buffers: &particle_layouts,
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                blend: Some(additive_blend),
                depth_write_enabled: false,
            },
        );

        Self {
            mesh_pipeline,
            line_pipeline,
            particle_pipeline,
            frame_layout,
            object_layout,
        }
    }
}

struct PipelineSpec<'a> {
    label: &'a str,
    vertex_entry: &'a str,
    fragment_entry: &'a str,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    cull_mode: Option<wgpu::Face>,
    blend: Option<wgpu::BlendState>,
    depth_write_enabled: bool,
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    spec: PipelineSpec,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(spec.vertex_entry),
            compilation_options: Default::default(),
            buffers: spec.buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(spec.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: HDR_FORMAT,
                blend: spec.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: spec.cull_mode,
            unclipped_depth: false,
            polygon_mode: Default::default(),
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: spec.depth_write_enabled,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: Default::default(),
            bias: Default::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

pub struct SceneBindings {
    frame_uniform: wgpu::Buffer,
    object_uniform: wgpu::Buffer,
    frame_group: wgpu::BindGroup,
    object_group: wgpu::BindGroup,
}

impl SceneBindings {
    pub fn new(device: &wgpu::Device, pass: &ScenePass, cube_count: usize) -> Self {
        let frame_uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FrameUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let object_uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniform Buffer"),
            size: object_slot_count(cube_count) as wgpu::BufferAddress * OBJECT_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene: Frame Bind Group"),
            layout: &pass.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_uniform.as_entire_binding(),
            }],
        });
        let object_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene: Object Bind Group"),
            layout: &pass.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &object_uniform,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniform>() as u64),
                }),
            }],
        });

        Self {
            frame_uniform,
            object_uniform,
            frame_group,
            object_group,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, scene: &SceneContext, width: u32, height: u32) {
        queue.write_buffer(
            &self.frame_uniform,
            0,
            bytemuck::cast_slice(&[FrameUniform::from_scene(scene, width, height)]),
        );
        queue.write_buffer(&self.object_uniform, 0, &pack_objects(scene));
    }
}

impl<'a> ScenePass {
    /// Opaque meshes first, then the blended wireframe and particles.
    pub fn record<'pass>(
        &'a self,
        rpass: &mut wgpu::RenderPass<'pass>,
        bindings: &'a SceneBindings,
        geometry: &'a SceneGeometry,
    ) where
        'a: 'pass,
    {
        rpass.set_bind_group(FRAME_GROUP_ID, &bindings.frame_group, &[]);

        rpass.set_pipeline(&self.mesh_pipeline);
        rpass.set_bind_group(OBJECT_GROUP_ID, &bindings.object_group, &[object_offset(SHAPE_SLOT)]);
        rpass.set_vertex_buffer(0, geometry.knot_vertices.slice(..));
        rpass.set_index_buffer(geometry.knot_indices.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..geometry.knot_index_count, 0, 0..1);

        rpass.set_vertex_buffer(0, geometry.cube_vertices.slice(..));
        rpass.set_index_buffer(geometry.cube_indices.slice(..), wgpu::IndexFormat::Uint32);
        for i in 0..geometry.cube_count {
            rpass.set_bind_group(
                OBJECT_GROUP_ID,
                &bindings.object_group,
                &[object_offset(FIRST_CUBE_SLOT + i)],
            );
            rpass.draw_indexed(0..geometry.cube_index_count, 0, 0..1);
        }

        rpass.set_pipeline(&self.line_pipeline);
        rpass.set_bind_group(OBJECT_GROUP_ID, &bindings.object_group, &[object_offset(WIREFRAME_SLOT)]);
        rpass.set_vertex_buffer(0, geometry.knot_vertices.slice(..));
        rpass.set_index_buffer(geometry.knot_lines.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(0..geometry.knot_line_count, 0, 0..1);

        if geometry.particle_count > 0 {
            rpass.set_pipeline(&self.particle_pipeline);
            rpass.set_bind_group(OBJECT_GROUP_ID, &bindings.object_group, &[object_offset(PARTICLE_SLOT)]);
            rpass.set_vertex_buffer(0, geometry.particle_positions.slice(..));
            rpass.set_vertex_buffer(1, geometry.particle_colors.slice(..));
            rpass.draw(0..6, 0..geometry.particle_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use cgmath::vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scene() -> SceneContext {
        let config = SceneConfig::with_defaults().with_particle_count(10);
        SceneContext::with_rng(config, 2.0, &mut StdRng::seed_from_u64(2))
    }

    #[test]
    fn uniform_layouts_match_the_shader() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 240);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 112);
        assert!(std::mem::size_of::<ObjectUniform>() as u64 <= OBJECT_STRIDE);
    }

    #[test]
    fn frame_uniform_packs_lights_and_point_scale() {
        let scene = scene();
        let frame = FrameUniform::from_scene(&scene, 1600, 800);
        assert_eq!(frame.particles, [0.05, 0.8, 400.0, 0.0]);
        assert_eq!(frame.viewport[..2], [1600.0, 800.0]);
        assert_eq!(frame.lights[0].position, [2.0, 2.0, 2.0, 10.0]);
        assert_eq!(frame.lights[0].color, [0.0, 1.0, 1.0, 2.0]);
        assert_eq!(frame.lights[2].position, [0.0, 3.0, 0.0, 8.0]);
        assert_eq!(frame.lights[2].color, [1.0, 1.0, 0.0, 1.5]);
        assert_eq!(frame.camera_position, [0.0, 0.0, 5.0, 1.0]);
        assert_eq!(frame.ambient, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(frame.fog[3], 0.05);
    }

    #[test]
    fn objects_land_in_their_slots() {
        let mut scene = scene();
        scene.graph.cubes[7].transform.position = vec3(1.0, 2.0, 3.0);
        let bytes = pack_objects(&scene);
        assert_eq!(bytes.len(), 11 * 256);

        let read = |slot: u32| -> ObjectUniform {
            let start = object_offset(slot) as usize;
            bytemuck::pod_read_unaligned(&bytes[start..start + std::mem::size_of::<ObjectUniform>()])
        };
        let shape = read(SHAPE_SLOT);
        assert_eq!(shape.emissive, [0.0, 0.5, 0.5, 0.0]);
        assert_eq!(shape.material[..2], [0.8, 0.2]);

        let wireframe = read(WIREFRAME_SLOT);
        assert_eq!(wireframe.color, [1.0, 0.0, 1.0, 0.3]);

        let last = read(FIRST_CUBE_SLOT + 7);
        assert_eq!(last.model[3][..3], [1.0, 2.0, 3.0]);
        assert_eq!(last.color, [1.0, 0.0, 1.0, 1.0]);
    }
}
