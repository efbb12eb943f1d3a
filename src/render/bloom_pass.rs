use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::config::{BloomSettings, ToneMapping};
use crate::render::scene_pass::HDR_FORMAT;
use crate::render::RenderTargets;

#[repr(C)]
#[derive(Default, Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BloomUniform {
    threshold: f32,
    strength: f32,
    radius: f32,
    exposure: f32,
    texel_size: [f32; 2],
    direction: [f32; 2],
    encode_srgb: u32,
    _pad: [u32; 3],
}

impl BloomUniform {
    pub fn new(
        bloom: &BloomSettings,
        tone_mapping: &ToneMapping,
        glow_size: (u32, u32),
        direction: [f32; 2],
        encode_srgb: bool,
    ) -> Self {
        Self {
            threshold: bloom.threshold,
            strength: bloom.strength,
            radius: bloom.radius,
            exposure: tone_mapping.exposure,
            texel_size: [1.0 / glow_size.0 as f32, 1.0 / glow_size.1 as f32],
            direction,
            encode_srgb: encode_srgb as u32,
            _pad: [0; 3],
        }
    }
}

/// Stage order within the uniform array.
const BRIGHT: usize = 0;
const HORIZONTAL: usize = 1;
const VERTICAL: usize = 2;

/// Bright-pass, separable blur and tone-mapped composite onto the surface.
pub struct BloomPass {
    bright_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    filter_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_fullscreen"),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(format.into())],
        }),
        primitive: wgpu::PrimitiveState {
            topology: Default::default(),
            strip_index_format: None,
            front_face: Default::default(),
            cull_mode: None,
            unclipped_depth: false,
            polygon_mode: Default::default(),
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

impl BloomPass {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let filter_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom: Filter Bind Group Layout"),
            entries: &[texture_entry(0), sampler_entry(1), uniform_entry(2)],
        });
        let composite_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom: Composite Bind Group Layout"),
            entries: &[
                texture_entry(0),
                texture_entry(1),
                sampler_entry(2),
                uniform_entry(3),
            ],
        });

        let filter_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Filter Pipeline Layout"),
            bind_group_layouts: &[&filter_layout],
            push_constant_ranges: &[],
        });
        let composite_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Composite Pipeline Layout"),
            bind_group_layouts: &[&composite_layout],
            push_constant_ranges: &[],
        });

        let bloom_shader = device.create_shader_module(wgpu::include_wgsl!("bloom.wgsl"));
        let composite_shader = device.create_shader_module(wgpu::include_wgsl!("composite.wgsl"));

        let bright_pipeline = fullscreen_pipeline(
            device,
            "Bloom Bright Pipeline",
            &filter_pipeline_layout,
            &bloom_shader,
            "fs_bright",
            HDR_FORMAT,
        );
        let blur_pipeline = fullscreen_pipeline(
            device,
            "Bloom Blur Pipeline",
            &filter_pipeline_layout,
            &bloom_shader,
            "fs_blur",
            HDR_FORMAT,
        );
        let composite_pipeline = fullscreen_pipeline(
            device,
            "Bloom Composite Pipeline",
            &composite_pipeline_layout,
            &composite_shader,
            "fs_composite",
            surface_format,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Bloom Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            bright_pipeline,
            blur_pipeline,
            composite_pipeline,
            filter_layout,
            composite_layout,
            sampler,
        }
    }
}

pub struct BloomBindings {
    uniforms: [wgpu::Buffer; 3],
    stages: [wgpu::BindGroup; 3],
    composite: wgpu::BindGroup,
}

impl BloomBindings {
    pub fn new(device: &wgpu::Device, pass: &BloomPass, targets: &RenderTargets) -> Self {
        let uniforms = ["Bloom Bright Uniform", "Bloom Horizontal Uniform", "Bloom Vertical Uniform"]
            .map(|label| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: bytemuck::cast_slice(&[BloomUniform::default()]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                })
            });
        let (stages, composite) = Self::create_groups(device, pass, targets, &uniforms);
        Self {
            uniforms,
            stages,
            composite,
        }
    }

    /// Rebinds the render targets after a resize.
    pub fn update_targets(&mut self, device: &wgpu::Device, pass: &BloomPass, targets: &RenderTargets) {
        let (stages, composite) = Self::create_groups(device, pass, targets, &self.uniforms);
        self.stages = stages;
        self.composite = composite;
    }

    fn create_groups(
        device: &wgpu::Device,
        pass: &BloomPass,
        targets: &RenderTargets,
        uniforms: &[wgpu::Buffer; 3],
    ) -> ([wgpu::BindGroup; 3], wgpu::BindGroup) {
        let filter = |label: &str, source: &wgpu::TextureView, uniform: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &pass.filter_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(source),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&pass.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            })
        };
        let stages = [
            filter("Bloom: Bright Bind Group", &targets.hdr, &uniforms[BRIGHT]),
            filter("Bloom: Horizontal Bind Group", &targets.glow[0], &uniforms[HORIZONTAL]),
            filter("Bloom: Vertical Bind Group", &targets.glow[1], &uniforms[VERTICAL]),
        ];
        let composite = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom: Composite Bind Group"),
            layout: &pass.composite_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&targets.hdr),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.glow[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&pass.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: uniforms[BRIGHT].as_entire_binding(),
                },
            ],
        });
        (stages, composite)
    }

    pub fn write(
        &self,
        queue: &wgpu::Queue,
        bloom: &BloomSettings,
        tone_mapping: &ToneMapping,
        glow_size: (u32, u32),
        encode_srgb: bool,
    ) {
        let directions = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        for (buffer, direction) in self.uniforms.iter().zip(directions) {
            let uniform = BloomUniform::new(bloom, tone_mapping, glow_size, direction, encode_srgb);
            queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }
}

fn fullscreen_pass<'encoder>(
    encoder: &'encoder mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
) -> wgpu::RenderPass<'encoder> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    })
}

impl BloomPass {
    /// Glow chain ping-pongs between the two half-resolution targets and ends
    /// in `glow[0]`, which the composite reads alongside the HDR scene.
    pub fn record(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bindings: &BloomBindings,
        targets: &RenderTargets,
        output: &wgpu::TextureView,
    ) {
        let chain = [
            (&self.bright_pipeline, BRIGHT, &targets.glow[0], "Bloom Bright Pass"),
            (&self.blur_pipeline, HORIZONTAL, &targets.glow[1], "Bloom Horizontal Pass"),
            (&self.blur_pipeline, VERTICAL, &targets.glow[0], "Bloom Vertical Pass"),
        ];
        for (pipeline, stage, target, label) in chain {
            let mut rpass = fullscreen_pass(encoder, label, target);
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &bindings.stages[stage], &[]);
            rpass.draw(0..3, 0..1);
        }

        let mut rpass = fullscreen_pass(encoder, "Bloom Composite Pass", output);
        rpass.set_pipeline(&self.composite_pipeline);
        rpass.set_bind_group(0, &bindings.composite, &[]);
        rpass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;

    #[test]
    fn uniform_is_shader_sized() {
        assert_eq!(std::mem::size_of::<BloomUniform>(), 48);
    }

    #[test]
    fn uniform_carries_settings_and_texel_size() {
        let config = SceneConfig::with_defaults();
        let uniform = BloomUniform::new(&config.bloom, &config.tone_mapping, (400, 200), [1.0, 0.0], true);
        assert_eq!(uniform.threshold, 0.21);
        assert_eq!(uniform.strength, 1.2);
        assert_eq!(uniform.radius, 0.55);
        assert_eq!(uniform.exposure, 1.5);
        assert_eq!(uniform.texel_size, [0.0025, 0.005]);
        assert_eq!(uniform.direction, [1.0, 0.0]);
        assert_eq!(uniform.encode_srgb, 1);
    }
}
