mod bloom_pass;
mod scene_pass;

use std::sync::Arc;

use winit::window::Window;

use crate::error::{InitError, RenderError};
use crate::render::bloom_pass::{BloomBindings, BloomPass};
use crate::render::scene_pass::{SceneBindings, SceneGeometry, ScenePass, DEPTH_FORMAT, HDR_FORMAT};
use crate::scene::SceneContext;

/// Whatever turns a scene into pixels. The frame scheduler only talks to this.
pub trait FrameSink {
    /// Called with the new drawable size before the next `render`.
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, scene: &SceneContext) -> Result<(), RenderError>;
}

/// Size-dependent attachments: depth, the HDR scene color and the two
/// half-resolution glow buffers.
pub struct RenderTargets {
    depth: wgpu::TextureView,
    hdr: wgpu::TextureView,
    glow: [wgpu::TextureView; 2],
    glow_size: (u32, u32),
}

fn glow_size(width: u32, height: u32) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    (width, height): (u32, u32),
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

impl RenderTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let sampled = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let glow_size = glow_size(width, height);
        Self {
            depth: create_target(
                device,
                "Depth Target",
                (width, height),
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
            hdr: create_target(device, "HDR Target", (width, height), HDR_FORMAT, sampled),
            glow: [
                create_target(device, "Glow Target A", glow_size, HDR_FORMAT, sampled),
                create_target(device, "Glow Target B", glow_size, HDR_FORMAT, sampled),
            ],
            glow_size,
        }
    }
}

pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    encode_srgb: bool,
    targets: RenderTargets,
    scene_pass: ScenePass,
    scene_bindings: SceneBindings,
    geometry: SceneGeometry,
    bloom_pass: BloomPass,
    bloom_bindings: BloomBindings,
}

impl Renderer {
    pub async fn new(window: Arc<Window>, scene: &SceneContext) -> Result<Self, InitError> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or(InitError::NoAdapter)?;
        log::info!("using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        let mut config = surface
            .get_default_config(&adapter, width, height)
            .ok_or(InitError::UnsupportedSurface)?;
        // Prefer a surface that encodes sRGB itself; otherwise the composite does it.
        let capabilities = surface.get_capabilities(&adapter);
        if let Some(format) = capabilities.formats.iter().copied().find(|f| f.is_srgb()) {
            config.format = format;
        }
        let encode_srgb = !config.format.is_srgb();
        surface.configure(&device, &config);
        log::info!("surface format {:?}, shader sRGB encode: {}", config.format, encode_srgb);

        let targets = RenderTargets::new(&device, width, height);
        let scene_pass = ScenePass::new(&device);
        let scene_bindings = SceneBindings::new(&device, &scene_pass, scene.graph.cubes.len());
        let geometry = SceneGeometry::new(&device, &queue, scene);
        let bloom_pass = BloomPass::new(&device, config.format);
        let bloom_bindings = BloomBindings::new(&device, &bloom_pass, &targets);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            encode_srgb,
            targets,
            scene_pass,
            scene_bindings,
            geometry,
            bloom_pass,
            bloom_bindings,
        })
    }
}

impl FrameSink for Renderer {
    fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        self.surface.configure(&self.device, &self.config);
        self.targets = RenderTargets::new(&self.device, self.config.width, self.config.height);
        self.bloom_bindings
            .update_targets(&self.device, &self.bloom_pass, &self.targets);
    }

    fn render(&mut self, scene: &SceneContext) -> Result<(), RenderError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(error) => {
                let error = RenderError::from(error);
                if matches!(error, RenderError::SurfaceLost) {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(error);
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.geometry.sync_particles(&self.queue, &scene.graph.particles);
        self.scene_bindings
            .write(&self.queue, scene, self.config.width, self.config.height);
        self.bloom_bindings.write(
            &self.queue,
            &scene.config.bloom,
            &scene.config.tone_mapping,
            self.targets.glow_size,
            self.encode_srgb,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });

        {
            let background = scene.config.background.linear();
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.hdr,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: background.r as f64,
                            g: background.g as f64,
                            b: background.b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.scene_pass
                .record(&mut rpass, &self.scene_bindings, &self.geometry);
        }

        self.bloom_pass
            .record(&mut encoder, &self.bloom_bindings, &self.targets, &view);

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
