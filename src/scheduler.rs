use cgmath::vec2;
use web_time::Instant;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::animation;
use crate::error::RenderError;
use crate::interaction::{self, CursorStyle};
use crate::render::FrameSink;
use crate::scene::SceneContext;

/// Pixels per wheel "line" when the platform reports line deltas.
const LINE_HEIGHT: f32 = 100.0;

/// Drives the scene: one animation step per redraw, input routed in between.
pub struct FrameScheduler<S: FrameSink> {
    ctx: SceneContext,
    sink: S,
    started: Instant,
    viewport: (u32, u32),
    pointer: (f32, f32),
}

impl<S: FrameSink> FrameScheduler<S> {
    pub fn new(ctx: SceneContext, sink: S, width: u32, height: u32) -> Self {
        let mut scheduler = Self {
            ctx,
            sink,
            started: Instant::now(),
            viewport: (1, 1),
            pointer: (0.0, 0.0),
        };
        scheduler.resize(width, height);
        scheduler
    }

    pub fn context(&self) -> &SceneContext {
        &self.ctx
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Keeps projection and every render target in step with the viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        log::debug!("resize to {width}x{height}");
        self.viewport = (width, height);
        self.ctx.graph.camera.set_aspect(width as f32 / height as f32);
        self.sink.resize(width, height);
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.pointer = (x, y);
        let (width, height) = (self.viewport.0 as f32, self.viewport.1 as f32);
        interaction::pointer_moved(&mut self.ctx.graph.pointer, x, y, width, height);
        self.ctx.controls.drag_to(vec2(x, y), height);
    }

    pub fn pointer_button(&mut self, pressed: bool) {
        if pressed {
            let (x, y) = self.pointer;
            self.ctx.controls.begin_drag(vec2(x, y));
        } else {
            self.ctx.controls.end_drag();
        }
    }

    /// `delta_y` follows the page convention: positive scrolls down.
    pub fn wheel(&mut self, delta_y: f32) {
        let now = self.elapsed();
        self.wheel_at(delta_y, now);
    }

    pub fn wheel_at(&mut self, delta_y: f32, now: f64) {
        self.ctx.navigator.on_wheel(delta_y, now);
        self.ctx.controls.dolly(delta_y);
    }

    pub fn key_section(&mut self, index: usize) {
        let now = self.elapsed();
        let SceneContext {
            graph,
            navigator,
            tweener,
            ..
        } = &mut self.ctx;
        navigator.on_section_change(index, &*graph, tweener.as_mut(), now);
    }

    pub fn frame(&mut self) -> Result<Option<CursorStyle>, RenderError> {
        let elapsed = self.elapsed();
        self.frame_at(elapsed)
    }

    pub fn frame_at(&mut self, elapsed: f64) -> Result<Option<CursorStyle>, RenderError> {
        animation::animate(&mut self.ctx, &mut self.sink, elapsed)
    }

    /// Routes the input half of a window event. Redraws and close requests
    /// belong to the event loop.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer_moved(position.x as f32, position.y as f32)
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.pointer_button(*state == ElementState::Pressed),
            WindowEvent::MouseWheel { delta, .. } => self.wheel(wheel_delta_y(delta)),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(index) = section_key(*code) {
                    self.key_section(index);
                }
            }
            _ => {}
        }
    }
}

/// Converts winit's wheel delta (positive scrolls up) to page pixels,
/// positive scrolling down.
fn wheel_delta_y(delta: &MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}

fn section_key(code: KeyCode) -> Option<usize> {
    match code {
        KeyCode::Digit1 => Some(0),
        KeyCode::Digit2 => Some(1),
        KeyCode::Digit3 => Some(2),
        KeyCode::Digit4 => Some(3),
        KeyCode::Digit5 => Some(4),
        _ => None,
    }
}
