mod animation;
mod camera;
pub mod config;
mod error;
mod geometry;
mod interaction;
mod navigation;
mod render;
mod scene;
mod scheduler;
mod tween;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use std::sync::Arc;

use winit::{
    event::{Event, WindowEvent},
    event_loop::{EventLoop, EventLoopWindowTarget},
    window::{CursorIcon, Window, WindowBuilder},
};

pub use crate::config::SceneConfig;
pub use crate::error::{InitError, RenderError};
pub use crate::interaction::CursorStyle;
pub use crate::render::{FrameSink, Renderer};
pub use crate::scene::SceneContext;
pub use crate::scheduler::FrameScheduler;

#[cfg(target_arch = "wasm32")]
const CANVAS_ID: &str = "canvas3d";

fn cursor_icon(style: CursorStyle) -> CursorIcon {
    match style {
        CursorStyle::Default => CursorIcon::Default,
        CursorStyle::Pointer => CursorIcon::Pointer,
    }
}

fn build_window(event_loop: &EventLoop<()>) -> Result<Window, InitError> {
    let builder = WindowBuilder::new().with_title("neon-backdrop");

    #[cfg(target_arch = "wasm32")]
    let builder = {
        use wasm_bindgen::JsCast;
        use winit::platform::web::WindowBuilderExtWebSys;

        let canvas = web_sys::window()
            .and_then(|win| win.document())
            .and_then(|doc| doc.get_element_by_id(CANVAS_ID))
            .and_then(|element| element.dyn_into::<web_sys::HtmlCanvasElement>().ok())
            .ok_or(InitError::MissingCanvas(CANVAS_ID))?;
        builder.with_canvas(Some(canvas))
    };

    Ok(builder.build(event_loop)?)
}

fn handle_frame<S: FrameSink>(
    scheduler: &mut FrameScheduler<S>,
    window: &Window,
    target: &EventLoopWindowTarget<()>,
) {
    match scheduler.frame() {
        Ok(Some(style)) => window.set_cursor_icon(cursor_icon(style)),
        Ok(None) => {}
        Err(error) if error.is_recoverable() => log::warn!("skipped frame: {error}"),
        Err(error) => {
            log::error!("render failed: {error}");
            target.exit();
        }
    }
}

async fn start() -> Result<(), InitError> {
    let event_loop = EventLoop::new()?;
    let window = Arc::new(build_window(&event_loop)?);
    let size = window.inner_size();

    let config = SceneConfig::with_defaults();
    let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
    let ctx = SceneContext::new(config, aspect);
    let renderer = Renderer::new(window.clone(), &ctx).await?;
    let mut scheduler = FrameScheduler::new(ctx, renderer, size.width, size.height);
    log::info!("scene ready at {}x{}", size.width, size.height);

    window.request_redraw();
    event_loop.run(move |event, target| {
        if let Event::WindowEvent { event, .. } = event {
            match event {
                WindowEvent::RedrawRequested => {
                    handle_frame(&mut scheduler, &window, target);
                    window.request_redraw();
                }
                WindowEvent::CloseRequested => target.exit(),
                WindowEvent::Resized(_) => {
                    scheduler.handle_window_event(&event);
                    // On macos the window needs to be redrawn manually after resizing
                    window.request_redraw();
                }
                event => scheduler.handle_window_event(&event),
            }
        }
    })?;
    Ok(())
}

async fn arun() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            if let Err(error) = console_log::init_with_level(log::Level::Info) {
                web_sys::console::error_1(&error.to_string().into());
            }
        } else {
            env_logger::init();
        }
    }

    if let Err(error) = start().await {
        log::error!("failed to start: {error}");
    }
}

/// Asks the scene to move the camera to a page section. Applied on the next frame.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn navigate_to_section(index: u32) {
    navigation::request_section(index as usize);
}

#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn run() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        pollster::block_on(arun());
    }
    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(arun());
    }
}
