use crate::error::RenderError;
use crate::interaction::CursorStyle;
use crate::navigation::take_requested_section;
use crate::render::FrameSink;
use crate::scene::{SceneContext, SceneGraph};

const SHAPE_SPIN: (f64, f64) = (0.2, 0.3);
const CUBE_ORBIT_STEP: f32 = 0.01;
const CUBE_SPIN_STEP: f32 = 0.01;
const CUBE_BOB: f64 = 0.5;
const FIELD_SPIN: f64 = 0.05;
const LIGHT_ORBIT_RADIUS: f64 = 3.0;
const POINTER_SMOOTHING: f32 = 0.05;

/// Advances every piece of time-dependent state by one frame. `elapsed` stays
/// in f64 seconds; values are narrowed to f32 after the trig.
///
/// Returns the new cursor style when hover changed this frame.
pub fn update(ctx: &mut SceneContext, elapsed: f64) -> Option<CursorStyle> {
    apply_pending_input(ctx, elapsed);

    spin_shape(&mut ctx.graph, elapsed);
    orbit_cubes(&mut ctx.graph, elapsed);
    ctx.graph.particles.drift(elapsed);
    ctx.graph.particles.rotation_y = (elapsed * FIELD_SPIN) as f32;
    orbit_lights(&mut ctx.graph, elapsed);
    follow_pointer(&mut ctx.graph);

    let cursor = ctx
        .tracker
        .update_hover(&mut ctx.graph, ctx.tweener.as_mut(), elapsed);
    ctx.controls.update(&mut ctx.graph.camera);
    cursor
}

/// One full frame: update, then hand the scene to the sink.
pub fn animate(
    ctx: &mut SceneContext,
    sink: &mut dyn FrameSink,
    elapsed: f64,
) -> Result<Option<CursorStyle>, RenderError> {
    let cursor = update(ctx, elapsed);
    sink.render(ctx)?;
    Ok(cursor)
}

fn apply_pending_input(ctx: &mut SceneContext, now: f64) {
    if let Some(index) = take_requested_section() {
        ctx.navigator
            .on_section_change(index, &ctx.graph, ctx.tweener.as_mut(), now);
    }
    ctx.navigator
        .poll_wheel(&ctx.graph, ctx.tweener.as_mut(), now);
    ctx.tweener.advance(&mut ctx.graph, now);
}

fn spin_shape(graph: &mut SceneGraph, elapsed: f64) {
    for transform in [&mut graph.shape.transform, &mut graph.shape.wireframe] {
        transform.rotation.x = (elapsed * SHAPE_SPIN.0) as f32;
        transform.rotation.y = (elapsed * SHAPE_SPIN.1) as f32;
    }
}

fn orbit_cubes(graph: &mut SceneGraph, elapsed: f64) {
    for (i, cube) in graph.cubes.iter_mut().enumerate() {
        cube.angle += CUBE_ORBIT_STEP * cube.speed;
        let position = &mut cube.transform.position;
        position.x = cube.angle.cos() * cube.radius;
        position.z = cube.angle.sin() * cube.radius;
        position.y = ((elapsed + i as f64).sin() * CUBE_BOB) as f32;
        cube.transform.rotation.x += CUBE_SPIN_STEP;
        cube.transform.rotation.y += CUBE_SPIN_STEP;
    }
}

fn orbit_lights(graph: &mut SceneGraph, elapsed: f64) {
    let [first, second, _] = &mut graph.lights;
    first.position.x = (elapsed.sin() * LIGHT_ORBIT_RADIUS) as f32;
    first.position.z = (elapsed.cos() * LIGHT_ORBIT_RADIUS) as f32;
    second.position.x = ((elapsed * 0.7).cos() * LIGHT_ORBIT_RADIUS) as f32;
    second.position.z = ((elapsed * 0.7).sin() * LIGHT_ORBIT_RADIUS) as f32;
}

// Applied after the absolute spin, so pointer influence decays each frame.
fn follow_pointer(graph: &mut SceneGraph) {
    let target = graph.pointer.target_rotation;
    let rotation = &mut graph.shape.transform.rotation;
    rotation.x += (target.x - rotation.x) * POINTER_SMOOTHING;
    rotation.y += (target.y - rotation.y) * POINTER_SMOOTHING;
}
