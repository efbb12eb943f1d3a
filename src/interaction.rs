use cgmath::{vec2, InnerSpace, Matrix4, SquareMatrix, Vector3};

use crate::camera::Ray;
use crate::geometry::TorusKnot;
use crate::scene::{PointerState, SceneGraph, ShapeId, Transform};
use crate::tween::{Easing, TweenProperties, TweenTarget, Tweener};

pub const HOVER_SCALE: f32 = 1.2;
pub const HOVER_SECONDS: f64 = 0.3;
const POINTER_ROTATION_FACTOR: f32 = 0.5;

/// Cursor affordance the host page should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    Pointer,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub shape: ShapeId,
    pub distance: f32,
}

/// Records a pointer move in window pixels.
pub fn pointer_moved(pointer: &mut PointerState, x: f32, y: f32, width: f32, height: f32) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    pointer.ndc = vec2(x / width * 2.0 - 1.0, -(y / height) * 2.0 + 1.0);
    pointer.target_rotation = vec2(
        pointer.ndc.y * POINTER_ROTATION_FACTOR,
        pointer.ndc.x * POINTER_ROTATION_FACTOR,
    );
}

pub struct InteractionTracker {
    knot_samples: Vec<Vector3<f32>>,
    tube_radius: f32,
    cube_half_extent: f32,
}

impl InteractionTracker {
    pub fn new(cube_size: f32) -> Self {
        let knot = TorusKnot::centerpiece();
        Self {
            knot_samples: knot.curve_samples(),
            tube_radius: knot.tube,
            cube_half_extent: cube_size * 0.5,
        }
    }

    /// Nearest interactive object under the pointer, if any.
    pub fn hit_test(&self, graph: &SceneGraph) -> Option<Hit> {
        let ray = graph.camera.ray_through(graph.pointer.ndc)?;
        graph
            .interactive_shapes()
            .filter_map(|shape| {
                let transform = graph.transform(shape)?;
                let distance = match shape {
                    ShapeId::Central => self.intersect_knot(transform, &ray),
                    ShapeId::Cube(_) => self.intersect_cube(transform, &ray),
                }?;
                Some(Hit { shape, distance })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Moves hover to whatever is under the pointer, driving scale tweens.
    /// Returns the new cursor style when hover changed.
    pub fn update_hover(
        &self,
        graph: &mut SceneGraph,
        tweener: &mut dyn Tweener,
        now: f64,
    ) -> Option<CursorStyle> {
        let hit = self.hit_test(graph).map(|hit| hit.shape);
        if hit == graph.hovered {
            return None;
        }

        if let Some(previous) = graph.hovered {
            tweener.animate_to(
                &*graph,
                TweenTarget::Scale(previous),
                TweenProperties::uniform(1.0),
                HOVER_SECONDS,
                Easing::PowerOneOut,
                now,
            );
        }
        log::trace!("hover {:?} -> {:?}", graph.hovered, hit);
        graph.hovered = hit;

        match hit {
            Some(next) => {
                tweener.animate_to(
                    &*graph,
                    TweenTarget::Scale(next),
                    TweenProperties::uniform(HOVER_SCALE),
                    HOVER_SECONDS,
                    Easing::PowerOneOut,
                    now,
                );
                Some(CursorStyle::Pointer)
            }
            None => Some(CursorStyle::Default),
        }
    }

    fn intersect_knot(&self, transform: &Transform, ray: &Ray) -> Option<f32> {
        let local = to_local(transform.model_matrix(), ray)?;
        self.knot_samples
            .iter()
            .filter_map(|center| intersect_sphere(&local, *center, self.tube_radius))
            .min_by(f32::total_cmp)
    }

    fn intersect_cube(&self, transform: &Transform, ray: &Ray) -> Option<f32> {
        let local = to_local(transform.model_matrix(), ray)?;
        intersect_box(&local, self.cube_half_extent)
    }
}

/// Moves a world ray into a model's local frame. The direction is not
/// renormalized, so the ray parameter still measures world distance.
fn to_local(model: Matrix4<f32>, ray: &Ray) -> Option<Ray> {
    let inverse = model.invert()?;
    Some(Ray {
        origin: (inverse * ray.origin.extend(1.0)).truncate(),
        direction: (inverse * ray.direction.extend(0.0)).truncate(),
    })
}

fn intersect_sphere(ray: &Ray, center: Vector3<f32>, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let a = ray.direction.magnitude2();
    let b = ray.direction.dot(oc);
    let c = oc.magnitude2() - radius * radius;
    let discriminant = b * b - a * c;
    if a <= f32::EPSILON || discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = (-b - root) / a;
    let far = (-b + root) / a;
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

fn intersect_box(ray: &Ray, half_extent: f32) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        if direction.abs() <= f32::EPSILON {
            if origin.abs() > half_extent {
                return None;
            }
            continue;
        }
        let t1 = (-half_extent - origin) / direction;
        let t2 = (half_extent - origin) / direction;
        t_min = t_min.max(t1.min(t2));
        t_max = t_max.min(t1.max(t2));
    }
    if t_max < t_min.max(0.0) {
        return None;
    }
    Some(if t_min >= 0.0 { t_min } else { t_max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;
    use crate::tween::TweenSet;
    use cgmath::{vec3, Vector2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn graph() -> SceneGraph {
        let config = SceneConfig::with_defaults().with_particle_count(0);
        SceneGraph::build(&config, 1.0, &mut StdRng::seed_from_u64(11))
    }

    fn aim_at(graph: &mut SceneGraph, point: Vector3<f32>) {
        let clip = graph.camera.projection() * graph.camera.view() * point.extend(1.0);
        graph.pointer.ndc = Vector2::new(clip.x / clip.w, clip.y / clip.w);
    }

    /// Parks every cube far away so only the ones a test places can be hit.
    fn park_cubes(graph: &mut SceneGraph) {
        for cube in &mut graph.cubes {
            cube.transform.position = vec3(50.0, 50.0, -50.0);
        }
    }

    #[test]
    fn centred_pointer_targets_no_rotation() {
        let mut pointer = PointerState::default();
        pointer_moved(&mut pointer, 400.0, 300.0, 800.0, 600.0);
        assert_eq!(pointer.ndc, vec2(0.0, 0.0));
        assert_eq!(pointer.target_rotation, vec2(0.0, 0.0));
    }

    #[test]
    fn pointer_corners_normalize_with_y_up() {
        let mut pointer = PointerState::default();
        pointer_moved(&mut pointer, 0.0, 0.0, 800.0, 600.0);
        assert_eq!(pointer.ndc, vec2(-1.0, 1.0));
        assert_eq!(pointer.target_rotation, vec2(0.5, -0.5));

        pointer_moved(&mut pointer, 800.0, 600.0, 0.0, 600.0);
        assert_eq!(pointer.ndc, vec2(-1.0, 1.0));
    }

    #[test]
    fn hits_the_nearest_cube() {
        let mut graph = graph();
        park_cubes(&mut graph);
        graph.cubes[0].transform.position = vec3(0.0, 0.0, 3.0);
        graph.cubes[1].transform.position = vec3(0.0, 0.0, 2.0);
        aim_at(&mut graph, vec3(0.0, 0.0, 0.0));

        let hit = InteractionTracker::new(0.3).hit_test(&graph).unwrap();
        assert_eq!(hit.shape, ShapeId::Cube(0));
        assert!((hit.distance - 1.85).abs() < 1e-4);
    }

    #[test]
    fn pointer_through_the_knot_hole_misses() {
        let mut graph = graph();
        park_cubes(&mut graph);
        aim_at(&mut graph, vec3(0.0, 0.0, 0.0));
        assert_eq!(InteractionTracker::new(0.3).hit_test(&graph), None);
    }

    #[test]
    fn hits_the_knot_tube() {
        let mut graph = graph();
        park_cubes(&mut graph);
        aim_at(&mut graph, vec3(1.5, 0.0, 0.0));
        let hit = InteractionTracker::new(0.3).hit_test(&graph).unwrap();
        assert_eq!(hit.shape, ShapeId::Central);
    }

    #[test]
    fn hover_is_exclusive_and_restores_scale() {
        let mut graph = graph();
        park_cubes(&mut graph);
        graph.cubes[0].transform.position = vec3(-1.0, 1.5, 2.0);
        graph.cubes[1].transform.position = vec3(1.0, 1.5, 2.0);
        let tracker = InteractionTracker::new(0.3);
        let mut tweener = TweenSet::eased();

        aim_at(&mut graph, vec3(-1.0, 1.5, 2.0));
        assert_eq!(tracker.update_hover(&mut graph, &mut tweener, 0.0), Some(CursorStyle::Pointer));
        assert_eq!(tracker.update_hover(&mut graph, &mut tweener, 0.1), None);
        tweener.advance(&mut graph, 0.1);

        aim_at(&mut graph, vec3(1.0, 1.5, 2.0));
        assert_eq!(tracker.update_hover(&mut graph, &mut tweener, 0.15), Some(CursorStyle::Pointer));
        assert_eq!(graph.hovered, Some(ShapeId::Cube(1)));
        tweener.advance(&mut graph, 1.0);

        assert_eq!(graph.cubes[0].transform.scale, vec3(1.0, 1.0, 1.0));
        assert_eq!(graph.cubes[1].transform.scale, vec3(1.2, 1.2, 1.2));
        let enlarged = graph
            .interactive_shapes()
            .filter(|&s| graph.transform(s).unwrap().scale.x > 1.0)
            .count();
        assert_eq!(enlarged, 1);

        aim_at(&mut graph, vec3(0.0, 40.0, -100.0));
        assert_eq!(tracker.update_hover(&mut graph, &mut tweener, 2.0), Some(CursorStyle::Default));
        tweener.advance(&mut graph, 2.5);
        assert_eq!(graph.hovered, None);
        assert_eq!(graph.cubes[1].transform.scale, vec3(1.0, 1.0, 1.0));
    }

    #[test]
    fn rotated_cube_is_hit_on_its_faces() {
        let cube = Transform {
            position: vec3(0.0, 0.0, 0.0),
            rotation: vec3(0.0, std::f32::consts::FRAC_PI_4, 0.0),
            scale: vec3(1.0, 1.0, 1.0),
        };
        let ray = Ray {
            origin: vec3(0.0, 0.0, 5.0),
            direction: vec3(0.0, 0.0, -1.0),
        };
        let local = to_local(cube.model_matrix(), &ray).unwrap();
        let distance = intersect_box(&local, 0.15).unwrap();
        // The 45 degree turn puts an edge toward the viewer.
        assert!((distance - (5.0 - 0.15 * 2f32.sqrt())).abs() < 1e-4);
    }
}
