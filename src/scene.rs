use std::f32::consts::PI;

use cgmath::{vec2, vec3, Matrix4, Rad, Vector2, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::camera::{Camera, OrbitControls};
use crate::config::{Color, Palette, SceneConfig};
use crate::interaction::InteractionTracker;
use crate::navigation::SectionNavigator;
use crate::tween::{make_tweener, TweenHost, TweenTarget, Tweener};

/// Stable identity of an interactive object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeId {
    Central,
    Cube(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    /// Euler angles in radians, applied in X, Y, Z order.
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: vec3(0.0, 0.0, 0.0),
            rotation: vec3(0.0, 0.0, 0.0),
            scale: vec3(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_x(Rad(self.rotation.x))
            * Matrix4::from_angle_y(Rad(self.rotation.y))
            * Matrix4::from_angle_z(Rad(self.rotation.z))
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

pub struct ParticleField {
    positions: Vec<f32>,
    colors: Vec<f32>,
    scales: Vec<f32>,
    pub rotation_y: f32,
    revision: u64,
}

impl ParticleField {
    /// Scatters `count` particles uniformly through a cube of side `spread`.
    pub fn generate<R: Rng + ?Sized>(
        count: usize,
        spread: f32,
        palette: &Palette,
        rng: &mut R,
    ) -> Self {
        let mut positions = Vec::with_capacity(count * 3);
        let mut colors = Vec::with_capacity(count * 3);
        let mut scales = Vec::with_capacity(count);

        for _ in 0..count {
            for _ in 0..3 {
                positions.push((rng.gen::<f32>() - 0.5) * spread);
            }
            let color = palette.pick(rng.gen::<f32>());
            colors.extend_from_slice(&color.to_array());
            scales.push(rng.gen::<f32>());
        }

        Self {
            positions,
            colors,
            scales,
            rotation_y: 0.0,
            revision: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn colors(&self) -> &[f32] {
        &self.colors
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    pub fn position(&self, index: usize) -> Vector3<f32> {
        let i = index * 3;
        vec3(self.positions[i], self.positions[i + 1], self.positions[i + 2])
    }

    pub fn color(&self, index: usize) -> [f32; 3] {
        let i = index * 3;
        [self.colors[i], self.colors[i + 1], self.colors[i + 2]]
    }

    /// Bumped every time the position buffer changes; renderers re-upload
    /// when it differs from what they last saw.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Vertical drift. Accumulates without bound.
    pub fn drift(&mut self, elapsed: f64) {
        for particle in self.positions.chunks_exact_mut(3) {
            particle[1] += ((elapsed + particle[0] as f64).sin() * 0.002) as f32;
        }
        self.revision = self.revision.wrapping_add(1);
    }
}

pub struct CentralShape {
    pub transform: Transform,
    /// The wireframe twin follows the time rotation but not the pointer.
    pub wireframe: Transform,
    pub color: Color,
    pub wireframe_color: Color,
}

pub struct OrbitingCube {
    pub angle: f32,
    pub radius: f32,
    pub speed: f32,
    pub transform: Transform,
    pub color: Color,
}

impl OrbitingCube {
    fn new<R: Rng + ?Sized>(index: usize, count: usize, radius: f32, color: Color, rng: &mut R) -> Self {
        let angle = index as f32 / count as f32 * PI * 2.0;
        let transform = Transform {
            position: vec3(angle.cos() * radius, (index as f32).sin() * 0.5, angle.sin() * radius),
            ..Transform::default()
        };
        Self {
            angle,
            radius,
            speed: 0.3 + rng.gen::<f32>() * 0.2,
            transform,
            color,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub color: Color,
    pub intensity: f32,
    pub range: f32,
    pub position: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerState {
    /// Normalized device coordinates, y up.
    pub ndc: Vector2<f32>,
    pub target_rotation: Vector2<f32>,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            ndc: vec2(0.0, 0.0),
            target_rotation: vec2(0.0, 0.0),
        }
    }
}

/// Every renderable entity and its transform, plus the camera.
pub struct SceneGraph {
    pub particles: ParticleField,
    pub shape: CentralShape,
    pub cubes: Vec<OrbitingCube>,
    pub lights: [PointLight; 3],
    pub ambient: (Color, f32),
    pub pointer: PointerState,
    pub hovered: Option<ShapeId>,
    pub camera: Camera,
}

impl SceneGraph {
    pub fn build<R: Rng + ?Sized>(config: &SceneConfig, aspect: f32, rng: &mut R) -> Self {
        let palette = config.palette;
        let particles =
            ParticleField::generate(config.particle_count, config.particle_spread, &palette, rng);

        let cubes = (0..config.cube_count)
            .map(|i| {
                let color = if i % 2 == 0 { palette.primary } else { palette.secondary };
                OrbitingCube::new(i, config.cube_count, config.orbit_radius, color, rng)
            })
            .collect();

        let lights = [
            PointLight {
                color: palette.primary,
                intensity: 2.0,
                range: 10.0,
                position: vec3(2.0, 2.0, 2.0),
            },
            PointLight {
                color: palette.secondary,
                intensity: 2.0,
                range: 10.0,
                position: vec3(-2.0, -2.0, -2.0),
            },
            PointLight {
                color: palette.accent,
                intensity: 1.5,
                range: 8.0,
                position: vec3(0.0, 3.0, 0.0),
            },
        ];

        Self {
            particles,
            shape: CentralShape {
                transform: Transform::default(),
                wireframe: Transform::default(),
                color: palette.primary,
                wireframe_color: palette.secondary,
            },
            cubes,
            lights,
            ambient: (Color::from_hex(0xffffff), config.ambient_intensity),
            pointer: PointerState::default(),
            hovered: None,
            camera: Camera::new(&config.camera, aspect),
        }
    }

    pub fn transform(&self, shape: ShapeId) -> Option<&Transform> {
        match shape {
            ShapeId::Central => Some(&self.shape.transform),
            ShapeId::Cube(i) => self.cubes.get(i).map(|cube| &cube.transform),
        }
    }

    pub fn transform_mut(&mut self, shape: ShapeId) -> Option<&mut Transform> {
        match shape {
            ShapeId::Central => Some(&mut self.shape.transform),
            ShapeId::Cube(i) => self.cubes.get_mut(i).map(|cube| &mut cube.transform),
        }
    }

    pub fn interactive_shapes(&self) -> impl Iterator<Item = ShapeId> {
        std::iter::once(ShapeId::Central).chain((0..self.cubes.len()).map(ShapeId::Cube))
    }
}

impl TweenHost for SceneGraph {
    fn read(&self, target: TweenTarget) -> Vector3<f32> {
        match target {
            TweenTarget::Scale(shape) => self
                .transform(shape)
                .map(|t| t.scale)
                .unwrap_or(vec3(0.0, 0.0, 0.0)),
            TweenTarget::CameraPosition => self.camera.position,
        }
    }

    fn write(&mut self, target: TweenTarget, value: Vector3<f32>) {
        match target {
            TweenTarget::Scale(shape) => {
                if let Some(transform) = self.transform_mut(shape) {
                    transform.scale = value;
                }
            }
            TweenTarget::CameraPosition => self.camera.position = value,
        }
    }
}

/// The single owner of scene state and of the capabilities acting on it.
pub struct SceneContext {
    pub config: SceneConfig,
    pub graph: SceneGraph,
    pub controls: OrbitControls,
    pub tracker: InteractionTracker,
    pub navigator: SectionNavigator,
    pub tweener: Box<dyn Tweener>,
}

impl SceneContext {
    pub fn new(config: SceneConfig, aspect: f32) -> Self {
        let seed = config.seed.unwrap_or_else(clock_seed);
        log::debug!("building scene with seed {seed}");
        let mut rng = StdRng::seed_from_u64(seed);
        Self::with_rng(config, aspect, &mut rng)
    }

    pub fn with_rng<R: Rng + ?Sized>(config: SceneConfig, aspect: f32, rng: &mut R) -> Self {
        let graph = SceneGraph::build(&config, aspect, rng);
        Self {
            controls: OrbitControls::new(config.orbit),
            tracker: InteractionTracker::new(config.cube_size),
            navigator: SectionNavigator::new(),
            tweener: make_tweener(config.tweener),
            graph,
            config,
        }
    }

    /// Swaps in a different tweening capability.
    pub fn with_tweener(mut self, tweener: Box<dyn Tweener>) -> Self {
        self.tweener = tweener;
        self
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn constant_low_samples_pick_primary_everywhere() {
        let config = SceneConfig::with_defaults();
        let mut rng = StepRng::new(0, 0);
        let field = ParticleField::generate(1500, 20.0, &config.palette, &mut rng);
        assert_eq!(field.len(), 1500);
        for i in 0..field.len() {
            assert_eq!(field.color(i), config.palette.primary.to_array());
            assert_eq!(field.position(i), vec3(-10.0, -10.0, -10.0));
        }
        assert!(field.scales().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn seeded_field_uses_only_palette_colors() {
        let config = SceneConfig::with_defaults();
        let mut rng = StdRng::seed_from_u64(7);
        let field = ParticleField::generate(500, 20.0, &config.palette, &mut rng);
        let palette = [
            config.palette.primary.to_array(),
            config.palette.secondary.to_array(),
            config.palette.accent.to_array(),
        ];
        for i in 0..field.len() {
            assert!(palette.contains(&field.color(i)));
            let p = field.position(i);
            for c in [p.x, p.y, p.z] {
                assert!((-10.0..10.0).contains(&c));
            }
        }
        assert!(field.scales().iter().all(|s| (0.0..1.0).contains(s)));
    }

    #[test]
    fn drift_moves_only_y_and_bumps_revision() {
        let config = SceneConfig::with_defaults();
        let mut rng = StdRng::seed_from_u64(1);
        let mut field = ParticleField::generate(10, 20.0, &config.palette, &mut rng);
        let before: Vec<_> = (0..10).map(|i| field.position(i)).collect();
        field.drift(1.0);
        assert_eq!(field.revision(), 1);
        for (i, old) in before.iter().enumerate() {
            let new = field.position(i);
            assert_eq!(new.x, old.x);
            assert_eq!(new.z, old.z);
            assert!((new.y - (old.y + (1.0 + old.x).sin() * 0.002)).abs() < 1e-6);
        }
    }

    #[test]
    fn cubes_start_evenly_spaced_with_bounded_speed() {
        let config = SceneConfig::with_defaults();
        let graph = SceneGraph::build(&config, 1.0, &mut StdRng::seed_from_u64(3));
        assert_eq!(graph.cubes.len(), 8);
        for (i, cube) in graph.cubes.iter().enumerate() {
            assert!((cube.angle - i as f32 * PI / 4.0).abs() < 1e-6);
            assert_eq!(cube.radius, 3.0);
            assert!(cube.speed >= 0.3 && cube.speed < 0.5);
            assert!((cube.transform.position.y - (i as f32).sin() * 0.5).abs() < 1e-6);
        }
        assert_eq!(graph.cubes[0].color, config.palette.primary);
        assert_eq!(graph.cubes[1].color, config.palette.secondary);
    }

    #[test]
    fn new_graph_starts_with_a_centred_pointer() {
        let config = SceneConfig::with_defaults().with_particle_count(0);
        let graph = SceneGraph::build(&config, 1.0, &mut StdRng::seed_from_u64(2));
        assert_eq!(graph.pointer, PointerState::default());
        assert_eq!(graph.pointer.ndc, vec2(0.0, 0.0));
        assert_eq!(graph.pointer.target_rotation, vec2(0.0, 0.0));
        assert_eq!(graph.hovered, None);
    }

    #[test]
    fn fixed_seed_reproduces_the_scene() {
        let config = SceneConfig::with_defaults().with_particle_count(32).with_seed(42);
        let a = SceneContext::new(config.clone(), 1.0);
        let b = SceneContext::new(config, 1.0);
        assert_eq!(a.graph.particles.positions(), b.graph.particles.positions());
        assert_eq!(a.graph.cubes[5].speed, b.graph.cubes[5].speed);
    }

    #[test]
    fn linear_fallback_can_be_injected() {
        use crate::tween::{Easing, TweenProperties, TweenSet};

        let config = SceneConfig::with_defaults().with_particle_count(0).with_seed(1);
        let mut ctx = SceneContext::new(config, 1.0).with_tweener(Box::new(TweenSet::linear()));
        let target = TweenTarget::Scale(ShapeId::Central);
        ctx.tweener.animate_to(
            &ctx.graph,
            target,
            TweenProperties::uniform(2.0),
            1.0,
            Easing::PowerTwoInOut,
            0.0,
        );
        ctx.tweener.advance(&mut ctx.graph, 0.25);
        assert!((ctx.graph.shape.transform.scale.x - 1.25).abs() < 1e-6);
    }

    #[test]
    fn tween_host_routes_targets() {
        let config = SceneConfig::with_defaults().with_particle_count(0);
        let mut graph = SceneGraph::build(&config, 1.0, &mut StdRng::seed_from_u64(3));
        graph.write(TweenTarget::Scale(ShapeId::Cube(2)), vec3(1.2, 1.2, 1.2));
        assert_eq!(graph.cubes[2].transform.scale, vec3(1.2, 1.2, 1.2));
        assert_eq!(graph.read(TweenTarget::Scale(ShapeId::Central)), vec3(1.0, 1.0, 1.0));
        graph.write(TweenTarget::CameraPosition, vec3(1.0, 2.0, 6.0));
        assert_eq!(graph.camera.position, vec3(1.0, 2.0, 6.0));
        // Unknown cube indices are ignored.
        graph.write(TweenTarget::Scale(ShapeId::Cube(99)), vec3(5.0, 5.0, 5.0));
        assert_eq!(graph.interactive_shapes().count(), 9);
    }
}
