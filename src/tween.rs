use cgmath::Vector3;

use crate::config::TweenerKind;
use crate::scene::ShapeId;

/// A vector-valued property a tween can drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TweenTarget {
    Scale(ShapeId),
    CameraPosition,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Easing {
    Linear,
    /// Quadratic ease-out, the default curve when none is requested.
    PowerOneOut,
    /// Cubic ease-in-out.
    PowerTwoInOut,
}

impl Easing {
    pub fn apply(self, progress: f32) -> f32 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Easing::Linear => p,
            Easing::PowerOneOut => 1.0 - (1.0 - p) * (1.0 - p),
            Easing::PowerTwoInOut => {
                if p < 0.5 {
                    4.0 * p * p * p
                } else {
                    let q = -2.0 * p + 2.0;
                    1.0 - q * q * q / 2.0
                }
            }
        }
    }
}

/// Final values keyed by axis. Axes left as `None` are not touched.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TweenProperties {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl TweenProperties {
    pub fn uniform(value: f32) -> Self {
        Self::vector(Vector3::new(value, value, value))
    }

    pub fn vector(value: Vector3<f32>) -> Self {
        Self {
            x: Some(value.x),
            y: Some(value.y),
            z: Some(value.z),
        }
    }
}

/// Anything that exposes tweenable properties.
pub trait TweenHost {
    fn read(&self, target: TweenTarget) -> Vector3<f32>;
    fn write(&mut self, target: TweenTarget, value: Vector3<f32>);
}

/// The tweening capability injected into the scene.
///
/// `animate_to` captures the current value of the target as the start value;
/// `advance` is called once per frame and writes interpolated values until
/// each tween reaches progress 1, at which point it writes the exact final
/// values and retires. Starting a tween on a target that is already animating
/// replaces the running one.
pub trait Tweener {
    fn animate_to(
        &mut self,
        host: &dyn TweenHost,
        target: TweenTarget,
        properties: TweenProperties,
        duration: f64,
        easing: Easing,
        now: f64,
    );

    fn advance(&mut self, host: &mut dyn TweenHost, now: f64);

    fn is_animating(&self, target: TweenTarget) -> bool;
}

pub fn make_tweener(kind: TweenerKind) -> Box<dyn Tweener> {
    match kind {
        TweenerKind::Eased => Box::new(TweenSet::eased()),
        TweenerKind::Linear => Box::new(TweenSet::linear()),
    }
}

struct Tween {
    target: TweenTarget,
    start: Vector3<f32>,
    properties: TweenProperties,
    started_at: f64,
    duration: f64,
    easing: Easing,
}

impl Tween {
    fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.started_at).max(0.0) / self.duration).min(1.0) as f32
    }

    fn sample(&self, progress: f32, current: Vector3<f32>) -> Vector3<f32> {
        let finished = progress >= 1.0;
        let eased = self.easing.apply(progress);
        let axis = |start: f32, end: Option<f32>, current: f32| match end {
            Some(end) if finished => end,
            Some(end) => start + (end - start) * eased,
            None => current,
        };
        Vector3::new(
            axis(self.start.x, self.properties.x, current.x),
            axis(self.start.y, self.properties.y, current.y),
            axis(self.start.z, self.properties.z, current.z),
        )
    }
}

/// In-flight tweens, at most one per target.
///
/// The linear variant is the built-in fallback: same contract, but every
/// tween interpolates linearly whatever easing was asked for.
#[derive(Default)]
pub struct TweenSet {
    tweens: Vec<Tween>,
    linear_only: bool,
}

impl TweenSet {
    pub fn eased() -> Self {
        Self::default()
    }

    pub fn linear() -> Self {
        Self {
            tweens: Vec::new(),
            linear_only: true,
        }
    }
}

impl Tweener for TweenSet {
    fn animate_to(
        &mut self,
        host: &dyn TweenHost,
        target: TweenTarget,
        properties: TweenProperties,
        duration: f64,
        easing: Easing,
        now: f64,
    ) {
        self.tweens.retain(|running| running.target != target);
        self.tweens.push(Tween {
            target,
            start: host.read(target),
            properties,
            started_at: now,
            duration,
            easing: if self.linear_only { Easing::Linear } else { easing },
        });
    }

    fn advance(&mut self, host: &mut dyn TweenHost, now: f64) {
        self.tweens.retain(|tween| {
            let progress = tween.progress(now);
            let value = tween.sample(progress, host.read(tween.target));
            host.write(tween.target, value);
            progress < 1.0
        });
    }

    fn is_animating(&self, target: TweenTarget) -> bool {
        self.tweens.iter().any(|tween| tween.target == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::vec3;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Props {
        values: HashMap<TweenTarget, Vector3<f32>>,
    }

    impl TweenHost for Props {
        fn read(&self, target: TweenTarget) -> Vector3<f32> {
            self.values
                .get(&target)
                .copied()
                .unwrap_or(vec3(1.0, 1.0, 1.0))
        }

        fn write(&mut self, target: TweenTarget, value: Vector3<f32>) {
            self.values.insert(target, value);
        }
    }

    const SHAPE: TweenTarget = TweenTarget::Scale(ShapeId::Central);

    #[test]
    fn reaches_exact_final_value_at_duration() {
        let mut host = Props::default();
        let mut tweener = TweenSet::eased();
        tweener.animate_to(&host, SHAPE, TweenProperties::uniform(1.2), 0.3, Easing::PowerOneOut, 0.0);

        tweener.advance(&mut host, 0.3);
        assert_eq!(host.read(SHAPE), vec3(1.2, 1.2, 1.2));
        assert!(!tweener.is_animating(SHAPE));

        // Later frames leave the settled value alone.
        host.write(SHAPE, vec3(2.0, 2.0, 2.0));
        tweener.advance(&mut host, 5.0);
        assert_eq!(host.read(SHAPE), vec3(2.0, 2.0, 2.0));
    }

    #[test]
    fn sampling_past_duration_never_overshoots() {
        let mut host = Props::default();
        let mut tweener = TweenSet::eased();
        tweener.animate_to(&host, SHAPE, TweenProperties::uniform(1.2), 0.3, Easing::PowerTwoInOut, 0.0);
        let mut previous = 1.0;
        for frame in 1..40 {
            tweener.advance(&mut host, frame as f64 / 60.0);
            let x = host.read(SHAPE).x;
            assert!(x >= previous && x <= 1.2, "frame {frame}: {x}");
            previous = x;
        }
        assert_eq!(previous, 1.2);
    }

    #[test]
    fn linear_midpoint() {
        let mut host = Props::default();
        let mut tweener = TweenSet::linear();
        tweener.animate_to(&host, SHAPE, TweenProperties::uniform(2.0), 1.0, Easing::PowerTwoInOut, 10.0);
        tweener.advance(&mut host, 10.25);
        assert!((host.read(SHAPE).x - 1.25).abs() < 1e-6);
    }

    #[test]
    fn easing_curves_hit_their_anchor_points() {
        for easing in [Easing::Linear, Easing::PowerOneOut, Easing::PowerTwoInOut] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
        }
        assert!((Easing::PowerTwoInOut.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((Easing::PowerTwoInOut.apply(0.25) - 0.0625).abs() < 1e-6);
        assert!((Easing::PowerTwoInOut.apply(0.75) - 0.9375).abs() < 1e-6);
        assert!((Easing::PowerOneOut.apply(0.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn restart_recaptures_mid_tween_start() {
        let mut host = Props::default();
        let mut tweener = TweenSet::linear();
        tweener.animate_to(&host, SHAPE, TweenProperties::uniform(2.0), 1.0, Easing::Linear, 0.0);
        tweener.advance(&mut host, 0.5);
        assert!((host.read(SHAPE).x - 1.5).abs() < 1e-6);

        tweener.animate_to(&host, SHAPE, TweenProperties::uniform(1.0), 1.0, Easing::Linear, 0.5);
        tweener.advance(&mut host, 1.0);
        assert!((host.read(SHAPE).x - 1.25).abs() < 1e-6);
        tweener.advance(&mut host, 1.5);
        assert_eq!(host.read(SHAPE), vec3(1.0, 1.0, 1.0));
    }

    #[test]
    fn targets_are_independent() {
        let mut host = Props::default();
        let mut tweener = TweenSet::eased();
        let cube = TweenTarget::Scale(ShapeId::Cube(3));
        tweener.animate_to(&host, SHAPE, TweenProperties::uniform(1.2), 0.3, Easing::Linear, 0.0);
        tweener.animate_to(&host, cube, TweenProperties::uniform(0.0), 0.6, Easing::Linear, 0.0);
        tweener.advance(&mut host, 0.3);
        assert_eq!(host.read(SHAPE).x, 1.2);
        assert!((host.read(cube).x - 0.5).abs() < 1e-6);
        assert!(tweener.is_animating(cube));
        assert!(!tweener.is_animating(SHAPE));
    }

    #[test]
    fn untouched_axes_keep_their_value() {
        let mut host = Props::default();
        host.write(TweenTarget::CameraPosition, vec3(0.0, 0.0, 5.0));
        let mut tweener = TweenSet::eased();
        let properties = TweenProperties {
            x: Some(4.0),
            ..Default::default()
        };
        tweener.animate_to(&host, TweenTarget::CameraPosition, properties, 1.0, Easing::Linear, 0.0);
        host.write(TweenTarget::CameraPosition, vec3(0.0, 7.0, 5.0));
        tweener.advance(&mut host, 1.0);
        assert_eq!(host.read(TweenTarget::CameraPosition), vec3(4.0, 7.0, 5.0));
    }

    #[test]
    fn zero_duration_settles_immediately() {
        let mut host = Props::default();
        let mut tweener = make_tweener(TweenerKind::Eased);
        tweener.animate_to(&host, SHAPE, TweenProperties::uniform(3.0), 0.0, Easing::Linear, 1.0);
        tweener.advance(&mut host, 1.0);
        assert_eq!(host.read(SHAPE), vec3(3.0, 3.0, 3.0));
    }
}
