use std::cell::Cell;

use cgmath::vec3;

use crate::tween::{Easing, TweenHost, TweenProperties, TweenTarget, Tweener};

/// Camera station for each page section.
pub const SECTION_STATIONS: [[f32; 3]; 5] = [
    [0.0, 0.0, 5.0],   // home
    [2.0, 1.0, 4.0],   // about
    [-2.0, -1.0, 5.0], // skills
    [1.0, 2.0, 6.0],   // projects
    [0.0, -1.0, 4.0],  // contact
];
pub const SECTION_TWEEN_SECONDS: f64 = 1.5;
pub const NAVIGATION_LOCK_SECONDS: f64 = 1.0;
pub const WHEEL_QUIET_SECONDS: f64 = 0.05;

thread_local! {
    static REQUESTED_SECTION: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Queues a section change from outside the frame loop (page script).
/// The latest request wins and is applied at the top of the next frame.
#[cfg(any(test, target_arch = "wasm32"))]
pub fn request_section(index: usize) {
    REQUESTED_SECTION.with(|requested| requested.set(Some(index)));
}

pub fn take_requested_section() -> Option<usize> {
    REQUESTED_SECTION.with(Cell::take)
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct PendingWheel {
    delta_y: f32,
    deadline: f64,
}

pub struct SectionNavigator {
    current: usize,
    locked_until: f64,
    pending_wheel: Option<PendingWheel>,
}

impl Default for SectionNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl SectionNavigator {
    pub fn new() -> Self {
        Self {
            current: 0,
            locked_until: f64::NEG_INFINITY,
            pending_wheel: None,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_locked(&self, now: f64) -> bool {
        now < self.locked_until
    }

    /// Moves the camera to the station for `index`. Ignored while a previous
    /// navigation holds the lock, when already there, or out of range.
    pub fn on_section_change(
        &mut self,
        index: usize,
        host: &dyn TweenHost,
        tweener: &mut dyn Tweener,
        now: f64,
    ) -> bool {
        if self.is_locked(now) || index == self.current || index >= SECTION_STATIONS.len() {
            return false;
        }
        log::debug!("section {} -> {}", self.current, index);
        self.current = index;
        self.locked_until = now + NAVIGATION_LOCK_SECONDS;

        let [x, y, z] = SECTION_STATIONS[index];
        tweener.animate_to(
            host,
            TweenTarget::CameraPosition,
            TweenProperties::vector(vec3(x, y, z)),
            SECTION_TWEEN_SECONDS,
            Easing::PowerTwoInOut,
            now,
        );
        true
    }

    /// Records a wheel event (positive `delta_y` scrolls down). Each event
    /// restarts the quiet period.
    pub fn on_wheel(&mut self, delta_y: f32, now: f64) {
        self.pending_wheel = Some(PendingWheel {
            delta_y,
            deadline: now + WHEEL_QUIET_SECONDS,
        });
    }

    /// Fires the debounced wheel navigation once the quiet period has passed.
    pub fn poll_wheel(&mut self, host: &dyn TweenHost, tweener: &mut dyn Tweener, now: f64) -> bool {
        let Some(pending) = self.pending_wheel else {
            return false;
        };
        if now < pending.deadline {
            return false;
        }
        self.pending_wheel = None;

        let last = SECTION_STATIONS.len() - 1;
        if pending.delta_y > 0.0 && self.current < last {
            self.on_section_change(self.current + 1, host, tweener, now)
        } else if pending.delta_y < 0.0 && self.current > 0 {
            self.on_section_change(self.current - 1, host, tweener, now)
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tween::TweenSet;
    use cgmath::{InnerSpace, Vector3};

    struct CameraOnly {
        position: Vector3<f32>,
    }

    impl TweenHost for CameraOnly {
        fn read(&self, _target: TweenTarget) -> Vector3<f32> {
            self.position
        }

        fn write(&mut self, _target: TweenTarget, value: Vector3<f32>) {
            self.position = value;
        }
    }

    fn setup() -> (SectionNavigator, CameraOnly, TweenSet) {
        (
            SectionNavigator::new(),
            CameraOnly {
                position: vec3(0.0, 0.0, 5.0),
            },
            TweenSet::eased(),
        )
    }

    #[test]
    fn section_three_tweens_camera_over_one_and_a_half_seconds() {
        let (mut nav, mut camera, mut tweener) = setup();
        assert!(nav.on_section_change(3, &camera, &mut tweener, 2.0));
        assert_eq!(nav.current(), 3);

        tweener.advance(&mut camera, 2.75);
        assert!((camera.position - vec3(0.5, 1.0, 5.5)).magnitude() < 1e-5);
        assert!(tweener.is_animating(TweenTarget::CameraPosition));

        tweener.advance(&mut camera, 3.5);
        assert_eq!(camera.position, vec3(1.0, 2.0, 6.0));
        assert!(!tweener.is_animating(TweenTarget::CameraPosition));
    }

    #[test]
    fn requests_inside_the_lock_are_ignored() {
        let (mut nav, camera, mut tweener) = setup();
        assert!(nav.on_section_change(3, &camera, &mut tweener, 0.0));
        assert!(!nav.on_section_change(1, &camera, &mut tweener, 0.5));
        assert_eq!(nav.current(), 3);
        assert!(nav.is_locked(0.99));
        assert!(!nav.is_locked(1.0));
        assert!(nav.on_section_change(1, &camera, &mut tweener, 1.0));
        assert_eq!(nav.current(), 1);
    }

    #[test]
    fn same_or_unknown_section_is_a_no_op() {
        let (mut nav, camera, mut tweener) = setup();
        assert!(!nav.on_section_change(0, &camera, &mut tweener, 0.0));
        assert!(!nav.on_section_change(5, &camera, &mut tweener, 0.0));
        assert!(!tweener.is_animating(TweenTarget::CameraPosition));
        assert!(!nav.is_locked(0.0));
    }

    #[test]
    fn wheel_burst_collapses_into_one_step() {
        let (mut nav, camera, mut tweener) = setup();
        nav.on_wheel(120.0, 0.0);
        nav.on_wheel(120.0, 0.02);
        nav.on_wheel(120.0, 0.04);
        assert!(!nav.poll_wheel(&camera, &mut tweener, 0.08));
        assert!(nav.poll_wheel(&camera, &mut tweener, 0.1));
        assert_eq!(nav.current(), 1);
        assert!(!nav.poll_wheel(&camera, &mut tweener, 0.5));
    }

    #[test]
    fn debounce_holds_after_days_of_uptime() {
        let (mut nav, camera, mut tweener) = setup();
        let week = 7.0 * 24.0 * 3600.0;
        nav.on_wheel(120.0, week);
        assert!(!nav.poll_wheel(&camera, &mut tweener, week + 0.03));
        assert!(nav.poll_wheel(&camera, &mut tweener, week + 0.06));
        assert_eq!(nav.current(), 1);
        assert!(nav.is_locked(week + 0.5));
    }

    #[test]
    fn wheel_stops_at_the_ends() {
        let (mut nav, camera, mut tweener) = setup();
        nav.on_wheel(-50.0, 0.0);
        assert!(!nav.poll_wheel(&camera, &mut tweener, 1.0));
        assert_eq!(nav.current(), 0);

        nav.on_wheel(50.0, 1.0);
        assert!(nav.poll_wheel(&camera, &mut tweener, 1.1));
        nav.on_wheel(-50.0, 3.0);
        assert!(nav.poll_wheel(&camera, &mut tweener, 3.1));
        assert_eq!(nav.current(), 0);
    }

    #[test]
    fn page_requests_are_taken_once() {
        request_section(2);
        request_section(4);
        assert_eq!(take_requested_section(), Some(4));
        assert_eq!(take_requested_section(), None);
    }
}
