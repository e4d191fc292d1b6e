//! Procedural motion sampling.
//!
//! Every animated element is a base [`ElementState`] plus an ordered list of
//! [`Motion`]s. Each frame the [`Animator`] resets an element to its base state
//! and re-applies its motions from elapsed time alone. [`Motion::Spin`] is the
//! exception: it integrates `rate * frame_delta` into a per-element angle.

use serde::{Deserialize, Serialize};
use three_d::*;


/// Frame clock owned by the render loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    elapsed: f64,
    delta: f64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `delta_seconds`. Negative or non-finite deltas count as zero.
    pub fn advance(&mut self, delta_seconds: f64) {
        let delta = if delta_seconds.is_finite() {
            delta_seconds.max(0.0)
        } else {
            0.0
        };
        self.delta = delta;
        self.elapsed += delta;
    }

    /// Seconds since the loop started.
    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    /// Seconds since the previous frame.
    pub fn delta(&self) -> f32 {
        self.delta as f32
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}


/// Position, Euler rotation (XYZ order, radians), scale and opacity of one element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    pub opacity: f32,
}

impl Default for ElementState {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
            opacity: 1.0,
        }
    }
}

impl ElementState {
    /// Local transform `T * Rx * Ry * Rz * S`.
    pub fn matrix(&self) -> Mat4 {
        let [px, py, pz] = self.position;
        let [rx, ry, rz] = self.rotation;
        let [sx, sy, sz] = self.scale;
        Mat4::from_translation(vec3(px, py, pz))
            * Mat4::from_angle_x(radians(rx))
            * Mat4::from_angle_y(radians(ry))
            * Mat4::from_angle_z(radians(rz))
            * Mat4::from_nonuniform_scale(sx, sy, sz)
    }
}


pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}


/// `base + amplitude * sin(frequency * t + phase)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub base: f32,
    pub amplitude: f32,
    pub frequency: f32,
    #[serde(default)]
    pub phase: f32,
}

impl Wave {
    pub fn new(base: f32, amplitude: f32, frequency: f32) -> Self {
        Self {
            base,
            amplitude,
            frequency,
            phase: 0.0,
        }
    }

    pub fn sample(&self, t: f32) -> f32 {
        self.base + self.amplitude * (self.frequency * t + self.phase).sin()
    }
}


/// Repeating expansion that fades out over `period` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ripple {
    pub period: f32,
    pub rate: f32,
    pub opacity_start: f32,
    pub opacity_end: f32,
    /// Per-axis multiplier on the expansion factor.
    pub axis_weights: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleSample {
    pub scale: [f32; 3],
    pub opacity: f32,
}

impl Ripple {
    pub fn phase(&self, t: f32) -> f32 {
        t.rem_euclid(self.period)
    }

    pub fn sample(&self, t: f32) -> RippleSample {
        let t = self.phase(t);
        let expansion = 1.0 + t * self.rate;
        let [wx, wy, wz] = self.axis_weights;
        RippleSample {
            scale: [expansion * wx, expansion * wy, expansion * wz],
            opacity: lerp(self.opacity_start, self.opacity_end, t / self.period),
        }
    }
}


/// `base + (t' * rate) mod range` along one axis, where `t'` is `t` optionally
/// wrapped by `period` first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    pub axis: Axis,
    pub base: f32,
    pub rate: f32,
    pub range: f32,
    #[serde(default)]
    pub period: Option<f32>,
}

impl Drift {
    pub fn sample(&self, t: f32) -> f32 {
        let t = match self.period {
            Some(period) => t.rem_euclid(period),
            None => t,
        };
        self.base + (t * self.rate).rem_euclid(self.range)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spin {
    pub axis: Axis,
    /// Radians per second.
    pub rate: f32,
}

impl Spin {
    pub fn advance(&self, angle: f32, frame_delta: f32) -> f32 {
        angle + self.rate * frame_delta
    }
}


/// Slow hovering sway: vertical float plus a small wobble on all three axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hover {
    pub speed: f32,
    pub float_intensity: f32,
    pub rotation_intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoverSample {
    pub lift: f32,
    pub rotation: [f32; 3],
}

impl Hover {
    pub fn sample(&self, t: f32) -> HoverSample {
        let w = t * self.speed / 4.0;
        let ri = self.rotation_intensity;
        HoverSample {
            lift: w.sin() / 10.0 * self.float_intensity,
            rotation: [w.cos() / 8.0 * ri, w.sin() / 8.0 * ri, w.sin() / 20.0 * ri],
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Motion {
    /// Uniform scale from a wave.
    Pulse(Wave),
    /// Vertical position from a wave.
    Bob(Wave),
    Ripple(Ripple),
    Drift(Drift),
    Spin(Spin),
    Hover(Hover),
}

impl Motion {
    /// Writes the time-pure part of this motion onto `state`. Spin is
    /// accumulated by the owning element instead.
    fn apply(&self, t: f32, state: &mut ElementState) {
        match self {
            Motion::Pulse(wave) => {
                let s = wave.sample(t);
                state.scale = [s, s, s];
            }
            Motion::Bob(wave) => {
                state.position[1] = wave.sample(t);
            }
            Motion::Ripple(ripple) => {
                let sample = ripple.sample(t);
                state.scale = sample.scale;
                state.opacity = sample.opacity;
            }
            Motion::Drift(drift) => {
                state.position[drift.axis.index()] = drift.sample(t);
            }
            Motion::Spin(_) => {}
            Motion::Hover(hover) => {
                let sample = hover.sample(t);
                state.position[1] += sample.lift;
                for i in 0..3 {
                    state.rotation[i] += sample.rotation[i];
                }
            }
        }
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(usize);

impl ElementId {
    pub fn index(self) -> usize {
        self.0
    }
}


#[derive(Debug, Clone)]
pub struct AnimatedElement {
    pub name: String,
    pub base: ElementState,
    pub motions: Vec<Motion>,
    spin: [f32; 3],
    current: ElementState,
}

impl AnimatedElement {
    pub fn new(name: impl Into<String>, base: ElementState, motions: Vec<Motion>) -> Self {
        Self {
            name: name.into(),
            base,
            motions,
            spin: [0.0; 3],
            current: base,
        }
    }

    pub fn current(&self) -> &ElementState {
        &self.current
    }

    /// Accumulated spin angle per axis.
    pub fn spin(&self) -> [f32; 3] {
        self.spin
    }

    fn tick(&mut self, clock: &Clock) {
        let t = clock.elapsed();
        for motion in &self.motions {
            if let Motion::Spin(s) = motion {
                let i = s.axis.index();
                self.spin[i] = s.advance(self.spin[i], clock.delta());
            }
        }

        let mut state = self.base;
        for motion in &self.motions {
            motion.apply(t, &mut state);
        }
        // one accumulator per axis, however many spins feed it
        for (angle, spin) in state.rotation.iter_mut().zip(self.spin) {
            *angle += spin;
        }
        self.current = state;
    }
}


/// Table of animated elements keyed by [`ElementId`], ticked in registration order.
#[derive(Debug, Clone, Default)]
pub struct Animator {
    elements: Vec<AnimatedElement>,
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        base: ElementState,
        motions: Vec<Motion>,
    ) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(AnimatedElement::new(name, base, motions));
        id
    }

    pub fn tick(&mut self, clock: &Clock) {
        for element in self.elements.iter_mut() {
            element.tick(clock);
        }
    }

    pub fn state(&self, id: ElementId) -> &ElementState {
        self.elements[id.0].current()
    }

    pub fn element(&self, id: ElementId) -> &AnimatedElement {
        &self.elements[id.0]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &AnimatedElement)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, element)| (ElementId(i), element))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const EPS: f32 = 1e-5;

    fn wind_ring() -> Ripple {
        Ripple {
            period: 2.5,
            rate: 1.1,
            opacity_start: 0.6,
            opacity_end: 0.0,
            axis_weights: [1.0, 1.0, 0.7],
        }
    }

    #[test]
    fn test_wave_stays_within_amplitude() {
        let wave = Wave::new(1.0, 0.03, 4.0);
        let mut t = 0.0;
        while t < 20.0 {
            let s = wave.sample(t);
            assert!(s >= 1.0 - 0.03 - EPS && s <= 1.0 + 0.03 + EPS);
            t += 0.013;
        }
    }

    #[test]
    fn test_pulse_peak() {
        let wave = Wave::new(1.0, 0.03, 4.0);
        assert!((wave.sample(PI / 8.0) - 1.03).abs() < 1e-6);
    }

    #[test]
    fn test_bob_writes_only_vertical_position() {
        let mut animator = Animator::new();
        let base = ElementState {
            position: [1.0, 0.55, -2.0],
            ..Default::default()
        };
        let id = animator.register("chest", base, vec![Motion::Bob(Wave::new(0.55, 0.05, 3.0))]);
        let mut clock = Clock::new();
        clock.advance(PI as f64 / 6.0);
        animator.tick(&clock);

        let state = animator.state(id);
        assert!((state.position[1] - 0.6).abs() < EPS);
        assert_eq!(state.position[0], 1.0);
        assert_eq!(state.position[2], -2.0);
        assert_eq!(state.scale, [1.0; 3]);
    }

    #[test]
    fn test_ripple_cycle_endpoints() {
        let ripple = wind_ring();
        let start = ripple.sample(0.0);
        assert_eq!(start.scale, [1.0, 1.0, 0.7]);
        assert!((start.opacity - 0.6).abs() < EPS);

        let late = ripple.sample(2.5 - 1e-4);
        assert!(late.opacity.abs() < 1e-3);

        // wraps back to the start of the cycle
        let wrapped = ripple.sample(5.0);
        assert!((wrapped.opacity - 0.6).abs() < EPS);
        assert!((wrapped.scale[0] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_ripple_midpoint() {
        let sample = wind_ring().sample(1.25);
        assert!((sample.opacity - 0.3).abs() < EPS);
        assert!((sample.scale[0] - (1.0 + 1.25 * 1.1)).abs() < EPS);
        assert!((sample.scale[2] - (1.0 + 1.25 * 1.1) * 0.7).abs() < EPS);
    }

    #[test]
    fn test_drift_wraps_by_range() {
        let drift = Drift {
            axis: Axis::Z,
            base: 0.7,
            rate: 1.5,
            range: 2.0,
            period: None,
        };
        assert!((drift.sample(3.0) - (0.7 + 0.5)).abs() < EPS);
        assert!((drift.sample(0.0) - 0.7).abs() < EPS);
    }

    #[test]
    fn test_drift_with_period_wraps_time_first() {
        let drift = Drift {
            axis: Axis::Z,
            base: 0.7,
            rate: 1.5,
            range: 2.0,
            period: Some(2.5),
        };
        // t' = 0.5, 0.5 * 1.5 = 0.75
        assert!((drift.sample(3.0) - 1.45).abs() < EPS);
    }

    #[test]
    fn test_spin_accumulates_frame_deltas() {
        let mut animator = Animator::new();
        let id = animator.register(
            "fireflies",
            ElementState::default(),
            vec![Motion::Spin(Spin { axis: Axis::Y, rate: 0.3 })],
        );
        let mut clock = Clock::new();
        let mut previous = 0.0;
        for delta in [0.016, 0.033, 0.0, 0.1, 0.016] {
            clock.advance(delta);
            animator.tick(&clock);
            let angle = animator.state(id).rotation[1];
            assert!(angle >= previous);
            assert_eq!(angle, previous + 0.3 * delta as f32);
            previous = angle;
        }
    }

    #[test]
    fn test_spin_adds_to_base_rotation() {
        let mut animator = Animator::new();
        let base = ElementState {
            rotation: [0.0, 0.0, 1.0],
            ..Default::default()
        };
        let id = animator.register(
            "particles",
            base,
            vec![Motion::Spin(Spin { axis: Axis::Z, rate: 2.0 })],
        );
        let mut clock = Clock::new();
        clock.advance(0.5);
        animator.tick(&clock);
        assert!((animator.state(id).rotation[2] - 2.0).abs() < EPS);
        assert!((animator.element(id).spin()[2] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_two_spins_on_one_axis_add_rates() {
        let mut animator = Animator::new();
        let spin = Motion::Spin(Spin { axis: Axis::Y, rate: 1.0 });
        let id = animator.register("twice", ElementState::default(), vec![spin, spin]);
        let mut clock = Clock::new();
        clock.advance(1.0);
        animator.tick(&clock);
        assert!((animator.state(id).rotation[1] - 2.0).abs() < EPS);

        clock.advance(0.5);
        animator.tick(&clock);
        assert!((animator.state(id).rotation[1] - 3.0).abs() < EPS);
        assert_eq!(animator.state(id).rotation[0], 0.0);
    }

    #[test]
    fn test_clock_ignores_negative_delta() {
        let mut clock = Clock::new();
        clock.advance(1.0);
        clock.advance(-0.5);
        clock.advance(f64::NAN);
        assert_eq!(clock.elapsed(), 1.0);
        assert_eq!(clock.delta(), 0.0);
    }

    #[test]
    fn test_hover_at_rest() {
        let hover = Hover {
            speed: 1.0,
            float_intensity: 1.8,
            rotation_intensity: 0.3,
        };
        let sample = hover.sample(0.0);
        assert_eq!(sample.lift, 0.0);
        assert!((sample.rotation[0] - 0.3 / 8.0).abs() < EPS);
        assert_eq!(sample.rotation[1], 0.0);
    }

    #[test]
    fn test_motions_apply_in_order() {
        let mut animator = Animator::new();
        let ring = animator.register(
            "ring",
            ElementState::default(),
            vec![
                Motion::Ripple(wind_ring()),
                Motion::Drift(Drift {
                    axis: Axis::Z,
                    base: 0.5,
                    rate: 1.3,
                    range: 3.25,
                    period: None,
                }),
            ],
        );
        let pig = animator.register("pig", ElementState::default(), vec![]);
        let mut clock = Clock::new();
        clock.advance(1.0);
        animator.tick(&clock);

        let state = animator.state(ring);
        assert!((state.position[2] - 1.8).abs() < EPS);
        assert!((state.opacity - lerp(0.6, 0.0, 0.4)).abs() < EPS);
        assert_eq!(*animator.state(pig), ElementState::default());
        assert_eq!(animator.len(), 2);
        assert_eq!(animator.iter().map(|(id, _)| id.index()).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_matrix_applies_scale_then_translation() {
        let state = ElementState {
            position: [1.0, 2.0, 3.0],
            scale: [2.0, 2.0, 2.0],
            ..Default::default()
        };
        let p = state.matrix() * vec4(1.0, 0.0, 0.0, 1.0);
        assert!((p.x - 3.0).abs() < EPS);
        assert!((p.y - 2.0).abs() < EPS);
        assert!((p.z - 3.0).abs() < EPS);
    }
}
