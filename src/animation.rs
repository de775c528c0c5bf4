//! Spring and timed value transitions sampled against an explicit clock.
//!
//! Transitions are evaluated in closed form, so sampling the same instant twice
//! yields the same value and frames can be skipped or repeated freely.

use std::time::Duration;

/// Easing curves for timed transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    EaseOutCubic,
    EaseInOutCubic,
}

impl Easing {
    pub fn transform(self, fraction: f64) -> f64 {
        let t = fraction.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
        }
    }
}

/// Fixed-duration transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingSpec {
    pub duration_millis: u64,
    pub easing: Easing,
}

impl TimingSpec {
    pub fn new(duration_millis: u64, easing: Easing) -> Self {
        Self {
            duration_millis,
            easing,
        }
    }

    pub fn linear(duration_millis: u64) -> Self {
        Self::new(duration_millis, Easing::Linear)
    }
}

/// Damped harmonic oscillator parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringSpec {
    /// 1.0 = critically damped, < 1.0 = bouncy, > 1.0 = sluggish.
    pub damping_ratio: f64,
    pub stiffness: f64,
    pub velocity_threshold: f64,
    pub position_threshold: f64,
}

impl SpringSpec {
    /// Critically damped, settles in roughly 220 ms.
    pub fn press() -> Self {
        Self {
            damping_ratio: 1.0,
            stiffness: 900.0,
            velocity_threshold: 0.01,
            position_threshold: 0.001,
        }
    }

    pub fn bouncy() -> Self {
        Self {
            damping_ratio: 0.5,
            ..Self::press()
        }
    }

    fn angular_frequency(&self) -> f64 {
        self.stiffness.max(0.0).sqrt()
    }

    /// Displacement from the target and its velocity `t` seconds after release
    /// from displacement `x0` with velocity `v0`.
    fn evaluate(&self, x0: f64, v0: f64, t: f64) -> (f64, f64) {
        let omega = self.angular_frequency();
        let zeta = self.damping_ratio.max(0.0);
        if omega == 0.0 {
            return (x0 + v0 * t, v0);
        }

        if (zeta - 1.0).abs() < 1e-6 {
            let c = v0 + omega * x0;
            let decay = (-omega * t).exp();
            let x = (x0 + c * t) * decay;
            let v = c * decay - omega * x;
            (x, v)
        } else if zeta < 1.0 {
            let omega_d = omega * (1.0 - zeta * zeta).sqrt();
            let b = (v0 + zeta * omega * x0) / omega_d;
            let decay = (-zeta * omega * t).exp();
            let (sin, cos) = (omega_d * t).sin_cos();
            let x = decay * (x0 * cos + b * sin);
            let v = decay * (-zeta * omega * (x0 * cos + b * sin) + omega_d * (b * cos - x0 * sin));
            (x, v)
        } else {
            let root = (zeta * zeta - 1.0).sqrt();
            let r1 = -omega * (zeta - root);
            let r2 = -omega * (zeta + root);
            let c2 = (v0 - r1 * x0) / (r2 - r1);
            let c1 = x0 - c2;
            let (e1, e2) = ((r1 * t).exp(), (r2 * t).exp());
            (c1 * e1 + c2 * e2, c1 * r1 * e1 + c2 * r2 * e2)
        }
    }
}

impl Default for SpringSpec {
    fn default() -> Self {
        Self::press()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Snap,
    Spring(SpringSpec),
    Timed(TimingSpec),
}

/// A scalar that moves toward a target under a [`Transition`].
#[derive(Debug, Clone)]
pub struct AnimatedValue {
    from: f64,
    target: f64,
    initial_velocity: f64,
    started_at: Duration,
    transition: Transition,
}

impl AnimatedValue {
    pub fn new(value: f64) -> Self {
        Self {
            from: value,
            target: value,
            initial_velocity: 0.0,
            started_at: Duration::ZERO,
            transition: Transition::Snap,
        }
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Starts moving toward `target` from wherever the value is at `now`,
    /// keeping its current velocity.
    pub fn animate_to(&mut self, target: f64, transition: Transition, now: Duration) {
        if target == self.target && transition == self.transition {
            return;
        }
        let (value, velocity) = self.sample_with_velocity(now);
        self.from = value;
        self.initial_velocity = velocity;
        self.target = target;
        self.started_at = now;
        self.transition = transition;
    }

    pub fn snap_to(&mut self, value: f64) {
        *self = Self::new(value);
    }

    pub fn sample(&self, now: Duration) -> f64 {
        self.sample_with_velocity(now).0
    }

    pub fn is_animating(&self, now: Duration) -> bool {
        self.sample(now) != self.target
    }

    fn sample_with_velocity(&self, now: Duration) -> (f64, f64) {
        let elapsed = now.saturating_sub(self.started_at);
        match self.transition {
            Transition::Snap => (self.target, 0.0),
            Transition::Timed(spec) => {
                let duration = Duration::from_millis(spec.duration_millis);
                if elapsed >= duration {
                    return (self.target, 0.0);
                }
                let fraction = elapsed.as_secs_f64() / duration.as_secs_f64();
                let progress = spec.easing.transform(fraction);
                (self.from + (self.target - self.from) * progress, 0.0)
            }
            Transition::Spring(spec) => {
                let (x, v) =
                    spec.evaluate(self.from - self.target, self.initial_velocity, elapsed.as_secs_f64());
                if x.abs() < spec.position_threshold && v.abs() < spec.velocity_threshold {
                    (self.target, 0.0)
                } else {
                    (self.target + x, v)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn spring_starts_at_origin_and_settles() {
        let mut depth = AnimatedValue::new(0.0);
        depth.animate_to(8.0, Transition::Spring(SpringSpec::press()), ms(100));
        assert_approx_eq!(depth.sample(ms(100)), 0.0);
        assert!(depth.sample(ms(150)) > 0.0);
        assert_eq!(depth.sample(ms(2000)), 8.0);
        assert!(!depth.is_animating(ms(2000)));
    }

    #[test]
    fn critically_damped_spring_settles_near_240ms() {
        let mut depth = AnimatedValue::new(0.0);
        depth.animate_to(8.0, Transition::Spring(SpringSpec::press()), Duration::ZERO);
        assert!((depth.sample(ms(240)) - 8.0).abs() < 0.1);
        for step in 0..100 {
            assert!(depth.sample(ms(step * 5)) <= 8.0 + 1e-9);
        }
    }

    #[test]
    fn bouncy_spring_overshoots() {
        let mut value = AnimatedValue::new(0.0);
        value.animate_to(1.0, Transition::Spring(SpringSpec::bouncy()), Duration::ZERO);
        let peak = (0..200)
            .map(|step| value.sample(ms(step * 2)))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn retarget_is_continuous() {
        let mut depth = AnimatedValue::new(0.0);
        depth.animate_to(8.0, Transition::Spring(SpringSpec::press()), Duration::ZERO);
        let before = depth.sample(ms(60));
        depth.animate_to(0.0, Transition::Spring(SpringSpec::press()), ms(60));
        assert_approx_eq!(depth.sample(ms(60)), before);
        assert_eq!(depth.sample(ms(3000)), 0.0);
    }

    #[test]
    fn timed_linear_midpoint() {
        let mut opacity = AnimatedValue::new(1.0);
        opacity.animate_to(0.0, Transition::Timed(TimingSpec::linear(200)), ms(1000));
        assert_approx_eq!(opacity.sample(ms(1100)), 0.5);
        assert_eq!(opacity.sample(ms(1200)), 0.0);
        assert_eq!(opacity.sample(ms(500)), 1.0);
    }

    #[test]
    fn sampling_is_repeatable() {
        let mut value = AnimatedValue::new(2.0);
        value.animate_to(-3.0, Transition::Spring(SpringSpec::bouncy()), ms(10));
        assert_eq!(value.sample(ms(77)), value.sample(ms(77)));
    }

    #[test]
    fn easing_endpoints() {
        for easing in [Easing::Linear, Easing::EaseOutCubic, Easing::EaseInOutCubic] {
            assert_approx_eq!(easing.transform(0.0), 0.0);
            assert_approx_eq!(easing.transform(1.0), 1.0);
        }
    }
}
