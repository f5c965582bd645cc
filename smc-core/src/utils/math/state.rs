//! Module state values and heading optimization.
//!
//! Headings are canonicalised to the half-open range [-π, π).
use core::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

const TAU: f32 = 2.0 * PI;

/// Wrap an angle (rad) into [-π, π).
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle - TAU * libm::floorf((angle + PI) / TAU);
    // floorf can leave the result a rounding step outside the range
    if wrapped >= PI {
        wrapped - TAU
    } else if wrapped < -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation (rad) that takes `from` onto `to`.
pub fn shortest_angular_distance(
    from: f32,
    to: f32,
) -> f32 {
    wrap_angle(to - from)
}

/// Desired or measured state of one module.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    /// Wheel speed (m/s), signed
    pub speed: f32,
    /// Wheel heading (rad) in [-π, π)
    pub angle: f32,
}

impl ModuleState {
    /// Build a state, wrapping `angle` into [-π, π).
    pub fn new(
        speed: f32,
        angle: f32,
    ) -> Self {
        Self {
            speed,
            angle: wrap_angle(angle),
        }
    }

    /// Pick the equivalent command that keeps the turning axis within π/2 of
    /// `current_angle`.
    ///
    /// When the requested heading is more than a quarter turn away, the wheel is
    /// pointed the opposite way and driven backwards instead. The contact-patch
    /// velocity `speed·[cos θ, sin θ]` is unchanged.
    pub fn optimize(
        self,
        current_angle: f32,
    ) -> Self {
        let delta = shortest_angular_distance(current_angle, self.angle);
        if libm::fabsf(delta) > FRAC_PI_2 {
            Self::new(-self.speed, self.angle + PI)
        } else {
            Self::new(self.speed, self.angle)
        }
    }

    /// Contact-patch velocity `(vx, vy)` (m/s).
    pub fn velocity_vector(&self) -> (f32, f32) {
        (
            self.speed * libm::cosf(self.angle),
            self.speed * libm::sinf(self.angle),
        )
    }
}

/// Integrated drive distance and heading of one module.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModulePosition {
    /// Distance driven since the encoder was last zeroed (m)
    pub distance: f32,
    /// Wheel heading (rad) in [-π, π)
    pub angle: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn wrap_is_half_open() {
        assert!((wrap_angle(PI) + PI).abs() < EPS);
        assert!((wrap_angle(-PI) + PI).abs() < EPS);
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert!((wrap_angle(-5.0 * PI / 2.0) + PI / 2.0).abs() < EPS);
        assert_eq!(wrap_angle(0.0), 0.0);
        for i in -200..200 {
            let w = wrap_angle(i as f32 * 0.173);
            assert!(w >= -PI && w < PI, "{}", w);
        }
    }

    #[test]
    fn shortest_distance_crosses_boundary() {
        let d = shortest_angular_distance(-PI + 0.01, PI - 0.01);
        assert!((d + 0.02).abs() < EPS);
    }

    #[test]
    fn optimize_keeps_nearby_heading() {
        let s = ModuleState::new(2.0, 3.0).optimize(-3.0);
        assert!((s.angle - 3.0).abs() < EPS);
        assert_eq!(s.speed, 2.0);
    }

    #[test]
    fn optimize_flips_far_heading() {
        let s = ModuleState::new(2.0, FRAC_PI_2 + 0.1).optimize(0.0);
        assert_eq!(s.speed, -2.0);
        assert!((s.angle - (-FRAC_PI_2 + 0.1)).abs() < EPS);
    }

    #[test]
    fn optimize_bound_and_equivalence() {
        for c in -31..32 {
            let current = c as f32 * 0.1;
            for d in -31..32 {
                let desired = ModuleState::new(1.5, d as f32 * 0.1);
                let opt = desired.optimize(current);
                let travel = shortest_angular_distance(current, opt.angle);
                assert!(travel.abs() <= FRAC_PI_2 + EPS, "{} -> {:?}", current, opt);

                let (ax, ay) = desired.velocity_vector();
                let (bx, by) = opt.velocity_vector();
                assert!((ax - bx).abs() < 1e-3 && (ay - by).abs() < 1e-3);
            }
        }
    }
}
