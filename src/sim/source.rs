//! A single metaball: a moving circular influence emitter.

use glam::Vec2;
use rand::Rng;

use crate::consts::*;

/// One metaball.
///
/// Coordinates are viewport pixels with the origin at the bottom-left corner,
/// the same space the fragment stage sees after flipping `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Source {
    pub center: Vec2,
    /// Displacement applied each tick
    pub velocity: Vec2,
    /// Influence radius used in the field equation
    pub radius: f32,
}

impl Source {
    pub const fn new(center: Vec2, velocity: Vec2, radius: f32) -> Self {
        Self {
            center,
            velocity,
            radius,
        }
    }

    /// Spawn a source with a random radius, position and velocity.
    ///
    /// Placement uses the sampled radius rather than the influence radius, so
    /// the center starts inside `[radius, dimension - radius]` whenever the
    /// viewport is wide enough to hold the sampled disc.
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, width: f32, height: f32) -> Self {
        let sampled = rng.random::<f32>() * SAMPLED_RADIUS_SPAN + SAMPLED_RADIUS_MIN;
        let center = Vec2::new(
            rng.random::<f32>() * (width - 2.0 * sampled) + sampled,
            rng.random::<f32>() * (height - 2.0 * sampled) + sampled,
        );
        let velocity = Vec2::new(
            (rng.random::<f32>() - 0.5) * SPEED_SPREAD,
            (rng.random::<f32>() - 0.5) * SPEED_SPREAD,
        );
        Self::new(center, velocity, sampled * INFLUENCE_SCALE)
    }

    /// Move one tick, then reverse any velocity component whose axis left
    /// `[radius, bound - radius]`. The position is left where it landed.
    #[inline]
    pub fn step(&mut self, bounds: Vec2) {
        self.center += self.velocity;

        if self.center.x < self.radius || self.center.x > bounds.x - self.radius {
            self.velocity.x = -self.velocity.x;
        }
        if self.center.y < self.radius || self.center.y > bounds.y - self.radius {
            self.velocity.y = -self.velocity.y;
        }
    }
}
