//! Ray geometry inside the spherical shell between the ground and the top of
//! the atmosphere.
//!
//! A ray is described by the distance `r` of its origin to the planet center and
//! the cosine `mu` of its zenith angle.

use crate::model::Atmosphere;

/// Absolute slack allowed on radii by the debug domain checks, absorbing
/// rounding from `sqrt(rho^2 + Rg^2)` style reconstructions.
const RADIUS_SLACK: f64 = 1e-6;
const COSINE_SLACK: f64 = 1e-9;

#[inline]
pub(crate) fn debug_assert_radius(atmosphere: &Atmosphere, r: f64) {
    debug_assert!(
        r >= atmosphere.bottom_radius - RADIUS_SLACK && r <= atmosphere.top_radius + RADIUS_SLACK,
        "radius {r} outside [{}, {}]",
        atmosphere.bottom_radius,
        atmosphere.top_radius
    );
}

#[inline]
pub(crate) fn debug_assert_cosine(name: &str, cosine: f64) {
    debug_assert!(
        (-1.0 - COSINE_SLACK..=1.0 + COSINE_SLACK).contains(&cosine),
        "{name} = {cosine} is not a cosine"
    );
}

/// Square root with the argument floored at zero.
#[inline]
pub fn safe_sqrt(x: f64) -> f64 {
    x.max(0.0).sqrt()
}

/// Clamp a cosine to `[-1, 1]`.
#[inline]
pub fn clamp_cosine(mu: f64) -> f64 {
    mu.clamp(-1.0, 1.0)
}

/// Clamp a radius to `[bottom_radius, top_radius]`.
#[inline]
pub fn clamp_radius(atmosphere: &Atmosphere, r: f64) -> f64 {
    r.clamp(atmosphere.bottom_radius, atmosphere.top_radius)
}

/// Distance from the horizon point to the origin of a ray at radius `r`.
#[inline]
pub fn distance_to_horizon(atmosphere: &Atmosphere, r: f64) -> f64 {
    safe_sqrt(r * r - atmosphere.bottom_radius * atmosphere.bottom_radius)
}

/// Cosine of the zenith angle of the horizon seen from radius `r`.
pub fn mu_horizon(atmosphere: &Atmosphere, r: f64) -> f64 {
    -distance_to_horizon(atmosphere, r) / r
}

/// Whether the ray `(r, mu)` hits the ground. A horizontal ray (`mu == 0`) never does.
pub fn ray_intersects_ground(atmosphere: &Atmosphere, r: f64, mu: f64) -> bool {
    debug_assert!(r >= atmosphere.bottom_radius - RADIUS_SLACK);
    debug_assert_cosine("mu", mu);
    let rg = atmosphere.bottom_radius;
    mu < 0.0 && r * r * (mu * mu - 1.0) + rg * rg >= 0.0
}

/// Distance along `(r, mu)` to the top atmosphere boundary.
pub fn distance_to_top_atmosphere_boundary(atmosphere: &Atmosphere, r: f64, mu: f64) -> f64 {
    debug_assert!(r <= atmosphere.top_radius + RADIUS_SLACK);
    debug_assert_cosine("mu", mu);
    let rt = atmosphere.top_radius;
    let discriminant = r * r * (mu * mu - 1.0) + rt * rt;
    (-r * mu + safe_sqrt(discriminant)).max(0.0)
}

/// Distance along `(r, mu)` to the ground. Only meaningful when the ray hits it.
pub fn distance_to_bottom_atmosphere_boundary(atmosphere: &Atmosphere, r: f64, mu: f64) -> f64 {
    debug_assert!(r >= atmosphere.bottom_radius - RADIUS_SLACK);
    debug_assert_cosine("mu", mu);
    let rg = atmosphere.bottom_radius;
    let discriminant = r * r * (mu * mu - 1.0) + rg * rg;
    (-r * mu - safe_sqrt(discriminant)).max(0.0)
}

/// Distance to the ground if the ray hits it, to the top boundary otherwise.
pub fn distance_to_nearest_atmosphere_boundary(
    atmosphere: &Atmosphere,
    r: f64,
    mu: f64,
    ray_r_mu_intersects_ground: bool,
) -> f64 {
    if ray_r_mu_intersects_ground {
        distance_to_bottom_atmosphere_boundary(atmosphere, r, mu)
    } else {
        distance_to_top_atmosphere_boundary(atmosphere, r, mu)
    }
}

/// Radius of the point at distance `d` along `(r, mu)`, clamped to the shell.
#[inline]
pub(crate) fn radius_at_distance(atmosphere: &Atmosphere, r: f64, mu: f64, d: f64) -> f64 {
    clamp_radius(atmosphere, (d * d + 2.0 * r * mu * d + r * r).sqrt())
}
