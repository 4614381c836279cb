//! Transmittance: optical-depth integration to the top of the atmosphere, and
//! lookups of the baked table for arbitrary segments and for sunlight.

use glam::{DVec2, DVec3};

use crate::executor::BakeExecutor;
use crate::geometry::{
    clamp_cosine, debug_assert_cosine, debug_assert_radius, distance_to_top_atmosphere_boundary,
    radius_at_distance,
};
use crate::model::{Atmosphere, DensityProfile, get_profile_density};
use crate::parameterization::{
    get_r_mu_from_transmittance_texture_uv, get_transmittance_texture_uv_from_r_mu,
};
use crate::texture::{Texture2D, TextureLayout};

/// Number of integration intervals along a ray to the top of the atmosphere.
const OPTICAL_LENGTH_SAMPLE_COUNT: u32 = 500;

/// Integral of `profile` along `(r, mu)` to the top of the atmosphere, using the
/// trapezoidal rule.
pub fn compute_optical_length_to_top_atmosphere_boundary(
    atmosphere: &Atmosphere,
    profile: &DensityProfile,
    r: f64,
    mu: f64,
) -> f64 {
    debug_assert_radius(atmosphere, r);
    debug_assert_cosine("mu", mu);
    let dx = distance_to_top_atmosphere_boundary(atmosphere, r, mu)
        / f64::from(OPTICAL_LENGTH_SAMPLE_COUNT);
    let mut optical_length = 0.0;
    for i in 0..=OPTICAL_LENGTH_SAMPLE_COUNT {
        let d_i = f64::from(i) * dx;
        let r_i = (d_i * d_i + 2.0 * r * mu * d_i + r * r).sqrt();
        let y_i = get_profile_density(profile, r_i - atmosphere.bottom_radius);
        let weight = if i == 0 || i == OPTICAL_LENGTH_SAMPLE_COUNT {
            0.5
        } else {
            1.0
        };
        optical_length += y_i * weight * dx;
    }
    optical_length
}

/// Transmittance from `(r, mu)` to the top of the atmosphere, per RGB channel.
pub fn compute_transmittance_to_top_atmosphere_boundary(
    atmosphere: &Atmosphere,
    r: f64,
    mu: f64,
) -> DVec3 {
    let rayleigh = atmosphere.rayleigh_scattering
        * compute_optical_length_to_top_atmosphere_boundary(
            atmosphere,
            &atmosphere.rayleigh_density,
            r,
            mu,
        );
    let mie = atmosphere.mie_extinction
        * compute_optical_length_to_top_atmosphere_boundary(
            atmosphere,
            &atmosphere.mie_density,
            r,
            mu,
        );
    let absorption = atmosphere.absorption_extinction
        * compute_optical_length_to_top_atmosphere_boundary(
            atmosphere,
            &atmosphere.absorption_density,
            r,
            mu,
        );
    (-(rayleigh + mie + absorption)).exp()
}

/// Transmittance stored at texel `(x, y)` of the transmittance table.
pub fn compute_transmittance_texel(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    x: usize,
    y: usize,
) -> DVec3 {
    let uv = DVec2::new(
        (x as f64 + 0.5) / f64::from(layout.transmittance_width),
        (y as f64 + 0.5) / f64::from(layout.transmittance_height),
    );
    let (r, mu) = get_r_mu_from_transmittance_texture_uv(atmosphere, layout, uv);
    compute_transmittance_to_top_atmosphere_boundary(atmosphere, r, mu)
}

/// Bake the transmittance table, one row per job.
pub fn generate_transmittance_texture(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    executor: &BakeExecutor,
) -> Texture2D {
    let mut texture = layout.transmittance_texture();
    executor.for_each("transmittance", texture.rows_mut(), |mut row| {
        for x in 0..row.width {
            let value = compute_transmittance_texel(atmosphere, layout, x, row.index);
            row.set_rgb(x, 0, value);
        }
    });
    texture
}

/// Bilinear lookup of the baked transmittance from `(r, mu)` to the top of the atmosphere.
pub fn get_transmittance_to_top_atmosphere_boundary(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    r: f64,
    mu: f64,
) -> DVec3 {
    let uv = get_transmittance_texture_uv_from_r_mu(atmosphere, layout, r, mu);
    transmittance_texture.sample_rgb(uv)
}

/// Transmittance along `(r, mu)` over the segment `[0, d]`.
///
/// Derived from two top-of-atmosphere lookups; rays hitting the ground use the
/// reversed segment so both lookups stay inside the table's domain.
pub fn get_transmittance(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    r: f64,
    mu: f64,
    d: f64,
    ray_r_mu_intersects_ground: bool,
) -> DVec3 {
    debug_assert_radius(atmosphere, r);
    debug_assert_cosine("mu", mu);
    debug_assert!(d >= 0.0, "negative segment length {d}");

    let r_d = radius_at_distance(atmosphere, r, mu, d);
    let mu_d = clamp_cosine((r * mu + d) / r_d);
    let lookup = |r, mu| {
        get_transmittance_to_top_atmosphere_boundary(atmosphere, layout, transmittance_texture, r, mu)
    };
    let (numerator, denominator) = if ray_r_mu_intersects_ground {
        (lookup(r_d, -mu_d), lookup(r, -mu))
    } else {
        (lookup(r, mu), lookup(r_d, mu_d))
    };
    (numerator / denominator.max(DVec3::splat(f64::MIN_POSITIVE))).min(DVec3::ONE)
}

/// Transmittance of sunlight reaching altitude `r` with sun zenith cosine `mu_s`,
/// attenuated by the fraction of the sun disc above the horizon.
pub fn get_transmittance_to_sun(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    r: f64,
    mu_s: f64,
) -> DVec3 {
    let sin_theta_h = atmosphere.bottom_radius / r;
    let cos_theta_h = -(1.0 - sin_theta_h * sin_theta_h).max(0.0).sqrt();
    let visible = smoothstep(
        -sin_theta_h * atmosphere.sun_angular_radius,
        sin_theta_h * atmosphere.sun_angular_radius,
        mu_s - cos_theta_h,
    );
    get_transmittance_to_top_atmosphere_boundary(atmosphere, layout, transmittance_texture, r, mu_s)
        * visible
}

#[inline]
fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
