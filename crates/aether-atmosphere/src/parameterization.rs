//! Mappings between texture coordinates and the physical ray parameters
//! `(r, mu, mu_s, nu)` indexing the baked tables.
//!
//! The non-linear maps spend more texels near the horizon, where transmittance
//! and in-scattering change fastest.

use glam::{DVec2, DVec3, DVec4};

use crate::geometry::{
    self, clamp_cosine, debug_assert_cosine, debug_assert_radius, distance_to_horizon,
    distance_to_top_atmosphere_boundary, safe_sqrt,
};
use crate::model::Atmosphere;
use crate::texture::TextureLayout;

/// A point of the 4D scattering domain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScatteringCoords {
    /// Distance from the planet center.
    pub r: f64,
    /// Cosine of the view zenith angle.
    pub mu: f64,
    /// Cosine of the sun zenith angle.
    pub mu_s: f64,
    /// Cosine of the angle between view and sun directions.
    pub nu: f64,
    /// Whether the view ray `(r, mu)` hits the ground.
    pub ray_r_mu_intersects_ground: bool,
}

impl ScatteringCoords {
    /// Coordinates of a ray, deriving the ground flag from `(r, mu)`.
    pub fn new(atmosphere: &Atmosphere, r: f64, mu: f64, mu_s: f64, nu: f64) -> Self {
        Self {
            r,
            mu,
            mu_s,
            nu,
            ray_r_mu_intersects_ground: geometry::ray_intersects_ground(atmosphere, r, mu),
        }
    }
}

/// Map `x` in `[0, 1]` to a texture coordinate hitting the first and last texel centres.
#[inline]
pub fn get_texture_coord_from_unit_range(x: f64, texture_size: u32) -> f64 {
    let n = f64::from(texture_size);
    0.5 / n + x * (1.0 - 1.0 / n)
}

/// Inverse of [`get_texture_coord_from_unit_range`].
#[inline]
pub fn get_unit_range_from_texture_coord(u: f64, texture_size: u32) -> f64 {
    let n = f64::from(texture_size);
    (u - 0.5 / n) / (1.0 - 1.0 / n)
}

// --- Transmittance ---

/// Texture coordinates of the transmittance table for the ray `(r, mu)`.
pub fn get_transmittance_texture_uv_from_r_mu(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    r: f64,
    mu: f64,
) -> DVec2 {
    debug_assert_radius(atmosphere, r);
    debug_assert_cosine("mu", mu);
    let h = atmosphere.horizon_distance();
    let rho = distance_to_horizon(atmosphere, r);
    // d ranges from Rt - r at the zenith to rho + H at the horizon.
    let d = distance_to_top_atmosphere_boundary(atmosphere, r, mu);
    let d_min = atmosphere.top_radius - r;
    let d_max = rho + h;
    let x_mu = (d - d_min) / (d_max - d_min);
    let x_r = rho / h;
    DVec2::new(
        get_texture_coord_from_unit_range(x_mu, layout.transmittance_width),
        get_texture_coord_from_unit_range(x_r, layout.transmittance_height),
    )
}

/// Recover `(r, mu)` from transmittance texture coordinates.
pub fn get_r_mu_from_transmittance_texture_uv(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    uv: DVec2,
) -> (f64, f64) {
    let x_mu = get_unit_range_from_texture_coord(uv.x, layout.transmittance_width);
    let x_r = get_unit_range_from_texture_coord(uv.y, layout.transmittance_height);
    let h = atmosphere.horizon_distance();
    let rho = h * x_r;
    let r = (rho * rho + atmosphere.bottom_radius * atmosphere.bottom_radius).sqrt();
    let d_min = atmosphere.top_radius - r;
    let d_max = rho + h;
    let d = d_min + x_mu * (d_max - d_min);
    let mu = if d == 0.0 {
        1.0
    } else {
        (h * h - rho * rho - d * d) / (2.0 * r * d)
    };
    (r, clamp_cosine(mu))
}

// --- Scattering ---

/// Normalized `[0, 1]` coordinate of the zenith-angle parameterization of `mu_s`:
/// 0 at `mu_s_min`, 1 at the zenith.
fn mu_s_to_unit_range(atmosphere: &Atmosphere, mu_s: f64) -> f64 {
    let (d_min, d_max) = mu_s_distance_bounds(atmosphere);
    let d = distance_to_top_atmosphere_boundary(atmosphere, atmosphere.bottom_radius, mu_s);
    let a = (d - d_min) / (d_max - d_min);
    let big_a = mu_s_min_unit_distance(atmosphere);
    (1.0 - a / big_a).max(0.0) / (1.0 + a)
}

fn unit_range_to_mu_s(atmosphere: &Atmosphere, x: f64) -> f64 {
    let (d_min, d_max) = mu_s_distance_bounds(atmosphere);
    let big_a = mu_s_min_unit_distance(atmosphere);
    let a = (big_a - x * big_a) / (1.0 + x * big_a);
    let d = d_min + a.min(big_a) * (d_max - d_min);
    if d == 0.0 {
        1.0
    } else {
        let h = atmosphere.horizon_distance();
        clamp_cosine((h * h - d * d) / (2.0 * atmosphere.bottom_radius * d))
    }
}

/// Distance to the top boundary from the ground at the zenith and at the horizon.
#[inline]
fn mu_s_distance_bounds(atmosphere: &Atmosphere) -> (f64, f64) {
    (
        atmosphere.top_radius - atmosphere.bottom_radius,
        atmosphere.horizon_distance(),
    )
}

/// Normalized distance to the top boundary from the ground for `mu_s_min`.
#[inline]
fn mu_s_min_unit_distance(atmosphere: &Atmosphere) -> f64 {
    let (d_min, d_max) = mu_s_distance_bounds(atmosphere);
    let d = distance_to_top_atmosphere_boundary(
        atmosphere,
        atmosphere.bottom_radius,
        atmosphere.mu_s_min,
    );
    (d - d_min) / (d_max - d_min)
}

/// Texture coordinates `(u_nu, u_mu_s, u_mu, u_r)` of the 4D scattering table.
///
/// `u_mu < 0.5` encodes rays hitting the ground, `u_mu >= 0.5` rays reaching space.
pub fn get_scattering_texture_uvwz_from_r_mu_mu_s_nu(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    coords: &ScatteringCoords,
) -> DVec4 {
    let ScatteringCoords {
        r,
        mu,
        mu_s,
        nu,
        ray_r_mu_intersects_ground,
    } = *coords;
    debug_assert_radius(atmosphere, r);
    debug_assert_cosine("mu", mu);
    debug_assert_cosine("mu_s", mu_s);
    debug_assert_cosine("nu", nu);

    let h = atmosphere.horizon_distance();
    let rho = distance_to_horizon(atmosphere, r);
    let u_r = get_texture_coord_from_unit_range(rho / h, layout.scattering_r_size);

    let half_mu = layout.scattering_mu_size / 2;
    let r_mu = r * mu;
    // Discriminant of the ray-ground intersection.
    let discriminant = r_mu * r_mu - r * r + atmosphere.bottom_radius * atmosphere.bottom_radius;
    let u_mu = if ray_r_mu_intersects_ground {
        // Distance to the ground, between r - Rg (mu = -1) and rho (horizon).
        let d = -r_mu - safe_sqrt(discriminant);
        let d_min = r - atmosphere.bottom_radius;
        let d_max = rho;
        let x = if d_max == d_min {
            0.0
        } else {
            (d - d_min) / (d_max - d_min)
        };
        0.5 - 0.5 * get_texture_coord_from_unit_range(x, half_mu)
    } else {
        // Distance to the top boundary, between Rt - r (zenith) and rho + H (horizon).
        let d = -r_mu + safe_sqrt(discriminant + h * h);
        let d_min = atmosphere.top_radius - r;
        let d_max = rho + h;
        0.5 + 0.5 * get_texture_coord_from_unit_range((d - d_min) / (d_max - d_min), half_mu)
    };

    let u_mu_s = get_texture_coord_from_unit_range(
        mu_s_to_unit_range(atmosphere, mu_s),
        layout.scattering_mu_s_size,
    );
    let u_nu = (nu + 1.0) / 2.0;
    DVec4::new(u_nu, u_mu_s, u_mu, u_r)
}

/// Recover `(r, mu, mu_s, nu)` and the ground flag from scattering texture coordinates.
pub fn get_r_mu_mu_s_nu_from_scattering_texture_uvwz(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    uvwz: DVec4,
) -> ScatteringCoords {
    let h = atmosphere.horizon_distance();
    let rho = h * get_unit_range_from_texture_coord(uvwz.w, layout.scattering_r_size);
    let r = (rho * rho + atmosphere.bottom_radius * atmosphere.bottom_radius).sqrt();

    let half_mu = layout.scattering_mu_size / 2;
    let ray_r_mu_intersects_ground = uvwz.z < 0.5;
    let mu = if ray_r_mu_intersects_ground {
        let d_min = r - atmosphere.bottom_radius;
        let d_max = rho;
        let d = d_min
            + (d_max - d_min) * get_unit_range_from_texture_coord(1.0 - 2.0 * uvwz.z, half_mu);
        if d == 0.0 {
            -1.0
        } else {
            clamp_cosine(-(rho * rho + d * d) / (2.0 * r * d))
        }
    } else {
        let d_min = atmosphere.top_radius - r;
        let d_max = rho + h;
        let d = d_min
            + (d_max - d_min) * get_unit_range_from_texture_coord(2.0 * uvwz.z - 1.0, half_mu);
        if d == 0.0 {
            1.0
        } else {
            clamp_cosine((h * h - rho * rho - d * d) / (2.0 * r * d))
        }
    };

    let x_mu_s = get_unit_range_from_texture_coord(uvwz.y, layout.scattering_mu_s_size);
    let mu_s = unit_range_to_mu_s(atmosphere, x_mu_s);
    let nu = clamp_cosine(uvwz.x * 2.0 - 1.0);

    ScatteringCoords {
        r,
        mu,
        mu_s,
        nu,
        ray_r_mu_intersects_ground,
    }
}

/// Decode the ray parameters of a texel of the packed 3D scattering texture.
///
/// `frag_coord` is in texel units with texel centres at `i + 0.5`. `nu` is
/// clamped to the range reachable from the decoded `mu` and `mu_s`.
pub fn get_r_mu_mu_s_nu_from_scattering_texture_fragcoord(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    frag_coord: DVec3,
) -> ScatteringCoords {
    let mu_s_size = f64::from(layout.scattering_mu_s_size);
    let frag_coord_nu = (frag_coord.x / mu_s_size).floor();
    let frag_coord_mu_s = frag_coord.x % mu_s_size;
    let uvwz = DVec4::new(
        frag_coord_nu / f64::from(layout.scattering_nu_size - 1),
        frag_coord_mu_s / mu_s_size,
        frag_coord.y / f64::from(layout.scattering_mu_size),
        frag_coord.z / f64::from(layout.scattering_r_size),
    );
    let mut coords = get_r_mu_mu_s_nu_from_scattering_texture_uvwz(atmosphere, layout, uvwz);
    let ScatteringCoords { mu, mu_s, .. } = coords;
    let spread = safe_sqrt((1.0 - mu * mu) * (1.0 - mu_s * mu_s));
    coords.nu = coords.nu.clamp(mu * mu_s - spread, mu * mu_s + spread);
    coords
}

/// Ray parameters at the centre of scattering texel `(x, y, z)`.
pub fn scattering_texel_coords(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    x: usize,
    y: usize,
    z: usize,
) -> ScatteringCoords {
    let frag_coord = DVec3::new(x as f64 + 0.5, y as f64 + 0.5, z as f64 + 0.5);
    get_r_mu_mu_s_nu_from_scattering_texture_fragcoord(atmosphere, layout, frag_coord)
}

// --- Irradiance ---

/// Texture coordinates of the irradiance table for altitude `r` and sun cosine `mu_s`.
pub fn get_irradiance_texture_uv_from_r_mu_s(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    r: f64,
    mu_s: f64,
) -> DVec2 {
    debug_assert_radius(atmosphere, r);
    debug_assert_cosine("mu_s", mu_s);
    let x_r = (r - atmosphere.bottom_radius) / (atmosphere.top_radius - atmosphere.bottom_radius);
    let x_mu_s = mu_s * 0.5 + 0.5;
    DVec2::new(
        get_texture_coord_from_unit_range(x_mu_s, layout.irradiance_width),
        get_texture_coord_from_unit_range(x_r, layout.irradiance_height),
    )
}

/// Recover `(r, mu_s)` from irradiance texture coordinates.
pub fn get_r_mu_s_from_irradiance_texture_uv(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    uv: DVec2,
) -> (f64, f64) {
    let x_mu_s = get_unit_range_from_texture_coord(uv.x, layout.irradiance_width);
    let x_r = get_unit_range_from_texture_coord(uv.y, layout.irradiance_height);
    let r = atmosphere.bottom_radius + x_r * (atmosphere.top_radius - atmosphere.bottom_radius);
    (r, clamp_cosine(2.0 * x_mu_s - 1.0))
}
