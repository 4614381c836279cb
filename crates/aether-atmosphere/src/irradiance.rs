//! Ground irradiance: the direct sun term and the indirect sky term of each
//! scattering order.

use std::f64::consts::PI;

use glam::{DVec2, DVec3};

use crate::executor::BakeExecutor;
use crate::geometry::{debug_assert_cosine, debug_assert_radius};
use crate::model::Atmosphere;
use crate::parameterization::{
    ScatteringCoords, get_irradiance_texture_uv_from_r_mu_s, get_r_mu_s_from_irradiance_texture_uv,
};
use crate::scattering::ScatteringSource;
use crate::texture::{Texture2D, TextureLayout};
use crate::transmittance::get_transmittance_to_top_atmosphere_boundary;

/// Angular resolution of the hemisphere integral: `SAMPLE_COUNT / 2` zenith
/// steps by `2 * SAMPLE_COUNT` azimuth steps.
const INDIRECT_IRRADIANCE_SAMPLE_COUNT: u32 = 32;

/// Irradiance received from the sun disc by a horizontal surface at `r`.
///
/// The cosine factor is averaged over the visible part of the disc near the horizon.
pub fn compute_direct_irradiance(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    r: f64,
    mu_s: f64,
) -> DVec3 {
    debug_assert_radius(atmosphere, r);
    debug_assert_cosine("mu_s", mu_s);
    let alpha_s = atmosphere.sun_angular_radius;
    let average_cosine_factor = if mu_s < -alpha_s {
        0.0
    } else if mu_s > alpha_s {
        mu_s
    } else {
        (mu_s + alpha_s) * (mu_s + alpha_s) / (4.0 * alpha_s)
    };
    atmosphere.solar_irradiance
        * get_transmittance_to_top_atmosphere_boundary(
            atmosphere,
            layout,
            transmittance_texture,
            r,
            mu_s,
        )
        * average_cosine_factor
}

/// Irradiance from the sky, scattered `n` times as stored in `source`, received
/// by a horizontal surface at `r`.
pub fn compute_indirect_irradiance(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    source: &ScatteringSource<'_>,
    r: f64,
    mu_s: f64,
) -> DVec3 {
    debug_assert_radius(atmosphere, r);
    debug_assert_cosine("mu_s", mu_s);
    let dphi = PI / f64::from(INDIRECT_IRRADIANCE_SAMPLE_COUNT);
    let dtheta = PI / f64::from(INDIRECT_IRRADIANCE_SAMPLE_COUNT);

    let omega_s = DVec3::new((1.0 - mu_s * mu_s).max(0.0).sqrt(), 0.0, mu_s);
    let mut result = DVec3::ZERO;
    for j in 0..INDIRECT_IRRADIANCE_SAMPLE_COUNT / 2 {
        let theta = (f64::from(j) + 0.5) * dtheta;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for i in 0..2 * INDIRECT_IRRADIANCE_SAMPLE_COUNT {
            let phi = (f64::from(i) + 0.5) * dphi;
            let omega = DVec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);
            let domega = dtheta * dphi * sin_theta;
            let coords = ScatteringCoords {
                r,
                mu: omega.z,
                mu_s,
                nu: omega.dot(omega_s).clamp(-1.0, 1.0),
                ray_r_mu_intersects_ground: false,
            };
            result += source.radiance(atmosphere, layout, &coords) * omega.z * domega;
        }
    }
    result
}

/// Decode `(r, mu_s)` at the centre of irradiance texel `(x, y)`.
fn irradiance_texel_coords(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    x: usize,
    y: usize,
) -> (f64, f64) {
    let uv = DVec2::new(
        (x as f64 + 0.5) / f64::from(layout.irradiance_width),
        (y as f64 + 0.5) / f64::from(layout.irradiance_height),
    );
    get_r_mu_s_from_irradiance_texture_uv(atmosphere, layout, uv)
}

/// Bake direct irradiance. The result is the order-0 irradiance delta; it is not
/// part of the final irradiance table.
pub fn generate_direct_irradiance_texture(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    executor: &BakeExecutor,
) -> Texture2D {
    let mut texture = layout.irradiance_texture();
    executor.for_each("direct irradiance", texture.rows_mut(), |mut row| {
        for x in 0..row.width {
            let (r, mu_s) = irradiance_texel_coords(atmosphere, layout, x, row.index);
            let value =
                compute_direct_irradiance(atmosphere, layout, transmittance_texture, r, mu_s);
            row.set_rgb(x, 0, value);
        }
    });
    texture
}

/// Bake the indirect irradiance delta due to the scattering order held by `source`.
pub fn generate_indirect_irradiance_texture(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    source: &ScatteringSource<'_>,
    executor: &BakeExecutor,
) -> Texture2D {
    let mut texture = layout.irradiance_texture();
    executor.for_each("indirect irradiance", texture.rows_mut(), |mut row| {
        for x in 0..row.width {
            let (r, mu_s) = irradiance_texel_coords(atmosphere, layout, x, row.index);
            let value = compute_indirect_irradiance(atmosphere, layout, source, r, mu_s);
            row.set_rgb(x, 0, value);
        }
    });
    texture
}

/// Bilinear lookup of an irradiance table.
pub fn get_irradiance(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    irradiance_texture: &Texture2D,
    r: f64,
    mu_s: f64,
) -> DVec3 {
    let uv = get_irradiance_texture_uv_from_r_mu_s(atmosphere, layout, r, mu_s);
    irradiance_texture.sample_rgb(uv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmittance::generate_transmittance_texture;

    fn layout() -> TextureLayout {
        TextureLayout::new([64, 16], [4, 8, 4, 2], [8, 4])
    }

    #[test]
    fn test_direct_irradiance_branches() {
        let atmosphere = Atmosphere::earth();
        let layout = layout();
        let transmittance =
            generate_transmittance_texture(&atmosphere, &layout, &BakeExecutor::serial());
        let r = atmosphere.bottom_radius;
        let night = compute_direct_irradiance(&atmosphere, &layout, &transmittance, r, -0.5);
        assert_eq!(night, DVec3::ZERO);
        let noon = compute_direct_irradiance(&atmosphere, &layout, &transmittance, r, 1.0);
        assert!(noon.min_element() > 0.5 * atmosphere.solar_irradiance.min_element());
        assert!(noon.max_element() < atmosphere.solar_irradiance.max_element());
        // Half the sun disc above the horizon.
        let dusk = compute_direct_irradiance(&atmosphere, &layout, &transmittance, r, 0.0);
        assert!(dusk.min_element() > 0.0 && dusk.max_element() < noon.min_element());
    }

    #[test]
    fn test_indirect_irradiance_of_uniform_sky() {
        let atmosphere = Atmosphere::earth();
        let layout = layout();
        // A uniform radiance L over the upper hemisphere gives irradiance pi * L.
        let mut sky = layout.scattering_texture(3);
        for mut slice in sky.slices_mut() {
            for y in 0..slice.height {
                for x in 0..slice.width {
                    slice.set_rgb(x, y, DVec3::ONE);
                }
            }
        }
        let source = ScatteringSource::Multiple(&sky);
        let value = compute_indirect_irradiance(&atmosphere, &layout, &source, 6370.0, 0.3);
        assert!((value - DVec3::splat(PI)).abs().max_element() < 1e-2, "{value:?}");
    }

    #[test]
    fn test_irradiance_lookup_at_texel_centre() {
        let atmosphere = Atmosphere::earth();
        let layout = layout();
        let mut texture = layout.irradiance_texture();
        texture.set_rgb(3, 2, DVec3::new(1.0, 2.0, 3.0));
        let (r, mu_s) = irradiance_texel_coords(&atmosphere, &layout, 3, 2);
        let value = get_irradiance(&atmosphere, &layout, &texture, r, mu_s);
        assert!((value - DVec3::new(1.0, 2.0, 3.0)).abs().max_element() < 1e-9);
    }
}
