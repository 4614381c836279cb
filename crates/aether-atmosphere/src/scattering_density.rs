//! Scattering density: radiance scattered `n - 1` times arriving at a point from
//! every direction, scattered once more towards the viewer.

use std::f64::consts::PI;

use glam::DVec3;

use crate::executor::BakeExecutor;
use crate::geometry::{distance_to_bottom_atmosphere_boundary, ray_intersects_ground};
use crate::irradiance::get_irradiance;
use crate::model::{Atmosphere, get_profile_density};
use crate::parameterization::{ScatteringCoords, scattering_texel_coords};
use crate::phase::{mie_phase_function, rayleigh_phase_function};
use crate::scattering::ScatteringSource;
use crate::texture::{Texture2D, Texture3D, TextureLayout};
use crate::transmittance::get_transmittance;

/// Angular resolution of the sphere integral: `SAMPLE_COUNT` zenith steps by
/// `2 * SAMPLE_COUNT` azimuth steps.
const SCATTERING_DENSITY_SAMPLE_COUNT: u32 = 16;

/// Read-only inputs of a scattering-density pass of order `n`.
#[derive(Clone, Copy, Debug)]
pub struct ScatteringDensityInputs<'a> {
    pub transmittance: &'a Texture2D,
    /// Scattering of order `n - 1`.
    pub scattering: ScatteringSource<'a>,
    /// Ground irradiance of order `n - 2`.
    pub irradiance: &'a Texture2D,
}

/// Scattering density at `(r, mu, mu_s, nu)`.
///
/// Directions are expressed in a frame where the zenith is `+z` and the view
/// direction lies in the `xz` plane.
pub fn compute_scattering_density(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    inputs: &ScatteringDensityInputs<'_>,
    coords: &ScatteringCoords,
) -> DVec3 {
    let ScatteringCoords { r, mu, mu_s, nu, .. } = *coords;

    let zenith_direction = DVec3::Z;
    let omega = DVec3::new((1.0 - mu * mu).max(0.0).sqrt(), 0.0, mu);
    let sun_dir_x = if omega.x == 0.0 {
        0.0
    } else {
        (nu - mu * mu_s) / omega.x
    };
    let sun_dir_y = (1.0 - sun_dir_x * sun_dir_x - mu_s * mu_s).max(0.0).sqrt();
    let omega_s = DVec3::new(sun_dir_x, sun_dir_y, mu_s);

    let dphi = PI / f64::from(SCATTERING_DENSITY_SAMPLE_COUNT);
    let dtheta = PI / f64::from(SCATTERING_DENSITY_SAMPLE_COUNT);

    // Local scattering coefficients only depend on r.
    let altitude = r - atmosphere.bottom_radius;
    let rayleigh = atmosphere.rayleigh_scattering
        * get_profile_density(&atmosphere.rayleigh_density, altitude);
    let mie = atmosphere.mie_scattering * get_profile_density(&atmosphere.mie_density, altitude);

    let mut rayleigh_mie = DVec3::ZERO;
    for l in 0..SCATTERING_DENSITY_SAMPLE_COUNT {
        let theta = (f64::from(l) + 0.5) * dtheta;
        let (sin_theta, cos_theta) = theta.sin_cos();
        let ray_r_theta_intersects_ground = ray_intersects_ground(atmosphere, r, cos_theta);

        // Distance and transmittance to the ground only depend on theta.
        let (distance_to_ground, transmittance_to_ground, ground_albedo) =
            if ray_r_theta_intersects_ground {
                let distance = distance_to_bottom_atmosphere_boundary(atmosphere, r, cos_theta);
                let transmittance = get_transmittance(
                    atmosphere,
                    layout,
                    inputs.transmittance,
                    r,
                    cos_theta,
                    distance,
                    true,
                );
                (distance, transmittance, atmosphere.ground_albedo)
            } else {
                (0.0, DVec3::ZERO, DVec3::ZERO)
            };

        for m in 0..2 * SCATTERING_DENSITY_SAMPLE_COUNT {
            let phi = (f64::from(m) + 0.5) * dphi;
            let omega_i = DVec3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);
            let domega_i = dtheta * dphi * sin_theta;

            // Radiance arriving from omega_i after n - 1 bounces in the atmosphere.
            let nu1 = omega_s.dot(omega_i).clamp(-1.0, 1.0);
            let incident_coords = ScatteringCoords {
                r,
                mu: cos_theta,
                mu_s,
                nu: nu1,
                ray_r_mu_intersects_ground: ray_r_theta_intersects_ground,
            };
            let mut incident_radiance =
                inputs
                    .scattering
                    .radiance(atmosphere, layout, &incident_coords);

            // Plus light whose last bounce of n - 1 was on the ground.
            if ray_r_theta_intersects_ground {
                let ground_normal =
                    (zenith_direction * r + omega_i * distance_to_ground).normalize();
                let ground_irradiance = get_irradiance(
                    atmosphere,
                    layout,
                    inputs.irradiance,
                    atmosphere.bottom_radius,
                    ground_normal.dot(omega_s).clamp(-1.0, 1.0),
                );
                incident_radiance +=
                    transmittance_to_ground * ground_albedo * (1.0 / PI) * ground_irradiance;
            }

            // Scattered from omega_i towards -omega.
            let nu2 = omega.dot(omega_i).clamp(-1.0, 1.0);
            let scattering = rayleigh * rayleigh_phase_function(nu2)
                + mie * mie_phase_function(atmosphere.mie_phase_function_g, nu2);
            rayleigh_mie += incident_radiance * scattering * domega_i;
        }
    }
    rayleigh_mie
}

/// Bake the scattering density of one order, one depth slice per job.
pub fn generate_scattering_density_texture(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    inputs: &ScatteringDensityInputs<'_>,
    executor: &BakeExecutor,
) -> Texture3D {
    let mut texture = layout.scattering_texture(3);
    executor.for_each("scattering density", texture.slices_mut(), |mut slice| {
        let z = slice.index;
        for y in 0..slice.height {
            for x in 0..slice.width {
                let coords = scattering_texel_coords(atmosphere, layout, x, y, z);
                let value = compute_scattering_density(atmosphere, layout, inputs, &coords);
                slice.set_rgb(x, y, value);
            }
        }
    });
    texture
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(layout: &TextureLayout, value: f64) -> Texture3D {
        let mut texture = layout.scattering_texture(3);
        for mut slice in texture.slices_mut() {
            for y in 0..slice.height {
                for x in 0..slice.width {
                    slice.set_rgb(x, y, DVec3::splat(value));
                }
            }
        }
        texture
    }

    #[test]
    fn test_dark_inputs_give_zero_density() {
        let atmosphere = Atmosphere::earth();
        let layout = TextureLayout::new([16, 8], [4, 8, 4, 2], [8, 4]);
        let transmittance = layout.transmittance_texture();
        let irradiance = layout.irradiance_texture();
        let scattering = layout.scattering_texture(3);
        let inputs = ScatteringDensityInputs {
            transmittance: &transmittance,
            scattering: ScatteringSource::Multiple(&scattering),
            irradiance: &irradiance,
        };
        let coords = ScatteringCoords::new(&atmosphere, 6365.0, 0.2, 0.5, 0.1);
        let density = compute_scattering_density(&atmosphere, &layout, &inputs, &coords);
        assert_eq!(density, DVec3::ZERO);
    }

    #[test]
    fn test_uniform_radiance_scatters_with_local_coefficients() {
        // With unit radiance from every direction, no ground light and normalized
        // phase functions the density reduces to the local scattering coefficients.
        let mut atmosphere = Atmosphere::earth();
        atmosphere.ground_albedo = DVec3::ZERO;
        let layout = TextureLayout::new([16, 8], [4, 8, 4, 2], [8, 4]);
        let transmittance = layout.transmittance_texture();
        let irradiance = layout.irradiance_texture();
        let scattering = filled(&layout, 1.0);
        let inputs = ScatteringDensityInputs {
            transmittance: &transmittance,
            scattering: ScatteringSource::Multiple(&scattering),
            irradiance: &irradiance,
        };
        let r = atmosphere.bottom_radius;
        let coords = ScatteringCoords::new(&atmosphere, r, 0.6, 0.5, 0.3);
        let density = compute_scattering_density(&atmosphere, &layout, &inputs, &coords);
        let expected = atmosphere.rayleigh_scattering + atmosphere.mie_scattering;
        let error = ((density - expected) / expected).abs().max_element();
        assert!(error < 0.01, "density {density:?}, expected {expected:?}");
    }

    #[test]
    fn test_generated_slices_match_kernel() {
        let atmosphere = Atmosphere::earth();
        let layout = TextureLayout::new([16, 8], [2, 4, 2, 2], [4, 2]);
        let transmittance = layout.transmittance_texture();
        let irradiance = layout.irradiance_texture();
        let scattering = filled(&layout, 0.5);
        let inputs = ScatteringDensityInputs {
            transmittance: &transmittance,
            scattering: ScatteringSource::Multiple(&scattering),
            irradiance: &irradiance,
        };
        let serial =
            generate_scattering_density_texture(&atmosphere, &layout, &inputs, &BakeExecutor::serial());
        let parallel =
            generate_scattering_density_texture(&atmosphere, &layout, &inputs, &BakeExecutor::new(3));
        assert_eq!(serial, parallel);
        let coords = scattering_texel_coords(&atmosphere, &layout, 1, 2, 1);
        let expected = compute_scattering_density(&atmosphere, &layout, &inputs, &coords);
        assert!((serial.rgb(1, 2, 1) - expected).abs().max_element() < 1e-7);
    }
}
