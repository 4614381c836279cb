//! Multiple scattering: the scattering density of one order integrated along
//! the view ray.

use glam::DVec3;

use crate::executor::BakeExecutor;
use crate::geometry::{clamp_cosine, distance_to_nearest_atmosphere_boundary, radius_at_distance};
use crate::model::Atmosphere;
use crate::parameterization::{ScatteringCoords, scattering_texel_coords};
use crate::phase::rayleigh_phase_function;
use crate::scattering::get_scattering;
use crate::single_scattering::VIEW_RAY_SAMPLE_COUNT;
use crate::texture::{Texture2D, Texture3D, TextureLayout};
use crate::transmittance::get_transmittance;

/// Radiance of one scattering order reaching the viewer along `coords`.
pub fn compute_multiple_scattering(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    scattering_density_texture: &Texture3D,
    coords: &ScatteringCoords,
) -> DVec3 {
    let ScatteringCoords {
        r,
        mu,
        mu_s,
        nu,
        ray_r_mu_intersects_ground,
    } = *coords;
    let dx = distance_to_nearest_atmosphere_boundary(atmosphere, r, mu, ray_r_mu_intersects_ground)
        / f64::from(VIEW_RAY_SAMPLE_COUNT);

    let mut rayleigh_mie_sum = DVec3::ZERO;
    for i in 0..=VIEW_RAY_SAMPLE_COUNT {
        let d_i = f64::from(i) * dx;
        let r_i = radius_at_distance(atmosphere, r, mu, d_i);
        let sample = ScatteringCoords {
            r: r_i,
            mu: clamp_cosine((r * mu + d_i) / r_i),
            mu_s: clamp_cosine((r * mu_s + d_i * nu) / r_i),
            nu,
            ray_r_mu_intersects_ground,
        };
        let rayleigh_mie_i = get_scattering(atmosphere, layout, scattering_density_texture, &sample)
            * get_transmittance(
                atmosphere,
                layout,
                transmittance_texture,
                r,
                mu,
                d_i,
                ray_r_mu_intersects_ground,
            )
            * dx;
        let weight = if i == 0 || i == VIEW_RAY_SAMPLE_COUNT {
            0.5
        } else {
            1.0
        };
        rayleigh_mie_sum += rayleigh_mie_i * weight;
    }
    rayleigh_mie_sum
}

/// Bake one multiple-scattering order, one depth slice per job.
///
/// Returns the order's delta table, which keeps the phase functions folded in
/// for the next density pass, and adds the delta divided by the Rayleigh phase
/// function into the RGB channels of `scattering`. Alpha is left untouched.
pub fn generate_multiple_scattering_texture(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    scattering_density_texture: &Texture3D,
    scattering: &mut Texture3D,
    executor: &BakeExecutor,
) -> Texture3D {
    let mut delta = layout.scattering_texture(3);
    let slices = delta.slices_mut().zip(scattering.slices_mut());
    executor.for_each(
        "multiple scattering",
        slices,
        |(mut delta_slice, mut scattering_slice)| {
            let z = delta_slice.index;
            for y in 0..delta_slice.height {
                for x in 0..delta_slice.width {
                    let coords = scattering_texel_coords(atmosphere, layout, x, y, z);
                    let value = compute_multiple_scattering(
                        atmosphere,
                        layout,
                        transmittance_texture,
                        scattering_density_texture,
                        &coords,
                    );
                    delta_slice.set_rgb(x, y, value);
                    scattering_slice.add_rgb(x, y, value / rayleigh_phase_function(coords.nu));
                }
            }
        },
    );
    delta
}
