//! Single scattering: sunlight scattered once towards the viewer.

use glam::DVec3;

use crate::executor::BakeExecutor;
use crate::geometry::{clamp_cosine, distance_to_nearest_atmosphere_boundary, radius_at_distance};
use crate::model::{Atmosphere, get_profile_density};
use crate::parameterization::{ScatteringCoords, scattering_texel_coords};
use crate::texture::{Texture2D, Texture3D, TextureLayout};
use crate::transmittance::{get_transmittance, get_transmittance_to_sun};

/// Number of integration intervals along the view ray.
pub(crate) const VIEW_RAY_SAMPLE_COUNT: u32 = 50;

/// Rayleigh and Mie integrands at distance `d` along the view ray, without the
/// scattering coefficients.
fn compute_single_scattering_integrand(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    coords: &ScatteringCoords,
    d: f64,
) -> (DVec3, DVec3) {
    let ScatteringCoords {
        r,
        mu,
        mu_s,
        nu,
        ray_r_mu_intersects_ground,
    } = *coords;
    let r_d = radius_at_distance(atmosphere, r, mu, d);
    let mu_s_d = clamp_cosine((r * mu_s + d * nu) / r_d);
    let transmittance = get_transmittance(
        atmosphere,
        layout,
        transmittance_texture,
        r,
        mu,
        d,
        ray_r_mu_intersects_ground,
    ) * get_transmittance_to_sun(atmosphere, layout, transmittance_texture, r_d, mu_s_d);
    let altitude = r_d - atmosphere.bottom_radius;
    (
        transmittance * get_profile_density(&atmosphere.rayleigh_density, altitude),
        transmittance * get_profile_density(&atmosphere.mie_density, altitude),
    )
}

/// Single-scattered Rayleigh and Mie radiance along the view ray, without phase functions.
pub fn compute_single_scattering(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    coords: &ScatteringCoords,
) -> (DVec3, DVec3) {
    let dx = distance_to_nearest_atmosphere_boundary(
        atmosphere,
        coords.r,
        coords.mu,
        coords.ray_r_mu_intersects_ground,
    ) / f64::from(VIEW_RAY_SAMPLE_COUNT);

    let mut rayleigh_sum = DVec3::ZERO;
    let mut mie_sum = DVec3::ZERO;
    for i in 0..=VIEW_RAY_SAMPLE_COUNT {
        let d_i = f64::from(i) * dx;
        let (rayleigh_i, mie_i) = compute_single_scattering_integrand(
            atmosphere,
            layout,
            transmittance_texture,
            coords,
            d_i,
        );
        let weight = if i == 0 || i == VIEW_RAY_SAMPLE_COUNT {
            0.5
        } else {
            1.0
        };
        rayleigh_sum += rayleigh_i * weight;
        mie_sum += mie_i * weight;
    }
    (
        rayleigh_sum * dx * atmosphere.solar_irradiance * atmosphere.rayleigh_scattering,
        mie_sum * dx * atmosphere.solar_irradiance * atmosphere.mie_scattering,
    )
}

/// Output of the single-scattering stage.
#[derive(Clone, Debug)]
pub struct SingleScattering {
    /// Rayleigh single scattering, input of the order-2 passes.
    pub delta_rayleigh: Texture3D,
    /// Mie single scattering, input of the order-2 passes.
    pub delta_mie: Texture3D,
    /// Rayleigh in RGB and the red Mie channel in alpha.
    pub scattering: Texture3D,
}

/// Bake single scattering for every texel, one depth slice per job.
pub fn generate_single_scattering_texture(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    transmittance_texture: &Texture2D,
    executor: &BakeExecutor,
) -> SingleScattering {
    let mut delta_rayleigh = layout.scattering_texture(3);
    let mut delta_mie = layout.scattering_texture(3);
    let mut scattering = layout.scattering_texture(4);

    let slices = delta_rayleigh
        .slices_mut()
        .zip(delta_mie.slices_mut())
        .zip(scattering.slices_mut());
    executor.for_each(
        "single scattering",
        slices,
        |((mut rayleigh_slice, mut mie_slice), mut scattering_slice)| {
            let z = rayleigh_slice.index;
            for y in 0..rayleigh_slice.height {
                for x in 0..rayleigh_slice.width {
                    let coords = scattering_texel_coords(atmosphere, layout, x, y, z);
                    let (rayleigh, mie) = compute_single_scattering(
                        atmosphere,
                        layout,
                        transmittance_texture,
                        &coords,
                    );
                    rayleigh_slice.set_rgb(x, y, rayleigh);
                    mie_slice.set_rgb(x, y, mie);
                    scattering_slice.set_rgba(x, y, rayleigh.extend(mie.x));
                }
            }
        },
    );

    SingleScattering {
        delta_rayleigh,
        delta_mie,
        scattering,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmittance::generate_transmittance_texture;

    fn setup() -> (Atmosphere, TextureLayout, Texture2D) {
        let atmosphere = Atmosphere::earth();
        let layout = TextureLayout::new([64, 16], [4, 8, 4, 2], [8, 4]);
        let transmittance =
            generate_transmittance_texture(&atmosphere, &layout, &BakeExecutor::serial());
        (atmosphere, layout, transmittance)
    }

    #[test]
    fn test_daylight_zenith_is_blue() {
        let (atmosphere, layout, transmittance) = setup();
        let coords = ScatteringCoords::new(&atmosphere, atmosphere.bottom_radius, 1.0, 0.8, 0.8);
        let (rayleigh, mie) =
            compute_single_scattering(&atmosphere, &layout, &transmittance, &coords);
        assert!(rayleigh.z > rayleigh.y && rayleigh.y > rayleigh.x, "{rayleigh:?}");
        assert!(mie.min_element() > 0.0);
    }

    #[test]
    fn test_night_side_is_dark() {
        let (atmosphere, layout, transmittance) = setup();
        // Sun far below the horizon for every point along a short upward ray.
        let coords = ScatteringCoords::new(&atmosphere, atmosphere.bottom_radius, 1.0, -0.9, -0.9);
        let (rayleigh, mie) =
            compute_single_scattering(&atmosphere, &layout, &transmittance, &coords);
        assert_eq!(rayleigh, DVec3::ZERO);
        assert_eq!(mie, DVec3::ZERO);
    }

    #[test]
    fn test_generated_alpha_is_red_mie() {
        let (atmosphere, layout, transmittance) = setup();
        let single = generate_single_scattering_texture(
            &atmosphere,
            &layout,
            &transmittance,
            &BakeExecutor::serial(),
        );
        for (x, y, z) in [(0, 0, 0), (3, 5, 2), (7, 7, 3)] {
            let texel = single.scattering.texel(x, y, z);
            assert_eq!(texel[3], single.delta_mie.texel(x, y, z)[0]);
            assert_eq!(&texel[..3], single.delta_rayleigh.texel(x, y, z));
        }
    }

    #[test]
    fn test_generated_texel_matches_kernel() {
        let (atmosphere, layout, transmittance) = setup();
        let single = generate_single_scattering_texture(
            &atmosphere,
            &layout,
            &transmittance,
            &BakeExecutor::new(2),
        );
        let coords = scattering_texel_coords(&atmosphere, &layout, 5, 6, 1);
        let (rayleigh, _) = compute_single_scattering(&atmosphere, &layout, &transmittance, &coords);
        let stored = single.delta_rayleigh.rgb(5, 6, 1);
        assert!((stored - rayleigh).abs().max_element() <= 1e-6 * rayleigh.max_element().max(1e-6));
    }
}
