//! CPU evaluation of the sky from baked tables, mirroring the sky shader.
//!
//! Positions are in length units with the planet surface under the world origin,
//! i.e. the planet centre at `(0, 0, -bottom_radius)`.

use std::f64::consts::PI;

use glam::DVec3;

use crate::bake::BakedTables;
use crate::geometry::{clamp_cosine, clamp_radius, ray_intersects_ground, safe_sqrt};
use crate::irradiance::get_irradiance;
use crate::model::Atmosphere;
use crate::parameterization::ScatteringCoords;
use crate::phase::{mie_phase_function, rayleigh_phase_function};
use crate::scattering::get_scattering_rgba;
use crate::transmittance::{get_transmittance_to_sun, get_transmittance_to_top_atmosphere_boundary};

/// Planet centre in world space.
pub fn earth_center(atmosphere: &Atmosphere) -> DVec3 {
    DVec3::new(0.0, 0.0, -atmosphere.bottom_radius)
}

/// Radiance of the sun disc.
pub fn solar_radiance(atmosphere: &Atmosphere) -> DVec3 {
    let alpha = atmosphere.sun_angular_radius;
    atmosphere.solar_irradiance / (PI * alpha * alpha)
}

/// Rayleigh-like scattering and single Mie scattering along `coords`, both
/// without phase functions.
///
/// The table stores only the red channel of single Mie; the other channels are
/// reconstructed assuming Mie and Rayleigh scattering keep the same ratio.
pub fn get_combined_scattering(tables: &BakedTables, coords: &ScatteringCoords) -> (DVec3, DVec3) {
    let atmosphere = &tables.atmosphere;
    let rgba = get_scattering_rgba(atmosphere, &tables.layout, &tables.scattering, coords);
    let scattering = rgba.truncate();
    let rayleigh = atmosphere.rayleigh_scattering;
    let mie = atmosphere.mie_scattering;
    if scattering.x <= 0.0 || rayleigh.min_element() <= 0.0 || mie.x <= 0.0 {
        return (scattering, DVec3::ZERO);
    }
    let single_mie = scattering * rgba.w / scattering.x * (rayleigh.x / mie.x) * (mie / rayleigh);
    (scattering, single_mie)
}

/// Radiance of the sky seen from `camera` along `view_ray`, and the transmittance
/// between the camera and the end of the ray.
///
/// A camera outside the atmosphere is moved to where the ray enters it. Rays
/// missing the atmosphere see no sky and full transmittance; rays hitting the
/// ground have zero transmittance.
pub fn sky_radiance(
    tables: &BakedTables,
    camera: DVec3,
    view_ray: DVec3,
    sun_direction: DVec3,
) -> (DVec3, DVec3) {
    let atmosphere = &tables.atmosphere;
    let view_ray = view_ray.normalize_or_zero();
    let sun_direction = sun_direction.normalize_or_zero();
    let top_radius = atmosphere.top_radius;

    let mut camera = camera - earth_center(atmosphere);
    let mut r = camera.length();
    let mut rmu = camera.dot(view_ray);
    let discriminant = rmu * rmu - r * r + top_radius * top_radius;
    let distance_to_top = -rmu - safe_sqrt(discriminant);
    if discriminant >= 0.0 && distance_to_top > 0.0 {
        camera += view_ray * distance_to_top;
        r = top_radius;
        rmu += distance_to_top;
    } else if r > top_radius {
        return (DVec3::ZERO, DVec3::ONE);
    }

    let r = clamp_radius(atmosphere, r);
    let mu = clamp_cosine(rmu / r);
    let mu_s = clamp_cosine(camera.dot(sun_direction) / r);
    let nu = clamp_cosine(view_ray.dot(sun_direction));
    let coords = ScatteringCoords::new(atmosphere, r, mu, mu_s, nu);

    let transmittance = if coords.ray_r_mu_intersects_ground {
        DVec3::ZERO
    } else {
        get_transmittance_to_top_atmosphere_boundary(
            atmosphere,
            &tables.layout,
            &tables.transmittance,
            r,
            mu,
        )
    };
    let (scattering, single_mie) = get_combined_scattering(tables, &coords);
    let radiance = scattering * rayleigh_phase_function(nu)
        + single_mie * mie_phase_function(atmosphere.mie_phase_function_g, nu);
    (radiance, transmittance)
}

/// Direct sun irradiance and indirect sky irradiance received at `point` by a
/// surface with `normal`.
pub fn sun_and_sky_irradiance(
    tables: &BakedTables,
    point: DVec3,
    normal: DVec3,
    sun_direction: DVec3,
) -> (DVec3, DVec3) {
    let atmosphere = &tables.atmosphere;
    let normal = normal.normalize_or_zero();
    let sun_direction = sun_direction.normalize_or_zero();
    let point = point - earth_center(atmosphere);
    let length = point.length();
    let r = clamp_radius(atmosphere, length);
    let up = if length > 0.0 { point / length } else { DVec3::Z };
    let mu_s = clamp_cosine(up.dot(sun_direction));

    // Lambertian surface tilted by `normal` sees part of the sky hemisphere.
    let sky = get_irradiance(atmosphere, &tables.layout, &tables.irradiance, r, mu_s)
        * (1.0 + normal.dot(up))
        * 0.5;
    let sun = atmosphere.solar_irradiance
        * get_transmittance_to_sun(atmosphere, &tables.layout, &tables.transmittance, r, mu_s)
        * normal.dot(sun_direction).max(0.0);
    (sun, sky)
}

/// Whether a ray from ground level along `view_ray` reaches space.
pub fn is_sky_visible(atmosphere: &Atmosphere, view_ray: DVec3) -> bool {
    let mu = clamp_cosine(view_ray.normalize_or_zero().z);
    !ray_intersects_ground(atmosphere, atmosphere.bottom_radius, mu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bake::BakeOrchestrator;
    use crate::executor::BakeExecutor;
    use crate::texture::TextureLayout;

    fn single_order_tables() -> BakedTables {
        let layout = TextureLayout::new([32, 8], [4, 8, 4, 4], [8, 4]);
        BakeOrchestrator::new(Atmosphere::earth(), layout)
            .expect("valid layout")
            .with_max_order(1)
            .with_executor(BakeExecutor::serial())
            .bake()
    }

    #[test]
    fn test_solar_radiance_matches_disc_area() {
        let atmosphere = Atmosphere::earth();
        let radiance = solar_radiance(&atmosphere);
        let alpha = atmosphere.sun_angular_radius;
        let irradiance = radiance * PI * alpha * alpha;
        assert!((irradiance - atmosphere.solar_irradiance).abs().max_element() < 1e-9);
    }

    #[test]
    fn test_sky_views() {
        let tables = single_order_tables();
        let sun = DVec3::new(0.0, 0.6, 0.8);
        let camera = DVec3::new(0.0, 0.0, 0.5);

        // Looking up in daylight.
        let (radiance, transmittance) = sky_radiance(&tables, camera, DVec3::Z, sun);
        assert!(radiance.min_element() > 0.0, "{radiance:?}");
        assert!(radiance.z > radiance.x, "clear sky should be blue: {radiance:?}");
        assert!(transmittance.min_element() > 0.0 && transmittance.max_element() <= 1.0);

        // Looking down at the ground.
        let (_, transmittance) = sky_radiance(&tables, camera, -DVec3::Z, sun);
        assert_eq!(transmittance, DVec3::ZERO);

        // Far outside the atmosphere, looking away from the planet.
        let space = DVec3::new(0.0, 0.0, 1000.0);
        let (radiance, transmittance) = sky_radiance(&tables, space, DVec3::Z, sun);
        assert_eq!(radiance, DVec3::ZERO);
        assert_eq!(transmittance, DVec3::ONE);

        // Outside the atmosphere, looking back through it.
        let (radiance, _) = sky_radiance(&tables, space, -DVec3::Z, sun);
        assert!(radiance.max_element() > 0.0);
    }

    #[test]
    fn test_combined_scattering_reconstructs_red_mie() {
        let tables = single_order_tables();
        let atmosphere = &tables.atmosphere;
        let r = atmosphere.bottom_radius + 1.0;
        let coords = ScatteringCoords::new(atmosphere, r, 0.5, 0.5, 0.9);
        let (scattering, single_mie) = get_combined_scattering(&tables, &coords);
        let alpha = get_scattering_rgba(atmosphere, &tables.layout, &tables.scattering, &coords).w;
        assert!(scattering.x > 0.0);
        assert!((single_mie.x - alpha).abs() <= 1e-9 * alpha.max(1.0));
    }

    #[test]
    fn test_sun_and_sky_irradiance() {
        let tables = single_order_tables();
        let sun = DVec3::new(0.0, 0.0, 1.0);
        let (direct, sky) = sun_and_sky_irradiance(&tables, DVec3::ZERO, DVec3::Z, sun);
        assert!(direct.min_element() > 0.0);
        // A single-order bake holds no indirect irradiance yet.
        assert_eq!(sky, DVec3::ZERO);

        let (direct, _) = sun_and_sky_irradiance(&tables, DVec3::ZERO, -DVec3::Z, sun);
        assert_eq!(direct, DVec3::ZERO);

        let (night, _) = sun_and_sky_irradiance(&tables, DVec3::ZERO, DVec3::Z, -sun);
        assert_eq!(night, DVec3::ZERO);
    }

    #[test]
    fn test_sky_visibility_from_ground() {
        let atmosphere = Atmosphere::earth();
        assert!(is_sky_visible(&atmosphere, DVec3::Z));
        assert!(is_sky_visible(&atmosphere, DVec3::X));
        assert!(!is_sky_visible(&atmosphere, -DVec3::Z));
    }
}
