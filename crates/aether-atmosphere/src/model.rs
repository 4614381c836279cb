//! Physical atmosphere model: constituents, density profiles, and the Earth-like
//! reference atmosphere derived from tabulated spectra.
//!
//! Lengths are expressed in engine units of [`LENGTH_UNIT_IN_METERS`] meters
//! (kilometers); scattering and extinction coefficients are per engine unit.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::spectrum::{self, OZONE_CROSS_SECTION, SOLAR_IRRADIANCE};

/// Length of one engine unit in meters.
pub const LENGTH_UNIT_IN_METERS: f64 = 1000.0;

const RAYLEIGH: f64 = 1.24062e-6;
const RAYLEIGH_SCALE_HEIGHT: f64 = 8000.0;
const MIE_SCALE_HEIGHT: f64 = 1200.0;
const MIE_ANGSTROM_ALPHA: f64 = 0.0;
const MIE_ANGSTROM_BETA: f64 = 5.328e-3;
const MIE_SINGLE_SCATTERING_ALBEDO: f64 = 0.9;
const MIE_PHASE_FUNCTION_G: f64 = 0.8;
const MAX_SUN_ZENITH_ANGLE_DEG: f64 = 102.0;
const SUN_ANGULAR_RADIUS: f64 = 0.004675;
const BOTTOM_RADIUS: f64 = 6360.0;
const TOP_RADIUS: f64 = 6420.0;
const GROUND_ALBEDO: f64 = 0.1;

/// Molecules per m^2 in one Dobson unit.
const DOBSON_UNIT: f64 = 2.687e20;
/// Target ozone column in Dobson units.
const OZONE_COLUMN_DU: f64 = 300.0;
/// Integral of the ozone density profile over altitude, in meters. The profile
/// is a triangle rising from 10km to 1 at 25km and back to 0 at 40km.
const OZONE_PROFILE_INTEGRAL_M: f64 = 15_000.0;

/// One layer of a [`DensityProfile`].
///
/// Density at altitude `h` is `exp_term * exp(exp_scale * h) + linear_term * h + constant_term`,
/// clamped to `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DensityProfileLayer {
    /// Upper altitude bound of this layer (only meaningful for layer 0).
    pub width: f64,
    pub exp_term: f64,
    /// Per engine unit of altitude.
    pub exp_scale: f64,
    /// Per engine unit of altitude.
    pub linear_term: f64,
    pub constant_term: f64,
}

/// Altitude-dependent relative density of one atmospheric constituent.
///
/// Layer 0 applies below `layers[0].width`, layer 1 above it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DensityProfile {
    pub layers: [DensityProfileLayer; 2],
}

impl DensityProfile {
    /// Relative density at `altitude` above the ground.
    pub fn density(&self, altitude: f64) -> f64 {
        get_profile_density(self, altitude)
    }
}

/// Evaluate a single layer at `altitude`, clamped to `[0, 1]`.
pub fn get_layer_density(layer: &DensityProfileLayer, altitude: f64) -> f64 {
    let density = layer.exp_term * (layer.exp_scale * altitude).exp()
        + layer.linear_term * altitude
        + layer.constant_term;
    density.clamp(0.0, 1.0)
}

/// Evaluate a two-layer profile at `altitude`.
pub fn get_profile_density(profile: &DensityProfile, altitude: f64) -> f64 {
    if altitude < profile.layers[0].width {
        get_layer_density(&profile.layers[0], altitude)
    } else {
        get_layer_density(&profile.layers[1], altitude)
    }
}

/// Full physical description of a planetary atmosphere.
#[derive(Clone, Debug, PartialEq)]
pub struct Atmosphere {
    /// Radius of the top of the atmosphere.
    pub top_radius: f64,
    /// Radius of the planet surface.
    pub bottom_radius: f64,
    /// Cosine of the largest sun zenith angle for which scattering is precomputed.
    pub mu_s_min: f64,
    /// Solar irradiance at the top of the atmosphere.
    pub solar_irradiance: DVec3,
    /// Angular radius of the sun disc, in radians.
    pub sun_angular_radius: f64,
    pub rayleigh_scattering: DVec3,
    pub rayleigh_density: DensityProfile,
    pub mie_scattering: DVec3,
    pub mie_extinction: DVec3,
    pub mie_density: DensityProfile,
    /// Henyey-Greenstein asymmetry factor of the Mie phase function.
    pub mie_phase_function_g: f64,
    pub absorption_extinction: DVec3,
    pub absorption_density: DensityProfile,
    pub ground_albedo: DVec3,
}

impl Atmosphere {
    /// Earth-like reference atmosphere. Equivalent to `initialize_atmosphere().0`.
    pub fn earth() -> Self {
        initialize_atmosphere().0
    }

    /// `true` when the radii are ordered and every coefficient is non-negative.
    pub fn is_physically_valid(&self) -> bool {
        let non_negative = |v: DVec3| v.min_element() >= 0.0;
        self.bottom_radius > 0.0
            && self.bottom_radius < self.top_radius
            && (-1.0..=1.0).contains(&self.mu_s_min)
            && non_negative(self.solar_irradiance)
            && non_negative(self.rayleigh_scattering)
            && non_negative(self.mie_scattering)
            && non_negative(self.mie_extinction)
            && non_negative(self.absorption_extinction)
            && non_negative(self.ground_albedo)
    }

    /// Distance to the top of the atmosphere for a horizontal ray at ground level.
    pub fn horizon_distance(&self) -> f64 {
        (self.top_radius * self.top_radius - self.bottom_radius * self.bottom_radius).sqrt()
    }
}

/// The subset of [`Atmosphere`] a sky shader needs at runtime.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct SkyFixedConfigs {
    pub solar_irradiance: [f32; 3],
    pub rayleigh_scattering: [f32; 3],
    pub mie_scattering: [f32; 3],
    pub sun_angular_radius: f32,
    pub bottom_radius: f32,
    pub top_radius: f32,
    pub mie_phase_function_g: f32,
    pub mu_s_min: f32,
    pub unit_length_in_meters: f32,
}

impl SkyFixedConfigs {
    /// Extract the runtime subset of an atmosphere.
    pub fn from_atmosphere(atmosphere: &Atmosphere) -> Self {
        Self {
            solar_irradiance: atmosphere.solar_irradiance.as_vec3().to_array(),
            rayleigh_scattering: atmosphere.rayleigh_scattering.as_vec3().to_array(),
            mie_scattering: atmosphere.mie_scattering.as_vec3().to_array(),
            sun_angular_radius: atmosphere.sun_angular_radius as f32,
            bottom_radius: atmosphere.bottom_radius as f32,
            top_radius: atmosphere.top_radius as f32,
            mie_phase_function_g: atmosphere.mie_phase_function_g as f32,
            mu_s_min: atmosphere.mu_s_min as f32,
            unit_length_in_meters: LENGTH_UNIT_IN_METERS as f32,
        }
    }
}

/// Build the Earth-like reference atmosphere from the tabulated spectra.
///
/// Each spectral curve is sampled at 680/550/440nm for R/G/B and converted from
/// per-meter to per-engine-unit coefficients.
pub fn initialize_atmosphere() -> (Atmosphere, SkyFixedConfigs) {
    let rayleigh_scattering = spectrum::sample_spectrum(|lambda_nm| {
        let lambda = lambda_nm * 1e-3;
        RAYLEIGH * lambda.powf(-4.0)
    });

    let mie_extinction = spectrum::sample_spectrum(|lambda_nm| {
        let lambda = lambda_nm * 1e-3;
        MIE_ANGSTROM_BETA / MIE_SCALE_HEIGHT * lambda.powf(-MIE_ANGSTROM_ALPHA)
    });
    let mie_scattering = mie_extinction.map(|e| e * MIE_SINGLE_SCATTERING_ALBEDO);

    let max_ozone_number_density = OZONE_COLUMN_DU * DOBSON_UNIT / OZONE_PROFILE_INTEGRAL_M;
    let absorption_extinction = OZONE_CROSS_SECTION.map(|c| max_ozone_number_density * c);

    let unit = LENGTH_UNIT_IN_METERS;
    let exponential = |scale_height: f64| DensityProfile {
        layers: [
            DensityProfileLayer::default(),
            DensityProfileLayer {
                width: 0.0,
                exp_term: 1.0,
                exp_scale: -unit / scale_height,
                linear_term: 0.0,
                constant_term: 0.0,
            },
        ],
    };

    let atmosphere = Atmosphere {
        top_radius: TOP_RADIUS,
        bottom_radius: BOTTOM_RADIUS,
        mu_s_min: MAX_SUN_ZENITH_ANGLE_DEG.to_radians().cos(),
        solar_irradiance: spectrum::to_rgb(&SOLAR_IRRADIANCE, 1.0),
        sun_angular_radius: SUN_ANGULAR_RADIUS,
        rayleigh_scattering: spectrum::to_rgb(&rayleigh_scattering, unit),
        rayleigh_density: exponential(RAYLEIGH_SCALE_HEIGHT),
        mie_scattering: spectrum::to_rgb(&mie_scattering, unit),
        mie_extinction: spectrum::to_rgb(&mie_extinction, unit),
        mie_density: exponential(MIE_SCALE_HEIGHT),
        mie_phase_function_g: MIE_PHASE_FUNCTION_G,
        absorption_extinction: spectrum::to_rgb(&absorption_extinction, unit),
        absorption_density: DensityProfile {
            layers: [
                DensityProfileLayer {
                    width: 25_000.0 / unit,
                    exp_term: 0.0,
                    exp_scale: 0.0,
                    linear_term: unit / 15_000.0,
                    constant_term: -2.0 / 3.0,
                },
                DensityProfileLayer {
                    width: 0.0,
                    exp_term: 0.0,
                    exp_scale: 0.0,
                    linear_term: -unit / 15_000.0,
                    constant_term: 8.0 / 3.0,
                },
            ],
        },
        ground_albedo: DVec3::splat(GROUND_ALBEDO),
    };
    let fixed = SkyFixedConfigs::from_atmosphere(&atmosphere);
    (atmosphere, fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earth_is_valid() {
        assert!(Atmosphere::earth().is_physically_valid());
    }

    #[test]
    fn test_inverted_radii_are_invalid() {
        let mut atmosphere = Atmosphere::earth();
        atmosphere.top_radius = atmosphere.bottom_radius - 1.0;
        assert!(!atmosphere.is_physically_valid());
    }

    #[test]
    fn test_negative_coefficient_is_invalid() {
        let mut atmosphere = Atmosphere::earth();
        atmosphere.mie_extinction.y = -1e-3;
        assert!(!atmosphere.is_physically_valid());
    }

    #[test]
    fn test_layer_density_is_clamped() {
        let layer = DensityProfileLayer {
            width: 0.0,
            exp_term: 0.0,
            exp_scale: 0.0,
            linear_term: 1.0,
            constant_term: 0.0,
        };
        assert_eq!(get_layer_density(&layer, -5.0), 0.0);
        assert_eq!(get_layer_density(&layer, 0.5), 0.5);
        assert_eq!(get_layer_density(&layer, 5.0), 1.0);
    }

    #[test]
    fn test_profile_selects_layer_by_width() {
        let profile = DensityProfile {
            layers: [
                DensityProfileLayer {
                    width: 10.0,
                    constant_term: 0.25,
                    ..Default::default()
                },
                DensityProfileLayer {
                    constant_term: 0.75,
                    ..Default::default()
                },
            ],
        };
        assert_eq!(profile.density(9.999), 0.25);
        assert_eq!(profile.density(10.0), 0.75);
    }

    #[test]
    fn test_rayleigh_density_is_one_at_ground() {
        let atmosphere = Atmosphere::earth();
        assert!((atmosphere.rayleigh_density.density(0.0) - 1.0).abs() < 1e-12);
        let at_scale_height = atmosphere.rayleigh_density.density(8.0);
        assert!((at_scale_height - (-1.0_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_ozone_peaks_at_25km() {
        let atmosphere = Atmosphere::earth();
        let profile = &atmosphere.absorption_density;
        assert_eq!(profile.density(5.0), 0.0);
        assert!((profile.density(25.0) - 1.0).abs() < 1e-12);
        assert!((profile.density(17.5) - 0.5).abs() < 1e-12);
        assert!((profile.density(32.5) - 0.5).abs() < 1e-12);
        assert_eq!(profile.density(45.0), 0.0);
    }

    #[test]
    fn test_mu_s_min_matches_102_degrees() {
        let atmosphere = Atmosphere::earth();
        assert!((atmosphere.mu_s_min - (-0.207_911_690_8)).abs() < 1e-9);
    }

    #[test]
    fn test_fixed_configs_mirror_atmosphere() {
        let (atmosphere, fixed) = initialize_atmosphere();
        assert_eq!(fixed.bottom_radius, 6360.0);
        assert_eq!(fixed.top_radius, 6420.0);
        assert_eq!(fixed.unit_length_in_meters, 1000.0);
        assert_eq!(fixed.mie_phase_function_g, 0.8);
        assert!((f64::from(fixed.rayleigh_scattering[2]) - atmosphere.rayleigh_scattering.z).abs() < 1e-8);
    }

    #[test]
    fn test_fixed_configs_are_pod() {
        let (_, fixed) = initialize_atmosphere();
        let bytes: &[u8] = bytemuck::bytes_of(&fixed);
        assert_eq!(bytes.len(), 15 * 4);
    }
}
