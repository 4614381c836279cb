//! std140 uniform blocks consumed by the sky shader alongside the baked tables.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::model::SkyFixedConfigs;
use crate::texture::TextureLayout;

/// Exposure applied by the sky shader before tone mapping.
pub const DEFAULT_EXPOSURE: f32 = 10.0;

/// Atmosphere constants. Matches the shader's `AtmosphereData` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct AtmosphereUniform {
    /// Solar irradiance at the top of the atmosphere, `w` unused. (offset 0)
    pub solar_irradiance: [f32; 4],
    /// Rayleigh scattering at sea level, `w` unused. (offset 16)
    pub rayleigh_scattering: [f32; 4],
    /// Mie scattering at sea level. (offset 32)
    pub mie_scattering: [f32; 3],
    /// Sun angular radius in radians. (offset 44)
    pub sun_angular_radius: f32,
    /// (offset 48)
    pub bottom_radius: f32,
    /// (offset 52)
    pub top_radius: f32,
    /// (offset 56)
    pub mie_phase_function_g: f32,
    /// (offset 60)
    pub mu_s_min: f32,
}

impl AtmosphereUniform {
    pub fn from_fixed(fixed: &SkyFixedConfigs) -> Self {
        let [sr, sg, sb] = fixed.solar_irradiance;
        let [rr, rg, rb] = fixed.rayleigh_scattering;
        Self {
            solar_irradiance: [sr, sg, sb, 0.0],
            rayleigh_scattering: [rr, rg, rb, 0.0],
            mie_scattering: fixed.mie_scattering,
            sun_angular_radius: fixed.sun_angular_radius,
            bottom_radius: fixed.bottom_radius,
            top_radius: fixed.top_radius,
            mie_phase_function_g: fixed.mie_phase_function_g,
            mu_s_min: fixed.mu_s_min,
        }
    }
}

/// Table extents. Matches the shader's `TextureInfoData` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TextureInfoUniform {
    /// (offset 0)
    pub transmittance_width: i32,
    /// (offset 4)
    pub transmittance_height: i32,
    /// (offset 8)
    pub scattering_r_size: i32,
    /// (offset 12)
    pub scattering_mu_size: i32,
    /// (offset 16)
    pub scattering_mu_s_size: i32,
    /// (offset 20)
    pub scattering_nu_size: i32,
    /// (offset 24)
    pub scattering_width: i32,
    /// (offset 28)
    pub scattering_height: i32,
    /// (offset 32)
    pub scattering_depth: i32,
    /// (offset 36)
    pub irradiance_width: i32,
    /// (offset 40)
    pub irradiance_height: i32,
    /// Padding to a 16-byte multiple. (offset 44)
    pub _pad: i32,
}

impl TextureInfoUniform {
    pub fn from_layout(layout: &TextureLayout) -> Self {
        let extent = |value: u32| i32::try_from(value).unwrap_or(i32::MAX);
        Self {
            transmittance_width: extent(layout.transmittance_width),
            transmittance_height: extent(layout.transmittance_height),
            scattering_r_size: extent(layout.scattering_r_size),
            scattering_mu_size: extent(layout.scattering_mu_size),
            scattering_mu_s_size: extent(layout.scattering_mu_s_size),
            scattering_nu_size: extent(layout.scattering_nu_size),
            scattering_width: extent(layout.scattering_width),
            scattering_height: extent(layout.scattering_height),
            scattering_depth: extent(layout.scattering_depth),
            irradiance_width: extent(layout.irradiance_width),
            irradiance_height: extent(layout.irradiance_height),
            _pad: 0,
        }
    }
}

/// Per-frame view state. Matches the shader's `ConfigsData` block.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SkyConfigsUniform {
    /// Camera position in length units, `w = 1`. (offset 0)
    pub camera: [f32; 4],
    /// (offset 16)
    pub white_point: [f32; 4],
    /// Planet centre relative to the world origin, `w = 1`. (offset 32)
    pub earth_center: [f32; 4],
    /// Normalized direction towards the sun, `w = 0`. (offset 48)
    pub sun_direction: [f32; 4],
    /// `(tan, cos)` of the sun angular radius. (offset 64)
    pub sun_size: [f32; 2],
    /// (offset 72)
    pub exposure: f32,
    /// (offset 76)
    pub unit_length_in_meters: f32,
}

impl SkyConfigsUniform {
    /// View state for a camera at `camera` with the planet surface under the world origin.
    pub fn new(fixed: &SkyFixedConfigs, camera: Vec3, sun_direction: Vec3) -> Self {
        let sun = sun_direction.normalize_or_zero();
        Self {
            camera: camera.extend(1.0).to_array(),
            white_point: [1.0; 4],
            earth_center: [0.0, 0.0, -fixed.bottom_radius, 1.0],
            sun_direction: sun.extend(0.0).to_array(),
            sun_size: [
                fixed.sun_angular_radius.tan(),
                fixed.sun_angular_radius.cos(),
            ],
            exposure: DEFAULT_EXPOSURE,
            unit_length_in_meters: fixed.unit_length_in_meters,
        }
    }
}
