//! Precomputed atmospheric scattering for the Aether sky renderer.
//!
//! Bakes transmittance, ground irradiance and multiple-scattering tables for a
//! planetary atmosphere on the CPU. The tables are parameterized by altitude and
//! view/sun angles so that a sky shader can render the sky from any viewpoint
//! with a handful of texture lookups. The same lookups are available on the CPU
//! through the `sky` functions.

mod bake;
mod error;
mod executor;
mod export;
mod geometry;
mod irradiance;
mod model;
mod multiple_scattering;
mod parameterization;
mod phase;
mod scattering;
mod scattering_density;
mod single_scattering;
mod sky;
mod spectrum;
mod texture;
mod transmittance;
mod uniforms;

pub use bake::{BakeOrchestrator, BakeStage, BakedTables, DEFAULT_MAX_SCATTERING_ORDER, StageTiming};
pub use error::{ExportError, LayoutError};
pub use executor::{BakeExecutor, WORKER_THREAD_NAME};
pub use export::{
    ExportOptions, IRRADIANCE_TEXTURE, METADATA_FILE, SCATTERING_TEXTURE, SkyMetadata, SkyTextures,
    TRANSMITTANCE_TEXTURE, TextureSink, load_outputs, read_raw_2d, read_raw_3d, write_hdr_2d,
    write_hdr_3d, write_outputs, write_raw_2d, write_raw_3d,
};
pub use geometry::{
    clamp_cosine, clamp_radius, distance_to_bottom_atmosphere_boundary, distance_to_horizon,
    distance_to_nearest_atmosphere_boundary, distance_to_top_atmosphere_boundary, mu_horizon,
    ray_intersects_ground, safe_sqrt,
};
pub use irradiance::{
    compute_direct_irradiance, compute_indirect_irradiance, generate_direct_irradiance_texture,
    generate_indirect_irradiance_texture, get_irradiance,
};
pub use model::{
    Atmosphere, DensityProfile, DensityProfileLayer, LENGTH_UNIT_IN_METERS, SkyFixedConfigs,
    get_layer_density, get_profile_density, initialize_atmosphere,
};
pub use multiple_scattering::{compute_multiple_scattering, generate_multiple_scattering_texture};
pub use parameterization::{
    ScatteringCoords, get_irradiance_texture_uv_from_r_mu_s, get_r_mu_from_transmittance_texture_uv,
    get_r_mu_mu_s_nu_from_scattering_texture_fragcoord,
    get_r_mu_mu_s_nu_from_scattering_texture_uvwz, get_r_mu_s_from_irradiance_texture_uv,
    get_scattering_texture_uvwz_from_r_mu_mu_s_nu, get_texture_coord_from_unit_range,
    get_transmittance_texture_uv_from_r_mu, get_unit_range_from_texture_coord,
    scattering_texel_coords,
};
pub use phase::{mie_phase_function, rayleigh_phase_function};
pub use scattering::{ScatteringDelta, ScatteringSource, get_scattering, get_scattering_rgba};
pub use scattering_density::{
    ScatteringDensityInputs, compute_scattering_density, generate_scattering_density_texture,
};
pub use single_scattering::{
    SingleScattering, compute_single_scattering, generate_single_scattering_texture,
};
pub use sky::{
    earth_center, get_combined_scattering, is_sky_visible, sky_radiance, solar_radiance,
    sun_and_sky_irradiance,
};
pub use spectrum::{
    LAMBDA_B, LAMBDA_COUNT, LAMBDA_G, LAMBDA_MAX, LAMBDA_MIN, LAMBDA_R, OZONE_CROSS_SECTION,
    SOLAR_IRRADIANCE, Spectrum, interpolate, sample_spectrum, to_rgb, wavelengths,
};
pub use texture::{SliceMut, Texture2D, Texture3D, TextureLayout};
pub use transmittance::{
    compute_optical_length_to_top_atmosphere_boundary,
    compute_transmittance_to_top_atmosphere_boundary, compute_transmittance_texel,
    generate_transmittance_texture, get_transmittance, get_transmittance_to_sun,
    get_transmittance_to_top_atmosphere_boundary,
};
pub use uniforms::{AtmosphereUniform, DEFAULT_EXPOSURE, SkyConfigsUniform, TextureInfoUniform};
