//! Lookups into 4D scattering tables packed as 3D textures.

use glam::{DVec3, DVec4};

use crate::model::Atmosphere;
use crate::parameterization::{ScatteringCoords, get_scattering_texture_uvwz_from_r_mu_mu_s_nu};
use crate::phase::{mie_phase_function, rayleigh_phase_function};
use crate::texture::{Texture3D, TextureLayout};

/// Quadrilinear lookup of a scattering-shaped texture: two trilinear lookups in
/// the adjacent `nu` slices, blended by the fractional `nu` position.
pub fn get_scattering(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    texture: &Texture3D,
    coords: &ScatteringCoords,
) -> DVec3 {
    let (uvw0, uvw1, lerp) = nu_slice_coords(atmosphere, layout, coords);
    texture.sample_rgb(uvw0) * (1.0 - lerp) + texture.sample_rgb(uvw1) * lerp
}

/// [`get_scattering`] including the alpha channel.
pub fn get_scattering_rgba(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    texture: &Texture3D,
    coords: &ScatteringCoords,
) -> DVec4 {
    let (uvw0, uvw1, lerp) = nu_slice_coords(atmosphere, layout, coords);
    texture.sample_rgba(uvw0) * (1.0 - lerp) + texture.sample_rgba(uvw1) * lerp
}

/// 3D coordinates in the two `nu` slices bracketing `coords`, and the blend weight.
fn nu_slice_coords(
    atmosphere: &Atmosphere,
    layout: &TextureLayout,
    coords: &ScatteringCoords,
) -> (DVec3, DVec3, f64) {
    let uvwz = get_scattering_texture_uvwz_from_r_mu_mu_s_nu(atmosphere, layout, coords);
    let nu_size = f64::from(layout.scattering_nu_size);
    let tex_coord_x = uvwz.x * (nu_size - 1.0);
    let tex_x = tex_coord_x.floor();
    let lerp = tex_coord_x - tex_x;
    let uvw0 = DVec3::new((tex_x + uvwz.y) / nu_size, uvwz.z, uvwz.w);
    let uvw1 = DVec3::new((tex_x + 1.0 + uvwz.y) / nu_size, uvwz.z, uvwz.w);
    (uvw0, uvw1, lerp)
}

/// Radiance scattered `n` times, as read by the stages of order `n + 1`.
#[derive(Clone, Copy, Debug)]
pub enum ScatteringSource<'a> {
    /// First order, stored without phase functions as separate Rayleigh and Mie tables.
    Single {
        rayleigh: &'a Texture3D,
        mie: &'a Texture3D,
    },
    /// Higher orders, with phase functions already folded in.
    Multiple(&'a Texture3D),
}

impl ScatteringSource<'_> {
    /// Whether this source holds single scattering.
    pub fn is_single(&self) -> bool {
        matches!(self, ScatteringSource::Single { .. })
    }

    /// In-scattered radiance arriving along the ray described by `coords`.
    pub fn radiance(
        &self,
        atmosphere: &Atmosphere,
        layout: &TextureLayout,
        coords: &ScatteringCoords,
    ) -> DVec3 {
        match *self {
            ScatteringSource::Single { rayleigh, mie } => {
                let rayleigh = get_scattering(atmosphere, layout, rayleigh, coords);
                let mie = get_scattering(atmosphere, layout, mie, coords);
                rayleigh * rayleigh_phase_function(coords.nu)
                    + mie * mie_phase_function(atmosphere.mie_phase_function_g, coords.nu)
            }
            ScatteringSource::Multiple(texture) => {
                get_scattering(atmosphere, layout, texture, coords)
            }
        }
    }
}

/// Owned per-order scattering delta, kept by the orchestrator between orders.
#[derive(Clone, Debug)]
pub enum ScatteringDelta {
    Single {
        rayleigh: Texture3D,
        mie: Texture3D,
    },
    Multiple(Texture3D),
}

impl ScatteringDelta {
    pub fn source(&self) -> ScatteringSource<'_> {
        match self {
            ScatteringDelta::Single { rayleigh, mie } => ScatteringSource::Single { rayleigh, mie },
            ScatteringDelta::Multiple(texture) => ScatteringSource::Multiple(texture),
        }
    }
}
