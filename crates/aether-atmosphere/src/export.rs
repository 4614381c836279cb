//! Hand-off of baked tables: in-memory upload to a GPU collaborator, raw table
//! files with RON metadata, and Radiance HDR debug images.

use std::borrow::Cow;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::Rgb;
use image::codecs::hdr::HdrEncoder;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::bake::BakedTables;
use crate::error::ExportError;
use crate::model::SkyFixedConfigs;
use crate::texture::{Texture2D, Texture3D, TextureLayout};

pub const TRANSMITTANCE_TEXTURE: &str = "transmittance_texture";
pub const IRRADIANCE_TEXTURE: &str = "irradiance_texture";
pub const SCATTERING_TEXTURE: &str = "scattering_texture";
pub const METADATA_FILE: &str = "sky.meta.ron";

const RAW_2D_EXTENSION: &str = "rtex2d";
const RAW_3D_EXTENSION: &str = "rtex3d";

/// Receiver of baked tables, typically a renderer creating GPU textures.
pub trait TextureSink {
    fn upload_2d(&mut self, name: &str, texture: &Texture2D);
    fn upload_3d(&mut self, name: &str, texture: &Texture3D);
}

impl BakedTables {
    /// Hand every table to `sink`.
    pub fn upload(&self, sink: &mut impl TextureSink) {
        sink.upload_2d(TRANSMITTANCE_TEXTURE, &self.transmittance);
        sink.upload_2d(IRRADIANCE_TEXTURE, &self.irradiance);
        sink.upload_3d(SCATTERING_TEXTURE, &self.scattering);
    }
}

/// What a runtime needs besides the tables to set up its sky uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyMetadata {
    pub layout: TextureLayout,
    pub fixed: SkyFixedConfigs,
}

impl SkyMetadata {
    pub fn from_tables(tables: &BakedTables) -> Self {
        Self {
            layout: tables.layout,
            fixed: tables.fixed,
        }
    }

    /// Save as `sky.meta.ron` in `dir`, returning the written path.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(METADATA_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ExportError::Metadata)?;
        std::fs::write(&path, serialized).map_err(io_error(&path))?;
        Ok(path)
    }

    /// Load `sky.meta.ron` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ExportError> {
        let path = dir.join(METADATA_FILE);
        let contents = std::fs::read_to_string(&path).map_err(io_error(&path))?;
        ron::from_str(&contents).map_err(ExportError::MetadataParse)
    }
}

/// Which files [`write_outputs`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Raw little-endian `f32` tables.
    pub raw_textures: bool,
    /// Radiance `.hdr` previews, alpha dropped.
    pub debug_hdr: bool,
    /// `sky.meta.ron`.
    pub metadata: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            raw_textures: true,
            debug_hdr: false,
            metadata: true,
        }
    }
}

/// Tables and metadata read back from a directory written by [`write_outputs`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkyTextures {
    pub metadata: SkyMetadata,
    pub transmittance: Texture2D,
    pub irradiance: Texture2D,
    pub scattering: Texture3D,
}

/// Write the selected outputs of a bake into `dir`, creating it if needed.
///
/// Returns the written paths in order.
pub fn write_outputs(
    dir: &Path,
    tables: &BakedTables,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(io_error(dir))?;
    let mut written = Vec::new();

    if options.raw_textures {
        let path = raw_path(dir, TRANSMITTANCE_TEXTURE, RAW_2D_EXTENSION);
        write_raw_2d(&path, &tables.transmittance)?;
        written.push(path);
        let path = raw_path(dir, IRRADIANCE_TEXTURE, RAW_2D_EXTENSION);
        write_raw_2d(&path, &tables.irradiance)?;
        written.push(path);
        let path = raw_path(dir, SCATTERING_TEXTURE, RAW_3D_EXTENSION);
        write_raw_3d(&path, &tables.scattering)?;
        written.push(path);
    }

    if options.debug_hdr {
        let path = raw_path(dir, TRANSMITTANCE_TEXTURE, "hdr");
        write_hdr_2d(&path, &tables.transmittance)?;
        written.push(path);
        let path = raw_path(dir, IRRADIANCE_TEXTURE, "hdr");
        write_hdr_2d(&path, &tables.irradiance)?;
        written.push(path);
        let path = raw_path(dir, SCATTERING_TEXTURE, "hdr");
        write_hdr_3d(&path, &tables.scattering)?;
        written.push(path);
    }

    if options.metadata {
        written.push(SkyMetadata::from_tables(tables).save(dir)?);
    }

    for path in &written {
        info!(path = %path.display(), "wrote sky output");
    }
    Ok(written)
}

/// Read the raw tables and metadata written by [`write_outputs`].
pub fn load_outputs(dir: &Path) -> Result<SkyTextures, ExportError> {
    let metadata = SkyMetadata::load(dir)?;
    let layout = metadata.layout;
    let transmittance = read_raw_2d(
        &raw_path(dir, TRANSMITTANCE_TEXTURE, RAW_2D_EXTENSION),
        layout.transmittance_width as usize,
        layout.transmittance_height as usize,
        3,
    )?;
    let irradiance = read_raw_2d(
        &raw_path(dir, IRRADIANCE_TEXTURE, RAW_2D_EXTENSION),
        layout.irradiance_width as usize,
        layout.irradiance_height as usize,
        3,
    )?;
    let scattering = read_raw_3d(
        &raw_path(dir, SCATTERING_TEXTURE, RAW_3D_EXTENSION),
        layout.scattering_width as usize,
        layout.scattering_height as usize,
        layout.scattering_depth as usize,
        4,
    )?;
    Ok(SkyTextures {
        metadata,
        transmittance,
        irradiance,
        scattering,
    })
}

fn raw_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{name}.{extension}"))
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn le_bytes(data: &[f32]) -> Cow<'_, [u8]> {
    if cfg!(target_endian = "little") {
        Cow::Borrowed(bytemuck::cast_slice(data))
    } else {
        Cow::Owned(data.iter().flat_map(|v| v.to_le_bytes()).collect())
    }
}

fn read_f32s(path: &Path, expected_len: usize) -> Result<Vec<f32>, ExportError> {
    let bytes = std::fs::read(path).map_err(io_error(path))?;
    if bytes.len() != expected_len * size_of::<f32>() {
        return Err(ExportError::ShapeMismatch {
            path: path.to_path_buf(),
            expected: expected_len * size_of::<f32>(),
            found: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(size_of::<f32>())
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

pub fn write_raw_2d(path: &Path, texture: &Texture2D) -> Result<(), ExportError> {
    std::fs::write(path, le_bytes(texture.data())).map_err(io_error(path))
}

pub fn write_raw_3d(path: &Path, texture: &Texture3D) -> Result<(), ExportError> {
    std::fs::write(path, le_bytes(texture.data())).map_err(io_error(path))
}

pub fn read_raw_2d(
    path: &Path,
    width: usize,
    height: usize,
    channels: usize,
) -> Result<Texture2D, ExportError> {
    let expected = width * height * channels;
    let data = read_f32s(path, expected)?;
    let found = data.len();
    Texture2D::from_data(width, height, channels, data)
        .ok_or_else(|| shape_mismatch(path, expected, found))
}

pub fn read_raw_3d(
    path: &Path,
    width: usize,
    height: usize,
    depth: usize,
    channels: usize,
) -> Result<Texture3D, ExportError> {
    let expected = width * height * depth * channels;
    let data = read_f32s(path, expected)?;
    let found = data.len();
    Texture3D::from_data(width, height, depth, channels, data)
        .ok_or_else(|| shape_mismatch(path, expected, found))
}

/// Size mismatch between `expected` and `found` `f32` values, reported in bytes.
fn shape_mismatch(path: &Path, expected: usize, found: usize) -> ExportError {
    ExportError::ShapeMismatch {
        path: path.to_path_buf(),
        expected: expected * size_of::<f32>(),
        found: found * size_of::<f32>(),
    }
}

pub fn write_hdr_2d(path: &Path, texture: &Texture2D) -> Result<(), ExportError> {
    write_hdr(
        path,
        texture.width(),
        texture.height(),
        texture.channels(),
        texture.data(),
    )
}

/// Depth slices are stacked top to bottom.
pub fn write_hdr_3d(path: &Path, texture: &Texture3D) -> Result<(), ExportError> {
    write_hdr(
        path,
        texture.width(),
        texture.height() * texture.depth(),
        texture.channels(),
        texture.data(),
    )
}

fn write_hdr(
    path: &Path,
    width: usize,
    height: usize,
    channels: usize,
    data: &[f32],
) -> Result<(), ExportError> {
    let pixels: Vec<Rgb<f32>> = data
        .chunks_exact(channels.max(1))
        .map(|texel| match *texel {
            [r, g, b, ..] => Rgb([r, g, b]),
            [r, g] => Rgb([r, g, 0.0]),
            [v] => Rgb([v, v, v]),
            [] => Rgb([0.0; 3]),
        })
        .collect();
    let file = File::create(path).map_err(io_error(path))?;
    HdrEncoder::new(BufWriter::new(file))
        .encode(&pixels, width, height)
        .map_err(|source| ExportError::Image {
            path: path.to_path_buf(),
            source,
        })
}
