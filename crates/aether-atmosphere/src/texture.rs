//! Flat `f32` texture buffers and the extents of every baked table.
//!
//! Texels are stored row-major with interleaved channels:
//! `index = ((z * height + y) * width + x) * channels`.

use std::ops::{Add, Mul};

use bytemuck::{Pod, Zeroable};
use glam::{DVec2, DVec3, DVec4};
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// Extents of the transmittance, scattering and irradiance tables.
///
/// The 4D scattering table `(nu, mu_s, mu, r)` is packed into a 3D texture of
/// `(nu_size * mu_s_size) x mu_size x r_size`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
pub struct TextureLayout {
    pub transmittance_width: u32,
    pub transmittance_height: u32,
    pub scattering_r_size: u32,
    pub scattering_mu_size: u32,
    pub scattering_mu_s_size: u32,
    pub scattering_nu_size: u32,
    pub scattering_width: u32,
    pub scattering_height: u32,
    pub scattering_depth: u32,
    pub irradiance_width: u32,
    pub irradiance_height: u32,
}

impl Default for TextureLayout {
    fn default() -> Self {
        Self::new([256, 64], [32, 128, 32, 8], [64, 16])
    }
}

impl TextureLayout {
    /// Build a layout from `[width, height]` of the transmittance table,
    /// `[r, mu, mu_s, nu]` sizes of the scattering table and `[width, height]`
    /// of the irradiance table.
    pub fn new(transmittance: [u32; 2], scattering: [u32; 4], irradiance: [u32; 2]) -> Self {
        let [r, mu, mu_s, nu] = scattering;
        Self {
            transmittance_width: transmittance[0],
            transmittance_height: transmittance[1],
            scattering_r_size: r,
            scattering_mu_size: mu,
            scattering_mu_s_size: mu_s,
            scattering_nu_size: nu,
            scattering_width: nu * mu_s,
            scattering_height: mu,
            scattering_depth: r,
            irradiance_width: irradiance[0],
            irradiance_height: irradiance[1],
        }
    }

    /// Check that the parameterization can address every table of this layout.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let extents = [
            ("transmittance width", self.transmittance_width),
            ("transmittance height", self.transmittance_height),
            ("scattering r size", self.scattering_r_size),
            ("scattering mu size", self.scattering_mu_size),
            ("scattering mu_s size", self.scattering_mu_s_size),
            ("scattering nu size", self.scattering_nu_size),
            ("irradiance width", self.irradiance_width),
            ("irradiance height", self.irradiance_height),
        ];
        for (name, value) in extents {
            if value < 2 {
                return Err(LayoutError::ExtentTooSmall { name, value });
            }
        }
        if self.scattering_mu_size % 2 != 0 {
            return Err(LayoutError::OddMuSize(self.scattering_mu_size));
        }
        let derived = [
            (
                "scattering width",
                self.scattering_width,
                self.scattering_nu_size * self.scattering_mu_s_size,
            ),
            ("scattering height", self.scattering_height, self.scattering_mu_size),
            ("scattering depth", self.scattering_depth, self.scattering_r_size),
        ];
        for (name, value, expected) in derived {
            if value != expected {
                return Err(LayoutError::Inconsistent {
                    name,
                    value,
                    expected,
                });
            }
        }
        Ok(())
    }

    pub fn transmittance_texture(&self) -> Texture2D {
        Texture2D::new(
            self.transmittance_width as usize,
            self.transmittance_height as usize,
            3,
        )
    }

    pub fn irradiance_texture(&self) -> Texture2D {
        Texture2D::new(
            self.irradiance_width as usize,
            self.irradiance_height as usize,
            3,
        )
    }

    /// A zeroed scattering-shaped texture with `channels` channels.
    pub fn scattering_texture(&self, channels: usize) -> Texture3D {
        Texture3D::new(
            self.scattering_width as usize,
            self.scattering_height as usize,
            self.scattering_depth as usize,
            channels,
        )
    }
}

/// A mutable row (2D) or depth slice (3D) of a texture, handed to one worker.
#[derive(Debug)]
pub struct SliceMut<'a> {
    /// Row index for 2D textures, depth index for 3D textures.
    pub index: usize,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: &'a mut [f32],
}

impl SliceMut<'_> {
    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y * self.width + x) * self.channels
    }

    pub fn set_rgb(&mut self, x: usize, y: usize, value: DVec3) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&value.as_vec3().to_array());
    }

    pub fn set_rgba(&mut self, x: usize, y: usize, value: DVec4) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&value.as_vec4().to_array());
    }

    /// Add `value` to the first three channels of texel `(x, y)`.
    pub fn add_rgb(&mut self, x: usize, y: usize, value: DVec3) {
        let i = self.offset(x, y);
        for (texel, v) in self.data[i..i + 3].iter_mut().zip(value.to_array()) {
            *texel += v as f32;
        }
    }
}

/// Convert a normalized coordinate to a lower texel index, interpolation weight
/// and upper texel index, clamped to the edge.
#[inline]
fn texel_span(u: f64, size: usize) -> (usize, f64, usize) {
    let x = u * size as f64 - 0.5;
    let base = x.floor();
    let t = x - base;
    let last = size as i64 - 1;
    let i = base as i64;
    (i.clamp(0, last) as usize, t, (i + 1).clamp(0, last) as usize)
}

/// A 2D texture of `f32` texels.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture2D {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<f32>,
}

impl Texture2D {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
            data: vec![0.0; width * height * channels],
        }
    }

    /// Wrap an existing buffer. Returns `None` if its length does not match the shape.
    pub fn from_data(width: usize, height: usize, channels: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == width * height * channels).then_some(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y * self.width + x) * self.channels
    }

    /// Channels of texel `(x, y)`.
    pub fn texel(&self, x: usize, y: usize) -> &[f32] {
        let i = self.offset(x, y);
        &self.data[i..i + self.channels]
    }

    /// First three channels of texel `(x, y)`.
    pub fn rgb(&self, x: usize, y: usize) -> DVec3 {
        let i = self.offset(x, y);
        DVec3::new(
            f64::from(self.data[i]),
            f64::from(self.data[i + 1]),
            f64::from(self.data[i + 2]),
        )
    }

    pub fn set_rgb(&mut self, x: usize, y: usize, value: DVec3) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&value.as_vec3().to_array());
    }

    /// Bilinear RGB lookup at normalized coordinates, clamped to the edge.
    pub fn sample_rgb(&self, uv: DVec2) -> DVec3 {
        let (x0, u, x1) = texel_span(uv.x, self.width);
        let (y0, v, y1) = texel_span(uv.y, self.height);
        self.rgb(x0, y0) * ((1.0 - u) * (1.0 - v))
            + self.rgb(x1, y0) * (u * (1.0 - v))
            + self.rgb(x0, y1) * ((1.0 - u) * v)
            + self.rgb(x1, y1) * (u * v)
    }

    /// Disjoint mutable rows, one per `y`.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = SliceMut<'_>> {
        let (width, channels) = (self.width, self.channels);
        self.data
            .chunks_mut(width * channels)
            .enumerate()
            .map(move |(index, data)| SliceMut {
                index,
                width,
                height: 1,
                channels,
                data,
            })
    }

    /// Component-wise `self += other`. Both textures must share a shape.
    pub fn add_assign(&mut self, other: &Texture2D) {
        debug_assert_eq!(
            (self.width, self.height, self.channels),
            (other.width, other.height, other.channels)
        );
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }
}

/// A 3D texture of `f32` texels.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture3D {
    width: usize,
    height: usize,
    depth: usize,
    channels: usize,
    data: Vec<f32>,
}

impl Texture3D {
    pub fn new(width: usize, height: usize, depth: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            depth,
            channels,
            data: vec![0.0; width * height * depth * channels],
        }
    }

    /// Wrap an existing buffer. Returns `None` if its length does not match the shape.
    pub fn from_data(
        width: usize,
        height: usize,
        depth: usize,
        channels: usize,
        data: Vec<f32>,
    ) -> Option<Self> {
        (data.len() == width * height * depth * channels).then_some(Self {
            width,
            height,
            depth,
            channels,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.width && y < self.height && z < self.depth);
        ((z * self.height + y) * self.width + x) * self.channels
    }

    /// Channels of texel `(x, y, z)`.
    pub fn texel(&self, x: usize, y: usize, z: usize) -> &[f32] {
        let i = self.offset(x, y, z);
        &self.data[i..i + self.channels]
    }

    /// First three channels of texel `(x, y, z)`.
    pub fn rgb(&self, x: usize, y: usize, z: usize) -> DVec3 {
        let i = self.offset(x, y, z);
        DVec3::new(
            f64::from(self.data[i]),
            f64::from(self.data[i + 1]),
            f64::from(self.data[i + 2]),
        )
    }

    /// The flat buffer of depth slice `z`.
    pub fn slice(&self, z: usize) -> &[f32] {
        let len = self.width * self.height * self.channels;
        &self.data[z * len..(z + 1) * len]
    }

    /// All four channels of texel `(x, y, z)`, with missing channels read as zero.
    pub fn rgba(&self, x: usize, y: usize, z: usize) -> DVec4 {
        let texel = self.texel(x, y, z);
        let channel = |c: usize| texel.get(c).copied().map_or(0.0, f64::from);
        DVec4::new(channel(0), channel(1), channel(2), channel(3))
    }

    /// Trilinear RGB lookup at normalized coordinates, clamped to the edge.
    pub fn sample_rgb(&self, uvw: DVec3) -> DVec3 {
        self.trilinear(uvw, |x, y, z| self.rgb(x, y, z))
    }

    /// Trilinear RGBA lookup at normalized coordinates, clamped to the edge.
    pub fn sample_rgba(&self, uvw: DVec3) -> DVec4 {
        self.trilinear(uvw, |x, y, z| self.rgba(x, y, z))
    }

    fn trilinear<T>(&self, uvw: DVec3, fetch: impl Fn(usize, usize, usize) -> T) -> T
    where
        T: Add<Output = T> + Mul<f64, Output = T>,
    {
        let (x0, u, x1) = texel_span(uvw.x, self.width);
        let (y0, v, y1) = texel_span(uvw.y, self.height);
        let (z0, w, z1) = texel_span(uvw.z, self.depth);
        let front = fetch(x0, y0, z0) * ((1.0 - u) * (1.0 - v))
            + fetch(x1, y0, z0) * (u * (1.0 - v))
            + fetch(x0, y1, z0) * ((1.0 - u) * v)
            + fetch(x1, y1, z0) * (u * v);
        let back = fetch(x0, y0, z1) * ((1.0 - u) * (1.0 - v))
            + fetch(x1, y0, z1) * (u * (1.0 - v))
            + fetch(x0, y1, z1) * ((1.0 - u) * v)
            + fetch(x1, y1, z1) * (u * v);
        front * (1.0 - w) + back * w
    }

    /// Disjoint mutable depth slices, one per `z`.
    pub fn slices_mut(&mut self) -> impl Iterator<Item = SliceMut<'_>> {
        let (width, height, channels) = (self.width, self.height, self.channels);
        self.data
            .chunks_mut(width * height * channels)
            .enumerate()
            .map(move |(index, data)| SliceMut {
                index,
                width,
                height,
                channels,
                data,
            })
    }

    /// Component-wise `self += other`. Both textures must share a shape.
    pub fn add_assign(&mut self, other: &Texture3D) {
        debug_assert_eq!(
            (self.width, self.height, self.depth, self.channels),
            (other.width, other.height, other.depth, other.channels)
        );
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }
}
