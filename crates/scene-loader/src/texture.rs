use std::sync::Arc;

use glam::{Mat3, Vec2};

use crate::{index::AssetIndex, node::UserData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAssetFormat {
    Ru8,
    Rgu8,
    Rgbu8,
    Rgbau8,
    Ru16,
    Rgu16,
    Rgbu16,
    Rgbau16,
}

/// Decoded pixels of one image definition, shared by every texture that
/// samples it.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub id: AssetIndex,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: (u32, u32),
    pub format: TextureAssetFormat,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct TextureAsset {
    pub id: AssetIndex,
    pub name: String,
    pub image: Arc<ImageAsset>,
    pub sampler: SamplerAsset,
    pub user_data: UserData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureMagFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureMinFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureMipmapFilter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextureWrappingMode {
    ClampToEdge,
    MirroredRepeat,
    #[default]
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerAsset {
    pub mag_filter: TextureMagFilter,
    pub min_filter: TextureMinFilter,
    /// `None` when the minification filter does not sample mipmaps.
    pub mipmap_filter: Option<TextureMipmapFilter>,
    pub wrap_x: TextureWrappingMode,
    pub wrap_y: TextureWrappingMode,
}

impl Default for SamplerAsset {
    fn default() -> Self {
        Self {
            mag_filter: TextureMagFilter::Linear,
            min_filter: TextureMinFilter::Linear,
            mipmap_filter: Some(TextureMipmapFilter::Linear),
            wrap_x: TextureWrappingMode::Repeat,
            wrap_y: TextureWrappingMode::Repeat,
        }
    }
}

impl SamplerAsset {
    pub fn generate_mipmaps(&self) -> bool {
        self.mipmap_filter.is_some()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorSpace {
    #[default]
    Linear,
    Srgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureAssetTransform {
    pub offset: [f32; 2],
    pub rotation: f32,
    pub scale: [f32; 2],
    pub tex_coord: Option<usize>,
}

impl Default for TextureAssetTransform {
    fn default() -> Self {
        Self {
            offset: [0.0, 0.0],
            rotation: 0.0,
            scale: [1.0, 1.0],
            tex_coord: None,
        }
    }
}

impl TextureAssetTransform {
    /// UV matrix, translation * rotation * scale.
    pub fn matrix(&self) -> Mat3 {
        let (sin, cos) = self.rotation.sin_cos();
        let rotation = Mat3::from_cols_array(&[cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0]);
        Mat3::from_translation(Vec2::from_array(self.offset))
            * rotation
            * Mat3::from_scale(Vec2::from_array(self.scale))
    }
}

/// Binding of a texture into one material slot. Each slot owns its own
/// binding, so UV overrides never touch the shared texture.
#[derive(Debug, Clone)]
pub struct TextureInfo {
    pub texture: Arc<TextureAsset>,
    pub tex_coord: usize,
    pub transform: Option<TextureAssetTransform>,
    pub color_space: ColorSpace,
}

impl TextureInfo {
    pub fn from_texture(texture: Arc<TextureAsset>) -> Self {
        Self {
            texture,
            tex_coord: 0,
            transform: None,
            color_space: ColorSpace::Linear,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalTextureInfo {
    pub info: TextureInfo,
    pub scale: f32,
}

#[derive(Debug, Clone)]
pub struct OcclusionTextureInfo {
    pub info: TextureInfo,
    pub strength: f32,
}

#[derive(Debug, Clone)]
pub struct ShadingShiftTextureInfo {
    pub info: TextureInfo,
    pub scale: f32,
}
