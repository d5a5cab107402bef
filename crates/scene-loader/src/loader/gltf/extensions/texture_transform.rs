use serde::Deserialize;
use serde_json::Value;

use crate::texture::TextureAssetTransform;

use super::{super::GltfLoaderError, parse_extension_value, KHR_TEXTURE_TRANSFORM};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextureTransformDef {
    offset: Option<[f32; 2]>,
    rotation: Option<f32>,
    scale: Option<[f32; 2]>,
    tex_coord: Option<usize>,
}

/// Reads the UV transform of a texture slot.
pub fn parse_texture_transform(value: &Value) -> Result<TextureAssetTransform, GltfLoaderError> {
    let def: TextureTransformDef = parse_extension_value(KHR_TEXTURE_TRANSFORM, value)?;
    let default = TextureAssetTransform::default();
    Ok(TextureAssetTransform {
        offset: def.offset.unwrap_or(default.offset),
        rotation: def.rotation.unwrap_or(default.rotation),
        scale: def.scale.unwrap_or(default.scale),
        tex_coord: def.tex_coord,
    })
}
