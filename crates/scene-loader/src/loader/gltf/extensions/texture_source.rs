//! EXT_texture_webp, EXT_texture_avif and KHR_texture_basisu.
//!
//! Each names an alternative image for a texture. The alternative is used
//! when the image decoder understands its format; otherwise the texture
//! falls back to its core source, unless the extension is required.

use std::sync::Arc;

use futures::FutureExt;
use log::debug;
use serde::Deserialize;

use crate::texture::TextureAsset;

use super::{
    super::{plugin::PluginFuture, GltfLoaderError, GltfParser},
    extension_data, GltfPlugin,
};

#[derive(Debug, Deserialize)]
struct TextureSourceDef {
    source: usize,
}

pub struct TextureSourcePlugin {
    name: &'static str,
    mime_type: &'static str,
}

impl TextureSourcePlugin {
    pub fn new(name: &'static str, mime_type: &'static str) -> Self {
        Self { name, mime_type }
    }
}

impl GltfPlugin for TextureSourcePlugin {
    fn name(&self) -> &str {
        self.name
    }

    fn load_texture(
        &self,
        parser: &Arc<GltfParser>,
        index: usize,
    ) -> Option<PluginFuture<Option<Arc<TextureAsset>>>> {
        let texture = parser.document().texture(index).ok()?;
        let def = match extension_data::<TextureSourceDef>(&texture.extensions, self.name) {
            Ok(def) => def?,
            Err(error) => return Some(async move { Err(error) }.boxed()),
        };
        if !parser.image_decoder().supports(self.mime_type) {
            if parser.document().is_extension_required(self.name) {
                let error = GltfLoaderError::MissingDecoder(self.mime_type.to_string());
                return Some(async move { Err(error) }.boxed());
            }
            debug!(
                "{} unsupported, texture #{} uses its core source",
                self.mime_type, index
            );
            return None;
        }
        let pending = parser.load_texture_image(index, def.source);
        Some(async move { Ok(Some(pending.await?)) }.boxed())
    }
}
