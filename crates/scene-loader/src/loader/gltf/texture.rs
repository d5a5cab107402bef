use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use serde_json::Value;

use crate::{
    index::{AssetIndex, AssetKind},
    loader::texture::ImageDecodeError,
    texture::{
        ColorSpace, ImageAsset, SamplerAsset, TextureAsset, TextureInfo, TextureMagFilter,
        TextureMinFilter, TextureMipmapFilter, TextureWrappingMode,
    },
};

use super::{
    document::{SamplerDef, TextureInfoDef},
    extensions::{texture_transform::parse_texture_transform, KHR_TEXTURE_TRANSFORM},
    plugin::{PluginFuture, PluginHook},
    scheme::Scheme,
    GltfLoaderError, GltfParser, LoadWarning, Pending,
};

fn wrapping_mode(code: u32) -> TextureWrappingMode {
    match code {
        33071 => TextureWrappingMode::ClampToEdge,
        33648 => TextureWrappingMode::MirroredRepeat,
        _ => TextureWrappingMode::Repeat,
    }
}

pub(super) fn load_texture_sampler(sampler: &SamplerDef) -> SamplerAsset {
    let (min_filter, mipmap_filter) = match sampler.min_filter {
        Some(9728) => (TextureMinFilter::Nearest, None),
        Some(9729) => (TextureMinFilter::Linear, None),
        Some(9984) => (TextureMinFilter::Nearest, Some(TextureMipmapFilter::Nearest)),
        Some(9985) => (TextureMinFilter::Linear, Some(TextureMipmapFilter::Nearest)),
        Some(9986) => (TextureMinFilter::Nearest, Some(TextureMipmapFilter::Linear)),
        _ => (TextureMinFilter::Linear, Some(TextureMipmapFilter::Linear)),
    };
    SamplerAsset {
        mag_filter: match sampler.mag_filter {
            Some(9728) => TextureMagFilter::Nearest,
            _ => TextureMagFilter::Linear,
        },
        min_filter,
        mipmap_filter,
        wrap_x: wrapping_mode(sampler.wrap_s),
        wrap_y: wrapping_mode(sampler.wrap_t),
    }
}

impl GltfParser {
    /// Loads a texture. A texture that fails to load is reported as a
    /// warning and resolves to `None`; it never fails the parse.
    pub fn load_texture(self: &Arc<Self>, index: usize) -> Pending<Option<Arc<TextureAsset>>> {
        let parser = self.clone();
        self.caches.textures.get_or_create(index, move || {
            let future = parser
                .plugins
                .invoke_one(PluginHook::LoadTexture, |plugin| {
                    plugin.load_texture(&parser, index)
                })
                .unwrap_or_else(|| parser.default_load_texture(index));
            async move {
                match future.await {
                    Ok(texture) => Ok(texture),
                    Err(error) => {
                        parser.warn(LoadWarning::TextureLoadFailed {
                            texture: index,
                            reason: error.to_string(),
                        });
                        Ok(None)
                    }
                }
            }
            .boxed()
        })
    }

    fn default_load_texture(
        self: &Arc<Self>,
        index: usize,
    ) -> PluginFuture<Option<Arc<TextureAsset>>> {
        let parser = self.clone();
        async move {
            let texture = parser.document.texture(index)?;
            match texture.source {
                Some(source) => Ok(Some(parser.load_texture_image(index, source).await?)),
                None => Ok(None),
            }
        }
        .boxed()
    }

    /// Builds texture `index` from image `source`. Textures with the same
    /// source and sampler share one asset.
    pub fn load_texture_image(
        self: &Arc<Self>,
        index: usize,
        source: usize,
    ) -> Pending<Arc<TextureAsset>> {
        let sampler = self
            .document
            .textures
            .get(index)
            .and_then(|texture| texture.sampler);
        let parser = self.clone();
        self.caches
            .texture_sources
            .get_or_create((source, sampler), move || {
                async move {
                    let texture = parser.document.texture(index)?;
                    let image = parser.load_image_source(source).await?;
                    let sampler = sampler
                        .map(|sampler| parser.document.sampler(sampler).map(load_texture_sampler))
                        .transpose()?
                        .unwrap_or_default();
                    let name = texture
                        .name
                        .clone()
                        .or_else(|| image.name.clone())
                        .unwrap_or_default();
                    Ok(Arc::new(TextureAsset {
                        id: AssetIndex::new(AssetKind::Texture, index),
                        name,
                        image,
                        sampler,
                        user_data: parser.user_data(&texture.extras, &texture.extensions),
                    }))
                }
                .boxed()
            })
    }

    /// Fetches and decodes an image, from a buffer view or an URI.
    pub fn load_image_source(self: &Arc<Self>, index: usize) -> Pending<Arc<ImageAsset>> {
        let parser = self.clone();
        self.caches.images.get_or_create(index, move || {
            async move {
                let image = parser.document.image(index)?;
                let (data, mime_type) = match (image.buffer_view, &image.uri) {
                    (Some(view), _) => (parser.load_buffer_view(view).await?, image.mime_type.clone()),
                    (None, Some(uri)) => match Scheme::try_from(uri.as_str())? {
                        Scheme::Data(mime_type, data) => {
                            (Bytes::from(data), image.mime_type.clone().or(mime_type))
                        }
                        Scheme::Relative(path) | Scheme::Absolute(path) => {
                            (parser.resources.load(&path).await?, image.mime_type.clone())
                        }
                    },
                    (None, None) => {
                        return Err(GltfLoaderError::Image(index, ImageDecodeError::UnknownFormat))
                    }
                };
                let decoded = parser
                    .image_decoder
                    .decode(&data, mime_type.as_deref())
                    .map_err(|error| GltfLoaderError::Image(index, error))?;
                Ok(Arc::new(ImageAsset {
                    id: AssetIndex::new(AssetKind::Image, index),
                    name: image.name.clone(),
                    mime_type,
                    size: decoded.size,
                    format: decoded.format,
                    data: decoded.data,
                }))
            }
            .boxed()
        })
    }

    /// Resolves the texture of a material slot. Each call returns its own
    /// binding, carrying the slot's UV set and transform.
    pub fn assign_texture(
        self: &Arc<Self>,
        info: Option<&TextureInfoDef>,
        color_space: ColorSpace,
    ) -> PluginFuture<Option<TextureInfo>> {
        let Some(info) = info else {
            return async { Ok(None) }.boxed();
        };
        let texture = self.load_texture(info.index);
        let transform = if self.plugins.contains(KHR_TEXTURE_TRANSFORM) {
            info.extensions
                .get(KHR_TEXTURE_TRANSFORM)
                .map(parse_texture_transform)
                .transpose()
        } else {
            Ok(None)
        };
        let tex_coord = info.tex_coord;
        async move {
            let transform = transform?;
            let Some(texture) = texture.await? else {
                return Ok(None);
            };
            Ok(Some(TextureInfo {
                texture,
                tex_coord: transform
                    .as_ref()
                    .and_then(|transform| transform.tex_coord)
                    .unwrap_or(tex_coord),
                transform,
                color_space,
            }))
        }
        .boxed()
    }

    /// [`assign_texture`](Self::assign_texture) for a slot stored in
    /// extension data.
    pub fn assign_texture_value(
        self: &Arc<Self>,
        value: Option<&Value>,
        color_space: ColorSpace,
    ) -> PluginFuture<Option<TextureInfo>> {
        match value
            .map(|value| serde_json::from_value::<TextureInfoDef>(value.clone()))
            .transpose()
        {
            Ok(info) => self.assign_texture(info.as_ref(), color_space),
            Err(error) => {
                let error = GltfLoaderError::BadExtensionData(error.to_string());
                async move { Err(error) }.boxed()
            }
        }
    }
}
