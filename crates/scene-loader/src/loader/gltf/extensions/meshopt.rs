//! EXT_meshopt_compression.
//!
//! A compressed buffer view points at its compressed bytes in another
//! buffer. Decompression itself is done by a [`MeshoptDecoder`] supplied by
//! the application.

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use bytes::Bytes;
use futures::FutureExt;
use serde::Deserialize;

use super::{
    super::{plugin::PluginFuture, GltfLoaderError, GltfParser},
    extension_data, GltfPlugin, EXT_MESHOPT_COMPRESSION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeshoptMode {
    Attributes,
    Triangles,
    Indices,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeshoptFilter {
    #[default]
    None,
    Octahedral,
    Quaternion,
    Exponential,
}

impl Display for MeshoptMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MeshoptMode::Attributes => write!(f, "ATTRIBUTES"),
            MeshoptMode::Triangles => write!(f, "TRIANGLES"),
            MeshoptMode::Indices => write!(f, "INDICES"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshoptDef {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: usize,
    pub count: usize,
    pub mode: MeshoptMode,
    #[serde(default)]
    pub filter: MeshoptFilter,
}

/// Decompresses meshopt-encoded buffer views.
pub trait MeshoptDecoder: Send + Sync {
    /// Decodes `count` elements of `stride` bytes from `source`. The result
    /// holds exactly `count * stride` bytes.
    fn decode(
        &self,
        source: &[u8],
        count: usize,
        stride: usize,
        mode: MeshoptMode,
        filter: MeshoptFilter,
    ) -> Result<Vec<u8>, String>;
}

pub struct MeshoptPlugin {
    decoder: Option<Arc<dyn MeshoptDecoder>>,
}

impl MeshoptPlugin {
    pub fn new(decoder: Option<Arc<dyn MeshoptDecoder>>) -> Self {
        Self { decoder }
    }
}

impl GltfPlugin for MeshoptPlugin {
    fn name(&self) -> &str {
        EXT_MESHOPT_COMPRESSION
    }

    /// Without a decoder, views fall back to their uncompressed data unless
    /// the extension is required.
    fn load_buffer_view(
        &self,
        parser: &Arc<GltfParser>,
        index: usize,
    ) -> Option<PluginFuture<Bytes>> {
        let view = parser.document().buffer_view(index).ok()?;
        let def = match extension_data::<MeshoptDef>(&view.extensions, EXT_MESHOPT_COMPRESSION) {
            Ok(def) => def?,
            Err(error) => return Some(async move { Err(error) }.boxed()),
        };
        let Some(decoder) = self.decoder.clone() else {
            if parser
                .document()
                .is_extension_required(EXT_MESHOPT_COMPRESSION)
            {
                let error = GltfLoaderError::MissingDecoder(EXT_MESHOPT_COMPRESSION.to_string());
                return Some(async move { Err(error) }.boxed());
            }
            return None;
        };
        let buffer = parser.load_buffer(def.buffer);
        Some(
            async move {
                let buffer = buffer.await?;
                let end = def.byte_offset + def.byte_length;
                if end > buffer.len() {
                    return Err(GltfLoaderError::BufferViewOutOfBounds {
                        buffer_view: index,
                        needed: end,
                        available: buffer.len(),
                    });
                }
                let decoded = decoder
                    .decode(
                        &buffer[def.byte_offset..end],
                        def.count,
                        def.byte_stride,
                        def.mode,
                        def.filter,
                    )
                    .map_err(|error| {
                        GltfLoaderError::Plugin(EXT_MESHOPT_COMPRESSION.to_string(), error)
                    })?;
                let expected = def.count * def.byte_stride;
                if decoded.len() != expected {
                    return Err(GltfLoaderError::Plugin(
                        EXT_MESHOPT_COMPRESSION.to_string(),
                        format!(
                            "decoded {} bytes in {} mode, expected {}",
                            decoded.len(),
                            def.mode,
                            expected
                        ),
                    ));
                }
                Ok(Bytes::from(decoded))
            }
            .boxed(),
        )
    }
}
