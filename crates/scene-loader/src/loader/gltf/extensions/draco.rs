//! KHR_draco_mesh_compression.
//!
//! A compressed primitive stores its attributes and indices in one buffer
//! view. Decompression is done by a [`DracoDecoder`] supplied by the
//! application; attributes left out of the compressed data are read from
//! their accessors as usual.

use std::{collections::BTreeMap, sync::Arc};

use futures::{
    future::{try_join3, try_join_all},
    FutureExt,
};
use serde::Deserialize;

use crate::{
    accessor::{Accessor, AccessorShape, ComponentType},
    primitive::Geometry,
};

use super::{
    super::{plugin::PluginFuture, GltfLoaderError, GltfParser},
    extension_data, GltfPlugin, KHR_DRACO_MESH_COMPRESSION,
};

#[derive(Debug, Clone, Deserialize)]
struct DracoDef {
    #[serde(rename = "bufferView")]
    buffer_view: usize,
    #[serde(default)]
    attributes: BTreeMap<String, u32>,
}

/// An attribute to extract from a compressed mesh, typed after its
/// accessor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DracoAttribute {
    pub semantic: String,
    /// Attribute id inside the compressed data.
    pub id: u32,
    pub component_type: ComponentType,
    pub shape: AccessorShape,
    pub normalized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DracoMesh {
    pub attributes: BTreeMap<String, Accessor>,
    pub indices: Option<Accessor>,
}

pub trait DracoDecoder: Send + Sync {
    fn decode(&self, data: &[u8], attributes: &[DracoAttribute]) -> Result<DracoMesh, String>;
}

pub struct DracoPlugin {
    decoder: Option<Arc<dyn DracoDecoder>>,
}

impl DracoPlugin {
    pub fn new(decoder: Option<Arc<dyn DracoDecoder>>) -> Self {
        Self { decoder }
    }
}

fn draco_attributes(
    parser: &GltfParser,
    mesh: usize,
    primitive: usize,
    def: &DracoDef,
) -> Result<Vec<DracoAttribute>, GltfLoaderError> {
    let primitive = parser.document().primitive(mesh, primitive)?;
    def.attributes
        .iter()
        .map(|(semantic, id)| {
            let accessor_index = primitive
                .attributes
                .get(semantic)
                .copied()
                .ok_or_else(|| {
                    GltfLoaderError::Plugin(
                        KHR_DRACO_MESH_COMPRESSION.to_string(),
                        format!("{} has no accessor", semantic),
                    )
                })?;
            let accessor = parser.document().accessor(accessor_index)?;
            Ok(DracoAttribute {
                semantic: semantic.clone(),
                id: *id,
                component_type: ComponentType::from_gl(accessor.component_type).ok_or(
                    GltfLoaderError::UnsupportedComponentType(
                        accessor_index,
                        accessor.component_type,
                    ),
                )?,
                shape: AccessorShape::from_name(&accessor.shape).ok_or_else(|| {
                    GltfLoaderError::UnsupportedAccessorShape(
                        accessor_index,
                        accessor.shape.clone(),
                    )
                })?,
                normalized: accessor.normalized,
            })
        })
        .collect()
}

impl GltfPlugin for DracoPlugin {
    fn name(&self) -> &str {
        KHR_DRACO_MESH_COMPRESSION
    }

    fn decode_primitive(
        &self,
        parser: &Arc<GltfParser>,
        mesh: usize,
        primitive: usize,
    ) -> Option<PluginFuture<Arc<Geometry>>> {
        let primitive_def = parser.document().primitive(mesh, primitive).ok()?;
        let def = match extension_data::<DracoDef>(
            &primitive_def.extensions,
            KHR_DRACO_MESH_COMPRESSION,
        ) {
            Ok(def) => def?,
            Err(error) => return Some(async move { Err(error) }.boxed()),
        };
        let Some(decoder) = self.decoder.clone() else {
            let error = GltfLoaderError::MissingDecoder(KHR_DRACO_MESH_COMPRESSION.to_string());
            return Some(async move { Err(error) }.boxed());
        };
        let parser = parser.clone();
        Some(
            async move {
                let primitive_def = parser.document().primitive(mesh, primitive)?;
                let attributes = draco_attributes(&parser, mesh, primitive, &def)?;
                let data = parser.load_buffer_view(def.buffer_view).await?;
                let decoded = decoder.decode(&data, &attributes).map_err(|error| {
                    GltfLoaderError::Plugin(KHR_DRACO_MESH_COMPRESSION.to_string(), error)
                })?;

                let remaining: BTreeMap<String, usize> = primitive_def
                    .attributes
                    .iter()
                    .filter(|(semantic, _)| !decoded.attributes.contains_key(*semantic))
                    .map(|(semantic, accessor)| (semantic.clone(), *accessor))
                    .collect();
                let indices = match (decoded.indices.is_some(), primitive_def.indices) {
                    (false, Some(indices)) => Some(parser.load_accessor(indices)),
                    _ => None,
                };
                let indices = async move {
                    match indices {
                        Some(indices) => indices.await.map(Some),
                        None => Ok(None),
                    }
                };
                let targets = try_join_all(
                    primitive_def
                        .targets
                        .iter()
                        .map(|target| parser.load_attributes(target)),
                );
                let (mut all_attributes, accessor_indices, morph_targets) =
                    try_join3(parser.load_attributes(&remaining), indices, targets).await?;

                all_attributes.extend(
                    decoded
                        .attributes
                        .into_iter()
                        .map(|(semantic, accessor)| (semantic, Arc::new(accessor))),
                );
                let indices = decoded.indices.map(Arc::new).or(accessor_indices);
                let geometry = parser.build_geometry(
                    mesh,
                    primitive_def,
                    all_attributes,
                    indices,
                    morph_targets,
                )?;
                Ok(Arc::new(geometry))
            }
            .boxed(),
        )
    }
}
