use std::{collections::BTreeMap, fmt::Write, sync::Arc};

use futures::{
    future::{try_join3, try_join_all},
    FutureExt,
};
use glam::Vec3;

use crate::{
    accessor::Accessor,
    index::{AssetIndex, AssetKind},
    mesh::MeshAsset,
    node::NodeAttachment,
    primitive::{semantic, Aabb, Geometry, PrimitiveAsset, PrimitiveAssetMode},
};

use super::{
    document::PrimitiveDef,
    plugin::{PluginFuture, PluginHook},
    GltfLoaderError, GltfParser, Pending,
};

fn attributes_key(key: &mut String, attributes: &BTreeMap<String, usize>) {
    for (semantic, accessor) in attributes {
        let _ = write!(key, ":{}:{}", semantic, accessor);
    }
}

/// Primitives with the same key decode to the same geometry.
fn geometry_key(def: &PrimitiveDef) -> String {
    let mut key = match def.indices {
        Some(indices) => indices.to_string(),
        None => String::new(),
    };
    attributes_key(&mut key, &def.attributes);
    let _ = write!(key, ":{}", def.mode);
    for target in &def.targets {
        attributes_key(&mut key, target);
    }
    if !def.extensions.is_empty() {
        if let Ok(extensions) = serde_json::to_string(&def.extensions) {
            let _ = write!(key, ":{}", extensions);
        }
    }
    key
}

fn accessor_vec3(accessor: &Accessor, values: &[f64]) -> Option<Vec3> {
    if values.len() < 3 {
        return None;
    }
    let read = |value: f64| {
        if accessor.normalized {
            accessor.component_type.normalize(value) as f32
        } else {
            value as f32
        }
    };
    Some(Vec3::new(read(values[0]), read(values[1]), read(values[2])))
}

/// Bounds of a position accessor, from its declared extremes or from its
/// data when they are missing.
fn accessor_bounds(accessor: &Accessor) -> Option<Aabb> {
    match (&accessor.min, &accessor.max) {
        (Some(min), Some(max)) => Some(Aabb {
            min: accessor_vec3(accessor, min)?,
            max: accessor_vec3(accessor, max)?,
        }),
        _ => (0..accessor.count)
            .map(|item| accessor.read_vec3(item))
            .fold(None, |bounds: Option<Aabb>, point| {
                let point = Aabb {
                    min: point,
                    max: point,
                };
                Some(bounds.map_or(point, |bounds| bounds.union(&point)))
            }),
    }
}

/// Bounds of the base positions grown by the largest displacement of any
/// morph target.
pub fn compute_bounds(
    attributes: &BTreeMap<String, Arc<Accessor>>,
    morph_targets: &[BTreeMap<String, Arc<Accessor>>],
) -> Option<Aabb> {
    let bounds = accessor_bounds(attributes.get(semantic::POSITION)?)?;
    let displacement = morph_targets
        .iter()
        .filter_map(|target| accessor_bounds(target.get(semantic::POSITION)?))
        .fold(Vec3::ZERO, |displacement, target| {
            displacement.max(target.min.abs().max(target.max.abs()))
        });
    Some(Aabb {
        min: bounds.min - displacement,
        max: bounds.max + displacement,
    })
}

fn target_names(extras: &Option<serde_json::Value>) -> Vec<String> {
    extras
        .as_ref()
        .and_then(|extras| extras.get("targetNames"))
        .and_then(|names| names.as_array())
        .map(|names| {
            names
                .iter()
                .map(|name| name.as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

impl GltfParser {
    /// Resolves a map of semantic to accessor index.
    pub fn load_attributes(
        self: &Arc<Self>,
        attributes: &BTreeMap<String, usize>,
    ) -> PluginFuture<BTreeMap<String, Arc<Accessor>>> {
        let (semantics, pending): (Vec<String>, Vec<_>) = attributes
            .iter()
            .map(|(semantic, accessor)| (semantic.clone(), self.load_accessor(*accessor)))
            .unzip();
        async move {
            let accessors = try_join_all(pending).await?;
            Ok(semantics.into_iter().zip(accessors).collect())
        }
        .boxed()
    }

    /// Assembles decoded vertex data into a geometry. Fails when there is
    /// no position attribute.
    pub fn build_geometry(
        &self,
        mesh: usize,
        def: &PrimitiveDef,
        attributes: BTreeMap<String, Arc<Accessor>>,
        indices: Option<Arc<Accessor>>,
        morph_targets: Vec<BTreeMap<String, Arc<Accessor>>>,
    ) -> Result<Geometry, GltfLoaderError> {
        if !attributes.contains_key(semantic::POSITION) {
            return Err(GltfLoaderError::MissingPosition(mesh));
        }
        Ok(Geometry {
            bounds: compute_bounds(&attributes, &morph_targets),
            attributes,
            indices,
            morph_targets,
            user_data: self.user_data(&def.extras, &def.extensions),
        })
    }

    /// Vertex data of a primitive. Plugins decoding compressed primitives
    /// are asked first.
    pub fn load_geometry(self: &Arc<Self>, mesh: usize, primitive: usize) -> Pending<Arc<Geometry>> {
        let key = match self.document.primitive(mesh, primitive) {
            Ok(def) => geometry_key(def),
            Err(error) => return async move { Err(error) }.boxed().shared(),
        };
        let parser = self.clone();
        self.caches.geometries.get_or_create(key, move || {
            parser
                .plugins
                .invoke_one(PluginHook::DecodePrimitive, |plugin| {
                    plugin.decode_primitive(&parser, mesh, primitive)
                })
                .unwrap_or_else(|| parser.default_decode_primitive(mesh, primitive))
        })
    }

    fn default_decode_primitive(
        self: &Arc<Self>,
        mesh: usize,
        primitive: usize,
    ) -> PluginFuture<Arc<Geometry>> {
        let parser = self.clone();
        async move {
            let def = parser.document.primitive(mesh, primitive)?;
            let indices = def.indices.map(|indices| parser.load_accessor(indices));
            let indices = async move {
                match indices {
                    Some(indices) => indices.await.map(Some),
                    None => Ok(None),
                }
            };
            let targets = try_join_all(
                def.targets
                    .iter()
                    .map(|target| parser.load_attributes(target)),
            );
            let (attributes, indices, morph_targets) =
                try_join3(parser.load_attributes(&def.attributes), indices, targets).await?;
            let geometry = parser.build_geometry(mesh, def, attributes, indices, morph_targets)?;
            Ok(Arc::new(geometry))
        }
        .boxed()
    }

    pub fn load_mesh(self: &Arc<Self>, index: usize) -> Pending<Arc<MeshAsset>> {
        let parser = self.clone();
        self.caches.meshes.get_or_create(index, move || {
            async move {
                let def = parser.document.mesh(index)?;
                let name = match &def.name {
                    Some(name) => parser.unique_name(name),
                    None => parser.unique_name(&format!("mesh_{}", index)),
                };
                let multiple = def.primitives.len() > 1;
                let primitives = try_join_all(def.primitives.iter().enumerate().map(
                    |(primitive, primitive_def)| {
                        let name = multiple.then(|| {
                            parser.unique_name(&format!(
                                "{}_{}",
                                def.name.as_deref().unwrap_or(&name),
                                primitive
                            ))
                        });
                        parser.load_primitive(index, primitive, primitive_def, name)
                    },
                ))
                .await?;

                let target_count = def
                    .primitives
                    .first()
                    .map(|primitive| primitive.targets.len())
                    .unwrap_or(0);
                Ok(Arc::new(MeshAsset {
                    id: AssetIndex::new(AssetKind::Mesh, index),
                    name,
                    primitives,
                    weights: def
                        .weights
                        .clone()
                        .unwrap_or_else(|| vec![0.0; target_count]),
                    target_names: target_names(&def.extras),
                    instancing: None,
                    user_data: parser.user_data(&def.extras, &def.extensions),
                }))
            }
            .boxed()
        })
    }

    fn load_primitive(
        self: &Arc<Self>,
        mesh: usize,
        primitive: usize,
        def: &PrimitiveDef,
        name: Option<String>,
    ) -> PluginFuture<PrimitiveAsset> {
        let Some(mode) = PrimitiveAssetMode::from_gl(def.mode) else {
            let error = GltfLoaderError::UnsupportedPrimitiveMode(def.mode);
            return async move { Err(error) }.boxed();
        };
        let geometry = self.load_geometry(mesh, primitive);
        let material = def.material.map(|material| self.load_material(material));
        let skinned = self.is_skinned_mesh(mesh)
            && matches!(
                mode,
                PrimitiveAssetMode::TriangleList
                    | PrimitiveAssetMode::TriangleStrip
                    | PrimitiveAssetMode::TriangleFan
            );
        let parser = self.clone();
        async move {
            let geometry = geometry.await?;
            let material = match material {
                Some(material) => material.await?,
                None => parser.default_material(),
            };
            Ok(PrimitiveAsset {
                name,
                geometry,
                material,
                mode,
                skinned,
            })
        }
        .boxed()
    }

    /// The mesh attachment of a node. Plugins may replace it, for example
    /// to add instancing data.
    pub fn create_node_mesh(self: &Arc<Self>, node: usize) -> PluginFuture<Option<NodeAttachment>> {
        self.plugins
            .invoke_one(PluginHook::CreateNodeMesh, |plugin| {
                plugin.create_node_mesh(self, node)
            })
            .unwrap_or_else(|| self.default_create_node_mesh(node))
    }

    /// The shared mesh of a node, instanced when several nodes use it.
    pub fn default_create_node_mesh(
        self: &Arc<Self>,
        node: usize,
    ) -> PluginFuture<Option<NodeAttachment>> {
        let mesh = match self.document.node(node) {
            Ok(def) => def.mesh,
            Err(error) => return async move { Err(error) }.boxed(),
        };
        let Some(mesh) = mesh else {
            return async { Ok(None) }.boxed();
        };
        let pending = self.load_mesh(mesh);
        let parser = self.clone();
        async move {
            let value = pending.await?;
            let value = parser.instancer.get_ref(AssetKind::Mesh, mesh, value);
            Ok(Some(NodeAttachment::Mesh(value)))
        }
        .boxed()
    }
}
