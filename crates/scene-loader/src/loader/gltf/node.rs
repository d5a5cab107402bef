use std::sync::Arc;

use futures::{
    future::{try_join3, try_join_all},
    FutureExt,
};
use glam::{Mat4, Quat, Vec3};

use crate::{
    camera::{
        CameraAsset, CameraProjectionAsset, OrthographicCameraAsset, PerspectiveCameraAsset,
    },
    index::{AssetIndex, AssetKind},
    node::{DecomposedTransform, MatrixNodeTransform, NodeAsset, NodeAttachment, NodeTransform},
};

use super::{
    document::{CameraDef, NodeDef},
    plugin::{PluginFuture, PluginHook},
    GltfLoaderError, GltfParser, Pending,
};

fn node_transform(def: &NodeDef) -> NodeTransform {
    match def.matrix {
        Some(matrix) => NodeTransform::Matrix(MatrixNodeTransform(Mat4::from_cols_array(&matrix))),
        None => NodeTransform::Decomposed(DecomposedTransform {
            translation: def.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO),
            rotation: def.rotation.map(Quat::from_array).unwrap_or(Quat::IDENTITY),
            scale: def.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE),
        }),
    }
}

fn camera_projection(
    index: usize,
    def: &CameraDef,
) -> Result<CameraProjectionAsset, GltfLoaderError> {
    match def.kind.as_str() {
        "perspective" => {
            let perspective = def.perspective.as_ref().ok_or_else(|| {
                GltfLoaderError::BadCamera(index, String::from("missing perspective"))
            })?;
            Ok(CameraProjectionAsset::Perspective(PerspectiveCameraAsset {
                aspect_ratio: perspective.aspect_ratio,
                yfov: perspective.yfov,
                zfar: perspective.zfar,
                znear: perspective.znear,
            }))
        }
        "orthographic" => {
            let orthographic = def.orthographic.as_ref().ok_or_else(|| {
                GltfLoaderError::BadCamera(index, String::from("missing orthographic"))
            })?;
            Ok(CameraProjectionAsset::Orthographic(OrthographicCameraAsset {
                xmag: orthographic.xmag,
                ymag: orthographic.ymag,
                zfar: orthographic.zfar,
                znear: orthographic.znear,
            }))
        }
        other => Err(GltfLoaderError::BadCamera(
            index,
            format!("unknown type {}", other),
        )),
    }
}

impl GltfParser {
    /// A node with its attachments, without children or skin. Skins reuse
    /// it to identify their joints.
    pub fn load_node_shallow(self: &Arc<Self>, index: usize) -> Pending<Arc<NodeAsset>> {
        let parser = self.clone();
        self.caches.shallow_nodes.get_or_create(index, move || {
            async move {
                let def = parser.document.node(index)?;
                let name = def.name.as_deref().map(|name| parser.unique_name(name));

                let mesh = parser.create_node_mesh(index);
                let camera = parser.create_node_camera(def.camera);
                let others = try_join_all(
                    parser
                        .plugins
                        .invoke_all(PluginHook::CreateNodeAttachment, |plugin| {
                            plugin.create_node_attachment(&parser, index)
                        }),
                );
                let (mesh, camera, others) = try_join3(mesh, camera, others).await?;

                let mesh_weights = match &mesh {
                    Some(NodeAttachment::Mesh(mesh)) => Some(mesh.weights.clone()),
                    _ => None,
                };
                let attachments = mesh
                    .into_iter()
                    .chain(camera)
                    .chain(others.into_iter().flatten())
                    .collect();

                Ok(Arc::new(NodeAsset {
                    id: AssetIndex::new(AssetKind::Node, index),
                    name,
                    transform: node_transform(def),
                    attachments,
                    skin: None,
                    weights: def.weights.clone().or(mesh_weights).unwrap_or_default(),
                    is_bone: parser.is_bone(index),
                    children: Vec::new(),
                    user_data: parser.user_data(&def.extras, &def.extensions),
                }))
            }
            .boxed()
        })
    }

    /// A node with its subtree and skin. Children and skin resolve
    /// concurrently.
    pub fn load_node(self: &Arc<Self>, index: usize) -> Pending<Arc<NodeAsset>> {
        let parser = self.clone();
        self.caches.nodes.get_or_create(index, move || {
            async move {
                let def = parser.document.node(index)?;
                let shallow = parser.load_node_shallow(index);
                let children =
                    try_join_all(def.children.iter().map(|child| parser.load_node(*child)));
                let skin = def.skin.map(|skin| parser.load_skin(skin));
                let skin = async move {
                    match skin {
                        Some(skin) => skin.await.map(Some),
                        None => Ok(None),
                    }
                };
                let (shallow, children, skin) = try_join3(shallow, children, skin).await?;

                let mut node = NodeAsset::clone(&shallow);
                node.children = children;
                node.skin = skin;
                Ok(Arc::new(node))
            }
            .boxed()
        })
    }

    /// The camera attachment of a node, instanced when several nodes use
    /// the camera.
    fn create_node_camera(
        self: &Arc<Self>,
        camera: Option<usize>,
    ) -> PluginFuture<Option<NodeAttachment>> {
        let Some(camera) = camera else {
            return async { Ok(None) }.boxed();
        };
        let pending = self.load_camera(camera);
        let parser = self.clone();
        async move {
            let value = pending.await?;
            let value = parser.instancer.get_ref(AssetKind::Camera, camera, value);
            Ok(Some(NodeAttachment::Camera(value)))
        }
        .boxed()
    }

    pub fn load_camera(self: &Arc<Self>, index: usize) -> Pending<Arc<CameraAsset>> {
        let parser = self.clone();
        self.caches.cameras.get_or_create(index, move || {
            async move {
                let def = parser.document.camera(index)?;
                let projection = camera_projection(index, def)?;
                Ok(Arc::new(CameraAsset {
                    id: AssetIndex::new(AssetKind::Camera, index),
                    name: def
                        .name
                        .as_deref()
                        .map(|name| parser.unique_name(name))
                        .unwrap_or_default(),
                    projection,
                }))
            }
            .boxed()
        })
    }
}
