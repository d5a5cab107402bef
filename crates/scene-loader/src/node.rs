use std::{collections::BTreeMap, sync::Arc};

use glam::{Mat4, Quat, Vec3};
use serde_json::Value;

use crate::index::AssetIndex;

use super::{camera::CameraAsset, light::LightAsset, mesh::MeshAsset, skin::SkinAsset};

/// Data carried over verbatim from the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    pub extras: Option<Value>,
    /// Extensions no registered plugin understands, by name.
    pub extensions: BTreeMap<String, Value>,
}

impl UserData {
    pub fn is_empty(&self) -> bool {
        self.extras.is_none() && self.extensions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixNodeTransform(pub Mat4);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Matrix(MatrixNodeTransform),
    Decomposed(DecomposedTransform),
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::Decomposed(DecomposedTransform::default())
    }
}

impl From<MatrixNodeTransform> for Mat4 {
    fn from(value: MatrixNodeTransform) -> Self {
        value.0
    }
}

impl From<DecomposedTransform> for Mat4 {
    fn from(value: DecomposedTransform) -> Self {
        Mat4::from_scale_rotation_translation(value.scale, value.rotation, value.translation)
    }
}

impl From<NodeTransform> for Mat4 {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => matrix.0,
            NodeTransform::Decomposed(decomposed) => decomposed.into(),
        }
    }
}

impl From<NodeTransform> for DecomposedTransform {
    fn from(value: NodeTransform) -> Self {
        match value {
            NodeTransform::Matrix(matrix) => {
                let (scale, rotation, translation) = matrix.0.to_scale_rotation_translation();
                DecomposedTransform {
                    translation,
                    rotation,
                    scale,
                }
            }
            NodeTransform::Decomposed(decomposed) => decomposed,
        }
    }
}

/// Something a node carries besides its children.
#[derive(Debug, Clone)]
pub enum NodeAttachment {
    Mesh(Arc<MeshAsset>),
    Camera(Arc<CameraAsset>),
    Light(Arc<LightAsset>),
}

/// A node definition resolved into a tree. Children are resolved nodes;
/// the skin is bound once the tree is assembled into a
/// [`SceneGraph`](crate::scene::SceneGraph).
#[derive(Debug, Clone)]
pub struct NodeAsset {
    pub id: AssetIndex,
    pub name: Option<String>,
    pub transform: NodeTransform,
    pub attachments: Vec<NodeAttachment>,
    pub skin: Option<Arc<SkinAsset>>,
    pub weights: Vec<f32>,
    pub is_bone: bool,
    pub children: Vec<Arc<NodeAsset>>,
    pub user_data: UserData,
}

impl NodeAsset {
    pub fn mesh(&self) -> Option<&Arc<MeshAsset>> {
        self.attachments.iter().find_map(|attachment| match attachment {
            NodeAttachment::Mesh(mesh) => Some(mesh),
            _ => None,
        })
    }

    pub fn camera(&self) -> Option<&Arc<CameraAsset>> {
        self.attachments.iter().find_map(|attachment| match attachment {
            NodeAttachment::Camera(camera) => Some(camera),
            _ => None,
        })
    }

    pub fn light(&self) -> Option<&Arc<LightAsset>> {
        self.attachments.iter().find_map(|attachment| match attachment {
            NodeAttachment::Light(light) => Some(light),
            _ => None,
        })
    }
}
