use std::{collections::BTreeMap, sync::Arc};

use glam::Mat4;

use crate::{accessor::Accessor, index::AssetIndex, node::UserData};

use super::primitive::PrimitiveAsset;

/// Per-instance data of EXT_mesh_gpu_instancing.
#[derive(Debug, Clone, Default)]
pub struct MeshInstancing {
    pub matrices: Vec<Mat4>,
    /// Attributes other than TRANSLATION, ROTATION and SCALE.
    pub attributes: BTreeMap<String, Arc<Accessor>>,
}

#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub id: AssetIndex,
    pub name: String,
    pub primitives: Vec<PrimitiveAsset>,
    pub weights: Vec<f32>,
    pub target_names: Vec<String>,
    pub instancing: Option<MeshInstancing>,
    pub user_data: UserData,
}
