use std::sync::Arc;

use glam::Mat4;

use crate::{index::AssetIndex, scene::NodeHandle};

/// A joint of a skin, identified by the node it was resolved from.
#[derive(Debug, Clone, PartialEq)]
pub struct JointRef {
    pub id: AssetIndex,
    pub name: Option<String>,
}

/// Bones and inverse bind matrices, as parallel arrays. A joint that could
/// not be resolved leaves a gap.
#[derive(Debug, Clone)]
pub struct SkinAsset {
    pub id: AssetIndex,
    pub name: Option<String>,
    pub joints: Vec<Option<JointRef>>,
    pub inverse_bind_matrices: Vec<Mat4>,
    pub skeleton: Option<AssetIndex>,
}

/// A skin bound to a mesh inside an assembled scene.
#[derive(Debug, Clone)]
pub struct SkinBinding {
    pub skin: Arc<SkinAsset>,
    /// Bone nodes, parallel to `skin.joints`.
    pub bones: Vec<Option<NodeHandle>>,
    /// World matrix of the skinned node when bound.
    pub bind_matrix: Mat4,
}
