use std::sync::Arc;

use futures::{
    future::{join, join_all},
    FutureExt,
};
use glam::Mat4;

use crate::{
    index::{AssetIndex, AssetKind},
    skin::{JointRef, SkinAsset},
};

use super::{GltfParser, LoadWarning, Pending};

impl GltfParser {
    /// Resolves the joints of a skin and its inverse bind matrices. A joint
    /// that cannot be resolved is reported and leaves a gap; the skin is
    /// still usable.
    pub fn load_skin(self: &Arc<Self>, index: usize) -> Pending<Arc<SkinAsset>> {
        let parser = self.clone();
        self.caches.skins.get_or_create(index, move || {
            async move {
                let def = parser.document.skin(index)?;
                let matrices = def
                    .inverse_bind_matrices
                    .map(|accessor| parser.load_accessor(accessor));
                let matrices = async move {
                    match matrices {
                        Some(matrices) => matrices.await.map(Some),
                        None => Ok(None),
                    }
                };
                let joints = join_all(def.joints.iter().map(|joint| parser.load_node_shallow(*joint)));
                let (joints, matrices) = join(joints, matrices).await;
                let matrices = matrices?;

                let joints = joints
                    .into_iter()
                    .zip(&def.joints)
                    .map(|(result, &joint)| match result {
                        Ok(node) => Some(JointRef {
                            id: node.id,
                            name: node.name.clone(),
                        }),
                        Err(error) => {
                            parser.warn(LoadWarning::UnresolvedJoint {
                                skin: index,
                                joint,
                                reason: error.to_string(),
                            });
                            None
                        }
                    })
                    .collect();
                let inverse_bind_matrices = (0..def.joints.len())
                    .map(|joint| match &matrices {
                        Some(matrices) if joint < matrices.count => matrices.read_mat4(joint),
                        _ => Mat4::IDENTITY,
                    })
                    .collect();

                Ok(Arc::new(SkinAsset {
                    id: AssetIndex::new(AssetKind::Skin, index),
                    name: def.name.clone(),
                    joints,
                    inverse_bind_matrices,
                    skeleton: def
                        .skeleton
                        .map(|skeleton| AssetIndex::new(AssetKind::Node, skeleton)),
                }))
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec3};
    use serde_json::json;

    use crate::index::{AssetIndex, AssetKind};

    use super::super::{GltfParser, LoadWarning};

    #[test]
    fn test_joint_gap() {
        let matrices: Vec<u8> = [Mat4::from_translation(Vec3::X), Mat4::IDENTITY]
            .iter()
            .flat_map(|matrix| matrix.to_cols_array())
            .flat_map(|value| value.to_le_bytes())
            .collect();
        let parser = GltfParser::for_test(
            json!({
                "asset": { "version": "2.0" },
                "buffers": [{ "byteLength": 128 }],
                "bufferViews": [{ "buffer": 0, "byteLength": 128 }],
                "accessors": [{ "bufferView": 0, "componentType": 5126, "count": 2, "type": "MAT4" }],
                "nodes": [{ "name": "hips" }],
                "skins": [
                    { "name": "body", "joints": [0, 7], "inverseBindMatrices": 0, "skeleton": 0 },
                    { "joints": [0] }
                ]
            }),
            Some(matrices),
        );
        let skin = pollster::block_on(parser.load_skin(0)).unwrap();
        assert_eq!(skin.name.as_deref(), Some("body"));
        assert_eq!(skin.joints.len(), 2);
        let joint = skin.joints[0].as_ref().unwrap();
        assert_eq!(joint.id, AssetIndex::new(AssetKind::Node, 0));
        assert_eq!(joint.name.as_deref(), Some("hips"));
        assert!(skin.joints[1].is_none());
        assert_eq!(skin.inverse_bind_matrices[0], Mat4::from_translation(Vec3::X));
        assert_eq!(skin.skeleton, Some(AssetIndex::new(AssetKind::Node, 0)));
        assert!(matches!(
            parser.warnings().as_slice(),
            [LoadWarning::UnresolvedJoint { skin: 0, joint: 7, .. }]
        ));

        let skin = pollster::block_on(parser.load_skin(1)).unwrap();
        assert_eq!(skin.inverse_bind_matrices, [Mat4::IDENTITY]);
    }
}
