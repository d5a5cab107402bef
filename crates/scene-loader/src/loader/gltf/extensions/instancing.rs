//! EXT_mesh_gpu_instancing.

use std::{collections::BTreeMap, sync::Arc};

use futures::{future::try_join, FutureExt};
use glam::{Mat4, Quat, Vec3};
use serde::Deserialize;

use crate::{
    accessor::Accessor,
    mesh::{MeshAsset, MeshInstancing},
    node::NodeAttachment,
};

use super::{
    super::{plugin::PluginFuture, GltfParser},
    extension_data, GltfPlugin, EXT_MESH_GPU_INSTANCING,
};

const TRANSLATION: &str = "TRANSLATION";
const ROTATION: &str = "ROTATION";
const SCALE: &str = "SCALE";

#[derive(Debug, Deserialize)]
struct InstancingDef {
    #[serde(default)]
    attributes: BTreeMap<String, usize>,
}

/// Composes per-instance TRS attributes into matrices. The remaining
/// attributes are kept as they are.
pub fn compose_instancing(mut attributes: BTreeMap<String, Arc<Accessor>>) -> MeshInstancing {
    let count = attributes
        .values()
        .map(|accessor| accessor.count)
        .min()
        .unwrap_or(0);
    let translation = attributes.remove(TRANSLATION);
    let rotation = attributes.remove(ROTATION);
    let scale = attributes.remove(SCALE);
    let matrices = (0..count)
        .map(|item| {
            Mat4::from_scale_rotation_translation(
                scale
                    .as_ref()
                    .map(|scale| scale.read_vec3(item))
                    .unwrap_or(Vec3::ONE),
                rotation
                    .as_ref()
                    .map(|rotation| rotation.read_quat(item))
                    .unwrap_or(Quat::IDENTITY),
                translation
                    .as_ref()
                    .map(|translation| translation.read_vec3(item))
                    .unwrap_or(Vec3::ZERO),
            )
        })
        .collect();
    MeshInstancing {
        matrices,
        attributes,
    }
}

/// Replaces the mesh attachment of instanced nodes with a mesh carrying
/// its instance data.
pub struct GpuInstancingPlugin;

impl GltfPlugin for GpuInstancingPlugin {
    fn name(&self) -> &str {
        EXT_MESH_GPU_INSTANCING
    }

    fn create_node_mesh(
        &self,
        parser: &Arc<GltfParser>,
        node: usize,
    ) -> Option<PluginFuture<Option<NodeAttachment>>> {
        let def = parser.document().node(node).ok()?;
        def.mesh?;
        let instancing = match extension_data::<InstancingDef>(&def.extensions, EXT_MESH_GPU_INSTANCING)
        {
            Ok(instancing) => instancing?,
            Err(error) => return Some(async move { Err(error) }.boxed()),
        };
        let mesh = parser.default_create_node_mesh(node);
        let attributes = parser.load_attributes(&instancing.attributes);
        Some(
            async move {
                let (mesh, attributes) = try_join(mesh, attributes).await?;
                let Some(NodeAttachment::Mesh(mesh)) = mesh else {
                    return Ok(mesh);
                };
                let mut mesh = MeshAsset::clone(&mesh);
                mesh.instancing = Some(compose_instancing(attributes));
                Ok(Some(NodeAttachment::Mesh(Arc::new(mesh))))
            }
            .boxed(),
        )
    }
}

#[cfg(test)]
mod test {
    use std::{collections::BTreeMap, sync::Arc};

    use glam::{Mat4, Vec3};

    use crate::accessor::{Accessor, AccessorShape};

    use super::compose_instancing;

    #[test]
    fn test_compose() {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            String::from("TRANSLATION"),
            Arc::new(Accessor::from_f32(
                AccessorShape::Vec3,
                vec![1.0, 0.0, 0.0, 0.0, 2.0, 0.0],
            )),
        );
        attributes.insert(
            String::from("_ID"),
            Arc::new(Accessor::from_f32(AccessorShape::Scalar, vec![7.0, 8.0])),
        );
        let instancing = compose_instancing(attributes);
        assert_eq!(instancing.matrices.len(), 2);
        assert_eq!(
            instancing.matrices[1],
            Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))
        );
        assert_eq!(instancing.attributes.len(), 1);
        assert!(instancing.attributes.contains_key("_ID"));
    }
}
