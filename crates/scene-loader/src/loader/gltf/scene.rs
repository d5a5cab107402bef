use std::sync::Arc;

use futures::{future::try_join_all, FutureExt};

use crate::{
    index::{AssetIndex, AssetKind},
    node::NodeAsset,
    scene::SceneGraph,
};

use super::{plugin::PluginFuture, GltfParser};

impl GltfParser {
    /// Resolves the root nodes of a scene concurrently and assembles them
    /// into a scene graph with skins bound.
    pub fn load_scene(self: &Arc<Self>, index: usize) -> PluginFuture<SceneGraph> {
        let parser = self.clone();
        async move {
            let def = parser.document.scene(index)?;
            let roots = try_join_all(def.nodes.iter().map(|node| parser.load_node(*node))).await?;
            let name = def.name.as_deref().map(|name| parser.unique_name(name));
            let mut scene = assemble_scene(index, name, &roots);
            scene.user_data = parser.user_data(&def.extras, &def.extensions);
            Ok(scene)
        }
        .boxed()
    }
}

pub fn assemble_scene(index: usize, name: Option<String>, roots: &[Arc<NodeAsset>]) -> SceneGraph {
    SceneGraph::from_roots(Some(AssetIndex::new(AssetKind::Scene, index)), name, roots)
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec3};
    use serde_json::json;

    use crate::index::{AssetIndex, AssetKind};

    use super::super::GltfParser;

    #[test]
    fn test_scene_roots() {
        let parser = GltfParser::for_test(
            json!({
                "asset": { "version": "2.0" },
                "scenes": [{ "name": "stage", "nodes": [0, 2], "extras": { "level": 1 } }],
                "nodes": [
                    { "children": [1], "translation": [0.0, 1.0, 0.0] },
                    { "name": "child", "translation": [1.0, 0.0, 0.0] },
                    { "name": "other" }
                ]
            }),
            None,
        );
        let scene = pollster::block_on(parser.load_scene(0)).unwrap();
        assert_eq!(scene.id, Some(AssetIndex::new(AssetKind::Scene, 0)));
        assert_eq!(scene.name.as_deref(), Some("stage"));
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.roots().len(), 2);
        assert_eq!(scene.user_data.extras, Some(json!({ "level": 1 })));

        let child = scene.find_by_name("child").unwrap();
        assert_eq!(
            scene.world_matrix(child),
            Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0))
        );
        let root = scene.parent(child).unwrap();
        assert_eq!(
            scene.node(root).id,
            Some(AssetIndex::new(AssetKind::Node, 0))
        );
    }
}
