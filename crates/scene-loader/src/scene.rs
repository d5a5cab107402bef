//! Output scene graph.
//!
//! Nodes live in an arena owned by [`SceneGraph`] and refer to each other
//! through [`NodeHandle`]s. A node owns the list of its children; the
//! parent handle is only a back-reference used to compose world matrices.

use std::{collections::HashMap, sync::Arc};

use glam::Mat4;
use log::warn;

use crate::{
    index::AssetIndex,
    node::{NodeAsset, NodeAttachment, NodeTransform, UserData},
    skin::{SkinAsset, SkinBinding},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: Option<AssetIndex>,
    pub name: Option<String>,
    pub transform: NodeTransform,
    pub world_matrix: Mat4,
    pub attachments: Vec<NodeAttachment>,
    pub weights: Vec<f32>,
    pub is_bone: bool,
    pub skin: Option<SkinBinding>,
    pub parent: Option<NodeHandle>,
    pub children: Vec<NodeHandle>,
    pub user_data: UserData,
}

impl SceneNode {
    pub fn new(name: Option<String>) -> Self {
        Self {
            id: None,
            name,
            transform: NodeTransform::default(),
            world_matrix: Mat4::IDENTITY,
            attachments: Vec::new(),
            weights: Vec::new(),
            is_bone: false,
            skin: None,
            parent: None,
            children: Vec::new(),
            user_data: UserData::default(),
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.transform.into()
    }

    fn from_asset(node: &NodeAsset) -> Self {
        Self {
            id: Some(node.id),
            name: node.name.clone(),
            transform: node.transform,
            world_matrix: Mat4::IDENTITY,
            attachments: node.attachments.clone(),
            weights: node.weights.clone(),
            is_bone: node.is_bone,
            skin: None,
            parent: None,
            children: Vec::new(),
            user_data: node.user_data.clone(),
        }
    }

    fn is_skinned_mesh(&self) -> bool {
        self.attachments.iter().any(|attachment| match attachment {
            NodeAttachment::Mesh(mesh) => mesh.primitives.iter().any(|primitive| primitive.skinned),
            _ => false,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub id: Option<AssetIndex>,
    pub name: Option<String>,
    pub user_data: UserData,
    nodes: Vec<SceneNode>,
    roots: Vec<NodeHandle>,
}

impl SceneGraph {
    pub fn new(id: Option<AssetIndex>, name: Option<String>) -> Self {
        Self {
            id,
            name,
            ..Default::default()
        }
    }

    /// Builds a scene from resolved root nodes: inserts every tree,
    /// propagates world matrices and binds skins to the skinned meshes
    /// below each skinned node.
    pub fn from_roots(
        id: Option<AssetIndex>,
        name: Option<String>,
        roots: &[Arc<NodeAsset>],
    ) -> Self {
        let mut graph = Self::new(id, name);
        let mut skinned = Vec::new();
        for root in roots {
            graph.insert_tree(root, None, &mut skinned);
        }
        graph.update_world_matrices();
        if !skinned.is_empty() {
            let by_id: HashMap<AssetIndex, NodeHandle> = graph
                .nodes()
                .filter_map(|(handle, node)| node.id.map(|id| (id, handle)))
                .collect();
            for (handle, skin) in skinned {
                graph.bind_skin(handle, skin, &by_id);
            }
        }
        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    pub fn node(&self, handle: NodeHandle) -> &SceneNode {
        &self.nodes[handle.0]
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> &mut SceneNode {
        &mut self.nodes[handle.0]
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.get(handle.0)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeHandle(index), node))
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.nodes[handle.0].parent
    }

    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        &self.nodes[handle.0].children
    }

    /// Adds a node under `parent`, or as a root.
    pub fn add_node(&mut self, mut node: SceneNode, parent: Option<NodeHandle>) -> NodeHandle {
        let handle = NodeHandle(self.nodes.len());
        node.parent = parent;
        node.children.clear();
        self.nodes.push(node);
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(handle),
            None => self.roots.push(handle),
        }
        handle
    }

    pub fn find_by_id(&self, id: AssetIndex) -> Option<NodeHandle> {
        self.nodes()
            .find(|(_, node)| node.id == Some(id))
            .map(|(handle, _)| handle)
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.nodes()
            .find(|(_, node)| node.name.as_deref() == Some(name))
            .map(|(handle, _)| handle)
    }

    /// `handle` and everything below it, depth first.
    pub fn descendants(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut result = Vec::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        result
    }

    pub fn world_matrix(&self, handle: NodeHandle) -> Mat4 {
        self.nodes[handle.0].world_matrix
    }

    /// Recomputes every world matrix from the local transforms.
    pub fn update_world_matrices(&mut self) {
        let mut stack: Vec<(NodeHandle, Mat4)> = self
            .roots
            .iter()
            .rev()
            .map(|root| (*root, Mat4::IDENTITY))
            .collect();
        while let Some((handle, parent_matrix)) = stack.pop() {
            let node = &mut self.nodes[handle.0];
            node.world_matrix = parent_matrix * node.local_matrix();
            let world = node.world_matrix;
            stack.extend(node.children.iter().rev().map(|child| (*child, world)));
        }
    }

    fn insert_tree(
        &mut self,
        node: &NodeAsset,
        parent: Option<NodeHandle>,
        skinned: &mut Vec<(NodeHandle, Arc<SkinAsset>)>,
    ) -> NodeHandle {
        let handle = self.add_node(SceneNode::from_asset(node), parent);
        if let Some(skin) = &node.skin {
            skinned.push((handle, skin.clone()));
        }
        for child in &node.children {
            self.insert_tree(child, Some(handle), skinned);
        }
        handle
    }

    fn bind_skin(
        &mut self,
        handle: NodeHandle,
        skin: Arc<SkinAsset>,
        by_id: &HashMap<AssetIndex, NodeHandle>,
    ) {
        let bones: Vec<Option<NodeHandle>> = skin
            .joints
            .iter()
            .enumerate()
            .map(|(index, joint)| {
                let bone = joint.as_ref().and_then(|joint| by_id.get(&joint.id).copied());
                if bone.is_none() {
                    warn!("Joint {} of skin {} is not part of the scene", index, skin.id);
                }
                bone
            })
            .collect();
        for target in self.descendants(handle) {
            if !self.nodes[target.0].is_skinned_mesh() {
                continue;
            }
            let bind_matrix = self.nodes[target.0].world_matrix;
            self.nodes[target.0].skin = Some(SkinBinding {
                skin: skin.clone(),
                bones: bones.clone(),
                bind_matrix,
            });
        }
    }
}

#[cfg(test)]
mod test {
    use glam::{Mat4, Vec3};

    use crate::node::{DecomposedTransform, NodeTransform};

    use super::{SceneGraph, SceneNode};

    fn translated(name: &str, translation: Vec3) -> SceneNode {
        let mut node = SceneNode::new(Some(name.to_string()));
        node.transform = NodeTransform::Decomposed(DecomposedTransform {
            translation,
            ..Default::default()
        });
        node
    }

    #[test]
    fn test_world_matrices() {
        let mut graph = SceneGraph::default();
        let root = graph.add_node(translated("root", Vec3::X), None);
        let child = graph.add_node(translated("child", Vec3::Y), Some(root));
        let grandchild = graph.add_node(translated("grandchild", Vec3::Z), Some(child));
        graph.update_world_matrices();

        assert_eq!(graph.parent(grandchild), Some(child));
        assert_eq!(graph.children(root), &[child]);
        assert_eq!(graph.descendants(root), vec![root, child, grandchild]);
        assert_eq!(
            graph.world_matrix(grandchild),
            Mat4::from_translation(Vec3::ONE)
        );
        assert_eq!(graph.find_by_name("child"), Some(child));
    }
}
