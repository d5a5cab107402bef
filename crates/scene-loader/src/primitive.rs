use std::{collections::BTreeMap, sync::Arc};

use glam::Vec3;

use crate::{accessor::Accessor, node::UserData};

use super::material::MaterialAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveAssetMode {
    Points,
    LineList,
    LineLoop,
    LineStrip,
    TriangleList,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveAssetMode {
    pub fn from_gl(mode: u32) -> Option<Self> {
        match mode {
            0 => Some(PrimitiveAssetMode::Points),
            1 => Some(PrimitiveAssetMode::LineList),
            2 => Some(PrimitiveAssetMode::LineLoop),
            3 => Some(PrimitiveAssetMode::LineStrip),
            4 => Some(PrimitiveAssetMode::TriangleList),
            5 => Some(PrimitiveAssetMode::TriangleStrip),
            6 => Some(PrimitiveAssetMode::TriangleFan),
            _ => None,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Attribute semantic names of glTF core.
pub mod semantic {
    pub const POSITION: &str = "POSITION";
    pub const NORMAL: &str = "NORMAL";
    pub const TANGENT: &str = "TANGENT";
    pub const TEXCOORD_0: &str = "TEXCOORD_0";
    pub const COLOR_0: &str = "COLOR_0";
    pub const JOINTS_0: &str = "JOINTS_0";
    pub const WEIGHTS_0: &str = "WEIGHTS_0";
}

/// Vertex data of a primitive, shared by every primitive built from the
/// same accessors.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub attributes: BTreeMap<String, Arc<Accessor>>,
    pub indices: Option<Arc<Accessor>>,
    pub morph_targets: Vec<BTreeMap<String, Arc<Accessor>>>,
    pub bounds: Option<Aabb>,
    pub user_data: UserData,
}

impl Geometry {
    pub fn attribute(&self, semantic: &str) -> Option<&Arc<Accessor>> {
        self.attributes.get(semantic)
    }

    pub fn vertex_count(&self) -> usize {
        self.attributes
            .get(semantic::POSITION)
            .map(|position| position.count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct PrimitiveAsset {
    pub name: Option<String>,
    pub geometry: Arc<Geometry>,
    pub material: Arc<MaterialAsset>,
    pub mode: PrimitiveAssetMode,
    /// Whether the primitive is deformed by a skin.
    pub skinned: bool,
}
