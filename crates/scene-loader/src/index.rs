use std::fmt::{self, Display, Formatter};

/// Top-level array of the document an asset was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetKind {
    Scene,
    Node,
    Mesh,
    Accessor,
    BufferView,
    Buffer,
    Material,
    Texture,
    Image,
    Sampler,
    Skin,
    Animation,
    Camera,
    Light,
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Scene => write!(f, "Scene"),
            AssetKind::Node => write!(f, "Node"),
            AssetKind::Mesh => write!(f, "Mesh"),
            AssetKind::Accessor => write!(f, "Accessor"),
            AssetKind::BufferView => write!(f, "BufferView"),
            AssetKind::Buffer => write!(f, "Buffer"),
            AssetKind::Material => write!(f, "Material"),
            AssetKind::Texture => write!(f, "Texture"),
            AssetKind::Image => write!(f, "Image"),
            AssetKind::Sampler => write!(f, "Sampler"),
            AssetKind::Skin => write!(f, "Skin"),
            AssetKind::Animation => write!(f, "Animation"),
            AssetKind::Camera => write!(f, "Camera"),
            AssetKind::Light => write!(f, "Light"),
        }
    }
}

/// Points a built value back to the definition it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetIndex {
    pub kind: AssetKind,
    pub index: usize,
}

impl AssetIndex {
    pub const fn new(kind: AssetKind, index: usize) -> Self {
        Self { kind, index }
    }
}

impl Display for AssetIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.index)
    }
}
