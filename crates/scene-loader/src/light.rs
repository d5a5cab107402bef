use crate::index::AssetIndex;

/// Light types of KHR_lights_punctual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    Spot {
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightAsset {
    pub id: AssetIndex,
    pub name: String,
    pub kind: LightKind,
    /// Linear RGB.
    pub color: [f32; 3],
    pub intensity: f32,
    /// `None` means infinite range.
    pub range: Option<f32>,
}
