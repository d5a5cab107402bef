use crate::index::AssetIndex;

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCameraAsset {
    pub aspect_ratio: Option<f32>,
    pub yfov: f32,
    pub zfar: Option<f32>,
    pub znear: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCameraAsset {
    pub xmag: f32,
    pub ymag: f32,
    pub zfar: f32,
    pub znear: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CameraProjectionAsset {
    Perspective(PerspectiveCameraAsset),
    Orthographic(OrthographicCameraAsset),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraAsset {
    pub id: AssetIndex,
    pub name: String,
    pub projection: CameraProjectionAsset,
}
