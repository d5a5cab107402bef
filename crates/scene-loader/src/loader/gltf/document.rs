//! JSON schema of a glTF 2.0 document.
//!
//! Cross references stay plain indices. Component types, accessor types and
//! primitive modes are kept raw so that unsupported values fail where they
//! are used rather than failing the whole document.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::index::{AssetIndex, AssetKind};

use super::GltfLoaderError;

pub type Extensions = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    #[serde(default)]
    pub version: String,
    pub min_version: Option<String>,
    pub generator: Option<String>,
    pub copyright: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub asset: AssetInfo,
    pub scene: Option<usize>,
    #[serde(default)]
    pub scenes: Vec<SceneDef>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub meshes: Vec<MeshDef>,
    #[serde(default)]
    pub materials: Vec<MaterialDef>,
    #[serde(default)]
    pub accessors: Vec<AccessorDef>,
    #[serde(default)]
    pub buffer_views: Vec<BufferViewDef>,
    #[serde(default)]
    pub buffers: Vec<BufferDef>,
    #[serde(default)]
    pub skins: Vec<SkinDef>,
    #[serde(default)]
    pub animations: Vec<AnimationDef>,
    #[serde(default)]
    pub cameras: Vec<CameraDef>,
    #[serde(default)]
    pub textures: Vec<TextureDef>,
    #[serde(default)]
    pub images: Vec<ImageDef>,
    #[serde(default)]
    pub samplers: Vec<SamplerDef>,
    #[serde(default)]
    pub extensions_used: Vec<String>,
    #[serde(default)]
    pub extensions_required: Vec<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

fn fetch<T>(list: &[T], kind: AssetKind, index: usize) -> Result<&T, GltfLoaderError> {
    list.get(index)
        .ok_or(GltfLoaderError::IndexOutOfBounds(AssetIndex::new(kind, index)))
}

impl Document {
    pub fn from_slice(data: &[u8]) -> Result<Self, GltfLoaderError> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn from_value(value: Value) -> Result<Self, GltfLoaderError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn scene(&self, index: usize) -> Result<&SceneDef, GltfLoaderError> {
        fetch(&self.scenes, AssetKind::Scene, index)
    }

    pub fn node(&self, index: usize) -> Result<&NodeDef, GltfLoaderError> {
        fetch(&self.nodes, AssetKind::Node, index)
    }

    pub fn mesh(&self, index: usize) -> Result<&MeshDef, GltfLoaderError> {
        fetch(&self.meshes, AssetKind::Mesh, index)
    }

    /// A primitive of a mesh. A bad primitive index is reported against
    /// the mesh.
    pub fn primitive(&self, mesh: usize, primitive: usize) -> Result<&PrimitiveDef, GltfLoaderError> {
        self.mesh(mesh)?
            .primitives
            .get(primitive)
            .ok_or(GltfLoaderError::IndexOutOfBounds(AssetIndex::new(
                AssetKind::Mesh,
                mesh,
            )))
    }

    pub fn material(&self, index: usize) -> Result<&MaterialDef, GltfLoaderError> {
        fetch(&self.materials, AssetKind::Material, index)
    }

    pub fn accessor(&self, index: usize) -> Result<&AccessorDef, GltfLoaderError> {
        fetch(&self.accessors, AssetKind::Accessor, index)
    }

    pub fn buffer_view(&self, index: usize) -> Result<&BufferViewDef, GltfLoaderError> {
        fetch(&self.buffer_views, AssetKind::BufferView, index)
    }

    pub fn buffer(&self, index: usize) -> Result<&BufferDef, GltfLoaderError> {
        fetch(&self.buffers, AssetKind::Buffer, index)
    }

    pub fn skin(&self, index: usize) -> Result<&SkinDef, GltfLoaderError> {
        fetch(&self.skins, AssetKind::Skin, index)
    }

    pub fn animation(&self, index: usize) -> Result<&AnimationDef, GltfLoaderError> {
        fetch(&self.animations, AssetKind::Animation, index)
    }

    pub fn camera(&self, index: usize) -> Result<&CameraDef, GltfLoaderError> {
        fetch(&self.cameras, AssetKind::Camera, index)
    }

    pub fn texture(&self, index: usize) -> Result<&TextureDef, GltfLoaderError> {
        fetch(&self.textures, AssetKind::Texture, index)
    }

    pub fn image(&self, index: usize) -> Result<&ImageDef, GltfLoaderError> {
        fetch(&self.images, AssetKind::Image, index)
    }

    pub fn sampler(&self, index: usize) -> Result<&SamplerDef, GltfLoaderError> {
        fetch(&self.samplers, AssetKind::Sampler, index)
    }

    pub fn is_extension_required(&self, name: &str) -> bool {
        self.extensions_required.iter().any(|required| required == name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDef {
    #[serde(default)]
    pub nodes: Vec<usize>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
    pub camera: Option<usize>,
    #[serde(default)]
    pub children: Vec<usize>,
    pub skin: Option<usize>,
    pub matrix: Option<[f32; 16]>,
    pub mesh: Option<usize>,
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    pub translation: Option<[f32; 3]>,
    pub weights: Option<Vec<f32>>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshDef {
    #[serde(default)]
    pub primitives: Vec<PrimitiveDef>,
    pub weights: Option<Vec<f32>>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

fn default_mode() -> u32 {
    4
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimitiveDef {
    #[serde(default)]
    pub attributes: BTreeMap<String, usize>,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    #[serde(default = "default_mode")]
    pub mode: u32,
    #[serde(default)]
    pub targets: Vec<BTreeMap<String, usize>>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorDef {
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    #[serde(default)]
    pub normalized: bool,
    pub count: usize,
    #[serde(rename = "type")]
    pub shape: String,
    pub max: Option<Vec<f64>>,
    pub min: Option<Vec<f64>>,
    pub sparse: Option<SparseDef>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseDef {
    pub count: usize,
    pub indices: SparseIndicesDef,
    pub values: SparseValuesDef,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseIndicesDef {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SparseValuesDef {
    pub buffer_view: usize,
    #[serde(default)]
    pub byte_offset: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferViewDef {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<u32>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferDef {
    pub uri: Option<String>,
    pub byte_length: usize,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlphaModeDef {
    #[default]
    Opaque,
    Mask,
    Blend,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDef {
    pub name: Option<String>,
    pub pbr_metallic_roughness: Option<PbrMetallicRoughnessDef>,
    pub normal_texture: Option<TextureInfoDef>,
    pub occlusion_texture: Option<TextureInfoDef>,
    pub emissive_texture: Option<TextureInfoDef>,
    pub emissive_factor: Option<[f32; 3]>,
    #[serde(default)]
    pub alpha_mode: AlphaModeDef,
    pub alpha_cutoff: Option<f32>,
    #[serde(default)]
    pub double_sided: bool,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PbrMetallicRoughnessDef {
    pub base_color_factor: Option<[f32; 4]>,
    pub base_color_texture: Option<TextureInfoDef>,
    pub metallic_factor: Option<f32>,
    pub roughness_factor: Option<f32>,
    pub metallic_roughness_texture: Option<TextureInfoDef>,
}

/// Texture reference of any material slot. `scale` is only meaningful for
/// normal maps and `strength` for occlusion maps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureInfoDef {
    pub index: usize,
    #[serde(default)]
    pub tex_coord: usize,
    pub scale: Option<f32>,
    pub strength: Option<f32>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureDef {
    pub sampler: Option<usize>,
    pub source: Option<usize>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDef {
    pub uri: Option<String>,
    pub mime_type: Option<String>,
    pub buffer_view: Option<usize>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

fn default_wrap() -> u32 {
    10497
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerDef {
    pub mag_filter: Option<u32>,
    pub min_filter: Option<u32>,
    #[serde(default = "default_wrap")]
    pub wrap_s: u32,
    #[serde(default = "default_wrap")]
    pub wrap_t: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinDef {
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
    #[serde(default)]
    pub joints: Vec<usize>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationDef {
    #[serde(default)]
    pub channels: Vec<ChannelDef>,
    #[serde(default)]
    pub samplers: Vec<AnimationSamplerDef>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDef {
    pub sampler: usize,
    pub target: ChannelTargetDef,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTargetDef {
    pub node: Option<usize>,
    pub path: String,
    #[serde(default)]
    pub extensions: Extensions,
}

fn default_interpolation() -> String {
    String::from("LINEAR")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationSamplerDef {
    pub input: usize,
    #[serde(default = "default_interpolation")]
    pub interpolation: String,
    pub output: usize,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDef {
    #[serde(rename = "type")]
    pub kind: String,
    pub perspective: Option<PerspectiveDef>,
    pub orthographic: Option<OrthographicDef>,
    pub name: Option<String>,
    #[serde(default)]
    pub extensions: Extensions,
    pub extras: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveDef {
    pub aspect_ratio: Option<f32>,
    pub yfov: f32,
    pub zfar: Option<f32>,
    pub znear: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrthographicDef {
    pub xmag: f32,
    pub ymag: f32,
    pub zfar: f32,
    pub znear: f32,
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{AlphaModeDef, Document};

    #[test]
    fn test_defaults() {
        let document = Document::from_value(json!({
            "asset": { "version": "2.0" },
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "materials": [{ "alphaMode": "MASK" }],
            "samplers": [{}],
            "animations": [{
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": "rotation" } }],
                "samplers": [{ "input": 0, "output": 1 }]
            }]
        }))
        .unwrap();
        assert_eq!(document.asset.version, "2.0");
        assert_eq!(document.meshes[0].primitives[0].mode, 4);
        assert_eq!(document.materials[0].alpha_mode, AlphaModeDef::Mask);
        assert_eq!(document.samplers[0].wrap_s, 10497);
        assert_eq!(document.animations[0].samplers[0].interpolation, "LINEAR");
        assert!(document.node(0).is_err());
    }
}
