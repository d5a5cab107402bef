#![allow(dead_code)]

use std::sync::Arc;

use scene_loader::{
    loader::{
        gltf::{container::write_container, GltfAsset, GltfLoader},
        texture::{DecodedImage, ImageDecodeError, ImageDecoder},
        AssetLoadParams,
    },
    mesh::MeshAsset,
    scene::SceneNode,
    texture::TextureAssetFormat,
};
use serde_json::{json, Value};

/// Lays out a binary chunk and the buffer views pointing into it.
#[derive(Default)]
pub struct BinBuilder {
    pub data: Vec<u8>,
    pub views: Vec<Value>,
}

impl BinBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a view and returns its index.
    pub fn push(&mut self, bytes: &[u8]) -> usize {
        while self.data.len() % 4 != 0 {
            self.data.push(0);
        }
        let offset = self.data.len();
        self.data.extend_from_slice(bytes);
        self.views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": bytes.len()
        }));
        self.views.len() - 1
    }

    pub fn push_f32(&mut self, values: &[f32]) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        self.push(&bytes)
    }

    pub fn push_u16(&mut self, values: &[u16]) -> usize {
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        self.push(&bytes)
    }

    /// Completes `document` with the buffer and its views, and packs both
    /// into a binary container.
    pub fn container(&self, mut document: Value) -> Vec<u8> {
        document["buffers"] = json!([{ "byteLength": self.data.len() }]);
        document["bufferViews"] = Value::Array(self.views.clone());
        let json = serde_json::to_vec(&document).unwrap();
        write_container(&json, Some(&self.data))
    }
}

pub const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

/// A buffer holding one triangle: view 0 has positions, view 1 indices.
pub fn triangle_bin() -> BinBuilder {
    let mut bin = BinBuilder::new();
    bin.push_f32(&TRIANGLE);
    bin.push_u16(&[0, 1, 2]);
    bin
}

/// Accessors 0 and 1 over [`triangle_bin`].
pub fn triangle_accessors() -> Value {
    json!([
        {
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        },
        { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
    ])
}

pub fn parse(data: Vec<u8>) -> GltfAsset {
    GltfLoader::new(AssetLoadParams::default())
        .parse_blocking(data)
        .unwrap()
}

pub fn node_mesh(node: &SceneNode) -> Arc<MeshAsset> {
    node.attachments
        .iter()
        .find_map(|attachment| match attachment {
            scene_loader::node::NodeAttachment::Mesh(mesh) => Some(mesh.clone()),
            _ => None,
        })
        .unwrap()
}

/// Accepts PNG and WebP. Images whose bytes read `bad` fail to decode;
/// anything else becomes one RGBA pixel made of the first four bytes.
pub struct StubDecoder;

impl ImageDecoder for StubDecoder {
    fn supports(&self, mime: &str) -> bool {
        matches!(mime, "image/png" | "image/webp")
    }

    fn decode(&self, data: &[u8], mime: Option<&str>) -> Result<DecodedImage, ImageDecodeError> {
        if let Some(mime) = mime {
            if !self.supports(mime) {
                return Err(ImageDecodeError::UnsupportedMime(mime.to_string()));
            }
        }
        if data == b"bad" {
            return Err(ImageDecodeError::Decode(String::from("corrupt")));
        }
        let mut pixel = data.iter().copied().take(4).collect::<Vec<u8>>();
        pixel.resize(4, 255);
        Ok(DecodedImage {
            size: (1, 1),
            format: TextureAssetFormat::Rgbau8,
            data: pixel,
        })
    }
}

pub fn stub_loader() -> GltfLoader {
    GltfLoader::new(AssetLoadParams::default()).with_image_decoder(StubDecoder)
}
