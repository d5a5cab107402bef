/// glTF 2.0 / GLB / VRM loader.
pub mod gltf;

/// Byte fetching for external buffers and images.
pub mod resource;

/// Image decoding for textures.
pub mod texture;

#[derive(Debug, Clone)]
pub struct AssetLoadParams {
    pub disable_unlit: bool,
    pub bundle_model_name: String,
    pub bundle_model_extension: bool,
}

impl Default for AssetLoadParams {
    fn default() -> Self {
        Self {
            disable_unlit: false,
            bundle_model_name: String::from("model"),
            bundle_model_extension: true,
        }
    }
}

impl AssetLoadParams {
    pub(crate) fn bundle_model_filename(&self, extension: &str) -> String {
        if self.bundle_model_extension {
            format!("{}.{}", self.bundle_model_name, extension)
        } else {
            self.bundle_model_name.clone()
        }
    }
}
