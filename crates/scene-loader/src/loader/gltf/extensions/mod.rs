//! Built-in extension plugins.
//!
//! Each plugin handles one extension name. [`register_builtin`] installs
//! all of them on a loader; any of them may be unregistered or replaced.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{document::Extensions, GltfLoader, GltfLoaderError, GltfPlugin};

pub mod draco;
pub mod instancing;
pub mod lights;
pub mod materials;
pub mod meshopt;
pub mod mtoon;
pub mod texture_source;
pub mod texture_transform;
pub mod unlit;

pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";
pub const KHR_MATERIALS_CLEARCOAT: &str = "KHR_materials_clearcoat";
pub const KHR_MATERIALS_SHEEN: &str = "KHR_materials_sheen";
pub const KHR_MATERIALS_TRANSMISSION: &str = "KHR_materials_transmission";
pub const KHR_MATERIALS_VOLUME: &str = "KHR_materials_volume";
pub const KHR_MATERIALS_IOR: &str = "KHR_materials_ior";
pub const KHR_MATERIALS_SPECULAR: &str = "KHR_materials_specular";
pub const KHR_MATERIALS_ANISOTROPY: &str = "KHR_materials_anisotropy";
pub const KHR_MATERIALS_IRIDESCENCE: &str = "KHR_materials_iridescence";
pub const KHR_MATERIALS_DISPERSION: &str = "KHR_materials_dispersion";
pub const KHR_MATERIALS_EMISSIVE_STRENGTH: &str = "KHR_materials_emissive_strength";
pub const EXT_MATERIALS_BUMP: &str = "EXT_materials_bump";
pub const VRMC_MATERIALS_MTOON: &str = "VRMC_materials_mtoon";
pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";
pub const KHR_TEXTURE_BASISU: &str = "KHR_texture_basisu";
pub const EXT_TEXTURE_WEBP: &str = "EXT_texture_webp";
pub const EXT_TEXTURE_AVIF: &str = "EXT_texture_avif";
pub const KHR_LIGHTS_PUNCTUAL: &str = "KHR_lights_punctual";
pub const EXT_MESH_GPU_INSTANCING: &str = "EXT_mesh_gpu_instancing";
pub const EXT_MESHOPT_COMPRESSION: &str = "EXT_meshopt_compression";
pub const KHR_DRACO_MESH_COMPRESSION: &str = "KHR_draco_mesh_compression";
pub const KHR_MESH_QUANTIZATION: &str = "KHR_mesh_quantization";

/// Deserializes the payload of extension `name`, if present.
pub fn extension_data<T: DeserializeOwned>(
    extensions: &Extensions,
    name: &str,
) -> Result<Option<T>, GltfLoaderError> {
    extensions
        .get(name)
        .map(|value| parse_extension_value(name, value))
        .transpose()
}

pub fn parse_extension_value<T: DeserializeOwned>(
    name: &str,
    value: &Value,
) -> Result<T, GltfLoaderError> {
    T::deserialize(value).map_err(|_| GltfLoaderError::BadExtensionData(name.to_string()))
}

/// An extension whose data is read elsewhere. Registering it marks the
/// extension as supported.
pub struct Recognized(pub &'static str);

impl GltfPlugin for Recognized {
    fn name(&self) -> &str {
        self.0
    }
}

/// Installs every built-in plugin. Kind selection stops at the first
/// plugin that answers, so the toon model wins over unlit and both win
/// over the physical extensions.
pub fn register_builtin(loader: GltfLoader) -> GltfLoader {
    let mut loader = loader
        .register(VRMC_MATERIALS_MTOON, |_| Arc::new(mtoon::MToonPlugin))
        .register(KHR_MATERIALS_UNLIT, |params| {
            Arc::new(unlit::UnlitPlugin {
                disabled: params.disable_unlit,
            })
        });
    for extension in materials::PhysicalExtension::ALL {
        loader = loader.register(extension.name(), move |_| {
            Arc::new(materials::PhysicalMaterialPlugin(extension))
        });
    }
    loader
        .register(EXT_TEXTURE_WEBP, |_| {
            Arc::new(texture_source::TextureSourcePlugin::new(
                EXT_TEXTURE_WEBP,
                "image/webp",
            ))
        })
        .register(EXT_TEXTURE_AVIF, |_| {
            Arc::new(texture_source::TextureSourcePlugin::new(
                EXT_TEXTURE_AVIF,
                "image/avif",
            ))
        })
        .register(KHR_TEXTURE_BASISU, |_| {
            Arc::new(texture_source::TextureSourcePlugin::new(
                KHR_TEXTURE_BASISU,
                "image/ktx2",
            ))
        })
        .register(KHR_LIGHTS_PUNCTUAL, |_| {
            Arc::new(lights::LightsPunctualPlugin::default())
        })
        .register(EXT_MESHOPT_COMPRESSION, |_| {
            Arc::new(meshopt::MeshoptPlugin::new(None))
        })
        .register(EXT_MESH_GPU_INSTANCING, |_| {
            Arc::new(instancing::GpuInstancingPlugin)
        })
        .register(KHR_DRACO_MESH_COMPRESSION, |_| {
            Arc::new(draco::DracoPlugin::new(None))
        })
        .register(KHR_TEXTURE_TRANSFORM, |_| {
            Arc::new(Recognized(KHR_TEXTURE_TRANSFORM))
        })
        .register(KHR_MESH_QUANTIZATION, |_| {
            Arc::new(Recognized(KHR_MESH_QUANTIZATION))
        })
}

#[cfg(test)]
mod test {
    use crate::loader::AssetLoadParams;

    use super::super::GltfLoader;

    #[test]
    fn test_builtin_order() {
        let loader = GltfLoader::new(AssetLoadParams::default());
        let names: Vec<&str> = loader.plugin_names().collect();
        assert_eq!(names[0], "VRMC_materials_mtoon");
        assert_eq!(names[1], "KHR_materials_unlit");
        assert!(names.contains(&"KHR_materials_clearcoat"));
        assert!(names.contains(&"KHR_draco_mesh_compression"));
        assert_eq!(names.last(), Some(&"KHR_mesh_quantization"));

        let loader = loader.unregister("KHR_materials_unlit");
        assert!(!loader.plugin_names().any(|name| name == "KHR_materials_unlit"));
    }
}
