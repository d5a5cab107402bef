use std::sync::Arc;

use futures::{
    future::{try_join5, try_join_all},
    FutureExt,
};

use crate::{
    index::{AssetIndex, AssetKind},
    material::{MaterialAlphaMode, MaterialAsset, MaterialKind},
    texture::{ColorSpace, NormalTextureInfo, OcclusionTextureInfo},
};

use super::{
    document::{AlphaModeDef, TextureInfoDef},
    plugin::PluginHook,
    GltfParser, Pending,
};

const DEFAULT_ALPHA_CUTOFF: f32 = 0.5;

/// Unlit materials only keep their base color texture.
fn lit(unlit: bool, info: Option<&TextureInfoDef>) -> Option<&TextureInfoDef> {
    if unlit {
        None
    } else {
        info
    }
}

impl GltfParser {
    /// Material of primitives that reference none.
    pub fn default_material(&self) -> Arc<MaterialAsset> {
        self.caches
            .default_material
            .get_or_init(|| Arc::new(MaterialAsset::default()))
            .clone()
    }

    pub fn material_kind(&self, index: usize) -> MaterialKind {
        self.plugins
            .invoke_one(PluginHook::MaterialKind, |plugin| {
                plugin.material_kind(self, index)
            })
            .unwrap_or_default()
    }

    pub fn load_material(self: &Arc<Self>, index: usize) -> Pending<Arc<MaterialAsset>> {
        let parser = self.clone();
        self.caches.materials.get_or_create(index, move || {
            async move {
                let def = parser.document.material(index)?;
                let kind = parser.material_kind(index);
                let unlit = kind == MaterialKind::Unlit;

                let pbr = def.pbr_metallic_roughness.clone().unwrap_or_default();
                let (
                    base_color_texture,
                    metallic_roughness_texture,
                    normal_texture,
                    occlusion_texture,
                    emissive_texture,
                ) = try_join5(
                    parser.assign_texture(pbr.base_color_texture.as_ref(), ColorSpace::Srgb),
                    parser.assign_texture(
                        lit(unlit, pbr.metallic_roughness_texture.as_ref()),
                        ColorSpace::Linear,
                    ),
                    parser.assign_texture(
                        lit(unlit, def.normal_texture.as_ref()),
                        ColorSpace::Linear,
                    ),
                    parser.assign_texture(
                        lit(unlit, def.occlusion_texture.as_ref()),
                        ColorSpace::Linear,
                    ),
                    parser.assign_texture(
                        lit(unlit, def.emissive_texture.as_ref()),
                        ColorSpace::Srgb,
                    ),
                )
                .await?;

                let extensions = if unlit {
                    Vec::new()
                } else {
                    parser
                        .plugins
                        .invoke_all(PluginHook::ExtendMaterialParams, |plugin| {
                            plugin.extend_material_params(&parser, index)
                        })
                };
                let extensions = try_join_all(extensions).await?;

                let mut material = MaterialAsset {
                    id: Some(AssetIndex::new(AssetKind::Material, index)),
                    name: def.name.clone(),
                    kind,
                    base_color_factor: pbr.base_color_factor.unwrap_or([1.0, 1.0, 1.0, 1.0]),
                    base_color_texture,
                    metallic_factor: pbr.metallic_factor.unwrap_or(1.0),
                    roughness_factor: pbr.roughness_factor.unwrap_or(1.0),
                    metallic_roughness_texture,
                    normal_texture: normal_texture.map(|info| NormalTextureInfo {
                        info,
                        scale: def
                            .normal_texture
                            .as_ref()
                            .and_then(|texture| texture.scale)
                            .unwrap_or(1.0),
                    }),
                    occlusion_texture: occlusion_texture.map(|info| OcclusionTextureInfo {
                        info,
                        strength: def
                            .occlusion_texture
                            .as_ref()
                            .and_then(|texture| texture.strength)
                            .unwrap_or(1.0),
                    }),
                    emissive_texture,
                    emissive_factor: match def.emissive_factor {
                        Some(factor) if !unlit => factor,
                        _ => [0.0, 0.0, 0.0],
                    },
                    alpha_mode: match def.alpha_mode {
                        AlphaModeDef::Opaque => MaterialAlphaMode::Opaque,
                        AlphaModeDef::Mask => MaterialAlphaMode::Mask(
                            def.alpha_cutoff.unwrap_or(DEFAULT_ALPHA_CUTOFF),
                        ),
                        AlphaModeDef::Blend => MaterialAlphaMode::Blend,
                    },
                    double_sided: def.double_sided,
                    user_data: parser.user_data(&def.extras, &def.extensions),
                    ..Default::default()
                };
                for extension in extensions {
                    material.apply(extension);
                }
                Ok(Arc::new(material))
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use serde_json::json;

    use crate::material::{MaterialAlphaMode, MaterialKind};

    use super::super::{document::TextureInfoDef, GltfParser};
    use super::lit;

    #[test]
    fn test_core_material() {
        let parser = GltfParser::for_test(
            json!({
                "asset": { "version": "2.0" },
                "materials": [
                    {
                        "name": "skin",
                        "pbrMetallicRoughness": {
                            "baseColorFactor": [1.0, 0.5, 0.5, 1.0],
                            "metallicFactor": 0.0
                        },
                        "emissiveFactor": [0.1, 0.2, 0.3],
                        "alphaMode": "MASK",
                        "doubleSided": true,
                        "extensions": { "EXT_unknown": { "value": 1 } },
                        "extras": { "tag": "face" }
                    },
                    { "alphaMode": "MASK", "alphaCutoff": 0.25 },
                    { "alphaMode": "BLEND" }
                ]
            }),
            None,
        );
        let material = pollster::block_on(parser.load_material(0)).unwrap();
        assert_eq!(material.name.as_deref(), Some("skin"));
        assert_eq!(material.kind, MaterialKind::Standard);
        assert_eq!(material.base_color_factor, [1.0, 0.5, 0.5, 1.0]);
        assert_eq!(material.metallic_factor, 0.0);
        assert_eq!(material.roughness_factor, 1.0);
        assert_eq!(material.emissive_factor, [0.1, 0.2, 0.3]);
        assert_eq!(material.alpha_mode, MaterialAlphaMode::Mask(0.5));
        assert!(material.double_sided);
        assert!(material.user_data.extensions.contains_key("EXT_unknown"));
        assert_eq!(material.user_data.extras, Some(json!({ "tag": "face" })));

        let material = pollster::block_on(parser.load_material(1)).unwrap();
        assert_eq!(material.alpha_mode, MaterialAlphaMode::Mask(0.25));
        let material = pollster::block_on(parser.load_material(2)).unwrap();
        assert!(material.alpha_mode.transparent());
        assert!(!material.double_sided);
    }

    #[test]
    fn test_default_material() {
        let parser = GltfParser::for_test(json!({ "asset": { "version": "2.0" } }), None);
        let first = parser.default_material();
        let second = parser.default_material();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.id, None);
        assert_eq!(first.base_color_factor, [1.0; 4]);
        assert_eq!(first.alpha_mode, MaterialAlphaMode::Opaque);
    }

    #[test]
    fn test_unlit_texture_slots() {
        let info = TextureInfoDef::default();
        assert!(lit(false, Some(&info)).is_some());
        assert!(lit(true, Some(&info)).is_none());
        assert!(lit(false, None).is_none());
    }
}
