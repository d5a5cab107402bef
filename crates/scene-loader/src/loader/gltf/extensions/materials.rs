//! The KHR_materials_* family and EXT_materials_bump.
//!
//! Every extension here contributes its own parameter block. All except
//! emissive strength also switch the material to the physical model.

use std::sync::Arc;

use futures::{
    future::{try_join, try_join3},
    FutureExt,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    material::{
        AnisotropyParams, BumpParams, ClearcoatParams, IridescenceParams, MaterialExtensionData,
        MaterialKind, SheenParams, SpecularParams, TransmissionParams, VolumeParams,
    },
    texture::{ColorSpace, NormalTextureInfo},
};

use super::{
    super::{document::TextureInfoDef, plugin::PluginFuture, GltfParser},
    parse_extension_value, GltfPlugin, EXT_MATERIALS_BUMP, KHR_MATERIALS_ANISOTROPY,
    KHR_MATERIALS_CLEARCOAT, KHR_MATERIALS_DISPERSION, KHR_MATERIALS_EMISSIVE_STRENGTH,
    KHR_MATERIALS_IOR, KHR_MATERIALS_IRIDESCENCE, KHR_MATERIALS_SHEEN, KHR_MATERIALS_SPECULAR,
    KHR_MATERIALS_TRANSMISSION, KHR_MATERIALS_VOLUME,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalExtension {
    Clearcoat,
    Dispersion,
    Sheen,
    Transmission,
    Volume,
    Iridescence,
    EmissiveStrength,
    Specular,
    Ior,
    Bump,
    Anisotropy,
}

impl PhysicalExtension {
    pub const ALL: [PhysicalExtension; 11] = [
        PhysicalExtension::Clearcoat,
        PhysicalExtension::Dispersion,
        PhysicalExtension::Sheen,
        PhysicalExtension::Transmission,
        PhysicalExtension::Volume,
        PhysicalExtension::Iridescence,
        PhysicalExtension::EmissiveStrength,
        PhysicalExtension::Specular,
        PhysicalExtension::Ior,
        PhysicalExtension::Bump,
        PhysicalExtension::Anisotropy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PhysicalExtension::Clearcoat => KHR_MATERIALS_CLEARCOAT,
            PhysicalExtension::Dispersion => KHR_MATERIALS_DISPERSION,
            PhysicalExtension::Sheen => KHR_MATERIALS_SHEEN,
            PhysicalExtension::Transmission => KHR_MATERIALS_TRANSMISSION,
            PhysicalExtension::Volume => KHR_MATERIALS_VOLUME,
            PhysicalExtension::Iridescence => KHR_MATERIALS_IRIDESCENCE,
            PhysicalExtension::EmissiveStrength => KHR_MATERIALS_EMISSIVE_STRENGTH,
            PhysicalExtension::Specular => KHR_MATERIALS_SPECULAR,
            PhysicalExtension::Ior => KHR_MATERIALS_IOR,
            PhysicalExtension::Bump => EXT_MATERIALS_BUMP,
            PhysicalExtension::Anisotropy => KHR_MATERIALS_ANISOTROPY,
        }
    }

    /// Whether the extension needs the physical model.
    pub fn selects_physical(self) -> bool {
        self != PhysicalExtension::EmissiveStrength
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClearcoatDef {
    clearcoat_factor: Option<f32>,
    clearcoat_texture: Option<TextureInfoDef>,
    clearcoat_roughness_factor: Option<f32>,
    clearcoat_roughness_texture: Option<TextureInfoDef>,
    clearcoat_normal_texture: Option<TextureInfoDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheenDef {
    sheen_color_factor: Option<[f32; 3]>,
    sheen_color_texture: Option<TextureInfoDef>,
    sheen_roughness_factor: Option<f32>,
    sheen_roughness_texture: Option<TextureInfoDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransmissionDef {
    transmission_factor: Option<f32>,
    transmission_texture: Option<TextureInfoDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeDef {
    thickness_factor: Option<f32>,
    thickness_texture: Option<TextureInfoDef>,
    attenuation_distance: Option<f32>,
    attenuation_color: Option<[f32; 3]>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IorDef {
    ior: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecularDef {
    specular_factor: Option<f32>,
    specular_texture: Option<TextureInfoDef>,
    specular_color_factor: Option<[f32; 3]>,
    specular_color_texture: Option<TextureInfoDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnisotropyDef {
    anisotropy_strength: Option<f32>,
    anisotropy_rotation: Option<f32>,
    anisotropy_texture: Option<TextureInfoDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IridescenceDef {
    iridescence_factor: Option<f32>,
    iridescence_texture: Option<TextureInfoDef>,
    iridescence_ior: Option<f32>,
    iridescence_thickness_minimum: Option<f32>,
    iridescence_thickness_maximum: Option<f32>,
    iridescence_thickness_texture: Option<TextureInfoDef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DispersionDef {
    dispersion: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmissiveStrengthDef {
    emissive_strength: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BumpDef {
    bump_factor: Option<f32>,
    bump_texture: Option<TextureInfoDef>,
}

/// Handles one extension of the physical family.
pub struct PhysicalMaterialPlugin(pub PhysicalExtension);

impl GltfPlugin for PhysicalMaterialPlugin {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn material_kind(&self, parser: &GltfParser, index: usize) -> Option<MaterialKind> {
        if !self.0.selects_physical() {
            return None;
        }
        let material = parser.document().material(index).ok()?;
        material
            .extensions
            .contains_key(self.0.name())
            .then_some(MaterialKind::Physical)
    }

    fn extend_material_params(
        &self,
        parser: &Arc<GltfParser>,
        index: usize,
    ) -> Option<PluginFuture<MaterialExtensionData>> {
        let material = parser.document().material(index).ok()?;
        let value = material.extensions.get(self.0.name())?.clone();
        Some(load_params(self.0, parser.clone(), value))
    }
}

fn load_params(
    extension: PhysicalExtension,
    parser: Arc<GltfParser>,
    value: Value,
) -> PluginFuture<MaterialExtensionData> {
    let name = extension.name();
    async move {
        let data = match extension {
            PhysicalExtension::Clearcoat => {
                let def: ClearcoatDef = parse_extension_value(name, &value)?;
                let (texture, roughness_texture, normal_texture) = try_join3(
                    parser.assign_texture(def.clearcoat_texture.as_ref(), ColorSpace::Linear),
                    parser.assign_texture(
                        def.clearcoat_roughness_texture.as_ref(),
                        ColorSpace::Linear,
                    ),
                    parser.assign_texture(
                        def.clearcoat_normal_texture.as_ref(),
                        ColorSpace::Linear,
                    ),
                )
                .await?;
                MaterialExtensionData::Clearcoat(ClearcoatParams {
                    factor: def.clearcoat_factor.unwrap_or(0.0),
                    texture,
                    roughness_factor: def.clearcoat_roughness_factor.unwrap_or(0.0),
                    roughness_texture,
                    normal_texture: normal_texture.map(|info| NormalTextureInfo {
                        info,
                        scale: def
                            .clearcoat_normal_texture
                            .as_ref()
                            .and_then(|texture| texture.scale)
                            .unwrap_or(1.0),
                    }),
                })
            }
            PhysicalExtension::Sheen => {
                let def: SheenDef = parse_extension_value(name, &value)?;
                let (color_texture, roughness_texture) = try_join(
                    parser.assign_texture(def.sheen_color_texture.as_ref(), ColorSpace::Srgb),
                    parser.assign_texture(def.sheen_roughness_texture.as_ref(), ColorSpace::Linear),
                )
                .await?;
                MaterialExtensionData::Sheen(SheenParams {
                    color_factor: def.sheen_color_factor.unwrap_or([0.0, 0.0, 0.0]),
                    color_texture,
                    roughness_factor: def.sheen_roughness_factor.unwrap_or(0.0),
                    roughness_texture,
                })
            }
            PhysicalExtension::Transmission => {
                let def: TransmissionDef = parse_extension_value(name, &value)?;
                let texture = parser
                    .assign_texture(def.transmission_texture.as_ref(), ColorSpace::Linear)
                    .await?;
                MaterialExtensionData::Transmission(TransmissionParams {
                    factor: def.transmission_factor.unwrap_or(0.0),
                    texture,
                })
            }
            PhysicalExtension::Volume => {
                let def: VolumeDef = parse_extension_value(name, &value)?;
                let thickness_texture = parser
                    .assign_texture(def.thickness_texture.as_ref(), ColorSpace::Linear)
                    .await?;
                let default = VolumeParams::default();
                MaterialExtensionData::Volume(VolumeParams {
                    thickness_factor: def.thickness_factor.unwrap_or(default.thickness_factor),
                    thickness_texture,
                    attenuation_distance: def
                        .attenuation_distance
                        .unwrap_or(default.attenuation_distance),
                    attenuation_color: def.attenuation_color.unwrap_or(default.attenuation_color),
                })
            }
            PhysicalExtension::Ior => {
                let def: IorDef = parse_extension_value(name, &value)?;
                MaterialExtensionData::Ior(def.ior.unwrap_or(1.5))
            }
            PhysicalExtension::Specular => {
                let def: SpecularDef = parse_extension_value(name, &value)?;
                let (texture, color_texture) = try_join(
                    parser.assign_texture(def.specular_texture.as_ref(), ColorSpace::Linear),
                    parser.assign_texture(def.specular_color_texture.as_ref(), ColorSpace::Srgb),
                )
                .await?;
                let default = SpecularParams::default();
                MaterialExtensionData::Specular(SpecularParams {
                    factor: def.specular_factor.unwrap_or(default.factor),
                    texture,
                    color_factor: def.specular_color_factor.unwrap_or(default.color_factor),
                    color_texture,
                })
            }
            PhysicalExtension::Anisotropy => {
                let def: AnisotropyDef = parse_extension_value(name, &value)?;
                let texture = parser
                    .assign_texture(def.anisotropy_texture.as_ref(), ColorSpace::Linear)
                    .await?;
                MaterialExtensionData::Anisotropy(AnisotropyParams {
                    strength: def.anisotropy_strength.unwrap_or(0.0),
                    rotation: def.anisotropy_rotation.unwrap_or(0.0),
                    texture,
                })
            }
            PhysicalExtension::Iridescence => {
                let def: IridescenceDef = parse_extension_value(name, &value)?;
                let (texture, thickness_texture) = try_join(
                    parser.assign_texture(def.iridescence_texture.as_ref(), ColorSpace::Linear),
                    parser.assign_texture(
                        def.iridescence_thickness_texture.as_ref(),
                        ColorSpace::Linear,
                    ),
                )
                .await?;
                let default = IridescenceParams::default();
                MaterialExtensionData::Iridescence(IridescenceParams {
                    factor: def.iridescence_factor.unwrap_or(default.factor),
                    texture,
                    ior: def.iridescence_ior.unwrap_or(default.ior),
                    thickness_range: [
                        def.iridescence_thickness_minimum
                            .unwrap_or(default.thickness_range[0]),
                        def.iridescence_thickness_maximum
                            .unwrap_or(default.thickness_range[1]),
                    ],
                    thickness_texture,
                })
            }
            PhysicalExtension::Dispersion => {
                let def: DispersionDef = parse_extension_value(name, &value)?;
                MaterialExtensionData::Dispersion(def.dispersion.unwrap_or(0.0))
            }
            PhysicalExtension::EmissiveStrength => {
                let def: EmissiveStrengthDef = parse_extension_value(name, &value)?;
                MaterialExtensionData::EmissiveStrength(def.emissive_strength.unwrap_or(1.0))
            }
            PhysicalExtension::Bump => {
                let def: BumpDef = parse_extension_value(name, &value)?;
                let texture = parser
                    .assign_texture(def.bump_texture.as_ref(), ColorSpace::Linear)
                    .await?;
                MaterialExtensionData::Bump(BumpParams {
                    factor: def.bump_factor.unwrap_or(1.0),
                    texture,
                })
            }
        };
        Ok(data)
    }
    .boxed()
}

#[cfg(test)]
mod test {
    use super::PhysicalExtension;

    #[test]
    fn test_names() {
        assert_eq!(
            PhysicalExtension::Clearcoat.name(),
            "KHR_materials_clearcoat"
        );
        assert_eq!(PhysicalExtension::Bump.name(), "EXT_materials_bump");
        assert!(!PhysicalExtension::EmissiveStrength.selects_physical());
        assert_eq!(
            PhysicalExtension::ALL
                .iter()
                .filter(|extension| extension.selects_physical())
                .count(),
            10
        );
    }
}
