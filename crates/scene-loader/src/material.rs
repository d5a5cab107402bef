use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{
    index::AssetIndex,
    node::UserData,
    texture::{
        NormalTextureInfo, OcclusionTextureInfo, ShadingShiftTextureInfo, TextureAsset, TextureInfo,
    },
};

/// Lighting model of a resolved material.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MaterialKind {
    /// The metallic-roughness model of glTF core.
    #[default]
    Standard,
    /// Metallic-roughness with the KHR_materials_* extensions.
    Physical,
    /// KHR_materials_unlit. The simplest lighting model.
    Unlit,
    /// Lighting model for VRM.
    MToon,
    /// A model contributed by a third-party plugin.
    Custom(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum MaterialAlphaMode {
    #[default]
    Opaque,
    // Alpha cutoff
    Mask(f32),
    Blend,
}

impl MaterialAlphaMode {
    pub fn transparent(&self) -> bool {
        matches!(self, MaterialAlphaMode::Blend)
    }

    pub fn depth_write(&self) -> bool {
        !self.transparent()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClearcoatParams {
    pub factor: f32,
    pub texture: Option<TextureInfo>,
    pub roughness_factor: f32,
    pub roughness_texture: Option<TextureInfo>,
    pub normal_texture: Option<NormalTextureInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct SheenParams {
    pub color_factor: [f32; 3],
    pub color_texture: Option<TextureInfo>,
    pub roughness_factor: f32,
    pub roughness_texture: Option<TextureInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct TransmissionParams {
    pub factor: f32,
    pub texture: Option<TextureInfo>,
}

#[derive(Debug, Clone)]
pub struct VolumeParams {
    pub thickness_factor: f32,
    pub thickness_texture: Option<TextureInfo>,
    pub attenuation_distance: f32,
    pub attenuation_color: [f32; 3],
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            thickness_factor: 0.0,
            thickness_texture: None,
            attenuation_distance: f32::INFINITY,
            attenuation_color: [1.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpecularParams {
    pub factor: f32,
    pub texture: Option<TextureInfo>,
    pub color_factor: [f32; 3],
    pub color_texture: Option<TextureInfo>,
}

impl Default for SpecularParams {
    fn default() -> Self {
        Self {
            factor: 1.0,
            texture: None,
            color_factor: [1.0, 1.0, 1.0],
            color_texture: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnisotropyParams {
    pub strength: f32,
    pub rotation: f32,
    pub texture: Option<TextureInfo>,
}

#[derive(Debug, Clone)]
pub struct IridescenceParams {
    pub factor: f32,
    pub texture: Option<TextureInfo>,
    pub ior: f32,
    pub thickness_range: [f32; 2],
    pub thickness_texture: Option<TextureInfo>,
}

impl Default for IridescenceParams {
    fn default() -> Self {
        Self {
            factor: 0.0,
            texture: None,
            ior: 1.3,
            thickness_range: [100.0, 400.0],
            thickness_texture: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BumpParams {
    pub factor: f32,
    pub texture: Option<TextureInfo>,
}

impl Default for BumpParams {
    fn default() -> Self {
        Self {
            factor: 1.0,
            texture: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutlineWidthMode {
    #[default]
    None,
    WorldCoordinates,
    ScreenCoordinates,
}

#[derive(Debug, Clone, Default)]
pub struct UvAnimation {
    pub mask_texture: Option<TextureInfo>,
    pub scroll_x_speed_factor: f32,
    pub scroll_y_speed_factor: f32,
    pub rotation_speed_factor: f32,
}

/// Parameters of VRMC_materials_mtoon.
#[derive(Debug, Clone)]
pub struct MToonParams {
    pub transparent_with_z_write: bool,
    pub render_queue_offset_number: isize,
    pub shade_color_factor: [f32; 3],
    pub shade_multiply_texture: Option<TextureInfo>,
    pub shading_shift_factor: f32,
    pub shading_shift_texture: Option<ShadingShiftTextureInfo>,
    pub shading_toony_factor: f32,
    pub gi_equalization_factor: f32,
    pub matcap_factor: [f32; 3],
    pub matcap_texture: Option<TextureInfo>,
    pub parametric_rim_color_factor: [f32; 3],
    pub parametric_rim_fresnel_power_factor: f32,
    pub parametric_rim_lift_factor: f32,
    pub rim_multiply_texture: Option<TextureInfo>,
    pub rim_lighting_mix_factor: f32,
    pub outline_width_mode: OutlineWidthMode,
    pub outline_width_factor: f32,
    pub outline_width_multiply_texture: Option<TextureInfo>,
    pub outline_color_factor: [f32; 3],
    pub outline_lighting_mix_factor: f32,
    pub uv_animation: UvAnimation,
}

/// One contribution of an extension plugin to a material's parameters.
#[derive(Debug, Clone)]
pub enum MaterialExtensionData {
    Clearcoat(ClearcoatParams),
    Sheen(SheenParams),
    Transmission(TransmissionParams),
    Volume(VolumeParams),
    Ior(f32),
    Specular(SpecularParams),
    Anisotropy(AnisotropyParams),
    Iridescence(IridescenceParams),
    Dispersion(f32),
    EmissiveStrength(f32),
    Bump(BumpParams),
    MToon(Box<MToonParams>),
    Custom { name: String, value: Value },
}

#[derive(Debug, Clone)]
pub struct MaterialAsset {
    /// `None` for the default material of primitives without one.
    pub id: Option<AssetIndex>,
    pub name: Option<String>,
    pub kind: MaterialKind,
    pub base_color_factor: [f32; 4],
    pub base_color_texture: Option<TextureInfo>,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub metallic_roughness_texture: Option<TextureInfo>,
    pub normal_texture: Option<NormalTextureInfo>,
    pub occlusion_texture: Option<OcclusionTextureInfo>,
    pub emissive_texture: Option<TextureInfo>,
    pub emissive_factor: [f32; 3],
    pub emissive_strength: f32,
    pub alpha_mode: MaterialAlphaMode,
    pub double_sided: bool,
    pub clearcoat: Option<ClearcoatParams>,
    pub sheen: Option<SheenParams>,
    pub transmission: Option<TransmissionParams>,
    pub volume: Option<VolumeParams>,
    pub ior: Option<f32>,
    pub specular: Option<SpecularParams>,
    pub anisotropy: Option<AnisotropyParams>,
    pub iridescence: Option<IridescenceParams>,
    pub dispersion: Option<f32>,
    pub bump: Option<BumpParams>,
    pub toon: Option<Box<MToonParams>>,
    /// Parameters contributed by third-party plugins, by extension name.
    pub custom: BTreeMap<String, Value>,
    pub user_data: UserData,
}

impl Default for MaterialAsset {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            kind: MaterialKind::Standard,
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
            emissive_factor: [0.0, 0.0, 0.0],
            emissive_strength: 1.0,
            alpha_mode: MaterialAlphaMode::Opaque,
            double_sided: false,
            clearcoat: None,
            sheen: None,
            transmission: None,
            volume: None,
            ior: None,
            specular: None,
            anisotropy: None,
            iridescence: None,
            dispersion: None,
            bump: None,
            toon: None,
            custom: BTreeMap::new(),
            user_data: UserData::default(),
        }
    }
}

impl MaterialAsset {
    pub fn apply(&mut self, extension: MaterialExtensionData) {
        match extension {
            MaterialExtensionData::Clearcoat(params) => self.clearcoat = Some(params),
            MaterialExtensionData::Sheen(params) => self.sheen = Some(params),
            MaterialExtensionData::Transmission(params) => self.transmission = Some(params),
            MaterialExtensionData::Volume(params) => self.volume = Some(params),
            MaterialExtensionData::Ior(ior) => self.ior = Some(ior),
            MaterialExtensionData::Specular(params) => self.specular = Some(params),
            MaterialExtensionData::Anisotropy(params) => self.anisotropy = Some(params),
            MaterialExtensionData::Iridescence(params) => self.iridescence = Some(params),
            MaterialExtensionData::Dispersion(dispersion) => self.dispersion = Some(dispersion),
            MaterialExtensionData::EmissiveStrength(strength) => self.emissive_strength = strength,
            MaterialExtensionData::Bump(params) => self.bump = Some(params),
            MaterialExtensionData::MToon(params) => self.toon = Some(params),
            MaterialExtensionData::Custom { name, value } => {
                self.custom.insert(name, value);
            }
        }
    }

    /// Every texture bound to any slot of this material.
    pub fn textures(&self) -> Vec<Arc<TextureAsset>> {
        let mut infos: Vec<&TextureInfo> = Vec::new();
        infos.extend(self.base_color_texture.iter());
        infos.extend(self.metallic_roughness_texture.iter());
        infos.extend(self.normal_texture.iter().map(|info| &info.info));
        infos.extend(self.occlusion_texture.iter().map(|info| &info.info));
        infos.extend(self.emissive_texture.iter());
        if let Some(clearcoat) = &self.clearcoat {
            infos.extend(clearcoat.texture.iter());
            infos.extend(clearcoat.roughness_texture.iter());
            infos.extend(clearcoat.normal_texture.iter().map(|info| &info.info));
        }
        if let Some(sheen) = &self.sheen {
            infos.extend(sheen.color_texture.iter());
            infos.extend(sheen.roughness_texture.iter());
        }
        if let Some(transmission) = &self.transmission {
            infos.extend(transmission.texture.iter());
        }
        if let Some(volume) = &self.volume {
            infos.extend(volume.thickness_texture.iter());
        }
        if let Some(specular) = &self.specular {
            infos.extend(specular.texture.iter());
            infos.extend(specular.color_texture.iter());
        }
        if let Some(anisotropy) = &self.anisotropy {
            infos.extend(anisotropy.texture.iter());
        }
        if let Some(iridescence) = &self.iridescence {
            infos.extend(iridescence.texture.iter());
            infos.extend(iridescence.thickness_texture.iter());
        }
        if let Some(bump) = &self.bump {
            infos.extend(bump.texture.iter());
        }
        if let Some(toon) = &self.toon {
            infos.extend(toon.shade_multiply_texture.iter());
            infos.extend(toon.shading_shift_texture.iter().map(|info| &info.info));
            infos.extend(toon.matcap_texture.iter());
            infos.extend(toon.rim_multiply_texture.iter());
            infos.extend(toon.outline_width_multiply_texture.iter());
            infos.extend(toon.uv_animation.mask_texture.iter());
        }
        infos.into_iter().map(|info| info.texture.clone()).collect()
    }
}
