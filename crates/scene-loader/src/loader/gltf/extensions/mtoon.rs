//! VRMC_materials_mtoon, the toon model of VRM 1.0 avatars.

use std::sync::Arc;

use futures::{
    future::{try_join, try_join3},
    FutureExt,
};
use serde_json::Value;

use crate::{
    material::{MToonParams, MaterialExtensionData, MaterialKind, OutlineWidthMode, UvAnimation},
    texture::{ColorSpace, ShadingShiftTextureInfo},
};

use super::{
    super::{plugin::PluginFuture, GltfLoaderError, GltfParser},
    GltfPlugin, VRMC_MATERIALS_MTOON,
};

fn bad_data() -> GltfLoaderError {
    GltfLoaderError::BadExtensionData(VRMC_MATERIALS_MTOON.to_string())
}

fn load_f32_value(value: Option<&Value>, default: f32) -> Result<f32, GltfLoaderError> {
    value
        .map(|value| value.as_f64().map(|v| v as f32).ok_or_else(bad_data))
        .transpose()
        .map(|value| value.unwrap_or(default))
}

fn load_vec3_value(value: Option<&Value>, default: [f32; 3]) -> Result<[f32; 3], GltfLoaderError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let array = value.as_array().ok_or_else(bad_data)?;
    if array.len() == 3 {
        let r = array[0].as_f64().ok_or_else(bad_data)? as f32;
        let g = array[1].as_f64().ok_or_else(bad_data)? as f32;
        let b = array[2].as_f64().ok_or_else(bad_data)? as f32;
        Ok([r, g, b])
    } else {
        Err(bad_data())
    }
}

fn load_outline_width_mode(value: Option<&Value>) -> Result<OutlineWidthMode, GltfLoaderError> {
    match value.map(|value| value.as_str()) {
        None => Ok(OutlineWidthMode::None),
        Some(Some("none")) => Ok(OutlineWidthMode::None),
        Some(Some("worldCoordinates")) => Ok(OutlineWidthMode::WorldCoordinates),
        Some(Some("screenCoordinates")) => Ok(OutlineWidthMode::ScreenCoordinates),
        _ => Err(bad_data()),
    }
}

/// Selects the toon model and reads its parameters.
pub struct MToonPlugin;

impl GltfPlugin for MToonPlugin {
    fn name(&self) -> &str {
        VRMC_MATERIALS_MTOON
    }

    fn material_kind(&self, parser: &GltfParser, index: usize) -> Option<MaterialKind> {
        let material = parser.document().material(index).ok()?;
        material
            .extensions
            .contains_key(VRMC_MATERIALS_MTOON)
            .then_some(MaterialKind::MToon)
    }

    fn extend_material_params(
        &self,
        parser: &Arc<GltfParser>,
        index: usize,
    ) -> Option<PluginFuture<MaterialExtensionData>> {
        let material = parser.document().material(index).ok()?;
        let mtoon = material.extensions.get(VRMC_MATERIALS_MTOON)?.clone();
        Some(load_mtoon(parser.clone(), mtoon))
    }
}

fn load_mtoon(parser: Arc<GltfParser>, mtoon: Value) -> PluginFuture<MaterialExtensionData> {
    async move {
        if !mtoon.is_object() {
            return Err(bad_data());
        }
        let shading_shift = mtoon.get("shadingShiftTexture");
        let (
            (shade_multiply_texture, shading_shift_texture, matcap_texture),
            (rim_multiply_texture, outline_width_multiply_texture, mask_texture),
        ) = try_join(
            try_join3(
                parser.assign_texture_value(mtoon.get("shadeMultiplyTexture"), ColorSpace::Srgb),
                parser.assign_texture_value(shading_shift, ColorSpace::Linear),
                parser.assign_texture_value(mtoon.get("matcapTexture"), ColorSpace::Srgb),
            ),
            try_join3(
                parser.assign_texture_value(mtoon.get("rimMultiplyTexture"), ColorSpace::Srgb),
                parser.assign_texture_value(
                    mtoon.get("outlineWidthMultiplyTexture"),
                    ColorSpace::Linear,
                ),
                parser.assign_texture_value(
                    mtoon.get("uvAnimationMaskTexture"),
                    ColorSpace::Linear,
                ),
            ),
        )
        .await?;

        let shading_shift_scale =
            load_f32_value(shading_shift.and_then(|value| value.get("scale")), 1.0)?;
        let params = MToonParams {
            transparent_with_z_write: mtoon
                .get("transparentWithZWrite")
                .map(|value| value.as_bool().ok_or_else(bad_data))
                .transpose()?
                .unwrap_or(false),
            render_queue_offset_number: mtoon
                .get("renderQueueOffsetNumber")
                .map(|value| value.as_i64().ok_or_else(bad_data))
                .transpose()?
                .map(|v| v as isize)
                .unwrap_or(0),
            shade_color_factor: load_vec3_value(mtoon.get("shadeColorFactor"), [0.0, 0.0, 0.0])?,
            shade_multiply_texture,
            shading_shift_factor: load_f32_value(mtoon.get("shadingShiftFactor"), 0.0)?,
            shading_shift_texture: shading_shift_texture.map(|info| ShadingShiftTextureInfo {
                info,
                scale: shading_shift_scale,
            }),
            shading_toony_factor: load_f32_value(mtoon.get("shadingToonyFactor"), 0.9)?,
            gi_equalization_factor: load_f32_value(mtoon.get("giEqualizationFactor"), 0.9)?,
            matcap_factor: load_vec3_value(mtoon.get("matcapFactor"), [1.0, 1.0, 1.0])?,
            matcap_texture,
            parametric_rim_color_factor: load_vec3_value(
                mtoon.get("parametricRimColorFactor"),
                [0.0, 0.0, 0.0],
            )?,
            parametric_rim_fresnel_power_factor: load_f32_value(
                mtoon.get("parametricRimFresnelPowerFactor"),
                5.0,
            )?,
            parametric_rim_lift_factor: load_f32_value(
                mtoon.get("parametricRimLiftFactor"),
                0.0,
            )?,
            rim_multiply_texture,
            rim_lighting_mix_factor: load_f32_value(mtoon.get("rimLightingMixFactor"), 1.0)?,
            outline_width_mode: load_outline_width_mode(mtoon.get("outlineWidthMode"))?,
            outline_width_factor: load_f32_value(mtoon.get("outlineWidthFactor"), 0.0)?,
            outline_width_multiply_texture,
            outline_color_factor: load_vec3_value(
                mtoon.get("outlineColorFactor"),
                [0.0, 0.0, 0.0],
            )?,
            outline_lighting_mix_factor: load_f32_value(
                mtoon.get("outlineLightingMixFactor"),
                1.0,
            )?,
            uv_animation: UvAnimation {
                mask_texture,
                scroll_x_speed_factor: load_f32_value(
                    mtoon.get("uvAnimationScrollXSpeedFactor"),
                    0.0,
                )?,
                scroll_y_speed_factor: load_f32_value(
                    mtoon.get("uvAnimationScrollYSpeedFactor"),
                    0.0,
                )?,
                rotation_speed_factor: load_f32_value(
                    mtoon.get("uvAnimationRotationSpeedFactor"),
                    0.0,
                )?,
            },
        };
        Ok(MaterialExtensionData::MToon(Box::new(params)))
    }
    .boxed()
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::material::OutlineWidthMode;

    use super::{load_f32_value, load_outline_width_mode, load_vec3_value};

    #[test]
    fn test_values() {
        assert_eq!(load_f32_value(None, 0.9).unwrap(), 0.9);
        assert_eq!(load_f32_value(Some(&json!(0.25)), 0.9).unwrap(), 0.25);
        assert!(load_f32_value(Some(&json!("a")), 0.9).is_err());

        assert_eq!(
            load_vec3_value(Some(&json!([1.0, 0.5, 0.0])), [0.0; 3]).unwrap(),
            [1.0, 0.5, 0.0]
        );
        assert!(load_vec3_value(Some(&json!([1.0, 0.5])), [0.0; 3]).is_err());

        assert_eq!(
            load_outline_width_mode(Some(&json!("screenCoordinates"))).unwrap(),
            OutlineWidthMode::ScreenCoordinates
        );
        assert_eq!(load_outline_width_mode(None).unwrap(), OutlineWidthMode::None);
        assert!(load_outline_width_mode(Some(&json!("pixels"))).is_err());
    }
}
