//! KHR_lights_punctual.
//!
//! Lights are defined once at the document root and attached to nodes by
//! index. A light used by several nodes is instanced like meshes and
//! cameras.

use std::{
    collections::HashMap,
    f32::consts::FRAC_PI_4,
    sync::{Arc, Mutex},
};

use futures::FutureExt;
use serde::Deserialize;

use crate::{
    index::{AssetIndex, AssetKind},
    light::{LightAsset, LightKind},
    node::NodeAttachment,
};

use super::{
    super::{cache::lock, plugin::PluginFuture, GltfLoaderError, GltfParser},
    extension_data, GltfPlugin, KHR_LIGHTS_PUNCTUAL,
};

#[derive(Debug, Default, Deserialize)]
struct LightsDef {
    #[serde(default)]
    lights: Vec<LightDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotDef {
    inner_cone_angle: Option<f32>,
    outer_cone_angle: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct LightDef {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    color: Option<[f32; 3]>,
    intensity: Option<f32>,
    range: Option<f32>,
    spot: Option<SpotDef>,
}

#[derive(Debug, Deserialize)]
struct NodeLightDef {
    light: usize,
}

fn node_light(parser: &GltfParser, node: usize) -> Result<Option<usize>, GltfLoaderError> {
    let def = parser.document().node(node)?;
    Ok(extension_data::<NodeLightDef>(&def.extensions, KHR_LIGHTS_PUNCTUAL)?
        .map(|def| def.light))
}

fn light_kind(def: &LightDef) -> Result<LightKind, GltfLoaderError> {
    match def.kind.as_str() {
        "directional" => Ok(LightKind::Directional),
        "point" => Ok(LightKind::Point),
        "spot" => {
            let spot = def.spot.as_ref();
            Ok(LightKind::Spot {
                inner_cone_angle: spot.and_then(|spot| spot.inner_cone_angle).unwrap_or(0.0),
                outer_cone_angle: spot
                    .and_then(|spot| spot.outer_cone_angle)
                    .unwrap_or(FRAC_PI_4),
            })
        }
        _ => Err(GltfLoaderError::BadExtensionData(
            KHR_LIGHTS_PUNCTUAL.to_string(),
        )),
    }
}

/// Builds lights on first use. Lights depend on nothing, so they are kept
/// as values rather than pending futures.
#[derive(Default)]
pub struct LightsPunctualPlugin {
    lights: Mutex<HashMap<usize, Arc<LightAsset>>>,
}

impl LightsPunctualPlugin {
    fn load_light(&self, parser: &GltfParser, index: usize) -> Result<Arc<LightAsset>, GltfLoaderError> {
        if let Some(light) = lock(&self.lights).get(&index) {
            return Ok(light.clone());
        }
        let defs = extension_data::<LightsDef>(&parser.document().extensions, KHR_LIGHTS_PUNCTUAL)?
            .unwrap_or_default();
        let def = defs
            .lights
            .get(index)
            .ok_or(GltfLoaderError::IndexOutOfBounds(AssetIndex::new(
                AssetKind::Light,
                index,
            )))?;
        let light = Arc::new(LightAsset {
            id: AssetIndex::new(AssetKind::Light, index),
            name: match &def.name {
                Some(name) => parser.unique_name(name),
                None => parser.unique_name(&format!("light_{}", index)),
            },
            kind: light_kind(def)?,
            color: def.color.unwrap_or([1.0, 1.0, 1.0]),
            intensity: def.intensity.unwrap_or(1.0),
            range: def.range.filter(|range| *range > 0.0),
        });
        Ok(lock(&self.lights).entry(index).or_insert(light).clone())
    }
}

impl GltfPlugin for LightsPunctualPlugin {
    fn name(&self) -> &str {
        KHR_LIGHTS_PUNCTUAL
    }

    fn mark_defs(&self, parser: &GltfParser) {
        for node in 0..parser.document().nodes.len() {
            if let Ok(Some(light)) = node_light(parser, node) {
                parser.instancer().add_ref(AssetKind::Light, light);
            }
        }
    }

    fn create_node_attachment(
        &self,
        parser: &Arc<GltfParser>,
        node: usize,
    ) -> Option<PluginFuture<Option<NodeAttachment>>> {
        let result = node_light(parser, node).and_then(|light| {
            light
                .map(|light| {
                    let value = self.load_light(parser, light)?;
                    Ok(parser.instancer().get_ref(AssetKind::Light, light, value))
                })
                .transpose()
        });
        match result {
            Ok(Some(light)) => Some(async move { Ok(Some(NodeAttachment::Light(light))) }.boxed()),
            Ok(None) => None,
            Err(error) => Some(async move { Err(error) }.boxed()),
        }
    }
}
