use std::sync::Arc;

use futures::{
    future::{try_join3, try_join_all},
    FutureExt,
};

use crate::{
    accessor::{Accessor, AccessorShape},
    animation::{AnimationAsset, AnimationPath, Interpolation, KeyframeTrack, TrackValueType},
    index::{AssetIndex, AssetKind},
    node::NodeAsset,
};

use super::{
    document::{AnimationSamplerDef, ChannelDef},
    plugin::PluginFuture,
    GltfLoaderError, GltfParser, LoadWarning,
};

/// Builds the track of one channel. Output values are read denormalized.
///
/// The output must hold one element per keyframe (three with cubic spline
/// interpolation); morph target weights hold one per target and keyframe.
pub fn create_track(
    node: &NodeAsset,
    input: &Accessor,
    output: &Accessor,
    sampler: &AnimationSamplerDef,
    path: AnimationPath,
) -> Result<KeyframeTrack, GltfLoaderError> {
    let (value_type, shape) = match &path {
        AnimationPath::Weights => (TrackValueType::Number, Some(AccessorShape::Scalar)),
        AnimationPath::Rotation => (TrackValueType::Quaternion, Some(AccessorShape::Vec4)),
        AnimationPath::Translation | AnimationPath::Scale => {
            (TrackValueType::Vector, Some(AccessorShape::Vec3))
        }
        AnimationPath::Custom(_) if output.item_size() == 1 => (TrackValueType::Number, None),
        AnimationPath::Custom(_) => (TrackValueType::Vector, None),
    };
    if shape.is_some_and(|shape| shape != output.shape) {
        return Err(GltfLoaderError::UnsupportedAccessorShape(
            sampler.output,
            output.shape.to_string(),
        ));
    }

    let interpolation = Interpolation::from_name(&sampler.interpolation).unwrap_or_default();
    let slots = input.count * interpolation.values_per_key();
    let mismatch = GltfLoaderError::AnimationOutputMismatch {
        accessor: sampler.output,
        keyframes: input.count,
        values: output.count,
    };
    let per_slot = match (slots, output.count) {
        (0, 0) => 1,
        (0, _) => return Err(mismatch),
        (slots, count) if count % slots != 0 => return Err(mismatch),
        (slots, count) => count / slots,
    };
    if per_slot != 1 && path != AnimationPath::Weights {
        return Err(mismatch);
    }

    Ok(KeyframeTrack {
        target: node.id,
        target_name: node.name.clone(),
        path,
        value_type,
        interpolation,
        value_size: output.item_size() * per_slot,
        times: input.to_f32_vec(),
        values: output.to_f32_vec(),
    })
}

impl GltfParser {
    pub fn load_animation(self: &Arc<Self>, index: usize) -> PluginFuture<Arc<AnimationAsset>> {
        let parser = self.clone();
        async move {
            let def = parser.document.animation(index)?;
            let mut channels = Vec::new();
            for (channel_index, channel) in def.channels.iter().enumerate() {
                match channel.target.node {
                    Some(node) => channels.push(parser.load_channel(index, channel, node)),
                    None => parser.warn(LoadWarning::ChannelWithoutTarget {
                        animation: index,
                        channel: channel_index,
                    }),
                }
            }
            let tracks = try_join_all(channels).await?;
            Ok(Arc::new(AnimationAsset {
                id: AssetIndex::new(AssetKind::Animation, index),
                name: def
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("animation_{}", index)),
                tracks,
                user_data: parser.user_data(&def.extras, &def.extensions),
            }))
        }
        .boxed()
    }

    fn load_channel(
        self: &Arc<Self>,
        animation: usize,
        channel: &ChannelDef,
        node: usize,
    ) -> PluginFuture<KeyframeTrack> {
        let sampler = match self
            .document
            .animations
            .get(animation)
            .and_then(|def| def.samplers.get(channel.sampler))
        {
            Some(sampler) => sampler.clone(),
            None => {
                let error = GltfLoaderError::IndexOutOfBounds(AssetIndex::new(
                    AssetKind::Animation,
                    animation,
                ));
                return async move { Err(error) }.boxed();
            }
        };
        let node = self.load_node_shallow(node);
        let input = self.load_accessor(sampler.input);
        let output = self.load_accessor(sampler.output);
        let path = AnimationPath::from_name(&channel.target.path);
        async move {
            let (node, input, output) = try_join3(node, input, output).await?;
            create_track(&node, &input, &output, &sampler, path)
        }
        .boxed()
    }
}

#[cfg(test)]
mod test {
    use glam::Quat;
    use serde_json::json;

    use crate::animation::{AnimationPath, Interpolation, TrackValueType};

    use super::super::{GltfLoaderError, GltfParser, LoadWarning};

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|value| value.to_le_bytes()).collect()
    }

    #[test]
    fn test_step_rotation() {
        let end = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let mut bin = f32_bytes(&[0.0, 1.0]);
        bin.extend(f32_bytes(&Quat::IDENTITY.to_array()));
        bin.extend(f32_bytes(&end.to_array()));
        let parser = GltfParser::for_test(
            json!({
                "asset": { "version": "2.0" },
                "buffers": [{ "byteLength": 40 }],
                "bufferViews": [
                    { "buffer": 0, "byteLength": 8 },
                    { "buffer": 0, "byteOffset": 8, "byteLength": 32 }
                ],
                "accessors": [
                    { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR" },
                    { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC4" }
                ],
                "nodes": [{ "name": "head" }],
                "animations": [{
                    "channels": [
                        { "sampler": 0, "target": { "node": 0, "path": "rotation" } },
                        { "sampler": 0, "target": { "path": "rotation" } }
                    ],
                    "samplers": [{ "input": 0, "output": 1, "interpolation": "STEP" }]
                }]
            }),
            Some(bin),
        );
        let animation = pollster::block_on(parser.load_animation(0)).unwrap();
        assert_eq!(animation.name, "animation_0");
        assert_eq!(animation.tracks.len(), 1);
        assert_eq!(animation.duration(), 1.0);

        let track = &animation.tracks[0];
        assert_eq!(track.target_name.as_deref(), Some("head"));
        assert_eq!(track.path, AnimationPath::Rotation);
        assert_eq!(track.value_type, TrackValueType::Quaternion);
        assert_eq!(track.interpolation, Interpolation::Step);
        assert_eq!(track.sample(0.5), Quat::IDENTITY.to_array());
        assert!(matches!(
            parser.warnings().as_slice(),
            [LoadWarning::ChannelWithoutTarget { animation: 0, channel: 1 }]
        ));
    }

    #[test]
    fn test_output_layout() {
        let mut bin = f32_bytes(&[0.0, 1.0]);
        bin.extend(f32_bytes(&[0.0, 0.5, 1.0, 0.25, 0.75, 1.0]));
        let channel = |path: &str, output: usize| {
            json!({
                "channels": [{ "sampler": 0, "target": { "node": 0, "path": path } }],
                "samplers": [{ "input": 0, "output": output }]
            })
        };
        let parser = GltfParser::for_test(
            json!({
                "asset": { "version": "2.0" },
                "buffers": [{ "byteLength": 32 }],
                "bufferViews": [
                    { "buffer": 0, "byteLength": 8 },
                    { "buffer": 0, "byteOffset": 8, "byteLength": 24 }
                ],
                "accessors": [
                    { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR" },
                    { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3" },
                    { "bufferView": 1, "componentType": 5126, "count": 1, "type": "VEC4" },
                    { "bufferView": 1, "componentType": 5126, "count": 4, "type": "SCALAR" },
                    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "SCALAR" }
                ],
                "nodes": [{ "name": "face" }],
                "animations": [
                    channel("rotation", 1),
                    channel("rotation", 2),
                    channel("weights", 3),
                    channel("weights", 4)
                ]
            }),
            Some(bin),
        );

        assert!(matches!(
            pollster::block_on(parser.load_animation(0)),
            Err(GltfLoaderError::UnsupportedAccessorShape(1, shape)) if shape == "VEC3"
        ));
        assert!(matches!(
            pollster::block_on(parser.load_animation(1)),
            Err(GltfLoaderError::AnimationOutputMismatch {
                accessor: 2,
                keyframes: 2,
                values: 1
            })
        ));

        // Two morph targets per keyframe
        let animation = pollster::block_on(parser.load_animation(2)).unwrap();
        let track = &animation.tracks[0];
        assert_eq!(track.value_size(), 2);
        assert_eq!(track.sample(0.0), vec![0.0, 0.5]);
        assert_eq!(track.sample(1.0), vec![1.0, 0.25]);

        assert!(matches!(
            pollster::block_on(parser.load_animation(3)),
            Err(GltfLoaderError::AnimationOutputMismatch { accessor: 4, .. })
        ));
    }

    #[test]
    fn test_normalized_output() {
        let mut bin = f32_bytes(&[0.0, 1.0]);
        let rotation: [i16; 8] = [0, 0, 0, i16::MAX, 0, 23170, 0, 23170];
        bin.extend(rotation.iter().flat_map(|value| value.to_le_bytes()));
        bin.extend([0u8, 255, 0, 0]);
        let parser = GltfParser::for_test(
            json!({
                "asset": { "version": "2.0" },
                "buffers": [{ "byteLength": 28 }],
                "bufferViews": [
                    { "buffer": 0, "byteLength": 8 },
                    { "buffer": 0, "byteOffset": 8, "byteLength": 16 },
                    { "buffer": 0, "byteOffset": 24, "byteLength": 2 }
                ],
                "accessors": [
                    { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR" },
                    {
                        "bufferView": 1, "componentType": 5122, "normalized": true,
                        "count": 2, "type": "VEC4"
                    },
                    {
                        "bufferView": 2, "componentType": 5121, "normalized": true,
                        "count": 2, "type": "SCALAR"
                    }
                ],
                "nodes": [{ "name": "head" }],
                "animations": [{
                    "channels": [
                        { "sampler": 0, "target": { "node": 0, "path": "rotation" } },
                        { "sampler": 1, "target": { "node": 0, "path": "weights" } }
                    ],
                    "samplers": [
                        { "input": 0, "output": 1 },
                        { "input": 0, "output": 2 }
                    ]
                }]
            }),
            Some(bin),
        );
        let animation = pollster::block_on(parser.load_animation(0)).unwrap();

        let rotation = &animation.tracks[0];
        assert!(rotation.values.iter().all(|value| (-1.0..=1.0).contains(value)));
        assert_eq!(rotation.value(0), Quat::IDENTITY.to_array());
        let end = Quat::from_slice(rotation.value(1));
        assert!(end.abs_diff_eq(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2), 1e-4));

        let weights = &animation.tracks[1];
        assert_eq!(weights.values, vec![0.0, 1.0]);
        assert_eq!(weights.sample(0.5), vec![0.5]);
    }
}
