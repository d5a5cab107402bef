mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use bytes::Bytes;
use futures::future::BoxFuture;
use glam::{Mat4, Quat, Vec3};
use scene_loader::{
    animation::{AnimationPath, Interpolation},
    index::{AssetIndex, AssetKind},
    loader::{
        gltf::{GltfLoader, GltfLoaderError, LoadWarning},
        resource::{MemoryResources, ResourceError, ResourceLoader},
        AssetLoadParams,
    },
    material::MaterialKind,
    primitive::PrimitiveAssetMode,
};
use serde_json::json;

use common::{node_mesh, parse, triangle_accessors, triangle_bin, BinBuilder};

#[test]
fn test_single_triangle() {
    let bin = triangle_bin();
    let asset = parse(bin.container(json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "accessors": triangle_accessors()
    })));

    assert_eq!(asset.scenes.len(), 1);
    let scene = asset.default_scene().unwrap();
    assert_eq!(scene.len(), 1);
    let node = scene.node(scene.roots()[0]);
    let mesh = node_mesh(node);
    assert_eq!(mesh.name, "mesh_0");
    assert_eq!(mesh.primitives.len(), 1);

    let primitive = &mesh.primitives[0];
    assert_eq!(primitive.mode, PrimitiveAssetMode::TriangleList);
    assert_eq!(primitive.material.id, None);
    assert_eq!(primitive.material.kind, MaterialKind::Standard);
    assert_eq!(primitive.geometry.vertex_count(), 3);
    assert_eq!(
        primitive.geometry.indices.as_ref().unwrap().to_u32_vec(),
        [0, 1, 2]
    );
    assert_eq!(primitive.geometry.bounds.unwrap().max, Vec3::new(1.0, 1.0, 0.0));
    assert!(asset.warnings.is_empty());
}

#[test]
fn test_shared_mesh_instances() {
    let bin = triangle_bin();
    let asset = parse(bin.container(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0, 1] }],
        "nodes": [
            { "mesh": 0, "translation": [-1.0, 0.0, 0.0] },
            { "mesh": 0, "translation": [1.0, 0.0, 0.0] }
        ],
        "materials": [{ "name": "paint" }],
        "meshes": [{
            "name": "box",
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "accessors": triangle_accessors()
    })));

    // No default scene index: the first scene is the default
    let scene = asset.default_scene().unwrap();
    let left = scene.node(scene.roots()[0]);
    let right = scene.node(scene.roots()[1]);
    let left_mesh = node_mesh(left);
    let right_mesh = node_mesh(right);

    assert!(!Arc::ptr_eq(&left_mesh, &right_mesh));
    assert_eq!(left_mesh.name, "box_instance_0");
    assert_eq!(right_mesh.name, "box_instance_1");
    assert!(Arc::ptr_eq(
        &left_mesh.primitives[0].geometry,
        &right_mesh.primitives[0].geometry
    ));
    assert!(Arc::ptr_eq(
        &left_mesh.primitives[0].material,
        &right_mesh.primitives[0].material
    ));
    assert_eq!(
        scene.world_matrix(scene.roots()[0]),
        Mat4::from_translation(Vec3::new(-1.0, 0.0, 0.0))
    );
    assert_eq!(
        scene.world_matrix(scene.roots()[1]),
        Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
    );
}

fn rotation_animation(interpolation: &str, keys: &[Quat]) -> Vec<u8> {
    let mut bin = BinBuilder::new();
    let times: Vec<f32> = match interpolation {
        "CUBICSPLINE" => vec![0.0, 1.0],
        _ => (0..keys.len()).map(|key| key as f32).collect(),
    };
    bin.push_f32(&times);
    let values: Vec<f32> = keys.iter().flat_map(|key| key.to_array()).collect();
    bin.push_f32(&values);
    bin.container(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "hip" }],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": times.len(), "type": "SCALAR" },
            { "bufferView": 1, "componentType": 5126, "count": keys.len(), "type": "VEC4" }
        ],
        "animations": [{
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "rotation" } }],
            "samplers": [{ "input": 0, "output": 1, "interpolation": interpolation }]
        }]
    }))
}

#[test]
fn test_step_rotation() {
    let first = Quat::from_rotation_x(0.5);
    let second = Quat::from_rotation_x(1.5);
    let asset = parse(rotation_animation("STEP", &[first, second]));

    let animation = &asset.animations[0];
    assert_eq!(animation.name, "animation_0");
    let track = &animation.tracks[0];
    assert_eq!(track.interpolation, Interpolation::Step);
    assert_eq!(track.path, AnimationPath::Rotation);
    assert_eq!(track.target, AssetIndex::new(AssetKind::Node, 0));
    assert_eq!(track.target_name.as_deref(), Some("hip"));

    let sampled = Quat::from_slice(&track.sample(0.5));
    assert!(sampled.abs_diff_eq(first, 1e-6));
    let sampled = Quat::from_slice(&track.sample(0.999));
    assert!(sampled.abs_diff_eq(first, 1e-6));
}

#[test]
fn test_cubic_spline_rotation_endpoints() {
    let start = Quat::from_xyzw(0.0, 0.0, 0.0, 2.0);
    let end = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
    let tangent = Quat::from_xyzw(0.0, 0.1, 0.0, 0.0);
    let asset = parse(rotation_animation(
        "CUBICSPLINE",
        &[tangent, start, tangent, tangent, end, tangent],
    ));

    let track = &asset.animations[0].tracks[0];
    assert_eq!(track.interpolation, Interpolation::CubicSpline);
    assert_eq!(track.value_size(), 4);

    let sampled = Quat::from_slice(&track.sample(0.0));
    assert!(sampled.abs_diff_eq(Quat::IDENTITY, 1e-5));
    assert!(sampled.is_normalized());
    let sampled = Quat::from_slice(&track.sample(1.0));
    assert!(sampled.abs_diff_eq(end, 1e-5));
}

#[test]
fn test_sparse_attribute() {
    let mut bin = triangle_bin();
    bin.push_f32(&[1.0, 2.0, 3.0]);
    bin.push_u16(&[2]);
    bin.push_f32(&[30.0]);
    let asset = parse(bin.container(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0, "_VALUE": 2 } }]
        }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" },
            {
                "bufferView": 2, "componentType": 5126, "count": 3, "type": "SCALAR",
                "sparse": {
                    "count": 1,
                    "indices": { "bufferView": 3, "componentType": 5123 },
                    "values": { "bufferView": 4 }
                }
            }
        ]
    })));

    let scene = asset.default_scene().unwrap();
    let mesh = node_mesh(scene.node(scene.roots()[0]));
    let geometry = &mesh.primitives[0].geometry;
    assert!(geometry.indices.is_none());
    assert_eq!(
        geometry.attribute("_VALUE").unwrap().to_f32_vec(),
        [1.0, 2.0, 30.0]
    );
}

#[test]
fn test_skin_binding() {
    let bin = triangle_bin();
    let asset = parse(bin.container(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "rig", "children": [1, 2] },
            { "name": "body", "mesh": 0, "skin": 0 },
            { "name": "bone", "translation": [0.0, 1.0, 0.0] }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "skins": [{ "joints": [2] }],
        "accessors": triangle_accessors()
    })));

    let scene = asset.default_scene().unwrap();
    let body = scene.find_by_name("body").unwrap();
    let bone = scene.find_by_name("bone").unwrap();
    assert!(scene.node(bone).is_bone);
    assert!(!scene.node(body).is_bone);

    let mesh = node_mesh(scene.node(body));
    assert!(mesh.primitives[0].skinned);
    let binding = scene.node(body).skin.as_ref().unwrap();
    assert_eq!(binding.bones, [Some(bone)]);
    assert_eq!(binding.skin.inverse_bind_matrices, [Mat4::IDENTITY]);
    assert_eq!(binding.bind_matrix, Mat4::IDENTITY);
}

#[test]
fn test_skins_in_one_scene() {
    let bin = triangle_bin();
    let asset = parse(bin.container(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [
            { "name": "rig", "children": [1, 2, 3, 4] },
            { "name": "body", "mesh": 0, "skin": 0 },
            { "name": "hair", "mesh": 0, "skin": 1, "translation": [0.0, 2.0, 0.0] },
            { "name": "spine" },
            { "name": "head" }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "skins": [{ "joints": [3] }, { "joints": [4, 3] }],
        "accessors": triangle_accessors()
    })));

    let scene = asset.default_scene().unwrap();
    let spine = scene.find_by_name("spine").unwrap();
    let head = scene.find_by_name("head").unwrap();

    let body = scene.node(scene.find_by_name("body").unwrap());
    assert_eq!(body.skin.as_ref().unwrap().bones, [Some(spine)]);
    let hair = scene.node(scene.find_by_name("hair").unwrap());
    let binding = hair.skin.as_ref().unwrap();
    assert_eq!(binding.bones, [Some(head), Some(spine)]);
    assert_eq!(
        binding.bind_matrix,
        Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))
    );
}

#[test]
fn test_unlit_material() {
    let bin = triangle_bin();
    let document = json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": ["KHR_materials_unlit"],
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "materials": [{
            "pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 0.0, 0.0, 1.0],
                "metallicFactor": 0.2,
                "roughnessFactor": 0.3
            },
            "emissiveFactor": [1.0, 1.0, 1.0],
            "extensions": { "KHR_materials_unlit": {} }
        }],
        "meshes": [{
            "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
        }],
        "accessors": triangle_accessors()
    });
    let asset = parse(bin.container(document.clone()));
    let scene = asset.default_scene().unwrap();
    let material = node_mesh(scene.node(scene.roots()[0])).primitives[0]
        .material
        .clone();
    assert_eq!(material.kind, MaterialKind::Unlit);
    assert_eq!(material.base_color_factor, [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(material.emissive_factor, [0.0, 0.0, 0.0]);
    assert!(!material.user_data.extensions.contains_key("KHR_materials_unlit"));
    assert!(asset.warnings.is_empty());

    let params = AssetLoadParams {
        disable_unlit: true,
        ..Default::default()
    };
    let asset = GltfLoader::new(params)
        .parse_blocking(bin.container(document))
        .unwrap();
    let scene = asset.default_scene().unwrap();
    let material = node_mesh(scene.node(scene.roots()[0])).primitives[0]
        .material
        .clone();
    assert_eq!(material.kind, MaterialKind::Standard);
    assert_eq!(material.metallic_factor, 0.2);
}

#[test]
fn test_extensions() {
    let bin = triangle_bin();
    let document = json!({
        "asset": { "version": "2.0" },
        "extensionsUsed": ["EXT_custom"],
        "extensionsRequired": ["EXT_custom"],
        "scenes": [{ "nodes": [] }]
    });
    let result = GltfLoader::new(AssetLoadParams::default())
        .parse_blocking(bin.container(document.clone()));
    assert!(matches!(
        result,
        Err(GltfLoaderError::UnsupportedExtensionRequired(name)) if name == "EXT_custom"
    ));

    let mut document = document;
    document["extensionsRequired"] = json!([]);
    document["scenes"][0]["extensions"] = json!({ "EXT_custom": { "level": 3 } });
    let asset = parse(bin.container(document));
    assert_eq!(
        asset.warnings,
        [LoadWarning::UnknownExtension(String::from("EXT_custom"))]
    );
    assert_eq!(
        asset.scenes[0].user_data.extensions.get("EXT_custom"),
        Some(&json!({ "level": 3 }))
    );
}

#[test]
fn test_invalid_documents() {
    let loader = GltfLoader::new(AssetLoadParams::default());
    let result = loader.parse_blocking(&br#"{ "asset": { "version": "1.0" } }"#[..]);
    assert!(matches!(result, Err(GltfLoaderError::UnsupportedVersion(_))));

    let result = loader.parse_blocking(&b"{ not json"[..]);
    assert!(matches!(result, Err(GltfLoaderError::Json(_))));

    let result = loader.parse_blocking(&b"glTF\x02\x00\x00\x00"[..]);
    assert!(matches!(result, Err(GltfLoaderError::MalformedContainer(_))));

    let result = pollster::block_on(loader.parse_value(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "children": [1] }, { "children": [0] }]
    })));
    assert!(matches!(result, Err(GltfLoaderError::NodeCycle(_))));

    let result = pollster::block_on(loader.parse_value(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 4 }]
    })));
    assert!(matches!(
        result,
        Err(GltfLoaderError::IndexOutOfBounds(index)) if index == AssetIndex::new(AssetKind::Mesh, 4)
    ));
}

/// Counts how often each resource is fetched.
struct CountingResources {
    inner: MemoryResources,
    loads: Arc<AtomicUsize>,
}

impl ResourceLoader for CountingResources {
    fn load(&self, path: &str) -> BoxFuture<'static, Result<Bytes, ResourceError>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(path)
    }
}

fn external_document() -> serde_json::Value {
    json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0, 1, 2] }],
        "nodes": [{ "mesh": 0 }, { "mesh": 1 }, { "mesh": 0 }],
        "buffers": [{ "uri": "geometry%20data.bin", "byteLength": 44 }],
        "bufferViews": [
            { "buffer": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "meshes": [
            { "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] },
            { "primitives": [{ "attributes": { "POSITION": 0 }, "mode": 0 }] }
        ],
        "accessors": triangle_accessors()
    })
}

#[test]
fn test_resources_fetched_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let resources = CountingResources {
        inner: MemoryResources::new().with_file("geometry data.bin", triangle_bin().data),
        loads: loads.clone(),
    };
    let loader = GltfLoader::new(AssetLoadParams::default()).with_resources(resources);
    let asset = pollster::block_on(loader.parse_value(external_document())).unwrap();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    let scene = asset.default_scene().unwrap();
    assert_eq!(scene.len(), 3);
    let points = node_mesh(scene.node(scene.roots()[1]));
    assert_eq!(points.primitives[0].mode, PrimitiveAssetMode::Points);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_multi_thread_runtime() {
    let loader = GltfLoader::new(AssetLoadParams::default()).with_resources(
        MemoryResources::new().with_file("geometry data.bin", triangle_bin().data),
    );
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let loader = loader.clone();
            tokio::spawn(async move { loader.parse_value(external_document()).await })
        })
        .collect();
    for task in tasks {
        let asset = task.await.unwrap().unwrap();
        let scene = asset.default_scene().unwrap();
        let first = node_mesh(scene.node(scene.roots()[0]));
        let third = node_mesh(scene.node(scene.roots()[2]));
        assert!(Arc::ptr_eq(
            &first.primitives[0].geometry,
            &third.primitives[0].geometry
        ));
    }
}

#[test]
fn test_blocking_entry_points() {
    let bin = triangle_bin();
    let data = bin.container(json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "accessors": triangle_accessors()
    }));
    let asset =
        scene_loader::loader::gltf::load_glb_from_buffer(&data, &AssetLoadParams::default())
            .unwrap();
    assert_eq!(asset.scenes[0].len(), 1);
}
