#![cfg(all(feature = "tar", feature = "zip"))]

mod common;

use std::io::{Cursor, Write};

use scene_loader::{
    archive::{tar::TarBundle, zip::ZipBundle, Archive},
    loader::{
        gltf::{load_gltf_from_archive, GltfLoaderError},
        AssetLoadParams,
    },
};
use serde_json::{json, Value};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use common::{triangle_accessors, triangle_bin};

fn document(uri: &str) -> Vec<u8> {
    let document: Value = json!({
        "asset": { "version": "2.0" },
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "buffers": [{ "uri": uri, "byteLength": 44 }],
        "bufferViews": [
            { "buffer": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "accessors": triangle_accessors()
    });
    serde_json::to_vec(&document).unwrap()
}

fn tar_bundle(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *content).unwrap();
    }
    builder.into_inner().unwrap()
}

fn zip_bundle(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[test]
fn test_tar_bundle() {
    let gltf = document("buffers/geometry%20data.bin");
    let bin = triangle_bin().data;
    let data = tar_bundle(&[
        ("model.gltf", gltf.as_slice()),
        ("buffers/geometry data.bin", bin.as_slice()),
    ]);
    let archive = TarBundle::new(Cursor::new(data)).unwrap();
    let asset = load_gltf_from_archive(archive, &AssetLoadParams::default()).unwrap();
    assert_eq!(asset.scenes[0].len(), 1);
}

#[test]
fn test_zip_bundle() {
    let bin = triangle_bin().data;
    let params = AssetLoadParams {
        bundle_model_name: String::from("avatar.gltf"),
        bundle_model_extension: false,
        ..Default::default()
    };

    // The document refers to its buffer with the wrong case
    let gltf = document("Geometry.BIN");
    let data = zip_bundle(&[("avatar.gltf", gltf.as_slice()), ("geometry.bin", bin.as_slice())]);
    let archive = ZipBundle::new(Cursor::new(data)).unwrap();
    let asset = load_gltf_from_archive(archive, &params).unwrap();
    assert_eq!(asset.scenes[0].len(), 1);

    let gltf = document("geometry.bin");
    let data = zip_bundle(&[("other.gltf", gltf.as_slice())]);
    let archive = ZipBundle::new(Cursor::new(data)).unwrap();
    assert!(matches!(
        load_gltf_from_archive(archive, &params),
        Err(GltfLoaderError::ModelNotFound(name)) if name == "avatar.gltf"
    ));
}

#[test]
fn test_missing_resource() {
    let gltf = document("missing.bin");
    let data = tar_bundle(&[("model.gltf", gltf.as_slice())]);
    let archive = TarBundle::new(Cursor::new(data)).unwrap();
    assert!(matches!(
        load_gltf_from_archive(archive, &AssetLoadParams::default()),
        Err(GltfLoaderError::Resource(_))
    ));
}
