use std::{
    error::Error,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use log::{error, info, warn};
use scene_loader::{
    archive::{tar::TarBundle, zip::ZipBundle, Archive},
    loader::{
        gltf::{load_gltf_from_archive, load_gltf_from_file, GltfAsset},
        AssetLoadParams,
    },
    node::NodeAttachment,
    scene::{NodeHandle, SceneGraph},
};

/// Prints the scenes, node tree, materials and animations of a glTF model.
#[derive(Parser, Debug)]
#[command(name = "scene-inspect")]
#[command(version)]
struct Args {
    /// Load unlit materials as standard ones
    #[arg(long)]
    disable_unlit: bool,
    /// Name of the model entry inside a .zip or .tar bundle
    #[arg(long)]
    model_name: Option<String>,
    /// A .gltf, .glb or .vrm model, or a .zip or .tar bundle holding the
    /// model and its resources
    file: PathBuf,
}

impl Args {
    fn params(&self) -> AssetLoadParams {
        let mut params = AssetLoadParams {
            disable_unlit: self.disable_unlit,
            ..Default::default()
        };
        if let Some(model_name) = &self.model_name {
            params.bundle_model_name = model_name.clone();
        }
        params
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

fn load(path: &Path, params: &AssetLoadParams) -> Result<GltfAsset, Box<dyn Error>> {
    match extension(path).as_str() {
        "zip" => {
            let file = BufReader::new(File::open(path)?);
            let archive = ZipBundle::new(file)?;
            Ok(load_gltf_from_archive(archive, params)?)
        }
        "tar" => {
            let file = BufReader::new(File::open(path)?);
            let archive = TarBundle::new(file)?;
            Ok(load_gltf_from_archive(archive, params)?)
        }
        _ => Ok(load_gltf_from_file(path, params)?),
    }
}

fn print_node(scene: &SceneGraph, handle: NodeHandle, depth: usize) {
    let node = scene.node(handle);
    let name = node.name.as_deref().unwrap_or("<unnamed>");
    let id = node
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| String::from("-"));
    let mut line = format!("{:indent$}{} ({})", "", name, id, indent = depth * 2);
    if node.is_bone {
        line.push_str(" bone");
    }
    println!("{}", line);

    for attachment in &node.attachments {
        let indent = depth * 2 + 4;
        match attachment {
            NodeAttachment::Mesh(mesh) => {
                println!("{:indent$}mesh {}", "", mesh.name, indent = indent);
                for primitive in &mesh.primitives {
                    let material = &primitive.material;
                    println!(
                        "{:indent$}{:?}, {} vertices, material {} {:?}",
                        "",
                        primitive.mode,
                        primitive.geometry.vertex_count(),
                        material.name.as_deref().unwrap_or("<default>"),
                        material.kind,
                        indent = indent + 2
                    );
                }
                if let Some(instancing) = &mesh.instancing {
                    println!(
                        "{:indent$}{} instances",
                        "",
                        instancing.matrices.len(),
                        indent = indent + 2
                    );
                }
            }
            NodeAttachment::Camera(camera) => {
                println!("{:indent$}camera {}", "", camera.name, indent = indent)
            }
            NodeAttachment::Light(light) => println!(
                "{:indent$}light {} {:?}",
                "",
                light.name,
                light.kind,
                indent = indent
            ),
        }
    }
    if let Some(binding) = &node.skin {
        let bound = binding.bones.iter().filter(|bone| bone.is_some()).count();
        println!(
            "{:indent$}skin {}, {}/{} joints bound",
            "",
            binding.skin.id,
            bound,
            binding.bones.len(),
            indent = depth * 2 + 4
        );
    }

    for child in scene.children(handle) {
        print_node(scene, *child, depth + 1);
    }
}

fn print_asset(asset: &GltfAsset) {
    if let Some(generator) = &asset.asset.generator {
        println!("Generator: {}", generator);
    }
    if !asset.extensions_used.is_empty() {
        println!("Extensions: {}", asset.extensions_used.join(", "));
    }

    for (index, scene) in asset.scenes.iter().enumerate() {
        let default = if asset.scene == Some(index) {
            " (default)"
        } else {
            ""
        };
        println!(
            "Scene #{} {}{}: {} nodes",
            index,
            scene.name.as_deref().unwrap_or("<unnamed>"),
            default,
            scene.len()
        );
        for root in scene.roots() {
            print_node(scene, *root, 1);
        }
    }

    for animation in &asset.animations {
        println!(
            "Animation {}: {} tracks, {:.2}s",
            animation.name,
            animation.tracks.len(),
            animation.duration()
        );
        for track in &animation.tracks {
            println!(
                "  {} {:?} {:?}, {} keys",
                track.target_name.as_deref().unwrap_or("<unnamed>"),
                track.path,
                track.interpolation,
                track.times.len()
            );
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    info!("Loading {}", args.file.display());
    let asset = match load(&args.file, &args.params()) {
        Ok(asset) => asset,
        Err(err) => {
            error!("Failed to load {}: {}", args.file.display(), err);
            return ExitCode::FAILURE;
        }
    };
    for warning in &asset.warnings {
        warn!("{}", warning);
    }
    print_asset(&asset);
    ExitCode::SUCCESS
}

#[cfg(test)]
mod test {
    use std::path::{Path, PathBuf};

    use clap::{CommandFactory, Parser};

    use super::{extension, Args};

    #[test]
    fn test_command() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args() {
        let args =
            Args::try_parse_from(["scene-inspect", "--model-name", "avatar", "bundle.zip"]).unwrap();
        assert_eq!(args.file, PathBuf::from("bundle.zip"));
        let params = args.params();
        assert_eq!(params.bundle_model_name, "avatar");
        assert!(!params.disable_unlit);

        let args = Args::try_parse_from(["scene-inspect", "model.glb", "--disable-unlit"]).unwrap();
        let params = args.params();
        assert!(params.disable_unlit);
        assert_eq!(params.bundle_model_name, "model");

        assert!(Args::try_parse_from(["scene-inspect"]).is_err());
        assert!(Args::try_parse_from(["scene-inspect", "--model-name"]).is_err());
        assert!(Args::try_parse_from(["scene-inspect", "a.glb", "b.glb"]).is_err());
        assert!(Args::try_parse_from(["scene-inspect", "--verbose", "a.glb"]).is_err());
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension(Path::new("Model.ZIP")), "zip");
        assert_eq!(extension(Path::new("model")), "");
    }
}
