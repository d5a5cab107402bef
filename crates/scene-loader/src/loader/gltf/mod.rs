//! glTF 2.0 / GLB / VRM loader.
//!
//! A parse runs inside one [`GltfParser`] session. Every definition of the
//! document is built at most once, on first request, through the session's
//! dependency caches; independent dependencies are resolved concurrently.
//! Extensions are handled by [`GltfPlugin`]s created for each parse from
//! the factories registered on the [`GltfLoader`].

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::{Arc, Mutex, OnceLock},
};

use bytes::Bytes;
use futures::future::{try_join3, try_join_all};
use log::{debug, warn};
use serde_json::Value;

use crate::{
    accessor::{Accessor, InterleavedBuffer},
    animation::AnimationAsset,
    archive::Archive,
    camera::CameraAsset,
    index::{AssetIndex, AssetKind},
    loader::{
        resource::{
            ArchiveResources, DirectoryResources, NoResources, ResourceError, ResourceLoader,
        },
        texture::{ImageDecoder, NoImageDecoder},
        AssetLoadParams,
    },
    material::MaterialAsset,
    mesh::MeshAsset,
    node::{NodeAsset, UserData},
    primitive::Geometry,
    scene::SceneGraph,
    skin::SkinAsset,
    texture::{ImageAsset, TextureAsset},
};

use self::{
    accessor::InterleavedKey,
    cache::{lock, DependencyCache, SharedFuture},
    container::BinaryContainer,
    document::{AssetInfo, Document, Extensions},
    extensions::{
        draco::{DracoDecoder, DracoPlugin},
        meshopt::{MeshoptDecoder, MeshoptPlugin},
    },
    instancer::ResourceInstancer,
    plugin::{PluginHook, PluginHost},
};

mod accessor;
mod animation;
pub mod cache;
pub mod container;
pub mod document;
mod error;
pub mod extensions;
pub mod instancer;
mod material;
mod mesh;
mod node;
pub mod plugin;
mod scene;
pub mod scheme;
mod skin;
mod texture;

pub use self::{
    error::{GltfLoaderError, LoadWarning},
    plugin::GltfPlugin,
};

/// A dependency being resolved, shared by everyone who requested it.
pub type Pending<T> = SharedFuture<Result<T, GltfLoaderError>>;

pub type PluginFactory = Arc<dyn Fn(&AssetLoadParams) -> Arc<dyn GltfPlugin> + Send + Sync>;

#[derive(Default)]
struct GltfCaches {
    buffers: DependencyCache<usize, Result<Bytes, GltfLoaderError>>,
    buffer_views: DependencyCache<usize, Result<Bytes, GltfLoaderError>>,
    accessors: DependencyCache<usize, Result<Arc<Accessor>, GltfLoaderError>>,
    interleaved: Mutex<HashMap<InterleavedKey, Arc<InterleavedBuffer>>>,
    images: DependencyCache<usize, Result<Arc<ImageAsset>, GltfLoaderError>>,
    textures: DependencyCache<usize, Result<Option<Arc<TextureAsset>>, GltfLoaderError>>,
    texture_sources:
        DependencyCache<(usize, Option<usize>), Result<Arc<TextureAsset>, GltfLoaderError>>,
    materials: DependencyCache<usize, Result<Arc<MaterialAsset>, GltfLoaderError>>,
    default_material: OnceLock<Arc<MaterialAsset>>,
    geometries: DependencyCache<String, Result<Arc<Geometry>, GltfLoaderError>>,
    meshes: DependencyCache<usize, Result<Arc<MeshAsset>, GltfLoaderError>>,
    cameras: DependencyCache<usize, Result<Arc<CameraAsset>, GltfLoaderError>>,
    skins: DependencyCache<usize, Result<Arc<SkinAsset>, GltfLoaderError>>,
    shallow_nodes: DependencyCache<usize, Result<Arc<NodeAsset>, GltfLoaderError>>,
    nodes: DependencyCache<usize, Result<Arc<NodeAsset>, GltfLoaderError>>,
}

impl GltfCaches {
    /// Cached futures hold the session alive; dropping them breaks the
    /// cycle.
    fn clear(&self) {
        self.buffers.clear();
        self.buffer_views.clear();
        self.accessors.clear();
        lock(&self.interleaved).clear();
        self.images.clear();
        self.textures.clear();
        self.texture_sources.clear();
        self.materials.clear();
        self.geometries.clear();
        self.meshes.clear();
        self.cameras.clear();
        self.skins.clear();
        self.shallow_nodes.clear();
        self.nodes.clear();
    }
}

/// State of one parse: the document, its binary chunk, the plugins and
/// every cache. Plugins receive the session in their hooks and may request
/// any dependency through it.
pub struct GltfParser {
    document: Document,
    bin: Option<Bytes>,
    params: AssetLoadParams,
    resources: Arc<dyn ResourceLoader>,
    image_decoder: Arc<dyn ImageDecoder>,
    plugins: PluginHost,
    instancer: ResourceInstancer,
    caches: GltfCaches,
    skinned_meshes: HashSet<usize>,
    bones: HashSet<usize>,
    names: Mutex<HashMap<String, usize>>,
    warnings: Mutex<Vec<LoadWarning>>,
}

/// Rejects child references that are out of range or loop back to an
/// ancestor. Resolving such a graph would never finish.
fn check_node_graph(document: &Document) -> Result<(), GltfLoaderError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Visit {
        New,
        Active,
        Done,
    }

    let mut state = vec![Visit::New; document.nodes.len()];
    for root in 0..document.nodes.len() {
        if state[root] != Visit::New {
            continue;
        }
        state[root] = Visit::Active;
        let mut stack = vec![(root, 0usize)];
        while let Some(&(node, child)) = stack.last() {
            match document.nodes[node].children.get(child).copied() {
                Some(next) => {
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    match state.get(next).copied() {
                        None => {
                            return Err(GltfLoaderError::IndexOutOfBounds(AssetIndex::new(
                                AssetKind::Node,
                                next,
                            )))
                        }
                        Some(Visit::Active) => return Err(GltfLoaderError::NodeCycle(next)),
                        Some(Visit::New) => {
                            state[next] = Visit::Active;
                            stack.push((next, 0));
                        }
                        Some(Visit::Done) => {}
                    }
                }
                None => {
                    state[node] = Visit::Done;
                    stack.pop();
                }
            }
        }
    }
    Ok(())
}

fn check_version(version: &str) -> Result<(), GltfLoaderError> {
    let major = version
        .split('.')
        .next()
        .and_then(|major| major.trim().parse::<u32>().ok());
    match major {
        Some(major) if major >= 2 => Ok(()),
        _ => Err(GltfLoaderError::UnsupportedVersion(version.to_string())),
    }
}

/// Makes a name usable as an animation binding target: whitespace becomes
/// `_`, and `[`, `]`, `.`, `:`, `/` are removed.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| !matches!(c, '[' | ']' | '.' | ':' | '/'))
        .collect()
}

impl GltfParser {
    fn new(
        document: Document,
        bin: Option<Bytes>,
        params: AssetLoadParams,
        resources: Arc<dyn ResourceLoader>,
        image_decoder: Arc<dyn ImageDecoder>,
        plugins: PluginHost,
    ) -> Result<Self, GltfLoaderError> {
        check_node_graph(&document)?;

        let instancer = ResourceInstancer::new();
        let mut skinned_meshes = HashSet::new();
        let mut bones = HashSet::new();
        for skin in &document.skins {
            bones.extend(skin.joints.iter().copied());
        }
        for node in &document.nodes {
            if let Some(mesh) = node.mesh {
                instancer.add_ref(AssetKind::Mesh, mesh);
                if node.skin.is_some() {
                    skinned_meshes.insert(mesh);
                }
            }
            if let Some(camera) = node.camera {
                instancer.add_ref(AssetKind::Camera, camera);
            }
        }

        Ok(Self {
            document,
            bin,
            params,
            resources,
            image_decoder,
            plugins,
            instancer,
            caches: GltfCaches::default(),
            skinned_meshes,
            bones,
            names: Mutex::new(HashMap::new()),
            warnings: Mutex::new(Vec::new()),
        })
    }

    /// A session without plugins, resources or image decoding.
    #[cfg(test)]
    fn for_test(document: Value, bin: Option<Vec<u8>>) -> Arc<Self> {
        let document = Document::from_value(document).unwrap();
        Arc::new(
            Self::new(
                document,
                bin.map(Bytes::from),
                AssetLoadParams::default(),
                Arc::new(NoResources),
                Arc::new(NoImageDecoder),
                PluginHost::default(),
            )
            .unwrap(),
        )
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn params(&self) -> &AssetLoadParams {
        &self.params
    }

    pub fn plugins(&self) -> &PluginHost {
        &self.plugins
    }

    pub fn instancer(&self) -> &ResourceInstancer {
        &self.instancer
    }

    pub fn resources(&self) -> &Arc<dyn ResourceLoader> {
        &self.resources
    }

    pub fn image_decoder(&self) -> &Arc<dyn ImageDecoder> {
        &self.image_decoder
    }

    /// Whether some skin uses the node as a joint.
    pub fn is_bone(&self, node: usize) -> bool {
        self.bones.contains(&node)
    }

    /// Whether some node draws the mesh with a skin.
    pub fn is_skinned_mesh(&self, mesh: usize) -> bool {
        self.skinned_meshes.contains(&mesh)
    }

    /// Records a recoverable problem.
    pub fn warn(&self, warning: LoadWarning) {
        warn!("{}", warning);
        lock(&self.warnings).push(warning);
    }

    pub fn warnings(&self) -> Vec<LoadWarning> {
        lock(&self.warnings).clone()
    }

    /// Sanitizes a name and makes it unique within the parse by appending
    /// `_1`, `_2`, … to repeated names.
    pub fn unique_name(&self, original: &str) -> String {
        let sanitized = sanitize_name(original);
        let mut names = lock(&self.names);
        match names.get_mut(&sanitized) {
            Some(count) => {
                *count += 1;
                format!("{}_{}", sanitized, count)
            }
            None => {
                names.insert(sanitized.clone(), 0);
                sanitized
            }
        }
    }

    /// Extras and the extensions no plugin handles.
    pub fn user_data(&self, extras: &Option<Value>, extensions: &Extensions) -> UserData {
        UserData {
            extras: extras.clone(),
            extensions: extensions
                .iter()
                .filter(|(name, _)| !self.plugins.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    async fn run(self: &Arc<Self>) -> Result<GltfAsset, GltfLoaderError> {
        for name in &self.document.extensions_used {
            if !self.plugins.contains(name) {
                self.warn(LoadWarning::UnknownExtension(name.clone()));
            }
        }

        self.plugins
            .for_each(PluginHook::MarkDefs, |plugin| plugin.mark_defs(self));
        let before_root = self
            .plugins
            .invoke_all(PluginHook::BeforeRoot, |plugin| plugin.before_root(self));
        try_join_all(before_root).await?;

        let scenes = try_join_all((0..self.document.scenes.len()).map(|index| self.load_scene(index)));
        let animations =
            try_join_all((0..self.document.animations.len()).map(|index| self.load_animation(index)));
        let cameras =
            try_join_all((0..self.document.cameras.len()).map(|index| self.load_camera(index)));
        let (scenes, animations, cameras) = try_join3(scenes, animations, cameras).await?;

        let mut asset = GltfAsset {
            asset: self.document.asset.clone(),
            scene: self
                .document
                .scene
                .or_else(|| (!scenes.is_empty()).then_some(0)),
            scenes,
            animations,
            cameras,
            extensions_used: self.document.extensions_used.clone(),
            user_data: self.user_data(&self.document.extras, &self.document.extensions),
            warnings: Vec::new(),
        };

        self.plugins.try_for_each(PluginHook::AfterRoot, |plugin| {
            plugin.after_root(self, &mut asset)
        })?;
        for scene in &mut asset.scenes {
            scene.update_world_matrices();
        }
        asset.warnings = self.warnings();
        debug!(
            "Parsed {} scenes, {} animations, {} warnings",
            asset.scenes.len(),
            asset.animations.len(),
            asset.warnings.len()
        );
        Ok(asset)
    }
}

/// Clears the caches of a session when the parse ends, however it ends.
struct ParseSession(Arc<GltfParser>);

impl Drop for ParseSession {
    fn drop(&mut self) {
        self.0.caches.clear();
    }
}

/// Result of a parse. Holds no reference to the document it was built
/// from; built values point back to their definitions through their `id`.
#[derive(Debug, Clone)]
pub struct GltfAsset {
    pub asset: AssetInfo,
    pub scenes: Vec<SceneGraph>,
    /// Index of the scene to show by default.
    pub scene: Option<usize>,
    pub animations: Vec<Arc<AnimationAsset>>,
    pub cameras: Vec<Arc<CameraAsset>>,
    pub extensions_used: Vec<String>,
    pub user_data: UserData,
    pub warnings: Vec<LoadWarning>,
}

impl GltfAsset {
    pub fn default_scene(&self) -> Option<&SceneGraph> {
        self.scene.and_then(|scene| self.scenes.get(scene))
    }
}

fn default_image_decoder() -> Arc<dyn ImageDecoder> {
    #[cfg(feature = "image-decoder")]
    {
        Arc::new(crate::loader::texture::ImageCrateDecoder)
    }
    #[cfg(not(feature = "image-decoder"))]
    {
        Arc::new(NoImageDecoder)
    }
}

/// Entry point: holds configuration and plugin factories, and runs parses.
#[derive(Clone)]
pub struct GltfLoader {
    params: AssetLoadParams,
    resources: Arc<dyn ResourceLoader>,
    image_decoder: Arc<dyn ImageDecoder>,
    plugins: Vec<(String, PluginFactory)>,
}

impl Default for GltfLoader {
    fn default() -> Self {
        Self::new(AssetLoadParams::default())
    }
}

impl GltfLoader {
    /// A loader with every built-in plugin and no external resources.
    pub fn new(params: AssetLoadParams) -> Self {
        let loader = Self {
            params,
            resources: Arc::new(NoResources),
            image_decoder: default_image_decoder(),
            plugins: Vec::new(),
        };
        extensions::register_builtin(loader)
    }

    pub fn params(&self) -> &AssetLoadParams {
        &self.params
    }

    pub fn with_params(mut self, params: AssetLoadParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_resources(mut self, resources: impl ResourceLoader + 'static) -> Self {
        self.resources = Arc::new(resources);
        self
    }

    pub fn with_image_decoder(mut self, decoder: impl ImageDecoder + 'static) -> Self {
        self.image_decoder = Arc::new(decoder);
        self
    }

    /// Removes image decoding; every texture then fails to load.
    pub fn without_image_decoder(self) -> Self {
        self.with_image_decoder(NoImageDecoder)
    }

    /// Enables EXT_meshopt_compression buffer views.
    pub fn with_meshopt_decoder(self, decoder: impl MeshoptDecoder + 'static) -> Self {
        let decoder: Arc<dyn MeshoptDecoder> = Arc::new(decoder);
        self.register(extensions::EXT_MESHOPT_COMPRESSION, move |_| {
            Arc::new(MeshoptPlugin::new(Some(decoder.clone())))
        })
    }

    /// Enables KHR_draco_mesh_compression primitives.
    pub fn with_draco_decoder(self, decoder: impl DracoDecoder + 'static) -> Self {
        let decoder: Arc<dyn DracoDecoder> = Arc::new(decoder);
        self.register(extensions::KHR_DRACO_MESH_COMPRESSION, move |_| {
            Arc::new(DracoPlugin::new(Some(decoder.clone())))
        })
    }

    /// Registers a plugin factory. A factory registered under an existing
    /// name replaces it and keeps its precedence.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&AssetLoadParams) -> Arc<dyn GltfPlugin> + Send + Sync + 'static,
    {
        let name = name.into();
        let factory: PluginFactory = Arc::new(factory);
        match self.plugins.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = factory,
            None => self.plugins.push((name, factory)),
        }
        self
    }

    pub fn unregister(mut self, name: &str) -> Self {
        self.plugins.retain(|(existing, _)| existing != name);
        self
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|(name, _)| name.as_str())
    }

    /// Parses a GLB container or a JSON document.
    pub async fn parse(&self, data: impl Into<Bytes>) -> Result<GltfAsset, GltfLoaderError> {
        let data = data.into();
        let (json, bin) = if BinaryContainer::is_binary(&data) {
            let container = BinaryContainer::parse(data)?;
            (container.json, container.bin)
        } else {
            (data, None)
        };
        let document = Document::from_slice(&json)?;
        self.parse_document(document, bin).await
    }

    /// Parses a document that was already deserialized. Buffers must be
    /// supplied by URI.
    pub async fn parse_value(&self, document: Value) -> Result<GltfAsset, GltfLoaderError> {
        let document = Document::from_value(document)?;
        self.parse_document(document, None).await
    }

    pub async fn parse_document(
        &self,
        document: Document,
        bin: Option<Bytes>,
    ) -> Result<GltfAsset, GltfLoaderError> {
        check_version(&document.asset.version)?;

        let plugins = PluginHost::new(
            self.plugins
                .iter()
                .map(|(_, factory)| factory(&self.params))
                .collect(),
        );
        if let Some(name) = document
            .extensions_required
            .iter()
            .find(|name| !plugins.contains(name))
        {
            return Err(GltfLoaderError::UnsupportedExtensionRequired(name.clone()));
        }

        let parser = Arc::new(GltfParser::new(
            document,
            bin,
            self.params.clone(),
            self.resources.clone(),
            self.image_decoder.clone(),
            plugins,
        )?);
        let session = ParseSession(parser);
        session.0.run().await
    }

    pub fn parse_blocking(&self, data: impl Into<Bytes>) -> Result<GltfAsset, GltfLoaderError> {
        pollster::block_on(self.parse(data))
    }
}

pub fn load_glb_from_buffer(
    buffer: &[u8],
    params: &AssetLoadParams,
) -> Result<GltfAsset, GltfLoaderError> {
    GltfLoader::new(params.clone()).parse_blocking(Bytes::copy_from_slice(buffer))
}

/// Loads a model file from disk. Resources are resolved next to it.
pub fn load_gltf_from_file(
    path: &Path,
    params: &AssetLoadParams,
) -> Result<GltfAsset, GltfLoaderError> {
    let data = std::fs::read(path)
        .map_err(|error| ResourceError::Io(path.display().to_string(), Arc::new(error)))?;
    GltfLoader::new(params.clone())
        .with_resources(DirectoryResources::for_model(path))
        .parse_blocking(data)
}

/// Load a glTF or GLB model from archive.
///
/// The model is read from the entry named by
/// [`AssetLoadParams::bundle_model_name`], trying the `gltf` extension before
/// `glb`. The archive will be used to read binary buffers and images. Only
/// data URIs, relative and `file:` paths are supported; other URIs such as
/// HTTP cause [`GltfLoaderError::InvalidScheme`].
pub fn load_gltf_from_archive<T, A>(
    archive: A,
    params: &AssetLoadParams,
) -> Result<GltfAsset, GltfLoaderError>
where
    T: 'static,
    A: Archive<T> + Send + 'static,
{
    let gltf_name = params.bundle_model_filename("gltf");
    let glb_name = params.bundle_model_filename("glb");

    let resources = ArchiveResources::new(archive, &gltf_name);
    let data = match resources.read_root(&gltf_name)? {
        Some(data) => data,
        None => resources
            .read_root(&glb_name)?
            .ok_or(GltfLoaderError::ModelNotFound(gltf_name))?,
    };
    GltfLoader::new(params.clone())
        .with_resources(resources)
        .parse_blocking(data)
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::{check_node_graph, check_version, sanitize_name, Document, GltfLoaderError};

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Arm.L bone"), "ArmL_bone");
        assert_eq!(sanitize_name("a/b:c[0]"), "abc0");
    }

    #[test]
    fn test_check_version() {
        assert!(check_version("2.0").is_ok());
        assert!(check_version("3.1").is_ok());
        assert!(matches!(
            check_version("1.0"),
            Err(GltfLoaderError::UnsupportedVersion(_))
        ));
        assert!(check_version("").is_err());
    }

    #[test]
    fn test_node_cycle() {
        let document = Document::from_value(json!({
            "asset": { "version": "2.0" },
            "nodes": [{ "children": [1] }, { "children": [2] }, { "children": [0] }]
        }))
        .unwrap();
        assert!(matches!(
            check_node_graph(&document),
            Err(GltfLoaderError::NodeCycle(0))
        ));

        let document = Document::from_value(json!({
            "asset": { "version": "2.0" },
            "nodes": [{ "children": [1, 2] }, { "children": [2] }, {}]
        }))
        .unwrap();
        assert!(check_node_graph(&document).is_ok());

        let document = Document::from_value(json!({
            "asset": { "version": "2.0" },
            "nodes": [{ "children": [5] }]
        }))
        .unwrap();
        assert!(matches!(
            check_node_graph(&document),
            Err(GltfLoaderError::IndexOutOfBounds(_))
        ));
    }
}
