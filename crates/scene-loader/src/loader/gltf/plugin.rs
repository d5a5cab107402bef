//! Extension plugins.
//!
//! A plugin is named after the extension it handles and overrides any subset
//! of the hooks of [`GltfPlugin`]. Plugins are consulted in registration
//! order. Hooks that decide something (which material kind, which buffer
//! view bytes, which node mesh) stop at the first plugin that answers; hooks
//! that contribute something run on every plugin.

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use bytes::Bytes;
use futures::future::BoxFuture;
use log::trace;

use crate::{
    material::{MaterialExtensionData, MaterialKind},
    node::NodeAttachment,
    primitive::Geometry,
    texture::TextureAsset,
};

use super::{GltfAsset, GltfLoaderError, GltfParser};

pub type PluginFuture<T> = BoxFuture<'static, Result<T, GltfLoaderError>>;

#[allow(unused_variables)]
pub trait GltfPlugin: Send + Sync {
    /// Extension name, as it appears in the document.
    fn name(&self) -> &str;

    /// Called once before anything is built. Used to count references to
    /// resources attached to nodes.
    fn mark_defs(&self, parser: &GltfParser) {}

    fn before_root(&self, parser: &Arc<GltfParser>) -> Option<PluginFuture<()>> {
        None
    }

    /// Called with the assembled result, before world matrices are computed.
    fn after_root(
        &self,
        parser: &GltfParser,
        asset: &mut GltfAsset,
    ) -> Result<(), GltfLoaderError> {
        Ok(())
    }

    fn load_buffer_view(
        &self,
        parser: &Arc<GltfParser>,
        index: usize,
    ) -> Option<PluginFuture<Bytes>> {
        None
    }

    fn load_texture(
        &self,
        parser: &Arc<GltfParser>,
        index: usize,
    ) -> Option<PluginFuture<Option<Arc<TextureAsset>>>> {
        None
    }

    fn material_kind(&self, parser: &GltfParser, index: usize) -> Option<MaterialKind> {
        None
    }

    fn extend_material_params(
        &self,
        parser: &Arc<GltfParser>,
        index: usize,
    ) -> Option<PluginFuture<MaterialExtensionData>> {
        None
    }

    fn decode_primitive(
        &self,
        parser: &Arc<GltfParser>,
        mesh: usize,
        primitive: usize,
    ) -> Option<PluginFuture<Arc<Geometry>>> {
        None
    }

    fn create_node_mesh(
        &self,
        parser: &Arc<GltfParser>,
        node: usize,
    ) -> Option<PluginFuture<Option<NodeAttachment>>> {
        None
    }

    fn create_node_attachment(
        &self,
        parser: &Arc<GltfParser>,
        node: usize,
    ) -> Option<PluginFuture<Option<NodeAttachment>>> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginHook {
    MarkDefs,
    BeforeRoot,
    AfterRoot,
    LoadBufferView,
    LoadTexture,
    MaterialKind,
    ExtendMaterialParams,
    DecodePrimitive,
    CreateNodeMesh,
    CreateNodeAttachment,
}

impl Display for PluginHook {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PluginHook::MarkDefs => write!(f, "mark_defs"),
            PluginHook::BeforeRoot => write!(f, "before_root"),
            PluginHook::AfterRoot => write!(f, "after_root"),
            PluginHook::LoadBufferView => write!(f, "load_buffer_view"),
            PluginHook::LoadTexture => write!(f, "load_texture"),
            PluginHook::MaterialKind => write!(f, "material_kind"),
            PluginHook::ExtendMaterialParams => write!(f, "extend_material_params"),
            PluginHook::DecodePrimitive => write!(f, "decode_primitive"),
            PluginHook::CreateNodeMesh => write!(f, "create_node_mesh"),
            PluginHook::CreateNodeAttachment => write!(f, "create_node_attachment"),
        }
    }
}

/// The plugins of one parse, in registration order.
#[derive(Default, Clone)]
pub struct PluginHost {
    plugins: Vec<Arc<dyn GltfPlugin>>,
}

impl PluginHost {
    pub fn new(plugins: Vec<Arc<dyn GltfPlugin>>) -> Self {
        Self { plugins }
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn GltfPlugin>> {
        self.plugins.iter().find(|plugin| plugin.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|plugin| plugin.name())
    }

    /// Asks each plugin in turn and returns the first answer.
    pub fn invoke_one<T, F>(&self, hook: PluginHook, mut invoke: F) -> Option<T>
    where
        F: FnMut(&dyn GltfPlugin) -> Option<T>,
    {
        self.plugins.iter().find_map(|plugin| {
            let result = invoke(plugin.as_ref());
            if result.is_some() {
                trace!("{} handled {}", plugin.name(), hook);
            }
            result
        })
    }

    /// Asks every plugin and collects all answers in registration order.
    pub fn invoke_all<T, F>(&self, hook: PluginHook, mut invoke: F) -> Vec<T>
    where
        F: FnMut(&dyn GltfPlugin) -> Option<T>,
    {
        self.plugins
            .iter()
            .filter_map(|plugin| {
                let result = invoke(plugin.as_ref());
                if result.is_some() {
                    trace!("{} contributed to {}", plugin.name(), hook);
                }
                result
            })
            .collect()
    }

    /// Calls a hook without a result on every plugin.
    pub fn for_each<F>(&self, hook: PluginHook, mut invoke: F)
    where
        F: FnMut(&dyn GltfPlugin),
    {
        for plugin in &self.plugins {
            trace!("Calling {} of {}", hook, plugin.name());
            invoke(plugin.as_ref());
        }
    }

    /// Like [`for_each`](Self::for_each), stopping at the first error.
    pub fn try_for_each<E, F>(&self, hook: PluginHook, mut invoke: F) -> Result<(), E>
    where
        F: FnMut(&dyn GltfPlugin) -> Result<(), E>,
    {
        for plugin in &self.plugins {
            trace!("Calling {} of {}", hook, plugin.name());
            invoke(plugin.as_ref())?;
        }
        Ok(())
    }
}
