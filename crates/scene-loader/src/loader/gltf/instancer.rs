use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use log::trace;

use crate::{
    camera::CameraAsset,
    index::{AssetIndex, AssetKind},
    light::LightAsset,
    mesh::MeshAsset,
};

use super::cache::lock;

/// A node attachment that may be shared by several nodes.
pub trait Instantiate: Clone {
    fn instance_name(&self) -> &str;
    fn set_instance_name(&mut self, name: String);
}

impl Instantiate for MeshAsset {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn set_instance_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Instantiate for CameraAsset {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn set_instance_name(&mut self, name: String) {
        self.name = name;
    }
}

impl Instantiate for LightAsset {
    fn instance_name(&self) -> &str {
        &self.name
    }

    fn set_instance_name(&mut self, name: String) {
        self.name = name;
    }
}

/// Counts how many nodes refer to each shareable resource, and hands out
/// one independent instance per node when there is more than one.
///
/// References are counted before building starts. Cloning an instance
/// copies only the owned part of the value; geometry and materials stay
/// shared behind their `Arc`s.
#[derive(Debug, Default)]
pub struct ResourceInstancer {
    refs: Mutex<HashMap<AssetIndex, usize>>,
    uses: Mutex<HashMap<AssetIndex, usize>>,
}

impl ResourceInstancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ref(&self, kind: AssetKind, index: usize) {
        *lock(&self.refs)
            .entry(AssetIndex::new(kind, index))
            .or_insert(0) += 1;
    }

    pub fn refs(&self, kind: AssetKind, index: usize) -> usize {
        lock(&self.refs)
            .get(&AssetIndex::new(kind, index))
            .copied()
            .unwrap_or(0)
    }

    /// Returns `value` itself when at most one node refers to it, otherwise
    /// a clone named `{name}_instance_{n}`.
    pub fn get_ref<T: Instantiate>(&self, kind: AssetKind, index: usize, value: Arc<T>) -> Arc<T> {
        if self.refs(kind, index) <= 1 {
            return value;
        }
        let uses = {
            let mut uses = lock(&self.uses);
            let uses = uses.entry(AssetIndex::new(kind, index)).or_insert(0);
            let current = *uses;
            *uses += 1;
            current
        };
        let mut instance = T::clone(&value);
        let name = format!("{}_instance_{}", value.instance_name(), uses);
        trace!("Instancing {} #{} as {}", kind, index, name);
        instance.set_instance_name(name);
        Arc::new(instance)
    }
}
