use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{future::try_join, FutureExt};

use crate::{
    accessor::{
        Accessor, AccessorShape, AccessorStorage, ComponentArray, ComponentType,
        InterleavedBuffer,
    },
    index::{AssetIndex, AssetKind},
};

use super::{
    cache::lock, document::AccessorDef, plugin::PluginHook, scheme::Scheme, GltfLoaderError,
    GltfParser, Pending,
};

/// Identifies one strided region: accessors reading the same elements of
/// the same view with the same component type share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct InterleavedKey {
    buffer_view: usize,
    component_type: ComponentType,
    // First element, in strides
    slice: usize,
    count: usize,
}

/// Reads `count` tightly packed components starting at `offset`.
fn read_components(
    accessor: usize,
    data: &Bytes,
    offset: usize,
    component_type: ComponentType,
    count: usize,
) -> Result<ComponentArray, GltfLoaderError> {
    let end = offset + count * component_type.size();
    let bytes = data
        .get(offset..end)
        .ok_or(GltfLoaderError::AccessorOutOfBounds {
            accessor,
            needed: end,
            available: data.len(),
        })?;
    Ok(ComponentArray::from_le_bytes(component_type, bytes))
}

impl GltfParser {
    /// Bytes of a buffer. A buffer without URI is the binary chunk of the
    /// container.
    pub fn load_buffer(self: &Arc<Self>, index: usize) -> Pending<Bytes> {
        let parser = self.clone();
        self.caches.buffers.get_or_create(index, move || {
            async move {
                let buffer = parser.document.buffer(index)?;
                let data = match &buffer.uri {
                    None if index == 0 => parser
                        .bin
                        .clone()
                        .ok_or(GltfLoaderError::MissingBinaryChunk(index))?,
                    None => return Err(GltfLoaderError::MissingBufferUri(index)),
                    Some(uri) => match Scheme::try_from(uri.as_str())? {
                        Scheme::Data(_, data) => Bytes::from(data),
                        Scheme::Relative(path) | Scheme::Absolute(path) => {
                            parser.resources.load(&path).await?
                        }
                    },
                };

                // Pad the data to 4 bytes with zeroes
                if data.len() % 4 != 0 {
                    let mut padded = BytesMut::from(data.as_ref());
                    padded.resize(data.len().next_multiple_of(4), 0);
                    return Ok(padded.freeze());
                }
                Ok(data)
            }
            .boxed()
        })
    }

    /// Bytes of a buffer view. Plugins may supply them instead, for views
    /// holding compressed data.
    pub fn load_buffer_view(self: &Arc<Self>, index: usize) -> Pending<Bytes> {
        let parser = self.clone();
        self.caches.buffer_views.get_or_create(index, move || {
            if let Some(future) = parser
                .plugins
                .invoke_one(PluginHook::LoadBufferView, |plugin| {
                    plugin.load_buffer_view(&parser, index)
                })
            {
                return future;
            }
            async move {
                let view = parser.document.buffer_view(index)?;
                let buffer = parser.load_buffer(view.buffer).await?;
                let end = view.byte_offset + view.byte_length;
                if end > buffer.len() {
                    return Err(GltfLoaderError::BufferViewOutOfBounds {
                        buffer_view: index,
                        needed: end,
                        available: buffer.len(),
                    });
                }
                Ok(buffer.slice(view.byte_offset..end))
            }
            .boxed()
        })
    }

    pub fn load_accessor(self: &Arc<Self>, index: usize) -> Pending<Arc<Accessor>> {
        let parser = self.clone();
        self.caches.accessors.get_or_create(index, move || {
            async move {
                let def = parser.document.accessor(index)?;
                let accessor = parser.decode_accessor(index, def).await?;
                Ok(Arc::new(accessor))
            }
            .boxed()
        })
    }

    async fn decode_accessor(
        self: &Arc<Self>,
        index: usize,
        def: &AccessorDef,
    ) -> Result<Accessor, GltfLoaderError> {
        let component_type = ComponentType::from_gl(def.component_type)
            .ok_or(GltfLoaderError::UnsupportedComponentType(index, def.component_type))?;
        let shape = AccessorShape::from_name(&def.shape)
            .ok_or_else(|| GltfLoaderError::UnsupportedAccessorShape(index, def.shape.clone()))?;
        let item_size = shape.item_size();
        let element_size = component_type.size() * item_size;

        let storage = match def.buffer_view {
            // Sparse accessors without a view start from zeroes
            None => AccessorStorage::Flat(ComponentArray::zeroed(
                component_type,
                def.count * item_size,
            )),
            Some(view_index) => {
                let data = self.load_buffer_view(view_index).await?;
                let stride = self.document.buffer_view(view_index)?.byte_stride.unwrap_or(0);
                if stride != 0 && stride != element_size {
                    self.interleaved_storage(
                        index,
                        def,
                        view_index,
                        data,
                        stride,
                        component_type,
                        element_size,
                    )?
                } else {
                    AccessorStorage::Flat(read_components(
                        index,
                        &data,
                        def.byte_offset,
                        component_type,
                        def.count * item_size,
                    )?)
                }
            }
        };

        let mut accessor = Accessor {
            id: Some(AssetIndex::new(AssetKind::Accessor, index)),
            component_type,
            shape,
            count: def.count,
            normalized: def.normalized,
            storage,
            min: def.min.clone(),
            max: def.max.clone(),
        };

        if let Some(sparse) = &def.sparse {
            let index_type = ComponentType::from_gl(sparse.indices.component_type)
                .filter(|component_type| {
                    matches!(
                        component_type,
                        ComponentType::U8 | ComponentType::U16 | ComponentType::U32
                    )
                })
                .ok_or(GltfLoaderError::UnsupportedComponentType(
                    index,
                    sparse.indices.component_type,
                ))?;
            let (indices_data, values_data) = try_join(
                self.load_buffer_view(sparse.indices.buffer_view),
                self.load_buffer_view(sparse.values.buffer_view),
            )
            .await?;
            let indices = read_components(
                index,
                &indices_data,
                sparse.indices.byte_offset,
                index_type,
                sparse.count,
            )?;
            let values = read_components(
                index,
                &values_data,
                sparse.values.byte_offset,
                component_type,
                sparse.count * item_size,
            )?;

            // Never write into a region shared with other accessors
            let mut array = accessor.to_component_array();
            for entry in 0..sparse.count {
                let target = indices.get(entry) as usize;
                if target >= def.count {
                    return Err(GltfLoaderError::AccessorOutOfBounds {
                        accessor: index,
                        needed: (target + 1) * element_size,
                        available: def.count * element_size,
                    });
                }
                for component in 0..item_size {
                    array.set(
                        target * item_size + component,
                        values.get(entry * item_size + component),
                    );
                }
            }
            accessor.storage = AccessorStorage::Flat(array);
        }

        Ok(accessor)
    }

    #[allow(clippy::too_many_arguments)]
    fn interleaved_storage(
        &self,
        index: usize,
        def: &AccessorDef,
        view_index: usize,
        data: Bytes,
        stride: usize,
        component_type: ComponentType,
        element_size: usize,
    ) -> Result<AccessorStorage, GltfLoaderError> {
        if def.count > 0 {
            let needed = def.byte_offset + (def.count - 1) * stride + element_size;
            if needed > data.len() {
                return Err(GltfLoaderError::AccessorOutOfBounds {
                    accessor: index,
                    needed,
                    available: data.len(),
                });
            }
        }

        let slice = def.byte_offset / stride;
        let key = InterleavedKey {
            buffer_view: view_index,
            component_type,
            slice,
            count: def.count,
        };
        let buffer = lock(&self.caches.interleaved)
            .entry(key)
            .or_insert_with(|| {
                // Elements may run past their own stride, so the region
                // extends to the end of the view
                Arc::new(InterleavedBuffer {
                    data: data.slice((slice * stride).min(data.len())..),
                    stride,
                    component_type,
                })
            })
            .clone();
        Ok(AccessorStorage::Interleaved {
            buffer,
            offset: def.byte_offset % stride,
        })
    }
}
