//! Typed numeric attribute data decoded from buffer views.
//!
//! An [`Accessor`] is either a flat array owned by the accessor or a window
//! into an [`InterleavedBuffer`] shared by every accessor reading the same
//! strided region. Normalization of integer components is applied when
//! values are read, never when they are stored.

use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use bytes::Bytes;
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::index::AssetIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_gl(code: u32) -> Option<Self> {
        match code {
            5120 => Some(ComponentType::I8),
            5121 => Some(ComponentType::U8),
            5122 => Some(ComponentType::I16),
            5123 => Some(ComponentType::U16),
            5125 => Some(ComponentType::U32),
            5126 => Some(ComponentType::F32),
            _ => None,
        }
    }

    pub fn gl_code(self) -> u32 {
        match self {
            ComponentType::I8 => 5120,
            ComponentType::U8 => 5121,
            ComponentType::I16 => 5122,
            ComponentType::U16 => 5123,
            ComponentType::U32 => 5125,
            ComponentType::F32 => 5126,
        }
    }

    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }

    /// Maps a stored integer onto `[0, 1]` or `[-1, 1]`.
    pub fn normalize(self, value: f64) -> f64 {
        match self {
            ComponentType::I8 => (value / i8::MAX as f64).max(-1.0),
            ComponentType::U8 => value / u8::MAX as f64,
            ComponentType::I16 => (value / i16::MAX as f64).max(-1.0),
            ComponentType::U16 => value / u16::MAX as f64,
            ComponentType::U32 => value / u32::MAX as f64,
            ComponentType::F32 => value,
        }
    }
}

impl Display for ComponentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ComponentType::I8 => write!(f, "BYTE"),
            ComponentType::U8 => write!(f, "UNSIGNED_BYTE"),
            ComponentType::I16 => write!(f, "SHORT"),
            ComponentType::U16 => write!(f, "UNSIGNED_SHORT"),
            ComponentType::U32 => write!(f, "UNSIGNED_INT"),
            ComponentType::F32 => write!(f, "FLOAT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorShape {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorShape {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(AccessorShape::Scalar),
            "VEC2" => Some(AccessorShape::Vec2),
            "VEC3" => Some(AccessorShape::Vec3),
            "VEC4" => Some(AccessorShape::Vec4),
            "MAT2" => Some(AccessorShape::Mat2),
            "MAT3" => Some(AccessorShape::Mat3),
            "MAT4" => Some(AccessorShape::Mat4),
            _ => None,
        }
    }

    /// Number of components in one element.
    pub fn item_size(self) -> usize {
        match self {
            AccessorShape::Scalar => 1,
            AccessorShape::Vec2 => 2,
            AccessorShape::Vec3 => 3,
            AccessorShape::Vec4 => 4,
            AccessorShape::Mat2 => 4,
            AccessorShape::Mat3 => 9,
            AccessorShape::Mat4 => 16,
        }
    }
}

impl Display for AccessorShape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AccessorShape::Scalar => write!(f, "SCALAR"),
            AccessorShape::Vec2 => write!(f, "VEC2"),
            AccessorShape::Vec3 => write!(f, "VEC3"),
            AccessorShape::Vec4 => write!(f, "VEC4"),
            AccessorShape::Mat2 => write!(f, "MAT2"),
            AccessorShape::Mat3 => write!(f, "MAT3"),
            AccessorShape::Mat4 => write!(f, "MAT4"),
        }
    }
}

/// Flat component storage in the accessor's native type.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentArray {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

impl ComponentArray {
    pub fn zeroed(component_type: ComponentType, len: usize) -> Self {
        match component_type {
            ComponentType::I8 => ComponentArray::I8(vec![0; len]),
            ComponentType::U8 => ComponentArray::U8(vec![0; len]),
            ComponentType::I16 => ComponentArray::I16(vec![0; len]),
            ComponentType::U16 => ComponentArray::U16(vec![0; len]),
            ComponentType::U32 => ComponentArray::U32(vec![0; len]),
            ComponentType::F32 => ComponentArray::F32(vec![0.0; len]),
        }
    }

    /// Reads little-endian components. Trailing bytes that do not form a
    /// whole component are ignored.
    pub fn from_le_bytes(component_type: ComponentType, data: &[u8]) -> Self {
        match component_type {
            ComponentType::I8 => {
                ComponentArray::I8(data.iter().map(|byte| *byte as i8).collect())
            }
            ComponentType::U8 => ComponentArray::U8(data.to_vec()),
            ComponentType::I16 => ComponentArray::I16(
                data.chunks_exact(2)
                    .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect(),
            ),
            ComponentType::U16 => ComponentArray::U16(
                data.chunks_exact(2)
                    .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
                    .collect(),
            ),
            ComponentType::U32 => ComponentArray::U32(
                data.chunks_exact(4)
                    .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect(),
            ),
            ComponentType::F32 => ComponentArray::F32(
                data.chunks_exact(4)
                    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect(),
            ),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match self {
            ComponentArray::I8(_) => ComponentType::I8,
            ComponentArray::U8(_) => ComponentType::U8,
            ComponentArray::I16(_) => ComponentType::I16,
            ComponentArray::U16(_) => ComponentType::U16,
            ComponentArray::U32(_) => ComponentType::U32,
            ComponentArray::F32(_) => ComponentType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ComponentArray::I8(data) => data.len(),
            ComponentArray::U8(data) => data.len(),
            ComponentArray::I16(data) => data.len(),
            ComponentArray::U16(data) => data.len(),
            ComponentArray::U32(data) => data.len(),
            ComponentArray::F32(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw value at a flat component index, without normalization.
    pub fn get(&self, index: usize) -> f64 {
        match self {
            ComponentArray::I8(data) => data[index] as f64,
            ComponentArray::U8(data) => data[index] as f64,
            ComponentArray::I16(data) => data[index] as f64,
            ComponentArray::U16(data) => data[index] as f64,
            ComponentArray::U32(data) => data[index] as f64,
            ComponentArray::F32(data) => data[index] as f64,
        }
    }

    /// Stores a raw value, saturating into the component type.
    pub fn set(&mut self, index: usize, value: f64) {
        match self {
            ComponentArray::I8(data) => data[index] = value as i8,
            ComponentArray::U8(data) => data[index] = value as u8,
            ComponentArray::I16(data) => data[index] = value as i16,
            ComponentArray::U16(data) => data[index] = value as u16,
            ComponentArray::U32(data) => data[index] = value as u32,
            ComponentArray::F32(data) => data[index] = value as f32,
        }
    }
}

/// A strided byte region shared by all accessors reading it.
#[derive(Debug, Clone)]
pub struct InterleavedBuffer {
    pub data: Bytes,
    /// Distance in bytes between the starts of two elements.
    pub stride: usize,
    pub component_type: ComponentType,
}

impl InterleavedBuffer {
    /// Raw component at `element`, starting `byte_offset` bytes into the
    /// element. Reads past the end of the region yield zero.
    fn read(&self, element: usize, byte_offset: usize) -> f64 {
        let start = element * self.stride + byte_offset;
        let size = self.component_type.size();
        let Some(bytes) = self.data.get(start..start + size) else {
            return 0.0;
        };
        match self.component_type {
            ComponentType::I8 => bytes[0] as i8 as f64,
            ComponentType::U8 => bytes[0] as f64,
            ComponentType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ComponentType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            ComponentType::U32 => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
            ComponentType::F32 => {
                f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum AccessorStorage {
    Flat(ComponentArray),
    Interleaved {
        buffer: Arc<InterleavedBuffer>,
        /// Byte offset of the first component inside each element.
        offset: usize,
    },
}

#[derive(Debug, Clone)]
pub struct Accessor {
    pub id: Option<AssetIndex>,
    pub component_type: ComponentType,
    pub shape: AccessorShape,
    pub count: usize,
    pub normalized: bool,
    pub storage: AccessorStorage,
    pub min: Option<Vec<f64>>,
    pub max: Option<Vec<f64>>,
}

impl Accessor {
    /// Builds an accessor over owned components. `data` holds
    /// `count * shape.item_size()` components.
    pub fn from_array(shape: AccessorShape, normalized: bool, data: ComponentArray) -> Self {
        let count = data.len() / shape.item_size();
        Self {
            id: None,
            component_type: data.component_type(),
            shape,
            count,
            normalized,
            storage: AccessorStorage::Flat(data),
            min: None,
            max: None,
        }
    }

    pub fn from_f32(shape: AccessorShape, data: Vec<f32>) -> Self {
        Self::from_array(shape, false, ComponentArray::F32(data))
    }

    pub fn item_size(&self) -> usize {
        self.shape.item_size()
    }

    /// Total logical number of components.
    pub fn len(&self) -> usize {
        self.count * self.item_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_interleaved(&self) -> bool {
        matches!(self.storage, AccessorStorage::Interleaved { .. })
    }

    pub fn interleaved_buffer(&self) -> Option<&Arc<InterleavedBuffer>> {
        match &self.storage {
            AccessorStorage::Interleaved { buffer, .. } => Some(buffer),
            AccessorStorage::Flat(_) => None,
        }
    }

    /// Raw stored value of `component` in element `item`.
    pub fn raw(&self, item: usize, component: usize) -> f64 {
        match &self.storage {
            AccessorStorage::Flat(data) => data.get(item * self.item_size() + component),
            AccessorStorage::Interleaved { buffer, offset } => buffer.read(
                item,
                offset + component * self.component_type.size(),
            ),
        }
    }

    /// Value of `component` in element `item`, normalized when the
    /// accessor says so.
    pub fn get(&self, item: usize, component: usize) -> f64 {
        let value = self.raw(item, component);
        if self.normalized {
            self.component_type.normalize(value)
        } else {
            value
        }
    }

    pub fn to_f32_vec(&self) -> Vec<f32> {
        let item_size = self.item_size();
        (0..self.count)
            .flat_map(|item| (0..item_size).map(move |component| (item, component)))
            .map(|(item, component)| self.get(item, component) as f32)
            .collect()
    }

    /// Raw values as unsigned integers, as used by indices and joints.
    pub fn to_u32_vec(&self) -> Vec<u32> {
        let item_size = self.item_size();
        (0..self.count)
            .flat_map(|item| (0..item_size).map(move |component| (item, component)))
            .map(|(item, component)| self.raw(item, component) as u32)
            .collect()
    }

    /// Copies the accessor into owned storage in its native type.
    pub fn to_component_array(&self) -> ComponentArray {
        match &self.storage {
            AccessorStorage::Flat(data) => data.clone(),
            AccessorStorage::Interleaved { .. } => {
                let mut array = ComponentArray::zeroed(self.component_type, self.len());
                let item_size = self.item_size();
                for item in 0..self.count {
                    for component in 0..item_size {
                        array.set(item * item_size + component, self.raw(item, component));
                    }
                }
                array
            }
        }
    }

    pub fn read_vec2(&self, item: usize) -> Vec2 {
        Vec2::new(self.get(item, 0) as f32, self.get(item, 1) as f32)
    }

    pub fn read_vec3(&self, item: usize) -> Vec3 {
        Vec3::new(
            self.get(item, 0) as f32,
            self.get(item, 1) as f32,
            self.get(item, 2) as f32,
        )
    }

    pub fn read_vec4(&self, item: usize) -> Vec4 {
        Vec4::new(
            self.get(item, 0) as f32,
            self.get(item, 1) as f32,
            self.get(item, 2) as f32,
            self.get(item, 3) as f32,
        )
    }

    pub fn read_quat(&self, item: usize) -> Quat {
        Quat::from_vec4(self.read_vec4(item))
    }

    pub fn read_mat4(&self, item: usize) -> Mat4 {
        let mut columns = [0.0f32; 16];
        for (component, value) in columns.iter_mut().enumerate() {
            *value = self.get(item, component) as f32;
        }
        Mat4::from_cols_array(&columns)
    }
}
