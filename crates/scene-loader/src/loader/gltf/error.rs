use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

use crate::{
    index::AssetIndex,
    loader::{resource::ResourceError, texture::ImageDecodeError},
};

use super::{container::ContainerError, scheme::SchemeError};

/// Terminal failure of a parse.
///
/// Errors travel through shared futures, so foreign sources are kept
/// behind `Arc` and the whole enum is `Clone`.
#[derive(Debug, Clone)]
pub enum GltfLoaderError {
    MalformedContainer(ContainerError),
    Json(Arc<serde_json::Error>),
    UnsupportedVersion(String),
    UnsupportedExtensionRequired(String),
    UnsupportedComponentType(usize, u32),
    UnsupportedAccessorShape(usize, String),
    AccessorOutOfBounds {
        accessor: usize,
        needed: usize,
        available: usize,
    },
    BufferViewOutOfBounds {
        buffer_view: usize,
        needed: usize,
        available: usize,
    },
    /// The output accessor of an animation sampler does not hold a whole
    /// number of values for every keyframe of its input.
    AnimationOutputMismatch {
        accessor: usize,
        keyframes: usize,
        values: usize,
    },
    IndexOutOfBounds(AssetIndex),
    MissingBinaryChunk(usize),
    MissingBufferUri(usize),
    InvalidScheme(SchemeError),
    Resource(ResourceError),
    ModelNotFound(String),
    Image(usize, ImageDecodeError),
    UnsupportedPrimitiveMode(u32),
    MissingPosition(usize),
    BadCamera(usize, String),
    BadExtensionData(String),
    MissingDecoder(String),
    Plugin(String, String),
    NodeCycle(usize),
}

impl Display for GltfLoaderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GltfLoaderError::MalformedContainer(error) => {
                write!(f, "Malformed binary container: {}", error)
            }
            GltfLoaderError::Json(error) => write!(f, "Bad document: {}", error),
            GltfLoaderError::UnsupportedVersion(version) => {
                write!(f, "Unsupported asset version {}", version)
            }
            GltfLoaderError::UnsupportedExtensionRequired(name) => {
                write!(f, "Required extension {} is not supported", name)
            }
            GltfLoaderError::UnsupportedComponentType(accessor, component_type) => write!(
                f,
                "Unsupported component type {} in accessor #{}",
                component_type, accessor
            ),
            GltfLoaderError::UnsupportedAccessorShape(accessor, shape) => {
                write!(f, "Unsupported type {} in accessor #{}", shape, accessor)
            }
            GltfLoaderError::AccessorOutOfBounds {
                accessor,
                needed,
                available,
            } => write!(
                f,
                "Accessor #{} needs {} bytes, but only {} available",
                accessor, needed, available
            ),
            GltfLoaderError::BufferViewOutOfBounds {
                buffer_view,
                needed,
                available,
            } => write!(
                f,
                "Buffer view #{} needs {} bytes, but buffer only has {}",
                buffer_view, needed, available
            ),
            GltfLoaderError::AnimationOutputMismatch {
                accessor,
                keyframes,
                values,
            } => write!(
                f,
                "Animation output accessor #{} has {} elements for {} keyframes",
                accessor, values, keyframes
            ),
            GltfLoaderError::IndexOutOfBounds(index) => write!(f, "{} does not exist", index),
            GltfLoaderError::MissingBinaryChunk(buffer) => {
                write!(f, "Buffer #{} refers to a missing binary chunk", buffer)
            }
            GltfLoaderError::MissingBufferUri(buffer) => {
                write!(f, "Buffer #{} has no URI", buffer)
            }
            GltfLoaderError::InvalidScheme(error) => Display::fmt(error, f),
            GltfLoaderError::Resource(error) => Display::fmt(error, f),
            GltfLoaderError::ModelNotFound(file_name) => {
                write!(f, "File {} not found in bundle", file_name)
            }
            GltfLoaderError::Image(image, error) => write!(f, "Image #{}: {}", image, error),
            GltfLoaderError::UnsupportedPrimitiveMode(mode) => {
                write!(f, "Unsupported primitive mode: {}", mode)
            }
            GltfLoaderError::MissingPosition(mesh) => {
                write!(f, "Primitive of mesh #{} has no POSITION attribute", mesh)
            }
            GltfLoaderError::BadCamera(camera, kind) => {
                write!(f, "Camera #{} has unsupported type {:?}", camera, kind)
            }
            GltfLoaderError::BadExtensionData(name) => write!(f, "Bad {} data", name),
            GltfLoaderError::MissingDecoder(name) => {
                write!(f, "No decoder available for {}", name)
            }
            GltfLoaderError::Plugin(name, message) => write!(f, "{}: {}", name, message),
            GltfLoaderError::NodeCycle(node) => {
                write!(f, "Node #{} is its own ancestor", node)
            }
        }
    }
}

impl Error for GltfLoaderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GltfLoaderError::MalformedContainer(error) => Some(error),
            GltfLoaderError::Json(error) => Some(error.as_ref()),
            GltfLoaderError::InvalidScheme(error) => Some(error),
            GltfLoaderError::Resource(error) => Some(error),
            GltfLoaderError::Image(_, error) => Some(error),
            _ => None,
        }
    }
}

impl From<ContainerError> for GltfLoaderError {
    fn from(value: ContainerError) -> Self {
        Self::MalformedContainer(value)
    }
}

impl From<serde_json::Error> for GltfLoaderError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Arc::new(value))
    }
}

impl From<SchemeError> for GltfLoaderError {
    fn from(value: SchemeError) -> Self {
        Self::InvalidScheme(value)
    }
}

impl From<ResourceError> for GltfLoaderError {
    fn from(value: ResourceError) -> Self {
        Self::Resource(value)
    }
}

/// A problem the parse recovered from.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    TextureLoadFailed { texture: usize, reason: String },
    UnresolvedJoint { skin: usize, joint: usize, reason: String },
    UnknownExtension(String),
    ChannelWithoutTarget { animation: usize, channel: usize },
}

impl Display for LoadWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::TextureLoadFailed { texture, reason } => {
                write!(f, "Couldn't load texture #{}: {}", texture, reason)
            }
            LoadWarning::UnresolvedJoint {
                skin,
                joint,
                reason,
            } => write!(
                f,
                "Joint {} of skin #{} could not be found: {}",
                joint, skin, reason
            ),
            LoadWarning::UnknownExtension(name) => write!(f, "Unknown extension {}", name),
            LoadWarning::ChannelWithoutTarget { animation, channel } => write!(
                f,
                "Channel {} of animation #{} has no target node",
                channel, animation
            ),
        }
    }
}
