use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display, Formatter},
    io,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use bytes::Bytes;
use futures::{future::BoxFuture, FutureExt};

use crate::archive::{normalize_path, Archive};

#[derive(Debug, Clone)]
pub enum ResourceError {
    NotFound(String),
    Io(String, Arc<io::Error>),
    Archive(String, String),
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound(path) => write!(f, "Resource {} not found", path),
            ResourceError::Io(path, error) => write!(f, "Failed to read {}: {}", path, error),
            ResourceError::Archive(path, error) => {
                write!(f, "Failed to read {} from archive: {}", path, error)
            }
        }
    }
}

impl Error for ResourceError {}

/// Fetches the bytes of resources referenced by the document.
///
/// Paths are already percent-decoded and relative to the model, except for
/// `file:` URIs which are passed through as absolute paths.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, path: &str) -> BoxFuture<'static, Result<Bytes, ResourceError>>;
}

/// Resolves nothing. Used for self-contained documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceLoader for NoResources {
    fn load(&self, path: &str) -> BoxFuture<'static, Result<Bytes, ResourceError>> {
        futures::future::ready(Err(ResourceError::NotFound(path.to_string()))).boxed()
    }
}

/// Resources held in memory, keyed by relative path.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    files: HashMap<PathBuf, Bytes>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, data: impl Into<Bytes>) {
        self.files.insert(normalize_path(path.as_ref()), data.into());
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, data: impl Into<Bytes>) -> Self {
        self.insert(path, data);
        self
    }
}

impl ResourceLoader for MemoryResources {
    fn load(&self, path: &str) -> BoxFuture<'static, Result<Bytes, ResourceError>> {
        let result = self
            .files
            .get(&normalize_path(Path::new(path)))
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()));
        futures::future::ready(result).boxed()
    }
}

/// Reads resources from a directory on the file system.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    base: PathBuf,
}

impl DirectoryResources {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Resources next to the given model file.
    pub fn for_model(model: &Path) -> Self {
        Self::new(model.parent().map(Path::to_path_buf).unwrap_or_default())
    }
}

impl ResourceLoader for DirectoryResources {
    fn load(&self, path: &str) -> BoxFuture<'static, Result<Bytes, ResourceError>> {
        let full_path = self.base.join(path);
        let path = path.to_string();
        async move {
            match std::fs::read(&full_path) {
                Ok(data) => Ok(Bytes::from(data)),
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    Err(ResourceError::NotFound(path))
                }
                Err(error) => Err(ResourceError::Io(path, Arc::new(error))),
            }
        }
        .boxed()
    }
}

/// Reads resources from an [`Archive`], relative to the directory of the
/// model entry.
pub struct ArchiveResources<T, A> {
    archive: Mutex<A>,
    base: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T, A: Archive<T>> ArchiveResources<T, A> {
    pub fn new(archive: A, model_path: impl AsRef<Path>) -> Self {
        let base = model_path
            .as_ref()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            archive: Mutex::new(archive),
            base,
            _marker: PhantomData,
        }
    }

    /// Reads an entry relative to the archive root.
    pub fn read_root(&self, path: impl AsRef<Path>) -> Result<Option<Bytes>, ResourceError> {
        let path = path.as_ref();
        let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        archive
            .read(path)
            .map_err(|error| ResourceError::Archive(path.display().to_string(), error.to_string()))
    }
}

impl<T, A> ResourceLoader for ArchiveResources<T, A>
where
    A: Archive<T> + Send,
{
    fn load(&self, path: &str) -> BoxFuture<'static, Result<Bytes, ResourceError>> {
        let result = self
            .read_root(self.base.join(path))
            .and_then(|data| data.ok_or_else(|| ResourceError::NotFound(path.to_string())));
        futures::future::ready(result).boxed()
    }
}
