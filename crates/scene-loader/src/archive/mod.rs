//! Read-only archive access used to resolve model resources.
//!
//! A model and all of its buffers and images can be packed into a zip or tar
//! archive and loaded without touching the file system.

use std::{
    borrow::Cow,
    error::Error,
    io::{Read, Seek},
    path::{Component, Path, PathBuf},
};

use bytes::Bytes;

#[cfg(feature = "tar")]
pub mod tar;
#[cfg(feature = "zip")]
pub mod zip;

pub trait Entry<'a> {
    type Error: Error;

    fn name(&self) -> Result<Cow<'_, str>, Self::Error>;
    fn unpack(&mut self) -> Result<Bytes, Self::Error>;
}

pub trait Archive<T>: Sized {
    type Error: Error;
    type Entry<'a>: Entry<'a, Error = Self::Error>
    where
        Self: 'a;

    fn new(stream: T) -> Result<Self, Self::Error>
    where
        T: Read + Seek;

    fn by_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<Self::Entry<'_>>, Self::Error>;

    /// Reads a whole entry, or `None` when the archive has no such path.
    fn read<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<Bytes>, Self::Error> {
        match self.by_path(normalize_path(path.as_ref()))? {
            Some(mut entry) => Ok(Some(entry.unpack()?)),
            None => Ok(None),
        }
    }
}

/// Resolves `.` and `..` lexically. Archive paths are always relative, so
/// leading root and prefix components are dropped.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => result.push(part),
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    result
}
