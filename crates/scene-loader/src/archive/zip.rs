use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Formatter},
    io::{self, Read, Seek},
    path::{Path, PathBuf},
};

use bytes::Bytes;
use zip::ZipArchive;

use super::{normalize_path, Archive, Entry};

#[derive(Debug)]
pub enum ZipError {
    Zip(zip::result::ZipError),
    BadFileName(PathBuf),
    FileTooLarge(u64),
}

impl Display for ZipError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ZipError::Zip(error) => Display::fmt(error, f),
            ZipError::BadFileName(file_name) => {
                write!(f, "File name {} is not valid Unicode", file_name.display())
            }
            ZipError::FileTooLarge(size) => write!(f, "File size {} is too large", size),
        }
    }
}

impl Error for ZipError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ZipError::Zip(error) => Some(error),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for ZipError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Zip(value)
    }
}

impl From<io::Error> for ZipError {
    fn from(value: io::Error) -> Self {
        Self::Zip(zip::result::ZipError::Io(value))
    }
}

/// An entry unpacked from a zip archive.
#[derive(Debug, Clone)]
pub struct ZipEntry {
    name: String,
    data: Bytes,
}

impl<'a> Entry<'a> for ZipEntry {
    type Error = ZipError;

    fn name(&self) -> Result<Cow<'_, str>, Self::Error> {
        Ok(Cow::Borrowed(&self.name))
    }

    fn unpack(&mut self) -> Result<Bytes, Self::Error> {
        Ok(self.data.clone())
    }
}

/// Lookup key of an entry name. Some archivers store Windows separators
/// or `./` prefixes.
fn entry_key(name: &str) -> String {
    normalize_path(Path::new(&name.replace('\\', "/")))
        .to_string_lossy()
        .into_owned()
}

/// A zip archive indexed by normalized entry names.
///
/// Models exported on case-insensitive file systems often refer to their
/// textures with the wrong case, so a lookup without an exact match falls
/// back to an ASCII case-insensitive one.
pub struct ZipBundle<R> {
    archive: ZipArchive<R>,
    /// Stored name and lookup key of every file entry.
    names: Vec<(String, String)>,
}

impl<R: Read + Seek> ZipBundle<R> {
    fn find(&self, key: &str) -> Option<String> {
        self.names
            .iter()
            .find(|(_, entry)| entry == key)
            .or_else(|| {
                self.names
                    .iter()
                    .find(|(_, entry)| entry.eq_ignore_ascii_case(key))
            })
            .map(|(name, _)| name.clone())
    }
}

impl<R: Read + Seek> Archive<R> for ZipBundle<R> {
    type Error = ZipError;

    type Entry<'a> = ZipEntry
    where
        Self: 'a;

    fn new(stream: R) -> Result<Self, Self::Error> {
        let archive = ZipArchive::new(stream)?;
        let names = archive
            .file_names()
            .filter(|name| !name.ends_with('/'))
            .map(|name| (name.to_string(), entry_key(name)))
            .collect();
        Ok(Self { archive, names })
    }

    fn by_path<P: AsRef<Path>>(&mut self, path: P) -> Result<Option<Self::Entry<'_>>, Self::Error> {
        let path = path.as_ref();
        let key = path
            .to_str()
            .map(entry_key)
            .ok_or_else(|| ZipError::BadFileName(path.to_path_buf()))?;
        let Some(name) = self.find(&key) else {
            return Ok(None);
        };
        let mut file = self.archive.by_name(&name)?;
        let file_size = file.size();
        let file_size: usize = file_size
            .try_into()
            .map_err(|_| ZipError::FileTooLarge(file_size))?;
        let mut buffer = Vec::with_capacity(file_size);
        file.read_to_end(&mut buffer)?;
        Ok(Some(ZipEntry {
            name,
            data: Bytes::from(buffer),
        }))
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Write};

    use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

    use crate::archive::{Archive, Entry};

    use super::ZipBundle;

    fn bundle(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in files {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_lookup() {
        let data = bundle(&[
            ("model.gltf", &b"{}"[..]),
            ("Textures/Skin.PNG", &b"png"[..]),
            ("textures/skin.png", &b"lower"[..]),
        ]);
        let mut bundle = ZipBundle::new(Cursor::new(data)).unwrap();

        let mut entry = bundle.by_path("./model.gltf").unwrap().unwrap();
        assert_eq!(entry.name().unwrap(), "model.gltf");
        assert_eq!(entry.unpack().unwrap().as_ref(), b"{}");

        // An exact match wins over a case-insensitive one
        assert_eq!(
            bundle.read("textures/skin.png").unwrap().unwrap().as_ref(),
            b"lower"
        );
        assert_eq!(
            bundle.read("Textures/../Textures/Skin.PNG").unwrap().unwrap().as_ref(),
            b"png"
        );
        assert!(bundle.read("missing.bin").unwrap().is_none());
    }

    #[test]
    fn test_case_fallback() {
        let data = bundle(&[("Model.bin", &b"abcd"[..])]);
        let mut bundle = ZipBundle::new(Cursor::new(data)).unwrap();
        assert_eq!(bundle.read("model.BIN").unwrap().unwrap().as_ref(), b"abcd");
    }
}
