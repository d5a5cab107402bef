use std::{
    borrow::Cow,
    error::Error,
    fmt::{self, Display, Formatter},
    io::{self, Read, Seek, SeekFrom},
    path::Path,
};

use bytes::Bytes;
use tar::Archive as TarArchive;

use super::{normalize_path, Archive, Entry};

#[derive(Debug)]
pub enum TarError {
    Tar(io::Error),
    FileTooLarge(u64),
    BadFileName,
}

impl Display for TarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TarError::Tar(error) => Display::fmt(error, f),
            TarError::FileTooLarge(size) => write!(f, "File size {} is too large", size),
            TarError::BadFileName => write!(f, "Bad file name (not unicode)"),
        }
    }
}

impl Error for TarError {}

impl From<io::Error> for TarError {
    fn from(value: io::Error) -> Self {
        Self::Tar(value)
    }
}

/// An entry read out of a tar stream.
#[derive(Debug, Clone)]
pub struct TarFile {
    name: String,
    data: Bytes,
}

impl<'a> Entry<'a> for TarFile {
    type Error = TarError;

    fn name(&self) -> Result<Cow<'_, str>, Self::Error> {
        Ok(Cow::Borrowed(&self.name))
    }

    fn unpack(&mut self) -> Result<Bytes, Self::Error> {
        Ok(self.data.clone())
    }
}

/// A tar archive that can be searched any number of times.
///
/// `tar::Archive` only iterates its entries once, so every lookup rewinds
/// the stream and scans it again.
pub struct TarBundle<R> {
    reader: R,
}

impl<R: Read + Seek> Archive<R> for TarBundle<R> {
    type Error = TarError;

    type Entry<'a> = TarFile
    where
        Self: 'a;

    fn new(stream: R) -> Result<Self, Self::Error> {
        Ok(Self { reader: stream })
    }

    fn by_path<P: AsRef<Path>>(&mut self, name: P) -> Result<Option<Self::Entry<'_>>, Self::Error> {
        let name = normalize_path(name.as_ref());
        self.reader.seek(SeekFrom::Start(0))?;
        let mut archive = TarArchive::new(&mut self.reader);
        for entry in archive.entries()? {
            let mut entry = entry?;
            // Entries written as "./model.gltf" match "model.gltf".
            if normalize_path(&entry.path()?) != name {
                continue;
            }
            let file_size = entry.header().size()?;
            let file_size: usize = file_size
                .try_into()
                .map_err(|_| TarError::FileTooLarge(file_size))?;
            let mut buffer = Vec::with_capacity(file_size);
            entry.read_to_end(&mut buffer)?;
            let name = name.to_str().ok_or(TarError::BadFileName)?.to_string();
            return Ok(Some(TarFile {
                name,
                data: Bytes::from(buffer),
            }));
        }
        Ok(None)
    }
}
