//! GLB binary container: a 12-byte header followed by length-prefixed
//! chunks. Only the first JSON chunk and the first BIN chunk are kept.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io::Cursor,
};

use binrw::BinRead;
use bytes::Bytes;
use log::debug;

pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const CHUNK_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_BIN: u32 = 0x004E_4942;

const HEADER_LENGTH: usize = 12;
const CHUNK_HEADER_LENGTH: usize = 8;

#[derive(Debug, Clone, BinRead)]
#[br(little, magic = 0x4654_6C67u32)]
struct GlbHeader {
    version: u32,
    length: u32,
}

#[derive(Debug, Clone, BinRead)]
#[br(little)]
struct ChunkHeader {
    length: u32,
    chunk_type: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    BadMagic,
    UnsupportedVersion(u32),
    MissingJsonChunk,
    Truncated { offset: usize, needed: usize },
    Read(String),
}

impl Display for ContainerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::BadMagic => write!(f, "Bad magic"),
            ContainerError::UnsupportedVersion(version) => {
                write!(f, "Unsupported container version {}", version)
            }
            ContainerError::MissingJsonChunk => write!(f, "No JSON chunk"),
            ContainerError::Truncated { offset, needed } => write!(
                f,
                "Chunk at offset {} needs {} bytes past the end of the container",
                offset, needed
            ),
            ContainerError::Read(error) => write!(f, "Bad container header: {}", error),
        }
    }
}

impl Error for ContainerError {}

impl From<binrw::Error> for ContainerError {
    fn from(value: binrw::Error) -> Self {
        match value {
            binrw::Error::BadMagic { .. } => ContainerError::BadMagic,
            other => ContainerError::Read(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryContainer {
    pub version: u32,
    pub json: Bytes,
    pub bin: Option<Bytes>,
}

impl BinaryContainer {
    /// Whether the data starts with the container magic.
    pub fn is_binary(data: &[u8]) -> bool {
        data.len() >= 4 && u32::from_le_bytes([data[0], data[1], data[2], data[3]]) == GLB_MAGIC
    }

    /// Splits a container into its chunks. The returned chunks share the
    /// input's storage.
    pub fn parse(data: Bytes) -> Result<Self, ContainerError> {
        let mut cursor = Cursor::new(data.as_ref());
        let header = GlbHeader::read_le(&mut cursor)?;
        if header.version < 2 {
            return Err(ContainerError::UnsupportedVersion(header.version));
        }
        let end = (header.length as usize).min(data.len());

        let mut json = None;
        let mut bin = None;
        let mut offset = HEADER_LENGTH;
        while offset + CHUNK_HEADER_LENGTH <= end {
            cursor.set_position(offset as u64);
            let chunk = ChunkHeader::read_le(&mut cursor)?;
            let start = offset + CHUNK_HEADER_LENGTH;
            let stop = start + chunk.length as usize;
            if stop > end {
                return Err(ContainerError::Truncated {
                    offset,
                    needed: stop - end,
                });
            }
            match chunk.chunk_type {
                CHUNK_JSON if json.is_none() => json = Some(data.slice(start..stop)),
                CHUNK_BIN if bin.is_none() => bin = Some(data.slice(start..stop)),
                other => debug!("Skipping chunk {:#010x} at offset {}", other, offset),
            }
            offset = stop;
        }

        Ok(Self {
            version: header.version,
            json: json.ok_or(ContainerError::MissingJsonChunk)?,
            bin,
        })
    }
}

/// Packs a document and an optional binary chunk into a container.
pub fn write_container(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    fn padded(data: &[u8], pad: u8) -> Vec<u8> {
        let mut data = data.to_vec();
        while data.len() % 4 != 0 {
            data.push(pad);
        }
        data
    }

    let mut chunks = vec![(CHUNK_JSON, padded(json, b' '))];
    if let Some(bin) = bin {
        chunks.push((CHUNK_BIN, padded(bin, 0)));
    }
    let length = HEADER_LENGTH
        + chunks
            .iter()
            .map(|(_, data)| CHUNK_HEADER_LENGTH + data.len())
            .sum::<usize>();

    let mut result = Vec::with_capacity(length);
    result.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    result.extend_from_slice(&2u32.to_le_bytes());
    result.extend_from_slice(&(length as u32).to_le_bytes());
    for (chunk_type, data) in chunks {
        result.extend_from_slice(&(data.len() as u32).to_le_bytes());
        result.extend_from_slice(&chunk_type.to_le_bytes());
        result.extend_from_slice(&data);
    }
    result
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;

    fn chunk(chunk_type: u32, data: &[u8]) -> Vec<u8> {
        let mut result = Vec::new();
        result.extend_from_slice(&(data.len() as u32).to_le_bytes());
        result.extend_from_slice(&chunk_type.to_le_bytes());
        result.extend_from_slice(data);
        result
    }

    fn container(version: u32, chunks: &[Vec<u8>]) -> Bytes {
        let body: Vec<u8> = chunks.concat();
        let mut result = Vec::new();
        result.extend_from_slice(b"glTF");
        result.extend_from_slice(&version.to_le_bytes());
        result.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
        result.extend_from_slice(&body);
        Bytes::from(result)
    }

    #[test]
    fn test_split_chunks() {
        let data = container(
            2,
            &[
                chunk(CHUNK_JSON, b"{}  "),
                chunk(0x1234_5678, b"skip"),
                chunk(CHUNK_BIN, &[1, 2, 3, 4]),
            ],
        );
        assert!(BinaryContainer::is_binary(&data));
        let container = BinaryContainer::parse(data).unwrap();
        assert_eq!(container.version, 2);
        assert_eq!(container.json.as_ref(), b"{}  ");
        assert_eq!(container.bin.unwrap().as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_malformed() {
        let mut bad_magic = container(2, &[chunk(CHUNK_JSON, b"{}  ")]).to_vec();
        bad_magic[0] = b'x';
        assert!(!BinaryContainer::is_binary(&bad_magic));
        assert_eq!(
            BinaryContainer::parse(Bytes::from(bad_magic)).unwrap_err(),
            ContainerError::BadMagic
        );

        assert_eq!(
            BinaryContainer::parse(container(1, &[chunk(CHUNK_JSON, b"{}  ")])).unwrap_err(),
            ContainerError::UnsupportedVersion(1)
        );
        assert_eq!(
            BinaryContainer::parse(container(2, &[chunk(CHUNK_BIN, &[0; 4])])).unwrap_err(),
            ContainerError::MissingJsonChunk
        );
    }

    #[test]
    fn test_write_container() {
        let data = write_container(b"{\"a\":1}", Some(&[9, 9]));
        assert_eq!(data.len() % 4, 0);
        let container = BinaryContainer::parse(Bytes::from(data)).unwrap();
        assert_eq!(container.json.as_ref(), b"{\"a\":1} ");
        assert_eq!(container.bin.unwrap().as_ref(), &[9, 9, 0, 0]);
    }
}
