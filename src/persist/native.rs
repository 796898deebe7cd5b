//! Native `.jim` binary format.
//!
//! A 32-byte header followed by a postcard-encoded schema payload.
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       4     Magic ("JIMP")
//! 4       1     Version major
//! 5       1     Version minor
//! 6       1     Artifact kind
//! 7       1     Reserved
//! 8       4     Payload size (bytes)
//! 12      4     CRC32 checksum of payload
//! 16      4     Number of input columns
//! 20      4     Number of output groups (0 for feature schemas)
//! 24      8     Reserved
//! ```
//!
//! All integers are little-endian.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{ReadError, WriteError};

/// Magic bytes identifying a native artifact.
pub const MAGIC: &[u8; 4] = b"JIMP";

pub const CURRENT_VERSION_MAJOR: u8 = 1;
pub const CURRENT_VERSION_MINOR: u8 = 0;

pub const HEADER_SIZE: usize = 32;

/// What the payload holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ArtifactKind {
    FeatureColumns = 0,
    StageModel = 1,
}

impl ArtifactKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::FeatureColumns),
            1 => Some(Self::StageModel),
            _ => None,
        }
    }
}

/// Parsed artifact header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub kind: ArtifactKind,
    pub payload_size: u32,
    pub checksum: u32,
    pub num_features: u32,
    pub num_groups: u32,
}

impl FormatHeader {
    pub fn new(kind: ArtifactKind, num_features: u32, num_groups: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            kind,
            payload_size: 0,
            checksum: 0,
            num_features,
            num_groups,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6] = self.kind as u8;
        buf[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..20].copy_from_slice(&self.num_features.to_le_bytes());
        buf[20..24].copy_from_slice(&self.num_groups.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, ReadError> {
        if &buf[0..4] != MAGIC {
            return Err(ReadError::NotAnArtifact);
        }

        let version_major = buf[4];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(ReadError::UnsupportedVersion {
                found: version_major as u32,
                supported: CURRENT_VERSION_MAJOR as u32,
            });
        }

        let kind = ArtifactKind::from_u8(buf[6])
            .ok_or_else(|| ReadError::Corrupt(format!("unknown artifact kind {}", buf[6])))?;

        let word = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        Ok(Self {
            version_major,
            version_minor: buf[5],
            kind,
            payload_size: word(8),
            checksum: word(12),
            num_features: word(16),
            num_groups: word(20),
        })
    }
}

/// Whether `bytes` start with the native magic.
#[inline]
pub fn is_native(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

/// Encode `payload` with a header.
pub fn encode<T: Serialize>(
    kind: ArtifactKind,
    num_features: u32,
    num_groups: u32,
    payload: &T,
) -> Result<Vec<u8>, WriteError> {
    let payload = postcard::to_allocvec(payload)?;

    let mut header = FormatHeader::new(kind, num_features, num_groups);
    header.payload_size = payload.len() as u32;
    header.checksum = crc32fast::hash(&payload);

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode an artifact of the `expected` kind.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], expected: ArtifactKind) -> Result<(FormatHeader, T), ReadError> {
    let Some(header_bytes) = bytes.get(..HEADER_SIZE) else {
        if !bytes.is_empty() && !MAGIC.starts_with(&bytes[..bytes.len().min(MAGIC.len())]) {
            return Err(ReadError::NotAnArtifact);
        }
        return Err(ReadError::Truncated {
            expected: HEADER_SIZE,
            actual: bytes.len(),
        });
    };
    let mut buf = [0u8; HEADER_SIZE];
    buf.copy_from_slice(header_bytes);
    let header = FormatHeader::from_bytes(&buf)?;

    if header.kind != expected {
        return Err(ReadError::KindMismatch {
            expected,
            actual: header.kind,
        });
    }

    let body = &bytes[HEADER_SIZE..];
    let size = header.payload_size as usize;
    if body.len() < size {
        return Err(ReadError::Truncated {
            expected: HEADER_SIZE + size,
            actual: bytes.len(),
        });
    }
    let payload = &body[..size];

    let actual = crc32fast::hash(payload);
    if actual != header.checksum {
        return Err(ReadError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    Ok((header, postcard::from_bytes(payload)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::schema::FeatureColumnsSchema;

    fn columns() -> FeatureColumnsSchema {
        FeatureColumnsSchema {
            columns: vec!["posting_year".into(), "city".into()],
        }
    }

    #[test]
    fn header_layout() {
        let mut header = FormatHeader::new(ArtifactKind::StageModel, 10, 3);
        header.payload_size = 1234;
        header.checksum = 0xDEAD_BEEF;

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"JIMP");
        assert_eq!(bytes[6], 1);
        assert_eq!(FormatHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn newer_major_version_is_rejected() {
        let mut bytes = FormatHeader::new(ArtifactKind::FeatureColumns, 0, 0).to_bytes();
        bytes[4] = CURRENT_VERSION_MAJOR + 1;
        assert!(matches!(
            FormatHeader::from_bytes(&bytes),
            Err(ReadError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn encode_decode() {
        let bytes = encode(ArtifactKind::FeatureColumns, 2, 0, &columns()).unwrap();
        assert!(is_native(&bytes));

        let (header, decoded): (_, FeatureColumnsSchema) = decode(&bytes, ArtifactKind::FeatureColumns).unwrap();
        assert_eq!(header.num_features, 2);
        assert_eq!(decoded, columns());
    }

    #[test]
    fn detects_damage() {
        let bytes = encode(ArtifactKind::FeatureColumns, 2, 0, &columns()).unwrap();

        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0xFF;
        assert!(matches!(
            decode::<FeatureColumnsSchema>(&flipped, ArtifactKind::FeatureColumns),
            Err(ReadError::ChecksumMismatch { .. })
        ));

        assert!(matches!(
            decode::<FeatureColumnsSchema>(&bytes[..bytes.len() - 3], ArtifactKind::FeatureColumns),
            Err(ReadError::Truncated { .. })
        ));
        assert!(matches!(
            decode::<FeatureColumnsSchema>(&bytes[..10], ArtifactKind::FeatureColumns),
            Err(ReadError::Truncated { expected: HEADER_SIZE, actual: 10 })
        ));

        let mut wrong_magic = bytes.clone();
        wrong_magic[0] = b'X';
        assert!(matches!(
            decode::<FeatureColumnsSchema>(&wrong_magic, ArtifactKind::FeatureColumns),
            Err(ReadError::NotAnArtifact)
        ));

        assert!(matches!(
            decode::<FeatureColumnsSchema>(&bytes, ArtifactKind::StageModel),
            Err(ReadError::KindMismatch { .. })
        ));
    }
}
