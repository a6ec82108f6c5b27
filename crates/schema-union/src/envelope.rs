use thiserror::Error;

use crate::resolver::TaggedMessage;
use crate::version::SchemaVersion;

/// Magic byte identifying a schema-union envelope.
pub const MAGIC_BYTE: u8 = 0x5E;

/// Size of the envelope header in bytes.
pub const ENVELOPE_HEADER_SIZE: usize = 5;

/// A byte payload tagged with the schema version it was written with.
///
/// Binary format (5 bytes overhead):
/// ```text
/// [MAGIC: 0x5E][VERSION: u32 big-endian][PAYLOAD: N bytes]
/// ```
///
/// The version is the union discriminant: readers dispatch on it, never on
/// anything inside the payload.
///
/// # Example
///
/// ```
/// use schema_union::{Envelope, SchemaVersion};
///
/// let v2 = SchemaVersion::new(2).unwrap();
/// let envelope = Envelope::new(v2, b"serialized variant".to_vec());
///
/// let bytes = envelope.to_bytes();
/// let decoded = Envelope::from_bytes(&bytes).unwrap();
///
/// assert_eq!(decoded.version, v2);
/// assert_eq!(decoded.payload, b"serialized variant");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Schema version of the payload.
    pub version: SchemaVersion,
    /// Serialized variant.
    pub payload: Vec<u8>,
}

/// Error parsing an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Data is too short to contain a header.
    #[error("data too short for envelope header")]
    TooShort,
    /// Missing or incorrect magic byte.
    #[error("invalid magic byte: 0x{0:02X}, expected 0x5E")]
    InvalidMagic(u8),
    /// The header carries version 0.
    #[error("envelope carries version 0")]
    ZeroVersion,
}

impl Envelope {
    /// Create a new envelope.
    pub fn new(version: SchemaVersion, payload: Vec<u8>) -> Self {
        Self { version, payload }
    }

    /// Serialize the envelope to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENVELOPE_HEADER_SIZE + self.payload.len());
        bytes.push(MAGIC_BYTE);
        bytes.extend_from_slice(&self.version.get().to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse an envelope from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, EnvelopeError> {
        let version = Self::peek_version(data)?;
        Ok(Self {
            version,
            payload: data[ENVELOPE_HEADER_SIZE..].to_vec(),
        })
    }

    /// Read the version without copying the payload.
    pub fn peek_version(data: &[u8]) -> Result<SchemaVersion, EnvelopeError> {
        let header = data
            .get(..ENVELOPE_HEADER_SIZE)
            .ok_or(EnvelopeError::TooShort)?;
        if header[0] != MAGIC_BYTE {
            return Err(EnvelopeError::InvalidMagic(header[0]));
        }
        let raw = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        SchemaVersion::new(raw).ok_or(EnvelopeError::ZeroVersion)
    }

    /// Check if bytes look like an envelope (start with the magic byte).
    pub fn is_tagged(data: &[u8]) -> bool {
        data.first() == Some(&MAGIC_BYTE)
    }
}

impl From<Envelope> for TaggedMessage<Vec<u8>> {
    fn from(envelope: Envelope) -> Self {
        TaggedMessage::new(envelope.version, envelope.payload)
    }
}

impl From<TaggedMessage<Vec<u8>>> for Envelope {
    fn from(message: TaggedMessage<Vec<u8>>) -> Self {
        Envelope::new(message.version, message.payload)
    }
}
