//! Record encoding for stored objects.
//!
//! Stores never interpret the bytes they persist. Anything that goes into a
//! store implements `Record`, which turns it into bytes and back again.

/// An object that can be encoded to and decoded from bytes.
pub trait Record: Sized {
    /// Encode this object into a byte buffer.
    fn encode(&self) -> Vec<u8>;

    /// Decode an object from bytes.
    ///
    /// Returns an error on unknown or corrupt input. Implementations must
    /// never substitute a default value for undecodable bytes.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError>;
}

/// Errors that can occur when decoding a record.
#[derive(Debug)]
pub enum DecodeError {
    /// Protobuf decoding failed.
    Protobuf(prost::DecodeError),
    /// Bytes were not valid UTF-8.
    Utf8(std::string::FromUtf8Error),
    /// Bytes decoded but described an invalid value.
    Invalid(String),
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protobuf(e) => write!(f, "protobuf decode error: {e}"),
            Self::Utf8(e) => write!(f, "invalid UTF-8: {e}"),
            Self::Invalid(msg) => write!(f, "invalid record: {msg}"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protobuf(e) => Some(e),
            Self::Utf8(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<prost::DecodeError> for DecodeError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Protobuf(e)
    }
}

impl From<std::string::FromUtf8Error> for DecodeError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::Utf8(e)
    }
}

impl Record for String {
    fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::from_utf8(bytes.to_vec())?)
    }
}
