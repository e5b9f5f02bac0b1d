use chrono::NaiveDateTime;
use flate2::read::ZlibDecoder;
use serde::de::DeserializeOwned;
use std::fmt;
use std::io::Read;

/// Leading bytes of a zlib stream at the default compression level
pub const ZLIB_MAGIC: [u8; 2] = [0x78, 0x9c];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Reasons an inbound message is dropped
#[derive(Debug)]
pub enum DecodeError {
    Decompress(std::io::Error),
    InvalidJson(serde_json::Error),
    InvalidTimestamp(String),
    MissingStoneAddress,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Decompress(e) => write!(f, "zlib decompression failed: {}", e),
            DecodeError::InvalidJson(e) => write!(f, "invalid payload: {}", e),
            DecodeError::InvalidTimestamp(s) => {
                write!(f, "invalid timestamp '{}': expected YYYY-MM-DDTHH:MM:SSZ", s)
            }
            DecodeError::MissingStoneAddress => write!(f, "topic carries no stone address"),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Decompress(e) => Some(e),
            DecodeError::InvalidJson(e) => Some(e),
            _ => None,
        }
    }
}

/// Inflate `payload` if it carries the zlib header, otherwise return it as-is
pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, DecodeError> {
    if !payload.starts_with(&ZLIB_MAGIC) {
        return Ok(payload.to_vec());
    }

    let mut decoder = ZlibDecoder::new(payload);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(DecodeError::Decompress)?;
    Ok(inflated)
}

/// Decompress if needed, then deserialize into `T`.
///
/// Missing required fields and type mismatches surface as
/// [`DecodeError::InvalidJson`]; serde_json also rejects invalid UTF-8.
pub fn decode_json<T: DeserializeOwned>(payload: &[u8]) -> Result<T, DecodeError> {
    let bytes = decompress(payload)?;
    serde_json::from_slice(&bytes).map_err(DecodeError::InvalidJson)
}

/// Parse a strict `YYYY-MM-DDTHH:MM:SSZ` UTC timestamp into epoch seconds
pub fn parse_timestamp(value: &str) -> Result<i64, DecodeError> {
    // chrono tolerates leading whitespace and signed years; the wire format does not
    if !has_timestamp_shape(value) {
        return Err(DecodeError::InvalidTimestamp(value.to_string()));
    }

    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| DecodeError::InvalidTimestamp(value.to_string()))
}

/// Exactly 20 ASCII bytes with digits and separators in fixed positions
fn has_timestamp_shape(value: &str) -> bool {
    const SHAPE: &[u8; 20] = b"dddd-dd-ddTdd:dd:ddZ";

    let bytes = value.as_bytes();
    bytes.len() == SHAPE.len()
        && bytes.iter().zip(SHAPE).all(|(&b, &expected)| match expected {
            b'd' => b.is_ascii_digit(),
            sep => b == sep,
        })
}
