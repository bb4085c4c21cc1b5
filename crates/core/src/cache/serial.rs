//! Cache value encoding: JSON text, zlib compressed.

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use hornet_api::{HornetError, HornetResult};
use std::io::Write;

/// Encode a value for storage.
pub fn to_bytes<T: serde::Serialize + ?Sized>(
    value: &T,
) -> HornetResult<bytes::Bytes> {
    let json = serde_json::to_vec(value).map_err(|e| {
        HornetError::other_src("failed to serialize cache value", e)
    })?;
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&json)
        .and_then(|_| enc.finish())
        .map(bytes::Bytes::from)
        .map_err(|e| {
            HornetError::other_src("failed to compress cache value", e)
        })
}

/// Decode a value written by [to_bytes].
pub fn from_bytes<T: serde::de::DeserializeOwned>(
    bytes: &[u8],
) -> HornetResult<T> {
    serde_json::from_reader(ZlibDecoder::new(bytes)).map_err(|e| {
        HornetError::other_src("failed to decode cache value", e)
    })
}
