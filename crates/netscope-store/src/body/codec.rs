//! Truncation and gzip encoding of bodies.

use super::types::CompressedBody;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::borrow::Cow;
use std::io::{Read, Write};
use tracing::{trace, warn};

/// Appended to bodies cut at the size limit
pub const TRUNCATION_MARKER: &str = "\n... [truncated by netscope]";

/// Cut `body` to at most `max_bytes` bytes of payload plus the truncation marker.
///
/// The cut falls on a character boundary, so the payload may be a few bytes
/// shorter than `max_bytes` for multi-byte text. Returns the body unchanged
/// when `max_bytes` is 0 or the body already fits.
pub fn truncate(body: &str, max_bytes: usize) -> (Cow<'_, str>, bool) {
    if max_bytes == 0 || body.len() <= max_bytes {
        return (Cow::Borrowed(body), false);
    }

    let mut end = max_bytes;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    let mut truncated = String::with_capacity(end + TRUNCATION_MARKER.len());
    truncated.push_str(&body[..end]);
    truncated.push_str(TRUNCATION_MARKER);
    (Cow::Owned(truncated), true)
}

/// Encode a body, keeping the gzip form only when it is strictly smaller.
pub fn encode(body: &str, compression_enabled: bool) -> CompressedBody {
    let raw = body.as_bytes();

    if compression_enabled {
        match gzip(raw) {
            Ok(compressed) if compressed.len() < raw.len() => {
                trace!(
                    "Compressed body {} -> {} bytes",
                    raw.len(),
                    compressed.len()
                );
                return CompressedBody {
                    data: compressed,
                    original_size: raw.len(),
                    is_compressed: true,
                };
            }
            Ok(_) => {}
            Err(e) => warn!("Body compression failed, storing raw: {}", e),
        }
    }

    CompressedBody {
        data: raw.to_vec(),
        original_size: raw.len(),
        is_compressed: false,
    }
}

/// Decode a stored body back to text. `None` if the stored bytes are corrupt.
pub fn decode(body: &CompressedBody) -> Option<String> {
    let bytes = if body.is_compressed {
        let mut decoder = GzDecoder::new(body.data.as_slice());
        let mut out = Vec::with_capacity(body.original_size);
        if let Err(e) = decoder.read_to_end(&mut out) {
            warn!("Failed to decompress body: {}", e);
            return None;
        }
        out
    } else {
        body.data.clone()
    };

    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Stored body is not valid UTF-8: {}", e);
            None
        }
    }
}

fn gzip(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}
