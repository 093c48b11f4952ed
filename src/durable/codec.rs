//! Optional gzip compression for durable slots.
//!
//! Compression is a build-time capability (the `compression` feature). Reads
//! always try to decompress first and fall back to the raw bytes, so slots
//! written with and without compression can be mixed.

use std::borrow::Cow;
use std::io;

/// Whether this build can compress slots.
pub const fn compression_available() -> bool {
    cfg!(feature = "compression")
}

/// Gzip `data`.
#[cfg(feature = "compression")]
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    use std::io::Write;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(not(feature = "compression"))]
pub fn compress(_data: &[u8]) -> io::Result<Vec<u8>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "compression support not compiled in",
    ))
}

/// Gunzip `data`, or `None` if it is not a gzip stream.
#[cfg(feature = "compression")]
pub fn decompress(data: &[u8]) -> Option<Vec<u8>> {
    use std::io::Read;

    use flate2::read::GzDecoder;

    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

#[cfg(not(feature = "compression"))]
pub fn decompress(_data: &[u8]) -> Option<Vec<u8>> {
    None
}

/// Whether `raw` starts with the gzip magic bytes.
pub fn is_gzip(raw: &[u8]) -> bool {
    raw.starts_with(&[0x1f, 0x8b])
}

/// A gzip slot this build cannot inflate. Another build sharing the storage
/// may still read it.
pub fn needs_compression(raw: &[u8]) -> bool {
    !compression_available() && is_gzip(raw)
}

/// Bytes of a stored slot as the serialized record.
pub fn decode_payload(raw: &[u8]) -> Cow<'_, [u8]> {
    match decompress(raw) {
        Some(inflated) => Cow::Owned(inflated),
        None => Cow::Borrowed(raw),
    }
}
