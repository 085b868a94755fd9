//! Generic byte-compression wrapper (§6.3): a minimal RFC 1952 gzip
//! container around `flate2`'s raw DEFLATE stream. Transparent by
//! construction — `decompress(compress(x)) == x` for any byte string.
//!
//! `flate2`'s `DeflateEncoder`/`DeflateDecoder` produce/consume a raw
//! RFC 1951 stream with no header of their own, so the gzip header, CRC-32
//! trailer, and ISIZE trailer are assembled by hand here.

use flate2::write::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use std::io::Write;
use thiserror::Error;

const MAGIC: [u8; 2] = [0x1f, 0x8b];
const METHOD_DEFLATE: u8 = 0x08;
const HEADER_LEN: usize = 10;
const FOOTER_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum GzipError {
    #[error("input shorter than a gzip header + footer")]
    Truncated,

    #[error("bad gzip magic bytes")]
    BadMagic,

    #[error("unsupported compression method {0}, expected DEFLATE (8)")]
    UnsupportedMethod(u8),

    #[error("CRC-32 mismatch: body does not match the trailer")]
    CrcMismatch,

    #[error("ISIZE mismatch: decompressed length does not match the trailer")]
    SizeMismatch,

    #[error("DEFLATE stream error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wraps `data` in a gzip container: a 10-byte minimal header, the raw
/// DEFLATE stream, and an 8-byte CRC-32 + ISIZE trailer.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() / 2 + HEADER_LEN + FOOTER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(METHOD_DEFLATE);
    out.push(0x00); // FLG: no extra fields, name, comment, or header CRC
    out.extend_from_slice(&[0, 0, 0, 0]); // MTIME: unset
    out.push(0x00); // XFL
    out.push(0xff); // OS: unknown

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("writing to an in-memory buffer cannot fail");
    let deflated = encoder.finish().expect("writing to an in-memory buffer cannot fail");
    out.extend_from_slice(&deflated);

    out.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out
}

/// Unwraps a gzip container produced by [`compress`] (or any conformant
/// single-member, DEFLATE-method gzip stream), verifying the CRC-32 and
/// ISIZE trailer per RFC 1952.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, GzipError> {
    if bytes.len() < HEADER_LEN + FOOTER_LEN {
        return Err(GzipError::Truncated);
    }
    if bytes[0..2] != MAGIC {
        return Err(GzipError::BadMagic);
    }
    if bytes[2] != METHOD_DEFLATE {
        return Err(GzipError::UnsupportedMethod(bytes[2]));
    }

    let footer_start = bytes.len() - FOOTER_LEN;
    let body = &bytes[HEADER_LEN..footer_start];

    let mut decoder = DeflateDecoder::new(Vec::new());
    decoder.write_all(body)?;
    let out = decoder.finish()?;

    let expected_crc = u32::from_le_bytes(bytes[footer_start..footer_start + 4].try_into().unwrap());
    let expected_isize = u32::from_le_bytes(bytes[footer_start + 4..].try_into().unwrap());

    if crc32fast::hash(&out) != expected_crc {
        return Err(GzipError::CrcMismatch);
    }
    if out.len() as u32 != expected_isize {
        return Err(GzipError::SizeMismatch);
    }
    Ok(out)
}
