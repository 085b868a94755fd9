//! Revision Engine (§4.B): a pure function from the previous revision
//! marker and the new encoded body to the next revision marker. No I/O, no
//! state.

use sha1::{Digest, Sha1};

/// Produce the next revision marker `N-H` for a document whose previous
/// marker was `previous` (possibly empty, for a never-written id) and whose
/// new canonical body is `encoded_body` (see
/// [`docstore_codec::tlv::encode_body`](crate::tlv::encode_body)).
///
/// `N` increases by exactly 1 from the generation parsed out of `previous`;
/// an empty or malformed `previous` starts back at 1. `H` is the lowercase
/// hex SHA-1 of `encoded_body`.
pub fn next_revision(previous: &str, encoded_body: &[u8]) -> String {
    let n_new = parse_generation(previous).map(|n| n + 1).unwrap_or(1);
    let mut hasher = Sha1::new();
    hasher.update(encoded_body);
    let digest = hasher.finalize();
    let h_new = hex_encode(&digest);
    format!("{n_new}-{h_new}")
}

/// Parse the `N` portion of a revision marker `N-H`. Returns `None` for an
/// empty or malformed marker (no `-`, or a non-numeric / non-positive
/// prefix).
pub fn parse_generation(marker: &str) -> Option<u64> {
    if marker.is_empty() {
        return None;
    }
    let prefix = marker.split('-').next()?;
    let n: u64 = prefix.parse().ok()?;
    if n == 0 {
        None
    } else {
        Some(n)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
