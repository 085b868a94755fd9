//! # docstore-codec
//!
//! The Binary Document Codec (§4.A) and the Revision Engine (§4.B): a
//! deterministic TLV serialization of `Document` and the pure function that
//! derives the next revision marker from a previous one and a new body.

pub mod revision;
pub mod tlv;

pub use revision::next_revision;
pub use tlv::{decode, encode, encode_body, CodecError};
