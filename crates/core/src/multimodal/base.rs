//! The per-modality codec capability.

use std::path::Path;

use base64::Engine;

use crate::error::{MediaError, Result};

/// A modality-specific decoder/encoder converting between URL-sourced bytes
/// and an in-memory value.
///
/// One implementation exists per modality (image, audio, video, image
/// embedding). The media connector is polymorphic over this trait and never
/// branches on modality identity except to pick which implementation,
/// options and fetch timeout to use.
pub trait MediaIO {
    /// The decoded in-memory representation.
    type Item;

    /// Decode raw bytes as fetched from a HTTP URL or read from a file.
    fn load_bytes(&self, data: &[u8]) -> Result<Self::Item>;

    /// Decode a base64 payload from a `data:` URL.
    ///
    /// `media_type` is the `data:` URL's media type (e.g. `image/png`); it
    /// may be empty when the payload carries no transport-scheme ambiguity.
    fn load_base64(&self, media_type: &str, payload: &str) -> Result<Self::Item> {
        let _ = media_type;
        let data = decode_base64(payload)?;
        self.load_bytes(&data)
    }

    /// Decode a local file. The path has already passed sandbox checks.
    fn load_file(&self, path: &Path) -> Result<Self::Item>;

    /// Encode a decoded value back into a base64 string suitable for
    /// embedding in a `data:` URL.
    fn encode_base64(&self, item: &Self::Item) -> Result<String>;
}

/// Decode a standard-alphabet base64 payload.
pub(crate) fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| MediaError::InvalidInput(format!("invalid base64 payload: {e}")))
}

/// Encode bytes with the standard base64 alphabet.
pub(crate) fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}
