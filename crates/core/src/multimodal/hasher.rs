//! Content hashing for multimodal payloads.
//!
//! Produces the SHA-256 hex digests carried by
//! [`MultiModalHashDict`](super::inputs::MultiModalHashDict). The modality
//! is mixed into the digest as a prefix so equal byte sequences of
//! different modalities never collide.

use sha2::{Digest, Sha256};

use super::inputs::MultiModalHashDict;

/// Hex SHA-256 of `modality || ":" || data`.
pub fn hash_media_bytes(modality: &str, data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(modality.as_bytes());
    hasher.update(b":");
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Build a hash dict from `(modality, payload)` pairs.
///
/// Pairs sharing a modality append in iteration order, matching the
/// positional alignment of the modality's placeholder ranges.
pub fn hash_media_items<'a, I>(items: I) -> MultiModalHashDict
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut hashes = MultiModalHashDict::new();
    for (modality, data) in items {
        hashes
            .entry(modality.to_string())
            .or_default()
            .push(hash_media_bytes(modality, data));
    }
    hashes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        let a = hash_media_bytes("image", b"payload");
        let b = hash_media_bytes("image", b"payload");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_modality_prefix_separates_digests() {
        let image = hash_media_bytes("image", b"payload");
        let audio = hash_media_bytes("audio", b"payload");
        assert_ne!(image, audio);
    }

    #[test]
    fn test_hash_media_items_preserves_order() {
        let items: Vec<(&str, &[u8])> =
            vec![("image", b"a"), ("audio", b"b"), ("image", b"c")];
        let hashes = hash_media_items(items);

        assert_eq!(hashes["image"].len(), 2);
        assert_eq!(hashes["audio"].len(), 1);
        assert_eq!(hashes["image"][0], hash_media_bytes("image", b"a"));
        assert_eq!(hashes["image"][1], hash_media_bytes("image", b"c"));
    }
}
