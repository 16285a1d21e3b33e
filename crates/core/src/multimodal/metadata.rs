//! Merging per-modality placeholder metadata into one ordered sequence.

use super::inputs::{MultiModalHashDict, MultiModalPlaceholderDict, PlaceholderRange};
use crate::error::{MediaError, Result};

/// Merge all placeholder ranges from all modalities into a single list
/// sorted by offset ascending, together with the parallel modality-name
/// list and (when `mm_hashes` is given) the parallel hash list.
///
/// Used once per request after every modality has been decoded. For a
/// modality missing from a supplied hash dict, its hash slots are `None`;
/// when no hash dict is supplied at all, the third result is `None`
/// rather than an empty list.
///
/// Equal offsets are broken by modality name so the result never depends
/// on map iteration order. Overlapping ranges at the same offset within
/// one modality are a caller error and are not defended against.
pub fn merge_and_sort_multimodal_metadata(
    mm_positions: &MultiModalPlaceholderDict,
    mm_hashes: Option<&MultiModalHashDict>,
) -> Result<(Vec<String>, Vec<PlaceholderRange>, Option<Vec<Option<String>>>)> {
    if mm_positions.is_empty() {
        return Err(MediaError::InvalidInput(
            "no modalities found in mm_positions".to_string(),
        ));
    }

    // Single modality: ranges and hashes are already offset-ascending.
    if mm_positions.len() == 1 {
        let (modality, placeholders) = mm_positions
            .iter()
            .next()
            .map(|(m, p)| (m.clone(), p.clone()))
            .unwrap_or_default();

        let hashes = mm_hashes.map(|hashes| match hashes.get(&modality) {
            Some(list) => list.iter().cloned().map(Some).collect(),
            None => vec![None; placeholders.len()],
        });

        let modalities = vec![modality; placeholders.len()];
        return Ok((modalities, placeholders, hashes));
    }

    let mut all_items: Vec<(&str, PlaceholderRange, Option<&str>)> = Vec::new();
    for (modality, placeholders) in mm_positions {
        let hash_list = mm_hashes.and_then(|h| h.get(modality));
        for (i, placeholder) in placeholders.iter().enumerate() {
            let hash = hash_list.and_then(|l| l.get(i)).map(String::as_str);
            all_items.push((modality, *placeholder, hash));
        }
    }

    all_items.sort_by(|a, b| a.1.offset.cmp(&b.1.offset).then_with(|| a.0.cmp(b.0)));

    let sorted_modalities = all_items.iter().map(|(m, _, _)| m.to_string()).collect();
    let merged_placeholders = all_items.iter().map(|(_, p, _)| *p).collect();
    let merged_hashes = mm_hashes.map(|_| {
        all_items
            .iter()
            .map(|(_, _, h)| h.map(str::to_string))
            .collect()
    });

    Ok((sorted_modalities, merged_placeholders, merged_hashes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions(entries: &[(&str, &[(usize, usize)])]) -> MultiModalPlaceholderDict {
        entries
            .iter()
            .map(|(modality, ranges)| {
                (
                    modality.to_string(),
                    ranges
                        .iter()
                        .map(|&(o, l)| PlaceholderRange::new(o, l))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_positions_rejected() {
        let err =
            merge_and_sort_multimodal_metadata(&MultiModalPlaceholderDict::new(), None)
                .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_single_modality_fast_path() {
        let mm_positions = positions(&[("image", &[(0, 2), (5, 2)])]);
        let (modalities, placeholders, hashes) =
            merge_and_sort_multimodal_metadata(&mm_positions, None).unwrap();

        assert_eq!(modalities, vec!["image", "image"]);
        assert_eq!(
            placeholders,
            vec![PlaceholderRange::new(0, 2), PlaceholderRange::new(5, 2)]
        );
        assert!(hashes.is_none());
    }

    #[test]
    fn test_single_modality_with_hashes() {
        let mm_positions = positions(&[("audio", &[(3, 4)])]);
        let mut mm_hashes = MultiModalHashDict::new();
        mm_hashes.insert("audio".to_string(), vec!["h0".to_string()]);

        let (_, _, hashes) =
            merge_and_sort_multimodal_metadata(&mm_positions, Some(&mm_hashes)).unwrap();
        assert_eq!(hashes, Some(vec![Some("h0".to_string())]));
    }

    #[test]
    fn test_multi_modality_sorted_by_offset() {
        // image @ 5, audio @ 0: audio must come out first.
        let mm_positions = positions(&[("image", &[(5, 2)]), ("audio", &[(0, 3)])]);
        let (modalities, placeholders, hashes) =
            merge_and_sort_multimodal_metadata(&mm_positions, None).unwrap();

        assert_eq!(modalities, vec!["audio", "image"]);
        assert_eq!(
            placeholders,
            vec![PlaceholderRange::new(0, 3), PlaceholderRange::new(5, 2)]
        );
        assert!(hashes.is_none());
    }

    #[test]
    fn test_interleaved_modalities() {
        let mm_positions = positions(&[
            ("image", &[(0, 2), (8, 2)]),
            ("audio", &[(4, 3), (12, 3)]),
        ]);
        let (modalities, placeholders, _) =
            merge_and_sort_multimodal_metadata(&mm_positions, None).unwrap();

        assert_eq!(modalities, vec!["image", "audio", "image", "audio"]);
        let offsets: Vec<usize> = placeholders.iter().map(|p| p.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_hashes_permuted_with_placeholders() {
        let mm_positions = positions(&[("image", &[(5, 2)]), ("audio", &[(0, 3)])]);
        let mut mm_hashes = MultiModalHashDict::new();
        mm_hashes.insert("image".to_string(), vec!["img0".to_string()]);
        mm_hashes.insert("audio".to_string(), vec!["aud0".to_string()]);

        let (_, _, hashes) =
            merge_and_sort_multimodal_metadata(&mm_positions, Some(&mm_hashes)).unwrap();
        assert_eq!(
            hashes,
            Some(vec![Some("aud0".to_string()), Some("img0".to_string())])
        );
    }

    #[test]
    fn test_hash_dict_missing_modality_yields_none_slots() {
        let mm_positions = positions(&[("image", &[(5, 2)]), ("audio", &[(0, 3)])]);
        let mut mm_hashes = MultiModalHashDict::new();
        mm_hashes.insert("image".to_string(), vec!["img0".to_string()]);

        let (_, _, hashes) =
            merge_and_sort_multimodal_metadata(&mm_positions, Some(&mm_hashes)).unwrap();
        assert_eq!(hashes, Some(vec![None, Some("img0".to_string())]));
    }

    #[test]
    fn test_equal_offsets_break_ties_by_modality_name() {
        let mm_positions = positions(&[("video", &[(0, 1)]), ("audio", &[(0, 2)])]);
        let (modalities, _, _) =
            merge_and_sort_multimodal_metadata(&mm_positions, None).unwrap();
        assert_eq!(modalities, vec!["audio", "video"]);
    }
}
