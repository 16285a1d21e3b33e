//! Run-length grouping of batch items by modality.

use super::inputs::MultiModalKwargs;

/// Grouping key for one batch item.
///
/// Multi-modality items get a key unique to their input position so they
/// never merge with a neighbor; zero-modality items share a sentinel
/// distinct from any real modality name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GroupKey {
    Empty,
    Modality(String),
    Distinct(usize),
}

impl GroupKey {
    fn for_item(item: &MultiModalKwargs, index: usize) -> Self {
        let modalities = item.modalities();
        match modalities.len() {
            0 => GroupKey::Empty,
            1 => GroupKey::Modality(
                modalities
                    .iter()
                    .next()
                    .cloned()
                    .unwrap_or_default(),
            ),
            _ => GroupKey::Distinct(index),
        }
    }
}

/// Group consecutive items sharing one modality into the same list, for
/// batched downstream execution.
///
/// This is run-length grouping, not a partition by key: two same-modality
/// items separated by a different-modality item land in two separate
/// groups. Items declaring multiple modalities always form singleton
/// groups.
pub fn group_mm_inputs_by_modality(
    mm_inputs: Vec<MultiModalKwargs>,
) -> Vec<Vec<MultiModalKwargs>> {
    let mut groups: Vec<Vec<MultiModalKwargs>> = Vec::new();
    let mut current_key: Option<GroupKey> = None;

    for (index, item) in mm_inputs.into_iter().enumerate() {
        let key = GroupKey::for_item(&item, index);
        if current_key.as_ref() != Some(&key) {
            groups.push(Vec::new());
            current_key = Some(key);
        }
        if let Some(group) = groups.last_mut() {
            group.push(item);
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use super::*;

    fn item(modalities: &[&str]) -> MultiModalKwargs {
        MultiModalKwargs::new(
            modalities.iter().map(|m| m.to_string()).collect::<BTreeSet<_>>(),
            HashMap::new(),
        )
    }

    fn group_shape(groups: &[Vec<MultiModalKwargs>]) -> Vec<usize> {
        groups.iter().map(Vec::len).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(group_mm_inputs_by_modality(Vec::new()).is_empty());
    }

    #[test]
    fn test_consecutive_runs() {
        // [{a}, {a}, {b}, {a}] -> [a,a] [b] [a].
        let inputs = vec![item(&["a"]), item(&["a"]), item(&["b"]), item(&["a"])];
        let groups = group_mm_inputs_by_modality(inputs);
        assert_eq!(group_shape(&groups), vec![2, 1, 1]);
        assert!(groups[0].iter().all(|i| i.modalities().contains("a")));
        assert!(groups[1][0].modalities().contains("b"));
    }

    #[test]
    fn test_non_adjacent_items_never_merge() {
        let inputs = vec![item(&["image"]), item(&["audio"]), item(&["image"])];
        let groups = group_mm_inputs_by_modality(inputs);
        assert_eq!(group_shape(&groups), vec![1, 1, 1]);
    }

    #[test]
    fn test_multi_modality_items_are_singletons() {
        let inputs = vec![
            item(&["image", "audio"]),
            item(&["image", "audio"]),
            item(&["image"]),
        ];
        let groups = group_mm_inputs_by_modality(inputs);
        // Two identical multi-modality items still refuse to merge.
        assert_eq!(group_shape(&groups), vec![1, 1, 1]);
    }

    #[test]
    fn test_empty_modality_sentinel_groups_together() {
        let inputs = vec![item(&[]), item(&[]), item(&["image"]), item(&[])];
        let groups = group_mm_inputs_by_modality(inputs);
        assert_eq!(group_shape(&groups), vec![2, 1, 1]);
    }

    #[test]
    fn test_single_item() {
        let groups = group_mm_inputs_by_modality(vec![item(&["video"])]);
        assert_eq!(group_shape(&groups), vec![1]);
    }
}
