//! Positional and identity metadata for multimodal inputs.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// The token-index span one decoded media item occupies in a model's input
/// sequence.
///
/// Produced by the upstream tokenizer/processor; consumed read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderRange {
    /// Starting token index. Non-negative by construction.
    pub offset: usize,
    /// Number of tokens. Always positive in valid input.
    pub length: usize,
}

impl PlaceholderRange {
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// One past the last token index covered by this range.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Per-modality placeholder ranges, one entry per media item of that
/// modality, in processing order (assumed offset-ascending per modality).
///
/// A `BTreeMap` keeps cross-modality iteration order stable within a
/// process run.
pub type MultiModalPlaceholderDict = BTreeMap<String, Vec<PlaceholderRange>>;

/// Per-modality content-hash strings, positionally aligned 1:1 with the
/// same modality's placeholder ranges.
pub type MultiModalHashDict = BTreeMap<String, Vec<String>>;

/// An opaque per-request multimodal payload: the set of modalities it
/// carries plus modality-specific decoded tensors.
///
/// The batch grouper only ever inspects [`modalities`](Self::modalities);
/// the tensor payload is passed through untouched.
#[derive(Debug, Clone, Default)]
pub struct MultiModalKwargs {
    modalities: BTreeSet<String>,
    tensors: HashMap<String, Tensor>,
}

impl MultiModalKwargs {
    pub fn new(modalities: BTreeSet<String>, tensors: HashMap<String, Tensor>) -> Self {
        Self {
            modalities,
            tensors,
        }
    }

    /// Payload declaring a single modality.
    pub fn for_modality(modality: impl Into<String>) -> Self {
        Self {
            modalities: BTreeSet::from([modality.into()]),
            tensors: HashMap::new(),
        }
    }

    pub fn modalities(&self) -> &BTreeSet<String> {
        &self.modalities
    }

    pub fn tensor(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    pub fn insert_tensor(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.tensors.insert(name.into(), tensor);
    }
}
