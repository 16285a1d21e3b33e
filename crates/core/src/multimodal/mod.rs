//! Media reference resolution and multimodal metadata alignment.
//!
//! # Architecture
//!
//! Resolving one media reference follows these steps:
//! 1. Classify the URL by scheme (`http(s)`, `data`, `file`)
//! 2. Obtain raw bytes: network fetch, inline base64, or sandboxed file read
//! 3. Decode via the modality's [`MediaIO`] codec
//!
//! After every modality of a request has been decoded, the per-modality
//! placeholder metadata is merged into one offset-ordered sequence
//! ([`merge_and_sort_multimodal_metadata`]) and consecutive same-modality
//! batch items are grouped for batched downstream execution
//! ([`group_mm_inputs_by_modality`]).

pub mod audio;
mod base;
mod batching;
mod connector;
mod hasher;
pub mod image;
mod inputs;
mod metadata;
pub mod video;

pub use audio::{AudioData, AudioMediaIO};
pub use base::MediaIO;
pub use batching::group_mm_inputs_by_modality;
pub use connector::{
    encode_audio_base64, encode_image_base64, encode_video_base64, fetch_audio, fetch_image,
    fetch_video, ConnectorConfig, FetchTimeouts, MediaConnector, MediaIoConfig,
};
pub use hasher::{hash_media_bytes, hash_media_items};
pub use image::{ImageEmbeddingMediaIO, ImageEncodeFormat, ImageMediaIO, ImageMode};
pub use inputs::{
    MultiModalHashDict, MultiModalKwargs, MultiModalPlaceholderDict, PlaceholderRange,
};
pub use metadata::merge_and_sort_multimodal_metadata;
pub use video::{VideoData, VideoMediaIO};
