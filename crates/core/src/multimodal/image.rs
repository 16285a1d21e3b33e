//! Image and image-embedding codecs.
//!
//! `ImageMediaIO` decodes raster formats (JPEG, PNG, GIF) via the `image`
//! crate and converts the result into a configured channel mode.
//! `ImageEmbeddingMediaIO` handles pre-computed embeddings shipped as
//! base64-encoded safetensors buffers; there is no URL transport ambiguity
//! for embeddings, so it only ever sees raw base64 payloads.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use image::{DynamicImage, ImageFormat};
use safetensors::tensor::{Dtype, TensorView};

use super::base::{encode_base64, MediaIO};
use crate::error::{MediaError, Result};

/// Channel layout an image is converted to after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageMode {
    /// 8-bit RGB (default, what vision encoders expect).
    #[default]
    Rgb,
    /// 8-bit RGBA.
    Rgba,
    /// 8-bit grayscale.
    Luma,
}

impl ImageMode {
    pub(crate) fn convert(self, img: DynamicImage) -> DynamicImage {
        match self {
            ImageMode::Rgb => DynamicImage::ImageRgb8(img.to_rgb8()),
            ImageMode::Rgba => DynamicImage::ImageRgba8(img.to_rgba8()),
            ImageMode::Luma => DynamicImage::ImageLuma8(img.to_luma8()),
        }
    }
}

/// Codec for raster images.
#[derive(Debug, Clone, Default)]
pub struct ImageMediaIO {
    /// Channel mode decoded images are converted into.
    pub image_mode: ImageMode,
    /// Format used when re-encoding for `encode_base64`.
    pub encode_format: ImageEncodeFormat,
}

/// Output format for [`ImageMediaIO::encode_base64`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncodeFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageMediaIO {
    pub fn new(image_mode: ImageMode) -> Self {
        Self {
            image_mode,
            encode_format: ImageEncodeFormat::default(),
        }
    }
}

impl MediaIO for ImageMediaIO {
    type Item = DynamicImage;

    fn load_bytes(&self, data: &[u8]) -> Result<DynamicImage> {
        let img = image::load_from_memory(data)
            .map_err(|e| MediaError::InvalidInput(format!("cannot identify image data: {e}")))?;
        Ok(self.image_mode.convert(img))
    }

    fn load_file(&self, path: &Path) -> Result<DynamicImage> {
        let data = std::fs::read(path).map_err(|e| MediaError::io(path, e))?;
        self.load_bytes(&data)
    }

    fn encode_base64(&self, item: &DynamicImage) -> Result<String> {
        let (format, image) = match self.encode_format {
            // JPEG has no alpha channel; force RGB before encoding.
            ImageEncodeFormat::Jpeg => (
                ImageFormat::Jpeg,
                DynamicImage::ImageRgb8(item.to_rgb8()),
            ),
            ImageEncodeFormat::Png => (ImageFormat::Png, item.clone()),
        };

        let mut buf = Cursor::new(Vec::new());
        image
            .write_to(&mut buf, format)
            .map_err(|e| MediaError::InvalidInput(format!("cannot encode image: {e}")))?;
        Ok(encode_base64(buf.get_ref()))
    }
}

/// Codec for pre-computed image embeddings.
///
/// The wire form is a safetensors buffer holding exactly one tensor; the
/// decoded form is a CPU [`Tensor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEmbeddingMediaIO;

/// Tensor name used when serializing an embedding to safetensors.
const EMBEDDING_TENSOR_NAME: &str = "embedding";

impl MediaIO for ImageEmbeddingMediaIO {
    type Item = Tensor;

    fn load_bytes(&self, data: &[u8]) -> Result<Tensor> {
        let tensors = candle_core::safetensors::load_buffer(data, &Device::Cpu)
            .map_err(|e| MediaError::InvalidInput(format!("invalid embedding buffer: {e}")))?;

        let mut tensors = tensors.into_iter();
        match (tensors.next(), tensors.next()) {
            (Some((_, tensor)), None) => Ok(tensor),
            (None, _) => Err(MediaError::InvalidInput(
                "embedding buffer contains no tensors".to_string(),
            )),
            _ => Err(MediaError::InvalidInput(
                "embedding buffer must contain exactly one tensor".to_string(),
            )),
        }
    }

    fn load_file(&self, path: &Path) -> Result<Tensor> {
        let data = std::fs::read(path).map_err(|e| MediaError::io(path, e))?;
        self.load_bytes(&data)
    }

    fn encode_base64(&self, item: &Tensor) -> Result<String> {
        let tensor = item
            .to_dtype(DType::F32)
            .and_then(|t| t.flatten_all()?.to_vec1::<f32>())
            .map_err(|e| MediaError::InvalidInput(format!("cannot read embedding tensor: {e}")))?;

        let raw: Vec<u8> = tensor.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = TensorView::new(Dtype::F32, item.dims().to_vec(), &raw)
            .map_err(|e| MediaError::InvalidInput(format!("cannot build tensor view: {e}")))?;

        let data: Option<HashMap<String, String>> = None;
        let buf = safetensors::serialize([(EMBEDDING_TENSOR_NAME, view)], &data)
            .map_err(|e| MediaError::InvalidInput(format!("cannot serialize embedding: {e}")))?;
        Ok(encode_base64(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([12, 34, 56]),
        ));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_load_bytes_converts_to_rgb() {
        let io = ImageMediaIO::default();
        let img = io.load_bytes(&png_bytes(4, 2)).unwrap();
        assert_eq!(img.width(), 4);
        assert_eq!(img.height(), 2);
        assert!(matches!(img, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_load_bytes_luma_mode() {
        let io = ImageMediaIO::new(ImageMode::Luma);
        let img = io.load_bytes(&png_bytes(2, 2)).unwrap();
        assert!(matches!(img, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_load_bytes_rejects_garbage() {
        let io = ImageMediaIO::default();
        let err = io.load_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_encode_base64_roundtrips_through_load() {
        let io = ImageMediaIO::default();
        let img = io.load_bytes(&png_bytes(3, 3)).unwrap();
        let encoded = io.encode_base64(&img).unwrap();
        let decoded = io.load_base64("image/jpeg", &encoded).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 3);
    }

    #[test]
    fn test_embedding_codec() {
        let io = ImageEmbeddingMediaIO;
        let tensor = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], (2, 2), &Device::Cpu).unwrap();

        let encoded = io.encode_base64(&tensor).unwrap();
        let decoded = io.load_base64("", &encoded).unwrap();

        assert_eq!(decoded.dims(), &[2, 2]);
        let values: Vec<f32> = decoded.flatten_all().unwrap().to_vec1().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_embedding_rejects_garbage() {
        let io = ImageEmbeddingMediaIO;
        let err = io.load_bytes(b"not a safetensors buffer").unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }
}
