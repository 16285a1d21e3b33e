//! Video codec: animated byte streams decoded into sampled frames.
//!
//! Container decoding is intentionally thin: GIF is the only animated format
//! the `image` crate decodes natively, and each decoded frame is handed to
//! the wrapped [`ImageMediaIO`] mode conversion so video and image pipelines
//! agree on channel layout. Frame sampling is uniform over the stream.

use std::io::Cursor;
use std::path::Path;

use image::codecs::gif::{GifDecoder, GifEncoder};
use image::{AnimationDecoder, DynamicImage, Frame};

use super::base::MediaIO;
use super::image::ImageMediaIO;
use crate::error::{MediaError, Result};

/// Decoded video: sampled frames plus the pre-sampling frame count.
#[derive(Debug, Clone)]
pub struct VideoData {
    /// Sampled frames, in stream order, converted to the image codec's mode.
    pub frames: Vec<DynamicImage>,
    /// Total number of frames in the source stream before sampling.
    pub total_frames: usize,
}

impl VideoData {
    /// Frame dimensions `(width, height)`, taken from the first frame.
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width(), f.height()))
    }
}

/// Codec for video byte streams.
#[derive(Debug, Clone, Default)]
pub struct VideoMediaIO {
    /// Image codec applied to each decoded frame.
    pub image_io: ImageMediaIO,
    /// Uniformly sample down to this many frames. `None` keeps all frames.
    pub num_frames: Option<usize>,
}

impl VideoMediaIO {
    pub fn new(image_io: ImageMediaIO, num_frames: Option<usize>) -> Self {
        Self {
            image_io,
            num_frames,
        }
    }
}

impl MediaIO for VideoMediaIO {
    type Item = VideoData;

    fn load_bytes(&self, data: &[u8]) -> Result<VideoData> {
        let decoder = GifDecoder::new(Cursor::new(data))
            .map_err(|e| MediaError::InvalidInput(format!("cannot identify video data: {e}")))?;

        let frames = decoder
            .into_frames()
            .collect_frames()
            .map_err(|e| MediaError::InvalidInput(format!("cannot decode video frames: {e}")))?;

        if frames.is_empty() {
            return Err(MediaError::InvalidInput(
                "video stream contains no frames".to_string(),
            ));
        }

        let total_frames = frames.len();
        let sampled = sample_uniform(frames, self.num_frames);

        let frames = sampled
            .into_iter()
            .map(|frame| {
                let img = DynamicImage::ImageRgba8(frame.into_buffer());
                self.image_io.image_mode.convert(img)
            })
            .collect();

        Ok(VideoData {
            frames,
            total_frames,
        })
    }

    fn load_file(&self, path: &Path) -> Result<VideoData> {
        let data = std::fs::read(path).map_err(|e| MediaError::io(path, e))?;
        self.load_bytes(&data)
    }

    /// Re-encode sampled frames as an animated GIF, base64-encoded.
    fn encode_base64(&self, item: &VideoData) -> Result<String> {
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            let frames = item
                .frames
                .iter()
                .map(|img| Frame::new(img.to_rgba8()));
            encoder
                .encode_frames(frames)
                .map_err(|e| MediaError::InvalidInput(format!("cannot encode video: {e}")))?;
        }
        Ok(super::base::encode_base64(&buf))
    }
}

/// Keep `target` frames spread evenly over the stream.
///
/// `None` or a target covering the whole stream keeps every frame.
fn sample_uniform(frames: Vec<Frame>, target: Option<usize>) -> Vec<Frame> {
    let total = frames.len();
    let target = match target {
        Some(n) if n > 0 && n < total => n,
        _ => return frames,
    };

    let mut sampled = Vec::with_capacity(target);
    let mut frames: Vec<Option<Frame>> = frames.into_iter().map(Some).collect();
    for i in 0..target {
        let idx = i * total / target;
        if let Some(frame) = frames[idx].take() {
            sampled.push(frame);
        }
    }
    sampled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multimodal::base::decode_base64;

    fn gif_bytes(num_frames: usize) -> Vec<u8> {
        let frames = (0..num_frames).map(|i| {
            Frame::new(image::RgbaImage::from_pixel(
                4,
                4,
                image::Rgba([i as u8 * 10, 0, 0, 255]),
            ))
        });
        let mut buf = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut buf);
            encoder.encode_frames(frames).unwrap();
        }
        buf
    }

    #[test]
    fn test_load_all_frames() {
        let io = VideoMediaIO::default();
        let video = io.load_bytes(&gif_bytes(5)).unwrap();
        assert_eq!(video.frames.len(), 5);
        assert_eq!(video.total_frames, 5);
        assert_eq!(video.frame_size(), Some((4, 4)));
    }

    #[test]
    fn test_frame_sampling() {
        let io = VideoMediaIO::new(ImageMediaIO::default(), Some(3));
        let video = io.load_bytes(&gif_bytes(9)).unwrap();
        assert_eq!(video.frames.len(), 3);
        assert_eq!(video.total_frames, 9);
    }

    #[test]
    fn test_sampling_never_upsamples() {
        let io = VideoMediaIO::new(ImageMediaIO::default(), Some(10));
        let video = io.load_bytes(&gif_bytes(4)).unwrap();
        assert_eq!(video.frames.len(), 4);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let io = VideoMediaIO::default();
        let err = io.load_bytes(b"not a gif").unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_encode_base64_emits_gif() {
        let io = VideoMediaIO::default();
        let video = io.load_bytes(&gif_bytes(2)).unwrap();
        let encoded = io.encode_base64(&video).unwrap();
        let raw = decode_base64(&encoded).unwrap();
        assert_eq!(&raw[..3], b"GIF");
    }
}
