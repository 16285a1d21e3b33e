//! Audio codec built on symphonia.
//!
//! Decodes WAV, FLAC, OGG and MP3 byte streams into interleaved f32 samples
//! with their native sample rate and channel count. Feature extraction
//! (resampling, mel spectrograms) happens downstream of this codec.

use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::base::MediaIO;
use crate::error::{MediaError, Result};

/// Decoded audio: interleaved samples plus the stream's native layout.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// Interleaved samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: usize,
}

impl AudioData {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: usize) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn num_frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Codec for audio byte streams.
#[derive(Debug, Clone, Default)]
pub struct AudioMediaIO {
    /// Peak-normalize samples to `[-1.0, 1.0]` after decoding.
    pub normalize: bool,
}

impl AudioMediaIO {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }

    fn finish(&self, audio: AudioData) -> AudioData {
        if self.normalize {
            peak_normalize(audio)
        } else {
            audio
        }
    }
}

impl MediaIO for AudioMediaIO {
    type Item = AudioData;

    fn load_bytes(&self, data: &[u8]) -> Result<AudioData> {
        let cursor = Cursor::new(data.to_vec());
        let audio = decode_stream(Box::new(cursor), Hint::new())?;
        Ok(self.finish(audio))
    }

    fn load_base64(&self, media_type: &str, payload: &str) -> Result<AudioData> {
        let data = super::base::decode_base64(payload)?;
        let cursor = Cursor::new(data);

        // "audio/wav" -> extension hint "wav"; speeds up format probing.
        let mut hint = Hint::new();
        if let Some(subtype) = media_type.split('/').nth(1) {
            hint.with_extension(subtype);
        }

        let audio = decode_stream(Box::new(cursor), hint)?;
        Ok(self.finish(audio))
    }

    fn load_file(&self, path: &Path) -> Result<AudioData> {
        let file = File::open(path).map_err(|e| MediaError::io(path, e))?;

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let audio = decode_stream(Box::new(file), hint)?;
        Ok(self.finish(audio))
    }

    /// Encode as a 16-bit PCM WAV file, base64-encoded.
    fn encode_base64(&self, item: &AudioData) -> Result<String> {
        let wav = encode_wav_pcm16(item)?;
        Ok(super::base::encode_base64(&wav))
    }
}

/// Scale samples so the peak absolute value is 1.0.
///
/// Silent or already-normalized audio is returned unchanged.
fn peak_normalize(audio: AudioData) -> AudioData {
    let peak = audio.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
    if peak == 0.0 || peak <= 1.0 {
        return audio;
    }

    let scale = 1.0 / peak;
    AudioData {
        samples: audio.samples.iter().map(|s| s * scale).collect(),
        ..audio
    }
}

/// Probe and decode a full audio stream with symphonia.
fn decode_stream(source: Box<dyn MediaSource>, hint: Hint) -> Result<AudioData> {
    let mss = MediaSourceStream::new(source, Default::default());

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| MediaError::InvalidInput(format!("audio probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| MediaError::InvalidInput("no audio track found".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| MediaError::InvalidInput("unknown audio sample rate".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| MediaError::InvalidInput("unknown audio channel count".to_string()))?;

    let decoder_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| MediaError::InvalidInput(format!("audio decoder creation failed: {e}")))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream.
            }
            Err(e) => {
                return Err(MediaError::InvalidInput(format!(
                    "audio packet read failed: {e}"
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Corrupt packets are skipped rather than failing the stream.
                tracing::warn!("audio decode error (skipping packet): {e}");
                continue;
            }
            Err(e) => {
                return Err(MediaError::InvalidInput(format!("audio decode failed: {e}")));
            }
        };

        let spec = *decoded.spec();
        let duration = decoded.capacity() as u64;

        let mut sample_buf = SampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(decoded);
        all_samples.extend_from_slice(sample_buf.samples());
    }

    if all_samples.is_empty() {
        return Err(MediaError::InvalidInput(
            "no audio samples decoded".to_string(),
        ));
    }

    Ok(AudioData::new(all_samples, sample_rate, channels))
}

/// Serialize audio as a 16-bit PCM RIFF/WAVE file.
fn encode_wav_pcm16(audio: &AudioData) -> Result<Vec<u8>> {
    if audio.channels == 0 || audio.channels > u16::MAX as usize {
        return Err(MediaError::InvalidInput(format!(
            "cannot encode audio with {} channels",
            audio.channels
        )));
    }

    let channels = audio.channels as u16;
    let bytes_per_sample = 2u16;
    let block_align = channels * bytes_per_sample;
    let byte_rate = audio.sample_rate * block_align as u32;
    let data_len = (audio.samples.len() * bytes_per_sample as usize) as u32;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&audio.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&(bytes_per_sample * 8).to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in &audio.samples {
        let clamped = sample.clamp(-1.0, 1.0);
        out.extend_from_slice(&((clamped * i16::MAX as f32) as i16).to_le_bytes());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multimodal::base::encode_base64 as b64;

    fn sine_audio(frames: usize, sample_rate: u32) -> AudioData {
        let samples: Vec<f32> = (0..frames)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        AudioData::new(samples, sample_rate, 1)
    }

    #[test]
    fn test_wav_decode() {
        let original = sine_audio(800, 16_000);
        let wav = encode_wav_pcm16(&original).unwrap();

        let io = AudioMediaIO::default();
        let decoded = io.load_bytes(&wav).unwrap();

        assert_eq!(decoded.sample_rate, 16_000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.num_frames(), 800);
        // 16-bit quantization error bound.
        for (a, b) in original.samples.iter().zip(&decoded.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_base64_decode_with_media_type_hint() {
        let wav = encode_wav_pcm16(&sine_audio(200, 8_000)).unwrap();
        let io = AudioMediaIO::default();
        let decoded = io.load_base64("audio/wav", &b64(&wav)).unwrap();
        assert_eq!(decoded.sample_rate, 8_000);
        assert_eq!(decoded.num_frames(), 200);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        let io = AudioMediaIO::default();
        let err = io.load_bytes(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }

    #[test]
    fn test_peak_normalize() {
        let audio = AudioData::new(vec![0.0, 2.0, -4.0], 16_000, 1);
        let normalized = peak_normalize(audio);
        assert_eq!(normalized.samples, vec![0.0, 0.5, -1.0]);

        let quiet = AudioData::new(vec![0.1, -0.2], 16_000, 1);
        assert_eq!(peak_normalize(quiet.clone()), quiet);
    }

    #[test]
    fn test_num_frames_stereo() {
        let audio = AudioData::new(vec![0.0; 10], 44_100, 2);
        assert_eq!(audio.num_frames(), 5);
    }
}
