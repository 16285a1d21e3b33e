//! Media reference resolution: URL string -> decoded media value.
//!
//! A [`MediaConnector`] classifies a URL by scheme, obtains the raw bytes
//! (network fetch, inline base64, or sandboxed local file) and hands them
//! to the modality's codec. The scheme decision lives in one pure step,
//! [`FetchPlan`]; the blocking and suspending drivers differ only in how
//! they perform the network byte fetch.
//!
//! A connector is safe for concurrent use by multiple callers: its
//! configuration is immutable after construction and it holds no other
//! state. Parallel decoding of many references is the caller's job (fan
//! out `load_from_url` calls, then merge metadata).

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use candle_core::Tensor;
use image::DynamicImage;
use tracing::debug;
use url::Url;

use super::audio::{AudioData, AudioMediaIO};
use super::base::MediaIO;
use super::image::{ImageEmbeddingMediaIO, ImageMediaIO, ImageMode};
use super::video::{VideoData, VideoMediaIO};
use crate::connections::{HttpConnection, ReqwestConnection};
use crate::error::{MediaError, Result};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Per-modality codec options forwarded by the connector.
#[derive(Debug, Clone, Default)]
pub struct MediaIoConfig {
    /// Channel mode for decoded images (and video frames).
    pub image_mode: ImageMode,
    /// Peak-normalize decoded audio.
    pub audio_normalize: bool,
    /// Uniformly sample videos down to this many frames.
    pub video_num_frames: Option<usize>,
}

/// Fixed per-modality network fetch timeouts.
#[derive(Debug, Clone, Copy)]
pub struct FetchTimeouts {
    pub audio: Duration,
    pub image: Duration,
    pub video: Duration,
}

impl Default for FetchTimeouts {
    fn default() -> Self {
        Self {
            audio: Duration::from_secs(10),
            image: Duration::from_secs(5),
            video: Duration::from_secs(30),
        }
    }
}

impl FetchTimeouts {
    /// Defaults, overridable via `MMLINK_{AUDIO,IMAGE,VIDEO}_FETCH_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut timeouts = Self::default();
        if let Some(secs) = env_secs("MMLINK_AUDIO_FETCH_TIMEOUT_SECS") {
            timeouts.audio = secs;
        }
        if let Some(secs) = env_secs("MMLINK_IMAGE_FETCH_TIMEOUT_SECS") {
            timeouts.image = secs;
        }
        if let Some(secs) = env_secs("MMLINK_VIDEO_FETCH_TIMEOUT_SECS") {
            timeouts.video = secs;
        }
        timeouts
    }
}

fn env_secs(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Connector configuration, immutable after construction.
#[derive(Debug, Clone, Default)]
pub struct ConnectorConfig {
    /// Options forwarded to the per-modality codecs.
    pub media_io: MediaIoConfig,
    /// Sole directory under which `file://` URLs may resolve. `None`
    /// disables local file loading entirely.
    pub allowed_local_media_path: Option<PathBuf>,
    /// Per-modality network fetch timeouts.
    pub timeouts: FetchTimeouts,
}

// ─── Fetch plan ──────────────────────────────────────────────────────────────

/// The pure scheme decision: what a URL requires before any I/O happens.
///
/// Both drivers branch on this; only [`FetchPlan::Http`] involves the
/// transport client (and, in the async driver, a suspension point).
#[derive(Debug, Clone, PartialEq, Eq)]
enum FetchPlan {
    /// Fetch bytes over the network, then `load_bytes`.
    Http(Url),
    /// Inline base64 payload, `load_base64` directly.
    Data { media_type: String, payload: String },
    /// Sandbox-approved local file, `load_file` directly.
    File(PathBuf),
}

/// Split a `data:` URL path (`<media-type>;<encoding>,<payload>`).
fn plan_data_url(path: &str) -> Result<FetchPlan> {
    let (data_spec, payload) = path.split_once(',').ok_or_else(|| {
        MediaError::InvalidInput("data URL is missing a payload separator".to_string())
    })?;
    let (media_type, encoding) = data_spec.split_once(';').ok_or_else(|| {
        MediaError::InvalidInput("data URL is missing an encoding spec".to_string())
    })?;

    if encoding != "base64" {
        return Err(MediaError::UnsupportedEncoding {
            encoding: encoding.to_string(),
        });
    }

    Ok(FetchPlan::Data {
        media_type: media_type.to_string(),
        payload: payload.to_string(),
    })
}

/// Resolve `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ─── Connector ───────────────────────────────────────────────────────────────

/// Resolves media references across HTTP, `data:` and sandboxed `file://`
/// schemes, with matching blocking and suspending code paths.
pub struct MediaConnector {
    config: ConnectorConfig,
    connection: Arc<dyn HttpConnection>,
}

impl std::fmt::Debug for MediaConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MediaConnector {
    /// Create a connector, validating the sandbox directory.
    ///
    /// Fails if `allowed_local_media_path` is set but does not exist or is
    /// not a directory. The stored sandbox root is symlink-resolved so the
    /// per-fetch ancestor check compares canonical paths.
    pub fn new(config: ConnectorConfig, connection: Arc<dyn HttpConnection>) -> Result<Self> {
        let allowed = match &config.allowed_local_media_path {
            Some(path) => {
                if !path.exists() {
                    return Err(MediaError::Config(format!(
                        "allowed_local_media_path {} does not exist",
                        path.display()
                    )));
                }
                if !path.is_dir() {
                    return Err(MediaError::Config(format!(
                        "allowed_local_media_path {} must be a directory",
                        path.display()
                    )));
                }
                Some(path.canonicalize().map_err(|e| MediaError::io(path, e))?)
            }
            None => None,
        };

        Ok(Self {
            config: ConnectorConfig {
                allowed_local_media_path: allowed,
                ..config
            },
            connection,
        })
    }

    /// Connector with default configuration, environment-derived fetch
    /// timeouts and a fresh HTTP client.
    pub fn with_defaults() -> Result<Self> {
        let config = ConnectorConfig {
            timeouts: FetchTimeouts::from_env(),
            ..Default::default()
        };
        Self::new(config, Arc::new(ReqwestConnection::new()))
    }

    /// Classify `url` into a [`FetchPlan`]. Pure except for the symlink
    /// resolution needed by the `file://` sandbox check.
    fn plan(&self, url: &str) -> Result<FetchPlan> {
        let parsed = Url::parse(url)
            .map_err(|e| MediaError::InvalidInput(format!("invalid media URL: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => Ok(FetchPlan::Http(parsed)),
            "data" => plan_data_url(parsed.path()),
            "file" => self.plan_file_url(&parsed),
            scheme => Err(MediaError::UnsupportedScheme {
                scheme: scheme.to_string(),
            }),
        }
    }

    fn plan_file_url(&self, url: &Url) -> Result<FetchPlan> {
        let allowed = self.config.allowed_local_media_path.as_deref().ok_or_else(|| {
            MediaError::SandboxViolation(
                "local files are disabled; no allowed_local_media_path configured".to_string(),
            )
        })?;

        let path = url.to_file_path().map_err(|_| {
            MediaError::InvalidInput(format!("file URL {url} has no usable path"))
        })?;

        // Symlink-resolve before the ancestor check so links inside the
        // sandbox cannot point outside it. A nonexistent path outside the
        // sandbox must still report a violation, not an I/O error: the
        // error kind must not reveal whether anything exists out there.
        let resolved = match path.canonicalize() {
            Ok(resolved) => resolved,
            Err(e)
                if e.kind() == std::io::ErrorKind::NotFound
                    && !lexical_normalize(&path).starts_with(allowed) =>
            {
                return Err(MediaError::SandboxViolation(format!(
                    "file path {} is not under the allowed media directory {}",
                    path.display(),
                    allowed.display()
                )));
            }
            Err(e) => return Err(MediaError::io(&path, e)),
        };

        if resolved.as_path() == allowed || !resolved.starts_with(allowed) {
            return Err(MediaError::SandboxViolation(format!(
                "file path {} is not under the allowed media directory {}",
                path.display(),
                allowed.display()
            )));
        }

        Ok(FetchPlan::File(resolved))
    }

    /// Resolve `url` and decode it with `media_io`, blocking on network I/O.
    pub fn load_from_url<M: MediaIO>(
        &self,
        url: &str,
        media_io: &M,
        fetch_timeout: Option<Duration>,
    ) -> Result<M::Item> {
        match self.plan(url)? {
            FetchPlan::Http(parsed) => {
                debug!(url = %parsed, "fetching media over HTTP");
                let data = self.connection.get_bytes(parsed.as_str(), fetch_timeout)?;
                media_io.load_bytes(&data)
            }
            FetchPlan::Data {
                media_type,
                payload,
            } => media_io.load_base64(&media_type, &payload),
            FetchPlan::File(path) => media_io.load_file(&path),
        }
    }

    /// Suspending twin of [`load_from_url`](Self::load_from_url); the
    /// network fetch is the only suspension point.
    pub async fn load_from_url_async<M: MediaIO>(
        &self,
        url: &str,
        media_io: &M,
        fetch_timeout: Option<Duration>,
    ) -> Result<M::Item> {
        match self.plan(url)? {
            FetchPlan::Http(parsed) => {
                debug!(url = %parsed, "fetching media over HTTP");
                let data = self
                    .connection
                    .async_get_bytes(parsed.as_str(), fetch_timeout)
                    .await?;
                media_io.load_bytes(&data)
            }
            FetchPlan::Data {
                media_type,
                payload,
            } => media_io.load_base64(&media_type, &payload),
            FetchPlan::File(path) => media_io.load_file(&path),
        }
    }

    // ─── Per-modality fetch operations ───────────────────────────────────

    fn audio_io(&self) -> AudioMediaIO {
        AudioMediaIO::new(self.config.media_io.audio_normalize)
    }

    fn image_io(&self) -> ImageMediaIO {
        ImageMediaIO::new(self.config.media_io.image_mode)
    }

    fn video_io(&self) -> VideoMediaIO {
        VideoMediaIO::new(self.image_io(), self.config.media_io.video_num_frames)
    }

    /// Load audio from a HTTP, data or file URL.
    pub fn fetch_audio(&self, audio_url: &str) -> Result<AudioData> {
        self.load_from_url(audio_url, &self.audio_io(), Some(self.config.timeouts.audio))
    }

    /// Asynchronously load audio from a HTTP, data or file URL.
    pub async fn fetch_audio_async(&self, audio_url: &str) -> Result<AudioData> {
        self.load_from_url_async(audio_url, &self.audio_io(), Some(self.config.timeouts.audio))
            .await
    }

    /// Load an image from a HTTP, data or file URL, converted to the
    /// configured channel mode.
    pub fn fetch_image(&self, image_url: &str) -> Result<DynamicImage> {
        self.load_from_url(image_url, &self.image_io(), Some(self.config.timeouts.image))
    }

    /// Asynchronously load an image from a HTTP, data or file URL.
    pub async fn fetch_image_async(&self, image_url: &str) -> Result<DynamicImage> {
        self.load_from_url_async(image_url, &self.image_io(), Some(self.config.timeouts.image))
            .await
    }

    /// Load video frames from a HTTP, data or file URL.
    pub fn fetch_video(&self, video_url: &str) -> Result<VideoData> {
        self.load_from_url(video_url, &self.video_io(), Some(self.config.timeouts.video))
    }

    /// Asynchronously load video frames from a HTTP, data or file URL.
    pub async fn fetch_video_async(&self, video_url: &str) -> Result<VideoData> {
        self.load_from_url_async(video_url, &self.video_io(), Some(self.config.timeouts.video))
            .await
    }

    /// Load an image with a per-call channel mode overriding the
    /// configured one.
    pub fn fetch_image_with_mode(
        &self,
        image_url: &str,
        image_mode: ImageMode,
    ) -> Result<DynamicImage> {
        self.load_from_url(
            image_url,
            &ImageMediaIO::new(image_mode),
            Some(self.config.timeouts.image),
        )
    }

    /// Asynchronously load an image with a per-call channel mode.
    pub async fn fetch_image_with_mode_async(
        &self,
        image_url: &str,
        image_mode: ImageMode,
    ) -> Result<DynamicImage> {
        self.load_from_url_async(
            image_url,
            &ImageMediaIO::new(image_mode),
            Some(self.config.timeouts.image),
        )
        .await
    }

    /// Load video frames with a per-call channel mode overriding the
    /// configured one.
    pub fn fetch_video_with_mode(
        &self,
        video_url: &str,
        image_mode: ImageMode,
    ) -> Result<VideoData> {
        let video_io = VideoMediaIO::new(
            ImageMediaIO::new(image_mode),
            self.config.media_io.video_num_frames,
        );
        self.load_from_url(video_url, &video_io, Some(self.config.timeouts.video))
    }

    /// Asynchronously load video frames with a per-call channel mode.
    pub async fn fetch_video_with_mode_async(
        &self,
        video_url: &str,
        image_mode: ImageMode,
    ) -> Result<VideoData> {
        let video_io = VideoMediaIO::new(
            ImageMediaIO::new(image_mode),
            self.config.media_io.video_num_frames,
        );
        self.load_from_url_async(video_url, &video_io, Some(self.config.timeouts.video))
            .await
    }

    /// Load a pre-computed image embedding from a raw base64 payload.
    ///
    /// Embeddings have no transport-scheme ambiguity, so this bypasses URL
    /// parsing entirely.
    pub fn fetch_image_embedding(&self, data: &str) -> Result<Tensor> {
        ImageEmbeddingMediaIO.load_base64("", data)
    }
}

// ─── One-shot helpers ────────────────────────────────────────────────────────

/// Fetch audio through a throwaway default connector.
pub fn fetch_audio(audio_url: &str) -> Result<AudioData> {
    MediaConnector::with_defaults()?.fetch_audio(audio_url)
}

/// Fetch an image through a throwaway default connector.
pub fn fetch_image(image_url: &str) -> Result<DynamicImage> {
    MediaConnector::with_defaults()?.fetch_image(image_url)
}

/// Fetch video frames through a throwaway default connector.
pub fn fetch_video(video_url: &str) -> Result<VideoData> {
    MediaConnector::with_defaults()?.fetch_video(video_url)
}

/// Encode audio as a base64 WAV payload.
pub fn encode_audio_base64(audio: &AudioData) -> Result<String> {
    AudioMediaIO::default().encode_base64(audio)
}

/// Encode an image as a base64 JPEG payload.
pub fn encode_image_base64(image: &DynamicImage) -> Result<String> {
    ImageMediaIO::default().encode_base64(image)
}

/// Encode video frames as a base64 GIF payload.
pub fn encode_video_base64(video: &VideoData) -> Result<String> {
    VideoMediaIO::default().encode_base64(video)
}
