use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use image::ImageReader;
use tracing::{debug, info};

use super::snapshot::{Snapshot, SnapshotError};

/// A live picture the sampler can take snapshots of.
pub trait FrameSource: Send {
    /// Whether the source has produced its first frame metadata yet.
    /// Sampling is a no-op until this returns `true`.
    fn is_ready(&mut self) -> impl Future<Output = bool> + Send;

    /// Grab the current frame.
    fn capture(&mut self) -> impl Future<Output = Result<Snapshot, CaptureError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("video source not ready")]
    NotReady,
    #[error("captured frame has zero size ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("camera request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("camera returned HTTP status {0}")]
    HttpStatus(u16),
    #[error("failed to decode camera frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Polls a camera snapshot URL that answers each GET with one encoded still
/// (JPEG, PNG, ...).
pub struct HttpFrameSource {
    client: reqwest::Client,
    url: String,
    ready: bool,
}

impl HttpFrameSource {
    pub fn new(url: &str) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            ready: false,
        })
    }

    async fn fetch(&self) -> Result<Vec<u8>, CaptureError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(CaptureError::HttpStatus(resp.status().as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

impl FrameSource for HttpFrameSource {
    async fn is_ready(&mut self) -> bool {
        if self.ready {
            return true;
        }
        match self.client.get(&self.url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!(url = self.url, "camera is ready");
                self.ready = true;
            }
            Ok(resp) => {
                debug!(status = %resp.status(), url = self.url, "camera not ready");
            }
            Err(e) => {
                debug!(error = %e, url = self.url, "camera not reachable");
            }
        }
        self.ready
    }

    async fn capture(&mut self) -> Result<Snapshot, CaptureError> {
        if !self.ready {
            return Err(CaptureError::NotReady);
        }
        let data = self.fetch().await?;
        decode_frame(&data)
    }
}

/// Decode an encoded still into an RGBA snapshot.
pub fn decode_frame(data: &[u8]) -> Result<Snapshot, CaptureError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .decode()?
        .to_rgba8();

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::EmptyFrame { width, height });
    }
    debug!(width, height, "decoded camera frame");
    Ok(Snapshot::from_rgba(width, height, img.into_raw())?)
}
