use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader};
use tracing::debug;
use webcam_dice_common::seed::SeedResponse;

/// Where fresh seeds come from.
pub trait SeedSource: Send + Sync {
    fn fetch_seed(&self) -> impl Future<Output = Result<u32, SeedFetchError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum SeedFetchError {
    #[error("seed request failed: {0}")]
    Http(reqwest::Error),
    #[error("seed server returned HTTP status {0}")]
    HttpStatus(u16),
    #[error("malformed seed response: {0}")]
    Body(reqwest::Error),
    #[error("failed to decode camera frame: {0}")]
    Decode(#[from] image::ImageError),
    #[error("camera frame has zero size ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
}

/// Fetches seeds from the seed server's `GET /random-seed`.
///
/// No timeout and no retries: a hung request simply delays the next seed.
pub struct HttpSeedClient {
    client: reqwest::Client,
    url: String,
}

impl HttpSeedClient {
    pub fn new(url: &str) -> Result<Self, SeedFetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(SeedFetchError::Http)?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl SeedSource for HttpSeedClient {
    async fn fetch_seed(&self) -> Result<u32, SeedFetchError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(SeedFetchError::Http)?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(SeedFetchError::HttpStatus(resp.status().as_u16()));
        }

        let body: SeedResponse = resp.json().await.map_err(SeedFetchError::Body)?;
        debug!(seed = body.seed, url = self.url, "fetched seed");
        Ok(body.seed)
    }
}

/// Side of the grayscale thumbnail a still is reduced to before summing.
const THUMBNAIL_SIDE: u32 = 100;

/// Derives seeds from the camera itself instead of the seed server: each
/// fetch grabs one still, converts it to grayscale, shrinks it to 100x100
/// and sums the pixels modulo 2^32.
pub struct FrameSeed {
    client: reqwest::Client,
    url: String,
}

impl FrameSeed {
    pub fn new(camera_url: &str) -> Result<Self, SeedFetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(SeedFetchError::Http)?;
        Ok(Self {
            client,
            url: camera_url.to_string(),
        })
    }
}

impl SeedSource for FrameSeed {
    async fn fetch_seed(&self) -> Result<u32, SeedFetchError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(SeedFetchError::Http)?;

        if !resp.status().is_success() {
            return Err(SeedFetchError::HttpStatus(resp.status().as_u16()));
        }

        let data = resp.bytes().await.map_err(SeedFetchError::Body)?;
        let img = ImageReader::new(Cursor::new(&data[..]))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()?;
        let seed = seed_from_image(&img)?;
        debug!(seed, url = self.url, "derived seed from camera frame");
        Ok(seed)
    }
}

fn seed_from_image(img: &DynamicImage) -> Result<u32, SeedFetchError> {
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(SeedFetchError::EmptyFrame { width, height });
    }
    let gray = img.to_luma8();
    let thumbnail = imageops::resize(&gray, THUMBNAIL_SIDE, THUMBNAIL_SIDE, FilterType::Triangle);
    let sum: u64 = thumbnail.as_raw().iter().map(|&v| u64::from(v)).sum();
    Ok((sum % (1 << 32)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};

    fn grey(width: u32, height: u32, level: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([level; 3])))
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/random-seed")
    }

    #[tokio::test]
    async fn parses_seed_body() {
        let url = serve(Router::new().route(
            "/random-seed",
            get(|| async { Json(SeedResponse { seed: 3_141_592_653 }) }),
        ))
        .await;
        let client = HttpSeedClient::new(&url).unwrap();
        assert_eq!(client.fetch_seed().await.unwrap(), 3_141_592_653);
    }

    #[tokio::test]
    async fn non_ok_status_is_failure() {
        let url = serve(Router::new().route(
            "/random-seed",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let client = HttpSeedClient::new(&url).unwrap();
        assert!(matches!(
            client.fetch_seed().await,
            Err(SeedFetchError::HttpStatus(500))
        ));
    }

    #[tokio::test]
    async fn other_success_status_is_failure() {
        let url = serve(Router::new().route(
            "/random-seed",
            get(|| async { (StatusCode::ACCEPTED, Json(SeedResponse { seed: 7 })) }),
        ))
        .await;
        let client = HttpSeedClient::new(&url).unwrap();
        assert!(matches!(
            client.fetch_seed().await,
            Err(SeedFetchError::HttpStatus(202))
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_failure() {
        let url = serve(Router::new().route(
            "/random-seed",
            get(|| async { r#"{"seed":"not a number"}"# }),
        ))
        .await;
        let client = HttpSeedClient::new(&url).unwrap();
        assert!(matches!(
            client.fetch_seed().await,
            Err(SeedFetchError::Body(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_failure() {
        let client = HttpSeedClient::new("http://127.0.0.1:9/random-seed").unwrap();
        assert!(matches!(
            client.fetch_seed().await,
            Err(SeedFetchError::Http(_))
        ));
    }

    #[test]
    fn uniform_frames_sum_to_level_times_area() {
        assert_eq!(seed_from_image(&grey(640, 480, 0)).unwrap(), 0);
        assert_eq!(seed_from_image(&grey(640, 480, 128)).unwrap(), 1_280_000);
        assert_eq!(seed_from_image(&grey(1920, 1080, 255)).unwrap(), 2_550_000);
    }

    #[test]
    fn tiny_frames_are_upscaled() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([200])));
        assert_eq!(seed_from_image(&img).unwrap(), 2_000_000);
    }

    #[test]
    fn zero_sized_frame_is_rejected() {
        assert!(matches!(
            seed_from_image(&DynamicImage::new_luma8(0, 0)),
            Err(SeedFetchError::EmptyFrame { .. })
        ));
    }

    #[tokio::test]
    async fn frame_seed_hashes_served_still() {
        let mut png = Cursor::new(Vec::new());
        grey(64, 48, 128).write_to(&mut png, ImageFormat::Png).unwrap();
        let png = png.into_inner();
        let url = serve(Router::new().route(
            "/random-seed",
            get(move || async move { png }),
        ))
        .await;

        let seeds = FrameSeed::new(&url).unwrap();
        assert_eq!(seeds.fetch_seed().await.unwrap(), 1_280_000);
        assert_eq!(seeds.fetch_seed().await.unwrap(), 1_280_000);
    }

    #[tokio::test]
    async fn frame_seed_reports_camera_errors() {
        let url = serve(Router::new().route(
            "/random-seed",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "warming up") }),
        ))
        .await;
        assert!(matches!(
            FrameSeed::new(&url).unwrap().fetch_seed().await,
            Err(SeedFetchError::HttpStatus(503))
        ));

        let url = serve(Router::new().route(
            "/random-seed",
            get(|| async { "not an image" }),
        ))
        .await;
        assert!(matches!(
            FrameSeed::new(&url).unwrap().fetch_seed().await,
            Err(SeedFetchError::Decode(_))
        ));
    }
}
