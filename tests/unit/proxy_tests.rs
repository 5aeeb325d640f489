// Image proxy request scenarios, driven by an in-memory fetcher

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use edgepix::config::Config;
use edgepix::engine::ImageEngine;
use edgepix::fetch::{FetchError, FetchedResponse, Fetcher};
use edgepix::metrics::Metrics;
use edgepix::proxy::{ImageProxy, ProxyResponse};

const CACHE_CONTROL: &str = "public,max-age=15552000,s-maxage=15552000";

/// Serves canned responses by URL and records every request it sees
#[derive(Default)]
struct StubFetcher {
    responses: HashMap<String, FetchedResponse>,
    requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl StubFetcher {
    fn with(mut self, url: &str, response: FetchedResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    fn headers_sent(&self, index: usize) -> Vec<(String, String)> {
        self.requests.lock().unwrap()[index].1.clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<FetchedResponse, FetchError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), headers.to_vec()));

        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

struct Harness {
    proxy: ImageProxy,
    fetcher: Arc<StubFetcher>,
    engine: Arc<ImageEngine>,
    metrics: Arc<Metrics>,
}

impl Harness {
    fn new(allow_list: &[&str], fetcher: StubFetcher) -> Self {
        let mut config = Config::default();
        config.access.allow_list = allow_list.iter().map(|s| s.to_string()).collect();

        let fetcher = Arc::new(fetcher);
        let engine = Arc::new(ImageEngine::new());
        let metrics = Arc::new(Metrics::new());
        let proxy = ImageProxy::new(
            Arc::new(config),
            Arc::clone(&engine),
            Arc::clone(&fetcher) as Arc<dyn Fetcher>,
            Arc::clone(&metrics),
        );

        Self {
            proxy,
            fetcher,
            engine,
            metrics,
        }
    }

    async fn get(&self, query: &str) -> ProxyResponse {
        self.proxy
            .handle(
                Some(query),
                vec![("Host", "edge.example"), ("Accept", "image/*")],
            )
            .await
    }
}

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let pixels = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            color[0].wrapping_add((x % 7) as u8),
            color[1].wrapping_add((y % 5) as u8),
            color[2],
            color[3],
        ])
    });
    let engine = ImageEngine::new();
    let handle = engine.adopt(pixels);
    engine.encode_lossless(&handle).unwrap()
}

fn ok_png(bytes: Vec<u8>) -> FetchedResponse {
    FetchedResponse::new(
        200,
        vec![("Content-Type".to_string(), "image/png".to_string())],
        bytes,
    )
}

fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[tokio::test]
async fn test_missing_url_redirects_without_fetch() {
    let harness = Harness::new(&[], StubFetcher::default());

    let response = harness.get("action=resize!10,10").await;

    assert_eq!(response.status, 302);
    assert_eq!(
        response.header("location"),
        Some("https://github.com/ccbikai/vercel-edge-image")
    );
    assert!(harness.fetcher.requested_urls().is_empty());
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_disallowed_host_is_forbidden_with_empty_body() {
    let harness = Harness::new(&["good.test"], StubFetcher::default());

    let response = harness.get("url=https://evil.com/x.png").await;

    assert_eq!(response.status, 403);
    assert!(response.body.is_empty());
    assert!(harness.fetcher.requested_urls().is_empty());
}

#[tokio::test]
async fn test_subdomain_of_allowed_suffix_is_fetched() {
    let fetcher = StubFetcher::default().with("https://img.good.test/a.png", ok_png(png(4, 4, [1, 2, 3, 255])));
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness.get("url=https://img.good.test/a.png&format=png").await;
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_upstream_404_is_passed_through() {
    let fetcher = StubFetcher::default().with(
        "https://good.test/missing.png",
        FetchedResponse::new(
            404,
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("X-Upstream".to_string(), "origin-1".to_string()),
            ],
            "not found",
        ),
    );
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness.get("url=https://good.test/missing.png&action=resize!1,1").await;

    assert_eq!(response.status, 404);
    assert_eq!(response.body.as_ref(), b"not found");
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert_eq!(response.header("x-upstream"), Some("origin-1"));
    assert_eq!(harness.engine.tracker().allocated(), 0);
}

#[tokio::test]
async fn test_undecodable_source_is_415_with_original_bytes() {
    let fetcher = StubFetcher::default().with(
        "https://good.test/a.png",
        FetchedResponse::new(
            200,
            vec![("Content-Type".to_string(), "image/png".to_string())],
            "definitely not a png",
        ),
    );
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness.get("url=https://good.test/a.png").await;

    assert_eq!(response.status, 415);
    assert_eq!(response.body.as_ref(), b"definitely not a png");
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(harness.metrics.get_fault_count("decode"), 1);
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_oversized_resize_is_415_with_original_bytes() {
    let source = png(4, 4, [10, 20, 30, 255]);
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(source.clone()));
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness
        .get("url=https://good.test/a.png&action=resize!70000,70000")
        .await;

    assert_eq!(response.status, 415);
    assert_eq!(response.body.as_ref(), source.as_slice());
    assert_eq!(harness.metrics.get_fault_count("invalid_parameter"), 1);
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_resize_to_webp() {
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(png(64, 48, [90, 40, 10, 255])));
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness
        .get("url=https%3A%2F%2Fgood.test%2Fa.png&action=resize!800,400,1")
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("image/webp"));
    assert_eq!(response.header("cache-control"), Some(CACHE_CONTROL));

    let decoded = webp::Decoder::new(&response.body).decode().unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 400));
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_disallowed_watermark_is_skipped() {
    let source = png(16, 16, [10, 10, 10, 255]);
    let fetcher = StubFetcher::default()
        .with("https://good.test/a.png", ok_png(source.clone()))
        .with("https://bad.test/w.png", ok_png(png(4, 4, [255, 255, 255, 255])));
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness
        .get("url=https://good.test/a.png&action=watermark!https%3A%2F%2Fbad.test%2Fw.png,10,10&format=png")
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(decode(&response.body), decode(&source));
    assert_eq!(harness.fetcher.requested_urls(), vec!["https://good.test/a.png"]);
    assert_eq!(harness.metrics.get_skipped_step_count("disallowed"), 1);
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_failed_watermark_fetch_is_skipped() {
    let source = png(8, 8, [10, 10, 10, 255]);
    let fetcher = StubFetcher::default()
        .with("https://good.test/a.png", ok_png(source.clone()))
        .with(
            "https://good.test/w.png",
            FetchedResponse::new(500, vec![], "boom"),
        );
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness
        .get("url=https://good.test/a.png&action=watermark!https://good.test/w.png|fliph&format=png")
        .await;

    assert_eq!(response.status, 200);
    let mut expected = decode(&source);
    image::imageops::flip_horizontal_in_place(&mut expected);
    assert_eq!(decode(&response.body), expected);
    assert_eq!(harness.metrics.get_skipped_step_count("upstream_status"), 1);
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_allowed_watermark_is_applied() {
    let fetcher = StubFetcher::default()
        .with("https://good.test/a.png", ok_png(png(8, 8, [0, 0, 0, 255])))
        .with("https://good.test/w.png", ok_png(png(2, 2, [200, 200, 200, 255])));
    let harness = Harness::new(&["good.test"], fetcher);

    let response = harness
        .get("url=https://good.test/a.png&action=watermark!https://good.test/w.png,3,3&format=png")
        .await;

    assert_eq!(response.status, 200);
    let output = decode(&response.body);
    assert_eq!(output.dimensions(), (8, 8));
    assert_eq!(output.get_pixel(3, 3), &Rgba([200, 200, 200, 255]));
    assert_eq!(output.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    assert_eq!(harness.metrics.get_step_count("watermark"), 1);
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_unknown_operation_is_500_with_original_bytes() {
    let source = png(4, 4, [1, 1, 1, 255]);
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(source.clone()));
    let harness = Harness::new(&[], fetcher);

    let response = harness.get("url=https://good.test/a.png&action=resize!2,2|explode").await;

    assert_eq!(response.status, 500);
    assert_eq!(response.body.as_ref(), source.as_slice());
    assert_eq!(harness.engine.live_handles(), 0);
}

#[tokio::test]
async fn test_primary_transport_failure_is_empty_500() {
    let harness = Harness::new(&[], StubFetcher::default());

    let response = harness.get("url=https://unreachable.test/a.png").await;

    assert_eq!(response.status, 500);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn test_png_output_keeps_dimensions() {
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(png(37, 23, [5, 6, 7, 255])));
    let harness = Harness::new(&[], fetcher);

    let response = harness.get("url=https://good.test/a.png&format=png").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(decode(&response.body).dimensions(), (37, 23));
}

#[tokio::test]
async fn test_reencoding_untouched_png_is_stable() {
    let source = png(12, 9, [30, 60, 90, 255]);
    let first = Harness::new(
        &[],
        StubFetcher::default().with("https://good.test/a.png", ok_png(source)),
    )
    .get("url=https://good.test/a.png&format=png")
    .await;

    let second = Harness::new(
        &[],
        StubFetcher::default().with("https://good.test/a.png", ok_png(first.body.to_vec())),
    )
    .get("url=https://good.test/a.png&format=png")
    .await;

    assert_eq!(first.status, 200);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_webp_encoding_is_deterministic() {
    let source = png(20, 20, [120, 30, 200, 255]);
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(source));
    let harness = Harness::new(&[], fetcher);

    let first = harness.get("url=https://good.test/a.png&quality=80").await;
    let second = harness.get("url=https://good.test/a.png&quality=80").await;

    assert_eq!(first.status, 200);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_jpeg_output() {
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(png(10, 10, [200, 0, 0, 255])));
    let harness = Harness::new(&[], fetcher);

    let response = harness.get("url=https://good.test/a.png&format=jpg&quality=50").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
    assert_eq!(&response.body[0..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_unknown_format_is_labelled_webp() {
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(png(4, 4, [0, 0, 0, 255])));
    let harness = Harness::new(&[], fetcher);

    let response = harness.get("url=https://good.test/a.png&format=tiff").await;

    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("image/webp"));
    assert_eq!(&response.body[8..12], b"WEBP");
}

#[tokio::test]
async fn test_host_header_is_not_forwarded() {
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(png(2, 2, [0, 0, 0, 255])));
    let harness = Harness::new(&[], fetcher);

    harness.get("url=https://good.test/a.png").await;

    let headers = harness.fetcher.headers_sent(0);
    assert!(!headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("host")));
    assert!(headers.contains(&("Accept".to_string(), "image/*".to_string())));
}

#[tokio::test]
async fn test_metrics_follow_requests() {
    let fetcher = StubFetcher::default().with("https://good.test/a.png", ok_png(png(2, 2, [0, 0, 0, 255])));
    let harness = Harness::new(&["good.test"], fetcher);

    harness.get("url=https://good.test/a.png&format=png").await;
    harness.get("url=https://other.test/a.png").await;
    harness.get("").await;

    assert_eq!(harness.metrics.get_request_count(), 3);
    assert_eq!(harness.metrics.get_status_count(200), 1);
    assert_eq!(harness.metrics.get_status_count(403), 1);
    assert_eq!(harness.metrics.get_status_count(302), 1);
    assert!(harness.metrics.get_bytes_sent() > 0);
}
