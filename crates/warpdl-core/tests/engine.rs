//! End-to-end engine tests against mock origin and DoH servers

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use warpdl_core::{EngineError, HttpSettings, Transfer, TransferConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves a fixed body with byte-range support, like a real file server.
struct RangeFileResponder {
    body: Vec<u8>,
}

impl RangeFileResponder {
    fn new(body: Vec<u8>) -> Self {
        Self { body }
    }
}

fn parse_range(header: &str) -> Option<(usize, usize)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

impl Respond for RangeFileResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_range);

        match range {
            Some((start, end)) if end < self.body.len() => ResponseTemplate::new(206)
                .insert_header(
                    "content-range",
                    format!("bytes {}-{}/{}", start, end, self.body.len()).as_str(),
                )
                .set_body_bytes(self.body[start..=end].to_vec()),
            Some(_) => ResponseTemplate::new(416),
            None => ResponseTemplate::new(200).set_body_bytes(self.body.clone()),
        }
    }
}

/// Returns a truncated ranged body for the first `failures` requests,
/// then serves the range correctly.
struct FlakyRangeResponder {
    body: Vec<u8>,
    failures: u32,
    calls: AtomicU32,
}

impl Respond for FlakyRangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let (start, end) = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_range)
            .unwrap_or((0, self.body.len() - 1));

        let full = &self.body[start..=end];
        let slice = if call < self.failures {
            // Clean EOF halfway through the range
            &full[..full.len() / 2]
        } else {
            full
        };
        ResponseTemplate::new(206)
            .insert_header(
                "content-range",
                format!("bytes {}-{}/{}", start, end, self.body.len()).as_str(),
            )
            .set_body_bytes(slice.to_vec())
    }
}

fn test_body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn mount_head(server: &MockServer, len: usize, ranges: bool) {
    let mut template = ResponseTemplate::new(200).insert_header("content-length", len.to_string().as_str());
    if ranges {
        template = template.insert_header("accept-ranges", "bytes");
    }
    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(template)
        .mount(server)
        .await;
}

fn config_for(server: &MockServer, output: PathBuf, concurrency: u32) -> TransferConfig {
    let mut config = TransferConfig::new(format!("{}/file.bin", server.uri()));
    config.concurrency = concurrency;
    config.output = Some(output);
    config.use_doh = false;
    config
}

#[tokio::test]
async fn multi_segment_transfer_reassembles_resource() {
    let body = test_body(1_000_000);
    let server = MockServer::start().await;
    mount_head(&server, body.len(), true).await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(RangeFileResponder::new(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("file.bin");
    let transfer = Transfer::new(config_for(&server, output.clone(), 4)).unwrap();
    let stats = transfer.stats();

    transfer.run().await.unwrap();

    assert_eq!(tokio::fs::read(&output).await.unwrap(), body);
    assert_eq!(stats.downloaded(), body.len() as u64);
    assert_eq!(stats.total(), Some(body.len() as u64));

    // Temp files are gone
    for i in 0..4 {
        assert!(!dir.path().join(format!("file.bin.part{i}")).exists());
    }
}

#[tokio::test]
async fn no_range_support_falls_back_to_single_unranged_get() {
    let body = test_body(50_000);
    let server = MockServer::start().await;
    mount_head(&server, body.len(), false).await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("file.bin");
    let transfer = Transfer::new(config_for(&server, output.clone(), 16)).unwrap();

    transfer.run().await.unwrap();

    assert_eq!(tokio::fs::read(&output).await.unwrap(), body);
    assert!(!dir.path().join("file.bin.part0").exists());
}

#[tokio::test]
async fn unknown_size_transfer_discovers_total_at_stream_end() {
    let body = test_body(10_000);
    let server = MockServer::start().await;
    // HEAD succeeds but declares nothing useful
    Mock::given(method("HEAD"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("file.bin");
    let transfer = Transfer::new(config_for(&server, output.clone(), 8)).unwrap();
    let stats = transfer.stats();

    transfer.run().await.unwrap();

    assert_eq!(tokio::fs::read(&output).await.unwrap(), body);
    assert_eq!(stats.total(), Some(body.len() as u64));
}

#[tokio::test]
async fn truncated_attempts_are_retried_then_succeed() {
    let body = test_body(20_000);
    let server = MockServer::start().await;
    mount_head(&server, body.len(), true).await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(FlakyRangeResponder {
            body: body.clone(),
            failures: 2,
            calls: AtomicU32::new(0),
        })
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("file.bin");
    let transfer = Transfer::new(config_for(&server, output.clone(), 1)).unwrap();
    let stats = transfer.stats();

    let started = Instant::now();
    transfer.run().await.unwrap();
    let elapsed = started.elapsed();

    // Two retries with linear backoff: 1s after attempt 1, 2s after attempt 2
    assert!(
        elapsed >= Duration::from_secs(3),
        "expected >= 3s of backoff, took {elapsed:?}"
    );

    assert_eq!(tokio::fs::read(&output).await.unwrap(), body);
    // Truncated attempts were retracted from the counter
    assert_eq!(stats.downloaded(), body.len() as u64);
}

#[tokio::test]
async fn exhausted_retries_report_segment_and_attempts() {
    let server = MockServer::start().await;
    mount_head(&server, 1000, false).await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let transfer =
        Transfer::new(config_for(&server, dir.path().join("file.bin"), 1)).unwrap();

    let err = transfer.run().await.unwrap_err();
    match err {
        EngineError::SegmentFailed {
            index,
            attempts,
            source,
        } => {
            assert_eq!(index, 0);
            assert_eq!(attempts, 3);
            assert!(matches!(*source, EngineError::ServerError { status: 500 }));
        }
        other => panic!("expected SegmentFailed, got {other}"),
    }

    // 3 attempts hit the server
    let gets = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(gets, 3);
}

#[tokio::test]
async fn cancellation_during_backoff_wins_over_retry() {
    let server = MockServer::start().await;
    mount_head(&server, 1000, false).await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let transfer =
        Transfer::new(config_for(&server, dir.path().join("file.bin"), 1)).unwrap();
    let cancel = transfer.cancel_token();

    let handle = tokio::spawn(async move { transfer.run().await });

    // First attempt fails fast; cancel while the worker sleeps out its
    // first one-second backoff
    tokio::time::sleep(Duration::from_millis(300)).await;
    let cancelled_at = Instant::now();
    cancel.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert!(err.is_cancelled(), "expected cancellation, got {err}");
    assert!(
        cancelled_at.elapsed() < Duration::from_millis(500),
        "cancellation should abort the backoff promptly"
    );

    // No second attempt was started
    let gets = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count();
    assert_eq!(gets, 1);
}

#[tokio::test]
async fn doh_resolution_drives_origin_connections() {
    let body = test_body(30_000);
    let origin = MockServer::start().await;
    mount_head(&origin, body.len(), true).await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(RangeFileResponder::new(body.clone()))
        .mount(&origin)
        .await;

    // Fake provider answers every name with the origin's loopback address
    let doh = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Status": 0,
            "Answer": [
                { "name": "origin.test", "type": 1, "TTL": 60, "data": "127.0.0.1" },
            ]
        })))
        .expect(1..)
        .mount(&doh)
        .await;

    let origin_port = origin.address().port();
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("file.bin");

    let mut config = TransferConfig::new(format!("http://origin.test:{origin_port}/file.bin"));
    config.concurrency = 2;
    config.output = Some(output.clone());
    let settings = HttpSettings {
        doh_endpoint: format!("{}/dns-query", doh.uri()),
        ..HttpSettings::default()
    };

    let transfer = Transfer::with_settings(config, settings).unwrap();
    transfer.run().await.unwrap();

    assert_eq!(tokio::fs::read(&output).await.unwrap(), body);
}

#[tokio::test]
async fn literal_ip_target_never_queries_doh() {
    let body = test_body(5_000);
    let origin = MockServer::start().await;
    mount_head(&origin, body.len(), true).await;
    Mock::given(method("GET"))
        .and(path("/file.bin"))
        .respond_with(RangeFileResponder::new(body.clone()))
        .mount(&origin)
        .await;

    // A provider that would fail every query; it must never be asked
    let doh = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dns-query"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&doh)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("file.bin");

    // origin.uri() is a literal 127.0.0.1 address
    let mut config = TransferConfig::new(format!("{}/file.bin", origin.uri()));
    config.concurrency = 2;
    config.output = Some(output.clone());
    let settings = HttpSettings {
        doh_endpoint: format!("{}/dns-query", doh.uri()),
        ..HttpSettings::default()
    };

    let transfer = Transfer::with_settings(config, settings).unwrap();
    transfer.run().await.unwrap();

    assert_eq!(tokio::fs::read(&output).await.unwrap(), body);
}

#[tokio::test]
async fn zero_concurrency_is_rejected() {
    let mut config = TransferConfig::new("http://example.com/file.bin");
    config.concurrency = 0;
    let err = Transfer::new(config).unwrap_err();
    assert!(matches!(err, EngineError::InvalidConfig(_)));
}

#[tokio::test]
async fn invalid_url_is_rejected() {
    let config = TransferConfig::new("not a url");
    let err = Transfer::new(config).unwrap_err();
    assert!(matches!(err, EngineError::InvalidUrl(_)));
}
