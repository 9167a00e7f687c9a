//! Integration tests for the crawler
//!
//! These tests use wiremock to serve catalogs over HTTP and tempfile for
//! catalogs on disk, and run full crawls end-to-end.

use catalog_walk::config::{BridgeConfig, BridgeOrder, Config, CrawlerConfig, UserAgentConfig};
use catalog_walk::crawler::{
    crawl, spawn_crawl, BridgeItem, BridgeReader, FetchErrorKind, Fetcher,
};
use catalog_walk::output::NdjsonSink;
use catalog_walk::Location;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration with no dispatch spacing
fn create_test_config(max_concurrent_fetches: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_fetches,
            min_dispatch_interval_ms: 0,
            fetch_timeout_ms: 5_000,
            max_depth: None,
        },
        bridge: BridgeConfig {
            high_water_mark: 16,
            order: BridgeOrder::Fifo,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: Some("https://example.com/about".to_string()),
        },
    }
}

/// Mounts a JSON document at `route`
async fn serve(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Reads until end of stream; returns document ids and the number of end markers
async fn collect_ids(mut reader: BridgeReader) -> (Vec<String>, usize) {
    let mut ids = Vec::new();
    loop {
        match reader.read().await {
            BridgeItem::Document(doc) => ids.push(doc.id().unwrap_or("?").to_string()),
            BridgeItem::EndOfStream => break,
        }
    }
    // A second read must keep reporting the end
    let ends = match reader.read().await {
        BridgeItem::EndOfStream => 1,
        BridgeItem::Document(_) => 0,
    };
    (ids, ends)
}

/// Answers item requests and records when each one arrived
#[derive(Clone, Default)]
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl ArrivalRecorder {
    fn gaps(&self) -> Vec<Duration> {
        let mut arrivals = self.arrivals.lock().clone();
        arrivals.sort();
        arrivals.windows(2).map(|pair| pair[1] - pair[0]).collect()
    }
}

impl Respond for ArrivalRecorder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.arrivals.lock().push(Instant::now());
        ResponseTemplate::new(200).set_body_json(json!({"id": request.url.path()}))
    }
}

fn id_set(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_full_crawl_remote_catalog() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    serve(
        &mock_server,
        "/catalog.json",
        json!({
            "id": "root",
            "links": [
                {"rel": "self", "href": format!("{}/catalog.json", base_url)},
                {"rel": "child", "href": "l8/catalog.json"},
                {"rel": "item", "href": format!("{}/items/a.json", base_url)}
            ]
        }),
    )
    .await;

    serve(
        &mock_server,
        "/l8/catalog.json",
        json!({
            "id": "l8",
            "links": [
                {"rel": "parent", "href": "../catalog.json"},
                {"rel": "root", "href": "../catalog.json"},
                {"rel": "item", "href": "../items/b.json"}
            ]
        }),
    )
    .await;

    serve(&mock_server, "/items/a.json", json!({"id": "a", "links": []})).await;
    serve(&mock_server, "/items/b.json", json!({"id": "b", "links": []})).await;

    let root = Location::parse(&format!("{}/catalog.json", base_url));
    let handle = spawn_crawl(&create_test_config(4), root).expect("Failed to start crawl");
    let (ids, ends) = collect_ids(handle.reader).await;
    let summary = handle.task.await.expect("Crawl task failed");

    assert_eq!(ids.len(), 4);
    assert_eq!(
        ids.into_iter().collect::<HashSet<_>>(),
        id_set(&["root", "l8", "a", "b"])
    );
    assert_eq!(ends, 1);
    assert_eq!(summary.documents, 4);
    assert_eq!(summary.failures, 0);
    assert!(!summary.cancelled);

    // Wiremock verifies the expect(1) counts when mock_server drops
}

#[tokio::test]
async fn test_missing_branch_does_not_stop_crawl() {
    let mock_server = MockServer::start().await;

    serve(
        &mock_server,
        "/catalog.json",
        json!({
            "id": "root",
            "links": [
                {"rel": "child", "href": "missing/catalog.json"},
                {"rel": "item", "href": "ok.json"}
            ]
        }),
    )
    .await;
    serve(&mock_server, "/ok.json", json!({"id": "ok"})).await;

    // Unmatched routes answer 404
    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let handle = spawn_crawl(&create_test_config(4), root).unwrap();
    let (ids, ends) = collect_ids(handle.reader).await;
    let summary = handle.task.await.unwrap();

    assert_eq!(ids.into_iter().collect::<HashSet<_>>(), id_set(&["root", "ok"]));
    assert_eq!(ends, 1);
    assert_eq!(summary.failures, 1);
}

#[tokio::test]
async fn test_server_error_and_malformed_body_are_branch_failures() {
    let mock_server = MockServer::start().await;

    serve(
        &mock_server,
        "/catalog.json",
        json!({
            "id": "root",
            "links": [
                {"rel": "item", "href": "broken.json"},
                {"rel": "item", "href": "html.json"},
                {"rel": "item", "href": "fine.json"}
            ]
        }),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/broken.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/html.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    serve(&mock_server, "/fine.json", json!({"id": "fine"})).await;

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let handle = spawn_crawl(&create_test_config(4), root).unwrap();
    let (ids, ends) = collect_ids(handle.reader).await;
    let summary = handle.task.await.unwrap();

    assert_eq!(ids.into_iter().collect::<HashSet<_>>(), id_set(&["root", "fine"]));
    assert_eq!(ends, 1);
    assert_eq!(summary.failures, 2);
}

#[tokio::test]
async fn test_local_catalog_with_remote_item() {
    let mock_server = MockServer::start().await;
    serve(&mock_server, "/remote.json", json!({"id": "remote"})).await;

    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    std::fs::write(
        dir.path().join("catalog.json"),
        serde_json::to_vec(&json!({
            "id": "root",
            "links": [
                {"rel": "child", "href": "sub/catalog.json"},
                {"rel": "item", "href": format!("{}/remote.json", mock_server.uri())}
            ]
        }))
        .unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("sub/catalog.json"),
        serde_json::to_vec(&json!({
            "id": "sub",
            "links": [{"rel": "item", "href": dir.path().join("abs.json").display().to_string()}]
        }))
        .unwrap(),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("abs.json"),
        serde_json::to_vec(&json!({"id": "abs"})).unwrap(),
    )
    .unwrap();

    let handle = spawn_crawl(
        &create_test_config(4),
        Location::from(dir.path().join("catalog.json")),
    )
    .unwrap();
    let (ids, ends) = collect_ids(handle.reader).await;

    assert_eq!(
        ids.into_iter().collect::<HashSet<_>>(),
        id_set(&["root", "sub", "remote", "abs"])
    );
    assert_eq!(ends, 1);
}

#[tokio::test]
async fn test_user_agent_header_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalog.json"))
        .and(header("user-agent", "TestBot/1.0 (+https://example.com/about)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "root"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let handle = spawn_crawl(&create_test_config(1), root).unwrap();
    let (ids, _) = collect_ids(handle.reader).await;

    assert_eq!(ids, vec!["root"]);
}

#[tokio::test]
async fn test_concurrency_cap_bounds_throughput() {
    let mock_server = MockServer::start().await;

    let links: Vec<Value> = (0..8)
        .map(|i| json!({"rel": "item", "href": format!("slow/{}.json", i)}))
        .collect();
    serve(&mock_server, "/catalog.json", json!({"id": "root", "links": links})).await;

    for i in 0..8 {
        Mock::given(method("GET"))
            .and(path(format!("/slow/{}.json", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": format!("slow-{}", i)}))
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let start = Instant::now();
    let handle = spawn_crawl(&create_test_config(2), root).unwrap();
    let (ids, ends) = collect_ids(handle.reader).await;

    // 8 slow fetches, at most 2 at a time
    assert!(start.elapsed() >= Duration::from_millis(400));
    assert_eq!(ids.len(), 9);
    assert_eq!(ends, 1);
}

#[tokio::test]
async fn test_dispatch_spacing() {
    let mock_server = MockServer::start().await;

    let links: Vec<Value> = (0..4)
        .map(|i| json!({"rel": "item", "href": format!("{}.json", i)}))
        .collect();
    serve(&mock_server, "/catalog.json", json!({"id": "root", "links": links})).await;
    for i in 0..4 {
        serve(&mock_server, &format!("/{}.json", i), json!({"id": i.to_string()})).await;
    }

    let mut config = create_test_config(50);
    config.crawler.min_dispatch_interval_ms = 50;

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let start = Instant::now();
    let handle = spawn_crawl(&config, root).unwrap();
    let (ids, _) = collect_ids(handle.reader).await;

    // Five dispatches, four gaps
    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn test_dispatch_spacing_holds_after_backpressure() {
    let mock_server = MockServer::start().await;

    let links: Vec<Value> = (0..8)
        .map(|i| json!({"rel": "item", "href": format!("items/{}.json", i)}))
        .collect();
    serve(&mock_server, "/catalog.json", json!({"id": "root", "links": links})).await;

    let recorder = ArrivalRecorder::default();
    Mock::given(method("GET"))
        .and(path_regex(r"^/items/\d+\.json$"))
        .respond_with(recorder.clone())
        .expect(8)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(4);
    config.crawler.min_dispatch_interval_ms = 100;
    config.bridge.high_water_mark = 2;

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let handle = spawn_crawl(&config, root).unwrap();

    // Let visits pile up behind the full buffer before draining
    tokio::time::sleep(Duration::from_secs(1)).await;
    let (ids, ends) = collect_ids(handle.reader).await;

    assert_eq!(ids.len(), 9);
    assert_eq!(ends, 1);

    let gaps = recorder.gaps();
    assert_eq!(gaps.len(), 7);
    for gap in &gaps {
        assert!(
            *gap >= Duration::from_millis(80),
            "fetches started too close together: {:?}",
            gaps
        );
    }
}

#[tokio::test]
async fn test_slow_fetch_reports_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hung.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "hung"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(1);
    config.crawler.fetch_timeout_ms = 200;
    let fetcher = Fetcher::new(&config).unwrap();

    let location = Location::parse(&format!("{}/hung.json", mock_server.uri()));
    let err = fetcher.fetch(&location).await.unwrap_err();

    assert!(
        matches!(err.kind, FetchErrorKind::Timeout(_)),
        "expected a timeout, got {:?}",
        err.kind
    );
    assert_eq!(err.location, location);
}

#[tokio::test]
async fn test_fetch_timeout_abandons_branch() {
    let mock_server = MockServer::start().await;

    serve(
        &mock_server,
        "/catalog.json",
        json!({"id": "root", "links": [{"rel": "item", "href": "hung.json"}]}),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/hung.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "hung"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(2);
    config.crawler.fetch_timeout_ms = 200;

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let handle = spawn_crawl(&config, root).unwrap();
    let (ids, ends) = tokio::time::timeout(Duration::from_secs(3), collect_ids(handle.reader))
        .await
        .expect("hung fetch held the crawl open");
    let summary = handle.task.await.unwrap();

    assert_eq!(ids, vec!["root"]);
    assert_eq!(ends, 1);
    assert_eq!(summary.failures, 1);
}

#[tokio::test]
async fn test_backpressure_stops_fetching() {
    let mock_server = MockServer::start().await;

    let links: Vec<Value> = (0..40)
        .map(|i| json!({"rel": "item", "href": format!("items/{}.json", i)}))
        .collect();
    serve(&mock_server, "/catalog.json", json!({"id": "root", "links": links})).await;
    for i in 0..40 {
        serve(
            &mock_server,
            &format!("/items/{}.json", i),
            json!({"id": format!("item-{}", i)}),
        )
        .await;
    }

    let mut config = create_test_config(1);
    config.bridge.high_water_mark = 2;

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let handle = spawn_crawl(&config, root).unwrap();

    // The consumer is not reading yet
    tokio::time::sleep(Duration::from_millis(300)).await;
    let requests = mock_server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .len();
    assert!(
        requests <= 2 + 1 + 1,
        "fetching continued without a reader: {} requests",
        requests
    );
    assert!(!handle.task.is_finished());

    let (ids, ends) = collect_ids(handle.reader).await;
    let summary = handle.task.await.unwrap();

    assert_eq!(ids.len(), 41);
    assert_eq!(ends, 1);
    assert_eq!(summary.documents, 41);
}

#[tokio::test]
async fn test_crawl_into_ndjson_sink() {
    let mock_server = MockServer::start().await;

    serve(
        &mock_server,
        "/catalog.json",
        json!({
            "id": "root",
            "description": "kept verbatim",
            "links": [{"rel": "item", "href": "x.json"}]
        }),
    )
    .await;
    serve(&mock_server, "/x.json", json!({"id": "x", "bbox": [0, 0, 1, 1]})).await;

    let root = Location::parse(&format!("{}/catalog.json", mock_server.uri()));
    let mut sink = NdjsonSink::new(Vec::new());
    let summary = crawl(&create_test_config(2), root, &mut sink)
        .await
        .expect("Crawl failed");

    assert_eq!(summary.documents, 2);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let docs: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(docs.len(), 2);
    assert!(docs
        .iter()
        .any(|d| d["description"] == "kept verbatim" && d["id"] == "root"));
    assert!(docs.iter().any(|d| d["bbox"] == json!([0, 0, 1, 1])));
}
