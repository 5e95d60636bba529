//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the real
//! HTTP fetcher and link extractor through the crawler manager end-to-end.

use shelf_scout::config::{Config, UserAgentConfig};
use shelf_scout::output::JsonOutput;
use shelf_scout::{AggregateReport, CrawlerManager, JobState};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with short timeouts and no retries
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = 2;
    config.crawler.max_concurrent_fetches = 4;
    config.crawler.per_page_timeout_ms = 2_000;
    config.crawler.per_domain_timeout_ms = 20_000;
    config.crawler.fetch_retries = 0;
    config.crawler.retry_backoff_ms = 50;
    config.user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: Some("https://example.com/contact".to_string()),
    };
    config
}

/// An HTML page response
///
/// `set_body_string` would force `text/plain`, which the fetcher rejects.
fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(body))
        .mount(server)
        .await;
}

async fn crawl(config: Config, domains: &[String]) -> AggregateReport {
    CrawlerManager::new(config)
        .expect("Failed to create manager")
        .run(domains)
        .await
        .expect("Crawl run failed")
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"
        <a href="/catalog/">Catalog</a>
        <a href="/p/1234567">Featured</a>
        <a href="https://elsewhere.example/p/7654321">Partner</a>
        "#,
    )
    .await;
    mount_page(
        &mock_server,
        "/catalog/",
        r#"
        <a href="/item?iid=42&amp;utm_source=catalog">Item</a>
        <a href="/p/1234567">Featured again</a>
        "#,
    )
    .await;
    mount_page(&mock_server, "/p/1234567", "<h1>Featured product</h1>").await;

    let report = crawl(create_test_config(), &[base_url.clone()]).await;

    let result = report.get(&base_url).expect("Missing domain result");
    assert_eq!(result.status, JobState::Completed);
    assert_eq!(
        result.product_urls,
        vec![
            format!("{}/item?iid=42", base_url),
            format!("{}/p/1234567", base_url),
        ]
    );
    // root, /catalog/, /p/1234567, /item?iid=42
    assert_eq!(result.pages_visited, 4);
    assert!(result.errors.is_empty(), "Unexpected errors: {:?}", result.errors);
    assert!(!report.any_failed());
}

#[tokio::test]
async fn test_error_status_is_recorded() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/missing">Gone</a><a href="/p/2345678">Product</a>"#,
    )
    .await;
    mount_page(&mock_server, "/p/2345678", "<h1>Product</h1>").await;

    let report = crawl(create_test_config(), &[base_url.clone()]).await;

    let result = report.get(&base_url).unwrap();
    assert_eq!(result.status, JobState::Completed);
    assert_eq!(result.product_urls, vec![format!("{}/p/2345678", base_url)]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].url, format!("{}/missing", base_url));
    assert!(result.errors[0].reason.contains("HTTP 404"));
}

#[tokio::test]
async fn test_content_type_handling() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", r#"<a href="/feed">Feed</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&mock_server)
        .await;

    let report = crawl(create_test_config(), &[base_url.clone()]).await;

    let result = report.get(&base_url).unwrap();
    assert_eq!(result.status, JobState::Completed);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].reason.contains("unsupported content type"));
}

#[tokio::test]
async fn test_unreachable_domain_fails_alone() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_page(&mock_server, "/", r#"<a href="/p/3456789">Product</a>"#).await;

    // Nothing listens on port 1
    let unreachable = "http://127.0.0.1:1/".to_string();
    let report = crawl(create_test_config(), &[unreachable.clone(), base_url.clone()]).await;

    let order: Vec<&str> = report.domains().collect();
    assert_eq!(order, vec![unreachable.as_str(), base_url.as_str()]);

    let failed = report.get(&unreachable).unwrap();
    assert_eq!(failed.status, JobState::Failed);
    assert!(failed.product_urls.is_empty());
    assert_eq!(failed.pages_visited, 0);
    assert_eq!(failed.errors.len(), 1);

    let ok = report.get(&base_url).unwrap();
    assert_eq!(ok.status, JobState::Completed);
    assert_eq!(ok.product_urls, vec![format!("{}/p/3456789", base_url)]);

    assert!(report.any_failed());
}

#[tokio::test]
async fn test_links_follow_redirected_base() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/landing/"))
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/landing/", r#"<a href="deal/p/4567890">Deal</a>"#).await;

    let mut config = create_test_config();
    config.crawler.max_depth = 1;
    let report = crawl(config, &[base_url.clone()]).await;

    let result = report.get(&base_url).unwrap();
    assert_eq!(result.status, JobState::Completed);
    assert_eq!(
        result.product_urls,
        vec![format!("{}/landing/deal/p/4567890", base_url)]
    );
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", r#"<a href="/p/5678901">Product</a>"#).await;

    let mut config = create_test_config();
    config.crawler.fetch_retries = 1;
    let report = crawl(config, &[base_url.clone()]).await;

    let result = report.get(&base_url).unwrap();
    assert_eq!(result.status, JobState::Completed);
    assert_eq!(result.product_urls, vec![format!("{}/p/5678901", base_url)]);
}

#[tokio::test]
async fn test_rate_limit_honors_retry_after() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", r#"<a href="/p/7890123">Product</a>"#).await;

    let mut config = create_test_config();
    config.crawler.max_depth = 1;
    config.crawler.fetch_retries = 1;
    let started = Instant::now();
    let report = crawl(config, &[base_url.clone()]).await;
    let elapsed = started.elapsed();

    let result = report.get(&base_url).unwrap();
    assert_eq!(result.status, JobState::Completed);
    assert_eq!(result.product_urls, vec![format!("{}/p/7890123", base_url)]);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    // The 50ms backoff is overridden by the server's one second
    assert!(elapsed >= Duration::from_secs(1), "retried after {:?}", elapsed);
}

#[tokio::test]
async fn test_user_agent_is_sent() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact)",
        ))
        .respond_with(html_page("<p>Hello</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = crawl(create_test_config(), &[base_url.clone()]).await;

    assert_eq!(report.get(&base_url).unwrap().status, JobState::Completed);
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", r#"<a href="/slow">Slow</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html_page("late").set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.crawler.per_page_timeout_ms = 300;
    let report = crawl(config, &[base_url.clone()]).await;

    let result = report.get(&base_url).unwrap();
    assert_eq!(result.status, JobState::Completed);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].url, format!("{}/slow", base_url));
    assert!(result.errors[0].reason.contains("timeout"));
}

#[tokio::test]
async fn test_domain_deadline_keeps_partial_results() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<a href="/p/6789012">Product</a><a href="/slow">Slow</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/p/6789012"))
        .respond_with(html_page("product").set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.crawler.per_page_timeout_ms = 10_000;
    config.crawler.per_domain_timeout_ms = 500;
    let report = crawl(config, &[base_url.clone()]).await;

    let result = report.get(&base_url).unwrap();
    assert_eq!(result.status, JobState::TimedOut);
    assert_eq!(result.product_urls, vec![format!("{}/p/6789012", base_url)]);
    assert_eq!(result.errors.last().unwrap().reason, "timeout");
    assert!(!report.any_failed());
}

#[tokio::test]
async fn test_json_output_end_to_end() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    mount_page(&first, "/", r#"<a href="/p/1111111">A</a>"#).await;
    mount_page(&second, "/", r#"<a href="/item?iid=9">B</a>"#).await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let json_path = temp_dir.path().join("products.json");
    let domains = vec![second.uri(), first.uri()];

    let output = JsonOutput::create(&json_path, &domains).expect("Failed to create output");
    let report = crawl(create_test_config(), &domains).await;
    output.finish(&report).expect("Failed to write output");

    let text = std::fs::read_to_string(&json_path).expect("Failed to read output");
    let value: serde_json::Value = serde_json::from_str(&text).expect("Output is not JSON");
    assert_eq!(
        value[second.uri().as_str()],
        serde_json::json!([format!("{}/item?iid=9", second.uri())])
    );
    assert_eq!(
        value[first.uri().as_str()],
        serde_json::json!([format!("{}/p/1111111", first.uri())])
    );

    // Keys keep the order the domains were given in
    let second_at = text.find(&second.uri()).unwrap();
    let first_at = text.find(&format!("\"{}\"", first.uri())).unwrap();
    assert!(second_at < first_at);
}
