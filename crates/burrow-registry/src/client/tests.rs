//! Unit tests for the HTTP fetcher

use super::*;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_retry() -> ClientConfig {
    ClientConfig {
        retry: RetryConfig {
            max_retries: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        },
        ..ClientConfig::default()
    }
}

#[test]
fn test_retry_config_default() {
    let config = RetryConfig::default();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.initial_delay, Duration::from_millis(100));
    assert_eq!(config.max_delay, Duration::from_secs(10));
    assert_eq!(config.multiplier, 2.0);
}

#[test]
fn test_invalid_source_url_rejected() {
    let sources = [SourceSpec::new("broken", "not a url")];
    let err = HttpFetcher::new(ClientConfig::default(), &sources).unwrap_err();
    assert!(matches!(err, BurrowError::ConfigValidation { .. }));
}

#[test]
fn test_sources_with_proxy_settings_get_own_client() {
    let sources = [
        SourceSpec::new("cran", "https://cloud.r-project.org/"),
        SourceSpec::new("internal", "https://cran.internal/").with_proxy(ProxySetting::Disabled),
        SourceSpec::new("proxied", "https://mirror.example.org")
            .with_proxy(ProxySetting::Url("http://proxy.example.org:3128".to_string())),
    ];
    let fetcher = HttpFetcher::new(ClientConfig::default(), &sources).unwrap();
    assert_eq!(fetcher.source_clients.len(), 2);
    assert!(fetcher.source_clients.contains_key("https://cran.internal"));
}

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/src/contrib/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(fast_retry(), &[]).unwrap();
    let bytes = fetcher
        .fetch(&CacheKey::new(mock_server.uri(), "src/contrib/"))
        .await
        .unwrap();
    assert_eq!(bytes, b"<html></html>");
}

#[tokio::test]
async fn test_fetch_not_found_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/src/contrib/Archive/abind/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(fast_retry(), &[]).unwrap();
    let err = fetcher
        .fetch(&CacheKey::new(mock_server.uri(), "src/contrib/Archive/abind/"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_fetch_retries_server_errors() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(fast_retry(), &[]).unwrap();
    let bytes = fetcher
        .fetch(&CacheKey::new(mock_server.uri(), "flaky"))
        .await
        .unwrap();
    assert_eq!(bytes, b"ok");
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_retries() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::new(fast_retry(), &[]).unwrap();
    let err = fetcher
        .fetch(&CacheKey::new(mock_server.uri(), "down"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Failed { .. }));
}
