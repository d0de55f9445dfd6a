use httpmock::prelude::*;
use link_unfurl::{Fetcher, PreviewError, PreviewResolver, ProviderRegistry, ResolverConfig};
use std::time::Duration;

fn offline_resolver(fetcher: Fetcher) -> PreviewResolver {
    PreviewResolver::new_with_config(ResolverConfig {
        fetcher: Some(fetcher),
        providers: Some(ProviderRegistry::new()),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_invalid_urls() {
    let resolver = offline_resolver(Fetcher::new());

    for url in ["", "not a url", "://missing-scheme.test", "http://"] {
        let result = resolver.preview(url).await;
        assert!(
            matches!(result, Err(PreviewError::UrlParseError(_))),
            "expected UrlParseError for {url:?}, got {result:?}"
        );
    }
}

#[tokio::test]
async fn test_http_status_errors() {
    let server = MockServer::start_async().await;
    let resolver = offline_resolver(Fetcher::new());

    for status in [404u16, 403, 503] {
        server
            .mock_async(|when, then| {
                when.method(GET).path(format!("/status/{status}"));
                then.status(status);
            })
            .await;
    }

    match resolver.preview(&server.url("/status/404")).await {
        Err(PreviewError::NotFound(msg)) => assert!(msg.contains("not found")),
        other => panic!("Expected NotFound error, got: {other:?}"),
    }

    match resolver.preview(&server.url("/status/403")).await {
        Err(PreviewError::ClientError { status, message }) => {
            assert_eq!(status, 403);
            assert!(message.contains("/status/403"));
        }
        other => panic!("Expected ClientError, got: {other:?}"),
    }

    match resolver.preview(&server.url("/status/503")).await {
        Err(PreviewError::ServerError { status, .. }) => assert_eq!(status, 503),
        other => panic!("Expected ServerError, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/slow");
            then.status(200)
                .delay(Duration::from_secs(2))
                .body("<html></html>");
        })
        .await;

    let fetcher = Fetcher::new_with_custom_config(Duration::from_millis(200), "test-agent/1.0");
    let result = offline_resolver(fetcher).preview(&server.url("/slow")).await;

    assert!(
        matches!(result, Err(PreviewError::TimeoutError(_))),
        "Expected TimeoutError, got: {result:?}"
    );
}

#[tokio::test]
async fn test_malformed_oembed_json() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/providers");
            then.status(200).body("this is not json");
        })
        .await;

    let result = ProviderRegistry::bootstrap_noembed_from(
        &Fetcher::new(),
        &server.url("/providers"),
        &server.url("/embed"),
    )
    .await;

    match result {
        Err(PreviewError::ExternalServiceError { service, .. }) => assert_eq!(service, "noembed"),
        Err(other) => panic!("Expected ExternalServiceError, got: {other:?}"),
        Ok(_) => panic!("Expected ExternalServiceError, got a registry"),
    }
}

#[test]
fn test_error_display() {
    let err = PreviewError::ClientError {
        status: 410,
        message: "https://a.test/x returned 410 Gone".into(),
    };
    assert_eq!(
        err.to_string(),
        "Client error (410): https://a.test/x returned 410 Gone"
    );

    let err = PreviewError::ExternalServiceError {
        service: "YouTube".into(),
        message: "bad body".into(),
    };
    assert_eq!(err.to_string(), "External service error: YouTube - bad body");
}
