use apollo_rest_link::Configuration;
use apollo_rest_link::RequestContext;
use apollo_rest_link::RestLink;
use apollo_rest_link::headers::Credentials;
use apollo_rest_link::headers::HeaderEntry;
use apollo_rest_link::headers::HeaderMergePolicy;
use apollo_rest_link::headers::HeaderSet;
use apollo_rest_link::registry::Registry;
use http::HeaderName;
use http::HeaderValue;
use serde_json_bytes::json;
use wiremock::MockServer;

use super::execute_with_context;
use super::mock_api;
use super::req_asserts::Matcher;
use super::req_asserts::matches;

const POST_QUERY: &str = r#"
query {
  post @rest(type: "Post", path: "/post/1", headers: [{ name: "x-trace", value: "call" }]) { id }
}
"#;

fn configuration(server: &MockServer) -> Configuration {
    Configuration {
        uri: Some(server.uri()),
        headers: vec![
            HeaderEntry {
                name: "x-trace".to_string(),
                value: "link".to_string(),
            },
            HeaderEntry {
                name: "authorization".to_string(),
                value: "Bearer link".to_string(),
            },
        ],
        ..Default::default()
    }
}

fn context_headers(entries: &[(&'static str, &'static str)]) -> HeaderSet {
    entries
        .iter()
        .map(|(name, value)| {
            (
                HeaderName::from_static(*name),
                HeaderValue::from_static(*value),
            )
        })
        .collect()
}

#[tokio::test]
async fn link_context_and_call_headers_are_concatenated() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    let link = RestLink::builder()
        .configuration(configuration(&server))
        .build()
        .unwrap();

    execute_with_context(
        &link,
        POST_QUERY,
        json!({}),
        RequestContext::new().with_headers(context_headers(&[("x-trace", "context")])),
    )
    .await
    .unwrap();

    matches(
        &server.received_requests().await.unwrap(),
        vec![
            Matcher::new()
                .header("x-trace", &["link", "context", "call"])
                .header("authorization", &["Bearer link"])
                .no_header("content-type"),
        ],
    );
}

#[tokio::test]
async fn context_overrides_replace_link_headers() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    let link = RestLink::builder()
        .configuration(configuration(&server))
        .build()
        .unwrap();

    execute_with_context(
        &link,
        POST_QUERY,
        json!({}),
        RequestContext::new()
            .with_headers(context_headers(&[("authorization", "Bearer user")]))
            .with_headers_to_override([http::header::AUTHORIZATION]),
    )
    .await
    .unwrap();

    matches(
        &server.received_requests().await.unwrap(),
        vec![
            Matcher::new()
                .header("authorization", &["Bearer user"])
                .header("x-trace", &["link", "call"]),
        ],
    );
}

#[tokio::test]
async fn per_call_policy_wins_over_link_policy() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    let last_set_only = HeaderMergePolicy::new(|sets| sets.last().cloned().unwrap_or_default());
    let link_only = HeaderMergePolicy::new(|sets| sets.first().cloned().unwrap_or_default());
    let link = RestLink::builder()
        .configuration(configuration(&server))
        .headers_merge_policy(link_only)
        .registry(Registry::new().with_header_merge_policy("callOnly", last_set_only))
        .build()
        .unwrap();

    execute_with_context(&link, POST_QUERY, json!({}), RequestContext::new())
        .await
        .unwrap();
    execute_with_context(
        &link,
        r#"
        query {
          post @rest(
            type: "Post"
            path: "/post/1"
            headers: [{ name: "x-trace", value: "call" }]
            headersMergePolicy: $callOnly
          ) { id }
        }
        "#,
        json!({}),
        RequestContext::new(),
    )
    .await
    .unwrap();

    matches(
        &server.received_requests().await.unwrap(),
        vec![
            Matcher::new()
                .header("x-trace", &["link"])
                .header("authorization", &["Bearer link"]),
            Matcher::new()
                .header("x-trace", &["call"])
                .no_header("authorization"),
        ],
    );
}

#[tokio::test]
async fn omitted_credentials_do_not_send_authorization() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    let link = RestLink::builder()
        .configuration(Configuration {
            credentials: Some(Credentials::Include),
            ..configuration(&server)
        })
        .build()
        .unwrap();

    execute_with_context(
        &link,
        POST_QUERY,
        json!({}),
        RequestContext::new().with_credentials(Credentials::Omit),
    )
    .await
    .unwrap();

    matches(
        &server.received_requests().await.unwrap(),
        vec![Matcher::new().no_header("authorization").header("x-trace", &["link", "call"])],
    );
}
