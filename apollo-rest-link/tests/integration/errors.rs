use std::time::Duration;

use apollo_rest_link::Configuration;
use apollo_rest_link::Request;
use apollo_rest_link::RestLink;
use apollo_rest_link::error::NetworkError;
use apollo_rest_link::error::QueryShapeError;
use apollo_rest_link::error::RestLinkError;
use apollo_rest_link::error::TransformError;
use apollo_rest_link::type_patcher::Patch;
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json_bytes::json;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::configuration;
use super::execute;
use super::link;
use super::mock_api;

#[tokio::test]
async fn error_status_carries_the_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post/1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(serde_json::json!({ "message": "boom" })),
        )
        .mount(&server)
        .await;

    let error = execute(
        &link(&server),
        r#"query { post @rest(type: "Post", path: "/post/1") { id } }"#,
        json!({}),
    )
    .await
    .unwrap_err();

    let RestLinkError::Network(error) = error else {
        panic!("expected a network error");
    };
    assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    let NetworkError::Status { body, json, .. } = error else {
        panic!("expected a status error");
    };
    assert_eq!(body, r#"{"message":"boom"}"#);
    assert_eq!(json, Some(json!({ "message": "boom" })));
}

#[tokio::test]
async fn invalid_json_is_reported() {
    let server = MockServer::start().await;
    Mock::given(path("/post/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let error = execute(
        &link(&server),
        r#"query { post @rest(type: "Post", path: "/post/1") { id } }"#,
        json!({}),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        error,
        RestLinkError::Network(NetworkError::InvalidResponseBody { .. })
    ));
}

#[tokio::test]
async fn transport_failures_are_network_errors() {
    let link = RestLink::builder()
        .configuration(Configuration {
            uri: Some("http://127.0.0.1:1".to_string()),
            ..Default::default()
        })
        .build()
        .unwrap();

    let error = execute(
        &link,
        r#"query { post @rest(type: "Post", path: "/post/1") { id } }"#,
        json!({}),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        error,
        RestLinkError::Network(NetworkError::Transport { uri, .. }) if uri == "http://127.0.0.1:1/post/1"
    ));
}

#[tokio::test]
async fn type_patcher_failures_propagate() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    let link = RestLink::builder()
        .configuration(configuration(&server))
        .type_patcher("Post", Patch::new(|_, _, _| Err("cannot patch".into())))
        .build()
        .unwrap();

    let error = execute(
        &link,
        r#"query { post @rest(type: "Post", path: "/post/1") { id } }"#,
        json!({}),
    )
    .await
    .unwrap_err();
    assert_eq!(
        error,
        RestLinkError::Transform(TransformError::TypePatcher {
            type_name: "Post".to_string(),
            reason: "cannot patch".to_string(),
        })
    );
}

#[tokio::test]
async fn subscriptions_are_not_supported() {
    let server = MockServer::start().await;
    let error = execute(
        &link(&server),
        r#"subscription { posts @rest(type: "Post", path: "/posts") { id } }"#,
        json!({}),
    )
    .await
    .unwrap_err();
    assert_eq!(
        error.to_string(),
        "A `subscription` operation is not supported yet"
    );
}

#[tokio::test]
async fn both_path_and_path_builder() {
    let server = MockServer::start().await;
    let link = RestLink::builder()
        .configuration(configuration(&server))
        .registry(apollo_rest_link::registry::Registry::new().with_path_builder(
            "postPath",
            apollo_rest_link::path_template::PathBuilder::new(|_| Ok("/post/1".to_string())),
        ))
        .build()
        .unwrap();
    let error = link
        .parse_operation(
            r#"query { post @rest(type: "Post", path: "/post/1", pathBuilder: $postPath) { id } }"#,
            None,
        )
        .unwrap_err();
    assert_eq!(
        error,
        QueryShapeError::BothPathAndPathBuilder {
            type_name: "Post".to_string()
        }
    );
}

#[tokio::test]
async fn usable_as_a_tower_service() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    let link = link(&server);
    let operation = link
        .parse_operation(
            r#"query { post @rest(type: "Post", path: "/post/1") { id } }"#,
            None,
        )
        .unwrap();

    let response = link
        .oneshot(Request::builder().operation(operation).build())
        .await
        .unwrap();
    assert_eq!(
        response.data,
        json!({ "post": { "id": "1", "__typename": "Post" } })
    );
}

#[tokio::test]
async fn cancelled_operations_return_nothing() {
    let server = MockServer::start().await;
    Mock::given(path("/post/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "id": "1" }))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    let link = link(&server);
    let operation = link
        .parse_operation(
            r#"query { post @rest(type: "Post", path: "/post/1") { id } }"#,
            None,
        )
        .unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        link.execute_with_cancellation(Request::builder().operation(operation).build(), token),
    )
    .await
    .unwrap();
    assert!(result.is_none());
}
