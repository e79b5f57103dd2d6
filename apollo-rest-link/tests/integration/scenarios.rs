use apollo_rest_link::RestLink;
use apollo_rest_link::error::QueryShapeError;
use apollo_rest_link::error::RestLinkError;
use apollo_rest_link::type_patcher::Patch;
use insta::assert_json_snapshot;
use pretty_assertions::assert_eq;
use serde_json_bytes::json;
use wiremock::MockServer;

use super::configuration;
use super::execute;
use super::link;
use super::mock_api;
use super::req_asserts::Matcher;
use super::req_asserts::matches;

#[tokio::test]
async fn single_call() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;

    let data = execute(
        &link(&server),
        r#"
        query postTitle {
          post(id: "1") @rest(type: "Post", path: "/post/:id") {
            id
            title
          }
        }
        "#,
        json!({}),
    )
    .await
    .unwrap();

    assert_json_snapshot!(data, @r###"
    {
      "post": {
        "id": "1",
        "title": "Love apollo",
        "__typename": "Post"
      }
    }
    "###);
    matches(
        &server.received_requests().await.unwrap(),
        vec![Matcher::new().method("GET").path("/post/1").no_body()],
    );
}

#[tokio::test]
async fn query_with_post_is_rejected_before_any_request() {
    let server = MockServer::start().await;

    let error = execute(
        &link(&server),
        r#"
        query {
          post(id: "1") @rest(type: "Post", path: "/post/:id", method: "POST") {
            id
          }
        }
        "#,
        json!({}),
    )
    .await
    .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("GET"), "{message}");
    assert!(message.contains("POST"), "{message}");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn nested_call_needs_export() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    mock_api::tag_7().mount(&server).await;
    let link = link(&server);

    let error = execute(
        &link,
        r#"
        query {
          post(id: "1") @rest(type: "Post", path: "/post/:id") {
            id
            tagId
            tag @rest(type: "Tag", path: "/tag/:tagId") { name }
          }
        }
        "#,
        json!({}),
    )
    .await
    .unwrap_err();
    assert_eq!(
        error,
        RestLinkError::QueryShape(QueryShapeError::MissingParams {
            field: "tag".to_string(),
            param: "tagId".to_string(),
        })
    );
    assert!(
        error
            .to_string()
            .starts_with("Missing params to run query, specify it in the query params or use an export directive")
    );
    assert!(server.received_requests().await.unwrap().is_empty());

    let data = execute(
        &link,
        r#"
        query {
          post(id: "1") @rest(type: "Post", path: "/post/:id") {
            id
            tagId @export(as: "tagId")
            tag @rest(type: "Tag", path: "/tag/:tagId") { name }
          }
        }
        "#,
        json!({}),
    )
    .await
    .unwrap();
    assert_eq!(
        data,
        json!({
            "post": {
                "id": "1",
                "tagId": 7,
                "tag": { "name": "apollo", "__typename": "Tag" },
                "__typename": "Post"
            }
        })
    );
    matches(
        &server.received_requests().await.unwrap(),
        vec![
            Matcher::new().method("GET").path("/post/1"),
            Matcher::new().method("GET").path("/tag/7"),
        ],
    );
}

#[tokio::test]
async fn nested_arrays_are_tagged_element_wise() {
    let server = MockServer::start().await;
    mock_api::keywords().mount(&server).await;

    let data = execute(
        &link(&server),
        r#"query { keywordGroups @rest(type: "Keyword", path: "/keywords") { name } }"#,
        json!({}),
    )
    .await
    .unwrap();

    assert_eq!(
        data,
        json!({
            "keywordGroups": [
                [{ "name": "rust", "__typename": "Keyword" }],
                [
                    { "name": "graphql", "__typename": "Keyword" },
                    { "name": "rest", "__typename": "Keyword" }
                ]
            ]
        })
    );
}

#[tokio::test]
async fn type_patchers_tag_nested_objects() {
    let server = MockServer::start().await;
    mock_api::posts_with_authors().mount(&server).await;
    let link = RestLink::builder()
        .configuration(configuration(&server))
        .type_patcher("Post", Patch::fields([("author", "Author")]))
        .build()
        .unwrap();

    let data = execute(
        &link,
        r#"
        query {
          posts @rest(type: "Post", path: "/posts") {
            id
            author { name __typename }
          }
        }
        "#,
        json!({}),
    )
    .await
    .unwrap();

    assert_eq!(
        data,
        json!({
            "posts": [
                {
                    "id": "1",
                    "author": { "name": "Ada", "__typename": "Author" },
                    "__typename": "Post"
                },
                { "id": "2", "author": null, "__typename": "Post" }
            ]
        })
    );
}

#[tokio::test]
async fn aliases_variables_and_query_strings() {
    let server = MockServer::start().await;
    mock_api::post_1().mount(&server).await;
    wiremock::Mock::given(wiremock::matchers::path("/search"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let data = execute(
        &link(&server),
        r#"
        query($id: ID!, $term: String, $page: Int, $draft: Boolean) {
          first: post(id: $id) @rest(type: "Post", path: "/post/:id") { title }
          results: search @rest(type: "Post", path: "/search?q=:term&page=:page&draft=:draft&sort=:sort") { id }
        }
        "#,
        json!({ "id": "1", "term": "rust & co", "page": 0, "draft": false }),
    )
    .await
    .unwrap();

    assert_eq!(
        data,
        json!({
            "first": { "title": "Love apollo", "__typename": "Post" },
            "results": []
        })
    );
    let received = server.received_requests().await.unwrap();
    let search = received
        .iter()
        .find(|request| request.url.path() == "/search")
        .unwrap();
    assert_eq!(
        search.url.query(),
        Some("q=rust%20%26%20co&page=0&draft=false")
    );
}
