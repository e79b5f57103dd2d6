use wiremock::Mock;
use wiremock::ResponseTemplate;
use wiremock::matchers::method;
use wiremock::matchers::path;

pub(crate) fn post_1() -> Mock {
    Mock::given(method("GET"))
        .and(path("/post/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "1",
            "title": "Love apollo",
            "tagId": 7,
            "body": "not requested"
        })))
}

pub(crate) fn tag_7() -> Mock {
    Mock::given(method("GET"))
        .and(path("/tag/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 7,
            "name": "apollo"
        })))
}

pub(crate) fn keywords() -> Mock {
    Mock::given(method("GET"))
        .and(path("/keywords"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            [{ "name": "rust" }],
            [{ "name": "graphql" }, { "name": "rest" }]
        ])))
}

pub(crate) fn posts_with_authors() -> Mock {
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "1", "author": { "id": "a", "name": "Ada" } },
            { "id": "2", "author": null }
        ])))
}

pub(crate) fn created(status: u16) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({ "id": "new" }))
}
