//! Assembles the HTTP request of one `@rest` call.

use bytes::Bytes;
use http::HeaderValue;
use http::Method;
use http::Uri;
use http::header::CONTENT_TYPE;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;

use crate::context::RequestContext;
use crate::error::QueryShapeError;
use crate::error::RestLinkError;
use crate::error::TransformError;
use crate::fetch::FetchRequest;
use crate::field_names;
use crate::headers::merge_headers;
use crate::link::Inner;
use crate::operation::Field;
use crate::path_template::PathSource;
use crate::spec::BodySource;
use crate::spec::DEFAULT_BODY_KEY;
use crate::spec::RestCallSpec;

/// `params` are every value visible to the call; `arguments` only the field's
/// own and `exports` the exported values it can see.
pub(crate) async fn make_request(
    link: &Inner,
    context: &RequestContext,
    field: &Field,
    spec: &RestCallSpec,
    params: &Map<ByteString, JSON>,
    arguments: &Map<ByteString, JSON>,
    exports: &Map<ByteString, JSON>,
) -> Result<FetchRequest, RestLinkError> {
    let path = match &spec.path {
        PathSource::Template(template) => {
            template
                .interpolate(params)
                .map_err(|param| QueryShapeError::MissingParams {
                    field: field.response_key().to_string(),
                    param,
                })?
        }
        PathSource::Builder(builder) => {
            builder
                .build(params.clone())
                .await
                .map_err(|err| TransformError::PathBuilder {
                    field: field.response_key().to_string(),
                    reason: err.to_string(),
                })?
        }
    };

    let base = link.endpoints.resolve(spec.endpoint())?;
    let uri = join_uri(base, &path);
    let uri = uri
        .parse::<Uri>()
        .map_err(|err| QueryShapeError::InvalidUri {
            uri: uri.clone(),
            reason: err.to_string(),
        })?;

    let body = make_body(link, field, spec, params, arguments, exports).await?;

    let mut call_headers = spec.headers.clone();
    if body.is_some() && !call_headers.contains_key(&CONTENT_TYPE) {
        call_headers.append(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    let policy = spec
        .headers_merge_policy
        .as_ref()
        .or(link.headers_merge_policy.as_ref())
        .cloned()
        .unwrap_or_default();
    let headers = merge_headers(
        &link.headers,
        &context.headers,
        &call_headers,
        &context.headers_to_override,
        &policy,
    );

    Ok(FetchRequest {
        uri,
        method: spec.method.clone(),
        headers,
        body,
        credentials: context
            .credentials
            .or(link.credentials)
            .unwrap_or_default(),
    })
}

async fn make_body(
    link: &Inner,
    field: &Field,
    spec: &RestCallSpec,
    params: &Map<ByteString, JSON>,
    arguments: &Map<ByteString, JSON>,
    exports: &Map<ByteString, JSON>,
) -> Result<Option<Bytes>, RestLinkError> {
    if spec.method == Method::GET {
        return Ok(None);
    }
    let denormalize = |value: &JSON| -> Result<JSON, TransformError> {
        match field_names::select(
            spec.field_name_denormalizer.as_ref(),
            link.field_name_denormalizer.as_ref(),
        ) {
            Some(denormalizer) => denormalizer.transform_keys(value),
            None => Ok(value.clone()),
        }
    };

    let body = match &spec.body {
        BodySource::Builder(builder) => Some(builder.build(params.clone()).await.map_err(|err| {
            TransformError::BodyBuilder {
                field: field.response_key().to_string(),
                reason: err.to_string(),
            }
        })?),
        BodySource::Key(key) => {
            let value = params
                .get(key.as_str())
                .ok_or_else(|| QueryShapeError::MissingParams {
                    field: field.response_key().to_string(),
                    param: key.clone(),
                })?;
            Some(denormalize(value)?)
        }
        // Operation variables never become a body on their own.
        BodySource::Default => match arguments
            .get(DEFAULT_BODY_KEY)
            .or_else(|| exports.get(DEFAULT_BODY_KEY))
        {
            Some(input) => Some(denormalize(input)?),
            None if accepts_arguments_body(&spec.method) && !arguments.is_empty() => {
                Some(denormalize(&JSON::Object(arguments.clone()))?)
            }
            None => None,
        },
    };

    body.map(|body| {
        serde_json::to_vec(&body)
            .map(Bytes::from)
            .map_err(|err| TransformError::BodySerialization {
                field: field.response_key().to_string(),
                reason: err.to_string(),
            })
    })
    .transpose()
    .map_err(RestLinkError::from)
}

fn accepts_arguments_body(method: &Method) -> bool {
    method == Method::POST || method == Method::PUT || method == Method::PATCH
}

/// Join an endpoint and a path with exactly one `/` between them.
pub(crate) fn join_uri(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) if !path.starts_with('?') => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
