//! Turns an HTTP response into typed data and projects it onto a selection.

use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;

use crate::error::NetworkError;
use crate::error::RestLinkError;
use crate::fetch::FetchResponse;
use crate::field_names;
use crate::link::Inner;
use crate::spec::RestCallSpec;
use crate::type_patcher::TYPENAME;

pub(crate) fn handle_response(
    link: &Inner,
    spec: &RestCallSpec,
    uri: &str,
    response: FetchResponse,
) -> Result<JSON, RestLinkError> {
    if !response.status.is_success() {
        let body = String::from_utf8_lossy(&response.body).into_owned();
        let json = serde_json::from_slice::<JSON>(&response.body).ok();
        tracing::error!(uri, status = %response.status, "HTTP fetch failed");
        return Err(NetworkError::Status {
            uri: uri.to_string(),
            status: response.status,
            body,
            json,
        }
        .into());
    }

    // 204 No Content and friends
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JSON::Null);
    }

    let data: JSON =
        serde_json::from_slice(&response.body).map_err(|err| NetworkError::InvalidResponseBody {
            uri: uri.to_string(),
            reason: err.to_string(),
        })?;

    let data = match field_names::select(
        spec.field_name_normalizer.as_ref(),
        link.field_name_normalizer.as_ref(),
    ) {
        Some(normalizer) => normalizer.transform_keys(&data)?,
        None => data,
    };

    Ok(link.type_patcher.patch(&data, spec.type_name())?)
}

/// Keep the `__typename` of `source` on a projected object even when it was
/// not selected.
pub(crate) fn keep_typename(source: &Map<ByteString, JSON>, projected: &mut Map<ByteString, JSON>) {
    if projected.contains_key(TYPENAME) {
        return;
    }
    if let Some(typename) = source.get(TYPENAME) {
        projected.insert(ByteString::from(TYPENAME), typename.clone());
    }
}
