//! Link errors.
//!
//! Errors are split by the moment they can happen: [`ConfigurationError`] when a
//! [`crate::RestLink`] is built, [`QueryShapeError`] before any network I/O for an
//! operation, [`NetworkError`] and [`TransformError`] while the operation runs.
use displaydoc::Display;
use http::StatusCode;
use serde_json_bytes::Value;
use thiserror::Error;

/// Errors raised while building a link from its configuration.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// a rest link must be configured with either `uri` or `endpoints`
    MissingEndpoints,

    /// the default uri '{uri}' does not match the default entry '{endpoint}' of `endpoints`
    DefaultEndpointMismatch {
        /// The root `uri`.
        uri: String,
        /// The `""` entry of `endpoints`.
        endpoint: String,
    },

    /// invalid uri '{uri}' for endpoint '{key}': {reason}
    InvalidEndpointUri {
        /// The endpoint key, `""` for the default endpoint.
        key: String,
        /// The configured uri.
        uri: String,
        /// Why it could not be parsed.
        reason: String,
    },

    /// invalid header '{name}': {reason}
    InvalidHeader {
        /// The configured header name.
        name: String,
        /// Why the header was rejected.
        reason: String,
    },

    /// a type patcher was registered for an empty type name
    EmptyTypePatcherKey,

    /// could not read configuration: {0}
    InvalidYaml(String),
}

/// Errors in the shape of an operation or its `@rest` annotations.
///
/// These are always raised before any request is sent for the offending field.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[ignore_extra_doc_attributes]
#[non_exhaustive]
pub enum QueryShapeError {
    /// @rest(type: "{type_name}") must set exactly one of `path` or `pathBuilder`, but both were set
    BothPathAndPathBuilder {
        /// Declared type of the call.
        type_name: String,
    },

    /// @rest(type: "{type_name}") must set exactly one of `path` or `pathBuilder`, but neither was set
    NeitherPathNorPathBuilder {
        /// Declared type of the call.
        type_name: String,
    },

    /// malformed placeholder at position {position} of path '{template}'
    MalformedPlaceholder {
        /// The path template.
        template: String,
        /// Byte offset of the offending `:`.
        position: usize,
    },

    /// A `query` operation can only support GET requests but got {method} on field '{field}'
    UnsupportedQueryMethod {
        /// Response key of the field.
        field: String,
        /// The declared HTTP method.
        method: String,
    },

    /// A `mutation` operation does not support that HTTP-verb: {method} on field '{field}'
    UnsupportedMutationMethod {
        /// Response key of the field.
        field: String,
        /// The declared HTTP method.
        method: String,
    },

    /// A `subscription` operation is not supported yet
    SubscriptionNotSupported,

    /// Missing params to run query, specify it in the query params or use an export directive: ':{param}' required by field '{field}'
    MissingParams {
        /// Response key of the field.
        field: String,
        /// The unresolved parameter name.
        param: String,
    },

    /// fields '{first}' and '{second}' depend on each other's exports
    CircularExports {
        /// Response key of one field of the cycle.
        first: String,
        /// Response key of another field of the cycle.
        second: String,
    },

    /// invalid @{directive} directive on field '{field}': {reason}
    InvalidDirective {
        /// Name of the directive.
        directive: String,
        /// Name of the annotated field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// invalid operation document: {0}
    InvalidDocument(String),

    /// no endpoint configured for key '{0}' and no default endpoint to fall back to
    UnknownEndpoint(String),

    /// invalid request uri '{uri}': {reason}
    InvalidUri {
        /// The uri assembled from endpoint and path.
        uri: String,
        /// Why it could not be parsed.
        reason: String,
    },
}

/// Errors returned by the fetch capability or the remote endpoint.
#[derive(Error, Display, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum NetworkError {
    /// HTTP fetch of '{uri}' failed with status {status}
    Status {
        /// Requested uri.
        uri: String,
        /// Non-success status.
        status: StatusCode,
        /// Raw response body.
        body: String,
        /// Response body parsed as JSON, when it is JSON.
        json: Option<Value>,
    },

    /// HTTP fetch of '{uri}' failed: {reason}
    Transport {
        /// Requested uri.
        uri: String,
        /// The transport failure.
        reason: String,
    },

    /// response from '{uri}' is not valid JSON: {reason}
    InvalidResponseBody {
        /// Requested uri.
        uri: String,
        /// The deserialization failure.
        reason: String,
    },
}

impl NetworkError {
    /// The HTTP status, when the endpoint answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            NetworkError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors raised by user-supplied functions.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransformError {
    /// type patcher for '{type_name}' failed: {reason}
    TypePatcher {
        /// The type being patched.
        type_name: String,
        /// The patcher's error.
        reason: String,
    },

    /// field name transform failed on key '{key}': {reason}
    FieldName {
        /// The key being rewritten.
        key: String,
        /// The transform's error.
        reason: String,
    },

    /// path builder of field '{field}' failed: {reason}
    PathBuilder {
        /// Response key of the field.
        field: String,
        /// The builder's error.
        reason: String,
    },

    /// body builder of field '{field}' failed: {reason}
    BodyBuilder {
        /// Response key of the field.
        field: String,
        /// The builder's error.
        reason: String,
    },

    /// could not serialize request body of field '{field}': {reason}
    BodySerialization {
        /// Response key of the field.
        field: String,
        /// The serializer's error.
        reason: String,
    },
}

/// Any error surfaced by executing an operation.
#[derive(Error, Display, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum RestLinkError {
    /// {0}
    QueryShape(#[from] QueryShapeError),

    /// {0}
    Network(#[from] NetworkError),

    /// {0}
    Transform(#[from] TransformError),
}
