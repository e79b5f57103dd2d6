//! Typed `@rest` call metadata.
//!
//! A [`RestCallSpec`] is attached to every field of an [`crate::Operation`]
//! that needs a request. It is built either programmatically with
//! [`RestCallSpec::builder`] or from a GraphQL document by [`directives`].

pub(crate) mod directives;

use std::sync::Arc;

use futures::future::BoxFuture;
use http::Method;
use indexmap::IndexSet;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;
use tower::BoxError;

use crate::error::QueryShapeError;
use crate::field_names::FieldNameTransform;
use crate::headers::HeaderMergePolicy;
use crate::headers::HeaderSet;
use crate::path_template::PathBuilder;
use crate::path_template::PathSource;
use crate::path_template::PathTemplate;

/// Parameter sent as the body when neither a body key nor a builder is set.
pub const DEFAULT_BODY_KEY: &str = "input";

/// How the request body of a call is produced.
#[derive(Clone, Debug)]
pub enum BodySource {
    /// The `input` parameter, or the field arguments for POST, PUT and PATCH.
    Default,
    /// A single named parameter.
    Key(String),
    /// A user function; its output is sent verbatim.
    Builder(BodyBuilder),
}

type BodyBuilderFn =
    dyn Fn(Map<ByteString, JSON>) -> BoxFuture<'static, Result<JSON, BoxError>> + Send + Sync;

/// Builds a request body from the fully resolved parameters of a call.
#[derive(Clone)]
pub struct BodyBuilder(Arc<BodyBuilderFn>);

impl BodyBuilder {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&Map<ByteString, JSON>) -> Result<JSON, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(
            move |params| -> BoxFuture<'static, Result<JSON, BoxError>> {
                Box::pin(futures::future::ready(build(&params)))
            },
        ))
    }

    pub fn new_async<F>(build: F) -> Self
    where
        F: Fn(Map<ByteString, JSON>) -> BoxFuture<'static, Result<JSON, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(build))
    }

    pub async fn build(&self, params: Map<ByteString, JSON>) -> Result<JSON, BoxError> {
        (self.0)(params).await
    }
}

impl std::fmt::Debug for BodyBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BodyBuilder")
    }
}

/// Everything needed to turn one field into one HTTP request.
#[derive(Clone, Debug)]
pub struct RestCallSpec {
    pub(crate) type_name: String,
    pub(crate) path: PathSource,
    pub(crate) endpoint: Option<String>,
    pub(crate) method: Method,
    pub(crate) body: BodySource,
    pub(crate) field_name_normalizer: Option<FieldNameTransform>,
    pub(crate) field_name_denormalizer: Option<FieldNameTransform>,
    pub(crate) headers: HeaderSet,
    pub(crate) headers_merge_policy: Option<HeaderMergePolicy>,
}

#[buildstructor::buildstructor]
impl RestCallSpec {
    /// Exactly one of `path` and `path_builder` must be given.
    /// `method` defaults to GET.
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)] // Used through a builder, not directly
    fn new(
        type_name: String,
        path: Option<String>,
        path_builder: Option<PathBuilder>,
        endpoint: Option<String>,
        method: Option<Method>,
        body_key: Option<String>,
        body_builder: Option<BodyBuilder>,
        field_name_normalizer: Option<FieldNameTransform>,
        field_name_denormalizer: Option<FieldNameTransform>,
        headers: Option<HeaderSet>,
        headers_merge_policy: Option<HeaderMergePolicy>,
    ) -> Result<Self, QueryShapeError> {
        let path = match (path, path_builder) {
            (Some(_), Some(_)) => {
                return Err(QueryShapeError::BothPathAndPathBuilder { type_name });
            }
            (None, None) => return Err(QueryShapeError::NeitherPathNorPathBuilder { type_name }),
            (Some(path), None) => PathSource::Template(PathTemplate::parse(&path)?),
            (None, Some(builder)) => PathSource::Builder(builder),
        };
        let body = match (body_builder, body_key) {
            (Some(builder), _) => BodySource::Builder(builder),
            (None, Some(key)) => BodySource::Key(key),
            (None, None) => BodySource::Default,
        };
        Ok(Self {
            type_name,
            path,
            endpoint,
            method: method.unwrap_or(Method::GET),
            body,
            field_name_normalizer,
            field_name_denormalizer,
            headers: headers.unwrap_or_default(),
            headers_merge_policy,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Parameter names this call needs before it can run.
    pub(crate) fn parameters(&self) -> IndexSet<&str> {
        let mut parameters = self.path.parameters();
        if let BodySource::Key(key) = &self.body {
            parameters.insert(key.as_str());
        }
        parameters
    }

    /// Parameters without which the request cannot be built. Query string
    /// placeholders are optional.
    pub(crate) fn required_parameters(&self) -> IndexSet<&str> {
        let mut parameters = self.path.required_parameters();
        if let BodySource::Key(key) = &self.body {
            parameters.insert(key.as_str());
        }
        parameters
    }
}
