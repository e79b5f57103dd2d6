//! The link: resolves `@rest` operations against REST endpoints.

use std::collections::HashMap;
use std::sync::Arc;
use std::task::Poll;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;
use tokio_util::sync::CancellationToken;
use tower::BoxError;

use crate::configuration::Configuration;
use crate::configuration::EndpointTable;
use crate::context::RequestContext;
use crate::error::ConfigurationError;
use crate::error::QueryShapeError;
use crate::error::RestLinkError;
use crate::fetch::Fetch;
use crate::fetch::ReqwestFetch;
use crate::field_names::FieldNameTransform;
use crate::headers::Credentials;
use crate::headers::HeaderMergePolicy;
use crate::headers::HeaderSet;
use crate::operation::Operation;
use crate::orchestrator;
use crate::registry::Registry;
use crate::type_patcher::Patch;
use crate::type_patcher::TypePatcher;

/// Link level state, shared by every request.
pub(crate) struct Inner {
    pub(crate) endpoints: EndpointTable,
    pub(crate) headers: HeaderSet,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) headers_merge_policy: Option<HeaderMergePolicy>,
    pub(crate) field_name_normalizer: Option<FieldNameTransform>,
    pub(crate) field_name_denormalizer: Option<FieldNameTransform>,
    pub(crate) type_patcher: TypePatcher,
    pub(crate) registry: Registry,
    pub(crate) fetch: Arc<dyn Fetch>,
}

/// Resolves operations whose fields carry `@rest` directives.
///
/// Cloning is cheap; clones share their configuration.
#[derive(Clone)]
pub struct RestLink {
    inner: Arc<Inner>,
}

#[buildstructor::buildstructor]
impl RestLink {
    /// Field name transforms passed here replace the built-in cases named in
    /// `configuration`. Requests go through [`ReqwestFetch`] unless `fetch` is set.
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)] // Used through a builder, not directly
    fn new(
        configuration: Configuration,
        fetch: Option<Arc<dyn Fetch>>,
        type_patchers: HashMap<String, Patch>,
        field_name_normalizer: Option<FieldNameTransform>,
        field_name_denormalizer: Option<FieldNameTransform>,
        headers_merge_policy: Option<HeaderMergePolicy>,
        registry: Option<Registry>,
    ) -> Result<Self, ConfigurationError> {
        let endpoints = configuration.endpoint_table()?;
        let headers = configuration.header_set()?;
        let type_patcher = TypePatcher::new(type_patchers)?;

        Ok(Self {
            inner: Arc::new(Inner {
                endpoints,
                headers,
                credentials: configuration.credentials,
                headers_merge_policy,
                field_name_normalizer: field_name_normalizer
                    .or_else(|| configuration.field_name_normalizer.map(FieldNameTransform::case)),
                field_name_denormalizer: field_name_denormalizer.or_else(|| {
                    configuration
                        .field_name_denormalizer
                        .map(FieldNameTransform::case)
                }),
                type_patcher,
                registry: registry.unwrap_or_default(),
                fetch: fetch.unwrap_or_else(|| Arc::new(ReqwestFetch::default())),
            }),
        })
    }

    /// Parse a GraphQL document annotated with `@rest` and `@export`.
    /// Builders and transforms named by the directives come from the link's
    /// registry.
    pub fn parse_operation(
        &self,
        source: &str,
        operation_name: Option<&str>,
    ) -> Result<Operation, QueryShapeError> {
        Operation::parse(source, operation_name, &self.inner.registry)
    }

    /// Run every request the operation needs and assemble the result.
    ///
    /// The operation is checked before anything is sent. Any failure aborts
    /// the whole operation; there are no partial results.
    #[tracing::instrument(
        skip_all,
        fields(
            operation.kind = %request.operation.kind(),
            operation.name = request.operation.name().unwrap_or_default(),
        )
    )]
    pub async fn execute(&self, request: Request) -> Result<Response, RestLinkError> {
        let data = orchestrator::execute(
            &self.inner,
            &request.operation,
            request.variables,
            &request.context,
        )
        .await?;
        Ok(Response { data })
    }

    /// Like [`RestLink::execute`], but gives up as soon as `token` is
    /// cancelled. Returns `None` when cancelled, even if the operation failed.
    pub async fn execute_with_cancellation(
        &self,
        request: Request,
        token: CancellationToken,
    ) -> Option<Result<Response, RestLinkError>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("operation cancelled");
                None
            }
            result = self.execute(request) => (!token.is_cancelled()).then_some(result),
        }
    }
}

impl std::fmt::Debug for RestLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestLink")
            .field("endpoints", &self.inner.endpoints)
            .field("headers", &self.inner.headers)
            .field("credentials", &self.inner.credentials)
            .finish_non_exhaustive()
    }
}

impl tower::Service<Request> for RestLink {
    type Response = Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let link = self.clone();
        Box::pin(async move { link.execute(request).await.map_err(BoxError::from) })
    }
}

/// An operation to execute, with its variables and request context.
#[derive(Clone, Debug)]
pub struct Request {
    pub operation: Arc<Operation>,
    pub variables: Map<ByteString, JSON>,
    pub context: RequestContext,
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    fn new(
        operation: Operation,
        variables: HashMap<String, JSON>,
        context: Option<RequestContext>,
    ) -> Self {
        Self {
            operation: Arc::new(operation),
            variables: variables
                .into_iter()
                .map(|(name, value)| (ByteString::from(name), value))
                .collect(),
            context: context.unwrap_or_default(),
        }
    }
}

/// The assembled data, shaped like the operation's selection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Response {
    pub data: JSON,
}
