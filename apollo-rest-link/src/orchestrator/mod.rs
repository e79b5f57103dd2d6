//! Runs an operation: every `@rest` field becomes one request, fields waiting on
//! `@export`ed values start once their producers are done, and responses are
//! assembled into a tree shaped like the selection.

pub(crate) mod plan;
pub(crate) mod request;
pub(crate) mod response;

use futures::StreamExt;
use futures::future::BoxFuture;
use futures::future::try_join_all;
use futures::stream::FuturesUnordered;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;

use crate::context::RequestContext;
use crate::error::NetworkError;
use crate::error::QueryShapeError;
use crate::error::RestLinkError;
use crate::link::Inner;
use crate::operation::Field;
use crate::operation::Operation;
use crate::operation::SelectionSet;
use crate::spec::RestCallSpec;
use crate::type_patcher::TYPENAME;

/// Values exported with `@export(as:)`, by export name.
type Exports = Map<ByteString, JSON>;

pub(crate) async fn execute(
    link: &Inner,
    operation: &Operation,
    mut variables: Map<ByteString, JSON>,
    context: &RequestContext,
) -> Result<JSON, RestLinkError> {
    operation.apply_variable_defaults(&mut variables);
    plan::validate(operation, &variables)?;

    let execution = Execution {
        link,
        context,
        variables,
        root_type_name: operation.kind().root_type_name(),
    };
    let (data, _) = execution
        .resolve_selection_set(None, operation.selection_set(), Exports::new())
        .await?;
    Ok(JSON::Object(data))
}

struct Execution<'a> {
    link: &'a Inner,
    context: &'a RequestContext,
    variables: Map<ByteString, JSON>,
    root_type_name: &'static str,
}

impl<'a> Execution<'a> {
    /// Resolve the fields selected on `parent`, or on the root when there is no
    /// parent. Returns the projected object and every value exported below it.
    fn resolve_selection_set<'b>(
        &'b self,
        parent: Option<&'b Map<ByteString, JSON>>,
        selection_set: &'b SelectionSet,
        exports: Exports,
    ) -> BoxFuture<'b, Result<(Map<ByteString, JSON>, Exports), RestLinkError>> {
        Box::pin(async move {
            let fields = selection_set.fields();
            let mut results: Vec<Option<(JSON, Exports)>> = vec![None; fields.len()];
            let mut started = vec![false; fields.len()];
            let mut running = FuturesUnordered::new();

            loop {
                for index in 0..fields.len() {
                    let dependencies = &selection_set.dependencies[index];
                    if started[index]
                        || !dependencies
                            .iter()
                            .all(|dependency| results[*dependency].is_some())
                    {
                        continue;
                    }
                    started[index] = true;

                    let mut visible = exports.clone();
                    for dependency in dependencies {
                        if let Some((_, provided)) = &results[*dependency] {
                            visible.extend(provided.clone());
                        }
                    }
                    let field = &fields[index];
                    running.push(async move { (index, self.resolve_field(parent, field, visible).await) });
                }

                match running.next().await {
                    Some((index, result)) => results[index] = Some(result?),
                    None => break,
                }
            }

            let mut object = Map::new();
            let mut provided = Exports::new();
            for (field, result) in fields.iter().zip(results) {
                let Some((value, exports)) = result else {
                    return Err(QueryShapeError::CircularExports {
                        first: field.response_key().to_string(),
                        second: field.response_key().to_string(),
                    }
                    .into());
                };
                object.insert(ByteString::from(field.response_key()), value);
                provided.extend(exports);
            }
            if let Some(parent) = parent {
                response::keep_typename(parent, &mut object);
            }
            Ok((object, provided))
        })
    }

    /// Resolve one field, returning its value and the exports of its subtree.
    async fn resolve_field(
        &self,
        parent: Option<&Map<ByteString, JSON>>,
        field: &Field,
        exports: Exports,
    ) -> Result<(JSON, Exports), RestLinkError> {
        let (value, mut provided) = match field.rest() {
            Some(spec) => {
                let data = self.call(field, spec, &exports).await?;
                self.resolve_value(&data, &field.selection_set, exports)
                    .await?
            }
            None => {
                let data = match parent {
                    Some(parent) => parent.get(field.name()).cloned().unwrap_or(JSON::Null),
                    None if field.name() == TYPENAME => {
                        JSON::String(ByteString::from(self.root_type_name))
                    }
                    None => JSON::Null,
                };
                if field.selection_set.is_empty() {
                    (data, Exports::new())
                } else {
                    self.resolve_value(&data, &field.selection_set, exports)
                        .await?
                }
            }
        };
        if let Some(name) = &field.export {
            provided.insert(ByteString::from(name.as_str()), value.clone());
        }
        Ok((value, provided))
    }

    /// Project `value` onto `selection_set`, element by element for lists.
    fn resolve_value<'b>(
        &'b self,
        value: &'b JSON,
        selection_set: &'b SelectionSet,
        exports: Exports,
    ) -> BoxFuture<'b, Result<(JSON, Exports), RestLinkError>> {
        Box::pin(async move {
            match value {
                JSON::Object(object) => {
                    let (object, provided) = self
                        .resolve_selection_set(Some(object), selection_set, exports)
                        .await?;
                    Ok((JSON::Object(object), provided))
                }
                JSON::Array(items) => {
                    let resolved = try_join_all(
                        items
                            .iter()
                            .map(|item| self.resolve_value(item, selection_set, exports.clone())),
                    )
                    .await?;
                    let mut provided = Exports::new();
                    let mut values = Vec::with_capacity(resolved.len());
                    for (value, exports) in resolved {
                        values.push(value);
                        provided.extend(exports);
                    }
                    Ok((JSON::Array(values), provided))
                }
                other => Ok((other.clone(), Exports::new())),
            }
        })
    }

    /// Send the request of one `@rest` field. Parameters are the operation
    /// variables, then the visible exports, then the field's own arguments,
    /// each shadowing the previous ones.
    async fn call(
        &self,
        field: &Field,
        spec: &RestCallSpec,
        exports: &Exports,
    ) -> Result<JSON, RestLinkError> {
        let arguments: Map<ByteString, JSON> = field
            .arguments
            .iter()
            .filter_map(|(name, value)| {
                value
                    .resolve(&self.variables)
                    .map(|value| (ByteString::from(name.as_str()), value))
            })
            .collect();
        let mut params = self.variables.clone();
        params.extend(exports.clone());
        params.extend(arguments.clone());

        let request = request::make_request(
            self.link,
            self.context,
            field,
            spec,
            &params,
            &arguments,
            exports,
        )
        .await?;
        let uri = request.uri.to_string();
        tracing::debug!(
            field = field.response_key(),
            method = %request.method,
            uri = %uri,
            "sending REST request"
        );

        let response = self
            .link
            .fetch
            .fetch(request)
            .await
            .map_err(|err| {
                tracing::error!(uri = %uri, error = %err, "HTTP fetch failed");
                NetworkError::Transport {
                    uri: uri.clone(),
                    reason: err.to_string(),
                }
            })?;
        response::handle_response(self.link, spec, &uri, response)
    }
}
