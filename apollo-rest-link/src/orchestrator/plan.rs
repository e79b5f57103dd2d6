//! Checks run on an operation before any request is sent.

use http::Method;
use indexmap::IndexSet;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;

use crate::error::QueryShapeError;
use crate::operation::Field;
use crate::operation::Operation;
use crate::operation::OperationKind;
use crate::operation::SelectionSet;

const MUTATION_METHODS: [Method; 4] = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

/// Reject operations that cannot run: subscriptions, HTTP methods the
/// operation kind does not allow, export cycles and parameters nothing can
/// provide.
pub(crate) fn validate(
    operation: &Operation,
    variables: &Map<ByteString, JSON>,
) -> Result<(), QueryShapeError> {
    if operation.kind() == OperationKind::Subscription {
        return Err(QueryShapeError::SubscriptionNotSupported);
    }
    let available: IndexSet<String> = variables
        .keys()
        .map(|name| name.as_str().to_string())
        .collect();
    validate_selection_set(
        operation.kind(),
        operation.selection_set(),
        variables,
        &available,
    )
}

fn validate_selection_set(
    kind: OperationKind,
    selection_set: &SelectionSet,
    variables: &Map<ByteString, JSON>,
    available: &IndexSet<String>,
) -> Result<(), QueryShapeError> {
    check_cycles(selection_set)?;

    for (index, field) in selection_set.fields.iter().enumerate() {
        let mut visible = available.clone();
        for dependency in &selection_set.dependencies[index] {
            visible.extend(
                selection_set.fields[*dependency]
                    .provides()
                    .iter()
                    .cloned(),
            );
        }

        if let Some(spec) = field.rest() {
            check_method(kind, field, spec.method())?;
            for param in spec.required_parameters() {
                // An argument bound to an unset variable provides nothing.
                let argument = field
                    .arguments
                    .get(param)
                    .is_some_and(|value| value.resolve(variables).is_some());
                if !argument && !visible.contains(param) {
                    return Err(QueryShapeError::MissingParams {
                        field: field.response_key().to_string(),
                        param: param.to_string(),
                    });
                }
            }
        }

        validate_selection_set(kind, &field.selection_set, variables, &visible)?;
    }
    Ok(())
}

fn check_method(kind: OperationKind, field: &Field, method: &Method) -> Result<(), QueryShapeError> {
    match kind {
        OperationKind::Query if method != Method::GET => {
            Err(QueryShapeError::UnsupportedQueryMethod {
                field: field.response_key().to_string(),
                method: method.to_string(),
            })
        }
        OperationKind::Mutation if !MUTATION_METHODS.contains(method) => {
            Err(QueryShapeError::UnsupportedMutationMethod {
                field: field.response_key().to_string(),
                method: method.to_string(),
            })
        }
        _ => Ok(()),
    }
}

/// Sibling fields waiting on each other's exports would never start.
fn check_cycles(selection_set: &SelectionSet) -> Result<(), QueryShapeError> {
    let fields = &selection_set.fields;
    let mut done = vec![false; fields.len()];
    loop {
        let ready: Vec<usize> = (0..fields.len())
            .filter(|index| {
                !done[*index]
                    && selection_set.dependencies[*index]
                        .iter()
                        .all(|dependency| done[*dependency])
            })
            .collect();
        if ready.is_empty() {
            break;
        }
        for index in ready {
            done[index] = true;
        }
    }

    let Some(blocked) = done.iter().position(|done| !done) else {
        return Ok(());
    };
    let other = selection_set.dependencies[blocked]
        .iter()
        .copied()
        .find(|dependency| !done[*dependency])
        .unwrap_or(blocked);
    Err(QueryShapeError::CircularExports {
        first: fields[blocked].response_key().to_string(),
        second: fields[other].response_key().to_string(),
    })
}
