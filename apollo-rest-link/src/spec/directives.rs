//! Turns `@rest` and `@export` directives of a GraphQL document into a typed
//! [`Operation`].
//!
//! ```graphql
//! query PostWithTag($id: ID!) {
//!   post(id: $id) @rest(type: "Post", path: "/post/:id") {
//!     title
//!     tagId @export(as: "tagId")
//!     tag @rest(type: "Tag", path: "/tag/:tagId") { name }
//!   }
//! }
//! ```

use std::collections::HashMap;

use apollo_compiler::Node;
use apollo_compiler::ast;
use apollo_compiler::ast::OperationType;
use http::Method;
use indexmap::IndexMap;
use indexmap::map::Entry;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;

use crate::error::QueryShapeError;
use crate::field_names::FieldNameCase;
use crate::field_names::FieldNameTransform;
use crate::headers::HeaderSet;
use crate::operation::Field;
use crate::operation::InputValue;
use crate::operation::Operation;
use crate::operation::OperationKind;
use crate::operation::SelectionSet;
use crate::registry::Registry;
use crate::spec::RestCallSpec;

const REST_DIRECTIVE: &str = "rest";
const EXPORT_DIRECTIVE: &str = "export";

pub(crate) fn parse_operation(
    source: &str,
    operation_name: Option<&str>,
    registry: &Registry,
) -> Result<Operation, QueryShapeError> {
    let document = ast::Document::parse(source, "operation.graphql")
        .map_err(|invalid| QueryShapeError::InvalidDocument(invalid.errors.to_string()))?;

    let mut operations = vec![];
    let mut fragments = HashMap::new();
    for definition in &document.definitions {
        match definition {
            ast::Definition::OperationDefinition(operation) => operations.push(operation),
            ast::Definition::FragmentDefinition(fragment) => {
                fragments.insert(fragment.name.as_str(), fragment);
            }
            _ => {}
        }
    }

    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|operation| {
                operation
                    .name
                    .as_ref()
                    .is_some_and(|operation_name| operation_name.as_str() == name)
            })
            .ok_or_else(|| {
                QueryShapeError::InvalidDocument(format!("no operation named '{name}'"))
            })?,
        None => match operations.as_slice() {
            [operation] => *operation,
            [] => {
                return Err(QueryShapeError::InvalidDocument(
                    "the document contains no operation".to_string(),
                ));
            }
            _ => {
                return Err(QueryShapeError::InvalidDocument(
                    "the document contains several operations, an operation name is required"
                        .to_string(),
                ));
            }
        },
    };

    let kind = match operation.operation_type {
        OperationType::Query => OperationKind::Query,
        OperationType::Mutation => OperationKind::Mutation,
        OperationType::Subscription => OperationKind::Subscription,
    };

    let converter = Converter {
        registry,
        fragments,
    };
    let fields = converter.selections(&operation.selection_set, &mut vec![])?;
    let mut converted = Operation::new(kind, fields);
    for variable in &operation.variables {
        if let Some(value) = variable
            .default_value
            .as_ref()
            .and_then(|value| input_value(value).resolve(&Map::new()))
        {
            converted = converted.with_variable_default(variable.name.as_str(), value);
        }
    }
    Ok(match &operation.name {
        Some(name) => converted.with_name(name.as_str()),
        None => converted,
    })
}

struct Converter<'a> {
    registry: &'a Registry,
    fragments: HashMap<&'a str, &'a Node<ast::FragmentDefinition>>,
}

impl<'a> Converter<'a> {
    /// Flatten fragments into a plain field list.
    fn selections(
        &self,
        selections: &'a [ast::Selection],
        visiting: &mut Vec<&'a str>,
    ) -> Result<Vec<Field>, QueryShapeError> {
        let mut fields = vec![];
        for selection in selections {
            match selection {
                ast::Selection::Field(field) => fields.push(self.field(field, visiting)?),
                ast::Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    let fragment: &'a Node<ast::FragmentDefinition> =
                        self.fragments.get(name).copied().ok_or_else(|| {
                            QueryShapeError::InvalidDocument(format!("unknown fragment '{name}'"))
                        })?;
                    if visiting.contains(&name) {
                        return Err(QueryShapeError::InvalidDocument(format!(
                            "fragment '{name}' spreads itself"
                        )));
                    }
                    visiting.push(name);
                    fields.extend(self.selections(&fragment.selection_set, visiting)?);
                    visiting.pop();
                }
                ast::Selection::InlineFragment(inline) => {
                    fields.extend(self.selections(&inline.selection_set, visiting)?);
                }
            }
        }
        Ok(merge_fields(fields))
    }

    fn field(
        &self,
        field: &'a Node<ast::Field>,
        visiting: &mut Vec<&'a str>,
    ) -> Result<Field, QueryShapeError> {
        let mut converted = Field::new(field.name.as_str());
        if let Some(alias) = &field.alias {
            converted = converted.with_alias(alias.as_str());
        }
        for argument in &field.arguments {
            converted = converted.with_argument(argument.name.as_str(), input_value(&argument.value));
        }
        if let Some(directive) = field.directives.get(REST_DIRECTIVE) {
            converted = converted.with_rest(self.rest_call(field.name.as_str(), directive)?);
        }
        if let Some(directive) = field.directives.get(EXPORT_DIRECTIVE) {
            let invalid = |reason: String| QueryShapeError::InvalidDirective {
                directive: EXPORT_DIRECTIVE.to_string(),
                field: field.name.to_string(),
                reason,
            };
            let name = string_argument(directive, "as")
                .map_err(invalid)?
                .ok_or_else(|| invalid("missing required argument `as`".to_string()))?;
            converted = converted.with_export(name);
        }
        Ok(converted.with_selections(self.selections(&field.selection_set, visiting)?))
    }

    fn rest_call(
        &self,
        field: &str,
        directive: &ast::Directive,
    ) -> Result<RestCallSpec, QueryShapeError> {
        let invalid = |reason: String| QueryShapeError::InvalidDirective {
            directive: REST_DIRECTIVE.to_string(),
            field: field.to_string(),
            reason,
        };
        let string = |name: &str| string_argument(directive, name).map_err(invalid);
        let reference = |name: &str| reference_argument(directive, name).map_err(invalid);

        let type_name = string("type")?
            .ok_or_else(|| invalid("missing required argument `type`".to_string()))?;

        let path_builder = reference("pathBuilder")?
            .map(|name| {
                self.registry
                    .path_builder(&name)
                    .cloned()
                    .ok_or_else(|| invalid(format!("no path builder registered as '{name}'")))
            })
            .transpose()?;

        let body_builder = reference("bodyBuilder")?
            .map(|name| {
                self.registry
                    .body_builder(&name)
                    .cloned()
                    .ok_or_else(|| invalid(format!("no body builder registered as '{name}'")))
            })
            .transpose()?;

        let method = string("method")?
            .map(|method| {
                Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                    .map_err(|_| invalid(format!("invalid HTTP method '{method}'")))
            })
            .transpose()?;

        let field_name_transform = |name: String| {
            self.registry
                .field_name_transform(&name)
                .cloned()
                .or_else(|| FieldNameCase::parse(&name).map(FieldNameTransform::case))
                .ok_or_else(|| invalid(format!("no field name transform registered as '{name}'")))
        };
        let field_name_normalizer = reference("fieldNameNormalizer")?
            .map(field_name_transform)
            .transpose()?;
        let field_name_denormalizer = reference("fieldNameDenormalizer")?
            .map(field_name_transform)
            .transpose()?;

        let headers = directive
            .specified_argument_by_name("headers")
            .map(|value| header_set(value).map_err(invalid))
            .transpose()?;

        let headers_merge_policy = reference("headersMergePolicy")?
            .map(|name| {
                self.registry
                    .header_merge_policy(&name)
                    .cloned()
                    .ok_or_else(|| invalid(format!("no header merge policy registered as '{name}'")))
            })
            .transpose()?;

        RestCallSpec::builder()
            .type_name(type_name)
            .and_path(string("path")?)
            .and_path_builder(path_builder)
            .and_endpoint(string("endpoint")?)
            .and_method(method)
            .and_body_key(string("bodyKey")?)
            .and_body_builder(body_builder)
            .and_field_name_normalizer(field_name_normalizer)
            .and_field_name_denormalizer(field_name_denormalizer)
            .and_headers(headers)
            .and_headers_merge_policy(headers_merge_policy)
            .build()
    }
}

fn string_argument(directive: &ast::Directive, name: &str) -> Result<Option<String>, String> {
    match directive.specified_argument_by_name(name).map(|value| &**value) {
        None | Some(ast::Value::Null) => Ok(None),
        Some(ast::Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(format!("argument `{name}` must be a string, got {other}")),
    }
}

/// A reference to a registered function, either `$variable` or `"name"`.
fn reference_argument(directive: &ast::Directive, name: &str) -> Result<Option<String>, String> {
    match directive.specified_argument_by_name(name).map(|value| &**value) {
        None | Some(ast::Value::Null) => Ok(None),
        Some(ast::Value::Variable(variable)) => Ok(Some(variable.to_string())),
        Some(ast::Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(format!(
            "argument `{name}` must be a variable or a string, got {other}"
        )),
    }
}

/// `headers: [{ name: "x-api-key", value: "secret" }]`
fn header_set(value: &ast::Value) -> Result<HeaderSet, String> {
    let ast::Value::List(items) = value else {
        return Err(format!(
            "argument `headers` must be a list of {{ name, value }} objects, got {value}"
        ));
    };
    let mut headers = HeaderSet::new();
    for item in items {
        let entry = match &**item {
            ast::Value::Object(entry) => entry,
            other => return Err(format!("invalid header {other}")),
        };
        let get = |key: &str| {
            entry
                .iter()
                .find(|(name, _)| name.as_str() == key)
                .and_then(|(_, value)| value.as_str())
        };
        let (Some(name), Some(value)) = (get("name"), get("value")) else {
            return Err(format!("header {item} must have string `name` and `value`"));
        };
        headers
            .try_append(name, value)
            .map_err(|err| err.to_string())?;
    }
    Ok(headers)
}

/// Fields sharing a response key are selected once, with their sub-selections
/// combined.
fn merge_fields(fields: Vec<Field>) -> Vec<Field> {
    let mut merged: IndexMap<String, Field> = IndexMap::new();
    for field in fields {
        match merged.entry(field.response_key().to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(field);
            }
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if existing.rest.is_none() {
                    existing.rest = field.rest;
                }
                if existing.export.is_none() {
                    existing.export = field.export;
                }
                let mut selections = std::mem::take(&mut existing.selection_set.fields);
                selections.extend(field.selection_set.fields);
                existing.selection_set = SelectionSet::new(merge_fields(selections));
            }
        }
    }
    merged.into_values().collect()
}

fn input_value(value: &ast::Value) -> InputValue {
    match value {
        ast::Value::Null => InputValue::Const(JSON::Null),
        ast::Value::Variable(name) => InputValue::Variable(name.to_string()),
        ast::Value::Enum(name) => InputValue::Const(JSON::String(ByteString::from(name.as_str()))),
        ast::Value::String(value) => InputValue::Const(JSON::String(ByteString::from(value.as_str()))),
        ast::Value::Boolean(value) => InputValue::Const(JSON::Bool(*value)),
        ast::Value::Int(value) => {
            let text = value.to_string();
            let number = match text.parse::<i64>() {
                Ok(int) => Some(serde_json::Number::from(int)),
                Err(_) => text.parse::<f64>().ok().and_then(serde_json::Number::from_f64),
            };
            InputValue::Const(number.map(JSON::Number).unwrap_or(JSON::Null))
        }
        ast::Value::Float(value) => InputValue::Const(
            value
                .try_to_f64()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(JSON::Number)
                .unwrap_or(JSON::Null),
        ),
        ast::Value::List(items) => InputValue::List(items.iter().map(|item| input_value(item)).collect()),
        ast::Value::Object(fields) => InputValue::Object(
            fields
                .iter()
                .map(|(name, value)| (name.to_string(), input_value(value)))
                .collect::<IndexMap<_, _>>(),
        ),
    }
}
