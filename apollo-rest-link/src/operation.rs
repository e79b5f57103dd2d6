//! The typed selection tree executed by the link.

use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::IndexSet;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;

use crate::error::QueryShapeError;
use crate::registry::Registry;
use crate::spec::RestCallSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub(crate) const fn root_type_name(self) -> &'static str {
        match self {
            OperationKind::Query => "Query",
            OperationKind::Mutation => "Mutation",
            OperationKind::Subscription => "Subscription",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        })
    }
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub(crate) kind: OperationKind,
    pub(crate) name: Option<String>,
    pub(crate) selection_set: SelectionSet,
    /// Default values declared on the operation's variable definitions.
    pub(crate) variable_defaults: Map<ByteString, JSON>,
}

impl Operation {
    pub fn new(kind: OperationKind, fields: Vec<Field>) -> Self {
        Self {
            kind,
            name: None,
            selection_set: SelectionSet::new(fields),
            variable_defaults: Map::new(),
        }
    }

    pub fn query(fields: Vec<Field>) -> Self {
        Self::new(OperationKind::Query, fields)
    }

    pub fn mutation(fields: Vec<Field>) -> Self {
        Self::new(OperationKind::Mutation, fields)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use `value` for the variable `name` when a request does not provide it.
    pub fn with_variable_default(mut self, name: impl Into<String>, value: JSON) -> Self {
        self.variable_defaults
            .insert(ByteString::from(name.into()), value);
        self
    }

    /// Build an operation from a GraphQL document annotated with `@rest` and
    /// `@export` directives. Functions referenced by the directives are looked
    /// up in `registry`.
    pub fn parse(
        source: &str,
        operation_name: Option<&str>,
        registry: &Registry,
    ) -> Result<Self, QueryShapeError> {
        crate::spec::directives::parse_operation(source, operation_name, registry)
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn selection_set(&self) -> &SelectionSet {
        &self.selection_set
    }

    /// Fill in declared defaults for the variables missing from `variables`.
    /// A variable explicitly set to `null` keeps its value.
    pub(crate) fn apply_variable_defaults(&self, variables: &mut Map<ByteString, JSON>) {
        for (name, value) in &self.variable_defaults {
            if !variables.contains_key(name.as_str()) {
                variables.insert(name.clone(), value.clone());
            }
        }
    }
}

/// A field argument, possibly referencing operation variables.
#[derive(Clone, Debug, PartialEq)]
pub enum InputValue {
    Variable(String),
    Const(JSON),
    List(Vec<InputValue>),
    Object(IndexMap<String, InputValue>),
}

impl InputValue {
    pub fn variable(name: impl Into<String>) -> Self {
        InputValue::Variable(name.into())
    }

    /// The value of this argument once variables are substituted. Returns `None`
    /// for a variable that was not provided.
    pub(crate) fn resolve(&self, variables: &Map<ByteString, JSON>) -> Option<JSON> {
        match self {
            InputValue::Variable(name) => variables.get(name.as_str()).cloned(),
            InputValue::Const(value) => Some(value.clone()),
            InputValue::List(items) => Some(JSON::Array(
                items
                    .iter()
                    .map(|item| item.resolve(variables).unwrap_or(JSON::Null))
                    .collect(),
            )),
            InputValue::Object(fields) => Some(JSON::Object(
                fields
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .resolve(variables)
                            .map(|value| (ByteString::from(name.as_str()), value))
                    })
                    .collect(),
            )),
        }
    }
}

impl From<JSON> for InputValue {
    fn from(value: JSON) -> Self {
        InputValue::Const(value)
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) arguments: IndexMap<String, InputValue>,
    pub(crate) rest: Option<Arc<RestCallSpec>>,
    pub(crate) export: Option<String>,
    pub(crate) selection_set: SelectionSet,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            arguments: IndexMap::default(),
            rest: None,
            export: None,
            selection_set: SelectionSet::default(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    pub fn with_rest(mut self, spec: RestCallSpec) -> Self {
        self.rest = Some(Arc::new(spec));
        self
    }

    /// Export the resolved value of this field under `name`.
    pub fn with_export(mut self, name: impl Into<String>) -> Self {
        self.export = Some(name.into());
        self
    }

    pub fn with_selections(mut self, fields: Vec<Field>) -> Self {
        self.selection_set = SelectionSet::new(fields);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key of this field in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn rest(&self) -> Option<&RestCallSpec> {
        self.rest.as_deref()
    }

    /// Parameters the call on this field needs and its own arguments do not
    /// provide.
    fn call_parameters(&self) -> IndexSet<String> {
        self.rest
            .iter()
            .flat_map(|spec| spec.parameters())
            .filter(|name| !self.arguments.contains_key(*name))
            .map(str::to_string)
            .collect()
    }

    /// Export names needed somewhere in this field that must come from outside it.
    fn requires(&self) -> IndexSet<String> {
        let mut requires = self.call_parameters();
        requires.extend(
            self.selection_set
                .requires
                .difference(&self.selection_set.provides)
                .cloned(),
        );
        requires
    }

    /// Export names produced by this field or any field below it.
    pub(crate) fn provides(&self) -> IndexSet<String> {
        let mut provides: IndexSet<String> = self.export.iter().cloned().collect();
        provides.extend(self.selection_set.provides.iter().cloned());
        provides
    }
}

/// The fields selected on one object, with the export dependencies between
/// them.
#[derive(Clone, Debug, Default)]
pub struct SelectionSet {
    pub(crate) fields: Vec<Field>,
    /// For every field, the indices of the sibling fields it waits for.
    pub(crate) dependencies: Vec<Vec<usize>>,
    requires: IndexSet<String>,
    provides: IndexSet<String>,
}

impl SelectionSet {
    pub fn new(fields: Vec<Field>) -> Self {
        let requires: Vec<IndexSet<String>> = fields.iter().map(Field::requires).collect();
        let provides: Vec<IndexSet<String>> = fields.iter().map(Field::provides).collect();

        let dependencies = requires
            .iter()
            .enumerate()
            .map(|(index, required)| {
                provides
                    .iter()
                    .enumerate()
                    .filter(|(other, provided)| {
                        *other != index && !required.is_disjoint(provided)
                    })
                    .map(|(other, _)| other)
                    .collect()
            })
            .collect();

        Self {
            fields,
            dependencies,
            requires: requires.into_iter().flatten().collect(),
            provides: provides.into_iter().flatten().collect(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every export name produced inside this selection set.
    pub(crate) fn provides(&self) -> &IndexSet<String> {
        &self.provides
    }
}
