//! Rewrites the keys of JSON trees.
//!
//! Responses are normalized into the field names used by the operation, and
//! request bodies are denormalized into the names the REST endpoint expects.

use std::sync::Arc;

use heck::ToKebabCase;
use heck::ToLowerCamelCase;
use heck::ToShoutySnakeCase;
use heck::ToSnakeCase;
use heck::ToUpperCamelCase;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;
use tower::BoxError;

use crate::error::TransformError;
use crate::type_patcher::TYPENAME;

/// Built-in key conventions.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum FieldNameCase {
    #[serde(rename = "camelCase")]
    CamelCase,
    #[serde(rename = "PascalCase")]
    PascalCase,
    #[serde(rename = "snake_case")]
    SnakeCase,
    #[serde(rename = "kebab-case")]
    KebabCase,
    #[serde(rename = "SCREAMING_SNAKE_CASE")]
    ScreamingSnakeCase,
}

impl FieldNameCase {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "camelCase" => Some(Self::CamelCase),
            "PascalCase" => Some(Self::PascalCase),
            "snake_case" => Some(Self::SnakeCase),
            "kebab-case" => Some(Self::KebabCase),
            "SCREAMING_SNAKE_CASE" => Some(Self::ScreamingSnakeCase),
            _ => None,
        }
    }

    fn convert(self, key: &str) -> String {
        match self {
            Self::CamelCase => key.to_lower_camel_case(),
            Self::PascalCase => key.to_upper_camel_case(),
            Self::SnakeCase => key.to_snake_case(),
            Self::KebabCase => key.to_kebab_case(),
            Self::ScreamingSnakeCase => key.to_shouty_snake_case(),
        }
    }
}

type TransformFn = dyn Fn(&str) -> Result<String, BoxError> + Send + Sync;

/// A function rewriting a single key.
#[derive(Clone)]
pub struct FieldNameTransform(Arc<TransformFn>);

impl FieldNameTransform {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(move |key: &str| Ok(transform(key))))
    }

    pub fn fallible<F>(transform: F) -> Self
    where
        F: Fn(&str) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }

    pub fn case(case: FieldNameCase) -> Self {
        Self::new(move |key| case.convert(key))
    }

    pub fn rename_key(&self, key: &str) -> Result<String, TransformError> {
        if key == TYPENAME {
            return Ok(key.to_string());
        }
        (self.0)(key).map_err(|err| TransformError::FieldName {
            key: key.to_string(),
            reason: err.to_string(),
        })
    }

    /// Rewrite every key of every object in `value`, leaving values alone.
    pub fn transform_keys(&self, value: &JSON) -> Result<JSON, TransformError> {
        match value {
            JSON::Object(object) => {
                let mut renamed = Map::new();
                for (key, child) in object.iter() {
                    renamed.insert(
                        ByteString::from(self.rename_key(key.as_str())?),
                        self.transform_keys(child)?,
                    );
                }
                Ok(JSON::Object(renamed))
            }
            JSON::Array(items) => items
                .iter()
                .map(|item| self.transform_keys(item))
                .collect::<Result<Vec<_>, _>>()
                .map(JSON::Array),
            other => Ok(other.clone()),
        }
    }
}

impl From<FieldNameCase> for FieldNameTransform {
    fn from(case: FieldNameCase) -> Self {
        Self::case(case)
    }
}

impl std::fmt::Debug for FieldNameTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldNameTransform")
    }
}

/// Pick the transform for one direction: a per-call transform wins over the
/// link level one.
pub(crate) fn select<'a>(
    call: Option<&'a FieldNameTransform>,
    link: Option<&'a FieldNameTransform>,
) -> Option<&'a FieldNameTransform> {
    call.or(link)
}
