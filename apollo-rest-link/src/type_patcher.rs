//! Injects `__typename` into response data.
//!
//! Every object produced by a call is tagged with the call's declared type.
//! Arrays, however deeply nested, are walked element by element and are never
//! tagged themselves. A table of per-type functions may then tag named children
//! with their own types, by calling back into [`TypePatcher::patch`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json_bytes::ByteString;
use serde_json_bytes::Value as JSON;
use tower::BoxError;

use crate::error::ConfigurationError;
use crate::error::TransformError;

pub const TYPENAME: &str = "__typename";

type PatchFn = dyn Fn(JSON, &str, &TypePatcher) -> Result<JSON, BoxError> + Send + Sync;

/// A per-type patch function.
///
/// It receives a copy of the object already tagged with its type, the type
/// name, and the patcher so it can recurse into children.
#[derive(Clone)]
pub struct Patch(Arc<PatchFn>);

impl Patch {
    pub fn new<F>(patch: F) -> Self
    where
        F: Fn(JSON, &str, &TypePatcher) -> Result<JSON, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(patch))
    }

    /// A patch tagging the listed child fields with the given types.
    pub fn fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields: Vec<(String, String)> = fields
            .into_iter()
            .map(|(field, type_name)| (field.into(), type_name.into()))
            .collect();
        Self::new(move |mut node, _, patcher| {
            if let JSON::Object(object) = &mut node {
                for (field, type_name) in &fields {
                    if let Some(child) = object.get_mut(field.as_str()) {
                        *child = patcher.patch(child, type_name)?;
                    }
                }
            }
            Ok(node)
        })
    }
}

impl std::fmt::Debug for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Patch")
    }
}

#[derive(Clone, Debug, Default)]
pub struct TypePatcher {
    table: HashMap<String, Patch>,
}

impl TypePatcher {
    pub fn new(table: HashMap<String, Patch>) -> Result<Self, ConfigurationError> {
        if table.contains_key("") {
            return Err(ConfigurationError::EmptyTypePatcherKey);
        }
        Ok(Self { table })
    }

    /// Tag `node` with `type_name`. The input is left untouched.
    pub fn patch(&self, node: &JSON, type_name: &str) -> Result<JSON, TransformError> {
        match node {
            JSON::Array(items) => items
                .iter()
                .map(|item| self.patch(item, type_name))
                .collect::<Result<Vec<_>, _>>()
                .map(JSON::Array),
            JSON::Object(object) => {
                let mut tagged = object.clone();
                tagged.insert(
                    ByteString::from(TYPENAME),
                    JSON::String(ByteString::from(type_name)),
                );
                let tagged = JSON::Object(tagged);
                match self.table.get(type_name) {
                    Some(patch) => {
                        (patch.0)(tagged, type_name, self).map_err(|err| {
                            TransformError::TypePatcher {
                                type_name: type_name.to_string(),
                                reason: err.to_string(),
                            }
                        })
                    }
                    None => Ok(tagged),
                }
            }
            // null and scalars carry no type
            other => Ok(other.clone()),
        }
    }
}
