//! Ordered header sets and the policies merging them.

use std::sync::Arc;

use http::HeaderName;
use http::HeaderValue;
use schemars::JsonSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigurationError;

/// An ordered list of headers.
///
/// Unlike [`http::HeaderMap`], entries keep their global insertion order and
/// duplicated names stay where they were appended.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderSet(Vec<(HeaderName, HeaderValue)>);

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.0.push((name, value));
    }

    /// Append a header from its textual name and value.
    pub fn try_append(&mut self, name: &str, value: &str) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidHeader {
            name: name.to_string(),
            reason,
        };
        let header_name = HeaderName::try_from(name).map_err(|err| invalid(err.to_string()))?;
        let header_value = HeaderValue::try_from(value).map_err(|err| invalid(err.to_string()))?;
        self.append(header_name, header_value);
        Ok(())
    }

    /// Append a header, builder style.
    pub fn with(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.append(name, value);
        self
    }

    pub fn contains_key(&self, name: &HeaderName) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    pub fn get_all<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a HeaderValue> {
        self.0
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Remove every entry named `name`.
    pub fn remove(&mut self, name: &HeaderName) {
        self.0.retain(|(key, _)| key != name);
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for HeaderSet {
    fn from_iter<T: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<(HeaderName, HeaderValue)> for HeaderSet {
    fn extend<T: IntoIterator<Item = (HeaderName, HeaderValue)>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl IntoIterator for HeaderSet {
    type Item = (HeaderName, HeaderValue);
    type IntoIter = std::vec::IntoIter<(HeaderName, HeaderValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HeaderSet {
    type Item = &'a (HeaderName, HeaderValue);
    type IntoIter = std::slice::Iter<'a, (HeaderName, HeaderValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A header as written in configuration.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl TryFrom<&[HeaderEntry]> for HeaderSet {
    type Error = ConfigurationError;

    fn try_from(entries: &[HeaderEntry]) -> Result<Self, Self::Error> {
        let mut headers = HeaderSet::new();
        for entry in entries {
            headers.try_append(&entry.name, &entry.value)?;
        }
        Ok(headers)
    }
}

type MergeFn = dyn Fn(&[HeaderSet]) -> HeaderSet + Send + Sync;

/// Combines the link, request context and per-call header sets, in that order.
///
/// Whatever the policy returns is sent as is.
#[derive(Clone)]
pub struct HeaderMergePolicy(Arc<MergeFn>);

impl HeaderMergePolicy {
    pub fn new<F>(merge: F) -> Self
    where
        F: Fn(&[HeaderSet]) -> HeaderSet + Send + Sync + 'static,
    {
        Self(Arc::new(merge))
    }

    /// Concatenate every set, keeping duplicates.
    pub fn concat() -> Self {
        Self::new(|sets| sets.iter().flat_map(|set| set.iter().cloned()).collect())
    }

    pub fn merge(&self, sets: &[HeaderSet]) -> HeaderSet {
        (self.0)(sets)
    }
}

impl Default for HeaderMergePolicy {
    fn default() -> Self {
        Self::concat()
    }
}

impl std::fmt::Debug for HeaderMergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HeaderMergePolicy")
    }
}

/// Merge the header sets of one call.
///
/// `overrides` are the names the request context wants to replace: link level
/// entries with those names are dropped before the policy runs.
pub(crate) fn merge_headers(
    link: &HeaderSet,
    context: &HeaderSet,
    call: &HeaderSet,
    overrides: &[HeaderName],
    policy: &HeaderMergePolicy,
) -> HeaderSet {
    let mut link = link.clone();
    for name in overrides {
        link.remove(name);
    }
    policy.merge(&[link, context.clone(), call.clone()])
}

/// How a request deals with cookies and other credentials.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Credentials {
    Omit,
    #[default]
    SameOrigin,
    Include,
}
