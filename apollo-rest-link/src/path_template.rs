//! Request paths built from `:name` templates or user supplied builders.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexSet;
use itertools::Itertools;
use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
use serde_json_bytes::Value as JSON;
use tower::BoxError;

use crate::error::QueryShapeError;

/// The characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Where the path of a call comes from.
#[derive(Clone, Debug)]
pub enum PathSource {
    Template(PathTemplate),
    Builder(PathBuilder),
}

impl PathSource {
    /// Parameter names the path is known to need before the call can run.
    ///
    /// A builder is opaque, so it never declares any.
    pub fn parameters(&self) -> IndexSet<&str> {
        match self {
            PathSource::Template(template) => template.parameters(),
            PathSource::Builder(_) => IndexSet::default(),
        }
    }

    /// The subset of [`PathSource::parameters`] that must have a value.
    pub fn required_parameters(&self) -> IndexSet<&str> {
        match self {
            PathSource::Template(template) => template.required_parameters(),
            PathSource::Builder(_) => IndexSet::default(),
        }
    }
}

/// A path template such as `/posts/:id/comments?page=:page&sort=desc`.
///
/// Placeholders in the path part must resolve, or building the path fails.
/// Placeholders in the query string may be absent, in which case the whole
/// `key=value` pair is dropped. `null`, `false` and `0` are real values and are
/// written out literally.
#[derive(Clone, Debug, PartialEq)]
pub struct PathTemplate {
    source: String,
    path: Vec<Part>,
    query: Vec<QueryParam>,
}

#[derive(Clone, Debug, PartialEq)]
enum Part {
    Text(String),
    Placeholder(String),
}

#[derive(Clone, Debug, PartialEq)]
struct QueryParam {
    key: String,
    value: Option<Vec<Part>>,
}

impl PathTemplate {
    pub fn parse(source: &str) -> Result<Self, QueryShapeError> {
        let (path, query) = match source.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (source, None),
        };

        let malformed = |position| QueryShapeError::MalformedPlaceholder {
            template: source.to_string(),
            position,
        };

        let path_parts = parse_parts(path, 0).map_err(malformed)?;

        let mut query_params = vec![];
        if let Some(query) = query {
            // offset of the current query pair inside `source`
            let mut offset = path.len() + 1;
            for pair in query.split('&') {
                if !pair.is_empty() {
                    let param = match pair.split_once('=') {
                        Some((key, value)) => QueryParam {
                            key: key.to_string(),
                            value: Some(
                                parse_parts(value, offset + key.len() + 1).map_err(malformed)?,
                            ),
                        },
                        None => QueryParam {
                            key: pair.to_string(),
                            value: None,
                        },
                    };
                    query_params.push(param);
                }
                offset += pair.len() + 1;
            }
        }

        Ok(Self {
            source: source.to_string(),
            path: path_parts,
            query: query_params,
        })
    }

    /// Every placeholder name, path first, in template order.
    pub fn parameters(&self) -> IndexSet<&str> {
        self.path
            .iter()
            .chain(
                self.query
                    .iter()
                    .filter_map(|param| param.value.as_ref())
                    .flatten(),
            )
            .filter_map(|part| match part {
                Part::Placeholder(name) => Some(name.as_str()),
                Part::Text(_) => None,
            })
            .collect()
    }

    /// Placeholders of the path part, which cannot be left out.
    pub fn required_parameters(&self) -> IndexSet<&str> {
        self.path
            .iter()
            .filter_map(|part| match part {
                Part::Placeholder(name) => Some(name.as_str()),
                Part::Text(_) => None,
            })
            .collect()
    }

    /// Substitute `params` into the template.
    ///
    /// # Errors
    /// Returns the name of the first path placeholder with no value.
    pub fn interpolate(&self, params: &Map<ByteString, JSON>) -> Result<String, String> {
        let mut output = String::with_capacity(self.source.len());
        for part in &self.path {
            match part {
                Part::Text(text) => output.push_str(text),
                Part::Placeholder(name) => {
                    let value = lookup(params, name).ok_or_else(|| name.clone())?;
                    output.extend(utf8_percent_encode(&stringify(value), COMPONENT));
                }
            }
        }

        let query = self
            .query
            .iter()
            .filter_map(|param| {
                let Some(parts) = &param.value else {
                    return Some(param.key.clone());
                };
                let mut value = String::new();
                for part in parts {
                    match part {
                        Part::Text(text) => value.push_str(text),
                        Part::Placeholder(name) => {
                            let resolved = lookup(params, name)?;
                            value.extend(utf8_percent_encode(&stringify(resolved), COMPONENT));
                        }
                    }
                }
                Some(format!("{}={}", param.key, value))
            })
            .join("&");

        if !query.is_empty() {
            output.push('?');
            output.push_str(&query);
        }
        Ok(output)
    }
}

impl FromStr for PathTemplate {
    type Err = QueryShapeError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl Display for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split `input` into text and placeholders. On failure returns the absolute
/// position of the offending `:`.
fn parse_parts(input: &str, offset: usize) -> Result<Vec<Part>, usize> {
    let mut parts = vec![];
    let mut text = String::new();
    let mut chars = input.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if c != ':' {
            text.push(c);
            continue;
        }

        match chars.peek() {
            Some((_, c)) if c.is_ascii_alphabetic() || *c == '_' => {}
            _ => return Err(offset + index),
        }
        let mut name = String::new();
        while let Some((_, c)) = chars.peek() {
            if c.is_ascii_alphanumeric() || *c == '_' {
                name.push(*c);
                chars.next();
            } else {
                break;
            }
        }

        if !text.is_empty() {
            parts.push(Part::Text(std::mem::take(&mut text)));
        }
        parts.push(Part::Placeholder(name));
    }

    if !text.is_empty() {
        parts.push(Part::Text(text));
    }
    Ok(parts)
}

fn lookup<'a>(params: &'a Map<ByteString, JSON>, name: &str) -> Option<&'a JSON> {
    params.get(name)
}

/// The text a parameter value takes inside a URL.
fn stringify(value: &JSON) -> String {
    match value {
        JSON::String(string) => string.as_str().to_string(),
        JSON::Array(values) => values.iter().map(stringify).join(","),
        other => other.to_string(),
    }
}

type PathBuilderFn =
    dyn Fn(Map<ByteString, JSON>) -> BoxFuture<'static, Result<String, BoxError>> + Send + Sync;

/// A user supplied function building the path (and query string) of a call
/// from its fully resolved parameters. The returned path is used verbatim.
#[derive(Clone)]
pub struct PathBuilder(Arc<PathBuilderFn>);

impl PathBuilder {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&Map<ByteString, JSON>) -> Result<String, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(
            move |params| -> BoxFuture<'static, Result<String, BoxError>> {
                Box::pin(futures::future::ready(build(&params)))
            },
        ))
    }

    pub fn new_async<F>(build: F) -> Self
    where
        F: Fn(Map<ByteString, JSON>) -> BoxFuture<'static, Result<String, BoxError>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(build))
    }

    pub async fn build(&self, params: Map<ByteString, JSON>) -> Result<String, BoxError> {
        (self.0)(params).await
    }
}

impl std::fmt::Debug for PathBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PathBuilder")
    }
}
