//! Link configuration.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigurationError;
use crate::error::QueryShapeError;
use crate::field_names::FieldNameCase;
use crate::headers::Credentials;
use crate::headers::HeaderEntry;
use crate::headers::HeaderSet;

/// The key of the default endpoint in [`Configuration::endpoints`].
pub const DEFAULT_ENDPOINT_KEY: &str = "";

/// Configuration of a [`crate::RestLink`].
///
/// ```yaml
/// uri: https://api.example.com/v1
/// endpoints:
///   github: https://api.github.com
/// headers:
///   - name: x-api-key
///     value: secret
/// credentials: include
/// field_name_normalizer: camelCase
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Base URI of the default endpoint.
    pub uri: Option<String>,

    /// Named endpoints, selected with `@rest(endpoint: "name")`.
    /// The `""` entry is the default endpoint and must match `uri` when both are set.
    pub endpoints: BTreeMap<String, String>,

    /// Headers sent with every request.
    pub headers: Vec<HeaderEntry>,

    /// Credentials policy for every request, unless the request context sets one.
    pub credentials: Option<Credentials>,

    /// Key convention applied to response objects.
    pub field_name_normalizer: Option<FieldNameCase>,

    /// Key convention applied to request bodies.
    pub field_name_denormalizer: Option<FieldNameCase>,
}

impl Configuration {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        serde_yaml::from_str(yaml).map_err(|err| ConfigurationError::InvalidYaml(err.to_string()))
    }

    /// JSON schema of the YAML configuration.
    pub fn schema() -> RootSchema {
        schemars::schema_for!(Configuration)
    }

    pub(crate) fn endpoint_table(&self) -> Result<EndpointTable, ConfigurationError> {
        EndpointTable::new(self.uri.as_deref(), &self.endpoints)
    }

    pub(crate) fn header_set(&self) -> Result<HeaderSet, ConfigurationError> {
        HeaderSet::try_from(self.headers.as_slice())
    }
}

/// Endpoint keys mapped to base URIs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointTable {
    endpoints: BTreeMap<String, String>,
}

impl EndpointTable {
    pub fn new(
        uri: Option<&str>,
        endpoints: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigurationError> {
        if uri.is_none() && endpoints.is_empty() {
            return Err(ConfigurationError::MissingEndpoints);
        }

        let mut table = endpoints.clone();
        match (uri, endpoints.get(DEFAULT_ENDPOINT_KEY)) {
            (Some(uri), Some(endpoint)) if uri != endpoint => {
                return Err(ConfigurationError::DefaultEndpointMismatch {
                    uri: uri.to_string(),
                    endpoint: endpoint.clone(),
                });
            }
            (Some(uri), _) => {
                table.insert(DEFAULT_ENDPOINT_KEY.to_string(), uri.to_string());
            }
            (None, Some(_)) => {}
            (None, None) => {
                tracing::warn!(
                    "no default endpoint configured, every @rest call must name one of: {}",
                    endpoints.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
                );
            }
        }

        for (key, uri) in &table {
            http::Uri::try_from(uri.as_str()).map_err(|err| {
                ConfigurationError::InvalidEndpointUri {
                    key: key.clone(),
                    uri: uri.clone(),
                    reason: err.to_string(),
                }
            })?;
        }

        Ok(Self { endpoints: table })
    }

    pub fn default_uri(&self) -> Option<&str> {
        self.endpoints.get(DEFAULT_ENDPOINT_KEY).map(String::as_str)
    }

    /// The base URI for `key`. Unknown keys fall back to the default endpoint.
    pub fn resolve(&self, key: Option<&str>) -> Result<&str, QueryShapeError> {
        let key = key.unwrap_or(DEFAULT_ENDPOINT_KEY);
        if let Some(uri) = self.endpoints.get(key) {
            return Ok(uri);
        }
        match self.default_uri() {
            Some(uri) if !key.is_empty() => {
                tracing::warn!(endpoint = key, "unknown endpoint, using the default endpoint");
                Ok(uri)
            }
            _ => Err(QueryShapeError::UnknownEndpoint(key.to_string())),
        }
    }
}
