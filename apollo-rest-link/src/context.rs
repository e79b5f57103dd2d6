//! Per-request settings supplied by the caller of a link.

use http::HeaderName;

use crate::headers::Credentials;
use crate::headers::HeaderSet;

/// Headers and credentials for one request, merged with the link level ones.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    pub(crate) headers: HeaderSet,
    pub(crate) headers_to_override: Vec<HeaderName>,
    pub(crate) credentials: Option<Credentials>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_headers(mut self, headers: HeaderSet) -> Self {
        self.headers = headers;
        self
    }

    /// Link level headers with these names are dropped in favour of the
    /// context's own.
    pub fn with_headers_to_override(mut self, names: impl IntoIterator<Item = HeaderName>) -> Self {
        self.headers_to_override = names.into_iter().collect();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials
    }
}
