//! The HTTP capability used by the link.

use bytes::Bytes;
use http::HeaderMap;
use http::Method;
use http::StatusCode;
use http::Uri;
use http::header::AUTHORIZATION;
use http::header::COOKIE;
use tower::BoxError;

use crate::headers::Credentials;
use crate::headers::HeaderSet;

/// A fully assembled request for one `@rest` call.
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub uri: Uri,
    pub method: Method,
    pub headers: HeaderSet,
    pub body: Option<Bytes>,
    pub credentials: Credentials,
}

#[derive(Clone, Debug)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Sends requests on behalf of a [`crate::RestLink`].
///
/// Any status is a successful fetch; errors are for transport failures only.
#[async_trait::async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, BoxError>;
}

/// [`Fetch`] over a [`reqwest::Client`].
///
/// With [`Credentials::Omit`] the `cookie` and `authorization` headers are not
/// sent. The other policies send every header.
#[derive(Clone, Debug, Default)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Fetch for ReqwestFetch {
    #[tracing::instrument(
        skip_all,
        fields(http.request.method = %request.method, url.full = %request.uri)
    )]
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, BoxError> {
        let mut builder = self
            .client
            .request(request.method, request.uri.to_string());
        for (name, value) in request.headers {
            if request.credentials == Credentials::Omit && (name == COOKIE || name == AUTHORIZATION)
            {
                continue;
            }
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
