use itertools::Itertools;

/// Expectations on one request received by the mock server.
#[derive(Clone, Default)]
pub(crate) struct Matcher {
    method: Option<String>,
    path: Option<String>,
    query: Option<String>,
    body: Option<Option<serde_json::Value>>,
    headers: Vec<(String, Vec<String>)>,
    absent_headers: Vec<String>,
}

impl Matcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub(crate) fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub(crate) fn query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub(crate) fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(Some(body));
        self
    }

    pub(crate) fn no_body(mut self) -> Self {
        self.body = Some(None);
        self
    }

    /// Every value of `name`, in order.
    pub(crate) fn header(mut self, name: &str, values: &[&str]) -> Self {
        self.headers.push((
            name.to_string(),
            values.iter().map(|value| value.to_string()).collect(),
        ));
        self
    }

    pub(crate) fn no_header(mut self, name: &str) -> Self {
        self.absent_headers.push(name.to_string());
        self
    }

    fn matches(&self, request: &wiremock::Request, index: usize) {
        if let Some(method) = self.method.as_ref() {
            assert_eq!(
                method,
                request.method.as_str(),
                "[Request {index}]: Expected method {method}, got {}",
                request.method
            )
        }

        if let Some(path) = self.path.as_ref() {
            assert_eq!(
                path,
                request.url.path(),
                "[Request {index}]: Expected path {path}, got {}",
                request.url.path()
            )
        }

        if let Some(query) = self.query.as_ref() {
            assert_eq!(
                query,
                request.url.query().unwrap_or_default(),
                "[Request {index}]: Expected query {query}, got {}",
                request.url.query().unwrap_or_default()
            )
        }

        match self.body.as_ref() {
            Some(Some(body)) => assert_eq!(
                body,
                &request.body_json::<serde_json::Value>().unwrap(),
                "[Request {index}]: incorrect body",
            ),
            Some(None) => assert!(
                request.body.is_empty(),
                "[Request {index}]: expected no body, got {}",
                String::from_utf8_lossy(&request.body)
            ),
            None => {}
        }

        for (name, expected) in &self.headers {
            let actual: Vec<String> = request
                .headers
                .get_all(name.as_str())
                .iter()
                .map(|value| value.to_str().unwrap().to_string())
                .collect();
            assert_eq!(
                expected,
                &actual,
                "[Request {index}]: expected header {name} to be [{}], was [{}]",
                expected.iter().join(", "),
                actual.iter().join(", ")
            );
        }

        for name in &self.absent_headers {
            assert!(
                !request.headers.contains_key(name.as_str()),
                "[Request {index}]: expected no header {name}"
            );
        }
    }
}

pub(crate) fn matches(received: &[wiremock::Request], matchers: Vec<Matcher>) {
    assert_eq!(
        received.len(),
        matchers.len(),
        "Expected {} requests, recorded {}",
        matchers.len(),
        received.len()
    );
    for (i, (request, matcher)) in received.iter().zip(matchers.iter()).enumerate() {
        matcher.matches(request, i);
    }
}
